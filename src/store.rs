//! Kitchen Data Store
//!
//! The dispatcher consumes inventory and recipe data through the
//! [`KitchenStore`] trait; persistence engines live behind it. The
//! in-process [`MemoryStore`] backs tests and embedders without their own
//! storage. All lookups use normalized names so minor variants ("Tomatoes",
//! "tomato ") collide.

use crate::tools::units::Unit;
use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use tokio::sync::Mutex;

/// Where an ingredient is stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Location {
    Fridge,
    Freezer,
    Pantry,
    Counter,
}

impl Location {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Location::Fridge => "fridge",
            Location::Freezer => "freezer",
            Location::Pantry => "pantry",
            Location::Counter => "counter",
        }
    }

    pub fn parse(raw: &str) -> Option<Location> {
        match raw.trim().to_lowercase().as_str() {
            "fridge" | "refrigerator" => Some(Location::Fridge),
            "freezer" => Some(Location::Freezer),
            "pantry" | "cupboard" => Some(Location::Pantry),
            "counter" | "countertop" => Some(Location::Counter),
            _ => None,
        }
    }

    pub const fn all() -> &'static [Location] {
        &[
            Location::Fridge,
            Location::Freezer,
            Location::Pantry,
            Location::Counter,
        ]
    }

    pub fn valid_list() -> String {
        Location::all()
            .iter()
            .map(|l| l.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryItem {
    pub name: String,
    pub quantity: f64,
    pub unit: Unit,
    pub location: Location,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_on: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecipeIngredient {
    pub name: String,
    pub quantity: f64,
    pub unit: Unit,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recipe {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub ingredients: Vec<RecipeIngredient>,
    pub steps: Vec<String>,
}

/// Lowercases, trims, collapses whitespace and stems a basic plural off the
/// final word, so "Green  Onions" and "green onion" share one record.
pub fn normalize_name(raw: &str) -> String {
    let words: Vec<&str> = raw.trim().split_whitespace().collect();
    let mut normalized: Vec<String> = words.iter().map(|w| w.to_lowercase()).collect();
    if let Some(last) = normalized.last_mut() {
        *last = stem_plural(last);
    }
    normalized.join(" ")
}

fn stem_plural(word: &str) -> String {
    if word.len() > 4 && word.ends_with("ies") {
        return format!("{}y", &word[..word.len() - 3]);
    }
    if word.len() > 3
        && ["oes", "ches", "shes", "sses", "xes", "zes"]
            .iter()
            .any(|suffix| word.ends_with(suffix))
    {
        return word[..word.len() - 2].to_string();
    }
    if word.len() > 3 && word.ends_with('s') && !word.ends_with("ss") && !word.ends_with("us") {
        return word[..word.len() - 1].to_string();
    }
    word.to_string()
}

/// The data-store collaborator. Per entity kind: normalized-name lookup,
/// create-or-merge, filtered list, delete.
#[async_trait]
pub trait KitchenStore: Send + Sync {
    async fn find_item(&self, name: &str) -> Result<Option<InventoryItem>>;
    /// Create-or-merge: an existing entry with the same normalized name and
    /// unit absorbs the quantity; otherwise the record is replaced.
    async fn upsert_item(&self, item: InventoryItem) -> Result<InventoryItem>;
    /// Overwrites the record wholesale in one operation; never merges.
    async fn replace_item(&self, item: InventoryItem) -> Result<InventoryItem>;
    async fn list_items(&self, location: Option<Location>) -> Result<Vec<InventoryItem>>;
    async fn delete_item(&self, name: &str) -> Result<bool>;

    async fn find_recipe(&self, name: &str) -> Result<Option<Recipe>>;
    async fn upsert_recipe(&self, recipe: Recipe) -> Result<Recipe>;
    async fn list_recipes(&self, ingredient: Option<&str>) -> Result<Vec<Recipe>>;
    async fn delete_recipe(&self, name: &str) -> Result<bool>;
}

#[derive(Default)]
struct Shelves {
    items: HashMap<String, InventoryItem>,
    recipes: HashMap<String, Recipe>,
}

/// In-process store keyed by normalized names.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Shelves>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KitchenStore for MemoryStore {
    async fn find_item(&self, name: &str) -> Result<Option<InventoryItem>> {
        let shelves = self.inner.lock().await;
        Ok(shelves.items.get(&normalize_name(name)).cloned())
    }

    async fn upsert_item(&self, item: InventoryItem) -> Result<InventoryItem> {
        let mut shelves = self.inner.lock().await;
        let key = normalize_name(&item.name);
        let merged = match shelves.items.get(&key) {
            Some(existing) if existing.unit == item.unit => InventoryItem {
                name: existing.name.clone(),
                quantity: existing.quantity + item.quantity,
                unit: existing.unit,
                location: item.location,
                expires_on: item.expires_on.or(existing.expires_on),
            },
            _ => item,
        };
        shelves.items.insert(key, merged.clone());
        Ok(merged)
    }

    async fn replace_item(&self, item: InventoryItem) -> Result<InventoryItem> {
        let mut shelves = self.inner.lock().await;
        shelves.items.insert(normalize_name(&item.name), item.clone());
        Ok(item)
    }

    async fn list_items(&self, location: Option<Location>) -> Result<Vec<InventoryItem>> {
        let shelves = self.inner.lock().await;
        let mut items: Vec<InventoryItem> = shelves
            .items
            .values()
            .filter(|item| location.is_none_or(|loc| item.location == loc))
            .cloned()
            .collect();
        items.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(items)
    }

    async fn delete_item(&self, name: &str) -> Result<bool> {
        let mut shelves = self.inner.lock().await;
        Ok(shelves.items.remove(&normalize_name(name)).is_some())
    }

    async fn find_recipe(&self, name: &str) -> Result<Option<Recipe>> {
        let shelves = self.inner.lock().await;
        Ok(shelves.recipes.get(&normalize_name(name)).cloned())
    }

    async fn upsert_recipe(&self, recipe: Recipe) -> Result<Recipe> {
        let mut shelves = self.inner.lock().await;
        shelves
            .recipes
            .insert(normalize_name(&recipe.name), recipe.clone());
        Ok(recipe)
    }

    async fn list_recipes(&self, ingredient: Option<&str>) -> Result<Vec<Recipe>> {
        let shelves = self.inner.lock().await;
        let wanted = ingredient.map(normalize_name);
        let mut recipes: Vec<Recipe> = shelves
            .recipes
            .values()
            .filter(|recipe| match &wanted {
                None => true,
                Some(target) => recipe
                    .ingredients
                    .iter()
                    .any(|ing| normalize_name(&ing.name) == *target),
            })
            .cloned()
            .collect();
        recipes.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(recipes)
    }

    async fn delete_recipe(&self, name: &str) -> Result<bool> {
        let mut shelves = self.inner.lock().await;
        Ok(shelves.recipes.remove(&normalize_name(name)).is_some())
    }
}

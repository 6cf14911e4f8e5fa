//! Executes validated tool calls against the kitchen store.
//!
//! `execute` is total: schema validation failures, argument coercion
//! failures and store errors all come back as failure results for the
//! agent to read, never as panics or error returns.

use super::{ToolCall, ToolResult, args::ArgMap, registry, units::Unit};
use crate::store::{InventoryItem, KitchenStore, Location, Recipe, RecipeIngredient};
use anyhow::{Context, Result, anyhow, ensure};
use chrono::NaiveDate;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{info, warn};

pub struct FunctionDispatcher {
    store: Arc<dyn KitchenStore>,
}

type Outcome = Result<(String, Map<String, Value>)>;

impl FunctionDispatcher {
    pub fn new(store: Arc<dyn KitchenStore>) -> Self {
        Self { store }
    }

    /// Runs one tool call end to end and always produces a result.
    pub async fn execute(&self, call: &ToolCall) -> ToolResult {
        if let Err(e) = registry::validate(call) {
            warn!(tool = %call.name, error = %e, "rejected tool call");
            return ToolResult::failure(call, e.to_string());
        }

        let args = ArgMap::new(&call.args);
        let outcome = match call.name.as_str() {
            "add_ingredient" => self.add_ingredient(args).await,
            "remove_ingredient" => self.remove_ingredient(args).await,
            "update_ingredient" => self.update_ingredient(args).await,
            "list_inventory" => self.list_inventory(args).await,
            "add_recipe" => self.add_recipe(args).await,
            "get_recipe" => self.get_recipe(args).await,
            "list_recipes" => self.list_recipes(args).await,
            "update_recipe" => self.update_recipe(args).await,
            "delete_recipe" => self.delete_recipe(args).await,
            // validate() already guarantees a known name.
            other => Err(anyhow!("no handler registered for `{other}`")),
        };

        match outcome {
            Ok((message, payload)) => {
                info!(tool = %call.name, "tool call succeeded");
                ToolResult::success(call, message, payload)
            }
            Err(e) => {
                warn!(tool = %call.name, error = %e, "tool call failed");
                ToolResult::failure(call, e.to_string())
            }
        }
    }

    async fn add_ingredient(&self, args: ArgMap<'_>) -> Outcome {
        let name = required_name(&args)?;
        let quantity = args
            .f64("quantity")
            .context("`quantity` must be a number")?;
        ensure!(quantity > 0.0, "`quantity` must be greater than zero");
        let unit = parse_unit(&args, "unit")?.context("`unit` must be a string")?;
        let location = parse_location(&args, "location")?.context("`location` must be a string")?;
        let expires_on = parse_expiration(&args)?;

        let saved = self
            .store
            .upsert_item(InventoryItem {
                name: name.to_string(),
                quantity,
                unit,
                location,
                expires_on,
            })
            .await?;

        let message = format!("Added {quantity} {unit} of {name} to the {location}.");
        Ok((message, payload_with("item", &saved)?))
    }

    async fn remove_ingredient(&self, args: ArgMap<'_>) -> Outcome {
        let name = required_name(&args)?;
        let item = self
            .store
            .find_item(name)
            .await?
            .with_context(|| format!("No {name} found in the inventory."))?;

        if let Some(unit) = parse_unit(&args, "unit")? {
            ensure!(
                unit == item.unit,
                "{} is tracked in {}, not {}.",
                item.name,
                item.unit,
                unit
            );
        }

        if !args.has("quantity") {
            self.store.delete_item(name).await?;
            let message = format!("Removed all {} from the {}.", item.name, item.location);
            return Ok((message, Map::new()));
        }

        let quantity = args
            .f64("quantity")
            .context("`quantity` must be a number")?;
        ensure!(quantity > 0.0, "`quantity` must be greater than zero");

        // Removing more than is present clamps at zero and drops the record.
        let remaining = (item.quantity - quantity).max(0.0);
        if remaining <= f64::EPSILON {
            self.store.delete_item(name).await?;
            let message = format!("Removed the last of the {} from the {}.", item.name, item.location);
            Ok((message, Map::new()))
        } else {
            let updated = self
                .store
                .replace_item(InventoryItem {
                    quantity: remaining,
                    ..item
                })
                .await?;
            let message = format!(
                "Removed {quantity} {} of {}; {remaining} {} left.",
                updated.unit, updated.name, updated.unit
            );
            Ok((message, payload_with("item", &updated)?))
        }
    }

    async fn update_ingredient(&self, args: ArgMap<'_>) -> Outcome {
        let name = required_name(&args)?;
        let mut item = self
            .store
            .find_item(name)
            .await?
            .with_context(|| format!("No {name} found in the inventory."))?;

        if args.has("quantity") {
            let quantity = args
                .f64("quantity")
                .context("`quantity` must be a number")?;
            ensure!(quantity > 0.0, "`quantity` must be greater than zero");
            item.quantity = quantity;
        }
        if let Some(unit) = parse_unit(&args, "unit")? {
            item.unit = unit;
        }
        if let Some(location) = parse_location(&args, "location")? {
            item.location = location;
        }
        if args.has("expiration_date") {
            item.expires_on = parse_expiration(&args)?;
        }

        // Replace wholesale so the quantity is not re-merged.
        let updated = self.store.replace_item(item).await?;
        let message = format!("Updated {} in the {}.", updated.name, updated.location);
        Ok((message, payload_with("item", &updated)?))
    }

    async fn list_inventory(&self, args: ArgMap<'_>) -> Outcome {
        let location = parse_location(&args, "location")?;
        let items = self.store.list_items(location).await?;

        let scope = match location {
            Some(loc) => format!("in the {loc}"),
            None => "in the kitchen".to_string(),
        };
        let message = if items.is_empty() {
            format!("There is nothing {scope}.")
        } else {
            format!("Found {} item(s) {scope}.", items.len())
        };
        Ok((message, payload_with("items", &items)?))
    }

    async fn add_recipe(&self, args: ArgMap<'_>) -> Outcome {
        let name = required_name(&args)?;
        let description = args.str("description").map(str::to_string);
        let ingredients = parse_ingredients(
            args.array("ingredients")
                .context("`ingredients` must be an array")?,
        )?;
        let steps = parse_steps(args.array("steps").context("`steps` must be an array")?)?;

        let saved = self
            .store
            .upsert_recipe(Recipe {
                name: name.to_string(),
                description,
                ingredients,
                steps,
            })
            .await?;

        let message = format!(
            "Saved the recipe for {} with {} ingredient(s) and {} step(s).",
            saved.name,
            saved.ingredients.len(),
            saved.steps.len()
        );
        Ok((message, payload_with("recipe", &saved)?))
    }

    async fn get_recipe(&self, args: ArgMap<'_>) -> Outcome {
        let name = required_name(&args)?;
        let recipe = self
            .store
            .find_recipe(name)
            .await?
            .with_context(|| format!("No recipe named {name} was found."))?;

        let message = format!("Found the recipe for {}.", recipe.name);
        Ok((message, payload_with("recipe", &recipe)?))
    }

    async fn list_recipes(&self, args: ArgMap<'_>) -> Outcome {
        let ingredient = args.str("ingredient");
        let recipes = self.store.list_recipes(ingredient).await?;

        let message = match ingredient {
            Some(ing) if recipes.is_empty() => format!("No saved recipes use {ing}."),
            Some(ing) => format!("Found {} recipe(s) using {ing}.", recipes.len()),
            None if recipes.is_empty() => "There are no saved recipes yet.".to_string(),
            None => format!("Found {} saved recipe(s).", recipes.len()),
        };
        Ok((message, payload_with("recipes", &recipes)?))
    }

    async fn update_recipe(&self, args: ArgMap<'_>) -> Outcome {
        let name = required_name(&args)?;
        let patch = args.object("patch").context("`patch` must be an object")?;
        let patch = ArgMap::new(patch);

        let mut recipe = self
            .store
            .find_recipe(name)
            .await?
            .with_context(|| format!("No recipe named {name} was found."))?;

        // Lists in the patch fully replace the stored ones, never merge.
        if patch.has("ingredients") {
            recipe.ingredients = parse_ingredients(
                patch
                    .array("ingredients")
                    .context("`patch.ingredients` must be an array")?,
            )?;
        }
        if patch.has("steps") {
            recipe.steps =
                parse_steps(patch.array("steps").context("`patch.steps` must be an array")?)?;
        }
        if patch.has("description") {
            recipe.description = patch.str("description").map(str::to_string);
        }

        let updated = self.store.upsert_recipe(recipe).await?;
        let message = format!("Updated the recipe for {}.", updated.name);
        Ok((message, payload_with("recipe", &updated)?))
    }

    async fn delete_recipe(&self, args: ArgMap<'_>) -> Outcome {
        let name = required_name(&args)?;
        let deleted = self.store.delete_recipe(name).await?;
        ensure!(deleted, "No recipe named {name} was found.");
        Ok((format!("Deleted the recipe for {name}."), Map::new()))
    }
}

fn required_name<'a>(args: &ArgMap<'a>) -> Result<&'a str> {
    args.str("name")
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .context("`name` must be a non-empty string")
}

/// `Ok(None)` when the key is absent; an error when it is present but not a
/// declared unit, listing the valid ones.
fn parse_unit(args: &ArgMap<'_>, key: &str) -> Result<Option<Unit>> {
    if !args.has(key) {
        return Ok(None);
    }
    let raw = args.str(key).context("`unit` must be a string")?;
    let unit = Unit::parse(raw).with_context(|| {
        format!(
            "Unknown unit `{}`; valid units are: {}.",
            raw.trim(),
            Unit::valid_list()
        )
    })?;
    Ok(Some(unit))
}

fn parse_location(args: &ArgMap<'_>, key: &str) -> Result<Option<Location>> {
    if !args.has(key) {
        return Ok(None);
    }
    let raw = args.str(key).context("`location` must be a string")?;
    let location = Location::parse(raw).with_context(|| {
        format!(
            "Unknown location `{}`; valid locations are: {}.",
            raw.trim(),
            Location::valid_list()
        )
    })?;
    Ok(Some(location))
}

fn parse_expiration(args: &ArgMap<'_>) -> Result<Option<NaiveDate>> {
    if !args.has("expiration_date") {
        return Ok(None);
    }
    let date = args
        .date("expiration_date")
        .context("`expiration_date` must be an ISO-8601 timestamp or YYYY-MM-DD date")?;
    Ok(Some(date))
}

fn parse_ingredients(raw: &[Value]) -> Result<Vec<RecipeIngredient>> {
    ensure!(!raw.is_empty(), "a recipe needs at least one ingredient");
    raw.iter()
        .enumerate()
        .map(|(i, value)| {
            let map = value
                .as_object()
                .with_context(|| format!("ingredient {} must be an object", i + 1))?;
            let fields = ArgMap::new(map);
            let name = fields
                .str("name")
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .with_context(|| format!("ingredient {} needs a name", i + 1))?;
            let quantity = fields
                .f64("quantity")
                .with_context(|| format!("ingredient {} needs a numeric quantity", i + 1))?;
            let unit = parse_unit(&fields, "unit")?
                .with_context(|| format!("ingredient {} needs a unit", i + 1))?;
            Ok(RecipeIngredient {
                name: name.to_string(),
                quantity,
                unit,
            })
        })
        .collect()
}

fn parse_steps(raw: &[Value]) -> Result<Vec<String>> {
    ensure!(!raw.is_empty(), "a recipe needs at least one step");
    raw.iter()
        .enumerate()
        .map(|(i, value)| {
            value
                .as_str()
                .map(str::to_string)
                .with_context(|| format!("step {} must be a string", i + 1))
        })
        .collect()
}

fn payload_with<T: serde::Serialize>(key: &str, value: &T) -> Result<Map<String, Value>> {
    let mut payload = Map::new();
    payload.insert(key.to_string(), serde_json::to_value(value)?);
    Ok(payload)
}

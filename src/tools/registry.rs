//! The process-wide tool catalog: declarations, lookup, and call validation.
//!
//! The registry is pure and side-effect free. It checks only that a call
//! names a known tool and supplies every required argument; enum membership
//! and value types are enforced by the handlers, whose error messages are
//! more specific.

use super::{ToolCall, units::Unit};
use crate::store::Location;
use once_cell::sync::Lazy;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// One entry in the tool catalog, serialized as-is into both transports'
/// tool lists.
#[derive(Debug, Clone, Serialize)]
pub struct ToolDeclaration {
    pub name: String,
    pub description: String,
    pub parameters: ObjectSchema,
}

#[derive(Debug, Clone, Serialize)]
pub struct ObjectSchema {
    #[serde(rename = "type")]
    pub kind: String,
    pub properties: BTreeMap<String, PropertySchema>,
    pub required: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PropertySchema {
    #[serde(rename = "type")]
    pub kind: String,
    pub description: String,
    #[serde(rename = "enum", skip_serializing_if = "Option::is_none")]
    pub allowed: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<BTreeMap<String, PropertySchema>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("unknown tool `{0}`")]
    UnknownTool(String),
    #[error("tool `{tool}` is missing required argument `{field}`")]
    MissingArgument { tool: String, field: String },
}

/// The constant catalog, built once for the process lifetime.
static CATALOG: Lazy<Vec<ToolDeclaration>> = Lazy::new(build_catalog);

/// Returns the stable-ordered, duplicate-free tool catalog.
pub fn declarations() -> &'static [ToolDeclaration] {
    &CATALOG
}

/// Exact-match lookup by tool name.
pub fn find(name: &str) -> Option<&'static ToolDeclaration> {
    CATALOG.iter().find(|decl| decl.name == name)
}

/// Fails iff the name is unknown or a required argument is missing.
/// Unknown extra arguments are not errors.
pub fn validate(call: &ToolCall) -> Result<(), ValidationError> {
    let decl = find(&call.name).ok_or_else(|| ValidationError::UnknownTool(call.name.clone()))?;
    for field in &decl.parameters.required {
        if !call.args.contains_key(field) {
            return Err(ValidationError::MissingArgument {
                tool: call.name.clone(),
                field: field.clone(),
            });
        }
    }
    Ok(())
}

fn prop(kind: &str, description: &str) -> PropertySchema {
    PropertySchema {
        kind: kind.to_string(),
        description: description.to_string(),
        allowed: None,
        properties: None,
        required: None,
    }
}

fn enum_prop(description: &str, allowed: Vec<String>) -> PropertySchema {
    PropertySchema {
        allowed: Some(allowed),
        ..prop("string", description)
    }
}

fn unit_values() -> Vec<String> {
    Unit::all().iter().map(|u| u.as_str().to_string()).collect()
}

fn location_values() -> Vec<String> {
    Location::all()
        .iter()
        .map(|l| l.as_str().to_string())
        .collect()
}

fn declare(
    name: &str,
    description: &str,
    properties: Vec<(&str, PropertySchema)>,
    required: &[&str],
) -> ToolDeclaration {
    ToolDeclaration {
        name: name.to_string(),
        description: description.to_string(),
        parameters: ObjectSchema {
            kind: "object".to_string(),
            properties: properties
                .into_iter()
                .map(|(key, schema)| (key.to_string(), schema))
                .collect(),
            required: required.iter().map(|s| s.to_string()).collect(),
        },
    }
}

fn build_catalog() -> Vec<ToolDeclaration> {
    vec![
        declare(
            "add_ingredient",
            "Add an ingredient to the kitchen inventory, merging with any existing entry of the same name and unit.",
            vec![
                ("name", prop("string", "Ingredient name, e.g. 'chicken'.")),
                ("quantity", prop("number", "Amount to add.")),
                ("unit", enum_prop("Measurement unit.", unit_values())),
                ("location", enum_prop("Where the ingredient is stored.", location_values())),
                ("expiration_date", prop("string", "Optional expiration date, ISO-8601 or YYYY-MM-DD.")),
            ],
            &["name", "quantity", "unit", "location"],
        ),
        declare(
            "remove_ingredient",
            "Remove some or all of an ingredient from the inventory.",
            vec![
                ("name", prop("string", "Ingredient name.")),
                ("quantity", prop("number", "Amount to remove; omit to remove the ingredient entirely.")),
                ("unit", enum_prop("Unit of the quantity being removed.", unit_values())),
            ],
            &["name"],
        ),
        declare(
            "update_ingredient",
            "Update quantity, unit, storage location or expiration date of an inventory item.",
            vec![
                ("name", prop("string", "Ingredient name.")),
                ("quantity", prop("number", "New total quantity.")),
                ("unit", enum_prop("New measurement unit.", unit_values())),
                ("location", enum_prop("New storage location.", location_values())),
                ("expiration_date", prop("string", "New expiration date, ISO-8601 or YYYY-MM-DD.")),
            ],
            &["name"],
        ),
        declare(
            "list_inventory",
            "List what is currently in the kitchen inventory.",
            vec![(
                "location",
                enum_prop("Only list items stored here; omit for everything.", location_values()),
            )],
            &[],
        ),
        declare(
            "add_recipe",
            "Save a new recipe with its ingredients and preparation steps.",
            vec![
                ("name", prop("string", "Recipe name.")),
                ("description", prop("string", "Optional short description.")),
                ("ingredients", prop("array", "Ingredient objects, each with name, quantity and unit.")),
                ("steps", prop("array", "Preparation steps in order.")),
            ],
            &["name", "ingredients", "steps"],
        ),
        declare(
            "get_recipe",
            "Look up a saved recipe by name.",
            vec![("name", prop("string", "Recipe name."))],
            &["name"],
        ),
        declare(
            "list_recipes",
            "List saved recipes, optionally filtered by an ingredient they use.",
            vec![(
                "ingredient",
                prop("string", "Only recipes that use this ingredient; omit for all recipes."),
            )],
            &[],
        ),
        declare(
            "update_recipe",
            "Apply a patch to a saved recipe. Ingredient and step lists in the patch fully replace the existing ones.",
            vec![
                ("name", prop("string", "Recipe name.")),
                (
                    "patch",
                    PropertySchema {
                        properties: Some(
                            [
                                ("description", prop("string", "Replacement description.")),
                                ("ingredients", prop("array", "Replacement ingredient list.")),
                                ("steps", prop("array", "Replacement step list.")),
                            ]
                            .into_iter()
                            .map(|(key, schema)| (key.to_string(), schema))
                            .collect(),
                        ),
                        required: Some(Vec::new()),
                        ..prop("object", "Fields to replace on the recipe.")
                    },
                ),
            ],
            &["name", "patch"],
        ),
        declare(
            "delete_recipe",
            "Delete a saved recipe by name.",
            vec![("name", prop("string", "Recipe name."))],
            &["name"],
        ),
    ]
}

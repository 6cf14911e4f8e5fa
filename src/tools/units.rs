//! Measurement units accepted by inventory and recipe tools.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A canonical measurement unit. Serialized with its canonical string;
/// free-form agent input goes through [`Unit::parse`], which also accepts
/// the declared synonyms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Unit {
    #[serde(rename = "pieces")]
    Pieces,
    #[serde(rename = "g")]
    Grams,
    #[serde(rename = "kg")]
    Kilograms,
    #[serde(rename = "oz")]
    Ounces,
    #[serde(rename = "lbs")]
    Pounds,
    #[serde(rename = "ml")]
    Milliliters,
    #[serde(rename = "l")]
    Liters,
    #[serde(rename = "cups")]
    Cups,
    #[serde(rename = "tbsp")]
    Tablespoons,
    #[serde(rename = "tsp")]
    Teaspoons,
    #[serde(rename = "cloves")]
    Cloves,
    #[serde(rename = "cans")]
    Cans,
}

impl Unit {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Unit::Pieces => "pieces",
            Unit::Grams => "g",
            Unit::Kilograms => "kg",
            Unit::Ounces => "oz",
            Unit::Pounds => "lbs",
            Unit::Milliliters => "ml",
            Unit::Liters => "l",
            Unit::Cups => "cups",
            Unit::Tablespoons => "tbsp",
            Unit::Teaspoons => "tsp",
            Unit::Cloves => "cloves",
            Unit::Cans => "cans",
        }
    }

    /// Parses a unit case- and whitespace-insensitively. Every canonical
    /// string parses to itself; synonyms parse to their canonical unit.
    pub fn parse(raw: &str) -> Option<Unit> {
        match raw.trim().to_lowercase().as_str() {
            "pieces" | "piece" | "pc" | "pcs" | "count" | "item" | "items" | "each" | "whole" => {
                Some(Unit::Pieces)
            }
            "g" | "gram" | "grams" | "gr" => Some(Unit::Grams),
            "kg" | "kgs" | "kilogram" | "kilograms" | "kilo" | "kilos" => Some(Unit::Kilograms),
            "oz" | "ozs" | "ounce" | "ounces" => Some(Unit::Ounces),
            "lbs" | "lb" | "pound" | "pounds" => Some(Unit::Pounds),
            "ml" | "mls" | "milliliter" | "milliliters" | "millilitre" | "millilitres" => {
                Some(Unit::Milliliters)
            }
            "l" | "liter" | "liters" | "litre" | "litres" => Some(Unit::Liters),
            "cups" | "cup" => Some(Unit::Cups),
            "tbsp" | "tbsps" | "tbs" | "tablespoon" | "tablespoons" => Some(Unit::Tablespoons),
            "tsp" | "tsps" | "teaspoon" | "teaspoons" => Some(Unit::Teaspoons),
            "cloves" | "clove" => Some(Unit::Cloves),
            "cans" | "can" | "tin" | "tins" => Some(Unit::Cans),
            _ => None,
        }
    }

    pub const fn all() -> &'static [Unit] {
        &[
            Unit::Pieces,
            Unit::Grams,
            Unit::Kilograms,
            Unit::Ounces,
            Unit::Pounds,
            Unit::Milliliters,
            Unit::Liters,
            Unit::Cups,
            Unit::Tablespoons,
            Unit::Teaspoons,
            Unit::Cloves,
            Unit::Cans,
        ]
    }

    /// Canonical strings joined for handler error messages.
    pub fn valid_list() -> String {
        Unit::all()
            .iter()
            .map(|u| u.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

//! Seed catalog and costing defaults loaded from config.toml
//!
//! The `[[ingredients]]` tables describe ingredients that should exist in a
//! fresh database. Waste is written in percent points (`waste_percent = 10`
//! means 10 %), and allergens or season months may be given either as a list or
//! as a comma-separated string. Seeding only inserts ingredients whose name is
//! not in the database yet.

use crate::{
    core::{
        costing::DEFAULT_TARGET_MARGIN,
        event::DEFAULT_BUDGET_FACTOR,
        ingredient,
        tags::TagSet,
        valuation::{IngredientDraft, WasteRate},
    },
    errors::{Error, Result},
};
use sea_orm::ConnectionTrait;
use serde::Deserialize;
use std::path::Path;
use tracing::{debug, info};

/// Configuration structure representing the entire config.toml file
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    /// Pricing and budgeting defaults
    #[serde(default)]
    pub costing: CostingDefaults,
    /// Ingredients to seed
    #[serde(default)]
    pub ingredients: Vec<CatalogIngredient>,
}

/// Margins and factors used when none is given explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct CostingDefaults {
    /// Target margin for suggested prices, as a fraction
    #[serde(default = "default_target_margin")]
    pub target_margin: f64,
    /// Multiplier from menu cost to suggested event budget
    #[serde(default = "default_budget_factor")]
    pub budget_factor: f64,
}

const fn default_target_margin() -> f64 {
    DEFAULT_TARGET_MARGIN
}

const fn default_budget_factor() -> f64 {
    DEFAULT_BUDGET_FACTOR
}

impl Default for CostingDefaults {
    fn default() -> Self {
        Self {
            target_margin: DEFAULT_TARGET_MARGIN,
            budget_factor: DEFAULT_BUDGET_FACTOR,
        }
    }
}

/// One seed ingredient
#[derive(Debug, Deserialize, Clone)]
pub struct CatalogIngredient {
    /// Name, used to detect existing rows
    pub name: String,
    /// Purchase unit
    pub unit: String,
    /// Price per unit before waste
    pub base_price: f64,
    /// Waste in percent points
    #[serde(default)]
    pub waste_percent: f64,
    /// Current stock
    #[serde(default)]
    pub stock: f64,
    /// Reorder threshold
    #[serde(default)]
    pub stock_minimum: f64,
    /// Month tags; empty means all year
    #[serde(default)]
    pub season: TagSet,
    /// Allergen tags
    #[serde(default)]
    pub allergens: TagSet,
    /// Kilocalories per 100 g
    pub calories: Option<f64>,
    /// Protein per 100 g
    pub protein: Option<f64>,
    /// Carbohydrates per 100 g
    pub carbs: Option<f64>,
    /// Fat per 100 g
    pub fat: Option<f64>,
}

impl CatalogIngredient {
    /// Converts the entry into a draft, turning percent points into a fraction.
    #[must_use]
    pub fn to_draft(&self) -> IngredientDraft {
        IngredientDraft {
            stock: self.stock,
            stock_minimum: self.stock_minimum,
            season: self.season.clone(),
            allergens: self.allergens.clone(),
            calories: self.calories,
            protein: self.protein,
            carbs: self.carbs,
            fat: self.fat,
            ..IngredientDraft::new(
                &self.name,
                &self.unit,
                self.base_price,
                WasteRate::from_percent(self.waste_percent),
            )
        }
    }
}

/// Loads configuration from a TOML file
///
/// # Errors
/// Returns `Error::Config` if the file cannot be read or the TOML is invalid.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config> {
    let contents = std::fs::read_to_string(path.as_ref()).map_err(|e| Error::Config {
        message: format!("Failed to read config file: {e}"),
    })?;

    toml::from_str(&contents).map_err(|e| Error::Config {
        message: format!("Failed to parse config.toml: {e}"),
    })
}

/// Loads configuration from the default location (./config.toml)
pub fn load_default_config() -> Result<Config> {
    load_config("config.toml")
}

/// Inserts catalog ingredients that are missing by name.
///
/// Returns the number of ingredients created. Existing ingredients are never
/// modified.
pub async fn seed_ingredients<C>(db: &C, config: &Config) -> Result<usize>
where
    C: ConnectionTrait,
{
    let mut created = 0;
    for entry in &config.ingredients {
        if ingredient::get_ingredient_by_name(db, &entry.name)
            .await?
            .is_some()
        {
            debug!("Ingredient '{}' already exists, skipping", entry.name);
            continue;
        }
        ingredient::create_ingredient(db, &entry.to_draft()).await?;
        created += 1;
    }
    info!(
        "Seeded {} of {} catalog ingredients",
        created,
        config.ingredients.len()
    );
    Ok(created)
}

//! Ingredient entity - Represents a priced raw material in the kitchen catalog.
//!
//! `net_price` is the waste-adjusted unit price and is always derived from
//! `base_price` and `waste_percent` when the row is written. Allergens and season
//! are stored as canonical JSON lists produced by [`crate::core::tags::TagSet`].

use crate::core::tags::TagSet;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Ingredient database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "ingredients")]
pub struct Model {
    /// Unique identifier for the ingredient
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Name of the ingredient (e.g., "Tomato", "Olive oil")
    pub name: String,
    /// Purchase unit the prices refer to (e.g., "kg", "L", "unit")
    pub unit: String,
    /// Purchase price per unit before waste
    pub base_price: f64,
    /// Trim/spoilage loss as a fraction (0.10 = 10%)
    pub waste_percent: f64,
    /// Waste-adjusted price per unit, derived on every save
    pub net_price: f64,
    /// Quantity currently in stock, in `unit`
    pub stock: f64,
    /// Stock level below which the ingredient should be reordered
    pub stock_minimum: f64,
    /// Canonical JSON list of month tags
    pub season: String,
    /// Canonical JSON list of allergen tags
    pub allergens: String,
    /// Kilocalories per 100 g
    pub calories: Option<f64>,
    /// Protein grams per 100 g
    pub protein: Option<f64>,
    /// Carbohydrate grams per 100 g
    pub carbs: Option<f64>,
    /// Fat grams per 100 g
    pub fat: Option<f64>,
    /// Whether the ingredient can currently be sourced
    pub is_available: bool,
    /// When the ingredient was created
    pub created_at: DateTime,
    /// When the ingredient was last modified
    pub updated_at: DateTime,
}

impl Model {
    /// Allergen tags decoded from storage.
    #[must_use]
    pub fn allergen_tags(&self) -> TagSet {
        TagSet::from_storage(&self.allergens)
    }

    /// Season tags decoded from storage.
    #[must_use]
    pub fn season_tags(&self) -> TagSet {
        TagSet::from_storage(&self.season)
    }

    /// True when stock has fallen below the configured minimum.
    #[must_use]
    pub fn is_low_stock(&self) -> bool {
        self.stock < self.stock_minimum
    }
}

/// Defines relationships between Ingredient and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One ingredient is used by many recipe lines
    #[sea_orm(has_many = "super::recipe_line::Entity")]
    RecipeLines,
}

impl Related<super::recipe_line::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::RecipeLines.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

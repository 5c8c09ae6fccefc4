//! Recipe section entity - A named, ordered grouping of a recipe's lines.
//! Sections are purely organizational and never affect pricing.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Recipe section database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "recipe_sections")]
pub struct Model {
    /// Unique identifier for the section
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Recipe this section belongs to
    pub recipe_id: i64,
    /// Display name (e.g., "Sauce", "Garnish")
    pub name: String,
    /// Position within the recipe, ascending
    pub position: i32,
}

/// Defines relationships between `RecipeSection` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each section belongs to one recipe
    #[sea_orm(
        belongs_to = "super::recipe::Entity",
        from = "Column::RecipeId",
        to = "super::recipe::Column::Id"
    )]
    Recipe,
    /// One section holds many lines
    #[sea_orm(has_many = "super::recipe_line::Entity")]
    Lines,
}

impl Related<super::recipe::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Recipe.def()
    }
}

impl Related<super::recipe_line::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Lines.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

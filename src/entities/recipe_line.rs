//! Recipe line entity - One ingredient used by a recipe.
//!
//! `quantity_per_serving` is expressed in the ingredient's unit for ONE serving.
//! A null `section_id` places the line in the unassigned bucket.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Recipe ingredient line database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "recipe_lines")]
pub struct Model {
    /// Unique identifier for the line
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Recipe this line belongs to
    pub recipe_id: i64,
    /// Ingredient consumed by this line
    pub ingredient_id: i64,
    /// Section holding this line, None for the unassigned bucket
    pub section_id: Option<i64>,
    /// Quantity for one serving, in the ingredient's unit
    pub quantity_per_serving: f64,
    /// Free-form preparation notes
    pub notes: Option<String>,
}

/// Defines relationships between `RecipeLine` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each line belongs to one recipe
    #[sea_orm(
        belongs_to = "super::recipe::Entity",
        from = "Column::RecipeId",
        to = "super::recipe::Column::Id"
    )]
    Recipe,
    /// Each line consumes one ingredient
    #[sea_orm(
        belongs_to = "super::ingredient::Entity",
        from = "Column::IngredientId",
        to = "super::ingredient::Column::Id"
    )]
    Ingredient,
    /// Each line sits in at most one section
    #[sea_orm(
        belongs_to = "super::recipe_section::Entity",
        from = "Column::SectionId",
        to = "super::recipe_section::Column::Id"
    )]
    Section,
}

impl Related<super::recipe::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Recipe.def()
    }
}

impl Related<super::ingredient::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Ingredient.def()
    }
}

impl Related<super::recipe_section::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Section.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

//! Recipe entity - A sellable preparation composed of ingredient lines.
//!
//! `net_price` here is the TOTAL selling price for `servings` diners, not a unit
//! price. Costs and margins are derived, never stored.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Recipe database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "recipes")]
pub struct Model {
    /// Unique identifier for the recipe
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Name of the recipe
    pub name: String,
    /// Number of diners currently planned for
    pub servings: i32,
    /// Minimum batch size at which the recipe is viable to cook
    pub production_servings: i32,
    /// Total selling price for `servings` diners
    pub net_price: f64,
    /// When the recipe was created
    pub created_at: DateTime,
    /// When the recipe was last modified
    pub updated_at: DateTime,
}

/// Defines relationships between Recipe and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One recipe has many ingredient lines
    #[sea_orm(has_many = "super::recipe_line::Entity")]
    Lines,
    /// One recipe has many sections
    #[sea_orm(has_many = "super::recipe_section::Entity")]
    Sections,
    /// One recipe can appear on many event menus
    #[sea_orm(has_many = "super::event_menu_item::Entity")]
    MenuItems,
}

impl Related<super::recipe_line::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Lines.def()
    }
}

impl Related<super::recipe_section::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Sections.def()
    }
}

impl Related<super::event_menu_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::MenuItems.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

//! Event menu item entity - A recipe attached to an event menu.
//!
//! `portions` is the item's own serving count and is independent of the source
//! recipe's `servings`. `cost_per_serving` is captured when the recipe is attached
//! and is only used when the recipe's lines cannot be loaded.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Event menu item database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "event_menu_items")]
pub struct Model {
    /// Unique identifier for the menu item
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Event this item belongs to
    pub event_id: i64,
    /// Source recipe
    pub recipe_id: i64,
    /// Servings of the recipe planned for this event
    pub portions: i32,
    /// Course: `"starter"`, `"main"`, `"side"`, `"dessert"` or `"beverage"`
    pub course_type: String,
    /// Free-form notes for the kitchen
    pub notes: Option<String>,
    /// Recipe cost per serving at attach time
    pub cost_per_serving: f64,
}

/// Defines relationships between `EventMenuItem` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each item belongs to one event
    #[sea_orm(
        belongs_to = "super::event::Entity",
        from = "Column::EventId",
        to = "super::event::Column::Id"
    )]
    Event,
    /// Each item serves one recipe
    #[sea_orm(
        belongs_to = "super::recipe::Entity",
        from = "Column::RecipeId",
        to = "super::recipe::Column::Id"
    )]
    Recipe,
}

impl Related<super::event::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Event.def()
    }
}

impl Related<super::recipe::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Recipe.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

//! Event entity - A catered occasion with a guest count, budget and menu.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Event database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "events")]
pub struct Model {
    /// Unique identifier for the event
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Name of the event (e.g., "Garcia wedding")
    pub name: String,
    /// Number of guests, at least 1
    pub guests_count: i32,
    /// Optional spending limit for the whole menu
    pub budget: Option<f64>,
    /// Lifecycle status: `"draft"`, `"confirmed"`, `"completed"` or `"cancelled"`
    pub status: String,
    /// When the event was created
    pub created_at: DateTime,
    /// When the event was last modified
    pub updated_at: DateTime,
}

/// Defines relationships between Event and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One event has many menu items
    #[sea_orm(has_many = "super::event_menu_item::Entity")]
    MenuItems,
}

impl Related<super::event_menu_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::MenuItems.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

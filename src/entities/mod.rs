//! Entity module - Contains all SeaORM entity definitions for the database.
//! These entities represent the database tables and their relationships.
//! Each entity has a Model struct for data and an Entity struct for operations.

pub mod event;
pub mod event_menu_item;
pub mod ingredient;
pub mod recipe;
pub mod recipe_line;
pub mod recipe_section;
pub mod system_state;

// Re-export specific types to avoid conflicts
pub use event::{Column as EventColumn, Entity as Event, Model as EventModel};
pub use event_menu_item::{
    Column as EventMenuItemColumn, Entity as EventMenuItem, Model as EventMenuItemModel,
};
pub use ingredient::{Column as IngredientColumn, Entity as Ingredient, Model as IngredientModel};
pub use recipe::{Column as RecipeColumn, Entity as Recipe, Model as RecipeModel};
pub use recipe_line::{Column as RecipeLineColumn, Entity as RecipeLine, Model as RecipeLineModel};
pub use recipe_section::{
    Column as RecipeSectionColumn, Entity as RecipeSection, Model as RecipeSectionModel,
};
pub use system_state::{
    Column as SystemStateColumn, Entity as SystemState, Model as SystemStateModel,
};

//! Shared test utilities for the costing engine.
//!
//! This module provides common helper functions for setting up test databases,
//! building in-memory models for pure computations, and creating test entities
//! with sensible defaults.

use crate::{
    core::{
        costing::RecipeHeader,
        ingredient,
        recipe::{self, NewLine},
        valuation::{IngredientDraft, WasteRate},
    },
    entities,
    errors::Result,
};
use sea_orm::DatabaseConnection;

/// Installs a tracing subscriber that writes through the test harness.
///
/// Safe to call from every test; only the first call takes effect.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new("debug"))
        .with_test_writer()
        .try_init();
}

/// Creates an in-memory `SQLite` database with all tables initialized.
/// This is the standard setup for all integration tests.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    init_test_tracing();
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

/// Builds an unsaved ingredient model for pure computations.
///
/// `waste` is a fraction; `net_price` is derived from it.
pub fn ingredient_model(
    id: i64,
    name: &str,
    unit: &str,
    base_price: f64,
    waste: f64,
) -> entities::ingredient::Model {
    entities::ingredient::Model {
        id,
        name: name.to_string(),
        unit: unit.to_string(),
        base_price,
        waste_percent: waste,
        net_price: base_price * (1.0 + waste),
        stock: 0.0,
        stock_minimum: 0.0,
        season: "[]".to_string(),
        allergens: "[]".to_string(),
        calories: None,
        protein: None,
        carbs: None,
        fat: None,
        is_available: true,
        created_at: chrono::NaiveDateTime::default(),
        updated_at: chrono::NaiveDateTime::default(),
    }
}

/// Builds an unsaved recipe line model.
pub fn line_model(
    id: i64,
    recipe_id: i64,
    ingredient_id: i64,
    section_id: Option<i64>,
    quantity_per_serving: f64,
) -> entities::recipe_line::Model {
    entities::recipe_line::Model {
        id,
        recipe_id,
        ingredient_id,
        section_id,
        quantity_per_serving,
        notes: None,
    }
}

/// Builds an unsaved recipe model.
pub fn recipe_model(
    id: i64,
    name: &str,
    servings: i32,
    production_servings: i32,
    net_price: f64,
) -> entities::recipe::Model {
    entities::recipe::Model {
        id,
        name: name.to_string(),
        servings,
        production_servings,
        net_price,
        created_at: chrono::NaiveDateTime::default(),
        updated_at: chrono::NaiveDateTime::default(),
    }
}

/// Creates an ingredient with the given price and waste fraction.
pub async fn create_custom_ingredient(
    db: &DatabaseConnection,
    name: &str,
    unit: &str,
    base_price: f64,
    waste: f64,
) -> Result<entities::ingredient::Model> {
    let draft = IngredientDraft::new(name, unit, base_price, WasteRate::from_fraction(waste));
    ingredient::create_ingredient(db, &draft).await
}

/// Creates a test recipe with sensible defaults.
///
/// # Defaults
/// * `servings`: 10
/// * `production_servings`: 1
/// * `net_price`: 50.0
pub async fn create_test_recipe(
    db: &DatabaseConnection,
    name: &str,
) -> Result<entities::recipe::Model> {
    recipe::create_recipe(
        db,
        &RecipeHeader {
            name: name.to_string(),
            servings: 10,
            production_servings: 1,
            net_price: 50.0,
        },
    )
    .await
}

/// Adds a line to a recipe.
pub async fn create_test_line(
    db: &DatabaseConnection,
    recipe_id: i64,
    ingredient_id: i64,
    section_id: Option<i64>,
    quantity_per_serving: f64,
) -> Result<entities::recipe_line::Model> {
    recipe::add_line(
        db,
        recipe_id,
        NewLine {
            ingredient_id,
            section_id,
            quantity_per_serving,
            notes: None,
        },
    )
    .await
}

/// Sets up a complete test environment with a recipe.
/// Returns (db, recipe) for common test scenarios.
pub async fn setup_with_recipe() -> Result<(DatabaseConnection, entities::recipe::Model)> {
    let db = setup_test_db().await?;
    let recipe = create_test_recipe(&db, "Test Recipe").await?;
    Ok((db, recipe))
}

/// Sets up a test environment with a recipe and one ingredient.
/// Returns (db, recipe, ingredient) for line-related tests.
pub async fn setup_with_recipe_and_ingredient() -> Result<(
    DatabaseConnection,
    entities::recipe::Model,
    entities::ingredient::Model,
)> {
    let db = setup_test_db().await?;
    let recipe = create_test_recipe(&db, "Test Recipe").await?;
    let ingredient = create_custom_ingredient(&db, "Test Ingredient", "kg", 2.0, 0.1).await?;
    Ok((db, recipe, ingredient))
}

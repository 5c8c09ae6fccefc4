//! Ingredient business logic - Handles all ingredient persistence operations.
//!
//! Every create and update recomputes `net_price` from `base_price` and
//! `waste_percent`; callers cannot set it directly. Drafts are validated before
//! any write, so a rejected draft leaves the database untouched.

use crate::{
    core::{
        tags::{TagSet, month_tag},
        valuation::{self, IngredientBook, IngredientDraft, WasteRate},
    },
    entities::{Ingredient, ingredient},
    errors::{Error, FieldErrors, Result},
};
use sea_orm::{QueryOrder, Set, prelude::*};
use tracing::{debug, info};

/// Retrieves all ingredients, ordered alphabetically by name.
pub async fn get_all_ingredients<C>(db: &C) -> Result<Vec<ingredient::Model>>
where
    C: ConnectionTrait,
{
    Ingredient::find()
        .order_by_asc(ingredient::Column::Name)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Finds an ingredient by its unique ID.
pub async fn get_ingredient_by_id<C>(db: &C, ingredient_id: i64) -> Result<Option<ingredient::Model>>
where
    C: ConnectionTrait,
{
    Ingredient::find_by_id(ingredient_id)
        .one(db)
        .await
        .map_err(Into::into)
}

/// Finds an ingredient by exact name.
pub async fn get_ingredient_by_name<C>(db: &C, name: &str) -> Result<Option<ingredient::Model>>
where
    C: ConnectionTrait,
{
    Ingredient::find()
        .filter(ingredient::Column::Name.eq(name))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Loads an immutable snapshot of the given ingredients.
///
/// Ids that do not exist are simply absent from the snapshot; costing reports
/// them as warnings.
pub async fn load_ingredient_book<C>(db: &C, ids: &[i64]) -> Result<IngredientBook>
where
    C: ConnectionTrait,
{
    if ids.is_empty() {
        return Ok(IngredientBook::default());
    }
    let ingredients = Ingredient::find()
        .filter(ingredient::Column::Id.is_in(ids.iter().copied()))
        .all(db)
        .await?;
    Ok(IngredientBook::new(ingredients))
}

/// Ingredients whose stock is below their reorder threshold, by name.
pub async fn get_low_stock_ingredients<C>(db: &C) -> Result<Vec<ingredient::Model>>
where
    C: ConnectionTrait,
{
    let all = get_all_ingredients(db).await?;
    Ok(all.into_iter().filter(ingredient::Model::is_low_stock).collect())
}

/// True when the ingredient lists `month` (1-12) in its season.
///
/// An ingredient without season tags is treated as available all year.
#[must_use]
pub fn is_in_season(ingredient: &ingredient::Model, month: u32) -> bool {
    let season = ingredient.season_tags();
    season.is_empty() || month_tag(month).is_some_and(|tag| season.contains(tag))
}

/// Creates a new ingredient from a validated draft.
///
/// # Errors
/// Returns `Error::Validation` with every failing field when the draft is invalid,
/// or the database error when the insert fails.
pub async fn create_ingredient<C>(db: &C, draft: &IngredientDraft) -> Result<ingredient::Model>
where
    C: ConnectionTrait,
{
    let (base_price, waste) = validated_prices(draft)?;
    let now = chrono::Utc::now().naive_utc();

    let ingredient = ingredient::ActiveModel {
        name: Set(draft.name.trim().to_string()),
        unit: Set(draft.unit.trim().to_string()),
        base_price: Set(base_price),
        waste_percent: Set(waste.fraction()),
        net_price: Set(derived_net_price(base_price, waste)),
        stock: Set(draft.stock),
        stock_minimum: Set(draft.stock_minimum),
        season: Set(draft.season.to_storage()),
        allergens: Set(draft.allergens.to_storage()),
        calories: Set(draft.calories),
        protein: Set(draft.protein),
        carbs: Set(draft.carbs),
        fat: Set(draft.fat),
        is_available: Set(draft.is_available),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };

    let saved = ingredient.insert(db).await?;
    info!(
        "Created ingredient '{}' (ID: {}) net_price {:.4}",
        saved.name, saved.id, saved.net_price
    );
    Ok(saved)
}

/// Replaces an ingredient's editable fields and recalculates its net price.
///
/// # Errors
/// Returns `Error::Validation` for an invalid draft, `Error::IngredientNotFound`
/// when the id is unknown, or the database error.
pub async fn update_ingredient<C>(
    db: &C,
    ingredient_id: i64,
    draft: &IngredientDraft,
) -> Result<ingredient::Model>
where
    C: ConnectionTrait,
{
    let (base_price, waste) = validated_prices(draft)?;

    let mut ingredient: ingredient::ActiveModel = Ingredient::find_by_id(ingredient_id)
        .one(db)
        .await?
        .ok_or(Error::IngredientNotFound { id: ingredient_id })?
        .into();

    ingredient.name = Set(draft.name.trim().to_string());
    ingredient.unit = Set(draft.unit.trim().to_string());
    ingredient.base_price = Set(base_price);
    ingredient.waste_percent = Set(waste.fraction());
    ingredient.net_price = Set(derived_net_price(base_price, waste));
    ingredient.stock = Set(draft.stock);
    ingredient.stock_minimum = Set(draft.stock_minimum);
    ingredient.season = Set(draft.season.to_storage());
    ingredient.allergens = Set(draft.allergens.to_storage());
    ingredient.calories = Set(draft.calories);
    ingredient.protein = Set(draft.protein);
    ingredient.carbs = Set(draft.carbs);
    ingredient.fat = Set(draft.fat);
    ingredient.is_available = Set(draft.is_available);
    ingredient.updated_at = Set(chrono::Utc::now().naive_utc());

    let saved = ingredient.update(db).await?;
    debug!(
        "Updated ingredient {} net_price {:.4}",
        saved.id, saved.net_price
    );
    Ok(saved)
}

/// Updates only the purchase price and waste, recalculating the net price.
pub async fn update_ingredient_pricing<C>(
    db: &C,
    ingredient_id: i64,
    base_price: f64,
    waste: WasteRate,
) -> Result<ingredient::Model>
where
    C: ConnectionTrait,
{
    let existing = Ingredient::find_by_id(ingredient_id)
        .one(db)
        .await?
        .ok_or(Error::IngredientNotFound { id: ingredient_id })?;

    let mut draft = draft_from_model(&existing);
    draft.base_price = Some(base_price);
    draft.waste = Some(waste);
    update_ingredient(db, ingredient_id, &draft).await
}

/// Deletes an ingredient. Fails at the database when recipe lines still use it.
pub async fn delete_ingredient<C>(db: &C, ingredient_id: i64) -> Result<()>
where
    C: ConnectionTrait,
{
    let result = Ingredient::delete_by_id(ingredient_id).exec(db).await?;
    if result.rows_affected == 0 {
        return Err(Error::IngredientNotFound { id: ingredient_id });
    }
    info!("Deleted ingredient {ingredient_id}");
    Ok(())
}

/// Editable view of a stored ingredient.
#[must_use]
pub fn draft_from_model(model: &ingredient::Model) -> IngredientDraft {
    IngredientDraft {
        name: model.name.clone(),
        unit: model.unit.clone(),
        base_price: Some(model.base_price),
        waste: Some(WasteRate::from_fraction(model.waste_percent)),
        stock: model.stock,
        stock_minimum: model.stock_minimum,
        season: TagSet::from_storage(&model.season),
        allergens: TagSet::from_storage(&model.allergens),
        calories: model.calories,
        protein: model.protein,
        carbs: model.carbs,
        fat: model.fat,
        is_available: model.is_available,
    }
}

fn validated_prices(draft: &IngredientDraft) -> Result<(f64, WasteRate)> {
    valuation::validate(draft).into_result()?;
    match (draft.base_price, draft.waste) {
        (Some(base_price), Some(waste)) => Ok((base_price, waste)),
        // validate() already rejects missing prices
        _ => Err(Error::Validation(FieldErrors::single(
            "base_price",
            "Base price is required",
        ))),
    }
}

fn derived_net_price(base_price: f64, waste: WasteRate) -> f64 {
    valuation::compute_net_price(Some(base_price), Some(waste.fraction())).unwrap_or(base_price)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::test_utils::*;
    use sea_orm::{DatabaseBackend, MockDatabase};

    #[tokio::test]
    async fn test_create_ingredient_validation_blocks_write() -> Result<()> {
        // No results queued: any query would fail, so validation must run first
        let db = MockDatabase::new(DatabaseBackend::Sqlite).into_connection();

        let draft = IngredientDraft {
            name: String::new(),
            unit: "kg".to_string(),
            base_price: Some(-2.0),
            waste: Some(WasteRate::from_fraction(0.1)),
            ..IngredientDraft::default()
        };
        let err = create_ingredient(&db, &draft).await.unwrap_err();
        let fields = err.field_errors().unwrap();
        assert!(fields.get("name").is_some());
        assert!(fields.get("base_price").is_some());
        assert!(db.into_transaction_log().is_empty());

        Ok(())
    }

    #[tokio::test]
    async fn test_create_ingredient_derives_net_price() -> Result<()> {
        let db = setup_test_db().await?;

        let ingredient = create_custom_ingredient(&db, "Tomato", "kg", 2.00, 0.10).await?;

        assert_eq!(ingredient.name, "Tomato");
        assert!((ingredient.net_price - 2.20).abs() < 1e-6);

        let retrieved = get_ingredient_by_id(&db, ingredient.id).await?.unwrap();
        assert!((retrieved.net_price - 2.20).abs() < 1e-6);

        Ok(())
    }

    #[tokio::test]
    async fn test_update_pricing_recalculates_net_price() -> Result<()> {
        let db = setup_test_db().await?;
        let ingredient = create_custom_ingredient(&db, "Butter", "kg", 8.0, 0.0).await?;
        assert_eq!(ingredient.net_price, 8.0);

        let updated =
            update_ingredient_pricing(&db, ingredient.id, 10.0, WasteRate::from_percent(5.0))
                .await?;
        assert!((updated.net_price - 10.5).abs() < 1e-6);
        assert!((updated.waste_percent - 0.05).abs() < 1e-12);
        assert_eq!(updated.name, "Butter");

        Ok(())
    }

    #[tokio::test]
    async fn test_update_ingredient_not_found() -> Result<()> {
        let db = setup_test_db().await?;
        let draft = IngredientDraft::new("Ghost", "kg", 1.0, WasteRate::default());

        let result = update_ingredient(&db, 999, &draft).await;
        assert!(matches!(
            result.unwrap_err(),
            Error::IngredientNotFound { id: 999 }
        ));

        Ok(())
    }

    #[tokio::test]
    async fn test_preview_is_replaced_by_stored_value() -> Result<()> {
        let db = setup_test_db().await?;
        let draft = IngredientDraft::new("Flour", "kg", 1.0, WasteRate::from_percent(2.0));

        let preview = draft.preview_net_price();
        assert!(!preview.is_final());

        let saved = create_ingredient(&db, &draft).await?;
        let settled = preview.settle(Some(saved.net_price));
        assert!(settled.is_final());
        assert_eq!(settled.value(), Some(saved.net_price));

        Ok(())
    }

    #[tokio::test]
    async fn test_tags_are_stored_canonically() -> Result<()> {
        let db = setup_test_db().await?;
        let mut draft = IngredientDraft::new("Milk", "L", 1.2, WasteRate::default());
        draft.allergens = TagSet::parse("Lactose, milk");
        draft.season = TagSet::parse(r#"["JAN","feb"]"#);

        let saved = create_ingredient(&db, &draft).await?;
        assert_eq!(saved.allergens, r#"["lactose","milk"]"#);
        assert!(saved.allergen_tags().contains("milk"));
        assert!(is_in_season(&saved, 1));
        assert!(!is_in_season(&saved, 7));

        Ok(())
    }

    #[tokio::test]
    async fn test_low_stock_ingredients() -> Result<()> {
        let db = setup_test_db().await?;

        let mut low = IngredientDraft::new("Saffron", "g", 9.0, WasteRate::default());
        low.stock = 2.0;
        low.stock_minimum = 5.0;
        create_ingredient(&db, &low).await?;

        let mut plenty = IngredientDraft::new("Salt", "kg", 0.5, WasteRate::default());
        plenty.stock = 20.0;
        plenty.stock_minimum = 1.0;
        create_ingredient(&db, &plenty).await?;

        let low_stock = get_low_stock_ingredients(&db).await?;
        assert_eq!(low_stock.len(), 1);
        assert_eq!(low_stock[0].name, "Saffron");

        Ok(())
    }

    #[tokio::test]
    async fn test_load_ingredient_book_skips_unknown_ids() -> Result<()> {
        let db = setup_test_db().await?;
        let tomato = create_custom_ingredient(&db, "Tomato", "kg", 2.0, 0.1).await?;

        let book = load_ingredient_book(&db, &[tomato.id, 4242]).await?;
        assert_eq!(book.len(), 1);
        assert!(book.get(tomato.id).is_some());
        assert!(book.get(4242).is_none());

        Ok(())
    }

    #[tokio::test]
    async fn test_delete_ingredient() -> Result<()> {
        let db = setup_test_db().await?;
        let ingredient = create_custom_ingredient(&db, "Basil", "unit", 0.3, 0.0).await?;

        delete_ingredient(&db, ingredient.id).await?;
        assert!(get_ingredient_by_id(&db, ingredient.id).await?.is_none());

        let again = delete_ingredient(&db, ingredient.id).await;
        assert!(matches!(again.unwrap_err(), Error::IngredientNotFound { .. }));

        Ok(())
    }
}

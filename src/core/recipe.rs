//! Recipe business logic - composition, persistence and the editing workflow.
//!
//! Recipes are validated at save time (`servings >= production_servings`). A
//! brand-new recipe can be composed in memory through [`RecipeEditor`]; its
//! buffered sections and lines are flushed on first save as a sequence of
//! independent create calls whose outcomes are reported one by one.

use crate::{
    core::{
        costing::{self, PortionedLine, RecipeCosting, RecipeHeader},
        ingredient,
        nutrition::{self, NutritionFacts},
        saga::{Saga, SagaReport},
        section::{self, LineGroup},
        tags::TagSet,
        valuation::IngredientBook,
    },
    entities::{
        EventMenuItem, Ingredient, Recipe, RecipeLine, RecipeSection, event_menu_item, recipe,
        recipe_line, recipe_section,
    },
    errors::{Error, FieldErrors, Result},
};
use sea_orm::{PaginatorTrait, QueryOrder, Set, TransactionTrait, prelude::*};
use tracing::{debug, info, warn};

/// Retrieves all recipes, ordered alphabetically by name.
pub async fn get_all_recipes<C>(db: &C) -> Result<Vec<recipe::Model>>
where
    C: ConnectionTrait,
{
    Recipe::find()
        .order_by_asc(recipe::Column::Name)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Finds a recipe by its unique ID.
pub async fn get_recipe_by_id<C>(db: &C, recipe_id: i64) -> Result<Option<recipe::Model>>
where
    C: ConnectionTrait,
{
    Recipe::find_by_id(recipe_id)
        .one(db)
        .await
        .map_err(Into::into)
}

/// Retrieves a recipe's lines in creation order.
pub async fn get_lines_for_recipe<C>(db: &C, recipe_id: i64) -> Result<Vec<recipe_line::Model>>
where
    C: ConnectionTrait,
{
    RecipeLine::find()
        .filter(recipe_line::Column::RecipeId.eq(recipe_id))
        .order_by_asc(recipe_line::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Creates a recipe after save-time validation.
///
/// # Errors
/// `Error::Validation` when the header breaks a rule; nothing is written.
pub async fn create_recipe<C>(db: &C, header: &RecipeHeader) -> Result<recipe::Model>
where
    C: ConnectionTrait,
{
    costing::validate_recipe(header).into_result()?;
    let now = chrono::Utc::now().naive_utc();

    let recipe = recipe::ActiveModel {
        name: Set(header.name.trim().to_string()),
        servings: Set(header.servings),
        production_servings: Set(header.production_servings),
        net_price: Set(header.net_price),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };
    let saved = recipe.insert(db).await?;
    info!("Created recipe '{}' (ID: {})", saved.name, saved.id);
    Ok(saved)
}

/// Replaces a recipe's header fields after save-time validation.
pub async fn update_recipe<C>(db: &C, recipe_id: i64, header: &RecipeHeader) -> Result<recipe::Model>
where
    C: ConnectionTrait,
{
    costing::validate_recipe(header).into_result()?;

    let mut recipe: recipe::ActiveModel = Recipe::find_by_id(recipe_id)
        .one(db)
        .await?
        .ok_or(Error::RecipeNotFound { id: recipe_id })?
        .into();
    recipe.name = Set(header.name.trim().to_string());
    recipe.servings = Set(header.servings);
    recipe.production_servings = Set(header.production_servings);
    recipe.net_price = Set(header.net_price);
    recipe.updated_at = Set(chrono::Utc::now().naive_utc());

    let saved = recipe.update(db).await?;
    debug!("Updated recipe {}", saved.id);
    Ok(saved)
}

/// Rescales a recipe to a new number of diners.
///
/// Line quantities are per serving, so costs follow automatically. The selling
/// price is left as is.
pub async fn set_servings<C>(db: &C, recipe_id: i64, servings: i32) -> Result<recipe::Model>
where
    C: ConnectionTrait,
{
    let existing = Recipe::find_by_id(recipe_id)
        .one(db)
        .await?
        .ok_or(Error::RecipeNotFound { id: recipe_id })?;
    let header = RecipeHeader {
        servings,
        ..RecipeHeader::from(&existing)
    };
    update_recipe(db, recipe_id, &header).await
}

/// Deletes a recipe with its sections and lines in one database transaction.
///
/// # Errors
/// `Error::Validation` while an event menu still uses the recipe.
pub async fn delete_recipe(db: &DatabaseConnection, recipe_id: i64) -> Result<()> {
    let txn = db.begin().await?;

    let recipe = Recipe::find_by_id(recipe_id)
        .one(&txn)
        .await?
        .ok_or(Error::RecipeNotFound { id: recipe_id })?;

    let menu_uses = EventMenuItem::find()
        .filter(event_menu_item::Column::RecipeId.eq(recipe_id))
        .count(&txn)
        .await?;
    if menu_uses > 0 {
        return Err(Error::Validation(FieldErrors::single(
            "recipe",
            format!("Recipe is used by {menu_uses} event menu items"),
        )));
    }

    RecipeLine::delete_many()
        .filter(recipe_line::Column::RecipeId.eq(recipe_id))
        .exec(&txn)
        .await?;
    RecipeSection::delete_many()
        .filter(recipe_section::Column::RecipeId.eq(recipe_id))
        .exec(&txn)
        .await?;
    recipe.delete(&txn).await?;

    txn.commit().await?;
    info!("Deleted recipe {recipe_id}");
    Ok(())
}

/// Input for a new recipe line.
#[derive(Debug, Clone, PartialEq)]
pub struct NewLine {
    /// Ingredient consumed
    pub ingredient_id: i64,
    /// Target section, None for unassigned
    pub section_id: Option<i64>,
    /// Quantity for one serving
    pub quantity_per_serving: f64,
    /// Preparation notes
    pub notes: Option<String>,
}

/// Adds an ingredient line to a persisted recipe.
///
/// # Errors
/// `Error::Validation` for a non-positive quantity; not-found errors for an
/// unknown recipe, ingredient, or a section outside this recipe.
pub async fn add_line<C>(db: &C, recipe_id: i64, line: NewLine) -> Result<recipe_line::Model>
where
    C: ConnectionTrait,
{
    costing::validate_line_quantity(line.quantity_per_serving).into_result()?;

    Recipe::find_by_id(recipe_id)
        .one(db)
        .await?
        .ok_or(Error::RecipeNotFound { id: recipe_id })?;
    Ingredient::find_by_id(line.ingredient_id)
        .one(db)
        .await?
        .ok_or(Error::IngredientNotFound {
            id: line.ingredient_id,
        })?;
    if let Some(section_id) = line.section_id {
        RecipeSection::find_by_id(section_id)
            .one(db)
            .await?
            .filter(|s| s.recipe_id == recipe_id)
            .ok_or(Error::SectionNotFound { id: section_id })?;
    }

    let active = recipe_line::ActiveModel {
        recipe_id: Set(recipe_id),
        ingredient_id: Set(line.ingredient_id),
        section_id: Set(line.section_id),
        quantity_per_serving: Set(line.quantity_per_serving),
        notes: Set(line.notes),
        ..Default::default()
    };
    let saved = active.insert(db).await?;
    debug!(
        "Added line {} (ingredient {}) to recipe {}",
        saved.id, saved.ingredient_id, recipe_id
    );
    Ok(saved)
}

/// Changes a line's quantity and notes.
pub async fn update_line<C>(
    db: &C,
    line_id: i64,
    quantity_per_serving: f64,
    notes: Option<String>,
) -> Result<recipe_line::Model>
where
    C: ConnectionTrait,
{
    costing::validate_line_quantity(quantity_per_serving).into_result()?;

    let mut line: recipe_line::ActiveModel = RecipeLine::find_by_id(line_id)
        .one(db)
        .await?
        .ok_or(Error::LineNotFound { id: line_id })?
        .into();
    line.quantity_per_serving = Set(quantity_per_serving);
    line.notes = Set(notes);
    line.update(db).await.map_err(Into::into)
}

/// Removes a line from its recipe.
pub async fn remove_line<C>(db: &C, line_id: i64) -> Result<()>
where
    C: ConnectionTrait,
{
    let result = RecipeLine::delete_by_id(line_id).exec(db).await?;
    if result.rows_affected == 0 {
        return Err(Error::LineNotFound { id: line_id });
    }
    Ok(())
}

/// A recipe with its sections, lines and the ingredients they use.
#[derive(Debug, Clone)]
pub struct RecipeSnapshot {
    /// The recipe header
    pub recipe: recipe::Model,
    /// Sections in declared order
    pub sections: Vec<recipe_section::Model>,
    /// Lines in creation order
    pub lines: Vec<recipe_line::Model>,
    /// Ingredient master data for this compute pass
    pub ingredients: IngredientBook,
}

impl RecipeSnapshot {
    /// Cost, margin and suggested price at the recipe's servings.
    #[must_use]
    pub fn costing(&self, target_margin: f64) -> RecipeCosting {
        costing::cost_recipe(&self.recipe, &self.lines, &self.ingredients, target_margin)
    }

    /// Nutrition for the whole batch.
    #[must_use]
    pub fn nutrition(&self) -> NutritionFacts {
        nutrition::recipe_nutrition(&self.lines, &self.ingredients, self.recipe.servings)
    }

    /// Lines grouped for display.
    #[must_use]
    pub fn groups(&self) -> Vec<LineGroup<recipe_line::Model>> {
        section::group_lines(&self.sections, &self.lines)
    }

    /// Union of the allergens of every ingredient used.
    #[must_use]
    pub fn allergens(&self) -> TagSet {
        let mut tags = TagSet::new();
        for line in &self.lines {
            if let Some(ingredient) = self.ingredients.get(line.ingredient_id) {
                tags.extend(&ingredient.allergen_tags());
            }
        }
        tags
    }
}

/// Loads a recipe with everything needed to cost it.
pub async fn load_recipe_snapshot<C>(db: &C, recipe_id: i64) -> Result<RecipeSnapshot>
where
    C: ConnectionTrait,
{
    let recipe = Recipe::find_by_id(recipe_id)
        .one(db)
        .await?
        .ok_or(Error::RecipeNotFound { id: recipe_id })?;
    let sections = section::get_sections_for_recipe(db, recipe_id).await?;
    let lines = get_lines_for_recipe(db, recipe_id).await?;

    let mut ids: Vec<i64> = lines.iter().map(|l| l.ingredient_id).collect();
    ids.sort_unstable();
    ids.dedup();
    let ingredients = ingredient::load_ingredient_book(db, &ids).await?;

    Ok(RecipeSnapshot {
        recipe,
        sections,
        lines,
        ingredients,
    })
}

/// Where a recipe under edit currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditorState {
    /// Read-only display
    Viewing,
    /// Fields may change
    Editing,
    /// A save is pending
    Saving,
}

impl EditorState {
    const fn label(self) -> &'static str {
        match self {
            Self::Viewing => "viewing",
            Self::Editing => "editing",
            Self::Saving => "saving",
        }
    }
}

/// A line buffered in memory before its recipe exists.
#[derive(Debug, Clone, PartialEq)]
pub struct DraftLine {
    /// Ingredient consumed
    pub ingredient_id: i64,
    /// Quantity for one serving
    pub quantity_per_serving: f64,
    /// Preparation notes
    pub notes: Option<String>,
    /// Index into the editor's draft sections, None for unassigned
    pub section: Option<usize>,
}

impl PortionedLine for DraftLine {
    fn ingredient_id(&self) -> i64 {
        self.ingredient_id
    }

    fn quantity_per_serving(&self) -> f64 {
        self.quantity_per_serving
    }
}

/// Per-step outcome of flushing a draft recipe.
#[derive(Debug)]
pub struct DraftFlushReport {
    /// One outcome per buffered section, in order
    pub sections: SagaReport<String, recipe_section::Model>,
    /// One outcome per buffered line, in order
    pub lines: SagaReport<DraftLine, recipe_line::Model>,
}

impl DraftFlushReport {
    /// True when every section and line was created.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.sections.is_complete() && self.lines.is_complete()
    }
}

/// Result of a successful save.
#[derive(Debug)]
pub struct SaveOutcome {
    /// The persisted recipe
    pub recipe: recipe::Model,
    /// Present only for the first save of a new recipe
    pub flush: Option<DraftFlushReport>,
}

/// Drives a recipe through `Viewing → Editing → Saving → Viewing`.
///
/// A validation failure while saving returns the editor to `Editing` with the
/// field errors attached and nothing persisted. A save requested while another
/// is pending is rejected with `Error::SaveInProgress`.
#[derive(Debug, Clone)]
pub struct RecipeEditor {
    recipe_id: Option<i64>,
    /// Header fields being edited
    pub header: RecipeHeader,
    draft_sections: Vec<String>,
    draft_lines: Vec<DraftLine>,
    state: EditorState,
    errors: FieldErrors,
}

impl RecipeEditor {
    /// Starts composing a brand-new recipe (draft mode, already editing).
    #[must_use]
    pub fn new_recipe(header: RecipeHeader) -> Self {
        Self {
            recipe_id: None,
            header,
            draft_sections: Vec::new(),
            draft_lines: Vec::new(),
            state: EditorState::Editing,
            errors: FieldErrors::new(),
        }
    }

    /// Opens a persisted recipe for viewing.
    #[must_use]
    pub fn for_recipe(recipe: &recipe::Model) -> Self {
        Self {
            recipe_id: Some(recipe.id),
            header: RecipeHeader::from(recipe),
            draft_sections: Vec::new(),
            draft_lines: Vec::new(),
            state: EditorState::Viewing,
            errors: FieldErrors::new(),
        }
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> EditorState {
        self.state
    }

    /// Errors from the last rejected save.
    #[must_use]
    pub const fn errors(&self) -> &FieldErrors {
        &self.errors
    }

    /// Id of the persisted recipe, None in draft mode.
    #[must_use]
    pub const fn recipe_id(&self) -> Option<i64> {
        self.recipe_id
    }

    /// True until the first successful save.
    #[must_use]
    pub const fn is_draft(&self) -> bool {
        self.recipe_id.is_none()
    }

    /// Buffered lines (draft mode only).
    #[must_use]
    pub fn draft_lines(&self) -> &[DraftLine] {
        &self.draft_lines
    }

    /// Buffered section names (draft mode only).
    #[must_use]
    pub fn draft_sections(&self) -> &[String] {
        &self.draft_sections
    }

    /// `Viewing → Editing`. Re-entering `Editing` is a no-op.
    pub fn begin_edit(&mut self) -> Result<()> {
        match self.state {
            EditorState::Viewing | EditorState::Editing => {
                self.state = EditorState::Editing;
                Ok(())
            }
            EditorState::Saving => Err(self.invalid("edit")),
        }
    }

    /// Buffers a section in draft mode and returns its draft index.
    pub fn add_draft_section(&mut self, name: &str) -> Result<usize> {
        self.require_draft_editing("add a draft section")?;
        if name.trim().is_empty() {
            return Err(Error::Validation(FieldErrors::single(
                "name",
                "Section name is required",
            )));
        }
        self.draft_sections.push(name.trim().to_string());
        Ok(self.draft_sections.len() - 1)
    }

    /// Buffers a line in draft mode.
    pub fn add_draft_line(&mut self, line: DraftLine) -> Result<()> {
        self.require_draft_editing("add a draft line")?;
        costing::validate_line_quantity(line.quantity_per_serving).into_result()?;
        if let Some(index) = line.section {
            if index >= self.draft_sections.len() {
                return Err(Error::Validation(FieldErrors::single(
                    "section",
                    format!("Draft section {index} does not exist"),
                )));
            }
        }
        self.draft_lines.push(line);
        Ok(())
    }

    /// Cost preview of the draft against an ingredient snapshot.
    #[must_use]
    pub fn preview_costing(&self, book: &IngredientBook, target_margin: f64) -> RecipeCosting {
        let preview = recipe::Model {
            id: self.recipe_id.unwrap_or_default(),
            name: self.header.name.clone(),
            servings: self.header.servings,
            production_servings: self.header.production_servings,
            net_price: self.header.net_price,
            created_at: chrono::NaiveDateTime::default(),
            updated_at: chrono::NaiveDateTime::default(),
        };
        costing::cost_recipe(&preview, &self.draft_lines, book, target_margin)
    }

    /// `Editing → Saving` after validation.
    ///
    /// # Errors
    /// `Error::SaveInProgress` while saving; `Error::InvalidTransition` from
    /// `Viewing`; `Error::Validation` (state stays `Editing`, errors attached).
    pub fn begin_save(&mut self) -> Result<()> {
        match self.state {
            EditorState::Saving => return Err(Error::SaveInProgress),
            EditorState::Viewing => return Err(self.invalid("save")),
            EditorState::Editing => {}
        }

        let errors = costing::validate_recipe(&self.header);
        if !errors.is_empty() {
            debug!("Recipe save rejected: {errors}");
            self.errors = errors.clone();
            return Err(Error::Validation(errors));
        }

        self.errors = FieldErrors::new();
        self.state = EditorState::Saving;
        Ok(())
    }

    /// `Saving → Viewing` once the recipe is persisted.
    pub fn finish_save(&mut self, recipe_id: i64) -> Result<()> {
        if self.state != EditorState::Saving {
            return Err(self.invalid("finish a save"));
        }
        self.recipe_id = Some(recipe_id);
        self.draft_sections.clear();
        self.draft_lines.clear();
        self.state = EditorState::Viewing;
        Ok(())
    }

    /// `Saving → Editing` after the persistence call failed. Drafts are kept.
    pub fn abort_save(&mut self) -> Result<()> {
        if self.state != EditorState::Saving {
            return Err(self.invalid("abort a save"));
        }
        self.state = EditorState::Editing;
        Ok(())
    }

    /// Validates and persists the recipe.
    ///
    /// For a new recipe the buffered sections and lines are flushed afterwards,
    /// in order, each as its own create call; individual failures are reported
    /// in [`SaveOutcome::flush`] and do not undo the recipe.
    pub async fn save<C>(&mut self, db: &C) -> Result<SaveOutcome>
    where
        C: ConnectionTrait,
    {
        self.begin_save()?;

        let persisted = match self.recipe_id {
            Some(id) => update_recipe(db, id, &self.header).await,
            None => create_recipe(db, &self.header).await,
        };
        let recipe = match persisted {
            Ok(recipe) => recipe,
            Err(e) => {
                self.abort_save()?;
                return Err(e);
            }
        };

        let flush = if self.is_draft() {
            let sections = std::mem::take(&mut self.draft_sections);
            let lines = std::mem::take(&mut self.draft_lines);
            Some(flush_draft(db, recipe.id, sections, lines).await)
        } else {
            None
        };

        self.finish_save(recipe.id)?;
        Ok(SaveOutcome { recipe, flush })
    }

    fn require_draft_editing(&self, action: &'static str) -> Result<()> {
        if self.state != EditorState::Editing || !self.is_draft() {
            return Err(self.invalid(action));
        }
        Ok(())
    }

    const fn invalid(&self, action: &'static str) -> Error {
        Error::InvalidTransition {
            state: self.state.label(),
            action,
        }
    }
}

/// Creates buffered sections, then buffered lines, one call at a time.
///
/// A line whose draft section failed to be created is added to the unassigned
/// bucket rather than dropped.
pub async fn flush_draft<C>(
    db: &C,
    recipe_id: i64,
    sections: Vec<String>,
    lines: Vec<DraftLine>,
) -> DraftFlushReport
where
    C: ConnectionTrait,
{
    let section_report = Saga::with_steps("draft sections", sections)
        .run(|name| async move { section::create_section(db, recipe_id, &name).await })
        .await;

    let mut section_ids: Vec<Option<i64>> = vec![None; section_report.outcomes.len()];
    for outcome in &section_report.outcomes {
        section_ids[outcome.index] = outcome.result.as_ref().ok().map(|s| s.id);
    }

    let line_report = Saga::with_steps("draft lines", lines)
        .run(|line| {
            let section_id = line.section.and_then(|index| {
                let id = section_ids.get(index).copied().flatten();
                if id.is_none() {
                    warn!("Draft section {index} was not created; line goes to unassigned");
                }
                id
            });
            async move {
                add_line(
                    db,
                    recipe_id,
                    NewLine {
                        ingredient_id: line.ingredient_id,
                        section_id,
                        quantity_per_serving: line.quantity_per_serving,
                        notes: line.notes,
                    },
                )
                .await
            }
        })
        .await;

    DraftFlushReport {
        sections: section_report,
        lines: line_report,
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::core::{costing::DEFAULT_TARGET_MARGIN, section::GroupKind};
    use crate::test_utils::*;
    use sea_orm::{DatabaseBackend, MockDatabase};

    fn header(name: &str, servings: i32, production_servings: i32, net_price: f64) -> RecipeHeader {
        RecipeHeader {
            name: name.to_string(),
            servings,
            production_servings,
            net_price,
        }
    }

    fn draft_line(ingredient_id: i64, quantity: f64, section: Option<usize>) -> DraftLine {
        DraftLine {
            ingredient_id,
            quantity_per_serving: quantity,
            notes: None,
            section,
        }
    }

    #[tokio::test]
    async fn test_create_recipe_validation_blocks_write() -> Result<()> {
        let db = MockDatabase::new(DatabaseBackend::Sqlite).into_connection();

        let result = create_recipe(&db, &header("Paella", 4, 6, 80.0)).await;
        let err = result.unwrap_err();
        assert!(err.field_errors().unwrap().get("servings").is_some());
        assert!(db.into_transaction_log().is_empty());

        Ok(())
    }

    #[tokio::test]
    async fn test_snapshot_costing_scenario() -> Result<()> {
        let db = setup_test_db().await?;
        let tomato = create_custom_ingredient(&db, "Tomato", "kg", 2.00, 0.10).await?;
        let recipe = create_recipe(&db, &header("Salad", 10, 1, 50.00)).await?;
        create_test_line(&db, recipe.id, tomato.id, None, 0.2).await?;

        let costing = load_recipe_snapshot(&db, recipe.id)
            .await?
            .costing(DEFAULT_TARGET_MARGIN);
        assert!((costing.total_cost - 4.40).abs() < 1e-6);
        assert!((costing.margin - 45.60).abs() < 1e-6);
        assert!((costing.margin_percent - 91.2).abs() < 1e-6);

        Ok(())
    }

    #[tokio::test]
    async fn test_reload_keeps_cost_unchanged() -> Result<()> {
        let db = setup_test_db().await?;
        let tomato = create_custom_ingredient(&db, "Tomato", "kg", 2.00, 0.10).await?;
        let oil = create_custom_ingredient(&db, "Oil", "L", 9.0, 0.02).await?;
        let recipe = create_recipe(&db, &header("Bruschetta", 8, 4, 40.0)).await?;
        let sauce = crate::core::section::create_section(&db, recipe.id, "Sauce").await?;
        create_test_line(&db, recipe.id, tomato.id, Some(sauce.id), 0.15).await?;
        create_test_line(&db, recipe.id, oil.id, None, 0.01).await?;

        let first = load_recipe_snapshot(&db, recipe.id).await?;
        update_recipe(&db, recipe.id, &RecipeHeader::from(&first.recipe)).await?;
        let second = load_recipe_snapshot(&db, recipe.id).await?;

        assert_eq!(
            first.costing(DEFAULT_TARGET_MARGIN).total_cost,
            second.costing(DEFAULT_TARGET_MARGIN).total_cost
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_set_servings_doubles_cost() -> Result<()> {
        let db = setup_test_db().await?;
        let tomato = create_custom_ingredient(&db, "Tomato", "kg", 2.00, 0.10).await?;
        let recipe = create_recipe(&db, &header("Salad", 5, 2, 30.0)).await?;
        create_test_line(&db, recipe.id, tomato.id, None, 0.2).await?;

        let before = load_recipe_snapshot(&db, recipe.id).await?.costing(0.4).total_cost;
        set_servings(&db, recipe.id, 10).await?;
        let after = load_recipe_snapshot(&db, recipe.id).await?.costing(0.4).total_cost;
        assert!((after - 2.0 * before).abs() < 1e-9);

        // Below the production batch is rejected
        let err = set_servings(&db, recipe.id, 1).await.unwrap_err();
        assert!(err.field_errors().unwrap().get("servings").is_some());

        Ok(())
    }

    #[tokio::test]
    async fn test_add_line_validation() -> Result<()> {
        let (db, recipe, ingredient) = setup_with_recipe_and_ingredient().await?;

        let zero = create_test_line(&db, recipe.id, ingredient.id, None, 0.0).await;
        assert!(zero.unwrap_err().field_errors().is_some());

        let unknown = create_test_line(&db, recipe.id, 999, None, 0.1).await;
        assert!(matches!(unknown.unwrap_err(), Error::IngredientNotFound { id: 999 }));

        let bad_section = create_test_line(&db, recipe.id, ingredient.id, Some(42), 0.1).await;
        assert!(matches!(bad_section.unwrap_err(), Error::SectionNotFound { id: 42 }));

        Ok(())
    }

    #[tokio::test]
    async fn test_update_and_remove_line() -> Result<()> {
        let (db, recipe, ingredient) = setup_with_recipe_and_ingredient().await?;
        let line = create_test_line(&db, recipe.id, ingredient.id, None, 0.2).await?;

        let updated = update_line(&db, line.id, 0.3, Some("diced".to_string())).await?;
        assert_eq!(updated.quantity_per_serving, 0.3);
        assert_eq!(updated.notes.as_deref(), Some("diced"));

        remove_line(&db, line.id).await?;
        assert!(get_lines_for_recipe(&db, recipe.id).await?.is_empty());
        assert!(matches!(
            remove_line(&db, line.id).await.unwrap_err(),
            Error::LineNotFound { .. }
        ));

        Ok(())
    }

    #[tokio::test]
    async fn test_delete_recipe_removes_children() -> Result<()> {
        let (db, recipe, ingredient) = setup_with_recipe_and_ingredient().await?;
        let sauce = crate::core::section::create_section(&db, recipe.id, "Sauce").await?;
        create_test_line(&db, recipe.id, ingredient.id, Some(sauce.id), 0.2).await?;

        delete_recipe(&db, recipe.id).await?;
        assert!(get_recipe_by_id(&db, recipe.id).await?.is_none());
        assert!(get_lines_for_recipe(&db, recipe.id).await?.is_empty());
        assert!(
            crate::core::section::get_sections_for_recipe(&db, recipe.id)
                .await?
                .is_empty()
        );

        Ok(())
    }

    #[test]
    fn test_editor_validation_returns_to_editing() {
        let mut editor = RecipeEditor::new_recipe(header("Paella", 4, 6, 80.0));
        assert_eq!(editor.state(), EditorState::Editing);

        let err = editor.begin_save().unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert_eq!(editor.state(), EditorState::Editing);
        assert!(editor.errors().get("servings").is_some());

        editor.header.servings = 6;
        editor.begin_save().unwrap();
        assert_eq!(editor.state(), EditorState::Saving);
        assert!(editor.errors().is_empty());
    }

    #[test]
    fn test_editor_rejects_reentrant_save() {
        let mut editor = RecipeEditor::new_recipe(header("Soup", 4, 1, 20.0));
        editor.begin_save().unwrap();
        assert!(matches!(editor.begin_save(), Err(Error::SaveInProgress)));
        assert!(matches!(
            editor.begin_edit(),
            Err(Error::InvalidTransition { .. })
        ));

        editor.finish_save(7).unwrap();
        assert_eq!(editor.state(), EditorState::Viewing);
        assert_eq!(editor.recipe_id(), Some(7));
        assert!(matches!(
            editor.begin_save(),
            Err(Error::InvalidTransition { .. })
        ));
    }

    #[test]
    fn test_editor_draft_buffers_only_in_draft_mode() {
        let mut editor = RecipeEditor::new_recipe(header("Soup", 4, 1, 20.0));
        let base = editor.add_draft_section("Base").unwrap();
        editor.add_draft_line(draft_line(1, 0.2, Some(base))).unwrap();
        assert!(editor.add_draft_line(draft_line(1, 0.2, Some(9))).is_err());
        assert!(editor.add_draft_line(draft_line(1, -1.0, None)).is_err());
        assert_eq!(editor.draft_lines().len(), 1);

        let book = IngredientBook::new([ingredient_model(1, "Leek", "kg", 3.0, 0.0)]);
        let preview = editor.preview_costing(&book, DEFAULT_TARGET_MARGIN);
        assert!((preview.total_cost - 2.4).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_first_save_flushes_draft_with_partial_failures() -> Result<()> {
        let db = setup_test_db().await?;
        let leek = create_custom_ingredient(&db, "Leek", "kg", 3.0, 0.1).await?;
        let potato = create_custom_ingredient(&db, "Potato", "kg", 1.0, 0.2).await?;

        let mut editor = RecipeEditor::new_recipe(header("Vichyssoise", 6, 4, 36.0));
        let base = editor.add_draft_section("Base")?;
        editor.add_draft_line(draft_line(leek.id, 0.1, Some(base)))?;
        editor.add_draft_line(draft_line(999, 0.1, None))?; // unknown ingredient
        editor.add_draft_line(draft_line(potato.id, 0.15, None))?;

        let outcome = editor.save(&db).await?;
        assert_eq!(editor.state(), EditorState::Viewing);
        assert_eq!(editor.recipe_id(), Some(outcome.recipe.id));
        assert!(editor.draft_lines().is_empty());

        let flush = outcome.flush.unwrap();
        assert!(flush.sections.is_complete());
        assert_eq!(flush.lines.success_count(), 2);
        assert_eq!(flush.lines.failure_count(), 1);
        let (failed_line, failed_err) = flush.lines.failed().next().unwrap();
        assert_eq!(failed_line.ingredient_id, 999);
        assert!(matches!(failed_err, Error::IngredientNotFound { id: 999 }));

        let snapshot = load_recipe_snapshot(&db, outcome.recipe.id).await?;
        assert_eq!(snapshot.lines.len(), 2);
        let groups = snapshot.groups();
        assert_eq!(
            groups[0].kind,
            GroupKind::Section {
                id: snapshot.sections[0].id,
                name: "Base".to_string()
            }
        );
        assert_eq!(groups[0].lines[0].ingredient_id, leek.id);

        Ok(())
    }

    #[tokio::test]
    async fn test_second_save_updates_without_flush() -> Result<()> {
        let db = setup_test_db().await?;
        let mut editor = RecipeEditor::new_recipe(header("Soup", 4, 1, 20.0));
        let first = editor.save(&db).await?;
        assert!(first.flush.unwrap().is_complete());

        editor.begin_edit()?;
        editor.header.net_price = 24.0;
        let second = editor.save(&db).await?;
        assert!(second.flush.is_none());
        assert_eq!(second.recipe.id, first.recipe.id);
        assert_eq!(second.recipe.net_price, 24.0);

        Ok(())
    }

    #[tokio::test]
    async fn test_snapshot_allergens_and_nutrition() -> Result<()> {
        let db = setup_test_db().await?;
        let mut cream = crate::core::valuation::IngredientDraft::new(
            "Cream",
            "L",
            4.0,
            crate::core::valuation::WasteRate::default(),
        );
        cream.allergens = TagSet::parse("milk");
        cream.calories = Some(340.0);
        let cream = crate::core::ingredient::create_ingredient(&db, &cream).await?;
        let recipe = create_recipe(&db, &header("Panna cotta", 4, 1, 24.0)).await?;
        create_test_line(&db, recipe.id, cream.id, None, 0.1).await?;

        let snapshot = load_recipe_snapshot(&db, recipe.id).await?;
        assert!(snapshot.allergens().contains("milk"));
        // 0.1 L × 4 = 400 g → 4 × 340 kcal
        assert!((snapshot.nutrition().calories - 1360.0).abs() < 1e-6);

        Ok(())
    }
}

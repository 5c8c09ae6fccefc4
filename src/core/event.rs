//! Event menu budgeting - attaching recipes to events and rolling up their cost.
//!
//! A menu item costs its source recipe's lines scaled to the item's own
//! `portions`. When those lines cannot be loaded the `cost_per_serving` captured
//! at attach time is used instead. Updating or removing an item recomputes the
//! totals locally on the fetched [`EventSnapshot`]; persisting the change is a
//! separate call that can fail on its own.

use crate::{
    core::{
        costing::{self, ComputationWarning, CostSum, Flagged},
        ingredient,
        recipe::{get_lines_for_recipe, load_recipe_snapshot},
        saga::{Saga, SagaReport},
        tags::TagSet,
        valuation::IngredientBook,
    },
    entities::{Event, EventMenuItem, Recipe, event, event_menu_item, recipe_line},
    errors::{Error, FieldErrors, Result},
};
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*};
use std::{fmt, str::FromStr};
use tracing::{debug, info};

/// Factor applied to the menu cost to suggest a budget.
pub const DEFAULT_BUDGET_FACTOR: f64 = 1.4;

/// Course a menu item is served as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CourseType {
    /// Appetizers and first plates
    Starter,
    /// Main plates
    #[default]
    Main,
    /// Side dishes
    Side,
    /// Desserts
    Dessert,
    /// Drinks
    Beverage,
}

impl CourseType {
    /// Every course in serving order.
    pub const ALL: [Self; 5] = [
        Self::Starter,
        Self::Main,
        Self::Side,
        Self::Dessert,
        Self::Beverage,
    ];

    /// Stored representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Starter => "starter",
            Self::Main => "main",
            Self::Side => "side",
            Self::Dessert => "dessert",
            Self::Beverage => "beverage",
        }
    }
}

impl fmt::Display for CourseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CourseType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let key = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == key)
            .ok_or_else(|| {
                Error::Validation(FieldErrors::single(
                    "course_type",
                    format!("Unknown course type '{s}'"),
                ))
            })
    }
}

/// Lifecycle status of an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum EventStatus {
    /// Being planned
    #[default]
    Draft,
    /// Agreed with the client
    Confirmed,
    /// Took place
    Completed,
    /// Called off
    Cancelled,
}

impl EventStatus {
    const ALL: [Self; 4] = [
        Self::Draft,
        Self::Confirmed,
        Self::Completed,
        Self::Cancelled,
    ];

    /// Stored representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Confirmed => "confirmed",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for EventStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let key = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == key)
            .ok_or_else(|| {
                Error::Validation(FieldErrors::single(
                    "status",
                    format!("Unknown event status '{s}'"),
                ))
            })
    }
}

/// Budget figures for an event.
#[derive(Debug, Clone, PartialEq)]
pub struct EventTotals {
    /// Sum of every menu item's cost
    pub total_cost: f64,
    /// Total cost divided by guests
    pub cost_per_guest: Flagged<f64>,
    /// Budget (0 when unset) minus total cost; negative when over budget
    pub remaining_budget: f64,
    /// Total cost over budget, in percent; 0 when the budget is unset or 0
    pub budget_usage_percent: f64,
    /// Total cost times the budget factor
    pub suggested_budget: f64,
    /// Ingredients missing from the snapshot
    pub warnings: Vec<ComputationWarning>,
}

/// Cost of one menu item.
///
/// With the source recipe's lines, the waste-adjusted cost at `item.portions`;
/// without them, the stored `cost_per_serving × portions`.
pub fn item_cost(
    item: &event_menu_item::Model,
    lines: Option<&[recipe_line::Model]>,
    book: &IngredientBook,
) -> CostSum {
    match lines {
        Some(lines) => costing::sum_line_costs(lines, book, item.portions),
        None => CostSum {
            total: item.cost_per_serving * f64::from(item.portions),
            warnings: Vec::new(),
        },
    }
}

/// Rolls item costs up into event budget figures.
pub fn event_totals(
    guests_count: i32,
    budget: Option<f64>,
    item_costs: impl IntoIterator<Item = CostSum>,
    budget_factor: f64,
) -> EventTotals {
    let mut sum = CostSum::default();
    for cost in item_costs {
        sum.total += cost.total;
        sum.warnings.extend(cost.warnings);
    }

    let total_cost = sum.total;
    let budget_value = budget.unwrap_or_default();
    let budget_usage_percent = if budget_value > 0.0 {
        total_cost / budget_value * 100.0
    } else {
        0.0
    };

    EventTotals {
        total_cost,
        cost_per_guest: costing::cost_per_serving(total_cost, guests_count),
        remaining_budget: budget_value - total_cost,
        budget_usage_percent,
        suggested_budget: total_cost * budget_factor,
        warnings: sum.warnings,
    }
}

/// Editable event fields.
#[derive(Debug, Clone, PartialEq)]
pub struct EventInput {
    /// Event name
    pub name: String,
    /// Number of guests
    pub guests_count: i32,
    /// Optional spending limit
    pub budget: Option<f64>,
    /// Lifecycle status
    pub status: EventStatus,
}

/// Checks an event before it is written.
#[must_use]
pub fn validate_event(input: &EventInput) -> FieldErrors {
    let mut errors = FieldErrors::new();
    if input.name.trim().is_empty() {
        errors.add("name", "Name is required");
    }
    if input.guests_count < 1 {
        errors.add("guests_count", "Guests count must be at least 1");
    }
    if let Some(budget) = input.budget {
        if !budget.is_finite() || budget < 0.0 {
            errors.add("budget", "Budget must be a non-negative number");
        }
    }
    errors
}

/// Retrieves all events, newest first.
pub async fn get_all_events<C>(db: &C) -> Result<Vec<event::Model>>
where
    C: ConnectionTrait,
{
    Event::find()
        .order_by_desc(event::Column::CreatedAt)
        .order_by_desc(event::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Finds an event by its unique ID.
pub async fn get_event_by_id<C>(db: &C, event_id: i64) -> Result<Option<event::Model>>
where
    C: ConnectionTrait,
{
    Event::find_by_id(event_id).one(db).await.map_err(Into::into)
}

/// Creates an event.
pub async fn create_event<C>(db: &C, input: &EventInput) -> Result<event::Model>
where
    C: ConnectionTrait,
{
    validate_event(input).into_result()?;
    let now = chrono::Utc::now().naive_utc();

    let event = event::ActiveModel {
        name: Set(input.name.trim().to_string()),
        guests_count: Set(input.guests_count),
        budget: Set(input.budget),
        status: Set(input.status.as_str().to_string()),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };
    let saved = event.insert(db).await?;
    info!(
        "Created event '{}' (ID: {}) for {} guests",
        saved.name, saved.id, saved.guests_count
    );
    Ok(saved)
}

/// Replaces an event's editable fields. Menu items keep their portions.
pub async fn update_event<C>(db: &C, event_id: i64, input: &EventInput) -> Result<event::Model>
where
    C: ConnectionTrait,
{
    validate_event(input).into_result()?;

    let mut event: event::ActiveModel = Event::find_by_id(event_id)
        .one(db)
        .await?
        .ok_or(Error::EventNotFound { id: event_id })?
        .into();
    event.name = Set(input.name.trim().to_string());
    event.guests_count = Set(input.guests_count);
    event.budget = Set(input.budget);
    event.status = Set(input.status.as_str().to_string());
    event.updated_at = Set(chrono::Utc::now().naive_utc());

    event.update(db).await.map_err(Into::into)
}

/// Moves an event to another lifecycle status.
pub async fn set_event_status<C>(db: &C, event_id: i64, status: EventStatus) -> Result<event::Model>
where
    C: ConnectionTrait,
{
    let mut event: event::ActiveModel = Event::find_by_id(event_id)
        .one(db)
        .await?
        .ok_or(Error::EventNotFound { id: event_id })?
        .into();
    event.status = Set(status.as_str().to_string());
    event.updated_at = Set(chrono::Utc::now().naive_utc());

    let saved = event.update(db).await?;
    info!("Event {} is now {}", saved.id, saved.status);
    Ok(saved)
}

/// Deletes an event and its menu items in one database transaction.
pub async fn delete_event(db: &DatabaseConnection, event_id: i64) -> Result<()> {
    let txn = db.begin().await?;

    let event = Event::find_by_id(event_id)
        .one(&txn)
        .await?
        .ok_or(Error::EventNotFound { id: event_id })?;
    EventMenuItem::delete_many()
        .filter(event_menu_item::Column::EventId.eq(event_id))
        .exec(&txn)
        .await?;
    event.delete(&txn).await?;

    txn.commit().await?;
    info!("Deleted event {event_id}");
    Ok(())
}

/// Retrieves an event's menu items in the order they were attached.
pub async fn get_menu_items<C>(db: &C, event_id: i64) -> Result<Vec<event_menu_item::Model>>
where
    C: ConnectionTrait,
{
    EventMenuItem::find()
        .filter(event_menu_item::Column::EventId.eq(event_id))
        .order_by_asc(event_menu_item::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

fn validate_portions(portions: i32) -> FieldErrors {
    if portions < 1 {
        FieldErrors::single("portions", "Portions must be at least 1")
    } else {
        FieldErrors::new()
    }
}

/// Attaches a recipe to an event menu.
///
/// `portions` defaults to the event's guest count. The recipe's current cost
/// per serving is stored on the item as the fallback snapshot.
pub async fn add_recipe_to_event<C>(
    db: &C,
    event_id: i64,
    recipe_id: i64,
    portions: Option<i32>,
    course_type: CourseType,
) -> Result<event_menu_item::Model>
where
    C: ConnectionTrait,
{
    let event = Event::find_by_id(event_id)
        .one(db)
        .await?
        .ok_or(Error::EventNotFound { id: event_id })?;
    let portions = portions.unwrap_or(event.guests_count);
    validate_portions(portions).into_result()?;

    let snapshot = load_recipe_snapshot(db, recipe_id).await?;
    let cost_per_serving = snapshot
        .costing(costing::DEFAULT_TARGET_MARGIN)
        .cost_per_serving
        .value;

    let item = event_menu_item::ActiveModel {
        event_id: Set(event_id),
        recipe_id: Set(recipe_id),
        portions: Set(portions),
        course_type: Set(course_type.as_str().to_string()),
        notes: Set(None),
        cost_per_serving: Set(cost_per_serving),
        ..Default::default()
    };
    let saved = item.insert(db).await?;
    info!(
        "Added recipe '{}' to event {} ({} portions, {})",
        snapshot.recipe.name, event_id, portions, course_type
    );
    Ok(saved)
}

/// Attaches several recipes one after another, reporting each attachment.
///
/// Every item gets `portions_override` when given, otherwise the event's guest
/// count. Items are attached as main courses.
pub async fn add_recipes_to_event<C>(
    db: &C,
    event_id: i64,
    recipe_ids: &[i64],
    portions_override: Option<i32>,
) -> SagaReport<i64, event_menu_item::Model>
where
    C: ConnectionTrait,
{
    Saga::with_steps("attach recipes", recipe_ids.iter().copied())
        .run(|recipe_id| async move {
            add_recipe_to_event(db, event_id, recipe_id, portions_override, CourseType::Main)
                .await
        })
        .await
}

/// Editable menu item fields.
#[derive(Debug, Clone, PartialEq)]
pub struct MenuItemUpdate {
    /// Servings planned for this item
    pub portions: i32,
    /// Course the item is served as
    pub course_type: CourseType,
    /// Kitchen notes
    pub notes: Option<String>,
}

/// Persists a menu item change.
pub async fn update_menu_item<C>(
    db: &C,
    item_id: i64,
    update: &MenuItemUpdate,
) -> Result<event_menu_item::Model>
where
    C: ConnectionTrait,
{
    validate_portions(update.portions).into_result()?;

    let mut item: event_menu_item::ActiveModel = EventMenuItem::find_by_id(item_id)
        .one(db)
        .await?
        .ok_or(Error::MenuItemNotFound { id: item_id })?
        .into();
    item.portions = Set(update.portions);
    item.course_type = Set(update.course_type.as_str().to_string());
    item.notes = Set(update.notes.clone());

    let saved = item.update(db).await?;
    debug!("Updated menu item {}", saved.id);
    Ok(saved)
}

/// Persists the removal of a menu item.
pub async fn remove_menu_item<C>(db: &C, item_id: i64) -> Result<()>
where
    C: ConnectionTrait,
{
    let result = EventMenuItem::delete_by_id(item_id).exec(db).await?;
    if result.rows_affected == 0 {
        return Err(Error::MenuItemNotFound { id: item_id });
    }
    debug!("Removed menu item {item_id}");
    Ok(())
}

/// A menu item with the source recipe's lines, when they could be loaded.
#[derive(Debug, Clone)]
pub struct MenuEntry {
    /// The persisted item
    pub item: event_menu_item::Model,
    /// Source recipe lines; None when the recipe no longer exists
    pub recipe_lines: Option<Vec<recipe_line::Model>>,
}

impl MenuEntry {
    /// Parsed course; unknown stored values read as main.
    #[must_use]
    pub fn course(&self) -> CourseType {
        self.item.course_type.parse().unwrap_or_default()
    }
}

/// An event with its menu and the ingredient data to cost it.
#[derive(Debug, Clone)]
pub struct EventSnapshot {
    /// The event header
    pub event: event::Model,
    /// Menu items in attach order
    pub entries: Vec<MenuEntry>,
    /// Ingredient master data for every loaded line
    pub ingredients: IngredientBook,
}

impl EventSnapshot {
    /// Cost of one entry.
    #[must_use]
    pub fn entry_cost(&self, entry: &MenuEntry) -> CostSum {
        item_cost(&entry.item, entry.recipe_lines.as_deref(), &self.ingredients)
    }

    /// Budget figures over the whole menu.
    #[must_use]
    pub fn totals(&self, budget_factor: f64) -> EventTotals {
        event_totals(
            self.event.guests_count,
            self.event.budget,
            self.entries.iter().map(|e| self.entry_cost(e)),
            budget_factor,
        )
    }

    /// Applies an item change to the snapshot without touching the database.
    pub fn apply_item_update(&mut self, item_id: i64, update: &MenuItemUpdate) -> Result<()> {
        validate_portions(update.portions).into_result()?;
        let entry = self
            .entries
            .iter_mut()
            .find(|e| e.item.id == item_id)
            .ok_or(Error::MenuItemNotFound { id: item_id })?;
        entry.item.portions = update.portions;
        entry.item.course_type = update.course_type.as_str().to_string();
        entry.item.notes.clone_from(&update.notes);
        Ok(())
    }

    /// Drops an item from the snapshot without touching the database.
    pub fn remove_item_local(&mut self, item_id: i64) -> Result<event_menu_item::Model> {
        let index = self
            .entries
            .iter()
            .position(|e| e.item.id == item_id)
            .ok_or(Error::MenuItemNotFound { id: item_id })?;
        Ok(self.entries.remove(index).item)
    }

    /// Union of the allergens over every loaded recipe line.
    #[must_use]
    pub fn allergens(&self) -> TagSet {
        let mut tags = TagSet::new();
        for line in self.entries.iter().filter_map(|e| e.recipe_lines.as_ref()).flatten() {
            if let Some(ingredient) = self.ingredients.get(line.ingredient_id) {
                tags.extend(&ingredient.allergen_tags());
            }
        }
        tags
    }
}

/// Loads an event with its menu items, each item's recipe lines and the
/// ingredients those lines use.
pub async fn load_event_snapshot<C>(db: &C, event_id: i64) -> Result<EventSnapshot>
where
    C: ConnectionTrait,
{
    let event = Event::find_by_id(event_id)
        .one(db)
        .await?
        .ok_or(Error::EventNotFound { id: event_id })?;

    let mut entries = Vec::new();
    for item in get_menu_items(db, event_id).await? {
        let recipe_lines = if Recipe::find_by_id(item.recipe_id).one(db).await?.is_some() {
            Some(get_lines_for_recipe(db, item.recipe_id).await?)
        } else {
            debug!(
                "Recipe {} of menu item {} is gone, using stored cost",
                item.recipe_id, item.id
            );
            None
        };
        entries.push(MenuEntry { item, recipe_lines });
    }

    let mut ids: Vec<i64> = entries
        .iter()
        .filter_map(|e| e.recipe_lines.as_ref())
        .flatten()
        .map(|l| l.ingredient_id)
        .collect();
    ids.sort_unstable();
    ids.dedup();
    let ingredients = ingredient::load_ingredient_book(db, &ids).await?;

    Ok(EventSnapshot {
        event,
        entries,
        ingredients,
    })
}

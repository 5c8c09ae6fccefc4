//! Report generation business logic.
//!
//! This module turns recipe and event snapshots into structured summaries and
//! plain-text renderings. Currency is rounded to 2 decimals and percentages to 1
//! decimal; the underlying computations keep full precision.

use crate::{
    core::{
        costing::{Flagged, RecipeCosting},
        event::{CourseType, EventTotals, load_event_snapshot},
        nutrition::{self, NutritionFacts},
        recipe::{get_recipe_by_id, load_recipe_snapshot},
        section::GroupKind,
        tags::TagSet,
    },
    entities::{event, recipe},
    errors::Result,
};
use sea_orm::ConnectionTrait;
use std::fmt::Write as _;

/// Cost subtotal of one display group.
#[derive(Debug, Clone, PartialEq)]
pub struct SectionSubtotal {
    /// Section name, or a label for the unassigned and recovery buckets
    pub label: String,
    /// Lines in the group
    pub line_count: usize,
    /// Waste-adjusted cost at the recipe's servings
    pub subtotal: f64,
}

/// Everything shown on a recipe summary.
#[derive(Debug, Clone)]
pub struct RecipeReport {
    /// The recipe being reported on
    pub recipe: recipe::Model,
    /// Cost, margin and suggested price
    pub costing: RecipeCosting,
    /// Per-group subtotals in display order
    pub sections: Vec<SectionSubtotal>,
    /// Nutrition for one diner
    pub nutrition_per_serving: Flagged<NutritionFacts>,
    /// Union of ingredient allergens
    pub allergens: TagSet,
}

/// Generates a costing summary for a recipe.
///
/// # Arguments
/// * `db` - Database connection
/// * `recipe_id` - ID of the recipe to report on
/// * `target_margin` - Margin used for the suggested price
pub async fn generate_recipe_report<C>(
    db: &C,
    recipe_id: i64,
    target_margin: f64,
) -> Result<RecipeReport>
where
    C: ConnectionTrait,
{
    let snapshot = load_recipe_snapshot(db, recipe_id).await?;
    let servings = snapshot.recipe.servings;

    let sections = snapshot
        .groups()
        .iter()
        .map(|group| SectionSubtotal {
            label: match &group.kind {
                GroupKind::Section { name, .. } => name.clone(),
                GroupKind::Unassigned => "Unassigned".to_string(),
                GroupKind::Recovery => "Recovered lines".to_string(),
            },
            line_count: group.lines.len(),
            subtotal: group.subtotal(&snapshot.ingredients, servings),
        })
        .collect();

    Ok(RecipeReport {
        costing: snapshot.costing(target_margin),
        sections,
        nutrition_per_serving: nutrition::per_serving(snapshot.nutrition(), servings),
        allergens: snapshot.allergens(),
        recipe: snapshot.recipe,
    })
}

/// One menu line on an event summary.
#[derive(Debug, Clone, PartialEq)]
pub struct MenuLineSummary {
    /// Source recipe name, or its id when the recipe is gone
    pub recipe_name: String,
    /// Course served as
    pub course: CourseType,
    /// Servings planned
    pub portions: i32,
    /// Item cost
    pub cost: f64,
}

/// Everything shown on an event summary.
#[derive(Debug, Clone)]
pub struct EventReport {
    /// The event being reported on
    pub event: event::Model,
    /// Budget figures
    pub totals: EventTotals,
    /// Menu lines sorted by course, then attach order
    pub menu: Vec<MenuLineSummary>,
    /// Union of allergens across the menu
    pub allergens: TagSet,
}

/// Generates a budget summary for an event.
pub async fn generate_event_report<C>(
    db: &C,
    event_id: i64,
    budget_factor: f64,
) -> Result<EventReport>
where
    C: ConnectionTrait,
{
    let snapshot = load_event_snapshot(db, event_id).await?;

    let mut menu = Vec::with_capacity(snapshot.entries.len());
    for entry in &snapshot.entries {
        let recipe_name = get_recipe_by_id(db, entry.item.recipe_id)
            .await?
            .map_or_else(|| format!("Recipe #{}", entry.item.recipe_id), |r| r.name);
        menu.push(MenuLineSummary {
            recipe_name,
            course: entry.course(),
            portions: entry.item.portions,
            cost: snapshot.entry_cost(entry).total,
        });
    }
    // Stable sort keeps attach order within a course
    menu.sort_by_key(|line| CourseType::ALL.iter().position(|c| *c == line.course));

    Ok(EventReport {
        totals: snapshot.totals(budget_factor),
        allergens: snapshot.allergens(),
        event: snapshot.event,
        menu,
    })
}

/// Rounds to cents for display.
#[must_use]
pub fn round_currency(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}

/// Formats an amount like "$12.50" or "-$3.20".
#[must_use]
pub fn format_currency(amount: f64) -> String {
    let rounded = round_currency(amount);
    if rounded < 0.0 {
        format!("-${:.2}", rounded.abs())
    } else {
        format!("${:.2}", rounded.abs())
    }
}

/// Formats a percentage with one decimal, like "91.2%".
#[must_use]
pub fn format_percent(percent: f64) -> String {
    format!("{percent:.1}%")
}

/// Generates a progress bar string for visual representation.
///
/// Creates a text-based progress bar like: `[████████░░] 80.0%`
///
/// # Arguments
/// * `progress_percent` - Progress percentage (0-100)
/// * `bar_length` - Length of the progress bar in characters (default 10)
#[must_use]
pub fn format_progress_bar(progress_percent: f64, bar_length: Option<usize>) -> String {
    let length = bar_length.unwrap_or(10);
    let clamped_progress = progress_percent.clamp(0.0, 100.0);

    // Cast safety: clamped_progress ∈ [0, 100] and length is small.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
    let filled = ((clamped_progress / 100.0) * length as f64).round() as usize;
    let empty = length.saturating_sub(filled);

    let filled_str = "█".repeat(filled);
    let empty_str = "░".repeat(empty);

    format!("[{filled_str}{empty_str}] {progress_percent:.1}%")
}

fn flag_suffix<T>(value: &Flagged<T>) -> &'static str {
    if value.is_division_undefined() {
        " (undefined)"
    } else {
        ""
    }
}

/// Renders a recipe report as plain text.
#[must_use]
pub fn format_recipe_report(report: &RecipeReport) -> String {
    let recipe = &report.recipe;
    let costing = &report.costing;
    let mut out = String::new();

    let _ = writeln!(out, "{} ({} servings)", recipe.name, recipe.servings);
    let _ = writeln!(out, "  Cost:            {}", format_currency(costing.total_cost));
    let _ = writeln!(
        out,
        "  Cost/serving:    {}{}",
        format_currency(costing.cost_per_serving.value),
        flag_suffix(&costing.cost_per_serving)
    );
    let _ = writeln!(out, "  Selling price:   {}", format_currency(recipe.net_price));
    let _ = writeln!(
        out,
        "  Margin:          {} ({})",
        format_currency(costing.margin),
        format_percent(costing.margin_percent)
    );
    let _ = writeln!(
        out,
        "  Suggested price: {}{}",
        format_currency(costing.suggested_price.value),
        flag_suffix(&costing.suggested_price)
    );

    for section in &report.sections {
        let _ = writeln!(
            out,
            "  - {} ({} lines): {}",
            section.label,
            section.line_count,
            format_currency(section.subtotal)
        );
    }

    let facts = report.nutrition_per_serving.value;
    let _ = writeln!(
        out,
        "  Per serving: {:.0} kcal, {:.1} g protein, {:.1} g carbs, {:.1} g fat",
        facts.calories, facts.protein, facts.carbs, facts.fat
    );
    if !report.allergens.is_empty() {
        let _ = writeln!(out, "  Allergens: {}", report.allergens);
    }
    if !costing.warnings.is_empty() {
        let _ = writeln!(
            out,
            "  Warning: {} lines reference missing ingredients",
            costing.warnings.len()
        );
    }

    out
}

/// Renders an event report as plain text.
#[must_use]
pub fn format_event_report(report: &EventReport) -> String {
    let event = &report.event;
    let totals = &report.totals;
    let mut out = String::new();

    let _ = writeln!(
        out,
        "{} [{}] - {} guests",
        event.name, event.status, event.guests_count
    );
    for line in &report.menu {
        let _ = writeln!(
            out,
            "  {:<9} {} x{}: {}",
            line.course.as_str(),
            line.recipe_name,
            line.portions,
            format_currency(line.cost)
        );
    }
    let _ = writeln!(out, "  Total:            {}", format_currency(totals.total_cost));
    let _ = writeln!(
        out,
        "  Per guest:        {}{}",
        format_currency(totals.cost_per_guest.value),
        flag_suffix(&totals.cost_per_guest)
    );
    match event.budget {
        Some(budget) if budget > 0.0 => {
            let _ = writeln!(
                out,
                "  Budget:           {} {}",
                format_currency(budget),
                format_progress_bar(totals.budget_usage_percent, None)
            );
            let _ = writeln!(
                out,
                "  Remaining:        {}",
                format_currency(totals.remaining_budget)
            );
        }
        _ => {
            let _ = writeln!(out, "  Budget:           not set");
        }
    }
    let _ = writeln!(
        out,
        "  Suggested budget: {}",
        format_currency(totals.suggested_budget)
    );
    if !report.allergens.is_empty() {
        let _ = writeln!(out, "  Allergens: {}", report.allergens);
    }

    out
}

//! Recipe costing - pure cost, margin and pricing computations.
//!
//! All functions here are synchronous and never fail. Degenerate inputs (zero
//! servings, ingredients missing from the snapshot) produce a value plus a
//! [`ComputationWarning`] instead of an error.

use crate::{
    core::valuation::IngredientBook,
    entities::{ingredient, recipe, recipe_line},
    errors::FieldErrors,
};
use tracing::warn;

/// Target margin used by [`suggested_price`] when none is configured.
pub const DEFAULT_TARGET_MARGIN: f64 = 0.4;

/// Non-fatal condition detected while computing a figure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComputationWarning {
    /// A divisor was zero; the reported value is 0
    DivisionUndefined,
    /// A line referenced an ingredient absent from the snapshot; it counted as 0
    MissingIngredient {
        /// The missing ingredient id
        ingredient_id: i64,
    },
}

/// A computed value with an optional warning attached.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Flagged<T> {
    /// The computed value
    pub value: T,
    /// Why the value may not mean what it usually means
    pub warning: Option<ComputationWarning>,
}

impl<T> Flagged<T> {
    /// A value computed normally.
    pub const fn exact(value: T) -> Self {
        Self {
            value,
            warning: None,
        }
    }

    /// A placeholder value returned because a divisor was zero.
    pub const fn division_undefined(value: T) -> Self {
        Self {
            value,
            warning: Some(ComputationWarning::DivisionUndefined),
        }
    }

    /// True when the value stands in for an undefined division.
    pub fn is_division_undefined(&self) -> bool {
        self.warning == Some(ComputationWarning::DivisionUndefined)
    }
}

/// Anything that consumes an ingredient per serving.
///
/// Implemented by persisted lines and by draft lines buffered before a recipe is
/// first saved, so both are costed the same way.
pub trait PortionedLine {
    /// Ingredient consumed
    fn ingredient_id(&self) -> i64;
    /// Quantity for one serving, in the ingredient's unit
    fn quantity_per_serving(&self) -> f64;
}

impl PortionedLine for recipe_line::Model {
    fn ingredient_id(&self) -> i64 {
        self.ingredient_id
    }

    fn quantity_per_serving(&self) -> f64 {
        self.quantity_per_serving
    }
}

/// Cost of one line for `servings` diners: quantity × servings × net price.
#[must_use]
pub fn line_cost(line: &impl PortionedLine, ingredient: &ingredient::Model, servings: i32) -> f64 {
    line.quantity_per_serving() * f64::from(servings) * ingredient.net_price
}

/// Sum of line costs with the warnings raised along the way.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CostSum {
    /// Total waste-adjusted cost
    pub total: f64,
    /// Missing ingredients encountered
    pub warnings: Vec<ComputationWarning>,
}

/// Costs every line at `servings`, regardless of section.
pub fn sum_line_costs<'a, L>(
    lines: impl IntoIterator<Item = &'a L>,
    book: &IngredientBook,
    servings: i32,
) -> CostSum
where
    L: PortionedLine + 'a,
{
    let mut sum = CostSum::default();
    for line in lines {
        if let Some(ingredient) = book.get(line.ingredient_id()) {
            sum.total += line_cost(line, ingredient, servings);
        } else {
            warn!(
                "Ingredient {} missing from snapshot, costed as 0",
                line.ingredient_id()
            );
            sum.warnings.push(ComputationWarning::MissingIngredient {
                ingredient_id: line.ingredient_id(),
            });
        }
    }
    sum
}

/// `total_cost / servings`, or 0 tagged `DivisionUndefined` when servings is 0.
#[must_use]
pub fn cost_per_serving(total_cost: f64, servings: i32) -> Flagged<f64> {
    if servings == 0 {
        Flagged::division_undefined(0.0)
    } else {
        Flagged::exact(total_cost / f64::from(servings))
    }
}

/// Selling price minus cost.
#[must_use]
pub fn margin(net_price: f64, total_cost: f64) -> f64 {
    net_price - total_cost
}

/// Margin as a percentage of the selling price; 0 when the price is not positive.
#[must_use]
pub fn margin_percent(net_price: f64, total_cost: f64) -> f64 {
    if net_price > 0.0 {
        margin(net_price, total_cost) / net_price * 100.0
    } else {
        0.0
    }
}

/// Per-serving price reaching `target_margin` (a fraction).
///
/// A target of 1 or more cannot be reached and yields 0 tagged
/// `DivisionUndefined`.
#[must_use]
pub fn suggested_price(cost_per_serving: f64, target_margin: f64) -> Flagged<f64> {
    let divisor = 1.0 - target_margin;
    if divisor <= 0.0 {
        Flagged::division_undefined(0.0)
    } else {
        Flagged::exact(cost_per_serving / divisor)
    }
}

/// Every derived cost figure for one recipe.
#[derive(Debug, Clone, PartialEq)]
pub struct RecipeCosting {
    /// Cost of all lines at the recipe's servings
    pub total_cost: f64,
    /// Cost for one diner
    pub cost_per_serving: Flagged<f64>,
    /// Selling price minus total cost
    pub margin: f64,
    /// Margin over selling price, in percent
    pub margin_percent: f64,
    /// Per-serving price reaching the target margin
    pub suggested_price: Flagged<f64>,
    /// Ingredients missing from the snapshot
    pub warnings: Vec<ComputationWarning>,
}

/// Computes cost, margin and suggested price for a recipe at its current servings.
pub fn cost_recipe<'a, L>(
    recipe: &recipe::Model,
    lines: impl IntoIterator<Item = &'a L>,
    book: &IngredientBook,
    target_margin: f64,
) -> RecipeCosting
where
    L: PortionedLine + 'a,
{
    let CostSum { total, warnings } = sum_line_costs(lines, book, recipe.servings);
    let per_serving = cost_per_serving(total, recipe.servings);

    RecipeCosting {
        total_cost: total,
        cost_per_serving: per_serving,
        margin: margin(recipe.net_price, total),
        margin_percent: margin_percent(recipe.net_price, total),
        suggested_price: suggested_price(per_serving.value, target_margin),
        warnings,
    }
}

/// Header fields of a recipe checked at save time.
#[derive(Debug, Clone, PartialEq)]
pub struct RecipeHeader {
    /// Recipe name
    pub name: String,
    /// Planned diners
    pub servings: i32,
    /// Minimum viable batch
    pub production_servings: i32,
    /// Total selling price for `servings` diners
    pub net_price: f64,
}

impl From<&recipe::Model> for RecipeHeader {
    fn from(model: &recipe::Model) -> Self {
        Self {
            name: model.name.clone(),
            servings: model.servings,
            production_servings: model.production_servings,
            net_price: model.net_price,
        }
    }
}

/// Save-time validation for a recipe header.
///
/// `servings >= production_servings` is a hard rule; its message names both
/// values.
#[must_use]
pub fn validate_recipe(header: &RecipeHeader) -> FieldErrors {
    let mut errors = FieldErrors::new();

    if header.name.trim().is_empty() {
        errors.add("name", "Name is required");
    }
    if header.servings < 1 {
        errors.add("servings", "Servings must be at least 1");
    } else if header.servings < header.production_servings {
        errors.add(
            "servings",
            format!(
                "Servings ({}) must be at least the production servings ({})",
                header.servings, header.production_servings
            ),
        );
    }
    if header.production_servings < 0 {
        errors.add("production_servings", "Production servings cannot be negative");
    }
    if !header.net_price.is_finite() || header.net_price < 0.0 {
        errors.add("net_price", "Net price must be a non-negative number");
    }

    errors
}

/// Checks a line quantity: finite and strictly positive.
#[must_use]
pub fn validate_line_quantity(quantity_per_serving: f64) -> FieldErrors {
    if quantity_per_serving.is_finite() && quantity_per_serving > 0.0 {
        FieldErrors::new()
    } else {
        FieldErrors::single(
            "quantity_per_serving",
            "Quantity per serving must be greater than 0",
        )
    }
}

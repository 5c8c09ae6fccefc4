//! Nutrition aggregation over recipe lines.
//!
//! Quantities are converted to grams with a fixed table (liquids assume a
//! density of 1) and nutrition facts per 100 g are scaled accordingly. Totals are
//! reported for the whole batch at the recipe's current servings; use
//! [`per_serving`] for a per-diner view.

use crate::{
    core::{
        costing::{Flagged, PortionedLine},
        valuation::IngredientBook,
    },
    entities::ingredient,
};
use std::ops::{Add, AddAssign};
use tracing::warn;

/// Grams per unit. The only conversion used for nutrition scaling.
pub const GRAMS_PER_UNIT: [(&str, f64); 5] = [
    ("kg", 1000.0),
    ("l", 1000.0),
    ("ml", 1.0),
    ("g", 1.0),
    ("unit", 1.0),
];

/// Grams in one `unit`. Unknown units count as 1 g and are logged.
#[must_use]
pub fn grams_per_unit(unit: &str) -> f64 {
    let key = unit.trim().to_lowercase();
    GRAMS_PER_UNIT
        .iter()
        .find(|(name, _)| *name == key)
        .map_or_else(
            || {
                warn!("Unknown unit '{unit}' for nutrition, assuming 1 g");
                1.0
            },
            |(_, grams)| *grams,
        )
}

/// Calories and macronutrients.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct NutritionFacts {
    /// Kilocalories
    pub calories: f64,
    /// Protein grams
    pub protein: f64,
    /// Carbohydrate grams
    pub carbs: f64,
    /// Fat grams
    pub fat: f64,
}

impl NutritionFacts {
    /// Facts per 100 g of an ingredient; missing values are 0.
    #[must_use]
    pub fn per_100g(ingredient: &ingredient::Model) -> Self {
        Self {
            calories: ingredient.calories.unwrap_or_default(),
            protein: ingredient.protein.unwrap_or_default(),
            carbs: ingredient.carbs.unwrap_or_default(),
            fat: ingredient.fat.unwrap_or_default(),
        }
    }

    /// Every field multiplied by `factor`.
    #[must_use]
    pub fn scaled(self, factor: f64) -> Self {
        Self {
            calories: self.calories * factor,
            protein: self.protein * factor,
            carbs: self.carbs * factor,
            fat: self.fat * factor,
        }
    }
}

impl Add for NutritionFacts {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self {
            calories: self.calories + rhs.calories,
            protein: self.protein + rhs.protein,
            carbs: self.carbs + rhs.carbs,
            fat: self.fat + rhs.fat,
        }
    }
}

impl AddAssign for NutritionFacts {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl std::iter::Sum for NutritionFacts {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}

/// Nutrition of one line for `servings` diners.
#[must_use]
pub fn line_nutrition(
    line: &impl PortionedLine,
    ingredient: &ingredient::Model,
    servings: i32,
) -> NutritionFacts {
    let grams = line.quantity_per_serving() * f64::from(servings) * grams_per_unit(&ingredient.unit);
    NutritionFacts::per_100g(ingredient).scaled(grams / 100.0)
}

/// Element-wise sum over all lines at `servings` (whole batch).
///
/// Lines whose ingredient is not in the snapshot contribute nothing.
pub fn recipe_nutrition<'a, L>(
    lines: impl IntoIterator<Item = &'a L>,
    book: &IngredientBook,
    servings: i32,
) -> NutritionFacts
where
    L: PortionedLine + 'a,
{
    lines
        .into_iter()
        .filter_map(|line| {
            book.get(line.ingredient_id())
                .map(|ingredient| line_nutrition(line, ingredient, servings))
        })
        .sum()
}

/// Divides batch totals by `servings`; zero servings yields zeros tagged
/// `DivisionUndefined`.
#[must_use]
pub fn per_serving(total: NutritionFacts, servings: i32) -> Flagged<NutritionFacts> {
    if servings == 0 {
        Flagged::division_undefined(NutritionFacts::default())
    } else {
        Flagged::exact(total.scaled(1.0 / f64::from(servings)))
    }
}

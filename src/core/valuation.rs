//! Ingredient valuation - waste-adjusted pricing and ingredient validation.
//!
//! Everything here is pure. The persisted `net_price` written by
//! [`crate::core::ingredient`] is authoritative; the values computed from a draft
//! are previews only and are modelled as such by [`NetPriceQuote`].

use crate::{
    core::tags::TagSet,
    entities::ingredient,
    errors::FieldErrors,
};
use std::collections::HashMap;

/// Waste-adjusted price: `base_price * (1 + waste_percent)`.
///
/// Returns `None` when either input is missing so callers can show
/// "not yet computable" instead of failing.
#[must_use]
pub fn compute_net_price(base_price: Option<f64>, waste_percent: Option<f64>) -> Option<f64> {
    Some(base_price? * (1.0 + waste_percent?))
}

/// Waste loss stored canonically as a fraction (0.10 = 10%).
///
/// Percent points only exist at the input/output boundary; use
/// [`WasteRate::from_percent`] and [`WasteRate::as_percent`] to cross it.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default)]
pub struct WasteRate(f64);

impl WasteRate {
    /// Wraps a fraction.
    #[must_use]
    pub const fn from_fraction(fraction: f64) -> Self {
        Self(fraction)
    }

    /// Converts percent points (10 = 10%) to the canonical fraction.
    #[must_use]
    pub fn from_percent(percent: f64) -> Self {
        Self(percent / 100.0)
    }

    /// The canonical fraction.
    #[must_use]
    pub const fn fraction(self) -> f64 {
        self.0
    }

    /// Percent points for display.
    #[must_use]
    pub fn as_percent(self) -> f64 {
        self.0 * 100.0
    }
}

/// Unsaved ingredient as entered by a user or read from the seed catalog.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IngredientDraft {
    /// Ingredient name
    pub name: String,
    /// Purchase unit
    pub unit: String,
    /// Price per unit before waste; None while not entered
    pub base_price: Option<f64>,
    /// Waste loss; None while not entered
    pub waste: Option<WasteRate>,
    /// Current stock
    pub stock: f64,
    /// Reorder threshold
    pub stock_minimum: f64,
    /// Months in season
    pub season: TagSet,
    /// Allergens
    pub allergens: TagSet,
    /// Kilocalories per 100 g
    pub calories: Option<f64>,
    /// Protein per 100 g
    pub protein: Option<f64>,
    /// Carbohydrates per 100 g
    pub carbs: Option<f64>,
    /// Fat per 100 g
    pub fat: Option<f64>,
    /// Whether the ingredient can be sourced
    pub is_available: bool,
}

impl IngredientDraft {
    /// Draft with the required fields set and everything else defaulted.
    #[must_use]
    pub fn new(name: &str, unit: &str, base_price: f64, waste: WasteRate) -> Self {
        Self {
            name: name.to_string(),
            unit: unit.to_string(),
            base_price: Some(base_price),
            waste: Some(waste),
            is_available: true,
            ..Self::default()
        }
    }

    /// Client-side net price preview.
    #[must_use]
    pub fn preview_net_price(&self) -> NetPriceQuote {
        compute_net_price(self.base_price, self.waste.map(WasteRate::fraction))
            .map_or(NetPriceQuote::NotComputable, NetPriceQuote::Provisional)
    }
}

/// Validates an ingredient draft, returning every failing field.
///
/// An empty map means the draft may be persisted.
#[must_use]
pub fn validate(draft: &IngredientDraft) -> FieldErrors {
    let mut errors = FieldErrors::new();

    if draft.name.trim().is_empty() {
        errors.add("name", "Name is required");
    }
    if draft.unit.trim().is_empty() {
        errors.add("unit", "Unit is required");
    }

    match draft.base_price {
        None => errors.add("base_price", "Base price is required"),
        Some(price) => check_non_negative(&mut errors, "base_price", price),
    }
    match draft.waste.map(WasteRate::fraction) {
        None => errors.add("waste_percent", "Waste percent is required"),
        Some(fraction) if fraction.is_finite() && fraction > 1.0 => {
            errors.add("waste_percent", "Waste percent must be between 0 and 1");
        }
        Some(fraction) => check_non_negative(&mut errors, "waste_percent", fraction),
    }

    check_non_negative(&mut errors, "stock", draft.stock);
    check_non_negative(&mut errors, "stock_minimum", draft.stock_minimum);

    for (field, value) in [
        ("calories", draft.calories),
        ("protein", draft.protein),
        ("carbs", draft.carbs),
        ("fat", draft.fat),
    ] {
        if let Some(value) = value {
            check_non_negative(&mut errors, field, value);
        }
    }

    errors
}

fn check_non_negative(errors: &mut FieldErrors, field: &str, value: f64) {
    if !value.is_finite() || value < 0.0 {
        errors.add(field, format!("{field} must be a non-negative number"));
    }
}

/// Two-phase net price value.
///
/// A provisional quote is an estimate computed from unsaved input. Once the
/// record is saved the stored value becomes authoritative and replaces it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NetPriceQuote {
    /// Inputs are incomplete
    NotComputable,
    /// Client-side estimate
    Provisional(f64),
    /// Value recalculated and stored by the persistence layer
    Authoritative(f64),
}

impl NetPriceQuote {
    /// Authoritative quote from a persisted ingredient.
    #[must_use]
    pub const fn confirmed(ingredient: &ingredient::Model) -> Self {
        Self::Authoritative(ingredient.net_price)
    }

    /// Combines this quote with the stored value, which always wins when present.
    #[must_use]
    pub fn settle(self, authoritative: Option<f64>) -> Self {
        authoritative.map_or(self, Self::Authoritative)
    }

    /// Numeric value, if any.
    #[must_use]
    pub const fn value(self) -> Option<f64> {
        match self {
            Self::NotComputable => None,
            Self::Provisional(v) | Self::Authoritative(v) => Some(v),
        }
    }

    /// True only for the stored value.
    #[must_use]
    pub const fn is_final(self) -> bool {
        matches!(self, Self::Authoritative(_))
    }
}

/// Immutable snapshot of ingredient master data for one compute pass.
#[derive(Debug, Clone, Default)]
pub struct IngredientBook {
    by_id: HashMap<i64, ingredient::Model>,
}

impl IngredientBook {
    /// Builds a snapshot from loaded ingredients.
    pub fn new(ingredients: impl IntoIterator<Item = ingredient::Model>) -> Self {
        Self {
            by_id: ingredients.into_iter().map(|i| (i.id, i)).collect(),
        }
    }

    /// Looks up an ingredient.
    #[must_use]
    pub fn get(&self, id: i64) -> Option<&ingredient::Model> {
        self.by_id.get(&id)
    }

    /// Number of ingredients in the snapshot.
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    /// True when the snapshot holds nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}

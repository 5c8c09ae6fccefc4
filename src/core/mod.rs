//! Core business logic - framework-agnostic costing, composition and budgeting.

/// Recipe cost, margin and pricing computations
pub mod costing;
/// Event menus and budget roll-ups
pub mod event;
/// Ingredient persistence and catalog queries
pub mod ingredient;
/// Nutrition aggregation
pub mod nutrition;
/// Recipe persistence, snapshots and the editing workflow
pub mod recipe;
/// Text summaries for recipes and events
pub mod report;
/// Sequential multi-step operations
pub mod saga;
/// Recipe sections and line grouping
pub mod section;
/// Normalized tag sets for allergens and seasons
pub mod tags;
/// Net price derivation and ingredient validation
pub mod valuation;

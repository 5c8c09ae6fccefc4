//! Unified error types for the costing engine.
//!
//! Validation failures carry a field → message map so callers can attach them to
//! the offending inputs. Persistence failures are surfaced verbatim; nothing in
//! this crate retries.

use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Field → message map produced by validation. Empty means valid.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors(BTreeMap<String, String>);

impl FieldErrors {
    /// Creates an empty map.
    #[must_use]
    pub const fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Creates a map holding exactly one error.
    #[must_use]
    pub fn single(field: &str, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    /// Records an error for `field`. The first message for a field wins.
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_string())
            .or_insert_with(|| message.into());
    }

    /// Message recorded for `field`, if any.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    /// True when no field failed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of failing fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Iterates `(field, message)` pairs in field order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Converts into `Ok(())` when empty, `Err(Error::Validation)` otherwise.
    pub fn into_result(self) -> Result<()> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(Error::Validation(self))
        }
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, message) in &self.0 {
            if !first {
                f.write_str("; ")?;
            }
            write!(f, "{field}: {message}")?;
            first = false;
        }
        Ok(())
    }
}

/// Crate-wide error type.
#[derive(Debug, Error)]
pub enum Error {
    /// Input rejected before anything was written.
    #[error("Validation failed: {0}")]
    Validation(FieldErrors),

    /// Configuration could not be read or parsed.
    #[error("Configuration error: {message}")]
    Config {
        /// What went wrong
        message: String,
    },

    /// Persistence collaborator failure, passed through unchanged.
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// Settings payload could not be encoded or decoded.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// No ingredient with this id.
    #[error("Ingredient not found: {id}")]
    IngredientNotFound {
        /// Requested id
        id: i64,
    },

    /// No recipe with this id.
    #[error("Recipe not found: {id}")]
    RecipeNotFound {
        /// Requested id
        id: i64,
    },

    /// No section with this id (or it belongs to another recipe).
    #[error("Section not found: {id}")]
    SectionNotFound {
        /// Requested id
        id: i64,
    },

    /// No ingredient line with this id.
    #[error("Recipe line not found: {id}")]
    LineNotFound {
        /// Requested id
        id: i64,
    },

    /// No event with this id.
    #[error("Event not found: {id}")]
    EventNotFound {
        /// Requested id
        id: i64,
    },

    /// No menu item with this id.
    #[error("Menu item not found: {id}")]
    MenuItemNotFound {
        /// Requested id
        id: i64,
    },

    /// A save was requested while another one is still pending.
    #[error("A save is already in progress")]
    SaveInProgress,

    /// The recipe editor was driven through an invalid transition.
    #[error("Cannot {action} while {state}")]
    InvalidTransition {
        /// Current editor state
        state: &'static str,
        /// Attempted action
        action: &'static str,
    },

    /// I/O failure (config files).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Field errors when this is a validation failure.
    #[must_use]
    pub const fn field_errors(&self) -> Option<&FieldErrors> {
        match self {
            Self::Validation(errors) => Some(errors),
            _ => None,
        }
    }
}

/// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;

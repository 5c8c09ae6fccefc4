//! UI settings persisted as JSON in the `system_state` table.
//!
//! The store is handed to whoever needs it; nothing reads settings from global
//! state. A missing or unreadable row loads as the defaults.

use crate::{
    entities::{SystemState, system_state},
    errors::{Error, FieldErrors, Result},
};
use sea_orm::{ConnectionTrait, Set, prelude::*};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Key of the settings row.
pub const UI_SETTINGS_KEY: &str = "ui_settings";

/// Presentation preferences.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UiSettings {
    /// Rows per page in list views
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    /// Dashboard widgets in display order
    #[serde(default = "default_widget_layout")]
    pub widget_layout: Vec<String>,
}

const fn default_page_size() -> u32 {
    25
}

fn default_widget_layout() -> Vec<String> {
    ["recipes", "events", "low_stock"]
        .into_iter()
        .map(String::from)
        .collect()
}

impl Default for UiSettings {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            widget_layout: default_widget_layout(),
        }
    }
}

/// Loads and saves [`UiSettings`] through a database connection.
#[derive(Debug, Clone, Copy)]
pub struct SettingsStore<'a, C> {
    db: &'a C,
    key: &'a str,
}

impl<'a, C> SettingsStore<'a, C>
where
    C: ConnectionTrait,
{
    /// Store using the default settings key.
    pub const fn new(db: &'a C) -> Self {
        Self {
            db,
            key: UI_SETTINGS_KEY,
        }
    }

    /// Store using a custom key, e.g. one per tenant.
    pub const fn with_key(db: &'a C, key: &'a str) -> Self {
        Self { db, key }
    }

    async fn find_row(&self) -> Result<Option<system_state::Model>> {
        SystemState::find()
            .filter(system_state::Column::Key.eq(self.key))
            .one(self.db)
            .await
            .map_err(Into::into)
    }

    /// Reads the settings, falling back to defaults.
    pub async fn load(&self) -> Result<UiSettings> {
        let Some(row) = self.find_row().await? else {
            debug!("No '{}' row, using default settings", self.key);
            return Ok(UiSettings::default());
        };
        Ok(serde_json::from_str(&row.value).unwrap_or_else(|e| {
            warn!("Stored '{}' is not valid settings JSON ({e}), using defaults", self.key);
            UiSettings::default()
        }))
    }

    /// Writes the settings, replacing any previous value.
    ///
    /// # Errors
    /// `Error::Validation` when `page_size` is 0.
    pub async fn save(&self, settings: &UiSettings) -> Result<()> {
        if settings.page_size == 0 {
            return Err(Error::Validation(FieldErrors::single(
                "page_size",
                "Page size must be at least 1",
            )));
        }
        let value = serde_json::to_string(settings)?;
        let now = chrono::Utc::now().naive_utc();

        if let Some(row) = self.find_row().await? {
            let mut active: system_state::ActiveModel = row.into();
            active.value = Set(value);
            active.updated_at = Set(now);
            active.update(self.db).await?;
        } else {
            system_state::ActiveModel {
                key: Set(self.key.to_string()),
                value: Set(value),
                updated_at: Set(now),
                ..Default::default()
            }
            .insert(self.db)
            .await?;
        }
        debug!("Saved settings under '{}'", self.key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::setup_test_db;

    #[tokio::test]
    async fn test_load_defaults_when_missing() -> Result<()> {
        let db = setup_test_db().await?;
        let store = SettingsStore::new(&db);
        assert_eq!(store.load().await?, UiSettings::default());
        Ok(())
    }

    #[tokio::test]
    async fn test_save_then_load() -> Result<()> {
        let db = setup_test_db().await?;
        let store = SettingsStore::new(&db);

        let mut settings = UiSettings::default();
        settings.page_size = 50;
        store.save(&settings).await?;

        settings.widget_layout = vec!["events".to_string()];
        store.save(&settings).await?;

        assert_eq!(store.load().await?, settings);
        assert_eq!(SystemState::find().all(&db).await?.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_keys_are_independent_and_validated() -> Result<()> {
        let db = setup_test_db().await?;
        let tenant = SettingsStore::with_key(&db, "ui_settings:bistro");
        tenant
            .save(&UiSettings {
                page_size: 10,
                widget_layout: Vec::new(),
            })
            .await?;

        assert_eq!(SettingsStore::new(&db).load().await?, UiSettings::default());
        assert_eq!(tenant.load().await?.page_size, 10);

        let err = tenant
            .save(&UiSettings {
                page_size: 0,
                widget_layout: Vec::new(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        Ok(())
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let settings: UiSettings = serde_json::from_str(r#"{"page_size": 5}"#).unwrap();
        assert_eq!(settings.page_size, 5);
        assert_eq!(settings.widget_layout, default_widget_layout());
    }
}

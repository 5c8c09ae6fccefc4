/// Database configuration and connection management
pub mod database;

/// Seed ingredient catalog and costing defaults from config.toml
pub mod catalog;

/// Injected UI settings store backed by `system_state`
pub mod settings;

/// Deployment configuration loaded from config.toml
pub mod app;

/// Database configuration and connection management
pub mod database;

/// Notification templates and their overrides
pub mod templates;

pub use app::{AppConfig, load_config, load_default_config};

//! Shared test utilities for the inactive account guard.
//!
//! This module provides common helper functions for setting up test databases
//! and creating accounts and configuration with sensible defaults.

use crate::{
    config::{
        AppConfig,
        app::{MailConfig, SchedulerConfig},
        templates::TemplateOverrides,
    },
    core::{jobs::JobContext, notification::Notifier, settings::PluginConfig},
    entities::{AccountActivity, account, account_activity},
    errors::Result,
    mail::{Mailer, Transport},
};
use chrono::{DateTime, Duration, Utc};
use sea_orm::{ActiveModelTrait, ActiveValue::Set, DatabaseConnection, EntityTrait};

/// Creates an in-memory `SQLite` database with all tables initialized.
/// This is the standard setup for all integration tests.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

/// Creates a test account.
///
/// # Defaults
/// * `display_name`: the login with its first letter upper-cased
/// * `email`: `{login}@example.com`
pub async fn create_test_account(
    db: &DatabaseConnection,
    login: &str,
    roles: &str,
) -> Result<account::Model> {
    let mut chars = login.chars();
    let display_name = chars
        .next()
        .map(|first| first.to_uppercase().chain(chars).collect())
        .unwrap_or_default();

    let model = account::ActiveModel {
        user_login: Set(login.to_string()),
        display_name: Set(display_name),
        email: Set(format!("{login}@example.com")),
        roles: Set(roles.to_string()),
        ..Default::default()
    };
    Ok(model.insert(db).await?)
}

/// Writes activity metadata for an account, replacing any existing row.
/// Disabled accounts get `date_blocked` set to their last login (or the epoch).
pub async fn set_activity(
    db: &DatabaseConnection,
    account_id: i64,
    last_login: Option<DateTime<Utc>>,
    disabled: bool,
) -> Result<account_activity::Model> {
    AccountActivity::delete_by_id(account_id).exec(db).await?;

    let date_blocked = disabled.then(|| last_login.unwrap_or(DateTime::<Utc>::UNIX_EPOCH));
    let model = account_activity::ActiveModel {
        account_id: Set(account_id),
        last_login: Set(last_login),
        disabled: Set(disabled),
        date_blocked: Set(date_blocked),
        last_login_attempt: Set(None),
        reminder_sent_at: Set(None),
    };
    Ok(model.insert(db).await?)
}

/// Default policy with an activation date a year before `now`, so accounts
/// that never logged in count as inactive.
pub fn test_config(now: DateTime<Utc>) -> PluginConfig {
    PluginConfig::with_defaults(now - Duration::days(365))
}

/// Deployment configuration used by notification tests.
pub fn test_app_config() -> AppConfig {
    AppConfig {
        site_name: "Test Site".to_string(),
        admin_email: "admin@example.com".to_string(),
        admin_link: "https://example.com/admin/users".to_string(),
        mail: MailConfig::default(),
        scheduler: SchedulerConfig::default(),
        templates: TemplateOverrides::default(),
    }
}

/// A job context over a fresh database whose mail ends up in the returned
/// in-memory transport.
pub async fn test_job_context() -> Result<(JobContext, Transport)> {
    let db = setup_test_db().await?;
    let outbox = Transport::memory();
    let mailer = Mailer::new(outbox.clone(), "noreply@example.com")?;
    let notifier = Notifier::new(mailer, &test_app_config());
    Ok((JobContext::new(db, notifier), outbox))
}

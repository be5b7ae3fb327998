//! Installing, reconfiguring and removing the guard.

use crate::{
    core::{
        disabled_index::DisabledIndex,
        scheduler::{Hook, Job, Recurrence, schedule, unschedule, unschedule_all},
        settings::{PluginConfig, SettingsInput, get_settings, load_settings, sanitize, save_settings},
    },
    errors::Result,
};
use chrono::{DateTime, Utc};
use sea_orm::DatabaseConnection;
use tracing::{info, instrument};

/// Prepares the guard for use.
///
/// Stores the default settings (activated at `now`) when none exist, makes sure
/// the disabled index is present and registers the daily passes the settings
/// ask for. Safe to call on every start.
#[instrument(skip(db))]
pub async fn activate(db: &DatabaseConnection, now: DateTime<Utc>) -> Result<PluginConfig> {
    let config = if let Some(config) = get_settings(db).await? {
        config
    } else {
        let defaults = PluginConfig::with_defaults(now);
        save_settings(db, &defaults).await?;
        info!("Stored default settings");
        defaults
    };

    DisabledIndex::load(db).await?;
    sync_schedules(db, &config, now).await?;
    Ok(config)
}

/// Registers or removes the daily passes to match `config`.
pub async fn sync_schedules(
    db: &DatabaseConnection,
    config: &PluginConfig,
    now: DateTime<Utc>,
) -> Result<()> {
    if config.auto_disable_enabled {
        schedule(db, &Job::BulkDisable, now, Some(Recurrence::Daily)).await?;
    } else {
        unschedule(db, Hook::BulkDisable).await?;
    }

    if config.send_reminders {
        schedule(db, &Job::SendReminders, now, Some(Recurrence::Daily)).await?;
    } else {
        unschedule(db, Hook::SendReminders).await?;
    }

    Ok(())
}

/// Validates and stores new settings, then updates the schedules.
pub async fn apply_settings(
    db: &DatabaseConnection,
    input: SettingsInput,
    now: DateTime<Utc>,
) -> Result<PluginConfig> {
    let current = load_settings(db, now).await?;
    let config = sanitize(input, &current)?;
    save_settings(db, &config).await?;
    sync_schedules(db, &config, now).await?;
    Ok(config)
}

/// Removes every scheduled event. Settings and account metadata are kept.
#[instrument(skip(db))]
pub async fn deactivate(db: &DatabaseConnection) -> Result<()> {
    unschedule_all(db).await?;
    info!("Guard deactivated");
    Ok(())
}

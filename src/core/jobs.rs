//! What each scheduled hook does when it fires.

use crate::{
    core::{
        account::{get_account_by_id, get_activity},
        notification::Notifier,
        reminder::send_reminders,
        scanner::scan_and_disable,
        scheduler::Job,
        settings::load_settings,
    },
    entities::{Account, account},
    errors::Result,
};
use chrono::{DateTime, Utc};
use sea_orm::{QueryOrder, prelude::*};
use tracing::{info, warn};

/// Everything a scheduled job needs
#[derive(Clone)]
pub struct JobContext {
    /// Database connection
    pub database: DatabaseConnection,
    /// Email delivery
    pub notifier: Notifier,
}

impl JobContext {
    /// Bundles a connection and a notifier.
    #[must_use]
    pub const fn new(database: DatabaseConnection, notifier: Notifier) -> Self {
        Self { database, notifier }
    }
}

/// Runs one job at `now`.
pub async fn run_job(ctx: &JobContext, job: &Job, now: DateTime<Utc>) -> Result<()> {
    let db = &ctx.database;
    let config = load_settings(db, now).await?;

    match job {
        Job::BulkDisable => {
            if config.auto_disable_enabled {
                scan_and_disable(db, &config, now).await?;
            } else {
                info!("Automatic disabling is off, skipping bulk pass");
            }
        }
        Job::SendReminders => {
            send_reminders(db, &config, now).await?;
        }
        Job::DisabledNotification {
            account_id,
            send_to,
        } => {
            let Some(account) = get_account_by_id(db, *account_id).await? else {
                warn!(account_id, "Disabled notification for unknown account");
                return Ok(());
            };
            let activity = get_activity(db, *account_id).await?;
            let params =
                ctx.notifier
                    .disabled_params(*send_to, &account, activity.as_ref(), config.days_limit);
            ctx.notifier.send_all(params).await;
        }
        Job::BulkDisabledNotification { account_ids } => {
            let accounts = Account::find()
                .filter(account::Column::Id.is_in(account_ids.iter().copied()))
                .order_by_asc(account::Column::Id)
                .all(db)
                .await?;
            if accounts.is_empty() {
                return Ok(());
            }
            let params = ctx.notifier.bulk_disabled_params(&accounts, config.days_limit);
            ctx.notifier.send_all(vec![params]).await;
        }
        Job::ReminderNotification { account_id } => {
            let Some(account) = get_account_by_id(db, *account_id).await? else {
                warn!(account_id, "Reminder for unknown account");
                return Ok(());
            };
            let params = ctx.notifier.reminder_params(&account, config.days_limit);
            ctx.notifier.send_all(vec![params]).await;
        }
    }

    Ok(())
}

//! Bulk disable pass.
//!
//! Runs daily through the scheduler. Every account that is neither in the
//! disabled index nor holds an excluded role is evaluated; inactive ones are
//! disabled in one transaction together with the index update and the queued
//! notifications.

use crate::{
    core::{
        account::disable,
        activity::is_active,
        disabled_index::DisabledIndex,
        scheduler::{Job, schedule_single},
        settings::{NotificationTarget, PluginConfig},
    },
    entities::{Account, AccountActivity, account, account_activity},
    errors::Result,
};
use chrono::{DateTime, Utc};
use sea_orm::{QueryOrder, TransactionTrait, prelude::*};
use std::collections::HashMap;
use tracing::{info, instrument, warn};

/// Outcome of one bulk pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanResult {
    /// Accounts disabled by this pass, in id order
    pub newly_disabled: Vec<i64>,
    /// Accounts that were evaluated
    pub evaluated: usize,
}

/// Disables every inactive, non-excluded account that is not disabled yet.
///
/// Safe to run repeatedly: indexed accounts are skipped, so a second run
/// without new inactivity disables nothing. Accounts that are disabled but
/// missing from the index are added to it without being notified again.
#[instrument(skip(db, config))]
pub async fn scan_and_disable(
    db: &DatabaseConnection,
    config: &PluginConfig,
    now: DateTime<Utc>,
) -> Result<ScanResult> {
    let txn = db.begin().await?;

    let mut index = DisabledIndex::load(&txn).await?;

    let accounts = Account::find()
        .order_by_asc(account::Column::Id)
        .all(&txn)
        .await?;

    let activities: HashMap<i64, account_activity::Model> = AccountActivity::find()
        .all(&txn)
        .await?
        .into_iter()
        .map(|activity| (activity.account_id, activity))
        .collect();

    let mut result = ScanResult::default();
    let mut repaired = Vec::new();

    for account in accounts.iter().filter(|a| !index.contains(a.id)) {
        let activity = activities
            .get(&account.id)
            .cloned()
            .unwrap_or_else(|| account_activity::Model::empty(account.id));

        // Disabled outside of the index, e.g. by a manual edit
        if activity.disabled {
            repaired.push(account.id);
            continue;
        }

        if config.is_excluded(account) {
            continue;
        }
        result.evaluated += 1;

        if !is_active(&activity, config, now) && disable(&txn, account, config, now, true).await? {
            result.newly_disabled.push(account.id);
        }
    }

    if !repaired.is_empty() {
        warn!(?repaired, "Disabled accounts were missing from the index");
        index.extend(repaired.iter().copied());
        index.save(&txn).await?;
    }

    if !result.newly_disabled.is_empty() {
        if config.notification_target.includes_administrator() {
            let job = Job::BulkDisabledNotification {
                account_ids: result.newly_disabled.clone(),
            };
            schedule_single(&txn, &job, now).await?;
        }

        // Customers are told regardless of the configured notification target.
        for id in &result.newly_disabled {
            let job = Job::DisabledNotification {
                account_id: *id,
                send_to: NotificationTarget::Customer,
            };
            schedule_single(&txn, &job, now).await?;
        }

        index.extend(result.newly_disabled.iter().copied());
        index.save(&txn).await?;
    }

    txn.commit().await?;

    info!(
        evaluated = result.evaluated,
        disabled = result.newly_disabled.len(),
        "Bulk disable pass finished"
    );
    Ok(result)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::core::{
        account::{get_activity, reactivate, reactivate_all},
        scheduler::{Hook, is_scheduled, next_scheduled},
    };
    use crate::test_utils::*;
    use chrono::Duration;

    #[tokio::test]
    async fn test_scan_disables_only_inactive_non_excluded() -> Result<()> {
        let db = setup_test_db().await?;
        let now = Utc::now();
        let config = test_config(now);

        let stale = create_test_account(&db, "stale", "subscriber").await?;
        let recent = create_test_account(&db, "recent", "subscriber").await?;
        let boss = create_test_account(&db, "boss", "editor,subscriber").await?;
        let never = create_test_account(&db, "never", "subscriber").await?;
        set_activity(&db, stale.id, Some(now - Duration::days(91)), false).await?;
        set_activity(&db, recent.id, Some(now - Duration::days(90)), false).await?;
        set_activity(&db, boss.id, Some(now - Duration::days(500)), false).await?;

        let result = scan_and_disable(&db, &config, now).await?;

        // `never` falls back to the activation date, which is long past
        assert_eq!(result.newly_disabled, vec![stale.id, never.id]);
        assert_eq!(result.evaluated, 3);

        let activity = get_activity(&db, stale.id).await?.unwrap();
        assert!(activity.disabled);
        assert_eq!(activity.date_blocked, Some(now));
        assert!(activity.last_login_attempt.is_none());
        assert!(!get_activity(&db, boss.id).await?.unwrap().disabled);

        let index = DisabledIndex::load(&db).await?;
        assert!(index.contains(stale.id) && index.contains(never.id));
        assert_eq!(index.len(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_scenario_second_scan_disables_nothing() -> Result<()> {
        let db = setup_test_db().await?;
        let now = Utc::now();
        let config = test_config(now);
        let stale = create_test_account(&db, "stale", "subscriber").await?;
        set_activity(&db, stale.id, Some(now - Duration::days(200)), false).await?;

        let first = scan_and_disable(&db, &config, now).await?;
        assert_eq!(first.newly_disabled, vec![stale.id]);

        let second = scan_and_disable(&db, &config, now + Duration::minutes(1)).await?;
        assert!(second.newly_disabled.is_empty());
        assert_eq!(second.evaluated, 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_scan_queues_customer_notifications_regardless_of_target() -> Result<()> {
        let db = setup_test_db().await?;
        let now = Utc::now();
        let config = test_config(now);
        assert_eq!(config.notification_target, NotificationTarget::None);
        let stale = create_test_account(&db, "stale", "subscriber").await?;

        scan_and_disable(&db, &config, now).await?;

        let customer = Job::DisabledNotification {
            account_id: stale.id,
            send_to: NotificationTarget::Customer,
        };
        assert!(is_scheduled(&db, &customer).await?);
        assert!(next_scheduled(&db, Hook::SendBulkDisabledNotification).await?.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_scan_queues_admin_summary_when_configured() -> Result<()> {
        let db = setup_test_db().await?;
        let now = Utc::now();
        let mut config = test_config(now);
        config.notification_target = NotificationTarget::Administrator;
        let a = create_test_account(&db, "a", "subscriber").await?;
        let b = create_test_account(&db, "b", "subscriber").await?;

        scan_and_disable(&db, &config, now).await?;

        let summary = Job::BulkDisabledNotification {
            account_ids: vec![a.id, b.id],
        };
        assert!(is_scheduled(&db, &summary).await?);

        // Nothing new to report on the next pass
        scan_and_disable(&db, &config, now).await?;
        assert_eq!(
            crate::entities::ScheduledEvent::find()
                .filter(crate::entities::scheduled_event::Column::Hook.eq(Hook::SendBulkDisabledNotification.as_str()))
                .count(&db)
                .await?,
            1
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_reactivated_account_is_scanned_again() -> Result<()> {
        let db = setup_test_db().await?;
        let now = Utc::now();
        let config = test_config(now);
        let stale = create_test_account(&db, "stale", "subscriber").await?;

        scan_and_disable(&db, &config, now).await?;
        reactivate(&db, stale.id).await?;

        // Without a new login the activation date is still the baseline
        let rescan = scan_and_disable(&db, &config, now).await?;
        assert_eq!(rescan.newly_disabled, vec![stale.id]);
        Ok(())
    }

    #[tokio::test]
    async fn test_scan_restores_index_after_manual_disable() -> Result<()> {
        let db = setup_test_db().await?;
        let now = Utc::now();
        let config = test_config(now);

        // Index persisted before the account was disabled by hand
        assert!(DisabledIndex::load(&db).await?.is_empty());
        let stale = create_test_account(&db, "stale", "subscriber").await?;
        let recent = create_test_account(&db, "recent", "subscriber").await?;
        set_activity(&db, stale.id, Some(now - Duration::days(200)), true).await?;
        set_activity(&db, recent.id, Some(now - Duration::days(1)), true).await?;
        assert!(DisabledIndex::load(&db).await?.is_empty());

        let result = scan_and_disable(&db, &config, now).await?;
        assert!(result.newly_disabled.is_empty());
        assert!(next_scheduled(&db, Hook::SendDisabledNotification).await?.is_none());

        let index = DisabledIndex::load(&db).await?;
        assert!(index.contains(stale.id) && index.contains(recent.id));

        assert_eq!(reactivate_all(&db).await?, vec![stale.id, recent.id]);
        assert!(!get_activity(&db, stale.id).await?.unwrap().disabled);
        Ok(())
    }

    #[tokio::test]
    async fn test_scan_with_large_index() -> Result<()> {
        let db = setup_test_db().await?;
        let now = Utc::now();
        let config = test_config(now);
        let stale = create_test_account(&db, "stale", "subscriber").await?;

        let mut index = DisabledIndex::load(&db).await?;
        index.extend(100_000..140_000);
        index.save(&db).await?;

        let result = scan_and_disable(&db, &config, now).await?;
        assert_eq!(result.newly_disabled, vec![stale.id]);
        assert_eq!(DisabledIndex::load(&db).await?.len(), 40_001);
        Ok(())
    }
}

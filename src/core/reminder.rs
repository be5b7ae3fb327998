//! Reminder pass - warns users the day before the bulk pass would disable them.

use crate::{
    core::{
        activity::{baseline, days_until_disable},
        disabled_index::DisabledIndex,
        scheduler::{Job, schedule_single},
        settings::PluginConfig,
    },
    entities::{Account, AccountActivity, account, account_activity},
    errors::Result,
};
use chrono::{DateTime, Utc};
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*};
use std::collections::HashMap;
use tracing::{info, instrument};

/// Queues a reminder for every account one day away from being disabled.
///
/// An account is reminded at most once per period of inactivity: a new login
/// moves its baseline past the recorded reminder and makes it eligible again.
/// Returns the reminded account ids.
#[instrument(skip(db, config))]
pub async fn send_reminders(
    db: &DatabaseConnection,
    config: &PluginConfig,
    now: DateTime<Utc>,
) -> Result<Vec<i64>> {
    if !config.send_reminders {
        return Ok(Vec::new());
    }

    let txn = db.begin().await?;

    let index = DisabledIndex::load(&txn).await?;
    let candidates = Account::find()
        .order_by_asc(account::Column::Id)
        .all(&txn)
        .await?;

    let activities: HashMap<i64, account_activity::Model> = AccountActivity::find()
        .all(&txn)
        .await?
        .into_iter()
        .map(|activity| (activity.account_id, activity))
        .collect();

    let mut reminded = Vec::new();

    for account in candidates
        .iter()
        .filter(|a| !index.contains(a.id) && !config.is_excluded(a)) {
        let existing = activities.get(&account.id);
        let activity = existing
            .cloned()
            .unwrap_or_else(|| account_activity::Model::empty(account.id));

        if activity.disabled || days_until_disable(&activity, config, now) != 1 {
            continue;
        }

        let since = baseline(&activity, config);
        if activity.reminder_sent_at.is_some_and(|sent| sent >= since) {
            continue;
        }

        let record = account_activity::ActiveModel {
            account_id: Set(account.id),
            reminder_sent_at: Set(Some(now)),
            ..Default::default()
        };
        if existing.is_some() {
            record.update(&txn).await?;
        } else {
            account_activity::ActiveModel {
                disabled: Set(false),
                last_login: Set(None),
                date_blocked: Set(None),
                last_login_attempt: Set(None),
                ..record
            }
            .insert(&txn)
            .await?;
        }

        schedule_single(&txn, &Job::ReminderNotification { account_id: account.id }, now).await?;
        reminded.push(account.id);
    }

    txn.commit().await?;

    info!(count = reminded.len(), "Reminder pass finished");
    Ok(reminded)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::core::{account::get_activity, scheduler::is_scheduled};
    use crate::test_utils::*;
    use chrono::Duration;

    fn reminding(now: DateTime<Utc>) -> PluginConfig {
        PluginConfig {
            send_reminders: true,
            ..test_config(now)
        }
    }

    #[tokio::test]
    async fn test_reminds_accounts_due_tomorrow_once() -> Result<()> {
        let db = setup_test_db().await?;
        let now = Utc::now();
        let config = reminding(now);

        let due = create_test_account(&db, "due", "subscriber").await?;
        let early = create_test_account(&db, "early", "subscriber").await?;
        let boss = create_test_account(&db, "boss", "administrator").await?;
        set_activity(&db, due.id, Some(now - Duration::days(90)), false).await?;
        set_activity(&db, early.id, Some(now - Duration::days(60)), false).await?;
        set_activity(&db, boss.id, Some(now - Duration::days(90)), false).await?;

        assert_eq!(send_reminders(&db, &config, now).await?, vec![due.id]);
        assert!(is_scheduled(&db, &Job::ReminderNotification { account_id: due.id }).await?);
        assert_eq!(
            get_activity(&db, due.id).await?.unwrap().reminder_sent_at,
            Some(now)
        );

        // A second pass the same day does not remind again
        assert!(send_reminders(&db, &config, now + Duration::hours(2)).await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_reminds_never_logged_in_accounts() -> Result<()> {
        let db = setup_test_db().await?;
        let now = Utc::now();
        let config = PluginConfig {
            activation_date: now - Duration::days(90),
            ..reminding(now)
        };
        let fresh = create_test_account(&db, "fresh", "subscriber").await?;

        assert_eq!(send_reminders(&db, &config, now).await?, vec![fresh.id]);
        let activity = get_activity(&db, fresh.id).await?.unwrap();
        assert!(!activity.disabled);
        assert!(activity.last_login.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_disabled_setting_sends_nothing() -> Result<()> {
        let db = setup_test_db().await?;
        let now = Utc::now();
        let due = create_test_account(&db, "due", "subscriber").await?;
        set_activity(&db, due.id, Some(now - Duration::days(90)), false).await?;

        assert!(send_reminders(&db, &test_config(now), now).await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_reminders_with_large_index() -> Result<()> {
        let db = setup_test_db().await?;
        let now = Utc::now();
        let due = create_test_account(&db, "due", "subscriber").await?;
        set_activity(&db, due.id, Some(now - Duration::days(90)), false).await?;

        let mut index = DisabledIndex::load(&db).await?;
        index.extend(100_000..140_000);
        index.save(&db).await?;

        assert_eq!(send_reminders(&db, &reminding(now), now).await?, vec![due.id]);
        Ok(())
    }
}

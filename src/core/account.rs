//! Account state machine - login checks, disabling and reactivation.
//!
//! An account is Active until it is disabled, either when a login attempt finds
//! it inactive or by the bulk pass. Reactivation clears the inactivity
//! metadata, which makes it Active again. Excluded roles are never disabled.

use crate::{
    core::{
        activity::is_active,
        disabled_index::DisabledIndex,
        scheduler::{Job, schedule_single},
        settings::{NotificationTarget, PluginConfig},
    },
    entities::{Account, AccountActivity, account, account_activity},
    errors::{Error, Result},
};
use chrono::{DateTime, Utc};
use sea_orm::{Set, TransactionTrait, prelude::*};
use tracing::{debug, info, instrument};

/// Finds an account by its id.
pub async fn get_account_by_id<C>(db: &C, account_id: i64) -> Result<Option<account::Model>>
where
    C: ConnectionTrait,
{
    Account::find_by_id(account_id)
        .one(db)
        .await
        .map_err(Into::into)
}

/// Finds an account by its login name.
pub async fn get_account_by_login(
    db: &DatabaseConnection,
    user_login: &str,
) -> Result<Option<account::Model>> {
    Account::find()
        .filter(account::Column::UserLogin.eq(user_login))
        .one(db)
        .await
        .map_err(Into::into)
}

/// The stored inactivity metadata of an account, if any was ever recorded.
pub async fn get_activity<C>(db: &C, account_id: i64) -> Result<Option<account_activity::Model>>
where
    C: ConnectionTrait,
{
    AccountActivity::find_by_id(account_id)
        .one(db)
        .await
        .map_err(Into::into)
}

/// Writes `activity`, inserting the row when it does not exist yet.
async fn save_activity<C>(db: &C, activity: account_activity::Model, exists: bool) -> Result<()>
where
    C: ConnectionTrait,
{
    let active_model = account_activity::ActiveModel {
        account_id: Set(activity.account_id),
        last_login: Set(activity.last_login),
        disabled: Set(activity.disabled),
        date_blocked: Set(activity.date_blocked),
        last_login_attempt: Set(activity.last_login_attempt),
        reminder_sent_at: Set(activity.reminder_sent_at),
    };

    if exists {
        active_model.update(db).await?;
    } else {
        active_model.insert(db).await?;
    }
    Ok(())
}

/// Loads the activity of `account_id`, or an empty record if there is none.
/// The boolean tells whether the row already exists.
async fn load_activity<C>(db: &C, account_id: i64) -> Result<(account_activity::Model, bool)>
where
    C: ConnectionTrait,
{
    Ok(get_activity(db, account_id).await?.map_or_else(
        || (account_activity::Model::empty(account_id), false),
        |activity| (activity, true),
    ))
}

/// Records a successful authentication at `now`.
#[instrument(skip(db))]
pub async fn update_last_login<C>(db: &C, account_id: i64, now: DateTime<Utc>) -> Result<()>
where
    C: ConnectionTrait,
{
    let (mut activity, exists) = load_activity(db, account_id).await?;
    activity.last_login = Some(now);
    save_activity(db, activity, exists).await
}

/// Disables `account`.
///
/// Non-bulk calls come from refused logins: they always record the attempt
/// and make sure the account is in the disabled index, then queue a
/// "disabled" notification for `config.notification_target` if the account
/// was newly disabled. Bulk calls leave the index and the
/// notifications to the bulk pass.
///
/// Disabling an already disabled account only records the attempt; it never
/// moves `date_blocked` or queues another notification.
///
/// Returns `true` if the account was newly disabled.
#[instrument(skip(db, account, config), fields(account.id = account.id))]
pub async fn disable<C>(
    db: &C,
    account: &account::Model,
    config: &PluginConfig,
    now: DateTime<Utc>,
    is_bulk: bool,
) -> Result<bool>
where
    C: ConnectionTrait,
{
    let (mut activity, exists) = load_activity(db, account.id).await?;

    if !is_bulk {
        activity.last_login_attempt = Some(now);
    }

    let newly_disabled = !activity.disabled;
    if newly_disabled {
        activity.disabled = true;
        activity.date_blocked = Some(now);
    }

    save_activity(db, activity, exists).await?;

    if !is_bulk {
        let mut index = DisabledIndex::load(db).await?;
        if index.insert(account.id) {
            index.save(db).await?;
        }
    }

    if !newly_disabled {
        debug!("Account already disabled");
        return Ok(false);
    }

    info!(bulk = is_bulk, "Account disabled");

    if !is_bulk {
        if config.notification_target != NotificationTarget::None {
            let job = Job::DisabledNotification {
                account_id: account.id,
                send_to: config.notification_target,
            };
            schedule_single(db, &job, now).await?;
        }
    }

    Ok(true)
}

/// Checks an authenticating account against the inactivity policy.
///
/// Accounts with an excluded role are returned unchanged. Accounts that are
/// already disabled or are inactive get disabled and the login is refused with
/// [`Error::InactiveUser`]. Everyone else is returned unchanged.
#[instrument(skip(db, account, _password, config), fields(account.id = account.id))]
pub async fn evaluate_on_login(
    db: &DatabaseConnection,
    account: account::Model,
    _password: &str,
    config: &PluginConfig,
    now: DateTime<Utc>,
) -> Result<account::Model> {
    if config.is_excluded(&account) {
        return Ok(account);
    }

    let activity = get_activity(db, account.id)
        .await?
        .unwrap_or_else(|| account_activity::Model::empty(account.id));

    if activity.disabled || !is_active(&activity, config, now) {
        let txn = db.begin().await?;
        disable(&txn, &account, config, now, false).await?;
        txn.commit().await?;

        info!("Login refused for inactive account");
        return Err(Error::InactiveUser {
            username: account.display_name,
            days_limit: config.days_limit,
        });
    }

    Ok(account)
}

/// Full login hook: evaluates the account and, when the login may proceed,
/// records it as the new last login.
///
/// This is the entry point for the authentication pipeline that embeds the
/// crate; neither the bot nor the scheduler authenticates accounts.
pub async fn login(
    db: &DatabaseConnection,
    account: account::Model,
    password: &str,
    config: &PluginConfig,
    now: DateTime<Utc>,
) -> Result<account::Model> {
    let account = evaluate_on_login(db, account, password, config, now).await?;
    update_last_login(db, account.id, now).await?;
    Ok(account)
}

/// Clears the last-login and disabled metadata of one account. Returns `true`
/// if anything changed.
async fn clear_activity<C>(db: &C, account_id: i64) -> Result<bool>
where
    C: ConnectionTrait,
{
    let Some(mut activity) = get_activity(db, account_id).await? else {
        return Ok(false);
    };

    if !activity.disabled && activity.last_login.is_none() {
        return Ok(false);
    }

    activity.last_login = None;
    activity.disabled = false;
    save_activity(db, activity, true).await?;
    Ok(true)
}

/// Reactivates an account by deleting its last-login and disabled metadata and
/// dropping it from the disabled index.
///
/// Unknown, never-disabled and already reactivated accounts are a no-op.
/// Returns `true` if anything changed.
#[instrument(skip(db))]
pub async fn reactivate(db: &DatabaseConnection, account_id: i64) -> Result<bool> {
    let txn = db.begin().await?;

    let cleared = clear_activity(&txn, account_id).await?;

    let mut index = DisabledIndex::load(&txn).await?;
    let removed = index.remove(account_id);
    if removed {
        index.save(&txn).await?;
    }

    txn.commit().await?;

    if cleared || removed {
        info!("Account reactivated");
    }
    Ok(cleared || removed)
}

/// Reactivates every account in the disabled index; returns their ids.
#[instrument(skip(db))]
pub async fn reactivate_all(db: &DatabaseConnection) -> Result<Vec<i64>> {
    let txn = db.begin().await?;

    let mut index = DisabledIndex::load(&txn).await?;
    let ids = index.take_all();
    for id in &ids {
        clear_activity(&txn, *id).await?;
    }
    index.save(&txn).await?;

    txn.commit().await?;

    info!(count = ids.len(), "Reactivated all disabled accounts");
    Ok(ids)
}

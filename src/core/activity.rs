//! Activity evaluation - decides whether an account still counts as active.

use crate::{
    core::{clock::signed_day_difference, settings::PluginConfig},
    entities::account_activity,
};
use chrono::{DateTime, Utc};

/// The moment inactivity is measured from: the last login, or the activation
/// date for accounts that never logged in since the guard was installed.
#[must_use]
pub fn baseline(activity: &account_activity::Model, config: &PluginConfig) -> DateTime<Utc> {
    activity.last_login.unwrap_or(config.activation_date)
}

/// Whole days since the account's baseline.
#[must_use]
pub fn days_since_activity(
    activity: &account_activity::Model,
    config: &PluginConfig,
    now: DateTime<Utc>,
) -> i64 {
    signed_day_difference(baseline(activity, config), now, true)
}

/// An account is inactive once more than `days_limit` days passed since its
/// baseline. Exactly `days_limit` days is still active.
#[must_use]
pub fn is_active(
    activity: &account_activity::Model,
    config: &PluginConfig,
    now: DateTime<Utc>,
) -> bool {
    days_since_activity(activity, config, now) <= i64::from(config.days_limit)
}

/// Days left until the account becomes inactive; `1` means the next daily
/// pass disables it, `0` or less means it is already inactive.
#[must_use]
pub fn days_until_disable(
    activity: &account_activity::Model,
    config: &PluginConfig,
    now: DateTime<Utc>,
) -> i64 {
    i64::from(config.days_limit) + 1 - days_since_activity(activity, config, now)
}

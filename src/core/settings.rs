//! Plugin settings - the inactivity policy and its persistence.
//!
//! Settings are a singleton stored as TOML under the `settings` key of the
//! system state table. Every write goes through [`sanitize`], which is the only
//! place `days_limit` and the other fields are validated.

use crate::{
    core::state::{get_state_value, set_state_value},
    entities::account,
    errors::{Error, Result},
};
use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::ConnectionTrait;
use serde::{Deserialize, Serialize};
use std::{collections::BTreeSet, fmt, str::FromStr};
use tracing::{info, instrument};

const SETTINGS_KEY: &str = "settings";

/// Inactivity threshold used when nothing was configured
pub const DEFAULT_DAYS_LIMIT: u32 = 90;

/// Who receives "account disabled" notifications
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationTarget {
    /// Nobody
    #[default]
    None,
    /// The disabled user
    Customer,
    /// The site administrator
    Administrator,
    /// Both the user and the administrator
    All,
}

impl NotificationTarget {
    /// Stable lowercase name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Customer => "customer",
            Self::Administrator => "administrator",
            Self::All => "all",
        }
    }

    /// Whether the disabled user is among the recipients
    #[must_use]
    pub const fn includes_customer(self) -> bool {
        matches!(self, Self::Customer | Self::All)
    }

    /// Whether the administrator is among the recipients
    #[must_use]
    pub const fn includes_administrator(self) -> bool {
        matches!(self, Self::Administrator | Self::All)
    }
}

impl fmt::Display for NotificationTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NotificationTarget {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "none" => Ok(Self::None),
            "customer" => Ok(Self::Customer),
            "administrator" => Ok(Self::Administrator),
            "all" => Ok(Self::All),
            other => Err(Error::Config {
                message: format!(
                    "Unknown notification target '{other}' (expected none, customer, administrator or all)"
                ),
            }),
        }
    }
}

/// The inactivity policy, passed explicitly into every evaluation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginConfig {
    /// Days without login after which an account is disabled; at least 1
    pub days_limit: u32,
    /// Baseline for accounts that never logged in while the guard was active
    pub activation_date: DateTime<Utc>,
    /// Roles that are never disabled
    pub excluded_roles: BTreeSet<String>,
    /// Whether the daily bulk pass is scheduled
    pub auto_disable_enabled: bool,
    /// Who is told when an account is disabled
    #[serde(default)]
    pub notification_target: NotificationTarget,
    /// Whether users are warned the day before they would be disabled
    pub send_reminders: bool,
}

impl PluginConfig {
    /// Default policy for a guard activated at `activation_date`.
    ///
    /// Administrators and editors are excluded from disabling by default.
    #[must_use]
    pub fn with_defaults(activation_date: DateTime<Utc>) -> Self {
        Self {
            days_limit: DEFAULT_DAYS_LIMIT,
            activation_date,
            excluded_roles: ["administrator", "editor"]
                .into_iter()
                .map(ToString::to_string)
                .collect(),
            auto_disable_enabled: true,
            notification_target: NotificationTarget::None,
            send_reminders: false,
        }
    }

    /// Whether `account` holds one of the excluded roles.
    #[must_use]
    pub fn is_excluded(&self, account: &account::Model) -> bool {
        account.has_any_role(&self.excluded_roles)
    }
}

/// Raw settings as submitted by an administrator; `None` keeps the current value
#[derive(Debug, Clone, Default)]
pub struct SettingsInput {
    /// Inactivity threshold in days
    pub days_limit: Option<i64>,
    /// `YYYY-MM-DD` or RFC 3339 timestamp
    pub activation_date: Option<String>,
    /// Role slugs that must never be disabled
    pub excluded_roles: Option<Vec<String>>,
    /// Toggle for the daily bulk pass
    pub auto_disable_enabled: Option<bool>,
    /// `none`, `customer`, `administrator` or `all`
    pub notification_target: Option<String>,
    /// Toggle for reminder emails
    pub send_reminders: Option<bool>,
}

fn parse_activation_date(raw: &str) -> Result<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(timestamp) = DateTime::parse_from_rfc3339(raw) {
        return Ok(timestamp.with_timezone(&Utc));
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
        .ok_or_else(|| Error::Config {
            message: format!("Invalid activation date '{raw}' (expected YYYY-MM-DD)"),
        })
}

/// Validates `input` and merges it over `current`.
///
/// # Errors
/// Returns `Error::Config` when the day limit is below 1 or does not fit, the
/// activation date cannot be parsed, or the notification target is unknown.
pub fn sanitize(input: SettingsInput, current: &PluginConfig) -> Result<PluginConfig> {
    let mut sanitized = current.clone();

    if let Some(days_limit) = input.days_limit {
        if days_limit < 1 {
            return Err(Error::Config {
                message: format!("Days limit must be at least 1, got {days_limit}"),
            });
        }
        sanitized.days_limit = u32::try_from(days_limit).map_err(|_| Error::Config {
            message: format!("Days limit {days_limit} is too large"),
        })?;
    }

    if let Some(raw) = input.activation_date {
        sanitized.activation_date = parse_activation_date(&raw)?;
    }

    if let Some(roles) = input.excluded_roles {
        sanitized.excluded_roles = roles
            .iter()
            .map(|role| role.trim().to_lowercase())
            .filter(|role| !role.is_empty())
            .collect();
    }

    if let Some(enabled) = input.auto_disable_enabled {
        sanitized.auto_disable_enabled = enabled;
    }

    if let Some(target) = input.notification_target {
        sanitized.notification_target = target.parse()?;
    }

    if let Some(enabled) = input.send_reminders {
        sanitized.send_reminders = enabled;
    }

    Ok(sanitized)
}

/// Reads the stored settings, `None` when the guard was never activated.
#[instrument(skip(db))]
pub async fn get_settings<C>(db: &C) -> Result<Option<PluginConfig>>
where
    C: ConnectionTrait,
{
    get_state_value(db, SETTINGS_KEY)
        .await?
        .map(|raw| toml::from_str(&raw).map_err(Error::from))
        .transpose()
}

/// Reads the stored settings, falling back to the defaults with `now` as the
/// activation date.
pub async fn load_settings<C>(db: &C, now: DateTime<Utc>) -> Result<PluginConfig>
where
    C: ConnectionTrait,
{
    Ok(get_settings(db)
        .await?
        .unwrap_or_else(|| PluginConfig::with_defaults(now)))
}

/// Persists `config` as the current settings.
#[instrument(skip(db, config))]
pub async fn save_settings<C>(db: &C, config: &PluginConfig) -> Result<()>
where
    C: ConnectionTrait,
{
    let raw = toml::to_string(config)?;
    set_state_value(db, SETTINGS_KEY, &raw).await?;
    info!(
        days_limit = config.days_limit,
        target = %config.notification_target,
        "Settings saved"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::setup_test_db;
    use chrono::TimeZone;

    fn current() -> PluginConfig {
        PluginConfig::with_defaults(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap())
    }

    #[test]
    fn test_defaults() {
        let config = current();
        assert_eq!(config.days_limit, 90);
        assert!(config.excluded_roles.contains("administrator"));
        assert!(config.excluded_roles.contains("editor"));
        assert_eq!(config.notification_target, NotificationTarget::None);
        assert!(config.auto_disable_enabled);
        assert!(!config.send_reminders);
    }

    #[test]
    fn test_sanitize_rejects_days_limit_below_one() {
        for bad in [0, -5] {
            let input = SettingsInput {
                days_limit: Some(bad),
                ..SettingsInput::default()
            };
            assert!(matches!(sanitize(input, &current()), Err(Error::Config { .. })));
        }
    }

    #[test]
    fn test_sanitize_merges_over_current() {
        let input = SettingsInput {
            days_limit: Some(30),
            excluded_roles: Some(vec![" Shop_Manager ".to_string(), String::new(), "shop_manager".to_string()]),
            notification_target: Some("All".to_string()),
            send_reminders: Some(true),
            ..SettingsInput::default()
        };

        let sanitized = sanitize(input, &current()).unwrap();
        assert_eq!(sanitized.days_limit, 30);
        assert_eq!(sanitized.excluded_roles.len(), 1);
        assert!(sanitized.excluded_roles.contains("shop_manager"));
        assert_eq!(sanitized.notification_target, NotificationTarget::All);
        assert!(sanitized.send_reminders);
        assert_eq!(sanitized.activation_date, current().activation_date);
        assert!(sanitized.auto_disable_enabled);
    }

    #[test]
    fn test_sanitize_activation_date_formats() {
        let input = SettingsInput {
            activation_date: Some("2023-06-15".to_string()),
            ..SettingsInput::default()
        };
        let sanitized = sanitize(input, &current()).unwrap();
        assert_eq!(
            sanitized.activation_date,
            Utc.with_ymd_and_hms(2023, 6, 15, 0, 0, 0).unwrap()
        );

        let input = SettingsInput {
            activation_date: Some("2023-06-15T10:30:00+02:00".to_string()),
            ..SettingsInput::default()
        };
        let sanitized = sanitize(input, &current()).unwrap();
        assert_eq!(
            sanitized.activation_date,
            Utc.with_ymd_and_hms(2023, 6, 15, 8, 30, 0).unwrap()
        );

        let input = SettingsInput {
            activation_date: Some("15/06/2023".to_string()),
            ..SettingsInput::default()
        };
        assert!(sanitize(input, &current()).is_err());
    }

    #[test]
    fn test_sanitize_rejects_unknown_target() {
        let input = SettingsInput {
            notification_target: Some("everyone".to_string()),
            ..SettingsInput::default()
        };
        assert!(sanitize(input, &current()).is_err());
    }

    #[tokio::test]
    async fn test_save_and_get_settings() -> Result<()> {
        let db = setup_test_db().await?;
        assert!(get_settings(&db).await?.is_none());

        let mut config = current();
        config.notification_target = NotificationTarget::Administrator;
        config.excluded_roles.insert("author".to_string());
        save_settings(&db, &config).await?;

        assert_eq!(get_settings(&db).await?, Some(config));
        Ok(())
    }

    #[tokio::test]
    async fn test_load_settings_falls_back_to_defaults() -> Result<()> {
        let db = setup_test_db().await?;
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();

        let config = load_settings(&db, now).await?;
        assert_eq!(config, PluginConfig::with_defaults(now));
        Ok(())
    }
}

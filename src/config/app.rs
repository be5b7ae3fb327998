//! Application configuration loading from config.toml
//!
//! `config.toml` describes the deployment: the site name used in emails, where the
//! administrator is reached, how mail leaves the process, how often the scheduler
//! wakes up and any template overrides. Inactivity settings are not here; they
//! live in the database and are edited through the admin commands.

use crate::config::templates::TemplateOverrides;
use crate::errors::{Error, Result};
use serde::Deserialize;
use std::path::Path;

/// Configuration structure representing the entire config.toml file
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Site name substituted as `{site_name}`
    #[serde(default = "default_site_name")]
    pub site_name: String,
    /// Recipient of administrator notifications
    pub admin_email: String,
    /// Link to the user management page, substituted as `{admin_link}`
    #[serde(default)]
    pub admin_link: String,
    /// Outgoing mail settings
    #[serde(default)]
    pub mail: MailConfig,
    /// Background scheduler settings
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    /// Template overrides per notification kind
    #[serde(default)]
    pub templates: TemplateOverrides,
}

fn default_site_name() -> String {
    "My Site".to_string()
}

/// Which mail backend to use
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MailTransportKind {
    /// Drop every email with a warning
    #[default]
    Blackhole,
    /// Relay through an SMTP server
    Smtp,
    /// Pipe to the local sendmail binary
    Sendmail,
}

/// SMTP encryption mode
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SmtpMode {
    /// Plain text
    Plain,
    /// Plain text upgraded with `STARTTLS`
    #[default]
    StartTls,
    /// TLS from the start
    Tls,
}

/// The `[mail]` section
#[derive(Debug, Clone, Deserialize)]
pub struct MailConfig {
    /// Backend selection
    #[serde(default)]
    pub transport: MailTransportKind,
    /// Sender mailbox, e.g. `"Site <noreply@example.com>"`
    #[serde(default = "default_from")]
    pub from: String,
    /// SMTP relay host
    pub smtp_host: Option<String>,
    /// SMTP port, the mode's default when absent
    pub smtp_port: Option<u16>,
    /// SMTP encryption mode
    #[serde(default)]
    pub smtp_mode: SmtpMode,
    /// SMTP user; the password is read from `SMTP_PASSWORD`
    pub smtp_username: Option<String>,
    /// Custom sendmail command
    pub sendmail_command: Option<String>,
}

fn default_from() -> String {
    "noreply@localhost".to_string()
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            transport: MailTransportKind::default(),
            from: default_from(),
            smtp_host: None,
            smtp_port: None,
            smtp_mode: SmtpMode::default(),
            smtp_username: None,
            sendmail_command: None,
        }
    }
}

/// The `[scheduler]` section
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct SchedulerConfig {
    /// Seconds between two checks for due events
    #[serde(default = "default_tick_seconds")]
    pub tick_seconds: u64,
}

const fn default_tick_seconds() -> u64 {
    60
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            tick_seconds: default_tick_seconds(),
        }
    }
}

/// Parses configuration from TOML text.
pub fn parse_config(contents: &str) -> Result<AppConfig> {
    toml::from_str(contents).map_err(|e| Error::Config {
        message: format!("Failed to parse config.toml: {e}"),
    })
}

/// Loads configuration from a TOML file
///
/// # Errors
/// Returns an error if the file cannot be read, the TOML syntax is invalid or
/// required fields are missing.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<AppConfig> {
    let path_ref = path.as_ref();
    tracing::debug!("Attempting to load configuration from: {:?}", path_ref);
    let contents = std::fs::read_to_string(path_ref).map_err(|e| Error::Config {
        message: format!("Failed to read config file {}: {e}", path_ref.display()),
    })?;
    parse_config(&contents)
}

/// Loads configuration from the default location (./config.toml)
pub fn load_default_config() -> Result<AppConfig> {
    load_config("config.toml")
}

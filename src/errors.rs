//! Unified error type for the inactive account guard.
//!
//! Every fallible operation returns [`Result`]. The only variant that is meant to
//! reach an end user is [`Error::InactiveUser`], which the authentication
//! pipeline surfaces when a login is refused.

use thiserror::Error;

/// Errors produced by the guard.
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid or unreadable configuration, including rejected settings input
    #[error("Configuration error: {message}")]
    Config {
        /// Human-readable description of the problem
        message: String,
    },

    /// Any failure reported by the database layer
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// A login was refused because the account is (now) disabled
    #[error(
        "The username {username} has been disabled because it has been inactive for {days_limit} days."
    )]
    InactiveUser {
        /// Display name of the refused account
        username: String,
        /// The configured inactivity threshold
        days_limit: u32,
    },

    /// An account id that does not exist in the directory
    #[error("Account {id} not found")]
    AccountNotFound {
        /// The requested account id
        id: i64,
    },

    /// Building or sending an email failed
    #[error("Mail error: {message}")]
    Mail {
        /// Description of the mail failure
        message: String,
    },

    /// File system failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A required environment variable is missing
    #[error("Environment variable error: {0}")]
    EnvVar(#[from] std::env::VarError),

    /// Serenity/Poise framework failure
    #[error("Serenity/Poise framework error: {0}")]
    #[allow(clippy::enum_variant_names)]
    FrameworkError(Box<poise::serenity_prelude::Error>),
}

impl Error {
    /// Stable machine-readable code for the error, as exposed to the
    /// authentication pipeline.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Config { .. } => "config",
            Self::Database(_) => "database",
            Self::InactiveUser { .. } => "inactive_user",
            Self::AccountNotFound { .. } => "account_not_found",
            Self::Mail { .. } => "mail",
            Self::Io(_) => "io",
            Self::EnvVar(_) => "env_var",
            Self::FrameworkError(_) => "framework",
        }
    }
}

impl From<poise::serenity_prelude::Error> for Error {
    fn from(value: poise::serenity_prelude::Error) -> Self {
        Self::FrameworkError(Box::new(value))
    }
}

impl From<toml::de::Error> for Error {
    fn from(value: toml::de::Error) -> Self {
        Self::Config {
            message: format!("Failed to parse TOML: {value}"),
        }
    }
}

impl From<toml::ser::Error> for Error {
    fn from(value: toml::ser::Error) -> Self {
        Self::Config {
            message: format!("Failed to serialize TOML: {value}"),
        }
    }
}

/// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;

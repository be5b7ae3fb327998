//! Core business logic - framework-agnostic inactivity policy, account
//! lifecycle and the scheduled passes built on top of them.

/// Whether an account is still active
pub mod activity;
/// Login checks, disabling and reactivation
pub mod account;
/// Calendar-day arithmetic
pub mod clock;
/// Cached set of disabled account ids
pub mod disabled_index;
/// Hook implementations run by the scheduler
pub mod jobs;
/// Activation, settings updates and deactivation
pub mod lifecycle;
/// Account overview for administrators
pub mod listing;
/// Email routing and delivery
pub mod notification;
/// Reminder pass
pub mod reminder;
/// Bulk disable pass
pub mod scanner;
/// Persisted event scheduler
pub mod scheduler;
/// Inactivity policy settings
pub mod settings;
/// Key-value system state
pub mod state;

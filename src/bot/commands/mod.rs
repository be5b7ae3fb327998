//! Discord command implementations organized by category.

#![allow(clippy::too_long_first_doc_paragraph)]

/// Account overview and reactivation commands
pub mod accounts;

/// General utility commands
pub mod general;

/// Inactivity settings commands
pub mod settings;

// Export commands
pub use accounts::*;
pub use general::*;
pub use settings::*;

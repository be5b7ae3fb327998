//! Entity module - Contains all SeaORM entity definitions for the database.
//! Each entity has a Model struct for data and an Entity struct for operations.

pub mod account;
pub mod account_activity;
pub mod scheduled_event;
pub mod system_state;

// Re-export specific types to avoid conflicts
pub use account::{Column as AccountColumn, Entity as Account, Model as AccountModel};
pub use account_activity::{
    Column as AccountActivityColumn, Entity as AccountActivity, Model as AccountActivityModel,
};
pub use scheduled_event::{
    Column as ScheduledEventColumn, Entity as ScheduledEvent, Model as ScheduledEventModel,
};
pub use system_state::{
    Column as SystemStateColumn, Entity as SystemState, Model as SystemStateModel,
};

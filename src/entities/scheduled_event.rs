//! Scheduled event entity - one pending run of a named hook.
//!
//! Single events are deleted once they run; recurring events carry a cadence
//! and have `next_run` pushed forward instead.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Scheduled event database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "scheduled_events")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Hook name (see `core::scheduler::Hook`)
    pub hook: String,
    /// Hook arguments, encoded by the hook itself; empty when it takes none
    pub args: String,
    /// When the event is next due
    pub next_run: DateTimeUtc,
    /// Cadence name for recurring events, `None` for single events
    pub recurrence: Option<String>,
}

/// `ScheduledEvent` has no relationships with other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

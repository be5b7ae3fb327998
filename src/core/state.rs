//! Key-value access to the `system_state` table.
//!
//! Used for persisted singletons: the plugin settings and the cached index of
//! disabled accounts.

use crate::{
    entities::{SystemState, system_state},
    errors::Result,
};
use chrono::Utc;
use sea_orm::{Set, prelude::*};
use tracing::{debug, instrument};

/// Retrieves the value stored under `key`, or `None` if the key was never set.
#[instrument(skip(db))]
pub async fn get_state_value<C>(db: &C, key: &str) -> Result<Option<String>>
where
    C: ConnectionTrait,
{
    let state = SystemState::find()
        .filter(system_state::Column::Key.eq(key))
        .one(db)
        .await?;
    debug!("System state for key '{}': {:?}", key, state.as_ref().map(|s| &s.value));
    Ok(state.map(|s| s.value))
}

/// Sets or updates the value stored under `key`.
#[instrument(skip(db, value))]
pub async fn set_state_value<C>(db: &C, key: &str, value: &str) -> Result<()>
where
    C: ConnectionTrait,
{
    let now = Utc::now().naive_utc();

    let existing = SystemState::find()
        .filter(system_state::Column::Key.eq(key))
        .one(db)
        .await?;

    if let Some(state) = existing {
        let mut active_model: system_state::ActiveModel = state.into();
        active_model.value = Set(value.to_string());
        active_model.updated_at = Set(now);
        active_model.update(db).await?;
    } else {
        let new_state = system_state::ActiveModel {
            key: Set(key.to_string()),
            value: Set(value.to_string()),
            updated_at: Set(now),
            ..Default::default()
        };
        new_state.insert(db).await?;
    }

    Ok(())
}

/// Removes `key` from the store. Missing keys are ignored.
pub async fn delete_state_value<C>(db: &C, key: &str) -> Result<()>
where
    C: ConnectionTrait,
{
    SystemState::delete_many()
        .filter(system_state::Column::Key.eq(key))
        .exec(db)
        .await?;
    Ok(())
}

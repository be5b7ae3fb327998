//! Cached set of disabled account ids.
//!
//! A projection of `account_activity.disabled == true`, persisted under the
//! `disabled_accounts` system state key so bulk passes can skip disabled
//! accounts without scanning activity rows. It is rebuilt from the activity
//! table when the key is missing and then maintained alongside every disable
//! and reactivation.

use crate::{
    core::state::{get_state_value, set_state_value},
    entities::{AccountActivity, account_activity},
    errors::{Error, Result},
};
use sea_orm::{ConnectionTrait, prelude::*};
use std::collections::BTreeSet;
use tracing::{debug, info, instrument};

const DISABLED_INDEX_KEY: &str = "disabled_accounts";

/// Set of currently disabled account ids
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DisabledIndex {
    ids: BTreeSet<i64>,
}

impl DisabledIndex {
    /// Loads the persisted index, rebuilding and persisting it when absent.
    #[instrument(skip(db))]
    pub async fn load<C>(db: &C) -> Result<Self>
    where
        C: ConnectionTrait,
    {
        if let Some(raw) = get_state_value(db, DISABLED_INDEX_KEY).await? {
            return Self::decode(&raw);
        }

        let index = Self::rebuild(db).await?;
        index.save(db).await?;
        Ok(index)
    }

    /// Recomputes the index from the activity table.
    pub async fn rebuild<C>(db: &C) -> Result<Self>
    where
        C: ConnectionTrait,
    {
        let ids: BTreeSet<i64> = AccountActivity::find()
            .filter(account_activity::Column::Disabled.eq(true))
            .all(db)
            .await?
            .into_iter()
            .map(|activity| activity.account_id)
            .collect();

        info!(count = ids.len(), "Rebuilt disabled account index");
        Ok(Self { ids })
    }

    /// Persists the index.
    pub async fn save<C>(&self, db: &C) -> Result<()>
    where
        C: ConnectionTrait,
    {
        debug!(count = self.ids.len(), "Saving disabled account index");
        set_state_value(db, DISABLED_INDEX_KEY, &self.encode()).await
    }

    /// Whether `id` is disabled
    #[must_use]
    pub fn contains(&self, id: i64) -> bool {
        self.ids.contains(&id)
    }

    /// Adds `id`; returns `false` if it was already present.
    pub fn insert(&mut self, id: i64) -> bool {
        self.ids.insert(id)
    }

    /// Removes `id`; returns `false` if it was not present.
    pub fn remove(&mut self, id: i64) -> bool {
        self.ids.remove(&id)
    }

    /// Removes every id, returning them in ascending order.
    pub fn take_all(&mut self) -> Vec<i64> {
        std::mem::take(&mut self.ids).into_iter().collect()
    }

    /// Ids in ascending order
    pub fn ids(&self) -> impl Iterator<Item = i64> + '_ {
        self.ids.iter().copied()
    }

    /// Number of disabled accounts
    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Whether no account is disabled
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    fn encode(&self) -> String {
        self.ids
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(",")
    }

    fn decode(raw: &str) -> Result<Self> {
        let ids = raw
            .split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(|part| {
                part.parse::<i64>().map_err(|e| Error::Config {
                    message: format!("Corrupt disabled account index entry '{part}': {e}"),
                })
            })
            .collect::<Result<BTreeSet<i64>>>()?;
        Ok(Self { ids })
    }
}

impl Extend<i64> for DisabledIndex {
    fn extend<T: IntoIterator<Item = i64>>(&mut self, iter: T) {
        self.ids.extend(iter);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::state::delete_state_value;
    use crate::test_utils::{create_test_account, set_activity, setup_test_db};
    use chrono::Utc;

    #[test]
    fn test_encode_decode() -> Result<()> {
        let mut index = DisabledIndex::default();
        assert!(index.insert(7));
        assert!(index.insert(3));
        assert!(!index.insert(7));
        assert_eq!(index.encode(), "3,7");

        assert_eq!(DisabledIndex::decode("3,7")?, index);
        assert!(DisabledIndex::decode("")?.is_empty());
        assert!(DisabledIndex::decode("3,x").is_err());
        Ok(())
    }

    #[tokio::test]
    async fn test_load_rebuilds_when_missing() -> Result<()> {
        let db = setup_test_db().await?;
        let now = Utc::now();

        let active = create_test_account(&db, "active", "subscriber").await?;
        let disabled = create_test_account(&db, "disabled", "subscriber").await?;
        set_activity(&db, active.id, Some(now), false).await?;
        set_activity(&db, disabled.id, Some(now), true).await?;

        let index = DisabledIndex::load(&db).await?;
        assert_eq!(index.ids().collect::<Vec<_>>(), vec![disabled.id]);

        // The rebuilt index was persisted
        assert_eq!(
            get_state_value(&db, DISABLED_INDEX_KEY).await?,
            Some(disabled.id.to_string())
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_save_and_reload() -> Result<()> {
        let db = setup_test_db().await?;

        let mut index = DisabledIndex::load(&db).await?;
        assert!(index.is_empty());
        index.extend([5, 2, 9]);
        index.remove(2);
        index.save(&db).await?;

        let reloaded = DisabledIndex::load(&db).await?;
        assert_eq!(reloaded.ids().collect::<Vec<_>>(), vec![5, 9]);
        assert_eq!(reloaded.len(), 2);

        delete_state_value(&db, DISABLED_INDEX_KEY).await?;
        assert!(DisabledIndex::load(&db).await?.is_empty());
        Ok(())
    }
}

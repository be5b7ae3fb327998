//! Account entity - a user record in the identity directory.
//!
//! The guard never creates or deletes accounts; it reads them to decide who is
//! inactive and annotates them through [`super::account_activity`].

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Account database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "accounts")]
pub struct Model {
    /// Unique identifier for the account
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Login name
    #[sea_orm(unique)]
    pub user_login: String,
    /// Name shown to people, also used in the refusal message
    pub display_name: String,
    /// Address customer notifications are sent to
    pub email: String,
    /// Comma-separated role slugs (e.g. `"subscriber,editor"`)
    pub roles: String,
}

impl Model {
    /// The account's roles as a set of trimmed, non-empty slugs.
    #[must_use]
    pub fn role_set(&self) -> BTreeSet<String> {
        self.roles
            .split(',')
            .map(str::trim)
            .filter(|role| !role.is_empty())
            .map(ToString::to_string)
            .collect()
    }

    /// Whether any of the account's roles is in `excluded`.
    #[must_use]
    pub fn has_any_role(&self, excluded: &BTreeSet<String>) -> bool {
        self.role_set().iter().any(|role| excluded.contains(role))
    }
}

/// One account has at most one activity record
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Inactivity metadata for this account
    #[sea_orm(has_one = "super::account_activity::Entity")]
    Activity,
}

impl Related<super::account_activity::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Activity.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    use super::*;

    fn account(roles: &str) -> Model {
        Model {
            id: 1,
            user_login: "jane".to_string(),
            display_name: "Jane".to_string(),
            email: "jane@example.com".to_string(),
            roles: roles.to_string(),
        }
    }

    #[test]
    fn test_role_set_ignores_blanks() {
        let roles = account(" subscriber, ,editor ").role_set();
        assert_eq!(roles.len(), 2);
        assert!(roles.contains("subscriber"));
        assert!(roles.contains("editor"));
        assert!(account("").role_set().is_empty());
    }

    #[test]
    fn test_has_any_role() {
        let excluded: BTreeSet<String> = ["administrator".to_string()].into();
        assert!(account("subscriber,administrator").has_any_role(&excluded));
        assert!(!account("subscriber").has_any_role(&excluded));
    }
}

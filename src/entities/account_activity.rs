//! Account activity entity - inactivity metadata attached to an account.
//!
//! Rows are created lazily the first time an account is evaluated or written to.
//! Absent timestamps mean "never recorded".

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Activity metadata database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "account_activity")]
pub struct Model {
    /// The annotated account
    #[sea_orm(primary_key, auto_increment = false)]
    pub account_id: i64,
    /// Last successful authentication
    pub last_login: Option<DateTimeUtc>,
    /// Whether the account is currently disabled
    pub disabled: bool,
    /// When the account was disabled; always set while `disabled` is true
    pub date_blocked: Option<DateTimeUtc>,
    /// Most recent login attempt refused because of inactivity
    pub last_login_attempt: Option<DateTimeUtc>,
    /// When the last "about to be disabled" reminder was queued
    pub reminder_sent_at: Option<DateTimeUtc>,
}

impl Model {
    /// An empty record for an account that has never been annotated.
    #[must_use]
    pub const fn empty(account_id: i64) -> Self {
        Self {
            account_id,
            last_login: None,
            disabled: false,
            date_blocked: None,
            last_login_attempt: None,
            reminder_sent_at: None,
        }
    }
}

/// Activity belongs to an account
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// The owning account
    #[sea_orm(
        belongs_to = "super::account::Entity",
        from = "Column::AccountId",
        to = "super::account::Column::Id"
    )]
    Account,
}

impl Related<super::account::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Account.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

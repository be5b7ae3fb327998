//! The account overview shown to administrators: a "Disabled" column and a
//! "Last Login" column per account.

use crate::{
    entities::{Account, AccountActivity, account, account_activity},
    errors::Result,
};
use sea_orm::{QueryOrder, prelude::*};
use std::collections::HashMap;

const DATE_FORMAT: &str = "%Y-%m-%d %H:%M";

/// An account with its inactivity metadata
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountRow {
    /// The account
    pub account: account::Model,
    /// Its metadata, `None` if nothing was recorded yet
    pub activity: Option<account_activity::Model>,
}

impl AccountRow {
    /// Whether the account is disabled
    #[must_use]
    pub fn is_disabled(&self) -> bool {
        self.activity.as_ref().is_some_and(|a| a.disabled)
    }

    /// The "Disabled" column
    #[must_use]
    pub fn disabled_column(&self) -> &'static str {
        if self.is_disabled() { "Yes" } else { "-" }
    }

    /// The "Last Login" column: the blocking date for disabled accounts and
    /// the last login when one is known.
    #[must_use]
    pub fn last_login_column(&self) -> String {
        let Some(activity) = &self.activity else {
            return "-".to_string();
        };

        let mut parts = Vec::new();
        if activity.disabled {
            if let Some(blocked) = activity.date_blocked {
                parts.push(format!("blocked {}", blocked.format(DATE_FORMAT)));
            }
        }
        if let Some(last_login) = activity.last_login {
            parts.push(format!("login {}", last_login.format(DATE_FORMAT)));
        }

        if parts.is_empty() {
            "-".to_string()
        } else {
            parts.join(" | ")
        }
    }

    /// One line of the overview
    #[must_use]
    pub fn format_line(&self) -> String {
        format!(
            "#{} {} ({}) | Disabled: {} | Last Login: {}",
            self.account.id,
            self.account.user_login,
            self.account.roles,
            self.disabled_column(),
            self.last_login_column()
        )
    }
}

/// Joins the rows' lines into pages no longer than `max_len` characters.
/// A single line longer than `max_len` gets a page of its own.
#[must_use]
pub fn paginate(rows: &[AccountRow], max_len: usize) -> Vec<String> {
    let mut pages = Vec::new();
    let mut page = String::new();

    for line in rows.iter().map(AccountRow::format_line) {
        if !page.is_empty() && page.len() + line.len() + 1 > max_len {
            pages.push(std::mem::take(&mut page));
        }
        if !page.is_empty() {
            page.push('\n');
        }
        page.push_str(&line);
    }

    if !page.is_empty() {
        pages.push(page);
    }
    pages
}

/// Every account with its metadata, ordered by id.
pub async fn list_accounts(db: &DatabaseConnection) -> Result<Vec<AccountRow>> {
    let accounts = Account::find()
        .order_by_asc(account::Column::Id)
        .all(db)
        .await?;

    let mut activities: HashMap<i64, account_activity::Model> = AccountActivity::find()
        .all(db)
        .await?
        .into_iter()
        .map(|activity| (activity.account_id, activity))
        .collect();

    Ok(accounts
        .into_iter()
        .map(|account| AccountRow {
            activity: activities.remove(&account.id),
            account,
        })
        .collect())
}

//! Notification templates.
//!
//! Every notification kind maps to a subject and an HTML body with `{placeholder}`
//! markers. The defaults below can be overridden per kind from `config.toml`:
//!
//! ```toml
//! [templates.customer]
//! subject = "Your {site_name} account is disabled"
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// The kinds of email the guard sends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    /// Tells a user their own account was disabled
    Customer,
    /// Tells the site administrator one account was disabled
    Administrator,
    /// Tells the site administrator a bulk pass disabled several accounts
    BulkAdministrator,
    /// Warns a user their account is about to be disabled
    Reminder,
}

impl NotificationKind {
    /// Every kind, in a stable order
    pub const ALL: [Self; 4] = [
        Self::Customer,
        Self::Administrator,
        Self::BulkAdministrator,
        Self::Reminder,
    ];

    /// Stable name used in config files and scheduled-event arguments
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Customer => "customer",
            Self::Administrator => "administrator",
            Self::BulkAdministrator => "bulk_administrator",
            Self::Reminder => "reminder",
        }
    }
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Subject and body of one notification kind
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Template {
    /// Email subject, may contain placeholders
    pub subject: String,
    /// HTML email body, may contain placeholders
    pub body: String,
}

/// Partial template as written in `config.toml`; missing fields keep the default
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TemplateOverride {
    /// Replacement subject
    pub subject: Option<String>,
    /// Replacement body
    pub body: Option<String>,
}

/// The `[templates]` section of `config.toml`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TemplateOverrides {
    /// Override for [`NotificationKind::Customer`]
    pub customer: Option<TemplateOverride>,
    /// Override for [`NotificationKind::Administrator`]
    pub administrator: Option<TemplateOverride>,
    /// Override for [`NotificationKind::BulkAdministrator`]
    pub bulk_administrator: Option<TemplateOverride>,
    /// Override for [`NotificationKind::Reminder`]
    pub reminder: Option<TemplateOverride>,
}

impl TemplateOverrides {
    const fn get(&self, kind: NotificationKind) -> Option<&TemplateOverride> {
        match kind {
            NotificationKind::Customer => self.customer.as_ref(),
            NotificationKind::Administrator => self.administrator.as_ref(),
            NotificationKind::BulkAdministrator => self.bulk_administrator.as_ref(),
            NotificationKind::Reminder => self.reminder.as_ref(),
        }
    }
}

/// Values substituted into templates
#[derive(Debug, Clone, Default)]
pub struct TemplateContext {
    /// `{username}`
    pub username: String,
    /// `{site_name}`
    pub site_name: String,
    /// `{admin_link}`
    pub admin_link: String,
    /// `{days_limit}`
    pub days_limit: u32,
    /// `{last_login}`
    pub last_login: String,
    /// `{user_list}`
    pub user_list: String,
}

/// Lookup table from notification kind to template
#[derive(Debug, Clone)]
pub struct NotificationTemplates {
    table: HashMap<NotificationKind, Template>,
}

fn default_template(kind: NotificationKind) -> Template {
    let (subject, body) = match kind {
        NotificationKind::Customer => (
            "Your account at {site_name} has been disabled",
            "Your account at {site_name} has been disabled because you didn't log in for \
             {days_limit} days. Please get in touch with the site administrator if you want \
             to reactivate it.",
        ),
        NotificationKind::Administrator => (
            "A user account has been disabled",
            "A user account has been disabled. User: {username}. Last login: {last_login}. \
             <a href=\"{admin_link}\">Manage users</a>.",
        ),
        NotificationKind::BulkAdministrator => (
            "Inactive user accounts have been disabled",
            "The following accounts have been disabled after {days_limit} days of inactivity: \
             {user_list}. <a href=\"{admin_link}\">Manage users</a>.",
        ),
        NotificationKind::Reminder => (
            "Your account at {site_name} will be disabled tomorrow",
            "You haven't logged in to {site_name} for {days_limit} days. Log in before tomorrow \
             to keep your account active.",
        ),
    };

    Template {
        subject: subject.to_string(),
        body: body.to_string(),
    }
}

impl Default for NotificationTemplates {
    fn default() -> Self {
        Self::with_overrides(&TemplateOverrides::default())
    }
}

impl NotificationTemplates {
    /// Builds the table from the defaults, replacing whatever `overrides` sets.
    #[must_use]
    pub fn with_overrides(overrides: &TemplateOverrides) -> Self {
        let table = NotificationKind::ALL
            .into_iter()
            .map(|kind| {
                let mut template = default_template(kind);
                if let Some(custom) = overrides.get(kind) {
                    if let Some(subject) = &custom.subject {
                        template.subject.clone_from(subject);
                    }
                    if let Some(body) = &custom.body {
                        template.body.clone_from(body);
                    }
                }
                (kind, template)
            })
            .collect();

        Self { table }
    }

    /// Renders the subject and body of `kind` with `context` substituted.
    #[must_use]
    pub fn render(&self, kind: NotificationKind, context: &TemplateContext) -> Template {
        let template = self
            .table
            .get(&kind)
            .cloned()
            .unwrap_or_else(|| default_template(kind));

        Template {
            subject: substitute(&template.subject, context),
            body: substitute(&template.body, context),
        }
    }
}

fn substitute(text: &str, context: &TemplateContext) -> String {
    text.replace("{username}", &context.username)
        .replace("{site_name}", &context.site_name)
        .replace("{admin_link}", &context.admin_link)
        .replace("{days_limit}", &context.days_limit.to_string())
        .replace("{last_login}", &context.last_login)
        .replace("{user_list}", &context.user_list)
}

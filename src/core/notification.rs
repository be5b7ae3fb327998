//! Notification routing and delivery.
//!
//! [`Notifier`] decides who receives which email for a given notification
//! target, renders the templates and sends the result. Delivery is
//! fire-and-forget: a failed email is logged and never propagated.

use crate::{
    config::{
        AppConfig,
        templates::{NotificationKind, NotificationTemplates, TemplateContext},
    },
    core::settings::NotificationTarget,
    entities::{account, account_activity},
    mail::Mailer,
};
use tracing::{info, warn};

const DATE_FORMAT: &str = "%Y-%m-%d %H:%M";

/// One email ready to be sent
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailParams {
    /// Which template produced it
    pub kind: NotificationKind,
    /// Recipient address
    pub to: String,
    /// Rendered subject
    pub subject: String,
    /// Rendered HTML body
    pub body: String,
}

/// Builds and sends notification emails
#[derive(Clone)]
pub struct Notifier {
    mailer: Mailer,
    templates: NotificationTemplates,
    site_name: String,
    admin_email: String,
    admin_link: String,
}

impl Notifier {
    /// Creates a notifier from the deployment configuration.
    #[must_use]
    pub fn new(mailer: Mailer, app_config: &AppConfig) -> Self {
        Self {
            mailer,
            templates: NotificationTemplates::with_overrides(&app_config.templates),
            site_name: app_config.site_name.clone(),
            admin_email: app_config.admin_email.clone(),
            admin_link: app_config.admin_link.clone(),
        }
    }

    /// The mailer used for delivery
    #[must_use]
    pub const fn mailer(&self) -> &Mailer {
        &self.mailer
    }

    fn context(&self, days_limit: u32) -> TemplateContext {
        TemplateContext {
            site_name: self.site_name.clone(),
            admin_link: self.admin_link.clone(),
            days_limit,
            ..TemplateContext::default()
        }
    }

    fn params(&self, kind: NotificationKind, to: &str, context: &TemplateContext) -> EmailParams {
        let rendered = self.templates.render(kind, context);
        EmailParams {
            kind,
            to: to.to_string(),
            subject: rendered.subject,
            body: rendered.body,
        }
    }

    /// Emails announcing that `account` was disabled, addressed per `send_to`.
    #[must_use]
    pub fn disabled_params(
        &self,
        send_to: NotificationTarget,
        account: &account::Model,
        activity: Option<&account_activity::Model>,
        days_limit: u32,
    ) -> Vec<EmailParams> {
        let context = TemplateContext {
            username: account.display_name.clone(),
            last_login: activity
                .and_then(|a| a.last_login)
                .map_or_else(|| "never".to_string(), |at| at.format(DATE_FORMAT).to_string()),
            ..self.context(days_limit)
        };

        let mut params = Vec::new();
        if send_to.includes_customer() {
            params.push(self.params(NotificationKind::Customer, &account.email, &context));
        }
        if send_to.includes_administrator() {
            params.push(self.params(NotificationKind::Administrator, &self.admin_email, &context));
        }
        params
    }

    /// The administrator's summary of a bulk pass.
    #[must_use]
    pub fn bulk_disabled_params(&self, accounts: &[account::Model], days_limit: u32) -> EmailParams {
        let context = TemplateContext {
            user_list: accounts
                .iter()
                .map(|a| a.display_name.as_str())
                .collect::<Vec<_>>()
                .join(", "),
            ..self.context(days_limit)
        };
        self.params(NotificationKind::BulkAdministrator, &self.admin_email, &context)
    }

    /// The reminder sent to `account` the day before it would be disabled.
    #[must_use]
    pub fn reminder_params(&self, account: &account::Model, days_limit: u32) -> EmailParams {
        let context = TemplateContext {
            username: account.display_name.clone(),
            ..self.context(days_limit)
        };
        self.params(NotificationKind::Reminder, &account.email, &context)
    }

    /// Sends every email, logging failures instead of returning them.
    ///
    /// Returns how many emails were handed to the transport successfully.
    pub async fn send_all(&self, params: Vec<EmailParams>) -> usize {
        let mut delivered = 0;
        for email in params {
            match self.mailer.send(&email.to, &email.subject, email.body).await {
                Ok(()) => {
                    delivered += 1;
                    info!(kind = %email.kind, to = %email.to, "Notification sent");
                }
                Err(e) => warn!(kind = %email.kind, to = %email.to, "Notification not sent: {e}"),
            }
        }
        delivered
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::mail::Transport;
    use crate::test_utils::test_app_config;

    fn notifier() -> Notifier {
        let mailer = Mailer::new(Transport::memory(), "noreply@example.com").unwrap();
        Notifier::new(mailer, &test_app_config())
    }

    fn account() -> account::Model {
        account::Model {
            id: 7,
            user_login: "jane".to_string(),
            display_name: "Jane Doe".to_string(),
            email: "jane@example.com".to_string(),
            roles: "subscriber".to_string(),
        }
    }

    #[test]
    fn test_routing_per_target() {
        let notifier = notifier();
        let account = account();

        assert!(notifier
            .disabled_params(NotificationTarget::None, &account, None, 90)
            .is_empty());

        let customer = notifier.disabled_params(NotificationTarget::Customer, &account, None, 90);
        assert_eq!(customer.len(), 1);
        assert_eq!(customer[0].kind, NotificationKind::Customer);
        assert_eq!(customer[0].to, "jane@example.com");

        let admin = notifier.disabled_params(NotificationTarget::Administrator, &account, None, 90);
        assert_eq!(admin.len(), 1);
        assert_eq!(admin[0].to, "admin@example.com");
        assert!(admin[0].body.contains("Jane Doe"));
        assert!(admin[0].body.contains("Last login: never"));

        let all = notifier.disabled_params(NotificationTarget::All, &account, None, 90);
        let recipients: Vec<_> = all.iter().map(|p| p.to.as_str()).collect();
        assert_eq!(recipients, vec!["jane@example.com", "admin@example.com"]);
    }

    #[test]
    fn test_bulk_summary_lists_accounts() {
        let mut other = account();
        other.display_name = "Bob".to_string();

        let params = notifier().bulk_disabled_params(&[account(), other], 30);
        assert_eq!(params.kind, NotificationKind::BulkAdministrator);
        assert_eq!(params.to, "admin@example.com");
        assert!(params.body.contains("Jane Doe, Bob"));
        assert!(params.body.contains("30 days"));
    }

    #[tokio::test]
    async fn test_send_all_swallows_failures() {
        let notifier = notifier();
        let mut broken = notifier.reminder_params(&account(), 90);
        broken.to = "not an address".to_string();
        let good = notifier.reminder_params(&account(), 90);

        assert_eq!(notifier.send_all(vec![broken, good]).await, 1);
        assert_eq!(notifier.mailer().transport().sent().len(), 1);
    }
}

//! Outgoing email.
//!
//! [`Transport`] wraps the lettre backends the service can be configured with;
//! [`Mailer`] turns a recipient, subject and HTML body into a message and hands
//! it to the transport.

use crate::{
    config::app::{MailConfig, MailTransportKind, SmtpMode},
    errors::{Error, Result},
};
use async_trait::async_trait;
use lettre::{
    AsyncTransport, Message, Tokio1Executor,
    address::Envelope,
    message::{Mailbox, header::ContentType},
    transport::{
        sendmail::AsyncSendmailTransport,
        smtp::{AsyncSmtpTransport, authentication::Credentials},
    },
};
use std::sync::{Arc, Mutex};

/// An email captured by the in-memory transport
#[derive(Debug, Clone)]
pub struct SentEmail {
    /// Envelope recipients
    pub to: Vec<String>,
    /// The formatted message
    pub raw: String,
}

/// A wrapper around the supported [`AsyncTransport`]s
#[derive(Default, Clone)]
pub struct Transport {
    inner: Arc<TransportInner>,
}

#[derive(Default)]
enum TransportInner {
    #[default]
    Blackhole,
    Smtp(AsyncSmtpTransport<Tokio1Executor>),
    Sendmail(AsyncSendmailTransport<Tokio1Executor>),
    Memory(Mutex<Vec<SentEmail>>),
}

impl Transport {
    fn new(inner: TransportInner) -> Self {
        Self {
            inner: Arc::new(inner),
        }
    }

    /// Transport that drops every email with a warning
    #[must_use]
    pub fn blackhole() -> Self {
        Self::new(TransportInner::Blackhole)
    }

    /// Transport that keeps every email in memory, see [`Transport::sent`]
    #[must_use]
    pub fn memory() -> Self {
        Self::new(TransportInner::Memory(Mutex::new(Vec::new())))
    }

    /// Builds the transport described by the `[mail]` section.
    ///
    /// # Errors
    /// Returns `Error::Config` if SMTP is selected without a host or the relay
    /// cannot be set up.
    pub fn from_config(config: &MailConfig) -> Result<Self> {
        match config.transport {
            MailTransportKind::Blackhole => Ok(Self::blackhole()),
            MailTransportKind::Sendmail => {
                let transport = config.sendmail_command.as_deref().map_or_else(
                    AsyncSendmailTransport::new,
                    AsyncSendmailTransport::new_with_command,
                );
                Ok(Self::new(TransportInner::Sendmail(transport)))
            }
            MailTransportKind::Smtp => {
                let host = config.smtp_host.as_deref().ok_or_else(|| Error::Config {
                    message: "mail.smtp_host is required for the smtp transport".to_string(),
                })?;
                let smtp_error = |e: lettre::transport::smtp::Error| Error::Config {
                    message: format!("Failed to set up SMTP relay {host}: {e}"),
                };

                let mut builder = match config.smtp_mode {
                    SmtpMode::Plain => AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(host),
                    SmtpMode::StartTls => {
                        AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host).map_err(smtp_error)?
                    }
                    SmtpMode::Tls => {
                        AsyncSmtpTransport::<Tokio1Executor>::relay(host).map_err(smtp_error)?
                    }
                };

                if let Some(username) = &config.smtp_username {
                    let password = std::env::var("SMTP_PASSWORD").unwrap_or_default();
                    builder = builder.credentials(Credentials::new(username.clone(), password));
                }
                if let Some(port) = config.smtp_port {
                    builder = builder.port(port);
                }

                Ok(Self::new(TransportInner::Smtp(builder.build())))
            }
        }
    }

    /// Emails captured so far; always empty for other transports.
    #[must_use]
    pub fn sent(&self) -> Vec<SentEmail> {
        match self.inner.as_ref() {
            TransportInner::Memory(outbox) => outbox
                .lock()
                .map(|sent| sent.clone())
                .unwrap_or_default(),
            _ => Vec::new(),
        }
    }
}

/// Transport failure
#[derive(Debug, thiserror::Error)]
#[error(transparent)]
pub enum TransportError {
    /// SMTP failure
    Smtp(#[from] lettre::transport::smtp::Error),
    /// Sendmail failure
    Sendmail(#[from] lettre::transport::sendmail::Error),
}

#[async_trait]
impl AsyncTransport for Transport {
    type Ok = ();
    type Error = TransportError;

    async fn send_raw(&self, envelope: &Envelope, email: &[u8]) -> std::result::Result<(), TransportError> {
        match self.inner.as_ref() {
            TransportInner::Blackhole => {
                tracing::warn!("An email was supposed to be sent but no email backend is configured");
            }
            TransportInner::Smtp(t) => {
                t.send_raw(envelope, email).await?;
            }
            TransportInner::Sendmail(t) => {
                t.send_raw(envelope, email).await?;
            }
            TransportInner::Memory(outbox) => {
                let sent = SentEmail {
                    to: envelope.to().iter().map(ToString::to_string).collect(),
                    raw: String::from_utf8_lossy(email).into_owned(),
                };
                if let Ok(mut outbox) = outbox.lock() {
                    outbox.push(sent);
                }
            }
        }
        Ok(())
    }
}

/// Sends HTML emails from a fixed sender
#[derive(Clone)]
pub struct Mailer {
    transport: Transport,
    from: Mailbox,
}

impl Mailer {
    /// Creates a mailer sending as `from` (e.g. `"Site <noreply@example.com>"`).
    ///
    /// # Errors
    /// Returns `Error::Config` if `from` is not a valid mailbox.
    pub fn new(transport: Transport, from: &str) -> Result<Self> {
        let from = from.parse::<Mailbox>().map_err(|e| Error::Config {
            message: format!("Invalid sender address '{from}': {e}"),
        })?;
        Ok(Self { transport, from })
    }

    /// The underlying transport
    #[must_use]
    pub const fn transport(&self) -> &Transport {
        &self.transport
    }

    /// Sends one HTML email to `to`.
    ///
    /// # Errors
    /// Returns `Error::Mail` if the address is invalid, the message cannot be
    /// built or the transport fails.
    pub async fn send(&self, to: &str, subject: &str, html_body: String) -> Result<()> {
        let mail_error = |message: String| Error::Mail { message };

        let to = to
            .parse::<Mailbox>()
            .map_err(|e| mail_error(format!("Invalid recipient '{to}': {e}")))?;

        let message = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(subject)
            .header(ContentType::TEXT_HTML)
            .body(html_body)
            .map_err(|e| mail_error(format!("Failed to build message: {e}")))?;

        self.transport
            .send(message)
            .await
            .map_err(|e| mail_error(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_transport_captures_mail() -> Result<()> {
        let mailer = Mailer::new(Transport::memory(), "Site <noreply@example.com>")?;
        mailer
            .send("jane@example.com", "Hello", "<p>Hi</p>".to_string())
            .await?;

        let sent = mailer.transport().sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, vec!["jane@example.com".to_string()]);
        assert!(sent[0].raw.contains("Subject: Hello"));
        assert!(sent[0].raw.contains("text/html"));
        Ok(())
    }

    #[tokio::test]
    async fn test_invalid_recipient_is_a_mail_error() -> Result<()> {
        let mailer = Mailer::new(Transport::blackhole(), "noreply@example.com")?;
        let result = mailer.send("not an address", "Hello", String::new()).await;
        assert!(matches!(result, Err(Error::Mail { .. })));
        assert!(mailer.transport().sent().is_empty());
        Ok(())
    }

    #[test]
    fn test_invalid_sender_is_rejected() {
        assert!(Mailer::new(Transport::blackhole(), "nobody").is_err());
    }

    #[test]
    fn test_smtp_without_host_is_rejected() {
        let config = MailConfig {
            transport: MailTransportKind::Smtp,
            ..MailConfig::default()
        };
        assert!(matches!(Transport::from_config(&config), Err(Error::Config { .. })));
    }
}

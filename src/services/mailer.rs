//! Outbound mail transport.
//!
//! [`Mailer`] is the seam between the notification service and the wire.
//! [`SmtpMailer`] delivers through lettre's async SMTP transport; [`LogMailer`]
//! only writes the message to the log and is used when mail is disabled.

use async_trait::async_trait;
use lettre::message::{Mailbox, MultiPart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::transport::smtp::client::{Tls, TlsParameters};
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

use crate::config::MailConfig;

#[derive(Debug, Clone, Serialize)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub text_body: String,
    pub html_body: String,
}

#[derive(Debug, Error)]
pub enum MailError {
    /// The SMTP server refused our credentials.
    #[error("SMTP authentication rejected: {0}")]
    AuthRejected(String),

    #[error("Mail transport error: {0}")]
    Transport(String),

    #[error("Failed to render email template '{name}': {message}")]
    Template { name: String, message: String },
}

impl MailError {
    #[must_use]
    pub const fn is_auth_rejected(&self) -> bool {
        matches!(self, Self::AuthRejected(_))
    }
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: &EmailMessage) -> Result<(), MailError>;
}

pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn new(config: &MailConfig) -> Result<Self, MailError> {
        let from: Mailbox = config.default_sender.parse().map_err(|e| {
            MailError::Transport(format!(
                "Invalid sender address '{}': {e}",
                config.default_sender
            ))
        })?;

        let tls = match config.tls_mode.as_str() {
            "tls" => Tls::Wrapper(tls_parameters(&config.host)?),
            "starttls" => Tls::Required(tls_parameters(&config.host)?),
            "none" => Tls::None,
            other => {
                return Err(MailError::Transport(format!(
                    "Invalid TLS mode: {other}. Must be 'none', 'starttls', or 'tls'"
                )));
            }
        };

        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.host)
            .port(config.port)
            .timeout(Some(Duration::from_secs(config.timeout_seconds)))
            .tls(tls);

        if !config.username.is_empty() {
            builder = builder.credentials(Credentials::new(
                config.username.clone(),
                config.password.clone(),
            ));
        }

        debug!(
            "SMTP transport configured for {}:{} (TLS mode: {})",
            config.host, config.port, config.tls_mode
        );

        Ok(Self {
            transport: builder.build(),
            from,
        })
    }
}

fn tls_parameters(host: &str) -> Result<TlsParameters, MailError> {
    TlsParameters::new(host.to_string())
        .map_err(|e| MailError::Transport(format!("TLS configuration error: {e}")))
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, message: &EmailMessage) -> Result<(), MailError> {
        let to: Mailbox = message
            .to
            .parse()
            .map_err(|e| MailError::Transport(format!("Invalid recipient '{}': {e}", message.to)))?;

        let email = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(&message.subject)
            .multipart(MultiPart::alternative_plain_html(
                message.text_body.clone(),
                message.html_body.clone(),
            ))
            .map_err(|e| MailError::Transport(format!("Failed to build email: {e}")))?;

        self.transport
            .send(email)
            .await
            .map(|_| ())
            .map_err(|e| classify_smtp_error(&e))
    }
}

/// 530/534/535 are the SMTP replies for missing or rejected credentials.
fn classify_smtp_error(err: &lettre::transport::smtp::Error) -> MailError {
    let auth_code = err
        .status()
        .is_some_and(|code| is_auth_reply(&code.to_string()));

    if auth_code || err.to_string().to_ascii_lowercase().contains("authentication") {
        MailError::AuthRejected(err.to_string())
    } else {
        MailError::Transport(err.to_string())
    }
}

fn is_auth_reply(code: &str) -> bool {
    matches!(code, "530" | "534" | "535")
}

/// Writes messages to the log instead of sending them.
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, message: &EmailMessage) -> Result<(), MailError> {
        info!(
            to = %message.to,
            subject = %message.subject,
            "Mail delivery disabled; message body follows\n{}",
            message.text_body
        );
        Ok(())
    }
}

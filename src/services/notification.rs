//! Composes and sends the application's emails.

use chrono::{DateTime, Utc};
use serde_json::json;
use std::sync::Arc;
use tracing::{error, info};

use super::mailer::{EmailMessage, MailError, Mailer};
use super::templates::TemplateEngine;
use crate::models::Sponsor;

pub struct Notifier {
    templates: TemplateEngine,
    mailer: Arc<dyn Mailer>,
    /// Organization inbox that receives sponsor reminders.
    default_recipient: String,
    public_base_url: String,
    otp_ttl_minutes: i64,
}

impl Notifier {
    pub fn new(
        mailer: Arc<dyn Mailer>,
        default_recipient: impl Into<String>,
        public_base_url: impl Into<String>,
        otp_ttl_minutes: i64,
    ) -> Result<Self, MailError> {
        Ok(Self {
            templates: TemplateEngine::new()?,
            mailer,
            default_recipient: default_recipient.into(),
            public_base_url: public_base_url.into(),
            otp_ttl_minutes,
        })
    }

    pub async fn notify_upcoming_sponsor(&self, sponsor: &Sponsor) -> Result<(), MailError> {
        let vars = json!({
            "name": sponsor.name,
            "phone": sponsor.phone,
            "email": sponsor.email,
            "date": sponsor.date.format("%Y-%m-%d").to_string(),
        });

        self.deliver(
            "upcoming_sponsor",
            &self.default_recipient,
            format!("Upcoming Sponsor: {}", sponsor.name),
            &vars,
        )
        .await
    }

    pub async fn invite_superuser(
        &self,
        email: &str,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), MailError> {
        let vars = json!({
            "link": self.registration_link(token),
            "expires_at": expires_at.format("%Y-%m-%d %H:%M UTC").to_string(),
        });

        self.deliver(
            "superuser_invite",
            email,
            "Invitation to become a superuser".to_string(),
            &vars,
        )
        .await
    }

    pub async fn send_otp(&self, email: &str, code: &str) -> Result<(), MailError> {
        let vars = json!({
            "code": code,
            "ttl_minutes": self.otp_ttl_minutes,
        });

        self.deliver("otp_code", email, "Your login code".to_string(), &vars)
            .await
    }

    pub async fn confirm_superuser_upgrade(&self, email: &str) -> Result<(), MailError> {
        self.deliver(
            "superuser_upgraded",
            email,
            "Superuser access confirmed".to_string(),
            &json!({}),
        )
        .await
    }

    #[must_use]
    pub fn registration_link(&self, token: &str) -> String {
        format!(
            "{}/register_superuser/{}",
            self.public_base_url.trim_end_matches('/'),
            token
        )
    }

    async fn deliver(
        &self,
        kind: &'static str,
        to: &str,
        subject: String,
        vars: &serde_json::Value,
    ) -> Result<(), MailError> {
        let result = match self.templates.render(kind, vars) {
            Ok((html_body, text_body)) => {
                let message = EmailMessage {
                    to: to.to_string(),
                    subject,
                    text_body,
                    html_body,
                };
                self.mailer.send(&message).await
            }
            Err(e) => Err(e),
        };

        match result {
            Ok(()) => {
                metrics::counter!("emails_sent_total", "kind" => kind).increment(1);
                info!(event = "email_sent", kind, to = %to, "Email sent");
                Ok(())
            }
            Err(e) => {
                metrics::counter!("emails_failed_total", "kind" => kind).increment(1);
                error!(event = "email_failed", kind, to = %to, error = %e, "Failed to send email");
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use std::sync::Mutex;

    #[derive(Default)]
    struct CapturingMailer {
        sent: Mutex<Vec<EmailMessage>>,
    }

    #[async_trait]
    impl Mailer for CapturingMailer {
        async fn send(&self, message: &EmailMessage) -> Result<(), MailError> {
            self.sent.lock().unwrap().push(message.clone());
            Ok(())
        }
    }

    struct RejectingMailer;

    #[async_trait]
    impl Mailer for RejectingMailer {
        async fn send(&self, _message: &EmailMessage) -> Result<(), MailError> {
            Err(MailError::AuthRejected("535 5.7.8 bad credentials".to_string()))
        }
    }

    fn notifier(mailer: Arc<dyn Mailer>) -> Notifier {
        Notifier::new(mailer, "office@temple.org", "https://sponsors.temple.org/", 10).unwrap()
    }

    fn sponsor() -> Sponsor {
        Sponsor {
            id: 7,
            name: "Asha Rao".to_string(),
            phone: "555-0101".to_string(),
            email: "asha@example.org".to_string(),
            date: NaiveDate::from_ymd_opt(2026, 10, 20).unwrap(),
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn reminder_goes_to_default_recipient() {
        let mailer = Arc::new(CapturingMailer::default());
        notifier(mailer.clone())
            .notify_upcoming_sponsor(&sponsor())
            .await
            .unwrap();

        let sent = mailer.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, "office@temple.org");
        assert_eq!(sent[0].subject, "Upcoming Sponsor: Asha Rao");
        assert!(sent[0].text_body.contains("2026-10-20"));
    }

    #[tokio::test]
    async fn invite_embeds_registration_link() {
        let mailer = Arc::new(CapturingMailer::default());
        notifier(mailer.clone())
            .invite_superuser("new@temple.org", "abc123", Utc::now())
            .await
            .unwrap();

        let sent = mailer.sent.lock().unwrap();
        assert_eq!(sent[0].to, "new@temple.org");
        assert!(
            sent[0]
                .html_body
                .contains("https://sponsors.temple.org/register_superuser/abc123")
        );
    }

    #[tokio::test]
    async fn otp_and_confirmation_go_to_user() {
        let mailer = Arc::new(CapturingMailer::default());
        let notifier = notifier(mailer.clone());
        notifier.send_otp("su@temple.org", "123456").await.unwrap();
        notifier.confirm_superuser_upgrade("su@temple.org").await.unwrap();

        let sent = mailer.sent.lock().unwrap();
        assert_eq!(sent.len(), 2);
        assert!(sent[0].text_body.contains("123456"));
        assert!(sent.iter().all(|m| m.to == "su@temple.org"));
    }

    #[tokio::test]
    async fn transport_failure_is_returned_not_swallowed() {
        let result = notifier(Arc::new(RejectingMailer))
            .send_otp("su@temple.org", "123456")
            .await;
        assert!(matches!(result, Err(MailError::AuthRejected(_))));
    }
}

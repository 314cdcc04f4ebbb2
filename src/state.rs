use std::sync::Arc;

use anyhow::Context;
use tracing::info;

use crate::config::Config;
use crate::db::Store;
use crate::services::{
    AuthService, LogMailer, Mailer, Notifier, ReminderService, SeaOrmAuthService, SmtpMailer,
};

/// Long-lived services shared by the HTTP layer, the scheduler and the CLI.
#[derive(Clone)]
pub struct SharedState {
    pub config: Arc<Config>,

    pub store: Store,

    pub notifier: Arc<Notifier>,

    pub auth: Arc<dyn AuthService>,

    pub reminders: Arc<ReminderService>,
}

/// Picks the transport named by the mail section: SMTP when enabled,
/// otherwise a mailer that only logs.
pub fn build_mailer(config: &Config) -> anyhow::Result<Arc<dyn Mailer>> {
    if config.mail.enabled {
        let mailer = SmtpMailer::new(&config.mail).context("Failed to build SMTP transport")?;
        info!(
            host = %config.mail.host,
            port = config.mail.port,
            tls = %config.mail.tls_mode,
            "SMTP mailer configured"
        );
        Ok(Arc::new(mailer))
    } else {
        info!("Mail delivery disabled; outgoing emails are only logged");
        Ok(Arc::new(LogMailer))
    }
}

impl SharedState {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let mailer = build_mailer(&config)?;
        Self::with_mailer(config, mailer).await
    }

    /// Builds the state around an explicit mail transport.
    pub async fn with_mailer(config: Config, mailer: Arc<dyn Mailer>) -> anyhow::Result<Self> {
        let store = Store::with_pool_options(
            &config.general.database_path,
            config.general.max_db_connections,
            config.general.min_db_connections,
        )
        .await?;

        let notifier = Arc::new(
            Notifier::new(
                mailer,
                config.mail.default_sender.clone(),
                config.server.public_base_url.clone(),
                config.security.otp_ttl_minutes,
            )
            .context("Failed to load email templates")?,
        );

        let auth = Arc::new(SeaOrmAuthService::new(
            store.clone(),
            notifier.clone(),
            config.security.clone(),
        )) as Arc<dyn AuthService>;

        let reminders = Arc::new(ReminderService::new(
            store.clone(),
            notifier.clone(),
            config.reminders.window_days,
        ));

        Ok(Self {
            config: Arc::new(config),
            store,
            notifier,
            auth,
            reminders,
        })
    }
}

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub general: GeneralConfig,

    pub server: ServerConfig,

    pub mail: MailConfig,

    pub reminders: ReminderConfig,

    #[serde(default)]
    pub observability: ObservabilityConfig,

    #[serde(default)]
    pub security: SecurityConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Argon2 memory cost in KiB (default: 8192 = 8MB)
    pub argon2_memory_cost_kib: u32,

    /// Argon2 time cost (iterations)
    pub argon2_time_cost: u32,

    /// Argon2 parallelism (default: 1)
    pub argon2_parallelism: u32,

    pub min_password_length: usize,

    /// Minutes a superuser login code stays valid.
    pub otp_ttl_minutes: i64,

    /// Wrong codes accepted before the pending login is discarded.
    pub otp_max_attempts: i32,

    /// Hours an invitation link stays redeemable.
    pub invite_ttl_hours: i64,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            argon2_memory_cost_kib: 8192,
            argon2_time_cost: 3,
            argon2_parallelism: 1,
            min_password_length: 8,
            otp_ttl_minutes: 10,
            otp_max_attempts: 5,
            invite_ttl_hours: 48,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    pub metrics_enabled: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            metrics_enabled: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub enabled: bool,

    pub port: u16,

    /// Session signing key. Must be at least 64 bytes; when empty a random
    /// key is generated at startup and sessions do not survive a restart.
    #[serde(skip_serializing)]
    pub secret_key: String,

    /// Whether to set the Secure flag on session cookies.
    pub secure_cookies: bool,

    pub session_idle_minutes: i64,

    /// Persist sessions in the application database instead of memory.
    pub persistent_sessions: bool,

    /// Externally reachable base URL, used to build invitation links.
    pub public_base_url: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            port: 5000,
            secret_key: String::new(),
            secure_cookies: false,
            session_idle_minutes: 60 * 12,
            persistent_sessions: true,
            public_base_url: "http://localhost:5000".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    pub database_path: String,

    pub log_level: String,

    /// `text` or `json`
    pub log_format: String,

    /// Number of tokio worker threads (default: 2)
    /// Set to 0 to use the number of CPU cores
    pub worker_threads: usize,

    /// Maximum database connections (default: 5)
    pub max_db_connections: u32,

    /// Minimum database connections (default: 1)
    pub min_db_connections: u32,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            database_path: "sqlite:data/sponsordesk.db".to_string(),
            log_level: "info".to_string(),
            log_format: "text".to_string(),
            worker_threads: 2,
            max_db_connections: 5,
            min_db_connections: 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MailConfig {
    /// When false, messages are written to the log instead of sent.
    pub enabled: bool,

    pub host: String,

    pub port: u16,

    /// `none`, `starttls` or `tls`
    pub tls_mode: String,

    pub username: String,

    #[serde(skip_serializing)]
    pub password: String,

    /// Sender address; also receives the sponsor reminders.
    pub default_sender: String,

    pub timeout_seconds: u64,
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            host: "smtp.gmail.com".to_string(),
            port: 587,
            tls_mode: "starttls".to_string(),
            username: String::new(),
            password: String::new(),
            default_sender: "sponsors@localhost".to_string(),
            timeout_seconds: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReminderConfig {
    pub enabled: bool,

    pub interval_hours: u32,

    /// Days after today included in a reminder pass.
    pub window_days: u32,

    pub cron_expression: Option<String>,
}

impl Default for ReminderConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_hours: 24,
            window_days: 7,
            cron_expression: None,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            general: GeneralConfig::default(),
            server: ServerConfig::default(),
            mail: MailConfig::default(),
            reminders: ReminderConfig::default(),
            observability: ObservabilityConfig::default(),
            security: SecurityConfig::default(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let _ = dotenvy::dotenv();

        let paths = Self::config_paths();

        let mut config = None;
        for path in &paths {
            if path.exists() {
                info!("Loading config from: {}", path.display());
                config = Some(Self::load_from_path(path)?);
                break;
            }
        }

        let mut config = config.unwrap_or_else(|| {
            info!("No config file found, using defaults");
            Self::default()
        });
        config.apply_env_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Environment variables win over the config file.
    pub fn apply_env_overrides<F>(&mut self, var: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = var("SECRET_KEY") {
            self.server.secret_key = v;
        }
        if let Some(v) = var("DATABASE_URL") {
            self.general.database_path = v;
        }
        if let Some(v) = var("LOG_LEVEL") {
            self.general.log_level = v;
        }
        if let Some(v) = var("PUBLIC_BASE_URL") {
            self.server.public_base_url = v;
        }
        if let Some(v) = var("MAIL_SERVER") {
            self.mail.host = v;
            self.mail.enabled = true;
        }
        if let Some(v) = var("MAIL_PORT") {
            self.mail.port = v
                .parse()
                .with_context(|| format!("MAIL_PORT is not a port number: {v}"))?;
        }
        if let Some(v) = var("MAIL_USE_TLS") {
            let on = matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes");
            self.mail.tls_mode = if on { "starttls" } else { "none" }.to_string();
        }
        if let Some(v) = var("MAIL_USERNAME") {
            self.mail.username = v;
        }
        if let Some(v) = var("MAIL_PASSWORD") {
            self.mail.password = v;
        }
        if let Some(v) = var("MAIL_DEFAULT_SENDER") {
            self.mail.default_sender = v;
        }
        Ok(())
    }

    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        info!("Config saved to: {}", path.display());
        Ok(())
    }

    fn config_paths() -> Vec<PathBuf> {
        let mut paths = vec![];

        paths.push(PathBuf::from("config.toml"));

        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("sponsordesk").join("config.toml"));
        }

        paths
    }

    fn default_config_path() -> PathBuf {
        PathBuf::from("config.toml")
    }

    pub fn create_default_if_missing() -> Result<bool> {
        let path = Self::default_config_path();
        if path.exists() {
            Ok(false)
        } else {
            let config = Self::default();
            config.save_to_path(&path)?;
            info!("Created default config file: {}", path.display());
            Ok(true)
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.reminders.enabled
            && self.reminders.interval_hours == 0
            && self.reminders.cron_expression.is_none()
        {
            anyhow::bail!("Reminder interval must be > 0 or cron expression must be set");
        }

        if self.mail.enabled && self.mail.host.is_empty() {
            anyhow::bail!("Mail host cannot be empty when mail is enabled");
        }

        if !matches!(self.mail.tls_mode.as_str(), "none" | "starttls" | "tls") {
            anyhow::bail!(
                "Invalid mail TLS mode '{}'. Must be 'none', 'starttls', or 'tls'",
                self.mail.tls_mode
            );
        }

        if !self.mail.default_sender.contains('@') {
            anyhow::bail!("Mail default sender must be an email address");
        }

        if !self.server.secret_key.is_empty() && self.server.secret_key.len() < 64 {
            anyhow::bail!("Secret key must be at least 64 bytes long");
        }

        url::Url::parse(&self.server.public_base_url).context("Invalid public base URL")?;

        if self.security.otp_max_attempts < 1 {
            anyhow::bail!("OTP max attempts must be at least 1");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.reminders.interval_hours, 24);
        assert_eq!(config.reminders.window_days, 7);
        assert_eq!(config.mail.port, 587);
        assert_eq!(config.security.otp_max_attempts, 5);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_serialization() {
        let mut config = Config::default();
        config.mail.password = "hunter2".to_string();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("[general]"));
        assert!(toml_str.contains("[mail]"));
        assert!(toml_str.contains("[reminders]"));
        assert!(!toml_str.contains("hunter2"));
    }

    #[test]
    fn test_config_deserialization() {
        let toml_str = r#"
            [general]
            log_level = "debug"

            [reminders]
            window_days = 3
        "#;

        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.general.log_level, "debug");
        assert_eq!(config.reminders.window_days, 3);

        assert_eq!(config.reminders.interval_hours, 24);
    }

    #[test]
    fn test_env_overrides() {
        let mut config = Config::default();
        config
            .apply_env_overrides(|key| match key {
                "MAIL_SERVER" => Some("mail.example.org".to_string()),
                "MAIL_PORT" => Some("2525".to_string()),
                "MAIL_USE_TLS" => Some("false".to_string()),
                "MAIL_DEFAULT_SENDER" => Some("office@example.org".to_string()),
                "DATABASE_URL" => Some("sqlite::memory:".to_string()),
                _ => None,
            })
            .unwrap();

        assert!(config.mail.enabled);
        assert_eq!(config.mail.host, "mail.example.org");
        assert_eq!(config.mail.port, 2525);
        assert_eq!(config.mail.tls_mode, "none");
        assert_eq!(config.mail.default_sender, "office@example.org");
        assert_eq!(config.general.database_path, "sqlite::memory:");
    }

    #[test]
    fn test_bad_port_override_is_rejected() {
        let mut config = Config::default();
        let result = config.apply_env_overrides(|key| {
            (key == "MAIL_PORT").then(|| "not-a-port".to_string())
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_rejects_short_secret() {
        let mut config = Config::default();
        config.server.secret_key = "a secret key".to_string();
        assert!(config.validate().is_err());

        config.server.secret_key = "k".repeat(64);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_unknown_tls_mode() {
        let mut config = Config::default();
        config.mail.tls_mode = "ssl".to_string();
        assert!(config.validate().is_err());
    }
}

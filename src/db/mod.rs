use crate::config::SecurityConfig;
use crate::models::{Invite, MonthCount, NewSponsor, PendingOtp, Sponsor, User};
use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbErr, SqlErr, Statement};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tracing::info;

pub mod migrator;
pub mod repositories;

/// Columns carrying a uniqueness constraint that users can collide on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniqueField {
    Username,
    Email,
}

impl std::fmt::Display for UniqueField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Username => write!(f, "username"),
            Self::Email => write!(f, "email"),
        }
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{0} is already taken")]
    Conflict(UniqueField),

    #[error("Storage failure: {0}")]
    Storage(String),
}

impl From<DbErr> for StoreError {
    fn from(err: DbErr) -> Self {
        if let Some(SqlErr::UniqueConstraintViolation(message)) = err.sql_err() {
            let field = if message.contains("email") {
                UniqueField::Email
            } else {
                UniqueField::Username
            };
            return Self::Conflict(field);
        }
        Self::Storage(err.to_string())
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Clone)]
pub struct Store {
    pub conn: DatabaseConnection,
}

impl Store {
    pub async fn new(db_url: &str) -> anyhow::Result<Self> {
        Self::with_pool_options(db_url, 5, 1).await
    }

    pub async fn with_pool_options(
        db_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> anyhow::Result<Self> {
        use sea_orm_migration::MigratorTrait;

        let path_str = db_url.trim_start_matches("sqlite:");
        if !path_str.starts_with(":memory:") {
            let path_str = path_str.split('?').next().unwrap_or(path_str);
            if let Some(parent) = Path::new(path_str).parent() {
                tokio::fs::create_dir_all(parent).await.ok();
            }
            if !Path::new(path_str).exists() {
                std::fs::File::create(path_str)?;
            }
        }

        let mut opt = ConnectOptions::new(db_url.to_string());
        opt.max_connections(max_connections)
            .min_connections(min_connections)
            .connect_timeout(Duration::from_secs(10))
            .acquire_timeout(Duration::from_secs(10))
            .idle_timeout(Duration::from_secs(300))
            .max_lifetime(Duration::from_secs(600))
            .sqlx_logging(false);

        let conn = Database::connect(opt).await?;

        migrator::Migrator::up(&conn, None).await?;

        info!(
            "Database connected & migrations applied (pool: {}-{})",
            min_connections, max_connections
        );

        Ok(Self { conn })
    }

    pub async fn ping(&self) -> StoreResult<()> {
        let backend = self.conn.get_database_backend();
        self.conn
            .query_one(Statement::from_string(backend, "SELECT 1".to_string()))
            .await?;
        Ok(())
    }

    fn sponsor_repo(&self) -> repositories::sponsor::SponsorRepository {
        repositories::sponsor::SponsorRepository::new(self.conn.clone())
    }

    fn user_repo(&self) -> repositories::user::UserRepository {
        repositories::user::UserRepository::new(self.conn.clone())
    }

    fn invite_repo(&self) -> repositories::invite::InviteRepository {
        repositories::invite::InviteRepository::new(self.conn.clone())
    }

    // Sponsors

    pub async fn add_sponsor(&self, sponsor: NewSponsor) -> StoreResult<Sponsor> {
        self.sponsor_repo().add(sponsor).await
    }

    pub async fn get_sponsors_in_range(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> StoreResult<Vec<Sponsor>> {
        self.sponsor_repo().in_range(start, end).await
    }

    pub async fn search_sponsors(&self, query: &str) -> StoreResult<Vec<Sponsor>> {
        self.sponsor_repo().search(query).await
    }

    pub async fn count_sponsors(&self) -> StoreResult<u64> {
        self.sponsor_repo().count().await
    }

    pub async fn sponsor_counts_by_month(&self) -> StoreResult<Vec<MonthCount>> {
        self.sponsor_repo().counts_by_month().await
    }

    pub async fn recent_sponsors(&self, limit: u64) -> StoreResult<Vec<Sponsor>> {
        self.sponsor_repo().recent(limit).await
    }

    pub async fn upcoming_sponsors(&self, from: NaiveDate, limit: u64) -> StoreResult<Vec<Sponsor>> {
        self.sponsor_repo().upcoming(from, limit).await
    }

    // Users

    pub async fn create_user(
        &self,
        username: &str,
        email: &str,
        password: &str,
        security: &SecurityConfig,
    ) -> StoreResult<User> {
        self.user_repo()
            .create(username, email, password, security)
            .await
    }

    pub async fn get_user_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        self.user_repo().get_by_username(username).await
    }

    pub async fn get_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        self.user_repo().get_by_email(email).await
    }

    pub async fn get_user_by_id(&self, id: i32) -> StoreResult<Option<User>> {
        self.user_repo().get_by_id(id).await
    }

    pub async fn list_users(&self) -> StoreResult<Vec<User>> {
        self.user_repo().list().await
    }

    pub async fn count_users(&self) -> StoreResult<u64> {
        self.user_repo().count().await
    }

    pub async fn verify_user_password(
        &self,
        username: &str,
        password: &str,
    ) -> StoreResult<Option<User>> {
        self.user_repo().verify_password(username, password).await
    }

    pub async fn get_pending_otp(&self, user_id: i32) -> StoreResult<Option<PendingOtp>> {
        self.user_repo().get_pending_otp(user_id).await
    }

    pub async fn set_user_otp(
        &self,
        user_id: i32,
        code: &str,
        expires_at: DateTime<Utc>,
    ) -> StoreResult<()> {
        self.user_repo().set_otp(user_id, code, expires_at).await
    }

    pub async fn claim_otp_attempt(
        &self,
        user_id: i32,
        max_attempts: i32,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<PendingOtp>> {
        self.user_repo()
            .claim_otp_attempt(user_id, max_attempts, now)
            .await
    }

    pub async fn clear_user_otp(&self, user_id: i32) -> StoreResult<()> {
        self.user_repo().clear_otp(user_id).await
    }

    pub async fn complete_otp_verification(&self, user_id: i32) -> StoreResult<User> {
        self.user_repo().mark_verified(user_id).await
    }

    pub async fn set_superuser(&self, user_id: i32, is_superuser: bool) -> StoreResult<User> {
        self.user_repo().set_superuser(user_id, is_superuser).await
    }

    // Invites

    pub async fn create_invite(
        &self,
        token: &str,
        email: &str,
        invited_by: i32,
        expires_at: DateTime<Utc>,
    ) -> StoreResult<Invite> {
        self.invite_repo()
            .create(token, email, invited_by, expires_at)
            .await
    }

    pub async fn get_invite_by_token(&self, token: &str) -> StoreResult<Option<Invite>> {
        self.invite_repo().get_by_token(token).await
    }

    pub async fn redeem_invite(
        &self,
        token: &str,
        username: &str,
        password: &str,
        security: &SecurityConfig,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<User>> {
        self.invite_repo()
            .redeem(token, username, password, security, now)
            .await
    }
}

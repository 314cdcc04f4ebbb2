use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use chrono::{DateTime, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use tokio::task;

use crate::config::SecurityConfig;
use crate::db::{StoreError, StoreResult};
use crate::entities::{prelude::*, users};
use crate::models::{PendingOtp, User};

pub struct UserRepository {
    conn: DatabaseConnection,
}

impl UserRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// Inserts a new account. The very first account in the system is
    /// created as a verified superuser; the count and the insert share one
    /// transaction.
    pub async fn create(
        &self,
        username: &str,
        email: &str,
        password: &str,
        security: &SecurityConfig,
    ) -> StoreResult<User> {
        let password_hash = hash_password_blocking(password, security).await?;

        let txn = self.conn.begin().await?;

        let existing = Users::find().count(&txn).await?;
        let bootstrap = existing == 0;

        let active = users::ActiveModel {
            username: Set(username.to_string()),
            email: Set(email.to_string()),
            password_hash: Set(password_hash),
            is_superuser: Set(bootstrap),
            is_verified: Set(bootstrap),
            otp: Set(None),
            otp_expires_at: Set(None),
            otp_attempts: Set(0),
            created_at: Set(Utc::now()),
            ..Default::default()
        };

        let model = active.insert(&txn).await?;
        txn.commit().await?;

        if bootstrap {
            tracing::info!(user = %model.username, "First account registered as superuser");
        }

        Ok(User::from(model))
    }

    pub async fn get_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        let user = Users::find()
            .filter(users::Column::Username.eq(username))
            .one(&self.conn)
            .await?;

        Ok(user.map(User::from))
    }

    pub async fn get_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let user = Users::find()
            .filter(users::Column::Email.eq(email))
            .one(&self.conn)
            .await?;

        Ok(user.map(User::from))
    }

    pub async fn get_by_id(&self, id: i32) -> StoreResult<Option<User>> {
        let user = Users::find_by_id(id).one(&self.conn).await?;
        Ok(user.map(User::from))
    }

    pub async fn list(&self) -> StoreResult<Vec<User>> {
        let users = Users::find()
            .order_by_asc(users::Column::Id)
            .all(&self.conn)
            .await?;

        Ok(users.into_iter().map(User::from).collect())
    }

    pub async fn count(&self) -> StoreResult<u64> {
        Ok(Users::find().count(&self.conn).await?)
    }

    /// Returns the user when the password matches.
    /// Note: This uses `spawn_blocking` because Argon2 hashing is CPU-intensive
    /// and would block the async runtime if run directly.
    pub async fn verify_password(&self, username: &str, password: &str) -> StoreResult<Option<User>> {
        let user = Users::find()
            .filter(users::Column::Username.eq(username))
            .one(&self.conn)
            .await?;

        let Some(user) = user else {
            return Ok(None);
        };

        let password_hash = user.password_hash.clone();
        let password = password.to_string();

        let is_valid = task::spawn_blocking(move || verify_password(&password, &password_hash))
            .await
            .map_err(|e| StoreError::Storage(format!("Password verification task panicked: {e}")))??;

        Ok(is_valid.then(|| User::from(user)))
    }

    pub async fn get_pending_otp(&self, user_id: i32) -> StoreResult<Option<PendingOtp>> {
        let user = Users::find_by_id(user_id).one(&self.conn).await?;
        Ok(user.as_ref().and_then(PendingOtp::from_model))
    }

    /// Stores a fresh login code and resets the attempt counter.
    pub async fn set_otp(
        &self,
        user_id: i32,
        code: &str,
        expires_at: DateTime<Utc>,
    ) -> StoreResult<()> {
        let user = self.find_model(user_id).await?;

        let mut active: users::ActiveModel = user.into();
        active.otp = Set(Some(code.to_string()));
        active.otp_expires_at = Set(Some(expires_at));
        active.otp_attempts = Set(0);
        active.update(&self.conn).await?;

        Ok(())
    }

    /// Spends one verification attempt on the pending code and returns the
    /// code as it stands afterwards. `None` when there is no live code or
    /// `max_attempts` is already spent. The budget check and the increment
    /// are one conditional update, so concurrent guesses cannot share an
    /// attempt.
    pub async fn claim_otp_attempt(
        &self,
        user_id: i32,
        max_attempts: i32,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<PendingOtp>> {
        let txn = self.conn.begin().await?;

        let claimed = Users::update_many()
            .col_expr(
                users::Column::OtpAttempts,
                Expr::col(users::Column::OtpAttempts).add(1),
            )
            .filter(users::Column::Id.eq(user_id))
            .filter(users::Column::Otp.is_not_null())
            .filter(users::Column::OtpExpiresAt.gt(now))
            .filter(users::Column::OtpAttempts.lt(max_attempts))
            .exec(&txn)
            .await?;

        if claimed.rows_affected != 1 {
            txn.rollback().await?;
            return Ok(None);
        }

        let user = Users::find_by_id(user_id).one(&txn).await?;
        txn.commit().await?;

        Ok(user.as_ref().and_then(PendingOtp::from_model))
    }

    pub async fn clear_otp(&self, user_id: i32) -> StoreResult<()> {
        let user = self.find_model(user_id).await?;

        let mut active: users::ActiveModel = user.into();
        active.otp = Set(None);
        active.otp_expires_at = Set(None);
        active.otp_attempts = Set(0);
        active.update(&self.conn).await?;

        Ok(())
    }

    /// Marks the account verified and drops the pending code in one update.
    pub async fn mark_verified(&self, user_id: i32) -> StoreResult<User> {
        let user = self.find_model(user_id).await?;

        let mut active: users::ActiveModel = user.into();
        active.is_verified = Set(true);
        active.otp = Set(None);
        active.otp_expires_at = Set(None);
        active.otp_attempts = Set(0);
        let model = active.update(&self.conn).await?;

        Ok(User::from(model))
    }

    /// Raising the flag always drops verification so the next login has to
    /// pass the emailed code again.
    pub async fn set_superuser(&self, user_id: i32, is_superuser: bool) -> StoreResult<User> {
        let user = self.find_model(user_id).await?;

        let mut active: users::ActiveModel = user.into();
        active.is_superuser = Set(is_superuser);
        if is_superuser {
            active.is_verified = Set(false);
        }
        let model = active.update(&self.conn).await?;

        Ok(User::from(model))
    }

    async fn find_model(&self, user_id: i32) -> StoreResult<users::Model> {
        Users::find_by_id(user_id)
            .one(&self.conn)
            .await?
            .ok_or_else(|| StoreError::Storage(format!("User not found: {user_id}")))
    }
}

/// Hash a password using Argon2id with the configured params.
pub fn hash_password(password: &str, config: &SecurityConfig) -> StoreResult<String> {
    let salt = SaltString::generate(&mut OsRng);

    let params = Params::new(
        config.argon2_memory_cost_kib,
        config.argon2_time_cost,
        config.argon2_parallelism,
        None,
    )
    .map_err(|e| StoreError::Storage(format!("Invalid Argon2 params: {e}")))?;
    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

    let hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| StoreError::Storage(format!("Failed to hash password: {e}")))?;

    Ok(hash.to_string())
}

/// Argon2 reads its params back out of the PHC string, and the digest
/// comparison is constant-time.
pub fn verify_password(password: &str, password_hash: &str) -> StoreResult<bool> {
    let parsed_hash = PasswordHash::new(password_hash)
        .map_err(|e| StoreError::Storage(format!("Invalid password hash format: {e}")))?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

pub(crate) async fn hash_password_blocking(
    password: &str,
    security: &SecurityConfig,
) -> StoreResult<String> {
    let password = password.to_string();
    let security = security.clone();
    task::spawn_blocking(move || hash_password(&password, &security))
        .await
        .map_err(|e| StoreError::Storage(format!("Password hashing task panicked: {e}")))?
}

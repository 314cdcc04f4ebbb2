//! Domain service for authentication and user management.
//!
//! Handles registration (open and invitation-based), login with the emailed
//! code step for unverified superusers, and role changes.

use thiserror::Error;

use crate::db::{StoreError, UniqueField};
use crate::models::{Invite, User};
use crate::services::mailer::MailError;

/// Errors specific to authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("{0} is already registered")]
    Conflict(UniqueField),

    #[error("User not found")]
    UserNotFound,

    #[error("{0}")]
    Forbidden(String),

    #[error("You cannot change your own superuser status")]
    SelfToggle,

    #[error("No login code is pending for this account")]
    NoPendingOtp,

    #[error("Invalid code, {remaining} attempt(s) left")]
    InvalidOtp { remaining: i32 },

    #[error("The login code has expired, please log in again")]
    OtpExpired,

    #[error("This invitation link is invalid, expired or already used")]
    InvalidInvite,

    /// `record_saved` tells the caller whether the database change went
    /// through before delivery failed.
    #[error("Email delivery failed: {source}")]
    Mail {
        source: MailError,
        record_saved: bool,
    },

    #[error("Storage error: {0}")]
    Storage(String),
}

impl From<StoreError> for AuthError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict(field) => Self::Conflict(field),
            StoreError::Storage(msg) => Self::Storage(msg),
        }
    }
}

/// Result of a password check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginOutcome {
    /// Credentials accepted; a session may be established right away.
    Authenticated(User),

    /// The account is an unverified superuser. A code was emailed and no
    /// session may be established until it is confirmed.
    OtpRequired { user_id: i32 },
}

/// Domain service trait for authentication.
#[async_trait::async_trait]
pub trait AuthService: Send + Sync {
    /// Creates an account. The first account ever becomes a verified
    /// superuser.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Conflict`] if the username or email is taken.
    async fn register(&self, username: &str, email: &str, password: &str)
    -> Result<User, AuthError>;

    /// Looks up a still-redeemable invitation.
    async fn check_invite(&self, token: &str) -> Result<Invite, AuthError>;

    /// Creates an unverified superuser from an invitation.
    async fn register_with_invite(
        &self,
        token: &str,
        username: &str,
        password: &str,
    ) -> Result<User, AuthError>;

    /// Creates an invitation and emails the registration link.
    async fn invite_superuser(&self, actor: &User, email: &str) -> Result<Invite, AuthError>;

    /// Verifies credentials.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidCredentials`] for an unknown user or a
    /// wrong password alike.
    async fn login(&self, username: &str, password: &str) -> Result<LoginOutcome, AuthError>;

    /// Confirms the emailed code of a pending superuser login.
    async fn verify_otp(&self, user_id: i32, code: &str) -> Result<User, AuthError>;

    /// Flips another user's superuser flag.
    async fn toggle_superuser(&self, actor: &User, target_id: i32) -> Result<User, AuthError>;

    async fn get_user(&self, user_id: i32) -> Result<Option<User>, AuthError>;
}

//! `SeaORM` implementation of the `AuthService` trait.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use rand::Rng;
use regex::Regex;
use std::sync::{Arc, LazyLock};
use subtle::ConstantTimeEq;
use tracing::{info, warn};

use crate::config::SecurityConfig;
use crate::db::{Store, UniqueField};
use crate::models::{Invite, User};
use crate::services::auth_service::{AuthError, AuthService, LoginOutcome};
use crate::services::notification::Notifier;

static USERNAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_.\-]{3,64}$").expect("valid username regex"));

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("valid email regex"));

pub struct SeaOrmAuthService {
    store: Store,
    notifier: Arc<Notifier>,
    security: SecurityConfig,
}

impl SeaOrmAuthService {
    #[must_use]
    pub const fn new(store: Store, notifier: Arc<Notifier>, security: SecurityConfig) -> Self {
        Self {
            store,
            notifier,
            security,
        }
    }

    fn validate_username(username: &str) -> Result<(), AuthError> {
        if USERNAME_RE.is_match(username) {
            Ok(())
        } else {
            Err(AuthError::Validation(
                "Username must be 3-64 characters of letters, numbers, '.', '-' or '_'"
                    .to_string(),
            ))
        }
    }

    fn validate_password(&self, password: &str) -> Result<(), AuthError> {
        if password.len() < self.security.min_password_length {
            return Err(AuthError::Validation(format!(
                "Password must be at least {} characters",
                self.security.min_password_length
            )));
        }
        Ok(())
    }

    fn require_admin(actor: &User) -> Result<(), AuthError> {
        if actor.is_admin() {
            Ok(())
        } else {
            Err(AuthError::Forbidden(
                "Only verified superusers can do this".to_string(),
            ))
        }
    }
}

pub fn validate_email(email: &str) -> Result<(), AuthError> {
    if EMAIL_RE.is_match(email) {
        Ok(())
    } else {
        Err(AuthError::Validation(format!("Invalid email address: {email}")))
    }
}

/// Random 6-digit code, zero padded.
#[must_use]
pub fn generate_otp() -> String {
    let code: u32 = rand::rng().random_range(0..1_000_000);
    format!("{code:06}")
}

/// Random invitation token (64 character hex string)
#[must_use]
pub fn generate_token() -> String {
    let mut rng = rand::rng();
    let bytes: [u8; 32] = rng.random();

    bytes.iter().fold(String::with_capacity(64), |mut acc, b| {
        use std::fmt::Write;
        let _ = write!(acc, "{b:02x}");
        acc
    })
}

fn codes_match(submitted: &str, stored: &str) -> bool {
    bool::from(submitted.trim().as_bytes().ct_eq(stored.as_bytes()))
}

#[async_trait]
impl AuthService for SeaOrmAuthService {
    async fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<User, AuthError> {
        Self::validate_username(username)?;
        validate_email(email)?;
        self.validate_password(password)?;

        let user = self
            .store
            .create_user(username, email, password, &self.security)
            .await?;

        info!(user = %user.username, superuser = user.is_superuser, "User registered");
        Ok(user)
    }

    async fn check_invite(&self, token: &str) -> Result<Invite, AuthError> {
        let invite = self
            .store
            .get_invite_by_token(token)
            .await?
            .ok_or(AuthError::InvalidInvite)?;

        if invite.is_redeemable(Utc::now()) {
            Ok(invite)
        } else {
            Err(AuthError::InvalidInvite)
        }
    }

    async fn register_with_invite(
        &self,
        token: &str,
        username: &str,
        password: &str,
    ) -> Result<User, AuthError> {
        Self::validate_username(username)?;
        self.validate_password(password)?;

        let user = self
            .store
            .redeem_invite(token, username, password, &self.security, Utc::now())
            .await?
            .ok_or(AuthError::InvalidInvite)?;

        info!(user = %user.username, "Invited superuser registered");
        Ok(user)
    }

    async fn invite_superuser(&self, actor: &User, email: &str) -> Result<Invite, AuthError> {
        Self::require_admin(actor)?;
        validate_email(email)?;

        if self.store.get_user_by_email(email).await?.is_some() {
            return Err(AuthError::Conflict(UniqueField::Email));
        }

        let token = generate_token();
        let expires_at = Utc::now() + Duration::hours(self.security.invite_ttl_hours);
        let invite = self
            .store
            .create_invite(&token, email, actor.id, expires_at)
            .await?;

        info!(actor = %actor.username, invitee = %email, "Superuser invitation created");

        self.notifier
            .invite_superuser(email, &token, expires_at)
            .await
            .map_err(|source| AuthError::Mail {
                source,
                record_saved: true,
            })?;

        Ok(invite)
    }

    async fn login(&self, username: &str, password: &str) -> Result<LoginOutcome, AuthError> {
        let Some(user) = self
            .store
            .verify_user_password(username, password)
            .await?
        else {
            warn!(user = %username, outcome = "rejected", "Login failed");
            return Err(AuthError::InvalidCredentials);
        };

        if user.is_superuser && !user.is_verified {
            let code = generate_otp();
            let expires_at = Utc::now() + Duration::minutes(self.security.otp_ttl_minutes);
            self.store.set_user_otp(user.id, &code, expires_at).await?;

            self.notifier
                .send_otp(&user.email, &code)
                .await
                .map_err(|source| AuthError::Mail {
                    source,
                    record_saved: false,
                })?;

            info!(user = %user.username, outcome = "otp_required", "Login code issued");
            return Ok(LoginOutcome::OtpRequired { user_id: user.id });
        }

        info!(user = %user.username, outcome = "authenticated", "Login succeeded");
        Ok(LoginOutcome::Authenticated(user))
    }

    async fn verify_otp(&self, user_id: i32, code: &str) -> Result<User, AuthError> {
        let max_attempts = self.security.otp_max_attempts;

        // The attempt is spent before the code is compared.
        let Some(pending) = self
            .store
            .claim_otp_attempt(user_id, max_attempts, Utc::now())
            .await?
        else {
            if self.store.get_pending_otp(user_id).await?.is_none() {
                return Err(AuthError::NoPendingOtp);
            }
            self.store.clear_user_otp(user_id).await?;
            warn!(user_id, outcome = "expired", "Login code expired or exhausted");
            return Err(AuthError::OtpExpired);
        };

        if !codes_match(code, &pending.code) {
            warn!(user_id, attempts = pending.attempts, outcome = "rejected", "Wrong login code");
            if pending.attempts >= max_attempts {
                self.store.clear_user_otp(user_id).await?;
                return Err(AuthError::OtpExpired);
            }
            return Err(AuthError::InvalidOtp {
                remaining: max_attempts - pending.attempts,
            });
        }

        let user = self.store.complete_otp_verification(user_id).await?;
        info!(user = %user.username, outcome = "verified", "Superuser verified");

        // The account is verified either way; a lost confirmation is only logged.
        if let Err(e) = self.notifier.confirm_superuser_upgrade(&user.email).await {
            warn!(user = %user.username, error = %e, "Upgrade confirmation not delivered");
        }

        Ok(user)
    }

    async fn toggle_superuser(&self, actor: &User, target_id: i32) -> Result<User, AuthError> {
        Self::require_admin(actor)?;

        if actor.id == target_id {
            warn!(actor = %actor.username, outcome = "rejected", "Self superuser toggle refused");
            return Err(AuthError::SelfToggle);
        }

        let target = self
            .store
            .get_user_by_id(target_id)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        let updated = self
            .store
            .set_superuser(target.id, !target.is_superuser)
            .await?;

        info!(
            actor = %actor.username,
            target = %updated.username,
            superuser = updated.is_superuser,
            "Superuser flag toggled"
        );
        Ok(updated)
    }

    async fn get_user(&self, user_id: i32) -> Result<Option<User>, AuthError> {
        Ok(self.store.get_user_by_id(user_id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn otp_is_six_digits() {
        for _ in 0..100 {
            let code = generate_otp();
            assert_eq!(code.len(), 6);
            assert!(code.chars().all(|c| c.is_ascii_digit()));
        }
    }

    #[test]
    fn token_is_64_hex_chars() {
        let token = generate_token();
        assert_eq!(token.len(), 64);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(token, generate_token());
    }

    #[test]
    fn code_comparison() {
        assert!(codes_match("123456", "123456"));
        assert!(codes_match(" 123456 ", "123456"));
        assert!(!codes_match("123457", "123456"));
        assert!(!codes_match("12345", "123456"));
    }

    #[test]
    fn email_shape() {
        assert!(validate_email("a@b.org").is_ok());
        assert!(validate_email("no-at-sign").is_err());
        assert!(validate_email("two@@b.org").is_err());
    }

    #[test]
    fn username_shape() {
        assert!(SeaOrmAuthService::validate_username("priya_k").is_ok());
        assert!(SeaOrmAuthService::validate_username("ab").is_err());
        assert!(SeaOrmAuthService::validate_username("has space").is_err());
    }
}

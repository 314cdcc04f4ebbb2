use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::entities::{superuser_invites, users};

/// User data returned from the store (without password hash or login code)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    pub id: i32,
    pub username: String,
    pub email: String,
    pub is_superuser: bool,
    pub is_verified: bool,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Full administrative rights need both the role flag and a completed
    /// email code check.
    #[must_use]
    pub const fn is_admin(&self) -> bool {
        self.is_superuser && self.is_verified
    }
}

impl From<users::Model> for User {
    fn from(model: users::Model) -> Self {
        Self {
            id: model.id,
            username: model.username,
            email: model.email,
            is_superuser: model.is_superuser,
            is_verified: model.is_verified,
            created_at: model.created_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingOtp {
    pub code: String,
    pub expires_at: Option<DateTime<Utc>>,
    pub attempts: i32,
}

impl PendingOtp {
    pub(crate) fn from_model(model: &users::Model) -> Option<Self> {
        model.otp.as_ref().map(|code| Self {
            code: code.clone(),
            expires_at: model.otp_expires_at,
            attempts: model.otp_attempts,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Invite {
    pub id: i32,
    #[serde(skip_serializing)]
    pub token: String,
    pub email: String,
    pub invited_by: i32,
    pub expires_at: DateTime<Utc>,
    pub used_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Invite {
    #[must_use]
    pub fn is_redeemable(&self, now: DateTime<Utc>) -> bool {
        self.used_at.is_none() && self.expires_at > now
    }
}

impl From<superuser_invites::Model> for Invite {
    fn from(model: superuser_invites::Model) -> Self {
        Self {
            id: model.id,
            token: model.token,
            email: model.email,
            invited_by: model.invited_by,
            expires_at: model.expires_at,
            used_at: model.used_at,
            created_at: model.created_at,
        }
    }
}

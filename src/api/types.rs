use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::models::{MonthCount, Sponsor, User};

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub const fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

// ============================================================================
// Forms
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct SponsorForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub date: String,
}

#[derive(Debug, Deserialize)]
pub struct RegisterForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct InviteRegisterForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginQuery {
    pub next: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct OtpForm {
    #[serde(default)]
    pub otp: String,
}

#[derive(Debug, Deserialize)]
pub struct InviteForm {
    #[serde(default)]
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct RangeQuery {
    pub start: Option<String>,
    pub end: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub query: Option<String>,
}

// ============================================================================
// Responses
// ============================================================================

/// Calendar entry shown to users without administrative rights.
#[derive(Debug, Clone, Serialize)]
pub struct PublicSponsorDto {
    pub id: i32,
    pub name: String,
    pub date: NaiveDate,
}

#[derive(Debug, Clone, Serialize)]
pub struct SponsorDto {
    pub id: i32,
    pub name: String,
    pub phone: String,
    pub email: String,
    pub date: NaiveDate,
}

impl From<Sponsor> for SponsorDto {
    fn from(sponsor: Sponsor) -> Self {
        Self {
            id: sponsor.id,
            name: sponsor.name,
            phone: sponsor.phone,
            email: sponsor.email,
            date: sponsor.date,
        }
    }
}

impl From<Sponsor> for PublicSponsorDto {
    fn from(sponsor: Sponsor) -> Self {
        Self {
            id: sponsor.id,
            name: sponsor.name,
            date: sponsor.date,
        }
    }
}

/// Either shape of a sponsor listing entry, depending on the caller's role.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum SponsorView {
    Full(SponsorDto),
    Public(PublicSponsorDto),
}

#[derive(Debug, Serialize)]
pub struct UserDto {
    pub id: i32,
    pub username: String,
    pub email: String,
    pub is_superuser: bool,
    pub is_verified: bool,
    pub is_admin: bool,
    pub created_at: String,
}

impl From<User> for UserDto {
    fn from(user: User) -> Self {
        Self {
            is_admin: user.is_admin(),
            id: user.id,
            username: user.username,
            email: user.email,
            is_superuser: user.is_superuser,
            is_verified: user.is_verified,
            created_at: user.created_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DashboardDto {
    pub total_sponsors: u64,
    pub total_users: u64,
    pub sponsors_by_month: Vec<MonthCount>,
    pub recent_sponsors: Vec<SponsorDto>,
    pub upcoming_sponsors: Vec<SponsorDto>,
}

#[derive(Debug, Serialize)]
pub struct InviteDto {
    pub email: String,
    pub expires_at: String,
}

#[derive(Debug, Serialize)]
pub struct OtpPendingDto {
    pub user_id: i32,
    pub verify_url: String,
}

#[derive(Debug, Serialize)]
pub struct TestSponsorDto {
    pub sponsor: SponsorDto,
    pub notified: usize,
    pub failed: usize,
}

#[derive(Debug, Serialize)]
pub struct HealthDto {
    pub status: &'static str,
    pub database: &'static str,
    pub uptime_seconds: u64,
    pub version: &'static str,
}

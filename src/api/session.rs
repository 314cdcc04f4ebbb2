use axum::{extract::FromRequestParts, http::request::Parts};
use tower_sessions::Session;

use super::ApiError;
use crate::models::User;

/// Session key holding the id of the logged-in user.
pub const USER_ID_KEY: &str = "user_id";

/// Session key holding the id of a user who passed the password check but
/// still owes the emailed login code.
pub const PENDING_OTP_KEY: &str = "pending_otp_user";

/// The authenticated user for this request.
///
/// Inserted into request extensions by the route guard, so it is only
/// available on guarded routes.
#[derive(Debug, Clone)]
pub struct SessionUser(pub User);

impl<S> FromRequestParts<S> for SessionUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Self>()
            .cloned()
            .ok_or_else(|| ApiError::Unauthorized("Please log in to access this page".to_string()))
    }
}

pub async fn user_id(session: &Session) -> Result<Option<i32>, ApiError> {
    Ok(session.get::<i32>(USER_ID_KEY).await?)
}

/// Starts an authenticated session under a fresh id.
pub async fn establish(session: &Session, user_id: i32) -> Result<(), ApiError> {
    session.cycle_id().await?;
    session.remove::<i32>(PENDING_OTP_KEY).await?;
    session.insert(USER_ID_KEY, user_id).await?;
    Ok(())
}

/// Marks the session as waiting for a login code. Any prior login is dropped.
pub async fn begin_otp(session: &Session, user_id: i32) -> Result<(), ApiError> {
    session.remove::<i32>(USER_ID_KEY).await?;
    session.insert(PENDING_OTP_KEY, user_id).await?;
    Ok(())
}

pub async fn pending_otp_user(session: &Session) -> Result<Option<i32>, ApiError> {
    Ok(session.get::<i32>(PENDING_OTP_KEY).await?)
}

pub async fn clear_pending_otp(session: &Session) -> Result<(), ApiError> {
    session.remove::<i32>(PENDING_OTP_KEY).await?;
    Ok(())
}

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use std::fmt;

use super::ApiResponse;
use super::negotiate::Flash;
use crate::db::{StoreError, UniqueField};
use crate::services::{AuthError, MailError};

#[derive(Debug)]
pub enum ApiError {
    Validation(String),

    Unauthorized(String),

    Forbidden(String),

    NotFound(String),

    Conflict(String),

    Database(String),

    /// `partial` means the record was saved and only the email failed.
    Mail { message: String, partial: bool },

    Internal(String),
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Validation(msg) => write!(f, "Validation error: {msg}"),
            Self::Unauthorized(msg) => write!(f, "Unauthorized: {msg}"),
            Self::Forbidden(msg) => write!(f, "Forbidden: {msg}"),
            Self::NotFound(msg) => write!(f, "Not found: {msg}"),
            Self::Conflict(msg) => write!(f, "Conflict: {msg}"),
            Self::Database(msg) => write!(f, "Database error: {msg}"),
            Self::Mail { message, partial } => {
                write!(f, "Mail error (record saved: {partial}): {message}")
            }
            Self::Internal(msg) => write!(f, "Internal error: {msg}"),
        }
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_message) = match &self {
            Self::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            Self::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg.clone()),
            Self::Forbidden(msg) => (StatusCode::FORBIDDEN, msg.clone()),
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            Self::Conflict(msg) => (StatusCode::CONFLICT, msg.clone()),
            Self::Database(msg) => {
                tracing::error!("Database error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "A database error occurred".to_string(),
                )
            }
            Self::Mail { message, partial } => {
                tracing::warn!(partial, "Mail error: {}", message);
                (StatusCode::BAD_GATEWAY, message.clone())
            }
            Self::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An internal error occurred".to_string(),
                )
            }
        };

        let flash = Flash::error(error_message.clone());
        let body = ApiResponse::<()>::error(error_message);
        let mut response = (status, Json(body)).into_response();
        response.extensions_mut().insert(flash);
        response
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

impl From<tower_sessions::session::Error> for ApiError {
    fn from(err: tower_sessions::session::Error) -> Self {
        Self::Internal(format!("Session error: {err}"))
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict(field) => Self::conflict(field),
            StoreError::Storage(msg) => Self::Database(msg),
        }
    }
}

impl From<MailError> for ApiError {
    fn from(err: MailError) -> Self {
        Self::mail(&err, false)
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidCredentials
            | AuthError::NoPendingOtp
            | AuthError::OtpExpired => Self::Unauthorized(err.to_string()),
            AuthError::Validation(msg) => Self::Validation(msg),
            AuthError::InvalidOtp { .. } | AuthError::SelfToggle => {
                Self::Validation(err.to_string())
            }
            AuthError::Conflict(field) => Self::conflict(field),
            AuthError::UserNotFound | AuthError::InvalidInvite => Self::NotFound(err.to_string()),
            AuthError::Forbidden(msg) => Self::Forbidden(msg),
            AuthError::Mail {
                source,
                record_saved,
            } => Self::mail(&source, record_saved),
            AuthError::Storage(msg) => Self::Database(msg),
        }
    }
}

impl ApiError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(resource: &str, id: impl fmt::Display) -> Self {
        Self::NotFound(format!("{resource} {id} not found"))
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    #[must_use]
    pub fn conflict(field: UniqueField) -> Self {
        match field {
            UniqueField::Username => Self::Conflict("Username already exists".to_string()),
            UniqueField::Email => Self::Conflict("Email already registered".to_string()),
        }
    }

    #[must_use]
    pub fn mail(err: &MailError, partial: bool) -> Self {
        let reason = if err.is_auth_rejected() {
            "the mail server rejected our credentials".to_string()
        } else {
            err.to_string()
        };
        let message = if partial {
            format!("Saved, but the email could not be sent: {reason}")
        } else {
            format!("The email could not be sent: {reason}")
        };
        Self::Mail { message, partial }
    }
}

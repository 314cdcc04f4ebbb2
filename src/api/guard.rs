//! Route protection.
//!
//! [`authorize`] holds the decision; [`require`] is the middleware that loads
//! the session user and applies it to a route group.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use tower_sessions::Session;
use tracing::{info, warn};

use super::session::{self, SessionUser};
use super::{ApiError, AppState};
use crate::models::User;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// Any logged-in user.
    Authenticated,
    /// Superuser that completed the emailed code check.
    Admin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Denial {
    Unauthenticated,
    NotAdmin,
}

pub fn authorize(access: Access, user: Option<&User>) -> Result<&User, Denial> {
    let user = user.ok_or(Denial::Unauthenticated)?;
    match access {
        Access::Authenticated => Ok(user),
        Access::Admin if user.is_admin() => Ok(user),
        Access::Admin => Err(Denial::NotAdmin),
    }
}

#[derive(Clone)]
pub struct Guard {
    pub state: Arc<AppState>,
    pub access: Access,
}

impl Guard {
    pub const fn new(state: Arc<AppState>, access: Access) -> Self {
        Self { state, access }
    }
}

/// Reloads the user on every request so role changes apply immediately.
pub async fn require(
    State(guard): State<Guard>,
    session: Session,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let user = match session::user_id(&session).await? {
        Some(id) => guard.state.store().get_user_by_id(id).await?,
        None => None,
    };

    let path = request.uri().path().to_string();

    match authorize(guard.access, user.as_ref()) {
        Ok(user) => {
            tracing::Span::current().record("user_id", user.id);
            info!(
                user = %user.username,
                access = ?guard.access,
                path = %path,
                outcome = "allowed",
                "Access granted"
            );
            request.extensions_mut().insert(SessionUser(user.clone()));
            Ok(next.run(request).await)
        }
        Err(denial) => {
            let actor = user.as_ref().map_or("anonymous", |u| u.username.as_str());
            warn!(
                user = %actor,
                access = ?guard.access,
                path = %path,
                outcome = ?denial,
                "Access denied"
            );
            Err(match denial {
                Denial::Unauthenticated => {
                    ApiError::Unauthorized("Please log in to access this page".to_string())
                }
                Denial::NotAdmin => ApiError::Forbidden(
                    "You do not have permission to access this page".to_string(),
                ),
            })
        }
    }
}

use axum::{
    Form, Json,
    extract::{Path, Query, State},
    http::HeaderMap,
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use tower_sessions::Session;

use super::negotiate::{Reply, safe_local_path, wants_json};
use super::session::{self, SessionUser};
use super::types::{
    InviteDto, InviteRegisterForm, LoginForm, LoginQuery, OtpForm, OtpPendingDto, RegisterForm,
    UserDto,
};
use super::validation::require_field;
use super::{ApiError, ApiResponse, AppState, assets};
use crate::services::{AuthError, LoginOutcome};

// ============================================================================
// Registration
// ============================================================================

/// GET /register
pub async fn register_page() -> Response {
    assets::page("register.html")
}

/// POST /register
pub async fn register(
    State(state): State<Arc<AppState>>,
    Form(form): Form<RegisterForm>,
) -> Result<Reply<UserDto>, ApiError> {
    let username = require_field("username", &form.username)?;
    let email = require_field("email", &form.email)?;
    require_field("password", &form.password)?;

    let user = state.auth().register(username, email, &form.password).await?;

    let message = if user.is_admin() {
        "Registration successful. As the first user you have administrator rights. Please log in."
    } else {
        "Registration successful. Please log in."
    };

    Ok(Reply::new(UserDto::from(user), "/login", message))
}

/// GET /register_superuser/{token}
pub async fn register_superuser_page(
    State(state): State<Arc<AppState>>,
    Path(token): Path<String>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let invite = state.auth().check_invite(&token).await?;

    if wants_json(&headers) {
        return Ok(Json(ApiResponse::success(InviteDto {
            email: invite.email,
            expires_at: invite.expires_at.to_rfc3339(),
        }))
        .into_response());
    }

    Ok(assets::page("register_superuser.html"))
}

/// POST /register_superuser/{token}
pub async fn register_superuser(
    State(state): State<Arc<AppState>>,
    Path(token): Path<String>,
    Form(form): Form<InviteRegisterForm>,
) -> Result<Reply<UserDto>, ApiError> {
    let username = require_field("username", &form.username)?;
    require_field("password", &form.password)?;

    let user = state
        .auth()
        .register_with_invite(&token, username, &form.password)
        .await?;

    Ok(Reply::new(
        UserDto::from(user),
        "/login",
        "Registration successful. Log in to receive your verification code.",
    ))
}

// ============================================================================
// Login
// ============================================================================

/// GET /login
pub async fn login_page() -> Response {
    assets::page("login.html")
}

/// POST /login
/// Establishes a session, or starts the emailed code step for superusers
/// that are not verified yet.
pub async fn login(
    State(state): State<Arc<AppState>>,
    session: Session,
    Query(query): Query<LoginQuery>,
    Form(form): Form<LoginForm>,
) -> Result<Response, ApiError> {
    let username = require_field("username", &form.username)?;
    require_field("password", &form.password)?;

    match state.auth().login(username, &form.password).await? {
        LoginOutcome::Authenticated(user) => {
            session::establish(&session, user.id).await?;

            let next = query
                .next
                .as_deref()
                .and_then(safe_local_path)
                .unwrap_or("/")
                .to_string();

            Ok(Reply::new(UserDto::from(user), next, "Logged in successfully").into_response())
        }
        LoginOutcome::OtpRequired { user_id } => {
            session::begin_otp(&session, user_id).await?;

            let verify_url = format!("/verify_otp/{user_id}");
            Ok(Reply::new(
                OtpPendingDto {
                    user_id,
                    verify_url: verify_url.clone(),
                },
                verify_url,
                "A login code has been sent to your email",
            )
            .into_response())
        }
    }
}

async fn ensure_pending(session: &Session, user_id: i32) -> Result<(), ApiError> {
    match session::pending_otp_user(session).await? {
        Some(pending) if pending == user_id => Ok(()),
        _ => Err(ApiError::Unauthorized(
            AuthError::NoPendingOtp.to_string(),
        )),
    }
}

/// GET /verify_otp/{user_id}
pub async fn verify_otp_page(
    session: Session,
    Path(user_id): Path<i32>,
) -> Result<Response, ApiError> {
    ensure_pending(&session, user_id).await?;
    Ok(assets::page("verify_otp.html"))
}

/// POST /verify_otp/{user_id}
pub async fn verify_otp(
    State(state): State<Arc<AppState>>,
    session: Session,
    Path(user_id): Path<i32>,
    Form(form): Form<OtpForm>,
) -> Result<Reply<UserDto>, ApiError> {
    ensure_pending(&session, user_id).await?;
    let code = require_field("otp", &form.otp)?;

    match state.auth().verify_otp(user_id, code).await {
        Ok(user) => {
            session::establish(&session, user.id).await?;
            Ok(Reply::new(
                UserDto::from(user),
                "/",
                "Your superuser status has been verified",
            ))
        }
        Err(e @ (AuthError::OtpExpired | AuthError::NoPendingOtp)) => {
            session::clear_pending_otp(&session).await?;
            Err(e.into())
        }
        Err(e) => Err(e.into()),
    }
}

/// GET /logout
pub async fn logout(session: Session) -> Result<Reply<()>, ApiError> {
    session.flush().await?;
    Ok(Reply::new((), "/login", "You have been logged out"))
}

/// GET /me
pub async fn me(SessionUser(user): SessionUser) -> Json<ApiResponse<UserDto>> {
    Json(ApiResponse::success(UserDto::from(user)))
}

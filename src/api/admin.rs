use axum::{
    Form, Json,
    extract::{Path, State},
    http::HeaderMap,
    response::{IntoResponse, Response},
};
use std::sync::Arc;

use super::negotiate::{Reply, wants_json};
use super::session::SessionUser;
use super::types::{InviteDto, InviteForm, UserDto};
use super::validation::require_field;
use super::{ApiError, ApiResponse, AppState, assets};

/// GET /admin
/// Browsers get the admin page, which loads the same list as JSON.
pub async fn list_users(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    if !wants_json(&headers) {
        return Ok(assets::page("admin.html"));
    }

    let users = state.store().list_users().await?;
    let users: Vec<UserDto> = users.into_iter().map(UserDto::from).collect();
    Ok(Json(ApiResponse::success(users)).into_response())
}

/// POST /admin/toggle_superuser/{user_id}
pub async fn toggle_superuser(
    State(state): State<Arc<AppState>>,
    SessionUser(actor): SessionUser,
    Path(user_id): Path<i32>,
) -> Result<Reply<UserDto>, ApiError> {
    let user = state.auth().toggle_superuser(&actor, user_id).await?;

    let message = if user.is_superuser {
        format!(
            "{} is now a superuser and must verify by email code at next login",
            user.username
        )
    } else {
        format!("{} is no longer a superuser", user.username)
    };

    Ok(Reply::new(UserDto::from(user), "/admin", message))
}

/// GET /admin/invite_superuser
pub async fn invite_page() -> Response {
    assets::page("invite_superuser.html")
}

/// POST /admin/invite_superuser
pub async fn invite_superuser(
    State(state): State<Arc<AppState>>,
    SessionUser(actor): SessionUser,
    Form(form): Form<InviteForm>,
) -> Result<Reply<InviteDto>, ApiError> {
    let email = require_field("email", &form.email)?;

    let invite = state.auth().invite_superuser(&actor, email).await?;

    Ok(Reply::new(
        InviteDto {
            email: invite.email.clone(),
            expires_at: invite.expires_at.to_rfc3339(),
        },
        "/admin",
        format!("Invitation sent to {}", invite.email),
    ))
}

use axum::{
    Json,
    extract::State,
    http::HeaderMap,
    response::{IntoResponse, Response},
};
use chrono::Local;
use std::sync::Arc;

use super::types::{DashboardDto, SponsorDto};
use super::negotiate::wants_json;
use super::{ApiError, ApiResponse, AppState, assets};

const RECENT_LIMIT: u64 = 5;
const UPCOMING_LIMIT: u64 = 5;

/// GET /dashboard
pub async fn get_dashboard(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    if !wants_json(&headers) {
        return Ok(assets::page("dashboard.html"));
    }

    let store = state.store();
    let today = Local::now().date_naive();

    let (total_sponsors, total_users, sponsors_by_month, recent, upcoming) = futures::try_join!(
        store.count_sponsors(),
        store.count_users(),
        store.sponsor_counts_by_month(),
        store.recent_sponsors(RECENT_LIMIT),
        store.upcoming_sponsors(today, UPCOMING_LIMIT),
    )?;

    Ok(Json(ApiResponse::success(DashboardDto {
        total_sponsors,
        total_users,
        sponsors_by_month,
        recent_sponsors: recent.into_iter().map(SponsorDto::from).collect(),
        upcoming_sponsors: upcoming.into_iter().map(SponsorDto::from).collect(),
    }))
    .into_response())
}

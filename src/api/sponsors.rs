use axum::{
    Form, Json,
    extract::{Query, State},
    response::Response,
};
use chrono::{Days, Local};
use std::sync::Arc;
use tracing::info;

use super::negotiate::Reply;
use super::session::SessionUser;
use super::types::{
    PublicSponsorDto, RangeQuery, SearchQuery, SponsorDto, SponsorForm, SponsorView,
    TestSponsorDto,
};
use super::validation::{validate_range_bound, validate_search_query, validate_sponsor_form};
use super::{ApiError, ApiResponse, AppState, assets};
use crate::models::NewSponsor;

/// GET /
pub async fn index() -> Response {
    assets::page("index.html")
}

/// POST /add_sponsor
/// Saves the sponsor only. Reminders go out with the next reminder pass.
pub async fn add_sponsor(
    State(state): State<Arc<AppState>>,
    SessionUser(actor): SessionUser,
    Form(form): Form<SponsorForm>,
) -> Result<Reply<SponsorDto>, ApiError> {
    let new_sponsor = validate_sponsor_form(&form)?;
    let sponsor = state.store().add_sponsor(new_sponsor).await?;

    info!(
        user = %actor.username,
        sponsor_id = sponsor.id,
        date = %sponsor.date,
        "Sponsor added"
    );

    Ok(Reply::new(
        SponsorDto::from(sponsor),
        "/",
        "Sponsor added successfully",
    ))
}

/// GET /get_sponsors?start=YYYY-MM-DD&end=YYYY-MM-DD
/// Contact details are only included for administrators.
pub async fn get_sponsors(
    State(state): State<Arc<AppState>>,
    SessionUser(user): SessionUser,
    Query(query): Query<RangeQuery>,
) -> Result<Json<ApiResponse<Vec<SponsorView>>>, ApiError> {
    let start = validate_range_bound("start", query.start.as_deref())?;
    let end = validate_range_bound("end", query.end.as_deref())?;

    let sponsors = state.store().get_sponsors_in_range(start, end).await?;
    let admin = user.is_admin();

    let views = sponsors
        .into_iter()
        .map(|s| {
            if admin {
                SponsorView::Full(SponsorDto::from(s))
            } else {
                SponsorView::Public(PublicSponsorDto::from(s))
            }
        })
        .collect();

    Ok(Json(ApiResponse::success(views)))
}

/// GET /search_sponsors?query=...
pub async fn search_sponsors(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<ApiResponse<Vec<SponsorDto>>>, ApiError> {
    let query = validate_search_query(query.query.as_deref())?;

    let sponsors = state.store().search_sponsors(query).await?;

    Ok(Json(ApiResponse::success(
        sponsors.into_iter().map(SponsorDto::from).collect(),
    )))
}

/// GET /create_test_sponsor
/// Inserts a sponsor dated tomorrow and runs a reminder pass right away.
pub async fn create_test_sponsor(
    State(state): State<Arc<AppState>>,
    SessionUser(actor): SessionUser,
) -> Result<Reply<TestSponsorDto>, ApiError> {
    let today = Local::now().date_naive();
    let tomorrow = today
        .checked_add_days(Days::new(1))
        .ok_or_else(|| ApiError::internal("Date out of range"))?;

    let sponsor = state
        .store()
        .add_sponsor(NewSponsor {
            name: "Test Sponsor".to_string(),
            phone: "123-456-7890".to_string(),
            email: "test@example.com".to_string(),
            date: tomorrow,
        })
        .await?;

    info!(user = %actor.username, sponsor_id = sponsor.id, "Test sponsor created");

    let report = state.shared.reminders.run_pass(today).await?;

    if report.failed.contains(&sponsor.id) {
        return Err(ApiError::Mail {
            message: format!(
                "Test sponsor saved, but {} reminder email(s) could not be sent. Check the mail settings and the log.",
                report.failed.len()
            ),
            partial: true,
        });
    }

    Ok(Reply::new(
        TestSponsorDto {
            notified: report.notified.len(),
            failed: report.failed.len(),
            sponsor: SponsorDto::from(sponsor),
        },
        "/",
        "Test sponsor created and reminder emails sent",
    ))
}

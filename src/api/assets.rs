use axum::{
    body::Body,
    http::{StatusCode, Uri, header},
    response::{IntoResponse, Response},
};
use rust_embed::RustEmbed;

use super::ApiError;

#[derive(RustEmbed)]
#[folder = "static/"]
struct Asset;

fn embedded(path: &str) -> Option<Response> {
    let content = Asset::get(path)?;
    let mime = mime_guess::from_path(path).first_or_octet_stream();
    Some(
        (
            [(header::CONTENT_TYPE, mime.as_ref())],
            Body::from(content.data),
        )
            .into_response(),
    )
}

/// One of the embedded HTML pages.
pub fn page(name: &str) -> Response {
    embedded(name).unwrap_or_else(|| {
        tracing::error!(page = name, "Embedded page missing");
        (StatusCode::INTERNAL_SERVER_ERROR, "Page not available").into_response()
    })
}

/// Fallback for everything not routed: static files under `/static/`.
pub async fn serve_asset(uri: Uri) -> Result<Response, ApiError> {
    let path = uri.path();

    path.strip_prefix("/static/")
        .filter(|p| !p.ends_with(".html"))
        .and_then(embedded)
        .ok_or_else(|| ApiError::not_found("Page", path))
}

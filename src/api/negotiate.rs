//! JSON or redirect responses, chosen per request.
//!
//! Handlers always produce a JSON body. Responses that should turn into a
//! browser redirect carry a [`Flash`] extension; the [`negotiate`] middleware
//! rewrites them into a `303 See Other` with a `message` query parameter
//! unless the client asked for JSON.

use axum::{
    Json,
    extract::Request,
    http::{HeaderMap, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use serde::Serialize;

use super::ApiResponse;

#[derive(Debug, Clone)]
pub struct Flash {
    pub message: String,
    /// Explicit target. When absent the target is derived from the status.
    pub location: Option<String>,
}

impl Flash {
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            location: None,
        }
    }

    pub fn to(location: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            location: Some(location.into()),
        }
    }
}

/// Successful form submission: JSON data for API clients, redirect for
/// browsers.
pub struct Reply<T> {
    data: T,
    flash: Flash,
}

impl<T: Serialize> Reply<T> {
    pub fn new(data: T, location: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            data,
            flash: Flash::to(location, message),
        }
    }
}

impl<T: Serialize> IntoResponse for Reply<T> {
    fn into_response(self) -> Response {
        let mut response = Json(ApiResponse::success(self.data)).into_response();
        response.extensions_mut().insert(self.flash);
        response
    }
}

#[must_use]
pub fn wants_json(headers: &HeaderMap) -> bool {
    if headers.contains_key("x-requested-with") {
        return true;
    }
    headers
        .get(header::ACCEPT)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|accept| accept.contains("application/json"))
}

/// Appends `message` to `location` as a query parameter.
#[must_use]
pub fn with_message(location: &str, message: &str) -> String {
    if message.is_empty() {
        return location.to_string();
    }
    let sep = if location.contains('?') { '&' } else { '?' };
    format!("{location}{sep}message={}", urlencoding::encode(message))
}

/// Only same-site absolute paths are accepted as redirect targets.
#[must_use]
pub fn safe_local_path(target: &str) -> Option<&str> {
    if target.starts_with('/') && !target.starts_with("//") && !target.contains('\\') {
        Some(target)
    } else {
        None
    }
}

fn referer_path(headers: &HeaderMap) -> Option<String> {
    let referer = headers.get(header::REFERER)?.to_str().ok()?;
    let url = url::Url::parse(referer).ok()?;
    Some(url.path().to_string())
}

/// `target` is the request's path and query.
fn default_location(status: StatusCode, target: &str, back: Option<String>) -> String {
    match status {
        StatusCode::UNAUTHORIZED => {
            if target.starts_with("/login") || target.starts_with("/verify_otp") {
                "/login".to_string()
            } else {
                format!("/login?next={}", urlencoding::encode(target))
            }
        }
        StatusCode::FORBIDDEN => "/".to_string(),
        _ => back.unwrap_or_else(|| "/".to_string()),
    }
}

pub async fn negotiate(req: Request, next: Next) -> Response {
    let json = wants_json(req.headers());
    let target = req
        .uri()
        .path_and_query()
        .map_or_else(|| req.uri().path().to_string(), ToString::to_string);
    let back = referer_path(req.headers());

    let response = next.run(req).await;
    if json {
        return response;
    }

    let Some(flash) = response.extensions().get::<Flash>().cloned() else {
        return response;
    };

    let location = flash
        .location
        .unwrap_or_else(|| default_location(response.status(), &target, back));

    Redirect::to(&with_message(&location, &flash.message)).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn json_is_detected_from_either_header() {
        let mut headers = HeaderMap::new();
        assert!(!wants_json(&headers));

        headers.insert(header::ACCEPT, HeaderValue::from_static("application/json"));
        assert!(wants_json(&headers));

        let mut headers = HeaderMap::new();
        headers.insert("x-requested-with", HeaderValue::from_static("XMLHttpRequest"));
        assert!(wants_json(&headers));
    }

    #[test]
    fn message_is_appended_and_encoded() {
        assert_eq!(with_message("/", "Sponsor added"), "/?message=Sponsor%20added");
        assert_eq!(with_message("/login?next=%2F", "x"), "/login?next=%2F&message=x");
        assert_eq!(with_message("/admin", ""), "/admin");
    }

    #[test]
    fn unauthenticated_goes_to_login_with_next() {
        assert_eq!(
            default_location(StatusCode::UNAUTHORIZED, "/dashboard", None),
            "/login?next=%2Fdashboard"
        );
        assert_eq!(
            default_location(
                StatusCode::UNAUTHORIZED,
                "/get_sponsors?start=2026-11-01&end=2026-11-30",
                None
            ),
            "/login?next=%2Fget_sponsors%3Fstart%3D2026-11-01%26end%3D2026-11-30"
        );
        assert_eq!(
            default_location(StatusCode::UNAUTHORIZED, "/verify_otp/3", None),
            "/login"
        );
        assert_eq!(default_location(StatusCode::FORBIDDEN, "/admin", None), "/");
        assert_eq!(
            default_location(StatusCode::BAD_REQUEST, "/register", Some("/register".into())),
            "/register"
        );
    }

    #[test]
    fn only_local_paths_are_safe() {
        assert_eq!(safe_local_path("/dashboard"), Some("/dashboard"));
        assert_eq!(safe_local_path("//evil.example"), None);
        assert_eq!(safe_local_path("https://evil.example"), None);
    }
}

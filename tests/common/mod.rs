//! Shared harness for the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{Request, Response, header},
};
use http_body_util::BodyExt;
use regex::Regex;
use sponsordesk::api::AppState;
use sponsordesk::config::Config;
use sponsordesk::services::{EmailMessage, MailError, Mailer};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tower::ServiceExt;

/// Records every message; can be switched to reject all sends or only the
/// ones whose subject contains a marker.
#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<EmailMessage>>,
    failing: AtomicBool,
    fail_subjects_containing: Mutex<Option<String>>,
}

impl RecordingMailer {
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn fail_when_subject_contains(&self, marker: &str) {
        *self.fail_subjects_containing.lock().unwrap() = Some(marker.to_string());
    }

    pub fn sent(&self) -> Vec<EmailMessage> {
        self.sent.lock().unwrap().clone()
    }

    pub fn sent_to(&self, to: &str) -> Vec<EmailMessage> {
        self.sent().into_iter().filter(|m| m.to == to).collect()
    }

    pub fn clear(&self) {
        self.sent.lock().unwrap().clear();
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, message: &EmailMessage) -> Result<(), MailError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(MailError::AuthRejected(
                "535 5.7.8 Username and Password not accepted".to_string(),
            ));
        }
        if let Some(marker) = self.fail_subjects_containing.lock().unwrap().as_deref()
            && message.subject.contains(marker)
        {
            return Err(MailError::Transport("connection reset by peer".to_string()));
        }
        self.sent.lock().unwrap().push(message.clone());
        Ok(())
    }
}

pub fn test_config() -> Config {
    let db_path =
        std::env::temp_dir().join(format!("sponsordesk-test-{}.db", uuid::Uuid::new_v4()));

    let mut config = Config::default();
    config.general.database_path = format!("sqlite:{}", db_path.display());
    config.server.persistent_sessions = false;
    config.server.public_base_url = "https://sponsors.example.org".to_string();
    config.mail.default_sender = "office@example.org".to_string();
    config.security.argon2_memory_cost_kib = 1024;
    config.security.argon2_time_cost = 1;
    config
}

pub struct TestApp {
    pub state: Arc<AppState>,
    pub router: Router,
    pub mailer: Arc<RecordingMailer>,
}

pub async fn spawn_app() -> TestApp {
    spawn_app_with_config(test_config()).await
}

pub async fn spawn_app_with_config(config: Config) -> TestApp {
    let mailer = Arc::new(RecordingMailer::default());
    let state = sponsordesk::api::create_app_state_with_mailer(config, mailer.clone(), None)
        .await
        .expect("Failed to create app state");
    let router = sponsordesk::api::router(state.clone()).await;

    TestApp {
        state,
        router,
        mailer,
    }
}

impl TestApp {
    async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router.clone().oneshot(request).await.unwrap()
    }

    fn request(method: &str, uri: &str, cookie: Option<&str>, json: bool) -> axum::http::request::Builder {
        let mut builder = Request::builder().method(method).uri(uri);
        if json {
            builder = builder.header(header::ACCEPT, "application/json");
        }
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        builder
    }

    pub async fn get_json(&self, uri: &str, cookie: Option<&str>) -> Response<Body> {
        self.send(Self::request("GET", uri, cookie, true).body(Body::empty()).unwrap())
            .await
    }

    pub async fn get_browser(&self, uri: &str, cookie: Option<&str>) -> Response<Body> {
        self.send(Self::request("GET", uri, cookie, false).body(Body::empty()).unwrap())
            .await
    }

    pub async fn post_form(&self, uri: &str, body: &str, cookie: Option<&str>) -> Response<Body> {
        self.send(
            Self::request("POST", uri, cookie, true)
                .header(
                    header::CONTENT_TYPE,
                    mime::APPLICATION_WWW_FORM_URLENCODED.as_ref(),
                )
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
    }

    pub async fn post_form_browser(
        &self,
        uri: &str,
        body: &str,
        cookie: Option<&str>,
    ) -> Response<Body> {
        self.send(
            Self::request("POST", uri, cookie, false)
                .header(
                    header::CONTENT_TYPE,
                    mime::APPLICATION_WWW_FORM_URLENCODED.as_ref(),
                )
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
    }

    pub async fn register(&self, username: &str, email: &str, password: &str) -> Response<Body> {
        let body = format!(
            "username={}&email={}&password={}",
            urlencoding::encode(username),
            urlencoding::encode(email),
            urlencoding::encode(password)
        );
        self.post_form("/register", &body, None).await
    }

    /// Returns the response and the session cookie it set, if any.
    pub async fn login(&self, username: &str, password: &str) -> (Response<Body>, Option<String>) {
        let body = format!(
            "username={}&password={}",
            urlencoding::encode(username),
            urlencoding::encode(password)
        );
        let response = self.post_form("/login", &body, None).await;
        let cookie = session_cookie(&response);
        (response, cookie)
    }

    /// Registers the bootstrap administrator and logs in.
    pub async fn admin_session(&self) -> String {
        let response = self.register("admin", "admin@example.org", "admin-pass-1").await;
        assert!(response.status().is_success(), "admin registration failed");
        let (response, cookie) = self.login("admin", "admin-pass-1").await;
        assert!(response.status().is_success(), "admin login failed");
        cookie.expect("admin session cookie")
    }

    /// Registers a regular user and logs in.
    pub async fn user_session(&self, username: &str) -> String {
        let email = format!("{username}@example.org");
        let response = self.register(username, &email, "user-pass-1").await;
        assert!(response.status().is_success(), "user registration failed");
        let (response, cookie) = self.login(username, "user-pass-1").await;
        assert!(response.status().is_success(), "user login failed");
        cookie.expect("user session cookie")
    }
}

/// `name=value` of the session cookie set by a response.
pub fn session_cookie(response: &Response<Body>) -> Option<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find(|v| v.starts_with("id="))
        .and_then(|v| v.split(';').next())
        .map(str::to_string)
}

pub fn location(response: &Response<Body>) -> String {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let body = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&body).unwrap()
}

pub async fn body_text(response: Response<Body>) -> String {
    let body = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(body.to_vec()).unwrap()
}

pub fn extract_code(message: &EmailMessage) -> String {
    let re = Regex::new(r"\b(\d{6})\b").unwrap();
    re.captures(&message.text_body)
        .map(|c| c[1].to_string())
        .expect("no code in message")
}

pub fn extract_invite_token(message: &EmailMessage) -> String {
    let re = Regex::new(r"/register_superuser/([0-9a-f]{64})").unwrap();
    re.captures(&message.html_body)
        .map(|c| c[1].to_string())
        .expect("no invitation link in message")
}

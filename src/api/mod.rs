use axum::{
    Router, middleware,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tower_sessions::cookie::{Key, SameSite};
use tower_sessions::{Expiry, MemoryStore, SessionManagerLayer, SessionStore};
use tower_sessions_sqlx_store::SqliteStore;
use tracing::{info, warn};

use crate::config::{Config, ServerConfig};
use crate::services::Mailer;
use crate::state::SharedState;

mod admin;
mod assets;
pub mod auth;
mod dashboard;
mod error;
pub mod guard;
pub mod negotiate;
mod observability;
pub mod session;
mod sponsors;
mod types;
mod validation;

pub use error::ApiError;
pub use guard::{Access, Denial, authorize};
pub use types::*;

use guard::Guard;
use metrics_exporter_prometheus::PrometheusHandle;

#[derive(Clone)]
pub struct AppState {
    pub shared: Arc<SharedState>,

    pub start_time: std::time::Instant,

    pub prometheus_handle: Option<PrometheusHandle>,
}

impl AppState {
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.shared.config
    }

    #[must_use]
    pub fn store(&self) -> &crate::db::Store {
        &self.shared.store
    }

    #[must_use]
    pub fn auth(&self) -> &Arc<dyn crate::services::AuthService> {
        &self.shared.auth
    }
}

#[must_use]
pub fn create_app_state(
    shared: Arc<SharedState>,
    prometheus_handle: Option<PrometheusHandle>,
) -> Arc<AppState> {
    Arc::new(AppState {
        shared,
        start_time: std::time::Instant::now(),
        prometheus_handle,
    })
}

pub async fn create_app_state_from_config(
    config: Config,
    prometheus_handle: Option<PrometheusHandle>,
) -> anyhow::Result<Arc<AppState>> {
    let shared = Arc::new(SharedState::new(config).await?);
    Ok(create_app_state(shared, prometheus_handle))
}

/// Same as [`create_app_state_from_config`] with an explicit mail transport.
pub async fn create_app_state_with_mailer(
    config: Config,
    mailer: Arc<dyn Mailer>,
    prometheus_handle: Option<PrometheusHandle>,
) -> anyhow::Result<Arc<AppState>> {
    let shared = Arc::new(SharedState::with_mailer(config, mailer).await?);
    Ok(create_app_state(shared, prometheus_handle))
}

fn session_key(server: &ServerConfig) -> Key {
    if server.secret_key.is_empty() {
        warn!("No secret key configured; sessions will not survive a restart");
        return Key::generate();
    }
    Key::try_from(server.secret_key.as_bytes()).unwrap_or_else(|e| {
        warn!(error = %e, "Secret key unusable for signing; using a random key");
        Key::generate()
    })
}

fn with_sessions<S>(router: Router, store: S, server: &ServerConfig) -> Router
where
    S: SessionStore + Clone,
{
    let layer = SessionManagerLayer::new(store)
        .with_secure(server.secure_cookies)
        .with_http_only(true)
        .with_same_site(SameSite::Lax)
        .with_expiry(Expiry::OnInactivity(time::Duration::minutes(
            server.session_idle_minutes,
        )))
        .with_signed(session_key(server));

    router.layer(layer)
}

pub async fn router(state: Arc<AppState>) -> Router {
    let server = state.config().server.clone();

    let app = Router::new()
        .merge(public_routes())
        .merge(user_routes(state.clone()))
        .merge(admin_routes(state.clone()))
        .fallback(assets::serve_asset)
        .with_state(state.clone())
        .layer(middleware::from_fn(negotiate::negotiate));

    let app = if server.persistent_sessions {
        let pool = state.store().conn.get_sqlite_connection_pool().clone();
        let store = SqliteStore::new(pool);
        match store.migrate().await {
            Ok(()) => {
                info!("Sessions persisted in the database");
                with_sessions(app, store, &server)
            }
            Err(e) => {
                warn!(error = %e, "Session table unavailable; falling back to memory sessions");
                with_sessions(app, MemoryStore::default(), &server)
            }
        }
    } else {
        with_sessions(app, MemoryStore::default(), &server)
    };

    app.layer(middleware::from_fn(observability::security_headers))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(observability::request_log))
}

fn public_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(observability::health))
        .route("/metrics", get(observability::get_metrics))
        .route("/register", get(auth::register_page).post(auth::register))
        .route("/login", get(auth::login_page).post(auth::login))
        .route(
            "/verify_otp/{user_id}",
            get(auth::verify_otp_page).post(auth::verify_otp),
        )
        .route(
            "/register_superuser/{token}",
            get(auth::register_superuser_page).post(auth::register_superuser),
        )
        .route("/logout", get(auth::logout))
}

fn user_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(sponsors::index))
        .route("/get_sponsors", get(sponsors::get_sponsors))
        .route("/me", get(auth::me))
        .route_layer(middleware::from_fn_with_state(
            Guard::new(state, Access::Authenticated),
            guard::require,
        ))
}

fn admin_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route("/add_sponsor", post(sponsors::add_sponsor))
        .route("/search_sponsors", get(sponsors::search_sponsors))
        .route("/create_test_sponsor", get(sponsors::create_test_sponsor))
        .route("/dashboard", get(dashboard::get_dashboard))
        .route("/admin", get(admin::list_users))
        .route(
            "/admin/toggle_superuser/{user_id}",
            post(admin::toggle_superuser),
        )
        .route(
            "/admin/invite_superuser",
            get(admin::invite_page).post(admin::invite_superuser),
        )
        .route_layer(middleware::from_fn_with_state(
            Guard::new(state, Access::Admin),
            guard::require,
        ))
}

use axum::{
    Router,
    http::HeaderValue,
    middleware,
    routing::{delete, get, post, put},
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tower_sessions::{Expiry, MemoryStore, SessionManagerLayer};

use time;

use crate::config::Config;
use crate::state::SharedState;

pub mod admin;
pub mod auth;
mod error;
mod history;
mod observability;
mod plans;
mod search;
mod types;
mod user;

pub use error::ApiError;
pub use types::*;

use crate::clients::provider::LeadsProvider;
use crate::services::search::LeadSearchService;
use crate::services::usage::UsageService;
use metrics_exporter_prometheus::PrometheusHandle;
use tokio::sync::RwLock;

#[derive(Clone)]
pub struct AppState {
    pub shared: Arc<SharedState>,

    pub search_service: Arc<LeadSearchService>,

    pub usage_service: Arc<UsageService>,

    pub start_time: std::time::Instant,

    pub prometheus_handle: Option<PrometheusHandle>,
}

impl AppState {
    #[must_use]
    pub fn config(&self) -> &Arc<RwLock<Config>> {
        &self.shared.config
    }

    #[must_use]
    pub fn store(&self) -> &crate::db::Store {
        &self.shared.store
    }

    #[must_use]
    pub fn search_service(&self) -> &Arc<LeadSearchService> {
        &self.search_service
    }

    #[must_use]
    pub fn usage_service(&self) -> &Arc<UsageService> {
        &self.usage_service
    }
}

pub fn create_app_state(
    shared: Arc<SharedState>,
    prometheus_handle: Option<PrometheusHandle>,
) -> Arc<AppState> {
    let search_service = Arc::new(LeadSearchService::new(
        shared.store.clone(),
        shared.provider.clone(),
    ));
    let usage_service = Arc::new(UsageService::new(shared.store.clone()));

    Arc::new(AppState {
        shared,
        search_service,
        usage_service,
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

/// Variant used by tests to swap in a canned lead provider.
pub async fn create_app_state_with_provider(
    config: Config,
    provider: Arc<dyn LeadsProvider>,
    prometheus_handle: Option<PrometheusHandle>,
) -> anyhow::Result<Arc<AppState>> {
    let shared = Arc::new(SharedState::with_provider(config, provider).await?);
    Ok(create_app_state(shared, prometheus_handle))
}

pub async fn router(state: Arc<AppState>) -> Router {
    let (cors_origins, secure_cookies) = {
        let config = state.config().read().await;
        (
            config.server.cors_allowed_origins.clone(),
            config.server.secure_cookies,
        )
    };

    let protected_routes = create_protected_router(state.clone());

    let session_store = MemoryStore::default();
    let session_layer = SessionManagerLayer::new(session_store)
        .with_secure(secure_cookies)
        .with_same_site(tower_sessions::cookie::SameSite::Lax)
        .with_expiry(Expiry::OnInactivity(time::Duration::minutes(60)));

    let api_router = Router::new()
        .merge(protected_routes)
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/logout", post(auth::logout))
        .route("/plans", get(plans::list_plans))
        .layer(session_layer)
        .with_state(state.clone());

    let cors_layer = if cors_origins.contains(&"*".to_string()) {
        CorsLayer::new().allow_origin(Any)
    } else {
        let origins: Vec<HeaderValue> =
            cors_origins.iter().filter_map(|s| s.parse().ok()).collect();
        CorsLayer::new().allow_origin(origins)
    };

    Router::new()
        .nest("/api", api_router)
        .layer(cors_layer.allow_methods(Any).allow_headers(Any))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(observability::logging_middleware))
}

fn create_protected_router(state: Arc<AppState>) -> Router<Arc<AppState>> {
    let admin_routes = Router::new()
        .route("/admin/plans", get(plans::list_plans))
        .route("/admin/plans", post(admin::create_plan))
        .route("/admin/plans/{id}", put(admin::update_plan))
        .route("/admin/plans/{id}", delete(admin::delete_plan))
        .route("/admin/users", get(admin::list_users))
        .route("/admin/users/{id}/plan", put(admin::set_user_plan))
        .route("/admin/stats", get(admin::get_stats))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            admin::admin_guard,
        ));

    Router::new()
        .route("/auth/me", get(auth::get_current_user))
        .route("/search/leads", post(search::search_leads))
        .route("/user/limits", get(user::get_limits))
        .route("/user/plan", get(user::get_plan))
        .route("/user/email", put(user::update_email))
        .route("/search-history", get(history::list_history))
        .route("/search-history/{id}", get(history::get_history))
        .route("/search-history/{id}", delete(history::delete_history))
        .route("/search-history/{id}/leads", get(history::get_history_leads))
        .route("/search-history/{id}/export", get(history::export_history))
        .route("/metrics", get(observability::get_metrics))
        .merge(admin_routes)
        .route_layer(middleware::from_fn_with_state(state, auth::auth_middleware))
}

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use http_body_util::BodyExt;
use serde_json::{Map, Value, json};
use std::sync::Mutex;
use tower::ServiceExt;

use leadfinder::api::AppState;
use leadfinder::clients::provider::{LeadsProvider, ProviderError};
use leadfinder::config::Config;

/// Default API key seeded by migration (must match m20250101_initial.rs)
const DEFAULT_API_KEY: &str = "leadfinder_default_api_key_please_regenerate";

enum StubResponse {
    Leads(Vec<Map<String, Value>>),
    Timeout,
}

struct StubProvider {
    calls: AtomicUsize,
    last_payload: Mutex<Option<Map<String, Value>>>,
    response: StubResponse,
}

impl StubProvider {
    fn returning(leads: Vec<Map<String, Value>>) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            last_payload: Mutex::new(None),
            response: StubResponse::Leads(leads),
        })
    }

    fn timing_out() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            last_payload: Mutex::new(None),
            response: StubResponse::Timeout,
        })
    }

    fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn last_payload(&self) -> Option<Map<String, Value>> {
        self.last_payload.lock().unwrap().clone()
    }
}

#[async_trait]
impl LeadsProvider for StubProvider {
    async fn fetch_leads(
        &self,
        params: &Map<String, Value>,
    ) -> Result<Vec<Map<String, Value>>, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_payload.lock().unwrap() = Some(params.clone());

        match &self.response {
            StubResponse::Leads(leads) => Ok(leads.clone()),
            StubResponse::Timeout => Err(ProviderError::Timeout),
        }
    }
}

fn sample_leads() -> Vec<Map<String, Value>> {
    let lead = json!({
        "first_name": "Ada",
        "last_name": "Lovelace",
        "email": "ada@initech.example",
        "company_name": "Initech",
        "company_founded_year": 1999,
        "industry": ""
    });
    vec![lead.as_object().cloned().unwrap()]
}

async fn spawn_app_with_provider(provider: Arc<StubProvider>) -> (Arc<AppState>, Router) {
    let mut config = Config::default();
    config.general.database_path = "sqlite::memory:".to_string();
    config.server.secure_cookies = false;

    let state = leadfinder::api::create_app_state_with_provider(config, provider, None)
        .await
        .expect("Failed to create app state");
    let router = leadfinder::api::router(state.clone()).await;
    (state, router)
}

async fn spawn_app() -> (Arc<AppState>, Router) {
    spawn_app_with_provider(StubProvider::returning(sample_leads())).await
}

async fn body_json(response: axum::response::Response) -> Value {
    let body = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&body).unwrap()
}

/// Register a fresh user and return their API key.
async fn register_user(app: &Router, email: &str) -> String {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/auth/register")
                .header("Content-Type", "application/json")
                .body(Body::from(
                    json!({ "email": email, "password": "hunter2hunter2" }).to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    body["data"]["api_key"].as_str().unwrap().to_string()
}

async fn run_search(app: &Router, api_key: &str, body: Value) -> axum::response::Response {
    app.clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/search/leads")
                .header("X-Api-Key", api_key)
                .header("Content-Type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap()
}

#[tokio::test]
async fn test_auth_endpoints() {
    let (_state, app) = spawn_app().await;

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/auth/me")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/auth/me")
                .header("X-Api-Key", "wrong-key")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/auth/me")
                .header("X-Api-Key", DEFAULT_API_KEY)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"]["email"], "admin@leadfind.com");
}

#[tokio::test]
async fn test_register_rejects_bad_input() {
    let (_state, app) = spawn_app().await;

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/auth/register")
                .header("Content-Type", "application/json")
                .body(Body::from(
                    json!({ "email": "not-an-email", "password": "hunter2hunter2" }).to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/auth/register")
                .header("Content-Type", "application/json")
                .body(Body::from(
                    json!({ "email": "short@example.com", "password": "short" }).to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_public_plans_listing() {
    let (_state, app) = spawn_app().await;

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/plans")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    let plans = body["data"].as_array().unwrap();
    assert_eq!(plans.len(), 3);
    assert_eq!(plans[0]["name"], "Free");
    assert_eq!(plans[1]["name"], "Basic");
    assert_eq!(plans[1]["is_popular"], true);
    assert_eq!(plans[2]["name"], "Ultra");
}

#[tokio::test]
async fn test_search_persists_leads() {
    let provider = StubProvider::returning(sample_leads());
    let (_state, app) = spawn_app_with_provider(provider.clone()).await;
    let api_key = register_user(&app, "searcher@example.com").await;

    let response = run_search(
        &app,
        &api_key,
        json!({ "company_industry": ["software"] }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"]["search"]["result_count"], 1);
    let search_id = body["data"]["search"]["id"].as_str().unwrap().to_string();

    let leads = body["data"]["leads"].as_array().unwrap();
    assert_eq!(leads.len(), 1);
    assert_eq!(leads[0]["first_name"], "Ada");
    // numbers are stored as text, empty strings as null
    assert_eq!(leads[0]["company_founded_year"], "1999");
    assert_eq!(leads[0]["industry"], Value::Null);

    // the same rows come back from history
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri(format!("/api/search-history/{search_id}/leads"))
                .header("X-Api-Key", &api_key)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"][0]["first_name"], "Ada");
    assert_eq!(body["data"][0]["company_name"], "Initech");
}

#[tokio::test]
async fn test_search_quota_enforced_before_provider_call() {
    let provider = StubProvider::returning(sample_leads());
    let (_state, app) = spawn_app_with_provider(provider.clone()).await;
    let api_key = register_user(&app, "quota@example.com").await;

    // free tier allows two searches per month
    for _ in 0..2 {
        let response = run_search(&app, &api_key, json!({ "contact_job_title": ["CTO"] })).await;
        assert_eq!(response.status(), StatusCode::OK);
    }
    assert_eq!(provider.call_count(), 2);

    let response = run_search(&app, &api_key, json!({ "contact_job_title": ["CTO"] })).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let body = body_json(response).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["searchesUsed"], 2);
    assert_eq!(body["searchLimit"], 2);

    // the rejected request never reached the provider
    assert_eq!(provider.call_count(), 2);
}

#[tokio::test]
async fn test_fetch_count_clamped_to_plan_rows_limit() {
    let provider = StubProvider::returning(sample_leads());
    let (_state, app) = spawn_app_with_provider(provider.clone()).await;
    let api_key = register_user(&app, "clamp@example.com").await;

    let response = run_search(
        &app,
        &api_key,
        json!({ "company_keywords": ["fintech"], "fetch_count": 5000 }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    // free tier rows_limit is 50
    let payload = provider.last_payload().unwrap();
    assert_eq!(payload["fetch_count"], 50);
}

#[tokio::test]
async fn test_search_rejects_empty_and_unknown_filters() {
    let provider = StubProvider::returning(sample_leads());
    let (_state, app) = spawn_app_with_provider(provider.clone()).await;
    let api_key = register_user(&app, "filters@example.com").await;

    let response = run_search(&app, &api_key, json!({})).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = run_search(
        &app,
        &api_key,
        json!({ "company_industry": ["", "  "] }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = run_search(&app, &api_key, json!({ "no_such_filter": ["x"] })).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // a row count alone is not a search criterion
    let response = run_search(&app, &api_key, json!({ "fetch_count": 10 })).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // rejected requests consume no quota and no provider calls
    assert_eq!(provider.call_count(), 0);
}

#[tokio::test]
async fn test_zero_result_search_is_recorded() {
    let provider = StubProvider::returning(vec![]);
    let (_state, app) = spawn_app_with_provider(provider).await;
    let api_key = register_user(&app, "empty@example.com").await;

    let response = run_search(&app, &api_key, json!({ "contact_location": ["Mars"] })).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["data"]["search"]["result_count"], 0);
    assert_eq!(body["data"]["leads"].as_array().unwrap().len(), 0);

    // a zero-result search still counts against the quota
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/user/limits")
                .header("X-Api-Key", &api_key)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    let body = body_json(response).await;
    assert_eq!(body["data"]["searchesUsed"], 1);
}

#[tokio::test]
async fn test_provider_timeout_consumes_no_quota() {
    let provider = StubProvider::timing_out();
    let (_state, app) = spawn_app_with_provider(provider.clone()).await;
    let api_key = register_user(&app, "timeout@example.com").await;

    let response = run_search(&app, &api_key, json!({ "company_size": ["11-50"] })).await;
    assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
    assert_eq!(provider.call_count(), 1);

    // nothing was persisted, so the quota is untouched
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/user/limits")
                .header("X-Api-Key", &api_key)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    let body = body_json(response).await;
    assert_eq!(body["data"]["searchesUsed"], 0);
    assert_eq!(body["data"]["canSearch"], true);

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/search-history")
                .header("X-Api-Key", &api_key)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    let body = body_json(response).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn test_user_limits_snapshot() {
    let (_state, app) = spawn_app().await;
    let api_key = register_user(&app, "limits@example.com").await;

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/user/limits")
                .header("X-Api-Key", &api_key)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"]["planName"], "Free");
    assert_eq!(body["data"]["searchLimit"], 2);
    assert_eq!(body["data"]["rowsLimit"], 50);
    assert_eq!(body["data"]["searchesUsed"], 0);
    assert_eq!(body["data"]["searchesRemaining"], 2);
    assert_eq!(body["data"]["canSearch"], true);
}

#[tokio::test]
async fn test_update_email() {
    let (_state, app) = spawn_app().await;
    let api_key = register_user(&app, "before@example.com").await;
    register_user(&app, "taken@example.com").await;

    // Malformed, current, and already-taken addresses are all rejected
    for (email, expected_error) in [
        ("not-an-email", "Invalid email format"),
        ("before@example.com", "This is already your email address"),
        ("taken@example.com", "Email is already in use"),
    ] {
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("PUT")
                    .uri("/api/user/email")
                    .header("X-Api-Key", &api_key)
                    .header("Content-Type", "application/json")
                    .body(Body::from(json!({ "email": email }).to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["error"], expected_error);
    }

    // Normalized on the way in, visible on /auth/me afterwards
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("PUT")
                .uri("/api/user/email")
                .header("X-Api-Key", &api_key)
                .header("Content-Type", "application/json")
                .body(Body::from(
                    json!({ "email": "  After@Example.com " }).to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"]["email"], "after@example.com");

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/auth/me")
                .header("X-Api-Key", &api_key)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"]["email"], "after@example.com");
}

#[tokio::test]
async fn test_history_ownership_and_delete() {
    let (_state, app) = spawn_app().await;
    let owner_key = register_user(&app, "owner@example.com").await;
    let other_key = register_user(&app, "other@example.com").await;

    let response = run_search(&app, &owner_key, json!({ "company_keywords": ["saas"] })).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    let search_id = body["data"]["search"]["id"].as_str().unwrap().to_string();

    // other users cannot see or delete someone else's search
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri(format!("/api/search-history/{search_id}"))
                .header("X-Api-Key", &other_key)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri(format!("/api/search-history/{search_id}"))
                .header("X-Api-Key", &other_key)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    // the owner deletes it, leads go with it
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri(format!("/api/search-history/{search_id}"))
                .header("X-Api-Key", &owner_key)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri(format!("/api/search-history/{search_id}/leads"))
                .header("X-Api-Key", &owner_key)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_csv_export() {
    let (_state, app) = spawn_app().await;
    let api_key = register_user(&app, "export@example.com").await;

    let response = run_search(&app, &api_key, json!({ "company_keywords": ["devtools"] })).await;
    let body = body_json(response).await;
    let search_id = body["data"]["search"]["id"].as_str().unwrap().to_string();

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri(format!("/api/search-history/{search_id}/export?format=csv"))
                .header("X-Api-Key", &api_key)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("content-type").unwrap(),
        "text/csv"
    );

    let body = response.into_body().collect().await.unwrap().to_bytes();
    let csv = String::from_utf8(body.to_vec()).unwrap();
    assert!(csv.starts_with("first_name,last_name"));
    assert!(csv.contains("\"Ada\""));
}

#[tokio::test]
async fn test_admin_routes_require_admin_email() {
    let (_state, app) = spawn_app().await;
    let user_key = register_user(&app, "regular@example.com").await;

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/admin/stats")
                .header("X-Api-Key", &user_key)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    // the seeded admin user is on the default allow-list
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/admin/stats")
                .header("X-Api-Key", DEFAULT_API_KEY)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["data"]["total_plans"], 3);
}

#[tokio::test]
async fn test_admin_plan_assignment_changes_limits() {
    let (_state, app) = spawn_app().await;
    let user_key = register_user(&app, "upgraded@example.com").await;

    // find the new user's id through the admin listing
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/admin/users")
                .header("X-Api-Key", DEFAULT_API_KEY)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    let user_id = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .find(|u| u["email"] == "upgraded@example.com")
        .unwrap()["id"]
        .as_i64()
        .unwrap();

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/plans")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let body = body_json(response).await;
    let basic_id = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .find(|p| p["name"] == "Basic")
        .unwrap()["id"]
        .as_i64()
        .unwrap();

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("PUT")
                .uri(format!("/api/admin/users/{user_id}/plan"))
                .header("X-Api-Key", DEFAULT_API_KEY)
                .header("Content-Type", "application/json")
                .body(Body::from(json!({ "plan_id": basic_id }).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/user/limits")
                .header("X-Api-Key", &user_key)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    let body = body_json(response).await;
    assert_eq!(body["data"]["planName"], "Basic");
    assert_eq!(body["data"]["searchLimit"], 100);
    assert_eq!(body["data"]["rowsLimit"], 100);
}

#[tokio::test]
async fn test_admin_plan_crud() {
    let (_state, app) = spawn_app().await;

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/admin/plans")
                .header("X-Api-Key", DEFAULT_API_KEY)
                .header("Content-Type", "application/json")
                .body(Body::from(
                    json!({
                        "name": "Enterprise",
                        "monthly_price": 99.0,
                        "yearly_price": 990.0,
                        "features": ["Unlimited seats"],
                        "display_order": 4,
                        "search_limit": 5000,
                        "rows_limit": 5000
                    })
                    .to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    let plan_id = body["data"]["id"].as_i64().unwrap();
    assert_eq!(body["data"]["features"][0], "Unlimited seats");

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri(format!("/api/admin/plans/{plan_id}"))
                .header("X-Api-Key", DEFAULT_API_KEY)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/plans")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let body = body_json(response).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 3);
}

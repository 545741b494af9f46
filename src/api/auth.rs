use axum::{
    Extension, Json,
    extract::{Request, State},
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::IntoResponse,
};
use serde::Deserialize;
use std::sync::Arc;
use tower_sessions::Session;

use super::{ApiError, ApiResponse, AppState, UserDto};
use crate::db::User;

const SESSION_USER_KEY: &str = "user_id";

/// Authenticated user resolved by the middleware, available to handlers as
/// a request extension.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Authentication middleware that checks:
/// 1. Session cookie (from login)
/// 2. `X-Api-Key` header
/// 3. `Authorization: Bearer <api_key>` header
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    session: Session,
    mut request: Request,
    next: Next,
) -> Result<impl IntoResponse, ApiError> {
    // Session first (fastest path for the web UI)
    if let Ok(Some(user_id)) = session.get::<i32>(SESSION_USER_KEY).await
        && let Ok(Some(user)) = state.store().get_user(user_id).await
    {
        tracing::Span::current().record("user_id", user.id);
        request.extensions_mut().insert(CurrentUser(user));
        return Ok(next.run(request).await);
    }

    if let Some(key) = extract_api_key(&headers)
        && let Ok(Some(user)) = state.store().verify_api_key(&key).await
    {
        tracing::Span::current().record("user_id", user.id);
        request.extensions_mut().insert(CurrentUser(user));
        return Ok(next.run(request).await);
    }

    Ok((
        StatusCode::UNAUTHORIZED,
        Json(ApiResponse::<()>::error("Not authenticated")),
    )
        .into_response())
}

fn extract_api_key(headers: &HeaderMap) -> Option<String> {
    if let Some(api_key) = headers.get("X-Api-Key")
        && let Ok(key_str) = api_key.to_str()
    {
        return Some(key_str.trim().to_string());
    }

    if let Some(auth_header) = headers.get("Authorization")
        && let Ok(auth_str) = auth_header.to_str()
        && let Some(token) = auth_str.strip_prefix("Bearer ")
    {
        return Some(token.trim().to_string());
    }

    None
}

/// POST /auth/register
pub async fn register(
    State(state): State<Arc<AppState>>,
    session: Session,
    Json(payload): Json<RegisterRequest>,
) -> Result<Json<ApiResponse<UserDto>>, ApiError> {
    let email = payload.email.trim().to_lowercase();

    if email.is_empty() || !email.contains('@') {
        return Err(ApiError::validation("A valid email address is required"));
    }
    if payload.password.len() < 8 {
        return Err(ApiError::validation(
            "Password must be at least 8 characters",
        ));
    }

    if state
        .store()
        .get_user_by_email(&email)
        .await
        .map_err(|e| ApiError::internal(format!("Failed to check email: {e}")))?
        .is_some()
    {
        return Err(ApiError::validation("Email is already registered"));
    }

    let security = state.config().read().await.security.clone();
    let user = state
        .store()
        .create_user(&email, &payload.password, &security)
        .await
        .map_err(|e| ApiError::internal(format!("Failed to create user: {e}")))?;

    session
        .insert(SESSION_USER_KEY, user.id)
        .await
        .map_err(|e| ApiError::internal(format!("Failed to create session: {e}")))?;

    tracing::info!(user_id = user.id, "User registered");

    Ok(Json(ApiResponse::success(UserDto::from(user))))
}

/// POST /auth/login
pub async fn login(
    State(state): State<Arc<AppState>>,
    session: Session,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<ApiResponse<UserDto>>, ApiError> {
    let email = payload.email.trim().to_lowercase();

    if email.is_empty() {
        return Err(ApiError::validation("Email is required"));
    }
    if payload.password.is_empty() {
        return Err(ApiError::validation("Password is required"));
    }

    let is_valid = state
        .store()
        .verify_user_password(&email, &payload.password)
        .await
        .map_err(|e| ApiError::internal(format!("Authentication error: {e}")))?;

    if !is_valid {
        return Err(ApiError::Unauthorized("Invalid credentials".to_string()));
    }

    let user = state
        .store()
        .get_user_by_email(&email)
        .await
        .map_err(|e| ApiError::internal(format!("Failed to get user: {e}")))?
        .ok_or_else(|| ApiError::Unauthorized("Invalid credentials".to_string()))?;

    session
        .insert(SESSION_USER_KEY, user.id)
        .await
        .map_err(|e| ApiError::internal(format!("Failed to create session: {e}")))?;

    Ok(Json(ApiResponse::success(UserDto::from(user))))
}

/// POST /auth/logout
pub async fn logout(session: Session) -> impl IntoResponse {
    let _ = session.flush().await;
    (StatusCode::OK, Json(ApiResponse::success("Logged out")))
}

/// GET /auth/me
pub async fn get_current_user(
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> Json<ApiResponse<UserDto>> {
    Json(ApiResponse::success(UserDto::from(user)))
}

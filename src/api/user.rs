use axum::{Extension, Json, extract::State};
use serde::Deserialize;
use std::sync::Arc;

use super::auth::CurrentUser;
use super::{ApiError, ApiResponse, AppState, PlanDto, UserDto};
use crate::services::usage::UsageSnapshot;

#[derive(Deserialize)]
pub struct UpdateEmailRequest {
    pub email: String,
}

/// GET /user/limits
pub async fn get_limits(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> Result<Json<ApiResponse<UsageSnapshot>>, ApiError> {
    let snapshot = state
        .usage_service()
        .snapshot(user.id)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("User not found".to_string()))?;

    Ok(Json(ApiResponse::success(snapshot)))
}

/// GET /user/plan
pub async fn get_plan(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> Result<Json<ApiResponse<Option<PlanDto>>>, ApiError> {
    let (_, plan) = state
        .store()
        .get_user_with_plan(user.id)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("User not found".to_string()))?;

    Ok(Json(ApiResponse::success(plan.map(PlanDto::from))))
}

/// PUT /user/email
pub async fn update_email(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Json(payload): Json<UpdateEmailRequest>,
) -> Result<Json<ApiResponse<UserDto>>, ApiError> {
    let email = payload.email.trim().to_lowercase();

    if email.is_empty() || !is_valid_email(&email) {
        return Err(ApiError::validation("Invalid email format"));
    }
    if email == user.email {
        return Err(ApiError::validation("This is already your email address"));
    }

    if state
        .store()
        .get_user_by_email(&email)
        .await
        .map_err(|e| ApiError::internal(format!("Failed to check email: {e}")))?
        .is_some()
    {
        return Err(ApiError::validation("Email is already in use"));
    }

    let updated = state
        .store()
        .update_user_email(user.id, &email)
        .await
        .map_err(|e| ApiError::internal(format!("Failed to update email: {e}")))?
        .ok_or_else(|| ApiError::Unauthorized("User not found".to_string()))?;

    tracing::info!(user_id = updated.id, "User email updated");

    Ok(Json(ApiResponse::success(UserDto::from(updated))))
}

/// Shape check only: one `@` with a dotted domain. Deliverability is the
/// mail server's problem.
fn is_valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };

    !local.is_empty()
        && !domain.is_empty()
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && domain.contains('.')
        && !email.contains(char::is_whitespace)
        && !domain.contains('@')
}

use axum::{
    Extension, Json,
    extract::{Path, Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::auth::CurrentUser;
use super::{ApiError, ApiResponse, AppState, PlanDto, UserDto};
use crate::db::PlanInput;

/// Admin access is an email allow-list comparison, case-insensitive after
/// trimming. No state, so the policy is directly testable.
#[must_use]
pub fn is_admin(email: &str, admin_emails: &[String]) -> bool {
    let normalized = email.trim().to_lowercase();
    admin_emails
        .iter()
        .any(|admin| admin.trim().to_lowercase() == normalized)
}

/// Layered after `auth_middleware`, so `CurrentUser` is always present.
pub async fn admin_guard(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let admin_emails = state.config().read().await.admin.admin_emails.clone();

    if !is_admin(&user.email, &admin_emails) {
        return Err(ApiError::Forbidden("Admin access required".to_string()));
    }

    Ok(next.run(request).await)
}

#[derive(Debug, Deserialize)]
pub struct PlanRequest {
    pub name: String,
    pub monthly_price: f64,
    pub yearly_price: f64,
    pub stripe_monthly_price_id: Option<String>,
    pub stripe_yearly_price_id: Option<String>,
    #[serde(default)]
    pub features: Vec<String>,
    #[serde(default)]
    pub is_popular: bool,
    #[serde(default)]
    pub display_order: i32,
    pub search_limit: i32,
    pub rows_limit: i32,
}

impl PlanRequest {
    fn validate(&self) -> Result<(), ApiError> {
        if self.name.trim().is_empty() {
            return Err(ApiError::validation("Plan name is required"));
        }
        if self.search_limit < 0 || self.rows_limit < 1 {
            return Err(ApiError::validation(
                "Plan limits must be non-negative and rows_limit at least 1",
            ));
        }
        Ok(())
    }

    fn into_input(self) -> PlanInput {
        PlanInput {
            name: self.name.trim().to_string(),
            monthly_price: self.monthly_price,
            yearly_price: self.yearly_price,
            stripe_monthly_price_id: self.stripe_monthly_price_id,
            stripe_yearly_price_id: self.stripe_yearly_price_id,
            features: self.features,
            is_popular: self.is_popular,
            display_order: self.display_order,
            search_limit: self.search_limit,
            rows_limit: self.rows_limit,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SetUserPlanRequest {
    pub plan_id: Option<i32>,
}

#[derive(Debug, Serialize)]
pub struct AdminStats {
    pub total_users: u64,
    pub total_searches: u64,
    pub total_leads: u64,
    pub total_plans: usize,
}

/// POST /admin/plans
pub async fn create_plan(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<PlanRequest>,
) -> Result<Json<ApiResponse<PlanDto>>, ApiError> {
    payload.validate()?;

    let plan = state.store().create_plan(payload.into_input()).await?;

    tracing::info!(plan_id = plan.id, "Plan created");

    Ok(Json(ApiResponse::success(PlanDto::from(plan))))
}

/// PUT /admin/plans/{id}
pub async fn update_plan(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
    Json(payload): Json<PlanRequest>,
) -> Result<Json<ApiResponse<PlanDto>>, ApiError> {
    payload.validate()?;

    let plan = state
        .store()
        .update_plan(id, payload.into_input())
        .await?
        .ok_or_else(|| ApiError::not_found("Plan", id))?;

    Ok(Json(ApiResponse::success(PlanDto::from(plan))))
}

/// DELETE /admin/plans/{id}
pub async fn delete_plan(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<bool>>, ApiError> {
    let deleted = state.store().delete_plan(id).await?;

    if !deleted {
        return Err(ApiError::not_found("Plan", id));
    }

    tracing::info!(plan_id = id, "Plan deleted, assigned users fall back to free tier");

    Ok(Json(ApiResponse::success(true)))
}

/// GET /admin/users
pub async fn list_users(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<Vec<UserDto>>>, ApiError> {
    let users = state.store().list_users().await?;

    Ok(Json(ApiResponse::success(
        users.into_iter().map(UserDto::from).collect(),
    )))
}

/// PUT /admin/users/{id}/plan
pub async fn set_user_plan(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
    Json(payload): Json<SetUserPlanRequest>,
) -> Result<Json<ApiResponse<UserDto>>, ApiError> {
    if let Some(plan_id) = payload.plan_id
        && state.store().get_plan(plan_id).await?.is_none()
    {
        return Err(ApiError::not_found("Plan", plan_id));
    }

    let user = state
        .store()
        .set_user_plan(id, payload.plan_id)
        .await?
        .ok_or_else(|| ApiError::not_found("User", id))?;

    tracing::info!(user_id = id, plan_id = ?payload.plan_id, "User plan updated");

    Ok(Json(ApiResponse::success(UserDto::from(user))))
}

/// GET /admin/stats
pub async fn get_stats(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<AdminStats>>, ApiError> {
    let total_users = state.store().count_users().await?;
    let total_searches = state.store().count_searches().await?;
    let total_leads = state.store().count_leads().await?;
    let total_plans = state.store().list_plans().await?.len();

    Ok(Json(ApiResponse::success(AdminStats {
        total_users,
        total_searches,
        total_leads,
        total_plans,
    })))
}

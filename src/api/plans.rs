use axum::{Json, extract::State};
use std::sync::Arc;

use super::{ApiError, ApiResponse, AppState, PlanDto};

/// GET /plans
///
/// Public pricing page data, ordered by display position.
pub async fn list_plans(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<Vec<PlanDto>>>, ApiError> {
    let plans = state.store().list_plans().await?;

    Ok(Json(ApiResponse::success(
        plans.into_iter().map(PlanDto::from).collect(),
    )))
}

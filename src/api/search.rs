use axum::{Extension, Json, extract::State};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

use super::auth::CurrentUser;
use super::{ApiError, ApiResponse, AppState, LeadDto, SearchHistoryDto};
use crate::models::filters::SearchFilters;

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub search: SearchHistoryDto,
    pub leads: Vec<LeadDto>,
}

/// POST /search/leads
pub async fn search_leads(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Json(body): Json<Value>,
) -> Result<Json<ApiResponse<SearchResponse>>, ApiError> {
    // Deserialize by hand so unknown filter names surface as a 400 with the
    // serde message instead of a rejection from the extractor.
    let filters: SearchFilters = serde_json::from_value(body)
        .map_err(|e| ApiError::validation(format!("Invalid search filters: {e}")))?;

    let outcome = state.search_service().execute(user.id, &filters).await?;

    Ok(Json(ApiResponse::success(SearchResponse {
        search: SearchHistoryDto::from(outcome.history),
        leads: outcome.leads.into_iter().map(LeadDto::from).collect(),
    })))
}

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::header,
    response::IntoResponse,
};
use serde::Deserialize;
use std::sync::Arc;

use super::auth::CurrentUser;
use super::{ApiError, ApiResponse, AppState, LeadDto, SearchHistoryDto};
use crate::services::export;

#[derive(Debug, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Json,
    Csv,
}

#[derive(Debug, Deserialize)]
pub struct ExportQuery {
    #[serde(default)]
    pub format: ExportFormat,
}

/// GET /search-history
pub async fn list_history(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> Result<Json<ApiResponse<Vec<SearchHistoryDto>>>, ApiError> {
    let searches = state.store().list_searches(user.id).await?;

    Ok(Json(ApiResponse::success(
        searches.into_iter().map(SearchHistoryDto::from).collect(),
    )))
}

/// GET /search-history/{id}
pub async fn get_history(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<SearchHistoryDto>>, ApiError> {
    let search = state
        .store()
        .get_search(&id, user.id)
        .await?
        .ok_or_else(|| ApiError::not_found("Search", &id))?;

    Ok(Json(ApiResponse::success(SearchHistoryDto::from(search))))
}

/// GET /search-history/{id}/leads
pub async fn get_history_leads(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<Vec<LeadDto>>>, ApiError> {
    // Ownership check before touching the leads table
    let search = state
        .store()
        .get_search(&id, user.id)
        .await?
        .ok_or_else(|| ApiError::not_found("Search", &id))?;

    let leads = state.store().leads_for_search(&search.id).await?;

    Ok(Json(ApiResponse::success(
        leads.into_iter().map(LeadDto::from).collect(),
    )))
}

/// DELETE /search-history/{id}
pub async fn delete_history(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<bool>>, ApiError> {
    let deleted = state.store().delete_search(&id, user.id).await?;

    if !deleted {
        return Err(ApiError::not_found("Search", &id));
    }

    tracing::info!(user_id = user.id, search_id = %id, "Search history deleted");

    Ok(Json(ApiResponse::success(true)))
}

/// GET /search-history/{id}/export?format=csv|json
pub async fn export_history(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(id): Path<String>,
    Query(query): Query<ExportQuery>,
) -> Result<axum::response::Response, ApiError> {
    let search = state
        .store()
        .get_search(&id, user.id)
        .await?
        .ok_or_else(|| ApiError::not_found("Search", &id))?;

    let leads = state.store().leads_for_search(&search.id).await?;

    if query.format == ExportFormat::Csv {
        let csv = export::leads_to_csv(&leads);

        return Ok((
            [
                (header::CONTENT_TYPE, "text/csv"),
                (
                    header::CONTENT_DISPOSITION,
                    "attachment; filename=\"leads.csv\"",
                ),
            ],
            csv,
        )
            .into_response());
    }

    let dtos: Vec<LeadDto> = leads.into_iter().map(LeadDto::from).collect();
    let json =
        serde_json::to_string_pretty(&dtos).map_err(|e| ApiError::internal(e.to_string()))?;

    Ok((
        [
            (header::CONTENT_TYPE, "application/json"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"leads.json\"",
            ),
        ],
        json,
    )
        .into_response())
}

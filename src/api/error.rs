use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::fmt;

use super::ApiResponse;
use crate::services::search::SearchError;

#[derive(Debug)]
pub enum ApiError {
    NotFound(String),

    DatabaseError(String),

    ValidationError(String),

    /// Monthly allowance exhausted. Carries the usage pair so clients can
    /// render the limit without a second request.
    QuotaExceeded {
        searches_used: i32,
        search_limit: i32,
    },

    UpstreamTimeout(String),

    UpstreamError(String),

    InternalError(String),

    Unauthorized(String),

    Forbidden(String),
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::NotFound(msg) => write!(f, "Not found: {}", msg),
            ApiError::DatabaseError(msg) => write!(f, "Database error: {}", msg),
            ApiError::ValidationError(msg) => write!(f, "Validation error: {}", msg),
            ApiError::QuotaExceeded {
                searches_used,
                search_limit,
            } => write!(
                f,
                "Search limit reached ({} of {} used)",
                searches_used, search_limit
            ),
            ApiError::UpstreamTimeout(msg) => write!(f, "Upstream timeout: {}", msg),
            ApiError::UpstreamError(msg) => write!(f, "Upstream error: {}", msg),
            ApiError::InternalError(msg) => write!(f, "Internal error: {}", msg),
            ApiError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            ApiError::Forbidden(msg) => write!(f, "Forbidden: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_message) = match &self {
            // The quota body is its own shape: it carries the usage pair at
            // the top level, not the plain error envelope.
            ApiError::QuotaExceeded {
                searches_used,
                search_limit,
            } => {
                let body = json!({
                    "success": false,
                    "error": "Monthly search limit reached. Upgrade your plan to continue.",
                    "searchesUsed": searches_used,
                    "searchLimit": search_limit,
                });
                return (StatusCode::FORBIDDEN, Json(body)).into_response();
            }
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            ApiError::DatabaseError(msg) => {
                tracing::error!("Database error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "A database error occurred".to_string(),
                )
            }
            ApiError::ValidationError(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            ApiError::UpstreamTimeout(msg) => {
                tracing::warn!("Upstream timeout: {}", msg);
                (
                    StatusCode::GATEWAY_TIMEOUT,
                    "The lead provider timed out. Try a smaller fetch count.".to_string(),
                )
            }
            ApiError::UpstreamError(msg) => {
                tracing::warn!("Upstream error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "The lead provider request failed".to_string(),
                )
            }
            ApiError::InternalError(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An internal error occurred".to_string(),
                )
            }
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg.clone()),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg.clone()),
        };

        let body = ApiResponse::<()>::error(error_message);
        (status, Json(body)).into_response()
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        ApiError::InternalError(err.to_string())
    }
}

impl From<SearchError> for ApiError {
    fn from(err: SearchError) -> Self {
        match err {
            SearchError::EmptyFilters => {
                ApiError::ValidationError("At least one search filter is required".to_string())
            }
            SearchError::QuotaExceeded {
                searches_used,
                search_limit,
            } => ApiError::QuotaExceeded {
                searches_used,
                search_limit,
            },
            SearchError::UserNotFound => ApiError::Unauthorized("User not found".to_string()),
            SearchError::ProviderTimeout => {
                ApiError::UpstreamTimeout("lead provider run exceeded its deadline".to_string())
            }
            SearchError::ProviderValidation(msg) => ApiError::ValidationError(msg),
            SearchError::Provider(msg) => ApiError::UpstreamError(msg),
            SearchError::Persistence(e) => ApiError::DatabaseError(e.to_string()),
        }
    }
}

impl ApiError {
    pub fn not_found(resource: &str, id: impl fmt::Display) -> Self {
        ApiError::NotFound(format!("{} {} not found", resource, id))
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        ApiError::ValidationError(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        ApiError::InternalError(msg.into())
    }
}

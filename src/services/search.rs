use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::{info, warn};

use crate::clients::provider::{LeadsProvider, ProviderError};
use crate::db::Store;
use crate::entities::{leads, search_history};
use crate::models::filters::SearchFilters;
use crate::services::usage::UsageService;

#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    #[error("At least one search filter is required")]
    EmptyFilters,

    #[error("Monthly search limit reached")]
    QuotaExceeded {
        searches_used: i32,
        search_limit: i32,
    },

    #[error("User not found")]
    UserNotFound,

    #[error("Lead provider timed out")]
    ProviderTimeout,

    #[error("Lead provider rejected the search: {0}")]
    ProviderValidation(String),

    #[error("Lead provider request failed: {0}")]
    Provider(String),

    #[error(transparent)]
    Persistence(#[from] anyhow::Error),
}

pub struct SearchOutcome {
    pub history: search_history::Model,
    pub leads: Vec<leads::Model>,
}

/// The search pipeline: sanitize, enforce quota, call the provider, persist.
/// The quota check runs before the provider call so an exhausted user never
/// spends an upstream request. Enforcement is best effort by design; two
/// racing requests from the same user may both pass, which overshoots the
/// limit by at most the concurrency, and never rejects a request wrongly.
#[derive(Clone)]
pub struct LeadSearchService {
    store: Store,
    usage: UsageService,
    provider: Arc<dyn LeadsProvider>,
}

impl LeadSearchService {
    #[must_use]
    pub fn new(store: Store, provider: Arc<dyn LeadsProvider>) -> Self {
        let usage = UsageService::new(store.clone());
        Self {
            store,
            usage,
            provider,
        }
    }

    pub async fn execute(
        &self,
        user_id: i32,
        filters: &SearchFilters,
    ) -> Result<SearchOutcome, SearchError> {
        let mut payload = filters.sanitize();
        // fetch_count alone is not a search criterion
        if !payload.keys().any(|k| k != "fetch_count") {
            return Err(SearchError::EmptyFilters);
        }

        let limits = self
            .usage
            .plan_limits(user_id)
            .await?
            .ok_or(SearchError::UserNotFound)?;
        let used = self.usage.searches_this_month(user_id).await?;

        if used >= limits.search_limit {
            return Err(SearchError::QuotaExceeded {
                searches_used: used,
                search_limit: limits.search_limit,
            });
        }

        let fetch_count = clamp_fetch_count(filters.fetch_count, limits.rows_limit);
        payload.insert("fetch_count".to_string(), Value::from(fetch_count));

        info!(
            user_id,
            plan = %limits.plan_name,
            fetch_count,
            "Executing lead search"
        );

        let raw_leads = self.provider.fetch_leads(&payload).await.map_err(|e| {
            warn!(user_id, error = %e, "Lead provider call failed");
            match e {
                ProviderError::Timeout => SearchError::ProviderTimeout,
                ProviderError::Validation(msg) => SearchError::ProviderValidation(msg),
                ProviderError::Upstream { message, .. } => SearchError::Provider(message),
            }
        })?;

        metrics::counter!("leadfinder_searches_total").increment(1);
        metrics::counter!("leadfinder_leads_fetched_total").increment(raw_leads.len() as u64);

        let history = self.store.record_search(user_id, &payload, &raw_leads).await?;
        let leads = self.store.leads_for_search(&history.id).await?;

        info!(
            user_id,
            search_id = %history.id,
            result_count = history.result_count,
            "Lead search recorded"
        );

        Ok(SearchOutcome { history, leads })
    }
}

/// Requested row counts are clamped into [1, rows_limit]; a missing or
/// unparseable request defaults to the plan's full row allowance.
fn clamp_fetch_count(requested: Option<i64>, rows_limit: i32) -> i64 {
    let rows_limit = i64::from(rows_limit.max(1));
    requested.unwrap_or(rows_limit).clamp(1, rows_limit)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamps_oversized_requests_to_plan_limit() {
        assert_eq!(clamp_fetch_count(Some(5000), 100), 100);
    }

    #[test]
    fn clamps_non_positive_requests_to_one() {
        assert_eq!(clamp_fetch_count(Some(0), 100), 1);
        assert_eq!(clamp_fetch_count(Some(-5), 100), 1);
    }

    #[test]
    fn defaults_to_full_allowance_when_absent() {
        assert_eq!(clamp_fetch_count(None, 50), 50);
    }

    #[test]
    fn keeps_in_range_requests_unchanged() {
        assert_eq!(clamp_fetch_count(Some(25), 50), 25);
    }
}

use anyhow::{Context, Result};
use chrono::{Datelike, Utc};
use serde::Serialize;

use crate::db::Store;

/// Entitlements applied to users without an assigned plan.
pub const FREE_PLAN_NAME: &str = "Free";
pub const FREE_SEARCH_LIMIT: i32 = 2;
pub const FREE_ROWS_LIMIT: i32 = 50;

/// Effective entitlements for a user, resolved fresh from the database.
#[derive(Debug, Clone)]
pub struct PlanLimits {
    pub plan_name: String,
    pub search_limit: i32,
    pub rows_limit: i32,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageSnapshot {
    pub plan_name: String,
    pub rows_limit: i32,
    pub search_limit: i32,
    pub searches_used: i32,
    pub searches_remaining: i32,
    pub can_search: bool,
}

#[derive(Clone)]
pub struct UsageService {
    store: Store,
}

impl UsageService {
    #[must_use]
    pub const fn new(store: Store) -> Self {
        Self { store }
    }

    /// Resolve the user's current entitlements. A missing plan assignment
    /// (including one cleared by a plan deletion) falls back to the free
    /// tier defaults.
    pub async fn plan_limits(&self, user_id: i32) -> Result<Option<PlanLimits>> {
        let Some((_, plan)) = self.store.get_user_with_plan(user_id).await? else {
            return Ok(None);
        };

        Ok(Some(plan.map_or_else(
            || PlanLimits {
                plan_name: FREE_PLAN_NAME.to_string(),
                search_limit: FREE_SEARCH_LIMIT,
                rows_limit: FREE_ROWS_LIMIT,
            },
            |p| PlanLimits {
                plan_name: p.name,
                search_limit: p.search_limit,
                rows_limit: p.rows_limit,
            },
        )))
    }

    /// Searches consumed in the current calendar month (UTC).
    pub async fn searches_this_month(&self, user_id: i32) -> Result<i32> {
        let since = start_of_month_rfc3339();
        let count = self.store.count_searches_since(user_id, &since).await?;
        i32::try_from(count).context("Monthly search count exceeds i32 range")
    }

    pub async fn snapshot(&self, user_id: i32) -> Result<Option<UsageSnapshot>> {
        let Some(limits) = self.plan_limits(user_id).await? else {
            return Ok(None);
        };

        let used = self.searches_this_month(user_id).await?;
        let remaining = (limits.search_limit - used).max(0);

        Ok(Some(UsageSnapshot {
            plan_name: limits.plan_name,
            rows_limit: limits.rows_limit,
            search_limit: limits.search_limit,
            searches_used: used,
            searches_remaining: remaining,
            can_search: used < limits.search_limit,
        }))
    }
}

/// First instant of the current UTC month, RFC 3339. String comparison on
/// stored timestamps is correct because both sides share the format.
fn start_of_month_rfc3339() -> String {
    let now = Utc::now();
    format!("{:04}-{:02}-01T00:00:00+00:00", now.year(), now.month())
}

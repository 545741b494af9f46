use anyhow::{Context, Result};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::entities::{leads, search_history};

pub struct SearchRepository {
    conn: DatabaseConnection,
}

impl SearchRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// Searches executed by the user since `since` (RFC 3339, inclusive).
    pub async fn count_since(&self, user_id: i32, since: &str) -> Result<u64> {
        search_history::Entity::find()
            .filter(search_history::Column::UserId.eq(user_id))
            .filter(search_history::Column::CreatedAt.gte(since))
            .count(&self.conn)
            .await
            .context("Failed to count search history")
    }

    pub async fn count_all(&self) -> Result<u64> {
        search_history::Entity::find()
            .count(&self.conn)
            .await
            .context("Failed to count search history")
    }

    pub async fn count_all_leads(&self) -> Result<u64> {
        leads::Entity::find()
            .count(&self.conn)
            .await
            .context("Failed to count leads")
    }

    /// Record one executed search with its yielded leads. The history row and
    /// the lead bulk-insert share a transaction: a failure anywhere rolls
    /// both back, so a failed create never consumes quota and never leaves
    /// an orphaned history row.
    pub async fn record(
        &self,
        user_id: i32,
        parameters: &Map<String, Value>,
        raw_leads: &[Map<String, Value>],
    ) -> Result<search_history::Model> {
        let params_json =
            serde_json::to_string(parameters).context("Failed to serialize search parameters")?;

        let history_id = Uuid::new_v4().to_string();
        let result_count =
            i32::try_from(raw_leads.len()).context("Result count exceeds i32 range")?;

        let history = search_history::ActiveModel {
            id: Set(history_id.clone()),
            user_id: Set(user_id),
            parameters: Set(params_json),
            result_count: Set(result_count),
            created_at: Set(chrono::Utc::now().to_rfc3339()),
        };

        let lead_models: Vec<leads::ActiveModel> = raw_leads
            .iter()
            .map(|raw| lead_from_raw(&history_id, raw))
            .collect();

        let txn = self.conn.begin().await.context("Failed to open transaction")?;

        let inserted = history
            .insert(&txn)
            .await
            .context("Failed to insert search history")?;

        // Zero leads is a valid and common outcome. Batches stay well under
        // sqlite's bind-variable limit at ~35 columns per row.
        for chunk in lead_models.chunks(250) {
            leads::Entity::insert_many(chunk.to_vec())
                .exec(&txn)
                .await
                .context("Failed to bulk-insert leads")?;
        }

        txn.commit().await.context("Failed to commit search record")?;

        Ok(inserted)
    }

    pub async fn list_for_user(&self, user_id: i32) -> Result<Vec<search_history::Model>> {
        search_history::Entity::find()
            .filter(search_history::Column::UserId.eq(user_id))
            .order_by_desc(search_history::Column::CreatedAt)
            .all(&self.conn)
            .await
            .context("Failed to list search history")
    }

    /// Fetch a search only if it belongs to the given user.
    pub async fn get_owned(
        &self,
        search_id: &str,
        user_id: i32,
    ) -> Result<Option<search_history::Model>> {
        search_history::Entity::find()
            .filter(search_history::Column::Id.eq(search_id))
            .filter(search_history::Column::UserId.eq(user_id))
            .one(&self.conn)
            .await
            .context("Failed to query search history")
    }

    /// Delete a search and all of its leads. The lead delete is explicit
    /// rather than relying on the FK cascade, so the pair stays atomic even
    /// on engines with foreign keys disabled.
    pub async fn delete_owned(&self, search_id: &str, user_id: i32) -> Result<bool> {
        let Some(history) = self.get_owned(search_id, user_id).await? else {
            return Ok(false);
        };

        let txn = self.conn.begin().await.context("Failed to open transaction")?;

        leads::Entity::delete_many()
            .filter(leads::Column::SearchHistoryId.eq(history.id.clone()))
            .exec(&txn)
            .await
            .context("Failed to delete leads")?;

        search_history::Entity::delete_by_id(history.id)
            .exec(&txn)
            .await
            .context("Failed to delete search history")?;

        txn.commit().await.context("Failed to commit search delete")?;

        Ok(true)
    }

    pub async fn leads_for_search(&self, search_id: &str) -> Result<Vec<leads::Model>> {
        leads::Entity::find()
            .filter(leads::Column::SearchHistoryId.eq(search_id))
            .all(&self.conn)
            .await
            .context("Failed to fetch leads")
    }
}

/// Map one raw provider dictionary onto the lead schema. Every target
/// attribute is independently optional; absent or falsy source fields become
/// NULL, applied uniformly across all columns.
fn lead_from_raw(history_id: &str, raw: &Map<String, Value>) -> leads::ActiveModel {
    let text = |key: &str| Set(value_to_text(raw.get(key)));

    leads::ActiveModel {
        id: Set(Uuid::new_v4().to_string()),
        search_history_id: Set(history_id.to_string()),
        first_name: text("first_name"),
        last_name: text("last_name"),
        full_name: text("full_name"),
        email: text("email"),
        personal_email: text("personal_email"),
        job_title: text("job_title"),
        headline: text("headline"),
        seniority_level: text("seniority_level"),
        functional_level: text("functional_level"),
        linkedin: text("linkedin"),
        city: text("city"),
        state: text("state"),
        country: text("country"),
        company_name: text("company_name"),
        company_website: text("company_website"),
        company_domain: text("company_domain"),
        company_linkedin: text("company_linkedin"),
        company_linkedin_uid: text("company_linkedin_uid"),
        industry: text("industry"),
        company_size: text("company_size"),
        company_founded_year: text("company_founded_year"),
        company_phone: text("company_phone"),
        company_street_address: text("company_street_address"),
        company_full_address: text("company_full_address"),
        company_city: text("company_city"),
        company_state: text("company_state"),
        company_country: text("company_country"),
        company_postal_code: text("company_postal_code"),
        company_description: text("company_description"),
        company_annual_revenue: text("company_annual_revenue"),
        company_annual_revenue_clean: text("company_annual_revenue_clean"),
        company_total_funding: text("company_total_funding"),
        company_total_funding_clean: text("company_total_funding_clean"),
        company_technologies: text("company_technologies"),
        keywords: text("keywords"),
    }
}

/// Normalize a provider value to optional text: blank strings and nulls map
/// to None, numbers are coerced to their text form, and list-valued fields
/// (keywords, technologies) are joined.
fn value_to_text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        Value::Array(items) => {
            let joined = items
                .iter()
                .filter_map(Value::as_str)
                .collect::<Vec<_>>()
                .join(", ");
            (!joined.is_empty()).then_some(joined)
        }
        _ => None,
    }
}

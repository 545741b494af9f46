use anyhow::{Context, Result};
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, QueryOrder, Set};

use crate::entities::plans;

/// Mutable plan fields accepted from the admin API.
#[derive(Debug, Clone)]
pub struct PlanInput {
    pub name: String,
    pub monthly_price: f64,
    pub yearly_price: f64,
    pub stripe_monthly_price_id: Option<String>,
    pub stripe_yearly_price_id: Option<String>,
    pub features: Vec<String>,
    pub is_popular: bool,
    pub display_order: i32,
    pub search_limit: i32,
    pub rows_limit: i32,
}

pub struct PlanRepository {
    conn: DatabaseConnection,
}

impl PlanRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn list_ordered(&self) -> Result<Vec<plans::Model>> {
        plans::Entity::find()
            .order_by_asc(plans::Column::DisplayOrder)
            .all(&self.conn)
            .await
            .context("Failed to list plans")
    }

    pub async fn get(&self, id: i32) -> Result<Option<plans::Model>> {
        plans::Entity::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query plan")
    }

    pub async fn create(&self, input: PlanInput) -> Result<plans::Model> {
        let now = chrono::Utc::now().to_rfc3339();
        let features = serde_json::to_string(&input.features)
            .context("Failed to serialize plan features")?;

        let model = plans::ActiveModel {
            name: Set(input.name),
            monthly_price: Set(input.monthly_price),
            yearly_price: Set(input.yearly_price),
            stripe_monthly_price_id: Set(input.stripe_monthly_price_id),
            stripe_yearly_price_id: Set(input.stripe_yearly_price_id),
            features: Set(features),
            is_popular: Set(input.is_popular),
            display_order: Set(input.display_order),
            search_limit: Set(input.search_limit),
            rows_limit: Set(input.rows_limit),
            created_at: Set(now.clone()),
            updated_at: Set(now),
            ..Default::default()
        };

        model.insert(&self.conn).await.context("Failed to insert plan")
    }

    pub async fn update(&self, id: i32, input: PlanInput) -> Result<Option<plans::Model>> {
        let Some(existing) = plans::Entity::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query plan for update")?
        else {
            return Ok(None);
        };

        let features = serde_json::to_string(&input.features)
            .context("Failed to serialize plan features")?;

        let mut active: plans::ActiveModel = existing.into();
        active.name = Set(input.name);
        active.monthly_price = Set(input.monthly_price);
        active.yearly_price = Set(input.yearly_price);
        active.stripe_monthly_price_id = Set(input.stripe_monthly_price_id);
        active.stripe_yearly_price_id = Set(input.stripe_yearly_price_id);
        active.features = Set(features);
        active.is_popular = Set(input.is_popular);
        active.display_order = Set(input.display_order);
        active.search_limit = Set(input.search_limit);
        active.rows_limit = Set(input.rows_limit);
        active.updated_at = Set(chrono::Utc::now().to_rfc3339());

        let updated = active.update(&self.conn).await?;
        Ok(Some(updated))
    }

    /// Users on the plan fall back to the free tier via the SetNull relation.
    pub async fn delete(&self, id: i32) -> Result<bool> {
        let result = plans::Entity::delete_by_id(id)
            .exec(&self.conn)
            .await
            .context("Failed to delete plan")?;

        Ok(result.rows_affected > 0)
    }
}

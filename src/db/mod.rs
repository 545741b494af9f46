use anyhow::Result;
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, Statement};
use serde_json::{Map, Value};
use std::path::Path;
use std::time::Duration;
use tracing::info;

use crate::config::SecurityConfig;
use crate::entities::{leads, plans, search_history};

pub mod migrator;
pub mod repositories;

pub use repositories::plan::PlanInput;
pub use repositories::user::User;

#[derive(Clone)]
pub struct Store {
    pub conn: DatabaseConnection,
}

impl Store {
    pub async fn new(db_url: &str) -> Result<Self> {
        Self::with_pool_options(db_url, 5, 1).await
    }

    pub async fn with_pool_options(
        db_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self> {
        use sea_orm_migration::MigratorTrait;

        if !db_url.contains(":memory:") {
            let path_str = db_url.trim_start_matches("sqlite:");
            if let Some(parent) = Path::new(path_str).parent() {
                tokio::fs::create_dir_all(parent).await.ok();
            }
            if !Path::new(path_str).exists() {
                std::fs::File::create(path_str)?;
            }
        }

        let mut opt = ConnectOptions::new(db_url.to_string());
        opt.max_connections(max_connections)
            .min_connections(min_connections)
            .connect_timeout(Duration::from_secs(10))
            .acquire_timeout(Duration::from_secs(10))
            .idle_timeout(Duration::from_secs(300))
            .max_lifetime(Duration::from_secs(600))
            .sqlx_logging(false);

        let conn = Database::connect(opt).await?;

        migrator::Migrator::up(&conn, None).await?;

        info!(
            "Database connected & migrations applied (pool: {}-{})",
            min_connections, max_connections
        );

        Ok(Self { conn })
    }

    pub async fn ping(&self) -> Result<()> {
        let backend = self.conn.get_database_backend();
        self.conn
            .query_one(Statement::from_string(backend, "SELECT 1".to_string()))
            .await?;
        Ok(())
    }

    fn user_repo(&self) -> repositories::user::UserRepository {
        repositories::user::UserRepository::new(self.conn.clone())
    }

    fn plan_repo(&self) -> repositories::plan::PlanRepository {
        repositories::plan::PlanRepository::new(self.conn.clone())
    }

    fn search_repo(&self) -> repositories::search::SearchRepository {
        repositories::search::SearchRepository::new(self.conn.clone())
    }

    // ========== Users ==========

    pub async fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        self.user_repo().get_by_email(email).await
    }

    pub async fn get_user(&self, id: i32) -> Result<Option<User>> {
        self.user_repo().get_by_id(id).await
    }

    pub async fn get_user_with_plan(
        &self,
        id: i32,
    ) -> Result<Option<(User, Option<plans::Model>)>> {
        self.user_repo().get_with_plan(id).await
    }

    pub async fn create_user(
        &self,
        email: &str,
        password: &str,
        config: &SecurityConfig,
    ) -> Result<User> {
        self.user_repo().create(email, password, config).await
    }

    pub async fn verify_user_password(&self, email: &str, password: &str) -> Result<bool> {
        self.user_repo().verify_password(email, password).await
    }

    pub async fn verify_api_key(&self, api_key: &str) -> Result<Option<User>> {
        self.user_repo().verify_api_key(api_key).await
    }

    pub async fn list_users(&self) -> Result<Vec<User>> {
        self.user_repo().list_all().await
    }

    pub async fn count_users(&self) -> Result<u64> {
        self.user_repo().count().await
    }

    pub async fn set_user_plan(&self, user_id: i32, plan_id: Option<i32>) -> Result<Option<User>> {
        self.user_repo().set_plan(user_id, plan_id).await
    }

    pub async fn update_user_email(&self, user_id: i32, email: &str) -> Result<Option<User>> {
        self.user_repo().update_email(user_id, email).await
    }

    // ========== Plans ==========

    pub async fn list_plans(&self) -> Result<Vec<plans::Model>> {
        self.plan_repo().list_ordered().await
    }

    pub async fn get_plan(&self, id: i32) -> Result<Option<plans::Model>> {
        self.plan_repo().get(id).await
    }

    pub async fn create_plan(&self, input: PlanInput) -> Result<plans::Model> {
        self.plan_repo().create(input).await
    }

    pub async fn update_plan(&self, id: i32, input: PlanInput) -> Result<Option<plans::Model>> {
        self.plan_repo().update(id, input).await
    }

    pub async fn delete_plan(&self, id: i32) -> Result<bool> {
        self.plan_repo().delete(id).await
    }

    // ========== Search history & leads ==========

    pub async fn count_searches_since(&self, user_id: i32, since: &str) -> Result<u64> {
        self.search_repo().count_since(user_id, since).await
    }

    pub async fn count_searches(&self) -> Result<u64> {
        self.search_repo().count_all().await
    }

    pub async fn count_leads(&self) -> Result<u64> {
        self.search_repo().count_all_leads().await
    }

    pub async fn record_search(
        &self,
        user_id: i32,
        parameters: &Map<String, Value>,
        raw_leads: &[Map<String, Value>],
    ) -> Result<search_history::Model> {
        self.search_repo().record(user_id, parameters, raw_leads).await
    }

    pub async fn list_searches(&self, user_id: i32) -> Result<Vec<search_history::Model>> {
        self.search_repo().list_for_user(user_id).await
    }

    pub async fn get_search(
        &self,
        search_id: &str,
        user_id: i32,
    ) -> Result<Option<search_history::Model>> {
        self.search_repo().get_owned(search_id, user_id).await
    }

    pub async fn delete_search(&self, search_id: &str, user_id: i32) -> Result<bool> {
        self.search_repo().delete_owned(search_id, user_id).await
    }

    pub async fn leads_for_search(&self, search_id: &str) -> Result<Vec<leads::Model>> {
        self.search_repo().leads_for_search(search_id).await
    }
}

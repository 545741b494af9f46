use std::sync::Arc;

use anyhow::Result;
use tokio::sync::RwLock;

use crate::clients::provider::{LeadsFinderClient, LeadsProvider};
use crate::config::Config;
use crate::db::Store;

/// State shared across the API and background services. The provider sits
/// behind a trait object so tests can substitute a canned implementation.
pub struct SharedState {
    pub config: Arc<RwLock<Config>>,
    pub store: Store,
    pub provider: Arc<dyn LeadsProvider>,
}

impl SharedState {
    pub async fn new(config: Config) -> Result<Self> {
        let provider: Arc<dyn LeadsProvider> = Arc::new(LeadsFinderClient::new(&config.provider)?);
        Self::with_provider(config, provider).await
    }

    pub async fn with_provider(config: Config, provider: Arc<dyn LeadsProvider>) -> Result<Self> {
        let store = Store::with_pool_options(
            &config.general.database_path,
            config.general.max_db_connections,
            config.general.min_db_connections,
        )
        .await?;

        Ok(Self {
            config: Arc::new(RwLock::new(config)),
            store,
            provider,
        })
    }
}

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use crate::overlays::{
    ConfigStore, NewOverlayConfig, OverlayConfig, OverlayConfigUpdate, OverlayDatabase,
    StoreError,
};

/// Keeps configs for the lifetime of the process only.
#[derive(Debug, Default)]
pub struct MemoryConfigStore {
    database: RwLock<OverlayDatabase>,
}

impl MemoryConfigStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ConfigStore for MemoryConfigStore {
    async fn get(&self, id: u64) -> Result<OverlayConfig, StoreError> {
        self.database
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or(StoreError::ConfigNotFound(id))
    }

    async fn create(&self, fields: NewOverlayConfig) -> Result<OverlayConfig, StoreError> {
        let config = self.database.write().await.insert(fields)?;
        debug!("Created overlay config {} in memory", config.id);
        Ok(config)
    }

    async fn update(
        &self,
        id: u64,
        fields: OverlayConfigUpdate,
    ) -> Result<OverlayConfig, StoreError> {
        self.database.write().await.update(id, fields)
    }

    async fn list_all(&self) -> Result<Vec<OverlayConfig>, StoreError> {
        Ok(self.database.read().await.list())
    }

    fn name(&self) -> &str {
        "Memory Config Store"
    }
}

// Overlays module - persisted logo configurations and their assets
pub mod assets;
mod error;
pub mod handlers;
pub mod stores;
mod types;

// Re-export public items
pub use assets::DirectoryAssetStore;
pub use error::StoreError;
pub use stores::{file::FileConfigStore, memory::MemoryConfigStore};
pub use types::*;

use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

use crate::StoreBackendConfig;
use crate::crop::{Overlay, OverlayError};

/// Where overlay configs live. The crop pipeline only ever reads from it.
#[async_trait]
pub trait ConfigStore: Send + Sync {
    async fn get(&self, id: u64) -> Result<OverlayConfig, StoreError>;
    async fn create(&self, fields: NewOverlayConfig) -> Result<OverlayConfig, StoreError>;
    async fn update(
        &self,
        id: u64,
        fields: OverlayConfigUpdate,
    ) -> Result<OverlayConfig, StoreError>;
    async fn list_all(&self) -> Result<Vec<OverlayConfig>, StoreError>;
    fn name(&self) -> &str;
}

/// Resolves logo references to bytes.
#[async_trait]
pub trait AssetStore: Send + Sync {
    async fn read(&self, reference: &str) -> Result<Vec<u8>, std::io::Error>;
    async fn store(&self, bytes: &[u8], extension: &str) -> Result<String, StoreError>;
}

pub type DynConfigStore = Arc<dyn ConfigStore>;
pub type DynAssetStore = Arc<dyn AssetStore>;

pub async fn create_store(config: &StoreBackendConfig) -> Result<DynConfigStore, StoreError> {
    match config {
        StoreBackendConfig::File { path } => {
            Ok(Arc::new(FileConfigStore::open(path.clone()).await?))
        }
        StoreBackendConfig::Memory => Ok(Arc::new(MemoryConfigStore::new())),
    }
}

/// Look up the overlay for a generate request.
///
/// `Ok(None)` means the config exists but has no logo.
pub async fn load_overlay(
    configs: &dyn ConfigStore,
    assets: &dyn AssetStore,
    raw_id: &str,
) -> Result<Option<Overlay>, OverlayError> {
    let id = raw_id
        .trim()
        .parse::<u64>()
        .map_err(|_| OverlayError::InvalidConfigId(raw_id.to_string()))?;

    let config = configs.get(id).await.map_err(|e| match e {
        StoreError::ConfigNotFound(id) => OverlayError::ConfigNotFound(id),
        other => OverlayError::ConfigLookup(other.to_string()),
    })?;

    let Some(reference) = config.logo_image else {
        debug!("Overlay config {} has no logo, skipping overlay", id);
        return Ok(None);
    };

    let logo = assets
        .read(&reference)
        .await
        .map_err(|source| OverlayError::AssetUnavailable { reference, source })?;

    Ok(Some(Overlay {
        scale_down: config.scale_down,
        position: config.logo_position,
        logo,
    }))
}

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::overlays::{
    ConfigStore, NewOverlayConfig, OverlayConfig, OverlayConfigUpdate, OverlayDatabase,
    StoreError,
};

/// Configs persisted to a TOML file, rewritten after every change.
#[derive(Debug)]
pub struct FileConfigStore {
    database: RwLock<OverlayDatabase>,
    file_path: PathBuf,
}

impl FileConfigStore {
    /// Open the store at `path`, starting empty if the file doesn't exist yet.
    pub async fn open(path: PathBuf) -> Result<Self, StoreError> {
        let database = if fs::try_exists(&path).await? {
            load_from_file(&path).await?
        } else {
            info!("Overlay config file {:?} not found, starting empty", path);
            OverlayDatabase::new()
        };

        Ok(Self {
            database: RwLock::new(database),
            file_path: path,
        })
    }
}

pub async fn load_from_file(path: &Path) -> Result<OverlayDatabase, StoreError> {
    let contents = fs::read_to_string(path).await?;
    let database: OverlayDatabase = toml_edit::de::from_str(&contents)?;
    debug!(
        "Loaded {} overlay configs from {:?}",
        database.configs.len(),
        path
    );
    Ok(database)
}

async fn save_to_file(database: &OverlayDatabase, path: &Path) -> Result<(), StoreError> {
    let document = toml_edit::ser::to_document(database)?;

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).await?;
    }
    fs::write(path, document.to_string()).await?;
    Ok(())
}

#[async_trait]
impl ConfigStore for FileConfigStore {
    async fn get(&self, id: u64) -> Result<OverlayConfig, StoreError> {
        self.database
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or(StoreError::ConfigNotFound(id))
    }

    async fn create(&self, fields: NewOverlayConfig) -> Result<OverlayConfig, StoreError> {
        // Hold the write lock across the save so the file never lags behind memory.
        let mut database = self.database.write().await;
        let mut updated = database.clone();
        let config = updated.insert(fields)?;
        save_to_file(&updated, &self.file_path).await?;
        *database = updated;

        debug!("Persisted new overlay config {} to {:?}", config.id, self.file_path);
        Ok(config)
    }

    async fn update(
        &self,
        id: u64,
        fields: OverlayConfigUpdate,
    ) -> Result<OverlayConfig, StoreError> {
        let mut database = self.database.write().await;
        let mut updated = database.clone();
        let config = updated.update(id, fields)?;
        save_to_file(&updated, &self.file_path).await?;
        *database = updated;

        debug!("Persisted overlay config {} to {:?}", config.id, self.file_path);
        Ok(config)
    }

    async fn list_all(&self) -> Result<Vec<OverlayConfig>, StoreError> {
        Ok(self.database.read().await.list())
    }

    fn name(&self) -> &str {
        "File Config Store"
    }
}

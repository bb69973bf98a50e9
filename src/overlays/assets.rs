use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};
use uuid::Uuid;

use super::{AssetStore, StoreError};

/// Logo files kept side by side in one directory, named by random uuid.
#[derive(Debug, Clone)]
pub struct DirectoryAssetStore {
    root: PathBuf,
}

impl DirectoryAssetStore {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, reference: &str) -> Result<PathBuf, StoreError> {
        if is_plain_file_name(reference) {
            Ok(self.root.join(reference))
        } else {
            Err(StoreError::InvalidAssetReference(reference.to_string()))
        }
    }
}

/// References are bare file names; anything that could escape the root is refused.
fn is_plain_file_name(reference: &str) -> bool {
    !reference.is_empty()
        && reference != "."
        && reference != ".."
        && !reference.contains(['/', '\\', '\0'])
}

#[async_trait]
impl AssetStore for DirectoryAssetStore {
    async fn read(&self, reference: &str) -> Result<Vec<u8>, std::io::Error> {
        let path = self
            .resolve(reference)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))?;
        debug!("Reading logo asset {:?}", path);
        fs::read(&path).await
    }

    async fn store(&self, bytes: &[u8], extension: &str) -> Result<String, StoreError> {
        fs::create_dir_all(&self.root).await?;

        let reference = format!("{}.{}", Uuid::new_v4(), extension);
        let path = self.resolve(&reference)?;
        fs::write(&path, bytes).await?;

        info!("Stored {} byte logo as {:?}", bytes.len(), path);
        Ok(reference)
    }
}

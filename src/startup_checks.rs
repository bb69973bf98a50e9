use crate::{Config, StoreBackendConfig};
use crate::overlays::stores::file::load_from_file;
use std::path::Path;
use thiserror::Error;
use tracing::{error, info, warn};

#[derive(Debug, Error)]
pub enum StartupCheckError {
    #[error("Failed to create logo directory: {0}")]
    LogoDirectoryCreationFailed(#[source] std::io::Error),

    #[error("Failed to create overlay store directory: {0}")]
    StoreDirectoryCreationFailed(#[source] std::io::Error),

    #[error("Overlay config file is unreadable: {0}")]
    ConfigStoreUnreadable(String),

    #[error("Logo directory is not writable: {0}")]
    LogoDirectoryNotWritable(String),
}

impl StartupCheckError {
    /// Critical failures leave the server unable to create or read configs.
    pub fn is_critical(&self) -> bool {
        !matches!(self, StartupCheckError::LogoDirectoryNotWritable(_))
    }
}

pub async fn perform_startup_checks(config: &Config) -> Result<(), Vec<StartupCheckError>> {
    let mut errors = Vec::new();

    info!("Performing startup checks...");

    let logo_dir = &config.storage.logo_directory;
    if !logo_dir.exists() {
        info!("Logo directory does not exist, creating: {:?}", logo_dir);
        if let Err(e) = tokio::fs::create_dir_all(logo_dir).await {
            error!("Failed to create logo directory {:?}: {}", logo_dir, e);
            errors.push(StartupCheckError::LogoDirectoryCreationFailed(e));
        } else {
            info!("Logo directory created successfully");
        }
    } else {
        info!("Logo directory exists: {:?}", logo_dir);
        match tokio::fs::metadata(logo_dir).await {
            Ok(metadata) if metadata.permissions().readonly() => {
                warn!("Logo directory is read-only: {:?}", logo_dir);
                errors.push(StartupCheckError::LogoDirectoryNotWritable(
                    logo_dir.display().to_string(),
                ));
            }
            Ok(_) => {}
            Err(e) => {
                warn!("Could not inspect logo directory {:?}: {}", logo_dir, e);
                errors.push(StartupCheckError::LogoDirectoryNotWritable(e.to_string()));
            }
        }
    }

    match &config.storage.backend {
        StoreBackendConfig::File { path } => check_config_file(path, &mut errors).await,
        StoreBackendConfig::Memory => {
            warn!("Using in-memory overlay store; configs are lost on restart");
        }
    }

    if errors.is_empty() {
        info!("All startup checks passed");
        Ok(())
    } else {
        error!("Startup checks failed with {} errors", errors.len());
        Err(errors)
    }
}

async fn check_config_file(path: &Path, errors: &mut Vec<StartupCheckError>) {
    if path.exists() {
        match load_from_file(path).await {
            Ok(database) => info!(
                "Overlay config file {:?} holds {} configs",
                path,
                database.configs.len()
            ),
            Err(e) => {
                error!("Overlay config file {:?} could not be loaded: {}", path, e);
                errors.push(StartupCheckError::ConfigStoreUnreadable(e.to_string()));
            }
        }
        return;
    }

    info!("Overlay config file {:?} will be created on first write", path);
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
        && !parent.exists()
    {
        info!("Creating overlay store directory: {:?}", parent);
        if let Err(e) = tokio::fs::create_dir_all(parent).await {
            error!("Failed to create overlay store directory {:?}: {}", parent, e);
            errors.push(StartupCheckError::StoreDirectoryCreationFailed(e));
        }
    }
}

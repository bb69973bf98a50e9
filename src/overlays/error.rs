use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Configuration not found: {0}")]
    ConfigNotFound(u64),

    #[error("scaleDown must be greater than 0 and cannot exceed 0.25 (got {0})")]
    ScaleOutOfRange(f64),

    #[error("Invalid asset reference: {0}")]
    InvalidAssetReference(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml_edit::de::Error),

    #[error("TOML serialization error: {0}")]
    TomlSerError(#[from] toml_edit::ser::Error),
}

impl StoreError {
    pub fn kind(&self) -> &'static str {
        match self {
            StoreError::ConfigNotFound(_) => "config_not_found",
            StoreError::ScaleOutOfRange(_) => "scale_out_of_range",
            StoreError::InvalidAssetReference(_) => "invalid_asset_reference",
            StoreError::IoError(_) | StoreError::TomlError(_) | StoreError::TomlSerError(_) => {
                "storage_error"
            }
        }
    }
}

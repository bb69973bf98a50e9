use serde::{Deserialize, Serialize};

use super::error::StoreError;
use crate::crop::LogoPosition;

/// Largest fraction of the cropped image a logo may cover on each axis.
pub const MAX_SCALE_DOWN: f64 = 0.25;
pub const DEFAULT_SCALE_DOWN: f64 = 0.05;
pub const DEFAULT_LOGO_POSITION: LogoPosition = LogoPosition::BottomRight;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverlayConfig {
    pub id: u64,
    pub scale_down: f64,
    pub logo_position: LogoPosition,
    /// File name of the logo inside the asset store. `None` means no overlay.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo_image: Option<String>,
}

impl OverlayConfig {
    /// Merge a partial update into this config. Omitted fields keep their value.
    /// Nothing is changed if the resulting scale is out of range.
    pub fn apply(&mut self, update: OverlayConfigUpdate) -> Result<(), StoreError> {
        let scale_down = update.scale_down.unwrap_or(self.scale_down);
        check_scale(scale_down)?;

        self.scale_down = scale_down;
        if let Some(position) = update.logo_position {
            self.logo_position = position;
        }
        if let Some(logo_image) = update.logo_image {
            self.logo_image = Some(logo_image);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewOverlayConfig {
    pub scale_down: f64,
    pub logo_position: LogoPosition,
    pub logo_image: Option<String>,
}

impl Default for NewOverlayConfig {
    fn default() -> Self {
        Self {
            scale_down: DEFAULT_SCALE_DOWN,
            logo_position: DEFAULT_LOGO_POSITION,
            logo_image: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct OverlayConfigUpdate {
    pub scale_down: Option<f64>,
    pub logo_position: Option<LogoPosition>,
    pub logo_image: Option<String>,
}

/// Reject scales outside `(0, MAX_SCALE_DOWN]`, NaN included.
pub fn check_scale(scale_down: f64) -> Result<(), StoreError> {
    if scale_down > 0.0 && scale_down <= MAX_SCALE_DOWN {
        Ok(())
    } else {
        Err(StoreError::ScaleOutOfRange(scale_down))
    }
}

/// All configs plus the id counter, as persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayDatabase {
    pub next_id: u64,
    pub configs: Vec<OverlayConfig>,
}

impl Default for OverlayDatabase {
    fn default() -> Self {
        Self {
            next_id: 1,
            configs: Vec::new(),
        }
    }
}

impl OverlayDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: u64) -> Option<&OverlayConfig> {
        self.configs.iter().find(|c| c.id == id)
    }

    pub fn insert(&mut self, fields: NewOverlayConfig) -> Result<OverlayConfig, StoreError> {
        check_scale(fields.scale_down)?;

        // Never hand out an id below one already present, even if the file was hand-edited.
        let id = self
            .configs
            .iter()
            .map(|c| c.id + 1)
            .max()
            .unwrap_or(1)
            .max(self.next_id);

        let config = OverlayConfig {
            id,
            scale_down: fields.scale_down,
            logo_position: fields.logo_position,
            logo_image: fields.logo_image,
        };
        self.configs.push(config.clone());
        self.next_id = id + 1;
        Ok(config)
    }

    pub fn update(
        &mut self,
        id: u64,
        fields: OverlayConfigUpdate,
    ) -> Result<OverlayConfig, StoreError> {
        let config = self
            .configs
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or(StoreError::ConfigNotFound(id))?;

        config.apply(fields)?;
        Ok(config.clone())
    }

    pub fn list(&self) -> Vec<OverlayConfig> {
        let mut configs = self.configs.clone();
        configs.sort_by_key(|c| c.id);
        configs
    }
}

use axum::{
    body::Bytes,
    extract::{Multipart, State},
    response::Json,
};
use base64::{Engine, engine::general_purpose};
use serde::Serialize;
use std::collections::HashMap;
use tracing::{debug, info, warn};

use crate::AppState;
use crate::crop;
use crate::error::ApiError;
use crate::overlays::load_overlay;

#[derive(Debug, Serialize)]
pub struct ImageResponse {
    /// Base64 (standard alphabet) PNG.
    pub image: String,
}

impl ImageResponse {
    pub fn from_png(png: &[u8]) -> Self {
        Self {
            image: general_purpose::STANDARD.encode(png),
        }
    }
}

/// Multipart fields collected by name. Later duplicates win.
#[derive(Debug, Default)]
pub struct FormFields {
    fields: HashMap<String, Bytes>,
}

impl FormFields {
    pub async fn collect(mut multipart: Multipart) -> Result<Self, ApiError> {
        let mut fields = HashMap::new();

        while let Some(field) = multipart.next_field().await? {
            let name = field.name().unwrap_or("").to_string();
            let data = field.bytes().await?;
            debug!("Received form field '{}' ({} bytes)", name, data.len());
            fields.insert(name, data);
        }

        Ok(Self { fields })
    }

    /// Raw bytes of a field, treating an empty upload as absent.
    pub fn bytes(&self, name: &str) -> Option<Bytes> {
        self.fields.get(name).filter(|b| !b.is_empty()).cloned()
    }

    /// Trimmed text of a field, treating blank values as absent.
    pub fn text(&self, name: &str) -> Option<String> {
        let value = self.fields.get(name)?;
        let text = String::from_utf8_lossy(value).trim().to_string();
        (!text.is_empty()).then_some(text)
    }

    fn image_and_crops(&self) -> Result<(Bytes, String), ApiError> {
        match (self.bytes("image"), self.text("crops")) {
            (Some(image), Some(crops)) => Ok((image, crops)),
            _ => Err(ApiError::MissingField("image and crops required")),
        }
    }
}

pub async fn preview_handler(multipart: Multipart) -> Result<Json<ImageResponse>, ApiError> {
    let form = FormFields::collect(multipart).await?;
    let (image, crops) = form.image_and_crops()?;
    info!(
        "Preview requested: {} byte image, crops {}",
        image.len(),
        crops
    );

    let png = tokio::task::spawn_blocking(move || crop::preview(&image, &crops)).await??;
    Ok(Json(ImageResponse::from_png(&png)))
}

pub async fn generate_handler(
    State(app_state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<ImageResponse>, ApiError> {
    let form = FormFields::collect(multipart).await?;
    let (image, crops) = form.image_and_crops()?;
    let config_id = form.text("config_id");
    info!(
        "Generate requested: {} byte image, crops {}, config {:?}",
        image.len(),
        crops,
        config_id
    );

    let overlay = match &config_id {
        Some(raw_id) => {
            match load_overlay(
                app_state.config_store.as_ref(),
                app_state.asset_store.as_ref(),
                raw_id,
            )
            .await
            {
                Ok(overlay) => overlay,
                Err(e) => {
                    warn!("Ignoring overlay config {:?}: {}", raw_id, e);
                    None
                }
            }
        }
        None => None,
    };

    let png = tokio::task::spawn_blocking(move || crop::generate(&image, &crops, overlay.as_ref()))
        .await??;
    Ok(Json(ImageResponse::from_png(&png)))
}

pub async fn health_handler() -> &'static str {
    "ok"
}

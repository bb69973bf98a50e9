use axum::{
    body::Bytes,
    extract::{Multipart, Path, State},
    http::{StatusCode, header},
    response::{IntoResponse, Json},
};
use serde::Serialize;
use tracing::{info, warn};

use super::{
    AssetStore, DEFAULT_SCALE_DOWN, NewOverlayConfig, OverlayConfig, OverlayConfigUpdate,
};
use crate::AppState;
use crate::api::FormFields;
use crate::crop::{CropError, LogoPosition, codec};
use crate::error::ApiError;

/// Config as returned to clients; the logo is exposed as a URL.
#[derive(Debug, Serialize)]
pub struct OverlayConfigResponse {
    pub id: u64,
    pub scale_down: f64,
    pub logo_position: LogoPosition,
    pub logo_image: Option<String>,
}

impl From<OverlayConfig> for OverlayConfigResponse {
    fn from(config: OverlayConfig) -> Self {
        let logo_image = config
            .logo_image
            .as_ref()
            .map(|_| format!("/api/config/{}/logo", config.id));
        Self {
            id: config.id,
            scale_down: config.scale_down,
            logo_position: config.logo_position,
            logo_image,
        }
    }
}

/// Fields shared by create and update forms.
struct ConfigForm {
    scale_down: Option<f64>,
    logo_position: Option<LogoPosition>,
    logo_image: Option<Bytes>,
}

impl ConfigForm {
    fn from_fields(form: &FormFields) -> Self {
        let scale_down = form.text("scaleDown").and_then(|raw| match raw.parse::<f64>() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring non-numeric scaleDown {:?}", raw);
                None
            }
        });

        Self {
            scale_down,
            logo_position: form.text("logoPosition").map(|p| LogoPosition::parse(&p)),
            logo_image: form.bytes("logoImage"),
        }
    }
}

/// Check the upload decodes as an image and store it, returning its reference.
async fn store_logo(assets: &dyn AssetStore, bytes: &[u8]) -> Result<String, ApiError> {
    let format = image::guess_format(bytes).map_err(CropError::UnreadableImage)?;
    let extension = format.extensions_str().first().copied().unwrap_or("img");
    Ok(assets.store(bytes, extension).await?)
}

pub async fn create_config_handler(
    State(app_state): State<AppState>,
    multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let form = ConfigForm::from_fields(&FormFields::collect(multipart).await?);

    let mut fields = NewOverlayConfig {
        scale_down: form.scale_down.unwrap_or(DEFAULT_SCALE_DOWN),
        ..Default::default()
    };
    if let Some(position) = form.logo_position {
        fields.logo_position = position;
    }
    // Reject the scale before anything is written to the asset store.
    super::check_scale(fields.scale_down)?;
    if let Some(bytes) = &form.logo_image {
        fields.logo_image = Some(store_logo(app_state.asset_store.as_ref(), bytes).await?);
    }

    let config = app_state.config_store.create(fields).await?;
    info!("Created overlay config {}", config.id);
    Ok((StatusCode::CREATED, Json(OverlayConfigResponse::from(config))))
}

pub async fn list_configs_handler(
    State(app_state): State<AppState>,
) -> Result<Json<Vec<OverlayConfigResponse>>, ApiError> {
    let configs = app_state.config_store.list_all().await?;
    Ok(Json(configs.into_iter().map(Into::into).collect()))
}

pub async fn get_config_handler(
    State(app_state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<Json<OverlayConfigResponse>, ApiError> {
    let config = app_state.config_store.get(id).await?;
    Ok(Json(config.into()))
}

pub async fn update_config_handler(
    State(app_state): State<AppState>,
    Path(id): Path<u64>,
    multipart: Multipart,
) -> Result<Json<OverlayConfigResponse>, ApiError> {
    let form = ConfigForm::from_fields(&FormFields::collect(multipart).await?);

    // Fail fast on unknown ids and bad scales before storing a new logo.
    let existing = app_state.config_store.get(id).await?;
    super::check_scale(form.scale_down.unwrap_or(existing.scale_down))?;

    let logo_image = match &form.logo_image {
        Some(bytes) => Some(store_logo(app_state.asset_store.as_ref(), bytes).await?),
        None => None,
    };

    let update = OverlayConfigUpdate {
        scale_down: form.scale_down,
        logo_position: form.logo_position,
        logo_image,
    };
    let config = app_state.config_store.update(id, update).await?;
    info!("Updated overlay config {}", config.id);
    Ok(Json(config.into()))
}

pub async fn logo_handler(
    State(app_state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<impl IntoResponse, ApiError> {
    let config = app_state.config_store.get(id).await?;
    let reference = config.logo_image.ok_or(ApiError::LogoNotFound(id))?;

    let bytes = app_state
        .asset_store
        .read(&reference)
        .await
        .map_err(|e| {
            warn!("Logo asset {} for config {} unreadable: {}", reference, id, e);
            ApiError::LogoNotFound(id)
        })?;

    let content_type = codec::sniff_content_type(&bytes).unwrap_or("application/octet-stream");
    Ok(([(header::CONTENT_TYPE, content_type)], bytes))
}

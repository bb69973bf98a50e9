use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub mod api;
pub mod crop;
pub mod error;
pub mod overlays;
pub mod startup_checks;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub server: ServerConfig,
    pub app: AppConfig,
    pub storage: StorageConfig,
    #[serde(default)]
    pub upload: UploadConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    pub name: String,
    pub log_level: String,
    /// Answer CORS preflights from any origin (the browser client is served separately).
    #[serde(default = "default_true")]
    pub permissive_cors: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    pub logo_directory: PathBuf,
    #[serde(flatten)]
    pub backend: StoreBackendConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum StoreBackendConfig {
    File { path: PathBuf },
    Memory,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UploadConfig {
    pub max_upload_bytes: usize,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_upload_bytes: 25 * 1024 * 1024,
        }
    }
}

fn default_true() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 8000,
            },
            app: AppConfig {
                name: "Cropmark".to_string(),
                log_level: "info".to_string(),
                permissive_cors: true,
            },
            storage: StorageConfig {
                logo_directory: PathBuf::from("data/logos"),
                backend: StoreBackendConfig::File {
                    path: PathBuf::from("data/overlays.toml"),
                },
            },
            upload: UploadConfig::default(),
        }
    }
}

use axum::{Router, extract::DefaultBodyLimit};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

#[derive(Clone)]
pub struct AppState {
    pub config_store: overlays::DynConfigStore,
    pub asset_store: overlays::DynAssetStore,
    pub config: Config,
}

impl AppState {
    pub async fn from_config(config: Config) -> Result<Self, overlays::StoreError> {
        let config_store = overlays::create_store(&config.storage.backend).await?;
        tracing::info!("Using {}", config_store.name());

        let asset_store = Arc::new(overlays::DirectoryAssetStore::new(
            config.storage.logo_directory.clone(),
        ));

        Ok(Self {
            config_store,
            asset_store,
            config,
        })
    }
}

pub async fn create_app(config: Config) -> Result<Router, overlays::StoreError> {
    let app_state = AppState::from_config(config).await?;
    Ok(create_router(app_state))
}

pub fn create_router(app_state: AppState) -> Router {
    let max_upload_bytes = app_state.config.upload.max_upload_bytes;
    let permissive_cors = app_state.config.app.permissive_cors;

    let router = Router::new()
        .route(
            "/api/image/preview",
            axum::routing::post(api::preview_handler),
        )
        .route(
            "/api/image/generate",
            axum::routing::post(api::generate_handler),
        )
        .route(
            "/api/config",
            axum::routing::post(overlays::handlers::create_config_handler)
                .get(overlays::handlers::list_configs_handler),
        )
        .route(
            "/api/config/",
            axum::routing::get(overlays::handlers::list_configs_handler),
        )
        .route(
            "/api/config/{id}",
            axum::routing::get(overlays::handlers::get_config_handler)
                .put(overlays::handlers::update_config_handler),
        )
        .route(
            "/api/config/{id}/logo",
            axum::routing::get(overlays::handlers::logo_handler),
        )
        .route("/health", axum::routing::get(api::health_handler))
        .layer(
            ServiceBuilder::new()
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(|request: &axum::http::Request<_>| {
                            let method = request.method();
                            let uri = request.uri();
                            let matched_path = request
                                .extensions()
                                .get::<axum::extract::MatchedPath>()
                                .map(|matched_path| matched_path.as_str());

                            tracing::info_span!(
                                "http_request",
                                method = %method,
                                uri = %uri,
                                matched_path,
                            )
                        })
                        .on_request(|request: &axum::http::Request<_>, _span: &tracing::Span| {
                            let content_length = request
                                .headers()
                                .get("content-length")
                                .and_then(|h| h.to_str().ok())
                                .unwrap_or("-");

                            tracing::info!(
                                target: "access_log",
                                method = %request.method(),
                                path = %request.uri().path(),
                                content_length = %content_length,
                                "request"
                            );
                        })
                        .on_response(
                            |response: &axum::http::Response<_>,
                             latency: std::time::Duration,
                             _span: &tracing::Span| {
                                tracing::info!(
                                    target: "access_log",
                                    status = %response.status(),
                                    latency_ms = %latency.as_millis(),
                                    "response"
                                );
                            },
                        ),
                )
                .layer(DefaultBodyLimit::max(max_upload_bytes)),
        )
        .with_state(app_state);

    if permissive_cors {
        router.layer(CorsLayer::permissive())
    } else {
        router
    }
}

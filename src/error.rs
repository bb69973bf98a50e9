use axum::{
    Json,
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;
use tracing::{error, warn};

use crate::crop::CropError;
use crate::overlays::StoreError;

/// Everything a request can fail with, as seen by the client.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Crop(#[from] CropError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("{0}")]
    MissingField(&'static str),

    #[error("Invalid form data: {0}")]
    Multipart(#[from] MultipartError),

    #[error("Configuration {0} has no logo")]
    LogoNotFound(u64),

    #[error("Internal error: {0}")]
    Internal(String),
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub kind: &'static str,
}

impl ApiError {
    pub fn kind(&self) -> &'static str {
        match self {
            ApiError::Crop(e) => e.kind(),
            ApiError::Store(e) => e.kind(),
            ApiError::MissingField(_) => "missing_field",
            ApiError::Multipart(_) => "invalid_form",
            ApiError::LogoNotFound(_) => "logo_not_found",
            ApiError::Internal(_) => "internal_error",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Crop(e) if e.is_client_error() => StatusCode::BAD_REQUEST,
            ApiError::Crop(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Store(StoreError::ConfigNotFound(_)) => StatusCode::NOT_FOUND,
            ApiError::Store(StoreError::ScaleOutOfRange(_)) => StatusCode::BAD_REQUEST,
            ApiError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::MissingField(_) => StatusCode::BAD_REQUEST,
            ApiError::Multipart(e) => e.status(),
            ApiError::LogoNotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<tokio::task::JoinError> for ApiError {
    fn from(e: tokio::task::JoinError) -> Self {
        ApiError::Internal(format!("image task failed: {}", e))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("Request failed: {}", self);
        } else {
            warn!(kind = self.kind(), "Request rejected: {}", self);
        }

        // Internal details stay in the log.
        let message = match &self {
            ApiError::Store(_) if status.is_server_error() => "Storage error".to_string(),
            ApiError::Internal(_) => "Internal server error".to_string(),
            other => other.to_string(),
        };

        let body = ErrorResponse {
            error: message,
            kind: self.kind(),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crop::RawCoordinates;

    #[test]
    fn test_status_and_kind_mapping() {
        let cases: Vec<(ApiError, StatusCode, &str)> = vec![
            (
                CropError::MalformedCoordinates("bad".into()).into(),
                StatusCode::BAD_REQUEST,
                "malformed_coordinates",
            ),
            (
                CropError::OutOfBounds {
                    image_width: 10,
                    image_height: 10,
                    rect: RawCoordinates::new(0, 0, 11, 10),
                }
                .into(),
                StatusCode::BAD_REQUEST,
                "out_of_bounds",
            ),
            (
                CropError::DegenerateRegion.into(),
                StatusCode::BAD_REQUEST,
                "degenerate_region",
            ),
            (
                CropError::PreviewTooSmall {
                    width: 5,
                    height: 5,
                }
                .into(),
                StatusCode::BAD_REQUEST,
                "preview_too_small",
            ),
            (
                StoreError::ConfigNotFound(3).into(),
                StatusCode::NOT_FOUND,
                "config_not_found",
            ),
            (
                StoreError::ScaleOutOfRange(0.3).into(),
                StatusCode::BAD_REQUEST,
                "scale_out_of_range",
            ),
            (
                ApiError::MissingField("image and crops required"),
                StatusCode::BAD_REQUEST,
                "missing_field",
            ),
            (
                ApiError::Internal("boom".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
            ),
        ];

        for (error, status, kind) in cases {
            assert_eq!(error.status(), status, "{}", error);
            assert_eq!(error.kind(), kind, "{}", error);
        }
    }

    #[test]
    fn test_out_of_bounds_message_mentions_image_size() {
        let error: ApiError = CropError::OutOfBounds {
            image_width: 640,
            image_height: 480,
            rect: RawCoordinates::new(0, 0, 700, 480),
        }
        .into();
        assert!(error.to_string().contains("Image size: 640x480"));
    }
}

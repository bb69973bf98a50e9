use super::geometry::RawCoordinates;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CropError {
    #[error("Invalid crops: {0}")]
    MalformedCoordinates(String),

    #[error("Crop coordinates out of bounds. Image size: {image_width}x{image_height}, crop: {rect}")]
    OutOfBounds {
        image_width: u32,
        image_height: u32,
        rect: RawCoordinates,
    },

    #[error("Invalid crop area")]
    DegenerateRegion,

    #[error("Invalid image: {0}")]
    UnreadableImage(#[source] image::ImageError),

    #[error("Crop is too small to preview: {width}x{height} scales to zero pixels")]
    PreviewTooSmall { width: u32, height: u32 },

    #[error("Encoding failed: {0}")]
    Encode(#[source] image::ImageError),
}

impl CropError {
    /// Machine-stable identifier surfaced to API clients.
    pub fn kind(&self) -> &'static str {
        match self {
            CropError::MalformedCoordinates(_) => "malformed_coordinates",
            CropError::OutOfBounds { .. } => "out_of_bounds",
            CropError::DegenerateRegion => "degenerate_region",
            CropError::UnreadableImage(_) => "unreadable_image",
            CropError::PreviewTooSmall { .. } => "preview_too_small",
            CropError::Encode(_) => "encode_failed",
        }
    }

    /// Whether the error was caused by the request rather than the server.
    pub fn is_client_error(&self) -> bool {
        !matches!(self, CropError::Encode(_))
    }
}

// Crop module - geometry validation, previews and logo compositing
pub mod codec;
pub mod compositor;
mod error;
pub mod geometry;
pub mod pipeline;
pub mod preview;

// Re-export public items
pub use compositor::{LogoPosition, Overlay, OverlayError, composite};
pub use error::CropError;
pub use geometry::{RawCoordinates, Rectangle, parse_coordinates, validate};
pub use pipeline::{generate, preview};

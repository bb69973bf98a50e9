use tracing::{debug, info};

use super::codec::{decode_image, encode_png};
use super::compositor::{Overlay, composite};
use super::error::CropError;
use super::geometry::{parse_coordinates, validate};
use super::preview::reduce;

/// Crop `image_bytes` to `crop_spec` and return a 5% PNG preview.
pub fn preview(image_bytes: &[u8], crop_spec: &str) -> Result<Vec<u8>, CropError> {
    let coords = parse_coordinates(crop_spec)?;
    let image = decode_image(image_bytes)?;
    let rect = validate(image.width(), image.height(), coords)?;
    debug!(
        "Preview crop validated: {} on {}x{} image",
        coords,
        image.width(),
        image.height()
    );

    let preview = reduce(&image, rect)?;
    encode_png(&preview)
}

/// Crop `image_bytes` to `crop_spec`, apply the logo overlay if one is given,
/// and return the result as PNG.
///
/// Only crop validation and decoding can fail; overlay problems fall back
/// to the plain crop.
pub fn generate(
    image_bytes: &[u8],
    crop_spec: &str,
    overlay: Option<&Overlay>,
) -> Result<Vec<u8>, CropError> {
    let coords = parse_coordinates(crop_spec)?;
    let image = decode_image(image_bytes)?;
    let rect = validate(image.width(), image.height(), coords)?;

    let cropped = rect.crop(&image);
    info!(
        "Generating {}x{} crop{}",
        cropped.width(),
        cropped.height(),
        if overlay.is_some() { " with logo" } else { "" }
    );

    let output = composite(cropped, overlay);
    encode_png(&output)
}

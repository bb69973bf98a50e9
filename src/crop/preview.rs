use image::{DynamicImage, imageops::FilterType};
use tracing::debug;

use super::error::CropError;
use super::geometry::Rectangle;

/// Fraction of the cropped size used for previews. Independent of any overlay config.
pub const PREVIEW_FACTOR: f64 = 0.05;

/// Bicubic resampling keeps previews deterministic for a given input.
pub const PREVIEW_FILTER: FilterType = FilterType::CatmullRom;

/// Dimensions a crop of `width`x`height` is reduced to.
pub fn preview_dimensions(width: u32, height: u32) -> Result<(u32, u32), CropError> {
    let preview_width = (f64::from(width) * PREVIEW_FACTOR).floor() as u32;
    let preview_height = (f64::from(height) * PREVIEW_FACTOR).floor() as u32;

    if preview_width == 0 || preview_height == 0 {
        return Err(CropError::PreviewTooSmall { width, height });
    }

    Ok((preview_width, preview_height))
}

/// Crop `image` to `rect` and shrink the result to a preview.
pub fn reduce(image: &DynamicImage, rect: Rectangle) -> Result<DynamicImage, CropError> {
    let (width, height) = preview_dimensions(rect.width(), rect.height())?;
    let cropped = rect.crop(image);
    debug!(
        "Reducing {}x{} crop to {}x{} preview",
        cropped.width(),
        cropped.height(),
        width,
        height
    );
    Ok(cropped.resize_exact(width, height, PREVIEW_FILTER))
}

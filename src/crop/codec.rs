use image::{ColorType, DynamicImage, ImageFormat, codecs::png::PngEncoder};
use std::borrow::Cow;
use tracing::debug;

use super::error::CropError;

/// Decode uploaded bytes, sniffing the format from the content.
pub fn decode_image(bytes: &[u8]) -> Result<DynamicImage, CropError> {
    let format = image::guess_format(bytes).map_err(CropError::UnreadableImage)?;
    debug!("Decoding uploaded image, detected format: {:?}", format);
    image::load_from_memory_with_format(bytes, format).map_err(CropError::UnreadableImage)
}

/// Encode an image as PNG into memory.
///
/// Pixel formats PNG can't hold (32-bit float from EXR or HDR uploads) are
/// converted to 8-bit RGBA first.
pub fn encode_png(image: &DynamicImage) -> Result<Vec<u8>, CropError> {
    let image = match image.color() {
        ColorType::L8
        | ColorType::La8
        | ColorType::Rgb8
        | ColorType::Rgba8
        | ColorType::L16
        | ColorType::La16
        | ColorType::Rgb16
        | ColorType::Rgba16 => Cow::Borrowed(image),
        other => {
            debug!("Converting {:?} pixels to RGBA8 for PNG output", other);
            Cow::Owned(DynamicImage::ImageRgba8(image.to_rgba8()))
        }
    };

    let mut output = Vec::new();
    let encoder = PngEncoder::new(&mut output);
    image
        .write_with_encoder(encoder)
        .map_err(CropError::Encode)?;
    Ok(output)
}

/// Content type for stored logo bytes, if they look like an image we understand.
pub fn sniff_content_type(bytes: &[u8]) -> Option<&'static str> {
    match image::guess_format(bytes).ok()? {
        ImageFormat::Png => Some("image/png"),
        ImageFormat::Jpeg => Some("image/jpeg"),
        ImageFormat::Gif => Some("image/gif"),
        ImageFormat::WebP => Some("image/webp"),
        ImageFormat::Bmp => Some("image/bmp"),
        ImageFormat::Tiff => Some("image/tiff"),
        _ => None,
    }
}

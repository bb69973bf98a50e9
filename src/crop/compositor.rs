use image::{DynamicImage, Rgba, RgbaImage, imageops::FilterType};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use tracing::{debug, warn};

/// Resampling used when shrinking a logo to its target size.
pub const LOGO_FILTER: FilterType = FilterType::Lanczos3;

/// Where the logo is anchored on the cropped image.
///
/// Parsing never fails: any string that isn't one of the four corners
/// lands on `Center`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LogoPosition {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
    #[default]
    #[serde(other)]
    Center,
}

impl LogoPosition {
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "top-left" => LogoPosition::TopLeft,
            "top-right" => LogoPosition::TopRight,
            "bottom-left" => LogoPosition::BottomLeft,
            "bottom-right" => LogoPosition::BottomRight,
            _ => LogoPosition::Center,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LogoPosition::TopLeft => "top-left",
            LogoPosition::TopRight => "top-right",
            LogoPosition::BottomLeft => "bottom-left",
            LogoPosition::BottomRight => "bottom-right",
            LogoPosition::Center => "center",
        }
    }

    /// Top-left pixel of a `logo_width`x`logo_height` logo on a
    /// `width`x`height` base.
    pub fn anchor(&self, width: u32, height: u32, logo_width: u32, logo_height: u32) -> (u32, u32) {
        let right = width.saturating_sub(logo_width);
        let bottom = height.saturating_sub(logo_height);

        match self {
            LogoPosition::TopLeft => (0, 0),
            LogoPosition::TopRight => (right, 0),
            LogoPosition::BottomLeft => (0, bottom),
            LogoPosition::BottomRight => (right, bottom),
            LogoPosition::Center => (right / 2, bottom / 2),
        }
    }
}

impl fmt::Display for LogoPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A logo ready to be applied: sizing policy plus the encoded logo bytes.
#[derive(Debug, Clone)]
pub struct Overlay {
    pub scale_down: f64,
    pub position: LogoPosition,
    pub logo: Vec<u8>,
}

/// Reasons an overlay was skipped. These never reach the client.
#[derive(Debug, Error)]
pub enum OverlayError {
    #[error("Config id {0:?} is not a number")]
    InvalidConfigId(String),

    #[error("Overlay config {0} not found")]
    ConfigNotFound(u64),

    #[error("Overlay config lookup failed: {0}")]
    ConfigLookup(String),

    #[error("Logo asset {reference} unavailable: {source}")]
    AssetUnavailable {
        reference: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Logo could not be decoded: {0}")]
    LogoDecode(#[from] image::ImageError),

    #[error("Logo would be {width}x{height} pixels")]
    DegenerateLogo { width: u32, height: u32 },
}

/// Target logo size for a base of `width`x`height`.
pub fn logo_dimensions(width: u32, height: u32, scale_down: f64) -> (u32, u32) {
    let logo_width = (f64::from(width) * scale_down).floor().max(0.0) as u32;
    let logo_height = (f64::from(height) * scale_down).floor().max(0.0) as u32;
    (logo_width, logo_height)
}

/// Apply `overlay` to `base`, falling back to `base` untouched on any failure.
pub fn composite(base: DynamicImage, overlay: Option<&Overlay>) -> DynamicImage {
    let Some(overlay) = overlay else {
        return base;
    };

    match apply_overlay(&base, overlay) {
        Ok(composited) => composited,
        Err(e) => {
            warn!("Logo overlay skipped, returning crop only: {}", e);
            base
        }
    }
}

/// Scale, position and blend the logo onto `base`.
pub fn apply_overlay(base: &DynamicImage, overlay: &Overlay) -> Result<DynamicImage, OverlayError> {
    let logo = image::load_from_memory(&overlay.logo)?;

    let (width, height) = (base.width(), base.height());
    let (logo_width, logo_height) = logo_dimensions(width, height, overlay.scale_down);
    if logo_width == 0 || logo_height == 0 {
        return Err(OverlayError::DegenerateLogo {
            width: logo_width,
            height: logo_height,
        });
    }

    let logo = logo
        .resize_exact(logo_width, logo_height, LOGO_FILTER)
        .to_rgba8();
    let (x, y) = overlay
        .position
        .anchor(width, height, logo_width, logo_height);

    debug!(
        "Placing {}x{} logo at ({}, {}) on {}x{} image ({})",
        logo_width, logo_height, x, y, width, height, overlay.position
    );

    let mut canvas = base.to_rgba8();
    blend(&mut canvas, &logo, x, y);
    Ok(DynamicImage::ImageRgba8(canvas))
}

/// Paste `logo` onto `canvas` at `(x, y)`, using the logo's alpha as the mask.
///
/// Every channel, alpha included, is interpolated between canvas and logo by
/// the logo alpha. Logo pixels falling outside the canvas are dropped.
pub fn blend(canvas: &mut RgbaImage, logo: &RgbaImage, x: u32, y: u32) {
    for (lx, ly, logo_pixel) in logo.enumerate_pixels() {
        let (cx, cy) = (x + lx, y + ly);
        if cx >= canvas.width() || cy >= canvas.height() {
            continue;
        }

        let mask = u32::from(logo_pixel[3]);
        if mask == 0 {
            continue;
        }

        let base_pixel = canvas.get_pixel_mut(cx, cy);
        *base_pixel = mix(*base_pixel, *logo_pixel, mask);
    }
}

fn mix(base: Rgba<u8>, logo: Rgba<u8>, mask: u32) -> Rgba<u8> {
    let channel = |b: u8, l: u8| -> u8 {
        let value = u32::from(l) * mask + u32::from(b) * (255 - mask);
        ((value + 127) / 255) as u8
    };

    Rgba([
        channel(base[0], logo[0]),
        channel(base[1], logo[1]),
        channel(base[2], logo[2]),
        channel(base[3], logo[3]),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crop::codec::encode_png;
    use image::{GenericImageView, Rgb, RgbImage};

    fn logo_bytes(width: u32, height: u32, color: Rgba<u8>) -> Vec<u8> {
        let logo = DynamicImage::ImageRgba8(RgbaImage::from_pixel(width, height, color));
        encode_png(&logo).unwrap()
    }

    fn grey_base(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([100, 100, 100])))
    }

    #[test]
    fn test_position_parse_falls_back_to_center() {
        assert_eq!(LogoPosition::parse("top-left"), LogoPosition::TopLeft);
        assert_eq!(LogoPosition::parse("Bottom-Right"), LogoPosition::BottomRight);
        assert_eq!(LogoPosition::parse("center"), LogoPosition::Center);
        assert_eq!(LogoPosition::parse("middle"), LogoPosition::Center);
        assert_eq!(LogoPosition::parse(""), LogoPosition::Center);
    }

    #[test]
    fn test_position_serde_uses_kebab_case_with_fallback() {
        assert_eq!(
            serde_json::to_string(&LogoPosition::BottomLeft).unwrap(),
            "\"bottom-left\""
        );
        let parsed: LogoPosition = serde_json::from_str("\"somewhere-else\"").unwrap();
        assert_eq!(parsed, LogoPosition::Center);
    }

    #[test]
    fn test_anchor_table() {
        let (w, h, lw, lh) = (400, 300, 40, 30);
        assert_eq!(LogoPosition::TopLeft.anchor(w, h, lw, lh), (0, 0));
        assert_eq!(LogoPosition::TopRight.anchor(w, h, lw, lh), (360, 0));
        assert_eq!(LogoPosition::BottomLeft.anchor(w, h, lw, lh), (0, 270));
        assert_eq!(LogoPosition::BottomRight.anchor(w, h, lw, lh), (360, 270));
        assert_eq!(LogoPosition::Center.anchor(w, h, lw, lh), (180, 135));
    }

    #[test]
    fn test_center_anchor_floors() {
        assert_eq!(LogoPosition::Center.anchor(101, 77, 10, 7), (45, 35));
        assert_eq!(LogoPosition::parse("nowhere").anchor(101, 77, 10, 7), (45, 35));
    }

    #[test]
    fn test_logo_dimensions_floor() {
        assert_eq!(logo_dimensions(400, 300, 0.1), (40, 30));
        assert_eq!(logo_dimensions(1000, 800, 0.25), (250, 200));
        assert_eq!(logo_dimensions(99, 19, 0.05), (4, 0));
    }

    #[test]
    fn test_bottom_right_overlay_lands_at_expected_anchor() {
        let overlay = Overlay {
            scale_down: 0.1,
            position: LogoPosition::BottomRight,
            logo: logo_bytes(200, 200, Rgba([255, 0, 0, 255])),
        };

        let result = apply_overlay(&grey_base(400, 300), &overlay).unwrap();
        assert_eq!(result.dimensions(), (400, 300));

        let rgba = result.to_rgba8();
        // Logo occupies x 360..400, y 270..300.
        assert_eq!(rgba.get_pixel(360, 270), &Rgba([255, 0, 0, 255]));
        assert_eq!(rgba.get_pixel(399, 299), &Rgba([255, 0, 0, 255]));
        assert_eq!(rgba.get_pixel(359, 270), &Rgba([100, 100, 100, 255]));
        assert_eq!(rgba.get_pixel(360, 269), &Rgba([100, 100, 100, 255]));
    }

    #[test]
    fn test_unknown_position_centers_logo() {
        let overlay = Overlay {
            scale_down: 0.1,
            position: LogoPosition::parse("upside-down"),
            logo: logo_bytes(50, 50, Rgba([0, 0, 255, 255])),
        };

        let rgba = apply_overlay(&grey_base(400, 300), &overlay)
            .unwrap()
            .to_rgba8();
        // ((400 - 40) / 2, (300 - 30) / 2) == (180, 135)
        assert_eq!(rgba.get_pixel(180, 135), &Rgba([0, 0, 255, 255]));
        assert_eq!(rgba.get_pixel(219, 164), &Rgba([0, 0, 255, 255]));
        assert_eq!(rgba.get_pixel(179, 135), &Rgba([100, 100, 100, 255]));
        assert_eq!(rgba.get_pixel(220, 164), &Rgba([100, 100, 100, 255]));
    }

    #[test]
    fn test_transparent_logo_leaves_base_untouched() {
        let overlay = Overlay {
            scale_down: 0.25,
            position: LogoPosition::TopLeft,
            logo: logo_bytes(10, 10, Rgba([255, 255, 255, 0])),
        };

        let base = grey_base(40, 40);
        let result = apply_overlay(&base, &overlay).unwrap();
        assert_eq!(result.to_rgb8(), base.to_rgb8());
    }

    #[test]
    fn test_blend_interpolates_by_logo_alpha() {
        let mut canvas = RgbaImage::from_pixel(2, 1, Rgba([0, 0, 0, 255]));
        let logo = RgbaImage::from_pixel(1, 1, Rgba([255, 200, 100, 128]));

        blend(&mut canvas, &logo, 1, 0);

        assert_eq!(canvas.get_pixel(0, 0), &Rgba([0, 0, 0, 255]));
        // 255*128/255 = 128, 200*128/255 = 100.4, 100*128/255 = 50.2,
        // alpha: 128*128/255 + 255*127/255 = 191.25
        assert_eq!(canvas.get_pixel(1, 0), &Rgba([128, 100, 50, 191]));
    }

    #[test]
    fn test_blend_clips_to_canvas() {
        let mut canvas = RgbaImage::from_pixel(4, 4, Rgba([0, 0, 0, 255]));
        let logo = RgbaImage::from_pixel(3, 3, Rgba([9, 9, 9, 255]));

        blend(&mut canvas, &logo, 2, 2);

        assert_eq!(canvas.get_pixel(3, 3), &Rgba([9, 9, 9, 255]));
        assert_eq!(canvas.get_pixel(1, 1), &Rgba([0, 0, 0, 255]));
    }

    #[test]
    fn test_absent_overlay_returns_input_unchanged() {
        let base = DynamicImage::ImageRgb8(RgbImage::from_fn(30, 20, |x, y| {
            Rgb([x as u8, y as u8, 3])
        }));

        let result = composite(base.clone(), None);
        assert_eq!(result, base);
        assert_eq!(encode_png(&result).unwrap(), encode_png(&base).unwrap());
    }

    #[test]
    fn test_unreadable_logo_falls_back_to_crop() {
        let base = grey_base(200, 100);
        let overlay = Overlay {
            scale_down: 0.1,
            position: LogoPosition::TopLeft,
            logo: b"not a png".to_vec(),
        };

        assert!(matches!(
            apply_overlay(&base, &overlay),
            Err(OverlayError::LogoDecode(_))
        ));
        assert_eq!(composite(base.clone(), Some(&overlay)), base);
    }

    #[test]
    fn test_degenerate_logo_falls_back_to_crop() {
        let base = grey_base(30, 30);
        let overlay = Overlay {
            scale_down: 0.01,
            position: LogoPosition::Center,
            logo: logo_bytes(10, 10, Rgba([1, 2, 3, 255])),
        };

        assert!(matches!(
            apply_overlay(&base, &overlay),
            Err(OverlayError::DegenerateLogo {
                width: 0,
                height: 0
            })
        ));
        assert_eq!(composite(base.clone(), Some(&overlay)), base);
    }
}

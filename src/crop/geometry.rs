use super::error::CropError;
use image::DynamicImage;
use serde_json::Value;
use std::fmt;

/// Crop corners exactly as the client sent them, before any bounds checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawCoordinates {
    pub x1: i64,
    pub y1: i64,
    pub x2: i64,
    pub y2: i64,
}

impl RawCoordinates {
    pub fn new(x1: i64, y1: i64, x2: i64, y2: i64) -> Self {
        Self { x1, y1, x2, y2 }
    }
}

impl fmt::Display for RawCoordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {}, {})", self.x1, self.y1, self.x2, self.y2)
    }
}

/// A validated crop region.
///
/// `x2` and `y2` are exclusive: the region covers columns `x1..x2` and rows
/// `y1..y2`, so `width() == x2 - x1`. Always satisfies
/// `0 <= x1 < x2 <= image_width` and `0 <= y1 < y2 <= image_height` for the
/// image it was validated against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rectangle {
    pub x1: u32,
    pub y1: u32,
    pub x2: u32,
    pub y2: u32,
}

impl Rectangle {
    pub fn width(&self) -> u32 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> u32 {
        self.y2 - self.y1
    }

    pub fn to_raw(self) -> RawCoordinates {
        RawCoordinates::new(
            self.x1.into(),
            self.y1.into(),
            self.x2.into(),
            self.y2.into(),
        )
    }

    /// Extract this region from `image` into a new buffer.
    pub fn crop(&self, image: &DynamicImage) -> DynamicImage {
        image.crop_imm(self.x1, self.y1, self.width(), self.height())
    }
}

/// Decode a crop spec into four integers.
///
/// Accepts a JSON array (`[10, 20, 110, 220]`), a parenthesised tuple
/// (`(10, 20, 110, 220)`) or a bare comma-separated list. Integer-valued
/// strings are tolerated, fractional values are not.
pub fn parse_coordinates(spec: &str) -> Result<RawCoordinates, CropError> {
    let trimmed = spec.trim();

    let values: Vec<Value> = if trimmed.starts_with('[') {
        serde_json::from_str(trimmed)
            .map_err(|e| CropError::MalformedCoordinates(e.to_string()))?
    } else {
        let inner = trimmed
            .strip_prefix('(')
            .and_then(|s| s.strip_suffix(')'))
            .unwrap_or(trimmed);
        inner
            .split(',')
            .map(|part| Value::String(part.trim().to_string()))
            .collect()
    };

    if values.len() != 4 {
        return Err(CropError::MalformedCoordinates(format!(
            "expected 4 coordinates, got {}",
            values.len()
        )));
    }

    let mut coords = [0i64; 4];
    for (slot, value) in coords.iter_mut().zip(&values) {
        *slot = coordinate_from_value(value)?;
    }

    Ok(RawCoordinates::new(coords[0], coords[1], coords[2], coords[3]))
}

fn coordinate_from_value(value: &Value) -> Result<i64, CropError> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .ok_or_else(|| CropError::MalformedCoordinates(format!("{} is not an integer", n))),
        Value::String(s) => s
            .trim()
            .parse::<i64>()
            .map_err(|_| CropError::MalformedCoordinates(format!("{:?} is not an integer", s))),
        other => Err(CropError::MalformedCoordinates(format!(
            "{} is not an integer",
            other
        ))),
    }
}

/// Check `rect` against an image of the given size.
///
/// Bounds are checked before ordering, so a rectangle that is both out of
/// bounds and inverted reports `OutOfBounds`.
pub fn validate(
    image_width: u32,
    image_height: u32,
    rect: RawCoordinates,
) -> Result<Rectangle, CropError> {
    let RawCoordinates { x1, y1, x2, y2 } = rect;

    if x1 < 0 || y1 < 0 || x2 > i64::from(image_width) || y2 > i64::from(image_height) {
        return Err(CropError::OutOfBounds {
            image_width,
            image_height,
            rect,
        });
    }

    if x1 >= x2 || y1 >= y2 {
        return Err(CropError::DegenerateRegion);
    }

    // All four values now lie in 0..=image dimension.
    Ok(Rectangle {
        x1: x1 as u32,
        y1: y1 as u32,
        x2: x2 as u32,
        y2: y2 as u32,
    })
}

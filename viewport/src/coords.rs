//! Planar ↔ display-pixel rescaling.
//!
//! Planar north is up; pixel Y grows downward, so the Y axis is inverted.
//! Every conversion returns `None` instead of NaN/Infinity when the bounds
//! are degenerate (`east == west` or `north == south`) or the input is not
//! finite; callers treat that as "transform unavailable" and skip drawing.

#[cfg(test)]
#[path = "coords_test.rs"]
mod tests;

use serde::{Deserialize, Serialize};

use crate::types::Point;

/// Planar extent mapped onto a pixel raster of `width × height`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PixelBounds {
    pub west: f64,
    pub east: f64,
    pub north: f64,
    pub south: f64,
    pub width: f64,
    pub height: f64,
}

impl PixelBounds {
    #[must_use]
    pub fn new(west: f64, east: f64, north: f64, south: f64, width: f64, height: f64) -> Self {
        Self { west, east, north, south, width, height }
    }

    /// Whether conversions through these bounds can produce finite results.
    #[must_use]
    #[allow(clippy::float_cmp)]
    pub fn is_usable(&self) -> bool {
        let all_finite = [self.west, self.east, self.north, self.south, self.width, self.height]
            .iter()
            .all(|v| v.is_finite());
        all_finite && self.east != self.west && self.north != self.south
    }

    /// Planar coordinate as a `[0,1]`-style fraction of the extent (unclamped).
    fn unit(&self, planar: Point) -> Option<Point> {
        if !self.is_usable() || !planar.is_finite() {
            return None;
        }
        Some(Point::new(
            (planar.x - self.west) / (self.east - self.west),
            (self.north - planar.y) / (self.north - self.south),
        ))
    }
}

/// Convert a planar coordinate to pixel space, without clamping.
///
/// Used for highlight rectangles that may legitimately extend off-canvas.
#[must_use]
pub fn planar_to_pixel(planar: Point, bounds: &PixelBounds) -> Option<Point> {
    let unit = bounds.unit(planar)?;
    Some(Point::new(unit.x * bounds.width, unit.y * bounds.height))
}

/// Convert a planar coordinate to pixel space, clamping to the raster edge.
///
/// Used for GeoJSON overlays so partially out-of-bounds geometry does not
/// draw far off-canvas.
#[must_use]
pub fn planar_to_pixel_clamped(planar: Point, bounds: &PixelBounds) -> Option<Point> {
    let unit = bounds.unit(planar)?;
    Some(Point::new(
        unit.x.clamp(0.0, 1.0) * bounds.width,
        unit.y.clamp(0.0, 1.0) * bounds.height,
    ))
}

/// Exact inverse of [`planar_to_pixel`].
#[must_use]
#[allow(clippy::float_cmp)]
pub fn pixel_to_planar(pixel: Point, bounds: &PixelBounds) -> Option<Point> {
    if !bounds.is_usable() || !pixel.is_finite() || bounds.width == 0.0 || bounds.height == 0.0 {
        return None;
    }
    Some(Point::new(
        bounds.west + (pixel.x / bounds.width) * (bounds.east - bounds.west),
        bounds.north - (pixel.y / bounds.height) * (bounds.north - bounds.south),
    ))
}

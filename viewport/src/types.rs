//! Core value types: planar points, extents, and the shared viewport.
//!
//! DESIGN
//! ======
//! `Viewport` keeps `corners` private so they can only ever be derived from
//! `bbox`. Deserialization accepts either field (bbox wins when both are
//! present) so payloads from older clients that only ship corners still
//! decode.

#[cfg(test)]
#[path = "types_test.rs"]
mod tests;

use serde::{Deserialize, Serialize};

use crate::ViewportError;
use crate::consts::{MAX_ZOOM, MIN_ZOOM};

/// A point in planar (projected, meters) or pixel space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    #[must_use]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    #[must_use]
    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// Axis-aligned extent in planar coordinates. Serialized as `[minX, minY, maxX, maxY]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "[f64; 4]", into = "[f64; 4]")]
pub struct Bbox {
    min_x: f64,
    min_y: f64,
    max_x: f64,
    max_y: f64,
}

impl Bbox {
    /// Build an extent, rejecting non-finite values and inverted or empty axes.
    ///
    /// # Errors
    ///
    /// Returns [`ViewportError::InvalidBbox`] unless `min_x < max_x` and `min_y < max_y`.
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Result<Self, ViewportError> {
        let finite = [min_x, min_y, max_x, max_y].iter().all(|v| v.is_finite());
        if !finite || min_x >= max_x || min_y >= max_y {
            return Err(ViewportError::InvalidBbox { min_x, min_y, max_x, max_y });
        }
        Ok(Self { min_x, min_y, max_x, max_y })
    }

    /// Build an extent from its center and half-sizes.
    ///
    /// # Errors
    ///
    /// Returns [`ViewportError::InvalidBbox`] for non-positive or non-finite half-sizes.
    pub fn from_center(center: Point, half_width: f64, half_height: f64) -> Result<Self, ViewportError> {
        Self::new(
            center.x - half_width,
            center.y - half_height,
            center.x + half_width,
            center.y + half_height,
        )
    }

    /// Smallest extent covering all four corners.
    ///
    /// # Errors
    ///
    /// Returns [`ViewportError::InvalidBbox`] when the corners collapse to a line or point.
    pub fn from_corners(corners: &Corners) -> Result<Self, ViewportError> {
        let pts = [corners.sw, corners.se, corners.nw, corners.ne];
        let min_x = pts.iter().map(|p| p.x).fold(f64::INFINITY, f64::min);
        let min_y = pts.iter().map(|p| p.y).fold(f64::INFINITY, f64::min);
        let max_x = pts.iter().map(|p| p.x).fold(f64::NEG_INFINITY, f64::max);
        let max_y = pts.iter().map(|p| p.y).fold(f64::NEG_INFINITY, f64::max);
        Self::new(min_x, min_y, max_x, max_y)
    }

    #[must_use]
    pub fn min_x(&self) -> f64 {
        self.min_x
    }

    #[must_use]
    pub fn min_y(&self) -> f64 {
        self.min_y
    }

    #[must_use]
    pub fn max_x(&self) -> f64 {
        self.max_x
    }

    #[must_use]
    pub fn max_y(&self) -> f64 {
        self.max_y
    }

    #[must_use]
    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    #[must_use]
    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    #[must_use]
    pub fn center(&self) -> Point {
        Point::new((self.min_x + self.max_x) * 0.5, (self.min_y + self.max_y) * 0.5)
    }

    /// Shift the extent by `(dx, dy)`.
    ///
    /// # Errors
    ///
    /// Returns [`ViewportError::InvalidBbox`] if the shift is non-finite.
    pub fn translate(&self, dx: f64, dy: f64) -> Result<Self, ViewportError> {
        Self::new(self.min_x + dx, self.min_y + dy, self.max_x + dx, self.max_y + dy)
    }

    /// Scale both half-sizes by `factor`, keeping the center fixed.
    ///
    /// # Errors
    ///
    /// Returns [`ViewportError::InvalidBbox`] for a non-positive or non-finite factor.
    pub fn scale_about_center(&self, factor: f64) -> Result<Self, ViewportError> {
        Self::from_center(self.center(), self.width() * 0.5 * factor, self.height() * 0.5 * factor)
    }

    #[must_use]
    pub fn to_array(&self) -> [f64; 4] {
        [self.min_x, self.min_y, self.max_x, self.max_y]
    }
}

impl TryFrom<[f64; 4]> for Bbox {
    type Error = ViewportError;

    fn try_from(v: [f64; 4]) -> Result<Self, Self::Error> {
        Self::new(v[0], v[1], v[2], v[3])
    }
}

impl From<Bbox> for [f64; 4] {
    fn from(b: Bbox) -> Self {
        b.to_array()
    }
}

/// Explicit corner points of a viewport, kept for transport convenience.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Corners {
    pub sw: Point,
    pub se: Point,
    pub nw: Point,
    pub ne: Point,
}

impl From<&Bbox> for Corners {
    fn from(b: &Bbox) -> Self {
        Self {
            sw: Point::new(b.min_x, b.min_y),
            se: Point::new(b.max_x, b.min_y),
            nw: Point::new(b.min_x, b.max_y),
            ne: Point::new(b.max_x, b.max_y),
        }
    }
}

/// The shared notion of which area of the table is being viewed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ViewportRepr", rename_all = "camelCase")]
pub struct Viewport {
    bbox: Bbox,
    corners: Corners,
    zoom: u8,
    /// Client that produced this version, used for echo suppression.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_id: Option<String>,
    /// Producer wall-clock milliseconds, used for staleness comparison.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
}

impl Viewport {
    /// Build an unstamped viewport; zoom is clamped into [`MIN_ZOOM`, `MAX_ZOOM`].
    #[must_use]
    pub fn new(bbox: Bbox, zoom: u8) -> Self {
        Self {
            corners: Corners::from(&bbox),
            bbox,
            zoom: clamp_zoom(i64::from(zoom)),
            source_id: None,
            timestamp: None,
        }
    }

    #[must_use]
    pub fn bbox(&self) -> &Bbox {
        &self.bbox
    }

    #[must_use]
    pub fn corners(&self) -> &Corners {
        &self.corners
    }

    #[must_use]
    pub fn zoom(&self) -> u8 {
        self.zoom
    }

    #[must_use]
    pub fn center(&self) -> Point {
        self.bbox.center()
    }

    /// Same zoom and stamp, new extent; corners follow.
    #[must_use]
    pub fn with_bbox(&self, bbox: Bbox) -> Self {
        Self {
            bbox,
            corners: Corners::from(&bbox),
            zoom: self.zoom,
            source_id: self.source_id.clone(),
            timestamp: self.timestamp,
        }
    }

    /// Same extent, new zoom level (clamped).
    #[must_use]
    pub fn with_zoom(&self, zoom: u8) -> Self {
        let mut next = self.clone();
        next.zoom = clamp_zoom(i64::from(zoom));
        next
    }

    /// Stamp with a producer identity and time.
    #[must_use]
    pub fn stamped(mut self, source_id: &str, timestamp: i64) -> Self {
        self.source_id = Some(source_id.to_owned());
        self.timestamp = Some(timestamp);
        self
    }
}

/// Clamp an arbitrary integer zoom into the supported range.
#[must_use]
pub fn clamp_zoom(zoom: i64) -> u8 {
    let clamped = zoom.clamp(i64::from(MIN_ZOOM), i64::from(MAX_ZOOM));
    u8::try_from(clamped).unwrap_or(MIN_ZOOM)
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ViewportRepr {
    #[serde(default)]
    bbox: Option<[f64; 4]>,
    #[serde(default)]
    corners: Option<Corners>,
    zoom: f64,
    #[serde(default, alias = "source_id")]
    source_id: Option<String>,
    #[serde(default)]
    timestamp: Option<f64>,
}

impl TryFrom<ViewportRepr> for Viewport {
    type Error = String;

    #[allow(clippy::cast_possible_truncation)]
    fn try_from(raw: ViewportRepr) -> Result<Self, Self::Error> {
        let bbox = match (raw.bbox, raw.corners) {
            (Some(arr), _) => Bbox::try_from(arr).map_err(|e| e.to_string())?,
            (None, Some(corners)) => Bbox::from_corners(&corners).map_err(|e| e.to_string())?,
            (None, None) => return Err("viewport needs bbox or corners".to_owned()),
        };
        if !raw.zoom.is_finite() || raw.zoom.fract() != 0.0 {
            return Err(format!("zoom must be an integer, got {}", raw.zoom));
        }
        let timestamp = match raw.timestamp {
            Some(ts) if ts.is_finite() => Some(ts.round() as i64),
            Some(ts) => return Err(format!("timestamp must be finite, got {ts}")),
            None => None,
        };
        Ok(Self {
            corners: Corners::from(&bbox),
            bbox,
            zoom: clamp_zoom(raw.zoom as i64),
            source_id: raw.source_id,
            timestamp,
        })
    }
}

/// Continuous joystick-driven motion, in planar units per second.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Velocity {
    pub vx: f64,
    pub vy: f64,
}

impl Velocity {
    pub const ZERO: Self = Self { vx: 0.0, vy: 0.0 };

    #[must_use]
    pub fn new(vx: f64, vy: f64) -> Self {
        Self { vx, vy }
    }

    #[must_use]
    #[allow(clippy::float_cmp)]
    pub fn is_zero(self) -> bool {
        self.vx == 0.0 && self.vy == 0.0
    }
}

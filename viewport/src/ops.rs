//! Viewport operations: the one place a *new* viewport is computed from an
//! *old* one.
//!
//! Every function here is pure. Pan and zoom are all-or-nothing: if the new
//! center leaves the fence the whole operation is rejected with
//! [`Rejection::Bounds`]. Velocity integration instead degrades through a
//! sliding clamp (both axes, then X only, then Y only) so a boundary behaves
//! like a wall the view glides along.

#[cfg(test)]
#[path = "ops_test.rs"]
mod tests;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ViewportError;
use crate::consts::MAX_STEP_SECS;
use crate::geofence::{BoundsPolygon, is_viewport_admissible};
use crate::types::{Velocity, Viewport, clamp_zoom};

/// Why a candidate viewport was not accepted. Not an error: callers use it
/// to snap the UI back to the last good state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rejection {
    /// The candidate center lies outside the geofence.
    Bounds,
    /// Another client is actively driving the viewport.
    InteractionGuard,
}

impl Rejection {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Bounds => "bounds",
            Self::InteractionGuard => "interaction_guard",
        }
    }
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A compass pan direction, decomposed into unit axis contributions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Direction {
    /// +1 east, -1 west, 0 none.
    pub east: i8,
    /// +1 north, -1 south, 0 none.
    pub north: i8,
}

impl Direction {
    pub const NORTH: Self = Self { east: 0, north: 1 };
    pub const SOUTH: Self = Self { east: 0, north: -1 };
    pub const EAST: Self = Self { east: 1, north: 0 };
    pub const WEST: Self = Self { east: -1, north: 0 };

    /// Canonical compass word, e.g. `"northeast"`.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match (self.north, self.east) {
            (1, 0) => "north",
            (-1, 0) => "south",
            (0, 1) => "east",
            (0, -1) => "west",
            (1, 1) => "northeast",
            (1, -1) => "northwest",
            (-1, 1) => "southeast",
            (-1, -1) => "southwest",
            _ => "none",
        }
    }
}

impl FromStr for Direction {
    type Err = ViewportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let word = s.trim().to_ascii_lowercase();
        let has = |w: &str| word.contains(w);
        let north = i8::from(has("north")) - i8::from(has("south"));
        let east = i8::from(has("east")) - i8::from(has("west"));
        let recognised = ["north", "south", "east", "west"]
            .iter()
            .fold(word.clone(), |rest, w| rest.replace(w, ""));
        let conflicting = (has("north") && has("south")) || (has("east") && has("west"));
        if (north == 0 && east == 0) || conflicting || !recognised.trim_matches(['-', '_', ' ']).is_empty() {
            return Err(ViewportError::UnknownDirection(s.to_owned()));
        }
        Ok(Self { east, north })
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Direction {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Direction {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Shift the viewport by `delta` of its own width/height per axis component.
///
/// # Errors
///
/// [`Rejection::Bounds`] when the shifted center leaves the fence.
pub fn pan(viewport: &Viewport, direction: Direction, delta: f64, fence: &BoundsPolygon) -> Result<Viewport, Rejection> {
    let bbox = viewport.bbox();
    let dx = f64::from(direction.east) * bbox.width() * delta;
    let dy = f64::from(direction.north) * bbox.height() * delta;
    shift(viewport, dx, dy, fence)
}

/// Rescale around the same center to a new (clamped) zoom level.
///
/// Each zoom step halves or doubles the extent: half-sizes scale by
/// `2^-(new - old)`.
///
/// # Errors
///
/// [`Rejection::Bounds`] when the current center is already outside the fence.
pub fn zoom_to(viewport: &Viewport, level: i64, fence: &BoundsPolygon) -> Result<Viewport, Rejection> {
    let target = clamp_zoom(level);
    let steps = i32::from(target) - i32::from(viewport.zoom());
    let factor = 2f64.powi(-steps);
    let bbox = viewport.bbox().scale_about_center(factor).map_err(|_| Rejection::Bounds)?;
    let next = viewport.with_bbox(bbox).with_zoom(target);
    if !is_viewport_admissible(&next, fence) {
        return Err(Rejection::Bounds);
    }
    Ok(next)
}

/// Which axes a motion step actually moved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Both,
    /// Y was blocked; slid along a horizontal boundary.
    XOnly,
    /// X was blocked; slid along a vertical boundary.
    YOnly,
    /// Nothing admissible; velocity forced to zero.
    Blocked,
}

/// Result of one velocity integration step.
#[derive(Debug, Clone, PartialEq)]
pub struct MotionStep {
    /// Viewport after the step (unchanged when blocked).
    pub viewport: Viewport,
    /// Velocity to carry into the next step, with blocked axes zeroed.
    pub velocity: Velocity,
    pub axis: Axis,
}

/// Advance the viewport by `velocity · dt` with the sliding clamp.
///
/// `dt_secs` is capped at [`MAX_STEP_SECS`] so a stalled frame cannot jump
/// the view.
#[must_use]
pub fn integrate_velocity(viewport: &Viewport, velocity: Velocity, dt_secs: f64, fence: &BoundsPolygon) -> MotionStep {
    let dt = if dt_secs.is_finite() { dt_secs.clamp(0.0, MAX_STEP_SECS) } else { 0.0 };
    let dx = velocity.vx * dt;
    let dy = velocity.vy * dt;

    if let Ok(next) = shift(viewport, dx, dy, fence) {
        return MotionStep { viewport: next, velocity, axis: Axis::Both };
    }
    if dx != 0.0 {
        if let Ok(next) = shift(viewport, dx, 0.0, fence) {
            return MotionStep { viewport: next, velocity: Velocity::new(velocity.vx, 0.0), axis: Axis::XOnly };
        }
    }
    if dy != 0.0 {
        if let Ok(next) = shift(viewport, 0.0, dy, fence) {
            return MotionStep { viewport: next, velocity: Velocity::new(0.0, velocity.vy), axis: Axis::YOnly };
        }
    }
    MotionStep { viewport: viewport.clone(), velocity: Velocity::ZERO, axis: Axis::Blocked }
}

fn shift(viewport: &Viewport, dx: f64, dy: f64, fence: &BoundsPolygon) -> Result<Viewport, Rejection> {
    let bbox = viewport.bbox().translate(dx, dy).map_err(|_| Rejection::Bounds)?;
    let next = viewport.with_bbox(bbox);
    if !is_viewport_admissible(&next, fence) {
        return Err(Rejection::Bounds);
    }
    Ok(next)
}

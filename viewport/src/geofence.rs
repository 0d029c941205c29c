//! Geofence: the polygon a viewport's center must stay inside.
//!
//! Only the viewport *center* is tested, never its corners: the visible
//! rectangle may hang over the polygon edge. Points on an edge (within
//! [`EDGE_EPSILON`]) are inside. With fewer than three vertices the fence is
//! disabled and everything is admissible. Degenerate polygons (collinear or
//! self-intersecting) are evaluated as given, with no repair.

#[cfg(test)]
#[path = "geofence_test.rs"]
mod tests;

use serde::{Deserialize, Serialize};

use crate::ViewportError;
use crate::consts::EDGE_EPSILON;
use crate::types::{Point, Viewport};

/// Ordered vertex ring in planar coordinates. The closing edge is implicit.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BoundsPolygon {
    vertices: Vec<Point>,
}

impl BoundsPolygon {
    #[must_use]
    pub fn new(vertices: Vec<Point>) -> Self {
        Self { vertices }
    }

    #[must_use]
    pub fn vertices(&self) -> &[Point] {
        &self.vertices
    }

    /// Whether the fence constrains anything.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.vertices.len() >= 3
    }

    /// Check the polygon is saveable: three or more finite vertices.
    ///
    /// # Errors
    ///
    /// [`ViewportError::TooFewVertices`] or [`ViewportError::NonFiniteVertex`].
    pub fn validate(&self) -> Result<(), ViewportError> {
        if self.vertices.len() < 3 {
            return Err(ViewportError::TooFewVertices(self.vertices.len()));
        }
        if let Some(i) = self.vertices.iter().position(|p| !p.is_finite()) {
            return Err(ViewportError::NonFiniteVertex(i));
        }
        Ok(())
    }

    /// Whether any two non-adjacent edges cross.
    #[must_use]
    pub fn has_self_intersection(&self) -> bool {
        let n = self.vertices.len();
        if n < 4 {
            return false;
        }
        let edge = |i: usize| (self.vertices[i], self.vertices[(i + 1) % n]);
        for i in 0..n {
            for j in (i + 2)..n {
                // First and last edge share vertex 0.
                if i == 0 && j == n - 1 {
                    continue;
                }
                let (a1, a2) = edge(i);
                let (b1, b2) = edge(j);
                if segments_cross(a1, a2, b1, b2) {
                    return true;
                }
            }
        }
        false
    }
}

impl From<Vec<Point>> for BoundsPolygon {
    fn from(vertices: Vec<Point>) -> Self {
        Self::new(vertices)
    }
}

/// Ray-casting point-in-polygon with on-edge inclusion.
#[must_use]
pub fn is_inside_bounds(point: Point, polygon: &BoundsPolygon) -> bool {
    if !polygon.is_enabled() {
        return true;
    }
    if !point.is_finite() {
        return false;
    }
    let v = polygon.vertices();
    let n = v.len();

    if (0..n).any(|i| on_segment(point, v[i], v[(i + 1) % n])) {
        return true;
    }

    let mut inside = false;
    let mut j = n - 1;
    for i in 0..n {
        let (pi, pj) = (v[i], v[j]);
        if (pi.y > point.y) != (pj.y > point.y) {
            let x_cross = (pj.x - pi.x) * (point.y - pi.y) / (pj.y - pi.y) + pi.x;
            if point.x < x_cross {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}

/// Whether a viewport's center lies inside the fence.
#[must_use]
pub fn is_viewport_admissible(viewport: &Viewport, polygon: &BoundsPolygon) -> bool {
    is_inside_bounds(viewport.center(), polygon)
}

fn cross(o: Point, a: Point, b: Point) -> f64 {
    (a.x - o.x) * (b.y - o.y) - (a.y - o.y) * (b.x - o.x)
}

fn on_segment(p: Point, a: Point, b: Point) -> bool {
    let len = ((b.x - a.x).powi(2) + (b.y - a.y).powi(2)).sqrt();
    if len <= EDGE_EPSILON {
        return (p.x - a.x).abs() <= EDGE_EPSILON && (p.y - a.y).abs() <= EDGE_EPSILON;
    }
    // Perpendicular distance, then projection within the segment span.
    if (cross(a, b, p) / len).abs() > EDGE_EPSILON {
        return false;
    }
    let t = ((p.x - a.x) * (b.x - a.x) + (p.y - a.y) * (b.y - a.y)) / (len * len);
    let slack = EDGE_EPSILON / len;
    (-slack..=1.0 + slack).contains(&t)
}

fn segments_cross(a1: Point, a2: Point, b1: Point, b2: Point) -> bool {
    let d1 = cross(b1, b2, a1);
    let d2 = cross(b1, b2, a2);
    let d3 = cross(a1, a2, b1);
    let d4 = cross(a1, a2, b2);
    if ((d1 > 0.0 && d2 < 0.0) || (d1 < 0.0 && d2 > 0.0)) && ((d3 > 0.0 && d4 < 0.0) || (d3 < 0.0 && d4 > 0.0)) {
        return true;
    }
    on_segment(a1, b1, b2) || on_segment(a2, b1, b2) || on_segment(b1, a1, a2) || on_segment(b2, a1, a2)
}

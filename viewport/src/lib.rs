//! Viewport math for the shared projection table.
//!
//! Every client (the GIS map, the floor projection, the remote controller)
//! computes viewports the same way: this crate owns that math. It has no I/O
//! and no clock; callers pass in timestamps and elapsed time explicitly.
//!
//! ## Module layout
//!
//! | Module | Role |
//! |--------|------|
//! | [`types`] | `Point`, `Bbox`, `Corners`, `Viewport`, `Velocity` |
//! | [`coords`] | Planar ↔ display-pixel rescaling |
//! | [`projection`] | Planar (Israeli TM grid) ↔ WGS84 longitude/latitude |
//! | [`geometry`] | Typed GeoJSON-like geometry tree and copy-and-transform |
//! | [`geofence`] | Bounds polygon and center admissibility |
//! | [`ops`] | Pan, zoom, and velocity integration with sliding clamp |
//! | [`consts`] | Shared numeric constants (zoom limits, epsilons, caps) |

pub mod consts;
pub mod coords;
pub mod geofence;
pub mod geometry;
pub mod ops;
pub mod projection;
pub mod types;

pub use geofence::BoundsPolygon;
pub use ops::{Axis, Direction, MotionStep, Rejection};
pub use types::{Bbox, Corners, Point, Velocity, Viewport};

/// Error returned when viewport inputs are structurally invalid.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ViewportError {
    /// Extent is non-finite or has `min >= max` on an axis.
    #[error("invalid bbox [{min_x}, {min_y}, {max_x}, {max_y}]")]
    InvalidBbox { min_x: f64, min_y: f64, max_x: f64, max_y: f64 },
    /// A pan direction string did not name a compass direction.
    #[error("unknown pan direction: {0:?}")]
    UnknownDirection(String),
    /// A bounds polygon has fewer than three vertices.
    #[error("bounds polygon needs at least 3 vertices, got {0}")]
    TooFewVertices(usize),
    /// A bounds polygon vertex is NaN or infinite.
    #[error("bounds polygon vertex {0} is not finite")]
    NonFiniteVertex(usize),
}

//! Shared numeric constants for the viewport crate.

// ── Zoom ────────────────────────────────────────────────────────

/// Lowest display zoom level a viewport may carry.
pub const MIN_ZOOM: u8 = 10;

/// Highest display zoom level a viewport may carry.
pub const MAX_ZOOM: u8 = 19;

// ── Geofence ────────────────────────────────────────────────────

/// Distance (planar units) within which a point counts as lying on a polygon edge.
pub const EDGE_EPSILON: f64 = 1e-9;

// ── Motion ──────────────────────────────────────────────────────

/// Longest time step, in seconds, applied by a single velocity integration.
pub const MAX_STEP_SECS: f64 = 0.1;

// ── Geometry ────────────────────────────────────────────────────

/// Deepest geometry nesting accepted by the transform walk.
pub const MAX_GEOMETRY_DEPTH: usize = 10;

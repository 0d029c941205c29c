//! REST command bodies: server-computed pan/zoom and bounds save.

#[cfg(test)]
#[path = "command_test.rs"]
mod tests;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use viewport::{BoundsPolygon, Direction, Viewport};

use crate::CodecError;

/// A viewport command the server evaluates against `base_viewport`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ViewportCommand {
    Pan {
        direction: Direction,
        delta: f64,
        #[serde(rename = "sourceId")]
        source_id: String,
        timestamp: i64,
        base_viewport: Viewport,
    },
    Zoom {
        level: u8,
        #[serde(rename = "sourceId")]
        source_id: String,
        timestamp: i64,
        base_viewport: Viewport,
    },
}

impl ViewportCommand {
    #[must_use]
    pub fn action(&self) -> &'static str {
        match self {
            Self::Pan { .. } => "pan",
            Self::Zoom { .. } => "zoom",
        }
    }
}

/// Body of the bounds save request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoundsSave {
    pub bounds_polygon: BoundsPolygon,
}

/// Pull the resulting viewport out of a command or patch response.
///
/// Accepts `{"viewport": {...}}` or a bare viewport object.
///
/// # Errors
///
/// [`CodecError::Response`] when neither shape decodes.
pub fn decode_viewport_response(body: &Value) -> Result<Viewport, CodecError> {
    let target = match body.get("viewport") {
        Some(inner @ Value::Object(_)) => inner,
        _ => body,
    };
    Viewport::deserialize(target).map_err(|e| CodecError::Response(e.to_string()))
}

/// Pull the normalized polygon out of a bounds save response.
///
/// Accepts a bare vertex array or `{"bounds_polygon": [...]}`.
///
/// # Errors
///
/// [`CodecError::Response`] when neither shape decodes.
pub fn decode_bounds_response(body: &Value) -> Result<BoundsPolygon, CodecError> {
    let target = match body {
        Value::Array(_) => body,
        Value::Object(obj) => obj
            .get("bounds_polygon")
            .or_else(|| obj.get("boundsPolygon"))
            .ok_or_else(|| CodecError::Response("missing bounds_polygon".to_owned()))?,
        _ => return Err(CodecError::Response("expected array or object".to_owned())),
    };
    BoundsPolygon::deserialize(target).map_err(|e| CodecError::Response(e.to_string()))
}

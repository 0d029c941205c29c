//! Wire model for the projection-table sync protocol.
//!
//! This crate owns every shape that crosses a process boundary: WebSocket
//! text frames (JSON objects discriminated by `type`) and the REST request
//! and response bodies. Inbound JSON is decoded and validated exactly once,
//! here; business logic only ever sees the typed [`Message`] and DTOs.
//!
//! | Module | Role |
//! |--------|------|
//! | [`message`] | `Message` enum, `MessageKind`, text codec |
//! | [`state`] | Full-state snapshot, partial patch, layer/animation maps |
//! | [`command`] | Server-side pan/zoom commands and bounds save bodies |

pub mod command;
mod de;
pub mod message;
pub mod state;

pub use command::{BoundsSave, ViewportCommand, decode_bounds_response, decode_viewport_response};
pub use message::{
    AnimationsChanged, BoundsChanged, LayerToggle, LayersChanged, Message, MessageKind, VelocityPayload,
    decode_message, encode_message,
};
pub use state::{AnimationState, LayerEntry, LayerGroup, LayerState, StatePatch, StateSnapshot, flatten_layer_groups};

/// Error returned when a frame or body does not match the protocol.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// The text is not JSON at all.
    #[error("invalid json: {0}")]
    Json(#[from] serde_json::Error),
    /// The JSON value is not an object.
    #[error("message is not a json object")]
    NotAnObject,
    /// The object has no string `type` field.
    #[error("message has no type")]
    MissingType,
    /// The `type` field names no known message.
    #[error("unknown message type: {0}")]
    UnknownType(String),
    /// A known message type carried a malformed payload.
    #[error("malformed {kind} payload: {source}")]
    Payload {
        kind: MessageKind,
        #[source]
        source: serde_json::Error,
    },
    /// A REST response body had an unexpected shape.
    #[error("unexpected response body: {0}")]
    Response(String),
}

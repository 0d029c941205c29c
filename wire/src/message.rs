//! WebSocket text frames.
//!
//! Every frame is a JSON object with a `type` discriminator. Decoding is
//! two-phase: first the `type` is checked against [`MessageKind`], then the
//! payload for that kind is validated. Either failure is a [`CodecError`];
//! callers log and drop, they never see a half-parsed message.

#[cfg(test)]
#[path = "message_test.rs"]
mod tests;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use viewport::{BoundsPolygon, Velocity, Viewport};

use crate::CodecError;
use crate::de::opt_i64_from_number;
use crate::state::{AnimationState, LayerGroup, LayerState, flatten_layer_groups};

/// The `type` discriminator of a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    ViewportUpdate,
    VelocityUpdate,
    LayerUpdate,
    AnimationToggle,
    ViewportChanged,
    LayersChanged,
    AnimationChanged,
    BoundsChanged,
    VelocitySync,
}

impl MessageKind {
    pub const ALL: [Self; 9] = [
        Self::ViewportUpdate,
        Self::VelocityUpdate,
        Self::LayerUpdate,
        Self::AnimationToggle,
        Self::ViewportChanged,
        Self::LayersChanged,
        Self::AnimationChanged,
        Self::BoundsChanged,
        Self::VelocitySync,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ViewportUpdate => "otef_viewport_update",
            Self::VelocityUpdate => "otef_velocity_update",
            Self::LayerUpdate => "otef_layer_update",
            Self::AnimationToggle => "otef_animation_toggle",
            Self::ViewportChanged => "otef_viewport_changed",
            Self::LayersChanged => "otef_layers_changed",
            Self::AnimationChanged => "otef_animation_changed",
            Self::BoundsChanged => "otef_bounds_changed",
            Self::VelocitySync => "otef_velocity_sync",
        }
    }

    /// Whether this kind is a server broadcast rather than a client write.
    #[must_use]
    pub fn is_broadcast(self) -> bool {
        matches!(
            self,
            Self::ViewportChanged
                | Self::LayersChanged
                | Self::AnimationChanged
                | Self::BoundsChanged
                | Self::VelocitySync
        )
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MessageKind {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| CodecError::UnknownType(s.to_owned()))
    }
}

/// Producer identity and time carried at the top level of most frames.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Stamp {
    #[serde(default, alias = "source_id")]
    source_id: Option<String>,
    #[serde(default, deserialize_with = "opt_i64_from_number")]
    timestamp: Option<i64>,
}

/// Joystick motion, sent by the driver and mirrored to followers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VelocityPayload {
    pub vx: f64,
    pub vy: f64,
    #[serde(default, alias = "source_id", skip_serializing_if = "Option::is_none")]
    pub source_id: Option<String>,
    #[serde(default, deserialize_with = "opt_i64_from_number", skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
}

impl VelocityPayload {
    #[must_use]
    pub fn velocity(&self) -> Velocity {
        Velocity::new(self.vx, self.vy)
    }
}

/// A single layer or animation switch written by a client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayerToggle {
    #[serde(alias = "layer_id", alias = "id")]
    pub layer_id: String,
    pub enabled: bool,
    #[serde(default, alias = "source_id", skip_serializing_if = "Option::is_none")]
    pub source_id: Option<String>,
    #[serde(default, deserialize_with = "opt_i64_from_number", skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
}

/// Broadcast of the full layer visibility map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "LayersChangedRepr")]
pub struct LayersChanged {
    pub layers: LayerState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LayersChangedRepr {
    #[serde(default)]
    layers: Option<LayerState>,
    #[serde(default)]
    layer_groups: Option<Vec<LayerGroup>>,
    #[serde(flatten)]
    stamp: Stamp,
}

impl TryFrom<LayersChangedRepr> for LayersChanged {
    type Error = String;

    fn try_from(raw: LayersChangedRepr) -> Result<Self, Self::Error> {
        let layers = match (raw.layers, raw.layer_groups) {
            (Some(layers), _) => layers,
            (None, Some(groups)) => flatten_layer_groups(&groups),
            (None, None) => return Err("missing field `layers`".to_owned()),
        };
        Ok(Self { layers, source_id: raw.stamp.source_id, timestamp: raw.stamp.timestamp })
    }
}

/// Broadcast of the full animation state map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnimationsChanged {
    pub animations: AnimationState,
    #[serde(default, alias = "source_id", skip_serializing_if = "Option::is_none")]
    pub source_id: Option<String>,
    #[serde(default, deserialize_with = "opt_i64_from_number", skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
}

/// Broadcast of a newly saved geofence polygon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoundsChanged {
    #[serde(alias = "boundsPolygon", alias = "bounds")]
    pub bounds_polygon: BoundsPolygon,
    #[serde(default, rename = "sourceId", alias = "source_id", skip_serializing_if = "Option::is_none")]
    pub source_id: Option<String>,
    #[serde(default, deserialize_with = "opt_i64_from_number", skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
}

/// A decoded WebSocket frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    ViewportUpdate(Viewport),
    VelocityUpdate(VelocityPayload),
    LayerUpdate(LayerToggle),
    AnimationToggle(LayerToggle),
    ViewportChanged(Viewport),
    LayersChanged(LayersChanged),
    AnimationChanged(AnimationsChanged),
    BoundsChanged(BoundsChanged),
    VelocitySync(VelocityPayload),
}

impl Message {
    #[must_use]
    pub fn kind(&self) -> MessageKind {
        match self {
            Self::ViewportUpdate(_) => MessageKind::ViewportUpdate,
            Self::VelocityUpdate(_) => MessageKind::VelocityUpdate,
            Self::LayerUpdate(_) => MessageKind::LayerUpdate,
            Self::AnimationToggle(_) => MessageKind::AnimationToggle,
            Self::ViewportChanged(_) => MessageKind::ViewportChanged,
            Self::LayersChanged(_) => MessageKind::LayersChanged,
            Self::AnimationChanged(_) => MessageKind::AnimationChanged,
            Self::BoundsChanged(_) => MessageKind::BoundsChanged,
            Self::VelocitySync(_) => MessageKind::VelocitySync,
        }
    }

    /// Producer of this frame, if stamped.
    #[must_use]
    pub fn source_id(&self) -> Option<&str> {
        match self {
            Self::ViewportUpdate(v) | Self::ViewportChanged(v) => v.source_id.as_deref(),
            Self::VelocityUpdate(v) | Self::VelocitySync(v) => v.source_id.as_deref(),
            Self::LayerUpdate(t) | Self::AnimationToggle(t) => t.source_id.as_deref(),
            Self::LayersChanged(l) => l.source_id.as_deref(),
            Self::AnimationChanged(a) => a.source_id.as_deref(),
            Self::BoundsChanged(b) => b.source_id.as_deref(),
        }
    }

    /// Producer wall-clock milliseconds, if stamped.
    #[must_use]
    pub fn timestamp(&self) -> Option<i64> {
        match self {
            Self::ViewportUpdate(v) | Self::ViewportChanged(v) => v.timestamp,
            Self::VelocityUpdate(v) | Self::VelocitySync(v) => v.timestamp,
            Self::LayerUpdate(t) | Self::AnimationToggle(t) => t.timestamp,
            Self::LayersChanged(l) => l.timestamp,
            Self::AnimationChanged(a) => a.timestamp,
            Self::BoundsChanged(b) => b.timestamp,
        }
    }
}

/// Decode one text frame.
///
/// # Errors
///
/// [`CodecError::Json`] for non-JSON text, [`CodecError::NotAnObject`],
/// [`CodecError::MissingType`], [`CodecError::UnknownType`], or
/// [`CodecError::Payload`] when a known type carries a malformed body.
pub fn decode_message(text: &str) -> Result<Message, CodecError> {
    let value: Value = serde_json::from_str(text)?;
    let Value::Object(obj) = value else {
        return Err(CodecError::NotAnObject);
    };
    let kind: MessageKind = obj
        .get("type")
        .and_then(Value::as_str)
        .ok_or(CodecError::MissingType)?
        .parse()?;

    let payload = |source| CodecError::Payload { kind, source };
    let msg = match kind {
        MessageKind::ViewportUpdate => Message::ViewportUpdate(decode_viewport(&obj).map_err(payload)?),
        MessageKind::ViewportChanged => Message::ViewportChanged(decode_viewport(&obj).map_err(payload)?),
        MessageKind::VelocityUpdate => Message::VelocityUpdate(from_object(obj).map_err(payload)?),
        MessageKind::VelocitySync => Message::VelocitySync(from_object(obj).map_err(payload)?),
        MessageKind::LayerUpdate => Message::LayerUpdate(from_object(obj).map_err(payload)?),
        MessageKind::AnimationToggle => Message::AnimationToggle(from_object(obj).map_err(payload)?),
        MessageKind::LayersChanged => Message::LayersChanged(from_object(obj).map_err(payload)?),
        MessageKind::AnimationChanged => Message::AnimationChanged(from_object(obj).map_err(payload)?),
        MessageKind::BoundsChanged => Message::BoundsChanged(from_object(obj).map_err(payload)?),
    };
    Ok(msg)
}

/// Encode one text frame.
///
/// # Errors
///
/// Only if a payload cannot be represented as JSON, which the protocol types
/// never produce.
pub fn encode_message(msg: &Message) -> Result<String, CodecError> {
    let mut obj = match msg {
        Message::ViewportUpdate(v) | Message::ViewportChanged(v) => encode_viewport(v)?,
        Message::VelocityUpdate(v) | Message::VelocitySync(v) => to_object(v)?,
        Message::LayerUpdate(t) | Message::AnimationToggle(t) => to_object(t)?,
        Message::LayersChanged(l) => to_object(l)?,
        Message::AnimationChanged(a) => to_object(a)?,
        Message::BoundsChanged(b) => to_object(b)?,
    };
    obj.insert("type".to_owned(), Value::String(msg.kind().as_str().to_owned()));
    Ok(Value::Object(obj).to_string())
}

fn from_object<T: serde::de::DeserializeOwned>(obj: Map<String, Value>) -> Result<T, serde_json::Error> {
    serde_json::from_value(Value::Object(obj))
}

fn to_object<T: Serialize>(payload: &T) -> Result<Map<String, Value>, CodecError> {
    match serde_json::to_value(payload)? {
        Value::Object(obj) => Ok(obj),
        _ => Err(CodecError::NotAnObject),
    }
}

/// Accept either `{viewport: {...}, sourceId, timestamp}` or the viewport
/// fields inlined at the top level. Stamps inside the nested object win.
fn decode_viewport(obj: &Map<String, Value>) -> Result<Viewport, serde_json::Error> {
    let whole = Value::Object(obj.clone());
    let stamp: Stamp = serde_json::from_value(whole.clone())?;
    let mut viewport: Viewport = match obj.get("viewport") {
        Some(inner @ Value::Object(_)) => serde_json::from_value(inner.clone())?,
        _ => serde_json::from_value(whole)?,
    };
    if viewport.source_id.is_none() {
        viewport.source_id = stamp.source_id;
    }
    if viewport.timestamp.is_none() {
        viewport.timestamp = stamp.timestamp;
    }
    Ok(viewport)
}

fn encode_viewport(viewport: &Viewport) -> Result<Map<String, Value>, CodecError> {
    let mut obj = Map::new();
    obj.insert("viewport".to_owned(), serde_json::to_value(viewport)?);
    if let Some(id) = &viewport.source_id {
        obj.insert("sourceId".to_owned(), Value::String(id.clone()));
    }
    if let Some(ts) = viewport.timestamp {
        obj.insert("timestamp".to_owned(), Value::from(ts));
    }
    Ok(obj)
}

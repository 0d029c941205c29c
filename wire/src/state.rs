//! REST state bodies: the full snapshot returned by `GET` and the partial
//! patch sent with `PATCH`.
//!
//! DESIGN
//! ======
//! Layer visibility is a flat `layer id → enabled` map. Older servers return
//! a nested `layerGroups` array instead; it is flattened on decode into
//! `"{group}.{layer}"` keys so downstream code handles one shape.

#[cfg(test)]
#[path = "state_test.rs"]
mod tests;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use viewport::{BoundsPolygon, Viewport};

/// Layer id → visible.
pub type LayerState = BTreeMap<String, bool>;

/// Animation id → running.
pub type AnimationState = BTreeMap<String, bool>;

/// One group in the legacy nested layer payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerGroup {
    pub id: String,
    #[serde(default)]
    pub layers: Vec<LayerEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerEntry {
    pub id: String,
    #[serde(default)]
    pub enabled: bool,
}

/// Flatten nested groups into `"{group}.{layer}"` keys.
#[must_use]
pub fn flatten_layer_groups(groups: &[LayerGroup]) -> LayerState {
    groups
        .iter()
        .flat_map(|group| {
            group
                .layers
                .iter()
                .map(move |layer| (format!("{}.{}", group.id, layer.id), layer.enabled))
        })
        .collect()
}

/// Full shared state for one table.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "SnapshotRepr")]
pub struct StateSnapshot {
    pub viewport: Option<Viewport>,
    pub layers: LayerState,
    pub animations: AnimationState,
    pub bounds_polygon: BoundsPolygon,
}

#[derive(Deserialize)]
struct SnapshotRepr {
    #[serde(default)]
    viewport: Option<Viewport>,
    #[serde(default)]
    layers: Option<LayerState>,
    #[serde(default, rename = "layerGroups")]
    layer_groups: Option<Vec<LayerGroup>>,
    #[serde(default)]
    animations: Option<AnimationState>,
    #[serde(default, alias = "boundsPolygon")]
    bounds_polygon: Option<BoundsPolygon>,
}

impl From<SnapshotRepr> for StateSnapshot {
    fn from(raw: SnapshotRepr) -> Self {
        let layers = match (raw.layers, raw.layer_groups) {
            (Some(layers), _) => layers,
            (None, Some(groups)) => flatten_layer_groups(&groups),
            (None, None) => LayerState::new(),
        };
        Self {
            viewport: raw.viewport,
            layers,
            animations: raw.animations.unwrap_or_default(),
            bounds_polygon: raw.bounds_polygon.unwrap_or_default(),
        }
    }
}

/// Partial state update; absent fields are left unchanged by the server.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StatePatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub viewport: Option<Viewport>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layers: Option<LayerState>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub animations: Option<AnimationState>,
}

impl StatePatch {
    #[must_use]
    pub fn viewport(viewport: Viewport) -> Self {
        Self { viewport: Some(viewport), ..Self::default() }
    }

    #[must_use]
    pub fn layers(layers: LayerState) -> Self {
        Self { layers: Some(layers), ..Self::default() }
    }

    #[must_use]
    pub fn animations(animations: AnimationState) -> Self {
        Self { animations: Some(animations), ..Self::default() }
    }
}

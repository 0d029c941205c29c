//! Topic-based change notification.
//!
//! Subscribers for a topic are invoked synchronously, in subscription
//! order, each time the coordinator changes that slice of state. A
//! panicking subscriber is caught and logged; the rest still run.

#[cfg(test)]
#[path = "subscribers_test.rs"]
mod tests;

use std::panic::{AssertUnwindSafe, catch_unwind};

use viewport::{BoundsPolygon, Velocity, Viewport};
use wire::{AnimationState, LayerState};

/// A slice of coordinator state that can be observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    Viewport,
    LayerGroups,
    Animations,
    Bounds,
    Connection,
    Velocity,
}

impl Topic {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Viewport => "viewport",
            Self::LayerGroups => "layerGroups",
            Self::Animations => "animations",
            Self::Bounds => "bounds",
            Self::Connection => "connection",
            Self::Velocity => "velocity",
        }
    }
}

impl std::fmt::Display for Topic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// New value delivered to subscribers.
#[derive(Debug, Clone, PartialEq)]
pub enum Change {
    Viewport(Viewport),
    Layers(LayerState),
    Animations(AnimationState),
    Bounds(BoundsPolygon),
    Connection(bool),
    Velocity(Velocity),
}

impl Change {
    #[must_use]
    pub fn topic(&self) -> Topic {
        match self {
            Self::Viewport(_) => Topic::Viewport,
            Self::Layers(_) => Topic::LayerGroups,
            Self::Animations(_) => Topic::Animations,
            Self::Bounds(_) => Topic::Bounds,
            Self::Connection(_) => Topic::Connection,
            Self::Velocity(_) => Topic::Velocity,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Callback = Box<dyn Fn(&Change) + Send>;

struct Entry {
    id: SubscriptionId,
    topic: Topic,
    callback: Callback,
}

#[derive(Default)]
pub struct Subscribers {
    entries: Vec<Entry>,
    next_id: u64,
}

impl Subscribers {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&mut self, topic: Topic, callback: F) -> SubscriptionId
    where
        F: Fn(&Change) + Send + 'static,
    {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.entries.push(Entry { id, topic, callback: Box::new(callback) });
        id
    }

    /// Returns `false` if the id was not subscribed.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e.id != id);
        self.entries.len() != before
    }

    /// Deliver `change` to its topic's subscribers; returns how many ran.
    pub fn notify(&self, change: &Change) -> usize {
        let topic = change.topic();
        let mut notified = 0;
        for entry in self.entries.iter().filter(|e| e.topic == topic) {
            notified += 1;
            if catch_unwind(AssertUnwindSafe(|| (entry.callback)(change))).is_err() {
                tracing::error!(%topic, "subscriber panicked");
            }
        }
        notified
    }
}

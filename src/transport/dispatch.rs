//! Listener registry for decoded socket frames.
//!
//! Listeners for a frame's kind run first, in registration order, then the
//! wildcard listeners. A panicking listener is caught and logged; the rest
//! still run.

#[cfg(test)]
#[path = "dispatch_test.rs"]
mod tests;

use std::collections::HashMap;
use std::panic::{AssertUnwindSafe, catch_unwind};

use wire::{Message, MessageKind};

type Listener = Box<dyn Fn(&Message) + Send>;

#[derive(Default)]
pub struct Dispatcher {
    by_kind: HashMap<MessageKind, Vec<Listener>>,
    any: Vec<Listener>,
}

impl Dispatcher {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Listen for one message kind.
    pub fn on<F>(&mut self, kind: MessageKind, listener: F)
    where
        F: Fn(&Message) + Send + 'static,
    {
        self.by_kind.entry(kind).or_default().push(Box::new(listener));
    }

    /// Listen for every message.
    pub fn on_any<F>(&mut self, listener: F)
    where
        F: Fn(&Message) + Send + 'static,
    {
        self.any.push(Box::new(listener));
    }

    /// Invoke all matching listeners; returns how many were invoked.
    pub fn dispatch(&self, msg: &Message) -> usize {
        let kind = msg.kind();
        let typed = self.by_kind.get(&kind).map_or(&[][..], Vec::as_slice);
        let mut invoked = 0;
        for listener in typed.iter().chain(self.any.iter()) {
            invoked += 1;
            if catch_unwind(AssertUnwindSafe(|| listener(msg))).is_err() {
                tracing::error!(%kind, "message listener panicked");
            }
        }
        invoked
    }
}

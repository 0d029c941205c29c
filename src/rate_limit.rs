//! Input rate shaping for controller gestures.
//!
//! DESIGN
//! ======
//! Three shapers turn bursty UI input into a transport-safe cadence:
//! - `HoldRepeater`: fire on press, re-fire every interval while held.
//! - `Throttle`: first sample in each window wins, the rest are dropped.
//! - `Debouncer`: dispatch the latest value after a quiet period.
//!
//! None of them queue. Dropped samples are superseded by the next accepted
//! one, so buffering would only replay stale input.
//!
//! All three are synchronous and owned by the single session task; the
//! `*_at(now)` variants exist so tests can drive time explicitly.

#[cfg(test)]
#[path = "rate_limit_test.rs"]
mod tests;

use std::time::{Duration, Instant};

use viewport::Velocity;

/// Joystick deflection below this radius is treated as centered.
pub const JOYSTICK_DEAD_ZONE: f64 = 0.1;

// =============================================================================
// HOLD REPEATER
// =============================================================================

/// Press-and-hold auto-repeat for discrete actions.
#[derive(Debug, Clone)]
pub struct HoldRepeater<T> {
    interval: Duration,
    held: Option<T>,
    next_due: Option<Instant>,
}

impl<T: Clone> HoldRepeater<T> {
    #[must_use]
    pub fn new(interval: Duration) -> Self {
        Self { interval, held: None, next_due: None }
    }

    /// Start holding `action`; returns it for immediate dispatch.
    pub fn press(&mut self, action: T) -> T {
        self.press_at(action, Instant::now())
    }

    pub fn press_at(&mut self, action: T, now: Instant) -> T {
        self.held = Some(action.clone());
        self.next_due = Some(now + self.interval);
        action
    }

    /// Stop repeating immediately.
    pub fn release(&mut self) {
        self.held = None;
        self.next_due = None;
    }

    #[must_use]
    pub fn is_held(&self) -> bool {
        self.held.is_some()
    }

    /// When the next repeat fires, if held.
    #[must_use]
    pub fn next_due(&self) -> Option<Instant> {
        self.next_due
    }

    /// Return the held action if a repeat is due, scheduling the next one.
    pub fn poll(&mut self) -> Option<T> {
        self.poll_at(Instant::now())
    }

    pub fn poll_at(&mut self, now: Instant) -> Option<T> {
        let due = self.next_due?;
        if now < due {
            return None;
        }
        // Reschedule from now so a stalled loop does not burst.
        self.next_due = Some(now + self.interval);
        self.held.clone()
    }
}

// =============================================================================
// THROTTLE
// =============================================================================

/// Admit at most one sample per window; excess samples are dropped.
#[derive(Debug, Clone)]
pub struct Throttle {
    window: Duration,
    last: Option<Instant>,
}

impl Throttle {
    #[must_use]
    pub fn new(window: Duration) -> Self {
        Self { window, last: None }
    }

    pub fn admit(&mut self) -> bool {
        self.admit_at(Instant::now())
    }

    pub fn admit_at(&mut self, now: Instant) -> bool {
        if let Some(last) = self.last {
            if now.saturating_duration_since(last) < self.window {
                return false;
            }
        }
        self.last = Some(now);
        true
    }

    /// Forget the current window so the next sample is admitted.
    pub fn reset(&mut self) {
        self.last = None;
    }
}

// =============================================================================
// DEBOUNCER
// =============================================================================

/// Trailing-edge debounce: only the latest value survives a quiet period.
#[derive(Debug, Clone)]
pub struct Debouncer<T> {
    quiet: Duration,
    pending: Option<T>,
    deadline: Option<Instant>,
}

impl<T> Debouncer<T> {
    #[must_use]
    pub fn new(quiet: Duration) -> Self {
        Self { quiet, pending: None, deadline: None }
    }

    /// Replace the pending value and restart the quiet period.
    pub fn push(&mut self, value: T) {
        self.push_at(value, Instant::now());
    }

    pub fn push_at(&mut self, value: T, now: Instant) {
        self.pending = Some(value);
        self.deadline = Some(now + self.quiet);
    }

    #[must_use]
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Take the pending value once its quiet period has elapsed.
    pub fn take_due(&mut self) -> Option<T> {
        self.take_due_at(Instant::now())
    }

    pub fn take_due_at(&mut self, now: Instant) -> Option<T> {
        let deadline = self.deadline?;
        if now < deadline {
            return None;
        }
        self.deadline = None;
        self.pending.take()
    }

    /// Take the pending value immediately, ignoring the quiet period.
    pub fn flush(&mut self) -> Option<T> {
        self.deadline = None;
        self.pending.take()
    }
}

// =============================================================================
// JOYSTICK
// =============================================================================

/// Map a screen-space stick deflection to planar velocity.
///
/// `x` is right-positive, `y` is down-positive (screen convention), both in
/// `[-1, 1]`. Deflection is clamped to the unit disc; inside the dead zone
/// the result is [`Velocity::ZERO`]. Screen-up maps to planar north.
#[must_use]
pub fn joystick_to_velocity(x: f64, y: f64, max_speed: f64) -> Velocity {
    if !x.is_finite() || !y.is_finite() || !max_speed.is_finite() {
        return Velocity::ZERO;
    }
    let magnitude = x.hypot(y);
    if magnitude < JOYSTICK_DEAD_ZONE {
        return Velocity::ZERO;
    }
    let scale = if magnitude > 1.0 { 1.0 / magnitude } else { 1.0 };
    Velocity::new(x * scale * max_speed, -y * scale * max_speed)
}

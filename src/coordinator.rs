//! Per-client sync coordinator.
//!
//! DESIGN
//! ======
//! The coordinator owns this client's cached copy of the shared table state
//! and is the only code that mutates it. Local actions apply optimistically,
//! then go to the server; remote notifications are filtered before they are
//! applied:
//!
//! - Echo: a change stamped with our own `client_id` is dropped.
//! - Staleness: a change whose timestamp is more than `staleness` older than
//!   our last local write on the same topic is dropped. Unstamped changes
//!   cannot be compared and are applied.
//! - Interaction guard: while another client is driving with a non-zero
//!   velocity, our own incidental viewport writes are refused locally.
//!
//! Every applied change notifies that topic's subscribers synchronously.
//! The backend sits behind [`SyncBackend`] so tests drive the coordinator
//! without a server.
//!
//! Server round trips are split in three: a synchronous `begin_*` applies
//! the optimistic state and returns a `Pending` request, the request runs
//! against a shared backend handle without touching the coordinator, and
//! `Coordinator::finish` adopts or reverts the result. The session loop
//! runs requests concurrently; the public async methods run them inline.
//! A result that arrives after a newer local change to the same state is
//! not applied over it.

#[cfg(test)]
#[path = "coordinator_test.rs"]
mod tests;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use uuid::Uuid;
use viewport::geofence::is_viewport_admissible;
use viewport::ops::{self, Axis};
use viewport::types::clamp_zoom;
use viewport::{BoundsPolygon, Direction, Rejection, Velocity, Viewport};
use wire::{
    AnimationState, LayerState, LayerToggle, Message, StatePatch, StateSnapshot, VelocityPayload, ViewportCommand,
};

use crate::SyncError;
use crate::config::SyncConfig;
use crate::rate_limit::Throttle;
use crate::subscribers::{Change, SubscriptionId, Subscribers, Topic};
use crate::transport::RestError;

// =============================================================================
// BACKEND
// =============================================================================

/// What the coordinator needs from the outside world.
#[async_trait]
pub trait SyncBackend: Send + Sync {
    async fn fetch_state(&self) -> Result<StateSnapshot, RestError>;
    async fn patch_state(&self, patch: &StatePatch) -> Result<StateSnapshot, RestError>;
    async fn execute_command(&self, command: &ViewportCommand) -> Result<Viewport, RestError>;
    async fn save_bounds(&self, polygon: &BoundsPolygon) -> Result<BoundsPolygon, RestError>;
    /// Send one frame; `false` when the socket is down.
    fn send(&self, msg: &Message) -> bool;
}

// =============================================================================
// OUTCOMES
// =============================================================================

/// Result of a local viewport action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Accepted,
    Rejected(Rejection),
}

impl Outcome {
    #[must_use]
    pub fn is_accepted(self) -> bool {
        matches!(self, Self::Accepted)
    }
}

/// What happened to an inbound notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reconciliation {
    Applied(Topic),
    Echo,
    Stale,
    /// Valid but changed nothing.
    Ignored,
}

/// Wall-clock milliseconds used to stamp local changes.
pub type Clock = Arc<dyn Fn() -> i64 + Send + Sync>;

fn wall_clock_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| i64::try_from(d.as_millis()).unwrap_or(i64::MAX))
}

// =============================================================================
// ROUND TRIPS
// =============================================================================

/// Local state to restore when a `PATCH` fallback fails.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Revert {
    Viewport { previous: Option<Viewport>, applied: Viewport },
    Layer { id: String, previous: Option<bool>, applied: bool },
    Animation { id: String, previous: Option<bool>, applied: bool },
}

/// A server request owed by an action that was already applied locally.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Pending {
    Command { base: Viewport, optimistic: Viewport, command: ViewportCommand },
    Patch { patch: StatePatch, revert: Revert },
    SaveBounds(BoundsPolygon),
    Resync,
}

/// A finished request, ready for `Coordinator::finish`.
#[derive(Debug)]
pub(crate) enum Completed {
    Command { base: Viewport, optimistic: Viewport, action: &'static str, result: Result<Viewport, RestError> },
    Patch { revert: Revert, result: Result<(), RestError> },
    SaveBounds(Result<BoundsPolygon, RestError>),
    Resync(Result<StateSnapshot, RestError>),
}

impl Pending {
    pub(crate) async fn execute<B: SyncBackend>(self, backend: &B) -> Completed {
        match self {
            Self::Command { base, optimistic, command } => {
                let result = backend.execute_command(&command).await;
                Completed::Command { base, optimistic, action: command.action(), result }
            }
            Self::Patch { patch, revert } => {
                let result = backend.patch_state(&patch).await.map(|_| ());
                Completed::Patch { revert, result }
            }
            Self::SaveBounds(polygon) => Completed::SaveBounds(backend.save_bounds(&polygon).await),
            Self::Resync => Completed::Resync(backend.fetch_state().await),
        }
    }
}

/// How far a local action got without the server.
#[derive(Debug, Clone, PartialEq)]
#[must_use]
pub(crate) enum Started {
    /// Nothing left to send.
    Done(Outcome),
    /// Applied locally; the request still has to run.
    Pending(Pending),
}

// =============================================================================
// COORDINATOR
// =============================================================================

pub struct Coordinator<B> {
    backend: Arc<B>,
    client_id: String,
    clock: Clock,
    staleness_ms: i64,
    guard_window: Duration,
    max_step: Duration,
    pan_delta: f64,

    viewport: Option<Viewport>,
    layers: LayerState,
    animations: AnimationState,
    bounds: BoundsPolygon,
    connected: bool,
    /// Joystick input as the user holds it.
    velocity: Velocity,
    /// Input after the fence slide of the latest tick.
    effective_velocity: Velocity,
    /// Last velocity followers were told about.
    sent_velocity: Velocity,
    /// Motion mirrored from whichever client is driving.
    remote_velocity: Velocity,

    last_local_ts: HashMap<Topic, i64>,
    guard_until: Option<Instant>,
    viewport_throttle: Throttle,
    velocity_throttle: Throttle,
    subscribers: Subscribers,
}

impl<B: SyncBackend> Coordinator<B> {
    #[must_use]
    pub fn new(backend: B, config: &SyncConfig) -> Self {
        Self {
            backend: Arc::new(backend),
            client_id: Uuid::new_v4().to_string(),
            clock: Arc::new(wall_clock_ms),
            staleness_ms: i64::try_from(config.staleness.as_millis()).unwrap_or(i64::MAX),
            guard_window: config.interaction_guard,
            max_step: config.max_step,
            pan_delta: config.pan_delta,
            viewport: None,
            layers: LayerState::new(),
            animations: AnimationState::new(),
            bounds: BoundsPolygon::default(),
            connected: false,
            velocity: Velocity::ZERO,
            effective_velocity: Velocity::ZERO,
            sent_velocity: Velocity::ZERO,
            remote_velocity: Velocity::ZERO,
            last_local_ts: HashMap::new(),
            guard_until: None,
            viewport_throttle: Throttle::new(config.joystick_window),
            velocity_throttle: Throttle::new(config.joystick_window),
            subscribers: Subscribers::new(),
        }
    }

    /// Replace the timestamp source.
    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    // -------------------------------------------------------------------------
    // accessors
    // -------------------------------------------------------------------------

    #[must_use]
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    #[must_use]
    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub(crate) fn shared_backend(&self) -> Arc<B> {
        Arc::clone(&self.backend)
    }

    #[must_use]
    pub fn viewport(&self) -> Option<&Viewport> {
        self.viewport.as_ref()
    }

    #[must_use]
    pub fn layers(&self) -> &LayerState {
        &self.layers
    }

    #[must_use]
    pub fn animations(&self) -> &AnimationState {
        &self.animations
    }

    #[must_use]
    pub fn bounds(&self) -> &BoundsPolygon {
        &self.bounds
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// Joystick input; non-zero while the user is steering.
    #[must_use]
    pub fn velocity(&self) -> Velocity {
        self.velocity
    }

    /// Motion actually applied by the last tick, with fence-blocked axes zeroed.
    #[must_use]
    pub fn effective_velocity(&self) -> Velocity {
        self.effective_velocity
    }

    #[must_use]
    pub fn remote_velocity(&self) -> Velocity {
        self.remote_velocity
    }

    /// Whether another client's motion currently blocks our viewport writes.
    #[must_use]
    pub fn is_guarded_at(&self, now: Instant) -> bool {
        self.guard_until.is_some_and(|until| now < until)
    }

    pub fn subscribe<F>(&mut self, topic: Topic, callback: F) -> SubscriptionId
    where
        F: Fn(&Change) + Send + 'static,
    {
        self.subscribers.subscribe(topic, callback)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.subscribers.unsubscribe(id)
    }

    // -------------------------------------------------------------------------
    // round trips
    // -------------------------------------------------------------------------

    async fn drive(&mut self, started: Started) -> Result<Outcome, SyncError> {
        match started {
            Started::Done(outcome) => Ok(outcome),
            Started::Pending(pending) => {
                let completed = pending.execute(self.backend.as_ref()).await;
                self.finish(completed)?;
                Ok(Outcome::Accepted)
            }
        }
    }

    /// Adopt or revert the result of a request started by a `begin_*` call.
    pub(crate) fn finish(&mut self, completed: Completed) -> Result<(), SyncError> {
        match completed {
            Completed::Command { base, optimistic, action, result } => {
                let current = self.viewport.as_ref() == Some(&optimistic);
                match result {
                    Ok(confirmed) => {
                        if !current {
                            tracing::debug!(action, "viewport moved on; server result superseded");
                        } else if confirmed.bbox() != optimistic.bbox() || confirmed.zoom() != optimistic.zoom() {
                            tracing::debug!(action, "server adjusted optimistic viewport");
                            self.set_viewport(confirmed);
                        }
                        Ok(())
                    }
                    Err(e) => {
                        tracing::warn!(action, error = %e, reverted = current, "viewport command failed");
                        if current {
                            self.set_viewport(base);
                        }
                        Err(e.into())
                    }
                }
            }
            Completed::Patch { revert, result } => match result {
                Ok(()) => Ok(()),
                Err(e) => {
                    tracing::warn!(error = %e, "state patch failed, reverting");
                    self.revert(revert);
                    Err(e.into())
                }
            },
            Completed::SaveBounds(result) => {
                let saved = result?;
                self.bounds = saved.clone();
                self.publish(Change::Bounds(saved));
                Ok(())
            }
            Completed::Resync(result) => {
                self.apply_snapshot(result?);
                Ok(())
            }
        }
    }

    fn revert(&mut self, revert: Revert) {
        match revert {
            Revert::Viewport { previous, applied } => {
                if self.viewport.as_ref() == Some(&applied) {
                    if let Some(prev) = previous {
                        self.set_viewport(prev);
                    }
                }
            }
            Revert::Layer { id, previous, applied } => {
                if self.layers.get(&id) == Some(&applied) {
                    self.replace_layers(restored(&self.layers, id, previous));
                }
            }
            Revert::Animation { id, previous, applied } => {
                if self.animations.get(&id) == Some(&applied) {
                    self.replace_animations(restored(&self.animations, id, previous));
                }
            }
        }
    }

    // -------------------------------------------------------------------------
    // snapshot / connection
    // -------------------------------------------------------------------------

    /// Fetch the full state and adopt it.
    ///
    /// # Errors
    ///
    /// [`SyncError::Rest`] when the fetch fails; cached state is untouched.
    pub async fn resync(&mut self) -> Result<(), SyncError> {
        self.drive(Started::Pending(Pending::Resync)).await.map(|_| ())
    }

    fn apply_snapshot(&mut self, snapshot: StateSnapshot) {
        if let Some(vp) = snapshot.viewport {
            self.viewport = Some(vp.clone());
            self.publish(Change::Viewport(vp));
        }
        self.layers = snapshot.layers;
        self.publish(Change::Layers(self.layers.clone()));
        self.animations = snapshot.animations;
        self.publish(Change::Animations(self.animations.clone()));
        self.bounds = snapshot.bounds_polygon;
        self.publish(Change::Bounds(self.bounds.clone()));
        tracing::info!(
            has_viewport = self.viewport.is_some(),
            layers = self.layers.len(),
            fence = self.bounds.is_enabled(),
            "state snapshot applied"
        );
    }

    /// Record a socket transition; a (re)connect refetches the full state.
    ///
    /// # Errors
    ///
    /// [`SyncError::Rest`] when the refetch fails.
    pub async fn handle_connection(&mut self, connected: bool) -> Result<(), SyncError> {
        if let Some(pending) = self.set_connected(connected) {
            self.drive(Started::Pending(pending)).await?;
        }
        Ok(())
    }

    /// Record a socket transition; returns the refetch a connect owes.
    pub(crate) fn set_connected(&mut self, connected: bool) -> Option<Pending> {
        self.connected = connected;
        self.publish(Change::Connection(connected));
        connected.then_some(Pending::Resync)
    }

    // -------------------------------------------------------------------------
    // inbound notifications
    // -------------------------------------------------------------------------

    pub fn handle_message(&mut self, msg: &Message) -> Reconciliation {
        self.handle_message_at(msg, Instant::now())
    }

    pub fn handle_message_at(&mut self, msg: &Message, now: Instant) -> Reconciliation {
        if msg.source_id() == Some(self.client_id.as_str()) {
            tracing::debug!(kind = %msg.kind(), "dropping echo of own change");
            return Reconciliation::Echo;
        }
        if !msg.kind().is_broadcast() {
            tracing::trace!(kind = %msg.kind(), source_id = ?msg.source_id(), "client write relayed by server");
        }

        let topic = topic_of(msg);
        if let (Some(ts), Some(&local)) = (msg.timestamp(), self.last_local_ts.get(&topic)) {
            if ts < local.saturating_sub(self.staleness_ms) {
                tracing::debug!(kind = %msg.kind(), ts, local, "dropping stale change");
                return Reconciliation::Stale;
            }
        }

        let changed = match msg {
            Message::ViewportChanged(vp) | Message::ViewportUpdate(vp) => {
                if self.viewport.as_ref() == Some(vp) {
                    false
                } else {
                    self.viewport = Some(vp.clone());
                    self.publish(Change::Viewport(vp.clone()));
                    true
                }
            }
            Message::LayersChanged(changed) => self.replace_layers(changed.layers.clone()),
            Message::LayerUpdate(toggle) => {
                let mut next = self.layers.clone();
                next.insert(toggle.layer_id.clone(), toggle.enabled);
                self.replace_layers(next)
            }
            Message::AnimationChanged(changed) => self.replace_animations(changed.animations.clone()),
            Message::AnimationToggle(toggle) => {
                let mut next = self.animations.clone();
                next.insert(toggle.layer_id.clone(), toggle.enabled);
                self.replace_animations(next)
            }
            Message::BoundsChanged(changed) => {
                if self.bounds == changed.bounds_polygon {
                    false
                } else {
                    self.bounds = changed.bounds_polygon.clone();
                    self.publish(Change::Bounds(self.bounds.clone()));
                    true
                }
            }
            Message::VelocitySync(payload) | Message::VelocityUpdate(payload) => {
                let velocity = payload.velocity();
                self.guard_until = (!velocity.is_zero()).then(|| now + self.guard_window);
                if self.remote_velocity == velocity {
                    false
                } else {
                    self.remote_velocity = velocity;
                    self.publish(Change::Velocity(velocity));
                    true
                }
            }
        };

        if changed { Reconciliation::Applied(topic) } else { Reconciliation::Ignored }
    }

    fn replace_layers(&mut self, next: LayerState) -> bool {
        if self.layers == next {
            return false;
        }
        self.layers = next;
        self.publish(Change::Layers(self.layers.clone()));
        true
    }

    fn replace_animations(&mut self, next: AnimationState) -> bool {
        if self.animations == next {
            return false;
        }
        self.animations = next;
        self.publish(Change::Animations(self.animations.clone()));
        true
    }

    // -------------------------------------------------------------------------
    // local viewport actions
    // -------------------------------------------------------------------------

    /// Pan one step; applied locally, then confirmed by the server.
    ///
    /// # Errors
    ///
    /// [`SyncError::NotInitialized`] before the first snapshot;
    /// [`SyncError::Rest`] when the command fails (the pan is reverted).
    pub async fn pan(&mut self, direction: Direction) -> Result<Outcome, SyncError> {
        let started = self.begin_pan(direction)?;
        self.drive(started).await
    }

    pub(crate) fn begin_pan(&mut self, direction: Direction) -> Result<Started, SyncError> {
        let base = self.viewport.clone().ok_or(SyncError::NotInitialized)?;
        let candidate = match ops::pan(&base, direction, self.pan_delta, &self.bounds) {
            Ok(vp) => vp,
            Err(rejection) => return Ok(Started::Done(Outcome::Rejected(rejection))),
        };
        let timestamp = self.stamp(Topic::Viewport);
        let command = ViewportCommand::Pan {
            direction,
            delta: self.pan_delta,
            source_id: self.client_id.clone(),
            timestamp,
            base_viewport: base.clone(),
        };
        Ok(self.start_command(base, candidate.stamped(&self.client_id, timestamp), command))
    }

    /// Zoom to an absolute level (clamped).
    ///
    /// # Errors
    ///
    /// Same as [`Coordinator::pan`].
    pub async fn zoom(&mut self, level: u8) -> Result<Outcome, SyncError> {
        let started = self.begin_zoom(level)?;
        self.drive(started).await
    }

    pub(crate) fn begin_zoom(&mut self, level: u8) -> Result<Started, SyncError> {
        let base = self.viewport.clone().ok_or(SyncError::NotInitialized)?;
        let candidate = match ops::zoom_to(&base, i64::from(level), &self.bounds) {
            Ok(vp) => vp,
            Err(rejection) => return Ok(Started::Done(Outcome::Rejected(rejection))),
        };
        let timestamp = self.stamp(Topic::Viewport);
        let command = ViewportCommand::Zoom {
            level: candidate.zoom(),
            source_id: self.client_id.clone(),
            timestamp,
            base_viewport: base.clone(),
        };
        Ok(self.start_command(base, candidate.stamped(&self.client_id, timestamp), command))
    }

    /// Zoom relative to the current level.
    ///
    /// # Errors
    ///
    /// Same as [`Coordinator::pan`].
    pub async fn zoom_step(&mut self, step: i8) -> Result<Outcome, SyncError> {
        let started = self.begin_zoom_step(step)?;
        self.drive(started).await
    }

    pub(crate) fn begin_zoom_step(&mut self, step: i8) -> Result<Started, SyncError> {
        let current = self.viewport.as_ref().ok_or(SyncError::NotInitialized)?.zoom();
        self.begin_zoom(clamp_zoom(i64::from(current) + i64::from(step)))
    }

    fn start_command(&mut self, base: Viewport, optimistic: Viewport, command: ViewportCommand) -> Started {
        self.set_viewport(optimistic.clone());
        Started::Pending(Pending::Command { base, optimistic, command })
    }

    /// See [`Coordinator::push_local_viewport_at`].
    ///
    /// # Errors
    ///
    /// [`SyncError::Rest`] when the `PATCH` fallback fails.
    pub async fn push_local_viewport(&mut self, viewport: Viewport) -> Result<Outcome, SyncError> {
        self.push_local_viewport_at(viewport, Instant::now()).await
    }

    /// Publish a viewport this client moved to on its own (e.g. map drag).
    ///
    /// Refused while another client is driving, or when the center leaves
    /// the fence. Goes over the socket, or `PATCH` when the socket is down.
    ///
    /// # Errors
    ///
    /// [`SyncError::Rest`] when the `PATCH` fallback fails (reverted).
    pub async fn push_local_viewport_at(&mut self, viewport: Viewport, now: Instant) -> Result<Outcome, SyncError> {
        let started = self.begin_push_local_viewport_at(viewport, now);
        self.drive(started).await
    }

    pub(crate) fn begin_push_local_viewport_at(&mut self, viewport: Viewport, now: Instant) -> Started {
        if self.is_guarded_at(now) {
            return Started::Done(Outcome::Rejected(Rejection::InteractionGuard));
        }
        if !is_viewport_admissible(&viewport, &self.bounds) {
            return Started::Done(Outcome::Rejected(Rejection::Bounds));
        }

        let previous = self.viewport.clone();
        let timestamp = self.stamp(Topic::Viewport);
        let stamped = viewport.stamped(&self.client_id, timestamp);
        self.set_viewport(stamped.clone());

        if self.backend.send(&Message::ViewportUpdate(stamped.clone())) {
            return Started::Done(Outcome::Accepted);
        }
        Started::Pending(Pending::Patch {
            patch: StatePatch::viewport(stamped.clone()),
            revert: Revert::Viewport { previous, applied: stamped },
        })
    }

    fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = Some(viewport.clone());
        self.publish(Change::Viewport(viewport));
    }

    // -------------------------------------------------------------------------
    // motion
    // -------------------------------------------------------------------------

    pub fn set_velocity(&mut self, velocity: Velocity) -> bool {
        self.set_velocity_at(velocity, Instant::now())
    }

    /// Set our joystick motion; returns whether a velocity frame went out.
    ///
    /// Samples are throttled to one per window. A stop is always sent, along
    /// with the final viewport, so followers settle on the same position.
    pub fn set_velocity_at(&mut self, velocity: Velocity, now: Instant) -> bool {
        let was_moving = !self.velocity.is_zero();
        self.velocity = velocity;
        self.effective_velocity = velocity;
        self.publish(Change::Velocity(velocity));

        if velocity.is_zero() {
            self.velocity_throttle.reset();
            let sent = self.send_velocity(velocity);
            if was_moving {
                self.send_viewport_update();
                self.viewport_throttle.reset();
            }
            return sent;
        }
        if !self.velocity_throttle.admit_at(now) {
            return false;
        }
        self.send_velocity(velocity)
    }

    fn send_velocity(&mut self, velocity: Velocity) -> bool {
        let timestamp = self.stamp(Topic::Velocity);
        let payload = VelocityPayload {
            vx: velocity.vx,
            vy: velocity.vy,
            source_id: Some(self.client_id.clone()),
            timestamp: Some(timestamp),
        };
        let sent = self.backend.send(&Message::VelocityUpdate(payload));
        if sent {
            self.sent_velocity = velocity;
        }
        sent
    }

    fn send_viewport_update(&mut self) -> bool {
        let Some(vp) = self.viewport.clone() else {
            return false;
        };
        let timestamp = self.stamp(Topic::Viewport);
        self.backend.send(&Message::ViewportUpdate(vp.stamped(&self.client_id, timestamp)))
    }

    pub fn tick(&mut self, dt: Duration) -> bool {
        self.tick_at(dt, Instant::now())
    }

    /// Advance our own motion by `dt`; returns `false` once motion stops.
    ///
    /// Each step starts from the joystick input, so an axis the fence blocked
    /// resumes as soon as the wall ends. Followers get the effective velocity
    /// whenever it changes, subject to the velocity throttle.
    pub fn tick_at(&mut self, dt: Duration, now: Instant) -> bool {
        if self.velocity.is_zero() {
            return false;
        }
        let Some(current) = self.viewport.clone() else {
            return false;
        };

        let step = ops::integrate_velocity(&current, self.velocity, dt.min(self.max_step).as_secs_f64(), &self.bounds);
        if step.axis == Axis::Blocked {
            tracing::debug!("motion blocked by fence");
            self.set_velocity_at(Velocity::ZERO, now);
            return false;
        }
        if step.velocity != self.effective_velocity {
            tracing::trace!(axis = ?step.axis, "effective velocity changed");
            self.effective_velocity = step.velocity;
            self.publish(Change::Velocity(step.velocity));
        }

        let timestamp = self.stamp(Topic::Viewport);
        self.set_viewport(step.viewport.stamped(&self.client_id, timestamp));
        if self.effective_velocity != self.sent_velocity && self.velocity_throttle.admit_at(now) {
            self.send_velocity(self.effective_velocity);
        }
        if self.viewport_throttle.admit_at(now) {
            self.send_viewport_update();
        }
        true
    }

    // -------------------------------------------------------------------------
    // layers / animations / bounds
    // -------------------------------------------------------------------------

    /// Show or hide one layer.
    ///
    /// # Errors
    ///
    /// [`SyncError::Rest`] when the `PATCH` fallback fails (reverted).
    pub async fn set_layer(&mut self, layer_id: &str, enabled: bool) -> Result<(), SyncError> {
        let started = self.begin_set_layer(layer_id, enabled);
        self.drive(started).await.map(|_| ())
    }

    pub(crate) fn begin_set_layer(&mut self, layer_id: &str, enabled: bool) -> Started {
        let previous = self.layers.get(layer_id).copied();
        if previous == Some(enabled) {
            return Started::Done(Outcome::Accepted);
        }
        let mut next = self.layers.clone();
        next.insert(layer_id.to_owned(), enabled);
        self.replace_layers(next);

        let toggle = self.toggle(Topic::LayerGroups, layer_id, enabled);
        if self.backend.send(&Message::LayerUpdate(toggle)) {
            return Started::Done(Outcome::Accepted);
        }
        Started::Pending(Pending::Patch {
            patch: StatePatch::layers(self.layers.clone()),
            revert: Revert::Layer { id: layer_id.to_owned(), previous, applied: enabled },
        })
    }

    /// Flip one animation; returns its new state.
    ///
    /// # Errors
    ///
    /// [`SyncError::Rest`] when the `PATCH` fallback fails (reverted).
    pub async fn toggle_animation(&mut self, animation_id: &str) -> Result<bool, SyncError> {
        let started = self.begin_toggle_animation(animation_id);
        let enabled = self.animations.get(animation_id).copied().unwrap_or(false);
        self.drive(started).await?;
        Ok(enabled)
    }

    pub(crate) fn begin_toggle_animation(&mut self, animation_id: &str) -> Started {
        let previous = self.animations.get(animation_id).copied();
        let enabled = !previous.unwrap_or(false);
        let mut next = self.animations.clone();
        next.insert(animation_id.to_owned(), enabled);
        self.replace_animations(next);

        let toggle = self.toggle(Topic::Animations, animation_id, enabled);
        if self.backend.send(&Message::AnimationToggle(toggle)) {
            return Started::Done(Outcome::Accepted);
        }
        Started::Pending(Pending::Patch {
            patch: StatePatch::animations(self.animations.clone()),
            revert: Revert::Animation { id: animation_id.to_owned(), previous, applied: enabled },
        })
    }

    fn toggle(&mut self, topic: Topic, id: &str, enabled: bool) -> LayerToggle {
        let timestamp = self.stamp(topic);
        LayerToggle {
            layer_id: id.to_owned(),
            enabled,
            source_id: Some(self.client_id.clone()),
            timestamp: Some(timestamp),
        }
    }

    /// Save a new fence polygon and adopt the server's normalized version.
    ///
    /// Self-intersecting polygons are saved with a warning.
    ///
    /// # Errors
    ///
    /// [`SyncError::InvalidBounds`] before any request, or
    /// [`SyncError::Rest`]; the current fence is untouched on failure.
    pub async fn save_bounds(&mut self, polygon: BoundsPolygon) -> Result<BoundsPolygon, SyncError> {
        let pending = self.begin_save_bounds(polygon)?;
        self.drive(Started::Pending(pending)).await?;
        Ok(self.bounds.clone())
    }

    pub(crate) fn begin_save_bounds(&mut self, polygon: BoundsPolygon) -> Result<Pending, SyncError> {
        polygon.validate()?;
        if polygon.has_self_intersection() {
            tracing::warn!(vertices = polygon.vertices().len(), "saving self-intersecting bounds polygon");
        }
        self.stamp(Topic::Bounds);
        Ok(Pending::SaveBounds(polygon))
    }

    // -------------------------------------------------------------------------
    // helpers
    // -------------------------------------------------------------------------

    /// Current time, recorded as our latest local write on `topic`.
    fn stamp(&mut self, topic: Topic) -> i64 {
        let now = (self.clock)();
        self.last_local_ts.insert(topic, now);
        now
    }

    fn publish(&self, change: Change) {
        self.subscribers.notify(&change);
    }
}

/// `map` with `id` put back to `previous` (removed when it was absent).
fn restored(map: &LayerState, id: String, previous: Option<bool>) -> LayerState {
    let mut next = map.clone();
    match previous {
        Some(value) => next.insert(id, value),
        None => next.remove(&id),
    };
    next
}

fn topic_of(msg: &Message) -> Topic {
    match msg {
        Message::ViewportUpdate(_) | Message::ViewportChanged(_) => Topic::Viewport,
        Message::LayerUpdate(_) | Message::LayersChanged(_) => Topic::LayerGroups,
        Message::AnimationToggle(_) | Message::AnimationChanged(_) => Topic::Animations,
        Message::BoundsChanged(_) => Topic::Bounds,
        Message::VelocityUpdate(_) | Message::VelocitySync(_) => Topic::Velocity,
    }
}

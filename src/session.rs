//! Session event loop.
//!
//! DESIGN
//! ======
//! One spawned task owns the [`Coordinator`] and multiplexes everything
//! that can change it with `tokio::select!`:
//!
//! - socket events (connect, disconnect, decoded frames)
//! - UI [`Gesture`]s from the [`SessionHandle`]
//! - the pan hold-repeat timer
//! - the zoom slider debounce deadline
//! - the motion frame interval, armed only while our velocity is non-zero
//!
//! Because the task is the only owner, coordinator state needs no locking.
//!
//! No handler awaits the server. A local action applies its optimistic
//! state in the handler and hands the request to a `JoinSet`; completions
//! come back as one more `select!` branch and are adopted or reverted
//! there. A slow REST call therefore never delays inbound frames, motion,
//! or shutdown. On exit the in-flight requests are aborted and the
//! coordinator is dropped, which drops the socket and stops the reconnect
//! loop.

#[cfg(test)]
#[path = "session_test.rs"]
mod tests;

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{mpsc, oneshot};
use tokio::task::{JoinError, JoinHandle, JoinSet};
use tokio::time::MissedTickBehavior;
use viewport::{BoundsPolygon, Direction, Velocity, Viewport};
use wire::{Message, MessageKind};

use crate::SyncError;
use crate::backend::RemoteBackend;
use crate::config::SyncConfig;
use crate::coordinator::{Completed, Coordinator, Outcome, Pending, Started, SyncBackend};
use crate::rate_limit::{Debouncer, HoldRepeater, joystick_to_velocity};
use crate::subscribers::{Change, Topic};
use crate::transport::{Dispatcher, SocketEvent};

/// Floor for timer periods; a zero period would spin or panic `interval`.
const MIN_PERIOD: Duration = Duration::from_millis(1);

/// A UI input, already decoded from whatever widget produced it.
#[derive(Debug, Clone, PartialEq)]
pub enum Gesture {
    PanPress(Direction),
    PanRelease,
    /// Stick deflection in screen space, each axis in `[-1, 1]`.
    Joystick { x: f64, y: f64 },
    JoystickRelease,
    ZoomSlider(u8),
    ZoomStep(i8),
    PushViewport(Viewport),
    SetLayer { id: String, enabled: bool },
    ToggleAnimation { id: String },
    SaveBounds(BoundsPolygon),
}

type Subscription = (Topic, Box<dyn Fn(&Change) + Send>);

pub struct SessionBuilder {
    config: SyncConfig,
    dispatcher: Dispatcher,
    subscriptions: Vec<Subscription>,
}

impl SessionBuilder {
    #[must_use]
    pub fn new(config: SyncConfig) -> Self {
        Self { config, dispatcher: Dispatcher::new(), subscriptions: Vec::new() }
    }

    /// Observe raw frames of one kind before the coordinator sees them.
    #[must_use]
    pub fn on_message<F>(mut self, kind: MessageKind, listener: F) -> Self
    where
        F: Fn(&Message) + Send + 'static,
    {
        self.dispatcher.on(kind, listener);
        self
    }

    #[must_use]
    pub fn on_any_message<F>(mut self, listener: F) -> Self
    where
        F: Fn(&Message) + Send + 'static,
    {
        self.dispatcher.on_any(listener);
        self
    }

    /// Observe coordinator state changes on `topic`.
    #[must_use]
    pub fn subscribe<F>(mut self, topic: Topic, callback: F) -> Self
    where
        F: Fn(&Change) + Send + 'static,
    {
        self.subscriptions.push((topic, Box::new(callback)));
        self
    }

    /// Connect to the table server and start the loop.
    ///
    /// A failed initial fetch is logged, not fatal: the snapshot is fetched
    /// again on every socket connect.
    ///
    /// # Errors
    ///
    /// [`SyncError::Config`] or [`SyncError::Rest`] when the backend cannot
    /// be built.
    pub async fn start(self) -> Result<SessionHandle, SyncError> {
        let (backend, events) = RemoteBackend::connect(&self.config)?;
        let mut coordinator = Coordinator::new(backend, &self.config);
        if let Err(e) = coordinator.resync().await {
            tracing::warn!(error = %e, "initial state fetch failed; waiting for socket");
        }
        Ok(self.start_with(coordinator, events))
    }

    /// Start the loop around an existing coordinator.
    pub fn start_with<B>(self, mut coordinator: Coordinator<B>, events: mpsc::UnboundedReceiver<SocketEvent>) -> SessionHandle
    where
        B: SyncBackend + 'static,
    {
        for (topic, callback) in self.subscriptions {
            coordinator.subscribe(topic, callback);
        }
        let (gestures_tx, gestures_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        let session = Session {
            backend: coordinator.shared_backend(),
            coordinator,
            dispatcher: self.dispatcher,
            in_flight: JoinSet::new(),
            repeater: HoldRepeater::new(self.config.pan_repeat.max(MIN_PERIOD)),
            zoom: Debouncer::new(self.config.zoom_debounce),
            joystick_max_speed: self.config.joystick_max_speed,
            frame_interval: self.config.frame_interval.max(MIN_PERIOD),
            last_frame: None,
        };
        let task = tokio::spawn(session.run(events, gestures_rx, shutdown_rx));

        SessionHandle { gestures: gestures_tx, shutdown: Some(shutdown_tx), task }
    }
}

/// Control side of a running session.
pub struct SessionHandle {
    gestures: mpsc::UnboundedSender<Gesture>,
    shutdown: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl SessionHandle {
    /// Queue a gesture; `false` once the loop has stopped.
    pub fn send(&self, gesture: Gesture) -> bool {
        self.gestures.send(gesture).is_ok()
    }

    /// Stop the loop, disconnect, and wait for the task to finish.
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Err(e) = (&mut self.task).await {
            tracing::warn!(error = %e, "session task ended abnormally");
        }
    }
}

struct Session<B> {
    coordinator: Coordinator<B>,
    backend: Arc<B>,
    dispatcher: Dispatcher,
    in_flight: JoinSet<Completed>,
    repeater: HoldRepeater<Direction>,
    zoom: Debouncer<u8>,
    joystick_max_speed: f64,
    frame_interval: Duration,
    last_frame: Option<Instant>,
}

impl<B: SyncBackend + 'static> Session<B> {
    async fn run(
        mut self,
        mut events: mpsc::UnboundedReceiver<SocketEvent>,
        mut gestures: mpsc::UnboundedReceiver<Gesture>,
        mut shutdown: oneshot::Receiver<()>,
    ) {
        let mut frames = tokio::time::interval(self.frame_interval);
        frames.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut events_open = true;

        loop {
            let moving = !self.coordinator.velocity().is_zero();
            tokio::select! {
                _ = &mut shutdown => break,
                event = events.recv(), if events_open => match event {
                    Some(event) => self.on_socket(event),
                    None => events_open = false,
                },
                gesture = gestures.recv() => match gesture {
                    Some(gesture) => self.on_gesture(gesture),
                    None => break,
                },
                Some(joined) = self.in_flight.join_next(), if !self.in_flight.is_empty() => {
                    self.on_completed(joined);
                }
                () = sleep_until(self.repeater.next_due()) => {
                    if let Some(direction) = self.repeater.poll() {
                        self.pan(direction);
                    }
                }
                () = sleep_until(self.zoom.deadline()) => {
                    if let Some(level) = self.zoom.take_due() {
                        let started = self.coordinator.begin_zoom(level);
                        self.start("zoom", started);
                    }
                }
                _ = frames.tick(), if moving => self.on_frame(),
            }
        }
        if !self.in_flight.is_empty() {
            tracing::debug!(requests = self.in_flight.len(), "aborting in-flight requests");
        }
        self.in_flight.shutdown().await;
        tracing::info!("session stopped");
    }

    fn on_socket(&mut self, event: SocketEvent) {
        match event {
            SocketEvent::Connected => {
                if let Some(resync) = self.coordinator.set_connected(true) {
                    self.spawn(resync);
                }
            }
            SocketEvent::Disconnected => {
                let _ = self.coordinator.set_connected(false);
            }
            SocketEvent::Message(msg) => {
                self.dispatcher.dispatch(&msg);
                let reconciliation = self.coordinator.handle_message(&msg);
                tracing::trace!(kind = %msg.kind(), ?reconciliation, "frame reconciled");
            }
        }
    }

    fn on_gesture(&mut self, gesture: Gesture) {
        match gesture {
            Gesture::PanPress(direction) => {
                let direction = self.repeater.press(direction);
                self.pan(direction);
            }
            Gesture::PanRelease => self.repeater.release(),
            Gesture::Joystick { x, y } => {
                self.set_velocity(joystick_to_velocity(x, y, self.joystick_max_speed));
            }
            Gesture::JoystickRelease => self.set_velocity(Velocity::ZERO),
            Gesture::ZoomSlider(level) => self.zoom.push(level),
            Gesture::ZoomStep(step) => {
                let started = self.coordinator.begin_zoom_step(step);
                self.start("zoom step", started);
            }
            Gesture::PushViewport(viewport) => {
                let started = self.coordinator.begin_push_local_viewport_at(viewport, Instant::now());
                self.start("viewport push", Ok(started));
            }
            Gesture::SetLayer { id, enabled } => {
                let started = self.coordinator.begin_set_layer(&id, enabled);
                self.start("layer change", Ok(started));
            }
            Gesture::ToggleAnimation { id } => {
                let started = self.coordinator.begin_toggle_animation(&id);
                self.start("animation toggle", Ok(started));
            }
            Gesture::SaveBounds(polygon) => {
                let started = self.coordinator.begin_save_bounds(polygon).map(Started::Pending);
                self.start("bounds save", started);
            }
        }
    }

    fn pan(&mut self, direction: Direction) {
        let started = self.coordinator.begin_pan(direction);
        self.start("pan", started);
    }

    fn start(&mut self, action: &'static str, started: Result<Started, SyncError>) {
        match started {
            Ok(Started::Pending(pending)) => self.spawn(pending),
            Ok(Started::Done(Outcome::Accepted)) => {}
            Ok(Started::Done(Outcome::Rejected(reason))) => tracing::debug!(action, %reason, "rejected locally"),
            Err(e) => tracing::warn!(action, error = %e, "action failed"),
        }
    }

    fn spawn(&mut self, pending: Pending) {
        let backend = Arc::clone(&self.backend);
        self.in_flight.spawn(async move { pending.execute(backend.as_ref()).await });
    }

    fn on_completed(&mut self, joined: Result<Completed, JoinError>) {
        match joined {
            Ok(completed) => {
                if let Err(e) = self.coordinator.finish(completed) {
                    tracing::warn!(error = %e, "server round trip failed");
                }
            }
            Err(e) => tracing::warn!(error = %e, "request task ended abnormally"),
        }
    }

    fn set_velocity(&mut self, velocity: Velocity) {
        if velocity.is_zero() {
            self.last_frame = None;
        } else if self.last_frame.is_none() {
            self.last_frame = Some(Instant::now());
        }
        self.coordinator.set_velocity(velocity);
    }

    fn on_frame(&mut self) {
        let now = Instant::now();
        let dt = self.last_frame.map_or(self.frame_interval, |last| now.saturating_duration_since(last));
        self.last_frame = Some(now);
        if !self.coordinator.tick_at(dt, now) {
            self.last_frame = None;
        }
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(tokio::time::Instant::from_std(deadline)).await,
        None => std::future::pending().await,
    }
}

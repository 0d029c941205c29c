//! Client-side sync for the shared projection table.
//!
//! Several clients (the GIS map, the floor projection, the remote
//! controller) view the same planar area of the table. Each keeps a local
//! copy of the shared state and converges on the server's broadcasts.
//!
//! ## Module layout
//!
//! | Module | Role |
//! |--------|------|
//! | [`config`] | `SyncConfig` from `OTEF_*` environment variables |
//! | [`rate_limit`] | Hold-repeat, throttle, debounce, joystick mapping |
//! | [`transport`] | Reconnecting socket, frame dispatch, REST client |
//! | [`subscribers`] | Topic-based change notification |
//! | [`coordinator`] | Local state cache: echo, staleness, guard, optimistic apply |
//! | [`backend`] | Socket + REST implementation of `SyncBackend` |
//! | [`session`] | Event loop owning the coordinator; UI gestures in |

pub mod backend;
pub mod config;
pub mod coordinator;
pub mod rate_limit;
pub mod session;
pub mod subscribers;
pub mod transport;

pub use backend::RemoteBackend;
pub use config::{ConfigError, SyncConfig};
pub use coordinator::{Coordinator, Outcome, Reconciliation, SyncBackend};
pub use session::{Gesture, SessionBuilder, SessionHandle};
pub use subscribers::{Change, SubscriptionId, Topic};
pub use transport::{RestClient, RestError, SocketError};

/// Error returned by coordinator and session operations.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// No state snapshot has been loaded yet.
    #[error("no state loaded yet")]
    NotInitialized,
    #[error("invalid bounds polygon: {0}")]
    InvalidBounds(#[from] viewport::ViewportError),
    #[error(transparent)]
    Rest(#[from] RestError),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

//! Transport to the table server: a reconnecting WebSocket plus REST calls.
//!
//! | Module | Role |
//! |--------|------|
//! | [`socket`] | Reconnecting duplex channel carrying [`wire::Message`] frames |
//! | [`dispatch`] | Per-kind listener registry for decoded frames |
//! | [`rest`] | State fetch/patch, viewport commands, bounds save |

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;

pub mod dispatch;
pub mod rest;
pub mod socket;

use std::time::Duration;

pub use dispatch::Dispatcher;
pub use rest::RestClient;
pub use socket::{Backoff, SocketClient, SocketEvent};

/// Error returned by REST calls.
#[derive(Debug, thiserror::Error)]
pub enum RestError {
    /// Network failure, timeout, or client construction error.
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// The server answered with a non-success status.
    #[error("server returned {status}: {message}")]
    Status { status: u16, message: String },
    /// The server answered 2xx with a body that does not fit the protocol.
    #[error("unexpected response: {0}")]
    Decode(#[from] wire::CodecError),
}

/// Error surfaced by the socket connection loop.
#[derive(Debug, thiserror::Error)]
pub enum SocketError {
    #[error("websocket connect failed: {0}")]
    Connect(Box<tokio_tungstenite::tungstenite::Error>),
    #[error("websocket transport error: {0}")]
    Transport(Box<tokio_tungstenite::tungstenite::Error>),
    #[error("websocket closed")]
    Closed,
}

/// Exponential backoff: `min(base · 2^attempt, max)`, saturating.
#[must_use]
pub fn reconnect_delay(attempt: u32, base: Duration, max: Duration) -> Duration {
    let factor = 2u32.checked_pow(attempt).unwrap_or(u32::MAX);
    base.checked_mul(factor).unwrap_or(Duration::MAX).min(max)
}

//! Reconnecting WebSocket client.
//!
//! `SocketClient::connect` spawns one task that owns the connection: it
//! dials, pumps frames both ways until the socket drops, then sleeps on the
//! backoff schedule and dials again. Decoded inbound frames and connection
//! transitions arrive on the returned event channel.
//!
//! Outgoing sends never buffer across a disconnect. `send` refuses while
//! disconnected, and anything still queued when a new connection opens is
//! discarded before forwarding starts.

#[cfg(test)]
#[path = "socket_test.rs"]
mod tests;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use wire::Message;

use super::{SocketError, reconnect_delay};
use crate::config::SyncConfig;

/// Something the connection task observed.
#[derive(Debug, Clone, PartialEq)]
pub enum SocketEvent {
    Connected,
    Disconnected,
    Message(Message),
}

/// Reconnect schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    pub base: Duration,
    pub max: Duration,
    /// `None` retries forever.
    pub max_attempts: Option<u32>,
}

impl Backoff {
    #[must_use]
    pub fn from_config(config: &SyncConfig) -> Self {
        Self {
            base: config.reconnect_base,
            max: config.reconnect_max,
            max_attempts: config.reconnect_max_attempts,
        }
    }
}

/// Handle to the connection task.
pub struct SocketClient {
    outgoing: mpsc::UnboundedSender<String>,
    connected: Arc<AtomicBool>,
    task: JoinHandle<()>,
}

impl SocketClient {
    /// Spawn the connection task; events arrive on the returned receiver.
    #[must_use]
    pub fn connect(url: String, backoff: Backoff) -> (Self, mpsc::UnboundedReceiver<SocketEvent>) {
        let (outgoing, outgoing_rx) = mpsc::unbounded_channel();
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let connected = Arc::new(AtomicBool::new(false));

        let task = tokio::spawn(run(url, backoff, outgoing_rx, events_tx, Arc::clone(&connected)));

        (Self { outgoing, connected, task }, events_rx)
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    /// Queue a frame for the live connection.
    ///
    /// Returns `false` without buffering when disconnected or when the frame
    /// cannot be encoded.
    pub fn send(&self, msg: &Message) -> bool {
        if !self.is_connected() {
            tracing::debug!(kind = %msg.kind(), "socket send skipped: disconnected");
            return false;
        }
        let text = match wire::encode_message(msg) {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(error = %e, kind = %msg.kind(), "socket send skipped: encode failed");
                return false;
            }
        };
        self.outgoing.send(text).is_ok()
    }

    /// Stop reconnecting and close the socket. No events follow.
    pub fn disconnect(&self) {
        self.task.abort();
        self.connected.store(false, Ordering::Release);
    }
}

impl Drop for SocketClient {
    fn drop(&mut self) {
        self.task.abort();
    }
}

enum Ended {
    /// Socket dropped; reconnect.
    Lost(SocketError),
    /// Client handle or event receiver is gone; exit.
    Shutdown,
}

async fn run(
    url: String,
    backoff: Backoff,
    mut outgoing: mpsc::UnboundedReceiver<String>,
    events: mpsc::UnboundedSender<SocketEvent>,
    connected: Arc<AtomicBool>,
) {
    let mut attempt: u32 = 0;

    loop {
        match connect_async(url.as_str()).await {
            Ok((stream, _)) => {
                attempt = 0;
                while outgoing.try_recv().is_ok() {}
                connected.store(true, Ordering::Release);
                tracing::info!(%url, "socket connected");
                if events.send(SocketEvent::Connected).is_err() {
                    return;
                }

                let ended = pump(stream, &mut outgoing, &events).await;
                connected.store(false, Ordering::Release);
                match ended {
                    Ended::Shutdown => {
                        tracing::debug!("socket task shutting down");
                        return;
                    }
                    Ended::Lost(e) => tracing::warn!(error = %e, "socket disconnected"),
                }
                if events.send(SocketEvent::Disconnected).is_err() {
                    return;
                }
            }
            Err(e) => {
                let e = SocketError::Connect(Box::new(e));
                tracing::warn!(error = %e, attempt, "socket connect failed");
            }
        }

        if let Some(max) = backoff.max_attempts {
            if attempt >= max {
                tracing::warn!(attempts = attempt, "socket reconnect attempts exhausted");
                return;
            }
        }
        let delay = reconnect_delay(attempt, backoff.base, backoff.max);
        attempt = attempt.saturating_add(1);
        tracing::info!(delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX), attempt, "socket reconnecting");
        tokio::time::sleep(delay).await;
    }
}

async fn pump<S>(
    stream: tokio_tungstenite::WebSocketStream<S>,
    outgoing: &mut mpsc::UnboundedReceiver<String>,
    events: &mpsc::UnboundedSender<SocketEvent>,
) -> Ended
where
    S: tokio::io::AsyncRead + tokio::io::AsyncWrite + Unpin,
{
    let (mut write, mut read) = stream.split();

    loop {
        tokio::select! {
            out = outgoing.recv() => {
                let Some(text) = out else {
                    let _ = write.close().await;
                    return Ended::Shutdown;
                };
                if let Err(e) = write.send(WsMessage::Text(text.into())).await {
                    return Ended::Lost(SocketError::Transport(Box::new(e)));
                }
            }
            incoming = read.next() => match incoming {
                Some(Ok(WsMessage::Text(text))) => match wire::decode_message(&text) {
                    Ok(msg) => {
                        if events.send(SocketEvent::Message(msg)).is_err() {
                            let _ = write.close().await;
                            return Ended::Shutdown;
                        }
                    }
                    Err(e) => tracing::warn!(error = %e, "dropping malformed socket message"),
                },
                Some(Ok(WsMessage::Close(_))) | None => return Ended::Lost(SocketError::Closed),
                Some(Ok(_)) => {}
                Some(Err(e)) => return Ended::Lost(SocketError::Transport(Box::new(e))),
            },
        }
    }
}

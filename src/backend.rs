//! Production [`SyncBackend`]: the reconnecting socket plus the REST client.

#[cfg(test)]
#[path = "backend_test.rs"]
mod tests;

use async_trait::async_trait;
use tokio::sync::mpsc;
use viewport::{BoundsPolygon, Viewport};
use wire::{Message, StatePatch, StateSnapshot, ViewportCommand};

use crate::SyncError;
use crate::config::SyncConfig;
use crate::coordinator::SyncBackend;
use crate::transport::{Backoff, RestClient, RestError, SocketClient, SocketEvent};

pub struct RemoteBackend {
    socket: Option<SocketClient>,
    rest: RestClient,
}

impl RemoteBackend {
    /// Start the socket task and build the REST client.
    ///
    /// # Errors
    ///
    /// [`SyncError::Config`] for a bad base URL, [`SyncError::Rest`] if the
    /// HTTP client cannot be built.
    pub fn connect(config: &SyncConfig) -> Result<(Self, mpsc::UnboundedReceiver<SocketEvent>), SyncError> {
        let url = config.ws_url()?;
        let rest = RestClient::new(config)?;
        tracing::info!(%url, table = %config.table, "connecting to table server");
        let (socket, events) = SocketClient::connect(url, Backoff::from_config(config));
        Ok((Self { socket: Some(socket), rest }, events))
    }

    /// REST only; every send reports the socket as down.
    ///
    /// # Errors
    ///
    /// [`SyncError::Rest`] if the HTTP client cannot be built.
    pub fn rest_only(config: &SyncConfig) -> Result<Self, SyncError> {
        Ok(Self { socket: None, rest: RestClient::new(config)? })
    }

    #[must_use]
    pub fn rest(&self) -> &RestClient {
        &self.rest
    }

    /// Stop reconnecting and close the socket.
    pub fn disconnect(&self) {
        if let Some(socket) = &self.socket {
            socket.disconnect();
        }
    }
}

#[async_trait]
impl SyncBackend for RemoteBackend {
    async fn fetch_state(&self) -> Result<StateSnapshot, RestError> {
        self.rest.fetch_state().await
    }

    async fn patch_state(&self, patch: &StatePatch) -> Result<StateSnapshot, RestError> {
        self.rest.patch_state(patch).await
    }

    async fn execute_command(&self, command: &ViewportCommand) -> Result<Viewport, RestError> {
        self.rest.execute_command(command).await
    }

    async fn save_bounds(&self, polygon: &BoundsPolygon) -> Result<BoundsPolygon, RestError> {
        self.rest.save_bounds(polygon).await
    }

    fn send(&self, msg: &Message) -> bool {
        self.socket.as_ref().is_some_and(|s| s.send(msg))
    }
}

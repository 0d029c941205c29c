//! REST calls against the per-table state resource.
//!
//! ERROR HANDLING
//! ==============
//! Every call resolves to a parsed body or a [`RestError`]. Error bodies are
//! often not JSON (a gateway HTML page, a plain-text trace), so the message
//! is pulled from a JSON `error`/`detail`/`message` field, else the HTML
//! `<title>`, else the first 200 characters of the body.

#[cfg(test)]
#[path = "rest_test.rs"]
mod tests;

use serde::Deserialize;
use serde_json::Value;
use viewport::{BoundsPolygon, Viewport};
use wire::{BoundsSave, CodecError, StatePatch, StateSnapshot, ViewportCommand};

use super::RestError;
use crate::config::SyncConfig;

const ERROR_BODY_LIMIT: usize = 200;

#[derive(Debug, Clone)]
pub struct RestClient {
    http: reqwest::Client,
    state_url: String,
}

impl RestClient {
    /// Build a client with the configured request timeout.
    ///
    /// # Errors
    ///
    /// Returns [`RestError::Http`] if the HTTP client cannot be constructed.
    pub fn new(config: &SyncConfig) -> Result<Self, RestError> {
        let http = reqwest::Client::builder().timeout(config.request_timeout).build()?;
        Ok(Self { http, state_url: config.state_url() })
    }

    #[must_use]
    pub fn state_url(&self) -> &str {
        &self.state_url
    }

    /// `GET` the full state snapshot.
    ///
    /// # Errors
    ///
    /// Network, status, or body-shape failure.
    pub async fn fetch_state(&self) -> Result<StateSnapshot, RestError> {
        let body = self.send(self.http.get(&self.state_url)).await?;
        decode(&body)
    }

    /// `PATCH` a partial state; returns the updated snapshot.
    ///
    /// # Errors
    ///
    /// Network, status, or body-shape failure.
    pub async fn patch_state(&self, patch: &StatePatch) -> Result<StateSnapshot, RestError> {
        let body = self.send(self.http.patch(&self.state_url).json(patch)).await?;
        decode(&body)
    }

    /// `POST` a pan/zoom command; returns the server-computed viewport.
    ///
    /// # Errors
    ///
    /// Network, status, or body-shape failure.
    pub async fn execute_command(&self, command: &ViewportCommand) -> Result<Viewport, RestError> {
        let url = format!("{}command/", self.state_url);
        tracing::debug!(action = command.action(), "posting viewport command");
        let body = self.send(self.http.post(url).json(command)).await?;
        Ok(wire::decode_viewport_response(&body)?)
    }

    /// `POST` a bounds polygon; returns the normalized polygon to adopt.
    ///
    /// # Errors
    ///
    /// Network, status, or body-shape failure.
    pub async fn save_bounds(&self, polygon: &BoundsPolygon) -> Result<BoundsPolygon, RestError> {
        let url = format!("{}bounds/", self.state_url);
        let request = BoundsSave { bounds_polygon: polygon.clone() };
        let body = self.send(self.http.post(url).json(&request)).await?;
        Ok(wire::decode_bounds_response(&body)?)
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<Value, RestError> {
        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            let message = error_message(&text);
            tracing::warn!(status = status.as_u16(), %message, "rest call failed");
            return Err(RestError::Status { status: status.as_u16(), message });
        }
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&text).map_err(|e| RestError::Decode(CodecError::Json(e)))
    }
}

fn decode<T: for<'de> Deserialize<'de>>(body: &Value) -> Result<T, RestError> {
    T::deserialize(body).map_err(|e| RestError::Decode(CodecError::Response(e.to_string())))
}

/// Readable message from an error body of unknown shape.
pub(crate) fn error_message(body: &str) -> String {
    if let Ok(Value::Object(obj)) = serde_json::from_str::<Value>(body) {
        for key in ["error", "detail", "message"] {
            match obj.get(key) {
                Some(Value::String(s)) => return s.clone(),
                Some(Value::Null) | None => {}
                Some(other) => return other.to_string(),
            }
        }
    }
    if let Some(title) = html_title(body) {
        return title;
    }
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return "empty response body".to_owned();
    }
    if trimmed.chars().count() > ERROR_BODY_LIMIT {
        let head: String = trimmed.chars().take(ERROR_BODY_LIMIT).collect();
        return format!("{head}...");
    }
    trimmed.to_owned()
}

fn html_title(body: &str) -> Option<String> {
    // ASCII lowercasing keeps byte offsets aligned with `body`.
    let lower = body.to_ascii_lowercase();
    let open = lower.find("<title")?;
    let start = open + lower[open..].find('>')? + 1;
    let end = start + lower[start..].find("</title>")?;
    let title = body[start..end].trim();
    (!title.is_empty()).then(|| title.to_owned())
}

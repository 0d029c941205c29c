//! Session configuration parsed from environment variables.
//!
//! Every knob has a typed default; unparsable values fall back to the
//! default rather than failing startup. So do zero timer periods and
//! non-finite or non-positive speeds and fractions, which would otherwise
//! stall or spin the session loop. Only the base URL is validated, when
//! the WebSocket URL is derived from it.

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;

use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8000";
pub const DEFAULT_TABLE: &str = "otef";
pub const DEFAULT_WS_PATH: &str = "/ws/otef/{table}/";
pub const DEFAULT_RECONNECT_BASE_MS: u64 = 3000;
pub const DEFAULT_RECONNECT_MAX_MS: u64 = 30_000;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_STALENESS_MS: u64 = 200;
pub const DEFAULT_PAN_REPEAT_MS: u64 = 150;
pub const DEFAULT_PAN_DELTA: f64 = 0.15;
pub const DEFAULT_JOYSTICK_WINDOW_MS: u64 = 150;
pub const DEFAULT_ZOOM_DEBOUNCE_MS: u64 = 100;
pub const DEFAULT_MAX_STEP_MS: u64 = 100;
pub const DEFAULT_FRAME_INTERVAL_MS: u64 = 16;
pub const DEFAULT_INTERACTION_GUARD_MS: u64 = 500;
pub const DEFAULT_JOYSTICK_MAX_SPEED: f64 = 500.0;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid base URL (expected http:// or https://): {0}")]
    InvalidBaseUrl(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SyncConfig {
    /// HTTP origin of the table server, e.g. `http://127.0.0.1:8000`.
    pub base_url: String,
    /// Table name; selects the REST resource and the socket channel.
    pub table: String,
    /// Socket path template; `{table}` is substituted.
    pub ws_path: String,
    pub reconnect_base: Duration,
    pub reconnect_max: Duration,
    /// `None` retries forever.
    pub reconnect_max_attempts: Option<u32>,
    pub request_timeout: Duration,
    /// Remote changes older than the last local write by more than this are dropped.
    pub staleness: Duration,
    pub pan_repeat: Duration,
    /// Fraction of the viewport extent moved per pan step.
    pub pan_delta: f64,
    pub joystick_window: Duration,
    pub zoom_debounce: Duration,
    pub max_step: Duration,
    pub frame_interval: Duration,
    pub interaction_guard: Duration,
    /// Planar units per second at full joystick deflection.
    pub joystick_max_speed: f64,
}

impl SyncConfig {
    /// Defaults for `base_url` and `table`, ignoring the environment.
    #[must_use]
    pub fn new(base_url: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            table: table.into(),
            ws_path: DEFAULT_WS_PATH.to_owned(),
            reconnect_base: Duration::from_millis(DEFAULT_RECONNECT_BASE_MS),
            reconnect_max: Duration::from_millis(DEFAULT_RECONNECT_MAX_MS),
            reconnect_max_attempts: None,
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            staleness: Duration::from_millis(DEFAULT_STALENESS_MS),
            pan_repeat: Duration::from_millis(DEFAULT_PAN_REPEAT_MS),
            pan_delta: DEFAULT_PAN_DELTA,
            joystick_window: Duration::from_millis(DEFAULT_JOYSTICK_WINDOW_MS),
            zoom_debounce: Duration::from_millis(DEFAULT_ZOOM_DEBOUNCE_MS),
            max_step: Duration::from_millis(DEFAULT_MAX_STEP_MS),
            frame_interval: Duration::from_millis(DEFAULT_FRAME_INTERVAL_MS),
            interaction_guard: Duration::from_millis(DEFAULT_INTERACTION_GUARD_MS),
            joystick_max_speed: DEFAULT_JOYSTICK_MAX_SPEED,
        }
    }

    /// Build config from `OTEF_*` environment variables.
    ///
    /// Optional (defaults in parentheses):
    /// - `OTEF_BASE_URL` (`http://127.0.0.1:8000`), `OTEF_TABLE` (`otef`)
    /// - `OTEF_WS_PATH` (`/ws/otef/{table}/`)
    /// - `OTEF_RECONNECT_BASE_MS` (3000), `OTEF_RECONNECT_MAX_MS` (30000)
    /// - `OTEF_RECONNECT_MAX_ATTEMPTS` (unset: retry forever)
    /// - `OTEF_REQUEST_TIMEOUT_SECS` (10), `OTEF_STALENESS_MS` (200)
    /// - `OTEF_PAN_REPEAT_MS` (150), `OTEF_PAN_DELTA` (0.15)
    /// - `OTEF_JOYSTICK_WINDOW_MS` (150), `OTEF_ZOOM_DEBOUNCE_MS` (100)
    /// - `OTEF_MAX_STEP_MS` (100), `OTEF_FRAME_INTERVAL_MS` (16)
    /// - `OTEF_INTERACTION_GUARD_MS` (500), `OTEF_JOYSTICK_MAX_SPEED` (500)
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let parse_ms = |key: &str, default: u64| Duration::from_millis(parse_or(&lookup, key, default));
        let parse_period =
            |key: &str, default: u64| Duration::from_millis(parse_valid(&lookup, key, default, |ms| *ms > 0));
        let parse_positive = |key: &str, default: f64| parse_valid(&lookup, key, default, |v| v.is_finite() && *v > 0.0);
        let base_url = lookup("OTEF_BASE_URL")
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_owned());
        let table = lookup("OTEF_TABLE")
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_TABLE.to_owned());

        Self {
            ws_path: lookup("OTEF_WS_PATH")
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| DEFAULT_WS_PATH.to_owned()),
            reconnect_base: parse_period("OTEF_RECONNECT_BASE_MS", DEFAULT_RECONNECT_BASE_MS),
            reconnect_max: parse_ms("OTEF_RECONNECT_MAX_MS", DEFAULT_RECONNECT_MAX_MS),
            reconnect_max_attempts: lookup("OTEF_RECONNECT_MAX_ATTEMPTS").and_then(|v| v.parse().ok()),
            request_timeout: Duration::from_secs(parse_valid(
                &lookup,
                "OTEF_REQUEST_TIMEOUT_SECS",
                DEFAULT_REQUEST_TIMEOUT_SECS,
                |secs| *secs > 0,
            )),
            staleness: parse_ms("OTEF_STALENESS_MS", DEFAULT_STALENESS_MS),
            pan_repeat: parse_period("OTEF_PAN_REPEAT_MS", DEFAULT_PAN_REPEAT_MS),
            pan_delta: parse_positive("OTEF_PAN_DELTA", DEFAULT_PAN_DELTA),
            joystick_window: parse_period("OTEF_JOYSTICK_WINDOW_MS", DEFAULT_JOYSTICK_WINDOW_MS),
            zoom_debounce: parse_ms("OTEF_ZOOM_DEBOUNCE_MS", DEFAULT_ZOOM_DEBOUNCE_MS),
            max_step: parse_period("OTEF_MAX_STEP_MS", DEFAULT_MAX_STEP_MS),
            frame_interval: parse_period("OTEF_FRAME_INTERVAL_MS", DEFAULT_FRAME_INTERVAL_MS),
            interaction_guard: parse_ms("OTEF_INTERACTION_GUARD_MS", DEFAULT_INTERACTION_GUARD_MS),
            joystick_max_speed: parse_positive("OTEF_JOYSTICK_MAX_SPEED", DEFAULT_JOYSTICK_MAX_SPEED),
            ..Self::new(base_url, table)
        }
    }

    /// REST resource for this table: `{base}/api/otef_viewport/by-table/{table}/`.
    #[must_use]
    pub fn state_url(&self) -> String {
        format!("{}/api/otef_viewport/by-table/{}/", self.base_url.trim_end_matches('/'), self.table)
    }

    /// WebSocket URL derived from the HTTP base URL.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidBaseUrl`] unless the base is `http://` or `https://`.
    pub fn ws_url(&self) -> Result<String, ConfigError> {
        let trimmed = self.base_url.trim_end_matches('/');
        let path = self.ws_path.replace("{table}", &self.table);
        let path = if path.starts_with('/') { path } else { format!("/{path}") };

        if let Some(rest) = trimmed.strip_prefix("http://") {
            return Ok(format!("ws://{rest}{path}"));
        }
        if let Some(rest) = trimmed.strip_prefix("https://") {
            return Ok(format!("wss://{rest}{path}"));
        }

        Err(ConfigError::InvalidBaseUrl(self.base_url.clone()))
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL, DEFAULT_TABLE)
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr + Copy,
{
    parse_valid(lookup, key, default, |_| true)
}

/// Like [`parse_or`], but values failing `valid` also fall back.
fn parse_valid<F, T>(lookup: &F, key: &str, default: T, valid: impl Fn(&T) -> bool) -> T
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr + Copy,
{
    let parsed = lookup(key).and_then(|v| v.trim().parse::<T>().ok());
    match parsed {
        Some(value) if valid(&value) => value,
        Some(_) => {
            tracing::warn!(key, "out-of-range config value, using default");
            default
        }
        None => default,
    }
}

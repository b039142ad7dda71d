//! Session configuration.

use std::env;
use std::time::Duration;

/// Backend used when nothing else is configured.
pub const DEFAULT_BACKEND_URL: &str = "http://localhost:8000";

/// Environment variable overriding the backend URL.
pub const BACKEND_URL_ENV: &str = "STRATEGY_BACKEND_URL";

/// How long the channel may stay connecting before a diagnostic warning.
pub const DEFAULT_PROBE_AFTER: Duration = Duration::from_secs(5);

/// Where to connect and how to probe the connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    pub backend_url: String,
    pub probe_after: Duration,
}

impl SessionConfig {
    pub fn new(backend_url: impl Into<String>) -> Self {
        Self {
            backend_url: backend_url.into(),
            probe_after: DEFAULT_PROBE_AFTER,
        }
    }

    /// Read the backend URL from `STRATEGY_BACKEND_URL`, falling back to the default.
    pub fn from_env() -> Self {
        match env::var(BACKEND_URL_ENV) {
            Ok(url) if !url.trim().is_empty() => Self::new(url.trim()),
            _ => Self::default(),
        }
    }

    pub fn with_probe_after(mut self, probe_after: Duration) -> Self {
        self.probe_after = probe_after;
        self
    }

    /// Channel base: `https` becomes `wss`, `http` becomes `ws`.
    pub fn ws_base(&self) -> String {
        let base = self.backend_url.trim_end_matches('/');
        if let Some(rest) = base.strip_prefix("https://") {
            format!("wss://{}", rest)
        } else if let Some(rest) = base.strip_prefix("http://") {
            format!("ws://{}", rest)
        } else {
            base.to_string()
        }
    }

    /// `{ws_base}/ws/{room_code}/{player_id}`
    pub fn channel_url(&self, room_code: &str, player_id: &str) -> String {
        format!("{}/ws/{}/{}", self.ws_base(), room_code, player_id)
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::new(DEFAULT_BACKEND_URL)
    }
}

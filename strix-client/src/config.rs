//! Client configuration.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use strix_core::StreamingPreferences;

/// Top-level configuration for the command-line client.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Host to talk to.
    pub host: HostConfig,
    /// Stream parameters used when launching an app.
    pub stream: StreamingPreferences,
    /// Logging.
    pub logging: LoggingConfig,
}

/// Host settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    /// Host name or IP address (IPv6 without brackets).
    pub address: String,
    /// Client id sent with every request. Must match the id the host was
    /// paired with.
    pub unique_id: String,
    /// Timeout for requests that allow one, in milliseconds.
    pub request_timeout_ms: u64,
    /// PEM file holding the paired client certificate and its key.
    /// Empty connects without one.
    pub identity: String,
}

/// Logging.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level, overridden by `RUST_LOG`.
    pub level: String,
    /// Optional log file. Empty logs to stderr.
    pub file: String,
}

// ── Defaults ─────────────────────────────────────────────────────

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            address: "127.0.0.1".into(),
            unique_id: "0123456789ABCDEF".into(),
            request_timeout_ms: 5000,
            identity: String::new(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            file: String::new(),
        }
    }
}

// ── Loading ──────────────────────────────────────────────────────

/// Where a loaded [`ClientConfig`] came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    File,
    /// No readable file; defaults used.
    Missing,
    /// The file did not parse; defaults used.
    Invalid(String),
}

impl ClientConfig {
    /// Load from a TOML file, falling back to defaults.
    ///
    /// Nothing is logged here since this runs before the subscriber is
    /// installed; the caller reports the [`ConfigSource`].
    pub fn load(path: &Path) -> (Self, ConfigSource) {
        match std::fs::read_to_string(path) {
            Ok(contents) => match toml::from_str(&contents) {
                Ok(config) => (config, ConfigSource::File),
                Err(e) => (Self::default(), ConfigSource::Invalid(e.to_string())),
            },
            Err(_) => (Self::default(), ConfigSource::Missing),
        }
    }

    /// Write the default configuration to `path`.
    pub fn write_default(path: &Path) -> std::io::Result<()> {
        let text = toml::to_string_pretty(&Self::default()).map_err(std::io::Error::other)?;
        std::fs::write(path, text)
    }

    pub fn request_timeout(&self) -> Duration {
        self.host.request_timeout()
    }
}

impl HostConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

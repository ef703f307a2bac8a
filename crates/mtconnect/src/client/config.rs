// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Client configuration.
//!
//! Supports both programmatic and file-based configuration.
//!
//! ```toml
//! agent_url = "http://localhost:5000"
//! device = "VMC-3Axis"
//! mode = "stream"
//! interval_ms = 500
//! heartbeat_ms = 10000
//! count = 1000
//! retry_interval_ms = 5000
//! ```

use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// How observations are collected after the initial current request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SampleMode {
    /// Long-lived `sample?interval=` stream.
    #[default]
    Stream,
    /// Repeated bounded `sample?from=&count=` requests.
    Poll,
    /// Repeated `current` requests.
    Current,
}

/// MTConnect client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Agent base URL, e.g. `http://localhost:5000`.
    #[serde(default = "default_agent_url")]
    pub agent_url: String,

    /// Device name or uuid. All devices when unset.
    #[serde(default)]
    pub device: Option<String>,

    /// Collection mode.
    #[serde(default)]
    pub mode: SampleMode,

    /// Sample interval for streams, poll period otherwise (milliseconds).
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,

    /// Heartbeat the agent sends on an idle stream (milliseconds).
    #[serde(default = "default_heartbeat_ms")]
    pub heartbeat_ms: u64,

    /// Maximum observations per sample document.
    #[serde(default = "default_count")]
    pub count: u64,

    /// Delay before reconnecting after a failure (milliseconds).
    #[serde(default = "default_retry_interval_ms")]
    pub retry_interval_ms: u64,

    /// Timeout for probe, current and asset requests (milliseconds).
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    /// Upper bound on buffered, not yet framed stream bytes.
    #[serde(default = "default_max_buffer_bytes")]
    pub max_buffer_bytes: usize,

    /// XPath filter passed to current and sample requests.
    #[serde(default)]
    pub path: Option<String>,

    /// Fetch assets announced by `AssetChanged` events.
    #[serde(default = "default_true")]
    pub follow_assets: bool,
}

fn default_agent_url() -> String {
    "http://localhost:5000".to_string()
}

fn default_interval_ms() -> u64 {
    500
}

fn default_heartbeat_ms() -> u64 {
    10_000
}

fn default_count() -> u64 {
    1000
}

fn default_retry_interval_ms() -> u64 {
    5000
}

fn default_request_timeout_ms() -> u64 {
    5000
}

fn default_max_buffer_bytes() -> usize {
    8 * 1024 * 1024
}

fn default_true() -> bool {
    true
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            agent_url: default_agent_url(),
            device: None,
            mode: SampleMode::Stream,
            interval_ms: default_interval_ms(),
            heartbeat_ms: default_heartbeat_ms(),
            count: default_count(),
            retry_interval_ms: default_retry_interval_ms(),
            request_timeout_ms: default_request_timeout_ms(),
            max_buffer_bytes: default_max_buffer_bytes(),
            path: None,
            follow_assets: true,
        }
    }
}

impl ClientConfig {
    /// Create a configuration for an agent URL with default settings.
    pub fn new(agent_url: impl Into<String>) -> Self {
        Self {
            agent_url: agent_url.into(),
            ..Default::default()
        }
    }

    /// Load configuration from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let url = Url::parse(&self.agent_url)
            .map_err(|e| ConfigError::Invalid(format!("agent_url {:?}: {}", self.agent_url, e)))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::Invalid(format!(
                "agent_url must be http or https, got {}",
                url.scheme()
            )));
        }
        if url.cannot_be_a_base() {
            return Err(ConfigError::Invalid(format!(
                "agent_url {:?} cannot carry a path",
                self.agent_url
            )));
        }

        if let Some(device) = &self.device {
            if device.trim().is_empty() {
                return Err(ConfigError::Invalid("device must not be empty".into()));
            }
        }

        if self.count == 0 {
            return Err(ConfigError::Invalid("count must be greater than 0".into()));
        }

        if self.mode == SampleMode::Stream && self.heartbeat_ms == 0 {
            return Err(ConfigError::Invalid(
                "heartbeat_ms must be greater than 0 in stream mode".into(),
            ));
        }

        if self.mode != SampleMode::Stream && self.interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "interval_ms must be greater than 0 when polling".into(),
            ));
        }

        if self.max_buffer_bytes < 1024 {
            return Err(ConfigError::Invalid(format!(
                "max_buffer_bytes {} is too small (minimum 1024)",
                self.max_buffer_bytes
            )));
        }

        Ok(())
    }

    /// Set the device.
    pub fn device(mut self, device: impl Into<String>) -> Self {
        self.device = Some(device.into());
        self
    }

    /// Set the collection mode.
    pub fn mode(mut self, mode: SampleMode) -> Self {
        self.mode = mode;
        self
    }

    /// Set the sample interval.
    pub fn interval(mut self, interval: Duration) -> Self {
        self.interval_ms = interval.as_millis() as u64;
        self
    }

    /// Set the stream heartbeat.
    pub fn heartbeat(mut self, heartbeat: Duration) -> Self {
        self.heartbeat_ms = heartbeat.as_millis() as u64;
        self
    }

    /// Set the maximum observations per document.
    pub fn count(mut self, count: u64) -> Self {
        self.count = count;
        self
    }

    /// Set the reconnect delay.
    pub fn retry_interval(mut self, retry: Duration) -> Self {
        self.retry_interval_ms = retry.as_millis() as u64;
        self
    }

    /// Set the XPath filter.
    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Enable or disable asset follow-up requests.
    pub fn follow_assets(mut self, enabled: bool) -> Self {
        self.follow_assets = enabled;
        self
    }

    pub fn interval_duration(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn heartbeat_duration(&self) -> Duration {
        Duration::from_millis(self.heartbeat_ms)
    }

    pub fn retry_duration(&self) -> Duration {
        Duration::from_millis(self.retry_interval_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Time without any stream bytes after which the stream is considered
    /// dead: two heartbeats plus one interval.
    pub fn stream_idle_timeout(&self) -> Duration {
        Duration::from_millis(
            self.heartbeat_ms
                .saturating_mul(2)
                .saturating_add(self.interval_ms),
        )
    }
}

// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Agent request URLs.

use super::config::{ClientConfig, ConfigError};
use reqwest::Url;

/// Builds the probe, current, sample and asset URLs for one agent.
#[derive(Debug, Clone)]
pub struct AgentUrls {
    base: Url,
    device: Option<String>,
    path: Option<String>,
}

impl AgentUrls {
    /// Build from a client configuration.
    pub fn from_config(config: &ClientConfig) -> Result<Self, ConfigError> {
        let base = Url::parse(&config.agent_url)
            .map_err(|e| ConfigError::Invalid(format!("agent_url: {}", e)))?;
        if base.cannot_be_a_base() {
            return Err(ConfigError::Invalid(format!(
                "agent_url {:?} cannot carry a path",
                config.agent_url
            )));
        }
        Ok(Self {
            base,
            device: config.device.clone(),
            path: config.path.clone(),
        })
    }

    /// `/{device}/probe`
    pub fn probe(&self) -> Url {
        self.device_endpoint("probe")
    }

    /// `/{device}/current[?path=]`
    pub fn current(&self) -> Url {
        let mut url = self.device_endpoint("current");
        self.append_path(&mut url);
        url
    }

    /// `/{device}/sample?from=&count=[&interval=&heartbeat=][&path=]`
    ///
    /// `interval` turns the request into a long-lived stream.
    pub fn sample(&self, from: u64, count: u64, stream: Option<StreamTiming>) -> Url {
        let mut url = self.device_endpoint("sample");
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("from", &from.to_string());
            query.append_pair("count", &count.to_string());
            if let Some(timing) = stream {
                query.append_pair("interval", &timing.interval_ms.to_string());
                query.append_pair("heartbeat", &timing.heartbeat_ms.to_string());
            }
        }
        self.append_path(&mut url);
        url
    }

    /// `/assets`
    pub fn assets(&self) -> Url {
        self.endpoint(&["assets"])
    }

    /// `/asset/{id}`
    pub fn asset(&self, asset_id: &str) -> Url {
        self.endpoint(&["asset", asset_id])
    }

    fn device_endpoint(&self, request: &str) -> Url {
        match &self.device {
            Some(device) => self.endpoint(&[device.as_str(), request]),
            None => self.endpoint(&[request]),
        }
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        // from_config rejected cannot-be-a-base URLs
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty();
            path.extend(segments);
        }
        url
    }

    fn append_path(&self, url: &mut Url) {
        if let Some(path) = &self.path {
            url.query_pairs_mut().append_pair("path", path);
        }
    }
}

/// Stream parameters of a sample request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamTiming {
    pub interval_ms: u64,
    pub heartbeat_ms: u64,
}

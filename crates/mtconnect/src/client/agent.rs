// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Request/response access to one agent.
//!
//! # Example
//!
//! ```ignore
//! use mtconnect::client::{AgentClient, ClientConfig};
//!
//! let agent = AgentClient::new(&ClientConfig::new("http://localhost:5000"))?;
//! let devices = agent.probe().await?;
//! let current = agent.current().await?;
//! ```

use super::config::ClientConfig;
use super::request::{AgentUrls, StreamTiming};
use super::scanner::DocumentScanner;
use super::stats::ClientStats;
use super::ClientError;
use crate::model::{AssetsDocument, DevicesDocument, Document, StreamsDocument};
use crate::xml::parse_document;
use reqwest::{Client, Response, Url};
use std::sync::Arc;
use std::time::Duration;

/// HTTP access to an agent's probe, current, sample and asset endpoints.
#[derive(Debug, Clone)]
pub struct AgentClient {
    http: Client,
    urls: AgentUrls,
    request_timeout: Duration,
    idle_timeout: Duration,
    max_buffer_bytes: usize,
    stats: Arc<ClientStats>,
}

impl AgentClient {
    /// Create a client for the agent named in `config`.
    pub fn new(config: &ClientConfig) -> Result<Self, ClientError> {
        Self::with_stats(config, Arc::new(ClientStats::new()))
    }

    /// Create a client that records into shared statistics.
    pub fn with_stats(config: &ClientConfig, stats: Arc<ClientStats>) -> Result<Self, ClientError> {
        config.validate()?;
        let http = Client::builder()
            .connect_timeout(config.request_timeout())
            .user_agent(concat!("mtconnect-rs/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            http,
            urls: AgentUrls::from_config(config)?,
            request_timeout: config.request_timeout(),
            idle_timeout: config.stream_idle_timeout(),
            max_buffer_bytes: config.max_buffer_bytes,
            stats,
        })
    }

    /// Request URL builder.
    pub fn urls(&self) -> &AgentUrls {
        &self.urls
    }

    /// Shared statistics.
    pub fn stats(&self) -> &Arc<ClientStats> {
        &self.stats
    }

    /// Device topology.
    pub async fn probe(&self) -> Result<DevicesDocument, ClientError> {
        match self.fetch(self.urls.probe()).await? {
            Document::Devices(d) => Ok(d),
            other => Err(unexpected("MTConnectDevices", &other)),
        }
    }

    /// Latest value of every data item.
    pub async fn current(&self) -> Result<StreamsDocument, ClientError> {
        self.fetch_streams(self.urls.current()).await
    }

    /// Up to `count` observations starting at `from`.
    pub async fn sample(&self, from: u64, count: u64) -> Result<StreamsDocument, ClientError> {
        self.fetch_streams(self.urls.sample(from, count, None)).await
    }

    /// All assets held by the agent.
    pub async fn assets(&self) -> Result<AssetsDocument, ClientError> {
        self.fetch_assets(self.urls.assets()).await
    }

    /// One asset by id.
    pub async fn asset(&self, asset_id: &str) -> Result<AssetsDocument, ClientError> {
        self.fetch_assets(self.urls.asset(asset_id)).await
    }

    /// Open a long-lived sample stream starting at `from`.
    pub async fn open_stream(
        &self,
        from: u64,
        count: u64,
        timing: StreamTiming,
    ) -> Result<SampleStream, ClientError> {
        let url = self.urls.sample(from, count, Some(timing));
        tracing::debug!(%url, "opening sample stream");

        // No total timeout: the body is open-ended. The response head must
        // arrive within the idle timeout, after that idle detection is done
        // per chunk by the stream.
        let response =
            match tokio::time::timeout(self.idle_timeout, self.http.get(url.clone()).send()).await
            {
                Ok(response) => response?,
                Err(_) => return Err(ClientError::Idle(self.idle_timeout)),
            };
        let response = self.check_status(url, response).await?;

        Ok(SampleStream {
            response,
            scanner: DocumentScanner::new(self.max_buffer_bytes),
            idle_timeout: self.idle_timeout,
            stats: Arc::clone(&self.stats),
            finished: false,
        })
    }

    async fn fetch_streams(&self, url: Url) -> Result<StreamsDocument, ClientError> {
        match self.fetch(url).await? {
            Document::Streams(s) => Ok(s),
            other => Err(unexpected("MTConnectStreams", &other)),
        }
    }

    async fn fetch_assets(&self, url: Url) -> Result<AssetsDocument, ClientError> {
        match self.fetch(url).await? {
            Document::Assets(a) => Ok(a),
            other => Err(unexpected("MTConnectAssets", &other)),
        }
    }

    /// GET a single document. Error documents become `ClientError::Agent`.
    async fn fetch(&self, url: Url) -> Result<Document, ClientError> {
        tracing::debug!(%url, "request");
        let response = self
            .http
            .get(url.clone())
            .timeout(self.request_timeout)
            .send()
            .await?;
        let response = self.check_status(url, response).await?;
        let body = response.text().await?;
        self.stats.record_bytes(body.len());

        let document = parse_document(&body)?;
        self.stats.record_document(observation_count(&document));
        match document {
            Document::Error(e) => Err(ClientError::Agent(Box::new(e))),
            other => Ok(other),
        }
    }

    /// Pass successful responses through. Agents send error documents with
    /// 4xx/5xx statuses; those are decoded so the error code survives.
    async fn check_status(&self, url: Url, response: Response) -> Result<Response, ClientError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        if let Ok(Document::Error(e)) = parse_document(&body) {
            self.stats.record_document(0);
            return Err(ClientError::Agent(Box::new(e)));
        }
        Err(ClientError::Status {
            status: status.as_u16(),
            url: url.to_string(),
        })
    }
}

fn unexpected(expected: &'static str, found: &Document) -> ClientError {
    ClientError::UnexpectedDocument {
        expected,
        found: found.root_name(),
    }
}

fn observation_count(document: &Document) -> usize {
    match document {
        Document::Streams(s) => s.observation_count(),
        _ => 0,
    }
}

/// Open sample stream.
///
/// Reads body chunks, reassembles documents and parses them one by one.
#[derive(Debug)]
pub struct SampleStream {
    response: Response,
    scanner: DocumentScanner,
    idle_timeout: Duration,
    stats: Arc<ClientStats>,
    finished: bool,
}

impl SampleStream {
    /// Next document from the stream.
    ///
    /// `Ok(None)` means the agent closed the stream cleanly. Framing and
    /// parse failures are fatal for the stream.
    pub async fn next_document(&mut self) -> Result<Option<Document>, ClientError> {
        loop {
            if let Some(text) = self.scanner.next_document()? {
                let document = parse_document(&text)?;
                self.stats.record_document(observation_count(&document));
                tracing::trace!(
                    root = document.root_name(),
                    bytes = text.len(),
                    "stream document"
                );
                return Ok(Some(document));
            }

            if self.finished {
                return Ok(None);
            }

            match tokio::time::timeout(self.idle_timeout, self.response.chunk()).await {
                Err(_) => return Err(ClientError::Idle(self.idle_timeout)),
                Ok(Err(e)) => return Err(e.into()),
                Ok(Ok(None)) => {
                    self.finished = true;
                    self.scanner.finish()?;
                }
                Ok(Ok(Some(chunk))) => {
                    self.stats.record_bytes(chunk.len());
                    self.scanner.push(&chunk);
                }
            }
        }
    }

    /// Bytes received but not yet framed into a document.
    pub fn pending_bytes(&self) -> usize {
        self.scanner.pending()
    }
}

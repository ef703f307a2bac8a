// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Probe → Current → Sample state machine run by the client thread.

use super::agent::{AgentClient, SampleStream};
use super::config::{ClientConfig, SampleMode};
use super::cursor::{CursorUpdate, SequenceCursor};
use super::handler::ClientHandler;
use super::request::StreamTiming;
use super::stats::ClientStats;
use super::{ClientError, ClientState};
use crate::model::{Document, ErrorCode, ErrorDocument, StreamsDocument};
use parking_lot::RwLock;
use std::collections::BTreeSet;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

/// Where the state machine continues after leaving the sampling phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Resume {
    /// Full reset: topology may have changed.
    Probe,
    /// Same agent run, but the window is lost.
    Current,
}

pub(crate) struct Worker {
    config: ClientConfig,
    agent: AgentClient,
    handler: Arc<dyn ClientHandler>,
    state: Arc<RwLock<ClientState>>,
    stats: Arc<ClientStats>,
    stop: watch::Receiver<bool>,
    streams_opened: u64,
    last_asset_sequence: u64,
}

impl Worker {
    pub(crate) fn new(
        config: ClientConfig,
        agent: AgentClient,
        handler: Arc<dyn ClientHandler>,
        state: Arc<RwLock<ClientState>>,
        stop: watch::Receiver<bool>,
    ) -> Self {
        let stats = Arc::clone(agent.stats());
        Self {
            config,
            agent,
            handler,
            state,
            stats,
            stop,
            streams_opened: 0,
            last_asset_sequence: 0,
        }
    }

    /// Outer loop: run sessions until stopped, retrying after a fixed delay.
    pub(crate) async fn run(mut self) {
        tracing::info!(agent = %self.config.agent_url, mode = ?self.config.mode, "client started");

        loop {
            match self.session().await {
                Ok(()) => {}
                Err(ClientError::Cancelled) => break,
                Err(e) => {
                    self.report(&e);
                    self.set_state(ClientState::Retrying {
                        error: e.to_string(),
                    });
                    tracing::warn!(
                        error = %e,
                        retry_ms = self.config.retry_interval_ms,
                        "session failed, retrying"
                    );
                    if self.pause(self.config.retry_duration()).await.is_err() {
                        break;
                    }
                }
            }
        }

        self.set_state(ClientState::Stopped);
        tracing::info!("client stopped");
    }

    /// One probe followed by as many current/sample rounds as the agent run
    /// allows. Returns `Ok` when a new probe is needed right away.
    async fn session(&mut self) -> Result<(), ClientError> {
        self.set_state(ClientState::Probing);
        let devices = self.cancellable(self.agent.probe()).await?;
        let instance_id = devices.header.instance_id;
        tracing::info!(
            instance_id,
            devices = devices.devices.len(),
            "probe complete"
        );
        self.handler.on_probe(&devices);
        // Sequence numbers restart with every agent instance.
        self.last_asset_sequence = 0;

        loop {
            let current = self.cancellable(self.agent.current()).await?;
            if current.header.instance_id != instance_id {
                self.instance_changed(instance_id, current.header.instance_id);
                return Ok(());
            }
            self.handler.on_current(&current);
            self.last_asset_sequence = self
                .last_asset_sequence
                .max(asset_changes(&current).map(|(seq, _)| seq).max().unwrap_or(0));

            let cursor =
                SequenceCursor::from_header(&current.header).ok_or(ClientError::NoSequence)?;

            let resume = match self.config.mode {
                SampleMode::Stream => self.stream_samples(cursor).await?,
                SampleMode::Poll => self.poll_samples(cursor).await?,
                SampleMode::Current => self.poll_current(instance_id).await?,
            };

            match resume {
                Resume::Probe => return Ok(()),
                Resume::Current => {
                    tracing::info!("resynchronizing from current");
                }
            }
        }
    }

    async fn stream_samples(&mut self, mut cursor: SequenceCursor) -> Result<Resume, ClientError> {
        let timing = StreamTiming {
            interval_ms: self.config.interval_ms,
            heartbeat_ms: self.config.heartbeat_ms,
        };

        loop {
            let from = cursor.from();
            self.set_state(ClientState::Sampling {
                instance_id: cursor.instance_id(),
                from,
            });

            if self.streams_opened > 0 {
                self.stats.record_reconnect();
            }
            self.streams_opened += 1;

            let result = self
                .cancellable(self.agent.open_stream(from, self.config.count, timing))
                .await;
            let mut stream = match result {
                Ok(stream) => stream,
                Err(ClientError::Agent(doc)) => return self.agent_error(*doc),
                Err(e) => return Err(e),
            };
            tracing::info!(from, "sample stream open");
            self.handler.on_stream_started(from);

            let result = self.drain_stream(&mut stream, &mut cursor).await;
            self.handler.on_stream_stopped();

            match result? {
                Some(resume) => return Ok(resume),
                None => {
                    // Clean close: agents without streaming support answer
                    // with a single document.
                    tracing::debug!(from = cursor.from(), "sample stream closed by agent");
                    self.pause(self.config.interval_duration()).await?;
                }
            }
        }
    }

    async fn drain_stream(
        &mut self,
        stream: &mut SampleStream,
        cursor: &mut SequenceCursor,
    ) -> Result<Option<Resume>, ClientError> {
        loop {
            let document = self.cancellable(stream.next_document()).await?;
            match document {
                None => return Ok(None),
                Some(Document::Streams(doc)) => {
                    if let Some(resume) = self.apply_sample(cursor, &doc).await? {
                        return Ok(Some(resume));
                    }
                }
                Some(Document::Error(doc)) => return self.agent_error(doc).map(Some),
                Some(other) => {
                    return Err(ClientError::UnexpectedDocument {
                        expected: "MTConnectStreams",
                        found: other.root_name(),
                    })
                }
            }
        }
    }

    async fn poll_samples(&mut self, mut cursor: SequenceCursor) -> Result<Resume, ClientError> {
        loop {
            self.set_state(ClientState::Sampling {
                instance_id: cursor.instance_id(),
                from: cursor.from(),
            });

            let result = self
                .cancellable(self.agent.sample(cursor.from(), self.config.count))
                .await;
            let doc = match result {
                Ok(doc) => doc,
                Err(ClientError::Agent(doc)) => return self.agent_error(*doc),
                Err(e) => return Err(e),
            };

            if let Some(resume) = self.apply_sample(&mut cursor, &doc).await? {
                return Ok(resume);
            }

            // A full page means the agent has more buffered; fetch it now.
            if (doc.observation_count() as u64) < self.config.count {
                self.pause(self.config.interval_duration()).await?;
            }
        }
    }

    async fn poll_current(&mut self, instance_id: u64) -> Result<Resume, ClientError> {
        self.set_state(ClientState::PollingCurrent { instance_id });

        loop {
            self.pause(self.config.interval_duration()).await?;

            let current = self.cancellable(self.agent.current()).await?;
            if current.header.instance_id != instance_id {
                self.instance_changed(instance_id, current.header.instance_id);
                return Ok(Resume::Probe);
            }
            self.handler.on_current(&current);
            self.follow_assets(&current).await?;
        }
    }

    /// Advance the window with one sample document and hand it on.
    async fn apply_sample(
        &mut self,
        cursor: &mut SequenceCursor,
        doc: &StreamsDocument,
    ) -> Result<Option<Resume>, ClientError> {
        match cursor.advance(doc) {
            CursorUpdate::InstanceChanged { previous, current } => {
                self.instance_changed(previous, current);
                Ok(Some(Resume::Probe))
            }
            CursorUpdate::Gap { expected, first } => {
                tracing::warn!(
                    expected,
                    first,
                    lost = first - expected,
                    "agent buffer overran sample window"
                );
                Ok(Some(Resume::Current))
            }
            CursorUpdate::Advanced { from, to } => {
                tracing::trace!(from, to, observations = doc.observation_count(), "sample");
                self.set_state(ClientState::Sampling {
                    instance_id: cursor.instance_id(),
                    from,
                });
                if doc.observation_count() > 0 {
                    self.handler.on_sample(doc);
                    self.follow_assets(doc).await?;
                }
                Ok(None)
            }
        }
    }

    /// `OUT_OF_RANGE` means the window fell out of the agent buffer and is
    /// recovered from current. Anything else fails the session.
    fn agent_error(&self, doc: ErrorDocument) -> Result<Resume, ClientError> {
        if doc.has_code(&ErrorCode::OutOfRange) {
            tracing::warn!("sample window out of range");
            self.handler.on_agent_error(&doc);
            return Ok(Resume::Current);
        }
        Err(ClientError::Agent(Box::new(doc)))
    }

    /// Fetch assets announced by `AssetChanged` events newer than the last
    /// one seen. Failures are reported but do not end the session.
    async fn follow_assets(&mut self, doc: &StreamsDocument) -> Result<(), ClientError> {
        if !self.config.follow_assets {
            return Ok(());
        }

        let mut ids = BTreeSet::new();
        for (sequence, asset_id) in asset_changes(doc) {
            if sequence > self.last_asset_sequence {
                self.last_asset_sequence = sequence;
                ids.insert(asset_id.to_string());
            }
        }

        for asset_id in ids {
            match self.cancellable(self.agent.asset(&asset_id)).await {
                Ok(assets) => self.handler.on_assets(&assets),
                Err(ClientError::Cancelled) => return Err(ClientError::Cancelled),
                Err(e) => {
                    tracing::warn!(asset_id = %asset_id, error = %e, "asset request failed");
                    self.report(&e);
                }
            }
        }
        Ok(())
    }

    fn instance_changed(&self, previous: u64, current: u64) {
        tracing::warn!(previous, current, "agent instance changed, restarting from probe");
        self.stats.record_instance_reset();
        self.handler.on_instance_changed(previous, current);
    }

    /// Route an error to the matching handler callback.
    fn report(&self, error: &ClientError) {
        match error {
            ClientError::Agent(doc) => self.handler.on_agent_error(doc),
            e if e.is_xml() => {
                self.stats.record_xml_error();
                self.handler.on_xml_error(&e.to_string());
            }
            e => {
                self.stats.record_connection_error();
                self.handler.on_connection_error(&e.to_string());
            }
        }
    }

    fn set_state(&self, next: ClientState) {
        let changed = {
            let mut state = self.state.write();
            let changed = std::mem::discriminant(&*state) != std::mem::discriminant(&next);
            *state = next.clone();
            changed
        };
        if changed {
            tracing::debug!(state = ?next, "state changed");
            self.handler.on_state_changed(&next);
        }
    }

    /// Run `fut` unless the client is stopped first.
    async fn cancellable<T, F>(&self, fut: F) -> Result<T, ClientError>
    where
        F: Future<Output = Result<T, ClientError>>,
    {
        let mut stop = self.stop.clone();
        if *stop.borrow() {
            return Err(ClientError::Cancelled);
        }
        tokio::select! {
            biased;
            _ = stop.wait_for(|stopped| *stopped) => Err(ClientError::Cancelled),
            result = fut => result,
        }
    }

    async fn pause(&self, duration: Duration) -> Result<(), ClientError> {
        self.cancellable(async {
            tokio::time::sleep(duration).await;
            Ok(())
        })
        .await
    }
}

/// `(sequence, asset id)` of every `AssetChanged` event in a document.
fn asset_changes(doc: &StreamsDocument) -> impl Iterator<Item = (u64, &str)> {
    doc.observations()
        .filter_map(|o| o.changed_asset_id().map(|id| (o.sequence, id)))
}

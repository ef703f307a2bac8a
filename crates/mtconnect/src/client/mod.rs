// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Streaming agent client.
//!
//! [`MTConnectClient`] runs the Probe → Current → Sample protocol on a
//! dedicated thread with its own single-threaded tokio runtime, so callers
//! stay synchronous.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                    Caller thread (sync)                       │
//! │   ClientHandle: state() stats() poll() wait() stop()         │
//! └──────────────┬──────────────────────────────▲────────────────┘
//!                │ stop (watch)                 │ ClientEvent / callbacks
//!                ▼                              │
//! ┌──────────────────────────────────────────────────────────────┐
//! │            mtconnect-client thread (current_thread rt)        │
//! │   Probing ──► Current ──► Sampling ──► (stream | poll)        │
//! │      ▲                        │                               │
//! │      └──── instance change ◄──┘   errors ──► Retrying         │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```ignore
//! use mtconnect::client::{ClientConfig, ClientEvent, MTConnectClient};
//! use std::time::Duration;
//!
//! let client = MTConnectClient::spawn(ClientConfig::new("http://agent:5000"))?;
//! let handle = client.handle();
//! while let Some(event) = handle.wait(Duration::from_secs(1)) {
//!     if let ClientEvent::Sample(doc) = event {
//!         println!("{} observations", doc.observation_count());
//!     }
//! }
//! ```

mod agent;
mod config;
mod cursor;
mod handler;
mod request;
mod scanner;
mod stats;
mod worker;

pub use agent::{AgentClient, SampleStream};
pub use config::{ClientConfig, ConfigError, SampleMode};
pub use cursor::{CursorUpdate, SequenceCursor};
pub use handler::{ChannelHandler, ClientEvent, ClientHandler, NoopHandler};
pub use request::{AgentUrls, StreamTiming};
pub use scanner::{DocumentScanner, ScanError};
pub use stats::{ClientStats, ClientStatsSnapshot};

use crate::model::ErrorDocument;
use crate::xml::XmlError;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{channel, Receiver, TryRecvError};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::watch;
use worker::Worker;

/// Client errors.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP status {status} from {url}")]
    Status { status: u16, url: String },

    #[error("XML error: {0}")]
    Xml(#[from] XmlError),

    #[error("Stream error: {0}")]
    Scan(#[from] ScanError),

    #[error("Agent error: {}", format_agent_errors(.0))]
    Agent(Box<ErrorDocument>),

    #[error("Expected {expected}, got {found}")]
    UnexpectedDocument {
        expected: &'static str,
        found: &'static str,
    },

    #[error("No data for {0:?}")]
    Idle(Duration),

    #[error("Current response carries no sequence numbers")]
    NoSequence,

    #[error("Client stopped")]
    Cancelled,

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ClientError {
    /// Content errors: the agent answered but the body was unusable.
    pub fn is_xml(&self) -> bool {
        matches!(
            self,
            Self::Xml(_) | Self::Scan(_) | Self::UnexpectedDocument { .. } | Self::NoSequence
        )
    }
}

fn format_agent_errors(doc: &ErrorDocument) -> String {
    doc.errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Worker state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ClientState {
    /// Created, worker not yet running.
    Uninitialized,
    /// Requesting device topology.
    Probing,
    /// Following observations from sequence `from`.
    Sampling { instance_id: u64, from: u64 },
    /// Polling snapshots (current-only mode).
    PollingCurrent { instance_id: u64 },
    /// Waiting out the retry delay after a failure.
    Retrying { error: String },
    /// Worker has exited.
    Stopped,
}

impl ClientState {
    /// Short label for logs and displays.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Uninitialized => "uninitialized",
            Self::Probing => "probing",
            Self::Sampling { .. } => "sampling",
            Self::PollingCurrent { .. } => "polling_current",
            Self::Retrying { .. } => "retrying",
            Self::Stopped => "stopped",
        }
    }
}

/// Handle to a running client. Cheap to clone.
#[derive(Clone)]
pub struct ClientHandle {
    stop_tx: Arc<watch::Sender<bool>>,
    state: Arc<RwLock<ClientState>>,
    stats: Arc<ClientStats>,
    running: Arc<AtomicBool>,
    event_rx: Option<Arc<Mutex<Receiver<ClientEvent>>>>,
}

impl ClientHandle {
    /// Latest worker state.
    pub fn state(&self) -> ClientState {
        self.state.read().clone()
    }

    /// Statistics snapshot.
    pub fn stats(&self) -> ClientStatsSnapshot {
        self.stats.snapshot()
    }

    /// Check if the worker thread is still running.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    /// Ask the worker to stop. Returns immediately.
    pub fn stop(&self) {
        self.stop_tx.send_replace(true);
    }

    /// Drain pending events (non-blocking).
    ///
    /// Always empty for clients spawned with a custom handler.
    pub fn poll(&self) -> Vec<ClientEvent> {
        let mut events = Vec::new();
        let Some(event_rx) = &self.event_rx else {
            return events;
        };
        if let Ok(rx) = event_rx.lock() {
            loop {
                match rx.try_recv() {
                    Ok(event) => events.push(event),
                    Err(TryRecvError::Empty) => break,
                    Err(TryRecvError::Disconnected) => {
                        self.running.store(false, Ordering::Relaxed);
                        break;
                    }
                }
            }
        }
        events
    }

    /// Wait for the next event (blocking with timeout).
    pub fn wait(&self, timeout: Duration) -> Option<ClientEvent> {
        let event_rx = self.event_rx.as_ref()?;
        let rx = event_rx.lock().ok()?;
        rx.recv_timeout(timeout).ok()
    }
}

impl std::fmt::Debug for ClientHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientHandle")
            .field("state", &self.state())
            .field("running", &self.is_running())
            .finish_non_exhaustive()
    }
}

/// Streaming client owning the worker thread.
///
/// Dropping it stops and joins the worker.
pub struct MTConnectClient {
    handle: ClientHandle,
    thread_handle: Option<JoinHandle<()>>,
}

impl MTConnectClient {
    /// Spawn a client whose callbacks are delivered as [`ClientEvent`]s
    /// through [`ClientHandle::poll`] and [`ClientHandle::wait`].
    pub fn spawn(config: ClientConfig) -> Result<Self, ClientError> {
        let (event_tx, event_rx) = channel();
        let handler = Arc::new(ChannelHandler::new(event_tx));
        Self::start(config, handler, Some(Arc::new(Mutex::new(event_rx))))
    }

    /// Spawn a client that calls `handler` directly on the worker thread.
    pub fn spawn_with_handler(
        config: ClientConfig,
        handler: Arc<dyn ClientHandler>,
    ) -> Result<Self, ClientError> {
        Self::start(config, handler, None)
    }

    fn start(
        config: ClientConfig,
        handler: Arc<dyn ClientHandler>,
        event_rx: Option<Arc<Mutex<Receiver<ClientEvent>>>>,
    ) -> Result<Self, ClientError> {
        let stats = Arc::new(ClientStats::new());
        let agent = AgentClient::with_stats(&config, Arc::clone(&stats))?;

        // Built here so a runtime failure is reported to the caller instead
        // of silently ending the thread.
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;

        let (stop_tx, stop_rx) = watch::channel(false);
        let state = Arc::new(RwLock::new(ClientState::Uninitialized));
        let running = Arc::new(AtomicBool::new(true));

        let worker = Worker::new(config, agent, handler, Arc::clone(&state), stop_rx);
        let running_clone = Arc::clone(&running);
        let thread_handle = thread::Builder::new()
            .name("mtconnect-client".to_string())
            .spawn(move || {
                runtime.block_on(worker.run());
                running_clone.store(false, Ordering::Relaxed);
            })?;

        Ok(Self {
            handle: ClientHandle {
                stop_tx: Arc::new(stop_tx),
                state,
                stats,
                running,
                event_rx,
            },
            thread_handle: Some(thread_handle),
        })
    }

    /// Get a handle to interact with the client.
    pub fn handle(&self) -> ClientHandle {
        self.handle.clone()
    }

    /// Latest worker state.
    pub fn state(&self) -> ClientState {
        self.handle.state()
    }

    /// Statistics snapshot.
    pub fn stats(&self) -> ClientStatsSnapshot {
        self.handle.stats()
    }

    /// Check if the worker thread is still running.
    pub fn is_running(&self) -> bool {
        self.handle.is_running()
    }

    /// Stop the worker and wait for it to exit.
    pub fn shutdown(mut self) {
        self.stop_and_join();
    }

    fn stop_and_join(&mut self) {
        self.handle.stop();
        if let Some(handle) = self.thread_handle.take() {
            if handle.join().is_err() {
                tracing::error!("mtconnect client thread panicked");
            }
        }
    }
}

impl Drop for MTConnectClient {
    fn drop(&mut self) {
        self.stop_and_join();
    }
}

impl std::fmt::Debug for MTConnectClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MTConnectClient")
            .field("handle", &self.handle)
            .finish_non_exhaustive()
    }
}

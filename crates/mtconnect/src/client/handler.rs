// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Client callbacks and events.

use super::ClientState;
use crate::model::{AssetsDocument, DevicesDocument, ErrorDocument, StreamsDocument};
use std::sync::mpsc::Sender;

/// Callbacks invoked from the client worker thread.
///
/// Every method has an empty default, so implementors only override what
/// they need. Calls happen on the worker thread in protocol order; a slow
/// handler delays the stream.
pub trait ClientHandler: Send + Sync {
    /// Device topology received.
    fn on_probe(&self, _doc: &DevicesDocument) {}

    /// Snapshot received (initial, or each poll in current mode).
    fn on_current(&self, _doc: &StreamsDocument) {}

    /// Batch of observations received from a sample request or stream.
    fn on_sample(&self, _doc: &StreamsDocument) {}

    /// Assets fetched after an `AssetChanged` event.
    fn on_assets(&self, _doc: &AssetsDocument) {}

    /// The agent answered with an `MTConnectError` document.
    fn on_agent_error(&self, _doc: &ErrorDocument) {}

    /// The agent instance id changed; the client restarts from probe.
    fn on_instance_changed(&self, _previous: u64, _current: u64) {}

    /// Transport failure (connect, status, timeout). The client retries.
    fn on_connection_error(&self, _error: &str) {}

    /// Stream content could not be framed or parsed. The stream is closed.
    fn on_xml_error(&self, _error: &str) {}

    /// Worker state transition.
    fn on_state_changed(&self, _state: &ClientState) {}

    /// Sample stream opened at sequence `from`.
    fn on_stream_started(&self, _from: u64) {}

    /// Sample stream closed.
    fn on_stream_stopped(&self) {}
}

/// Handler that ignores everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopHandler;

impl ClientHandler for NoopHandler {}

/// Events produced by [`ChannelHandler`].
#[derive(Debug, Clone)]
pub enum ClientEvent {
    Probe(Box<DevicesDocument>),
    Current(Box<StreamsDocument>),
    Sample(Box<StreamsDocument>),
    Assets(Box<AssetsDocument>),
    AgentError(Box<ErrorDocument>),
    InstanceChanged { previous: u64, current: u64 },
    ConnectionError { message: String },
    XmlError { message: String },
    StateChanged(ClientState),
    StreamStarted { from: u64 },
    StreamStopped,
}

/// Forwards callbacks as [`ClientEvent`]s over a channel.
///
/// Send failures are ignored: a dropped receiver means nobody is listening.
pub struct ChannelHandler {
    tx: std::sync::Mutex<Sender<ClientEvent>>,
}

impl ChannelHandler {
    pub fn new(tx: Sender<ClientEvent>) -> Self {
        Self {
            tx: std::sync::Mutex::new(tx),
        }
    }

    fn send(&self, event: ClientEvent) {
        if let Ok(tx) = self.tx.lock() {
            let _ = tx.send(event);
        }
    }
}

impl ClientHandler for ChannelHandler {
    fn on_probe(&self, doc: &DevicesDocument) {
        self.send(ClientEvent::Probe(Box::new(doc.clone())));
    }

    fn on_current(&self, doc: &StreamsDocument) {
        self.send(ClientEvent::Current(Box::new(doc.clone())));
    }

    fn on_sample(&self, doc: &StreamsDocument) {
        self.send(ClientEvent::Sample(Box::new(doc.clone())));
    }

    fn on_assets(&self, doc: &AssetsDocument) {
        self.send(ClientEvent::Assets(Box::new(doc.clone())));
    }

    fn on_agent_error(&self, doc: &ErrorDocument) {
        self.send(ClientEvent::AgentError(Box::new(doc.clone())));
    }

    fn on_instance_changed(&self, previous: u64, current: u64) {
        self.send(ClientEvent::InstanceChanged { previous, current });
    }

    fn on_connection_error(&self, error: &str) {
        self.send(ClientEvent::ConnectionError {
            message: error.to_string(),
        });
    }

    fn on_xml_error(&self, error: &str) {
        self.send(ClientEvent::XmlError {
            message: error.to_string(),
        });
    }

    fn on_state_changed(&self, state: &ClientState) {
        self.send(ClientEvent::StateChanged(state.clone()));
    }

    fn on_stream_started(&self, from: u64) {
        self.send(ClientEvent::StreamStarted { from });
    }

    fn on_stream_stopped(&self) {
        self.send(ClientEvent::StreamStopped);
    }
}

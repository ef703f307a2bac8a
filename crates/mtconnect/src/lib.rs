// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! MTConnect Agent Client
//!
//! Reads device topology and observations from MTConnect agents over HTTP.
//!
//! # Features
//!
//! - **Domain Model**: devices, components, data items, observations, assets
//! - **XML Reader**: probe, current/sample, assets and error documents
//! - **Streaming Client**: Probe → Current → Sample state machine with
//!   sequence tracking, agent restart detection and multipart stream
//!   reassembly on a background thread
//! - **Polling Modes**: bounded sample polling or current-only snapshots
//!
//! # Quick Start
//!
//! ```bash
//! # Follow a device
//! mtc-stream stream --agent http://localhost:5000 --device Mill
//!
//! # Using config file
//! mtc-stream --config client.toml stream
//! ```
//!
//! # Configuration File
//!
//! ```toml
//! agent_url = "http://localhost:5000"
//! device = "Mill"
//! mode = "stream"
//! interval_ms = 500
//! heartbeat_ms = 10000
//! count = 1000
//! ```

pub mod client;
pub mod model;
pub mod xml;

pub use client::{
    AgentClient, ClientConfig, ClientError, ClientEvent, ClientHandle, ClientHandler,
    ClientState, ClientStatsSnapshot, MTConnectClient, SampleMode,
};
pub use model::{
    AssetsDocument, DataItem, Device, DevicesDocument, Document, ErrorDocument, Header,
    Observation, ObservationValue, StreamsDocument,
};
pub use xml::{parse_document, XmlError};

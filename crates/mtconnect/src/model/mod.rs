// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! MTConnect domain model.
//!
//! Plain owned data, built by the XML reader and discarded when a newer
//! document replaces it. Vocabulary terms (component kinds, data item types,
//! sub types) are kept as strings; only the enumerations the client acts on
//! are typed.

mod asset;
mod device;
mod header;
mod streams;

pub use asset::{AgentError, Asset, AssetsDocument, ErrorCode, ErrorDocument};
pub use device::{
    Category, Component, Composition, Constraints, DataItem, Description, Device,
    DevicesDocument, Representation,
};
pub use header::Header;
pub use streams::{
    ComponentStream, ConditionFields, ConditionLevel, DeviceStream, Observation,
    ObservationValue, StreamsDocument, UNAVAILABLE,
};

use serde::{Deserialize, Serialize};

/// Any MTConnect response document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "document", rename_all = "snake_case")]
pub enum Document {
    Devices(DevicesDocument),
    Streams(StreamsDocument),
    Assets(AssetsDocument),
    Error(ErrorDocument),
}

impl Document {
    pub fn header(&self) -> &Header {
        match self {
            Document::Devices(d) => &d.header,
            Document::Streams(d) => &d.header,
            Document::Assets(d) => &d.header,
            Document::Error(d) => &d.header,
        }
    }

    /// Root element name of this document kind.
    pub fn root_name(&self) -> &'static str {
        match self {
            Document::Devices(_) => "MTConnectDevices",
            Document::Streams(_) => "MTConnectStreams",
            Document::Assets(_) => "MTConnectAssets",
            Document::Error(_) => "MTConnectError",
        }
    }
}

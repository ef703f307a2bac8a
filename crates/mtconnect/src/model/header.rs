// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Document header shared by all MTConnect response documents.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Header of an MTConnect response document.
///
/// `instance_id` identifies one run of the agent. Sequence numbers are only
/// comparable between documents carrying the same instance id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    /// Agent instance identifier.
    pub instance_id: u64,
    /// Name of the agent that produced the document.
    pub sender: String,
    /// Agent software version.
    pub version: String,
    /// Time the document was created.
    pub creation_time: Option<DateTime<Utc>>,
    /// Observation buffer capacity.
    pub buffer_size: u64,

    /// Oldest sequence number still in the agent buffer (streams).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_sequence: Option<u64>,
    /// Newest sequence number in the agent buffer (streams).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_sequence: Option<u64>,
    /// Sequence number to request next (streams).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_sequence: Option<u64>,

    /// Asset buffer capacity (devices, assets).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asset_buffer_size: Option<u64>,
    /// Number of assets currently held (devices, assets).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asset_count: Option<u64>,

    /// Last time the device model changed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_model_change_time: Option<String>,
    /// Set when the agent is serving test data.
    #[serde(default)]
    pub test_indicator: bool,
}

impl Header {
    /// Whether this header belongs to the same agent run as `other`.
    pub fn same_instance(&self, other: &Header) -> bool {
        self.instance_id == other.instance_id
    }
}

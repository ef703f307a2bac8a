// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Observations returned by current and sample requests.

use super::{Category, Header};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Literal text an agent reports when a value is not known.
pub const UNAVAILABLE: &str = "UNAVAILABLE";

/// `MTConnectStreams` document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StreamsDocument {
    pub header: Header,
    pub streams: Vec<DeviceStream>,
}

impl StreamsDocument {
    /// All observations in document order.
    pub fn observations(&self) -> impl Iterator<Item = &Observation> {
        self.streams.iter().flat_map(|d| d.observations())
    }

    /// Observations of one device, matched by name or uuid.
    pub fn device_observations<'a>(
        &'a self,
        name_or_uuid: &'a str,
    ) -> impl Iterator<Item = &'a Observation> + 'a {
        self.streams
            .iter()
            .filter(move |d| d.name == name_or_uuid || d.uuid == name_or_uuid)
            .flat_map(|d| d.observations())
    }

    /// Number of observations in the document.
    pub fn observation_count(&self) -> usize {
        self.streams
            .iter()
            .flat_map(|d| &d.component_streams)
            .map(|c| c.observations.len())
            .sum()
    }

    /// Highest sequence number carried by any observation.
    pub fn max_sequence(&self) -> Option<u64> {
        self.observations().map(|o| o.sequence).max()
    }
}

/// Observations of one device.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeviceStream {
    pub name: String,
    pub uuid: String,
    pub component_streams: Vec<ComponentStream>,
}

impl DeviceStream {
    pub fn observations(&self) -> impl Iterator<Item = &Observation> {
        self.component_streams
            .iter()
            .flat_map(|c| c.observations.iter())
    }
}

/// Observations of one component.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ComponentStream {
    /// Component type, e.g. `Linear`.
    pub component: String,
    pub component_id: String,
    pub name: Option<String>,
    pub native_name: Option<String>,
    pub uuid: Option<String>,
    pub observations: Vec<Observation>,
}

/// Level of a condition observation, taken from its element name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConditionLevel {
    Normal,
    Warning,
    Fault,
    Unavailable,
}

impl FromStr for ConditionLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Normal" => Ok(ConditionLevel::Normal),
            "Warning" => Ok(ConditionLevel::Warning),
            "Fault" => Ok(ConditionLevel::Fault),
            "Unavailable" => Ok(ConditionLevel::Unavailable),
            other => Err(format!("unknown condition level: {}", other)),
        }
    }
}

impl fmt::Display for ConditionLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ConditionLevel::Normal => "Normal",
            ConditionLevel::Warning => "Warning",
            ConditionLevel::Fault => "Fault",
            ConditionLevel::Unavailable => "Unavailable",
        };
        f.write_str(s)
    }
}

/// Condition-specific attributes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConditionFields {
    pub level: ConditionLevel,
    /// Data item type from the `type` attribute.
    pub condition_type: String,
    pub native_code: Option<String>,
    pub native_severity: Option<String>,
    pub qualifier: Option<String>,
}

/// Reported value of an observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ObservationValue {
    Unavailable,
    Value(String),
    TimeSeries(Vec<f64>),
    DataSet(BTreeMap<String, String>),
    Table(BTreeMap<String, BTreeMap<String, String>>),
}

impl ObservationValue {
    /// Plain text value, if this is a scalar.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ObservationValue::Value(v) => Some(v),
            _ => None,
        }
    }

    /// Scalar value parsed as a number.
    pub fn as_f64(&self) -> Option<f64> {
        self.as_str().and_then(|v| v.trim().parse().ok())
    }

    pub fn is_unavailable(&self) -> bool {
        matches!(self, ObservationValue::Unavailable)
    }
}

impl fmt::Display for ObservationValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ObservationValue::Unavailable => f.write_str(UNAVAILABLE),
            ObservationValue::Value(v) => f.write_str(v),
            ObservationValue::TimeSeries(values) => {
                let parts: Vec<String> = values.iter().map(|v| v.to_string()).collect();
                f.write_str(&parts.join(" "))
            }
            ObservationValue::DataSet(entries) => {
                let parts: Vec<String> =
                    entries.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
                f.write_str(&parts.join(" "))
            }
            ObservationValue::Table(rows) => {
                let parts: Vec<String> = rows
                    .iter()
                    .map(|(key, cells)| {
                        let cells: Vec<String> =
                            cells.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
                        format!("{}={{{}}}", key, cells.join(" "))
                    })
                    .collect();
                f.write_str(&parts.join(" "))
            }
        }
    }
}

/// A timestamped data point reported against a data item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub category: Category,
    /// Element name, e.g. `Position`, `Execution`, `Fault`.
    pub element: String,
    pub data_item_id: String,
    pub timestamp: DateTime<Utc>,
    pub sequence: u64,
    pub name: Option<String>,
    pub sub_type: Option<String>,
    pub composition_id: Option<String>,
    pub value: ObservationValue,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<ConditionFields>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sample_count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sample_rate: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub statistic: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reset_triggered: Option<String>,
}

impl Observation {
    pub fn is_condition(&self) -> bool {
        self.category == Category::Condition
    }

    /// Name if present, data item id otherwise.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.data_item_id)
    }

    /// Asset id carried by an `AssetChanged` event, if any.
    pub fn changed_asset_id(&self) -> Option<&str> {
        if self.category != Category::Event || self.element != "AssetChanged" {
            return None;
        }
        self.value.as_str()
    }
}

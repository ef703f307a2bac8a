// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Device topology returned by a probe request.
//!
//! ```text
//! Device
//! +-- DataItems
//! +-- Compositions
//! +-- Components
//!     +-- DataItems
//!     +-- Compositions
//!     +-- Components (recursive)
//! ```

use super::Header;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// `MTConnectDevices` document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DevicesDocument {
    /// Document header.
    pub header: Header,
    /// Devices published by the agent (including the `Agent` device, if any).
    pub devices: Vec<Device>,
}

impl DevicesDocument {
    /// Find a device by name or uuid.
    pub fn device(&self, name_or_uuid: &str) -> Option<&Device> {
        self.devices
            .iter()
            .find(|d| d.name == name_or_uuid || d.uuid == name_or_uuid)
    }

    /// Find a data item by id in any device.
    pub fn data_item(&self, id: &str) -> Option<&DataItem> {
        self.devices.iter().find_map(|d| d.data_item(id))
    }
}

/// Free-form description block.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Description {
    pub manufacturer: Option<String>,
    pub model: Option<String>,
    pub serial_number: Option<String>,
    pub station: Option<String>,
    /// Element text.
    pub text: Option<String>,
}

/// Top-level piece of equipment.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Device {
    pub id: String,
    pub name: String,
    pub uuid: String,
    pub iso_841_class: Option<String>,
    pub mtconnect_version: Option<String>,
    pub description: Option<Description>,
    pub data_items: Vec<DataItem>,
    pub components: Vec<Component>,
    pub compositions: Vec<Composition>,
}

impl Device {
    /// Find a data item by id anywhere below this device.
    pub fn data_item(&self, id: &str) -> Option<&DataItem> {
        self.data_items().find(|item| item.id == id)
    }

    /// Find a component by id anywhere below this device.
    pub fn component(&self, id: &str) -> Option<&Component> {
        self.components.iter().find_map(|c| c.find(id))
    }

    /// Iterate all data items, device-level first, then components depth first.
    pub fn data_items(&self) -> impl Iterator<Item = &DataItem> {
        let mut items: Vec<&DataItem> = self.data_items.iter().collect();
        for component in &self.components {
            component.collect_data_items(&mut items);
        }
        items.into_iter()
    }
}

/// Sub-part of a device, e.g. `Controller`, `Axes`, `Linear`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Component {
    /// Element name, which is the component type.
    pub kind: String,
    pub id: String,
    pub name: Option<String>,
    pub native_name: Option<String>,
    pub uuid: Option<String>,
    pub description: Option<Description>,
    pub data_items: Vec<DataItem>,
    pub components: Vec<Component>,
    pub compositions: Vec<Composition>,
}

impl Component {
    fn find(&self, id: &str) -> Option<&Component> {
        if self.id == id {
            return Some(self);
        }
        self.components.iter().find_map(|c| c.find(id))
    }

    fn collect_data_items<'a>(&'a self, out: &mut Vec<&'a DataItem>) {
        out.extend(self.data_items.iter());
        for child in &self.components {
            child.collect_data_items(out);
        }
    }
}

/// Lowest-level physical part of a component, e.g. `MOTOR`, `SPINDLE`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Composition {
    pub id: String,
    pub composition_type: String,
    pub name: Option<String>,
    pub uuid: Option<String>,
    pub description: Option<Description>,
}

/// Observation category of a data item.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Category {
    #[default]
    Sample,
    Event,
    Condition,
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SAMPLE" => Ok(Category::Sample),
            "EVENT" => Ok(Category::Event),
            "CONDITION" => Ok(Category::Condition),
            other => Err(format!("unknown category: {}", other)),
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Category::Sample => "SAMPLE",
            Category::Event => "EVENT",
            Category::Condition => "CONDITION",
        };
        f.write_str(s)
    }
}

/// How the value of a data item is structured.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Representation {
    #[default]
    Value,
    TimeSeries,
    DataSet,
    Table,
    Discrete,
}

impl Representation {
    /// Element-name suffix used for observations of this representation.
    pub fn element_suffix(self) -> &'static str {
        match self {
            Representation::TimeSeries => "TimeSeries",
            Representation::DataSet => "DataSet",
            Representation::Table => "Table",
            Representation::Value | Representation::Discrete => "",
        }
    }
}

impl FromStr for Representation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "VALUE" => Ok(Representation::Value),
            "TIME_SERIES" => Ok(Representation::TimeSeries),
            "DATA_SET" => Ok(Representation::DataSet),
            "TABLE" => Ok(Representation::Table),
            "DISCRETE" => Ok(Representation::Discrete),
            other => Err(format!("unknown representation: {}", other)),
        }
    }
}

/// Allowed values or range of a data item.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Constraints {
    pub values: Vec<String>,
    pub minimum: Option<f64>,
    pub maximum: Option<f64>,
    pub nominal: Option<f64>,
}

/// Definition of a reported value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DataItem {
    pub id: String,
    pub name: Option<String>,
    pub category: Category,
    /// Vocabulary type, e.g. `POSITION`, `EXECUTION`.
    pub data_item_type: String,
    pub sub_type: Option<String>,
    pub units: Option<String>,
    pub native_units: Option<String>,
    pub native_scale: Option<f64>,
    pub coordinate_system: Option<String>,
    pub representation: Representation,
    pub composition_id: Option<String>,
    pub statistic: Option<String>,
    pub significant_digits: Option<u32>,
    pub sample_rate: Option<f64>,
    pub discrete: bool,
    pub constraints: Option<Constraints>,
}

impl DataItem {
    /// Name if present, id otherwise.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }
}

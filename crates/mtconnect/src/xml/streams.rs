// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! `MTConnectStreams` reader.

use super::common::{
    attr, child, elements, name, parse_attr, parse_bool_attr, parse_header, parse_required,
    required_attr, required_timestamp, text,
};
use super::XmlError;
use crate::model::{
    Category, ComponentStream, ConditionFields, ConditionLevel, DeviceStream, Observation,
    ObservationValue, StreamsDocument, UNAVAILABLE,
};
use roxmltree::Node;
use std::collections::BTreeMap;

pub(crate) fn parse_streams(root: &Node) -> Result<StreamsDocument, XmlError> {
    let header = parse_header(root)?;
    let mut streams = Vec::new();

    if let Some(list) = child(root, "Streams") {
        for node in elements(&list).filter(|n| name(n) == "DeviceStream") {
            streams.push(parse_device_stream(&node)?);
        }
    }

    Ok(StreamsDocument { header, streams })
}

fn parse_device_stream(node: &Node) -> Result<DeviceStream, XmlError> {
    let component_streams = elements(node)
        .filter(|n| name(n) == "ComponentStream")
        .map(|n| parse_component_stream(&n))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(DeviceStream {
        name: attr(node, "name").unwrap_or_default(),
        uuid: attr(node, "uuid").unwrap_or_default(),
        component_streams,
    })
}

fn parse_component_stream(node: &Node) -> Result<ComponentStream, XmlError> {
    let mut observations = Vec::new();

    for group in elements(node) {
        let category = match name(&group) {
            "Samples" => Category::Sample,
            "Events" => Category::Event,
            "Condition" => Category::Condition,
            _ => continue,
        };
        for element in elements(&group) {
            observations.push(parse_observation(&element, category)?);
        }
    }

    Ok(ComponentStream {
        component: attr(node, "component").unwrap_or_default(),
        component_id: required_attr(node, "componentId")?.to_string(),
        name: attr(node, "name"),
        native_name: attr(node, "nativeName"),
        uuid: attr(node, "uuid"),
        observations,
    })
}

fn parse_observation(node: &Node, category: Category) -> Result<Observation, XmlError> {
    let element = name(node).to_string();

    let (value, condition) = if category == Category::Condition {
        let level: ConditionLevel = element.parse().map_err(|_| XmlError::InvalidValue {
            attribute: "level",
            value: element.clone(),
        })?;
        let condition = ConditionFields {
            level,
            condition_type: attr(node, "type").unwrap_or_default(),
            native_code: attr(node, "nativeCode"),
            native_severity: attr(node, "nativeSeverity"),
            qualifier: attr(node, "qualifier"),
        };
        let value = match (level, text(node)) {
            (ConditionLevel::Unavailable, _) | (_, None) => ObservationValue::Unavailable,
            (_, Some(message)) => ObservationValue::Value(message),
        };
        (value, Some(condition))
    } else {
        (parse_value(node, &element)?, None)
    };

    Ok(Observation {
        category,
        data_item_id: required_attr(node, "dataItemId")?.to_string(),
        timestamp: required_timestamp(node, "timestamp")?,
        sequence: parse_required(node, "sequence")?,
        name: attr(node, "name"),
        sub_type: attr(node, "subType"),
        composition_id: attr(node, "compositionId"),
        value,
        condition,
        sample_count: parse_attr(node, "sampleCount")?,
        sample_rate: parse_attr(node, "sampleRate")?,
        statistic: attr(node, "statistic"),
        duration: parse_attr(node, "duration")?,
        reset_triggered: attr(node, "resetTriggered"),
        element,
    })
}

fn parse_value(node: &Node, element: &str) -> Result<ObservationValue, XmlError> {
    let raw = text(node);
    if raw.as_deref() == Some(UNAVAILABLE) {
        return Ok(ObservationValue::Unavailable);
    }

    if element.ends_with("TimeSeries") {
        let values = raw
            .unwrap_or_default()
            .split_whitespace()
            .map(|v| {
                v.parse::<f64>().map_err(|_| XmlError::InvalidValue {
                    attribute: "TimeSeries",
                    value: v.to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        return Ok(ObservationValue::TimeSeries(values));
    }

    if element.ends_with("DataSet") {
        let mut entries = BTreeMap::new();
        for (key, entry) in live_entries(node)? {
            entries.insert(key, text(&entry).unwrap_or_default());
        }
        return Ok(ObservationValue::DataSet(entries));
    }

    if element.ends_with("Table") {
        let mut rows = BTreeMap::new();
        for (key, entry) in live_entries(node)? {
            let mut cells = BTreeMap::new();
            for cell in elements(&entry).filter(|n| name(n) == "Cell") {
                cells.insert(
                    required_attr(&cell, "key")?.to_string(),
                    text(&cell).unwrap_or_default(),
                );
            }
            rows.insert(key, cells);
        }
        return Ok(ObservationValue::Table(rows));
    }

    Ok(ObservationValue::Value(raw.unwrap_or_default()))
}

/// `Entry` children of a data set or table, minus the ones flagged removed.
fn live_entries<'a, 'input>(
    node: &Node<'a, 'input>,
) -> Result<Vec<(String, Node<'a, 'input>)>, XmlError> {
    elements(node)
        .filter(|n| name(n) == "Entry")
        .filter(|n| !parse_bool_attr(n, "removed"))
        .map(|n| -> Result<(String, Node<'a, 'input>), XmlError> {
            Ok((required_attr(&n, "key")?.to_string(), n))
        })
        .collect()
}

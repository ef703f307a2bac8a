// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Attribute and element helpers shared by the document readers.

use super::XmlError;
use crate::model::{Description, Header};
use chrono::{DateTime, NaiveDateTime, Utc};
use roxmltree::Node;
use std::str::FromStr;

/// Local name of an element, namespace stripped.
pub(crate) fn name<'a>(node: &Node<'a, '_>) -> &'a str {
    node.tag_name().name()
}

/// Element children of `node`.
pub(crate) fn elements<'a, 'input>(
    node: &Node<'a, 'input>,
) -> impl Iterator<Item = Node<'a, 'input>> {
    node.children().filter(|n| n.is_element())
}

/// First element child with the given local name.
pub(crate) fn child<'a, 'input>(node: &Node<'a, 'input>, local: &str) -> Option<Node<'a, 'input>> {
    node.children()
        .find(|n| n.is_element() && n.tag_name().name() == local)
}

pub(crate) fn attr(node: &Node, key: &str) -> Option<String> {
    node.attribute(key).map(str::to_string)
}

pub(crate) fn required_attr<'a>(node: &Node<'a, '_>, key: &'static str) -> Result<&'a str, XmlError> {
    node.attribute(key).ok_or_else(|| XmlError::MissingAttribute {
        element: name(node).to_string(),
        attribute: key,
    })
}

/// Parse an optional attribute with `FromStr`.
pub(crate) fn parse_attr<T: FromStr>(node: &Node, key: &'static str) -> Result<Option<T>, XmlError> {
    match node.attribute(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| XmlError::InvalidValue {
                attribute: key,
                value: raw.to_string(),
            }),
    }
}

/// Parse a required attribute with `FromStr`.
pub(crate) fn parse_required<T: FromStr>(node: &Node, key: &'static str) -> Result<T, XmlError> {
    let raw = required_attr(node, key)?;
    raw.trim().parse().map_err(|_| XmlError::InvalidValue {
        attribute: key,
        value: raw.to_string(),
    })
}

pub(crate) fn parse_bool_attr(node: &Node, key: &str) -> bool {
    node.attribute(key)
        .map(|v| v.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

/// Trimmed element text, `None` when empty.
pub(crate) fn text(node: &Node) -> Option<String> {
    node.text()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
}

/// Parse an MTConnect timestamp. Agents that omit the zone designator report
/// UTC.
pub(crate) fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

pub(crate) fn required_timestamp(node: &Node, key: &'static str) -> Result<DateTime<Utc>, XmlError> {
    let raw = required_attr(node, key)?;
    parse_timestamp(raw).ok_or_else(|| XmlError::InvalidValue {
        attribute: key,
        value: raw.to_string(),
    })
}

pub(crate) fn optional_timestamp(node: &Node, key: &'static str) -> Result<Option<DateTime<Utc>>, XmlError> {
    match node.attribute(key) {
        None => Ok(None),
        Some(raw) => parse_timestamp(raw)
            .map(Some)
            .ok_or_else(|| XmlError::InvalidValue {
                attribute: key,
                value: raw.to_string(),
            }),
    }
}

/// Read the `<Header>` element below `root`.
pub(crate) fn parse_header(root: &Node) -> Result<Header, XmlError> {
    let node = child(root, "Header").ok_or_else(|| XmlError::MissingElement {
        parent: name(root).to_string(),
        element: "Header",
    })?;

    Ok(Header {
        instance_id: parse_required(&node, "instanceId")?,
        sender: attr(&node, "sender").unwrap_or_default(),
        version: attr(&node, "version").unwrap_or_default(),
        creation_time: optional_timestamp(&node, "creationTime")?,
        buffer_size: parse_attr(&node, "bufferSize")?.unwrap_or(0),
        first_sequence: parse_attr(&node, "firstSequence")?,
        last_sequence: parse_attr(&node, "lastSequence")?,
        next_sequence: parse_attr(&node, "nextSequence")?,
        asset_buffer_size: parse_attr(&node, "assetBufferSize")?,
        asset_count: parse_attr(&node, "assetCount")?,
        device_model_change_time: attr(&node, "deviceModelChangeTime"),
        test_indicator: parse_bool_attr(&node, "testIndicator"),
    })
}

pub(crate) fn parse_description(node: &Node) -> Option<Description> {
    let desc = child(node, "Description")?;
    Some(Description {
        manufacturer: attr(&desc, "manufacturer"),
        model: attr(&desc, "model"),
        serial_number: attr(&desc, "serialNumber"),
        station: attr(&desc, "station"),
        text: text(&desc),
    })
}

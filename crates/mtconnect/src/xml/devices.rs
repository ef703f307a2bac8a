// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! `MTConnectDevices` reader.

use super::common::{
    attr, child, elements, name, parse_attr, parse_bool_attr, parse_description, parse_header,
    required_attr, text,
};
use super::XmlError;
use crate::model::{
    Category, Component, Composition, Constraints, DataItem, Device, DevicesDocument,
    Representation,
};
use roxmltree::Node;

pub(crate) fn parse_devices(root: &Node) -> Result<DevicesDocument, XmlError> {
    let header = parse_header(root)?;
    let mut devices = Vec::new();

    if let Some(list) = child(root, "Devices") {
        // `Agent` is a device in its own right (MTConnect 1.7+).
        for node in elements(&list).filter(|n| matches!(name(n), "Device" | "Agent")) {
            devices.push(parse_device(&node)?);
        }
    }

    Ok(DevicesDocument { header, devices })
}

fn parse_device(node: &Node) -> Result<Device, XmlError> {
    let id = required_attr(node, "id")?.to_string();
    let name_attr = attr(node, "name").unwrap_or_else(|| id.clone());
    Ok(Device {
        uuid: attr(node, "uuid").unwrap_or_default(),
        name: name_attr,
        iso_841_class: attr(node, "iso841Class"),
        mtconnect_version: attr(node, "mtconnectVersion"),
        description: parse_description(node),
        data_items: parse_data_items(node)?,
        components: parse_components(node)?,
        compositions: parse_compositions(node)?,
        id,
    })
}

fn parse_components(node: &Node) -> Result<Vec<Component>, XmlError> {
    let Some(list) = child(node, "Components") else {
        return Ok(Vec::new());
    };
    elements(&list).map(|c| parse_component(&c)).collect()
}

fn parse_component(node: &Node) -> Result<Component, XmlError> {
    // 2.x agents write `<Component type="...">`; older ones use the type as
    // the element name.
    let kind = match name(node) {
        "Component" => attr(node, "type").unwrap_or_else(|| "Component".to_string()),
        other => other.to_string(),
    };
    Ok(Component {
        kind,
        id: required_attr(node, "id")?.to_string(),
        name: attr(node, "name"),
        native_name: attr(node, "nativeName"),
        uuid: attr(node, "uuid"),
        description: parse_description(node),
        data_items: parse_data_items(node)?,
        components: parse_components(node)?,
        compositions: parse_compositions(node)?,
    })
}

fn parse_compositions(node: &Node) -> Result<Vec<Composition>, XmlError> {
    let Some(list) = child(node, "Compositions") else {
        return Ok(Vec::new());
    };
    elements(&list)
        .map(|c| -> Result<Composition, XmlError> {
            Ok(Composition {
                id: required_attr(&c, "id")?.to_string(),
                composition_type: required_attr(&c, "type")?.to_string(),
                name: attr(&c, "name"),
                uuid: attr(&c, "uuid"),
                description: parse_description(&c),
            })
        })
        .collect()
}

fn parse_data_items(node: &Node) -> Result<Vec<DataItem>, XmlError> {
    let Some(list) = child(node, "DataItems") else {
        return Ok(Vec::new());
    };
    elements(&list)
        .filter(|n| name(n) == "DataItem")
        .map(|n| parse_data_item(&n))
        .collect()
}

fn parse_data_item(node: &Node) -> Result<DataItem, XmlError> {
    let category = required_attr(node, "category")?;
    let category: Category = category.parse().map_err(|_| XmlError::InvalidValue {
        attribute: "category",
        value: category.to_string(),
    })?;

    let representation = match node.attribute("representation") {
        None => Representation::Value,
        Some(raw) => raw.parse().map_err(|_| XmlError::InvalidValue {
            attribute: "representation",
            value: raw.to_string(),
        })?,
    };

    Ok(DataItem {
        id: required_attr(node, "id")?.to_string(),
        name: attr(node, "name"),
        category,
        data_item_type: required_attr(node, "type")?.to_string(),
        sub_type: attr(node, "subType"),
        units: attr(node, "units"),
        native_units: attr(node, "nativeUnits"),
        native_scale: parse_attr(node, "nativeScale")?,
        coordinate_system: attr(node, "coordinateSystem"),
        discrete: parse_bool_attr(node, "discrete") || representation == Representation::Discrete,
        representation,
        composition_id: attr(node, "compositionId"),
        statistic: attr(node, "statistic"),
        significant_digits: parse_attr(node, "significantDigits")?,
        sample_rate: parse_attr(node, "sampleRate")?,
        constraints: parse_constraints(node),
    })
}

fn parse_constraints(node: &Node) -> Option<Constraints> {
    let c = child(node, "Constraints")?;
    let number = |local: &str| -> Option<f64> {
        child(&c, local)
            .and_then(|n| text(&n))
            .and_then(|t| t.parse().ok())
    };
    Some(Constraints {
        values: elements(&c)
            .filter(|n| name(n) == "Value")
            .filter_map(|n| text(&n))
            .collect(),
        minimum: number("Minimum"),
        maximum: number("Maximum"),
        nominal: number("Nominal"),
    })
}

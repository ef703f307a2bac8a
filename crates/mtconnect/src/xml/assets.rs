// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! `MTConnectAssets` and `MTConnectError` readers.

use super::common::{
    attr, child, elements, name, optional_timestamp, parse_bool_attr, parse_header,
    required_attr, text,
};
use super::XmlError;
use crate::model::{AgentError, Asset, AssetsDocument, ErrorCode, ErrorDocument};
use roxmltree::Node;

pub(crate) fn parse_assets(root: &Node, input: &str) -> Result<AssetsDocument, XmlError> {
    let header = parse_header(root)?;
    let mut assets = Vec::new();

    if let Some(list) = child(root, "Assets") {
        for node in elements(&list) {
            assets.push(Asset {
                asset_type: name(&node).to_string(),
                asset_id: required_attr(&node, "assetId")?.to_string(),
                timestamp: optional_timestamp(&node, "timestamp")?,
                device_uuid: attr(&node, "deviceUuid"),
                removed: parse_bool_attr(&node, "removed"),
                xml: input[node.range()].to_string(),
            });
        }
    }

    Ok(AssetsDocument { header, assets })
}

pub(crate) fn parse_error(root: &Node) -> Result<ErrorDocument, XmlError> {
    let header = parse_header(root)?;

    // Both `<Errors><Error/></Errors>` and a bare `<Error/>` below the root
    // are in use.
    let errors = root
        .descendants()
        .filter(|n| n.is_element() && name(n) == "Error")
        .map(|n| AgentError {
            code: ErrorCode::parse(n.attribute("errorCode").unwrap_or("INTERNAL_ERROR")),
            message: text(&n).unwrap_or_default(),
        })
        .collect();

    Ok(ErrorDocument { header, errors })
}

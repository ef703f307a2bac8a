// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! MTConnect XML document reader.
//!
//! Parses the four agent response documents into the domain model. Element
//! matching uses local names only, so every MTConnect schema version and
//! namespace prefix is accepted.
//!
//! # Example
//!
//! ```ignore
//! use mtconnect::xml::parse_document;
//! use mtconnect::model::Document;
//!
//! match parse_document(&body)? {
//!     Document::Streams(streams) => println!("{} observations", streams.observation_count()),
//!     other => println!("got {}", other.root_name()),
//! }
//! ```

mod assets;
mod common;
mod devices;
mod streams;

use crate::model::{AssetsDocument, DevicesDocument, Document, ErrorDocument, StreamsDocument};
use roxmltree::Document as XmlDocument;
use thiserror::Error;

/// XML reader errors.
#[derive(Debug, Error)]
pub enum XmlError {
    #[error("XML parse error: {0}")]
    Parse(#[from] roxmltree::Error),

    #[error("Unexpected root element <{0}>")]
    UnexpectedRoot(String),

    #[error("Missing <{element}> in <{parent}>")]
    MissingElement {
        parent: String,
        element: &'static str,
    },

    #[error("Missing attribute '{attribute}' on <{element}>")]
    MissingAttribute {
        element: String,
        attribute: &'static str,
    },

    #[error("Invalid value for '{attribute}': {value:?}")]
    InvalidValue {
        attribute: &'static str,
        value: String,
    },
}

/// Parse any MTConnect response document, dispatching on the root element.
pub fn parse_document(input: &str) -> Result<Document, XmlError> {
    let doc = XmlDocument::parse(input)?;
    let root = doc.root_element();

    let parsed = match root.tag_name().name() {
        "MTConnectDevices" => Document::Devices(devices::parse_devices(&root)?),
        "MTConnectStreams" => Document::Streams(streams::parse_streams(&root)?),
        "MTConnectAssets" => Document::Assets(assets::parse_assets(&root, input)?),
        "MTConnectError" => Document::Error(assets::parse_error(&root)?),
        other => return Err(XmlError::UnexpectedRoot(other.to_string())),
    };

    tracing::trace!(root = parsed.root_name(), bytes = input.len(), "parsed document");
    Ok(parsed)
}

/// Parse a probe response.
pub fn parse_devices(input: &str) -> Result<DevicesDocument, XmlError> {
    match parse_document(input)? {
        Document::Devices(d) => Ok(d),
        other => Err(XmlError::UnexpectedRoot(other.root_name().to_string())),
    }
}

/// Parse a current or sample response.
pub fn parse_streams(input: &str) -> Result<StreamsDocument, XmlError> {
    match parse_document(input)? {
        Document::Streams(s) => Ok(s),
        other => Err(XmlError::UnexpectedRoot(other.root_name().to_string())),
    }
}

/// Parse an assets response.
pub fn parse_assets(input: &str) -> Result<AssetsDocument, XmlError> {
    match parse_document(input)? {
        Document::Assets(a) => Ok(a),
        other => Err(XmlError::UnexpectedRoot(other.root_name().to_string())),
    }
}

/// Parse an error response.
pub fn parse_error(input: &str) -> Result<ErrorDocument, XmlError> {
    match parse_document(input)? {
        Document::Error(e) => Ok(e),
        other => Err(XmlError::UnexpectedRoot(other.root_name().to_string())),
    }
}

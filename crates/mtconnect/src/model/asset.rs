// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Asset envelopes and agent error reports.

use super::Header;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// `MTConnectAssets` document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AssetsDocument {
    pub header: Header,
    pub assets: Vec<Asset>,
}

/// One asset. The body is kept as raw XML; only the common attributes are
/// decoded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Asset {
    /// Element name, e.g. `CuttingTool`, `File`.
    pub asset_type: String,
    pub asset_id: String,
    pub timestamp: Option<DateTime<Utc>>,
    pub device_uuid: Option<String>,
    pub removed: bool,
    /// Raw XML of the asset element.
    pub xml: String,
}

/// Standard agent error codes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorCode {
    AssetNotFound,
    InternalError,
    InvalidRequest,
    InvalidUri,
    InvalidXpath,
    NoDevice,
    OutOfRange,
    QueryError,
    TooMany,
    Unauthorized,
    Unsupported,
    Other(String),
}

impl ErrorCode {
    pub fn parse(code: &str) -> Self {
        match code {
            "ASSET_NOT_FOUND" => ErrorCode::AssetNotFound,
            "INTERNAL_ERROR" => ErrorCode::InternalError,
            "INVALID_REQUEST" => ErrorCode::InvalidRequest,
            "INVALID_URI" => ErrorCode::InvalidUri,
            "INVALID_XPATH" => ErrorCode::InvalidXpath,
            "NO_DEVICE" => ErrorCode::NoDevice,
            "OUT_OF_RANGE" => ErrorCode::OutOfRange,
            "QUERY_ERROR" => ErrorCode::QueryError,
            "TOO_MANY" => ErrorCode::TooMany,
            "UNAUTHORIZED" => ErrorCode::Unauthorized,
            "UNSUPPORTED" => ErrorCode::Unsupported,
            other => ErrorCode::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            ErrorCode::AssetNotFound => "ASSET_NOT_FOUND",
            ErrorCode::InternalError => "INTERNAL_ERROR",
            ErrorCode::InvalidRequest => "INVALID_REQUEST",
            ErrorCode::InvalidUri => "INVALID_URI",
            ErrorCode::InvalidXpath => "INVALID_XPATH",
            ErrorCode::NoDevice => "NO_DEVICE",
            ErrorCode::OutOfRange => "OUT_OF_RANGE",
            ErrorCode::QueryError => "QUERY_ERROR",
            ErrorCode::TooMany => "TOO_MANY",
            ErrorCode::Unauthorized => "UNAUTHORIZED",
            ErrorCode::Unsupported => "UNSUPPORTED",
            ErrorCode::Other(code) => code,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One error reported by the agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentError {
    pub code: ErrorCode,
    pub message: String,
}

impl fmt::Display for AgentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

/// `MTConnectError` document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ErrorDocument {
    pub header: Header,
    pub errors: Vec<AgentError>,
}

impl ErrorDocument {
    pub fn has_code(&self, code: &ErrorCode) -> bool {
        self.errors.iter().any(|e| &e.code == code)
    }
}

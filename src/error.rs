// SPDX-FileCopyrightText: (C) 2024 Graylog SDK Contributors
// SPDX-License-Identifier: MIT

use thiserror::Error;

/// Rejections raised while building request objects, before anything
/// is sent to Graylog.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BuildError {
    #[error("{node}: missing required field \"{field}\"")]
    MissingField {
        node: &'static str,
        field: &'static str,
    },

    /// A field was set that is not valid for the selected type.
    #[error("{node}: field \"{field}\" not allowed for type \"{kind}\"")]
    UnexpectedField {
        node: &'static str,
        field: &'static str,
        kind: String,
    },

    #[error("{node}: {reason}")]
    InvalidValue { node: &'static str, reason: String },
}

#[derive(Error, Debug)]
pub enum GraylogError {
    /// Connection failures and timeouts.
    #[error("request: {0}")]
    Transport(#[from] reqwest::Error),

    /// Graylog answered with a non-2xx status.
    #[error("graylog returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("json: {0}")]
    Json(#[from] serde_json::Error),

    /// The response did not have the shape the request asked for.
    #[error("decode: {0}")]
    Decode(String),

    #[error("invalid request: {0}")]
    Build(#[from] BuildError),

    #[error("configuration: {0}")]
    Config(String),
}

impl GraylogError {
    pub(crate) fn decode<S: Into<String>>(msg: S) -> Self {
        Self::Decode(msg.into())
    }

    pub fn is_status(&self) -> bool {
        matches!(self, GraylogError::Status { .. })
    }
}

pub type Result<T, E = GraylogError> = std::result::Result<T, E>;

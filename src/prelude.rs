// SPDX-FileCopyrightText: (C) 2024 Graylog SDK Contributors
// SPDX-License-Identifier: MIT

#![allow(unused_imports)]

pub(crate) use tracing::debug;
pub(crate) use tracing::error;
pub(crate) use tracing::info;
pub(crate) use tracing::instrument;
pub(crate) use tracing::trace;
pub(crate) use tracing::warn;

pub(crate) use serde::Deserialize;
pub(crate) use serde::Serialize;
pub(crate) use serde_json::json;
pub(crate) use serde_json::Value as JsonValue;

pub(crate) use crate::error::{BuildError, GraylogError, Result};

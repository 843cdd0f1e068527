// SPDX-FileCopyrightText: (C) 2024 Graylog SDK Contributors
// SPDX-License-Identifier: MIT

//! The execution response of the views search API.

use std::collections::HashMap;

use serde::de::DeserializeOwned;

use super::spec::Timerange;
use crate::prelude::*;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Execution {
    #[serde(default)]
    pub done: bool,
    #[serde(default)]
    pub cancelled: bool,
    #[serde(default)]
    pub completed_exceptionally: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct QueryError {
    #[serde(default)]
    pub description: String,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub search_type_id: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct QueryResult {
    #[serde(default)]
    pub search_types: HashMap<String, JsonValue>,
    #[serde(default)]
    pub errors: Vec<QueryError>,
}

/// Response of `POST views/search/sync`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub search_id: Option<String>,
    #[serde(default)]
    pub execution: Execution,
    #[serde(default)]
    pub results: HashMap<String, QueryResult>,
}

impl SearchResponse {
    pub fn parse(body: &str) -> Result<Self> {
        serde_json::from_str(body).map_err(|err| GraylogError::decode(format!("search response: {err}")))
    }

    /// The raw result block of one search type.
    ///
    /// Fails if the query or search type is missing, or if the query
    /// reported errors.
    pub fn search_type(&self, query_id: &str, search_type_id: &str) -> Result<&JsonValue> {
        let query = self
            .results
            .get(query_id)
            .ok_or_else(|| GraylogError::decode(format!("no result for query {query_id}")))?;
        if !query.errors.is_empty() {
            let reasons: Vec<&str> = query.errors.iter().map(|e| e.description.as_str()).collect();
            return Err(GraylogError::decode(format!(
                "query {query_id} failed: {}",
                reasons.join("; ")
            )));
        }
        if self.execution.completed_exceptionally {
            warn!("Search {:?} completed exceptionally", self.id);
        }
        query.search_types.get(search_type_id).ok_or_else(|| {
            GraylogError::decode(format!(
                "no result for search type {search_type_id} in query {query_id}"
            ))
        })
    }

    /// The result block of one search type, decoded into `T`.
    pub fn search_type_as<T: DeserializeOwned>(&self, query_id: &str, search_type_id: &str) -> Result<T> {
        let value = self.search_type(query_id, search_type_id)?;
        serde_json::from_value(value.clone()).map_err(|err| {
            GraylogError::decode(format!("search type {search_type_id}: {err}"))
        })
    }
}

/// One cell of a pivot row. The key holds the column values followed
/// by the series id.
#[derive(Debug, Clone, Deserialize)]
pub struct PivotValue {
    #[serde(default)]
    pub key: Vec<JsonValue>,
    #[serde(default)]
    pub value: JsonValue,
    #[serde(default)]
    pub rollup: bool,
    #[serde(default)]
    pub source: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PivotResultRow {
    #[serde(default)]
    pub key: Vec<JsonValue>,
    #[serde(default)]
    pub values: Vec<PivotValue>,
    #[serde(default)]
    pub source: String,
}

impl PivotResultRow {
    pub fn is_leaf(&self) -> bool {
        self.source == "leaf"
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PivotResult {
    pub id: String,
    #[serde(default)]
    pub rows: Vec<PivotResultRow>,
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub effective_timerange: Option<Timerange>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MessageEnvelope {
    pub message: JsonValue,
    #[serde(default)]
    pub index: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MessagesResult {
    pub id: String,
    #[serde(default)]
    pub messages: Vec<MessageEnvelope>,
    #[serde(default)]
    pub total_results: u64,
    #[serde(default)]
    pub effective_timerange: Option<Timerange>,
}

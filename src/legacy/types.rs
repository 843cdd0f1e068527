// SPDX-FileCopyrightText: (C) 2024 Graylog SDK Contributors
// SPDX-License-Identifier: MIT

use std::collections::HashMap;

use serde::{Deserialize, Deserializer, Serialize};

use crate::datetime::{BucketUnit, DateTime};

/// Histogram bucket sizes of the legacy API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeUnit {
    Minute,
    Hour,
    Day,
    Week,
    Month,
    Quarter,
    Year,
}

impl TimeUnit {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimeUnit::Minute => "minute",
            TimeUnit::Hour => "hour",
            TimeUnit::Day => "day",
            TimeUnit::Week => "week",
            TimeUnit::Month => "month",
            TimeUnit::Quarter => "quarter",
            TimeUnit::Year => "year",
        }
    }

    pub(crate) fn bucket_unit(&self) -> BucketUnit {
        match self {
            TimeUnit::Minute => BucketUnit::Minute,
            TimeUnit::Hour => BucketUnit::Hour,
            TimeUnit::Day => BucketUnit::Day,
            TimeUnit::Week => BucketUnit::Week,
            TimeUnit::Month => BucketUnit::Month,
            TimeUnit::Quarter => BucketUnit::Quarter,
            TimeUnit::Year => BucketUnit::Year,
        }
    }
}

impl std::str::FromStr for TimeUnit {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "minute" => Ok(TimeUnit::Minute),
            "hour" => Ok(TimeUnit::Hour),
            "day" => Ok(TimeUnit::Day),
            "week" => Ok(TimeUnit::Week),
            "month" => Ok(TimeUnit::Month),
            "quarter" => Ok(TimeUnit::Quarter),
            "year" => Ok(TimeUnit::Year),
            _ => Err(format!("unknown time unit: {s}")),
        }
    }
}

/// Graylog reports empty aggregations as NaN, Infinity or null.
fn lenient_f64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value
        .as_ref()
        .map(crate::search::decode::number)
        .unwrap_or(0.0))
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Statistics {
    #[serde(default)]
    pub count: u64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub sum: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub sum_of_squares: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub mean: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub min: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub max: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub variance: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub std_deviation: f64,
    #[serde(default)]
    pub cardinality: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistogramBucket {
    pub timestamp: DateTime,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Histogram {
    pub interval: TimeUnit,
    pub buckets: Vec<HistogramBucket>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldHistogramValues {
    #[serde(default)]
    pub total_count: u64,
    #[serde(default)]
    pub count: u64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub min: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub max: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub total: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub mean: f64,
    #[serde(default)]
    pub cardinality: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldHistogramBucket {
    pub timestamp: DateTime,
    #[serde(flatten)]
    pub values: FieldHistogramValues,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldHistogram {
    pub interval: TimeUnit,
    pub buckets: Vec<FieldHistogramBucket>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TermsOptions {
    pub field: String,
    /// Additional fields the terms are grouped by.
    pub stacked_fields: Vec<String>,
    pub size: u32,
    /// Least frequent terms first.
    pub reverse_order: bool,
    pub top_values_only: bool,
}

impl TermsOptions {
    pub fn new(field: &str, size: u32) -> Self {
        Self {
            field: field.to_string(),
            size,
            ..Default::default()
        }
    }

    pub fn with_stacked_field(mut self, field: &str) -> Self {
        self.stacked_fields.push(field.to_string());
        self
    }

    pub fn reverse_order(mut self, yes: bool) -> Self {
        self.reverse_order = yes;
        self
    }

    pub fn top_values_only(mut self, yes: bool) -> Self {
        self.top_values_only = yes;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TermsData {
    /// The term, followed by the values of the stacked fields.
    pub labels: Vec<String>,
    pub count: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Terms {
    pub terms: Vec<TermsData>,
    pub missing: u64,
    pub other: u64,
    pub total: u64,
}

// Wire shapes.

#[derive(Debug, Deserialize)]
pub(crate) struct MessageEnvelope {
    pub message: serde_json::Value,
}

#[derive(Debug, Deserialize)]
pub(crate) struct MessagesResponse {
    #[serde(default)]
    pub messages: Vec<MessageEnvelope>,
    #[serde(default)]
    pub total_results: u64,
}

#[derive(Debug, Deserialize)]
pub(crate) struct HistogramResponse {
    #[serde(default)]
    pub results: HashMap<String, u64>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct FieldHistogramResponse {
    #[serde(default)]
    pub results: HashMap<String, FieldHistogramValues>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TermsResponse {
    #[serde(default)]
    pub terms: HashMap<String, u64>,
    #[serde(default)]
    pub terms_mapping: HashMap<String, Vec<String>>,
    #[serde(default)]
    pub missing: u64,
    #[serde(default)]
    pub other: u64,
    #[serde(default)]
    pub total: u64,
}

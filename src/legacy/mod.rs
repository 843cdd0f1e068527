// SPDX-FileCopyrightText: (C) 2024 Graylog SDK Contributors
// SPDX-License-Identifier: MIT

//! Searches through the legacy `search/universal/absolute` endpoints.

mod types;

use std::collections::BTreeMap;
use std::sync::{Arc, OnceLock};

use regex::Regex;
use serde::de::DeserializeOwned;

use crate::client::{ApiRequest, Transport};
use crate::datetime::{self, DateTime};
use crate::page::{self, Page};
use crate::prelude::*;

pub use types::*;

const SEARCH_PATH: &str = "search/universal/absolute";

/// Stream, time window and query string of a legacy search.
#[derive(Debug, Clone, PartialEq)]
pub struct LegacyScope {
    pub stream_id: Option<String>,
    pub from: DateTime,
    pub to: DateTime,
    pub query: String,
}

impl LegacyScope {
    pub fn new(from: DateTime, to: DateTime) -> Self {
        Self {
            stream_id: None,
            from,
            to,
            query: String::new(),
        }
    }

    pub fn with_stream(mut self, stream_id: &str) -> Self {
        self.stream_id = Some(stream_id.to_string());
        self
    }

    pub fn with_query<Q: std::fmt::Display>(mut self, query: Q) -> Self {
        self.query = query.to_string();
        self
    }
}

fn parse<T: DeserializeOwned>(body: &str) -> Result<T> {
    serde_json::from_str(body).map_err(|err| GraylogError::decode(format!("{err}")))
}

/// Replace the bare NaN and Infinity tokens Graylog emits for empty
/// aggregations with null so the body is valid JSON.
fn sanitize_numbers(body: &str) -> std::borrow::Cow<'_, str> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"(:\s*)(-?Infinity|NaN)(\s*[,}\]])").ok());
    match re {
        Some(re) => re.replace_all(body, "${1}null${3}"),
        None => std::borrow::Cow::Borrowed(body),
    }
}

fn epoch_key(key: &str) -> Result<DateTime> {
    key.parse::<i64>()
        .ok()
        .and_then(|seconds| DateTime::from_timestamp(seconds, 0))
        .ok_or_else(|| GraylogError::decode(format!("invalid histogram key: {key}")))
}

/// Sort buckets by time and add empty ones for the steps of `[from, to)`
/// that Graylog left out.
fn zero_fill<V: Default>(
    mut buckets: BTreeMap<DateTime, V>,
    scope: &LegacyScope,
    interval: TimeUnit,
) -> BTreeMap<DateTime, V> {
    match datetime::bucket_starts(&scope.from, &scope.to, interval.bucket_unit(), 1) {
        Some(starts) => {
            for start in starts {
                buckets.entry(start).or_default();
            }
        }
        None => warn!("Too many {} buckets, not zero filling", interval.as_str()),
    }
    buckets
}

#[derive(Clone)]
pub struct LegacyGraylogSearch {
    transport: Arc<dyn Transport>,
    limit: Option<u32>,
}

impl LegacyGraylogSearch {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            limit: None,
        }
    }

    /// Maximum number of messages returned by `get_messages`. Graylog
    /// applies its own default when unset.
    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    fn request(&self, endpoint: &str, scope: &LegacyScope) -> ApiRequest {
        let path = if endpoint.is_empty() {
            SEARCH_PATH.to_string()
        } else {
            format!("{SEARCH_PATH}/{endpoint}")
        };
        let mut request = ApiRequest::get(&path)
            .param("query", if scope.query.is_empty() { "*" } else { scope.query.as_str() })
            .param("from", datetime::format(&scope.from))
            .param("to", datetime::format(&scope.to));
        if let Some(stream_id) = &scope.stream_id {
            request = request.param("filter", format!("streams:{stream_id}"));
        }
        request
    }

    async fn messages<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<(Vec<T>, u64)> {
        let body = self.transport.execute(request).await?;
        let response: MessagesResponse = parse(&body)?;
        let list = response
            .messages
            .into_iter()
            .map(|envelope| serde_json::from_value(envelope.message))
            .collect::<Result<Vec<T>, _>>()
            .map_err(|err| GraylogError::decode(format!("message: {err}")))?;
        Ok((list, response.total_results))
    }

    /// Messages matching the scope, newest first.
    pub async fn get_messages<T: DeserializeOwned>(&self, scope: &LegacyScope) -> Result<Vec<T>> {
        let mut request = self.request("", scope).param("sort", "timestamp:desc");
        if let Some(limit) = self.limit {
            request = request.param("limit", limit);
        }
        let (list, _) = self.messages(request).await?;
        Ok(list)
    }

    /// One page of messages, newest first. Pages are 1-based.
    pub async fn get_messages_page<T: DeserializeOwned>(
        &self,
        scope: &LegacyScope,
        size: u32,
        page: u32,
    ) -> Result<Page<T>> {
        let request = self
            .request("", scope)
            .param("limit", size)
            .param("offset", page::offset(page, size))
            .param("sort", "timestamp:desc");
        let (list, total) = self.messages(request).await?;
        Ok(Page::new(list, total, page.max(1), size))
    }

    pub async fn get_statistics(&self, scope: &LegacyScope, field: &str) -> Result<Statistics> {
        let request = self.request("stats", scope).param("field", field);
        let body = self.transport.execute(request).await?;
        parse(&sanitize_numbers(&body))
    }

    /// Message counts per interval, zero filled over the scope.
    pub async fn get_histogram(&self, scope: &LegacyScope, interval: TimeUnit) -> Result<Histogram> {
        let request = self
            .request("histogram", scope)
            .param("interval", interval.as_str());
        let body = self.transport.execute(request).await?;
        let response: HistogramResponse = parse(&body)?;
        let mut buckets = BTreeMap::new();
        for (key, count) in response.results {
            buckets.insert(epoch_key(&key)?, count);
        }
        let buckets = zero_fill(buckets, scope, interval)
            .into_iter()
            .map(|(timestamp, count)| HistogramBucket { timestamp, count })
            .collect();
        Ok(Histogram { interval, buckets })
    }

    /// Statistics of `field` per interval, zero filled over the scope.
    pub async fn get_field_histogram(
        &self,
        scope: &LegacyScope,
        field: &str,
        interval: TimeUnit,
    ) -> Result<FieldHistogram> {
        let request = self
            .request("fieldhistogram", scope)
            .param("field", field)
            .param("interval", interval.as_str());
        let body = self.transport.execute(request).await?;
        let response: FieldHistogramResponse = parse(&sanitize_numbers(&body))?;
        let mut buckets = BTreeMap::new();
        for (key, values) in response.results {
            buckets.insert(epoch_key(&key)?, values);
        }
        let buckets = zero_fill(buckets, scope, interval)
            .into_iter()
            .map(|(timestamp, values)| FieldHistogramBucket { timestamp, values })
            .collect();
        Ok(FieldHistogram { interval, buckets })
    }

    /// Most (or least) frequent values of a field.
    pub async fn get_terms(&self, scope: &LegacyScope, options: &TermsOptions) -> Result<Terms> {
        let mut request = self
            .request("terms", scope)
            .param("field", &options.field)
            .param("size", options.size)
            .param("order", if options.reverse_order { "asc" } else { "desc" })
            .param("top_values_only", options.top_values_only);
        if !options.stacked_fields.is_empty() {
            request = request.param("stacked_fields", options.stacked_fields.join(","));
        }
        let body = self.transport.execute(request).await?;
        let mut response: TermsResponse = parse(&body)?;

        let mut terms: Vec<TermsData> = response
            .terms
            .into_iter()
            .map(|(term, count)| {
                let labels = response
                    .terms_mapping
                    .remove(&term)
                    .filter(|labels| !labels.is_empty())
                    .unwrap_or_else(|| vec![term]);
                TermsData { labels, count }
            })
            .collect();
        terms.sort_by(|a, b| {
            let order = if options.reverse_order {
                a.count.cmp(&b.count)
            } else {
                b.count.cmp(&a.count)
            };
            order.then_with(|| a.labels.cmp(&b.labels))
        });

        Ok(Terms {
            terms,
            missing: response.missing,
            other: response.other,
            total: response.total,
        })
    }
}

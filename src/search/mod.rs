// SPDX-FileCopyrightText: (C) 2024 Graylog SDK Contributors
// SPDX-License-Identifier: MIT

//! Searches through the views search API.
//!
//! Every operation builds a one query `SearchSpec`, posts it to
//! `views/search/sync` and decodes the result of its search type.

pub mod constants;
pub mod decode;
pub mod ids;
pub mod response;
pub mod spec;

use std::fmt::Display;
use std::sync::Arc;

use serde::de::DeserializeOwned;

use crate::client::{ApiRequest, Transport};
use crate::page::{self, Page};
use crate::prelude::*;

pub use constants::*;
pub use decode::{
    FieldHistogram, FieldHistogramBucket, Histogram, HistogramBucket, PivotRow, Statistics, Terms,
};
pub use ids::{IdGenerator, SequentialIdGenerator, UuidGenerator};
pub use response::{MessagesResult, PivotResult, SearchResponse};
pub use spec::*;

const SEARCH_PATH: &str = "views/search/sync";

/// Where to search: streams, time range and query string.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchScope {
    pub stream_ids: Vec<String>,
    pub timerange: Timerange,
    pub query_string: String,
}

impl SearchScope {
    pub fn new(timerange: Timerange) -> Self {
        Self {
            stream_ids: vec![],
            timerange,
            query_string: String::new(),
        }
    }

    pub fn with_stream(mut self, stream_id: &str) -> Self {
        self.stream_ids.push(stream_id.to_string());
        self
    }

    pub fn with_streams<S: AsRef<str>>(mut self, stream_ids: &[S]) -> Self {
        self.stream_ids
            .extend(stream_ids.iter().map(|s| s.as_ref().to_string()));
        self
    }

    /// Accepts a plain string or a `GraylogQuery`.
    pub fn with_query<Q: Display>(mut self, query: Q) -> Self {
        self.query_string = query.to_string();
        self
    }
}

/// A built request and the ids needed to find its result.
struct Prepared {
    spec: SearchSpec,
    query_id: String,
    search_type_id: String,
}

#[derive(Clone)]
pub struct GraylogSearch {
    transport: Arc<dyn Transport>,
    ids: Arc<dyn IdGenerator>,
}

impl GraylogSearch {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            ids: Arc::new(UuidGenerator),
        }
    }

    pub fn with_id_generator(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = ids;
        self
    }

    fn prepare(&self, scope: &SearchScope, search_type: SearchTypeBuilder) -> Result<Prepared> {
        let ids = self.ids.as_ref();
        let search_type = search_type.build_with(ids)?;
        let search_type_id = search_type.id().to_string();
        let mut query = Query::builder()
            .query(SearchQuery::new(&scope.query_string))
            .timerange(scope.timerange.clone())
            .search_type(search_type);
        if !scope.stream_ids.is_empty() {
            query = query.filter(Filter::streams(&scope.stream_ids));
        }
        let query = query.build_with(ids)?;
        let query_id = query.id().to_string();
        let spec = SearchSpec::builder().query(query).build_with(ids)?;
        Ok(Prepared {
            spec,
            query_id,
            search_type_id,
        })
    }

    /// Execute a search, returning the response body as is.
    pub async fn raw(&self, spec: &SearchSpec) -> Result<String> {
        let body = serde_json::to_value(spec)?;
        debug!(
            "Executing search {} with {} queries",
            spec.id(),
            spec.queries().len()
        );
        self.transport
            .execute(ApiRequest::post(SEARCH_PATH, body))
            .await
    }

    pub async fn execute(&self, spec: &SearchSpec) -> Result<SearchResponse> {
        let body = self.raw(spec).await?;
        SearchResponse::parse(&body)
    }

    async fn run<T: DeserializeOwned>(&self, prepared: &Prepared) -> Result<T> {
        let response = self.execute(&prepared.spec).await?;
        response.search_type_as(&prepared.query_id, &prepared.search_type_id)
    }

    /// One page of messages, decoded into `T`. Pages are 1-based.
    pub async fn get_messages<T: DeserializeOwned>(
        &self,
        scope: &SearchScope,
        size: u32,
        page: u32,
        sort: Option<SortConfig>,
    ) -> Result<Page<T>> {
        let mut search_type = SearchType::builder()
            .kind(SearchTypeType::Messages)
            .limit(size)
            .offset(page::offset(page, size));
        if let Some(sort) = sort {
            search_type = search_type.sort(vec![sort]);
        }
        let prepared = self.prepare(scope, search_type)?;
        let result: MessagesResult = self.run(&prepared).await?;
        decode::messages(result, page, size)
    }

    /// One value per series over the whole scope.
    pub async fn get_statistics(&self, scope: &SearchScope, series: Vec<Series>) -> Result<Vec<Statistics>> {
        let search_type = SearchType::builder()
            .kind(SearchTypeType::Pivot)
            .series(series.clone());
        let prepared = self.prepare(scope, search_type)?;
        let result: PivotResult = self.run(&prepared).await?;
        decode::statistics(&result, &series)
    }

    pub async fn get_terms(
        &self,
        scope: &SearchScope,
        series: Vec<Series>,
        row_groups: Vec<SearchTypePivot>,
        column_groups: Vec<SearchTypePivot>,
        sort: Option<SortConfig>,
    ) -> Result<Terms> {
        let has_columns = !column_groups.is_empty();
        let mut search_type = SearchType::builder()
            .kind(SearchTypeType::Pivot)
            .series(series.clone())
            .row_groups(row_groups)
            .column_groups(column_groups)
            .rollup(true);
        if let Some(sort) = sort {
            search_type = search_type.sort(vec![sort]);
        }
        let prepared = self.prepare(scope, search_type)?;
        let result: PivotResult = self.run(&prepared).await?;
        decode::terms(&result, &series, has_columns)
    }

    /// Series values per time bucket of the "timestamp" field.
    pub async fn get_histogram(
        &self,
        scope: &SearchScope,
        interval: Interval,
        series: Vec<Series>,
        column_groups: Vec<SearchTypePivot>,
    ) -> Result<Histogram> {
        let has_columns = !column_groups.is_empty();
        let search_type = SearchType::builder()
            .kind(SearchTypeType::Pivot)
            .series(series.clone())
            .row_groups(vec![SearchTypePivot::time("timestamp", interval)?])
            .column_groups(column_groups)
            .rollup(true);
        let prepared = self.prepare(scope, search_type)?;
        let result: PivotResult = self.run(&prepared).await?;
        decode::histogram(&result, &series, has_columns, &interval, &scope.timerange)
    }

    /// Count, min, max, mean and total of `field` per time bucket.
    pub async fn get_field_histogram(
        &self,
        scope: &SearchScope,
        field: &str,
        interval: Interval,
    ) -> Result<FieldHistogram> {
        let series = decode::field_histogram_series(field)?;
        let histogram = self.get_histogram(scope, interval, series, vec![]).await?;
        Ok(decode::field_histogram(field, histogram))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::client::mock::MockTransport;
    use crate::client::Method;
    use crate::datetime::{self, DateTime};

    fn service(mock: &Arc<MockTransport>) -> GraylogSearch {
        GraylogSearch::new(mock.clone()).with_id_generator(Arc::new(SequentialIdGenerator::new("id")))
    }

    fn ts(s: &str) -> DateTime {
        datetime::parse(s).unwrap()
    }

    fn scope() -> SearchScope {
        SearchScope::new(Timerange::relative(300))
            .with_stream("000000000000000000000001")
            .with_query("message:API_REQUEST_FINISHED")
    }

    /// Wrap a search type result the way Graylog does. The sequential
    /// generator hands out "id-1" to the search type and "id-2" to the
    /// query.
    fn envelope(result: JsonValue) -> JsonValue {
        json!({
            "id": "000000000000000000000003",
            "execution": {"done": true, "cancelled": false, "completed_exceptionally": false},
            "results": {
                "id-2": {
                    "search_types": {"id-1": result},
                    "errors": []
                }
            }
        })
    }

    #[tokio::test]
    async fn test_get_statistics() {
        let mock = Arc::new(MockTransport::new().respond(envelope(json!({
            "id": "id-1",
            "type": "pivot",
            "rows": [{
                "key": [],
                "values": [
                    {"key": ["count()"], "value": 120, "rollup": true, "source": "row-leaf"},
                    {"key": ["percentile(process_time,95.0)"], "value": 450.0, "rollup": true, "source": "row-leaf"}
                ],
                "source": "leaf"
            }],
            "total": 120
        }))));
        let series = vec![
            Series::count(),
            Series::percentile("process_time", 95.0).unwrap(),
        ];
        let stats = service(&mock).get_statistics(&scope(), series).await.unwrap();
        assert_eq!(stats.len(), 2);
        assert_eq!(stats[0].value, 120.0);
        assert_eq!(stats[1].name, "percentile(process_time,95.0)");
        assert_eq!(stats[1].value, 450.0);

        let request = mock.last_request();
        assert_eq!(request.method, Method::Post);
        assert_eq!(request.path, "views/search/sync");
        let body = request.body.unwrap();
        assert_eq!(body["id"], json!("000000000000000000000003"));
        let query = &body["queries"][0];
        assert_eq!(query["id"], json!("id-2"));
        assert_eq!(query["query"]["query_string"], json!("message:API_REQUEST_FINISHED"));
        assert_eq!(
            query["filter"],
            json!({"type": "or", "filters": [{"type": "stream", "id": "000000000000000000000001"}]})
        );
        assert_eq!(query["search_types"][0]["type"], json!("pivot"));
        assert_eq!(query["search_types"][0]["row_groups"], json!([]));
    }

    #[tokio::test]
    async fn test_get_terms() {
        let mock = Arc::new(MockTransport::new().respond(envelope(json!({
            "id": "id-1",
            "type": "pivot",
            "rows": [
                {
                    "key": ["c1", "Client One"],
                    "values": [
                        {"key": ["count()"], "value": 10, "rollup": true, "source": "row-leaf"},
                        {"key": ["avg(process_time)"], "value": 55.5, "rollup": true, "source": "row-leaf"}
                    ],
                    "source": "leaf"
                },
                {
                    "key": ["c2", "Client Two"],
                    "values": [
                        {"key": ["count()"], "value": 2, "rollup": true, "source": "row-leaf"}
                    ],
                    "source": "leaf"
                }
            ]
        }))));
        let series = vec![
            Series::count(),
            Series::of(SeriesType::Avg, "process_time").unwrap(),
        ];
        let row_groups = vec![
            SearchTypePivot::values("client_id", 10).unwrap(),
            SearchTypePivot::values("client_name", 10).unwrap(),
        ];
        let sort = SortConfig::pivot(SortConfigType::Series, "count()", SortConfigDirection::Descending);
        let terms = service(&mock)
            .get_terms(&scope(), series, row_groups, vec![], Some(sort))
            .await
            .unwrap();
        assert_eq!(terms.rows.len(), 2);
        for row in &terms.rows {
            assert_eq!(row.values.len(), 2);
        }
        assert_eq!(terms.rows[1].values, vec![2.0, 0.0]);

        let body = mock.last_request().body.unwrap();
        let st = &body["queries"][0]["search_types"][0];
        assert_eq!(st["sort"][0]["direction"], json!("Descending"));
        assert_eq!(st["row_groups"][1]["field"], json!("client_name"));
    }

    #[tokio::test]
    async fn test_get_histogram() {
        let mock = Arc::new(MockTransport::new().respond(envelope(json!({
            "id": "id-1",
            "type": "pivot",
            "rows": [{
                "key": ["2020-05-01T00:03:00.000Z"],
                "values": [{"key": ["count()"], "value": 9, "rollup": true, "source": "row-leaf"}],
                "source": "leaf"
            }]
        }))));
        let scope = SearchScope::new(
            Timerange::absolute(ts("2020-05-01T00:00:00Z"), ts("2020-05-01T00:05:00Z")).unwrap(),
        );
        let interval = Interval::timeunit(TimeunitUnit::Minutes, 1).unwrap();
        let histogram = service(&mock)
            .get_histogram(&scope, interval, vec![Series::count()], vec![])
            .await
            .unwrap();
        assert_eq!(histogram.buckets.len(), 5);
        let counts: Vec<f64> = histogram.buckets.iter().map(|b| b.values[0]).collect();
        assert_eq!(counts, vec![0.0, 0.0, 0.0, 9.0, 0.0]);

        let body = mock.last_request().body.unwrap();
        let st = &body["queries"][0]["search_types"][0];
        assert_eq!(
            st["row_groups"][0],
            json!({
                "type": "time",
                "field": "timestamp",
                "interval": {"type": "timeunit", "timeunit": "1m"},
            })
        );
        assert!(body["queries"][0].get("filter").is_none());
    }

    #[tokio::test]
    async fn test_get_field_histogram() {
        let mock = Arc::new(MockTransport::new().respond(envelope(json!({
            "id": "id-1",
            "type": "pivot",
            "rows": []
        }))));
        let scope = SearchScope::new(
            Timerange::absolute(ts("2020-05-01T00:00:00Z"), ts("2020-05-02T00:00:00Z")).unwrap(),
        );
        let interval = Interval::timeunit(TimeunitUnit::Hours, 6).unwrap();
        let histogram = service(&mock)
            .get_field_histogram(&scope, "process_time", interval)
            .await
            .unwrap();
        assert_eq!(histogram.field, "process_time");
        assert_eq!(histogram.buckets.len(), 4);

        let body = mock.last_request().body.unwrap();
        let series = &body["queries"][0]["search_types"][0]["series"];
        assert_eq!(series.as_array().unwrap().len(), 5);
        assert_eq!(series[4]["id"], json!("sum(process_time)"));
    }

    #[derive(Debug, Deserialize)]
    struct TestMessage {
        message: String,
    }

    #[tokio::test]
    async fn test_get_messages() {
        let mock = Arc::new(MockTransport::new().respond(envelope(json!({
            "id": "id-1",
            "type": "messages",
            "messages": [
                {"message": {"message": "API_REQUEST_FINISHED", "_id": "a"}, "index": "graylog_0"}
            ],
            "total_results": 31
        }))));
        let sort = SortConfig::message("timestamp", SortConfigOrder::Desc);
        let page: Page<TestMessage> = service(&mock)
            .get_messages(&scope(), 10, 3, Some(sort))
            .await
            .unwrap();
        assert_eq!(page.list[0].message, "API_REQUEST_FINISHED");
        assert_eq!(page.total_count, 31);
        assert_eq!(page.page, 3);
        assert_eq!(page.total_pages(), 4);

        let body = mock.last_request().body.unwrap();
        let st = &body["queries"][0]["search_types"][0];
        assert_eq!(st["type"], json!("messages"));
        assert_eq!(st["limit"], json!(10));
        assert_eq!(st["offset"], json!(20));
        assert_eq!(st["sort"], json!([{"field": "timestamp", "order": "DESC"}]));
    }

    #[tokio::test]
    async fn test_errors() {
        let mock = Arc::new(MockTransport::new().fail(400, "bad request"));
        let err = service(&mock)
            .get_statistics(&scope(), vec![Series::count()])
            .await
            .unwrap_err();
        assert!(err.is_status());

        // Response for a different query id.
        let mock = Arc::new(MockTransport::new().respond(json!({
            "results": {"other": {"search_types": {}, "errors": []}}
        })));
        let err = service(&mock)
            .get_statistics(&scope(), vec![Series::count()])
            .await
            .unwrap_err();
        assert!(matches!(err, GraylogError::Decode(_)));

        // Invalid requests never reach the transport.
        let mock = Arc::new(MockTransport::new());
        let err = service(&mock)
            .get_statistics(&scope(), vec![])
            .await
            .unwrap_err();
        assert!(matches!(err, GraylogError::Build(_)));
        assert_eq!(mock.request_count(), 0);
    }

    #[tokio::test]
    async fn test_execute_several_search_types() {
        let ids = SequentialIdGenerator::new("st");
        let clients = SearchType::builder()
            .kind(SearchTypeType::Pivot)
            .name("clients")
            .series(vec![Series::count()])
            .row_groups(vec![SearchTypePivot::values("client_name", 10).unwrap()])
            .build_with(&ids)
            .unwrap();
        let latest = SearchType::builder()
            .kind(SearchTypeType::Messages)
            .name("latest")
            .limit(1)
            .build_with(&ids)
            .unwrap();
        let query = Query::builder()
            .timerange(Timerange::relative(300))
            .search_type(clients)
            .search_type(latest)
            .build_with(&ids)
            .unwrap();
        let spec = SearchSpec::builder().query(query).build_with(&ids).unwrap();

        let (query, clients) = spec.find_search_type("clients").unwrap();
        let (_, latest) = spec.find_search_type("latest").unwrap();
        assert_ne!(clients.id(), latest.id());

        let mut search_types = serde_json::Map::new();
        search_types.insert(
            clients.id().to_string(),
            json!({
                "id": clients.id(),
                "type": "pivot",
                "rows": [{
                    "key": ["Client One"],
                    "values": [{"key": ["count()"], "value": 8, "rollup": true, "source": "row-leaf"}],
                    "source": "leaf"
                }]
            }),
        );
        search_types.insert(
            latest.id().to_string(),
            json!({
                "id": latest.id(),
                "type": "messages",
                "messages": [{"message": {"message": "API_REQUEST_FINISHED"}}],
                "total_results": 8
            }),
        );
        let mock = Arc::new(MockTransport::new().respond(json!({
            "results": {(query.id()): {"search_types": search_types, "errors": []}}
        })));

        let response = service(&mock).execute(&spec).await.unwrap();
        let pivot: PivotResult = response.search_type_as(query.id(), clients.id()).unwrap();
        let terms = decode::terms(&pivot, &[Series::count()], false).unwrap();
        assert_eq!(terms.rows[0].labels, vec!["Client One"]);
        assert_eq!(terms.rows[0].values, vec![8.0]);

        let messages: MessagesResult = response.search_type_as(query.id(), latest.id()).unwrap();
        let page: Page<TestMessage> = decode::messages(messages, 1, 1).unwrap();
        assert_eq!(page.list[0].message, "API_REQUEST_FINISHED");
        assert_eq!(page.total_count, 8);

        let sent = mock.last_request().body.unwrap();
        assert_eq!(sent["queries"][0]["search_types"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_raw() {
        let mock = Arc::new(MockTransport::new().respond(json!({"results": {}})));
        let ids = SequentialIdGenerator::new("raw");
        let search_type = SearchType::builder()
            .kind(SearchTypeType::Pivot)
            .name("chart")
            .series(vec![Series::count()])
            .row_groups(vec![SearchTypePivot::values("client_name", 15).unwrap()])
            .build_with(&ids)
            .unwrap();
        let query = Query::builder()
            .timerange(Timerange::relative(300))
            .search_type(search_type)
            .build_with(&ids)
            .unwrap();
        let spec = SearchSpec::builder().query(query).build_with(&ids).unwrap();
        let body = service(&mock).raw(&spec).await.unwrap();
        assert_eq!(body, r#"{"results":{}}"#);
        let sent = mock.last_request().body.unwrap();
        assert_eq!(sent["queries"][0]["search_types"][0]["name"], json!("chart"));
    }
}

// SPDX-FileCopyrightText: (C) 2024 Graylog SDK Contributors
// SPDX-License-Identifier: MIT

//! Request objects of the views search API.
//!
//! Every node is immutable once built. Builders check the type specific
//! field rules and fail with a BuildError before anything is sent.

use std::collections::HashSet;
use std::str::FromStr;
use std::sync::OnceLock;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::constants::*;
use super::ids::{IdGenerator, UuidGenerator};
use crate::datetime::{self, DateTime};
use crate::error::BuildError;

type BuildResult<T> = Result<T, BuildError>;

mod wire_time {
    use super::*;

    pub fn serialize<S: Serializer>(dt: &DateTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&datetime::format(dt))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime, D::Error> {
        let s = String::deserialize(deserializer)?;
        datetime::parse(&s).map_err(serde::de::Error::custom)
    }
}

/// The window a query searches over.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Timerange {
    Absolute {
        #[serde(with = "wire_time")]
        from: DateTime,
        #[serde(with = "wire_time")]
        to: DateTime,
    },
    /// The last `range` seconds.
    Relative { range: u64 },
    /// A natural language range such as "last week".
    Keyword { keyword: String },
}

impl Timerange {
    pub fn absolute(from: DateTime, to: DateTime) -> BuildResult<Self> {
        if from > to {
            return Err(BuildError::InvalidValue {
                node: "timerange",
                reason: "from is after to".to_string(),
            });
        }
        Ok(Timerange::Absolute { from, to })
    }

    pub fn relative(range: u64) -> Self {
        Timerange::Relative { range }
    }

    pub fn keyword(keyword: &str) -> Self {
        Timerange::Keyword {
            keyword: keyword.to_string(),
        }
    }

    pub fn builder() -> TimerangeBuilder {
        TimerangeBuilder::default()
    }

    pub fn kind(&self) -> TimeRangeType {
        match self {
            Timerange::Absolute { .. } => TimeRangeType::Absolute,
            Timerange::Relative { .. } => TimeRangeType::Relative,
            Timerange::Keyword { .. } => TimeRangeType::Keyword,
        }
    }

    /// The absolute bounds, if known without asking the server.
    pub fn bounds(&self) -> Option<(DateTime, DateTime)> {
        match self {
            Timerange::Absolute { from, to } => Some((*from, *to)),
            _ => None,
        }
    }
}

#[derive(Debug, Default)]
pub struct TimerangeBuilder {
    kind: Option<TimeRangeType>,
    from: Option<DateTime>,
    to: Option<DateTime>,
    range: Option<u64>,
    keyword: Option<String>,
}

impl TimerangeBuilder {
    pub fn kind(mut self, kind: TimeRangeType) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn from(mut self, from: DateTime) -> Self {
        self.from = Some(from);
        self
    }

    pub fn to(mut self, to: DateTime) -> Self {
        self.to = Some(to);
        self
    }

    pub fn range(mut self, seconds: u64) -> Self {
        self.range = Some(seconds);
        self
    }

    pub fn keyword(mut self, keyword: &str) -> Self {
        self.keyword = Some(keyword.to_string());
        self
    }

    pub fn build(self) -> BuildResult<Timerange> {
        const NODE: &str = "timerange";
        let kind = self.kind.ok_or(BuildError::MissingField {
            node: NODE,
            field: "type",
        })?;
        let unexpected = |field: &'static str| BuildError::UnexpectedField {
            node: NODE,
            field,
            kind: kind.as_str().to_string(),
        };
        let missing = |field: &'static str| BuildError::MissingField { node: NODE, field };
        match kind {
            TimeRangeType::Absolute => {
                if self.range.is_some() {
                    return Err(unexpected("range"));
                }
                if self.keyword.is_some() {
                    return Err(unexpected("keyword"));
                }
                let from = self.from.ok_or_else(|| missing("from"))?;
                let to = self.to.ok_or_else(|| missing("to"))?;
                Timerange::absolute(from, to)
            }
            TimeRangeType::Relative => {
                if self.from.is_some() {
                    return Err(unexpected("from"));
                }
                if self.to.is_some() {
                    return Err(unexpected("to"));
                }
                if self.keyword.is_some() {
                    return Err(unexpected("keyword"));
                }
                Ok(Timerange::relative(self.range.ok_or_else(|| missing("range"))?))
            }
            TimeRangeType::Keyword => {
                if self.from.is_some() || self.to.is_some() {
                    return Err(unexpected("from"));
                }
                if self.range.is_some() {
                    return Err(unexpected("range"));
                }
                let keyword = self.keyword.ok_or_else(|| missing("keyword"))?;
                Ok(Timerange::Keyword { keyword })
            }
        }
    }
}

/// A `(count, unit)` pair such as 5 minutes, rendered on the wire as
/// "5m".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntervalTimeunit {
    unit: TimeunitUnit,
    value: u32,
}

impl IntervalTimeunit {
    pub fn new(unit: TimeunitUnit, value: u32) -> BuildResult<Self> {
        if value == 0 {
            return Err(BuildError::InvalidValue {
                node: "interval",
                reason: "timeunit value must be greater than 0".to_string(),
            });
        }
        Ok(Self { unit, value })
    }

    pub fn unit(&self) -> TimeunitUnit {
        self.unit
    }

    pub fn value(&self) -> u32 {
        self.value
    }
}

impl std::fmt::Display for IntervalTimeunit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", self.value, self.unit.suffix())
    }
}

impl FromStr for IntervalTimeunit {
    type Err = BuildError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || BuildError::InvalidValue {
            node: "interval",
            reason: format!("invalid timeunit: {s}"),
        };
        static RE: OnceLock<Option<regex::Regex>> = OnceLock::new();
        let re = RE
            .get_or_init(|| regex::Regex::new(r"^(\d+)([smhdwM])$").ok())
            .as_ref()
            .ok_or_else(invalid)?;
        let captures = re.captures(s).ok_or_else(invalid)?;
        let value = captures[1].parse::<u32>().map_err(|_| invalid())?;
        let unit = captures[2]
            .chars()
            .next()
            .and_then(TimeunitUnit::from_suffix)
            .ok_or_else(invalid)?;
        IntervalTimeunit::new(unit, value)
    }
}

impl Serialize for IntervalTimeunit {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for IntervalTimeunit {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Bucket size of a time pivot.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Interval {
    Timeunit {
        timeunit: IntervalTimeunit,
    },
    /// Let Graylog pick a bucket size for the range.
    Auto {
        #[serde(skip_serializing_if = "Option::is_none")]
        scaling: Option<f64>,
    },
}

impl Interval {
    pub fn timeunit(unit: TimeunitUnit, value: u32) -> BuildResult<Self> {
        Ok(Interval::Timeunit {
            timeunit: IntervalTimeunit::new(unit, value)?,
        })
    }

    pub fn auto() -> Self {
        Interval::Auto { scaling: None }
    }

    pub fn builder() -> IntervalBuilder {
        IntervalBuilder::default()
    }

    pub fn kind(&self) -> IntervalType {
        match self {
            Interval::Timeunit { .. } => IntervalType::Timeunit,
            Interval::Auto { .. } => IntervalType::Auto,
        }
    }
}

#[derive(Debug, Default)]
pub struct IntervalBuilder {
    kind: Option<IntervalType>,
    timeunit: Option<IntervalTimeunit>,
    scaling: Option<f64>,
}

impl IntervalBuilder {
    pub fn kind(mut self, kind: IntervalType) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn timeunit(mut self, timeunit: IntervalTimeunit) -> Self {
        self.timeunit = Some(timeunit);
        self
    }

    pub fn scaling(mut self, scaling: f64) -> Self {
        self.scaling = Some(scaling);
        self
    }

    pub fn build(self) -> BuildResult<Interval> {
        const NODE: &str = "interval";
        let kind = self.kind.ok_or(BuildError::MissingField {
            node: NODE,
            field: "type",
        })?;
        match kind {
            IntervalType::Timeunit => {
                if self.scaling.is_some() {
                    return Err(BuildError::UnexpectedField {
                        node: NODE,
                        field: "scaling",
                        kind: kind.as_str().to_string(),
                    });
                }
                let timeunit = self.timeunit.ok_or(BuildError::MissingField {
                    node: NODE,
                    field: "timeunit",
                })?;
                Ok(Interval::Timeunit { timeunit })
            }
            IntervalType::Auto => {
                if self.timeunit.is_some() {
                    return Err(BuildError::UnexpectedField {
                        node: NODE,
                        field: "timeunit",
                        kind: kind.as_str().to_string(),
                    });
                }
                if let Some(scaling) = self.scaling {
                    if !(scaling > 0.0 && scaling.is_finite()) {
                        return Err(BuildError::InvalidValue {
                            node: NODE,
                            reason: format!("scaling must be positive: {scaling}"),
                        });
                    }
                }
                Ok(Interval::Auto {
                    scaling: self.scaling,
                })
            }
        }
    }
}

/// One requested metric.
///
/// The id is derived from type, field and percentile and is sent with
/// the request; Graylog keys the result values with it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Series {
    id: String,
    #[serde(rename = "type")]
    kind: SeriesType,
    #[serde(skip_serializing_if = "Option::is_none")]
    field: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    percentile: Option<f64>,
}

impl Series {
    pub fn builder() -> SeriesBuilder {
        SeriesBuilder::default()
    }

    /// `count()`: the number of matching messages.
    pub fn count() -> Self {
        Self {
            id: series_id(SeriesType::Count, None, None),
            kind: SeriesType::Count,
            field: None,
            percentile: None,
        }
    }

    /// A non percentile metric over `field`.
    pub fn of(kind: SeriesType, field: &str) -> BuildResult<Self> {
        Self::builder().kind(kind).field(field).build()
    }

    pub fn percentile(field: &str, percentile: f64) -> BuildResult<Self> {
        Self::builder()
            .kind(SeriesType::Percentile)
            .field(field)
            .percentile(percentile)
            .build()
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn kind(&self) -> SeriesType {
        self.kind
    }

    pub fn field(&self) -> Option<&str> {
        self.field.as_deref()
    }

    pub fn percentile_value(&self) -> Option<f64> {
        self.percentile
    }
}

fn series_id(kind: SeriesType, field: Option<&str>, percentile: Option<f64>) -> String {
    let field = field.unwrap_or_default();
    match percentile {
        Some(p) => format!("{}({},{:?})", kind.as_str(), field, p),
        None => format!("{}({})", kind.as_str(), field),
    }
}

#[derive(Debug, Default)]
pub struct SeriesBuilder {
    kind: Option<SeriesType>,
    field: Option<String>,
    percentile: Option<f64>,
}

impl SeriesBuilder {
    pub fn kind(mut self, kind: SeriesType) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn field(mut self, field: &str) -> Self {
        self.field = Some(field.to_string());
        self
    }

    pub fn percentile(mut self, percentile: f64) -> Self {
        self.percentile = Some(percentile);
        self
    }

    pub fn build(self) -> BuildResult<Series> {
        const NODE: &str = "series";
        let kind = self.kind.ok_or(BuildError::MissingField {
            node: NODE,
            field: "type",
        })?;
        if let Some(field) = &self.field {
            if field.is_empty() {
                return Err(BuildError::InvalidValue {
                    node: NODE,
                    reason: "field must not be empty".to_string(),
                });
            }
        }
        if kind != SeriesType::Count && self.field.is_none() {
            return Err(BuildError::MissingField {
                node: NODE,
                field: "field",
            });
        }
        match (kind, self.percentile) {
            (SeriesType::Percentile, None) => {
                return Err(BuildError::MissingField {
                    node: NODE,
                    field: "percentile",
                });
            }
            (SeriesType::Percentile, Some(p)) => {
                if !(0.0..=100.0).contains(&p) {
                    return Err(BuildError::InvalidValue {
                        node: NODE,
                        reason: format!("percentile must be within 0 and 100: {p}"),
                    });
                }
            }
            (_, Some(_)) => {
                return Err(BuildError::UnexpectedField {
                    node: NODE,
                    field: "percentile",
                    kind: kind.as_str().to_string(),
                });
            }
            (_, None) => {}
        }
        Ok(Series {
            id: series_id(kind, self.field.as_deref(), self.percentile),
            kind,
            field: self.field,
            percentile: self.percentile,
        })
    }
}

/// A row or column grouping of a pivot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchTypePivot {
    #[serde(rename = "type")]
    kind: SearchTypePivotType,
    field: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    limit: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    interval: Option<Interval>,
}

impl SearchTypePivot {
    pub fn builder() -> SearchTypePivotBuilder {
        SearchTypePivotBuilder::default()
    }

    /// Group by the top `limit` values of `field`.
    pub fn values(field: &str, limit: u32) -> BuildResult<Self> {
        Self::builder()
            .kind(SearchTypePivotType::Values)
            .field(field)
            .limit(limit)
            .build()
    }

    /// Group by time buckets of `field`, usually "timestamp".
    pub fn time(field: &str, interval: Interval) -> BuildResult<Self> {
        Self::builder()
            .kind(SearchTypePivotType::Time)
            .field(field)
            .interval(interval)
            .build()
    }

    pub fn kind(&self) -> SearchTypePivotType {
        self.kind
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    pub fn limit(&self) -> Option<u32> {
        self.limit
    }

    pub fn interval(&self) -> Option<&Interval> {
        self.interval.as_ref()
    }
}

#[derive(Debug, Default)]
pub struct SearchTypePivotBuilder {
    kind: Option<SearchTypePivotType>,
    field: Option<String>,
    limit: Option<u32>,
    interval: Option<Interval>,
}

impl SearchTypePivotBuilder {
    pub fn kind(mut self, kind: SearchTypePivotType) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn field(mut self, field: &str) -> Self {
        self.field = Some(field.to_string());
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn interval(mut self, interval: Interval) -> Self {
        self.interval = Some(interval);
        self
    }

    pub fn build(self) -> BuildResult<SearchTypePivot> {
        const NODE: &str = "pivot";
        let kind = self.kind.ok_or(BuildError::MissingField {
            node: NODE,
            field: "type",
        })?;
        let field = self.field.ok_or(BuildError::MissingField {
            node: NODE,
            field: "field",
        })?;
        match kind {
            SearchTypePivotType::Values => {
                if self.interval.is_some() {
                    return Err(BuildError::UnexpectedField {
                        node: NODE,
                        field: "interval",
                        kind: "values".to_string(),
                    });
                }
                if self.limit == Some(0) {
                    return Err(BuildError::InvalidValue {
                        node: NODE,
                        reason: "limit must be greater than 0".to_string(),
                    });
                }
            }
            SearchTypePivotType::Time => {
                if self.interval.is_none() {
                    return Err(BuildError::MissingField {
                        node: NODE,
                        field: "interval",
                    });
                }
                if self.limit.is_some() {
                    return Err(BuildError::UnexpectedField {
                        node: NODE,
                        field: "limit",
                        kind: "time".to_string(),
                    });
                }
            }
        }
        Ok(SearchTypePivot {
            kind,
            field,
            limit: self.limit,
            interval: self.interval,
        })
    }
}

/// Sorting of a search type.
///
/// Message lists sort by `field` and `order`; pivots sort by `type`,
/// `field` and `direction`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SortConfig {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    kind: Option<SortConfigType>,
    field: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    order: Option<SortConfigOrder>,
    #[serde(skip_serializing_if = "Option::is_none")]
    direction: Option<SortConfigDirection>,
}

impl SortConfig {
    pub fn builder() -> SortConfigBuilder {
        SortConfigBuilder::default()
    }

    /// Message list sort, e.g. `("timestamp", Desc)`.
    pub fn message(field: &str, order: SortConfigOrder) -> Self {
        Self {
            kind: None,
            field: field.to_string(),
            order: Some(order),
            direction: None,
        }
    }

    /// Pivot sort, by a pivot field or a series id such as "count()".
    pub fn pivot(kind: SortConfigType, field: &str, direction: SortConfigDirection) -> Self {
        Self {
            kind: Some(kind),
            field: field.to_string(),
            order: None,
            direction: Some(direction),
        }
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    fn is_pivot_sort(&self) -> bool {
        self.kind.is_some() && self.direction.is_some()
    }

    fn is_message_sort(&self) -> bool {
        self.order.is_some()
    }
}

#[derive(Debug, Default)]
pub struct SortConfigBuilder {
    kind: Option<SortConfigType>,
    field: Option<String>,
    order: Option<SortConfigOrder>,
    direction: Option<SortConfigDirection>,
}

impl SortConfigBuilder {
    pub fn kind(mut self, kind: SortConfigType) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn field(mut self, field: &str) -> Self {
        self.field = Some(field.to_string());
        self
    }

    pub fn order(mut self, order: SortConfigOrder) -> Self {
        self.order = Some(order);
        self
    }

    pub fn direction(mut self, direction: SortConfigDirection) -> Self {
        self.direction = Some(direction);
        self
    }

    pub fn build(self) -> BuildResult<SortConfig> {
        const NODE: &str = "sort";
        let field = self.field.ok_or(BuildError::MissingField {
            node: NODE,
            field: "field",
        })?;
        if self.order.is_none() && self.direction.is_none() {
            return Err(BuildError::MissingField {
                node: NODE,
                field: "order",
            });
        }
        if self.direction.is_some() && self.kind.is_none() {
            return Err(BuildError::MissingField {
                node: NODE,
                field: "type",
            });
        }
        Ok(SortConfig {
            kind: self.kind,
            field,
            order: self.order,
            direction: self.direction,
        })
    }
}

/// Restricts a query to a stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchFilter {
    #[serde(rename = "type")]
    kind: String,
    id: String,
}

impl SearchFilter {
    pub fn stream(id: &str) -> Self {
        Self {
            kind: "stream".to_string(),
            id: id.to_string(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Filter {
    #[serde(rename = "type")]
    kind: String,
    filters: Vec<SearchFilter>,
}

impl Default for Filter {
    fn default() -> Self {
        Self {
            kind: "or".to_string(),
            filters: vec![],
        }
    }
}

impl Filter {
    pub fn builder() -> FilterBuilder {
        FilterBuilder::default()
    }

    /// An "or" filter over the given streams.
    pub fn streams<S: AsRef<str>>(stream_ids: &[S]) -> Self {
        Self {
            filters: stream_ids
                .iter()
                .map(|id| SearchFilter::stream(id.as_ref()))
                .collect(),
            ..Default::default()
        }
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn filters(&self) -> &[SearchFilter] {
        &self.filters
    }
}

#[derive(Debug, Default)]
pub struct FilterBuilder {
    kind: Option<String>,
    filters: Vec<SearchFilter>,
}

impl FilterBuilder {
    /// "or" (the default) or "and".
    pub fn kind(mut self, kind: &str) -> Self {
        self.kind = Some(kind.to_string());
        self
    }

    pub fn filter(mut self, filter: SearchFilter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn filters(mut self, filters: Vec<SearchFilter>) -> Self {
        self.filters.extend(filters);
        self
    }

    pub fn build(self) -> BuildResult<Filter> {
        let kind = self.kind.unwrap_or_else(|| "or".to_string());
        if kind != "or" && kind != "and" {
            return Err(BuildError::InvalidValue {
                node: "filter",
                reason: format!("unknown filter type: {kind}"),
            });
        }
        // Keep the first occurrence of each stream.
        let mut seen = HashSet::new();
        let filters = self
            .filters
            .into_iter()
            .filter(|f| seen.insert(f.id.clone()))
            .collect();
        Ok(Filter { kind, filters })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchQuery {
    #[serde(rename = "type")]
    kind: String,
    query_string: String,
}

impl Default for SearchQuery {
    fn default() -> Self {
        Self {
            kind: "elasticsearch".to_string(),
            query_string: String::new(),
        }
    }
}

impl SearchQuery {
    pub fn new(query_string: &str) -> Self {
        Self {
            query_string: query_string.to_string(),
            ..Default::default()
        }
    }

    pub fn query_string(&self) -> &str {
        &self.query_string
    }
}

/// Server side post-processing of message results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Decorator {
    id: String,
    order: i32,
    #[serde(rename = "type")]
    kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    stream: Option<String>,
}

impl Decorator {
    pub fn new(id: &str, order: i32, kind: &str) -> Self {
        Self {
            id: id.to_string(),
            order,
            kind: kind.to_string(),
            stream: None,
        }
    }

    pub fn with_stream(mut self, stream: &str) -> Self {
        self.stream = Some(stream.to_string());
        self
    }
}

/// One facet of a query: a pivot (aggregation) or a message list.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchType {
    id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    query: Option<SearchQuery>,
    #[serde(rename = "type")]
    kind: SearchTypeType,
    #[serde(skip_serializing_if = "Option::is_none")]
    timerange: Option<Timerange>,
    streams: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    filter: Option<Filter>,
    #[serde(skip_serializing_if = "Option::is_none")]
    sort: Option<Vec<SortConfig>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    series: Option<Vec<Series>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    column_groups: Option<Vec<SearchTypePivot>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    row_groups: Option<Vec<SearchTypePivot>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    rollup: Option<bool>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    decorators: Vec<Decorator>,
    #[serde(skip_serializing_if = "Option::is_none")]
    limit: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    offset: Option<u64>,
}

impl SearchType {
    pub fn builder() -> SearchTypeBuilder {
        SearchTypeBuilder::default()
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn kind(&self) -> SearchTypeType {
        self.kind
    }

    pub fn timerange(&self) -> Option<&Timerange> {
        self.timerange.as_ref()
    }

    pub fn series(&self) -> &[Series] {
        self.series.as_deref().unwrap_or_default()
    }

    pub fn row_groups(&self) -> &[SearchTypePivot] {
        self.row_groups.as_deref().unwrap_or_default()
    }

    pub fn column_groups(&self) -> &[SearchTypePivot] {
        self.column_groups.as_deref().unwrap_or_default()
    }

    pub fn limit(&self) -> Option<u32> {
        self.limit
    }

    pub fn offset(&self) -> Option<u64> {
        self.offset
    }
}

#[derive(Debug, Default)]
pub struct SearchTypeBuilder {
    name: Option<String>,
    query: Option<SearchQuery>,
    kind: Option<SearchTypeType>,
    timerange: Option<Timerange>,
    streams: Vec<String>,
    filter: Option<Filter>,
    sort: Option<Vec<SortConfig>>,
    series: Option<Vec<Series>>,
    column_groups: Option<Vec<SearchTypePivot>>,
    row_groups: Option<Vec<SearchTypePivot>>,
    rollup: Option<bool>,
    decorators: Vec<Decorator>,
    limit: Option<u32>,
    offset: Option<u64>,
}

impl SearchTypeBuilder {
    pub fn name(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    /// Override the query string of the enclosing query.
    pub fn query(mut self, query: SearchQuery) -> Self {
        self.query = Some(query);
        self
    }

    pub fn kind(mut self, kind: SearchTypeType) -> Self {
        self.kind = Some(kind);
        self
    }

    /// Override the time range of the enclosing query.
    pub fn timerange(mut self, timerange: Timerange) -> Self {
        self.timerange = Some(timerange);
        self
    }

    pub fn streams(mut self, streams: Vec<String>) -> Self {
        self.streams = streams;
        self
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn sort(mut self, sort: Vec<SortConfig>) -> Self {
        self.sort = Some(sort);
        self
    }

    pub fn series(mut self, series: Vec<Series>) -> Self {
        self.series = Some(series);
        self
    }

    pub fn column_groups(mut self, groups: Vec<SearchTypePivot>) -> Self {
        self.column_groups = Some(groups);
        self
    }

    pub fn row_groups(mut self, groups: Vec<SearchTypePivot>) -> Self {
        self.row_groups = Some(groups);
        self
    }

    pub fn rollup(mut self, rollup: bool) -> Self {
        self.rollup = Some(rollup);
        self
    }

    pub fn decorator(mut self, decorator: Decorator) -> Self {
        self.decorators.push(decorator);
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn build(self) -> BuildResult<SearchType> {
        self.build_with(&UuidGenerator)
    }

    pub fn build_with(self, ids: &dyn IdGenerator) -> BuildResult<SearchType> {
        const NODE: &str = "search type";
        let kind = self.kind.ok_or(BuildError::MissingField {
            node: NODE,
            field: "type",
        })?;
        let unexpected = |field: &'static str| BuildError::UnexpectedField {
            node: NODE,
            field,
            kind: kind.as_str().to_string(),
        };

        let mut search_type = SearchType {
            id: ids.generate(),
            name: self.name,
            query: self.query,
            kind,
            timerange: self.timerange,
            streams: self.streams,
            filter: self.filter,
            sort: self.sort,
            series: self.series,
            column_groups: self.column_groups,
            row_groups: self.row_groups,
            rollup: self.rollup,
            decorators: self.decorators,
            limit: self.limit,
            offset: self.offset,
        };

        match kind {
            SearchTypeType::Pivot => {
                if search_type.series().is_empty() {
                    return Err(BuildError::MissingField {
                        node: NODE,
                        field: "series",
                    });
                }
                let mut seen = HashSet::new();
                for series in search_type.series() {
                    if !seen.insert(series.id()) {
                        return Err(BuildError::InvalidValue {
                            node: NODE,
                            reason: format!("duplicate series: {}", series.id()),
                        });
                    }
                }
                if search_type.limit.is_some() {
                    return Err(unexpected("limit"));
                }
                if search_type.offset.is_some() {
                    return Err(unexpected("offset"));
                }
                if let Some(sort) = &search_type.sort {
                    if sort.iter().any(|s| !s.is_pivot_sort()) {
                        return Err(BuildError::InvalidValue {
                            node: NODE,
                            reason: "pivot sorts need a type and a direction".to_string(),
                        });
                    }
                }
                // Required by the pivot schema.
                search_type.row_groups.get_or_insert_with(Vec::new);
                search_type.column_groups.get_or_insert_with(Vec::new);
                search_type.sort.get_or_insert_with(Vec::new);
                search_type.rollup.get_or_insert(true);
            }
            SearchTypeType::Messages => {
                if search_type.series.is_some() {
                    return Err(unexpected("series"));
                }
                if search_type.row_groups.is_some() {
                    return Err(unexpected("row_groups"));
                }
                if search_type.column_groups.is_some() {
                    return Err(unexpected("column_groups"));
                }
                if search_type.rollup.is_some() {
                    return Err(unexpected("rollup"));
                }
                if let Some(sort) = &search_type.sort {
                    if sort.iter().any(|s| !s.is_message_sort()) {
                        return Err(BuildError::InvalidValue {
                            node: NODE,
                            reason: "message sorts need an order".to_string(),
                        });
                    }
                }
            }
            SearchTypeType::Events => {}
        }

        Ok(search_type)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Query {
    id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    filter: Option<Filter>,
    query: SearchQuery,
    timerange: Timerange,
    search_types: Vec<SearchType>,
}

impl Query {
    pub fn builder() -> QueryBuilder {
        QueryBuilder::default()
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn timerange(&self) -> &Timerange {
        &self.timerange
    }

    pub fn query(&self) -> &SearchQuery {
        &self.query
    }

    pub fn search_types(&self) -> &[SearchType] {
        &self.search_types
    }

    pub fn search_type(&self, id: &str) -> Option<&SearchType> {
        self.search_types.iter().find(|st| st.id == id)
    }

    pub fn search_type_by_name(&self, name: &str) -> Option<&SearchType> {
        self.search_types
            .iter()
            .find(|st| st.name.as_deref() == Some(name))
    }
}

#[derive(Debug, Default)]
pub struct QueryBuilder {
    filter: Option<Filter>,
    query: Option<SearchQuery>,
    timerange: Option<Timerange>,
    search_types: Vec<SearchType>,
}

impl QueryBuilder {
    pub fn filter(mut self, filter: Filter) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn query(mut self, query: SearchQuery) -> Self {
        self.query = Some(query);
        self
    }

    pub fn timerange(mut self, timerange: Timerange) -> Self {
        self.timerange = Some(timerange);
        self
    }

    pub fn search_type(mut self, search_type: SearchType) -> Self {
        self.search_types.push(search_type);
        self
    }

    pub fn build(self) -> BuildResult<Query> {
        self.build_with(&UuidGenerator)
    }

    pub fn build_with(self, ids: &dyn IdGenerator) -> BuildResult<Query> {
        const NODE: &str = "query";
        let timerange = self.timerange.ok_or(BuildError::MissingField {
            node: NODE,
            field: "timerange",
        })?;
        if self.search_types.is_empty() {
            return Err(BuildError::MissingField {
                node: NODE,
                field: "search_types",
            });
        }
        let mut seen = HashSet::new();
        for search_type in &self.search_types {
            if !seen.insert(search_type.id.as_str()) {
                return Err(BuildError::InvalidValue {
                    node: NODE,
                    reason: format!("duplicate search type id: {}", search_type.id),
                });
            }
        }
        Ok(Query {
            id: ids.generate(),
            filter: self.filter,
            query: self.query.unwrap_or_default(),
            timerange,
            search_types: self.search_types,
        })
    }
}

/// The full request envelope.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchSpec {
    id: String,
    queries: Vec<Query>,
    parameters: Vec<serde_json::Value>,
}

impl SearchSpec {
    pub fn builder() -> SearchSpecBuilder {
        SearchSpecBuilder::default()
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn queries(&self) -> &[Query] {
        &self.queries
    }

    pub fn query(&self, id: &str) -> Option<&Query> {
        self.queries.iter().find(|q| q.id == id)
    }

    /// Find a search type by id or name over all queries, returning it
    /// with the query that owns it.
    pub fn find_search_type(&self, id_or_name: &str) -> Option<(&Query, &SearchType)> {
        for query in &self.queries {
            if let Some(st) = query.search_type(id_or_name) {
                return Some((query, st));
            }
        }
        for query in &self.queries {
            if let Some(st) = query.search_type_by_name(id_or_name) {
                return Some((query, st));
            }
        }
        None
    }
}

#[derive(Debug, Default)]
pub struct SearchSpecBuilder {
    queries: Vec<Query>,
}

impl SearchSpecBuilder {
    pub fn query(mut self, query: Query) -> Self {
        self.queries.push(query);
        self
    }

    pub fn build(self) -> BuildResult<SearchSpec> {
        self.build_with(&UuidGenerator)
    }

    pub fn build_with(self, ids: &dyn IdGenerator) -> BuildResult<SearchSpec> {
        if self.queries.is_empty() {
            return Err(BuildError::MissingField {
                node: "search",
                field: "queries",
            });
        }
        let mut seen = HashSet::new();
        for query in &self.queries {
            if !seen.insert(query.id.as_str()) {
                return Err(BuildError::InvalidValue {
                    node: "search",
                    reason: format!("duplicate query id: {}", query.id),
                });
            }
        }
        Ok(SearchSpec {
            id: ids.object_id(),
            queries: self.queries,
            parameters: vec![],
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::search::ids::SequentialIdGenerator;
    use serde_json::json;

    fn ts(s: &str) -> DateTime {
        datetime::parse(s).unwrap()
    }

    #[test]
    fn test_timerange_serialize() {
        let relative = Timerange::builder()
            .kind(TimeRangeType::Relative)
            .range(300)
            .build()
            .unwrap();
        assert_eq!(
            serde_json::to_value(&relative).unwrap(),
            json!({"type": "relative", "range": 300})
        );

        let absolute = Timerange::absolute(ts("2020-05-01T00:00:00Z"), ts("2020-05-02T00:00:00Z")).unwrap();
        assert_eq!(
            serde_json::to_value(&absolute).unwrap(),
            json!({
                "type": "absolute",
                "from": "2020-05-01T00:00:00.000Z",
                "to": "2020-05-02T00:00:00.000Z",
            })
        );

        assert_eq!(
            serde_json::to_value(Timerange::keyword("last day")).unwrap(),
            json!({"type": "keyword", "keyword": "last day"})
        );
    }

    #[test]
    fn test_timerange_builder_rejects() {
        assert!(Timerange::builder().range(300).build().is_err());
        assert_eq!(
            Timerange::builder().kind(TimeRangeType::Relative).build(),
            Err(BuildError::MissingField {
                node: "timerange",
                field: "range"
            })
        );
        assert!(Timerange::builder()
            .kind(TimeRangeType::Relative)
            .range(300)
            .keyword("today")
            .build()
            .is_err());
        assert!(Timerange::builder()
            .kind(TimeRangeType::Absolute)
            .from(ts("2020-05-01T00:00:00Z"))
            .build()
            .is_err());
        assert!(Timerange::absolute(ts("2020-05-02T00:00:00Z"), ts("2020-05-01T00:00:00Z")).is_err());
    }

    #[test]
    fn test_timerange_deserialize() {
        let tr: Timerange = serde_json::from_value(json!({
            "type": "absolute",
            "from": "2020-05-01T00:00:00.000Z",
            "to": "2020-05-01T01:00:00.000Z",
        }))
        .unwrap();
        let (from, to) = tr.bounds().unwrap();
        assert_eq!(datetime::format(&from), "2020-05-01T00:00:00.000Z");
        assert_eq!(datetime::format(&to), "2020-05-01T01:00:00.000Z");
    }

    #[test]
    fn test_interval() {
        let interval = Interval::builder()
            .kind(IntervalType::Timeunit)
            .timeunit(IntervalTimeunit::new(TimeunitUnit::Minutes, 1).unwrap())
            .build()
            .unwrap();
        assert_eq!(
            serde_json::to_value(interval).unwrap(),
            json!({"type": "timeunit", "timeunit": "1m"})
        );
        assert_eq!(
            serde_json::to_value(Interval::auto()).unwrap(),
            json!({"type": "auto"})
        );
        assert!(IntervalTimeunit::new(TimeunitUnit::Hours, 0).is_err());
        assert!(Interval::builder().kind(IntervalType::Timeunit).build().is_err());
        assert!(Interval::builder()
            .kind(IntervalType::Auto)
            .timeunit(IntervalTimeunit::new(TimeunitUnit::Hours, 1).unwrap())
            .build()
            .is_err());

        let parsed: IntervalTimeunit = "15M".parse().unwrap();
        assert_eq!(parsed.unit(), TimeunitUnit::Months);
        assert_eq!(parsed.value(), 15);
        assert!("1y".parse::<IntervalTimeunit>().is_err());
        assert!("m".parse::<IntervalTimeunit>().is_err());
    }

    #[test]
    fn test_series() {
        assert_eq!(
            serde_json::to_value(Series::count()).unwrap(),
            json!({"id": "count()", "type": "count"})
        );
        let avg = Series::of(SeriesType::Avg, "process_time").unwrap();
        assert_eq!(
            serde_json::to_value(&avg).unwrap(),
            json!({"id": "avg(process_time)", "type": "avg", "field": "process_time"})
        );
        let p95 = Series::percentile("process_time", 95.0).unwrap();
        assert_eq!(
            serde_json::to_value(&p95).unwrap(),
            json!({
                "id": "percentile(process_time,95.0)",
                "type": "percentile",
                "field": "process_time",
                "percentile": 95.0,
            })
        );
        let card = Series::of(SeriesType::Card, "source").unwrap();
        assert_eq!(card.id(), "card(source)");
        let count_field = Series::of(SeriesType::Count, "process_time").unwrap();
        assert_eq!(count_field.id(), "count(process_time)");
    }

    #[test]
    fn test_series_rejects() {
        assert_eq!(
            Series::builder()
                .kind(SeriesType::Percentile)
                .field("process_time")
                .build(),
            Err(BuildError::MissingField {
                node: "series",
                field: "percentile"
            })
        );
        assert!(Series::percentile("process_time", 101.0).is_err());
        assert!(Series::builder().kind(SeriesType::Avg).build().is_err());
        assert!(Series::builder()
            .kind(SeriesType::Max)
            .field("x")
            .percentile(50.0)
            .build()
            .is_err());
        assert!(Series::builder().field("x").build().is_err());
    }

    #[test]
    fn test_pivot() {
        let values = SearchTypePivot::values("client_id", 10).unwrap();
        assert_eq!(
            serde_json::to_value(&values).unwrap(),
            json!({"type": "values", "field": "client_id", "limit": 10})
        );
        let time = SearchTypePivot::time("timestamp", Interval::timeunit(TimeunitUnit::Hours, 1).unwrap()).unwrap();
        assert_eq!(
            serde_json::to_value(&time).unwrap(),
            json!({
                "type": "time",
                "field": "timestamp",
                "interval": {"type": "timeunit", "timeunit": "1h"},
            })
        );
        assert!(SearchTypePivot::builder()
            .kind(SearchTypePivotType::Time)
            .field("timestamp")
            .build()
            .is_err());
        assert!(SearchTypePivot::builder()
            .kind(SearchTypePivotType::Values)
            .field("x")
            .interval(Interval::auto())
            .build()
            .is_err());
        assert!(SearchTypePivot::values("x", 0).is_err());
    }

    #[test]
    fn test_sort() {
        let sort = SortConfig::message("timestamp", SortConfigOrder::Desc);
        assert_eq!(
            serde_json::to_value(&sort).unwrap(),
            json!({"field": "timestamp", "order": "DESC"})
        );
        let sort = SortConfig::builder()
            .kind(SortConfigType::Series)
            .field("count()")
            .direction(SortConfigDirection::Descending)
            .build()
            .unwrap();
        assert_eq!(
            serde_json::to_value(&sort).unwrap(),
            json!({"type": "series", "field": "count()", "direction": "Descending"})
        );
        assert!(SortConfig::builder().field("timestamp").build().is_err());
        assert!(SortConfig::builder()
            .field("count()")
            .direction(SortConfigDirection::Ascending)
            .build()
            .is_err());
    }

    #[test]
    fn test_filter_defaults() {
        let filter = Filter::builder()
            .filter(SearchFilter::stream("a"))
            .filter(SearchFilter::stream("b"))
            .filter(SearchFilter::stream("a"))
            .build()
            .unwrap();
        assert_eq!(
            serde_json::to_value(&filter).unwrap(),
            json!({
                "type": "or",
                "filters": [
                    {"type": "stream", "id": "a"},
                    {"type": "stream", "id": "b"},
                ],
            })
        );
        assert_eq!(Filter::streams(&["x"]).kind(), "or");
        assert!(Filter::builder().kind("xor").build().is_err());
        assert_eq!(
            serde_json::to_value(SearchQuery::default()).unwrap(),
            json!({"type": "elasticsearch", "query_string": ""})
        );
    }

    #[test]
    fn test_decorator() {
        let decorator = Decorator::new("d1", 0, "syslog_severity");
        assert_eq!(
            serde_json::to_value(&decorator).unwrap(),
            json!({"id": "d1", "order": 0, "type": "syslog_severity"})
        );
        let decorator = decorator.with_stream("s1");
        assert_eq!(serde_json::to_value(&decorator).unwrap()["stream"], json!("s1"));
    }

    #[test]
    fn test_search_type_pivot_defaults() {
        let ids = SequentialIdGenerator::new("st");
        let st = SearchType::builder()
            .kind(SearchTypeType::Pivot)
            .name("chart")
            .series(vec![Series::count()])
            .build_with(&ids)
            .unwrap();
        assert_eq!(
            serde_json::to_value(&st).unwrap(),
            json!({
                "id": "st-1",
                "name": "chart",
                "type": "pivot",
                "streams": [],
                "sort": [],
                "series": [{"id": "count()", "type": "count"}],
                "column_groups": [],
                "row_groups": [],
                "rollup": true,
            })
        );
    }

    #[test]
    fn test_search_type_messages() {
        let ids = SequentialIdGenerator::new("st");
        let st = SearchType::builder()
            .kind(SearchTypeType::Messages)
            .limit(10)
            .offset(20)
            .sort(vec![SortConfig::message("timestamp", SortConfigOrder::Desc)])
            .decorator(Decorator::new("d1", 0, "format_string"))
            .build_with(&ids)
            .unwrap();
        let value = serde_json::to_value(&st).unwrap();
        assert_eq!(value["type"], json!("messages"));
        assert_eq!(value["limit"], json!(10));
        assert_eq!(value["offset"], json!(20));
        assert_eq!(value["decorators"][0]["id"], json!("d1"));
        assert!(value.get("series").is_none());
        assert!(value.get("rollup").is_none());
        assert!(value.get("name").is_none());
        assert!(value.get("timerange").is_none());
    }

    #[test]
    fn test_search_type_rejects() {
        assert!(SearchType::builder().kind(SearchTypeType::Pivot).build().is_err());
        assert!(SearchType::builder()
            .kind(SearchTypeType::Messages)
            .series(vec![Series::count()])
            .build()
            .is_err());
        assert!(SearchType::builder()
            .kind(SearchTypeType::Pivot)
            .series(vec![Series::count(), Series::count()])
            .build()
            .is_err());
        assert!(SearchType::builder()
            .kind(SearchTypeType::Pivot)
            .series(vec![Series::count()])
            .sort(vec![SortConfig::message("timestamp", SortConfigOrder::Asc)])
            .build()
            .is_err());
        assert!(SearchType::builder()
            .kind(SearchTypeType::Pivot)
            .series(vec![Series::count()])
            .limit(10)
            .build()
            .is_err());
        assert!(SearchType::builder().series(vec![Series::count()]).build().is_err());
    }

    #[test]
    fn test_search_type_ids_unique() {
        let a = SearchType::builder()
            .kind(SearchTypeType::Messages)
            .build()
            .unwrap();
        let b = SearchType::builder()
            .kind(SearchTypeType::Messages)
            .build()
            .unwrap();
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn test_search_spec() {
        let ids = SequentialIdGenerator::new("id");
        let st = SearchType::builder()
            .kind(SearchTypeType::Pivot)
            .name("chart")
            .series(vec![Series::count()])
            .row_groups(vec![SearchTypePivot::values("client_name", 15).unwrap()])
            .build_with(&ids)
            .unwrap();
        let query = Query::builder()
            .filter(Filter::streams(&["stream-1"]))
            .query(SearchQuery::new("message:API_REQUEST_FINISHED"))
            .timerange(Timerange::relative(300))
            .search_type(st)
            .build_with(&ids)
            .unwrap();
        let spec = SearchSpec::builder().query(query).build_with(&ids).unwrap();

        assert_eq!(spec.id(), "000000000000000000000003");
        assert_eq!(spec.queries()[0].id(), "id-2");
        let (query, st) = spec.find_search_type("chart").unwrap();
        assert_eq!(query.id(), "id-2");
        assert_eq!(st.id(), "id-1");
        assert!(spec.find_search_type("id-1").is_some());
        assert!(spec.find_search_type("nope").is_none());

        let value = serde_json::to_value(&spec).unwrap();
        assert_eq!(
            value,
            json!({
                "id": "000000000000000000000003",
                "queries": [{
                    "id": "id-2",
                    "filter": {"type": "or", "filters": [{"type": "stream", "id": "stream-1"}]},
                    "query": {"type": "elasticsearch", "query_string": "message:API_REQUEST_FINISHED"},
                    "timerange": {"type": "relative", "range": 300},
                    "search_types": [{
                        "id": "id-1",
                        "name": "chart",
                        "type": "pivot",
                        "streams": [],
                        "sort": [],
                        "series": [{"id": "count()", "type": "count"}],
                        "column_groups": [],
                        "row_groups": [{"type": "values", "field": "client_name", "limit": 15}],
                        "rollup": true,
                    }],
                }],
                "parameters": [],
            })
        );
    }

    #[test]
    fn test_query_rejects() {
        assert!(Query::builder().timerange(Timerange::relative(60)).build().is_err());
        let st = SearchType::builder()
            .kind(SearchTypeType::Messages)
            .build()
            .unwrap();
        assert!(Query::builder().search_type(st.clone()).build().is_err());
        assert!(Query::builder()
            .timerange(Timerange::relative(60))
            .search_type(st.clone())
            .search_type(st)
            .build()
            .is_err());
        assert!(SearchSpec::builder().build().is_err());
    }
}

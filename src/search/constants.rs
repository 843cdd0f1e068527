// SPDX-FileCopyrightText: (C) 2024 Graylog SDK Contributors
// SPDX-License-Identifier: MIT

//! Enumerated values of the views search API. Each variant serializes to
//! the token Graylog expects, not the Rust variant name.

use serde::{Deserialize, Serialize};

use crate::datetime::BucketUnit;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeriesType {
    Count,
    Avg,
    Min,
    Max,
    Sum,
    #[serde(rename = "sumofsquares")]
    SumOfSquares,
    Variance,
    #[serde(rename = "stddev")]
    StdDev,
    Card,
    Latest,
    Percentile,
}

impl SeriesType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SeriesType::Count => "count",
            SeriesType::Avg => "avg",
            SeriesType::Min => "min",
            SeriesType::Max => "max",
            SeriesType::Sum => "sum",
            SeriesType::SumOfSquares => "sumofsquares",
            SeriesType::Variance => "variance",
            SeriesType::StdDev => "stddev",
            SeriesType::Card => "card",
            SeriesType::Latest => "latest",
            SeriesType::Percentile => "percentile",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchTypePivotType {
    Values,
    Time,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchTypeType {
    Pivot,
    Messages,
    Events,
}

impl SearchTypeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchTypeType::Pivot => "pivot",
            SearchTypeType::Messages => "messages",
            SearchTypeType::Events => "events",
        }
    }
}

/// What a pivot sort refers to: a row/column pivot value or a series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortConfigType {
    Pivot,
    Series,
}

/// Sort order of message lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortConfigOrder {
    #[serde(rename = "ASC")]
    Asc,
    #[serde(rename = "DESC")]
    Desc,
}

/// Sort direction of pivots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortConfigDirection {
    Ascending,
    Descending,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeRangeType {
    Absolute,
    Relative,
    Keyword,
}

impl TimeRangeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimeRangeType::Absolute => "absolute",
            TimeRangeType::Relative => "relative",
            TimeRangeType::Keyword => "keyword",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IntervalType {
    Timeunit,
    Auto,
}

impl IntervalType {
    pub fn as_str(&self) -> &'static str {
        match self {
            IntervalType::Timeunit => "timeunit",
            IntervalType::Auto => "auto",
        }
    }
}

/// Units of a timeunit interval, rendered as the suffix of the
/// interval string ("1m", "2h", "1M").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeunitUnit {
    Seconds,
    Minutes,
    Hours,
    Days,
    Weeks,
    Months,
}

impl TimeunitUnit {
    pub fn suffix(&self) -> char {
        match self {
            TimeunitUnit::Seconds => 's',
            TimeunitUnit::Minutes => 'm',
            TimeunitUnit::Hours => 'h',
            TimeunitUnit::Days => 'd',
            TimeunitUnit::Weeks => 'w',
            TimeunitUnit::Months => 'M',
        }
    }

    pub fn from_suffix(suffix: char) -> Option<Self> {
        match suffix {
            's' => Some(TimeunitUnit::Seconds),
            'm' => Some(TimeunitUnit::Minutes),
            'h' => Some(TimeunitUnit::Hours),
            'd' => Some(TimeunitUnit::Days),
            'w' => Some(TimeunitUnit::Weeks),
            'M' => Some(TimeunitUnit::Months),
            _ => None,
        }
    }

    pub(crate) fn bucket_unit(&self) -> BucketUnit {
        match self {
            TimeunitUnit::Seconds => BucketUnit::Second,
            TimeunitUnit::Minutes => BucketUnit::Minute,
            TimeunitUnit::Hours => BucketUnit::Hour,
            TimeunitUnit::Days => BucketUnit::Day,
            TimeunitUnit::Weeks => BucketUnit::Week,
            TimeunitUnit::Months => BucketUnit::Month,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_tokens() {
        assert_eq!(serde_json::to_value(SeriesType::Avg).unwrap(), json!("avg"));
        assert_eq!(serde_json::to_value(SeriesType::StdDev).unwrap(), json!("stddev"));
        assert_eq!(
            serde_json::to_value(SeriesType::SumOfSquares).unwrap(),
            json!("sumofsquares")
        );
        assert_eq!(
            serde_json::to_value(SearchTypePivotType::Time).unwrap(),
            json!("time")
        );
        assert_eq!(serde_json::to_value(SortConfigOrder::Desc).unwrap(), json!("DESC"));
        assert_eq!(
            serde_json::to_value(SortConfigDirection::Descending).unwrap(),
            json!("Descending")
        );
        assert_eq!(serde_json::to_value(SortConfigType::Series).unwrap(), json!("series"));
        assert_eq!(
            serde_json::to_value(TimeRangeType::Relative).unwrap(),
            json!("relative")
        );
        assert_eq!(serde_json::to_value(IntervalType::Timeunit).unwrap(), json!("timeunit"));
        assert_eq!(serde_json::to_value(SearchTypeType::Messages).unwrap(), json!("messages"));
    }

    #[test]
    fn test_as_str_matches_serde() {
        for t in [
            SeriesType::Count,
            SeriesType::Percentile,
            SeriesType::StdDev,
            SeriesType::SumOfSquares,
            SeriesType::Card,
        ] {
            assert_eq!(serde_json::to_value(t).unwrap(), json!(t.as_str()));
        }
    }

    #[test]
    fn test_timeunit_suffix() {
        for unit in [
            TimeunitUnit::Seconds,
            TimeunitUnit::Minutes,
            TimeunitUnit::Hours,
            TimeunitUnit::Days,
            TimeunitUnit::Weeks,
            TimeunitUnit::Months,
        ] {
            assert_eq!(TimeunitUnit::from_suffix(unit.suffix()), Some(unit));
        }
        assert_eq!(TimeunitUnit::from_suffix('y'), None);
    }
}

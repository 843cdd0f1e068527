// SPDX-FileCopyrightText: (C) 2024 Graylog SDK Contributors
// SPDX-License-Identifier: MIT

//! Typed projections of search type results.
//!
//! Pivot cells are keyed by the column values followed by the series
//! id. Every decoded row lays its values out as
//! `column_combination * series_count + series_index`, in the order the
//! series were declared in the request, with missing cells set to 0.

use std::collections::{BTreeMap, HashMap};

use indexmap::IndexSet;
use serde::de::DeserializeOwned;

use super::response::{MessagesResult, PivotResult};
use super::spec::{Interval, Series, Timerange};
use crate::datetime::{self, DateTime};
use crate::page::Page;
use crate::prelude::*;

/// One aggregated metric over the whole time range.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Statistics {
    /// The series id, e.g. "avg(process_time)".
    pub name: String,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PivotRow {
    /// One value per row group.
    pub labels: Vec<String>,
    pub values: Vec<f64>,
    /// Row totals over all columns, one per series.
    pub rollup: Vec<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Terms {
    pub series: Vec<String>,
    /// Column group combinations in the order of `values`.
    pub columns: Vec<Vec<String>>,
    pub rows: Vec<PivotRow>,
    /// Totals over all rows, one per series.
    pub totals: Vec<f64>,
}

impl Terms {
    /// Value of a row for the given column combination and series.
    pub fn value(&self, row: &PivotRow, column: usize, series: usize) -> Option<f64> {
        if series >= self.series.len() {
            return None;
        }
        row.values.get(column * self.series.len() + series).copied()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistogramBucket {
    pub timestamp: DateTime,
    pub values: Vec<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Histogram {
    pub series: Vec<String>,
    pub columns: Vec<Vec<String>>,
    pub buckets: Vec<HistogramBucket>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FieldHistogramBucket {
    pub timestamp: DateTime,
    pub count: f64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub total: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FieldHistogram {
    pub field: String,
    pub buckets: Vec<FieldHistogramBucket>,
}

/// The series a field histogram requests, in the order
/// `field_histogram` reads them back.
pub(crate) fn field_histogram_series(field: &str) -> Result<Vec<Series>, BuildError> {
    use super::constants::SeriesType;
    Ok(vec![
        Series::count(),
        Series::of(SeriesType::Min, field)?,
        Series::of(SeriesType::Max, field)?,
        Series::of(SeriesType::Avg, field)?,
        Series::of(SeriesType::Sum, field)?,
    ])
}

struct PivotTable {
    columns: Vec<Vec<String>>,
    rows: Vec<PivotRow>,
    totals: Vec<f64>,
}

fn label(value: &JsonValue) -> String {
    match value {
        JsonValue::String(s) => s.clone(),
        JsonValue::Null => String::new(),
        other => other.to_string(),
    }
}

/// Numeric cell value. Nulls, NaN and infinities become 0.
pub(crate) fn number(value: &JsonValue) -> f64 {
    let n = match value {
        JsonValue::Number(n) => n.as_f64(),
        JsonValue::String(s) => s.parse::<f64>().ok(),
        _ => None,
    };
    n.filter(|n| n.is_finite()).unwrap_or(0.0)
}

type Cells = HashMap<(Vec<String>, String), f64>;

fn cells(row: &super::response::PivotResultRow) -> Cells {
    let mut cells = HashMap::new();
    for value in &row.values {
        if let Some((series, columns)) = value.key.split_last() {
            let columns = columns.iter().map(label).collect();
            cells.insert((columns, label(series)), number(&value.value));
        }
    }
    cells
}

fn lookup(cells: &Cells, columns: &[String], series: &str) -> f64 {
    cells
        .get(&(columns.to_vec(), series.to_string()))
        .copied()
        .unwrap_or(0.0)
}

/// Fail on cells the requested layout has no slot for. Series that are
/// requested but absent are not an error, they decode to 0.
fn check_cells(result: &PivotResult, cells: &Cells, series_ids: &[&str], has_columns: bool) -> Result<()> {
    for (columns, series_id) in cells.keys() {
        if !series_ids.contains(&series_id.as_str()) {
            return Err(GraylogError::decode(format!(
                "pivot {} returned unrequested series {}",
                result.id, series_id
            )));
        }
        if !has_columns && !columns.is_empty() {
            return Err(GraylogError::decode(format!(
                "pivot {} returned column values {:?} without column groups",
                result.id, columns
            )));
        }
    }
    Ok(())
}

fn pivot_table(result: &PivotResult, series: &[Series], has_columns: bool) -> Result<PivotTable> {
    let series_ids: Vec<&str> = series.iter().map(|s| s.id()).collect();

    let mut columns: IndexSet<Vec<String>> = IndexSet::new();
    if has_columns {
        for row in result.rows.iter().filter(|r| r.is_leaf()) {
            for value in row.values.iter().filter(|v| !v.rollup) {
                if let Some((id, cols)) = value.key.split_last() {
                    if !cols.is_empty() && series_ids.contains(&label(id).as_str()) {
                        columns.insert(cols.iter().map(label).collect());
                    }
                }
            }
        }
    } else {
        columns.insert(vec![]);
    }

    let mut rows = vec![];
    let mut totals = vec![0.0; series.len()];
    for row in &result.rows {
        let cells = cells(row);
        check_cells(result, &cells, &series_ids, has_columns)?;
        let rollup: Vec<f64> = series_ids.iter().map(|id| lookup(&cells, &[], id)).collect();
        if row.key.is_empty() {
            totals = rollup;
            continue;
        }
        if !row.is_leaf() {
            continue;
        }
        let mut values = Vec::with_capacity(columns.len() * series.len());
        for combination in &columns {
            for id in &series_ids {
                values.push(lookup(&cells, combination, id));
            }
        }
        rows.push(PivotRow {
            labels: row.key.iter().map(label).collect(),
            values,
            rollup,
        });
    }

    Ok(PivotTable {
        columns: columns.into_iter().collect(),
        rows,
        totals,
    })
}

/// One value per declared series, taken from the totals row.
pub fn statistics(result: &PivotResult, series: &[Series]) -> Result<Vec<Statistics>> {
    let table = pivot_table(result, series, false)?;
    Ok(series
        .iter()
        .zip(table.totals)
        .map(|(s, value)| Statistics {
            name: s.id().to_string(),
            value,
        })
        .collect())
}

pub fn terms(result: &PivotResult, series: &[Series], has_columns: bool) -> Result<Terms> {
    let table = pivot_table(result, series, has_columns)?;
    Ok(Terms {
        series: series.iter().map(|s| s.id().to_string()).collect(),
        columns: table.columns,
        rows: table.rows,
        totals: table.totals,
    })
}

/// Decode a time pivot. With a timeunit interval and known bounds the
/// buckets are zero filled over `[from, to)`.
pub fn histogram(
    result: &PivotResult,
    series: &[Series],
    has_columns: bool,
    interval: &Interval,
    timerange: &Timerange,
) -> Result<Histogram> {
    let table = pivot_table(result, series, has_columns)?;
    let width = table.columns.len() * series.len();

    let mut buckets: BTreeMap<DateTime, Vec<f64>> = BTreeMap::new();
    for row in table.rows {
        let key = row.labels.first().map(String::as_str).unwrap_or_default();
        let timestamp = datetime::parse(key)
            .map_err(|err| GraylogError::decode(format!("histogram bucket: {err}")))?;
        buckets.insert(timestamp, row.values);
    }

    let bounds = timerange
        .bounds()
        .or_else(|| result.effective_timerange.as_ref().and_then(|t| t.bounds()));
    if let (Interval::Timeunit { timeunit }, Some((from, to))) = (interval, bounds) {
        let unit = timeunit.unit().bucket_unit();
        match datetime::bucket_starts(&from, &to, unit, timeunit.value()) {
            Some(starts) => {
                for start in starts {
                    buckets.entry(start).or_insert_with(|| vec![0.0; width]);
                }
            }
            None => warn!("Too many buckets for interval {}, not zero filling", timeunit),
        }
    }

    Ok(Histogram {
        series: series.iter().map(|s| s.id().to_string()).collect(),
        columns: table.columns,
        buckets: buckets
            .into_iter()
            .map(|(timestamp, values)| HistogramBucket { timestamp, values })
            .collect(),
    })
}

/// Reshape a histogram requested with `field_histogram_series`.
pub fn field_histogram(field: &str, histogram: Histogram) -> FieldHistogram {
    let buckets = histogram
        .buckets
        .into_iter()
        .map(|bucket| {
            let at = |i: usize| bucket.values.get(i).copied().unwrap_or(0.0);
            FieldHistogramBucket {
                timestamp: bucket.timestamp,
                count: at(0),
                min: at(1),
                max: at(2),
                mean: at(3),
                total: at(4),
            }
        })
        .collect();
    FieldHistogram {
        field: field.to_string(),
        buckets,
    }
}

pub fn messages<T: DeserializeOwned>(result: MessagesResult, page: u32, size: u32) -> Result<Page<T>> {
    let list = result
        .messages
        .into_iter()
        .map(|envelope| serde_json::from_value(envelope.message))
        .collect::<Result<Vec<T>, _>>()
        .map_err(|err| GraylogError::decode(format!("message: {err}")))?;
    Ok(Page::new(list, result.total_results, page.max(1), size))
}

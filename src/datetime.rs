// SPDX-FileCopyrightText: (C) 2024 Graylog SDK Contributors
// SPDX-License-Identifier: MIT

use chrono::{Datelike, Months, NaiveDate, NaiveDateTime, SecondsFormat, TimeDelta};

pub type DateTime = chrono::DateTime<chrono::Utc>;

/// Upper bound on generated histogram buckets. A larger range is most
/// likely a caller error (seconds over a year) and is not zero filled.
pub(crate) const MAX_BUCKETS: usize = 100_000;

#[derive(Debug)]
pub struct ParseError(String);

impl std::error::Error for ParseError {}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "invalid timestamp: {}", self.0)
    }
}

/// Format to the style Graylog expects in requests.
///
/// RFC3339, UTC with a Z suffix and millisecond precision.
pub fn format(dt: &DateTime) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Parse a timestamp as found in Graylog responses.
///
/// Accepts RFC3339, the space separated "YYYY-MM-DD HH:MM:SS[.fff]"
/// form (assumed UTC) and Unix seconds.
pub fn parse(input: &str) -> Result<DateTime, ParseError> {
    let input = input.trim();
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(input) {
        return Ok(dt.to_utc());
    }
    for format in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(input, format) {
            return Ok(dt.and_utc());
        }
    }
    if let Ok(seconds) = input.parse::<i64>() {
        if let Some(dt) = chrono::DateTime::from_timestamp(seconds, 0) {
            return Ok(dt);
        }
    }
    Err(ParseError(input.to_string()))
}

/// Units a histogram can be bucketed by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BucketUnit {
    Second,
    Minute,
    Hour,
    Day,
    Week,
    Month,
    Quarter,
    Year,
}

impl BucketUnit {
    fn fixed_seconds(&self) -> Option<i64> {
        match self {
            BucketUnit::Second => Some(1),
            BucketUnit::Minute => Some(60),
            BucketUnit::Hour => Some(3600),
            BucketUnit::Day => Some(86400),
            _ => None,
        }
    }

    /// Start of the bucket containing `dt`.
    ///
    /// Fixed size units are aligned to multiples of `count` since the
    /// epoch; weeks start on Monday.
    pub fn truncate(&self, dt: &DateTime, count: u32) -> DateTime {
        let count = count.max(1);
        if let Some(seconds) = self.fixed_seconds() {
            let size = seconds * count as i64;
            let ts = dt.timestamp().div_euclid(size) * size;
            return from_seconds(ts);
        }
        let date = dt.date_naive();
        let start = match self {
            BucketUnit::Week => {
                let monday = date - TimeDelta::days(date.weekday().num_days_from_monday() as i64);
                if count > 1 {
                    // Align to multiples of `count` weeks counting from
                    // the first Monday after the epoch.
                    let size = 7 * count as i64;
                    let days = (monday - first_monday()).num_days().div_euclid(size) * size;
                    first_monday() + TimeDelta::days(days)
                } else {
                    monday
                }
            }
            BucketUnit::Month | BucketUnit::Quarter | BucketUnit::Year => {
                let months = self.months() as i32 * count as i32;
                let index = (date.year() * 12 + date.month0() as i32).div_euclid(months) * months;
                NaiveDate::from_ymd_opt(index.div_euclid(12), index.rem_euclid(12) as u32 + 1, 1)
                    .unwrap_or(date)
            }
            _ => date,
        };
        start.and_time(chrono::NaiveTime::MIN).and_utc()
    }

    /// The start of the next bucket after the bucket starting at `dt`.
    pub fn advance(&self, dt: &DateTime, count: u32) -> Option<DateTime> {
        let count = count.max(1);
        if let Some(seconds) = self.fixed_seconds() {
            return dt.checked_add_signed(TimeDelta::seconds(seconds * count as i64));
        }
        match self {
            BucketUnit::Week => dt.checked_add_signed(TimeDelta::days(7 * count as i64)),
            _ => dt.checked_add_months(Months::new(self.months() * count)),
        }
    }

    fn months(&self) -> u32 {
        match self {
            BucketUnit::Quarter => 3,
            BucketUnit::Year => 12,
            _ => 1,
        }
    }
}

fn first_monday() -> NaiveDate {
    // 1970-01-05 was the first Monday after the epoch.
    NaiveDate::from_ymd_opt(1970, 1, 5).unwrap_or_default()
}

fn from_seconds(seconds: i64) -> DateTime {
    chrono::DateTime::from_timestamp(seconds, 0).unwrap_or_default()
}

/// Aligned start times of the buckets of `[from, to)`.
///
/// The range yields one bucket per interval step, rounded up, so an
/// unaligned 24 hour window has 24 hourly buckets. The first bucket is
/// the one containing `from`.
///
/// Returns None if the range would produce more than MAX_BUCKETS.
pub fn bucket_starts(from: &DateTime, to: &DateTime, unit: BucketUnit, count: u32) -> Option<Vec<DateTime>> {
    let mut buckets = vec![];
    let mut next = unit.truncate(from, count);
    let offset = *from - next;
    while next.checked_add_signed(offset)? < *to {
        if buckets.len() >= MAX_BUCKETS {
            return None;
        }
        buckets.push(next);
        next = unit.advance(&next, count)?;
    }
    Some(buckets)
}

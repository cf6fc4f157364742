//! Timestamp parsing and conversion between chrono and Polars datetimes.
//!
//! Batches read from CSV carry timestamps as text; [`coerce_timestamp_column`]
//! turns such a column into a `Datetime(ms)` column. Time zones are dropped:
//! an offset timestamp is converted to UTC wall-clock time.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use polars::prelude::*;

use iotfn_model::SchemaError;

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d %H:%M",
    "%d-%b-%Y %H:%M:%S", // 15-Jan-2024 10:30:00
    "%d-%b-%Y %H:%M",
    "%d/%m/%Y %H:%M:%S", // European
    "%d/%m/%Y %H:%M",
    "%m/%d/%Y %H:%M:%S", // US
    "%m/%d/%Y %H:%M",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%d-%b-%Y", "%d/%m/%Y", "%m/%d/%Y"];

/// Parse a timestamp in one of the common ISO, US or European layouts.
///
/// Date-only values resolve to midnight. RFC 3339 values with an offset are
/// converted to UTC.
pub fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.naive_utc());
    }
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(trimmed, fmt).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(trimmed, fmt).ok())
                .map(|date| date.and_time(NaiveTime::MIN))
        })
}

/// Milliseconds since the Unix epoch.
pub fn to_millis(value: NaiveDateTime) -> i64 {
    value.and_utc().timestamp_millis()
}

pub fn from_millis(millis: i64) -> Option<NaiveDateTime> {
    DateTime::from_timestamp_millis(millis).map(|dt| dt.naive_utc())
}

/// Days since the Unix epoch, the physical value of a Polars `Date`.
pub fn to_epoch_days(date: NaiveDate) -> i32 {
    let epoch = NaiveDate::from_ymd_opt(1970, 1, 1).unwrap_or(NaiveDate::MIN);
    i32::try_from((date - epoch).num_days()).unwrap_or(i32::MAX)
}

/// Build a `Datetime(ms)` column from epoch milliseconds.
pub fn datetime_column(name: &str, millis: Vec<Option<i64>>) -> PolarsResult<Column> {
    Column::new(name.into(), millis).cast(&DataType::Datetime(TimeUnit::Milliseconds, None))
}

/// Build a `Date` column from epoch days.
pub fn date_column(name: &str, days: Vec<Option<i32>>) -> PolarsResult<Column> {
    Column::new(name.into(), days).cast(&DataType::Date)
}

/// Read a `Datetime` column as epoch milliseconds, whatever its time unit.
pub fn timestamp_millis(df: &DataFrame, name: &str) -> Result<Vec<Option<i64>>, SchemaError> {
    let column = df
        .column(name)
        .map_err(|_| SchemaError::MissingColumn(name.to_string()))?;
    let DataType::Datetime(unit, _) = column.dtype() else {
        return Err(SchemaError::WrongType {
            column: name.to_string(),
            expected: "datetime".to_string(),
            found: column.dtype().to_string(),
        });
    };
    let per_milli: i64 = match unit {
        TimeUnit::Milliseconds => 1,
        TimeUnit::Microseconds => 1_000,
        TimeUnit::Nanoseconds => 1_000_000,
    };
    let physical = column
        .cast(&DataType::Int64)
        .map_err(|err| SchemaError::WrongType {
            column: name.to_string(),
            expected: "datetime".to_string(),
            found: err.to_string(),
        })?;
    let values = physical
        .i64()
        .map_err(|err| SchemaError::WrongType {
            column: name.to_string(),
            expected: "datetime".to_string(),
            found: err.to_string(),
        })?
        .into_iter()
        .map(|value| value.map(|v| v.div_euclid(per_milli)))
        .collect();
    Ok(values)
}

/// Convert a text timestamp column into `Datetime(ms)`.
///
/// Datetime columns are returned unchanged. Blank cells become null; any other
/// unparseable value is a schema error.
pub fn coerce_timestamp_column(df: &DataFrame, name: &str) -> Result<DataFrame, SchemaError> {
    let column = df
        .column(name)
        .map_err(|_| SchemaError::MissingColumn(name.to_string()))?;
    match column.dtype() {
        DataType::Datetime(_, _) => return Ok(df.clone()),
        DataType::String => {}
        other => {
            return Err(SchemaError::WrongType {
                column: name.to_string(),
                expected: "datetime or text".to_string(),
                found: other.to_string(),
            });
        }
    }

    let mut millis = Vec::with_capacity(column.len());
    let texts = column.str().map_err(|err| SchemaError::WrongType {
        column: name.to_string(),
        expected: "text".to_string(),
        found: err.to_string(),
    })?;
    for value in texts {
        match value.map(str::trim) {
            None | Some("") => millis.push(None),
            Some(text) => match parse_timestamp(text) {
                Some(parsed) => millis.push(Some(to_millis(parsed))),
                None => {
                    return Err(SchemaError::WrongType {
                        column: name.to_string(),
                        expected: "datetime".to_string(),
                        found: format!("text '{text}'"),
                    });
                }
            },
        }
    }

    let converted = datetime_column(name, millis).map_err(|err| SchemaError::WrongType {
        column: name.to_string(),
        expected: "datetime".to_string(),
        found: err.to_string(),
    })?;
    let mut out = df.clone();
    out.with_column(converted)
        .map_err(|err| SchemaError::WrongType {
            column: name.to_string(),
            expected: "datetime".to_string(),
            found: err.to_string(),
        })?;
    Ok(out)
}

//! Column coercion - best-effort conversion of one column to a declared dtype.

use chrono::{NaiveDate, NaiveDateTime};
use polars::prelude::*;
use std::str::FromStr;

/// Layouts tried after the configured one when text becomes a timestamp.
const FALLBACK_TIMESTAMP_FORMATS: [&str; 3] = [
    "%Y-%m-%d_%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
];

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Convert `column` to `target`.
///
/// Text columns are parsed value by value; any non-null value that does not
/// parse fails the whole column. Other dtype pairs use a strict cast, so a
/// conversion that would introduce new nulls also fails. Nulls stay null.
pub fn coerce_column(
    column: &Column,
    target: &DataType,
    datetime_format: &str,
) -> PolarsResult<Column> {
    if column.dtype() == target {
        return Ok(column.clone());
    }

    match (column.dtype(), target) {
        (
            DataType::String,
            DataType::UInt8 | DataType::UInt16 | DataType::UInt32 | DataType::UInt64,
        ) => {
            let ca: UInt64Chunked = parse_each(column, |s| parse_number::<u64>(s, target))?;
            finish(ca.into_series(), column.name(), target)
        }
        (DataType::String, t) if t.is_integer() => {
            let ca: Int64Chunked = parse_each(column, |s| parse_number::<i64>(s, target))?;
            finish(ca.into_series(), column.name(), target)
        }
        (DataType::String, t) if t.is_float() => {
            let ca: Float64Chunked = parse_each(column, |s| parse_number::<f64>(s, target))?;
            finish(ca.into_series(), column.name(), target)
        }
        (DataType::String, DataType::Boolean) => {
            let ca: BooleanChunked = parse_each(column, parse_bool)?;
            finish(ca.into_series(), column.name(), target)
        }
        (DataType::String, DataType::Datetime(unit, None)) => {
            let unit = *unit;
            let ca: Int64Chunked =
                parse_each(column, |s| parse_timestamp(s, unit, datetime_format))?;
            finish(ca.into_series(), column.name(), target)
        }
        _ => column.strict_cast(target),
    }
}

/// Apply `parse` to every non-null value of a string column.
fn parse_each<T, C, F>(column: &Column, parse: F) -> PolarsResult<C>
where
    C: FromIterator<Option<T>>,
    F: Fn(&str) -> PolarsResult<T>,
{
    column
        .str()?
        .into_iter()
        .map(|opt| opt.map(|s| parse(s.trim())).transpose())
        .collect()
}

fn finish(series: Series, name: &PlSmallStr, target: &DataType) -> PolarsResult<Column> {
    Ok(series
        .with_name(name.clone())
        .strict_cast(target)?
        .into_column())
}

fn unparsable(value: &str, target: &DataType) -> PolarsError {
    PolarsError::ComputeError(format!("cannot parse '{}' as {}", value, target).into())
}

fn parse_number<T: FromStr>(s: &str, target: &DataType) -> PolarsResult<T> {
    s.parse::<T>().map_err(|_| unparsable(s, target))
}

fn parse_bool(s: &str) -> PolarsResult<bool> {
    if s.eq_ignore_ascii_case("true") {
        Ok(true)
    } else if s.eq_ignore_ascii_case("false") {
        Ok(false)
    } else {
        Err(unparsable(s, &DataType::Boolean))
    }
}

/// Parse a timestamp into an epoch offset in `unit`, as naive UTC.
fn parse_timestamp(s: &str, unit: TimeUnit, datetime_format: &str) -> PolarsResult<i64> {
    let parsed = std::iter::once(datetime_format)
        .chain(FALLBACK_TIMESTAMP_FORMATS)
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(s, DATE_FORMAT)
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        });

    let target = DataType::Datetime(unit, None);
    let dt = parsed.ok_or_else(|| unparsable(s, &target))?.and_utc();
    let value = match unit {
        TimeUnit::Nanoseconds => dt.timestamp_nanos_opt(),
        TimeUnit::Microseconds => Some(dt.timestamp_micros()),
        TimeUnit::Milliseconds => Some(dt.timestamp_millis()),
    };
    value.ok_or_else(|| unparsable(s, &target))
}

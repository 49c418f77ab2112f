//! Safe accessors over loosely-typed exchange payloads.
//!
//! Every accessor returns `None` instead of failing when a field is absent,
//! `null`, an empty string, or of an unusable shape. The `_n` variants try a
//! list of candidate keys in priority order and take the first present value.

use chrono::{DateTime, TimeZone, Utc};
use num_traits::ToPrimitive;
use rust_decimal::Decimal;
use serde_json::Value;
use std::str::FromStr;

/// Field lookup on an object. Returns `None` for non-objects.
pub fn value<'a>(v: &'a Value, key: &str) -> Option<&'a Value> {
    match v.get(key) {
        Some(Value::Null) | None => None,
        Some(found) => Some(found),
    }
}

/// Positional lookup on an array. Returns `None` for non-arrays.
pub fn index(v: &Value, i: usize) -> Option<&Value> {
    match v.get(i) {
        Some(Value::Null) | None => None,
        Some(found) => Some(found),
    }
}

pub fn array<'a>(v: &'a Value, key: &str) -> &'a [Value] {
    value(v, key)
        .and_then(Value::as_array)
        .map_or(&[], Vec::as_slice)
}

fn scalar_to_string(v: &Value) -> Option<String> {
    match v {
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

pub fn string(v: &Value, key: &str) -> Option<String> {
    value(v, key).and_then(scalar_to_string)
}

pub fn string_at(v: &Value, i: usize) -> Option<String> {
    index(v, i).and_then(scalar_to_string)
}

pub fn string_n(v: &Value, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| string(v, key))
}

pub fn string_lower(v: &Value, key: &str) -> Option<String> {
    string(v, key).map(|s| s.to_lowercase())
}

pub fn string_upper(v: &Value, key: &str) -> Option<String> {
    string(v, key).map(|s| s.to_uppercase())
}

/// Parse a decimal from plain or scientific notation.
pub fn parse_decimal(s: &str) -> Option<Decimal> {
    let trimmed = s.trim().trim_start_matches('+');
    Decimal::from_str(trimmed)
        .or_else(|_| Decimal::from_scientific(trimmed))
        .ok()
}

fn scalar_to_decimal(v: &Value) -> Option<Decimal> {
    match v {
        Value::String(s) => parse_decimal(s),
        // Go through the textual form so floats keep their printed digits.
        Value::Number(n) => parse_decimal(&n.to_string()),
        _ => None,
    }
}

pub fn decimal(v: &Value, key: &str) -> Option<Decimal> {
    value(v, key).and_then(scalar_to_decimal)
}

pub fn decimal_at(v: &Value, i: usize) -> Option<Decimal> {
    index(v, i).and_then(scalar_to_decimal)
}

pub fn decimal_n(v: &Value, keys: &[&str]) -> Option<Decimal> {
    keys.iter().find_map(|key| decimal(v, key))
}

fn scalar_to_integer(v: &Value) -> Option<i64> {
    match v {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s
            .parse::<i64>()
            .ok()
            .or_else(|| parse_decimal(s).and_then(|d| d.trunc().to_i64())),
        _ => None,
    }
}

pub fn integer(v: &Value, key: &str) -> Option<i64> {
    value(v, key).and_then(scalar_to_integer)
}

pub fn integer_at(v: &Value, i: usize) -> Option<i64> {
    index(v, i).and_then(scalar_to_integer)
}

pub fn integer_n(v: &Value, keys: &[&str]) -> Option<i64> {
    keys.iter().find_map(|key| integer(v, key))
}

fn seconds_to_ms(v: &Value) -> Option<i64> {
    scalar_to_decimal(v)
        .and_then(|secs| secs.checked_mul(Decimal::ONE_THOUSAND))
        .and_then(|ms| ms.trunc().to_i64())
}

/// A timestamp expressed in (possibly fractional) seconds, returned in ms.
pub fn timestamp_secs(v: &Value, key: &str) -> Option<i64> {
    value(v, key).and_then(seconds_to_ms)
}

pub fn timestamp_secs_at(v: &Value, i: usize) -> Option<i64> {
    index(v, i).and_then(seconds_to_ms)
}

pub fn bool(v: &Value, key: &str) -> Option<bool> {
    match value(v, key)? {
        Value::Bool(b) => Some(*b),
        Value::String(s) => match s.to_lowercase().as_str() {
            "true" => Some(true),
            "false" => Some(false),
            _ => None,
        },
        Value::Number(n) => n.as_i64().map(|i| i != 0),
        _ => None,
    }
}

pub fn bool_n(v: &Value, keys: &[&str]) -> Option<bool> {
    keys.iter().find_map(|key| bool(v, key))
}

/// ISO-8601 rendering of a millisecond timestamp.
pub fn iso8601(ms: i64) -> Option<String> {
    Utc.timestamp_millis_opt(ms)
        .single()
        .map(|dt| dt.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string())
}

pub fn iso8601_opt(ms: Option<i64>) -> Option<String> {
    ms.and_then(iso8601)
}

/// Millisecond timestamp of an ISO-8601 / RFC 3339 string.
pub fn parse8601(s: &str) -> Option<i64> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.timestamp_millis())
        .ok()
        .or_else(|| {
            // Some venues omit the zone designator.
            chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
                .or_else(|_| chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S"))
                .map(|naive| naive.and_utc().timestamp_millis())
                .ok()
        })
}

/// Current wall-clock time in milliseconds.
pub fn milliseconds() -> i64 {
    Utc::now().timestamp_millis()
}

/// `yyyy-mm-dd` date of a millisecond timestamp.
pub fn ymd(ms: i64) -> Option<String> {
    Utc.timestamp_millis_opt(ms)
        .single()
        .map(|dt| dt.format("%Y-%m-%d").to_string())
}

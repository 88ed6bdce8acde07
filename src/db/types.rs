//! PostgreSQL row to JSON mapping.
//!
//! Type conversion uses a two-phase approach:
//! 1. `TypeCategory` classifies the column's PostgreSQL type name
//! 2. A per-category decoder extracts the value
//!
//! Every statement goes over the extended query protocol, so values arrive in
//! binary format. Types without a decoder here (geometric types, ranges,
//! multi-dimensional arrays, user-defined types, ...) come back as `null`.

use base64::{Engine as _, engine::general_purpose::STANDARD};
use bigdecimal::BigDecimal;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde_json::Value as JsonValue;
use sqlx::postgres::types::{PgInterval, PgMoney};
use sqlx::postgres::{PgHasArrayType, PgRow, PgValueFormat};
use sqlx::types::Uuid;
use sqlx::{Column, Postgres, Row, TypeInfo, ValueRef};
use std::net::IpAddr;

/// One result row, keyed by column name in select order.
pub type JsonRow = serde_json::Map<String, JsonValue>;

// =============================================================================
// Type Classification
// =============================================================================

/// Logical category for PostgreSQL column types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeCategory {
    Integer,
    Float,
    Decimal,
    Money,
    Boolean,
    Json,
    Uuid,
    Timestamp,
    TimestampTz,
    Date,
    Time,
    Interval,
    Inet,
    Binary,
    Text,
    /// One-dimensional array; the element type is the name without `[]`.
    Array,
    Unknown,
}

/// Classify a PostgreSQL type name into a logical category.
///
/// Matching is on the exact type name, so `INTERVAL` or `POINT` never land in
/// the integer bucket.
pub fn categorize_type(type_name: &str) -> TypeCategory {
    let upper = type_name.to_ascii_uppercase();
    if upper.ends_with("[]") {
        return TypeCategory::Array;
    }
    match upper.as_str() {
        "INT2" | "INT4" | "INT8" | "SMALLINT" | "INTEGER" | "BIGINT" | "SMALLSERIAL"
        | "SERIAL" | "BIGSERIAL" => TypeCategory::Integer,
        "FLOAT4" | "FLOAT8" | "REAL" | "DOUBLE PRECISION" => TypeCategory::Float,
        "NUMERIC" | "DECIMAL" => TypeCategory::Decimal,
        "MONEY" => TypeCategory::Money,
        "BOOL" | "BOOLEAN" => TypeCategory::Boolean,
        "JSON" | "JSONB" => TypeCategory::Json,
        "UUID" => TypeCategory::Uuid,
        "TIMESTAMP" => TypeCategory::Timestamp,
        "TIMESTAMPTZ" => TypeCategory::TimestampTz,
        "DATE" => TypeCategory::Date,
        "TIME" => TypeCategory::Time,
        "INTERVAL" => TypeCategory::Interval,
        "INET" | "CIDR" => TypeCategory::Inet,
        "BYTEA" => TypeCategory::Binary,
        // sqlx names bpchar `CHAR`.
        "TEXT" | "VARCHAR" | "CHAR" | "BPCHAR" | "NAME" | "CITEXT" => TypeCategory::Text,
        _ => TypeCategory::Unknown,
    }
}

// =============================================================================
// Value Formatting
// =============================================================================

/// Decode binary data to a JSON string: UTF-8 text when valid, base64 otherwise.
pub fn decode_binary_value(bytes: &[u8]) -> JsonValue {
    match std::str::from_utf8(bytes) {
        Ok(s) => JsonValue::String(s.to_string()),
        Err(_) => JsonValue::String(STANDARD.encode(bytes)),
    }
}

/// Render an interval the way PostgreSQL's default `IntervalStyle` does,
/// e.g. `1 year 2 mons 3 days 04:05:06.5`.
pub fn format_interval(interval: &PgInterval) -> String {
    fn unit(n: i32, one: &str, many: &str) -> String {
        if n == 1 {
            format!("1 {}", one)
        } else {
            format!("{} {}", n, many)
        }
    }

    let mut parts = Vec::new();
    let (years, months) = (interval.months / 12, interval.months % 12);
    if years != 0 {
        parts.push(unit(years, "year", "years"));
    }
    if months != 0 {
        parts.push(unit(months, "mon", "mons"));
    }
    if interval.days != 0 {
        parts.push(unit(interval.days, "day", "days"));
    }

    if interval.microseconds != 0 || parts.is_empty() {
        let sign = if interval.microseconds < 0 { "-" } else { "" };
        let total = interval.microseconds.unsigned_abs();
        let (secs, micros) = (total / 1_000_000, total % 1_000_000);
        let mut time = format!(
            "{}{:02}:{:02}:{:02}",
            sign,
            secs / 3600,
            (secs / 60) % 60,
            secs % 60
        );
        if micros != 0 {
            let fraction = format!("{:06}", micros);
            time.push('.');
            time.push_str(fraction.trim_end_matches('0'));
        }
        parts.push(time);
    }

    parts.join(" ")
}

/// Render the binary form of an `inet`/`cidr` value: family, prefix bits,
/// cidr flag, address length, address bytes.
///
/// An `inet` with a full-length prefix prints without it, like PostgreSQL.
pub fn format_inet(bytes: &[u8]) -> Option<String> {
    let [family, bits, is_cidr, len, addr @ ..] = bytes else {
        return None;
    };
    let ip = match (*family, *len, addr.len()) {
        (2, 4, 4) => IpAddr::from(<[u8; 4]>::try_from(addr).ok()?),
        (3, 16, 16) => IpAddr::from(<[u8; 16]>::try_from(addr).ok()?),
        _ => return None,
    };
    let full = if ip.is_ipv4() { 32 } else { 128 };
    if *is_cidr == 0 && *bits == full {
        Some(ip.to_string())
    } else {
        Some(format!("{}/{}", ip, bits))
    }
}

fn float_value(v: f64) -> JsonValue {
    serde_json::Number::from_f64(v)
        .map(JsonValue::Number)
        .unwrap_or_else(|| JsonValue::String(v.to_string()))
}

// =============================================================================
// Row to JSON Trait
// =============================================================================

/// Trait for converting database rows to JSON maps.
pub trait RowToJson {
    fn to_json_map(&self) -> JsonRow;
}

impl RowToJson for PgRow {
    fn to_json_map(&self) -> JsonRow {
        self.columns()
            .iter()
            .enumerate()
            .map(|(idx, col)| {
                let type_name = col.type_info().name();
                let value = decode_column(self, idx, type_name, categorize_type(type_name));
                (col.name().to_string(), value)
            })
            .collect()
    }
}

// =============================================================================
// Decoders
// =============================================================================

fn decode_column(row: &PgRow, idx: usize, type_name: &str, category: TypeCategory) -> JsonValue {
    match row.try_get_raw(idx) {
        Ok(raw) if raw.is_null() => return JsonValue::Null,
        Ok(_) => {}
        Err(e) => {
            tracing::error!(column = idx, error = %e, "Failed to read column");
            return JsonValue::Null;
        }
    }

    let value = match category {
        TypeCategory::Array => {
            let element = type_name.get(..type_name.len() - 2).unwrap_or_default();
            decode_array(row, idx, categorize_type(element))
        }
        TypeCategory::Inet => decode_inet(row, idx),
        TypeCategory::Unknown => decode_fallback(row, idx),
        scalar => decode_scalar(row, idx, scalar),
    };

    value.unwrap_or_else(|| {
        tracing::debug!(column = idx, type_name, "Column could not be decoded; using null");
        JsonValue::Null
    })
}

fn get<'r, T>(row: &'r PgRow, idx: usize) -> Option<T>
where
    T: sqlx::Decode<'r, Postgres> + sqlx::Type<Postgres>,
{
    row.try_get::<Option<T>, _>(idx).ok().flatten()
}

fn decode_scalar(row: &PgRow, idx: usize, category: TypeCategory) -> Option<JsonValue> {
    match category {
        TypeCategory::Integer => get::<i16>(row, idx)
            .map(JsonValue::from)
            .or_else(|| get::<i32>(row, idx).map(JsonValue::from))
            .or_else(|| get::<i64>(row, idx).map(JsonValue::from)),
        TypeCategory::Float => get::<f64>(row, idx)
            .or_else(|| get::<f32>(row, idx).map(f64::from))
            .map(float_value),
        // NUMERIC keeps its exact decimal representation as a string.
        TypeCategory::Decimal => {
            get::<BigDecimal>(row, idx).map(|v| JsonValue::String(v.to_string()))
        }
        TypeCategory::Money => {
            get::<PgMoney>(row, idx).map(|v| JsonValue::String(v.to_bigdecimal(2).to_string()))
        }
        TypeCategory::Boolean => get::<bool>(row, idx).map(JsonValue::Bool),
        TypeCategory::Json => get::<JsonValue>(row, idx),
        TypeCategory::Uuid => get::<Uuid>(row, idx).map(|v| JsonValue::String(v.to_string())),
        TypeCategory::Timestamp => {
            get::<NaiveDateTime>(row, idx).map(|v| JsonValue::String(v.to_string()))
        }
        TypeCategory::TimestampTz => {
            get::<DateTime<Utc>>(row, idx).map(|v| JsonValue::String(v.to_rfc3339()))
        }
        TypeCategory::Date => get::<NaiveDate>(row, idx).map(|v| JsonValue::String(v.to_string())),
        TypeCategory::Time => get::<NaiveTime>(row, idx).map(|v| JsonValue::String(v.to_string())),
        TypeCategory::Interval => {
            get::<PgInterval>(row, idx).map(|v| JsonValue::String(format_interval(&v)))
        }
        TypeCategory::Binary => get::<Vec<u8>>(row, idx).map(|v| decode_binary_value(&v)),
        TypeCategory::Text => get::<String>(row, idx).map(JsonValue::String),
        TypeCategory::Inet | TypeCategory::Array | TypeCategory::Unknown => None,
    }
}

/// Decode a one-dimensional array whose elements are `T`; null elements stay null.
fn array_of<T>(row: &PgRow, idx: usize, to_json: impl Fn(T) -> JsonValue) -> Option<JsonValue>
where
    T: for<'a> sqlx::Decode<'a, Postgres> + sqlx::Type<Postgres> + PgHasArrayType,
{
    let values = get::<Vec<Option<T>>>(row, idx)?;
    Some(JsonValue::Array(
        values
            .into_iter()
            .map(|v| v.map(&to_json).unwrap_or(JsonValue::Null))
            .collect(),
    ))
}

fn decode_array(row: &PgRow, idx: usize, element: TypeCategory) -> Option<JsonValue> {
    match element {
        TypeCategory::Integer => array_of::<i16>(row, idx, JsonValue::from)
            .or_else(|| array_of::<i32>(row, idx, JsonValue::from))
            .or_else(|| array_of::<i64>(row, idx, JsonValue::from)),
        TypeCategory::Float => array_of::<f64>(row, idx, float_value)
            .or_else(|| array_of::<f32>(row, idx, |v| float_value(f64::from(v)))),
        TypeCategory::Decimal => {
            array_of::<BigDecimal>(row, idx, |v| JsonValue::String(v.to_string()))
        }
        TypeCategory::Boolean => array_of::<bool>(row, idx, JsonValue::Bool),
        TypeCategory::Json => array_of::<JsonValue>(row, idx, |v| v),
        TypeCategory::Uuid => array_of::<Uuid>(row, idx, |v| JsonValue::String(v.to_string())),
        TypeCategory::Timestamp => {
            array_of::<NaiveDateTime>(row, idx, |v| JsonValue::String(v.to_string()))
        }
        TypeCategory::TimestampTz => {
            array_of::<DateTime<Utc>>(row, idx, |v| JsonValue::String(v.to_rfc3339()))
        }
        TypeCategory::Date => array_of::<NaiveDate>(row, idx, |v| JsonValue::String(v.to_string())),
        TypeCategory::Time => array_of::<NaiveTime>(row, idx, |v| JsonValue::String(v.to_string())),
        TypeCategory::Interval => {
            array_of::<PgInterval>(row, idx, |v| JsonValue::String(format_interval(&v)))
        }
        TypeCategory::Binary => array_of::<Vec<u8>>(row, idx, |v| decode_binary_value(&v)),
        TypeCategory::Text => array_of::<String>(row, idx, JsonValue::String),
        _ => None,
    }
}

fn decode_inet(row: &PgRow, idx: usize) -> Option<JsonValue> {
    let raw = row.try_get_raw(idx).ok()?;
    let text = match raw.format() {
        PgValueFormat::Binary => format_inet(raw.as_bytes().ok()?)?,
        PgValueFormat::Text => raw.as_str().ok()?.to_string(),
    };
    Some(JsonValue::String(text))
}

/// Values of unrecognized types are only usable when the server sent them as
/// text; their binary encodings are type-specific.
fn decode_fallback(row: &PgRow, idx: usize) -> Option<JsonValue> {
    let raw = row.try_get_raw(idx).ok()?;
    if raw.format() != PgValueFormat::Text {
        return None;
    }
    raw.as_str().ok().map(|s| JsonValue::String(s.to_string()))
}

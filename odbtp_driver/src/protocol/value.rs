//! Host-side values exchanged with the driver, and the DB-API constructors.

use crate::error::{Error, Result};
use chrono::{Local, NaiveDate, NaiveDateTime, NaiveTime, TimeZone};
use rust_decimal::Decimal;
use serde::Serialize;
use std::fmt;
use uuid::Uuid;

/// A single parameter or column value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Value {
    Null,
    Text(String),
    Binary(Vec<u8>),
    Integer(i64),
    /// Unsigned 64-bit value that does not fit an `i64`.
    Unsigned(u64),
    Float(f64),
    Decimal(Decimal),
    Boolean(bool),
    Date(NaiveDate),
    Time(NaiveTime),
    Timestamp(NaiveDateTime),
    Guid(Uuid),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Name of the host type, used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Text(_) => "text",
            Value::Binary(_) => "binary",
            Value::Integer(_) => "integer",
            Value::Unsigned(_) => "unsigned integer",
            Value::Float(_) => "float",
            Value::Decimal(_) => "decimal",
            Value::Boolean(_) => "boolean",
            Value::Date(_) => "date",
            Value::Time(_) => "time",
            Value::Timestamp(_) => "timestamp",
            Value::Guid(_) => "guid",
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(n) => Some(*n),
            Value::Unsigned(n) => i64::try_from(*n).ok(),
            Value::Boolean(b) => Some(i64::from(*b)),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Integer(n) => Some(*n as f64),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Binary(b) => Some(b),
            Value::Text(s) => Some(s.as_bytes()),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Text(s) => write!(f, "{}", s),
            Value::Binary(b) => {
                for byte in b {
                    write!(f, "{:02x}", byte)?;
                }
                Ok(())
            }
            Value::Integer(n) => write!(f, "{}", n),
            Value::Unsigned(n) => write!(f, "{}", n),
            Value::Float(x) => write!(f, "{}", x),
            Value::Decimal(d) => write!(f, "{}", d),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            Value::Time(t) => write!(f, "{}", t.format("%H:%M:%S%.f")),
            Value::Timestamp(ts) => write!(f, "{}", ts.format("%Y-%m-%d %H:%M:%S%.f")),
            Value::Guid(g) => write!(f, "{}", g),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Integer(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Integer(i64::from(n))
    }
}

impl From<u64> for Value {
    fn from(n: u64) -> Self {
        match i64::try_from(n) {
            Ok(n) => Value::Integer(n),
            Err(_) => Value::Unsigned(n),
        }
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<Decimal> for Value {
    fn from(d: Decimal) -> Self {
        Value::Decimal(d)
    }
}

impl From<NaiveDate> for Value {
    fn from(d: NaiveDate) -> Self {
        Value::Date(d)
    }
}

impl From<NaiveTime> for Value {
    fn from(t: NaiveTime) -> Self {
        Value::Time(t)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(ts: NaiveDateTime) -> Self {
        Value::Timestamp(ts)
    }
}

impl From<Uuid> for Value {
    fn from(g: Uuid) -> Self {
        Value::Guid(g)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

pub fn date(year: i32, month: u32, day: u32) -> Result<Value> {
    NaiveDate::from_ymd_opt(year, month, day)
        .map(Value::Date)
        .ok_or_else(|| Error::Data(format!("Invalid date {year:04}-{month:02}-{day:02}")))
}

pub fn time(hour: u32, minute: u32, second: u32) -> Result<Value> {
    NaiveTime::from_hms_opt(hour, minute, second)
        .map(Value::Time)
        .ok_or_else(|| Error::Data(format!("Invalid time {hour:02}:{minute:02}:{second:02}")))
}

pub fn timestamp(
    year: i32,
    month: u32,
    day: u32,
    hour: u32,
    minute: u32,
    second: u32,
) -> Result<Value> {
    NaiveDate::from_ymd_opt(year, month, day)
        .and_then(|d| d.and_hms_opt(hour, minute, second))
        .map(Value::Timestamp)
        .ok_or_else(|| {
            Error::Data(format!(
                "Invalid timestamp {year:04}-{month:02}-{day:02} {hour:02}:{minute:02}:{second:02}"
            ))
        })
}

fn local_from_ticks(ticks: i64) -> Result<NaiveDateTime> {
    Local
        .timestamp_opt(ticks, 0)
        .earliest()
        .map(|dt| dt.naive_local())
        .ok_or_else(|| Error::Data(format!("Ticks value {ticks} is out of range")))
}

/// Local date for seconds since the epoch.
pub fn date_from_ticks(ticks: i64) -> Result<Value> {
    local_from_ticks(ticks).map(|dt| Value::Date(dt.date()))
}

/// Local time of day for seconds since the epoch.
pub fn time_from_ticks(ticks: i64) -> Result<Value> {
    local_from_ticks(ticks).map(|dt| Value::Time(dt.time()))
}

pub fn timestamp_from_ticks(ticks: i64) -> Result<Value> {
    local_from_ticks(ticks).map(Value::Timestamp)
}

/// Marks a byte sequence as binary data, so it binds as `BINARY` rather
/// than `STRING`.
pub fn binary(bytes: impl Into<Vec<u8>>) -> Value {
    Value::Binary(bytes.into())
}

//! Column bytes to [`Value`], dispatched on the reconciled wire type.

use super::types::{SqlType, WireType};
use super::value::Value;
use crate::error::{Error, Result};
use chrono::{NaiveDate, NaiveTime};
use rust_decimal::Decimal;
use std::str::FromStr;
use uuid::Uuid;

pub const TIMESTAMP_STRUCT_SIZE: usize = 16;

/// Packed `SQL_TIMESTAMP_STRUCT` as transferred for `DATETIME` columns.
/// `fraction` is in nanoseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimestampStruct {
    pub year: u16,
    pub month: i16,
    pub day: i16,
    pub hour: i16,
    pub minute: i16,
    pub second: i16,
    pub fraction: u32,
}

impl TimestampStruct {
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.len() < TIMESTAMP_STRUCT_SIZE {
            return Err(Error::Data(format!(
                "Timestamp record needs {} bytes, got {}",
                TIMESTAMP_STRUCT_SIZE,
                data.len()
            )));
        }
        let i16_at = |offset: usize| i16::from_le_bytes([data[offset], data[offset + 1]]);
        Ok(Self {
            year: u16::from_le_bytes([data[0], data[1]]),
            month: i16_at(2),
            day: i16_at(4),
            hour: i16_at(6),
            minute: i16_at(8),
            second: i16_at(10),
            fraction: u32::from_le_bytes([data[12], data[13], data[14], data[15]]),
        })
    }

    pub fn to_bytes(&self) -> [u8; TIMESTAMP_STRUCT_SIZE] {
        let mut out = [0u8; TIMESTAMP_STRUCT_SIZE];
        out[0..2].copy_from_slice(&self.year.to_le_bytes());
        out[2..4].copy_from_slice(&self.month.to_le_bytes());
        out[4..6].copy_from_slice(&self.day.to_le_bytes());
        out[6..8].copy_from_slice(&self.hour.to_le_bytes());
        out[8..10].copy_from_slice(&self.minute.to_le_bytes());
        out[10..12].copy_from_slice(&self.second.to_le_bytes());
        out[12..16].copy_from_slice(&self.fraction.to_le_bytes());
        out
    }

    pub fn from_datetime(ts: &chrono::NaiveDateTime) -> Self {
        use chrono::{Datelike, Timelike};
        Self {
            year: u16::try_from(ts.year()).unwrap_or(0),
            month: ts.month() as i16,
            day: ts.day() as i16,
            hour: ts.hour() as i16,
            minute: ts.minute() as i16,
            second: ts.second() as i16,
            fraction: ts.nanosecond(),
        }
    }

    pub fn to_datetime(&self) -> Result<chrono::NaiveDateTime> {
        let field = |v: i16| u32::try_from(v).ok();
        let date = field(self.month)
            .zip(field(self.day))
            .and_then(|(m, d)| NaiveDate::from_ymd_opt(i32::from(self.year), m, d));
        let time = match (field(self.hour), field(self.minute), field(self.second)) {
            (Some(h), Some(m), Some(s)) => NaiveTime::from_hms_nano_opt(h, m, s, self.fraction),
            _ => None,
        };
        date.zip(time)
            .map(|(d, t)| d.and_time(t))
            .ok_or_else(|| Error::Data(format!("Invalid timestamp record {:?}", self)))
    }
}

/// Reconciles the SQL type and the wire type reported for a column.
pub fn resolve_column_type(sql_type: SqlType, wire_type: WireType) -> WireType {
    if sql_type.code() == wire_type.code() {
        return wire_type;
    }
    match (sql_type, wire_type) {
        (SqlType::TYPE_DATE, WireType::CHAR) => WireType::DATE,
        (SqlType::TYPE_TIME, WireType::CHAR) => WireType::TIME,
        // Wide text is read as narrow text; both decoders accept UTF-8.
        (SqlType::WVARCHAR, WireType::WCHAR) => WireType::CHAR,
        (SqlType::NUMERIC, WireType::CHAR) => WireType::NUMERIC,
        _ => wire_type,
    }
}

/// Decodes one column. `data` is `None` when the column address is null.
pub fn decode(data: Option<&[u8]>, wire_type: WireType) -> Result<Value> {
    let Some(data) = data else {
        return Ok(Value::Null);
    };
    match wire_type {
        WireType::BINARY => Ok(Value::Binary(data.to_vec())),
        WireType::BIGINT
        | WireType::INT
        | WireType::SMALLINT
        | WireType::TINYINT => read_signed(data).map(Value::Integer),
        WireType::UBIGINT
        | WireType::UINT
        | WireType::USMALLINT
        | WireType::UTINYINT => read_unsigned(data).map(Value::from),
        WireType::BIT => read_unsigned(data).map(|v| Value::Boolean(v != 0)),
        WireType::REAL | WireType::DOUBLE => read_float(data).map(Value::Float),
        WireType::CHAR => Ok(Value::Text(String::from_utf8_lossy(data).into_owned())),
        WireType::WCHAR => Ok(Value::Text(decode_wide(data))),
        WireType::DATE => parse_date(data),
        WireType::TIME => parse_time(data),
        WireType::DATETIME => TimestampStruct::from_bytes(data)
            .and_then(|ts| ts.to_datetime())
            .map(Value::Timestamp),
        WireType::NUMERIC => parse_numeric(data),
        WireType::GUID => read_guid(data),
        other => Err(Error::Data(format!(
            "Data type ID {} cannot be converted.",
            other.code()
        ))),
    }
}

fn width_error(kind: &str, len: usize) -> Error {
    Error::Data(format!("Unsupported {} width of {} bytes", kind, len))
}

fn read_signed(data: &[u8]) -> Result<i64> {
    match data.len() {
        1 => Ok(i64::from(data[0] as i8)),
        2 => Ok(i64::from(i16::from_le_bytes([data[0], data[1]]))),
        4 => Ok(i64::from(i32::from_le_bytes([data[0], data[1], data[2], data[3]]))),
        8 => {
            let mut buf = [0u8; 8];
            buf.copy_from_slice(data);
            Ok(i64::from_le_bytes(buf))
        }
        n => Err(width_error("integer", n)),
    }
}

fn read_unsigned(data: &[u8]) -> Result<u64> {
    match data.len() {
        1 => Ok(u64::from(data[0])),
        2 => Ok(u64::from(u16::from_le_bytes([data[0], data[1]]))),
        4 => Ok(u64::from(u32::from_le_bytes([data[0], data[1], data[2], data[3]]))),
        8 => {
            let mut buf = [0u8; 8];
            buf.copy_from_slice(data);
            Ok(u64::from_le_bytes(buf))
        }
        n => Err(width_error("unsigned integer", n)),
    }
}

fn read_float(data: &[u8]) -> Result<f64> {
    match data.len() {
        4 => Ok(f64::from(f32::from_le_bytes([data[0], data[1], data[2], data[3]]))),
        8 => {
            let mut buf = [0u8; 8];
            buf.copy_from_slice(data);
            Ok(f64::from_le_bytes(buf))
        }
        n => Err(width_error("floating point", n)),
    }
}

fn text(data: &[u8]) -> Result<&str> {
    std::str::from_utf8(data)
        .map(|s| s.trim_end_matches('\0').trim())
        .map_err(|e| Error::Data(format!("Column text is not valid UTF-8: {}", e)))
}

fn parse_date(data: &[u8]) -> Result<Value> {
    let s = text(data)?;
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map(Value::Date)
        .map_err(|e| Error::Data(format!("Invalid date '{}': {}", s, e)))
}

fn parse_time(data: &[u8]) -> Result<Value> {
    let s = text(data)?;
    NaiveTime::parse_from_str(s, "%H:%M:%S%.f")
        .map(Value::Time)
        .map_err(|e| Error::Data(format!("Invalid time '{}': {}", s, e)))
}

fn parse_numeric(data: &[u8]) -> Result<Value> {
    let s = text(data)?;
    Decimal::from_str(s)
        .or_else(|_| Decimal::from_scientific(s))
        .map(Value::Decimal)
        .map_err(|e| Error::Data(format!("Invalid numeric '{}': {}", s, e)))
}

fn decode_wide(data: &[u8]) -> String {
    if let Ok(s) = std::str::from_utf8(data) {
        return s.to_string();
    }
    let units: Vec<u16> = data
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
        .collect();
    String::from_utf16_lossy(&units)
}

fn read_guid(data: &[u8]) -> Result<Value> {
    let bytes: [u8; 16] = data
        .try_into()
        .map_err(|_| width_error("GUID", data.len()))?;
    Ok(Value::Guid(Uuid::from_bytes_le(bytes)))
}

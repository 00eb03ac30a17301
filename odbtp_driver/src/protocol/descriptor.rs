//! Parameter type descriptors: what is declared to the server for each
//! parameter column and how host values are converted before sending.

use super::types::{SqlType, TypeFamily, WireType};
use super::value::Value;
use crate::engine::transaction::TransactionGuard;
use crate::error::{Error, Result};
use crate::transport::{ParamBinding, ParamDirection};
use chrono::{NaiveDateTime, NaiveTime, Timelike};
use rust_decimal::prelude::ToPrimitive;
use serde::Serialize;

const NUMBER_PRECISION: u16 = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum NumberKind {
    Int,
    Float,
    /// Decimal text; `decimal` and `numeric` are the same on the wire.
    Numeric,
}

impl NumberKind {
    pub fn parse(sub_type: &str) -> Result<Self> {
        match sub_type.to_ascii_lowercase().as_str() {
            "int" => Ok(NumberKind::Int),
            "float" => Ok(NumberKind::Float),
            "decimal" | "numeric" => Ok(NumberKind::Numeric),
            _ => Err(Error::Programming("Illegal sub_type for NUMBER.".to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DateTimeKind {
    Timestamp,
    Date,
    Time,
}

impl DateTimeKind {
    pub fn parse(sub_type: &str) -> Result<Self> {
        match sub_type.to_ascii_lowercase().as_str() {
            "datetime" | "timestamp" => Ok(DateTimeKind::Timestamp),
            "date" => Ok(DateTimeKind::Date),
            "time" => Ok(DateTimeKind::Time),
            _ => Err(Error::Programming("Illegal sub_type for DATETIME.".to_string())),
        }
    }

    /// Fixed width of the text form sent to the server.
    pub fn width(self) -> u32 {
        match self {
            DateTimeKind::Timestamp => 22,
            DateTimeKind::Date => 10,
            DateTimeKind::Time => 11,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DescriptorKind {
    /// Shape of a null value; carries no type information.
    Untyped,
    String,
    Binary,
    Number(NumberKind),
    DateTime(DateTimeKind),
    RowId,
}

/// Host value converted for one of the `setParam*` primitives.
#[derive(Debug, Clone, PartialEq)]
pub enum WireValue {
    Text(Vec<u8>),
    LongLong(i64),
    Double(f64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct BoundColumn {
    column: u16,
    is_final: bool,
}

/// A parameter type declaration, optionally bound to a parameter column.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeDescriptor {
    kind: DescriptorKind,
    wire_type: WireType,
    sql_type: SqlType,
    size: u32,
    max_size: u32,
    precision: u16,
    binding: Option<BoundColumn>,
}

impl TypeDescriptor {
    fn unbound(kind: DescriptorKind, wire_type: WireType, sql_type: SqlType, size: u32) -> Self {
        Self {
            kind,
            wire_type,
            sql_type,
            size,
            max_size: size,
            precision: 0,
            binding: None,
        }
    }

    pub fn string(max_size: u32) -> Self {
        Self::unbound(DescriptorKind::String, WireType::CHAR, SqlType::CHAR, max_size)
    }

    pub fn binary(max_size: u32) -> Self {
        Self::unbound(DescriptorKind::Binary, WireType::CHAR, SqlType::BINARY, max_size)
    }

    /// `NUMBER(sub_type)` with `int`, `float`, `decimal` or `numeric`.
    pub fn number(sub_type: &str) -> Result<Self> {
        NumberKind::parse(sub_type).map(Self::number_of)
    }

    pub fn number_of(kind: NumberKind) -> Self {
        let (wire_type, sql_type) = match kind {
            NumberKind::Int => (WireType::BIGINT, SqlType::BIGINT),
            NumberKind::Float => (WireType::DOUBLE, SqlType::DOUBLE),
            NumberKind::Numeric => (WireType::CHAR, SqlType::CHAR),
        };
        let mut descriptor = Self::unbound(DescriptorKind::Number(kind), wire_type, sql_type, 0);
        descriptor.precision = NUMBER_PRECISION;
        descriptor
    }

    /// `DATETIME(sub_type)` with `datetime`, `timestamp`, `date` or `time`.
    pub fn datetime(sub_type: &str) -> Result<Self> {
        DateTimeKind::parse(sub_type).map(Self::datetime_of)
    }

    pub fn datetime_of(kind: DateTimeKind) -> Self {
        Self::unbound(
            DescriptorKind::DateTime(kind),
            WireType::CHAR,
            SqlType::CHAR,
            kind.width(),
        )
    }

    pub fn rowid() -> Self {
        Self::unbound(DescriptorKind::RowId, WireType::GUID, SqlType::UNKNOWN, 16)
    }

    /// Placeholder for a null parameter. Bound as zero-length character data.
    pub fn untyped() -> Self {
        Self::unbound(DescriptorKind::Untyped, WireType::CHAR, SqlType::CHAR, 0)
    }

    pub fn kind(&self) -> DescriptorKind {
        self.kind
    }

    pub fn family(&self) -> Option<TypeFamily> {
        match self.kind {
            DescriptorKind::Untyped => None,
            DescriptorKind::String => Some(TypeFamily::String),
            DescriptorKind::Binary => Some(TypeFamily::Binary),
            DescriptorKind::Number(_) => Some(TypeFamily::Number),
            DescriptorKind::DateTime(_) => Some(TypeFamily::DateTime),
            DescriptorKind::RowId => Some(TypeFamily::RowId),
        }
    }

    pub fn is_typed(&self) -> bool {
        self.kind != DescriptorKind::Untyped
    }

    pub fn wire_type(&self) -> WireType {
        self.wire_type
    }

    pub fn sql_type(&self) -> SqlType {
        self.sql_type
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn max_size(&self) -> u32 {
        self.max_size
    }

    pub fn precision(&self) -> u16 {
        self.precision
    }

    pub fn is_bound(&self) -> bool {
        self.binding.is_some()
    }

    pub fn column(&self) -> Option<u16> {
        self.binding.map(|b| b.column)
    }

    pub fn is_final(&self) -> bool {
        self.binding.is_some_and(|b| b.is_final)
    }

    /// Declares this descriptor for parameter `column` (1-based) of an
    /// operation with `total` parameters.
    pub fn bind_to_column(
        &mut self,
        guard: &TransactionGuard<'_>,
        column: u16,
        total: u16,
    ) -> Result<()> {
        self.binding = None;
        let binding = ParamBinding {
            column,
            direction: ParamDirection::InputOutput,
            wire_type: self.wire_type,
            size: self.size,
            sql_type: self.sql_type,
            max_size: self.max_size,
            precision: self.precision,
            is_final: column == total,
        };
        guard.check(guard.transport().bind_param(guard.operation(), &binding))?;
        self.binding = Some(BoundColumn {
            column,
            is_final: binding.is_final,
        });
        Ok(())
    }

    /// Records the column of a procedure parameter. The server binds those
    /// itself, so nothing is sent.
    pub fn attach_to_procedure_param(&mut self, column: u16, total: u16) {
        self.binding = Some(BoundColumn {
            column,
            is_final: column == total,
        });
    }

    /// Sends `value` into the bound parameter column.
    pub fn set_parameter(&self, guard: &TransactionGuard<'_>, value: &Value) -> Result<()> {
        let Some(BoundColumn { column, is_final }) = self.binding else {
            return Err(Error::Interface(
                "You must bind a parameter before setting.".to_string(),
            ));
        };
        let transport = guard.transport();
        let handle = guard.operation();

        let sent = if value.is_null() {
            transport.set_param_null(handle, column, is_final)
        } else {
            match self.to_wire(value).map_err(|e| guard.fail(e))? {
                WireValue::Text(bytes) => transport.set_param_text(handle, column, &bytes, is_final),
                WireValue::LongLong(n) => transport.set_param_long_long(handle, column, n, is_final),
                WireValue::Double(x) => transport.set_param_double(handle, column, x, is_final),
            }
        };
        guard.check(sent)
    }

    /// Converts a non-null host value to the form this descriptor sends.
    pub fn to_wire(&self, value: &Value) -> Result<WireValue> {
        match self.kind {
            DescriptorKind::Untyped | DescriptorKind::String | DescriptorKind::Binary => {
                Ok(WireValue::Text(text_bytes(value)))
            }
            DescriptorKind::Number(NumberKind::Int) => to_i64(value).map(WireValue::LongLong),
            DescriptorKind::Number(NumberKind::Float) => to_f64(value).map(WireValue::Double),
            DescriptorKind::Number(NumberKind::Numeric) => numeric_text(value),
            DescriptorKind::DateTime(kind) => datetime_text(kind, value),
            DescriptorKind::RowId => Err(Error::NotSupported(
                "ROWID cannot be used as a parameter type.".to_string(),
            )),
        }
    }
}

fn text_bytes(value: &Value) -> Vec<u8> {
    match value.as_bytes() {
        Some(bytes) => bytes.to_vec(),
        None => value.to_string().into_bytes(),
    }
}

fn conversion_error(value: &Value, target: &str) -> Error {
    Error::Data(format!(
        "Cannot convert {} value to {}.",
        value.type_name(),
        target
    ))
}

fn to_i64(value: &Value) -> Result<i64> {
    let converted = match value {
        Value::Integer(n) => Some(*n),
        Value::Boolean(b) => Some(i64::from(*b)),
        Value::Unsigned(n) => i64::try_from(*n).ok(),
        Value::Float(x) => float_to_i64(*x),
        Value::Decimal(d) => d.trunc().to_i64(),
        Value::Text(s) => s.trim().parse().ok(),
        _ => None,
    };
    converted.ok_or_else(|| conversion_error(value, "a 64-bit integer"))
}

/// Truncates toward zero; NaN, infinities and anything outside
/// `[-2^63, 2^63)` have no `i64` form.
fn float_to_i64(x: f64) -> Option<i64> {
    const LIMIT: f64 = 9_223_372_036_854_775_808.0;
    let truncated = x.trunc();
    (truncated >= -LIMIT && truncated < LIMIT).then_some(truncated as i64)
}

fn to_f64(value: &Value) -> Result<f64> {
    let converted = match value {
        Value::Float(x) => Some(*x),
        Value::Integer(n) => Some(*n as f64),
        Value::Unsigned(n) => Some(*n as f64),
        Value::Boolean(b) => Some(f64::from(u8::from(*b))),
        Value::Decimal(d) => d.to_f64(),
        Value::Text(s) => s.trim().parse().ok(),
        _ => None,
    };
    converted.ok_or_else(|| conversion_error(value, "a double"))
}

fn numeric_text(value: &Value) -> Result<WireValue> {
    match value {
        Value::Integer(_)
        | Value::Unsigned(_)
        | Value::Float(_)
        | Value::Decimal(_)
        | Value::Text(_) => Ok(WireValue::Text(value.to_string().into_bytes())),
        Value::Boolean(b) => Ok(WireValue::Text(u8::from(*b).to_string().into_bytes())),
        _ => Err(conversion_error(value, "a decimal")),
    }
}

/// `HH:MM:SS` with two fractional digits when there is a fraction.
///
/// The declared TIME and TIMESTAMP widths (11 and 22) leave room for
/// hundredths only, so anything finer than a centisecond is dropped.
pub fn format_time(time: &NaiveTime) -> String {
    let hundredths = time.nanosecond() % 1_000_000_000 / 10_000_000;
    if hundredths == 0 {
        time.format("%H:%M:%S").to_string()
    } else {
        format!("{}.{:02}", time.format("%H:%M:%S"), hundredths)
    }
}

pub fn format_timestamp(ts: &NaiveDateTime) -> String {
    format!("{} {}", ts.format("%Y-%m-%d"), format_time(&ts.time()))
}

fn datetime_text(kind: DateTimeKind, value: &Value) -> Result<WireValue> {
    let text = match (kind, value) {
        (_, Value::Text(s)) => s.clone(),
        (DateTimeKind::Timestamp, Value::Timestamp(ts)) => format_timestamp(ts),
        (DateTimeKind::Timestamp, Value::Date(d)) => format!("{} 00:00:00", d.format("%Y-%m-%d")),
        (DateTimeKind::Date, Value::Date(d)) => d.format("%Y-%m-%d").to_string(),
        (DateTimeKind::Date, Value::Timestamp(ts)) => ts.format("%Y-%m-%d").to_string(),
        (DateTimeKind::Time, Value::Time(t)) => format_time(t),
        (DateTimeKind::Time, Value::Timestamp(ts)) => format_time(&ts.time()),
        _ => return Err(conversion_error(value, "a date/time")),
    };
    Ok(WireValue::Text(text.into_bytes()))
}

fn byte_len(len: usize) -> u32 {
    u32::try_from(len).unwrap_or(u32::MAX)
}

/// Picks a descriptor from the runtime type of `value`.
pub fn infer_descriptor(value: &Value) -> Result<TypeDescriptor> {
    match value {
        Value::Null => Ok(TypeDescriptor::untyped()),
        Value::Binary(b) => Ok(TypeDescriptor::binary(byte_len(b.len()))),
        Value::Text(s) => Ok(TypeDescriptor::string(byte_len(s.len()))),
        Value::Timestamp(_) => Ok(TypeDescriptor::datetime_of(DateTimeKind::Timestamp)),
        Value::Date(_) => Ok(TypeDescriptor::datetime_of(DateTimeKind::Date)),
        Value::Time(_) => Ok(TypeDescriptor::datetime_of(DateTimeKind::Time)),
        Value::Integer(_) | Value::Boolean(_) => Ok(TypeDescriptor::number_of(NumberKind::Int)),
        Value::Unsigned(_) | Value::Decimal(_) => {
            Ok(TypeDescriptor::number_of(NumberKind::Numeric))
        }
        Value::Float(_) => Ok(TypeDescriptor::number_of(NumberKind::Float)),
        Value::Guid(_) => Err(Error::Data(format!(
            "Data type {} is not supported.",
            value.type_name()
        ))),
    }
}

/// One argument of `Cursor::setinputsizes`.
#[derive(Debug, Clone, PartialEq)]
pub enum InputSize {
    Type(TypeDescriptor),
    Size(usize),
    Null,
}

impl From<TypeDescriptor> for InputSize {
    fn from(descriptor: TypeDescriptor) -> Self {
        InputSize::Type(descriptor)
    }
}

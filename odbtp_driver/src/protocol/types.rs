use serde::Serialize;
use std::fmt;

/// ODBTP data type code (the ODBC C type of the transferred value).
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct WireType(pub i16);

impl WireType {
    pub const BINARY: WireType = WireType(-2);
    pub const BIGINT: WireType = WireType(-25);
    pub const UBIGINT: WireType = WireType(-27);
    pub const BIT: WireType = WireType(-7);
    pub const CHAR: WireType = WireType(1);
    pub const NUMERIC: WireType = WireType(2);
    pub const REAL: WireType = WireType(7);
    pub const DOUBLE: WireType = WireType(8);
    /// The client library's `ODB_FLOAT`, an alias of `DOUBLE`.
    pub const FLOAT: WireType = WireType::DOUBLE;
    pub const DATE: WireType = WireType(9);
    pub const TIME: WireType = WireType(10);
    pub const DATETIME: WireType = WireType(11);
    pub const GUID: WireType = WireType(-11);
    pub const INT: WireType = WireType(-16);
    pub const UINT: WireType = WireType(-18);
    pub const SMALLINT: WireType = WireType(-15);
    pub const USMALLINT: WireType = WireType(-17);
    pub const TINYINT: WireType = WireType(-26);
    pub const UTINYINT: WireType = WireType(-28);
    pub const WCHAR: WireType = WireType(-8);

    pub fn code(self) -> i16 {
        self.0
    }

    /// Descriptor family this wire type belongs to, if any.
    pub fn family(self) -> Option<TypeFamily> {
        FAMILY_TABLE
            .iter()
            .find(|(wire, _)| *wire == self)
            .map(|(_, family)| *family)
    }
}

impl fmt::Debug for WireType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "WireType({})", self.0)
    }
}

impl fmt::Display for WireType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// ODBC SQL data type code, reported independently of the wire type.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct SqlType(pub i16);

impl SqlType {
    pub const UNKNOWN: SqlType = SqlType(0);
    pub const CHAR: SqlType = SqlType(1);
    pub const NUMERIC: SqlType = SqlType(2);
    pub const DOUBLE: SqlType = SqlType(8);
    pub const BINARY: SqlType = SqlType(-2);
    pub const BIGINT: SqlType = SqlType(-5);
    pub const WVARCHAR: SqlType = SqlType(-9);
    pub const TYPE_DATE: SqlType = SqlType(91);
    pub const TYPE_TIME: SqlType = SqlType(92);

    pub fn code(self) -> i16 {
        self.0
    }
}

impl fmt::Debug for SqlType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SqlType({})", self.0)
    }
}

/// The five DB-API type objects.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum TypeFamily {
    String,
    Binary,
    Number,
    DateTime,
    RowId,
}

impl TypeFamily {
    /// Wire types classified into this family.
    pub fn wire_types(self) -> impl Iterator<Item = WireType> {
        FAMILY_TABLE
            .iter()
            .filter(move |(_, family)| *family == self)
            .map(|(wire, _)| *wire)
    }
}

/// `description[i].type_code == TypeFamily::Number` style comparisons.
impl PartialEq<WireType> for TypeFamily {
    fn eq(&self, other: &WireType) -> bool {
        other.family() == Some(*self)
    }
}

impl PartialEq<TypeFamily> for WireType {
    fn eq(&self, other: &TypeFamily) -> bool {
        self.family() == Some(*other)
    }
}

const FAMILY_TABLE: &[(WireType, TypeFamily)] = &[
    (WireType::CHAR, TypeFamily::String),
    (WireType::WCHAR, TypeFamily::String),
    (WireType::BINARY, TypeFamily::Binary),
    (WireType::BIGINT, TypeFamily::Number),
    (WireType::UBIGINT, TypeFamily::Number),
    (WireType::BIT, TypeFamily::Number),
    (WireType::DOUBLE, TypeFamily::Number),
    (WireType::INT, TypeFamily::Number),
    (WireType::UINT, TypeFamily::Number),
    (WireType::NUMERIC, TypeFamily::Number),
    (WireType::REAL, TypeFamily::Number),
    (WireType::SMALLINT, TypeFamily::Number),
    (WireType::USMALLINT, TypeFamily::Number),
    (WireType::TINYINT, TypeFamily::Number),
    (WireType::UTINYINT, TypeFamily::Number),
    (WireType::DATE, TypeFamily::DateTime),
    (WireType::DATETIME, TypeFamily::DateTime),
    (WireType::TIME, TypeFamily::DateTime),
    (WireType::GUID, TypeFamily::RowId),
];

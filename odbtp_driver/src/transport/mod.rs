//! Handle-based primitives of the ODBTP client library.
//!
//! The driver core never talks to the network itself: every call goes through
//! a [`Transport`]. Primitives return a success flag; accessors return the
//! requested value directly. After a failed primitive the error state of the
//! handle involved is read with [`Transport::get_error`] and
//! [`Transport::get_error_text`].

#[cfg(test)]
pub(crate) mod mock;
#[cfg(feature = "native")]
pub mod native;

use crate::handles::Handle;
use crate::protocol::types::{SqlType, WireType};

#[cfg(feature = "native")]
pub use native::NativeTransport;

/// Connection attributes negotiated after login.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Attribute {
    DriverName,
    DescribeParams,
    FullColumnInfo,
    Transactions,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoginMode {
    Normal,
    Reserved,
    /// One session per login; what the driver uses.
    #[default]
    Single,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParamDirection {
    Input,
    InputOutput,
    Output,
}

/// Arguments of one `bindParamEx` call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ParamBinding {
    /// 1-based parameter column.
    pub column: u16,
    pub direction: ParamDirection,
    pub wire_type: WireType,
    pub size: u32,
    pub sql_type: SqlType,
    pub max_size: u32,
    pub precision: u16,
    /// Last parameter in the row; the transport flushes the row after it.
    pub is_final: bool,
}

pub trait Transport: Send + Sync {
    /// Allocates a session handle (`parent == None`) or an operation handle
    /// under a session. `None` signals allocation failure.
    fn allocate(&self, parent: Option<Handle>) -> Option<Handle>;
    fn login(
        &self,
        handle: Handle,
        server: &str,
        port: u16,
        mode: LoginMode,
        connection_string: &str,
    ) -> bool;
    fn logout(&self, handle: Handle, force: bool) -> bool;
    fn free(&self, handle: Handle);

    fn get_attr_text(&self, handle: Handle, attr: Attribute, max_len: usize) -> Option<String>;
    fn get_attr_long(&self, handle: Handle, attr: Attribute) -> Option<i64>;
    fn set_attr_long(&self, handle: Handle, attr: Attribute, value: i64) -> bool;
    fn load_data_types(&self, handle: Handle) -> bool;
    fn use_row_cache(&self, handle: Handle, enabled: bool, size: u32) -> bool;

    fn commit(&self, handle: Handle) -> bool;
    fn rollback(&self, handle: Handle) -> bool;

    fn prepare(&self, handle: Handle, operation: &str) -> bool;
    fn prepare_proc(&self, handle: Handle, procedure: &str) -> bool;
    fn execute(&self, handle: Handle) -> bool;
    /// Discards the operation state held by the server for `handle`.
    fn drop_query(&self, handle: Handle) -> bool;

    fn bind_param(&self, handle: Handle, binding: &ParamBinding) -> bool;
    fn set_param_null(&self, handle: Handle, column: u16, is_final: bool) -> bool;
    fn set_param_text(&self, handle: Handle, column: u16, value: &[u8], is_final: bool) -> bool;
    fn set_param_long_long(&self, handle: Handle, column: u16, value: i64, is_final: bool)
        -> bool;
    fn set_param_double(&self, handle: Handle, column: u16, value: f64, is_final: bool) -> bool;

    fn fetch_row(&self, handle: Handle) -> bool;
    fn fetch_next_result(&self, handle: Handle) -> bool;
    fn no_data(&self, handle: Handle) -> bool;
    fn row_count(&self, handle: Handle) -> i64;
    fn total_cols(&self, handle: Handle) -> u16;

    fn col_name(&self, handle: Handle, column: u16) -> String;
    fn col_sql_type(&self, handle: Handle, column: u16) -> SqlType;
    fn col_data_type(&self, handle: Handle, column: u16) -> WireType;
    /// Column bytes of the current row, exactly `colDataLen` long. `None`
    /// when the column data address is null.
    fn col_data(&self, handle: Handle, column: u16) -> Option<Vec<u8>>;
    fn col_actual_len(&self, handle: Handle, column: u16) -> usize;
    fn col_truncated(&self, handle: Handle, column: u16) -> bool;

    fn get_error(&self, handle: Handle) -> u32;
    fn get_error_text(&self, handle: Handle) -> String;
}

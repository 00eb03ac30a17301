//! [`Transport`] over the ODBTP C client library, loaded at runtime.
//!
//! The library is looked up as `ODBTP_LIBRARY` if set, otherwise under the
//! platform name of `odbtp` (`libodbtp.so`, `odbtp.dll`, `libodbtp.dylib`).

use super::{Attribute, LoginMode, ParamBinding, ParamDirection, Transport};
use crate::error::{Error, Result};
use crate::handles::Handle;
use crate::protocol::types::{SqlType, WireType};
use libloading::Library;
use std::ffi::{c_char, c_int, c_long, c_short, c_ulong, c_ushort, c_void, CStr, CString};
use std::ptr;

type OdbHandle = *mut c_void;
type OdbBool = c_int;

const ODB_ATTR_DESCRIBEPARAMS: c_long = 3;
const ODB_ATTR_TRANSACTIONS: c_long = 4;
const ODB_ATTR_FULLCOLINFO: c_long = 7;
const ODB_ATTR_DRIVERNAME: c_long = 101;

const ODB_LOGIN_NORMAL: c_ushort = 0;
const ODB_LOGIN_RESERVED: c_ushort = 1;
const ODB_LOGIN_SINGLE: c_ushort = 2;

const ODB_PARAM_INPUT: c_ushort = 1;
const ODB_PARAM_OUTPUT: c_ushort = 2;
const ODB_PARAM_INOUT: c_ushort = 3;

struct Api {
    winsock_startup: unsafe extern "C" fn() -> OdbBool,
    allocate: unsafe extern "C" fn(OdbHandle) -> OdbHandle,
    login: unsafe extern "C" fn(OdbHandle, *const c_char, c_ushort, c_ushort, *const c_char) -> OdbBool,
    logout: unsafe extern "C" fn(OdbHandle, OdbBool) -> OdbBool,
    free: unsafe extern "C" fn(OdbHandle) -> OdbBool,
    get_attr_text: unsafe extern "C" fn(OdbHandle, c_long, *mut c_char, c_long) -> OdbBool,
    get_attr_long: unsafe extern "C" fn(OdbHandle, c_long, *mut c_ulong) -> OdbBool,
    set_attr_long: unsafe extern "C" fn(OdbHandle, c_long, c_ulong) -> OdbBool,
    load_data_types: unsafe extern "C" fn(OdbHandle) -> OdbBool,
    use_row_cache: unsafe extern "C" fn(OdbHandle, OdbBool, c_ulong) -> OdbBool,
    commit: unsafe extern "C" fn(OdbHandle) -> OdbBool,
    rollback: unsafe extern "C" fn(OdbHandle) -> OdbBool,
    prepare: unsafe extern "C" fn(OdbHandle, *const c_char) -> OdbBool,
    prepare_proc: unsafe extern "C" fn(OdbHandle, *const c_char) -> OdbBool,
    execute: unsafe extern "C" fn(OdbHandle, *const c_char) -> OdbBool,
    drop_qry: unsafe extern "C" fn(OdbHandle) -> OdbBool,
    bind_param_ex: unsafe extern "C" fn(
        OdbHandle,
        c_ushort,
        c_ushort,
        c_short,
        c_ulong,
        c_short,
        c_ulong,
        c_short,
        OdbBool,
    ) -> OdbBool,
    set_param_null: unsafe extern "C" fn(OdbHandle, c_ushort, OdbBool) -> OdbBool,
    set_param_text: unsafe extern "C" fn(OdbHandle, c_ushort, *const c_char, OdbBool) -> OdbBool,
    set_param_long_long: unsafe extern "C" fn(OdbHandle, c_ushort, i64, OdbBool) -> OdbBool,
    set_param_double: unsafe extern "C" fn(OdbHandle, c_ushort, f64, OdbBool) -> OdbBool,
    fetch_row: unsafe extern "C" fn(OdbHandle) -> OdbBool,
    fetch_next_result: unsafe extern "C" fn(OdbHandle) -> OdbBool,
    no_data: unsafe extern "C" fn(OdbHandle) -> OdbBool,
    get_row_count: unsafe extern "C" fn(OdbHandle) -> c_long,
    get_total_cols: unsafe extern "C" fn(OdbHandle) -> c_ushort,
    col_name: unsafe extern "C" fn(OdbHandle, c_ushort) -> *const c_char,
    col_sql_type: unsafe extern "C" fn(OdbHandle, c_ushort) -> c_short,
    col_data_type: unsafe extern "C" fn(OdbHandle, c_ushort) -> c_short,
    col_data: unsafe extern "C" fn(OdbHandle, c_ushort) -> *const c_void,
    col_data_len: unsafe extern "C" fn(OdbHandle, c_ushort) -> c_long,
    col_actual_len: unsafe extern "C" fn(OdbHandle, c_ushort) -> c_long,
    col_truncated: unsafe extern "C" fn(OdbHandle, c_ushort) -> OdbBool,
    get_error: unsafe extern "C" fn(OdbHandle) -> c_ulong,
    get_error_text: unsafe extern "C" fn(OdbHandle) -> *const c_char,
}

/// The ODBTP client library. All function pointers are resolved up front so
/// a missing export fails at load time.
pub struct NativeTransport {
    api: Api,
    _library: Library,
}

/// Resolves the export `name` as a function pointer of type `T`.
///
/// # Safety
/// `T` must match the C declaration of the export in `odbtp.h`.
unsafe fn symbol<T: Copy>(library: &Library, name: &str) -> Result<T> {
    library
        .get::<T>(name.as_bytes())
        .map(|sym| *sym)
        .map_err(|e| Error::Interface(format!("ODBTP library lacks {}: {}", name, e)))
}

impl NativeTransport {
    pub fn load() -> Result<Self> {
        let path = std::env::var("ODBTP_LIBRARY")
            .unwrap_or_else(|_| libloading::library_filename("odbtp").to_string_lossy().into_owned());
        log::debug!("Loading ODBTP client library from {}", path);

        // SAFETY: loading runs the library's initializers, which have no
        // preconditions.
        let library = unsafe { Library::new(&path) }
            .map_err(|e| Error::Interface(format!("Unable to load ODBTP library {}: {}", path, e)))?;

        // SAFETY: each field type mirrors its export in odbtp.h.
        let api = unsafe {
            Api {
                winsock_startup: symbol(&library, "odbWinsockStartup")?,
                allocate: symbol(&library, "odbAllocate")?,
                login: symbol(&library, "odbLogin")?,
                logout: symbol(&library, "odbLogout")?,
                free: symbol(&library, "odbFree")?,
                get_attr_text: symbol(&library, "odbGetAttrText")?,
                get_attr_long: symbol(&library, "odbGetAttrLong")?,
                set_attr_long: symbol(&library, "odbSetAttrLong")?,
                load_data_types: symbol(&library, "odbLoadDataTypes")?,
                use_row_cache: symbol(&library, "odbUseRowCache")?,
                commit: symbol(&library, "odbCommit")?,
                rollback: symbol(&library, "odbRollback")?,
                prepare: symbol(&library, "odbPrepare")?,
                prepare_proc: symbol(&library, "odbPrepareProc")?,
                execute: symbol(&library, "odbExecute")?,
                drop_qry: symbol(&library, "odbDropQry")?,
                bind_param_ex: symbol(&library, "odbBindParamEx")?,
                set_param_null: symbol(&library, "odbSetParamNull")?,
                set_param_text: symbol(&library, "odbSetParamText")?,
                set_param_long_long: symbol(&library, "odbSetParamLongLong")?,
                set_param_double: symbol(&library, "odbSetParamDouble")?,
                fetch_row: symbol(&library, "odbFetchRow")?,
                fetch_next_result: symbol(&library, "odbFetchNextResult")?,
                no_data: symbol(&library, "odbNoData")?,
                get_row_count: symbol(&library, "odbGetRowCount")?,
                get_total_cols: symbol(&library, "odbGetTotalCols")?,
                col_name: symbol(&library, "odbColName")?,
                col_sql_type: symbol(&library, "odbColSqlType")?,
                col_data_type: symbol(&library, "odbColDataType")?,
                col_data: symbol(&library, "odbColData")?,
                col_data_len: symbol(&library, "odbColDataLen")?,
                col_actual_len: symbol(&library, "odbColActualLen")?,
                col_truncated: symbol(&library, "odbColTruncated")?,
                get_error: symbol(&library, "odbGetError")?,
                get_error_text: symbol(&library, "odbGetErrorText")?,
            }
        };

        // SAFETY: takes no arguments; required once per process before any
        // socket is opened.
        if unsafe { (api.winsock_startup)() } == 0 {
            return Err(Error::Interface("ODBTP socket startup failed.".to_string()));
        }

        Ok(Self {
            api,
            _library: library,
        })
    }
}

fn raw(handle: Handle) -> OdbHandle {
    handle.raw() as OdbHandle
}

fn c_string(text: &[u8]) -> Option<CString> {
    match CString::new(text) {
        Ok(s) => Some(s),
        Err(_) => {
            log::warn!("Refusing to send text containing a NUL byte");
            None
        }
    }
}

fn attribute_id(attr: Attribute) -> c_long {
    match attr {
        Attribute::DriverName => ODB_ATTR_DRIVERNAME,
        Attribute::DescribeParams => ODB_ATTR_DESCRIBEPARAMS,
        Attribute::FullColumnInfo => ODB_ATTR_FULLCOLINFO,
        Attribute::Transactions => ODB_ATTR_TRANSACTIONS,
    }
}

fn login_type(mode: LoginMode) -> c_ushort {
    match mode {
        LoginMode::Normal => ODB_LOGIN_NORMAL,
        LoginMode::Reserved => ODB_LOGIN_RESERVED,
        LoginMode::Single => ODB_LOGIN_SINGLE,
    }
}

fn direction(direction: ParamDirection) -> c_ushort {
    match direction {
        ParamDirection::Input => ODB_PARAM_INPUT,
        ParamDirection::InputOutput => ODB_PARAM_INOUT,
        ParamDirection::Output => ODB_PARAM_OUTPUT,
    }
}

fn flag(b: bool) -> OdbBool {
    OdbBool::from(b)
}

/// Copies a NUL-terminated string owned by the library.
///
/// # Safety
/// `ptr` must be null or point to a NUL-terminated string valid for the
/// duration of the call.
unsafe fn owned_text(ptr: *const c_char) -> String {
    if ptr.is_null() {
        String::new()
    } else {
        CStr::from_ptr(ptr).to_string_lossy().into_owned()
    }
}

// SAFETY (whole impl): every call passes a handle obtained from `allocate`
// and not yet freed, and pointers that outlive the call.
impl Transport for NativeTransport {
    fn allocate(&self, parent: Option<Handle>) -> Option<Handle> {
        let parent = parent.map_or(ptr::null_mut(), raw);
        let handle = unsafe { (self.api.allocate)(parent) };
        Handle::new(handle as usize)
    }

    fn login(
        &self,
        handle: Handle,
        server: &str,
        port: u16,
        mode: LoginMode,
        connection_string: &str,
    ) -> bool {
        let (Some(server), Some(dbconnect)) =
            (c_string(server.as_bytes()), c_string(connection_string.as_bytes()))
        else {
            return false;
        };
        unsafe {
            (self.api.login)(raw(handle), server.as_ptr(), port, login_type(mode), dbconnect.as_ptr())
                != 0
        }
    }

    fn logout(&self, handle: Handle, force: bool) -> bool {
        unsafe { (self.api.logout)(raw(handle), flag(force)) != 0 }
    }

    fn free(&self, handle: Handle) {
        unsafe {
            (self.api.free)(raw(handle));
        }
    }

    fn get_attr_text(&self, handle: Handle, attr: Attribute, max_len: usize) -> Option<String> {
        let mut buffer = vec![0u8; max_len + 1];
        let len = c_long::try_from(buffer.len()).ok()?;
        let ok = unsafe {
            (self.api.get_attr_text)(raw(handle), attribute_id(attr), buffer.as_mut_ptr().cast(), len)
        };
        if ok == 0 {
            return None;
        }
        let text = CStr::from_bytes_until_nul(&buffer).ok()?;
        Some(text.to_string_lossy().into_owned())
    }

    fn get_attr_long(&self, handle: Handle, attr: Attribute) -> Option<i64> {
        let mut value: c_ulong = 0;
        let ok = unsafe { (self.api.get_attr_long)(raw(handle), attribute_id(attr), &mut value) };
        if ok == 0 {
            return None;
        }
        i64::try_from(value).ok()
    }

    fn set_attr_long(&self, handle: Handle, attr: Attribute, value: i64) -> bool {
        let Ok(value) = c_ulong::try_from(value) else {
            return false;
        };
        unsafe { (self.api.set_attr_long)(raw(handle), attribute_id(attr), value) != 0 }
    }

    fn load_data_types(&self, handle: Handle) -> bool {
        unsafe { (self.api.load_data_types)(raw(handle)) != 0 }
    }

    fn use_row_cache(&self, handle: Handle, enabled: bool, size: u32) -> bool {
        unsafe { (self.api.use_row_cache)(raw(handle), flag(enabled), c_ulong::from(size)) != 0 }
    }

    fn commit(&self, handle: Handle) -> bool {
        unsafe { (self.api.commit)(raw(handle)) != 0 }
    }

    fn rollback(&self, handle: Handle) -> bool {
        unsafe { (self.api.rollback)(raw(handle)) != 0 }
    }

    fn prepare(&self, handle: Handle, operation: &str) -> bool {
        let Some(sql) = c_string(operation.as_bytes()) else {
            return false;
        };
        unsafe { (self.api.prepare)(raw(handle), sql.as_ptr()) != 0 }
    }

    fn prepare_proc(&self, handle: Handle, procedure: &str) -> bool {
        let Some(name) = c_string(procedure.as_bytes()) else {
            return false;
        };
        unsafe { (self.api.prepare_proc)(raw(handle), name.as_ptr()) != 0 }
    }

    fn execute(&self, handle: Handle) -> bool {
        // A null statement executes the prepared one.
        unsafe { (self.api.execute)(raw(handle), ptr::null()) != 0 }
    }

    fn drop_query(&self, handle: Handle) -> bool {
        unsafe { (self.api.drop_qry)(raw(handle)) != 0 }
    }

    fn bind_param(&self, handle: Handle, binding: &ParamBinding) -> bool {
        unsafe {
            (self.api.bind_param_ex)(
                raw(handle),
                binding.column,
                direction(binding.direction),
                binding.wire_type.0,
                c_ulong::from(binding.size),
                binding.sql_type.0,
                c_ulong::from(binding.max_size),
                binding.precision as c_short,
                flag(binding.is_final),
            ) != 0
        }
    }

    fn set_param_null(&self, handle: Handle, column: u16, is_final: bool) -> bool {
        unsafe { (self.api.set_param_null)(raw(handle), column, flag(is_final)) != 0 }
    }

    fn set_param_text(&self, handle: Handle, column: u16, value: &[u8], is_final: bool) -> bool {
        let Some(text) = c_string(value) else {
            return false;
        };
        unsafe { (self.api.set_param_text)(raw(handle), column, text.as_ptr(), flag(is_final)) != 0 }
    }

    fn set_param_long_long(&self, handle: Handle, column: u16, value: i64, is_final: bool) -> bool {
        unsafe { (self.api.set_param_long_long)(raw(handle), column, value, flag(is_final)) != 0 }
    }

    fn set_param_double(&self, handle: Handle, column: u16, value: f64, is_final: bool) -> bool {
        unsafe { (self.api.set_param_double)(raw(handle), column, value, flag(is_final)) != 0 }
    }

    fn fetch_row(&self, handle: Handle) -> bool {
        unsafe { (self.api.fetch_row)(raw(handle)) != 0 }
    }

    fn fetch_next_result(&self, handle: Handle) -> bool {
        unsafe { (self.api.fetch_next_result)(raw(handle)) != 0 }
    }

    fn no_data(&self, handle: Handle) -> bool {
        unsafe { (self.api.no_data)(raw(handle)) != 0 }
    }

    fn row_count(&self, handle: Handle) -> i64 {
        i64::from(unsafe { (self.api.get_row_count)(raw(handle)) })
    }

    fn total_cols(&self, handle: Handle) -> u16 {
        unsafe { (self.api.get_total_cols)(raw(handle)) }
    }

    fn col_name(&self, handle: Handle, column: u16) -> String {
        unsafe { owned_text((self.api.col_name)(raw(handle), column)) }
    }

    fn col_sql_type(&self, handle: Handle, column: u16) -> SqlType {
        SqlType(unsafe { (self.api.col_sql_type)(raw(handle), column) })
    }

    fn col_data_type(&self, handle: Handle, column: u16) -> WireType {
        WireType(unsafe { (self.api.col_data_type)(raw(handle), column) })
    }

    fn col_data(&self, handle: Handle, column: u16) -> Option<Vec<u8>> {
        let data = unsafe { (self.api.col_data)(raw(handle), column) };
        if data.is_null() {
            return None;
        }
        let len = unsafe { (self.api.col_data_len)(raw(handle), column) };
        let len = usize::try_from(len).unwrap_or(0);
        // SAFETY: the library guarantees `len` readable bytes at `data` until
        // the next fetch on this handle.
        Some(unsafe { std::slice::from_raw_parts(data.cast::<u8>(), len) }.to_vec())
    }

    fn col_actual_len(&self, handle: Handle, column: u16) -> usize {
        let len = unsafe { (self.api.col_actual_len)(raw(handle), column) };
        usize::try_from(len).unwrap_or(0)
    }

    fn col_truncated(&self, handle: Handle, column: u16) -> bool {
        unsafe { (self.api.col_truncated)(raw(handle), column) != 0 }
    }

    fn get_error(&self, handle: Handle) -> u32 {
        unsafe { (self.api.get_error)(raw(handle)) as u32 }
    }

    fn get_error_text(&self, handle: Handle) -> String {
        unsafe { owned_text((self.api.get_error_text)(raw(handle))) }
    }
}

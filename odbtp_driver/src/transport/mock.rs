//! Call-recording transport for unit tests.

use super::{Attribute, LoginMode, ParamBinding, Transport};
use crate::handles::Handle;
use crate::protocol::types::{SqlType, WireType};
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

#[derive(Default)]
pub struct MockTransport {
    calls: Mutex<Vec<String>>,
    failing: Mutex<HashSet<&'static str>>,
    error_code: Mutex<u32>,
    error_text: Mutex<String>,
    next_handle: AtomicUsize,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes `primitive` fail and report `code` with `text`.
    pub fn fail(&self, primitive: &'static str, code: u32, text: &str) {
        self.failing.lock().unwrap().insert(primitive);
        *self.error_code.lock().unwrap() = code;
        *self.error_text.lock().unwrap() = text.to_string();
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, primitive: &str) -> usize {
        self.calls().iter().filter(|c| c.as_str() == primitive).count()
    }

    fn record(&self, primitive: &'static str) -> bool {
        self.calls.lock().unwrap().push(primitive.to_string());
        !self.failing.lock().unwrap().contains(primitive)
    }
}

impl Transport for MockTransport {
    fn allocate(&self, _parent: Option<Handle>) -> Option<Handle> {
        if !self.record("allocate") {
            return None;
        }
        Handle::new(self.next_handle.fetch_add(1, Ordering::SeqCst) + 1)
    }

    fn login(&self, _h: Handle, _s: &str, _p: u16, _m: LoginMode, _c: &str) -> bool {
        self.record("login")
    }

    fn logout(&self, _h: Handle, _force: bool) -> bool {
        self.record("logout")
    }

    fn free(&self, _h: Handle) {
        self.record("free");
    }

    fn get_attr_text(&self, _h: Handle, _a: Attribute, _max: usize) -> Option<String> {
        self.record("get_attr_text").then(|| "SQLSRV32.DLL".to_string())
    }

    fn get_attr_long(&self, _h: Handle, _a: Attribute) -> Option<i64> {
        self.record("get_attr_long").then_some(0)
    }

    fn set_attr_long(&self, _h: Handle, _a: Attribute, _v: i64) -> bool {
        self.record("set_attr_long")
    }

    fn load_data_types(&self, _h: Handle) -> bool {
        self.record("load_data_types")
    }

    fn use_row_cache(&self, _h: Handle, _enabled: bool, _size: u32) -> bool {
        self.record("use_row_cache")
    }

    fn commit(&self, _h: Handle) -> bool {
        self.record("commit")
    }

    fn rollback(&self, _h: Handle) -> bool {
        self.record("rollback")
    }

    fn prepare(&self, _h: Handle, _op: &str) -> bool {
        self.record("prepare")
    }

    fn prepare_proc(&self, _h: Handle, _proc: &str) -> bool {
        self.record("prepare_proc")
    }

    fn execute(&self, _h: Handle) -> bool {
        self.record("execute")
    }

    fn drop_query(&self, _h: Handle) -> bool {
        self.record("drop_query")
    }

    fn bind_param(&self, _h: Handle, _b: &ParamBinding) -> bool {
        self.record("bind_param")
    }

    fn set_param_null(&self, _h: Handle, _c: u16, _f: bool) -> bool {
        self.record("set_param_null")
    }

    fn set_param_text(&self, _h: Handle, _c: u16, _v: &[u8], _f: bool) -> bool {
        self.record("set_param_text")
    }

    fn set_param_long_long(&self, _h: Handle, _c: u16, _v: i64, _f: bool) -> bool {
        self.record("set_param_long_long")
    }

    fn set_param_double(&self, _h: Handle, _c: u16, _v: f64, _f: bool) -> bool {
        self.record("set_param_double")
    }

    fn fetch_row(&self, _h: Handle) -> bool {
        self.record("fetch_row")
    }

    fn fetch_next_result(&self, _h: Handle) -> bool {
        self.record("fetch_next_result")
    }

    fn no_data(&self, _h: Handle) -> bool {
        true
    }

    fn row_count(&self, _h: Handle) -> i64 {
        -1
    }

    fn total_cols(&self, _h: Handle) -> u16 {
        0
    }

    fn col_name(&self, _h: Handle, _c: u16) -> String {
        String::new()
    }

    fn col_sql_type(&self, _h: Handle, _c: u16) -> SqlType {
        SqlType::UNKNOWN
    }

    fn col_data_type(&self, _h: Handle, _c: u16) -> WireType {
        WireType::CHAR
    }

    fn col_data(&self, _h: Handle, _c: u16) -> Option<Vec<u8>> {
        None
    }

    fn col_actual_len(&self, _h: Handle, _c: u16) -> usize {
        0
    }

    fn col_truncated(&self, _h: Handle, _c: u16) -> bool {
        false
    }

    fn get_error(&self, _h: Handle) -> u32 {
        *self.error_code.lock().unwrap()
    }

    fn get_error_text(&self, _h: Handle) -> String {
        self.error_text.lock().unwrap().clone()
    }
}

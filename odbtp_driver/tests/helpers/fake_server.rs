//! In-memory stand-in for an ODBTP server reached through the client library.
//!
//! Understands a tiny SQL dialect: `CREATE TABLE`, `DROP TABLE`,
//! `INSERT INTO .. VALUES (?, ..)` and `SELECT * FROM ..`, optionally several
//! statements joined by `;` (one result set per `SELECT`). Work is kept in a
//! working copy until `commit`; `rollback` restores the committed copy.
use chrono::NaiveDateTime;
use odbtp_driver::handles::Handle;
use odbtp_driver::protocol::TimestampStruct;
use odbtp_driver::transport::{Attribute, LoginMode, ParamBinding, Transport};
use odbtp_driver::{SqlType, WireType};
use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};

pub const SERVER_ERROR: u32 = 99;
const FETCH_ROW_ERROR: u32 = 15;
const NOT_PREPARED_PROC: u32 = 16;

#[derive(Debug, Clone, Copy, PartialEq)]
enum ColumnType {
    Int,
    BigInt,
    Float,
    Varchar,
    Numeric,
    Date,
    Time,
    DateTime,
    VarBinary,
}

impl ColumnType {
    fn parse(decl: &str) -> Option<Self> {
        let base = decl.split(['(', ' ']).next()?.to_uppercase();
        Some(match base.as_str() {
            "INT" | "INTEGER" => Self::Int,
            "BIGINT" => Self::BigInt,
            "FLOAT" | "DOUBLE" => Self::Float,
            "VARCHAR" | "CHAR" | "TEXT" => Self::Varchar,
            "NUMERIC" | "DECIMAL" => Self::Numeric,
            "DATE" => Self::Date,
            "TIME" => Self::Time,
            "DATETIME" | "TIMESTAMP" => Self::DateTime,
            "VARBINARY" | "BINARY" => Self::VarBinary,
            _ => return None,
        })
    }

    /// (SQL type, wire type) reported by the column accessors.
    fn reported(self) -> (SqlType, WireType) {
        match self {
            Self::Int => (SqlType(4), WireType::INT),
            Self::BigInt => (SqlType::BIGINT, WireType::BIGINT),
            Self::Float => (SqlType::DOUBLE, WireType::DOUBLE),
            Self::Varchar => (SqlType(12), WireType::CHAR),
            Self::Numeric => (SqlType::NUMERIC, WireType::CHAR),
            Self::Date => (SqlType::TYPE_DATE, WireType::CHAR),
            Self::Time => (SqlType::TYPE_TIME, WireType::CHAR),
            Self::DateTime => (SqlType(93), WireType::DATETIME),
            Self::VarBinary => (SqlType(-3), WireType::BINARY),
        }
    }
}

#[derive(Debug, Clone)]
enum Param {
    Null,
    Text(Vec<u8>),
    Int(i64),
    Double(f64),
}

impl Param {
    fn text(&self) -> Option<String> {
        match self {
            Param::Null => None,
            Param::Text(t) => Some(String::from_utf8_lossy(t).into_owned()),
            Param::Int(n) => Some(n.to_string()),
            Param::Double(x) => Some(x.to_string()),
        }
    }
}

type Cell = Option<Vec<u8>>;

#[derive(Debug, Clone)]
struct Column {
    name: String,
    ty: ColumnType,
    primary_key: bool,
}

#[derive(Debug, Clone, Default)]
struct Table {
    columns: Vec<Column>,
    rows: Vec<Vec<Cell>>,
}

#[derive(Debug, Clone)]
enum Statement {
    Create { table: String, columns: Vec<Column> },
    Drop { table: String },
    Insert { table: String, columns: Option<Vec<String>>, placeholders: usize },
    Select { table: String },
    Procedure,
}

#[derive(Debug, Clone)]
struct ResultColumn {
    name: String,
    sql_type: SqlType,
    wire_type: WireType,
}

#[derive(Debug, Clone, Default)]
struct ResultSet {
    columns: Vec<ResultColumn>,
    rows: Vec<Vec<Cell>>,
}

#[derive(Debug, Default)]
struct Query {
    session: usize,
    statements: Vec<Statement>,
    params: HashMap<u16, Param>,
    bindings: Vec<ParamBinding>,
    pending: VecDeque<ResultSet>,
    current: Option<ResultSet>,
    position: usize,
    no_data: bool,
    row_count: i64,
}

#[derive(Debug, Default)]
struct State {
    next_handle: usize,
    sessions: HashMap<usize, bool>,
    queries: HashMap<usize, Query>,
    committed: HashMap<String, Table>,
    working: HashMap<String, Table>,
    errors: HashMap<usize, (u32, String)>,
    failures: HashMap<String, (u32, String)>,
    calls: Vec<String>,
}

pub struct FakeServer {
    driver: String,
    fetch_limit: Option<usize>,
    state: Mutex<State>,
}

impl Default for FakeServer {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeServer {
    pub fn new() -> Self {
        Self::with_driver("SQLSRV32.DLL")
    }

    pub fn with_driver(driver: &str) -> Self {
        Self {
            driver: driver.to_string(),
            fetch_limit: None,
            state: Mutex::new(State::default()),
        }
    }

    /// Columns longer than `limit` bytes are reported as truncated.
    pub fn with_fetch_limit(mut self, limit: usize) -> Self {
        self.fetch_limit = Some(limit);
        self
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }

    /// Makes the next call to `primitive` fail with `code` and `text`.
    pub fn fail_next(&self, primitive: &str, code: u32, text: &str) {
        self.lock()
            .failures
            .insert(primitive.to_string(), (code, text.to_string()));
    }

    pub fn calls(&self) -> Vec<String> {
        self.lock().calls.clone()
    }

    pub fn count(&self, primitive: &str) -> usize {
        self.lock().calls.iter().filter(|c| *c == primitive).count()
    }

    /// Handles allocated and not yet freed.
    pub fn live_handles(&self) -> usize {
        let state = self.lock();
        state.sessions.len() + state.queries.len()
    }

    /// Rows of `table` as visible after the last commit.
    pub fn committed_rows(&self, table: &str) -> usize {
        self.lock().committed.get(table).map_or(0, |t| t.rows.len())
    }

    pub fn last_bindings(&self) -> Vec<ParamBinding> {
        let state = self.lock();
        state
            .queries
            .values()
            .max_by_key(|q| q.bindings.len())
            .map(|q| q.bindings.clone())
            .unwrap_or_default()
    }

    /// Records the call; `false` if a failure was injected for it.
    fn enter(&self, primitive: &str, handle: Option<Handle>) -> bool {
        let mut state = self.lock();
        state.calls.push(primitive.to_string());
        match state.failures.remove(primitive) {
            Some(error) => {
                if let Some(h) = handle {
                    state.errors.insert(h.raw(), error);
                }
                false
            }
            None => true,
        }
    }
}

fn raise(state: &mut State, handle: Handle, sqlstate: &str, message: &str) -> bool {
    state.errors.insert(
        handle.raw(),
        (SERVER_ERROR, format!("[{}][FakeServer]{}", sqlstate, message)),
    );
    false
}

fn parse_statement(sql: &str) -> Option<Statement> {
    let sql = sql.trim();
    let upper = sql.to_uppercase();
    let words: Vec<&str> = sql.split_whitespace().collect();

    if upper.starts_with("CREATE TABLE") {
        let open = sql.find('(')?;
        let close = sql.rfind(')')?;
        let table = sql[12..open].trim().to_string();
        let columns = sql[open + 1..close]
            .split(',')
            .map(|def| {
                let mut parts = def.trim().splitn(2, ' ');
                let name = parts.next()?.to_string();
                let decl = parts.next()?.trim();
                Some(Column {
                    name,
                    ty: ColumnType::parse(decl)?,
                    primary_key: decl.to_uppercase().contains("PRIMARY KEY"),
                })
            })
            .collect::<Option<Vec<_>>>()?;
        return Some(Statement::Create { table, columns });
    }
    if upper.starts_with("DROP TABLE") {
        return Some(Statement::Drop {
            table: words.get(2)?.to_string(),
        });
    }
    if upper.starts_with("INSERT INTO") {
        let table = words.get(2)?.trim_end_matches('(').to_string();
        let values_at = upper.find("VALUES")?;
        let head = &sql[..values_at];
        let columns = match (head.find('('), head.rfind(')')) {
            (Some(open), Some(close)) => Some(
                head[open + 1..close]
                    .split(',')
                    .map(|c| c.trim().to_string())
                    .collect(),
            ),
            _ => None,
        };
        let placeholders = sql[values_at..].matches('?').count();
        return Some(Statement::Insert {
            table,
            columns,
            placeholders,
        });
    }
    if upper.starts_with("SELECT * FROM") {
        return Some(Statement::Select {
            table: words.get(3)?.to_string(),
        });
    }
    None
}

fn parse_timestamp(text: &str) -> Option<Vec<u8>> {
    let ts = NaiveDateTime::parse_from_str(text.trim(), "%Y-%m-%d %H:%M:%S%.f").ok()?;
    Some(TimestampStruct::from_datetime(&ts).to_bytes().to_vec())
}

/// Stores `param` in a column of type `ty`; `None` when it does not fit.
fn to_cell(ty: ColumnType, param: &Param) -> Option<Cell> {
    if matches!(param, Param::Null) {
        return Some(None);
    }
    let int = || match param {
        Param::Int(n) => Some(*n),
        other => other.text()?.trim().parse().ok(),
    };
    let bytes = match ty {
        ColumnType::Int => i32::try_from(int()?).ok()?.to_le_bytes().to_vec(),
        ColumnType::BigInt => int()?.to_le_bytes().to_vec(),
        ColumnType::Float => {
            let x = match param {
                Param::Double(x) => *x,
                Param::Int(n) => *n as f64,
                other => other.text()?.trim().parse().ok()?,
            };
            x.to_le_bytes().to_vec()
        }
        ColumnType::DateTime => parse_timestamp(&param.text()?)?,
        ColumnType::VarBinary => match param {
            Param::Text(bytes) => bytes.clone(),
            other => other.text()?.into_bytes(),
        },
        ColumnType::Varchar | ColumnType::Numeric | ColumnType::Date | ColumnType::Time => {
            param.text()?.into_bytes()
        }
    };
    Some(Some(bytes))
}

impl State {
    fn query(&mut self, handle: Handle) -> Option<&mut Query> {
        self.queries.get_mut(&handle.raw())
    }

    fn run(&mut self, handle: Handle) -> bool {
        let Some(query) = self.queries.get(&handle.raw()) else {
            return false;
        };
        let statements = query.statements.clone();
        let params = query.params.clone();

        let mut results = VecDeque::new();
        let mut row_count = -1;
        for statement in statements {
            match statement {
                Statement::Create { table, columns } => {
                    if self.working.contains_key(&table) {
                        return raise(self, handle, "42S01", "Table already exists");
                    }
                    self.working.insert(
                        table,
                        Table {
                            columns,
                            rows: Vec::new(),
                        },
                    );
                    row_count = -1;
                }
                Statement::Drop { table } => {
                    if self.working.remove(&table).is_none() {
                        return raise(self, handle, "42S02", "Invalid object name");
                    }
                    row_count = -1;
                }
                Statement::Insert {
                    table,
                    columns,
                    placeholders,
                } => {
                    let Some(target) = self.working.get(&table) else {
                        return raise(self, handle, "42S02", "Invalid object name");
                    };
                    let names: Vec<String> = columns
                        .unwrap_or_else(|| target.columns.iter().map(|c| c.name.clone()).collect());
                    if names.len() != placeholders {
                        return raise(self, handle, "21S01", "Column count mismatch");
                    }
                    let mut row: Vec<Cell> = vec![None; target.columns.len()];
                    for (i, name) in names.iter().enumerate() {
                        let Some(idx) = target.columns.iter().position(|c| &c.name == name) else {
                            return raise(self, handle, "42S22", "Invalid column name");
                        };
                        let column = u16::try_from(i + 1).unwrap_or(u16::MAX);
                        let Some(param) = params.get(&column) else {
                            return raise(self, handle, "07002", "COUNT field incorrect");
                        };
                        let Some(cell) = to_cell(target.columns[idx].ty, param) else {
                            return raise(self, handle, "22018", "Invalid character value");
                        };
                        row[idx] = cell;
                    }
                    for (idx, column) in target.columns.iter().enumerate() {
                        if column.primary_key
                            && target.rows.iter().any(|r| r[idx].is_some() && r[idx] == row[idx])
                        {
                            return raise(
                                self,
                                handle,
                                "23000",
                                "Violation of PRIMARY KEY constraint",
                            );
                        }
                    }
                    if let Some(target) = self.working.get_mut(&table) {
                        target.rows.push(row);
                    }
                    row_count = 1;
                }
                Statement::Select { table } => {
                    let Some(source) = self.working.get(&table) else {
                        return raise(self, handle, "42S02", "Invalid object name");
                    };
                    let columns = source
                        .columns
                        .iter()
                        .map(|c| {
                            let (sql_type, wire_type) = c.ty.reported();
                            ResultColumn {
                                name: c.name.clone(),
                                sql_type,
                                wire_type,
                            }
                        })
                        .collect();
                    row_count = source.rows.len() as i64;
                    results.push_back(ResultSet {
                        columns,
                        rows: source.rows.clone(),
                    });
                }
                Statement::Procedure => {
                    let mut columns = Vec::new();
                    let mut row = Vec::new();
                    let mut keys: Vec<_> = params.keys().copied().collect();
                    keys.sort_unstable();
                    for key in keys {
                        columns.push(ResultColumn {
                            name: format!("p{}", key),
                            sql_type: SqlType::CHAR,
                            wire_type: WireType::CHAR,
                        });
                        row.push(params[&key].text().map(String::into_bytes));
                    }
                    row_count = 1;
                    results.push_back(ResultSet {
                        columns,
                        rows: vec![row],
                    });
                }
            }
        }

        let Some(query) = self.query(handle) else {
            return false;
        };
        query.current = results.pop_front();
        query.pending = results;
        query.position = 0;
        query.no_data = false;
        query.row_count = row_count;
        true
    }

    fn current_cell(&self, handle: Handle, column: u16) -> Option<&Cell> {
        let query = self.queries.get(&handle.raw())?;
        let set = query.current.as_ref()?;
        let row = set.rows.get(query.position.checked_sub(1)?)?;
        row.get(usize::from(column).checked_sub(1)?)
    }

    fn current_column(&self, handle: Handle, column: u16) -> Option<&ResultColumn> {
        let query = self.queries.get(&handle.raw())?;
        query
            .current
            .as_ref()?
            .columns
            .get(usize::from(column).checked_sub(1)?)
    }
}

impl Transport for FakeServer {
    fn allocate(&self, parent: Option<Handle>) -> Option<Handle> {
        if !self.enter("allocate", parent) {
            return None;
        }
        let mut state = self.lock();
        state.next_handle += 1;
        let raw = state.next_handle;
        match parent {
            None => {
                state.sessions.insert(raw, false);
            }
            Some(session) => {
                if !state.sessions.get(&session.raw()).copied().unwrap_or(false) {
                    state.errors.insert(session.raw(), (2, String::new()));
                    return None;
                }
                state.queries.insert(
                    raw,
                    Query {
                        session: session.raw(),
                        row_count: -1,
                        ..Query::default()
                    },
                );
            }
        }
        Handle::new(raw)
    }

    fn login(
        &self,
        handle: Handle,
        _server: &str,
        _port: u16,
        _mode: LoginMode,
        connection_string: &str,
    ) -> bool {
        if !self.enter("login", Some(handle)) {
            return false;
        }
        let mut state = self.lock();
        if !connection_string.to_uppercase().contains("DSN=") {
            return raise(
                &mut state,
                handle,
                "IM002",
                "Data source name not found and no default driver specified",
            );
        }
        state.sessions.insert(handle.raw(), true);
        let committed = state.committed.clone();
        state.working = committed;
        true
    }

    fn logout(&self, handle: Handle, _force: bool) -> bool {
        if !self.enter("logout", Some(handle)) {
            return false;
        }
        self.lock().sessions.insert(handle.raw(), false);
        true
    }

    fn free(&self, handle: Handle) {
        self.enter("free", None);
        let mut state = self.lock();
        if state.sessions.remove(&handle.raw()).is_some() {
            state.queries.retain(|_, q| q.session != handle.raw());
        } else {
            state.queries.remove(&handle.raw());
        }
    }

    fn get_attr_text(&self, handle: Handle, _attr: Attribute, max_len: usize) -> Option<String> {
        if !self.enter("get_attr_text", Some(handle)) {
            return None;
        }
        Some(self.driver.chars().take(max_len).collect())
    }

    fn get_attr_long(&self, handle: Handle, _attr: Attribute) -> Option<i64> {
        self.enter("get_attr_long", Some(handle)).then_some(0)
    }

    fn set_attr_long(&self, handle: Handle, _attr: Attribute, _value: i64) -> bool {
        self.enter("set_attr_long", Some(handle))
    }

    fn load_data_types(&self, handle: Handle) -> bool {
        self.enter("load_data_types", Some(handle))
    }

    fn use_row_cache(&self, handle: Handle, _enabled: bool, _size: u32) -> bool {
        self.enter("use_row_cache", Some(handle))
    }

    fn commit(&self, handle: Handle) -> bool {
        if !self.enter("commit", Some(handle)) {
            return false;
        }
        let mut state = self.lock();
        let working = state.working.clone();
        state.committed = working;
        true
    }

    fn rollback(&self, handle: Handle) -> bool {
        if !self.enter("rollback", Some(handle)) {
            return false;
        }
        let mut state = self.lock();
        let committed = state.committed.clone();
        state.working = committed;
        true
    }

    fn prepare(&self, handle: Handle, operation: &str) -> bool {
        if !self.enter("prepare", Some(handle)) {
            return false;
        }
        let mut state = self.lock();
        let statements: Option<Vec<_>> = operation
            .split(';')
            .filter(|s| !s.trim().is_empty())
            .map(parse_statement)
            .collect();
        let Some(statements) = statements else {
            return raise(&mut state, handle, "42000", "Incorrect syntax");
        };
        let Some(query) = state.query(handle) else {
            return false;
        };
        *query = Query {
            session: query.session,
            statements,
            row_count: -1,
            ..Query::default()
        };
        true
    }

    fn prepare_proc(&self, handle: Handle, procedure: &str) -> bool {
        if !self.enter("prepare_proc", Some(handle)) {
            return false;
        }
        let mut state = self.lock();
        if procedure != "sp_echo" {
            state.errors.insert(handle.raw(), (NOT_PREPARED_PROC, String::new()));
            return false;
        }
        let Some(query) = state.query(handle) else {
            return false;
        };
        *query = Query {
            session: query.session,
            statements: vec![Statement::Procedure],
            row_count: -1,
            ..Query::default()
        };
        true
    }

    fn execute(&self, handle: Handle) -> bool {
        if !self.enter("execute", Some(handle)) {
            return false;
        }
        self.lock().run(handle)
    }

    fn drop_query(&self, handle: Handle) -> bool {
        if !self.enter("drop_query", Some(handle)) {
            return false;
        }
        let mut state = self.lock();
        let Some(query) = state.query(handle) else {
            return false;
        };
        *query = Query {
            session: query.session,
            row_count: -1,
            ..Query::default()
        };
        true
    }

    fn bind_param(&self, handle: Handle, binding: &ParamBinding) -> bool {
        if !self.enter("bind_param", Some(handle)) {
            return false;
        }
        let mut state = self.lock();
        let Some(query) = state.query(handle) else {
            return false;
        };
        query.bindings.retain(|b| b.column != binding.column);
        query.bindings.push(*binding);
        true
    }

    fn set_param_null(&self, handle: Handle, column: u16, _is_final: bool) -> bool {
        self.set_param("set_param_null", handle, column, Param::Null)
    }

    fn set_param_text(&self, handle: Handle, column: u16, value: &[u8], _is_final: bool) -> bool {
        self.set_param("set_param_text", handle, column, Param::Text(value.to_vec()))
    }

    fn set_param_long_long(&self, handle: Handle, column: u16, value: i64, _is_final: bool) -> bool {
        self.set_param("set_param_long_long", handle, column, Param::Int(value))
    }

    fn set_param_double(&self, handle: Handle, column: u16, value: f64, _is_final: bool) -> bool {
        self.set_param("set_param_double", handle, column, Param::Double(value))
    }

    fn fetch_row(&self, handle: Handle) -> bool {
        if !self.enter("fetch_row", Some(handle)) {
            return false;
        }
        let mut state = self.lock();
        let Some(query) = state.query(handle) else {
            return false;
        };
        let Some(rows) = query.current.as_ref().map(|set| set.rows.len()) else {
            state.errors.insert(handle.raw(), (FETCH_ROW_ERROR, String::new()));
            return false;
        };
        if query.position < rows {
            query.position += 1;
        } else {
            query.no_data = true;
        }
        true
    }

    fn fetch_next_result(&self, handle: Handle) -> bool {
        if !self.enter("fetch_next_result", Some(handle)) {
            return false;
        }
        let mut state = self.lock();
        let Some(query) = state.query(handle) else {
            return false;
        };
        query.current = query.pending.pop_front();
        query.position = 0;
        query.no_data = query.current.is_none();
        if let Some(set) = &query.current {
            query.row_count = set.rows.len() as i64;
        }
        true
    }

    fn no_data(&self, handle: Handle) -> bool {
        let state = self.lock();
        state.queries.get(&handle.raw()).is_some_and(|q| q.no_data)
    }

    fn row_count(&self, handle: Handle) -> i64 {
        let state = self.lock();
        state.queries.get(&handle.raw()).map_or(-1, |q| q.row_count)
    }

    fn total_cols(&self, handle: Handle) -> u16 {
        let state = self.lock();
        state
            .queries
            .get(&handle.raw())
            .and_then(|q| q.current.as_ref())
            .map_or(0, |set| u16::try_from(set.columns.len()).unwrap_or(u16::MAX))
    }

    fn col_name(&self, handle: Handle, column: u16) -> String {
        let state = self.lock();
        state
            .current_column(handle, column)
            .map(|c| c.name.clone())
            .unwrap_or_default()
    }

    fn col_sql_type(&self, handle: Handle, column: u16) -> SqlType {
        let state = self.lock();
        state
            .current_column(handle, column)
            .map_or(SqlType::UNKNOWN, |c| c.sql_type)
    }

    fn col_data_type(&self, handle: Handle, column: u16) -> WireType {
        let state = self.lock();
        state
            .current_column(handle, column)
            .map_or(WireType::CHAR, |c| c.wire_type)
    }

    fn col_data(&self, handle: Handle, column: u16) -> Option<Vec<u8>> {
        let state = self.lock();
        let data = state.current_cell(handle, column)?.clone()?;
        Some(match self.fetch_limit {
            Some(limit) => data.into_iter().take(limit).collect(),
            None => data,
        })
    }

    fn col_actual_len(&self, handle: Handle, column: u16) -> usize {
        let state = self.lock();
        state
            .current_cell(handle, column)
            .and_then(|cell| cell.as_ref())
            .map_or(0, Vec::len)
    }

    fn col_truncated(&self, handle: Handle, column: u16) -> bool {
        let Some(limit) = self.fetch_limit else {
            return false;
        };
        self.col_actual_len(handle, column) > limit
    }

    fn get_error(&self, handle: Handle) -> u32 {
        let state = self.lock();
        state.errors.get(&handle.raw()).map_or(0, |e| e.0)
    }

    fn get_error_text(&self, handle: Handle) -> String {
        let state = self.lock();
        state
            .errors
            .get(&handle.raw())
            .map(|e| e.1.clone())
            .unwrap_or_default()
    }
}

impl FakeServer {
    fn set_param(&self, primitive: &str, handle: Handle, column: u16, param: Param) -> bool {
        if !self.enter(primitive, Some(handle)) {
            return false;
        }
        let mut state = self.lock();
        let Some(query) = state.query(handle) else {
            return false;
        };
        query.params.insert(column, param);
        true
    }
}

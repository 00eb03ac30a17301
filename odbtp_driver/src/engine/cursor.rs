use super::transaction::{SharedSession, TransactionGuard};
use crate::error::{classify, Error, Result};
use crate::handles::{Handle, OwnedHandle};
use crate::observability::{logger, Metadata};
use crate::protocol::decoder::{decode, resolve_column_type};
use crate::protocol::descriptor::{infer_descriptor, InputSize, TypeDescriptor};
use crate::protocol::types::WireType;
use crate::protocol::value::Value;
use crate::transport::Transport;
use log::Level;
use serde::Serialize;

/// Rows requested per round when fetching everything.
const FETCHALL_BATCH: usize = 20;

pub type Row = Vec<Value>;

/// One entry of `Cursor::description`. Only `name` and `type_code` are
/// reported; the remaining DB-API fields are always `None`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnDescriptor {
    pub name: String,
    pub type_code: WireType,
    pub display_size: Option<usize>,
    pub internal_size: Option<usize>,
    pub precision: Option<u16>,
    pub scale: Option<u16>,
    pub null_ok: Option<bool>,
}

impl ColumnDescriptor {
    pub fn new(name: String, type_code: WireType) -> Self {
        Self {
            name,
            type_code,
            display_size: None,
            internal_size: None,
            precision: None,
            scale: None,
            null_ok: None,
        }
    }
}

/// Operation context on a connection. Cursors of one connection share its
/// transaction.
pub struct Cursor {
    session: SharedSession,
    handle: OwnedHandle,
    open: bool,
    arraysize: usize,
    description: Option<Vec<ColumnDescriptor>>,
    prepared_operation: Option<String>,
    input_sizes: Vec<TypeDescriptor>,
    rowcount: i64,
}

impl Cursor {
    pub(crate) fn new(session: SharedSession, handle: OwnedHandle, arraysize: usize) -> Self {
        Self {
            session,
            handle,
            open: true,
            arraysize: arraysize.max(1),
            description: None,
            prepared_operation: None,
            input_sizes: Vec::new(),
            rowcount: -1,
        }
    }

    pub fn is_open(&self) -> bool {
        self.open && self.session.is_open()
    }

    /// Result-set columns of the last operation, `None` when it returned no
    /// rows.
    pub fn description(&self) -> Option<&[ColumnDescriptor]> {
        self.description.as_deref()
    }

    /// Rows affected by the last operation, or -1 when unknown.
    pub fn rowcount(&self) -> i64 {
        self.rowcount
    }

    pub fn arraysize(&self) -> usize {
        self.arraysize
    }

    pub fn set_arraysize(&mut self, arraysize: usize) {
        self.arraysize = arraysize.max(1);
    }

    fn transport(&self) -> &dyn Transport {
        self.session.transport().as_ref()
    }

    fn ensure_open(&self) -> Result<Handle> {
        match self.handle.get() {
            Some(handle) if self.is_open() => Ok(handle),
            _ => Err(Error::Interface(
                "Cursor or connection has been closed.".to_string(),
            )),
        }
    }

    fn metadata(&self) -> Metadata {
        let mut metadata = Metadata::new();
        if let Some(handle) = self.handle.get() {
            metadata.insert("handle", format!("{:?}", handle));
        }
        if let Some(op) = &self.prepared_operation {
            metadata.insert("operation", op.clone());
        }
        metadata
    }

    fn report(&self, err: Error) -> Error {
        logger().log_error(&err, &self.metadata());
        err
    }

    pub fn execute(&mut self, operation: &str, parameters: &[Value]) -> Result<&mut Self> {
        self.executemany(operation, &[parameters])
    }

    /// Prepares `operation` if it changed and executes it once per row.
    pub fn executemany<R>(&mut self, operation: &str, rows: &[R]) -> Result<&mut Self>
    where
        R: AsRef<[Value]>,
    {
        let handle = self.ensure_open()?;
        if rows.is_empty() {
            return Err(Error::Interface(
                "Parameters are required for executemany()".to_string(),
            ));
        }
        match self.run_batch(handle, operation, rows) {
            Ok(()) => Ok(self),
            Err(err) => Err(self.report(err)),
        }
    }

    fn run_batch<R>(&mut self, handle: Handle, operation: &str, rows: &[R]) -> Result<()>
    where
        R: AsRef<[Value]>,
    {
        let session = self.session.clone();
        let guard = TransactionGuard::new(&session, handle);

        if self.prepared_operation.as_deref() != Some(operation) {
            self.prepare_operation(&guard, operation)?;
        }

        let mut affected = Some(0i64);
        let mut last_count = -1;
        for row in rows {
            let values = row.as_ref();
            if self.input_sizes.is_empty() {
                let total = param_count(values.len()).map_err(|e| guard.fail(e))?;
                let mut bound = Vec::with_capacity(values.len());
                for (column, value) in (1..=total).zip(values) {
                    let mut descriptor = infer_descriptor(value).map_err(|e| guard.fail(e))?;
                    descriptor.bind_to_column(&guard, column, total)?;
                    bound.push(descriptor);
                }
                for (descriptor, value) in bound.iter().zip(values) {
                    descriptor.set_parameter(&guard, value)?;
                }
            } else {
                if values.len() != self.input_sizes.len() {
                    return Err(guard.fail(Error::Programming(format!(
                        "Expected {} parameters, got {}",
                        self.input_sizes.len(),
                        values.len()
                    ))));
                }
                for (descriptor, value) in self.input_sizes.iter().zip(values) {
                    descriptor.set_parameter(&guard, value)?;
                }
            }

            guard.check(self.transport().execute(handle))?;
            last_count = self.transport().row_count(handle);
            affected = affected.filter(|_| last_count >= 0).map(|sum| sum + last_count);
        }

        self.refresh_results(handle);
        self.rowcount = affected.unwrap_or(last_count);
        self.session.mark_dirty();
        Ok(())
    }

    /// Sends `operation` to the server and pre-binds any declared input sizes.
    fn prepare_operation(&mut self, guard: &TransactionGuard<'_>, operation: &str) -> Result<()> {
        let had_operation = self.prepared_operation.take().is_some();
        logger().log_operation(Level::Debug, operation, &self.metadata());
        guard.check(self.transport().prepare(guard.operation(), operation))?;

        if had_operation {
            self.input_sizes.clear();
        }
        let total = param_count(self.input_sizes.len()).map_err(|e| guard.fail(e))?;
        for (column, descriptor) in (1..=total).zip(self.input_sizes.iter_mut()) {
            descriptor.bind_to_column(guard, column, total)?;
        }
        self.prepared_operation = Some(operation.to_string());
        Ok(())
    }

    /// Calls a stored procedure. Procedure parameters are bound by the
    /// server, so values are set without a bind step.
    pub fn callproc(&mut self, procedure: &str, parameters: &[Value]) -> Result<&mut Self> {
        let handle = self.ensure_open()?;
        match self.run_procedure(handle, procedure, parameters) {
            Ok(()) => Ok(self),
            Err(err) => Err(self.report(err)),
        }
    }

    fn run_procedure(&mut self, handle: Handle, procedure: &str, parameters: &[Value]) -> Result<()> {
        self.input_sizes.clear();
        self.prepared_operation = None;

        let session = self.session.clone();
        let guard = TransactionGuard::new(&session, handle);
        logger().log_operation(Level::Debug, procedure, &self.metadata());
        guard.check(self.transport().prepare_proc(handle, procedure))?;

        let total = param_count(parameters.len()).map_err(|e| guard.fail(e))?;
        for (column, value) in (1..=total).zip(parameters) {
            let mut descriptor = infer_descriptor(value).map_err(|e| guard.fail(e))?;
            descriptor.attach_to_procedure_param(column, total);
            descriptor.set_parameter(&guard, value)?;
        }
        guard.check(self.transport().execute(handle))?;

        self.refresh_results(handle);
        self.rowcount = self.transport().row_count(handle);
        self.session.mark_dirty();
        Ok(())
    }

    fn refresh_results(&mut self, handle: Handle) {
        let transport = self.session.transport().clone();
        let total = transport.total_cols(handle);
        self.description = if total == 0 {
            None
        } else {
            Some(
                (1..=total)
                    .map(|column| {
                        let wire = resolve_column_type(
                            transport.col_sql_type(handle, column),
                            transport.col_data_type(handle, column),
                        );
                        ColumnDescriptor::new(transport.col_name(handle, column), wire)
                    })
                    .collect(),
            )
        };
    }

    pub fn fetchone(&mut self) -> Result<Option<Row>> {
        Ok(self.fetchmany(1)?.pop())
    }

    /// Fetches up to `size` rows. A truncated column aborts the batch with
    /// [`Error::Truncated`].
    pub fn fetchmany(&mut self, size: usize) -> Result<Vec<Row>> {
        let handle = self.ensure_open()?;
        let Some(description) = self.description.as_ref() else {
            return Err(Error::Interface(
                "No result set to fetch from.".to_string(),
            ));
        };
        let transport = self.session.transport().as_ref();

        let mut rows = Vec::with_capacity(size.min(FETCHALL_BATCH));
        while rows.len() < size {
            if !transport.fetch_row(handle) {
                return Err(classify(transport, handle));
            }
            if transport.no_data(handle) {
                break;
            }

            let mut row = Vec::with_capacity(description.len());
            for (column, col) in (1u16..).zip(description) {
                if transport.col_truncated(handle, column) {
                    return Err(Error::Truncated {
                        column,
                        actual_len: transport.col_actual_len(handle, column),
                    });
                }
                let data = transport.col_data(handle, column);
                row.push(decode(data.as_deref(), col.type_code)?);
            }
            rows.push(row);
        }
        Ok(rows)
    }

    /// Fetches the remaining rows in batches of `max(20, arraysize)`.
    pub fn fetchall(&mut self) -> Result<Vec<Row>> {
        let size = self.arraysize.max(FETCHALL_BATCH);
        let mut rows = Vec::new();
        loop {
            let batch = self.fetchmany(size)?;
            let exhausted = batch.len() < size;
            rows.extend(batch);
            if exhausted {
                return Ok(rows);
            }
        }
    }

    /// Row iterator; ends at the end of the result set or after an error.
    pub fn rows(&mut self) -> Rows<'_> {
        Rows {
            cursor: self,
            done: false,
        }
    }

    /// Moves to the next result set. `Ok(false)` when there is none.
    pub fn nextset(&mut self) -> Result<bool> {
        let handle = self.ensure_open()?;
        let transport = self.session.transport().clone();
        if !transport.fetch_next_result(handle) {
            return Err(self.report(classify(transport.as_ref(), handle)));
        }
        if transport.no_data(handle) {
            self.description = None;
            return Ok(false);
        }
        self.refresh_results(handle);
        self.rowcount = transport.row_count(handle);
        Ok(true)
    }

    /// Declares parameter types for the following executions. Only typed
    /// descriptors are accepted; on error the previous declaration stays.
    pub fn setinputsizes(&mut self, sizes: &[InputSize]) -> Result<()> {
        self.ensure_open()?;
        let descriptors = sizes
            .iter()
            .map(|size| match size {
                InputSize::Type(descriptor) if descriptor.is_typed() => Ok(descriptor.clone()),
                _ => Err(Error::Interface(
                    "Input sizes must use type descriptors.".to_string(),
                )),
            })
            .collect::<Result<Vec<_>>>()?;
        self.input_sizes = descriptors;
        self.prepared_operation = None;
        Ok(())
    }

    /// Accepted for DB-API compatibility; has no effect.
    pub fn setoutputsize(&mut self, _size: usize, _column: Option<usize>) -> Result<()> {
        self.ensure_open().map(|_| ())
    }

    pub fn close(&mut self) -> Result<()> {
        if !self.open {
            return Err(Error::Interface("Cursor has already been closed.".to_string()));
        }
        if !self.session.is_open() {
            self.open = false;
            self.handle.forget();
            return Err(Error::Interface("The connection has been closed.".to_string()));
        }

        let result = match self.handle.get() {
            Some(handle) if !self.transport().drop_query(handle) => {
                Err(classify(self.transport(), handle))
            }
            _ => Ok(()),
        };
        self.handle.release();
        self.open = false;
        self.description = None;
        result
    }
}

fn param_count(len: usize) -> Result<u16> {
    u16::try_from(len).map_err(|_| Error::Programming(format!("Too many parameters: {}", len)))
}

impl Drop for Cursor {
    fn drop(&mut self) {
        if !self.open {
            return;
        }
        if self.session.is_open() {
            if let Err(e) = self.close() {
                log::warn!("Implicit cursor close failed: {}", e);
            }
        } else {
            // Freed together with the session.
            self.handle.forget();
        }
    }
}

impl std::fmt::Debug for Cursor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cursor")
            .field("handle", &self.handle.get())
            .field("open", &self.open)
            .field("rowcount", &self.rowcount)
            .field("prepared_operation", &self.prepared_operation)
            .finish()
    }
}

pub struct Rows<'c> {
    cursor: &'c mut Cursor,
    done: bool,
}

impl Iterator for Rows<'_> {
    type Item = Result<Row>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.cursor.fetchone() {
            Ok(Some(row)) => Some(Ok(row)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

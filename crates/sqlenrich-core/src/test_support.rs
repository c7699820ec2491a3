//! In-memory fakes of the database seams.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use bigdecimal::BigDecimal;
use chrono::{NaiveDate, NaiveTime};

use crate::error::DriverError;
use crate::lookup::param_conv::{bind_all, BindTarget};
use crate::lookup::source::{LookupConnection, LookupPool, QueryRows};
use crate::lookup::sql_type::{ColumnMeta, SqlType};
use crate::lookup::statement::PlaceholderStyle;
use crate::lookup::type_conv::ResultRow;
use crate::value::{Timestamp, Value};

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Cell {
    Null,
    Int(i64),
    Float(f64),
    Text(String),
    Decimal(BigDecimal),
    Date(NaiveDate),
    Time(NaiveTime),
    Timestamp(Timestamp),
    Bool(bool),
}

#[derive(Debug, Clone)]
pub(crate) struct MockRow {
    cells: Vec<Cell>,
}

impl MockRow {
    pub(crate) fn new(cells: Vec<Cell>) -> Self {
        Self { cells }
    }

    fn cell(&self, index: usize) -> Result<&Cell, DriverError> {
        self.cells.get(index).ok_or(DriverError::Read {
            column: index,
            message: "no such column".into(),
        })
    }
}

fn mismatch(index: usize, cell: &Cell) -> DriverError {
    DriverError::Read {
        column: index,
        message: format!("unexpected cell {cell:?}"),
    }
}

impl ResultRow for MockRow {
    fn get_i64(&self, index: usize) -> Result<Option<i64>, DriverError> {
        match self.cell(index)? {
            Cell::Null => Ok(None),
            Cell::Int(i) => Ok(Some(*i)),
            other => Err(mismatch(index, other)),
        }
    }

    fn get_f64(&self, index: usize) -> Result<Option<f64>, DriverError> {
        match self.cell(index)? {
            Cell::Null => Ok(None),
            Cell::Float(f) => Ok(Some(*f)),
            other => Err(mismatch(index, other)),
        }
    }

    fn get_string(&self, index: usize) -> Result<Option<String>, DriverError> {
        match self.cell(index)? {
            Cell::Null => Ok(None),
            Cell::Text(s) => Ok(Some(s.clone())),
            Cell::Int(i) => Ok(Some(i.to_string())),
            other => Err(mismatch(index, other)),
        }
    }

    fn get_decimal(&self, index: usize) -> Result<Option<BigDecimal>, DriverError> {
        match self.cell(index)? {
            Cell::Null => Ok(None),
            Cell::Decimal(d) => Ok(Some(d.clone())),
            other => Err(mismatch(index, other)),
        }
    }

    fn get_date(&self, index: usize) -> Result<Option<NaiveDate>, DriverError> {
        match self.cell(index)? {
            Cell::Null => Ok(None),
            Cell::Date(d) => Ok(Some(*d)),
            other => Err(mismatch(index, other)),
        }
    }

    fn get_time(&self, index: usize) -> Result<Option<NaiveTime>, DriverError> {
        match self.cell(index)? {
            Cell::Null => Ok(None),
            Cell::Time(t) => Ok(Some(*t)),
            other => Err(mismatch(index, other)),
        }
    }

    fn get_timestamp(&self, index: usize) -> Result<Option<Timestamp>, DriverError> {
        match self.cell(index)? {
            Cell::Null => Ok(None),
            Cell::Timestamp(ts) => Ok(Some(*ts)),
            other => Err(mismatch(index, other)),
        }
    }

    fn get_bool(&self, index: usize) -> Result<bool, DriverError> {
        match self.cell(index)? {
            Cell::Null => Ok(false),
            Cell::Bool(b) => Ok(*b),
            other => Err(mismatch(index, other)),
        }
    }
}

/// A parameter as it reached a [`RecordingTarget`].
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Bound {
    String(String),
    Decimal(BigDecimal),
    Long(i64),
    Double(f64),
    Boolean(bool),
    Timestamp(Timestamp),
    Null(SqlType),
}

#[derive(Debug, Default)]
pub(crate) struct RecordingTarget {
    pub(crate) calls: Vec<(usize, Bound)>,
}

impl BindTarget for RecordingTarget {
    fn set_string(&mut self, position: usize, value: &str) -> Result<(), DriverError> {
        self.calls.push((position, Bound::String(value.to_owned())));
        Ok(())
    }

    fn set_decimal(&mut self, position: usize, value: &BigDecimal) -> Result<(), DriverError> {
        self.calls.push((position, Bound::Decimal(value.clone())));
        Ok(())
    }

    fn set_long(&mut self, position: usize, value: i64) -> Result<(), DriverError> {
        self.calls.push((position, Bound::Long(value)));
        Ok(())
    }

    fn set_double(&mut self, position: usize, value: f64) -> Result<(), DriverError> {
        self.calls.push((position, Bound::Double(value)));
        Ok(())
    }

    fn set_boolean(&mut self, position: usize, value: bool) -> Result<(), DriverError> {
        self.calls.push((position, Bound::Boolean(value)));
        Ok(())
    }

    fn set_timestamp(&mut self, position: usize, value: Timestamp) -> Result<(), DriverError> {
        self.calls.push((position, Bound::Timestamp(value)));
        Ok(())
    }

    fn set_null(&mut self, position: usize, sql_type: SqlType) -> Result<(), DriverError> {
        self.calls.push((position, Bound::Null(sql_type)));
        Ok(())
    }
}

type Executed = Arc<Mutex<Vec<(String, Vec<Value>)>>>;

/// Pool returning a fixed result set for every statement.
pub(crate) struct MockPool {
    columns: Vec<ColumnMeta>,
    rows: Vec<Vec<Cell>>,
    query_error: Option<String>,
    reachable: bool,
    acquired: AtomicUsize,
    closed: AtomicBool,
    executed: Executed,
}

impl MockPool {
    pub(crate) fn new(columns: Vec<ColumnMeta>, rows: Vec<Vec<Cell>>) -> Self {
        Self {
            columns,
            rows,
            query_error: None,
            reachable: true,
            acquired: AtomicUsize::new(0),
            closed: AtomicBool::new(false),
            executed: Arc::default(),
        }
    }

    /// Every statement fails with `message`.
    pub(crate) fn failing(message: &str) -> Self {
        Self {
            query_error: Some(message.to_owned()),
            ..Self::new(vec![], vec![])
        }
    }

    /// The health check fails.
    pub(crate) fn unreachable() -> Self {
        Self {
            reachable: false,
            ..Self::new(vec![], vec![])
        }
    }

    pub(crate) fn acquired(&self) -> usize {
        self.acquired.load(Ordering::SeqCst)
    }

    pub(crate) fn executed(&self) -> Vec<(String, Vec<Value>)> {
        self.executed.lock().unwrap().clone()
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

impl LookupPool for MockPool {
    type Connection = MockConnection;

    async fn acquire(&self) -> Result<MockConnection, DriverError> {
        if self.is_closed() {
            return Err(DriverError::Connection("pool is closed".into()));
        }
        self.acquired.fetch_add(1, Ordering::SeqCst);
        Ok(MockConnection {
            columns: self.columns.clone(),
            rows: self.rows.clone(),
            query_error: self.query_error.clone(),
            executed: Arc::clone(&self.executed),
        })
    }

    async fn health_check(&self) -> Result<(), DriverError> {
        if self.reachable {
            Ok(())
        } else {
            Err(DriverError::Connection("connection refused".into()))
        }
    }

    fn placeholder_style(&self) -> PlaceholderStyle {
        PlaceholderStyle::QuestionMark
    }

    fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    #[allow(clippy::unnecessary_literal_bound)]
    fn source_name(&self) -> &str {
        "mock"
    }
}

pub(crate) struct MockConnection {
    columns: Vec<ColumnMeta>,
    rows: Vec<Vec<Cell>>,
    query_error: Option<String>,
    executed: Executed,
}

impl LookupConnection for MockConnection {
    type Row = MockRow;

    async fn query(&mut self, sql: &str, params: &[Value]) -> Result<QueryRows<MockRow>, DriverError> {
        bind_all(&mut RecordingTarget::default(), params)?;
        self.executed
            .lock()
            .unwrap()
            .push((sql.to_owned(), params.to_vec()));
        if let Some(message) = &self.query_error {
            return Err(DriverError::Query(message.clone().into()));
        }
        Ok(QueryRows {
            columns: self.columns.clone(),
            rows: self.rows.iter().cloned().map(MockRow::new).collect(),
        })
    }
}

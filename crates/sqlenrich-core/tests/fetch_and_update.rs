//! End-to-end lookups through the public API against an in-memory table.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use bigdecimal::BigDecimal;
use chrono::{NaiveDate, NaiveTime};
use num_bigint::BigInt;
use sqlenrich_core::lookup::param_conv::{bind_all, BindTarget};
use sqlenrich_core::lookup::{
    ColumnMeta, LookupConnection, LookupPool, PlaceholderStyle, QueryRows, ResultRow, SqlType,
};
use sqlenrich_core::{
    DriverError, EnrichConfig, EnrichOutcome, Enricher, Fetcher, LookupOptions, LookupSpec,
    MemoryRecord, Record, Timestamp, Value,
};

/// Row of already-typed values; NULL booleans read as false.
struct ValueRow(Vec<Value>);

fn read_err(column: usize) -> DriverError {
    DriverError::Read {
        column,
        message: "type mismatch".into(),
    }
}

impl ResultRow for ValueRow {
    fn get_i64(&self, index: usize) -> Result<Option<i64>, DriverError> {
        match &self.0[index] {
            Value::Null => Ok(None),
            Value::Integer(i) => Ok(Some(*i)),
            _ => Err(read_err(index)),
        }
    }

    fn get_f64(&self, index: usize) -> Result<Option<f64>, DriverError> {
        match &self.0[index] {
            Value::Null => Ok(None),
            Value::Double(d) => Ok(Some(*d)),
            _ => Err(read_err(index)),
        }
    }

    fn get_string(&self, index: usize) -> Result<Option<String>, DriverError> {
        match &self.0[index] {
            Value::Null => Ok(None),
            Value::String(s) => Ok(Some(s.clone())),
            Value::Integer(i) => Ok(Some(i.to_string())),
            _ => Err(read_err(index)),
        }
    }

    fn get_decimal(&self, index: usize) -> Result<Option<BigDecimal>, DriverError> {
        match &self.0[index] {
            Value::Null => Ok(None),
            Value::Decimal(d) => Ok(Some(d.clone())),
            _ => Err(read_err(index)),
        }
    }

    fn get_date(&self, _index: usize) -> Result<Option<NaiveDate>, DriverError> {
        Ok(None)
    }

    fn get_time(&self, _index: usize) -> Result<Option<NaiveTime>, DriverError> {
        Ok(None)
    }

    fn get_timestamp(&self, index: usize) -> Result<Option<Timestamp>, DriverError> {
        match &self.0[index] {
            Value::Null => Ok(None),
            Value::Timestamp(ts) => Ok(Some(*ts)),
            _ => Err(read_err(index)),
        }
    }

    fn get_bool(&self, index: usize) -> Result<bool, DriverError> {
        match &self.0[index] {
            Value::Boolean(b) => Ok(*b),
            _ => Ok(false),
        }
    }
}

/// Bind target that keeps the bound values in position order.
#[derive(Default)]
struct Captured(Vec<Value>);

impl Captured {
    fn put(&mut self, position: usize, value: Value) {
        assert_eq!(position, self.0.len() + 1, "positions must be bound in order");
        self.0.push(value);
    }
}

impl BindTarget for Captured {
    fn set_string(&mut self, position: usize, value: &str) -> Result<(), DriverError> {
        self.put(position, Value::from(value));
        Ok(())
    }
    fn set_decimal(&mut self, position: usize, value: &BigDecimal) -> Result<(), DriverError> {
        self.put(position, Value::Decimal(value.clone()));
        Ok(())
    }
    fn set_long(&mut self, position: usize, value: i64) -> Result<(), DriverError> {
        self.put(position, Value::Integer(value));
        Ok(())
    }
    fn set_double(&mut self, position: usize, value: f64) -> Result<(), DriverError> {
        self.put(position, Value::Double(value));
        Ok(())
    }
    fn set_boolean(&mut self, position: usize, value: bool) -> Result<(), DriverError> {
        self.put(position, Value::Boolean(value));
        Ok(())
    }
    fn set_timestamp(&mut self, position: usize, value: Timestamp) -> Result<(), DriverError> {
        self.put(position, Value::Timestamp(value));
        Ok(())
    }
    fn set_null(&mut self, position: usize, _sql_type: SqlType) -> Result<(), DriverError> {
        self.put(position, Value::Null);
        Ok(())
    }
}

type Log = Arc<Mutex<Vec<(String, Vec<Value>)>>>;

/// `users(id, name)` table answering `... WHERE id = $1` style lookups, and
/// echoing bound parameters back as a single `echo` row otherwise.
struct TablePool {
    users: BTreeMap<i64, &'static str>,
    log: Log,
}

impl TablePool {
    fn new() -> Self {
        Self {
            users: BTreeMap::from([(1, "Ada"), (2, "Grace")]),
            log: Arc::default(),
        }
    }

    fn statements(&self) -> Vec<(String, Vec<Value>)> {
        self.log.lock().unwrap().clone()
    }
}

struct TableConnection {
    users: BTreeMap<i64, &'static str>,
    log: Log,
}

impl LookupPool for TablePool {
    type Connection = TableConnection;

    async fn acquire(&self) -> Result<TableConnection, DriverError> {
        Ok(TableConnection {
            users: self.users.clone(),
            log: Arc::clone(&self.log),
        })
    }

    async fn health_check(&self) -> Result<(), DriverError> {
        Ok(())
    }

    fn placeholder_style(&self) -> PlaceholderStyle {
        PlaceholderStyle::Numbered
    }

    fn close(&self) {}

    fn source_name(&self) -> &str {
        "table"
    }
}

impl LookupConnection for TableConnection {
    type Row = ValueRow;

    async fn query(&mut self, sql: &str, params: &[Value]) -> Result<QueryRows<ValueRow>, DriverError> {
        let mut captured = Captured::default();
        bind_all(&mut captured, params)?;
        self.log
            .lock()
            .unwrap()
            .push((sql.to_owned(), captured.0.clone()));

        if sql.starts_with("SELECT name FROM users") {
            let rows = match captured.0.first() {
                Some(Value::Integer(id)) => self
                    .users
                    .get(id)
                    .map(|name| ValueRow(vec![Value::from(*name)]))
                    .into_iter()
                    .collect(),
                _ => Vec::new(),
            };
            return Ok(QueryRows {
                columns: vec![ColumnMeta::new("Name", SqlType::VarChar, "varchar")],
                rows,
            });
        }
        let columns = (0..captured.0.len())
            .map(|i| ColumnMeta::new(format!("p{}", i + 1), SqlType::BigInt, "int8"))
            .collect();
        Ok(QueryRows {
            columns,
            rows: vec![ValueRow(captured.0)],
        })
    }
}

fn users_options() -> LookupOptions {
    LookupOptions::new("users", "SELECT name FROM users WHERE id = :id", "user")
        .with_parameter("id", "[user_id]")
}

fn row(pairs: &[(&str, Value)]) -> Value {
    Value::Map(
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), v.clone()))
            .collect(),
    )
}

#[tokio::test]
async fn test_users_lookup_writes_rows() {
    let mut fetcher = Fetcher::connect(TablePool::new()).await.unwrap();
    fetcher.add_lookup(&users_options()).unwrap();
    let mut record = MemoryRecord::new().with("user_id", 1_i64);

    let failures = fetcher.fetch_and_update("users", &mut record).await.unwrap();

    assert!(failures.is_successful());
    assert_eq!(
        record.get("user"),
        Some(Value::Array(vec![row(&[("name", Value::from("Ada"))])]))
    );
    assert_eq!(
        fetcher.pool().statements(),
        [(
            "SELECT name FROM users WHERE id = $1".to_owned(),
            vec![Value::Integer(1)]
        )]
    );
}

#[tokio::test]
async fn test_no_match_writes_empty_array() {
    let mut fetcher = Fetcher::connect(TablePool::new()).await.unwrap();
    fetcher.add_lookup(&users_options()).unwrap();
    let mut record = MemoryRecord::new().with("user_id", 99_i64);

    let failures = fetcher.fetch_and_update("users", &mut record).await.unwrap();

    assert!(failures.is_successful());
    assert_eq!(record.get("user"), Some(Value::Array(vec![])));
}

#[tokio::test]
async fn test_parameters_bind_in_statement_order() {
    let mut fetcher = Fetcher::connect(TablePool::new()).await.unwrap();
    fetcher
        .add_lookup(
            &LookupOptions::new("echo", "SELECT :b, :a, :c", "[echo][rows]")
                .with_parameter("a", "[fa]")
                .with_parameter("c", "[fc]")
                .with_parameter("b", "[fb]"),
        )
        .unwrap();
    let mut record = MemoryRecord::new()
        .with("fa", 10_i64)
        .with("fb", 20_i64)
        .with("fc", 30_i64);

    fetcher.fetch_and_update("echo", &mut record).await.unwrap();

    let (sql, bound) = fetcher.pool().statements().remove(0);
    assert_eq!(sql, "SELECT $1, $2, $3");
    assert_eq!(
        bound,
        [Value::Integer(20), Value::Integer(10), Value::Integer(30)]
    );
    assert_eq!(
        record.get("[echo][rows][0][p1]"),
        Some(Value::BigInteger(BigInt::from(20)))
    );
}

#[tokio::test]
async fn test_integer_survives_bind_and_read_back() {
    let mut fetcher = Fetcher::connect(TablePool::new()).await.unwrap();
    fetcher
        .add_lookup(&LookupOptions::new("echo", "SELECT :v", "out").with_parameter("v", "[v]"))
        .unwrap();
    let mut record = MemoryRecord::new().with("v", i64::MIN);

    fetcher.fetch_and_update("echo", &mut record).await.unwrap();

    assert_eq!(
        record.get("[out][0][p1]"),
        Some(Value::BigInteger(BigInt::from(i64::MIN)))
    );
}

#[tokio::test]
async fn test_big_integers_choose_long_or_decimal() {
    let mut fetcher = Fetcher::connect(TablePool::new()).await.unwrap();
    fetcher
        .add_lookup(
            &LookupOptions::new("echo", "SELECT :small, :big", "out")
                .with_parameter("small", "[small]")
                .with_parameter("big", "[big]"),
        )
        .unwrap();
    let big = BigInt::from(1_u8) << 70_usize;
    let mut record = MemoryRecord::new()
        .with("small", BigInt::from(1_i64 << 62))
        .with("big", big.clone());

    // Decimal results are not readable through BIGINT, so only binding is checked.
    let _ = fetcher.fetch_and_update("echo", &mut record).await;

    let (_, bound) = fetcher.pool().statements().remove(0);
    assert_eq!(
        bound,
        [
            Value::Integer(1_i64 << 62),
            Value::Decimal(BigDecimal::new(big, 0))
        ]
    );
}

#[tokio::test]
async fn test_enricher_defaults_when_parameter_missing() {
    let fetcher = Fetcher::connect(TablePool::new()).await.unwrap();
    let config: EnrichConfig = serde_json::from_value(serde_json::json!({
        "lookups": [{
            "id": "users",
            "query": "SELECT name FROM users WHERE id = :id",
            "parameters": {"id": "[user_id]"},
            "target": "user",
            "default_hash": {"name": "nobody"}
        }]
    }))
    .unwrap();
    let enricher = Enricher::new(fetcher, &config).unwrap();

    let mut found = MemoryRecord::new().with("user_id", 2_i64);
    let mut missing = MemoryRecord::new();
    assert_eq!(enricher.enhance(&mut found).await, [EnrichOutcome::Enriched]);
    assert_eq!(enricher.enhance(&mut missing).await, [EnrichOutcome::Defaulted]);

    assert_eq!(found.get("[user][0][name]"), Some(Value::from("Grace")));
    assert_eq!(missing.get("[user][name]"), Some(Value::from("nobody")));
    assert_eq!(enricher.fetcher().pool().statements().len(), 1);
    let spec: &LookupSpec = &config.lookups[0];
    assert!(spec.default_hash.is_some());
}

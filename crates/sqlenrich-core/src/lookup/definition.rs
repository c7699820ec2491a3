//! A compiled lookup and its execution against a pool.

use std::collections::BTreeMap;

use tracing::{debug, error, warn};

use crate::error::{causes, DriverError, FetchError, MAX_CAUSES};
use crate::lookup::binder::ParameterBinder;
use crate::lookup::failures::LookupFailures;
use crate::lookup::source::{LookupConnection, LookupPool};
use crate::lookup::statement::{CompiledStatement, PlaceholderStyle};
use crate::lookup::type_conv::{convert, ConvertResult};
use crate::record::Record;
use crate::value::Value;

/// One statement parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterSpec {
    /// Placeholder name, without the leading `:`.
    pub name: String,
    /// How the value is resolved from a record.
    pub binder: ParameterBinder,
}

/// A named lookup: one fixed statement, its parameters and a target field.
///
/// Immutable once built. Parameters are held in bind order, which is the
/// order their placeholders first appear in the statement.
#[derive(Debug, Clone)]
pub struct LookupDefinition {
    id: String,
    raw_statement: String,
    parameters: Vec<ParameterSpec>,
    compiled: CompiledStatement,
    target: String,
}

impl LookupDefinition {
    /// Compile a lookup.
    ///
    /// `parameters` maps placeholder names to field paths or `%{field}`
    /// templates. Names that never occur in `statement` are ignored.
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        statement: impl Into<String>,
        parameters: &BTreeMap<String, String>,
        target: impl Into<String>,
        style: PlaceholderStyle,
    ) -> Self {
        let id = id.into();
        let raw_statement = statement.into();
        let compiled = CompiledStatement::compile(
            &raw_statement,
            parameters.keys().map(String::as_str),
            style,
        );
        for name in parameters.keys() {
            if !compiled.parameter_order().contains(name) {
                warn!(lookup_id = %id, parameter = %name, "parameter does not appear in the statement");
            }
        }
        let parameters = compiled
            .parameter_order()
            .iter()
            .map(|name| ParameterSpec {
                name: name.clone(),
                binder: ParameterBinder::from_template(parameters[name].clone()),
            })
            .collect();
        Self {
            id,
            raw_statement,
            parameters,
            compiled,
            target: target.into(),
        }
    }

    /// Lookup id.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Statement as configured, with `:name` placeholders.
    #[must_use]
    pub fn raw_statement(&self) -> &str {
        &self.raw_statement
    }

    /// Statement with positional markers.
    #[must_use]
    pub fn compiled_statement(&self) -> &str {
        self.compiled.sql()
    }

    /// Parameters in bind order.
    #[must_use]
    pub fn parameters(&self) -> &[ParameterSpec] {
        &self.parameters
    }

    /// Field the result rows are written to.
    #[must_use]
    pub fn target(&self) -> &str {
        &self.target
    }

    /// Run the lookup for `record` and write the rows to the target field.
    ///
    /// Parameters are resolved first; if any fails, it is recorded in
    /// `failures` and the call returns without touching the database or
    /// the record. Columns whose type cannot be converted are recorded and
    /// left out of their row; rows left empty are dropped. The target is
    /// set to an array of row maps keyed by lower-cased column label.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError`] if the database reported an error. The
    /// detail is logged here and not returned.
    pub async fn fetch_and_update<P, R>(
        &self,
        pool: &P,
        record: &mut R,
        failures: &mut LookupFailures,
    ) -> Result<(), FetchError>
    where
        P: LookupPool,
        R: Record + ?Sized,
    {
        let invalid_before = failures.invalid_parameters().len();
        let mut values = Vec::with_capacity(self.parameters.len());
        for spec in &self.parameters {
            let value = spec.binder.fetch(record, failures);
            if failures.invalid_parameters().len() > invalid_before {
                return Ok(());
            }
            values.push(value);
        }

        match self.execute(pool, &values, failures).await {
            Ok(rows) => {
                debug!(
                    lookup_id = %self.id,
                    parameters = values.len(),
                    rows = rows.len(),
                    "lookup executed"
                );
                record.set(&self.target, Value::Array(rows));
                Ok(())
            }
            Err(e) => {
                log_driver_error(&self.id, pool.source_name(), &e);
                Err(FetchError::new(self.id.clone()))
            }
        }
    }

    async fn execute<P: LookupPool>(
        &self,
        pool: &P,
        values: &[Value],
        failures: &mut LookupFailures,
    ) -> Result<Vec<Value>, DriverError> {
        let mut conn = pool.acquire().await?;
        let result = conn.query(self.compiled.sql(), values).await?;

        let mut rows = Vec::with_capacity(result.rows.len());
        for row in &result.rows {
            let mut fields = BTreeMap::new();
            for (index, column) in result.columns.iter().enumerate() {
                match convert(column, index, row)? {
                    ConvertResult::Success { field, value } => {
                        let field = field.to_lowercase();
                        failures.push_column(&field);
                        fields.insert(field, value);
                    }
                    ConvertResult::Failure(message) => failures.push_invalid_column(message),
                }
            }
            if !fields.is_empty() {
                rows.push(Value::Map(fields));
            }
        }
        Ok(rows)
    }
}

fn log_driver_error(lookup_id: &str, source: &str, err: &DriverError) {
    error!(
        lookup_id,
        source,
        error = %err,
        causes = ?causes(err, MAX_CAUSES),
        "lookup failed with a database error"
    );
}

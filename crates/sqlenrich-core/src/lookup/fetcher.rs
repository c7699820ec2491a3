//! Lookup registry sharing one connection pool.

use std::collections::HashMap;

use tracing::info;

use crate::config::LookupOptions;
use crate::error::{ConfigError, FetchError, MAX_CAUSES};
use crate::lookup::definition::LookupDefinition;
use crate::lookup::failures::LookupFailures;
use crate::lookup::source::LookupPool;
use crate::record::Record;

/// Named lookups over one pool.
///
/// Lookups are registered during setup (`&mut self`) and executed
/// concurrently afterwards (`&self`); share a configured fetcher with
/// `Arc` to use it from several workers.
pub struct Fetcher<P> {
    pool: P,
    lookups: HashMap<String, LookupDefinition>,
    check_columns: bool,
}

impl<P: LookupPool> Fetcher<P> {
    /// Wrap `pool` after confirming the database is reachable.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Connection`] if the validation probe fails.
    pub async fn connect(pool: P) -> Result<Self, ConfigError> {
        pool.health_check()
            .await
            .map_err(|e| ConfigError::Connection(e.detail(MAX_CAUSES)))?;
        info!(source = pool.source_name(), "lookup database connected");
        Ok(Self {
            pool,
            lookups: HashMap::new(),
            check_columns: false,
        })
    }

    /// Record converted column names in every returned [`LookupFailures`].
    pub fn set_column_check(&mut self, enabled: bool) {
        self.check_columns = enabled;
    }

    /// Compile and register a lookup.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingOption`] if `id`, `query`,
    /// `parameters` or `target` is absent, and
    /// [`ConfigError::DuplicateLookup`] if the id is already registered.
    pub fn add_lookup(&mut self, options: &LookupOptions) -> Result<(), ConfigError> {
        let id = required(options.id.as_ref(), "id")?;
        let query = required(options.query.as_ref(), "query")?;
        let parameters = required(options.parameters.as_ref(), "parameters")?;
        let target = required(options.target.as_ref(), "target")?;
        if self.lookups.contains_key(id) {
            return Err(ConfigError::DuplicateLookup(id.clone()));
        }

        let definition = LookupDefinition::new(
            id.clone(),
            query.clone(),
            parameters,
            target.clone(),
            self.pool.placeholder_style(),
        );
        info!(
            lookup_id = %id,
            parameters = definition.parameters().len(),
            target = %target,
            "lookup registered"
        );
        self.lookups.insert(id.clone(), definition);
        Ok(())
    }

    /// Run lookup `id` for `record`.
    ///
    /// An unknown id is reported through
    /// [`LookupFailures::lookup_id_invalid`] without touching the database.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError`] if the database reported an error; the
    /// detail has already been logged.
    pub async fn fetch_and_update<R: Record + ?Sized>(
        &self,
        id: &str,
        record: &mut R,
    ) -> Result<LookupFailures, FetchError> {
        let mut failures = if self.check_columns {
            LookupFailures::with_column_check()
        } else {
            LookupFailures::new()
        };
        let Some(lookup) = self.lookups.get(id) else {
            failures.mark_invalid_lookup_id();
            return Ok(failures);
        };
        lookup
            .fetch_and_update(&self.pool, record, &mut failures)
            .await?;
        Ok(failures)
    }

    /// Close the pool.
    pub fn close(&self) {
        self.pool.close();
        info!(source = self.pool.source_name(), "lookup pool closed");
    }

    /// The registered lookup `id`, if any.
    #[must_use]
    pub fn lookup(&self, id: &str) -> Option<&LookupDefinition> {
        self.lookups.get(id)
    }

    /// Number of registered lookups.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lookups.len()
    }

    /// Whether no lookup is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lookups.is_empty()
    }

    /// The underlying pool.
    #[must_use]
    pub fn pool(&self) -> &P {
        &self.pool
    }
}

fn required<'a, T>(value: Option<&'a T>, key: &str) -> Result<&'a T, ConfigError> {
    value.ok_or_else(|| ConfigError::MissingOption(key.to_owned()))
}

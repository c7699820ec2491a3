//! Record enrichment.
//!
//! An [`Enricher`] owns a [`Fetcher`] and applies every configured lookup
//! to a record in order. Failures are reflected on the record itself:
//! failure tags are added and, when the lookup has a default payload, the
//! default is written to the target and the default-use tags are added.
//!
//! | Outcome of the lookup call | Tag failure | Apply default |
//! |---|---|---|
//! | database error | yes | yes |
//! | unknown lookup id | yes | yes |
//! | unresolvable parameter | yes | yes |
//! | unconvertible column | yes | no (rows already written) |

use tracing::{error, warn};

use crate::config::EnrichConfig;
use crate::error::ConfigError;
use crate::lookup::fetcher::Fetcher;
use crate::lookup::source::LookupPool;
use crate::record::Record;
use crate::value::Value;

/// What happened to one lookup during [`Enricher::enhance`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnrichOutcome {
    /// The lookup ran cleanly and its rows were written.
    Enriched,
    /// The lookup failed and its default payload was written.
    Defaulted,
    /// The lookup failed and no default was written.
    Failed,
}

#[derive(Debug)]
struct EnrichLookup {
    id: String,
    target: String,
    default: Option<Value>,
    tag_on_failure: Vec<String>,
    tag_on_default_use: Vec<String>,
}

impl EnrichLookup {
    fn tag_failure<R: Record + ?Sized>(&self, record: &mut R) {
        for tag in &self.tag_on_failure {
            record.tag(tag);
        }
    }

    fn apply_default<R: Record + ?Sized>(&self, record: &mut R) -> EnrichOutcome {
        let Some(default) = &self.default else {
            return EnrichOutcome::Failed;
        };
        record.set(&self.target, default.clone());
        for tag in &self.tag_on_default_use {
            record.tag(tag);
        }
        EnrichOutcome::Defaulted
    }
}

/// Applies a list of lookups to records.
pub struct Enricher<P> {
    fetcher: Fetcher<P>,
    lookups: Vec<EnrichLookup>,
}

impl<P: LookupPool> Enricher<P> {
    /// Validate `config` and register its lookups with `fetcher`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] if any lookup spec is invalid,
    /// or the registration error of the first lookup that fails to register.
    pub fn new(mut fetcher: Fetcher<P>, config: &EnrichConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        fetcher.set_column_check(config.check_columns);

        let mut lookups = Vec::with_capacity(config.lookups.len());
        for (position, spec) in config.lookups.iter().enumerate() {
            let options = spec.to_options(position);
            fetcher.add_lookup(&options)?;
            lookups.push(EnrichLookup {
                id: options.id.unwrap_or_default(),
                target: options.target.unwrap_or_default(),
                default: spec
                    .default_hash
                    .as_ref()
                    .map(|map| Value::from_json(&serde_json::Value::Object(map.clone()))),
                tag_on_failure: spec
                    .tag_on_failure
                    .clone()
                    .unwrap_or_else(|| config.tag_on_failure.clone()),
                tag_on_default_use: spec
                    .tag_on_default_use
                    .clone()
                    .unwrap_or_else(|| config.tag_on_default_use.clone()),
            });
        }
        Ok(Self { fetcher, lookups })
    }

    /// Run every lookup against `record`, in configuration order.
    pub async fn enhance<R: Record + ?Sized>(&self, record: &mut R) -> Vec<EnrichOutcome> {
        let mut outcomes = Vec::with_capacity(self.lookups.len());
        for lookup in &self.lookups {
            outcomes.push(self.enhance_one(lookup, record).await);
        }
        outcomes
    }

    async fn enhance_one<R: Record + ?Sized>(
        &self,
        lookup: &EnrichLookup,
        record: &mut R,
    ) -> EnrichOutcome {
        let Ok(failures) = self.fetcher.fetch_and_update(&lookup.id, record).await else {
            lookup.tag_failure(record);
            return lookup.apply_default(record);
        };

        if failures.lookup_id_invalid() {
            error!(lookup_id = %lookup.id, "lookup is not registered with the fetcher");
            lookup.tag_failure(record);
            return lookup.apply_default(record);
        }
        if failures.has_invalid_parameters() {
            warn!(
                lookup_id = %lookup.id,
                parameters = ?failures.invalid_parameters(),
                "statement parameters could not be resolved; the value may be missing, null, an array or a map"
            );
            lookup.tag_failure(record);
            return lookup.apply_default(record);
        }
        if failures.has_invalid_columns() {
            warn!(
                lookup_id = %lookup.id,
                columns = ?failures.invalid_columns(),
                "statement returned column types that cannot be stored in a record"
            );
            lookup.tag_failure(record);
            return EnrichOutcome::Failed;
        }
        EnrichOutcome::Enriched
    }

    /// Ids of the configured lookups, in order.
    pub fn lookup_ids(&self) -> impl Iterator<Item = &str> {
        self.lookups.iter().map(|l| l.id.as_str())
    }

    /// The underlying fetcher.
    #[must_use]
    pub fn fetcher(&self) -> &Fetcher<P> {
        &self.fetcher
    }

    /// Close the fetcher's pool.
    pub fn close(&self) {
        self.fetcher.close();
    }
}

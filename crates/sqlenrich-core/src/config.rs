//! Lookup configuration.
//!
//! [`LookupOptions`] is what the [`Fetcher`](crate::Fetcher) needs to
//! register a lookup. [`LookupSpec`] and [`EnrichConfig`] add the
//! enrichment behaviour on top (default payloads and tags) and are what a
//! host deserializes from its configuration.

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::error::ConfigError;

/// Options for registering one lookup with a [`Fetcher`](crate::Fetcher).
///
/// All four options are required; they are optional here so that a
/// missing one is reported by name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LookupOptions {
    /// Unique lookup id.
    pub id: Option<String>,
    /// Statement with `:name` placeholders.
    pub query: Option<String>,
    /// Placeholder name to field path or `%{field}` template.
    pub parameters: Option<BTreeMap<String, String>>,
    /// Field the rows are written to.
    pub target: Option<String>,
}

impl LookupOptions {
    /// Options with no parameters.
    #[must_use]
    pub fn new(id: impl Into<String>, query: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            query: Some(query.into()),
            parameters: Some(BTreeMap::new()),
            target: Some(target.into()),
        }
    }

    /// Add a parameter binding.
    #[must_use]
    pub fn with_parameter(mut self, name: impl Into<String>, template: impl Into<String>) -> Self {
        self.parameters
            .get_or_insert_with(BTreeMap::new)
            .insert(name.into(), template.into());
        self
    }
}

/// One lookup as configured for enrichment.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct LookupSpec {
    /// Lookup id; defaults to `lookup-<n>` (1-based position).
    pub id: Option<String>,
    /// Statement with `:name` placeholders.
    pub query: Option<String>,
    /// Placeholder name to field path or `%{field}` template.
    pub parameters: Option<BTreeMap<String, String>>,
    /// Target field; defaults to the id.
    pub target: Option<String>,
    /// Written to the target when the lookup cannot run.
    pub default_hash: Option<serde_json::Map<String, serde_json::Value>>,
    /// Tags added on failure; overrides [`EnrichConfig::tag_on_failure`].
    pub tag_on_failure: Option<Vec<String>>,
    /// Tags added when the default is used; overrides
    /// [`EnrichConfig::tag_on_default_use`].
    pub tag_on_default_use: Option<Vec<String>>,
}

impl LookupSpec {
    /// Id of the spec at 0-based `position` in the lookup list.
    #[must_use]
    pub fn resolved_id(&self, position: usize) -> String {
        self.id
            .clone()
            .unwrap_or_else(|| format!("lookup-{}", position + 1))
    }

    /// Option problems for this spec, or `None` if it is valid.
    #[must_use]
    pub fn validation_errors(&self, position: usize) -> Option<String> {
        let id = self.resolved_id(position);
        let mut errors = Vec::new();
        if self.query.as_deref().map_or(true, str::is_empty) {
            errors.push(format!("The options for '{id}' must include a 'query' string"));
        }
        if errors.is_empty() {
            None
        } else {
            Some(errors.join(", "))
        }
    }

    /// Registration options, with id and target defaults applied.
    #[must_use]
    pub fn to_options(&self, position: usize) -> LookupOptions {
        let id = self.resolved_id(position);
        LookupOptions {
            target: Some(self.target.clone().unwrap_or_else(|| id.clone())),
            id: Some(id),
            query: self.query.clone(),
            parameters: Some(self.parameters.clone().unwrap_or_default()),
        }
    }
}

fn default_tag_on_failure() -> Vec<String> {
    vec!["_lookupfailure".to_owned()]
}

fn default_tag_on_default_use() -> Vec<String> {
    vec!["_lookupdefaultsused".to_owned()]
}

/// Enrichment configuration: the lookups plus global tag defaults.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct EnrichConfig {
    /// Lookups, applied in order.
    #[serde(default)]
    pub lookups: Vec<LookupSpec>,

    /// Tags added on failure unless a lookup sets its own.
    #[serde(default = "default_tag_on_failure")]
    pub tag_on_failure: Vec<String>,

    /// Tags added when a default is used unless a lookup sets its own.
    #[serde(default = "default_tag_on_default_use")]
    pub tag_on_default_use: Vec<String>,

    /// Record every converted column name in the returned failures.
    #[serde(default)]
    pub check_columns: bool,
}

impl Default for EnrichConfig {
    fn default() -> Self {
        Self {
            lookups: Vec::new(),
            tag_on_failure: default_tag_on_failure(),
            tag_on_default_use: default_tag_on_default_use(),
            check_columns: false,
        }
    }
}

impl EnrichConfig {
    /// Check every lookup spec.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] listing every problem, joined
    /// with `"; "`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let errors: Vec<String> = self
            .lookups
            .iter()
            .enumerate()
            .filter_map(|(i, spec)| spec.validation_errors(i))
            .collect();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors.join("; ")))
        }
    }
}

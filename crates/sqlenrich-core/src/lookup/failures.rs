//! Per-call lookup failure accumulator.

use std::collections::HashSet;

/// Why a lookup call did not fully succeed.
///
/// A fresh value is created for every call and handed back to the caller
/// once the call completes; only the engine mutates it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LookupFailures {
    invalid_parameters: Vec<String>,
    invalid_columns: HashSet<String>,
    lookup_id_invalid: bool,
    checking_columns: bool,
    all_columns: HashSet<String>,
}

impl LookupFailures {
    /// Empty failures.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty failures that also record every converted column name.
    #[must_use]
    pub fn with_column_check() -> Self {
        Self {
            checking_columns: true,
            ..Self::default()
        }
    }

    pub(crate) fn push_invalid_parameter(&mut self, template: impl Into<String>) {
        self.invalid_parameters.push(template.into());
    }

    pub(crate) fn push_invalid_column(&mut self, message: impl Into<String>) {
        self.invalid_columns.insert(message.into());
    }

    pub(crate) fn push_column(&mut self, name: &str) {
        if self.checking_columns && !self.all_columns.contains(name) {
            self.all_columns.insert(name.to_owned());
        }
    }

    pub(crate) fn mark_invalid_lookup_id(&mut self) {
        self.lookup_id_invalid = true;
    }

    /// `true` when the id was valid and no parameter or column failed.
    #[must_use]
    pub fn is_successful(&self) -> bool {
        !self.lookup_id_invalid && !self.has_invalid_columns() && !self.has_invalid_parameters()
    }

    /// Whether any column type could not be converted.
    #[must_use]
    pub fn has_invalid_columns(&self) -> bool {
        !self.invalid_columns.is_empty()
    }

    /// Whether any parameter could not be resolved.
    #[must_use]
    pub fn has_invalid_parameters(&self) -> bool {
        !self.invalid_parameters.is_empty()
    }

    /// Whether the requested lookup id was unknown.
    #[must_use]
    pub fn lookup_id_invalid(&self) -> bool {
        self.lookup_id_invalid
    }

    /// Raw templates of the parameters that failed, in bind order.
    #[must_use]
    pub fn invalid_parameters(&self) -> &[String] {
        &self.invalid_parameters
    }

    /// Distinct diagnostics for unconvertible columns.
    #[must_use]
    pub fn invalid_columns(&self) -> &HashSet<String> {
        &self.invalid_columns
    }

    /// Whether converted column names are being recorded.
    #[must_use]
    pub fn checking_columns(&self) -> bool {
        self.checking_columns
    }

    /// Converted column names; empty unless column checking is on.
    #[must_use]
    pub fn all_columns(&self) -> &HashSet<String> {
        &self.all_columns
    }
}

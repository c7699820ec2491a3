//! Record interface consumed by the lookup engine.
//!
//! The engine only needs to read a field, write a field and interpolate a
//! `%{field}` template. [`MemoryRecord`] implements this over a plain map
//! so lookups can run without a host event type.
//!
//! ## Field paths
//!
//! - `name` addresses a top-level field.
//! - `[a][b]` addresses nested map entries (or array indexes).

use std::collections::BTreeMap;

use crate::error::FormatError;
use crate::value::Value;

/// Field that [`Record::tag`] appends to.
pub const TAGS_FIELD: &str = "tags";

/// A record that lookups read parameters from and write results into.
pub trait Record {
    /// Value at `path`, if present.
    fn get(&self, path: &str) -> Option<Value>;

    /// Write `value` at `path`, creating intermediate maps as needed.
    fn set(&mut self, path: &str, value: Value);

    /// Interpolate `%{path}` references in `template`.
    ///
    /// References to absent fields are left in the output verbatim.
    ///
    /// # Errors
    ///
    /// Returns [`FormatError`] if the template is malformed.
    fn format(&self, template: &str) -> Result<String, FormatError>;

    /// Append `tag` to the record's tag list unless it is already there.
    fn tag(&mut self, tag: &str) {
        let mut tags = match self.get(TAGS_FIELD) {
            Some(Value::Array(items)) => items,
            Some(Value::Null) | None => Vec::new(),
            Some(other) => vec![other],
        };
        if tags.iter().any(|t| t.as_str() == Some(tag)) {
            return;
        }
        tags.push(Value::from(tag));
        self.set(TAGS_FIELD, Value::Array(tags));
    }
}

/// Split a field path into its segments.
///
/// Returns `None` for an empty path or unbalanced brackets.
pub(crate) fn parse_path(path: &str) -> Option<Vec<&str>> {
    if path.is_empty() {
        return None;
    }
    if !path.starts_with('[') {
        return Some(vec![path]);
    }
    let mut segments = Vec::new();
    let mut rest = path;
    while !rest.is_empty() {
        let inner = rest.strip_prefix('[')?;
        let end = inner.find(']')?;
        let segment = &inner[..end];
        if segment.is_empty() || segment.contains('[') {
            return None;
        }
        segments.push(segment);
        rest = &inner[end + 1..];
    }
    Some(segments)
}

/// In-memory [`Record`] backed by a sorted map.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MemoryRecord {
    fields: BTreeMap<String, Value>,
}

impl MemoryRecord {
    /// An empty record.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style field insert at a top-level key.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    /// Build a record from a JSON object; non-objects yield `None`.
    #[must_use]
    pub fn from_json(json: &serde_json::Value) -> Option<Self> {
        match Value::from_json(json) {
            Value::Map(fields) => Some(Self { fields }),
            _ => None,
        }
    }

    /// The record as a JSON object.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        Value::Map(self.fields.clone()).to_json()
    }

    /// Top-level fields.
    #[must_use]
    pub fn fields(&self) -> &BTreeMap<String, Value> {
        &self.fields
    }

    fn lookup(&self, segments: &[&str]) -> Option<&Value> {
        let (first, rest) = segments.split_first()?;
        let mut current = self.fields.get(*first)?;
        for segment in rest {
            current = match current {
                Value::Map(map) => map.get(*segment)?,
                Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
                _ => return None,
            };
        }
        Some(current)
    }
}

impl From<BTreeMap<String, Value>> for MemoryRecord {
    fn from(fields: BTreeMap<String, Value>) -> Self {
        Self { fields }
    }
}

impl Record for MemoryRecord {
    fn get(&self, path: &str) -> Option<Value> {
        let segments = parse_path(path)?;
        self.lookup(&segments).cloned()
    }

    fn set(&mut self, path: &str, value: Value) {
        let segments = parse_path(path).unwrap_or_else(|| vec![path]);
        let Some((last, parents)) = segments.split_last() else {
            return;
        };
        let mut current = &mut self.fields;
        for segment in parents {
            let slot = current
                .entry((*segment).to_owned())
                .or_insert_with(|| Value::Map(BTreeMap::new()));
            if !matches!(slot, Value::Map(_)) {
                *slot = Value::Map(BTreeMap::new());
            }
            let Value::Map(next) = slot else {
                return;
            };
            current = next;
        }
        current.insert((*last).to_owned(), value);
    }

    fn format(&self, template: &str) -> Result<String, FormatError> {
        let mut out = String::with_capacity(template.len());
        let mut rest = template;
        let mut offset = 0;
        while let Some(start) = rest.find("%{") {
            out.push_str(&rest[..start]);
            let after = &rest[start + 2..];
            let Some(end) = after.find('}') else {
                return Err(FormatError::Unterminated(offset + start));
            };
            let reference = &after[..end];
            let segments = parse_path(reference)
                .ok_or_else(|| FormatError::InvalidReference(reference.to_owned()))?;
            match self.lookup(&segments) {
                Some(value) if !value.is_null() => out.push_str(&value.render()),
                _ => out.push_str(&rest[start..start + 2 + end + 1]),
            }
            let consumed = start + 2 + end + 1;
            rest = &rest[consumed..];
            offset += consumed;
        }
        out.push_str(rest);
        Ok(out)
    }
}

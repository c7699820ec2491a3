//! Parameter value resolution from a record.

use crate::lookup::failures::LookupFailures;
use crate::record::Record;
use crate::value::Value;

/// How a placeholder's value is obtained from a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParameterBinder {
    /// Read the field at this path.
    DirectReference(String),
    /// Interpolate this `%{field}` template.
    FormattedTemplate(String),
}

impl ParameterBinder {
    /// Choose a binder for `template`.
    ///
    /// A template containing `%{` followed later by `}` is interpolated;
    /// anything else is a field path.
    #[must_use]
    pub fn from_template(template: impl Into<String>) -> Self {
        let template = template.into();
        let interpolated = template
            .find("%{")
            .is_some_and(|start| template[start + 2..].contains('}'));
        if interpolated {
            Self::FormattedTemplate(template)
        } else {
            Self::DirectReference(template)
        }
    }

    /// The raw template or path.
    #[must_use]
    pub fn template(&self) -> &str {
        match self {
            Self::DirectReference(t) | Self::FormattedTemplate(t) => t,
        }
    }

    /// Resolve the value from `record`.
    ///
    /// On failure the raw template is pushed onto `failures` and returned
    /// as a string value; callers check `failures` before using it.
    pub fn fetch<R: Record + ?Sized>(&self, record: &R, failures: &mut LookupFailures) -> Value {
        if let Some(value) = self.resolve(record) {
            return value;
        }
        failures.push_invalid_parameter(self.template());
        Value::String(self.template().to_owned())
    }

    fn resolve<R: Record + ?Sized>(&self, record: &R) -> Option<Value> {
        match self {
            Self::DirectReference(path) => record
                .get(path)
                .filter(|value| !value.is_null() && !value.is_composite()),
            Self::FormattedTemplate(template) => match record.format(template) {
                Ok(out) if out != *template => Some(Value::String(out)),
                _ => None,
            },
        }
    }
}

//! Placeholder compilation.
//!
//! Lookup statements name their parameters with `:name` placeholders.
//! Compilation finds the first occurrence of each configured name,
//! orders the names by where they appear and rewrites those occurrences
//! to the driver's positional markers. The resulting order is the bind
//! order, independent of the order the names were configured in.
//!
//! Only the first occurrence of a name is rewritten; a name used twice
//! must be configured under two names. `::type` casts are never treated
//! as placeholders.

use std::fmt::Write;

/// Positional marker syntax of a driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaceholderStyle {
    /// `?` for every parameter.
    #[default]
    QuestionMark,
    /// `$1`, `$2`, ... (`PostgreSQL`).
    Numbered,
}

/// A statement with positional markers and its bind order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledStatement {
    sql: String,
    parameter_order: Vec<String>,
}

impl CompiledStatement {
    /// Compile `raw` for the placeholder `names`.
    ///
    /// Names that do not occur in `raw` are left out of the bind order.
    /// Placeholders that are not in `names` are left untouched.
    #[must_use]
    pub fn compile<'a, I>(raw: &str, names: I, style: PlaceholderStyle) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut names: Vec<&str> = names.into_iter().filter(|n| !n.is_empty()).collect();
        names.sort_unstable_by(|a, b| b.len().cmp(&a.len()).then(a.cmp(b)));
        names.dedup();

        // Longer names claim their span first so `:a.b` is never also
        // matched as `:a` followed by `.b`.
        let mut found: Vec<(usize, &str)> = Vec::new();
        for name in names {
            if let Some(pos) = find_placeholder(raw, name, &found) {
                found.push((pos, name));
            }
        }
        found.sort_by_key(|(pos, _)| *pos);

        let mut sql = String::with_capacity(raw.len());
        let mut cursor = 0;
        for (i, (pos, name)) in found.iter().enumerate() {
            sql.push_str(&raw[cursor..*pos]);
            match style {
                PlaceholderStyle::QuestionMark => sql.push('?'),
                PlaceholderStyle::Numbered => {
                    let _ = write!(sql, "${}", i + 1);
                }
            }
            cursor = pos + 1 + name.len();
        }
        sql.push_str(&raw[cursor..]);

        Self {
            sql,
            parameter_order: found.into_iter().map(|(_, n)| n.to_owned()).collect(),
        }
    }

    /// The rewritten SQL.
    #[must_use]
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// Placeholder names in bind order.
    #[must_use]
    pub fn parameter_order(&self) -> &[String] {
        &self.parameter_order
    }

    /// Number of positional markers.
    #[must_use]
    pub fn marker_count(&self) -> usize {
        self.parameter_order.len()
    }
}

fn is_ident_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

/// Byte offset of the first `:name` in `sql` that is a whole placeholder
/// and does not overlap a placeholder already in `claimed`.
fn find_placeholder(sql: &str, name: &str, claimed: &[(usize, &str)]) -> Option<usize> {
    let bytes = sql.as_bytes();
    let needle = format!(":{name}");
    let mut from = 0;
    while let Some(rel) = sql[from..].find(&needle) {
        let pos = from + rel;
        let end = pos + needle.len();
        let cast = pos > 0 && bytes[pos - 1] == b':';
        let truncated = end < bytes.len() && is_ident_byte(bytes[end]);
        let overlaps = claimed
            .iter()
            .any(|&(start, other)| pos < start + 1 + other.len() && start < end);
        if !cast && !truncated && !overlaps {
            return Some(pos);
        }
        from = pos + 1;
    }
    None
}

//! Decoded cell values.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A decoded cell value.
///
/// Every remote property decodes into one of these scalar forms. Relation
/// and rollup cells hold the referenced record id as [`CellValue::Text`].
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum CellValue {
    /// Absent or empty value.
    #[default]
    Null,
    /// Text value (titles, rich text, select names, ids, emails, ...).
    Text(String),
    /// Numeric value.
    Number(f64),
    /// Date value, kept as the remote's ISO-8601 start string.
    Date(String),
}

impl CellValue {
    /// Check if this value is null.
    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }

    /// Get this value as a string slice, if it is text or a date.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            CellValue::Text(s) | CellValue::Date(s) => Some(s),
            _ => None,
        }
    }

    /// Get this value as a number, if it is one.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            CellValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Returns true if the two cells hold the same value.
    ///
    /// Dates compare as their ISO-8601 strings, so a date cell matches text
    /// with the same content.
    pub fn same_value(&self, other: &CellValue) -> bool {
        match (self, other) {
            (CellValue::Text(a) | CellValue::Date(a), CellValue::Text(b) | CellValue::Date(b)) => {
                a == b
            }
            _ => self == other,
        }
    }

    /// Returns true if the two cells should be reported as a change.
    ///
    /// Null against null is never a difference; null against anything else is.
    pub fn differs_from(&self, other: &CellValue) -> bool {
        !self.same_value(other)
    }

    /// Short name of the variant, used in diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match self {
            CellValue::Null => "null",
            CellValue::Text(_) => "text",
            CellValue::Number(_) => "number",
            CellValue::Date(_) => "date",
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Null => f.write_str("None"),
            CellValue::Text(s) | CellValue::Date(s) => f.write_str(s),
            CellValue::Number(n) => write!(f, "{n}"),
        }
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::Text(s.to_string())
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        CellValue::Text(s)
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        CellValue::Number(n)
    }
}

impl From<i64> for CellValue {
    #[allow(clippy::cast_precision_loss)]
    fn from(n: i64) -> Self {
        CellValue::Number(n as f64)
    }
}

impl<T: Into<CellValue>> From<Option<T>> for CellValue {
    fn from(v: Option<T>) -> Self {
        v.map_or(CellValue::Null, Into::into)
    }
}

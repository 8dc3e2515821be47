//! Field kinds and their per-kind decode/encode rules.

use crate::error::{CodecError, CodecResult};
use crate::value::CellValue;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;

/// The kind of a remote column, derived from its type tag.
///
/// Each variant carries its own read and write rules. Tags without a codec
/// are kept as [`FieldKind::Unsupported`] so they can still be recorded in a
/// schema and reported.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FieldKind {
    /// Page title (list of text runs).
    Title,
    /// Rich text (list of text runs).
    RichText,
    /// Number.
    Number,
    /// Date with start/end/time zone.
    Date,
    /// Single select option.
    Select,
    /// Status option.
    Status,
    /// Auto-increment id with optional prefix.
    UniqueId,
    /// Reference to records in another table.
    Relation,
    /// Value aggregated through a relation.
    Rollup,
    /// Server-side formula.
    Formula,
    /// Email address.
    Email,
    /// Phone number.
    Phone,
    /// Any other tag.
    Unsupported(String),
}

impl FieldKind {
    /// Parse a remote type tag.
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "title" => FieldKind::Title,
            "rich_text" => FieldKind::RichText,
            "number" => FieldKind::Number,
            "date" => FieldKind::Date,
            "select" => FieldKind::Select,
            "status" => FieldKind::Status,
            "unique_id" => FieldKind::UniqueId,
            "relation" => FieldKind::Relation,
            "rollup" => FieldKind::Rollup,
            "formula" => FieldKind::Formula,
            "email" => FieldKind::Email,
            "phone_number" | "phone" => FieldKind::Phone,
            other => FieldKind::Unsupported(other.to_string()),
        }
    }

    /// The remote type tag for this kind.
    pub fn tag(&self) -> &str {
        match self {
            FieldKind::Title => "title",
            FieldKind::RichText => "rich_text",
            FieldKind::Number => "number",
            FieldKind::Date => "date",
            FieldKind::Select => "select",
            FieldKind::Status => "status",
            FieldKind::UniqueId => "unique_id",
            FieldKind::Relation => "relation",
            FieldKind::Rollup => "rollup",
            FieldKind::Formula => "formula",
            FieldKind::Email => "email",
            FieldKind::Phone => "phone_number",
            FieldKind::Unsupported(tag) => tag,
        }
    }

    /// Computed columns are derived remotely and never written back.
    pub fn is_computed(&self) -> bool {
        matches!(self, FieldKind::Formula | FieldKind::Rollup)
    }

    /// Returns true for relation columns.
    pub fn is_relation(&self) -> bool {
        matches!(self, FieldKind::Relation)
    }

    /// Returns true if values of this kind can be decoded from a raw payload.
    pub fn is_decodable(&self) -> bool {
        !matches!(self, FieldKind::Rollup | FieldKind::Unsupported(_))
    }

    /// Returns true if this kind has an encoder and is not computed.
    pub fn is_writable(&self) -> bool {
        matches!(
            self,
            FieldKind::Number | FieldKind::Date | FieldKind::RichText | FieldKind::Status
        )
    }

    /// Kinds the remote fills in for every new record.
    ///
    /// Rows where only these columns are populated are treated as empty.
    pub fn is_populated_by_default(&self) -> bool {
        matches!(self, FieldKind::UniqueId | FieldKind::Status)
    }

    /// Converts an edited value to this kind's variant where both share a
    /// string form. Text written to a date column becomes a date.
    pub fn coerce(&self, value: CellValue) -> CellValue {
        match (self, value) {
            (FieldKind::Date, CellValue::Text(start)) => CellValue::Date(start),
            (_, value) => value,
        }
    }

    /// Decode the raw payload stored under this kind's tag.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::DerivedValue`] for rollups,
    /// [`CodecError::UnsupportedType`] for unknown tags and
    /// [`CodecError::Malformed`] when the payload has the wrong shape.
    pub fn decode(&self, raw: &Value) -> CodecResult<CellValue> {
        match self {
            FieldKind::Title | FieldKind::RichText => self.decode_text_runs(raw),
            FieldKind::Number => match raw {
                Value::Null => Ok(CellValue::Null),
                // Zero reads back as null, the same as an unset number.
                Value::Number(n) => Ok(match n.as_f64() {
                    Some(v) if v != 0.0 => CellValue::Number(v),
                    _ => CellValue::Null,
                }),
                _ => Err(self.malformed("expected a number")),
            },
            FieldKind::Date => match raw {
                Value::Null => Ok(CellValue::Null),
                Value::Object(map) => match map.get("start") {
                    Some(Value::String(start)) => Ok(CellValue::Date(start.clone())),
                    Some(Value::Null) | None => Ok(CellValue::Null),
                    Some(_) => Err(self.malformed("start is not a string")),
                },
                _ => Err(self.malformed("expected an object")),
            },
            FieldKind::Select | FieldKind::Status => match raw {
                Value::Null => Ok(CellValue::Null),
                Value::Object(map) => Ok(map
                    .get("name")
                    .and_then(Value::as_str)
                    .map_or(CellValue::Null, |name| CellValue::Text(name.to_string()))),
                _ => Err(self.malformed("expected an option object")),
            },
            FieldKind::UniqueId => self.decode_unique_id(raw),
            FieldKind::Relation => match raw {
                Value::Null => Ok(CellValue::Null),
                Value::Array(items) => Ok(items
                    .first()
                    .and_then(|item| item.get("id"))
                    .and_then(Value::as_str)
                    .map_or(CellValue::Null, |id| CellValue::Text(id.to_string()))),
                _ => Err(self.malformed("expected a list of references")),
            },
            FieldKind::Email | FieldKind::Phone => match raw {
                Value::Null => Ok(CellValue::Null),
                Value::String(s) => Ok(CellValue::Text(s.clone())),
                _ => Err(self.malformed("expected a string")),
            },
            FieldKind::Formula => Ok(decode_formula(raw)),
            FieldKind::Rollup => Err(CodecError::DerivedValue),
            FieldKind::Unsupported(tag) => Err(CodecError::unsupported_type(tag.clone())),
        }
    }

    /// Encode a local value into the payload stored under this kind's tag.
    ///
    /// Computed kinds are rejected before any encoder lookup.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::ComputedField`] for formula and rollup columns,
    /// [`CodecError::UnsupportedType`] for kinds without an encoder and
    /// [`CodecError::TypeMismatch`] when the value has the wrong variant.
    pub fn encode(&self, value: &CellValue) -> CodecResult<Value> {
        if self.is_computed() {
            return Err(CodecError::computed_field(self.tag()));
        }
        match (self, value) {
            (FieldKind::Number, CellValue::Null) => Ok(Value::Null),
            (FieldKind::Number, CellValue::Number(n)) => serde_json::Number::from_f64(*n)
                .map(Value::Number)
                .ok_or_else(|| self.malformed("number is not finite")),
            (FieldKind::Date, CellValue::Null) => Ok(Value::Null),
            (FieldKind::Date, CellValue::Date(start) | CellValue::Text(start)) => {
                Ok(json!({ "start": start, "end": null, "time_zone": null }))
            }
            (FieldKind::RichText, CellValue::Null) => Ok(json!([])),
            (FieldKind::RichText, CellValue::Text(content)) => {
                Ok(json!([{ "text": { "content": content } }]))
            }
            (FieldKind::Status, CellValue::Null) => Ok(Value::Null),
            (FieldKind::Status, CellValue::Text(name)) => Ok(json!({ "name": name })),
            (kind, value) if kind.is_writable() => Err(CodecError::TypeMismatch {
                type_tag: kind.tag().to_string(),
                found: value.kind_name(),
            }),
            (kind, _) => Err(CodecError::unsupported_type(kind.tag())),
        }
    }

    fn decode_text_runs(&self, raw: &Value) -> CodecResult<CellValue> {
        let runs = match raw {
            Value::Null => return Ok(CellValue::Null),
            Value::Array(runs) => runs,
            _ => return Err(self.malformed("expected a list of text runs")),
        };
        let Some(first) = runs.first() else {
            return Ok(CellValue::Null);
        };
        first
            .pointer("/text/content")
            .or_else(|| first.get("plain_text"))
            .and_then(Value::as_str)
            .map(|s| CellValue::Text(s.to_string()))
            .ok_or_else(|| self.malformed("text run has no content"))
    }

    fn decode_unique_id(&self, raw: &Value) -> CodecResult<CellValue> {
        if raw.is_null() {
            return Ok(CellValue::Null);
        }
        let number = match raw.get("number") {
            Some(Value::Number(n)) => n.to_string(),
            Some(Value::Null) | None => return Ok(CellValue::Null),
            Some(_) => return Err(self.malformed("number is not numeric")),
        };
        let id = match raw.get("prefix").and_then(Value::as_str) {
            Some(prefix) if !prefix.is_empty() => format!("{prefix}{number}"),
            _ => number,
        };
        Ok(CellValue::Text(id))
    }

    fn malformed(&self, message: &str) -> CodecError {
        CodecError::malformed(self.tag(), message)
    }
}

/// Formulas embed their own result type; only numbers and strings are read.
fn decode_formula(raw: &Value) -> CellValue {
    let sub_type = raw.get("type").and_then(Value::as_str).unwrap_or("");
    match (sub_type, raw.get(sub_type)) {
        ("number", Some(Value::Number(n))) => n.as_f64().map_or(CellValue::Null, CellValue::Number),
        ("string", Some(Value::String(s))) => CellValue::Text(s.clone()),
        ("number" | "string", _) => CellValue::Null,
        (other, _) => {
            tracing::warn!(sub_type = other, "formula result type not supported, reading as null");
            CellValue::Null
        }
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl From<String> for FieldKind {
    fn from(tag: String) -> Self {
        FieldKind::from_tag(&tag)
    }
}

impl From<FieldKind> for String {
    fn from(kind: FieldKind) -> Self {
        kind.tag().to_string()
    }
}

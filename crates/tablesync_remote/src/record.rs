//! Wire types exchanged with the remote store.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;

static NULL: Value = Value::Null;

/// One typed property of a remote record.
///
/// On the wire this is `{"type": "<tag>", "<tag>": <raw>, ...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteProperty {
    /// The type tag.
    #[serde(rename = "type")]
    pub type_tag: String,
    /// All other fields, including the raw payload under the tag key.
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl RemoteProperty {
    /// Creates a property holding `raw` under `type_tag`.
    pub fn new(type_tag: impl Into<String>, raw: Value) -> Self {
        let type_tag = type_tag.into();
        let mut fields = Map::new();
        fields.insert(type_tag.clone(), raw);
        Self { type_tag, fields }
    }

    /// The raw payload stored under the type tag, or null.
    pub fn raw(&self) -> &Value {
        self.fields.get(&self.type_tag).unwrap_or(&NULL)
    }

    /// Replaces the raw payload.
    pub fn set_raw(&mut self, raw: Value) {
        self.fields.insert(self.type_tag.clone(), raw);
    }
}

/// One remote record (a page in a database).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteRecord {
    /// Immutable record identifier.
    pub id: String,
    /// Properties keyed by column name.
    #[serde(default)]
    pub properties: BTreeMap<String, RemoteProperty>,
}

impl RemoteRecord {
    /// Creates a record with no properties.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            properties: BTreeMap::new(),
        }
    }

    /// Adds a property.
    pub fn with_property(mut self, column: impl Into<String>, property: RemoteProperty) -> Self {
        self.properties.insert(column.into(), property);
        self
    }
}

/// One page of a database query.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct QueryPage {
    /// Records in this page.
    #[serde(default)]
    pub results: Vec<RemoteRecord>,
    /// Whether another page follows.
    #[serde(default)]
    pub has_more: bool,
    /// Opaque cursor for the next page.
    #[serde(default)]
    pub next_cursor: Option<String>,
}

/// A single-cell update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatchRequest {
    /// Record to update.
    pub record_id: String,
    /// Column to set.
    pub column: String,
    /// Type tag of the column.
    pub type_tag: String,
    /// Encoded value.
    pub value: Value,
}

impl PatchRequest {
    /// Creates a patch request.
    pub fn new(
        record_id: impl Into<String>,
        column: impl Into<String>,
        type_tag: impl Into<String>,
        value: Value,
    ) -> Self {
        Self {
            record_id: record_id.into(),
            column: column.into(),
            type_tag: type_tag.into(),
            value,
        }
    }

    /// The request body: `{"properties": {column: {tag: value}}}`.
    pub fn body(&self) -> Value {
        let mut property = Map::new();
        property.insert(self.type_tag.clone(), self.value.clone());
        let mut properties = Map::new();
        properties.insert(self.column.clone(), Value::Object(property));
        json!({ "properties": properties })
    }
}

/// Outcome of a single-cell update.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PatchResponse {
    /// Status code, if the remote answered at all.
    pub status: Option<u16>,
    /// Message from the response body, if any.
    pub message: Option<String>,
}

impl PatchResponse {
    /// A response with the given status and no message.
    pub fn with_status(status: u16) -> Self {
        Self {
            status: Some(status),
            message: None,
        }
    }

    /// A non-success response.
    pub fn error(status: u16, message: impl Into<String>) -> Self {
        Self {
            status: Some(status),
            message: Some(message.into()),
        }
    }

    /// Returns true for 2xx statuses.
    pub fn is_success(&self) -> bool {
        matches!(self.status, Some(200..=299))
    }
}

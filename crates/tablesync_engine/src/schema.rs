//! Column type discovery.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tablesync_codec::FieldKind;
use tablesync_remote::{RemoteProperty, RemoteRecord};

/// Records the kind of every column as records are ingested.
///
/// # Invariants
///
/// - A column's kind is fixed by its first observation
/// - Columns are listed in first-observation order
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SchemaTracker {
    order: Vec<String>,
    kinds: BTreeMap<String, FieldKind>,
}

impl SchemaTracker {
    /// Creates an empty schema.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `kind` for `column` unless the column is already known.
    ///
    /// Returns true if the column was newly registered.
    pub fn observe(&mut self, column: &str, kind: FieldKind) -> bool {
        match self.kinds.get(column) {
            Some(existing) => {
                if *existing != kind {
                    tracing::warn!(
                        column,
                        first = %existing,
                        seen = %kind,
                        "column changed type within a load, keeping first observation"
                    );
                }
                false
            }
            None => {
                self.order.push(column.to_string());
                self.kinds.insert(column.to_string(), kind);
                true
            }
        }
    }

    /// The kind of a column.
    pub fn kind_of(&self, column: &str) -> Option<&FieldKind> {
        self.kinds.get(column)
    }

    /// Columns of the given kind, in observation order.
    pub fn columns_of_kind(&self, kind: &FieldKind) -> Vec<&str> {
        self.columns()
            .filter(|(_, k)| *k == kind)
            .map(|(c, _)| c)
            .collect()
    }

    /// All columns with their kinds, in observation order.
    pub fn columns(&self) -> impl Iterator<Item = (&str, &FieldKind)> {
        self.order
            .iter()
            .filter_map(|c| self.kinds.get(c).map(|k| (c.as_str(), k)))
    }

    /// Number of known columns.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Returns true if no column has been observed.
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Properties of `record` in decode order: rollups last.
    ///
    /// Rollup values are read from already-decoded relation cells of the
    /// same record, so everything else must come first.
    pub fn decode_order(record: &RemoteRecord) -> Vec<(&str, &RemoteProperty)> {
        let mut properties: Vec<(&str, &RemoteProperty)> = record
            .properties
            .iter()
            .map(|(name, property)| (name.as_str(), property))
            .collect();
        properties.sort_by_key(|(_, p)| FieldKind::from_tag(&p.type_tag) == FieldKind::Rollup);
        properties
    }
}

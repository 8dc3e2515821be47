//! In-memory tabular frames keyed by record id.

use crate::error::{SyncError, SyncResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tablesync_codec::CellValue;

/// Separates a relation name from a foreign column name.
pub const NAMESPACE_SEPARATOR: char = '|';

/// Name of the foreign key column added for every joined relation.
pub const RECORD_ID_COLUMN: &str = "record_id";

/// Builds `relation|column`.
pub fn namespaced(relation: &str, column: &str) -> String {
    format!("{relation}{NAMESPACE_SEPARATOR}{column}")
}

/// Splits `relation|column` at the first separator.
pub fn split_namespace(column: &str) -> Option<(&str, &str)> {
    column.split_once(NAMESPACE_SEPARATOR)
}

/// Returns true for joined (`relation|column`) column names.
pub fn is_namespaced(column: &str) -> bool {
    column.contains(NAMESPACE_SEPARATOR)
}

/// Cells of one row keyed by column name.
pub type Row = BTreeMap<String, CellValue>;

/// A set of rows sharing an ordered column list.
///
/// Rows are keyed by record id and iterate in id order. Every row holds a
/// cell for every column; missing cells are null.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Frame {
    columns: Vec<String>,
    rows: BTreeMap<String, Row>,
}

impl Frame {
    /// Creates an empty frame with the given columns.
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: BTreeMap::new(),
        }
    }

    /// Column names in order.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Returns true if the frame has this column.
    pub fn has_column(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c == column)
    }

    /// Adds a column, filling existing rows with null.
    pub fn add_column(&mut self, column: impl Into<String>) {
        let column = column.into();
        if self.has_column(&column) {
            return;
        }
        for row in self.rows.values_mut() {
            row.insert(column.clone(), CellValue::Null);
        }
        self.columns.push(column);
    }

    /// Inserts or replaces a row. Unknown columns in `cells` are added.
    pub fn insert_row(&mut self, id: impl Into<String>, cells: Row) {
        for column in cells.keys() {
            if !self.has_column(column) {
                self.add_column(column.clone());
            }
        }
        let mut row: Row = self
            .columns
            .iter()
            .map(|c| (c.clone(), CellValue::Null))
            .collect();
        row.extend(cells);
        self.rows.insert(id.into(), row);
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns true if there are no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Returns true if a row with this id exists.
    pub fn contains(&self, id: &str) -> bool {
        self.rows.contains_key(id)
    }

    /// Record ids in order.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.rows.keys().map(String::as_str)
    }

    /// Rows in id order.
    pub fn rows(&self) -> impl Iterator<Item = (&str, &Row)> {
        self.rows.iter().map(|(id, row)| (id.as_str(), row))
    }

    /// One row.
    pub fn row(&self, id: &str) -> Option<&Row> {
        self.rows.get(id)
    }

    /// One cell.
    pub fn get(&self, id: &str, column: &str) -> Option<&CellValue> {
        self.rows.get(id).and_then(|row| row.get(column))
    }

    /// Sets one cell and returns the previous value.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::UnknownRecord`] or [`SyncError::UnknownColumn`].
    pub fn set(&mut self, id: &str, column: &str, value: CellValue) -> SyncResult<CellValue> {
        if !self.has_column(column) {
            return Err(SyncError::UnknownColumn(column.to_string()));
        }
        let row = self
            .rows
            .get_mut(id)
            .ok_or_else(|| SyncError::UnknownRecord(id.to_string()))?;
        Ok(row.insert(column.to_string(), value).unwrap_or_default())
    }

    /// Sets `set_column` to `to` on every row where `where_column` holds the
    /// same value as `is` (see [`CellValue::same_value`]).
    ///
    /// Returns the number of rows matched.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::UnknownColumn`] if either column is missing.
    pub fn update_where(
        &mut self,
        where_column: &str,
        is: &CellValue,
        set_column: &str,
        to: &CellValue,
    ) -> SyncResult<usize> {
        for column in [where_column, set_column] {
            if !self.has_column(column) {
                return Err(SyncError::UnknownColumn(column.to_string()));
            }
        }
        let mut matched = 0;
        for row in self.rows.values_mut() {
            if row.get(where_column).is_some_and(|v| v.same_value(is)) {
                row.insert(set_column.to_string(), to.clone());
                matched += 1;
            }
        }
        Ok(matched)
    }

    /// Drops rows for which `keep` returns false.
    pub fn retain_rows(&mut self, mut keep: impl FnMut(&str, &Row) -> bool) {
        self.rows.retain(|id, row| keep(id, row));
    }

    /// A copy restricted to `columns` (in that order), skipping unknown ones.
    pub fn project(&self, columns: &[String]) -> Frame {
        let columns: Vec<String> = columns
            .iter()
            .filter(|c| self.has_column(c))
            .cloned()
            .collect();
        let rows = self
            .rows
            .iter()
            .map(|(id, row)| {
                let cells = columns
                    .iter()
                    .map(|c| (c.clone(), row.get(c).cloned().unwrap_or_default()))
                    .collect();
                (id.clone(), cells)
            })
            .collect();
        Frame { columns, rows }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn orders() -> Frame {
        let mut frame = Frame::new(vec!["price".into(), "status".into()]);
        frame.insert_row(
            "o1",
            Row::from([
                ("price".into(), CellValue::Number(10.0)),
                ("status".into(), CellValue::Text("unpaid".into())),
            ]),
        );
        frame.insert_row(
            "o2",
            Row::from([("status".into(), CellValue::Text("paid".into()))]),
        );
        frame
    }

    #[test]
    fn namespace_helpers() {
        assert_eq!(namespaced("product", "name"), "product|name");
        assert_eq!(split_namespace("product|company|name"), Some(("product", "company|name")));
        assert!(is_namespaced("buyer|name"));
        assert!(!is_namespaced("price"));
    }

    #[test]
    fn missing_cells_are_null() {
        let frame = orders();
        assert_eq!(frame.get("o2", "price"), Some(&CellValue::Null));
        assert_eq!(frame.get("o3", "price"), None);
    }

    #[test]
    fn insert_row_adds_columns() {
        let mut frame = orders();
        frame.insert_row("o3", Row::from([("note".into(), CellValue::Text("x".into()))]));
        assert_eq!(frame.columns(), ["price", "status", "note"]);
        assert_eq!(frame.get("o1", "note"), Some(&CellValue::Null));
    }

    #[test]
    fn set_returns_previous_value() {
        let mut frame = orders();
        let old = frame.set("o1", "price", CellValue::Number(20.0)).unwrap();
        assert_eq!(old, CellValue::Number(10.0));
        assert!(matches!(
            frame.set("o1", "missing", CellValue::Null),
            Err(SyncError::UnknownColumn(_))
        ));
        assert!(matches!(
            frame.set("nope", "price", CellValue::Null),
            Err(SyncError::UnknownRecord(_))
        ));
    }

    #[test]
    fn update_where_counts_matches() {
        let mut frame = orders();
        let matched = frame
            .update_where(
                "status",
                &CellValue::Text("unpaid".into()),
                "price",
                &CellValue::Number(99.0),
            )
            .unwrap();
        assert_eq!(matched, 1);
        assert_eq!(frame.get("o1", "price"), Some(&CellValue::Number(99.0)));
        assert_eq!(frame.get("o2", "price"), Some(&CellValue::Null));
    }

    #[test]
    fn project_keeps_order_and_skips_unknown() {
        let frame = orders();
        let projected = frame.project(&["status".into(), "ghost".into()]);
        assert_eq!(projected.columns(), ["status"]);
        assert_eq!(projected.len(), 2);
        assert_eq!(projected.row("o1").unwrap().len(), 1);
    }

    #[test]
    fn retain_rows_filters() {
        let mut frame = orders();
        frame.retain_rows(|_, row| !row["price"].is_null());
        assert_eq!(frame.ids().collect::<Vec<_>>(), ["o1"]);
    }
}

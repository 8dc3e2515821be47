//! Baseline and editable views of one table.

use crate::cache::TableSnapshot;
use crate::error::SyncResult;
use crate::frame::{is_namespaced, namespaced, split_namespace, Frame, Row, RECORD_ID_COLUMN};
use crate::relation::{RelationResolver, Relations};
use crate::schema::SchemaTracker;
use tablesync_codec::{CellValue, FieldKind};
use tablesync_remote::RemoteRecord;

/// One changed cell.
#[derive(Debug, Clone, PartialEq)]
pub struct CellChange {
    /// Row key.
    pub record_id: String,
    /// Column name.
    pub column: String,
    /// Baseline value.
    pub old_value: CellValue,
    /// Edited value.
    pub new_value: CellValue,
}

/// Which columns a diff compares.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiffScope {
    /// Local columns only; joined `relation|column` cells are ignored.
    PlainColumns,
    /// Every column of the editable view.
    AllColumns,
}

impl DiffScope {
    fn includes(self, column: &str) -> bool {
        match self {
            DiffScope::PlainColumns => !is_namespaced(column),
            DiffScope::AllColumns => true,
        }
    }
}

/// Cell-wise differences between an editable view and its baseline.
///
/// Columns are compared in the editable view's order, rows in id order.
/// Null against null is never reported.
pub fn diff(live: &Frame, merged: &Frame, scope: DiffScope) -> Vec<CellChange> {
    let mut changes = Vec::new();
    for column in live.columns().iter().filter(|c| scope.includes(c)) {
        for (id, row) in live.rows() {
            let new_value = row.get(column).cloned().unwrap_or_default();
            let old_value = merged.get(id, column).cloned().unwrap_or_default();
            if new_value.differs_from(&old_value) {
                changes.push(CellChange {
                    record_id: id.to_string(),
                    column: column.clone(),
                    old_value,
                    new_value,
                });
            }
        }
    }
    changes
}

/// The `merged` / `live` pair of one table plus its discovered schema.
///
/// # Invariants
///
/// - `live` columns are a subset of `merged` columns
/// - Both views hold the same row ids
/// - Outside of uncommitted edits, `live` equals `merged` on every shared cell
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TableState {
    schema: SchemaTracker,
    merged: Frame,
    live: Frame,
}

impl TableState {
    /// Decodes `records`, drops empty rows and joins relation targets.
    ///
    /// # Errors
    ///
    /// Returns [`crate::SyncError::Config`] if a rollup cannot be resolved to
    /// a relation column.
    pub fn load(records: &[RemoteRecord], relations: &Relations) -> SyncResult<Self> {
        let mut schema = SchemaTracker::new();
        let mut rows: Vec<(String, Row)> = Vec::with_capacity(records.len());

        for record in records {
            let mut row = Row::new();
            for (column, property) in SchemaTracker::decode_order(record) {
                let first_seen = schema.observe(column, FieldKind::from_tag(&property.type_tag));
                let Some(kind) = schema.kind_of(column).cloned() else {
                    continue;
                };
                match kind {
                    FieldKind::Unsupported(tag) => {
                        if first_seen {
                            tracing::warn!(column, tag = %tag, "type not supported, skip loading");
                        }
                    }
                    FieldKind::Rollup => {
                        let relation =
                            RelationResolver::new(&schema, relations).resolve_rollup(column)?;
                        let value = row.get(relation).cloned().unwrap_or_default();
                        row.insert(column.to_string(), value);
                    }
                    kind => {
                        let value = kind.decode(property.raw()).unwrap_or_else(|e| {
                            tracing::warn!(
                                record = %record.id,
                                column,
                                error = %e,
                                "undecodable value, loading as null"
                            );
                            CellValue::Null
                        });
                        row.insert(column.to_string(), value);
                    }
                }
            }
            rows.push((record.id.clone(), row));
        }

        let columns: Vec<String> = schema
            .columns()
            .filter(|(_, kind)| kind.is_decodable() || **kind == FieldKind::Rollup)
            .map(|(c, _)| c.to_string())
            .collect();
        let mut base = Frame::new(columns);
        for (id, row) in rows {
            base.insert_row(id, row);
        }

        let before = base.len();
        base.retain_rows(|_, row| !is_empty_row(&schema, row));
        if before != base.len() {
            tracing::debug!(dropped = before - base.len(), "dropped unpopulated rows");
        }

        let resolver = RelationResolver::new(&schema, relations);
        let merged = resolver.join(&base)?;
        let live = merged.project(&resolver.live_columns(&merged)?);

        Ok(Self {
            schema,
            merged,
            live,
        })
    }

    pub(crate) fn from_frames(schema: SchemaTracker, merged: Frame, live: Frame) -> Self {
        Self {
            schema,
            merged,
            live,
        }
    }

    /// The discovered schema.
    pub fn schema(&self) -> &SchemaTracker {
        &self.schema
    }

    /// The last-synced baseline.
    pub fn merged(&self) -> &Frame {
        &self.merged
    }

    /// The editable view.
    pub fn live(&self) -> &Frame {
        &self.live
    }

    /// Mutable access to the editable view.
    pub fn live_mut(&mut self) -> &mut Frame {
        &mut self.live
    }

    /// Converts an edited value to the kind recorded for `column`.
    pub fn coerce(&self, column: &str, value: CellValue) -> CellValue {
        match self.schema.kind_of(column) {
            Some(kind) => kind.coerce(value),
            None => value,
        }
    }

    /// Uncommitted edits.
    pub fn diff(&self, scope: DiffScope) -> Vec<CellChange> {
        diff(&self.live, &self.merged, scope)
    }

    /// Marks one cell as synced by copying its editable value into the
    /// baseline.
    ///
    /// # Errors
    ///
    /// Returns an error if the cell does not exist in the baseline.
    pub fn reconcile(&mut self, change: &CellChange) -> SyncResult<()> {
        let value = self
            .live
            .get(&change.record_id, &change.column)
            .cloned()
            .unwrap_or_else(|| change.new_value.clone());
        self.merged.set(&change.record_id, &change.column, value)?;
        Ok(())
    }

    /// Edits made through `relation`'s joined columns, keyed by the foreign
    /// record id with the `relation|` prefix stripped.
    pub fn pending_relation_edits(&self, relation: &str) -> Vec<CellChange> {
        let key_column = namespaced(relation, RECORD_ID_COLUMN);
        self.diff(DiffScope::AllColumns)
            .into_iter()
            .filter_map(|change| {
                let (owner, foreign_column) = split_namespace(&change.column)?;
                if owner != relation {
                    return None;
                }
                let Some(foreign_id) = self
                    .merged
                    .get(&change.record_id, &key_column)
                    .and_then(CellValue::as_text)
                else {
                    tracing::debug!(
                        record = %change.record_id,
                        column = %change.column,
                        "edit on a row without a related record, not cascading"
                    );
                    return None;
                };
                Some(CellChange {
                    record_id: foreign_id.to_string(),
                    column: foreign_column.to_string(),
                    old_value: change.old_value,
                    new_value: change.new_value,
                })
            })
            .collect()
    }

    /// Applies edits pushed from a table that joins this one.
    ///
    /// Cells outside this table's editable view are skipped.
    pub fn apply_foreign_edits(&mut self, changes: &[CellChange]) -> usize {
        let mut applied = 0;
        for change in changes {
            let value = self.coerce(&change.column, change.new_value.clone());
            match self.live.set(&change.record_id, &change.column, value) {
                Ok(_) => applied += 1,
                Err(e) => tracing::debug!(
                    record = %change.record_id,
                    column = %change.column,
                    error = %e,
                    "cascaded edit not applicable"
                ),
            }
        }
        applied
    }

    /// Refreshes `relation|*` baseline cells from the target's updated
    /// baseline.
    ///
    /// `updated` is keyed by the target's record ids with unprefixed columns.
    /// Editable cells still equal to the old baseline follow the update;
    /// edited ones keep their edit. Returns the number of baseline cells
    /// changed.
    pub fn apply_cascaded_update(&mut self, relation: &str, updated: &Frame) -> usize {
        let key_column = namespaced(relation, RECORD_ID_COLUMN);
        let targets: Vec<(String, String)> = self
            .merged
            .rows()
            .filter_map(|(id, row)| {
                let foreign_id = row.get(&key_column).and_then(CellValue::as_text)?;
                updated
                    .contains(foreign_id)
                    .then(|| (id.to_string(), foreign_id.to_string()))
            })
            .collect();

        let mut changed = 0;
        for (id, foreign_id) in targets {
            let Some(foreign) = updated.row(&foreign_id) else {
                continue;
            };
            for (column, value) in foreign {
                let name = namespaced(relation, column);
                let Some(old) = self.merged.get(&id, &name).cloned() else {
                    continue;
                };
                if old == *value {
                    continue;
                }
                if self.live.get(&id, &name) == Some(&old) {
                    if let Err(e) = self.live.set(&id, &name, value.clone()) {
                        tracing::debug!(
                            record = %id,
                            column = %name,
                            error = %e,
                            "joined cell not refreshed"
                        );
                    }
                }
                if self.merged.set(&id, &name, value.clone()).is_ok() {
                    changed += 1;
                }
            }
        }
        changed
    }

    /// Copies the state into a cacheable snapshot.
    pub fn snapshot(&self) -> TableSnapshot {
        TableSnapshot {
            schema: self.schema.clone(),
            merged: self.merged.clone(),
            live: self.live.clone(),
        }
    }
}

impl From<TableSnapshot> for TableState {
    fn from(snapshot: TableSnapshot) -> Self {
        Self::from_frames(snapshot.schema, snapshot.merged, snapshot.live)
    }
}

/// A row is unpopulated when every column that the remote does not fill in
/// by itself is null.
fn is_empty_row(schema: &SchemaTracker, row: &Row) -> bool {
    row.iter()
        .filter(|(column, _)| {
            schema
                .kind_of(column)
                .is_some_and(|kind| !kind.is_populated_by_default())
        })
        .all(|(_, value)| value.is_null())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relation::RelationSpec;
    use crate::table::Table;
    use proptest::prelude::*;
    use tablesync_testkit::fixtures::{self, RecordBuilder};
    use tablesync_testkit::generators;

    fn people() -> Table {
        let mut frame = Frame::new(vec!["name".into(), "email".into()]);
        frame.insert_row(
            "p-alice",
            Row::from([
                ("name".into(), CellValue::from("Alice")),
                ("email".into(), CellValue::from("alice@example.com")),
            ]),
        );
        frame.insert_row(
            "p-bob",
            Row::from([
                ("name".into(), CellValue::from("Bob")),
                ("email".into(), CellValue::from("bob@example.com")),
            ]),
        );
        Table::detached("people-db", "people", frame)
    }

    fn orders() -> Vec<RemoteRecord> {
        vec![
            RecordBuilder::new("o-1")
                .property("price", fixtures::number(122.49))
                .property("status", fixtures::status("unpaid"))
                .property("buyer", fixtures::relation(&["p-alice"]))
                .property("seller", fixtures::relation(&["p-bob"]))
                .property("buyer_email", fixtures::rollup())
                .property("total", fixtures::formula_number(244.98))
                .build(),
            RecordBuilder::new("o-2")
                .property("price", fixtures::number(80.0))
                .property("status", fixtures::status("paid"))
                .property("buyer", fixtures::relation(&["p-bob"]))
                .property("seller", fixtures::relation(&[]))
                .property("buyer_email", fixtures::rollup())
                .property("total", fixtures::formula_number(80.0))
                .build(),
        ]
    }

    fn relations(people: &Table) -> Relations {
        Relations::new()
            .with("buyer", RelationSpec::new(people, "name"))
            .with("seller", RelationSpec::new(people, "name"))
            .with("buyer_email", RelationSpec::new(people, "email"))
    }

    #[test]
    fn load_builds_merged_and_live() {
        let people = people();
        let state = TableState::load(&orders(), &relations(&people)).unwrap();

        let merged = state.merged();
        assert_eq!(merged.len(), 2);
        assert_eq!(merged.get("o-1", "buyer_email"), Some(&CellValue::from("p-alice")));
        assert_eq!(merged.get("o-1", "buyer|email"), Some(&CellValue::from("alice@example.com")));
        assert_eq!(merged.get("o-2", "seller|name"), Some(&CellValue::Null));

        let live = state.live();
        assert!(live.has_column("buyer|name"));
        assert!(live.has_column("buyer|email"));
        assert!(live.has_column("seller|name"));
        assert!(!live.has_column("seller|email"));
        assert!(!live.has_column("buyer|record_id"));
        assert!(state.diff(DiffScope::AllColumns).is_empty());
    }

    #[test]
    fn load_drops_unpopulated_rows() {
        let records = vec![
            RecordBuilder::new("filled")
                .property("name", fixtures::title("Widget"))
                .property("category", fixtures::select("Tools"))
                .property("price", fixtures::number_empty())
                .property("status", fixtures::status("Not started"))
                .build(),
            RecordBuilder::new("blank")
                .property("name", fixtures::title_empty())
                .property("category", fixtures::select_empty())
                .property("price", fixtures::number_empty())
                .property("code", fixtures::unique_id(Some("PRD"), 7))
                .property("status", fixtures::status("Not started"))
                .build(),
        ];
        let state = TableState::load(&records, &Relations::new()).unwrap();
        assert!(state.merged().contains("filled"));
        assert_eq!(state.merged().get("filled", "category"), Some(&CellValue::from("Tools")));
        assert!(!state.merged().contains("blank"));
        assert!(!state.live().contains("blank"));
    }

    #[test]
    fn load_skips_unsupported_columns() {
        let records = vec![RecordBuilder::new("r")
            .property("name", fixtures::title("x"))
            .property("files", fixtures::unsupported("files"))
            .build()];
        let state = TableState::load(&records, &Relations::new()).unwrap();
        assert!(!state.merged().has_column("files"));
        assert_eq!(
            state.schema().kind_of("files"),
            Some(&FieldKind::Unsupported("files".into()))
        );
    }

    #[test]
    fn load_decodes_with_first_observed_kind() {
        let records = vec![
            RecordBuilder::new("r1")
                .property("name", fixtures::title("first"))
                .property("price", fixtures::number(5.0))
                .build(),
            RecordBuilder::new("r2")
                .property("name", fixtures::title("second"))
                .property("price", fixtures::rich_text("five"))
                .build(),
        ];
        let state = TableState::load(&records, &Relations::new()).unwrap();
        assert_eq!(state.schema().kind_of("price"), Some(&FieldKind::Number));
        assert_eq!(state.merged().get("r1", "price"), Some(&CellValue::Number(5.0)));
        assert_eq!(state.merged().get("r2", "price"), Some(&CellValue::Null));
    }

    #[test]
    fn load_fails_on_rollup_without_spec() {
        let records = vec![RecordBuilder::new("r")
            .property("name", fixtures::title("x"))
            .property("size", fixtures::rollup())
            .build()];
        let err = TableState::load(&records, &Relations::new()).unwrap_err();
        assert!(err.is_config());
    }

    #[test]
    fn diff_is_plain_only_by_default_scope() {
        let people = people();
        let mut state = TableState::load(&orders(), &relations(&people)).unwrap();
        state.live_mut().set("o-1", "price", CellValue::Number(130.0)).unwrap();
        state.live_mut().set("o-1", "buyer|name", CellValue::from("Alicia")).unwrap();

        let plain = state.diff(DiffScope::PlainColumns);
        assert_eq!(plain.len(), 1);
        assert_eq!(plain[0].column, "price");
        assert_eq!(state.diff(DiffScope::AllColumns).len(), 2);
    }

    #[test]
    fn reconcile_is_cell_level() {
        let people = people();
        let mut state = TableState::load(&orders(), &relations(&people)).unwrap();
        state.live_mut().set("o-1", "price", CellValue::Number(130.0)).unwrap();
        state.live_mut().set("o-2", "total", CellValue::Number(1.0)).unwrap();

        let changes = state.diff(DiffScope::PlainColumns);
        let price = changes.iter().find(|c| c.column == "price").unwrap();
        state.reconcile(price).unwrap();

        let remaining = state.diff(DiffScope::PlainColumns);
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].column, "total");
    }

    #[test]
    fn relation_edits_are_rekeyed() {
        let people = people();
        let mut state = TableState::load(&orders(), &relations(&people)).unwrap();
        state.live_mut().set("o-2", "buyer|name", CellValue::from("Robert")).unwrap();

        let edits = state.pending_relation_edits("buyer");
        assert_eq!(
            edits,
            vec![CellChange {
                record_id: "p-bob".into(),
                column: "name".into(),
                old_value: CellValue::from("Bob"),
                new_value: CellValue::from("Robert"),
            }]
        );
        assert!(state.pending_relation_edits("seller").is_empty());
    }

    #[test]
    fn cascaded_update_refreshes_baseline_and_untouched_live() {
        let people = people();
        let mut state = TableState::load(&orders(), &relations(&people)).unwrap();
        state.live_mut().set("o-1", "buyer|name", CellValue::from("Alicia")).unwrap();

        let mut updated = people.merged();
        updated.set("p-alice", "name", CellValue::from("Alicia")).unwrap();
        updated.set("p-alice", "email", CellValue::from("alicia@example.com")).unwrap();

        let changed = state.apply_cascaded_update("buyer", &updated);
        assert_eq!(changed, 2);
        assert_eq!(state.merged().get("o-1", "buyer|name"), Some(&CellValue::from("Alicia")));
        assert_eq!(
            state.live().get("o-1", "buyer|email"),
            Some(&CellValue::from("alicia@example.com"))
        );
        assert!(state.diff(DiffScope::AllColumns).is_empty());
    }

    #[test]
    fn foreign_edits_skip_unknown_cells() {
        let people = people();
        let mut state = TableState::load(&orders(), &relations(&people)).unwrap();
        let applied = state.apply_foreign_edits(&[
            CellChange {
                record_id: "o-1".into(),
                column: "price".into(),
                old_value: CellValue::Null,
                new_value: CellValue::Number(1.5),
            },
            CellChange {
                record_id: "o-1".into(),
                column: "ghost".into(),
                old_value: CellValue::Null,
                new_value: CellValue::Number(1.5),
            },
        ]);
        assert_eq!(applied, 1);
    }

    fn frame_strategy() -> impl Strategy<Value = Frame> {
        prop::collection::vec(
            (generators::cell_value(), generators::cell_value()),
            1..12,
        )
        .prop_map(|cells| {
            let mut frame = Frame::new(vec!["a".into(), "b".into()]);
            for (i, (a, b)) in cells.into_iter().enumerate() {
                frame.insert_row(format!("r{i:02}"), Row::from([("a".into(), a), ("b".into(), b)]));
            }
            frame
        })
    }

    proptest! {
        #[test]
        fn diff_is_empty_after_reconciling_everything(
            merged in frame_strategy(),
            edits in prop::collection::vec((0usize..12, generators::cell_value()), 0..8),
        ) {
            let mut state = TableState::from_frames(SchemaTracker::new(), merged.clone(), merged);
            let ids: Vec<String> = state.live().ids().map(String::from).collect();
            for (index, value) in edits {
                let id = &ids[index % ids.len()];
                state.live_mut().set(id, "a", value).unwrap();
            }
            for change in state.diff(DiffScope::PlainColumns) {
                prop_assert!(change.new_value.differs_from(&change.old_value));
                state.reconcile(&change).unwrap();
            }
            prop_assert!(state.diff(DiffScope::PlainColumns).is_empty());
        }

        #[test]
        fn unedited_state_never_diffs(merged in frame_strategy()) {
            prop_assert!(diff(&merged, &merged, DiffScope::AllColumns).is_empty());
        }
    }
}

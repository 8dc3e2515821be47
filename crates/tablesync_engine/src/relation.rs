//! Relation declarations, rollup resolution and joins.

use crate::error::{SyncError, SyncResult};
use crate::frame::{is_namespaced, namespaced, Frame, Row, RECORD_ID_COLUMN};
use crate::schema::SchemaTracker;
use crate::table::Table;
use std::fmt;
use tablesync_codec::{CellValue, FieldKind};

/// Declares which table a column points at and what to surface from it.
///
/// For a relation column, `lookup_column` is the foreign column shown in the
/// editable view. For a rollup column, `target` names the table its relation
/// points at and `lookup_column` is the foreign column it mirrors.
#[derive(Clone)]
pub struct RelationSpec {
    /// The referenced table.
    pub target: Table,
    /// Foreign column surfaced as `relation|lookup_column`.
    pub lookup_column: String,
    /// For rollups: the relation column to resolve through.
    pub via: Option<String>,
}

impl RelationSpec {
    /// Creates a spec pointing at `target`.
    pub fn new(target: &Table, lookup_column: impl Into<String>) -> Self {
        Self {
            target: target.clone(),
            lookup_column: lookup_column.into(),
            via: None,
        }
    }

    /// Pins a rollup to a specific relation column.
    pub fn via(mut self, relation: impl Into<String>) -> Self {
        self.via = Some(relation.into());
        self
    }
}

impl fmt::Debug for RelationSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RelationSpec")
            .field("target", &self.target.name())
            .field("lookup_column", &self.lookup_column)
            .field("via", &self.via)
            .finish()
    }
}

/// Relation specs keyed by column name, in declaration order.
#[derive(Debug, Clone, Default)]
pub struct Relations {
    entries: Vec<(String, RelationSpec)>,
}

impl Relations {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a spec (builder form).
    pub fn with(mut self, column: impl Into<String>, spec: RelationSpec) -> Self {
        self.insert(column, spec);
        self
    }

    /// Adds or replaces the spec for `column`, keeping its original position.
    pub fn insert(&mut self, column: impl Into<String>, spec: RelationSpec) {
        let column = column.into();
        match self.entries.iter_mut().find(|(c, _)| *c == column) {
            Some(entry) => entry.1 = spec,
            None => self.entries.push((column, spec)),
        }
    }

    /// The spec for a column.
    pub fn get(&self, column: &str) -> Option<&RelationSpec> {
        self.entries
            .iter()
            .find(|(c, _)| c == column)
            .map(|(_, spec)| spec)
    }

    /// Specs in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &RelationSpec)> {
        self.entries.iter().map(|(c, spec)| (c.as_str(), spec))
    }

    /// Number of specs.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no spec is declared.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Resolves rollups and performs relation joins for one table.
pub struct RelationResolver<'a> {
    schema: &'a SchemaTracker,
    relations: &'a Relations,
}

impl<'a> RelationResolver<'a> {
    /// Creates a resolver over a table's schema and relation specs.
    pub fn new(schema: &'a SchemaTracker, relations: &'a Relations) -> Self {
        Self { schema, relations }
    }

    /// Returns the relation column a rollup column reads through.
    ///
    /// The match is the first relation column (in declaration order) whose
    /// spec targets the same table as the rollup's spec, unless the rollup
    /// names one with [`RelationSpec::via`].
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Config`] if the rollup has no spec, or no
    /// relation column targets the same table.
    pub fn resolve_rollup(&self, rollup_column: &str) -> SyncResult<&'a str> {
        let rollup = self.relations.get(rollup_column).ok_or_else(|| {
            SyncError::config(format!(
                "rollup column \"{rollup_column}\" is not defined in table relations"
            ))
        })?;

        let mut candidates = self.relations.iter().filter(|(column, spec)| {
            *column != rollup_column
                && self.schema.kind_of(column).is_some_and(FieldKind::is_relation)
                && spec.target.same_table(&rollup.target)
        });

        let found = match &rollup.via {
            Some(via) => candidates.find(|(column, _)| column == via),
            None => candidates.next(),
        };

        found.map(|(column, _)| column).ok_or_else(|| {
            SyncError::config(format!(
                "no relation column targets table {} for rollup column \"{rollup_column}\"{}",
                rollup.target.name(),
                rollup
                    .via
                    .as_ref()
                    .map(|v| format!(" via \"{v}\""))
                    .unwrap_or_default()
            ))
        })
    }

    /// Joined relation columns with the rollups that resolve to each.
    ///
    /// Only relation-typed columns with a spec are joined. Specs declared for
    /// rollup columns are attached to their relation instead.
    ///
    /// # Errors
    ///
    /// Propagates rollup resolution failures.
    pub fn rollup_mapping(&self) -> SyncResult<Vec<(&'a str, Vec<&'a str>)>> {
        let mut mapping: Vec<(&'a str, Vec<&'a str>)> = Vec::new();
        for (column, _) in self.relations.iter() {
            match self.schema.kind_of(column) {
                Some(FieldKind::Relation) => mapping.push((column, Vec::new())),
                Some(FieldKind::Rollup) => {}
                Some(other) => tracing::warn!(
                    column,
                    kind = %other,
                    "relation declared on a column that is neither relation nor rollup, ignoring"
                ),
                None => tracing::debug!(column, "relation declared on an unseen column"),
            }
        }
        for (column, _) in self.relations.iter() {
            if self.schema.kind_of(column) != Some(&FieldKind::Rollup) {
                continue;
            }
            let relation = self.resolve_rollup(column)?;
            if let Some((_, rollups)) = mapping.iter_mut().find(|(r, _)| *r == relation) {
                rollups.push(column);
            }
        }
        Ok(mapping)
    }

    /// Left-joins every relation target's baseline onto `base`.
    ///
    /// For relation `R`, adds `R|record_id` and `R|<column>` for every column
    /// of the target's `merged` frame, matched on `base[R] == target id`.
    /// Rows without a match get null joined cells.
    ///
    /// # Errors
    ///
    /// Propagates rollup resolution failures.
    pub fn join(&self, base: &Frame) -> SyncResult<Frame> {
        let mut joined = base.clone();
        for (relation, _) in self.rollup_mapping()? {
            let Some(spec) = self.relations.get(relation) else {
                continue;
            };
            let target = spec.target.merged();
            tracing::debug!(
                relation,
                target = %spec.target.name(),
                rows = target.len(),
                "joining relation"
            );

            let key_column = namespaced(relation, RECORD_ID_COLUMN);
            let foreign_columns: Vec<(String, String)> = target
                .columns()
                .iter()
                .map(|c| (c.clone(), namespaced(relation, c)))
                .collect();

            joined.add_column(key_column.clone());
            for (_, prefixed) in &foreign_columns {
                joined.add_column(prefixed.clone());
            }

            let updates: Vec<(String, Row)> = base
                .rows()
                .filter_map(|(id, row)| {
                    let foreign_id = row.get(relation).and_then(CellValue::as_text)?;
                    let foreign = target.row(foreign_id)?;
                    let mut cells = Row::new();
                    cells.insert(key_column.clone(), CellValue::Text(foreign_id.to_string()));
                    for (column, prefixed) in &foreign_columns {
                        cells.insert(
                            prefixed.clone(),
                            foreign.get(column).cloned().unwrap_or_default(),
                        );
                    }
                    Some((id.to_string(), cells))
                })
                .collect();

            for (id, cells) in updates {
                for (column, value) in cells {
                    joined.set(&id, &column, value)?;
                }
            }
        }
        Ok(joined)
    }

    /// Columns of the editable view over a joined frame.
    ///
    /// Local columns, plus for each joined relation `R`: `R|lookup` and
    /// `R|<rollup lookup>` for every rollup resolved to `R`. Join keys are
    /// never included.
    ///
    /// # Errors
    ///
    /// Propagates rollup resolution failures.
    pub fn live_columns(&self, merged: &Frame) -> SyncResult<Vec<String>> {
        let mut columns: Vec<String> = merged
            .columns()
            .iter()
            .filter(|c| !is_namespaced(c))
            .cloned()
            .collect();

        for (relation, rollups) in self.rollup_mapping()? {
            let lookups = std::iter::once(relation)
                .chain(rollups)
                .filter_map(|column| self.relations.get(column))
                .map(|spec| spec.lookup_column.as_str());
            for lookup in lookups {
                if lookup == RECORD_ID_COLUMN {
                    continue;
                }
                let name = namespaced(relation, lookup);
                if merged.has_column(&name) && !columns.contains(&name) {
                    columns.push(name);
                }
            }
        }
        Ok(columns)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema(columns: &[(&str, FieldKind)]) -> SchemaTracker {
        let mut schema = SchemaTracker::new();
        for (name, kind) in columns {
            schema.observe(name, kind.clone());
        }
        schema
    }

    fn people() -> Table {
        let mut frame = Frame::new(vec!["name".into()]);
        frame.insert_row("p1", Row::from([("name".into(), CellValue::from("Alice"))]));
        frame.insert_row("p2", Row::from([("name".into(), CellValue::from("Bob"))]));
        Table::detached("people-db", "people", frame)
    }

    #[test]
    fn rollup_resolves_to_first_matching_relation() {
        let people = people();
        let relations = Relations::new()
            .with("buyer", RelationSpec::new(&people, "name"))
            .with("seller", RelationSpec::new(&people, "name"))
            .with("buyer_email", RelationSpec::new(&people, "email"));
        let schema = schema(&[
            ("buyer", FieldKind::Relation),
            ("seller", FieldKind::Relation),
            ("buyer_email", FieldKind::Rollup),
        ]);

        let resolver = RelationResolver::new(&schema, &relations);
        assert_eq!(resolver.resolve_rollup("buyer_email").unwrap(), "buyer");
    }

    #[test]
    fn rollup_via_pins_relation() {
        let people = people();
        let relations = Relations::new()
            .with("seller", RelationSpec::new(&people, "name"))
            .with("buyer", RelationSpec::new(&people, "name"))
            .with("buyer_email", RelationSpec::new(&people, "email").via("buyer"));
        let schema = schema(&[
            ("seller", FieldKind::Relation),
            ("buyer", FieldKind::Relation),
            ("buyer_email", FieldKind::Rollup),
        ]);

        let resolver = RelationResolver::new(&schema, &relations);
        assert_eq!(resolver.resolve_rollup("buyer_email").unwrap(), "buyer");
    }

    #[test]
    fn rollup_without_spec_is_config_error() {
        let relations = Relations::new();
        let schema = schema(&[("total_size", FieldKind::Rollup)]);
        let err = RelationResolver::new(&schema, &relations)
            .resolve_rollup("total_size")
            .unwrap_err();
        assert!(err.is_config());
    }

    #[test]
    fn rollup_without_matching_relation_is_config_error() {
        let people = people();
        let other = Table::detached("other-db", "other", Frame::default());
        let relations = Relations::new()
            .with("buyer", RelationSpec::new(&people, "name"))
            .with("size", RelationSpec::new(&other, "size"));
        let schema = schema(&[("buyer", FieldKind::Relation), ("size", FieldKind::Rollup)]);

        let err = RelationResolver::new(&schema, &relations)
            .resolve_rollup("size")
            .unwrap_err();
        assert!(err.is_config());
    }

    #[test]
    fn join_prefixes_and_null_fills() {
        let people = people();
        let relations = Relations::new().with("buyer", RelationSpec::new(&people, "name"));
        let schema = schema(&[("buyer", FieldKind::Relation)]);

        let mut base = Frame::new(vec!["buyer".into()]);
        base.insert_row("o1", Row::from([("buyer".into(), CellValue::from("p2"))]));
        base.insert_row("o2", Row::from([("buyer".into(), CellValue::Null)]));
        base.insert_row("o3", Row::from([("buyer".into(), CellValue::from("ghost"))]));

        let resolver = RelationResolver::new(&schema, &relations);
        let joined = resolver.join(&base).unwrap();

        assert_eq!(joined.columns(), ["buyer", "buyer|record_id", "buyer|name"]);
        assert_eq!(joined.get("o1", "buyer|name"), Some(&CellValue::from("Bob")));
        assert_eq!(joined.get("o1", "buyer|record_id"), Some(&CellValue::from("p2")));
        assert_eq!(joined.get("o2", "buyer|name"), Some(&CellValue::Null));
        assert_eq!(joined.get("o3", "buyer|name"), Some(&CellValue::Null));
    }

    #[test]
    fn live_columns_include_lookups_and_rollup_lookups() {
        let mut products = Frame::new(vec!["name".into(), "description".into()]);
        products.insert_row(
            "w",
            Row::from([
                ("name".into(), CellValue::from("Widget")),
                ("description".into(), CellValue::from("a")),
            ]),
        );
        let products = Table::detached("products-db", "products", products);
        let relations = Relations::new()
            .with("product", RelationSpec::new(&products, "name"))
            .with("product_description", RelationSpec::new(&products, "description"));
        let schema = schema(&[
            ("product", FieldKind::Relation),
            ("product_description", FieldKind::Rollup),
        ]);

        let mut base = Frame::new(vec!["product".into(), "product_description".into()]);
        base.insert_row(
            "o1",
            Row::from([
                ("product".into(), CellValue::from("w")),
                ("product_description".into(), CellValue::from("w")),
            ]),
        );

        let resolver = RelationResolver::new(&schema, &relations);
        let merged = resolver.join(&base).unwrap();
        let live = resolver.live_columns(&merged).unwrap();

        assert_eq!(
            live,
            ["product", "product_description", "product|name", "product|description"]
        );
    }
}

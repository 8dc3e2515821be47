//! Shared table handles.

use crate::error::SyncResult;
use crate::frame::Frame;
use crate::relation::{RelationSpec, Relations};
use crate::schema::SchemaTracker;
use crate::state::{CellChange, DiffScope, TableState};
use parking_lot::RwLock;
use std::fmt;
use std::sync::Arc;
use tablesync_codec::CellValue;

/// Whether a table uses the engine's snapshot cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CacheMode {
    /// Always fetch from the remote.
    #[default]
    Disabled,
    /// Load from the cache when present, otherwise fetch and store.
    Enabled,
}

/// Everything needed to open a table.
#[derive(Debug, Clone)]
pub struct TableDef {
    /// Remote database id.
    pub database_id: String,
    /// Display name; defaults to the tail of the database id.
    pub name: Option<String>,
    /// Relation specs.
    pub relations: Relations,
    /// Cache usage.
    pub cache: CacheMode,
}

impl TableDef {
    /// Creates a definition with no relations and no caching.
    pub fn new(database_id: impl Into<String>) -> Self {
        Self {
            database_id: database_id.into(),
            name: None,
            relations: Relations::new(),
            cache: CacheMode::Disabled,
        }
    }

    /// Sets the display name.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Declares a relation or rollup spec for `column`.
    pub fn relation(mut self, column: impl Into<String>, spec: RelationSpec) -> Self {
        self.relations.insert(column, spec);
        self
    }

    /// Replaces all relation specs.
    pub fn with_relations(mut self, relations: Relations) -> Self {
        self.relations = relations;
        self
    }

    /// Enables the snapshot cache for this table.
    pub fn cached(mut self) -> Self {
        self.cache = CacheMode::Enabled;
        self
    }
}

struct TableInner {
    database_id: String,
    name: String,
    cache: CacheMode,
    relations: RwLock<Relations>,
    state: RwLock<TableState>,
}

/// A cheaply clonable handle to one synced table.
///
/// Clones share the same state. Identity (for relation matching and cycle
/// detection) is the handle's allocation, see [`Table::same_table`].
#[derive(Clone)]
pub struct Table {
    inner: Arc<TableInner>,
}

impl Table {
    pub(crate) fn from_parts(
        database_id: String,
        name: String,
        cache: CacheMode,
        relations: Relations,
        state: TableState,
    ) -> Self {
        Self {
            inner: Arc::new(TableInner {
                database_id,
                name,
                cache,
                relations: RwLock::new(relations),
                state: RwLock::new(state),
            }),
        }
    }

    #[cfg(test)]
    pub(crate) fn detached(database_id: &str, name: &str, merged: Frame) -> Self {
        Self::from_parts(
            database_id.to_string(),
            name.to_string(),
            CacheMode::Disabled,
            Relations::new(),
            TableState::from_frames(SchemaTracker::new(), merged.clone(), merged),
        )
    }

    /// Remote database id.
    pub fn database_id(&self) -> &str {
        &self.inner.database_id
    }

    /// Display name used in diagnostics.
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Cache usage.
    pub fn cache_mode(&self) -> CacheMode {
        self.inner.cache
    }

    /// Returns true if both handles refer to the same table.
    pub fn same_table(&self, other: &Table) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// A copy of the relation specs.
    pub fn relations(&self) -> Relations {
        self.inner.relations.read().clone()
    }

    /// Declares an extra relation spec.
    ///
    /// Joins are only rebuilt by the next load, see
    /// [`crate::SyncEngine::reload`].
    pub fn declare_relation(&self, column: impl Into<String>, spec: RelationSpec) {
        self.inner.relations.write().insert(column, spec);
    }

    /// A copy of the editable view.
    pub fn live(&self) -> Frame {
        self.inner.state.read().live().clone()
    }

    /// A copy of the last-synced baseline.
    pub fn merged(&self) -> Frame {
        self.inner.state.read().merged().clone()
    }

    /// A copy of the discovered schema.
    pub fn schema(&self) -> SchemaTracker {
        self.inner.state.read().schema().clone()
    }

    /// Uncommitted edits to local (non-namespaced) columns.
    pub fn diff(&self) -> Vec<CellChange> {
        self.inner.state.read().diff(DiffScope::PlainColumns)
    }

    /// Uncommitted edits to any editable column, joined ones included.
    pub fn pending_edits(&self) -> Vec<CellChange> {
        self.inner.state.read().diff(DiffScope::AllColumns)
    }

    /// Reads one editable cell.
    pub fn get(&self, record_id: &str, column: &str) -> Option<CellValue> {
        self.inner.state.read().live().get(record_id, column).cloned()
    }

    /// Edits one cell of the editable view, returning the previous value.
    ///
    /// # Errors
    ///
    /// Returns an error if the record or column is not in the editable view.
    pub fn set(
        &self,
        record_id: &str,
        column: &str,
        value: impl Into<CellValue>,
    ) -> SyncResult<CellValue> {
        let mut state = self.inner.state.write();
        let value = state.coerce(column, value.into());
        state.live_mut().set(record_id, column, value)
    }

    /// Sets `set_column` to `to` wherever `where_column == is`.
    ///
    /// # Errors
    ///
    /// Returns an error if either column is not in the editable view.
    pub fn update_where(
        &self,
        where_column: &str,
        is: impl Into<CellValue>,
        set_column: &str,
        to: impl Into<CellValue>,
    ) -> SyncResult<usize> {
        let mut state = self.inner.state.write();
        let to = state.coerce(set_column, to.into());
        state
            .live_mut()
            .update_where(where_column, &is.into(), set_column, &to)
    }

    pub(crate) fn state(&self) -> &RwLock<TableState> {
        &self.inner.state
    }

    pub(crate) fn replace_state(&self, state: TableState) {
        *self.inner.state.write() = state;
    }
}

impl fmt::Debug for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Table")
            .field("database_id", &self.inner.database_id)
            .field("name", &self.inner.name)
            .finish_non_exhaustive()
    }
}

//! The sync engine: load, write-back and cascade.

use crate::cache::SnapshotCache;
use crate::config::SyncConfig;
use crate::error::{SyncError, SyncResult};
use crate::relation::Relations;
use crate::schema::SchemaTracker;
use crate::state::{CellChange, TableState};
use crate::table::{CacheMode, Table, TableDef};
use std::sync::Arc;
use tablesync_codec::{CodecError, FieldKind};
use tablesync_remote::{PatchRequest, RemoteError, RemoteRecord, RemoteStore};

/// What happened to one changed cell during write-back.
#[derive(Debug, Clone, PartialEq)]
pub enum WriteOutcome {
    /// The remote accepted the patch; the cell is now reconciled.
    Applied {
        /// Response status.
        status: u16,
    },
    /// The column is computed remotely (formula or rollup).
    SkippedComputed,
    /// The column kind has no encoder.
    SkippedUnsupported,
    /// The value could not be encoded for the column kind.
    Rejected {
        /// Encoder error.
        reason: String,
    },
    /// The remote answered with a non-success status, or not at all.
    Failed {
        /// Response status, if any.
        status: Option<u16>,
        /// Response or transport message.
        message: String,
    },
}

impl WriteOutcome {
    /// Returns true if the cell was written and reconciled.
    pub fn is_applied(&self) -> bool {
        matches!(self, WriteOutcome::Applied { .. })
    }
}

/// A changed cell and its outcome.
#[derive(Debug, Clone, PartialEq)]
pub struct CellOutcome {
    /// The cell.
    pub change: CellChange,
    /// What happened.
    pub outcome: WriteOutcome,
}

/// Result of one `writes` call, including cascaded tables.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct WriteReport {
    /// Display name of the table.
    pub table: String,
    /// Per-cell outcomes in diff order.
    pub outcomes: Vec<CellOutcome>,
    /// Reports of cascaded tables, one per related table, in the order
    /// their first relation column was declared.
    pub cascaded: Vec<WriteReport>,
}

impl WriteReport {
    fn new(table: &str) -> Self {
        Self {
            table: table.to_string(),
            ..Self::default()
        }
    }

    /// Returns true if neither this table nor any cascaded one had changes.
    pub fn is_noop(&self) -> bool {
        self.outcomes.is_empty() && self.cascaded.iter().all(WriteReport::is_noop)
    }

    /// Number of cells applied on this table.
    pub fn applied(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| o.outcome.is_applied())
            .count()
    }

    /// Number of cells applied on this table and every cascaded one.
    pub fn total_applied(&self) -> usize {
        self.applied()
            + self
                .cascaded
                .iter()
                .map(WriteReport::total_applied)
                .sum::<usize>()
    }

    /// The first report for `table` in this tree.
    pub fn find(&self, table: &str) -> Option<&WriteReport> {
        if self.table == table {
            return Some(self);
        }
        self.cascaded.iter().find_map(|r| r.find(table))
    }

    /// The outcome for one cell of this table.
    pub fn outcome(&self, record_id: &str, column: &str) -> Option<&WriteOutcome> {
        self.outcomes
            .iter()
            .find(|o| o.change.record_id == record_id && o.change.column == column)
            .map(|o| &o.outcome)
    }
}

/// Loads tables from a [`RemoteStore`] and writes their edits back.
///
/// All remote calls are sequential and blocking, with a courtesy pause of
/// [`SyncConfig::request_interval`] between them.
pub struct SyncEngine<S: RemoteStore> {
    config: SyncConfig,
    store: Arc<S>,
    cache: Option<Arc<dyn SnapshotCache>>,
}

impl<S: RemoteStore> SyncEngine<S> {
    /// Creates a new sync engine.
    pub fn new(config: SyncConfig, store: S) -> Self {
        Self {
            config,
            store: Arc::new(store),
            cache: None,
        }
    }

    /// Attaches a snapshot cache, used by tables opened with
    /// [`CacheMode::Enabled`].
    pub fn with_cache(mut self, cache: impl SnapshotCache + 'static) -> Self {
        self.cache = Some(Arc::new(cache));
        self
    }

    /// The configuration.
    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// The remote store.
    pub fn store(&self) -> &S {
        &self.store
    }

    fn throttle(&self) {
        if !self.config.request_interval.is_zero() {
            std::thread::sleep(self.config.request_interval);
        }
    }

    /// Fetches every record of a database, following pagination.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Remote`] if any page fails.
    pub fn fetch_all(&self, database_id: &str) -> SyncResult<Vec<RemoteRecord>> {
        let mut records = Vec::new();
        let mut cursor: Option<String> = None;
        let mut pages = 0usize;
        loop {
            if pages > 0 {
                self.throttle();
            }
            let page = self.store.query(database_id, cursor.as_deref())?;
            pages += 1;
            tracing::debug!(
                database_id,
                page = pages,
                records = page.results.len(),
                has_more = page.has_more,
                "fetched page"
            );
            records.extend(page.results);
            if !page.has_more {
                break;
            }
            cursor = match page.next_cursor {
                Some(next) => Some(next),
                None => {
                    return Err(RemoteError::Protocol(
                        "has_more without next_cursor".to_string(),
                    )
                    .into())
                }
            };
        }
        Ok(records)
    }

    /// Opens a table: loads it from the cache when enabled and present,
    /// otherwise fetches, decodes and joins it.
    ///
    /// Relation targets must already be open; their `merged` views are
    /// joined as they are now.
    ///
    /// # Errors
    ///
    /// Returns an error if the remote is unreachable, the credential is
    /// rejected, or the relation configuration does not fit the schema.
    pub fn open_table(&self, def: TableDef) -> SyncResult<Table> {
        let name = def
            .name
            .unwrap_or_else(|| self.config.table_name(&def.database_id));
        let state = self.load_state(&def.database_id, &name, def.cache, &def.relations)?;
        tracing::info!(
            table = %name,
            rows = state.merged().len(),
            columns = state.live().columns().len(),
            "table loaded"
        );
        Ok(Table::from_parts(
            def.database_id,
            name,
            def.cache,
            def.relations,
            state,
        ))
    }

    fn load_state(
        &self,
        database_id: &str,
        name: &str,
        mode: CacheMode,
        relations: &Relations,
    ) -> SyncResult<TableState> {
        let cache = match (mode, &self.cache) {
            (CacheMode::Enabled, Some(cache)) => Some(cache),
            (CacheMode::Enabled, None) => {
                tracing::warn!(table = %name, "caching requested but no cache configured");
                None
            }
            (CacheMode::Disabled, _) => None,
        };

        if let Some(cache) = cache {
            match cache.load(database_id) {
                Ok(Some(snapshot)) => {
                    tracing::debug!(table = %name, "loaded from cache");
                    return Ok(snapshot.into());
                }
                Ok(None) => tracing::debug!(table = %name, "cache miss"),
                Err(e) => tracing::warn!(table = %name, error = %e, "unreadable cache, refetching"),
            }
            cache.clear(database_id)?;
        }

        let state = self.fetch_state(database_id, relations)?;
        if let Some(cache) = cache {
            cache.save(database_id, &state.snapshot())?;
        }
        Ok(state)
    }

    fn fetch_state(&self, database_id: &str, relations: &Relations) -> SyncResult<TableState> {
        let records = self.fetch_all(database_id)?;
        TableState::load(&records, relations)
    }

    /// Re-fetches a table and rebuilds both views, discarding uncommitted
    /// edits. Picks up relations added with [`Table::declare_relation`].
    ///
    /// # Errors
    ///
    /// Same as [`SyncEngine::open_table`].
    pub fn reload(&self, table: &Table) -> SyncResult<()> {
        let state = self.fetch_state(table.database_id(), &table.relations())?;
        if table.cache_mode() == CacheMode::Enabled {
            if let Some(cache) = &self.cache {
                cache.save(table.database_id(), &state.snapshot())?;
            }
        }
        table.replace_state(state);
        tracing::debug!(table = %table.name(), "table reloaded");
        Ok(())
    }

    /// Stores the table's current views in the snapshot cache.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Cache`] if no cache is attached or it fails.
    pub fn cache_table(&self, table: &Table) -> SyncResult<()> {
        let cache = self
            .cache
            .as_ref()
            .ok_or_else(|| SyncError::cache("no snapshot cache configured"))?;
        let snapshot = table.state().read().snapshot();
        cache.save(table.database_id(), &snapshot)
    }

    /// Writes every edited local cell of `table` back to the remote.
    ///
    /// Cells are patched one at a time in diff order. Only cells the remote
    /// accepted are reconciled; skipped, rejected and failed cells stay
    /// pending. With `cascade`, edits made through joined `relation|column`
    /// cells are pushed into the related tables, each related table then
    /// runs its own write-back once, and the joined baselines are refreshed
    /// from them.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::CyclicRelation`] if the relation graph reachable
    /// from `table` loops back onto a table already on its path. The check
    /// runs before any remote call. Per-cell failures are reported, not
    /// raised.
    pub fn writes(&self, table: &Table, cascade: bool) -> SyncResult<WriteReport> {
        let mut path = Vec::new();
        if cascade {
            check_cascade_path(table, &mut path)?;
        }
        self.write_table(table, cascade, &mut path)
    }

    fn write_table(
        &self,
        table: &Table,
        cascade: bool,
        path: &mut Vec<Table>,
    ) -> SyncResult<WriteReport> {
        guard_path(path, table)?;
        path.push(table.clone());
        let result = self.write_cells(table).and_then(|mut report| {
            if cascade {
                self.cascade(table, &mut report, path)?;
            }
            Ok(report)
        });
        path.pop();
        result
    }

    fn write_cells(&self, table: &Table) -> SyncResult<WriteReport> {
        let mut report = WriteReport::new(table.name());
        let changes = table.diff();
        if changes.is_empty() {
            tracing::info!("No update for table: {}", table.name());
            return Ok(report);
        }

        let schema = table.schema();
        for change in changes {
            let outcome = self.write_cell(table, &schema, &change)?;
            report.outcomes.push(CellOutcome { change, outcome });
        }
        Ok(report)
    }

    fn write_cell(
        &self,
        table: &Table,
        schema: &SchemaTracker,
        change: &CellChange,
    ) -> SyncResult<WriteOutcome> {
        let Some(kind) = schema.kind_of(&change.column) else {
            tracing::warn!(column = %change.column, "column not in schema, skip writing");
            return Ok(WriteOutcome::SkippedUnsupported);
        };

        let value = match kind.encode(&change.new_value) {
            Ok(value) => value,
            Err(CodecError::ComputedField { .. }) => {
                tracing::warn!(
                    column = %change.column,
                    kind = %kind,
                    "column is computed, skip writing"
                );
                return Ok(WriteOutcome::SkippedComputed);
            }
            Err(CodecError::UnsupportedType { .. }) => {
                tracing::warn!(
                    column = %change.column,
                    kind = %kind,
                    "type not supported, skip writing"
                );
                return Ok(WriteOutcome::SkippedUnsupported);
            }
            Err(e) => {
                tracing::warn!(
                    record = %change.record_id,
                    column = %change.column,
                    error = %e,
                    "value rejected, skip writing"
                );
                return Ok(WriteOutcome::Rejected {
                    reason: e.to_string(),
                });
            }
        };

        self.throttle();
        let request = PatchRequest::new(&change.record_id, &change.column, kind.tag(), value);
        Ok(match self.store.patch(&request) {
            Ok(response) if response.is_success() => {
                tracing::info!(
                    "record {}: column {} set {} -> {}",
                    change.record_id,
                    change.column,
                    change.old_value,
                    change.new_value
                );
                table.state().write().reconcile(change)?;
                WriteOutcome::Applied {
                    status: response.status.unwrap_or(200),
                }
            }
            Ok(response) => {
                let message = response.message.unwrap_or_default();
                tracing::warn!(
                    record = %change.record_id,
                    column = %change.column,
                    status = ?response.status,
                    message = %message,
                    "update rejected by remote"
                );
                WriteOutcome::Failed {
                    status: response.status,
                    message,
                }
            }
            Err(e) => {
                tracing::warn!(
                    record = %change.record_id,
                    column = %change.column,
                    error = %e,
                    "update failed without status"
                );
                WriteOutcome::Failed {
                    status: None,
                    message: e.to_string(),
                }
            }
        })
    }

    fn cascade(
        &self,
        table: &Table,
        report: &mut WriteReport,
        path: &mut Vec<Table>,
    ) -> SyncResult<()> {
        let relations = joined_relations(table);

        for (relation, target) in &relations {
            let edits = table.state().read().pending_relation_edits(relation);
            if edits.is_empty() {
                continue;
            }
            let applied = target.state().write().apply_foreign_edits(&edits);
            tracing::debug!(
                relation = %relation,
                target = %target.name(),
                edits = edits.len(),
                applied,
                "pushed joined edits to related table"
            );
        }

        let mut written: Vec<&Table> = Vec::new();
        for (_, target) in &relations {
            if written.iter().any(|t| t.same_table(target)) {
                continue;
            }
            written.push(target);
            report.cascaded.push(self.write_table(target, true, path)?);
        }

        for (relation, target) in &relations {
            let updated = target.merged();
            let refreshed = table
                .state()
                .write()
                .apply_cascaded_update(relation, &updated);
            if refreshed > 0 {
                tracing::debug!(relation = %relation, cells = refreshed, "refreshed joined baseline");
            }
        }
        Ok(())
    }
}

/// Relation-typed columns of `table` with their targets, in declaration
/// order.
fn joined_relations(table: &Table) -> Vec<(String, Table)> {
    let schema = table.schema();
    let relations = table.relations();
    relations
        .iter()
        .filter(|(relation, _)| schema.kind_of(relation).is_some_and(FieldKind::is_relation))
        .map(|(relation, spec)| (relation.to_string(), spec.target.clone()))
        .collect()
}

fn guard_path(path: &[Table], table: &Table) -> SyncResult<()> {
    if path.iter().any(|t| t.same_table(table)) {
        let mut names: Vec<String> = path.iter().map(|t| t.name().to_string()).collect();
        names.push(table.name().to_string());
        return Err(SyncError::CyclicRelation { path: names });
    }
    Ok(())
}

/// Walks every cascade path from `table` without touching the remote.
fn check_cascade_path(table: &Table, path: &mut Vec<Table>) -> SyncResult<()> {
    guard_path(path, table)?;
    path.push(table.clone());
    let mut visited: Vec<Table> = Vec::new();
    let result = joined_relations(table).into_iter().try_for_each(|(_, target)| {
        if visited.iter().any(|t| t.same_table(&target)) {
            return Ok(());
        }
        visited.push(target.clone());
        check_cascade_path(&target, path)
    });
    path.pop();
    result
}

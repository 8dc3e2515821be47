//! Remote store abstraction.

use crate::error::{RemoteError, RemoteResult};
use crate::record::{PatchRequest, PatchResponse, QueryPage, RemoteProperty, RemoteRecord};
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// A remote tabular store with paginated reads and single-cell writes.
///
/// This trait abstracts the transport, allowing for different implementations
/// (HTTP, in-memory for testing, etc.).
pub trait RemoteStore: Send + Sync {
    /// Fetches one page of a database, starting at `cursor`.
    fn query(&self, database_id: &str, cursor: Option<&str>) -> RemoteResult<QueryPage>;

    /// Updates a single cell.
    ///
    /// A non-success status is returned as a [`PatchResponse`], not an error.
    /// Errors mean no status was received at all.
    fn patch(&self, request: &PatchRequest) -> RemoteResult<PatchResponse>;
}

/// How [`MemoryStore`] should fail patches for a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatchFailure {
    /// Answer with a non-success status and message.
    Status(u16, String),
    /// Fail without any status.
    Transport(String),
}

/// An in-memory remote store for testing.
///
/// Queries are paginated with numeric cursors. Successful patches are applied
/// to the stored record so that a later query observes them.
#[derive(Debug)]
pub struct MemoryStore {
    databases: RwLock<BTreeMap<String, Vec<RemoteRecord>>>,
    page_size: usize,
    reachable: AtomicBool,
    queries: AtomicUsize,
    patches: RwLock<Vec<PatchRequest>>,
    failures: RwLock<HashMap<String, PatchFailure>>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self {
            databases: RwLock::new(BTreeMap::new()),
            page_size: 100,
            reachable: AtomicBool::new(true),
            queries: AtomicUsize::new(0),
            patches: RwLock::new(Vec::new()),
            failures: RwLock::new(HashMap::new()),
        }
    }

    /// Sets the number of records returned per page.
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Adds or replaces a database.
    pub fn insert_database(&self, database_id: impl Into<String>, records: Vec<RemoteRecord>) {
        self.databases.write().insert(database_id.into(), records);
    }

    /// Appends a record to a database, creating the database if needed.
    pub fn insert_record(&self, database_id: &str, record: RemoteRecord) {
        self.databases
            .write()
            .entry(database_id.to_string())
            .or_default()
            .push(record);
    }

    /// Returns a copy of a stored record.
    pub fn record(&self, record_id: &str) -> Option<RemoteRecord> {
        self.databases
            .read()
            .values()
            .flatten()
            .find(|r| r.id == record_id)
            .cloned()
    }

    /// Makes every future patch of `record_id` fail.
    pub fn fail_patches_for(&self, record_id: impl Into<String>, failure: PatchFailure) {
        self.failures.write().insert(record_id.into(), failure);
    }

    /// Sets whether the store answers at all.
    pub fn set_reachable(&self, reachable: bool) {
        self.reachable.store(reachable, Ordering::SeqCst);
    }

    /// All patch requests received so far, in order.
    pub fn patches(&self) -> Vec<PatchRequest> {
        self.patches.read().clone()
    }

    /// Number of patch requests received so far.
    pub fn patch_count(&self) -> usize {
        self.patches.read().len()
    }

    /// Number of query requests received so far.
    pub fn query_count(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }

    fn check_reachable(&self) -> RemoteResult<()> {
        if self.reachable.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(RemoteError::transport_retryable("remote store unreachable"))
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl RemoteStore for MemoryStore {
    fn query(&self, database_id: &str, cursor: Option<&str>) -> RemoteResult<QueryPage> {
        self.check_reachable()?;
        self.queries.fetch_add(1, Ordering::SeqCst);

        let databases = self.databases.read();
        let records = databases
            .get(database_id)
            .ok_or_else(|| RemoteError::DatabaseNotFound(database_id.to_string()))?;

        let start = match cursor {
            Some(c) => c
                .parse::<usize>()
                .map_err(|_| RemoteError::Protocol(format!("invalid cursor {c}")))?,
            None => 0,
        };
        let end = (start + self.page_size).min(records.len());
        let has_more = end < records.len();

        Ok(QueryPage {
            results: records.get(start..end).unwrap_or_default().to_vec(),
            has_more,
            next_cursor: has_more.then(|| end.to_string()),
        })
    }

    fn patch(&self, request: &PatchRequest) -> RemoteResult<PatchResponse> {
        self.check_reachable()?;
        self.patches.write().push(request.clone());

        if let Some(failure) = self.failures.read().get(&request.record_id) {
            return match failure {
                PatchFailure::Status(status, message) => {
                    Ok(PatchResponse::error(*status, message.clone()))
                }
                PatchFailure::Transport(message) => {
                    Err(RemoteError::transport_retryable(message.clone()))
                }
            };
        }

        let mut databases = self.databases.write();
        let Some(record) = databases
            .values_mut()
            .flatten()
            .find(|r| r.id == request.record_id)
        else {
            return Ok(PatchResponse::error(
                404,
                format!("Could not find page with ID: {}", request.record_id),
            ));
        };

        record
            .properties
            .entry(request.column.clone())
            .and_modify(|p| p.set_raw(request.value.clone()))
            .or_insert_with(|| RemoteProperty::new(&request.type_tag, request.value.clone()));

        Ok(PatchResponse::with_status(200))
    }
}

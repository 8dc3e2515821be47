//! # Tablesync Engine
//!
//! Schema-aware load, diff and write-back of remote relational tables.
//!
//! This crate provides:
//! - Column type discovery while records are decoded
//! - Relation joins and rollup resolution
//! - A baseline (`merged`) and editable (`live`) view per table
//! - Cell-level diffs and single-cell write-back
//! - Cascades through joined relation columns into related tables
//! - Optional snapshot caching (in memory or CBOR files)
//!
//! ## Architecture
//!
//! Loading a table follows a fixed pipeline:
//! 1. Fetch every page from the [`tablesync_remote::RemoteStore`]
//! 2. Decode each record, relations before rollups
//! 3. Drop rows where only remote-populated columns hold values
//! 4. Left-join every relation target's `merged` view as `relation|column`
//! 5. Project the editable `live` view
//!
//! Write-back diffs `live` against `merged` on local columns, patches each
//! changed cell, and reconciles only the cells the remote accepted.
//!
//! ## Key Invariants
//!
//! - A column's kind is fixed by its first observation within a load
//! - `live` equals `merged` outside of uncommitted edits
//! - Formula and rollup columns are never written
//! - Joins always read the target's baseline, never its edits
//! - A cascade never re-enters a table already on its path
//!
//! ## Example
//!
//! ```
//! use tablesync_engine::{SyncConfig, SyncEngine, TableDef};
//! use tablesync_remote::{MemoryStore, RemoteProperty, RemoteRecord};
//! use serde_json::json;
//!
//! let store = MemoryStore::new();
//! store.insert_database(
//!     "orders-db",
//!     vec![RemoteRecord::new("o1")
//!         .with_property("price", RemoteProperty::new("number", json!(12.5)))],
//! );
//!
//! let engine = SyncEngine::new(SyncConfig::new().without_throttle(), store);
//! let orders = engine.open_table(TableDef::new("orders-db").named("orders")).unwrap();
//! orders.set("o1", "price", 13.0).unwrap();
//!
//! let report = engine.writes(&orders, true).unwrap();
//! assert_eq!(report.applied(), 1);
//! assert!(orders.diff().is_empty());
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod cache;
mod config;
mod engine;
mod error;
mod frame;
mod relation;
mod schema;
mod state;
mod table;

pub use cache::{FileCache, MemoryCache, SnapshotCache, TableSnapshot};
pub use config::SyncConfig;
pub use engine::{CellOutcome, SyncEngine, WriteOutcome, WriteReport};
pub use error::{SyncError, SyncResult};
pub use frame::{
    is_namespaced, namespaced, split_namespace, Frame, Row, NAMESPACE_SEPARATOR,
    RECORD_ID_COLUMN,
};
pub use relation::{RelationResolver, RelationSpec, Relations};
pub use schema::SchemaTracker;
pub use state::{diff, CellChange, DiffScope, TableState};
pub use table::{CacheMode, Table, TableDef};

//! Local snapshot caches.

use crate::error::{SyncError, SyncResult};
use crate::frame::Frame;
use crate::schema::SchemaTracker;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};

/// Both views of a table plus the schema they were decoded with.
#[derive(Debug, Clone, PartialEq)]
pub struct TableSnapshot {
    /// Discovered schema.
    pub schema: SchemaTracker,
    /// Baseline view.
    pub merged: Frame,
    /// Editable view.
    pub live: Frame,
}

/// A keyed store of table snapshots.
///
/// The format is private to each implementation. The only contract is that
/// `load` returns what the last `save` stored for the same key, and nothing
/// after `clear`.
///
/// # Implementors
///
/// - [`MemoryCache`] - For testing
/// - [`FileCache`] - One pair of CBOR files per key
pub trait SnapshotCache: Send + Sync {
    /// Returns the stored snapshot, if any.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Cache`] if a stored snapshot cannot be read.
    fn load(&self, key: &str) -> SyncResult<Option<TableSnapshot>>;

    /// Stores a snapshot, replacing any previous one.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Cache`] if the snapshot cannot be written.
    fn save(&self, key: &str, snapshot: &TableSnapshot) -> SyncResult<()>;

    /// Removes the stored snapshot, if any.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Cache`] if the snapshot exists but cannot be
    /// removed.
    fn clear(&self, key: &str) -> SyncResult<()>;
}

/// An in-memory snapshot cache.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: RwLock<HashMap<String, TableSnapshot>>,
}

impl MemoryCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored snapshots.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Returns true if nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl SnapshotCache for MemoryCache {
    fn load(&self, key: &str) -> SyncResult<Option<TableSnapshot>> {
        Ok(self.entries.read().get(key).cloned())
    }

    fn save(&self, key: &str, snapshot: &TableSnapshot) -> SyncResult<()> {
        self.entries
            .write()
            .insert(key.to_string(), snapshot.clone());
        Ok(())
    }

    fn clear(&self, key: &str) -> SyncResult<()> {
        self.entries.write().remove(key);
        Ok(())
    }
}

#[derive(Serialize, Deserialize)]
struct MergedFile {
    schema: SchemaTracker,
    frame: Frame,
}

/// A directory of CBOR snapshot files.
///
/// Each key is stored as `<key>.live.cbor` (the editable view) and
/// `<key>.merged.cbor` (schema and baseline). A key is only considered
/// cached when both files exist.
#[derive(Debug, Clone)]
pub struct FileCache {
    dir: PathBuf,
}

impl FileCache {
    /// Opens a cache directory, creating it if needed.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Cache`] if the directory cannot be created.
    pub fn open(dir: impl AsRef<Path>) -> SyncResult<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)
            .map_err(|e| SyncError::cache(format!("create {}: {e}", dir.display())))?;
        Ok(Self { dir })
    }

    /// The cache directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn live_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.live.cbor"))
    }

    fn merged_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.merged.cbor"))
    }
}

fn write_cbor<T: Serialize>(path: &Path, value: &T) -> SyncResult<()> {
    let file = File::create(path)
        .map_err(|e| SyncError::cache(format!("create {}: {e}", path.display())))?;
    let mut writer = BufWriter::new(file);
    ciborium::ser::into_writer(value, &mut writer)
        .map_err(|e| SyncError::cache(format!("encode {}: {e}", path.display())))?;
    writer
        .flush()
        .map_err(|e| SyncError::cache(format!("flush {}: {e}", path.display())))
}

fn read_cbor<T: for<'de> Deserialize<'de>>(path: &Path) -> SyncResult<T> {
    let file = File::open(path)
        .map_err(|e| SyncError::cache(format!("open {}: {e}", path.display())))?;
    ciborium::de::from_reader(BufReader::new(file))
        .map_err(|e| SyncError::cache(format!("decode {}: {e}", path.display())))
}

fn remove_if_present(path: &Path) -> SyncResult<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(SyncError::cache(format!("remove {}: {e}", path.display()))),
    }
}

impl SnapshotCache for FileCache {
    fn load(&self, key: &str) -> SyncResult<Option<TableSnapshot>> {
        let live_path = self.live_path(key);
        let merged_path = self.merged_path(key);
        if !live_path.exists() || !merged_path.exists() {
            return Ok(None);
        }
        let live: Frame = read_cbor(&live_path)?;
        let merged: MergedFile = read_cbor(&merged_path)?;
        Ok(Some(TableSnapshot {
            schema: merged.schema,
            merged: merged.frame,
            live,
        }))
    }

    fn save(&self, key: &str, snapshot: &TableSnapshot) -> SyncResult<()> {
        write_cbor(&self.live_path(key), &snapshot.live)?;
        write_cbor(
            &self.merged_path(key),
            &MergedFile {
                schema: snapshot.schema.clone(),
                frame: snapshot.merged.clone(),
            },
        )
    }

    fn clear(&self, key: &str) -> SyncResult<()> {
        remove_if_present(&self.live_path(key))?;
        remove_if_present(&self.merged_path(key))
    }
}

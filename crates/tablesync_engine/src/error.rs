//! Error types for the sync engine.

use tablesync_codec::CodecError;
use tablesync_remote::RemoteError;
use thiserror::Error;

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that abort a load, resolve or write cycle.
///
/// Per-cell problems during write-back (unsupported or computed columns,
/// failed patches) are not errors; they are reported in a
/// [`crate::WriteReport`].
#[derive(Error, Debug)]
pub enum SyncError {
    /// Relation configuration is inconsistent with the table schema.
    #[error("configuration error: {0}")]
    Config(String),

    /// A cascade re-entered a table already on its path.
    #[error("cyclic relation cascade: {}", path.join(" -> "))]
    CyclicRelation {
        /// Tables on the cascade path, ending with the repeated one.
        path: Vec<String>,
    },

    /// Remote store error (including missing credentials).
    #[error("remote error: {0}")]
    Remote(#[from] RemoteError),

    /// Codec error.
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    /// No row with this record id.
    #[error("unknown record: {0}")]
    UnknownRecord(String),

    /// No editable column with this name.
    #[error("unknown column: {0}")]
    UnknownColumn(String),

    /// Snapshot cache failure.
    #[error("cache error: {0}")]
    Cache(String),
}

impl SyncError {
    /// Creates a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Creates a cache error.
    pub fn cache(message: impl Into<String>) -> Self {
        Self::Cache(message.into())
    }

    /// Returns true for configuration problems, including cycles.
    pub fn is_config(&self) -> bool {
        matches!(self, SyncError::Config(_) | SyncError::CyclicRelation { .. })
    }

    /// Returns true if the credential was missing or rejected.
    pub fn is_credential(&self) -> bool {
        matches!(self, SyncError::Remote(RemoteError::Credential(_)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_kinds() {
        assert!(SyncError::config("rollup without relation").is_config());
        assert!(SyncError::CyclicRelation {
            path: vec!["a".into(), "b".into(), "a".into()]
        }
        .is_config());
        assert!(SyncError::from(RemoteError::Credential("missing".into())).is_credential());
        assert!(!SyncError::UnknownColumn("x".into()).is_config());
    }

    #[test]
    fn error_display() {
        let err = SyncError::CyclicRelation {
            path: vec!["orders".into(), "products".into(), "orders".into()],
        };
        assert_eq!(
            err.to_string(),
            "cyclic relation cascade: orders -> products -> orders"
        );
    }
}

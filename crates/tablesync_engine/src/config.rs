//! Configuration for the sync engine.

use std::time::Duration;

/// Configuration for sync operations.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Pause before each remote call after the first. Courtesy throttle only.
    pub request_interval: Duration,
    /// Display names default to this many trailing characters of the database id.
    pub table_name_len: usize,
}

impl SyncConfig {
    /// Creates a configuration with default values.
    pub fn new() -> Self {
        Self {
            request_interval: Duration::from_millis(100),
            table_name_len: 8,
        }
    }

    /// Sets the pause between remote calls.
    pub fn with_request_interval(mut self, interval: Duration) -> Self {
        self.request_interval = interval;
        self
    }

    /// Disables the pause between remote calls.
    pub fn without_throttle(self) -> Self {
        self.with_request_interval(Duration::ZERO)
    }

    /// Sets the length of default table display names.
    pub fn with_table_name_len(mut self, len: usize) -> Self {
        self.table_name_len = len;
        self
    }

    /// Default display name for a database id.
    pub fn table_name(&self, database_id: &str) -> String {
        let skip = database_id.chars().count().saturating_sub(self.table_name_len);
        database_id.chars().skip(skip).collect()
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sync_config_builder() {
        let config = SyncConfig::new()
            .with_request_interval(Duration::from_millis(5))
            .with_table_name_len(4);

        assert_eq!(config.request_interval, Duration::from_millis(5));
        assert_eq!(config.table_name("15f5ba9898b6801d"), "801d");
        assert_eq!(SyncConfig::new().without_throttle().request_interval, Duration::ZERO);
    }

    #[test]
    fn short_ids_are_kept_whole() {
        assert_eq!(SyncConfig::default().table_name("abc"), "abc");
    }
}

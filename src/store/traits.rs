//! Record store trait and error types
//!
//! This module defines the trait interface for record store backends and
//! associated error types.

use crate::harvest::PhotoRecord;
use thiserror::Error;

/// Errors that can occur during store operations
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Corrupt record at {0}: missing photo_id")]
    CorruptRecord(String),

    #[error("Run not found: {0}")]
    RunNotFound(i64),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Trait for record store backends
///
/// The store holds one hash-like record per photo and any number of named
/// ordered indexes. Implementations must tolerate concurrent calls from every
/// persistence worker; serialization, if needed, is the backend's business.
pub trait RecordStore: Send + Sync {
    // ===== Writes =====

    /// Stores `record` under `key`, replacing whatever was stored there
    ///
    /// Fields absent from the record are removed, so a rewrite never leaves
    /// values from an earlier write behind.
    fn write_record(&self, key: &str, record: &PhotoRecord) -> StoreResult<()>;

    /// Adds `member` to the ordered index `index_name`, or updates its score
    fn add_to_index(&self, index_name: &str, score: f64, member: &str) -> StoreResult<()>;

    /// Stores `record` under `key` and indexes `key` in `index_name`
    ///
    /// Backends that can should apply both writes atomically. The default
    /// runs them one after the other.
    fn write_indexed_record(
        &self,
        key: &str,
        record: &PhotoRecord,
        index_name: &str,
        score: f64,
    ) -> StoreResult<()> {
        self.write_record(key, record)?;
        self.add_to_index(index_name, score, key)
    }

    // ===== Reads =====

    /// Reads the record stored under `key`
    fn read_record(&self, key: &str) -> StoreResult<Option<PhotoRecord>>;

    /// Returns every member of `index_name`, ordered by score then member
    fn index_members(&self, index_name: &str) -> StoreResult<Vec<String>>;

    /// Counts stored records
    fn count_records(&self) -> StoreResult<u64>;
}

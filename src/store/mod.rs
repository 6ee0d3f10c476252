//! Record store for harvested photo metadata
//!
//! This module handles all persistence, including:
//! - The [`RecordStore`] trait the persistence workers write through
//! - SQLite-backed records and ordered indexes
//! - Harvest run tracking for `--stats`

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteRecordStore;
pub use traits::{RecordStore, StoreError, StoreResult};

use crate::HarvestError;
use std::path::Path;

/// Opens (creating if needed) the SQLite record store at `path`
pub fn open_store(path: &Path) -> Result<SqliteRecordStore, HarvestError> {
    Ok(SqliteRecordStore::open(path)?)
}

/// Represents a harvest run in the database
#[derive(Debug, Clone)]
pub struct RunRecord {
    pub id: i64,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub config_hash: String,
    pub status: RunStatus,
    pub photos_enqueued: u64,
    pub records_written: u64,
    pub failed_writes: u64,
    pub degraded_fields: u64,
    pub elapsed_ms: Option<u64>,
}

/// Counters recorded when a run finishes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunTotals {
    pub photos_enqueued: u64,
    pub records_written: u64,
    pub failed_writes: u64,
    pub degraded_fields: u64,
    pub elapsed_ms: u64,
}

/// Status of a harvest run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Running,
    Completed,
    /// Finished, but some records could not be written
    Incomplete,
    Cancelled,
    Failed,
}

impl RunStatus {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Incomplete => "incomplete",
            Self::Cancelled => "cancelled",
            Self::Failed => "failed",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "incomplete" => Some(Self::Incomplete),
            "cancelled" => Some(Self::Cancelled),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

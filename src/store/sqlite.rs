//! SQLite record store implementation
//!
//! This module provides a SQLite-based implementation of the RecordStore trait.

use crate::harvest::PhotoRecord;
use crate::store::schema::initialize_schema;
use crate::store::traits::{RecordStore, StoreError, StoreResult};
use crate::store::{RunRecord, RunStatus, RunTotals};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

/// SQLite record store backend
///
/// The connection sits behind a mutex, so concurrent persistence workers are
/// serialized here rather than in the pipeline.
pub struct SqliteRecordStore {
    conn: Mutex<Connection>,
}

impl SqliteRecordStore {
    /// Opens or creates the database at `path`
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteRecordStore)` - Successfully opened/created database
    /// * `Err(StoreError)` - Failed to open database
    pub fn open(path: &Path) -> StoreResult<Self> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
            PRAGMA busy_timeout = 5000;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Creates an in-memory database
    pub fn open_in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| StoreError::Database("connection mutex poisoned".to_string()))
    }

    // ===== Run Management =====

    /// Creates a new harvest run in the `running` state
    pub fn create_run(&self, config_hash: &str) -> StoreResult<i64> {
        let conn = self.lock()?;
        let now = Utc::now().to_rfc3339();
        conn.execute(
            "INSERT INTO harvest_runs (started_at, config_hash, status) VALUES (?1, ?2, ?3)",
            params![now, config_hash, RunStatus::Running.to_db_string()],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Marks a run as finished with its final status and counters
    pub fn finish_run(&self, run_id: i64, status: RunStatus, totals: RunTotals) -> StoreResult<()> {
        let conn = self.lock()?;
        let now = Utc::now().to_rfc3339();
        let updated = conn.execute(
            "UPDATE harvest_runs
             SET status = ?1, finished_at = ?2, photos_enqueued = ?3, records_written = ?4,
                 failed_writes = ?5, degraded_fields = ?6, elapsed_ms = ?7
             WHERE id = ?8",
            params![
                status.to_db_string(),
                now,
                totals.photos_enqueued as i64,
                totals.records_written as i64,
                totals.failed_writes as i64,
                totals.degraded_fields as i64,
                totals.elapsed_ms as i64,
                run_id
            ],
        )?;

        if updated == 0 {
            return Err(StoreError::RunNotFound(run_id));
        }
        Ok(())
    }

    /// Gets the most recent run
    pub fn latest_run(&self) -> StoreResult<Option<RunRecord>> {
        let conn = self.lock()?;
        let run = conn
            .query_row(
                "SELECT id, started_at, finished_at, config_hash, status, photos_enqueued,
                        records_written, failed_writes, degraded_fields, elapsed_ms
                 FROM harvest_runs ORDER BY id DESC LIMIT 1",
                [],
                |row| {
                    Ok(RunRecord {
                        id: row.get(0)?,
                        started_at: row.get(1)?,
                        finished_at: row.get(2)?,
                        config_hash: row.get(3)?,
                        status: RunStatus::from_db_string(&row.get::<_, String>(4)?)
                            .unwrap_or(RunStatus::Failed),
                        photos_enqueued: row.get::<_, i64>(5)? as u64,
                        records_written: row.get::<_, i64>(6)? as u64,
                        failed_writes: row.get::<_, i64>(7)? as u64,
                        degraded_fields: row.get::<_, i64>(8)? as u64,
                        elapsed_ms: row.get::<_, Option<i64>>(9)?.map(|ms| ms as u64),
                    })
                },
            )
            .optional()?;

        Ok(run)
    }

    /// Counts runs by status
    pub fn count_runs(&self, status: RunStatus) -> StoreResult<u64> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM harvest_runs WHERE status = ?1",
            params![status.to_db_string()],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }
}

/// Replaces every stored field of `key` with the fields of `record`
fn replace_record(conn: &Connection, key: &str, record: &PhotoRecord) -> StoreResult<()> {
    let now = Utc::now().to_rfc3339();
    conn.execute("DELETE FROM records WHERE key = ?1", params![key])?;

    let mut stmt = conn.prepare_cached(
        "INSERT INTO records (key, field, value, updated_at) VALUES (?1, ?2, ?3, ?4)",
    )?;
    for (field, value) in record.fields() {
        stmt.execute(params![key, field, value, now])?;
    }
    Ok(())
}

fn upsert_index_entry(
    conn: &Connection,
    index_name: &str,
    score: f64,
    member: &str,
) -> StoreResult<()> {
    conn.execute(
        "INSERT INTO sorted_index (name, member, score) VALUES (?1, ?2, ?3)
         ON CONFLICT(name, member) DO UPDATE SET score = excluded.score",
        params![index_name, member, score],
    )?;
    Ok(())
}

impl RecordStore for SqliteRecordStore {
    fn write_record(&self, key: &str, record: &PhotoRecord) -> StoreResult<()> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        replace_record(&tx, key, record)?;
        tx.commit()?;
        Ok(())
    }

    fn add_to_index(&self, index_name: &str, score: f64, member: &str) -> StoreResult<()> {
        let conn = self.lock()?;
        upsert_index_entry(&conn, index_name, score, member)
    }

    fn write_indexed_record(
        &self,
        key: &str,
        record: &PhotoRecord,
        index_name: &str,
        score: f64,
    ) -> StoreResult<()> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        replace_record(&tx, key, record)?;
        upsert_index_entry(&tx, index_name, score, key)?;
        tx.commit()?;
        Ok(())
    }

    fn read_record(&self, key: &str) -> StoreResult<Option<PhotoRecord>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare_cached("SELECT field, value FROM records WHERE key = ?1")?;
        let fields = stmt
            .query_map(params![key], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        if fields.is_empty() {
            return Ok(None);
        }

        PhotoRecord::from_fields(fields.iter().map(|(f, v)| (f.as_str(), v.as_str())))
            .map(Some)
            .ok_or_else(|| StoreError::CorruptRecord(key.to_string()))
    }

    fn index_members(&self, index_name: &str) -> StoreResult<Vec<String>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare_cached(
            "SELECT member FROM sorted_index WHERE name = ?1 ORDER BY score, member",
        )?;
        let members = stmt
            .query_map(params![index_name], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(members)
    }

    fn count_records(&self) -> StoreResult<u64> {
        let conn = self.lock()?;
        let count: i64 =
            conn.query_row("SELECT COUNT(DISTINCT key) FROM records", [], |row| row.get(0))?;
        Ok(count as u64)
    }
}

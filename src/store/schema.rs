//! Database schema definitions
//!
//! Records are stored hash-style, one row per `(key, field)`, and indexes
//! sorted-set-style, one row per `(name, member)` with a score.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- One row per record field
CREATE TABLE IF NOT EXISTS records (
    key TEXT NOT NULL,
    field TEXT NOT NULL,
    value TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    PRIMARY KEY (key, field)
);

-- Named ordered indexes over record keys
CREATE TABLE IF NOT EXISTS sorted_index (
    name TEXT NOT NULL,
    member TEXT NOT NULL,
    score REAL NOT NULL,
    PRIMARY KEY (name, member)
);

CREATE INDEX IF NOT EXISTS idx_sorted_index_score ON sorted_index(name, score, member);

-- Track harvest runs
CREATE TABLE IF NOT EXISTS harvest_runs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    started_at TEXT NOT NULL,
    finished_at TEXT,
    config_hash TEXT NOT NULL,
    status TEXT NOT NULL,
    photos_enqueued INTEGER NOT NULL DEFAULT 0,
    records_written INTEGER NOT NULL DEFAULT 0,
    failed_writes INTEGER NOT NULL DEFAULT 0,
    degraded_fields INTEGER NOT NULL DEFAULT 0,
    elapsed_ms INTEGER
);
"#;

/// Initializes the database schema
///
/// # Arguments
///
/// * `conn` - The database connection
///
/// # Returns
///
/// * `Ok(())` - Schema initialized successfully
/// * `Err(rusqlite::Error)` - Failed to initialize schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}

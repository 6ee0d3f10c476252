//! Statistics generation from the record store
//!
//! This module provides functionality for extracting and displaying
//! harvest statistics from the store layer.

use crate::store::{RecordStore, RunRecord, RunStatus, SqliteRecordStore};
use crate::HarvestError;

/// Harvest statistics summary
#[derive(Debug, Clone)]
pub struct HarvestStatistics {
    /// Number of distinct records in the store
    pub total_records: u64,

    /// Number of keys in the ordered index
    pub indexed_records: u64,

    /// Runs that finished with failed writes
    pub incomplete_runs: u64,

    /// Most recent harvest run, if any
    pub latest_run: Option<RunRecord>,
}

/// Loads statistics from the store
///
/// # Arguments
///
/// * `store` - The store to query
/// * `index_name` - Name of the ordered index to count
///
/// # Returns
///
/// * `Ok(HarvestStatistics)` - Successfully loaded statistics
/// * `Err(HarvestError)` - Failed to query statistics
pub fn load_statistics(
    store: &SqliteRecordStore,
    index_name: &str,
) -> Result<HarvestStatistics, HarvestError> {
    let total_records = store.count_records()?;
    let indexed_records = store.index_members(index_name)?.len() as u64;
    let incomplete_runs = store.count_runs(RunStatus::Incomplete)?;
    let latest_run = store.latest_run()?;

    Ok(HarvestStatistics {
        total_records,
        indexed_records,
        incomplete_runs,
        latest_run,
    })
}

/// Prints statistics to stdout in a formatted manner
///
/// # Arguments
///
/// * `stats` - The statistics to display
pub fn print_statistics(stats: &HarvestStatistics) {
    println!("=== Harvest Statistics ===\n");

    println!("Overview:");
    println!("  Records stored: {}", stats.total_records);
    println!("  Records indexed: {}", stats.indexed_records);
    if stats.incomplete_runs > 0 {
        println!("  Runs with failed writes: {}", stats.incomplete_runs);
    }
    println!();

    let Some(run) = &stats.latest_run else {
        println!("No harvest runs recorded.");
        return;
    };

    println!("Latest Run (#{}):", run.id);
    println!("  Status: {}", run.status.to_db_string());
    println!("  Started: {}", run.started_at);
    if let Some(finished) = &run.finished_at {
        println!("  Finished: {}", finished);
    }
    if let Some(ms) = run.elapsed_ms {
        println!("  Elapsed: {:.3}s", ms as f64 / 1000.0);
    }
    println!("  Config hash: {}", run.config_hash);
    println!("  Photos enqueued: {}", run.photos_enqueued);
    println!("  Records written: {}", run.records_written);
    println!("  Degraded fields: {}", run.degraded_fields);
    println!("  Failed writes: {}", run.failed_writes);

    let success_rate = if run.photos_enqueued > 0 {
        (run.records_written as f64 / run.photos_enqueued as f64) * 100.0
    } else {
        0.0
    };
    println!();
    println!(
        "Success Rate: {:.1}% ({} / {} photos written)",
        success_rate, run.records_written, run.photos_enqueued
    );
}

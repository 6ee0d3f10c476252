//! Output module for run reports and store statistics
//!
//! This module handles:
//! - Printing the report of a finished harvest run
//! - Loading and printing statistics for `--stats`

pub mod stats;

pub use stats::{load_statistics, print_statistics, HarvestStatistics};

use crate::harvest::HarvestReport;

/// Prints a finished run's report to stdout
///
/// # Arguments
///
/// * `report` - The report returned by the harvester
pub fn print_report(report: &HarvestReport) {
    println!();
    println!("=== Harvest Report ===\n");

    if report.cancelled {
        println!("Run was cancelled before completion.\n");
    }

    println!("  Pages fetched: {}", report.pages_fetched);
    println!("  Photos enqueued: {}", report.photos_enqueued);
    println!("  Records extracted: {}", report.records_extracted);
    println!("  Records written: {}", report.records_written);
    println!("  Degraded fields: {}", report.degraded_fields);
    println!("  Failed writes: {}", report.failed_writes.len());

    if !report.failed_writes.is_empty() {
        println!();
        println!("Failed Writes:");
        for failed in &report.failed_writes {
            println!("  - {}: {}", failed.key, failed.error);
        }
    }

    println!();
    println!("Elapsed time: {:.3}s", report.elapsed.as_secs_f64());
}

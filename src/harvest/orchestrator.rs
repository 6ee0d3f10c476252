//! Harvest orchestration
//!
//! A run moves through a fixed sequence of stages:
//!
//! `INIT → FETCH_PAGES → ENQUEUE → SPAWN_FETCH_WORKERS → SPAWN_PERSIST_WORKERS → AWAIT_DRAIN → DONE`
//!
//! Result pages are fetched up front, every handle is queued, both worker
//! pools are started, and the run waits for the intake queue and then the
//! persistence queue to drain. The pools are torn down before `run` returns.

use crate::config::Config;
use crate::harvest::workers::{fetch_worker, persist_worker, FailedWrite, Pipeline};
use crate::harvest::Extractor;
use crate::progress::ProgressSink;
use crate::source::{PhotoHandle, PhotoSource};
use crate::store::{RecordStore, RunStatus, RunTotals};
use crate::HarvestError;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::{JoinError, JoinSet};
use tokio_util::sync::CancellationToken;

/// Everything a run needs, built once by the caller
#[derive(Clone)]
pub struct HarvestContext {
    pub config: Config,
    pub source: Arc<dyn PhotoSource>,
    pub store: Arc<dyn RecordStore>,
    pub progress: Arc<dyn ProgressSink>,
}

/// Orchestrator stages, in order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HarvestStage {
    Init,
    FetchPages,
    Enqueue,
    SpawnFetchWorkers,
    SpawnPersistWorkers,
    AwaitDrain,
    Done,
}

impl fmt::Display for HarvestStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Init => "INIT",
            Self::FetchPages => "FETCH_PAGES",
            Self::Enqueue => "ENQUEUE",
            Self::SpawnFetchWorkers => "SPAWN_FETCH_WORKERS",
            Self::SpawnPersistWorkers => "SPAWN_PERSIST_WORKERS",
            Self::AwaitDrain => "AWAIT_DRAIN",
            Self::Done => "DONE",
        };
        f.write_str(name)
    }
}

/// Outcome of one harvest run
#[derive(Debug, Clone, Default)]
pub struct HarvestReport {
    pub pages_fetched: u32,
    pub photos_enqueued: u64,
    pub records_extracted: u64,
    pub records_written: u64,
    pub degraded_fields: u64,
    pub failed_writes: Vec<FailedWrite>,
    pub elapsed: Duration,
    pub cancelled: bool,
}

impl HarvestReport {
    /// True if every enqueued photo was written
    pub fn is_complete(&self) -> bool {
        !self.cancelled
            && self.failed_writes.is_empty()
            && self.records_written == self.photos_enqueued
    }

    /// Status to record for this run
    pub fn status(&self) -> RunStatus {
        if self.cancelled {
            RunStatus::Cancelled
        } else if self.is_complete() {
            RunStatus::Completed
        } else {
            RunStatus::Incomplete
        }
    }

    /// Counters to record for this run
    pub fn totals(&self) -> RunTotals {
        RunTotals {
            photos_enqueued: self.photos_enqueued,
            records_written: self.records_written,
            failed_writes: self.failed_writes.len() as u64,
            degraded_fields: self.degraded_fields,
            elapsed_ms: self.elapsed.as_millis() as u64,
        }
    }
}

enum DrainOutcome {
    Drained,
    Cancelled,
    WorkerExited(Result<(), JoinError>),
}

/// Runs the two-stage harvest pipeline
pub struct Harvester {
    ctx: HarvestContext,
}

impl Harvester {
    pub fn new(ctx: HarvestContext) -> Self {
        Self { ctx }
    }

    pub fn context(&self) -> &HarvestContext {
        &self.ctx
    }

    /// Harvests every configured page
    ///
    /// # Arguments
    ///
    /// * `cancel` - Stops the run early; the report is then marked cancelled
    ///
    /// # Returns
    ///
    /// * `Ok(HarvestReport)` - The run finished or was cancelled
    /// * `Err(HarvestError::PageFetch)` - A result page could not be fetched;
    ///   no worker was started
    /// * `Err(HarvestError::Worker)` - A worker task died mid-run
    pub async fn run(&self, cancel: CancellationToken) -> Result<HarvestReport, HarvestError> {
        let start = Instant::now();
        let harvest = &self.ctx.config.harvest;
        let mut report = HarvestReport::default();

        stage(HarvestStage::Init);
        let pipeline = Arc::new(Pipeline::new(
            harvest.persist_queue_capacity,
            Arc::clone(&self.ctx.store),
            self.ctx.config.store.clone(),
            Arc::clone(&self.ctx.progress),
        ));

        stage(HarvestStage::FetchPages);
        let handles = match self.fetch_pages(&cancel, &mut report).await? {
            Some(handles) => handles,
            None => {
                tracing::warn!("Harvest cancelled while fetching pages");
                report.cancelled = true;
                report.elapsed = start.elapsed();
                return Ok(report);
            }
        };

        stage(HarvestStage::Enqueue);
        for handle in handles {
            pipeline.intake.push(handle).await?;
            report.photos_enqueued += 1;
        }
        tracing::info!("Enqueued {} photos", report.photos_enqueued);

        let mut workers = JoinSet::new();

        stage(HarvestStage::SpawnFetchWorkers);
        let extractor = Extractor::new(pipeline.clone());
        for worker_id in 0..harvest.fetch_workers {
            workers.spawn(fetch_worker(
                worker_id,
                Arc::clone(&pipeline),
                extractor.clone(),
                cancel.clone(),
            ));
        }

        stage(HarvestStage::SpawnPersistWorkers);
        for worker_id in 0..harvest.persist_workers {
            workers.spawn(persist_worker(
                worker_id,
                Arc::clone(&pipeline),
                cancel.clone(),
            ));
        }

        stage(HarvestStage::AwaitDrain);
        // Fetch workers push before they ack, so once intake has joined every
        // record is already on the persistence queue.
        let drain = async {
            pipeline.intake.join().await;
            pipeline.persist.join().await;
        };
        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => DrainOutcome::Cancelled,
            _ = drain => DrainOutcome::Drained,
            Some(exit) = workers.join_next() => DrainOutcome::WorkerExited(exit),
        };

        pipeline.close();
        if !matches!(outcome, DrainOutcome::Drained) {
            workers.abort_all();
        }
        while let Some(exit) = workers.join_next().await {
            if let Err(e) = exit {
                if !e.is_cancelled() {
                    tracing::error!("Worker task failed during teardown: {}", e);
                }
            }
        }

        let counters = &pipeline.counters;
        report.records_extracted = counters.records_extracted();
        report.records_written = counters.records_written();
        report.degraded_fields = counters.degraded_fields();
        report.failed_writes = counters.failed_writes();
        report.elapsed = start.elapsed();

        match outcome {
            DrainOutcome::Drained => {}
            DrainOutcome::Cancelled => {
                tracing::warn!("Harvest cancelled while draining queues");
                report.cancelled = true;
            }
            DrainOutcome::WorkerExited(exit) => {
                let reason = match exit {
                    Ok(()) => "worker exited before the queues drained".to_string(),
                    Err(e) => e.to_string(),
                };
                return Err(HarvestError::Worker(reason));
            }
        }

        stage(HarvestStage::Done);
        tracing::info!(
            "Harvest finished: {} of {} records written in {:?}",
            report.records_written,
            report.photos_enqueued,
            report.elapsed
        );

        Ok(report)
    }

    /// Fetches every configured page in order
    ///
    /// Returns `None` if the run was cancelled first.
    async fn fetch_pages(
        &self,
        cancel: &CancellationToken,
        report: &mut HarvestReport,
    ) -> Result<Option<Vec<Box<dyn PhotoHandle>>>, HarvestError> {
        let flickr = &self.ctx.config.flickr;
        let harvest = &self.ctx.config.harvest;
        let mut handles = Vec::new();

        for page in harvest.pages() {
            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Ok(None),
                result = self.ctx.source.search(&flickr.owner_id, harvest.page_size, page) => result,
            };

            let photos = result.map_err(|source| HarvestError::PageFetch { page, source })?;
            tracing::info!("Page {} returned {} photos", page, photos.len());

            handles.extend(photos);
            report.pages_fetched += 1;
        }

        Ok(Some(handles))
    }
}

fn stage(stage: HarvestStage) {
    tracing::info!("Harvest stage: {}", stage);
}

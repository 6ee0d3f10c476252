//! Fetch and persistence worker pools
//!
//! Fetch workers turn photo handles from the intake queue into records on the
//! persistence queue; persistence workers write those records to the store.
//! Both loop until their queue is closed or the run is cancelled.

use crate::config::StoreConfig;
use crate::harvest::{Extractor, PhotoRecord};
use crate::progress::{ProgressEvent, ProgressSink};
use crate::queue::WorkQueue;
use crate::source::PhotoHandle;
use crate::store::{RecordStore, StoreResult};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio_util::sync::CancellationToken;

/// A record that could not be written to the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedWrite {
    pub key: String,
    pub error: String,
}

/// Thread-safe run counters shared by every worker
#[derive(Debug, Default)]
pub struct RunCounters {
    records_extracted: AtomicU64,
    records_written: AtomicU64,
    degraded_fields: AtomicU64,
    failed_writes: Mutex<Vec<FailedWrite>>,
}

impl RunCounters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records_extracted(&self) -> u64 {
        self.records_extracted.load(Ordering::Relaxed)
    }

    pub fn records_written(&self) -> u64 {
        self.records_written.load(Ordering::Relaxed)
    }

    pub fn degraded_fields(&self) -> u64 {
        self.degraded_fields.load(Ordering::Relaxed)
    }

    /// Failed writes recorded so far
    pub fn failed_writes(&self) -> Vec<FailedWrite> {
        self.failed_writes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn record_failure(&self, key: String, error: String) {
        self.failed_writes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(FailedWrite { key, error });
    }
}

/// State shared between the orchestrator and both worker pools
///
/// Also acts as the extractor's progress sink so degraded fields are counted
/// before being forwarded to the operator sink.
pub struct Pipeline {
    pub intake: WorkQueue<Box<dyn PhotoHandle>>,
    pub persist: WorkQueue<PhotoRecord>,
    pub store: Arc<dyn RecordStore>,
    pub store_config: Arc<StoreConfig>,
    pub progress: Arc<dyn ProgressSink>,
    pub counters: RunCounters,
}

impl Pipeline {
    pub fn new(
        persist_capacity: Option<usize>,
        store: Arc<dyn RecordStore>,
        store_config: StoreConfig,
        progress: Arc<dyn ProgressSink>,
    ) -> Self {
        Self {
            intake: WorkQueue::unbounded(),
            persist: WorkQueue::with_capacity(persist_capacity),
            store,
            store_config: Arc::new(store_config),
            progress,
            counters: RunCounters::new(),
        }
    }

    /// Closes both queues, releasing every idle worker
    pub fn close(&self) {
        self.intake.close();
        self.persist.close();
    }
}

impl ProgressSink for Pipeline {
    fn on_event(&self, event: ProgressEvent) {
        if let ProgressEvent::Degraded { .. } = event {
            self.counters.degraded_fields.fetch_add(1, Ordering::Relaxed);
        }
        self.progress.on_event(event);
    }
}

/// Writes one record together with its index entry
///
/// Returns the store key the record was written under.
pub fn persist_record(
    store: &dyn RecordStore,
    config: &StoreConfig,
    record: &PhotoRecord,
) -> StoreResult<String> {
    let key = config.record_key(&record.photo_id);
    store.write_indexed_record(&key, record, &config.index_name, record.index_score())?;
    Ok(key)
}

/// Fetch worker loop
///
/// Pops a handle, extracts its record, pushes the record for persistence and
/// only then acknowledges the handle.
pub async fn fetch_worker(
    worker_id: usize,
    pipeline: Arc<Pipeline>,
    extractor: Extractor,
    cancel: CancellationToken,
) {
    tracing::trace!("Fetch worker {} started", worker_id);

    loop {
        let handle = tokio::select! {
            _ = cancel.cancelled() => break,
            handle = pipeline.intake.pop() => match handle {
                Some(handle) => handle,
                None => break,
            },
        };

        let record = extractor.build_record(handle.as_ref()).await;
        let photo_id = record.photo_id.clone();
        let pushed = pipeline.persist.push(record).await;
        if pushed.is_ok() {
            pipeline
                .counters
                .records_extracted
                .fetch_add(1, Ordering::Relaxed);
        }

        if let Err(e) = pipeline.intake.ack() {
            tracing::error!("Fetch worker {} ack failed: {}", worker_id, e);
        }

        if let Err(e) = pushed {
            tracing::warn!(
                "Fetch worker {} dropped photo {}: {}",
                worker_id,
                photo_id,
                e
            );
            break;
        }

        pipeline
            .progress
            .on_event(ProgressEvent::Extracted { photo_id });
    }

    tracing::trace!("Fetch worker {} exiting", worker_id);
}

/// Persistence worker loop
///
/// Store calls are blocking, so each write runs on the blocking pool. A
/// failed write is recorded and the record is still acknowledged.
pub async fn persist_worker(worker_id: usize, pipeline: Arc<Pipeline>, cancel: CancellationToken) {
    tracing::trace!("Persistence worker {} started", worker_id);

    loop {
        let record = tokio::select! {
            _ = cancel.cancelled() => break,
            record = pipeline.persist.pop() => match record {
                Some(record) => record,
                None => break,
            },
        };

        let key = pipeline.store_config.record_key(&record.photo_id);
        let store = Arc::clone(&pipeline.store);
        let config = Arc::clone(&pipeline.store_config);
        let result =
            tokio::task::spawn_blocking(move || persist_record(store.as_ref(), &config, &record))
                .await;

        match result {
            Ok(Ok(key)) => {
                pipeline
                    .counters
                    .records_written
                    .fetch_add(1, Ordering::Relaxed);
                pipeline.progress.on_event(ProgressEvent::Persisted { key });
            }
            Ok(Err(e)) => fail_write(&pipeline, key, e.to_string()),
            Err(e) => fail_write(&pipeline, key, format!("write task failed: {}", e)),
        }

        if let Err(e) = pipeline.persist.ack() {
            tracing::error!("Persistence worker {} ack failed: {}", worker_id, e);
        }
    }

    tracing::trace!("Persistence worker {} exiting", worker_id);
}

fn fail_write(pipeline: &Pipeline, key: String, error: String) {
    tracing::error!("Failed to write record {}: {}", key, error);
    pipeline.progress.on_event(ProgressEvent::PersistFailed {
        key: key.clone(),
        error: error.clone(),
    });
    pipeline.counters.record_failure(key, error);
}

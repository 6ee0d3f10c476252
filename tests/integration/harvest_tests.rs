//! Integration tests for the harvest pipeline
//!
//! These tests run the full orchestrator against in-memory photo sources and
//! an in-memory SQLite store.

use photo_harvest::config::{Config, FlickrConfig, HarvestConfig, StoreConfig, DEFAULT_ENDPOINT};
use photo_harvest::harvest::{HarvestContext, Harvester, PhotoRecord};
use photo_harvest::progress::{ProgressEvent, ProgressSink};
use photo_harvest::source::{MemoryPhoto, MemorySource, PhotoSize};
use photo_harvest::store::{RecordStore, RunStatus, SqliteRecordStore, StoreError, StoreResult};
use photo_harvest::HarvestError;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Creates a test configuration for the given page range
fn create_test_config(first_page: u32, last_page: u32) -> Config {
    Config {
        flickr: FlickrConfig {
            api_key: "test-key".to_string(),
            owner_id: "12403504@N02".to_string(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            request_timeout_secs: 5,
        },
        harvest: HarvestConfig {
            page_size: 100,
            first_page,
            last_page,
            fetch_workers: 8,
            persist_workers: 3,
            persist_queue_capacity: None,
        },
        store: StoreConfig {
            database_path: ":memory:".to_string(),
            key_prefix: "flickr_".to_string(),
            index_name: "flickr".to_string(),
        },
    }
}

/// Collects every progress event
#[derive(Default)]
struct CollectingSink {
    events: Mutex<Vec<ProgressEvent>>,
}

impl CollectingSink {
    fn markers(&self) -> String {
        let mut markers: Vec<char> = self.events.lock().unwrap().iter().map(|e| e.marker()).collect();
        markers.sort_unstable();
        markers.into_iter().collect()
    }
}

impl ProgressSink for CollectingSink {
    fn on_event(&self, event: ProgressEvent) {
        self.events.lock().unwrap().push(event);
    }
}

/// Store that rejects writes for chosen keys
struct FailingStore {
    inner: SqliteRecordStore,
    failing_keys: Vec<String>,
}

impl RecordStore for FailingStore {
    fn write_record(&self, key: &str, record: &PhotoRecord) -> StoreResult<()> {
        if self.failing_keys.iter().any(|k| k == key) {
            return Err(StoreError::Database(format!("write rejected for {}", key)));
        }
        self.inner.write_record(key, record)
    }

    fn add_to_index(&self, index_name: &str, score: f64, member: &str) -> StoreResult<()> {
        self.inner.add_to_index(index_name, score, member)
    }

    fn read_record(&self, key: &str) -> StoreResult<Option<PhotoRecord>> {
        self.inner.read_record(key)
    }

    fn index_members(&self, index_name: &str) -> StoreResult<Vec<String>> {
        self.inner.index_members(index_name)
    }

    fn count_records(&self) -> StoreResult<u64> {
        self.inner.count_records()
    }
}

fn harvester(
    config: Config,
    source: MemorySource,
    store: Arc<dyn RecordStore>,
    sink: Arc<CollectingSink>,
) -> Harvester {
    Harvester::new(HarvestContext {
        config,
        source: Arc::new(source),
        store,
        progress: sink,
    })
}

fn full_photo(id: &str) -> MemoryPhoto {
    MemoryPhoto::new(id, format!("Photo {}", id))
        .with_description(format!("Description of {}", id))
        .with_original(format!("memory://o/{}.jpg", id), 800, 600)
}

#[tokio::test]
async fn test_three_photos_three_records() {
    let source = MemorySource::new().with_page(
        1,
        vec![full_photo("1"), full_photo("2"), full_photo("3")],
    );
    let store = Arc::new(SqliteRecordStore::open_in_memory().unwrap());
    let sink = Arc::new(CollectingSink::default());

    let report = harvester(create_test_config(1, 1), source, store.clone(), sink.clone())
        .run(CancellationToken::new())
        .await
        .unwrap();

    assert!(report.is_complete());
    assert_eq!(report.pages_fetched, 1);
    assert_eq!(report.photos_enqueued, 3);
    assert_eq!(report.records_extracted, 3);
    assert_eq!(report.records_written, 3);
    assert_eq!(report.degraded_fields, 0);

    assert_eq!(store.count_records().unwrap(), 3);
    assert_eq!(
        store.index_members("flickr").unwrap(),
        vec!["flickr_1", "flickr_2", "flickr_3"]
    );

    let record = store.read_record("flickr_2").unwrap().unwrap();
    assert_eq!(record.photo_id, "2");
    assert_eq!(record.title, "Photo 2");
    assert_eq!(record.description.as_deref(), Some("Description of 2"));
    assert_eq!(record.original_url.as_deref(), Some("memory://o/2.jpg"));
    assert_eq!(record.width, Some(800));
    assert!(record.is_complete());

    assert_eq!(sink.markers(), "oooxxx");
}

#[tokio::test]
async fn test_failed_description_still_persists() {
    let source = MemorySource::new().with_page(
        1,
        vec![full_photo("10").with_malformed_description(), full_photo("20")],
    );
    let store = Arc::new(SqliteRecordStore::open_in_memory().unwrap());
    let sink = Arc::new(CollectingSink::default());

    let report = harvester(create_test_config(1, 1), source, store.clone(), sink.clone())
        .run(CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.records_written, 2);
    assert_eq!(report.degraded_fields, 1);
    assert!(report.is_complete());

    let degraded = store.read_record("flickr_10").unwrap().unwrap();
    assert!(degraded.description.is_none());
    assert_eq!(degraded.width, Some(800));

    let intact = store.read_record("flickr_20").unwrap().unwrap();
    assert_eq!(intact.description.as_deref(), Some("Description of 20"));

    assert_eq!(sink.markers(), "_ooxx");
}

#[tokio::test]
async fn test_page_fetch_failure_writes_nothing() {
    let source = MemorySource::new()
        .with_page(1, vec![full_photo("1"), full_photo("2")])
        .with_failing_page(2);
    let store = Arc::new(SqliteRecordStore::open_in_memory().unwrap());
    let sink = Arc::new(CollectingSink::default());

    let result = harvester(create_test_config(1, 2), source, store.clone(), sink.clone())
        .run(CancellationToken::new())
        .await;

    match result {
        Err(HarvestError::PageFetch { page, .. }) => assert_eq!(page, 2),
        other => panic!("expected page fetch error, got {:?}", other.map(|r| r.records_written)),
    }
    assert_eq!(store.count_records().unwrap(), 0);
    assert!(sink.events.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_every_handle_written_once_across_pages() {
    let pages: Vec<Vec<MemoryPhoto>> = (0..3)
        .map(|page| {
            (0..40)
                .map(|i| full_photo(&(page * 1000 + i + 1).to_string()))
                .collect()
        })
        .collect();

    let mut source = MemorySource::new();
    for (i, photos) in pages.into_iter().enumerate() {
        source = source.with_page(i as u32 + 1, photos);
    }
    // Page 4 lies past the end of the collection
    let mut config = create_test_config(1, 4);
    config.harvest.fetch_workers = 16;
    config.harvest.persist_workers = 4;
    config.harvest.persist_queue_capacity = Some(5);

    let store = Arc::new(SqliteRecordStore::open_in_memory().unwrap());
    let sink = Arc::new(CollectingSink::default());

    let report = harvester(config, source, store.clone(), sink)
        .run(CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.pages_fetched, 4);
    assert_eq!(report.photos_enqueued, 120);
    assert_eq!(report.records_written, 120);
    assert_eq!(store.count_records().unwrap(), 120);

    let members = store.index_members("flickr").unwrap();
    assert_eq!(members.len(), 120);
    assert_eq!(members.first().map(String::as_str), Some("flickr_1"));
    assert_eq!(members.last().map(String::as_str), Some("flickr_2040"));
}

#[tokio::test]
async fn test_missing_original_keeps_variant_urls() {
    let photo = MemoryPhoto::new("5", "No original")
        .with_description("described")
        .with_sizes(vec![PhotoSize {
            label: "Medium".to_string(),
            source: "memory://m/5.jpg".to_string(),
            width: Some(500),
            height: Some(375),
        }]);
    let broken = MemoryPhoto::new("6", "Broken sizes").with_malformed_sizes();
    let source = MemorySource::new().with_page(1, vec![photo, broken]);
    let store = Arc::new(SqliteRecordStore::open_in_memory().unwrap());
    let sink = Arc::new(CollectingSink::default());

    let report = harvester(create_test_config(1, 1), source, store.clone(), sink)
        .run(CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.records_written, 2);
    assert_eq!(report.degraded_fields, 1);

    for key in ["flickr_5", "flickr_6"] {
        let record = store.read_record(key).unwrap().unwrap();
        assert!(record.original_url.is_none());
        assert!(record.width.is_none());
        assert!(record.height.is_none());
        assert!(record.square_url.is_some());
        assert!(record.large_url.is_some());
    }
}

#[tokio::test]
async fn test_failed_writes_are_reported() {
    let source = MemorySource::new().with_page(
        1,
        vec![full_photo("1"), full_photo("2"), full_photo("3")],
    );
    let store = Arc::new(FailingStore {
        inner: SqliteRecordStore::open_in_memory().unwrap(),
        failing_keys: vec!["flickr_2".to_string()],
    });
    let sink = Arc::new(CollectingSink::default());

    let report = harvester(create_test_config(1, 1), source, store.clone(), sink.clone())
        .run(CancellationToken::new())
        .await
        .unwrap();

    assert!(!report.is_complete());
    assert_eq!(report.status(), RunStatus::Incomplete);
    assert_eq!(report.records_written, 2);
    assert_eq!(report.failed_writes.len(), 1);
    assert_eq!(report.failed_writes[0].key, "flickr_2");
    assert!(report.failed_writes[0].error.contains("write rejected"));

    assert!(store.read_record("flickr_2").unwrap().is_none());
    assert_eq!(store.count_records().unwrap(), 2);
    assert_eq!(sink.markers(), "!ooxxx");
}

#[tokio::test]
async fn test_empty_range_completes() {
    let source = MemorySource::new();
    let store = Arc::new(SqliteRecordStore::open_in_memory().unwrap());
    let sink = Arc::new(CollectingSink::default());

    let report = harvester(create_test_config(1, 2), source, store.clone(), sink)
        .run(CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.pages_fetched, 2);
    assert_eq!(report.photos_enqueued, 0);
    assert!(report.is_complete());
    assert_eq!(store.count_records().unwrap(), 0);
}

#[tokio::test]
async fn test_cancel_before_start() {
    let source = MemorySource::new().with_page(1, vec![full_photo("1")]);
    let store = Arc::new(SqliteRecordStore::open_in_memory().unwrap());
    let sink = Arc::new(CollectingSink::default());

    let cancel = CancellationToken::new();
    cancel.cancel();

    let report = harvester(create_test_config(1, 1), source, store.clone(), sink)
        .run(cancel)
        .await
        .unwrap();

    assert!(report.cancelled);
    assert_eq!(report.status(), RunStatus::Cancelled);
    assert_eq!(report.pages_fetched, 0);
    assert_eq!(store.count_records().unwrap(), 0);
}

#[tokio::test]
async fn test_cancel_during_drain_tears_down_workers() {
    let slow: Vec<MemoryPhoto> = (1..=4)
        .map(|i| full_photo(&i.to_string()).with_latency(Duration::from_secs(30)))
        .collect();
    let source = MemorySource::new().with_page(1, slow);
    let store = Arc::new(SqliteRecordStore::open_in_memory().unwrap());
    let sink = Arc::new(CollectingSink::default());

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });

    let report = tokio::time::timeout(
        Duration::from_secs(5),
        harvester(create_test_config(1, 1), source, store.clone(), sink).run(cancel),
    )
    .await
    .expect("harvest should stop promptly after cancellation")
    .unwrap();

    assert!(report.cancelled);
    assert_eq!(report.photos_enqueued, 4);
    assert_eq!(report.records_written, 0);
    assert_eq!(store.count_records().unwrap(), 0);
}

#[tokio::test]
async fn test_rerun_replaces_stale_fields() {
    let store = Arc::new(SqliteRecordStore::open_in_memory().unwrap());

    let first = MemorySource::new().with_page(1, vec![full_photo("1")]);
    let report = harvester(
        create_test_config(1, 1),
        first,
        store.clone(),
        Arc::new(CollectingSink::default()),
    )
    .run(CancellationToken::new())
    .await
    .unwrap();
    assert!(report.is_complete());

    let before = store.read_record("flickr_1").unwrap().unwrap();
    assert_eq!(before.description.as_deref(), Some("Description of 1"));
    assert_eq!(before.width, Some(800));

    // Same photo, but both lookups fail this time
    let second = MemorySource::new().with_page(
        1,
        vec![MemoryPhoto::new("1", "Photo 1 renamed")
            .with_malformed_description()
            .with_malformed_sizes()],
    );
    let report = harvester(
        create_test_config(1, 1),
        second,
        store.clone(),
        Arc::new(CollectingSink::default()),
    )
    .run(CancellationToken::new())
    .await
    .unwrap();
    assert_eq!(report.records_written, 1);
    assert_eq!(report.degraded_fields, 2);

    let after = store.read_record("flickr_1").unwrap().unwrap();
    assert_eq!(after.title, "Photo 1 renamed");
    assert!(after.description.is_none());
    assert!(after.original_url.is_none());
    assert!(after.width.is_none());
    assert!(after.height.is_none());
    assert!(after.square_url.is_some());
    assert_eq!(store.count_records().unwrap(), 1);
    assert_eq!(store.index_members("flickr").unwrap(), vec!["flickr_1"]);
}

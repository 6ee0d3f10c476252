//! Integration tests for the Flickr photo source
//!
//! These tests use wiremock to stand in for the Flickr REST endpoint and
//! exercise payload decoding, error mapping and a full harvest over HTTP.

use photo_harvest::config::{Config, FlickrConfig, HarvestConfig, StoreConfig};
use photo_harvest::harvest::{HarvestContext, Harvester};
use photo_harvest::progress::SilentSink;
use photo_harvest::source::{FlickrSource, PhotoHandle, PhotoSource, SourceError, ORIGINAL_LABEL};
use photo_harvest::store::{RecordStore, SqliteRecordStore};
use serde_json::json;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const REST_PATH: &str = "/services/rest/";
const OWNER: &str = "12403504@N02";

fn flickr_config(server: &MockServer) -> FlickrConfig {
    FlickrConfig {
        api_key: "test-key".to_string(),
        owner_id: OWNER.to_string(),
        endpoint: format!("{}{}", server.uri(), REST_PATH),
        request_timeout_secs: 5,
    }
}

fn search_body() -> serde_json::Value {
    json!({
        "photos": {
            "page": 1,
            "pages": 1,
            "perpage": 2,
            "total": "2",
            "photo": [
                {
                    "id": "11307127785",
                    "owner": OWNER,
                    "secret": "a1b2c3",
                    "server": "3807",
                    "farm": 4,
                    "title": "Image taken from page 9",
                    "ispublic": 1
                },
                {
                    "id": "11306939516",
                    "owner": OWNER,
                    "secret": "d4e5f6",
                    "server": "2838",
                    "farm": "3",
                    "title": "Image taken from page 14",
                    "ispublic": 1
                }
            ]
        },
        "stat": "ok"
    })
}

fn info_body(description: &str) -> serde_json::Value {
    json!({
        "photo": {
            "id": "ignored",
            "description": { "_content": description }
        },
        "stat": "ok"
    })
}

fn sizes_body(id: &str) -> serde_json::Value {
    json!({
        "sizes": {
            "canblog": 0,
            "size": [
                {
                    "label": "Square",
                    "width": 75,
                    "height": 75,
                    "source": format!("https://live.staticflickr.com/1/{}_s.jpg", id)
                },
                {
                    "label": "Original",
                    "width": "1200",
                    "height": "900",
                    "source": format!("https://live.staticflickr.com/1/{}_o.jpg", id)
                }
            ]
        },
        "stat": "ok"
    })
}

async fn mount_search(server: &MockServer, body: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path(REST_PATH))
        .and(query_param("method", "flickr.photos.search"))
        .and(query_param("api_key", "test-key"))
        .and(query_param("user_id", OWNER))
        .and(query_param("format", "json"))
        .and(query_param("nojsoncallback", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

async fn mount_lookup(server: &MockServer, flickr_method: &str, photo_id: &str, response: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path(REST_PATH))
        .and(query_param("method", flickr_method))
        .and(query_param("photo_id", photo_id))
        .respond_with(response)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_search_and_lookups() {
    let server = MockServer::start().await;
    mount_search(&server, search_body()).await;
    mount_lookup(
        &server,
        "flickr.photos.getInfo",
        "11307127785",
        ResponseTemplate::new(200).set_body_json(info_body("From a digitised book")),
    )
    .await;
    mount_lookup(
        &server,
        "flickr.photos.getSizes",
        "11307127785",
        ResponseTemplate::new(200).set_body_json(sizes_body("11307127785")),
    )
    .await;

    let source = FlickrSource::new(&flickr_config(&server)).unwrap();
    let photos = source.search(OWNER, 2, 1).await.unwrap();

    assert_eq!(photos.len(), 2);
    let photo = &photos[0];
    assert_eq!(photo.id(), "11307127785");
    assert_eq!(photo.title(), "Image taken from page 9");
    assert_eq!(
        photo.thumbnail_url().as_deref(),
        Some("https://farm4.staticflickr.com/3807/11307127785_a1b2c3_t.jpg")
    );
    assert_eq!(
        photos[1].small_url().as_deref(),
        Some("https://farm3.staticflickr.com/2838/11306939516_d4e5f6_m.jpg")
    );

    assert_eq!(photo.description().await.unwrap(), "From a digitised book");

    let sizes = photo.sizes().await.unwrap();
    let original = sizes
        .iter()
        .find(|size| size.label == ORIGINAL_LABEL)
        .unwrap();
    assert_eq!(original.width, Some(1200));
    assert_eq!(original.height, Some(900));
}

#[tokio::test]
async fn test_api_failure_is_reported() {
    let server = MockServer::start().await;
    mount_search(
        &server,
        json!({ "stat": "fail", "code": 100, "message": "Invalid API Key (Key has invalid format)" }),
    )
    .await;

    let source = FlickrSource::new(&flickr_config(&server)).unwrap();
    let error = source.search(OWNER, 10, 1).await.err().unwrap();

    match error {
        SourceError::Api { code, message, .. } => {
            assert_eq!(code, 100);
            assert!(message.contains("Invalid API Key"));
        }
        other => panic!("expected API error, got {}", other),
    }
}

#[tokio::test]
async fn test_http_status_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(REST_PATH))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let source = FlickrSource::new(&flickr_config(&server)).unwrap();
    let error = source.search(OWNER, 10, 1).await.err().unwrap();

    assert!(matches!(error, SourceError::Status { status: 503, .. }));
}

#[tokio::test]
async fn test_malformed_lookup_is_parse_error() {
    let server = MockServer::start().await;
    mount_search(&server, search_body()).await;
    mount_lookup(
        &server,
        "flickr.photos.getInfo",
        "11306939516",
        ResponseTemplate::new(200).set_body_string("{\"photo\": {\"description\": "),
    )
    .await;

    let source = FlickrSource::new(&flickr_config(&server)).unwrap();
    let photos = source.search(OWNER, 2, 1).await.unwrap();

    let error = photos[1].description().await.unwrap_err();
    assert!(error.is_parse());
}

#[tokio::test]
async fn test_harvest_over_http_degrades_malformed_payloads() {
    let server = MockServer::start().await;
    mount_search(&server, search_body()).await;

    // First photo: everything well formed
    mount_lookup(
        &server,
        "flickr.photos.getInfo",
        "11307127785",
        ResponseTemplate::new(200).set_body_json(info_body("Page 9")),
    )
    .await;
    mount_lookup(
        &server,
        "flickr.photos.getSizes",
        "11307127785",
        ResponseTemplate::new(200).set_body_json(sizes_body("11307127785")),
    )
    .await;

    // Second photo: truncated description, size listing missing its body
    mount_lookup(
        &server,
        "flickr.photos.getInfo",
        "11306939516",
        ResponseTemplate::new(200).set_body_string("{\"photo\": "),
    )
    .await;
    mount_lookup(
        &server,
        "flickr.photos.getSizes",
        "11306939516",
        ResponseTemplate::new(200).set_body_json(json!({ "stat": "ok" })),
    )
    .await;

    let config = Config {
        flickr: flickr_config(&server),
        harvest: HarvestConfig {
            page_size: 2,
            first_page: 1,
            last_page: 1,
            fetch_workers: 4,
            persist_workers: 2,
            persist_queue_capacity: Some(1),
        },
        store: StoreConfig {
            database_path: ":memory:".to_string(),
            key_prefix: "flickr_".to_string(),
            index_name: "flickr".to_string(),
        },
    };

    let store = Arc::new(SqliteRecordStore::open_in_memory().unwrap());
    let harvester = Harvester::new(HarvestContext {
        source: Arc::new(FlickrSource::new(&config.flickr).unwrap()),
        store: store.clone(),
        progress: Arc::new(SilentSink),
        config,
    });

    let report = harvester.run(CancellationToken::new()).await.unwrap();

    assert_eq!(report.records_written, 2);
    assert_eq!(report.degraded_fields, 2);
    assert!(report.is_complete());

    let complete = store.read_record("flickr_11307127785").unwrap().unwrap();
    assert_eq!(complete.description.as_deref(), Some("Page 9"));
    assert_eq!(
        complete.original_url.as_deref(),
        Some("https://live.staticflickr.com/1/11307127785_o.jpg")
    );
    assert_eq!(complete.width, Some(1200));

    let degraded = store.read_record("flickr_11306939516").unwrap().unwrap();
    assert_eq!(degraded.title, "Image taken from page 14");
    assert!(degraded.description.is_none());
    assert!(degraded.original_url.is_none());
    assert!(degraded.square_url.is_some());

    assert_eq!(
        store.index_members("flickr").unwrap(),
        vec!["flickr_11306939516", "flickr_11307127785"]
    );
}

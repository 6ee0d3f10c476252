use serde::Deserialize;

/// Default Flickr REST endpoint
pub const DEFAULT_ENDPOINT: &str = "https://api.flickr.com/services/rest/";

/// Main configuration structure for photo-harvest
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub flickr: FlickrConfig,
    pub harvest: HarvestConfig,
    pub store: StoreConfig,
}

/// Remote photo source configuration
#[derive(Debug, Clone, Deserialize)]
pub struct FlickrConfig {
    /// API key sent with every request; may be supplied via `FLICKR_API_KEY` instead
    #[serde(rename = "api-key", default)]
    pub api_key: String,

    /// Account whose public photos are harvested
    #[serde(rename = "owner-id")]
    pub owner_id: String,

    /// REST endpoint
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Per-request timeout (seconds)
    #[serde(rename = "request-timeout-secs", default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

/// Pipeline shape: which pages to fetch and how many workers per stage
#[derive(Debug, Clone, Deserialize)]
pub struct HarvestConfig {
    /// Photos requested per result page
    #[serde(rename = "page-size")]
    pub page_size: u32,

    /// First result page (1-based, inclusive)
    #[serde(rename = "first-page", default = "default_first_page")]
    pub first_page: u32,

    /// Last result page (inclusive)
    #[serde(rename = "last-page")]
    pub last_page: u32,

    /// Number of fetch workers
    #[serde(rename = "fetch-workers", default = "default_fetch_workers")]
    pub fetch_workers: usize,

    /// Number of persistence workers
    #[serde(rename = "persist-workers", default = "default_persist_workers")]
    pub persist_workers: usize,

    /// Capacity of the persistence queue; unbounded when omitted
    #[serde(rename = "persist-queue-capacity", default)]
    pub persist_queue_capacity: Option<usize>,
}

impl HarvestConfig {
    /// Page numbers requested from the source, in order
    pub fn pages(&self) -> std::ops::RangeInclusive<u32> {
        self.first_page..=self.last_page
    }
}

/// Record store configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path")]
    pub database_path: String,

    /// Prefix prepended to every photo id to form the record key
    #[serde(rename = "key-prefix", default = "default_key_prefix")]
    pub key_prefix: String,

    /// Name of the ordered index referencing every record key
    #[serde(rename = "index-name", default = "default_index_name")]
    pub index_name: String,
}

impl StoreConfig {
    /// Record key for a photo id
    pub fn record_key(&self, photo_id: &str) -> String {
        format!("{}{}", self.key_prefix, photo_id)
    }
}

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}

fn default_request_timeout() -> u64 {
    30
}

fn default_first_page() -> u32 {
    1
}

fn default_fetch_workers() -> usize {
    200
}

fn default_persist_workers() -> usize {
    20
}

fn default_key_prefix() -> String {
    "flickr_".to_string()
}

fn default_index_name() -> String {
    "flickr".to_string()
}

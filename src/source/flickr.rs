//! Flickr REST API photo source
//!
//! This module handles all HTTP requests to the Flickr API, including:
//! - Building the HTTP client with a proper user agent and timeouts
//! - Paged `flickr.photos.search` calls
//! - Per-photo `flickr.photos.getInfo` (description) and
//!   `flickr.photos.getSizes` (size listing) lookups
//! - Mapping transport, status, payload and API failures to [`SourceError`]

use crate::config::FlickrConfig;
use crate::source::traits::{
    PhotoHandle, PhotoSize, PhotoSource, SizeVariant, SourceError, SourceResult,
};
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

const SEARCH_METHOD: &str = "flickr.photos.search";
const INFO_METHOD: &str = "flickr.photos.getInfo";
const SIZES_METHOD: &str = "flickr.photos.getSizes";

/// Builds an HTTP client for the Flickr API
///
/// # Arguments
///
/// * `timeout` - Total per-request timeout
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
pub fn build_http_client(timeout: Duration) -> Result<Client, reqwest::Error> {
    let user_agent = format!("{}/{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));

    Client::builder()
        .user_agent(user_agent)
        .timeout(timeout)
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Thin JSON-over-HTTP client for the Flickr REST endpoint
pub struct FlickrClient {
    http: Client,
    endpoint: Url,
    api_key: String,
}

impl fmt::Debug for FlickrClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FlickrClient")
            .field("endpoint", &self.endpoint.as_str())
            .finish_non_exhaustive()
    }
}

impl FlickrClient {
    /// Creates a client from the `[flickr]` configuration section
    pub fn new(config: &FlickrConfig) -> SourceResult<Self> {
        let endpoint = Url::parse(&config.endpoint)
            .map_err(|e| SourceError::Config(format!("invalid endpoint: {}", e)))?;
        let http = build_http_client(Duration::from_secs(config.request_timeout_secs))
            .map_err(|e| SourceError::Config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            endpoint,
            api_key: config.api_key.clone(),
        })
    }

    /// Calls one REST method and decodes its JSON payload
    pub async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        params: &[(&str, String)],
    ) -> SourceResult<T> {
        let mut url = self.endpoint.clone();
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("method", method)
                .append_pair("api_key", &self.api_key)
                .append_pair("format", "json")
                .append_pair("nojsoncallback", "1");
            for (name, value) in params {
                query.append_pair(name, value);
            }
        }

        tracing::trace!("Calling {} with {} params", method, params.len());

        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|source| SourceError::Http {
                method: method.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Status {
                method: method.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.text().await.map_err(|source| SourceError::Http {
            method: method.to_string(),
            source,
        })?;

        decode_response(method, &body)
    }
}

/// Decodes a Flickr JSON payload, surfacing `stat: "fail"` as an API error
pub fn decode_response<T: DeserializeOwned>(method: &str, body: &str) -> SourceResult<T> {
    let value: serde_json::Value =
        serde_json::from_str(body).map_err(|e| SourceError::Parse {
            method: method.to_string(),
            message: e.to_string(),
        })?;

    if value.get("stat").and_then(serde_json::Value::as_str) == Some("fail") {
        return Err(SourceError::Api {
            method: method.to_string(),
            code: value
                .get("code")
                .and_then(serde_json::Value::as_i64)
                .unwrap_or_default(),
            message: value
                .get("message")
                .and_then(serde_json::Value::as_str)
                .unwrap_or("unknown error")
                .to_string(),
        });
    }

    serde_json::from_value(value).map_err(|e| SourceError::Parse {
        method: method.to_string(),
        message: e.to_string(),
    })
}

/// Accepts numbers encoded either as JSON numbers or as strings
fn number_or_string<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(u32),
        Text(String),
    }

    Ok(match Option::<Raw>::deserialize(deserializer)? {
        Some(Raw::Number(n)) => Some(n),
        Some(Raw::Text(text)) => text.trim().parse().ok(),
        None => None,
    })
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    photos: SearchPage,
}

#[derive(Debug, Deserialize)]
struct SearchPage {
    #[serde(default)]
    photo: Vec<SearchPhoto>,
}

#[derive(Debug, Deserialize)]
struct SearchPhoto {
    id: String,
    #[serde(default)]
    secret: String,
    #[serde(default)]
    server: String,
    #[serde(default, deserialize_with = "number_or_string")]
    farm: Option<u32>,
    #[serde(default)]
    title: String,
}

#[derive(Debug, Deserialize)]
struct InfoResponse {
    photo: InfoPhoto,
}

#[derive(Debug, Deserialize)]
struct InfoPhoto {
    #[serde(default)]
    description: TextContent,
}

#[derive(Debug, Default, Deserialize)]
struct TextContent {
    #[serde(rename = "_content", default)]
    content: String,
}

#[derive(Debug, Deserialize)]
struct SizesResponse {
    sizes: SizeList,
}

#[derive(Debug, Deserialize)]
struct SizeList {
    #[serde(default)]
    size: Vec<SizeEntry>,
}

#[derive(Debug, Deserialize)]
struct SizeEntry {
    label: String,
    source: String,
    #[serde(default, deserialize_with = "number_or_string")]
    width: Option<u32>,
    #[serde(default, deserialize_with = "number_or_string")]
    height: Option<u32>,
}

impl From<SizeEntry> for PhotoSize {
    fn from(entry: SizeEntry) -> Self {
        Self {
            label: entry.label,
            source: entry.source,
            width: entry.width,
            height: entry.height,
        }
    }
}

/// A photo returned by `flickr.photos.search`
#[derive(Debug, Clone)]
pub struct FlickrPhoto {
    id: String,
    title: String,
    secret: String,
    server: String,
    farm: Option<u32>,
    client: Arc<FlickrClient>,
}

#[async_trait]
impl PhotoHandle for FlickrPhoto {
    fn id(&self) -> &str {
        &self.id
    }

    fn title(&self) -> &str {
        &self.title
    }

    fn variant_url(&self, variant: SizeVariant) -> Option<String> {
        if self.server.is_empty() || self.secret.is_empty() {
            return None;
        }

        let host = match self.farm {
            Some(farm) if farm > 0 => format!("farm{}.staticflickr.com", farm),
            _ => "live.staticflickr.com".to_string(),
        };

        Some(format!(
            "https://{}/{}/{}_{}{}.jpg",
            host,
            self.server,
            self.id,
            self.secret,
            variant.suffix()
        ))
    }

    async fn description(&self) -> SourceResult<String> {
        let info: InfoResponse = self
            .client
            .call(INFO_METHOD, &[("photo_id", self.id.clone())])
            .await?;
        Ok(info.photo.description.content)
    }

    async fn sizes(&self) -> SourceResult<Vec<PhotoSize>> {
        let sizes: SizesResponse = self
            .client
            .call(SIZES_METHOD, &[("photo_id", self.id.clone())])
            .await?;
        Ok(sizes.sizes.size.into_iter().map(PhotoSize::from).collect())
    }
}

/// [`PhotoSource`] backed by the Flickr REST API
#[derive(Debug, Clone)]
pub struct FlickrSource {
    client: Arc<FlickrClient>,
}

impl FlickrSource {
    pub fn new(config: &FlickrConfig) -> SourceResult<Self> {
        Ok(Self {
            client: Arc::new(FlickrClient::new(config)?),
        })
    }
}

#[async_trait]
impl PhotoSource for FlickrSource {
    async fn search(
        &self,
        owner_id: &str,
        page_size: u32,
        page: u32,
    ) -> SourceResult<Vec<Box<dyn PhotoHandle>>> {
        let response: SearchResponse = self
            .client
            .call(
                SEARCH_METHOD,
                &[
                    ("user_id", owner_id.to_string()),
                    ("per_page", page_size.to_string()),
                    ("page", page.to_string()),
                ],
            )
            .await?;

        tracing::debug!(
            "Search page {} for {} returned {} photos",
            page,
            owner_id,
            response.photos.photo.len()
        );

        Ok(response
            .photos
            .photo
            .into_iter()
            .map(|photo| {
                Box::new(FlickrPhoto {
                    id: photo.id,
                    title: photo.title,
                    secret: photo.secret,
                    server: photo.server,
                    farm: photo.farm,
                    client: Arc::clone(&self.client),
                }) as Box<dyn PhotoHandle>
            })
            .collect())
    }
}

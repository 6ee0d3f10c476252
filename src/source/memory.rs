//! In-memory photo source
//!
//! Serves pre-built photos without touching the network. Each photo can be
//! told to fail its description or size lookup, or to take a while to answer,
//! which makes the degraded-extraction paths reproducible.

use crate::source::traits::{
    PhotoHandle, PhotoSize, PhotoSource, SizeVariant, SourceError, SourceResult, ORIGINAL_LABEL,
};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone)]
enum Lookup<T> {
    Ok(T),
    Malformed,
    Unavailable,
}

impl<T: Clone> Lookup<T> {
    fn resolve(&self, method: &str) -> SourceResult<T> {
        match self {
            Self::Ok(value) => Ok(value.clone()),
            Self::Malformed => Err(SourceError::Parse {
                method: method.to_string(),
                message: "malformed payload".to_string(),
            }),
            Self::Unavailable => Err(SourceError::Status {
                method: method.to_string(),
                status: 503,
            }),
        }
    }
}

/// A photo whose remote lookups are scripted
#[derive(Debug, Clone)]
pub struct MemoryPhoto {
    id: String,
    title: String,
    description: Lookup<String>,
    sizes: Lookup<Vec<PhotoSize>>,
    latency: Option<Duration>,
}

impl MemoryPhoto {
    /// Creates a photo with an empty description and no size listing
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: Lookup::Ok(String::new()),
            sizes: Lookup::Ok(Vec::new()),
            latency: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Lookup::Ok(description.into());
        self
    }

    /// Adds an `Original` entry to the size listing
    pub fn with_original(mut self, source: impl Into<String>, width: u32, height: u32) -> Self {
        let mut sizes = match self.sizes {
            Lookup::Ok(sizes) => sizes,
            Lookup::Malformed | Lookup::Unavailable => Vec::new(),
        };
        sizes.push(PhotoSize {
            label: ORIGINAL_LABEL.to_string(),
            source: source.into(),
            width: Some(width),
            height: Some(height),
        });
        self.sizes = Lookup::Ok(sizes);
        self
    }

    pub fn with_sizes(mut self, sizes: Vec<PhotoSize>) -> Self {
        self.sizes = Lookup::Ok(sizes);
        self
    }

    /// Makes the description lookup fail with a parse error
    pub fn with_malformed_description(mut self) -> Self {
        self.description = Lookup::Malformed;
        self
    }

    /// Makes the size lookup fail with a parse error
    pub fn with_malformed_sizes(mut self) -> Self {
        self.sizes = Lookup::Malformed;
        self
    }

    /// Makes the description lookup fail with HTTP 503
    pub fn with_unavailable_description(mut self) -> Self {
        self.description = Lookup::Unavailable;
        self
    }

    /// Makes the size lookup fail with HTTP 503
    pub fn with_unavailable_sizes(mut self) -> Self {
        self.sizes = Lookup::Unavailable;
        self
    }

    /// Delays each remote lookup
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    async fn wait(&self) {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
    }
}

#[async_trait]
impl PhotoHandle for MemoryPhoto {
    fn id(&self) -> &str {
        &self.id
    }

    fn title(&self) -> &str {
        &self.title
    }

    fn variant_url(&self, variant: SizeVariant) -> Option<String> {
        Some(format!(
            "memory://photos/{}{}.jpg",
            self.id,
            variant.suffix()
        ))
    }

    async fn description(&self) -> SourceResult<String> {
        self.wait().await;
        self.description.resolve("description")
    }

    async fn sizes(&self) -> SourceResult<Vec<PhotoSize>> {
        self.wait().await;
        self.sizes.resolve("sizes")
    }
}

/// [`PhotoSource`] serving fixed pages of [`MemoryPhoto`]s
#[derive(Debug, Default)]
pub struct MemorySource {
    pages: BTreeMap<u32, Vec<MemoryPhoto>>,
    failing_pages: Vec<u32>,
    search_calls: Arc<AtomicUsize>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serves `photos` as result page `page`
    pub fn with_page(mut self, page: u32, photos: Vec<MemoryPhoto>) -> Self {
        self.pages.insert(page, photos);
        self
    }

    /// Makes the search for `page` fail
    pub fn with_failing_page(mut self, page: u32) -> Self {
        self.failing_pages.push(page);
        self
    }

    /// Number of search calls answered so far
    pub fn search_calls(&self) -> usize {
        self.search_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PhotoSource for MemorySource {
    async fn search(
        &self,
        _owner_id: &str,
        page_size: u32,
        page: u32,
    ) -> SourceResult<Vec<Box<dyn PhotoHandle>>> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);

        if self.failing_pages.contains(&page) {
            return Err(SourceError::Status {
                method: "search".to_string(),
                status: 503,
            });
        }

        Ok(self
            .pages
            .get(&page)
            .map(|photos| {
                photos
                    .iter()
                    .take(page_size as usize)
                    .cloned()
                    .map(|photo| Box::new(photo) as Box<dyn PhotoHandle>)
                    .collect()
            })
            .unwrap_or_default())
    }
}

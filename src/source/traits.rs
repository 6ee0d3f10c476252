//! Photo source traits and error types
//!
//! A [`PhotoSource`] answers paged search queries with [`PhotoHandle`]s. A
//! handle exposes cheap synchronous accessors (id, title, size-variant URLs)
//! and two fallible remote lookups (description and size listing) that may
//! fail when the upstream payload cannot be decoded.

use async_trait::async_trait;
use thiserror::Error;

/// Errors that can occur while talking to the photo source
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("HTTP error calling {method}: {source}")]
    Http {
        method: String,
        source: reqwest::Error,
    },

    #[error("Unexpected HTTP status {status} calling {method}")]
    Status { method: String, status: u16 },

    #[error("Malformed response from {method}: {message}")]
    Parse { method: String, message: String },

    #[error("API error {code} from {method}: {message}")]
    Api {
        method: String,
        code: i64,
        message: String,
    },

    #[error("Invalid source configuration: {0}")]
    Config(String),
}

impl SourceError {
    /// Returns true for failures caused by an undecodable upstream payload
    pub fn is_parse(&self) -> bool {
        matches!(self, Self::Parse { .. })
    }
}

/// Result type for source operations
pub type SourceResult<T> = Result<T, SourceError>;

/// Standard size variants with synchronously derivable URLs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SizeVariant {
    /// 75x75 crop
    Square,
    /// 100px on the longest side
    Thumbnail,
    /// 240px on the longest side
    Small,
    /// 500px on the longest side
    Medium,
    /// 1024px on the longest side
    Large,
}

impl SizeVariant {
    pub const ALL: [SizeVariant; 5] = [
        SizeVariant::Square,
        SizeVariant::Thumbnail,
        SizeVariant::Small,
        SizeVariant::Medium,
        SizeVariant::Large,
    ];

    /// Filename suffix used by the static image host
    pub fn suffix(&self) -> &'static str {
        match self {
            Self::Square => "_s",
            Self::Thumbnail => "_t",
            Self::Small => "_m",
            Self::Medium => "",
            Self::Large => "_b",
        }
    }
}

/// One entry of a photo's size listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhotoSize {
    pub label: String,
    pub source: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

/// Label of the size-listing entry describing the uploaded original
pub const ORIGINAL_LABEL: &str = "Original";

/// Opaque reference to one remote photograph
#[async_trait]
pub trait PhotoHandle: Send + Sync {
    /// Remote identifier; always available
    fn id(&self) -> &str;

    /// Photo title; always available, possibly empty
    fn title(&self) -> &str;

    /// URL of a standard size variant, `None` if the handle lacks the data to build it
    fn variant_url(&self, variant: SizeVariant) -> Option<String>;

    /// Looks up the photo description
    async fn description(&self) -> SourceResult<String>;

    /// Looks up every available size of the photo
    async fn sizes(&self) -> SourceResult<Vec<PhotoSize>>;

    fn square_url(&self) -> Option<String> {
        self.variant_url(SizeVariant::Square)
    }

    fn thumbnail_url(&self) -> Option<String> {
        self.variant_url(SizeVariant::Thumbnail)
    }

    fn small_url(&self) -> Option<String> {
        self.variant_url(SizeVariant::Small)
    }

    fn medium_url(&self) -> Option<String> {
        self.variant_url(SizeVariant::Medium)
    }

    fn large_url(&self) -> Option<String> {
        self.variant_url(SizeVariant::Large)
    }
}

/// Paged photo search
#[async_trait]
pub trait PhotoSource: Send + Sync {
    /// Returns one page of an owner's photos
    ///
    /// # Arguments
    ///
    /// * `owner_id` - Account whose photos are listed
    /// * `page_size` - Photos per page
    /// * `page` - 1-based page number
    ///
    /// An empty vector means the page lies past the end of the collection.
    async fn search(
        &self,
        owner_id: &str,
        page_size: u32,
        page: u32,
    ) -> SourceResult<Vec<Box<dyn PhotoHandle>>>;
}

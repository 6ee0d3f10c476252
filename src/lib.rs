//! photo-harvest: concurrent photo metadata harvester
//!
//! This crate pulls photo metadata (title, description, size-variant URLs and
//! original dimensions) from an image-hosting search API and persists one
//! record per photo plus an ordered index of all harvested records.

pub mod config;
pub mod harvest;
pub mod output;
pub mod progress;
pub mod queue;
pub mod source;
pub mod store;

use thiserror::Error;

/// Main error type for harvest operations
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Failed to fetch result page {page}: {source}")]
    PageFetch {
        page: u32,
        source: source::SourceError,
    },

    #[error("Photo source error: {0}")]
    Source(#[from] source::SourceError),

    #[error("Storage error: {0}")]
    Store(#[from] store::StoreError),

    #[error("Queue error: {0}")]
    Queue(#[from] queue::QueueError),

    #[error("Worker task failed: {0}")]
    Worker(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Result type alias for harvest operations
pub type Result<T> = std::result::Result<T, HarvestError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use harvest::{HarvestContext, HarvestReport, Harvester, PhotoRecord};
pub use queue::WorkQueue;
pub use source::{PhotoHandle, PhotoSize, PhotoSource};
pub use store::{RecordStore, SqliteRecordStore};

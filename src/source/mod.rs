//! Photo sources
//!
//! This module contains the photo source boundary:
//! - The [`PhotoSource`] and [`PhotoHandle`] traits the pipeline depends on
//! - A Flickr REST implementation
//! - An in-memory implementation for offline runs and tests

mod flickr;
mod memory;
mod traits;

pub use flickr::{build_http_client, decode_response, FlickrClient, FlickrPhoto, FlickrSource};
pub use memory::{MemoryPhoto, MemorySource};
pub use traits::{
    PhotoHandle, PhotoSize, PhotoSource, SizeVariant, SourceError, SourceResult, ORIGINAL_LABEL,
};

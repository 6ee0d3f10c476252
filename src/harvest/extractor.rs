//! Photo record extraction
//!
//! Turns a [`PhotoHandle`] into a [`PhotoRecord`]. The handle's remote lookups
//! may fail on malformed payloads; such failures never abort extraction; the
//! affected fields are left absent and a degraded marker is emitted instead.

use crate::harvest::PhotoRecord;
use crate::progress::{DegradedField, ProgressEvent, ProgressSink};
use crate::source::{PhotoHandle, PhotoSize, SourceError, ORIGINAL_LABEL};
use std::sync::Arc;
use tracing::Level;

/// Builds records from photo handles, reporting degraded fields
#[derive(Clone)]
pub struct Extractor {
    progress: Arc<dyn ProgressSink>,
}

impl Extractor {
    pub fn new(progress: Arc<dyn ProgressSink>) -> Self {
        Self { progress }
    }

    /// Finds the `Original` entry of the photo's size listing
    ///
    /// Returns `None` if the listing cannot be fetched or has no such entry.
    /// Only a failed lookup counts as degraded; a listing without an
    /// original is a normal answer.
    pub async fn original_size(&self, handle: &dyn PhotoHandle) -> Option<PhotoSize> {
        match handle.sizes().await {
            Ok(sizes) => sizes.into_iter().find(|size| size.label == ORIGINAL_LABEL),
            Err(e) => {
                log_lookup_failure("Size", handle, &e);
                self.degraded(handle, DegradedField::OriginalSize);
                None
            }
        }
    }

    /// Fetches the photo description, `None` if the lookup fails
    pub async fn description(&self, handle: &dyn PhotoHandle) -> Option<String> {
        match handle.description().await {
            Ok(description) => Some(description),
            Err(e) => {
                log_lookup_failure("Description", handle, &e);
                self.degraded(handle, DegradedField::Description);
                None
            }
        }
    }

    /// Assembles the full record for `handle`; never fails
    pub async fn build_record(&self, handle: &dyn PhotoHandle) -> PhotoRecord {
        let original = self.original_size(handle).await;
        let description = self.description(handle).await;

        let mut record = PhotoRecord::new(handle.id(), handle.title());
        record.description = description;
        record.square_url = handle.square_url();
        record.thumbnail_url = handle.thumbnail_url();
        record.small_url = handle.small_url();
        record.medium_url = handle.medium_url();
        record.large_url = handle.large_url();

        if let Some(original) = original {
            record.original_url = Some(original.source);
            record.width = original.width;
            record.height = original.height;
        }

        record
    }

    fn degraded(&self, handle: &dyn PhotoHandle, field: DegradedField) {
        self.progress.on_event(ProgressEvent::Degraded {
            photo_id: handle.id().to_string(),
            field,
        });
    }
}

/// Malformed payloads log at debug; every other lookup failure warns
fn lookup_failure_level(error: &SourceError) -> Level {
    if error.is_parse() {
        Level::DEBUG
    } else {
        Level::WARN
    }
}

fn log_lookup_failure(lookup: &str, handle: &dyn PhotoHandle, error: &SourceError) {
    if lookup_failure_level(error) == Level::DEBUG {
        tracing::debug!("{} lookup failed for photo {}: {}", lookup, handle.id(), error);
    } else {
        tracing::warn!("{} lookup failed for photo {}: {}", lookup, handle.id(), error);
    }
}

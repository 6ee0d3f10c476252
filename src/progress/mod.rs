//! Operator progress stream
//!
//! Pipeline stages report what happened to each photo as a [`ProgressEvent`].
//! The [`MarkerSink`] renders events as single characters on the terminal:
//!
//! | Marker | Meaning |
//! |--------|---------|
//! | `x` | record extracted |
//! | `o` | record persisted |
//! | `_` | a field was degraded to absent |
//! | `!` | a store write failed |

use std::io::{self, Write};
use std::sync::{Mutex, PoisonError};

/// Field that could not be extracted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DegradedField {
    Description,
    OriginalSize,
}

/// Events emitted by the pipeline stages
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent {
    /// A lookup failed and the field was left absent
    Degraded {
        photo_id: String,
        field: DegradedField,
    },
    /// A record was built and queued for persistence
    Extracted { photo_id: String },
    /// A record was written to the store
    Persisted { key: String },
    /// A record could not be written
    PersistFailed { key: String, error: String },
}

impl ProgressEvent {
    /// Single-character terminal marker for this event
    pub fn marker(&self) -> char {
        match self {
            Self::Degraded { .. } => '_',
            Self::Extracted { .. } => 'x',
            Self::Persisted { .. } => 'o',
            Self::PersistFailed { .. } => '!',
        }
    }
}

/// Receiver of progress events; shared by every worker
pub trait ProgressSink: Send + Sync {
    fn on_event(&self, event: ProgressEvent);
}

/// Writes one marker character per event and flushes immediately
pub struct MarkerSink<W: Write + Send> {
    out: Mutex<W>,
}

impl MarkerSink<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write + Send> MarkerSink<W> {
    pub fn new(out: W) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }

    /// Consumes the sink and returns the underlying writer
    pub fn into_inner(self) -> W {
        self.out.into_inner().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<W: Write + Send> ProgressSink for MarkerSink<W> {
    fn on_event(&self, event: ProgressEvent) {
        let mut out = self.out.lock().unwrap_or_else(PoisonError::into_inner);
        let mut buf = [0u8; 4];
        let marker = event.marker().encode_utf8(&mut buf);
        // Markers are best effort; a closed terminal must not stop the harvest.
        let _ = out.write_all(marker.as_bytes()).and_then(|_| out.flush());
    }
}

/// Discards every event
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentSink;

impl ProgressSink for SilentSink {
    fn on_event(&self, _event: ProgressEvent) {}
}

//! Work queues connecting the pipeline stages
//!
//! The harvest pipeline uses two of these: the intake queue carrying photo
//! handles to the fetch workers, and the persistence queue carrying finished
//! records to the persistence workers.

mod work_queue;

pub use work_queue::WorkQueue;

use thiserror::Error;

/// Errors returned by [`WorkQueue`] operations
#[derive(Debug, Error, PartialEq, Eq)]
pub enum QueueError {
    #[error("Queue is closed")]
    Closed,

    #[error("Acknowledged more items than were popped")]
    UnmatchedAck,
}

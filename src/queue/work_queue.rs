//! Joinable multi-producer, multi-consumer FIFO
//!
//! Item availability and free capacity are tracked with semaphores, so a
//! popper that wins a permit is guaranteed an item. The number of unfinished
//! items (pushed but not yet acknowledged) is published on a watch channel
//! that `join` waits on.

use crate::queue::QueueError;
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::{watch, Semaphore};

#[derive(Debug)]
struct QueueState<T> {
    items: VecDeque<T>,
    in_flight: usize,
    pushed: u64,
    acked: u64,
    closed: bool,
}

/// A FIFO work queue with task acknowledgement
///
/// Every successful [`pop`](Self::pop) must be paired with exactly one
/// [`ack`](Self::ack). [`join`](Self::join) resolves once the queue is empty
/// and every popped item has been acknowledged.
#[derive(Debug)]
pub struct WorkQueue<T> {
    state: Mutex<QueueState<T>>,
    available: Semaphore,
    slots: Option<Semaphore>,
    capacity: Option<usize>,
    unfinished: watch::Sender<usize>,
}

impl<T> WorkQueue<T> {
    /// Creates a queue with no capacity limit
    pub fn unbounded() -> Self {
        Self::with_capacity(None)
    }

    /// Creates a queue holding at most `capacity` waiting items
    ///
    /// A capacity of zero is treated as one.
    pub fn bounded(capacity: usize) -> Self {
        Self::with_capacity(Some(capacity.max(1)))
    }

    /// Creates a queue that is bounded when `capacity` is `Some`
    pub fn with_capacity(capacity: Option<usize>) -> Self {
        let (unfinished, _) = watch::channel(0);
        Self {
            state: Mutex::new(QueueState {
                items: VecDeque::new(),
                in_flight: 0,
                pushed: 0,
                acked: 0,
                closed: false,
            }),
            available: Semaphore::new(0),
            slots: capacity.map(Semaphore::new),
            capacity,
            unfinished,
        }
    }

    fn lock(&self) -> MutexGuard<'_, QueueState<T>> {
        // State is only mutated in short non-panicking sections.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Appends an item, waiting for a free slot if the queue is bounded and full
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::Closed`] if the queue has been closed.
    pub async fn push(&self, item: T) -> Result<(), QueueError> {
        if let Some(slots) = &self.slots {
            let permit = slots.acquire().await.map_err(|_| QueueError::Closed)?;
            permit.forget();
        }

        {
            let mut state = self.lock();
            if state.closed {
                return Err(QueueError::Closed);
            }
            state.items.push_back(item);
            state.pushed += 1;
            self.unfinished.send_modify(|n| *n += 1);
        }
        self.available.add_permits(1);
        Ok(())
    }

    /// Removes the oldest item, waiting until one is available
    ///
    /// Returns `None` only after the queue has been closed.
    pub async fn pop(&self) -> Option<T> {
        let permit = self.available.acquire().await.ok()?;
        permit.forget();

        let item = {
            let mut state = self.lock();
            let item = state.items.pop_front()?;
            state.in_flight += 1;
            item
        };

        if let Some(slots) = &self.slots {
            slots.add_permits(1);
        }
        Some(item)
    }

    /// Marks one previously popped item as fully processed
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::UnmatchedAck`] if no popped item is outstanding.
    pub fn ack(&self) -> Result<(), QueueError> {
        let mut state = self.lock();
        if state.in_flight == 0 {
            return Err(QueueError::UnmatchedAck);
        }
        state.in_flight -= 1;
        state.acked += 1;
        self.unfinished.send_modify(|n| *n -= 1);
        Ok(())
    }

    /// Waits until the queue is empty and every popped item has been acknowledged
    pub async fn join(&self) {
        let mut rx = self.unfinished.subscribe();
        // The sender lives as long as `self`, so this cannot observe a closed channel.
        let _ = rx.wait_for(|n| *n == 0).await;
    }

    /// Closes the queue
    ///
    /// Waiting and future poppers receive `None`; pushes fail with
    /// [`QueueError::Closed`]. Items still queued are dropped and no longer
    /// count as unfinished; items already in flight still need their ack.
    pub fn close(&self) {
        let dropped = {
            let mut state = self.lock();
            state.closed = true;
            let dropped = state.items.len();
            state.items.clear();
            self.unfinished.send_modify(|n| *n -= dropped);
            dropped
        };

        self.available.close();
        if let Some(slots) = &self.slots {
            slots.close();
        }

        if dropped > 0 {
            tracing::debug!("Closed work queue with {} unprocessed items", dropped);
        }
    }

    /// Returns true once [`close`](Self::close) has been called
    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    /// Number of items waiting to be popped
    pub fn len(&self) -> usize {
        self.lock().items.len()
    }

    /// Returns true if no items are waiting to be popped
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of popped items not yet acknowledged
    pub fn in_flight(&self) -> usize {
        self.lock().in_flight
    }

    /// Number of pushed items not yet acknowledged
    pub fn unfinished(&self) -> usize {
        *self.unfinished.borrow()
    }

    /// Total number of items ever pushed
    pub fn pushed(&self) -> u64 {
        self.lock().pushed
    }

    /// Total number of acknowledgements received
    pub fn acked(&self) -> u64 {
        self.lock().acked
    }

    /// Configured capacity, `None` when unbounded
    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }
}

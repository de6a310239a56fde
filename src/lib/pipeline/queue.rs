//! Bounded, joinable work queue.
//!
//! A crossbeam bounded channel carries the items; a mutex-guarded pair of counters
//! tracks how many items were enqueued and how many were acknowledged by a consumer.
//! [`JoinableQueue::join`] blocks until the two counters meet.
//!
//! ```text
//!   put ──> [ bounded channel ] ──> get ──> ... ──> task_done
//!    │                                                  │
//!    └── enqueued += 1                acknowledged += 1 ┘
//!                     join() waits for enqueued == acknowledged
//! ```
//!
//! Shutdown markers are items like any other: they are counted on `put_shutdown`
//! and must be acknowledged by the worker that receives them.

use std::sync::Arc;

use crossbeam_channel::{Receiver, Sender, bounded};
use parking_lot::{Condvar, Mutex};

use crate::errors::{CompscoreError, Result};

/// An entry on the queue: a unit of work, or a request for one worker to exit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkItem<T> {
    Work(T),
    Shutdown,
}

#[derive(Debug, Default)]
struct Counters {
    enqueued: u64,
    acknowledged: u64,
}

#[derive(Debug, Default)]
struct Shared {
    counters: Mutex<Counters>,
    drained: Condvar,
}

/// A cloneable handle to a bounded FIFO with acknowledgement tracking.
#[derive(Debug)]
pub struct JoinableQueue<T> {
    tx: Sender<WorkItem<T>>,
    rx: Receiver<WorkItem<T>>,
    shared: Arc<Shared>,
}

impl<T> Clone for JoinableQueue<T> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
            rx: self.rx.clone(),
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T> JoinableQueue<T> {
    /// Creates a queue holding at most `capacity` items.
    ///
    /// # Errors
    /// Returns [`CompscoreError::InvalidParameter`] if `capacity` is zero.
    pub fn new(capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(CompscoreError::InvalidParameter {
                parameter: "queue-size".to_string(),
                reason: "must be >= 1".to_string(),
            });
        }
        let (tx, rx) = bounded(capacity);
        Ok(Self { tx, rx, shared: Arc::new(Shared::default()) })
    }

    /// Enqueues a unit of work, blocking while the queue is full.
    ///
    /// # Errors
    /// Fails only if the channel is disconnected, which cannot happen while this
    /// handle is alive.
    pub fn put(&self, item: T) -> Result<()> {
        self.send(WorkItem::Work(item))
    }

    /// Enqueues one shutdown marker.
    ///
    /// # Errors
    /// See [`JoinableQueue::put`].
    pub fn put_shutdown(&self) -> Result<()> {
        self.send(WorkItem::Shutdown)
    }

    /// Dequeues the next item, blocking while the queue is empty.
    ///
    /// # Errors
    /// Fails only if the channel is disconnected.
    pub fn get(&self) -> Result<WorkItem<T>> {
        self.rx.recv().map_err(|_| CompscoreError::QueueProtocol {
            reason: "batch queue disconnected".to_string(),
        })
    }

    /// Acknowledges one dequeued item.
    ///
    /// # Errors
    /// Returns [`CompscoreError::QueueProtocol`] when called more times than items
    /// were enqueued.
    pub fn task_done(&self) -> Result<()> {
        let mut counters = self.shared.counters.lock();
        if counters.acknowledged >= counters.enqueued {
            return Err(CompscoreError::QueueProtocol {
                reason: format!(
                    "task_done called more times than items were enqueued ({})",
                    counters.enqueued
                ),
            });
        }
        counters.acknowledged += 1;
        if counters.acknowledged == counters.enqueued {
            self.shared.drained.notify_all();
        }
        Ok(())
    }

    /// Blocks until every enqueued item has been acknowledged.
    pub fn join(&self) {
        let mut counters = self.shared.counters.lock();
        while counters.acknowledged < counters.enqueued {
            self.shared.drained.wait(&mut counters);
        }
    }

    /// Total items ever enqueued, work and shutdown markers alike.
    #[must_use]
    pub fn enqueued(&self) -> u64 {
        self.shared.counters.lock().enqueued
    }

    /// Total items acknowledged so far.
    #[must_use]
    pub fn acknowledged(&self) -> u64 {
        self.shared.counters.lock().acknowledged
    }

    /// Items currently waiting in the queue.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rx.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }

    fn send(&self, item: WorkItem<T>) -> Result<()> {
        // Counted before the send: a consumer must never see an uncounted item.
        self.shared.counters.lock().enqueued += 1;
        if self.tx.send(item).is_err() {
            self.shared.counters.lock().enqueued -= 1;
            return Err(CompscoreError::QueueProtocol {
                reason: "batch queue disconnected".to_string(),
            });
        }
        Ok(())
    }
}

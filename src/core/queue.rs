//! Hand-off buffer between the watcher thread and the UI loop.
//!
//! The producer half is a cloneable [`EventProducer`] that the watcher thread
//! owns; the UI keeps the [`EventQueue`] and empties it with
//! [`EventQueue::drain_all`]. Neither side ever blocks on the other.

use std::sync::mpsc::{self, Receiver, Sender, SyncSender, TrySendError};

use thiserror::Error;

use super::events::FileEvent;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum QueueError {
    #[error("event queue is full (capacity {capacity})")]
    Full { capacity: usize },
    #[error("event queue has been dropped")]
    Closed,
}

#[derive(Debug, Clone)]
enum Tx {
    Unbounded(Sender<FileEvent>),
    Bounded {
        tx: SyncSender<FileEvent>,
        capacity: usize,
    },
}

/// Sending half of an [`EventQueue`].
#[derive(Debug, Clone)]
pub struct EventProducer {
    tx: Tx,
}

impl EventProducer {
    /// Enqueues an event without blocking.
    pub fn push(&self, event: FileEvent) -> Result<(), QueueError> {
        match &self.tx {
            Tx::Unbounded(tx) => tx.send(event).map_err(|_| QueueError::Closed),
            Tx::Bounded { tx, capacity } => tx.try_send(event).map_err(|err| match err {
                TrySendError::Full(_) => QueueError::Full {
                    capacity: *capacity,
                },
                TrySendError::Disconnected(_) => QueueError::Closed,
            }),
        }
    }
}

/// FIFO queue of [`FileEvent`]s with a non-blocking drain.
#[derive(Debug)]
pub struct EventQueue {
    producer: EventProducer,
    rx: Receiver<FileEvent>,
}

impl Default for EventQueue {
    fn default() -> Self {
        Self::unbounded()
    }
}

impl EventQueue {
    pub fn unbounded() -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            producer: EventProducer {
                tx: Tx::Unbounded(tx),
            },
            rx,
        }
    }

    /// A queue holding at most `capacity` pending events. Pushing into a
    /// full queue fails with [`QueueError::Full`] instead of blocking.
    pub fn bounded(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (tx, rx) = mpsc::sync_channel(capacity);
        Self {
            producer: EventProducer {
                tx: Tx::Bounded { tx, capacity },
            },
            rx,
        }
    }

    pub fn capacity(&self) -> Option<usize> {
        match &self.producer.tx {
            Tx::Unbounded(_) => None,
            Tx::Bounded { capacity, .. } => Some(*capacity),
        }
    }

    pub fn producer(&self) -> EventProducer {
        self.producer.clone()
    }

    pub fn push(&self, event: FileEvent) -> Result<(), QueueError> {
        self.producer.push(event)
    }

    /// Removes and returns everything currently queued, in arrival order.
    pub fn drain_all(&self) -> Vec<FileEvent> {
        self.rx.try_iter().collect()
    }
}

//! Bounded task queue with a completion barrier
//!
//! The queue is the hand-off point between submitters and workers: a
//! bounded FIFO channel plus an "unfinished count" tracking every task that
//! has been enqueued but not yet marked complete. Waiters blocked in
//! [`TaskQueue::await_completion`] are released only when that count
//! reaches zero.

use crate::error::{PoolError, Result};
use crate::types::Task;
use std::time::Duration;
use tokio::sync::{mpsc, watch};

/// Bounded, thread-safe FIFO of tasks supporting a bounded-poll dequeue and
/// a completion barrier
///
/// Dequeue blocks at most `poll_interval` before returning `None`, letting
/// workers re-check a cancellation signal without blocking indefinitely.
#[derive(Debug)]
pub struct TaskQueue {
    tx: mpsc::Sender<Task>,
    rx: tokio::sync::Mutex<mpsc::Receiver<Task>>,
    unfinished_tx: watch::Sender<usize>,
    unfinished_rx: watch::Receiver<usize>,
    capacity: usize,
}

impl TaskQueue {
    /// Create a queue buffering at most `capacity` undispatched tasks
    pub fn new(capacity: usize) -> Self {
        let (tx, rx) = mpsc::channel(capacity);
        let (unfinished_tx, unfinished_rx) = watch::channel(0);
        Self {
            tx,
            rx: tokio::sync::Mutex::new(rx),
            unfinished_tx,
            unfinished_rx,
            capacity,
        }
    }

    /// Append a task and increment the unfinished count
    ///
    /// Waits for capacity when the queue is full (backpressure). The
    /// unfinished count is incremented *before* the send so a consumer that
    /// dequeues and completes the task immediately cannot race the barrier
    /// below zero.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::QueueClosed`] if the queue was closed.
    pub async fn enqueue(&self, task: Task) -> Result<()> {
        self.unfinished_tx.send_modify(|count| *count += 1);

        if self.tx.send(task).await.is_err() {
            // Closed queue: roll the count back so the barrier stays exact.
            self.unfinished_tx
                .send_modify(|count| *count = count.saturating_sub(1));
            return Err(PoolError::QueueClosed.into());
        }

        Ok(())
    }

    /// Remove the head task, blocking up to `poll_interval`
    ///
    /// Returns `None` on timeout or when the queue is closed and drained,
    /// so callers can re-check external state and poll again.
    pub async fn dequeue(&self, poll_interval: Duration) -> Option<Task> {
        let recv = async {
            let mut rx = self.rx.lock().await;
            rx.recv().await
        };

        match tokio::time::timeout(poll_interval, recv).await {
            Ok(task) => task,
            Err(_) => None,
        }
    }

    /// Decrement the unfinished count, releasing completion waiters at zero
    pub fn mark_done(&self) {
        self.unfinished_tx
            .send_modify(|count| *count = count.saturating_sub(1));
    }

    /// Block until every enqueued task has been marked complete
    ///
    /// Returns immediately if nothing is unfinished (including the case
    /// where nothing was ever enqueued).
    pub async fn await_completion(&self) {
        let mut rx = self.unfinished_rx.clone();
        // The sender lives in `self`, so wait_for can only fail if the
        // queue is being dropped out from under the waiter.
        let _ = rx.wait_for(|count| *count == 0).await;
    }

    /// Stop accepting new tasks
    ///
    /// Already-buffered tasks can still be dequeued; subsequent `enqueue`
    /// calls fail with [`PoolError::QueueClosed`].
    pub async fn close(&self) {
        self.rx.lock().await.close();
    }

    /// Number of tasks buffered in the queue, not yet dequeued
    pub fn len(&self) -> usize {
        self.capacity.saturating_sub(self.tx.capacity())
    }

    /// True if no tasks are buffered
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of enqueued tasks not yet marked complete
    pub fn unfinished(&self) -> usize {
        *self.unfinished_rx.borrow()
    }

    /// True once every enqueued task has been marked complete
    pub fn is_drained(&self) -> bool {
        self.unfinished() == 0
    }
}

//! Worker pool — fixed set of workers draining the shared task queue.
//!
//! The pool and its methods are organized by concern:
//! - this module - pool construction, submission, lifecycle control
//! - [`worker`] - the worker loop and per-task processing
//!
//! Workers run as tasks on tokio's multi-thread runtime, so they execute in
//! parallel across OS threads. Shutdown is cooperative: `stop()` cancels a
//! shared token, and each worker observes it between tasks — never mid-task
//! and never by forced termination.

mod worker;


use crate::config::PoolConfig;
use crate::counter::SharedCounter;
use crate::error::{PoolError, Result};
use crate::queue::TaskQueue;
use crate::types::{Event, QueueStats, Task, TaskStatus};

use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio_util::sync::CancellationToken;

/// Buffer size for the event broadcast channel
const EVENT_CHANNEL_CAPACITY: usize = 1000;

/// Processes one task at a time on behalf of a worker
///
/// Implementations are shared across all workers, so any internal state
/// must be safe for concurrent calls. Returning an error marks the task
/// [`TaskStatus::Failed`] without stopping the worker loop.
#[async_trait]
pub trait TaskHandler: Send + Sync {
    /// Process a single task, returning its result payload
    async fn handle(&self, task: &Task) -> Result<String>;
}

/// Fixed set of workers draining a shared [`TaskQueue`]
///
/// Each worker polls the queue with a bounded timeout, processes the task
/// through the shared [`TaskHandler`], records the result on the task,
/// marks it done, and increments the shared counter. Per-task failures are
/// recorded and never crash the worker or its siblings.
pub struct WorkerPool {
    config: PoolConfig,
    queue: Arc<TaskQueue>,
    counter: Arc<SharedCounter>,
    handler: Arc<dyn TaskHandler>,
    event_tx: tokio::sync::broadcast::Sender<Event>,
    cancel: CancellationToken,
    started: AtomicBool,
    accepting: AtomicBool,
    worker_count: AtomicUsize,
    workers: tokio::sync::Mutex<Vec<tokio::task::JoinHandle<()>>>,
    completed: Arc<tokio::sync::Mutex<Vec<Task>>>,
}

impl WorkerPool {
    /// Create a pool around `handler`
    ///
    /// No workers run until [`start()`](Self::start) is called.
    pub fn new(config: PoolConfig, handler: Arc<dyn TaskHandler>) -> Self {
        let (event_tx, _rx) = tokio::sync::broadcast::channel(EVENT_CHANNEL_CAPACITY);

        Self {
            queue: Arc::new(TaskQueue::new(config.queue_capacity)),
            counter: Arc::new(SharedCounter::new()),
            config,
            handler,
            event_tx,
            cancel: CancellationToken::new(),
            started: AtomicBool::new(false),
            accepting: AtomicBool::new(true),
            worker_count: AtomicUsize::new(0),
            workers: tokio::sync::Mutex::new(Vec::new()),
            completed: Arc::new(tokio::sync::Mutex::new(Vec::new())),
        }
    }

    /// Launch `worker_count` workers
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::InvalidWorkerCount`] for a zero count and
    /// [`PoolError::AlreadyStarted`] if the pool is already running.
    pub async fn start(&self, worker_count: usize) -> Result<()> {
        if worker_count == 0 {
            return Err(PoolError::InvalidWorkerCount { requested: 0 }.into());
        }

        if self.started.swap(true, Ordering::SeqCst) {
            return Err(PoolError::AlreadyStarted {
                workers: self.worker_count.load(Ordering::SeqCst),
            }
            .into());
        }
        self.worker_count.store(worker_count, Ordering::SeqCst);

        let mut workers = self.workers.lock().await;
        for index in 0..worker_count {
            let ctx = worker::WorkerContext {
                index,
                queue: Arc::clone(&self.queue),
                counter: Arc::clone(&self.counter),
                handler: Arc::clone(&self.handler),
                event_tx: self.event_tx.clone(),
                cancel: self.cancel.clone(),
                poll_interval: self.config.poll_interval,
                completed: Arc::clone(&self.completed),
            };
            workers.push(tokio::spawn(worker::worker_loop(ctx)));
        }

        tracing::info!(worker_count, "worker pool started");
        self.emit_event(Event::WorkersStarted {
            count: worker_count,
        });

        Ok(())
    }

    /// Submit a task for processing
    ///
    /// Waits for queue capacity when the queue is full.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::NotStarted`] before [`start()`](Self::start)
    /// and [`PoolError::ShuttingDown`] after [`stop()`](Self::stop).
    pub async fn submit(&self, task: Task) -> Result<()> {
        if !self.started.load(Ordering::SeqCst) {
            return Err(PoolError::NotStarted.into());
        }
        if !self.accepting.load(Ordering::SeqCst) {
            return Err(PoolError::ShuttingDown.into());
        }

        let id = task.id;
        self.queue.enqueue(task).await?;
        self.emit_event(Event::TaskQueued { id });

        Ok(())
    }

    /// Initiate cooperative shutdown
    ///
    /// Stops accepting new tasks, closes the queue's intake, and cancels
    /// the shared token. A worker processing a task finishes it first; idle
    /// workers exit within one poll interval. Undispatched tasks remain in
    /// the queue and are dropped with the pool.
    pub async fn stop(&self) {
        tracing::info!("initiating graceful shutdown");
        self.accepting.store(false, Ordering::SeqCst);
        self.queue.close().await;
        self.cancel.cancel();
        self.emit_event(Event::Shutdown);
    }

    /// Block until every worker has exited its loop
    ///
    /// Bounded by workers observing the cancellation token; a worker that
    /// panicked is logged and does not fail the join.
    pub async fn join(&self) {
        let handles: Vec<_> = self.workers.lock().await.drain(..).collect();
        for handle in handles {
            if let Err(e) = handle.await {
                tracing::warn!(error = %e, "worker failed during join");
            }
        }
        tracing::info!("all workers joined");
    }

    /// Block until every submitted task has been marked complete
    ///
    /// Returns immediately if nothing was submitted.
    pub async fn await_completion(&self) {
        self.queue.await_completion().await;
    }

    /// Current value of the shared counter (== completed task count)
    pub fn counter_value(&self) -> u64 {
        self.counter.value()
    }

    /// Snapshot of queue and pool statistics
    pub async fn stats(&self) -> QueueStats {
        let completed = self.completed.lock().await;
        let failed = completed
            .iter()
            .filter(|task| task.status == TaskStatus::Failed)
            .count();

        QueueStats {
            queued: self.queue.len(),
            unfinished: self.queue.unfinished(),
            completed: completed.len() - failed,
            failed,
        }
    }

    /// Tasks processed so far, with result slots and terminal statuses
    ///
    /// Order reflects completion time, not submission order.
    pub async fn completed_tasks(&self) -> Vec<Task> {
        self.completed.lock().await.clone()
    }

    /// Subscribe to pool events
    ///
    /// Multiple subscribers are supported; each receives all events
    /// independently. A subscriber lagging more than the channel buffer
    /// receives a `RecvError::Lagged`.
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Dropped silently when no subscriber is listening, so processing
    /// never depends on an active listener.
    pub(crate) fn emit_event(&self, event: Event) {
        self.event_tx.send(event).ok();
    }
}

impl std::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool")
            .field("started", &self.started.load(Ordering::SeqCst))
            .field("accepting", &self.accepting.load(Ordering::SeqCst))
            .field("worker_count", &self.worker_count.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

//! Worker loop — bounded-poll dequeue, per-task processing, failure containment.

use crate::counter::SharedCounter;
use crate::queue::TaskQueue;
use crate::types::{Event, Task, TaskStatus};

use super::TaskHandler;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Everything one worker needs, cloned out of the pool at spawn time
pub(crate) struct WorkerContext {
    /// Worker index, used in events and log fields
    pub(crate) index: usize,
    /// Shared task queue
    pub(crate) queue: Arc<TaskQueue>,
    /// Shared completion counter
    pub(crate) counter: Arc<SharedCounter>,
    /// Task handler shared by all workers
    pub(crate) handler: Arc<dyn TaskHandler>,
    /// Event broadcast sender
    pub(crate) event_tx: tokio::sync::broadcast::Sender<Event>,
    /// Pool-wide cancellation token
    pub(crate) cancel: CancellationToken,
    /// Bounded dequeue poll interval
    pub(crate) poll_interval: Duration,
    /// Store receiving processed tasks
    pub(crate) completed: Arc<tokio::sync::Mutex<Vec<Task>>>,
}

/// Main worker loop
///
/// Races the cancellation token against a bounded dequeue. A task already
/// dequeued is always processed to completion — cancellation is observed
/// only between tasks, so shutdown never abandons in-flight work.
pub(crate) async fn worker_loop(ctx: WorkerContext) {
    tracing::debug!(worker = ctx.index, "worker started");

    loop {
        // Observed between tasks so an in-flight task always finishes.
        if ctx.cancel.is_cancelled() {
            break;
        }

        tokio::select! {
            _ = ctx.cancel.cancelled() => break,
            maybe_task = ctx.queue.dequeue(ctx.poll_interval) => {
                match maybe_task {
                    Some(task) => process_task(&ctx, task).await,
                    // Poll timed out; re-check shutdown before polling again.
                    None => {
                        if ctx.cancel.is_cancelled() {
                            break;
                        }
                    }
                }
            }
        }
    }

    ctx.event_tx
        .send(Event::WorkerStopped { worker: ctx.index })
        .ok();
    tracing::debug!(worker = ctx.index, "worker stopped");
}

/// Process a single task
///
/// Handler errors are local to the task: the failure is recorded on the
/// task and the worker keeps draining. The completed store is updated
/// *before* `mark_done()` so a waiter released by the completion barrier
/// always observes the task's terminal state.
async fn process_task(ctx: &WorkerContext, mut task: Task) {
    ctx.event_tx
        .send(Event::TaskStarted {
            id: task.id,
            worker: ctx.index,
        })
        .ok();
    tracing::debug!(task_id = task.id.0, worker = ctx.index, "processing task");

    match ctx.handler.handle(&task).await {
        Ok(output) => {
            task.result = Some(output);
            task.status = TaskStatus::Done;
            ctx.event_tx
                .send(Event::TaskCompleted {
                    id: task.id,
                    worker: ctx.index,
                })
                .ok();
        }
        Err(e) => {
            tracing::warn!(
                task_id = task.id.0,
                worker = ctx.index,
                error = %e,
                "task processing failed"
            );
            task.error = Some(e.to_string());
            task.status = TaskStatus::Failed;
            ctx.event_tx
                .send(Event::TaskFailed {
                    id: task.id,
                    worker: ctx.index,
                    error: e.to_string(),
                })
                .ok();
        }
    }

    ctx.completed.lock().await.push(task);
    ctx.queue.mark_done();
    ctx.counter.increment();

    if ctx.queue.is_drained() {
        ctx.event_tx.send(Event::Drained).ok();
    }
}

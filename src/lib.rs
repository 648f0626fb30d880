//! # taskmill
//!
//! Concurrent task-processing library: worker pools with graceful
//! shutdown, fan-out fetch pipelines, and deadline supervision.
//!
//! ## Design Philosophy
//!
//! taskmill deliberately carries two concurrency disciplines side by side:
//! - **Thread-parallel** - a fixed worker pool drains a bounded task queue,
//!   with the only shared mutable state behind narrow locks
//! - **Cooperative** - a fetch orchestrator multiplexes many in-flight
//!   requests on one logical thread, with failures captured as data
//! - **Cancellation is cooperative** - shutdown and deadlines are requests
//!   observed at suspension points, never forced termination
//! - **Library-first** - no CLI or UI; consumers subscribe to events
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use taskmill::{PoolConfig, Result, Task, TaskHandler, WorkerPool};
//!
//! struct Uppercase;
//!
//! #[async_trait::async_trait]
//! impl TaskHandler for Uppercase {
//!     async fn handle(&self, task: &Task) -> Result<String> {
//!         Ok(task.payload.to_uppercase())
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let pool = WorkerPool::new(PoolConfig::default(), Arc::new(Uppercase));
//!     pool.start(3).await?;
//!
//!     for task in Task::batch(10, |i| format!("data-{i}")) {
//!         pool.submit(task).await?;
//!     }
//!
//!     pool.await_completion().await;
//!     pool.stop().await;
//!     pool.join().await;
//!
//!     assert_eq!(pool.counter_value(), 10);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Configuration types
pub mod config;
/// Thread-safe shared counter
pub mod counter;
/// Deadline supervision and background tasks
pub mod deadline;
/// Error types
pub mod error;
/// Fetch orchestrator and transport seam
pub mod fetch;
/// Worker pool
pub mod pool;
/// Bounded task queue with completion barrier
pub mod queue;
/// Core types and events
pub mod types;

// Re-export commonly used types
pub use config::{Config, DeadlineConfig, FetchConfig, PoolConfig};
pub use counter::SharedCounter;
pub use deadline::{BackgroundTask, DeadlineSupervisor, Outcome, run_with_deadline};
pub use error::{Error, PoolError, Result};
pub use fetch::{FetchOrchestrator, HttpTransport, ResultProcessor, Transport, TransportResponse};
pub use pool::{TaskHandler, WorkerPool};
pub use queue::TaskQueue;
pub use types::{
    Event, FetchFailure, FetchOutcome, FetchRequest, FetchResult, QueueStats, Task, TaskId,
    TaskStatus,
};

/// Helper function to run a worker pool until a termination signal.
///
/// Waits for a termination signal and then performs the pool's cooperative
/// shutdown sequence (`stop()` followed by `join()`).
///
/// - **Unix:** listens for SIGTERM and SIGINT.
/// - **Windows/other:** listens for Ctrl+C via `tokio::signal::ctrl_c()`.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use taskmill::{PoolConfig, Result, Task, TaskHandler, WorkerPool, run_until_shutdown};
///
/// # struct Uppercase;
/// # #[async_trait::async_trait]
/// # impl TaskHandler for Uppercase {
/// #     async fn handle(&self, task: &Task) -> Result<String> {
/// #         Ok(task.payload.to_uppercase())
/// #     }
/// # }
/// #[tokio::main]
/// async fn main() -> Result<()> {
///     let pool = WorkerPool::new(PoolConfig::default(), Arc::new(Uppercase));
///     pool.start(4).await?;
///
///     // Blocks until SIGTERM/SIGINT, then stops and joins the workers.
///     run_until_shutdown(&pool).await;
///     Ok(())
/// }
/// ```
pub async fn run_until_shutdown(pool: &WorkerPool) {
    wait_for_signal().await;
    pool.stop().await;
    pool.join().await;
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    // Signal registration can fail in restricted environments; fall back to
    // ctrl_c rather than refusing to shut down at all.
    match (signal(SignalKind::terminate()), signal(SignalKind::interrupt())) {
        (Ok(mut sigterm), Ok(mut sigint)) => {
            tokio::select! {
                _ = sigterm.recv() => tracing::info!("Received SIGTERM signal"),
                _ = sigint.recv() => tracing::info!("Received SIGINT signal (Ctrl+C)"),
            }
        }
        _ => {
            tracing::warn!("Could not register signal handlers, using ctrl_c fallback");
            tokio::signal::ctrl_c().await.ok();
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("Received Ctrl+C signal"),
        Err(e) => tracing::error!(error = %e, "Failed to listen for Ctrl+C signal"),
    }
}

//! Core types for taskmill

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Unique identifier for a task
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct TaskId(pub u64);

impl TaskId {
    /// Create a new TaskId
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Get the inner u64 value
    pub fn get(&self) -> u64 {
        self.0
    }
}

impl From<u64> for TaskId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl From<TaskId> for u64 {
    fn from(id: TaskId) -> Self {
        id.0
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for TaskId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.parse()?))
    }
}

/// Task processing status
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    /// Waiting to be processed
    Pending,
    /// Successfully processed
    Done,
    /// Processing failed
    Failed,
}

/// A unit of work submitted to the pool
///
/// The submitter owns the task until it is enqueued; ownership then
/// transfers to whichever worker dequeues it. The worker fills the result
/// slot (or the error slot on failure) and hands the task to the pool's
/// completed store, where the submitter can read it back after the run.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Task {
    /// Task identifier
    pub id: TaskId,
    /// Input payload
    pub payload: String,
    /// Output produced by the handler (unset until processed)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
    /// Error recorded when processing failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Terminal status
    pub status: TaskStatus,
}

impl Task {
    /// Create a new pending task
    pub fn new(id: impl Into<TaskId>, payload: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            payload: payload.into(),
            result: None,
            error: None,
            status: TaskStatus::Pending,
        }
    }

    /// Create `count` pending tasks with payloads produced by `payload_fn`
    ///
    /// Task IDs are assigned sequentially from zero.
    pub fn batch(count: u64, payload_fn: impl Fn(u64) -> String) -> Vec<Self> {
        (0..count).map(|i| Self::new(i, payload_fn(i))).collect()
    }
}

/// Snapshot of queue and pool statistics
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
pub struct QueueStats {
    /// Tasks sitting in the queue, not yet dequeued by a worker
    pub queued: usize,
    /// Tasks enqueued but not yet marked complete (includes in-flight)
    pub unfinished: usize,
    /// Tasks processed successfully
    pub completed: usize,
    /// Tasks that failed during processing
    pub failed: usize,
}

/// A single fetch request for the orchestrator
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FetchRequest {
    /// Opaque source identifier reported back in the result
    pub source: String,
    /// URL handed to the transport
    pub url: String,
}

impl FetchRequest {
    /// Create a request whose source identifier is the URL itself
    pub fn new(url: impl Into<String>) -> Self {
        let url = url.into();
        Self {
            source: url.clone(),
            url,
        }
    }

    /// Create a request with an explicit source identifier
    pub fn with_source(source: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            url: url.into(),
        }
    }
}

/// Structured failure marker for a single fetch or process operation
///
/// Failures are data, not raised errors: every [`FetchRequest`] yields a
/// [`FetchResult`], and a failed item carries one of these instead of a
/// payload.
#[derive(Clone, Debug, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FetchFailure {
    /// The transport returned a non-success HTTP status
    #[error("request failed with status {status}")]
    Status {
        /// HTTP status code outside the 2xx range
        status: u16,
    },

    /// The request exceeded the configured per-request timeout
    #[error("request timed out")]
    Timeout,

    /// The transport itself failed (connection, DNS, decode, ...)
    #[error("transport error: {reason}")]
    Transport {
        /// Human-readable transport failure description
        reason: String,
    },
}

/// Outcome of a single fetch operation
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum FetchOutcome {
    /// The request completed with a success status
    Success {
        /// HTTP status code
        status: u16,
        /// Response body decoded as JSON (`null` when the body is not JSON)
        payload: serde_json::Value,
    },
    /// The request failed; the failure is recorded, never raised
    Failed {
        /// Structured failure marker
        error: FetchFailure,
    },
}

/// Result of one fetch operation — always produced, success or failure
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FetchResult {
    /// Source identifier from the originating [`FetchRequest`]
    pub source: String,
    /// Success payload or structured failure
    #[serde(flatten)]
    pub outcome: FetchOutcome,
    /// Wall time spent on this request (monotonic clock)
    pub elapsed: Duration,
}

impl FetchResult {
    /// True if the fetch completed with a success status
    pub fn is_success(&self) -> bool {
        matches!(self.outcome, FetchOutcome::Success { .. })
    }

    /// The failure marker, if the fetch failed
    pub fn error(&self) -> Option<&FetchFailure> {
        match &self.outcome {
            FetchOutcome::Failed { error } => Some(error),
            FetchOutcome::Success { .. } => None,
        }
    }

    /// The response payload, if the fetch succeeded
    pub fn payload(&self) -> Option<&serde_json::Value> {
        match &self.outcome {
            FetchOutcome::Success { payload, .. } => Some(payload),
            FetchOutcome::Failed { .. } => None,
        }
    }
}

/// Event emitted during pool and pipeline lifecycles
///
/// Formatting and destination are the caller's concern — the library only
/// emits these over a broadcast channel and drops them when nobody listens.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// Task accepted into the queue
    TaskQueued {
        /// Task ID
        id: TaskId,
    },

    /// A worker began processing a task
    TaskStarted {
        /// Task ID
        id: TaskId,
        /// Index of the processing worker
        worker: usize,
    },

    /// Task processed successfully
    TaskCompleted {
        /// Task ID
        id: TaskId,
        /// Index of the processing worker
        worker: usize,
    },

    /// Task processing failed (worker continues)
    TaskFailed {
        /// Task ID
        id: TaskId,
        /// Index of the processing worker
        worker: usize,
        /// Handler error message
        error: String,
    },

    /// Worker pool launched its workers
    WorkersStarted {
        /// Number of workers launched
        count: usize,
    },

    /// A worker observed shutdown and exited its loop
    WorkerStopped {
        /// Index of the exited worker
        worker: usize,
    },

    /// The unfinished count reached zero — completion barrier released
    Drained,

    /// A fetch operation finished (success or recorded failure)
    FetchFinished {
        /// Source identifier of the request
        source: String,
        /// Whether the fetch succeeded
        success: bool,
        /// Wall time for the request in milliseconds
        elapsed_ms: u64,
    },

    /// The supervisor's budget elapsed before the main operation finished
    DeadlineExceeded {
        /// The budget that was exceeded, in milliseconds
        budget_ms: u64,
    },

    /// Graceful shutdown initiated
    Shutdown,
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_starts_pending_with_empty_slots() {
        let task = Task::new(7u64, "payload-7");
        assert_eq!(task.id, TaskId(7));
        assert_eq!(task.status, TaskStatus::Pending);
        assert!(task.result.is_none());
        assert!(task.error.is_none());
    }

    #[test]
    fn batch_assigns_sequential_ids() {
        let tasks = Task::batch(3, |i| format!("data-{i}"));
        assert_eq!(tasks.len(), 3);
        assert_eq!(tasks[0].id, TaskId(0));
        assert_eq!(tasks[2].payload, "data-2");
    }

    #[test]
    fn fetch_result_accessors_match_outcome() {
        let ok = FetchResult {
            source: "a".into(),
            outcome: FetchOutcome::Success {
                status: 200,
                payload: serde_json::json!({"id": 1}),
            },
            elapsed: Duration::from_millis(12),
        };
        assert!(ok.is_success());
        assert!(ok.error().is_none());
        assert_eq!(ok.payload().unwrap()["id"], 1);

        let failed = FetchResult {
            source: "b".into(),
            outcome: FetchOutcome::Failed {
                error: FetchFailure::Status { status: 503 },
            },
            elapsed: Duration::from_millis(3),
        };
        assert!(!failed.is_success());
        assert_eq!(failed.error(), Some(&FetchFailure::Status { status: 503 }));
    }

    #[test]
    fn events_serialize_with_type_tag() {
        let event = Event::TaskQueued { id: TaskId(1) };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "task_queued");
        assert_eq!(json["id"], 1);
    }
}

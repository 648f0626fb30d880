//! Configuration types for taskmill

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Worker pool configuration
///
/// Groups settings for the thread-parallel half of the library: how many
/// workers drain the queue, how often an idle worker re-checks shutdown,
/// and how many tasks the bounded queue buffers.
/// Used as a nested sub-config within [`Config`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PoolConfig {
    /// Default worker count used by demos and helpers (default: 4)
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Bounded dequeue poll interval (default: 100ms)
    ///
    /// An idle worker blocks at most this long before re-checking the
    /// cancellation token, so shutdown latency is bounded by one interval.
    #[serde(default = "default_poll_interval", with = "duration_ms_serde")]
    pub poll_interval: Duration,

    /// Task queue capacity (default: 256)
    ///
    /// A full queue applies backpressure: `submit` waits for capacity
    /// instead of rejecting the task.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            poll_interval: default_poll_interval(),
            queue_capacity: default_queue_capacity(),
        }
    }
}

/// Fetch pipeline configuration
///
/// Groups settings for the cooperative half of the library: per-request
/// timeout and the in-flight bounds for the fetch and process stages.
/// Used as a nested sub-config within [`Config`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Maximum in-flight fetch requests (default: 32)
    #[serde(default = "default_max_in_flight")]
    pub max_in_flight: usize,

    /// Per-request timeout (default: 30s)
    #[serde(default = "default_request_timeout", with = "duration_ms_serde")]
    pub request_timeout: Duration,

    /// Maximum concurrent process-stage operations (default: 8)
    #[serde(default = "default_process_concurrency")]
    pub process_concurrency: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            max_in_flight: default_max_in_flight(),
            request_timeout: default_request_timeout(),
            process_concurrency: default_process_concurrency(),
        }
    }
}

/// Deadline supervisor configuration
///
/// Used as a nested sub-config within [`Config`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DeadlineConfig {
    /// Overall time budget for the supervised operation (default: 10s)
    #[serde(default = "default_budget", with = "duration_ms_serde")]
    pub budget: Duration,

    /// Interval between background task ticks (default: 2s)
    #[serde(default = "default_background_interval", with = "duration_ms_serde")]
    pub background_interval: Duration,
}

impl Default for DeadlineConfig {
    fn default() -> Self {
        Self {
            budget: default_budget(),
            background_interval: default_background_interval(),
        }
    }
}

/// Main configuration for taskmill
///
/// Fields are organized into logical sub-configs:
/// - [`pool`](PoolConfig) — worker count, poll interval, queue capacity
/// - [`fetch`](FetchConfig) — request timeout, fan-out bounds
/// - [`deadline`](DeadlineConfig) — budget, background interval
///
/// All sub-config fields are flattened for serialization, so the JSON/TOML
/// format stays flat (no nesting).
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// Worker pool settings
    #[serde(flatten)]
    pub pool: PoolConfig,

    /// Fetch pipeline settings
    #[serde(flatten)]
    pub fetch: FetchConfig,

    /// Deadline supervisor settings
    #[serde(flatten)]
    pub deadline: DeadlineConfig,
}

fn default_workers() -> usize {
    4
}

fn default_poll_interval() -> Duration {
    Duration::from_millis(100)
}

fn default_queue_capacity() -> usize {
    256
}

fn default_max_in_flight() -> usize {
    32
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_process_concurrency() -> usize {
    8
}

fn default_budget() -> Duration {
    Duration::from_secs(10)
}

fn default_background_interval() -> Duration {
    Duration::from_secs(2)
}

// Duration serialization helper (milliseconds — intervals and budgets are
// routinely sub-second)
mod duration_ms_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

//! Fetch orchestrator — fan-out/fan-in over an opaque async transport.
//!
//! The orchestrator is the cooperative half of the library: many requests
//! are logically in flight on one scheduler, each suspending at its I/O
//! boundary. Per-item failures are captured as data inside the results;
//! a batch never aborts because one item failed.
//!
//! Organized by concern:
//! - this module - the orchestrator, fetch and process stages
//! - [`transport`] - the request/response seam and the bundled HTTP impl

mod transport;


pub use transport::{HttpTransport, Transport, TransportResponse};

use crate::config::FetchConfig;
use crate::error::{Error, Result};
use crate::types::{Event, FetchFailure, FetchOutcome, FetchRequest, FetchResult};

use async_trait::async_trait;
use futures::future::join_all;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;

/// Buffer size for the event broadcast channel
const EVENT_CHANNEL_CAPACITY: usize = 1000;

/// Second-stage processing applied to each fetched result
///
/// Implementations are shared across concurrent process operations. A
/// returned error is recorded for that item only; sibling items keep
/// processing.
#[async_trait]
pub trait ResultProcessor: Send + Sync {
    /// Process one fetched result
    async fn process(&self, result: &FetchResult) -> Result<()>;
}

/// Issues independent asynchronous requests, collects every outcome, and
/// drives a bounded-concurrency processing stage
///
/// Results are index-aligned to the input: `fetch_all(requests)[i]` always
/// corresponds to `requests[i]`, regardless of completion order.
pub struct FetchOrchestrator {
    transport: Arc<dyn Transport>,
    config: FetchConfig,
    limiter: Arc<Semaphore>,
    event_tx: tokio::sync::broadcast::Sender<Event>,
}

impl FetchOrchestrator {
    /// Create an orchestrator over `transport`
    pub fn new(config: FetchConfig, transport: Arc<dyn Transport>) -> Self {
        let (event_tx, _rx) = tokio::sync::broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            transport,
            limiter: Arc::new(Semaphore::new(config.max_in_flight)),
            config,
            event_tx,
        }
    }

    /// Fetch every request, returning one result per input
    ///
    /// All requests are issued as independent concurrent operations,
    /// bounded by `max_in_flight`; individual failures (transport error,
    /// timeout, non-success status) are converted into
    /// [`FetchOutcome::Failed`] with the elapsed time rather than raised.
    /// The call itself never fails on behalf of an item.
    pub async fn fetch_all(&self, requests: &[FetchRequest]) -> Vec<FetchResult> {
        tracing::debug!(count = requests.len(), "fetching batch");

        let results = join_all(requests.iter().map(|request| self.fetch_one(request))).await;

        let failed = results.iter().filter(|r| !r.is_success()).count();
        tracing::info!(
            count = results.len(),
            failed,
            "fetch batch complete"
        );

        results
    }

    /// Fetch a single request, converting any failure into data
    async fn fetch_one(&self, request: &FetchRequest) -> FetchResult {
        let start = Instant::now();

        let outcome = match self.limiter.acquire().await {
            Ok(_permit) => {
                let attempt =
                    tokio::time::timeout(self.config.request_timeout, self.transport.get(&request.url))
                        .await;

                match attempt {
                    Ok(Ok(response)) if (200..300).contains(&response.status) => {
                        FetchOutcome::Success {
                            status: response.status,
                            payload: response.payload,
                        }
                    }
                    Ok(Ok(response)) => FetchOutcome::Failed {
                        error: FetchFailure::Status {
                            status: response.status,
                        },
                    },
                    Ok(Err(e)) => FetchOutcome::Failed {
                        error: classify_transport_error(&e),
                    },
                    Err(_) => FetchOutcome::Failed {
                        error: FetchFailure::Timeout,
                    },
                }
            }
            // The semaphore only closes if the orchestrator is torn down
            // mid-batch; record it as a failure like any other.
            Err(_) => FetchOutcome::Failed {
                error: FetchFailure::Transport {
                    reason: "fetch limiter closed".to_string(),
                },
            },
        };

        let elapsed = start.elapsed();
        let success = matches!(outcome, FetchOutcome::Success { .. });

        if let FetchOutcome::Failed { error } = &outcome {
            tracing::warn!(source = %request.source, error = %error, "fetch failed");
        }
        self.event_tx
            .send(Event::FetchFinished {
                source: request.source.clone(),
                success,
                elapsed_ms: elapsed.as_millis() as u64,
            })
            .ok();

        FetchResult {
            source: request.source.clone(),
            outcome,
            elapsed,
        }
    }

    /// Run the processing stage over fetched results
    ///
    /// One operation per result, at most `process_concurrency` in flight.
    /// Per-item processor errors are logged and returned in the
    /// index-aligned output; they never abort sibling processing.
    pub async fn process_all(
        &self,
        results: &[FetchResult],
        processor: Arc<dyn ResultProcessor>,
    ) -> Vec<Result<()>> {
        let limiter = Arc::new(Semaphore::new(self.config.process_concurrency));

        join_all(results.iter().map(|result| {
            let limiter = Arc::clone(&limiter);
            let processor = Arc::clone(&processor);
            async move {
                let _permit = match limiter.acquire().await {
                    Ok(permit) => permit,
                    Err(_) => {
                        return Err(Error::Other("process limiter closed".to_string()));
                    }
                };

                match processor.process(result).await {
                    Ok(()) => Ok(()),
                    Err(e) => {
                        tracing::warn!(source = %result.source, error = %e, "processing failed");
                        Err(e)
                    }
                }
            }
        }))
        .await
    }

    /// Full pipeline: fetch every request, then process every result
    ///
    /// Returns the fetch results; per-item processing failures are logged
    /// and do not surface (matching the fetch stage's failure policy).
    pub async fn run(
        &self,
        requests: &[FetchRequest],
        processor: Arc<dyn ResultProcessor>,
    ) -> Vec<FetchResult> {
        let results = self.fetch_all(requests).await;
        self.process_all(&results, processor).await;
        results
    }

    /// Subscribe to fetch events
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }
}

impl std::fmt::Debug for FetchOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetchOrchestrator")
            .field("max_in_flight", &self.config.max_in_flight)
            .field("request_timeout", &self.config.request_timeout)
            .finish_non_exhaustive()
    }
}

/// Map a transport error onto the structured failure marker
fn classify_transport_error(error: &Error) -> FetchFailure {
    match error {
        Error::Network(e) if e.is_timeout() => FetchFailure::Timeout,
        other => FetchFailure::Transport {
            reason: other.to_string(),
        },
    }
}

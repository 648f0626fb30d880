//! Deadline supervision for cooperative operations
//!
//! Wraps a unit of work with an overall time budget while an independent
//! periodic background activity runs alongside it. When the budget is
//! breached, both the main operation and the background activity are
//! cancelled cooperatively and the caller receives an explicit
//! [`Outcome::TimedOut`] instead of a raised timeout error.
//!
//! Cancellation here is a request, not an instantaneous stop: a cancelled
//! operation observes its token at the next suspension point and unwinds,
//! and the supervisor awaits that acknowledgment (bounded only by the
//! operation's cooperation) before returning.

use crate::config::DeadlineConfig;
use crate::error::{Error, Result};
use crate::types::Event;

use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Buffer size for the event broadcast channel
const EVENT_CHANNEL_CAPACITY: usize = 100;

/// Terminal outcome of a supervised run
///
/// "Work finished" and "budget exhausted" are first-class return values,
/// never control flow via errors.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outcome<T> {
    /// The main operation finished inside the budget
    Completed(T),
    /// The budget elapsed first; main and background were cancelled
    TimedOut,
}

impl<T> Outcome<T> {
    /// True if the budget was breached
    pub fn is_timed_out(&self) -> bool {
        matches!(self, Outcome::TimedOut)
    }

    /// The completed value, if the run finished in time
    pub fn completed(self) -> Option<T> {
        match self {
            Outcome::Completed(value) => Some(value),
            Outcome::TimedOut => None,
        }
    }
}

/// Periodic background activity driven for the duration of a supervised run
///
/// The supervisor calls `tick()` on a fixed interval and checks the
/// cancellation token at every iteration boundary, so a tick is never
/// interrupted mid-flight but no new tick starts after cancellation.
#[async_trait]
pub trait BackgroundTask: Send + Sync + 'static {
    /// Perform one iteration of the background activity
    async fn tick(&self);
}

/// Wraps a main operation with a time budget and a concurrent background
/// activity
///
/// Created per invocation semantics: each [`run`](Self::run) call gets its
/// own cancellation tree and background handle; the supervisor itself is
/// reusable configuration.
pub struct DeadlineSupervisor {
    config: DeadlineConfig,
    event_tx: tokio::sync::broadcast::Sender<Event>,
}

impl DeadlineSupervisor {
    /// Create a supervisor with the given budget and background interval
    pub fn new(config: DeadlineConfig) -> Self {
        let (event_tx, _rx) = tokio::sync::broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self { config, event_tx }
    }

    /// Subscribe to supervisor events
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    /// Run `main` under the configured budget with `background` ticking
    /// alongside it
    ///
    /// The main operation receives a child [`CancellationToken`]; it must
    /// observe the token at its suspension points to unwind promptly after
    /// a budget breach. The background activity is always cancelled and
    /// awaited before this returns, whichever side finishes first.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Task`] if the main operation panicked — an
    /// unexpected failure during unwind, distinct from the expected
    /// [`Outcome::TimedOut`].
    pub async fn run<F, Fut, T>(
        &self,
        background: Arc<dyn BackgroundTask>,
        main: F,
    ) -> Result<Outcome<T>>
    where
        F: FnOnce(CancellationToken) -> Fut,
        Fut: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let cancel = CancellationToken::new();
        let background_handle = spawn_background(
            background,
            self.config.background_interval,
            cancel.child_token(),
        );

        let mut main_handle = tokio::spawn(main(cancel.child_token()));

        tokio::select! {
            joined = &mut main_handle => {
                tracing::debug!("main operation finished inside budget");
                cancel.cancel();
                await_background(background_handle).await;

                match joined {
                    Ok(value) => Ok(Outcome::Completed(value)),
                    Err(e) => {
                        tracing::error!(error = %e, "main operation panicked");
                        Err(Error::Task("main operation panicked".to_string()))
                    }
                }
            }
            _ = tokio::time::sleep(self.config.budget) => {
                let budget_ms = self.config.budget.as_millis() as u64;
                tracing::warn!(budget_ms, "deadline exceeded, cancelling");
                self.event_tx.send(Event::DeadlineExceeded { budget_ms }).ok();

                cancel.cancel();

                // Await the main operation's acknowledgment; its eventual
                // value (if any) is discarded.
                match main_handle.await {
                    Ok(_) => tracing::debug!("main operation acknowledged cancellation"),
                    Err(e) => {
                        tracing::warn!(error = %e, "main operation failed during unwind");
                    }
                }
                await_background(background_handle).await;

                Ok(Outcome::TimedOut)
            }
        }
    }
}

impl std::fmt::Debug for DeadlineSupervisor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeadlineSupervisor")
            .field("budget", &self.config.budget)
            .field("background_interval", &self.config.background_interval)
            .finish_non_exhaustive()
    }
}

/// Run a main operation under `budget` with a background activity
///
/// Convenience wrapper constructing a one-shot [`DeadlineSupervisor`] with
/// the default background interval.
pub async fn run_with_deadline<F, Fut, T>(
    main: F,
    budget: std::time::Duration,
    background: Arc<dyn BackgroundTask>,
) -> Result<Outcome<T>>
where
    F: FnOnce(CancellationToken) -> Fut,
    Fut: Future<Output = T> + Send + 'static,
    T: Send + 'static,
{
    let supervisor = DeadlineSupervisor::new(DeadlineConfig {
        budget,
        ..DeadlineConfig::default()
    });
    supervisor.run(background, main).await
}

/// Spawn the periodic background loop
///
/// Ticks on a fixed interval (missed ticks are skipped, not bursted) and
/// exits at the first iteration boundary after cancellation.
fn spawn_background(
    task: Arc<dyn BackgroundTask>,
    interval: std::time::Duration,
    token: CancellationToken,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                _ = ticker.tick() => {
                    task.tick().await;
                }
            }
        }

        tracing::debug!("background task acknowledged cancellation");
    })
}

/// Await the background task's cancellation acknowledgment
///
/// A panic during unwind is logged but never blocks shutdown.
async fn await_background(handle: tokio::task::JoinHandle<()>) {
    if let Err(e) = handle.await {
        tracing::warn!(error = %e, "background task failed during unwind");
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::time::Duration;

    /// Background task that counts ticks and records cancellation
    struct Heartbeat {
        ticks: AtomicUsize,
    }

    impl Heartbeat {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                ticks: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl BackgroundTask for Heartbeat {
        async fn tick(&self) {
            self.ticks.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn test_supervisor(budget: Duration) -> DeadlineSupervisor {
        DeadlineSupervisor::new(DeadlineConfig {
            budget,
            background_interval: Duration::from_millis(20),
        })
    }

    #[tokio::test]
    async fn fast_main_completes_and_background_is_cancelled() {
        let supervisor = test_supervisor(Duration::from_millis(200));
        let heartbeat = Heartbeat::new();

        let outcome = supervisor
            .run(Arc::clone(&heartbeat) as Arc<dyn BackgroundTask>, |_token| async {
                tokio::time::sleep(Duration::from_millis(50)).await;
                42
            })
            .await
            .unwrap();

        assert_eq!(outcome, Outcome::Completed(42));

        // run() awaits the background handle before returning, so the tick
        // count is final here: no tick may land after this point.
        let ticks_at_return = heartbeat.ticks.load(Ordering::SeqCst);
        assert!(ticks_at_return >= 1, "background ran during the main operation");
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(
            heartbeat.ticks.load(Ordering::SeqCst),
            ticks_at_return,
            "background must stay cancelled"
        );
    }

    #[tokio::test]
    async fn slow_main_times_out_and_both_are_cancelled() {
        let supervisor = test_supervisor(Duration::from_millis(100));
        let heartbeat = Heartbeat::new();
        let main_cancelled = Arc::new(AtomicBool::new(false));

        let flag = Arc::clone(&main_cancelled);
        let outcome = supervisor
            .run(
                Arc::clone(&heartbeat) as Arc<dyn BackgroundTask>,
                move |token| async move {
                    tokio::select! {
                        _ = token.cancelled() => {
                            flag.store(true, Ordering::SeqCst);
                        }
                        _ = tokio::time::sleep(Duration::from_millis(500)) => {}
                    }
                },
            )
            .await
            .unwrap();

        assert!(outcome.is_timed_out());
        assert!(
            main_cancelled.load(Ordering::SeqCst),
            "main operation must observe cancellation"
        );

        let ticks_at_return = heartbeat.ticks.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(
            heartbeat.ticks.load(Ordering::SeqCst),
            ticks_at_return,
            "background must stay cancelled"
        );
    }

    #[tokio::test]
    async fn timeout_emits_deadline_event() {
        let supervisor = test_supervisor(Duration::from_millis(50));
        let mut events = supervisor.subscribe();

        let outcome = supervisor
            .run(Heartbeat::new() as Arc<dyn BackgroundTask>, |token| async move {
                token.cancelled().await;
            })
            .await
            .unwrap();
        assert!(outcome.is_timed_out());

        let mut saw_deadline = false;
        while let Ok(event) = events.try_recv() {
            if matches!(event, Event::DeadlineExceeded { budget_ms: 50 }) {
                saw_deadline = true;
            }
        }
        assert!(saw_deadline, "DeadlineExceeded event must be emitted");
    }

    #[tokio::test]
    async fn panicking_main_surfaces_as_error_not_timeout() {
        let supervisor = test_supervisor(Duration::from_millis(200));

        let result = supervisor
            .run(Heartbeat::new() as Arc<dyn BackgroundTask>, |_token| async {
                panic!("handler bug");
            })
            .await;

        assert!(matches!(result, Err(Error::Task(_))));
    }

    #[tokio::test]
    async fn run_with_deadline_convenience_wrapper() {
        let outcome = run_with_deadline(
            |_token| async { "done" },
            Duration::from_millis(200),
            Heartbeat::new() as Arc<dyn BackgroundTask>,
        )
        .await
        .unwrap();

        assert_eq!(outcome, Outcome::Completed("done"));
    }
}

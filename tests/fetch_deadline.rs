//! Fetch pipeline against a live HTTP mock, with and without a deadline.

mod common;

use common::Heartbeat;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use taskmill::{
    BackgroundTask, DeadlineConfig, DeadlineSupervisor, FetchConfig, FetchFailure,
    FetchOrchestrator, FetchRequest, FetchResult, HttpTransport, Outcome, ResultProcessor,
    Transport,
};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Mount `/posts/1` .. `/posts/count`; `failing` gets a 500, all get `delay`.
async fn mount_posts(server: &MockServer, count: usize, failing: Option<usize>, delay: Duration) {
    for i in 1..=count {
        let template = if Some(i) == failing {
            ResponseTemplate::new(500)
        } else {
            ResponseTemplate::new(200).set_body_json(serde_json::json!({ "id": i }))
        };

        Mock::given(method("GET"))
            .and(path(format!("/posts/{i}")))
            .respond_with(template.set_delay(delay))
            .mount(server)
            .await;
    }
}

fn post_requests(server: &MockServer, count: usize) -> Vec<FetchRequest> {
    (1..=count)
        .map(|i| {
            FetchRequest::with_source(format!("posts/{i}"), format!("{}/posts/{i}", server.uri()))
        })
        .collect()
}

fn orchestrator(request_timeout: Duration) -> FetchOrchestrator {
    let config = FetchConfig {
        max_in_flight: 8,
        request_timeout,
        process_concurrency: 4,
    };
    FetchOrchestrator::new(config, Arc::new(HttpTransport::new()) as Arc<dyn Transport>)
}

/// Processor that counts how many results it enriched
struct CountingProcessor {
    processed: AtomicUsize,
}

#[async_trait]
impl ResultProcessor for CountingProcessor {
    async fn process(&self, _result: &FetchResult) -> taskmill::Result<()> {
        tokio::time::sleep(Duration::from_millis(10)).await;
        self.processed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[tokio::test]
async fn http_fetch_returns_one_result_per_request() {
    let server = MockServer::start().await;
    mount_posts(&server, 5, Some(3), Duration::ZERO).await;

    let orchestrator = orchestrator(Duration::from_secs(5));
    let results = orchestrator.fetch_all(&post_requests(&server, 5)).await;

    assert_eq!(results.len(), 5);
    for (i, result) in results.iter().enumerate() {
        assert_eq!(result.source, format!("posts/{}", i + 1));
        if i + 1 == 3 {
            assert_eq!(result.error(), Some(&FetchFailure::Status { status: 500 }));
        } else {
            assert!(result.is_success());
            assert_eq!(result.payload().unwrap()["id"], i as u64 + 1);
        }
    }
}

#[tokio::test]
async fn pipeline_completes_under_deadline() {
    let server = MockServer::start().await;
    mount_posts(&server, 5, None, Duration::ZERO).await;

    let supervisor = DeadlineSupervisor::new(DeadlineConfig {
        budget: Duration::from_secs(2),
        background_interval: Duration::from_millis(50),
    });
    let heartbeat = Heartbeat::new();

    let orchestrator = Arc::new(orchestrator(Duration::from_secs(5)));
    let processor = Arc::new(CountingProcessor {
        processed: AtomicUsize::new(0),
    });
    let requests = post_requests(&server, 5);

    let run_orchestrator = Arc::clone(&orchestrator);
    let run_processor = Arc::clone(&processor) as Arc<dyn ResultProcessor>;
    let outcome = supervisor
        .run(
            Arc::clone(&heartbeat) as Arc<dyn BackgroundTask>,
            move |_token| async move { run_orchestrator.run(&requests, run_processor).await },
        )
        .await
        .unwrap();

    let results = match outcome {
        Outcome::Completed(results) => results,
        Outcome::TimedOut => panic!("pipeline should finish well inside the budget"),
    };

    assert_eq!(results.len(), 5);
    assert!(results.iter().all(FetchResult::is_success));
    assert_eq!(processor.processed.load(Ordering::SeqCst), 5);
    assert!(
        heartbeat.count() >= 1,
        "background must have ticked during the run"
    );
}

#[tokio::test]
async fn slow_pipeline_times_out_and_unwinds() {
    let server = MockServer::start().await;
    mount_posts(&server, 3, None, Duration::from_millis(500)).await;

    let supervisor = DeadlineSupervisor::new(DeadlineConfig {
        budget: Duration::from_millis(100),
        background_interval: Duration::from_millis(20),
    });
    let heartbeat = Heartbeat::new();
    let main_cancelled = Arc::new(AtomicBool::new(false));

    let orchestrator = Arc::new(orchestrator(Duration::from_secs(5)));
    let requests = post_requests(&server, 3);

    let run_orchestrator = Arc::clone(&orchestrator);
    let cancelled_flag = Arc::clone(&main_cancelled);
    let outcome = supervisor
        .run(
            Arc::clone(&heartbeat) as Arc<dyn BackgroundTask>,
            move |token| async move {
                tokio::select! {
                    _ = token.cancelled() => {
                        cancelled_flag.store(true, Ordering::SeqCst);
                        Vec::new()
                    }
                    results = run_orchestrator.fetch_all(&requests) => results,
                }
            },
        )
        .await
        .unwrap();

    assert!(outcome.is_timed_out());
    assert!(
        main_cancelled.load(Ordering::SeqCst),
        "main operation must observe cancellation at its suspension point"
    );

    // run() awaited both cancellations before returning; the background
    // counter must be frozen from here on.
    let ticks_at_return = heartbeat.count();
    tokio::time::sleep(Duration::from_millis(60)).await;
    assert_eq!(heartbeat.count(), ticks_at_return, "background must stay cancelled");
}

//! Fetch pipeline demo
//!
//! This demo exercises the cooperative half of taskmill:
//! - Fan-out fetching over the bundled HTTP transport
//! - A bounded-concurrency processing stage
//! - A periodic background task running alongside the pipeline
//! - An overall deadline that cancels everything on breach

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use taskmill::{
    BackgroundTask, DeadlineConfig, DeadlineSupervisor, FetchConfig, FetchOrchestrator,
    FetchRequest, FetchResult, HttpTransport, Outcome, ResultProcessor, Transport,
};

/// Processor that prints each result after a short enrichment delay
struct PrintingProcessor;

#[async_trait]
impl ResultProcessor for PrintingProcessor {
    async fn process(&self, result: &FetchResult) -> taskmill::Result<()> {
        tokio::time::sleep(Duration::from_millis(200)).await;

        println!("\nProcessed result from {}", result.source);
        println!("Time: {:?}", result.elapsed);
        match result.payload() {
            Some(payload) => println!("Data: {payload}"),
            None => println!("Error: {:?}", result.error()),
        }

        Ok(())
    }
}

/// Background task printing a heartbeat on every tick
struct Ticker;

#[async_trait]
impl BackgroundTask for Ticker {
    async fn tick(&self) {
        println!("\nPeriodic task executed");
    }
}

#[tokio::main]
async fn main() -> taskmill::Result<()> {
    let requests: Vec<FetchRequest> = (1..=5)
        .map(|i| FetchRequest::new(format!("https://jsonplaceholder.typicode.com/posts/{i}")))
        .collect();

    let orchestrator = Arc::new(FetchOrchestrator::new(
        FetchConfig::default(),
        Arc::new(HttpTransport::new()) as Arc<dyn Transport>,
    ));

    let supervisor = DeadlineSupervisor::new(DeadlineConfig {
        budget: Duration::from_secs(10),
        background_interval: Duration::from_secs(2),
    });

    println!("Fetching URLs...");

    let run_orchestrator = Arc::clone(&orchestrator);
    let outcome = supervisor
        .run(Arc::new(Ticker) as Arc<dyn BackgroundTask>, move |token| async move {
            tokio::select! {
                _ = token.cancelled() => Vec::new(),
                results = run_orchestrator.run(&requests, Arc::new(PrintingProcessor)) => results,
            }
        })
        .await?;

    match outcome {
        Outcome::Completed(results) => {
            let failed = results.iter().filter(|r| !r.is_success()).count();
            println!(
                "\nFetched {} URLs ({} failed)",
                results.len(),
                failed
            );
        }
        Outcome::TimedOut => {
            println!("\nTimeout occurred!");
        }
    }

    Ok(())
}

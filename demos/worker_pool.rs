//! Worker pool demo
//!
//! This demo exercises the thread-parallel half of taskmill:
//! - Creating a pool around a task handler
//! - Subscribing to events
//! - Submitting a batch of tasks
//! - Waiting on the completion barrier
//! - Cooperative stop/join shutdown

use rand::Rng;
use std::sync::Arc;
use std::time::Duration;
use taskmill::{Event, PoolConfig, Result, Task, TaskHandler, WorkerPool};

/// Handler that sleeps a random 100-500ms to simulate real work
struct SimulatedWork;

#[async_trait::async_trait]
impl TaskHandler for SimulatedWork {
    async fn handle(&self, task: &Task) -> Result<String> {
        let millis = rand::thread_rng().gen_range(100..500);
        tokio::time::sleep(Duration::from_millis(millis)).await;
        Ok(format!("Processed {} in {}ms", task.payload, millis))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let pool = WorkerPool::new(PoolConfig::default(), Arc::new(SimulatedWork));

    // Subscribe to events
    let mut events = pool.subscribe();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            match event {
                Event::TaskStarted { id, worker } => {
                    println!("Worker-{worker} processing Task {id}");
                }
                Event::Drained => {
                    println!("\nAll tasks processed");
                }
                _ => {}
            }
        }
    });

    println!("Starting workers...");
    pool.start(3).await?;

    for task in Task::batch(10, |i| format!("Data-{i}")) {
        pool.submit(task).await?;
    }

    // Wait for all tasks to be processed
    pool.await_completion().await;

    println!("\nStopping workers...");
    pool.stop().await;
    pool.join().await;

    println!("\nProcessed {} tasks", pool.counter_value());

    println!("\nResults:");
    let mut tasks = pool.completed_tasks().await;
    tasks.sort_by_key(|task| task.id);
    for task in tasks {
        println!("Task {}: {}", task.id, task.result.unwrap_or_default());
    }

    Ok(())
}

//! Shared helpers for integration tests.
#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use taskmill::{BackgroundTask, Result, Task, TaskHandler};

/// Handler that succeeds for every task
pub struct EchoHandler;

#[async_trait]
impl TaskHandler for EchoHandler {
    async fn handle(&self, task: &Task) -> Result<String> {
        Ok(format!("processed {}", task.payload))
    }
}

/// Background task counting its ticks
pub struct Heartbeat {
    pub ticks: AtomicUsize,
}

impl Heartbeat {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            ticks: AtomicUsize::new(0),
        })
    }

    pub fn count(&self) -> usize {
        self.ticks.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BackgroundTask for Heartbeat {
    async fn tick(&self) {
        self.ticks.fetch_add(1, Ordering::SeqCst);
    }
}

//! Thread-safe shared counter
//!
//! The counter is the one piece of state mutated by every worker in the
//! pool, so all mutation is serialized behind a mutex scoped to the
//! smallest possible critical section (a single integer add). A
//! `std::sync::Mutex` is used rather than tokio's because the lock is never
//! held across an await point.

use std::sync::Mutex;

/// Mutually-exclusive counter incremented by multiple workers
///
/// Every increment is observed exactly once regardless of the calling
/// thread; after a pool run, the counter equals the number of completed
/// tasks.
#[derive(Debug, Default)]
pub struct SharedCounter {
    value: Mutex<u64>,
}

impl SharedCounter {
    /// Create a counter starting at zero
    pub fn new() -> Self {
        Self::default()
    }

    /// Increment the counter, returning the post-increment value
    ///
    /// The lock is held only for the duration of the add.
    pub fn increment(&self) -> u64 {
        // A poisoned lock means a holder panicked mid-add; the integer
        // itself is still valid, so recover the guard and continue.
        let mut value = self
            .value
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        *value += 1;
        *value
    }

    /// Read the current count
    ///
    /// May be called while increments are in flight; the returned value was
    /// true at some instant, not necessarily the freshest possible value.
    pub fn value(&self) -> u64 {
        *self
            .value
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

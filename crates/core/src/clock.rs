// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Clock abstraction for testable time handling
//!
//! All scheduling decisions are made on epoch-millisecond timestamps, so the
//! clock reports wall time rather than a monotonic `Instant`.

use crate::time::{duration_millis, Timestamp};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// A clock that provides the current wall time in epoch milliseconds
pub trait Clock: Clone + Send + Sync + 'static {
    fn now(&self) -> Timestamp;
}

/// Real system clock
#[derive(Clone, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        chrono::Utc::now().timestamp_millis()
    }
}

/// Fake clock for testing with controllable time
#[derive(Clone)]
pub struct FakeClock {
    current: Arc<Mutex<Timestamp>>,
}

impl FakeClock {
    /// Create a fake clock starting at the given timestamp
    pub fn at(start: Timestamp) -> Self {
        Self {
            current: Arc::new(Mutex::new(start)),
        }
    }

    pub fn new() -> Self {
        Self::at(0)
    }

    /// Advance the clock by the given duration
    pub fn advance(&self, duration: Duration) {
        let mut current = self.current.lock().unwrap_or_else(|e| e.into_inner());
        *current = current.saturating_add(duration_millis(duration));
    }

    /// Set the clock to a specific timestamp
    pub fn set(&self, ts: Timestamp) {
        let mut current = self.current.lock().unwrap_or_else(|e| e.into_inner());
        *current = ts;
    }
}

impl Default for FakeClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for FakeClock {
    fn now(&self) -> Timestamp {
        *self.current.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
#[path = "clock_tests.rs"]
mod tests;

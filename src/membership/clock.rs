use super::types::Timestamp;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Source of local, non-decreasing time.
pub trait Clock: Send + Sync {
    fn now(&self) -> Timestamp;
}

/// Discrete clock advanced explicitly, one unit per simulated round.
#[derive(Debug, Default)]
pub struct LogicalClock {
    current: AtomicU64,
}

impl LogicalClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Moves time forward by one unit and returns the new value.
    pub fn advance(&self) -> Timestamp {
        self.current.fetch_add(1, Ordering::SeqCst) + 1
    }
}

impl Clock for LogicalClock {
    fn now(&self) -> Timestamp {
        self.current.load(Ordering::SeqCst)
    }
}

/// Milliseconds elapsed since the clock was created.
#[derive(Debug)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now(&self) -> Timestamp {
        self.origin.elapsed().as_millis() as Timestamp
    }
}

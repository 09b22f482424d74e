use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Instant, SystemTime, UNIX_EPOCH};

/// Source of pulse timestamps, injectable for deterministic tests
pub trait TimeProvider: Send + Sync {
    /// Nanoseconds since the Unix epoch
    fn now_nanos(&self) -> u64;
    fn now_micros(&self) -> u64 {
        self.now_nanos() / 1000
    }
}

/// System time provider using the wall clock
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemTimeProvider;

impl TimeProvider for SystemTimeProvider {
    fn now_nanos(&self) -> u64 {
        current_timestamp_nanos()
    }
}

/// Wall-clock anchored at creation, advanced by the monotonic clock
///
/// Timestamps never go backwards even if the system clock is stepped.
#[derive(Debug)]
pub struct MonotonicTimeProvider {
    anchor_nanos: u64,
    anchor: Instant,
}

impl MonotonicTimeProvider {
    pub fn new() -> Self {
        Self {
            anchor_nanos: current_timestamp_nanos(),
            anchor: Instant::now(),
        }
    }
}

impl Default for MonotonicTimeProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeProvider for MonotonicTimeProvider {
    fn now_nanos(&self) -> u64 {
        self.anchor_nanos
            .saturating_add(self.anchor.elapsed().as_nanos() as u64)
    }
}

/// Mock time provider for deterministic testing
///
/// Each read returns the current value and then advances by `step`.
#[derive(Debug)]
pub struct MockTimeProvider {
    current_time: AtomicU64,
    step: u64,
}

impl MockTimeProvider {
    pub fn new(initial_time_nanos: u64) -> Self {
        Self::with_step(initial_time_nanos, 0)
    }

    pub fn with_step(initial_time_nanos: u64, step: u64) -> Self {
        Self {
            current_time: AtomicU64::new(initial_time_nanos),
            step,
        }
    }

    pub fn advance_by(&self, nanos: u64) {
        self.current_time.fetch_add(nanos, Ordering::Relaxed);
    }

    pub fn set_time(&self, nanos: u64) {
        self.current_time.store(nanos, Ordering::Relaxed);
    }
}

impl TimeProvider for MockTimeProvider {
    fn now_nanos(&self) -> u64 {
        self.current_time.fetch_add(self.step, Ordering::Relaxed)
    }
}

pub fn current_timestamp_nanos() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos() as u64
}

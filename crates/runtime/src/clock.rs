//! An injectable clock, so workers never call `Instant::now()` directly.
//!
//! Per spec.md's Design Notes ("inject a context (clock, storage handle,
//! chain client, signer) into each worker at startup"): tests substitute a
//! [`ManualClock`] to exercise timeout-driven behavior (the Aggregator
//! Worker's flush-on-timeout path) without sleeping.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// A source of monotonic time.
pub trait Clock: Send + Sync {
    /// The current instant.
    fn now(&self) -> Instant;
}

/// The real wall clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// A clock whose time only advances when told to. Anchored to a real
/// `Instant` at construction since `std::time::Instant` has no "zero" value.
pub struct ManualClock {
    anchor: Instant,
    elapsed_millis: AtomicU64,
}

impl ManualClock {
    /// Construct a clock starting at the current real instant.
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            anchor: Instant::now(),
            elapsed_millis: AtomicU64::new(0),
        })
    }

    /// Advance the clock by `duration`.
    pub fn advance(&self, duration: Duration) {
        self.elapsed_millis
            .fetch_add(duration.as_millis() as u64, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.anchor + Duration::from_millis(self.elapsed_millis.load(Ordering::SeqCst))
    }
}

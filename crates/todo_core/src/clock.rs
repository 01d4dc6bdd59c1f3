//! Time source for repository timestamps.
//!
//! # Responsibility
//! - Provide epoch-millisecond timestamps to repositories.
//! - Allow tests to drive time explicitly instead of reading the wall clock.
//!
//! # Invariants
//! - `ManualClock` only changes when a caller sets or advances it.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

/// Source of "now" in Unix epoch milliseconds.
pub trait Clock: Send + Sync {
    fn now_ms(&self) -> i64;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> i64 {
        // A clock before 1970 reads as the epoch; repositories keep
        // `updated_at` monotonic on their own.
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX))
            .unwrap_or(0)
    }
}

/// Manually driven clock. Clones share the same underlying time.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    current_ms: Arc<AtomicI64>,
}

impl ManualClock {
    /// Creates a clock reading `start_ms`.
    pub fn at_ms(start_ms: i64) -> Self {
        Self {
            current_ms: Arc::new(AtomicI64::new(start_ms)),
        }
    }

    /// Moves time forward by `delta_ms` and returns the new reading.
    pub fn advance_ms(&self, delta_ms: i64) -> i64 {
        self.current_ms.fetch_add(delta_ms, Ordering::SeqCst) + delta_ms
    }

    /// Sets the reading to `value_ms`, which may be earlier than before.
    pub fn set_ms(&self, value_ms: i64) {
        self.current_ms.store(value_ms, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> i64 {
        self.current_ms.load(Ordering::SeqCst)
    }
}

/// Returns the default shared clock used by repositories.
pub fn system_clock() -> Arc<dyn Clock> {
    Arc::new(SystemClock)
}

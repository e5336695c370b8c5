//! CANOPY - Logical Clock
//! Store-wide nanosecond timestamp. The keeper is its only writer; every
//! request-path read is a single atomic load.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Monotonic, coarsely advanced timestamp shared by a store.
#[derive(Debug)]
pub struct LogicalClock {
    nanos: AtomicU64,
}

impl LogicalClock {
    /// Create a clock seeded from wall-clock time.
    pub fn new() -> Self {
        Self::starting_at(wall_clock_nanos())
    }

    /// Create a clock seeded with an explicit reading.
    pub fn starting_at(nanos: u64) -> Self {
        Self {
            nanos: AtomicU64::new(nanos),
        }
    }

    /// Current logical time.
    pub fn now(&self) -> u64 {
        self.nanos.load(Ordering::Acquire)
    }

    /// Move the clock forward to `nanos`. Never moves it backwards.
    pub fn advance(&self, nanos: u64) {
        self.nanos.fetch_max(nanos, Ordering::AcqRel);
    }

    /// Advance to the current wall-clock time and return the new reading.
    pub fn tick(&self) -> u64 {
        self.advance(wall_clock_nanos());
        self.now()
    }
}

impl Default for LogicalClock {
    fn default() -> Self {
        Self::new()
    }
}

/// Nanoseconds since the Unix epoch.
pub fn wall_clock_nanos() -> u64 {
    let elapsed = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    u64::try_from(elapsed.as_nanos()).unwrap_or(u64::MAX)
}

//! Millisecond timeline for a controller, anchored at construction.

use std::sync::Arc;
use std::time::{Duration, Instant};

use reflow_traits::clock::Clock;

/// Elapsed-time source over an injected [`Clock`].
///
/// All readings are milliseconds since the controller's epoch and never go
/// backwards; differences saturate at zero.
#[derive(Clone)]
pub struct RunClock {
    clock: Arc<dyn Clock + Send + Sync>,
    epoch: Instant,
}

impl core::fmt::Debug for RunClock {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("RunClock")
            .field("now_ms", &self.now_ms())
            .finish()
    }
}

impl RunClock {
    pub fn new(clock: Arc<dyn Clock + Send + Sync>) -> Self {
        let epoch = clock.now();
        Self { clock, epoch }
    }

    /// Milliseconds since the epoch.
    #[inline]
    pub fn now_ms(&self) -> u64 {
        self.clock.ms_since(self.epoch)
    }

    /// Milliseconds since the instant `mark_ms` (as returned by `now_ms`).
    #[inline]
    pub fn since_ms(&self, mark_ms: u64) -> u64 {
        self.now_ms().saturating_sub(mark_ms)
    }

    pub fn sleep(&self, d: Duration) {
        self.clock.sleep(d);
    }
}

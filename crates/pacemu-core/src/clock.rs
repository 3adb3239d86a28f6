use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

pub const MICROS_PER_SECOND: u64 = 1_000_000;

/// Monotonic time source shared by the loops.
pub trait Clock: Send + Sync + 'static {
    /// Microseconds since an arbitrary, fixed origin.
    fn now_micros(&self) -> u64;
}

/// Wall clock backed by [`Instant`].
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now_micros(&self) -> u64 {
        self.origin.elapsed().as_micros() as u64
    }
}

/// Clock that only moves when told to. Lets tests drive the loops through
/// simulated time.
#[derive(Debug, Default)]
pub struct ManualClock {
    micros: AtomicU64,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, micros: u64) {
        self.micros.fetch_add(micros, Ordering::AcqRel);
    }

    pub fn set(&self, micros: u64) {
        self.micros.store(micros, Ordering::Release);
    }
}

impl Clock for ManualClock {
    fn now_micros(&self) -> u64 {
        self.micros.load(Ordering::Acquire)
    }
}

//! A simple atomic timestamp cell: `last_tick_at` per §5 — "use a simple
//! atomic timestamp cell, no lock". Writers race (tick thread, event thread,
//! supervisor on resume); reads are advisory and tolerate staleness.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Process-local monotonic reference point. Millisecond readings are only
/// meaningful relative to this instance, never across processes.
pub struct Monotonic {
    start: Instant,
}

impl Monotonic {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            start: Instant::now(),
        })
    }

    pub fn now_millis(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }
}

/// Records `last_tick_at`: every tick delivered, subscription-confirmed
/// event, and resumption of trading hours.
pub fn mark_now(clock: &Monotonic, cell: &AtomicU64) {
    cell.store(clock.now_millis(), Ordering::SeqCst);
}

//! Wall-clock sources
//!
//! Every timing component reads "now" through a [`Clock`] so the host decides
//! where time comes from. Values are epoch milliseconds, which is also the
//! unit persisted in snapshots.

use std::sync::{
    atomic::{AtomicI64, Ordering},
    Arc,
};

use chrono::Utc;

/// Provider of the current wall-clock time in epoch milliseconds.
pub trait Clock: Send + Sync {
    fn now_ms(&self) -> i64;
}

/// Shared, type-erased clock handle passed to every component of a round.
pub type SharedClock = Arc<dyn Clock>;

/// Plain wall clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> i64 {
        Utc::now().timestamp_millis()
    }
}

/// Wall clock anchored once at creation and advanced by tokio's monotonic
/// clock afterwards.
///
/// The anchor keeps persisted timestamps meaningful across processes, while
/// the monotonic part is immune to wall-clock jumps and follows
/// `tokio::time::pause`/`advance` in tests.
#[derive(Debug, Clone, Copy)]
pub struct TokioClock {
    epoch_ms: i64,
    anchor: tokio::time::Instant,
}

impl TokioClock {
    pub fn new() -> Self {
        Self {
            epoch_ms: Utc::now().timestamp_millis(),
            anchor: tokio::time::Instant::now(),
        }
    }
}

impl Default for TokioClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for TokioClock {
    fn now_ms(&self) -> i64 {
        let elapsed = self.anchor.elapsed().as_millis().min(i64::MAX as u128) as i64;
        self.epoch_ms.saturating_add(elapsed)
    }
}

/// Clock that only moves when told to.
#[derive(Debug, Default, Clone)]
pub struct ManualClock {
    now: Arc<AtomicI64>,
}

impl ManualClock {
    pub fn new(start_ms: i64) -> Self {
        Self {
            now: Arc::new(AtomicI64::new(start_ms)),
        }
    }

    pub fn advance_ms(&self, ms: i64) {
        self.now.fetch_add(ms, Ordering::SeqCst);
    }

    pub fn set_ms(&self, ms: i64) {
        self.now.store(ms, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}

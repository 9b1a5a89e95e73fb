//! Pause-aware countdown clock for a single round

use std::{fmt, time::Duration};

use tracing::{debug, info, warn};

use super::TimerProgress;
use crate::utils::SharedClock;

/// Shortest total a round may be configured with.
pub const MIN_ROUND_DURATION: Duration = Duration::from_secs(1);

/// Recommended recompute cadence for a running timer.
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_millis(50);

pub type FinishCallback = Box<dyn FnMut() + Send>;
pub type ProgressCallback = Box<dyn FnMut(TimerProgress) + Send>;

/// Generation of a tick schedule. Ticks carrying a token from a cancelled
/// schedule are ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickToken(u64);

/// Outcome of a scheduled recompute
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TimerTick {
    /// The schedule this tick belonged to was cancelled.
    Stale,
    Running(TimerProgress),
    Finished,
}

/// Countdown bound to a fixed total, with bonus/penalty adjustments.
///
/// A running timer holds an absolute end time; `remaining` is recomputed from
/// it on every tick, so pausing freezes the value and resuming rebases the
/// end time from "now".
pub struct RoundTimer {
    clock: SharedClock,
    total_ms: i64,
    max_ms: i64,
    remaining_ms: i64,
    running: bool,
    start_time: i64,
    end_time: i64,
    generation: u64,
    finished: bool,
    refill_on_start_if_exhausted: bool,
    on_finish: Option<FinishCallback>,
    on_progress: Option<ProgressCallback>,
}

impl RoundTimer {
    /// Create a timer configured for `total`
    pub fn new(clock: SharedClock, total: Duration) -> Self {
        let mut timer = Self {
            clock,
            total_ms: 0,
            max_ms: 0,
            remaining_ms: 0,
            running: false,
            start_time: 0,
            end_time: 0,
            generation: 0,
            finished: false,
            refill_on_start_if_exhausted: true,
            on_finish: None,
            on_progress: None,
        };
        timer.configure(total);
        timer
    }

    /// Set the round total. Also resets the bonus ceiling and the remaining time.
    pub fn configure(&mut self, total: Duration) {
        let requested = duration_ms(total);
        let min = duration_ms(MIN_ROUND_DURATION);
        if requested < min {
            warn!("Round duration {}ms is below the minimum, clamping to {}ms", requested, min);
        }

        self.cancel_schedule();
        self.total_ms = requested.max(min);
        self.max_ms = self.total_ms;
        self.remaining_ms = self.total_ms;
        self.finished = false;
        debug!("Round timer configured for {}ms", self.total_ms);
    }

    /// Starting an exhausted timer refills it to the total when enabled.
    pub fn set_refill_on_start_if_exhausted(&mut self, refill: bool) {
        self.refill_on_start_if_exhausted = refill;
    }

    /// Raise (or lower) the ceiling bonus time may push the remaining time to.
    /// The ceiling never drops below the configured total.
    pub fn set_max_duration(&mut self, max: Duration) {
        self.max_ms = duration_ms(max).max(self.total_ms);
        if self.remaining_ms > self.max_ms {
            self.set_remaining_ms(self.max_ms);
        }
    }

    /// Callback fired once each time the timer runs out
    pub fn on_finish(&mut self, callback: impl FnMut() + Send + 'static) {
        self.on_finish = Some(Box::new(callback));
    }

    /// Callback fired after every recompute, for progress indicators
    pub fn on_progress(&mut self, callback: impl FnMut(TimerProgress) + Send + 'static) {
        self.on_progress = Some(Box::new(callback));
    }

    /// Start (or restart) counting down.
    ///
    /// Returns the token the caller's tick schedule must present, or `None`
    /// when the timer is exhausted and refilling is disabled.
    pub fn start(&mut self) -> Option<TickToken> {
        let now = self.clock.now_ms();
        if self.running {
            self.remaining_ms = self.compute_remaining(now);
        }
        self.cancel_schedule();

        if self.remaining_ms <= 0 {
            if !self.refill_on_start_if_exhausted {
                warn!("Round timer is exhausted and refilling is disabled, not starting");
                return None;
            }
            debug!("Round timer exhausted on start, refilling to {}ms", self.total_ms);
            self.remaining_ms = self.total_ms;
        }

        self.start_time = now;
        self.end_time = now.saturating_add(self.remaining_ms);
        self.running = true;
        self.finished = false;
        info!("Round timer started with {}ms remaining", self.remaining_ms);
        self.publish();

        Some(TickToken(self.generation))
    }

    /// Scheduled recompute of the remaining time
    pub fn tick(&mut self, token: TickToken) -> TimerTick {
        if !self.running || token.0 != self.generation {
            return TimerTick::Stale;
        }

        self.remaining_ms = self.compute_remaining(self.clock.now_ms());
        if self.remaining_ms == 0 {
            self.expire();
            return TimerTick::Finished;
        }

        TimerTick::Running(self.publish())
    }

    /// Stop counting, keeping the remaining time as of now. No-op when not running.
    pub fn pause(&mut self) -> bool {
        if !self.running {
            return false;
        }

        self.remaining_ms = self.compute_remaining(self.clock.now_ms());
        self.cancel_schedule();
        debug!("Round timer paused with {}ms remaining", self.remaining_ms);
        self.publish();
        true
    }

    /// Stop counting and restore the full total
    pub fn reset(&mut self) {
        self.cancel_schedule();
        self.remaining_ms = self.total_ms;
        self.finished = false;
        debug!("Round timer reset to {}ms", self.total_ms);
        self.publish();
    }

    /// Bonus time, capped at the ceiling
    pub fn add_time(&mut self, bonus: Duration) {
        self.adjust(duration_ms(bonus));
    }

    /// Penalty time. Reaching zero finishes the round immediately.
    pub fn subtract_time(&mut self, penalty: Duration) {
        self.adjust(-duration_ms(penalty));
    }

    /// Direct setter used when restoring saved state
    pub fn set_remaining_ms(&mut self, remaining_ms: i64) {
        self.remaining_ms = remaining_ms.clamp(0, self.max_ms);
        if self.running {
            self.rebase(self.clock.now_ms());
        }
        self.publish();
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Whether the timer ran out and has not been restarted or reset since
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Remaining time, live while running
    pub fn remaining_ms(&self) -> i64 {
        if self.running {
            self.compute_remaining(self.clock.now_ms())
        } else {
            self.remaining_ms
        }
    }

    /// Whole seconds left, rounded down
    pub fn remaining_seconds(&self) -> u64 {
        (self.remaining_ms() / 1000) as u64
    }

    pub fn total_duration(&self) -> Duration {
        Duration::from_millis(self.total_ms as u64)
    }

    pub fn max_duration(&self) -> Duration {
        Duration::from_millis(self.max_ms as u64)
    }

    pub fn progress(&self) -> TimerProgress {
        TimerProgress::new(self.running, self.remaining_ms(), self.total_ms)
    }

    fn adjust(&mut self, delta_ms: i64) {
        let now = self.clock.now_ms();
        if self.running {
            self.remaining_ms = self.compute_remaining(now);
        }

        self.remaining_ms = self.remaining_ms.saturating_add(delta_ms).clamp(0, self.max_ms);
        debug!("Round timer adjusted by {}ms, {}ms remaining", delta_ms, self.remaining_ms);

        if self.remaining_ms == 0 && delta_ms < 0 {
            self.expire();
            return;
        }

        if self.running {
            self.rebase(now);
        }
        self.publish();
    }

    fn rebase(&mut self, now: i64) {
        self.start_time = now;
        self.end_time = now.saturating_add(self.remaining_ms);
    }

    fn compute_remaining(&self, now: i64) -> i64 {
        self.end_time.saturating_sub(now).max(0)
    }

    fn cancel_schedule(&mut self) {
        self.running = false;
        self.generation = self.generation.wrapping_add(1);
    }

    fn expire(&mut self) {
        self.remaining_ms = 0;
        self.cancel_schedule();
        self.publish();

        if self.finished {
            return;
        }
        self.finished = true;
        info!("Round timer finished");
        if let Some(callback) = self.on_finish.as_mut() {
            callback();
        }
    }

    fn publish(&mut self) -> TimerProgress {
        let progress = TimerProgress::new(self.running, self.remaining_ms, self.total_ms);
        if let Some(callback) = self.on_progress.as_mut() {
            callback(progress);
        }
        progress
    }
}

impl fmt::Debug for RoundTimer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RoundTimer")
            .field("total_ms", &self.total_ms)
            .field("max_ms", &self.max_ms)
            .field("remaining_ms", &self.remaining_ms)
            .field("running", &self.running)
            .field("start_time", &self.start_time)
            .field("end_time", &self.end_time)
            .field("generation", &self.generation)
            .field("finished", &self.finished)
            .finish_non_exhaustive()
    }
}

fn duration_ms(duration: Duration) -> i64 {
    duration.as_millis().min(i64::MAX as u128) as i64
}

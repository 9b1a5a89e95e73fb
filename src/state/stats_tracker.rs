//! Reaction time and accuracy tracking

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::utils::SharedClock;

/// Pause bookkeeping as persisted across process recreation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PauseState {
    pub is_paused: bool,
    pub pause_start_time: Option<i64>,
}

/// Tracks active play time and attempt accuracy for one round.
///
/// Pausing never accumulates a separate "paused total": on resume the start
/// reference is shifted forward by the pause length, so active time is always
/// `now - start`.
#[derive(Clone)]
pub struct StatsTracker {
    clock: SharedClock,
    start_time: i64,
    pause_start_time: Option<i64>,
    is_paused: bool,
    total_attempts: u32,
    successful_attempts: u32,
}

impl StatsTracker {
    pub fn new(clock: SharedClock) -> Self {
        let start_time = clock.now_ms();
        Self {
            clock,
            start_time,
            pause_start_time: None,
            is_paused: false,
            total_attempts: 0,
            successful_attempts: 0,
        }
    }

    /// Begin a fresh round: restart the clock and clear counters
    pub fn start_reaction_tracking(&mut self) {
        self.start_time = self.clock.now_ms();
        self.pause_start_time = None;
        self.is_paused = false;
        self.total_attempts = 0;
        self.successful_attempts = 0;
        debug!("Reaction tracking started at {}", self.start_time);
    }

    pub fn on_paused(&mut self) {
        if self.is_paused {
            return;
        }
        self.pause_start_time = Some(self.clock.now_ms());
        self.is_paused = true;
    }

    pub fn on_resumed(&mut self) {
        if !self.is_paused {
            return;
        }
        if let Some(pause_start) = self.pause_start_time.take() {
            let pause_duration = (self.clock.now_ms() - pause_start).max(0);
            self.start_time = self.start_time.saturating_add(pause_duration);
            debug!("Resumed after {}ms pause", pause_duration);
        }
        self.is_paused = false;
    }

    pub fn is_paused(&self) -> bool {
        self.is_paused
    }

    /// Active milliseconds since the round started, never negative
    pub fn elapsed_active_ms(&self) -> i64 {
        let now = self.clock.now_ms();
        let paused_for = match (self.is_paused, self.pause_start_time) {
            (true, Some(pause_start)) => (now - pause_start).max(0),
            _ => 0,
        };
        (now - self.start_time - paused_for).max(0)
    }

    pub fn elapsed_active(&self) -> Duration {
        Duration::from_millis(self.elapsed_active_ms() as u64)
    }

    pub fn elapsed_active_seconds(&self) -> f64 {
        self.elapsed_active_ms() as f64 / 1000.0
    }

    pub fn register_attempt(&mut self, successful: bool) {
        self.total_attempts = self.total_attempts.saturating_add(1);
        if successful {
            self.successful_attempts = self.successful_attempts.saturating_add(1);
        }
    }

    pub fn total_attempts(&self) -> u32 {
        self.total_attempts
    }

    pub fn successful_attempts(&self) -> u32 {
        self.successful_attempts
    }

    /// Percentage of successful attempts, `0.0` before the first attempt
    pub fn accuracy_percent(&self) -> f64 {
        if self.total_attempts == 0 {
            return 0.0;
        }
        self.successful_attempts as f64 / self.total_attempts as f64 * 100.0
    }

    /// Average active time spent per star earned
    pub fn average_reaction_time(&self, stars_earned: u32) -> Duration {
        self.elapsed_active() / stars_earned.max(1)
    }

    pub fn start_time(&self) -> i64 {
        self.start_time
    }

    pub fn restore_start_time(&mut self, start_time: i64) {
        self.start_time = start_time;
    }

    pub fn pause_state(&self) -> PauseState {
        PauseState {
            is_paused: self.is_paused,
            pause_start_time: self.pause_start_time,
        }
    }

    /// A paused state without a recorded pause start is treated as paused
    /// from now.
    pub fn restore_pause_state(&mut self, state: PauseState) {
        self.is_paused = state.is_paused;
        self.pause_start_time = if state.is_paused {
            Some(state.pause_start_time.unwrap_or_else(|| self.clock.now_ms()))
        } else {
            None
        };
    }

    pub fn restore_attempts(&mut self, total: u32, successful: u32) {
        self.total_attempts = total;
        self.successful_attempts = successful.min(total);
    }
}

impl std::fmt::Debug for StatsTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatsTracker")
            .field("start_time", &self.start_time)
            .field("pause_start_time", &self.pause_start_time)
            .field("is_paused", &self.is_paused)
            .field("total_attempts", &self.total_attempts)
            .field("successful_attempts", &self.successful_attempts)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::utils::ManualClock;

    fn tracker() -> (StatsTracker, ManualClock) {
        let clock = ManualClock::new(1_000_000);
        let mut tracker = StatsTracker::new(Arc::new(clock.clone()));
        tracker.start_reaction_tracking();
        (tracker, clock)
    }

    #[test]
    fn accuracy_matches_success_ratio() {
        let (mut tracker, _) = tracker();
        assert_eq!(tracker.accuracy_percent(), 0.0);

        for i in 0..10 {
            tracker.register_attempt(i % 2 == 0);
        }
        assert_eq!(tracker.accuracy_percent(), 50.0);

        tracker.start_reaction_tracking();
        for _ in 0..5 {
            tracker.register_attempt(true);
        }
        assert_eq!(tracker.accuracy_percent(), 100.0);
    }

    #[test]
    fn paused_time_is_excluded() {
        let (mut tracker, clock) = tracker();
        clock.advance_ms(3_000);
        tracker.on_paused();
        clock.advance_ms(10_000);
        assert_eq!(tracker.elapsed_active_ms(), 3_000);

        tracker.on_resumed();
        clock.advance_ms(2_000);
        assert_eq!(tracker.elapsed_active_ms(), 5_000);
        assert_eq!(tracker.elapsed_active_seconds(), 5.0);
    }

    #[test]
    fn double_pause_counts_from_first() {
        let (mut tracker, clock) = tracker();
        clock.advance_ms(1_000);
        tracker.on_paused();
        clock.advance_ms(4_000);
        tracker.on_paused();
        clock.advance_ms(4_000);
        tracker.on_resumed();
        tracker.on_resumed();

        assert_eq!(tracker.elapsed_active_ms(), 1_000);
    }

    #[test]
    fn zero_length_pause_leaks_nothing() {
        let (mut tracker, clock) = tracker();
        clock.advance_ms(7_500);
        let before = tracker.elapsed_active_seconds();
        tracker.on_paused();
        tracker.on_resumed();
        assert_eq!(tracker.elapsed_active_seconds(), before);
    }

    #[test]
    fn average_reaction_time_never_divides_by_zero() {
        let (tracker, clock) = tracker();
        clock.advance_ms(12_000);
        assert_eq!(tracker.average_reaction_time(0), Duration::from_secs(12));
        assert_eq!(tracker.average_reaction_time(4), Duration::from_secs(3));
    }

    #[test]
    fn elapsed_is_floored_at_zero() {
        let (mut tracker, _) = tracker();
        tracker.restore_start_time(2_000_000);
        assert_eq!(tracker.elapsed_active_ms(), 0);
    }

    #[test]
    fn persistence_hooks_restore_paused_round() {
        let (mut original, clock) = tracker();
        clock.advance_ms(6_000);
        original.register_attempt(true);
        original.on_paused();
        clock.advance_ms(1_000);

        let mut restored = StatsTracker::new(Arc::new(clock.clone()));
        restored.restore_start_time(original.start_time());
        restored.restore_pause_state(original.pause_state());
        restored.restore_attempts(original.total_attempts(), original.successful_attempts());

        assert_eq!(restored.elapsed_active_ms(), 6_000);
        assert!(restored.is_paused());
        assert_eq!(restored.accuracy_percent(), 100.0);

        clock.advance_ms(5_000);
        restored.on_resumed();
        clock.advance_ms(500);
        assert_eq!(restored.elapsed_active_ms(), 6_500);
    }

    #[test]
    fn restored_successes_never_exceed_attempts() {
        let (mut tracker, _) = tracker();
        tracker.restore_attempts(3, 9);
        assert_eq!(tracker.successful_attempts(), 3);
    }
}

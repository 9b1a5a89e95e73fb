//! Timer progress published to progress indicators

use serde::{Deserialize, Serialize};

/// Ratio at or below which the progress indicator switches to its warning look.
pub const WARNING_PERCENT: f64 = 25.0;

/// Snapshot of a [`RoundTimer`](super::RoundTimer) after a recompute.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerProgress {
    pub running: bool,
    pub remaining_ms: i64,
    /// Remaining time relative to the configured total, on a 0–100 scale.
    pub percent: f64,
    pub warning: bool,
}

impl TimerProgress {
    /// Build progress from remaining and total durations in milliseconds
    pub fn new(running: bool, remaining_ms: i64, total_ms: i64) -> Self {
        let percent = if total_ms > 0 {
            (remaining_ms as f64 / total_ms as f64 * 100.0).clamp(0.0, 100.0)
        } else {
            0.0
        };

        Self {
            running,
            remaining_ms,
            percent,
            warning: percent <= WARNING_PERCENT,
        }
    }

    /// Progress of a timer that has not been configured yet
    pub fn idle() -> Self {
        Self {
            running: false,
            remaining_ms: 0,
            percent: 100.0,
            warning: false,
        }
    }

    /// Whole seconds left, rounded down
    pub fn remaining_seconds(&self) -> u64 {
        (self.remaining_ms.max(0) / 1000) as u64
    }
}

impl Default for TimerProgress {
    fn default() -> Self {
        Self::idle()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn warning_starts_at_a_quarter() {
        assert!(!TimerProgress::new(true, 15_001, 60_000).warning);
        assert!(TimerProgress::new(true, 15_000, 60_000).warning);
        assert!(TimerProgress::new(false, 0, 60_000).warning);
    }

    #[test]
    fn bonus_time_above_total_caps_at_full() {
        let progress = TimerProgress::new(true, 90_000, 60_000);
        assert_eq!(progress.percent, 100.0);
        assert_eq!(progress.remaining_seconds(), 90);
    }
}

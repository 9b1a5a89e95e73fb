//! Persisted round state for process recreation

use std::{fs, path::Path};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use super::countdown::COUNTDOWN_STEPS;
use crate::error::EngineError;

/// Everything a round needs to continue after its process was recreated.
///
/// Missing fields are `None`/zero and fall back to defaults on restore:
/// full round duration, zero counters, a fresh countdown.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RoundSnapshot {
    pub remaining_time_ms: Option<i64>,
    pub timer_is_running: bool,
    pub countdown_index: usize,
    pub countdown_in_progress: bool,
    pub star_count: u32,
    pub total_attempts: u32,
    pub successful_attempts: u32,
    pub game_start_time: Option<i64>,
    pub is_paused: bool,
    pub pause_start_time: Option<i64>,
    /// When the snapshot was taken. Time between this and the restore is
    /// downtime and never counts as play.
    pub saved_at: Option<i64>,
}

impl RoundSnapshot {
    /// Whether the snapshot describes a round that got past its countdown
    pub fn round_started(&self) -> bool {
        !self.countdown_in_progress && self.game_start_time.is_some()
    }

    /// Parse a snapshot field by field.
    ///
    /// Fields that are missing or of the wrong type fall back to their
    /// defaults individually; only input that is not JSON at all is an error.
    pub fn from_json(json: &str) -> Result<Self, EngineError> {
        let value: Value = serde_json::from_str(json)?;
        let Some(fields) = value.as_object() else {
            warn!("Snapshot is not a JSON object, using defaults");
            return Ok(Self::default());
        };

        let int = |key: &str| fields.get(key).and_then(Value::as_i64);
        let count = |key: &str| {
            int(key)
                .and_then(|n| u32::try_from(n).ok())
                .unwrap_or_default()
        };
        let flag = |key: &str| fields.get(key).and_then(Value::as_bool).unwrap_or_default();

        let snapshot = Self {
            remaining_time_ms: int("remainingTimeMs"),
            timer_is_running: flag("timerIsRunning"),
            countdown_index: int("countdownIndex")
                .and_then(|n| usize::try_from(n).ok())
                .unwrap_or_default(),
            countdown_in_progress: flag("countdownInProgress"),
            star_count: count("starCount"),
            total_attempts: count("totalAttempts"),
            successful_attempts: count("successfulAttempts"),
            game_start_time: int("gameStartTime"),
            is_paused: flag("isPaused"),
            pause_start_time: int("pauseStartTime"),
            saved_at: int("savedAt"),
        };

        Ok(snapshot.sanitized())
    }

    pub fn to_json(&self) -> Result<String, EngineError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Load a snapshot file. A missing file is `Ok(None)`.
    pub fn load(path: &Path) -> Result<Option<Self>, EngineError> {
        if !path.exists() {
            debug!("No snapshot at {}", path.display());
            return Ok(None);
        }
        let json = fs::read_to_string(path)?;
        Self::from_json(&json).map(Some)
    }

    pub fn save(&self, path: &Path) -> Result<(), EngineError> {
        fs::write(path, self.to_json()?)?;
        debug!("Snapshot written to {}", path.display());
        Ok(())
    }

    /// Clamp out-of-range values to something a round can continue from
    pub fn sanitized(mut self) -> Self {
        if self.remaining_time_ms.is_some_and(|ms| ms < 0) {
            warn!("Snapshot has negative remaining time, using full duration");
            self.remaining_time_ms = None;
        }
        if self.countdown_index > COUNTDOWN_STEPS.len() {
            warn!("Snapshot countdown index {} out of range, restarting countdown", self.countdown_index);
            self.countdown_index = 0;
        }
        self.successful_attempts = self.successful_attempts.min(self.total_attempts);
        if !self.is_paused {
            self.pause_start_time = None;
        }
        if self.saved_at.is_some_and(|saved| saved < 0) {
            warn!("Snapshot has a negative save time, ignoring it");
            self.saved_at = None;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_camel_case_layout() {
        let json = r#"{
            "remainingTimeMs": 42000,
            "timerIsRunning": true,
            "countdownIndex": 4,
            "countdownInProgress": false,
            "starCount": 3,
            "totalAttempts": 5,
            "successfulAttempts": 3,
            "gameStartTime": 1700000000000,
            "isPaused": true,
            "pauseStartTime": 1700000010000,
            "savedAt": 1700000012000
        }"#;

        let snapshot = RoundSnapshot::from_json(json).unwrap();
        assert_eq!(
            snapshot,
            RoundSnapshot {
                remaining_time_ms: Some(42_000),
                timer_is_running: true,
                countdown_index: 4,
                countdown_in_progress: false,
                star_count: 3,
                total_attempts: 5,
                successful_attempts: 3,
                game_start_time: Some(1_700_000_000_000),
                is_paused: true,
                pause_start_time: Some(1_700_000_010_000),
                saved_at: Some(1_700_000_012_000),
            }
        );
        assert!(snapshot.round_started());
    }

    #[test]
    fn corrupt_fields_fall_back_individually() {
        let json = r#"{
            "remainingTimeMs": "soon",
            "timerIsRunning": 1,
            "countdownIndex": 17,
            "starCount": -2,
            "totalAttempts": 4,
            "successfulAttempts": 9,
            "gameStartTime": 1700000000000,
            "pauseStartTime": 1700000010000
        }"#;

        let snapshot = RoundSnapshot::from_json(json).unwrap();
        assert_eq!(snapshot.remaining_time_ms, None);
        assert!(!snapshot.timer_is_running);
        assert_eq!(snapshot.countdown_index, 0);
        assert_eq!(snapshot.star_count, 0);
        assert_eq!(snapshot.successful_attempts, 4);
        assert_eq!(snapshot.game_start_time, Some(1_700_000_000_000));
        assert_eq!(snapshot.pause_start_time, None);
    }

    #[test]
    fn save_time_survives_sanitizing_when_running() {
        let snapshot = RoundSnapshot {
            game_start_time: Some(1_000),
            pause_start_time: Some(2_000),
            saved_at: Some(5_000),
            ..Default::default()
        }
        .sanitized();
        assert_eq!(snapshot.pause_start_time, None);
        assert_eq!(snapshot.saved_at, Some(5_000));

        let snapshot = RoundSnapshot {
            saved_at: Some(-5),
            ..Default::default()
        }
        .sanitized();
        assert_eq!(snapshot.saved_at, None);
    }

    #[test]
    fn non_object_json_is_default_and_garbage_is_error() {
        assert_eq!(RoundSnapshot::from_json("[1, 2]").unwrap(), RoundSnapshot::default());
        assert!(RoundSnapshot::from_json("not json").is_err());
    }

    #[test]
    fn negative_remaining_time_means_full_duration() {
        let snapshot = RoundSnapshot {
            remaining_time_ms: Some(-1),
            ..Default::default()
        }
        .sanitized();
        assert_eq!(snapshot.remaining_time_ms, None);
    }

    #[test]
    fn save_and_load_file() {
        let path = std::env::temp_dir().join(format!(
            "brain_rounds_snapshot_{}.json",
            std::process::id()
        ));
        let snapshot = RoundSnapshot {
            remaining_time_ms: Some(12_345),
            star_count: 2,
            game_start_time: Some(99),
            saved_at: Some(4_099),
            ..Default::default()
        };

        snapshot.save(&path).unwrap();
        let loaded = RoundSnapshot::load(&path).unwrap();
        assert_eq!(loaded, Some(snapshot));

        let _ = fs::remove_file(&path);
        assert_eq!(RoundSnapshot::load(&path).unwrap(), None);
    }
}

//! Values the round session hands back to its host

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::state::TimerProgress;

/// How a round ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundOutcome {
    TimeUp,
    Exited,
}

/// Final numbers of a round, as handed to the statistics collaborator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundResult {
    pub category: String,
    pub game_id: String,
    pub stars_earned: u32,
    pub accuracy_percent: f64,
    pub avg_reaction_time_ms: u64,
    pub timestamp: DateTime<Utc>,
    pub outcome: RoundOutcome,
}

/// Where the round currently is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundPhase {
    Countdown,
    Playing,
    Finished,
}

/// Point-in-time view of a running session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundStatus {
    pub phase: RoundPhase,
    pub paused: bool,
    pub timer: TimerProgress,
    pub countdown_index: usize,
    pub stars: u32,
    pub total_attempts: u32,
    pub successful_attempts: u32,
    pub accuracy_percent: f64,
    pub elapsed_active_ms: i64,
}

/// Lifecycle notifications broadcast by a session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum RoundEvent {
    CountdownStep { text: String },
    RoundStarted,
    Paused,
    Resumed,
    Restarted,
    Finished { result: RoundResult },
    Closed,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn status_serializes_camel_case() {
        let status = RoundStatus {
            phase: RoundPhase::Playing,
            paused: false,
            timer: TimerProgress::new(true, 7_500, 30_000),
            countdown_index: 4,
            stars: 2,
            total_attempts: 4,
            successful_attempts: 2,
            accuracy_percent: 50.0,
            elapsed_active_ms: 22_500,
        };

        let value = serde_json::to_value(&status).unwrap();
        assert_eq!(value["countdownIndex"], json!(4));
        assert_eq!(value["totalAttempts"], json!(4));
        assert_eq!(value["elapsedActiveMs"], json!(22_500));
        assert_eq!(value["timer"]["remainingMs"], json!(7_500));
        assert_eq!(value["timer"]["warning"], json!(true));
        assert!(value.get("total_attempts").is_none());
    }
}

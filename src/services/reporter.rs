//! Statistics persistence collaborators

use std::{
    fs::OpenOptions,
    io::Write,
    path::PathBuf,
};

use tracing::{debug, info};

use crate::{api::RoundResult, error::EngineError};

/// Receives the final numbers of every round that got past its countdown.
pub trait StatsReporter: Send {
    fn report_round_result(&mut self, result: &RoundResult) -> Result<(), EngineError>;
}

/// Logs each result as JSON
#[derive(Debug, Default, Clone, Copy)]
pub struct LogReporter;

impl StatsReporter for LogReporter {
    fn report_round_result(&mut self, result: &RoundResult) -> Result<(), EngineError> {
        let json = serde_json::to_string(result)?;
        info!("Round result: {}", json);
        Ok(())
    }
}

/// Appends each result as one JSON line
#[derive(Debug, Clone)]
pub struct JsonLinesReporter {
    path: PathBuf,
}

impl JsonLinesReporter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl StatsReporter for JsonLinesReporter {
    fn report_round_result(&mut self, result: &RoundResult) -> Result<(), EngineError> {
        let line = serde_json::to_string(result)?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| EngineError::Report(format!("{}: {}", self.path.display(), e)))?;
        writeln!(file, "{}", line)
            .map_err(|e| EngineError::Report(format!("{}: {}", self.path.display(), e)))?;

        debug!("Round result appended to {}", self.path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    use crate::api::RoundOutcome;

    fn result(stars: u32) -> RoundResult {
        RoundResult {
            category: "memory".to_string(),
            game_id: "color-sequence".to_string(),
            stars_earned: stars,
            accuracy_percent: 75.0,
            avg_reaction_time_ms: 1_250,
            timestamp: Utc.timestamp_millis_opt(1_700_000_000_000).unwrap(),
            outcome: RoundOutcome::TimeUp,
        }
    }

    #[test]
    fn json_lines_reporter_appends() {
        let path = std::env::temp_dir().join(format!(
            "brain_rounds_results_{}.jsonl",
            std::process::id()
        ));
        let _ = std::fs::remove_file(&path);

        let mut reporter = JsonLinesReporter::new(&path);
        reporter.report_round_result(&result(3)).unwrap();
        reporter.report_round_result(&result(5)).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<RoundResult> = contents
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(lines, vec![result(3), result(5)]);
        assert!(contents.contains("\"gameId\":\"color-sequence\""));

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn unwritable_path_is_a_report_error() {
        let mut reporter = JsonLinesReporter::new(std::env::temp_dir());
        assert!(matches!(
            reporter.report_round_result(&result(1)),
            Err(EngineError::Report(_))
        ));
    }
}

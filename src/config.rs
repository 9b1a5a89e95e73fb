//! Configuration: CLI arguments and per-round settings

use std::{path::PathBuf, time::Duration};

use clap::Parser;

use crate::{
    error::EngineError,
    services::ViewId,
    state::{countdown::DEFAULT_COUNTDOWN_CADENCE, round_timer::DEFAULT_TICK_INTERVAL},
};

/// CLI argument parsing structure
#[derive(Parser, Debug)]
#[command(name = "brain-rounds")]
#[command(about = "Play one timed round of a simulated brain-training mini-game")]
#[command(version)]
pub struct Config {
    /// Round duration in seconds
    #[arg(short, long, default_value = "30")]
    pub seconds: u64,

    /// Game category the result is filed under
    #[arg(long, default_value = "memory")]
    pub category: String,

    /// Game identifier the result is filed under
    #[arg(long, default_value = "color-sequence")]
    pub game_id: String,

    /// Timer recompute interval in milliseconds
    #[arg(long, default_value = "50")]
    pub tick_ms: u64,

    /// Countdown step interval in milliseconds
    #[arg(long, default_value = "1000")]
    pub countdown_ms: u64,

    /// How often the simulated player answers, in milliseconds
    #[arg(short, long, default_value = "1500")]
    pub attempt_ms: u64,

    /// Snapshot file: restored on start, written on interrupt
    #[arg(long)]
    pub state_file: Option<PathBuf>,

    /// Append round results to this JSON-lines file instead of logging them
    #[arg(long)]
    pub results_file: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Config {
    /// Parse configuration from command line arguments
    pub fn parse() -> Self {
        Parser::parse()
    }

    /// Round settings derived from the arguments
    pub fn round_config(&self) -> Result<RoundConfig, EngineError> {
        RoundConfig::builder(&self.category, &self.game_id)
            .duration(Duration::from_secs(self.seconds))
            .tick_interval(Duration::from_millis(self.tick_ms))
            .countdown_cadence(Duration::from_millis(self.countdown_ms))
            .auxiliary_view("score")
            .build()
    }

    /// Get the appropriate log level based on verbose flag
    pub fn log_level(&self) -> &'static str {
        if self.verbose { "debug" } else { "info" }
    }
}

/// Settings for one round screen, shared by every mini-game
#[derive(Debug, Clone, PartialEq)]
pub struct RoundConfig {
    pub category: String,
    pub game_id: String,
    pub duration: Duration,
    /// Ceiling for bonus time; `None` means the round duration.
    pub max_duration: Option<Duration>,
    pub tick_interval: Duration,
    pub countdown_cadence: Duration,
    pub auxiliary_views: Vec<ViewId>,
    pub refill_on_start_if_exhausted: bool,
}

impl RoundConfig {
    pub fn builder(category: impl Into<String>, game_id: impl Into<String>) -> RoundConfigBuilder {
        RoundConfigBuilder {
            config: RoundConfig {
                category: category.into(),
                game_id: game_id.into(),
                duration: Duration::from_secs(60),
                max_duration: None,
                tick_interval: DEFAULT_TICK_INTERVAL,
                countdown_cadence: DEFAULT_COUNTDOWN_CADENCE,
                auxiliary_views: Vec::new(),
                refill_on_start_if_exhausted: true,
            },
        }
    }
}

/// Builder for [`RoundConfig`]
#[derive(Debug, Clone)]
pub struct RoundConfigBuilder {
    config: RoundConfig,
}

impl RoundConfigBuilder {
    /// Round length. Durations under one second are clamped by the timer.
    pub fn duration(mut self, duration: Duration) -> Self {
        self.config.duration = duration;
        self
    }

    pub fn max_duration(mut self, max: Duration) -> Self {
        self.config.max_duration = Some(max);
        self
    }

    pub fn tick_interval(mut self, interval: Duration) -> Self {
        self.config.tick_interval = interval;
        self
    }

    pub fn countdown_cadence(mut self, cadence: Duration) -> Self {
        self.config.countdown_cadence = cadence;
        self
    }

    /// A view hidden during the countdown alongside the board
    pub fn auxiliary_view(mut self, name: impl Into<String>) -> Self {
        self.config.auxiliary_views.push(ViewId::Auxiliary(name.into()));
        self
    }

    pub fn refill_on_start_if_exhausted(mut self, refill: bool) -> Self {
        self.config.refill_on_start_if_exhausted = refill;
        self
    }

    pub fn build(self) -> Result<RoundConfig, EngineError> {
        let config = self.config;
        if config.category.trim().is_empty() {
            return Err(EngineError::InvalidConfig("category must not be empty".to_string()));
        }
        if config.game_id.trim().is_empty() {
            return Err(EngineError::InvalidConfig("game id must not be empty".to_string()));
        }
        if config.tick_interval.is_zero() {
            return Err(EngineError::InvalidConfig("tick interval must be positive".to_string()));
        }
        if config.countdown_cadence.is_zero() {
            return Err(EngineError::InvalidConfig("countdown cadence must be positive".to_string()));
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_defaults() {
        let config = RoundConfig::builder("math", "number-target").build().unwrap();
        assert_eq!(config.duration, Duration::from_secs(60));
        assert_eq!(config.tick_interval, Duration::from_millis(50));
        assert_eq!(config.countdown_cadence, Duration::from_secs(1));
        assert!(config.refill_on_start_if_exhausted);
        assert!(config.auxiliary_views.is_empty());
    }

    #[test]
    fn builder_rejects_bad_values() {
        assert!(RoundConfig::builder("", "x").build().is_err());
        assert!(RoundConfig::builder("math", " ").build().is_err());
        assert!(matches!(
            RoundConfig::builder("math", "x").tick_interval(Duration::ZERO).build(),
            Err(EngineError::InvalidConfig(_))
        ));
    }

    #[test]
    fn cli_arguments_map_to_round_config() {
        let config = Config::parse_from(["brain-rounds", "--seconds", "45", "--game-id", "word-search"]);
        let round = config.round_config().unwrap();
        assert_eq!(round.duration, Duration::from_secs(45));
        assert_eq!(round.game_id, "word-search");
        assert_eq!(round.auxiliary_views, vec![ViewId::Auxiliary("score".to_string())]);
        assert_eq!(config.log_level(), "info");
    }
}

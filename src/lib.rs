//! Brain Rounds - the round lifecycle shared by timed brain-training mini-games
//!
//! This library provides the countdown, the pause-aware round timer, reaction
//! and accuracy statistics, and the pause menu state machine, wired together
//! by a round session that reports each finished round to a statistics
//! collaborator.

pub mod api;
pub mod config;
pub mod error;
pub mod services;
pub mod state;
pub mod tasks;
pub mod utils;

// Re-export commonly used types
pub use api::{RoundEvent, RoundHandle, RoundOutcome, RoundPhase, RoundResult, RoundStatus};
pub use config::{Config, RoundConfig};
pub use error::EngineError;
pub use state::RoundSnapshot;
pub use tasks::RoundSession;
pub use utils::signals::shutdown_signal;

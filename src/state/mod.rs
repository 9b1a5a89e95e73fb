//! Round state module
//!
//! The four timing components of a round and the snapshot they persist to.
//! Each component is a plain state machine driven by explicit calls and
//! ticks; the session task in [`crate::tasks`] owns and schedules them.

pub mod countdown;
pub mod round_controller;
pub mod round_timer;
pub mod snapshot;
pub mod stats_tracker;
pub mod timer_state;

// Re-export main types
pub use countdown::{CountdownSequencer, CountdownTick, CountdownToken, COUNTDOWN_STEPS};
pub use round_controller::{RoundController, RoundHandler};
pub use round_timer::{RoundTimer, TickToken, TimerTick};
pub use snapshot::RoundSnapshot;
pub use stats_tracker::{PauseState, StatsTracker};
pub use timer_state::TimerProgress;

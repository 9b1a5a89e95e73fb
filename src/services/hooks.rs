//! Mini-game hooks the round session calls into

use crate::api::RoundOutcome;

/// Game-specific reactions to the round lifecycle. Everything defaults to a
/// no-op, so a game only implements what it cares about.
pub trait RoundHooks: Send {
    /// The countdown finished (or a restored round continues); build or
    /// unlock the board.
    fn on_round_start(&mut self) {}

    /// Called with `false` on pause and `true` on resume.
    fn set_input_enabled(&mut self, _enabled: bool) {}

    fn on_round_end(&mut self, _outcome: RoundOutcome) {}
}

/// Hooks for hosts with no game-specific behaviour
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopHooks;

impl RoundHooks for NoopHooks {}

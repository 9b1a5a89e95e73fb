//! Round command API
//!
//! A [`RoundHandle`] is the host's remote control for a running session: it
//! forwards user actions into the session task and exposes its event and
//! progress channels.

pub mod responses;

use std::time::Duration;

use tokio::sync::{broadcast, mpsc, oneshot, watch};

use crate::{
    error::EngineError,
    state::{RoundSnapshot, TimerProgress},
};
pub use responses::{RoundEvent, RoundOutcome, RoundPhase, RoundResult, RoundStatus};

/// Messages understood by the session task
#[derive(Debug)]
pub(crate) enum RoundCommand {
    Pause,
    Resume,
    Restart,
    Exit,
    RegisterAttempt { successful: bool },
    AwardStars(u32),
    AddTime(Duration),
    SubtractTime(Duration),
    Status(oneshot::Sender<RoundStatus>),
    Snapshot(oneshot::Sender<RoundSnapshot>),
    Shutdown,
}

/// Cloneable remote control for a round session.
///
/// Dropping every handle tears the session down.
#[derive(Debug, Clone)]
pub struct RoundHandle {
    commands: mpsc::UnboundedSender<RoundCommand>,
    events: broadcast::Sender<RoundEvent>,
    progress: watch::Receiver<TimerProgress>,
}

impl RoundHandle {
    pub(crate) fn new(
        commands: mpsc::UnboundedSender<RoundCommand>,
        events: broadcast::Sender<RoundEvent>,
        progress: watch::Receiver<TimerProgress>,
    ) -> Self {
        Self {
            commands,
            events,
            progress,
        }
    }

    pub fn pause(&self) -> Result<(), EngineError> {
        self.send(RoundCommand::Pause)
    }

    pub fn resume(&self) -> Result<(), EngineError> {
        self.send(RoundCommand::Resume)
    }

    /// Reset every clock and replay the countdown
    pub fn restart(&self) -> Result<(), EngineError> {
        self.send(RoundCommand::Restart)
    }

    /// Leave the round: report it if it got past the countdown, then close
    pub fn exit(&self) -> Result<(), EngineError> {
        self.send(RoundCommand::Exit)
    }

    /// Ignored by the session unless the round is playing and not paused
    pub fn register_attempt(&self, successful: bool) -> Result<(), EngineError> {
        self.send(RoundCommand::RegisterAttempt { successful })
    }

    pub fn award_stars(&self, stars: u32) -> Result<(), EngineError> {
        self.send(RoundCommand::AwardStars(stars))
    }

    pub fn add_time(&self, bonus: Duration) -> Result<(), EngineError> {
        self.send(RoundCommand::AddTime(bonus))
    }

    pub fn subtract_time(&self, penalty: Duration) -> Result<(), EngineError> {
        self.send(RoundCommand::SubtractTime(penalty))
    }

    /// Stop the session without reporting, e.g. before the process goes away.
    /// Take a [`snapshot`](Self::snapshot) first to continue later.
    pub fn shutdown(&self) -> Result<(), EngineError> {
        self.send(RoundCommand::Shutdown)
    }

    pub async fn status(&self) -> Result<RoundStatus, EngineError> {
        let (tx, rx) = oneshot::channel();
        self.send(RoundCommand::Status(tx))?;
        rx.await.map_err(|_| EngineError::SessionClosed)
    }

    pub async fn snapshot(&self) -> Result<RoundSnapshot, EngineError> {
        let (tx, rx) = oneshot::channel();
        self.send(RoundCommand::Snapshot(tx))?;
        rx.await.map_err(|_| EngineError::SessionClosed)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RoundEvent> {
        self.events.subscribe()
    }

    /// Latest timer progress, updated on every recompute
    pub fn progress(&self) -> watch::Receiver<TimerProgress> {
        self.progress.clone()
    }

    fn send(&self, command: RoundCommand) -> Result<(), EngineError> {
        self.commands
            .send(command)
            .map_err(|_| EngineError::SessionClosed)
    }
}

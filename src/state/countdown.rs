//! Pre-round "3, 2, 1, Start!" countdown

use std::{fmt, time::Duration};

use tracing::{debug, info};

use crate::services::{RoundSurface, ViewId};

/// Texts shown by the countdown label, one per tick.
pub const COUNTDOWN_STEPS: [&str; 4] = ["3", "2", "1", "Start!"];

pub const DEFAULT_COUNTDOWN_CADENCE: Duration = Duration::from_secs(1);

pub type CountdownCallback = Box<dyn FnMut() + Send>;

/// Generation of a countdown schedule
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CountdownToken(u64);

/// What a countdown tick did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountdownTick {
    Stale,
    Showing(&'static str),
    Finished,
}

/// Fixed four-step countdown that hides the board while it runs.
///
/// The index survives process recreation: a caller snapshots
/// [`index`](Self::index) and [`is_in_progress`](Self::is_in_progress) and
/// later calls [`start_countdown`](Self::start_countdown) with the saved
/// index to continue from the same display value.
pub struct CountdownSequencer {
    index: usize,
    in_progress: bool,
    generation: u64,
    auxiliary_views: Vec<ViewId>,
    on_finished: Option<CountdownCallback>,
}

impl CountdownSequencer {
    pub fn new(auxiliary_views: Vec<ViewId>) -> Self {
        Self {
            index: 0,
            in_progress: false,
            generation: 0,
            auxiliary_views,
            on_finished: None,
        }
    }

    pub fn on_finished(&mut self, callback: impl FnMut() + Send + 'static) {
        self.on_finished = Some(Box::new(callback));
    }

    /// (Re)start the sequence at `from_index`, hiding the board.
    ///
    /// The caller ticks the returned token once immediately and then once per
    /// cadence.
    pub fn start_countdown(
        &mut self,
        from_index: usize,
        surface: &mut dyn RoundSurface,
    ) -> CountdownToken {
        self.generation = self.generation.wrapping_add(1);
        self.index = from_index.min(COUNTDOWN_STEPS.len());
        self.in_progress = true;

        surface.set_visible(&ViewId::Board, false);
        for view in &self.auxiliary_views {
            surface.set_visible(view, false);
        }
        surface.set_visible(&ViewId::CountdownLabel, true);

        info!("Countdown started at step {}", self.index);
        CountdownToken(self.generation)
    }

    pub fn tick(&mut self, token: CountdownToken, surface: &mut dyn RoundSurface) -> CountdownTick {
        if !self.in_progress || token.0 != self.generation {
            return CountdownTick::Stale;
        }

        if let Some(text) = COUNTDOWN_STEPS.get(self.index).copied() {
            surface.set_countdown_text(text);
            self.index += 1;
            debug!("Countdown showing {}", text);
            return CountdownTick::Showing(text);
        }

        self.generation = self.generation.wrapping_add(1);
        self.in_progress = false;
        self.reveal(surface);
        info!("Countdown finished");
        if let Some(callback) = self.on_finished.as_mut() {
            callback();
        }
        CountdownTick::Finished
    }

    /// Stop ticking and force the post-countdown view state. Does not fire
    /// the finish callback.
    pub fn cancel(&mut self, surface: &mut dyn RoundSurface) {
        self.generation = self.generation.wrapping_add(1);
        let was_running = self.in_progress;
        self.in_progress = false;
        self.reveal(surface);
        if was_running {
            debug!("Countdown cancelled at step {}", self.index);
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn is_in_progress(&self) -> bool {
        self.in_progress
    }

    fn reveal(&self, surface: &mut dyn RoundSurface) {
        surface.set_visible(&ViewId::CountdownLabel, false);
        surface.set_visible(&ViewId::Board, true);
        for view in &self.auxiliary_views {
            surface.set_visible(view, true);
        }
    }
}

impl fmt::Debug for CountdownSequencer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CountdownSequencer")
            .field("index", &self.index)
            .field("in_progress", &self.in_progress)
            .field("generation", &self.generation)
            .field("auxiliary_views", &self.auxiliary_views)
            .finish_non_exhaustive()
    }
}

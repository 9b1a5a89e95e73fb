//! View surface the engine toggles: board, countdown label, pause overlay

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use tracing::{debug, warn};

use crate::state::TimerProgress;

/// Views the round engine knows how to show or hide
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ViewId {
    /// The mini-game's playing field.
    Board,
    CountdownLabel,
    PauseOverlay,
    /// Extra views hidden during the countdown (score bar, hint button, ...).
    Auxiliary(String),
}

/// Show/hide primitives provided by the host UI.
pub trait RoundSurface: Send {
    fn set_visible(&mut self, view: &ViewId, visible: bool);

    fn is_visible(&self, view: &ViewId) -> bool;

    fn set_countdown_text(&mut self, text: &str);

    fn show_progress(&mut self, _progress: TimerProgress) {}
}

/// Recorded state of a [`HeadlessSurface`]
#[derive(Debug, Clone, Default)]
pub struct SurfaceState {
    pub visibility: HashMap<ViewId, bool>,
    /// Every text the countdown label displayed, in order.
    pub countdown_texts: Vec<String>,
    pub last_progress: Option<TimerProgress>,
}

/// In-memory surface for headless hosts and tests.
///
/// Clones share state, so a caller can keep one handle while the round
/// session owns another.
#[derive(Debug, Clone, Default)]
pub struct HeadlessSurface {
    state: Arc<Mutex<SurfaceState>>,
}

impl HeadlessSurface {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of the recorded state
    pub fn state(&self) -> SurfaceState {
        self.state.lock().map(|state| state.clone()).unwrap_or_default()
    }

    pub fn countdown_texts(&self) -> Vec<String> {
        self.state().countdown_texts
    }

    fn with_state<F>(&self, f: F)
    where
        F: FnOnce(&mut SurfaceState),
    {
        match self.state.lock() {
            Ok(mut state) => f(&mut state),
            Err(e) => warn!("Failed to lock surface state: {}", e),
        }
    }
}

impl RoundSurface for HeadlessSurface {
    fn set_visible(&mut self, view: &ViewId, visible: bool) {
        debug!("{:?} -> {}", view, if visible { "visible" } else { "hidden" });
        self.with_state(|state| {
            state.visibility.insert(view.clone(), visible);
        });
    }

    /// Views never touched count as visible, except the countdown label and
    /// the pause overlay which start hidden.
    fn is_visible(&self, view: &ViewId) -> bool {
        let default = !matches!(view, ViewId::CountdownLabel | ViewId::PauseOverlay);
        self.state
            .lock()
            .ok()
            .and_then(|state| state.visibility.get(view).copied())
            .unwrap_or(default)
    }

    fn set_countdown_text(&mut self, text: &str) {
        debug!("Countdown label: {}", text);
        self.with_state(|state| state.countdown_texts.push(text.to_string()));
    }

    fn show_progress(&mut self, progress: TimerProgress) {
        self.with_state(|state| state.last_progress = Some(progress));
    }
}

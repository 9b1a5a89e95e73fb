//! Pause menu: the Playing/Paused switch and its restart/exit actions

use tracing::{debug, info};

use crate::services::{RoundSurface, ViewId};

/// Side effects the host wires to the pause menu.
///
/// `on_pause` must stop every clock of the round and disable input;
/// `on_resume` undoes it. The controller itself holds no timer state.
pub trait RoundHandler {
    fn on_pause(&mut self);
    fn on_resume(&mut self);
    fn on_restart(&mut self);
    fn on_exit(&mut self);
}

/// Binary Playing/Paused state whose flag mirrors the pause overlay.
#[derive(Debug, Clone, Default)]
pub struct RoundController {
    paused: bool,
}

impl RoundController {
    pub fn new() -> Self {
        Self { paused: false }
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Show the pause overlay and stop the round. No-op when already paused.
    pub fn pause(&mut self, surface: &mut dyn RoundSurface, handler: &mut dyn RoundHandler) -> bool {
        if self.paused {
            debug!("Pause requested while already paused");
            return false;
        }

        surface.set_visible(&ViewId::PauseOverlay, true);
        self.paused = true;
        info!("Round paused");
        handler.on_pause();
        true
    }

    /// Hide the pause overlay and continue. No-op when already playing.
    pub fn resume(&mut self, surface: &mut dyn RoundSurface, handler: &mut dyn RoundHandler) -> bool {
        if !self.paused {
            debug!("Resume requested while already playing");
            return false;
        }

        surface.set_visible(&ViewId::PauseOverlay, false);
        self.paused = false;
        info!("Round resumed");
        handler.on_resume();
        true
    }

    pub fn restart(&mut self, surface: &mut dyn RoundSurface, handler: &mut dyn RoundHandler) {
        self.resume(surface, handler);
        info!("Round restart requested");
        handler.on_restart();
    }

    pub fn exit(&mut self, surface: &mut dyn RoundSurface, handler: &mut dyn RoundHandler) {
        self.resume(surface, handler);
        info!("Round exit requested");
        handler.on_exit();
    }

    /// Adopt the overlay visibility restored by the host before this
    /// controller existed.
    pub fn sync_with_visual_state(&mut self, surface: &dyn RoundSurface) {
        let visible = surface.is_visible(&ViewId::PauseOverlay);
        if visible != self.paused {
            debug!("Pause flag synced to overlay visibility: {}", visible);
        }
        self.paused = visible;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    use crate::services::HeadlessSurface;

    #[derive(Default)]
    struct Recorder {
        calls: Vec<&'static str>,
    }

    impl RoundHandler for Recorder {
        fn on_pause(&mut self) {
            self.calls.push("pause");
        }
        fn on_resume(&mut self) {
            self.calls.push("resume");
        }
        fn on_restart(&mut self) {
            self.calls.push("restart");
        }
        fn on_exit(&mut self) {
            self.calls.push("exit");
        }
    }

    #[test]
    fn pause_and_resume_are_idempotent() {
        let mut controller = RoundController::new();
        let mut surface = HeadlessSurface::new();
        let mut handler = Recorder::default();

        assert!(controller.pause(&mut surface, &mut handler));
        assert!(!controller.pause(&mut surface, &mut handler));
        assert!(controller.is_paused());
        assert!(surface.is_visible(&ViewId::PauseOverlay));

        assert!(controller.resume(&mut surface, &mut handler));
        assert!(!controller.resume(&mut surface, &mut handler));
        assert!(!surface.is_visible(&ViewId::PauseOverlay));

        assert_eq!(handler.calls, vec!["pause", "resume"]);
    }

    #[test]
    fn restart_while_paused_resumes_first() {
        let mut controller = RoundController::new();
        let mut surface = HeadlessSurface::new();
        let mut handler = Recorder::default();

        controller.pause(&mut surface, &mut handler);
        controller.restart(&mut surface, &mut handler);

        assert!(!controller.is_paused());
        assert!(!surface.is_visible(&ViewId::PauseOverlay));
        assert_eq!(handler.calls, vec!["pause", "resume", "restart"]);
    }

    #[test]
    fn exit_while_playing_skips_resume() {
        let mut controller = RoundController::new();
        let mut surface = HeadlessSurface::new();
        let mut handler = Recorder::default();

        controller.exit(&mut surface, &mut handler);
        assert_eq!(handler.calls, vec!["exit"]);
    }

    #[test]
    fn sync_adopts_restored_overlay() {
        let mut controller = RoundController::new();
        let mut surface = HeadlessSurface::new();
        surface.set_visible(&ViewId::PauseOverlay, true);

        controller.sync_with_visual_state(&surface);
        assert!(controller.is_paused());

        let mut handler = Recorder::default();
        controller.resume(&mut surface, &mut handler);
        assert_eq!(handler.calls, vec!["resume"]);
    }
}

//! Round session task: one event loop owning every component of a round

use std::{
    fmt,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};

use chrono::{DateTime, Utc};
use tokio::{
    sync::{broadcast, mpsc, watch},
    task::JoinHandle,
    time::{interval, Interval, MissedTickBehavior},
};
use tracing::{debug, info, warn};

use crate::{
    api::{RoundCommand, RoundEvent, RoundHandle, RoundOutcome, RoundPhase, RoundResult, RoundStatus},
    config::RoundConfig,
    services::{LogReporter, NoopHooks, RoundHooks, RoundSurface, StatsReporter, ViewId},
    state::{
        CountdownSequencer, CountdownTick, CountdownToken, PauseState, RoundController,
        RoundHandler, RoundSnapshot, RoundTimer, StatsTracker, TickToken, TimerProgress, TimerTick,
    },
    utils::{SharedClock, TokioClock},
};

/// Whether the loop keeps going after a command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Stop,
}

/// Pause-menu actions that need more of the session than the handler borrows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Request {
    Restart,
    Exit,
}

/// Pause-menu handler over the parts of the session it is allowed to touch.
///
/// Pause and resume act on the clocks right away, inside the controller's
/// state flip; restart and exit are recorded and carried out by the session
/// once the controller returns.
struct Lifecycle<'a> {
    phase: RoundPhase,
    timer: &'a mut RoundTimer,
    timer_token: &'a mut Option<TickToken>,
    stats: &'a mut StatsTracker,
    hooks: &'a mut dyn RoundHooks,
    request: Option<Request>,
}

impl RoundHandler for Lifecycle<'_> {
    fn on_pause(&mut self) {
        self.timer.pause();
        *self.timer_token = None;
        self.stats.on_paused();
        self.hooks.set_input_enabled(false);
    }

    fn on_resume(&mut self) {
        if self.phase == RoundPhase::Playing {
            self.stats.on_resumed();
            if !self.timer.is_finished() {
                *self.timer_token = self.timer.start();
            }
        }
        self.hooks.set_input_enabled(true);
    }

    fn on_restart(&mut self) {
        self.request = Some(Request::Restart);
    }

    fn on_exit(&mut self) {
        self.request = Some(Request::Exit);
    }
}

/// Signals latched by component callbacks and consumed by the loop
#[derive(Debug, Default)]
struct Latches {
    countdown_finished: AtomicBool,
    time_up: AtomicBool,
}

/// A round screen: countdown, timer, statistics and pause menu on one
/// timeline.
///
/// Every component is owned by the session and only touched from its task,
/// so ticks, commands and callbacks never interleave.
pub struct RoundSession {
    config: RoundConfig,
    clock: SharedClock,
    timer: RoundTimer,
    stats: StatsTracker,
    countdown: CountdownSequencer,
    controller: RoundController,
    surface: Box<dyn RoundSurface>,
    hooks: Box<dyn RoundHooks>,
    reporter: Box<dyn StatsReporter>,
    phase: RoundPhase,
    stars: u32,
    timer_token: Option<TickToken>,
    countdown_token: Option<CountdownToken>,
    countdown_rearm: bool,
    latches: Arc<Latches>,
    commands: mpsc::UnboundedReceiver<RoundCommand>,
    events: broadcast::Sender<RoundEvent>,
}

impl RoundSession {
    pub fn builder(config: RoundConfig) -> RoundSessionBuilder {
        RoundSessionBuilder {
            config,
            clock: None,
            surface: None,
            hooks: None,
            reporter: None,
            snapshot: None,
        }
    }

    /// Drive the round until it is exited, shut down, or every handle is gone
    pub async fn run(mut self) {
        info!(
            "Round session started: {}/{}, {}s",
            self.config.category,
            self.config.game_id,
            self.config.duration.as_secs()
        );

        let mut timer_interval = ticker(self.config.tick_interval, MissedTickBehavior::Skip);
        let mut countdown_interval = ticker(self.config.countdown_cadence, MissedTickBehavior::Delay);

        loop {
            if self.countdown_rearm {
                countdown_interval = ticker(self.config.countdown_cadence, MissedTickBehavior::Delay);
                self.countdown_rearm = false;
            }

            let flow = tokio::select! {
                _ = timer_interval.tick(), if self.timer_token.is_some() => {
                    self.on_timer_tick();
                    Flow::Continue
                }
                _ = countdown_interval.tick(), if self.countdown_token.is_some() => {
                    self.on_countdown_tick();
                    Flow::Continue
                }
                command = self.commands.recv() => match command {
                    Some(command) => self.handle_command(command),
                    None => {
                        debug!("All round handles dropped");
                        self.teardown();
                        Flow::Stop
                    }
                },
            };

            self.settle();
            if flow == Flow::Stop {
                break;
            }
        }

        info!("Round session closed");
    }

    fn handle_command(&mut self, command: RoundCommand) -> Flow {
        match command {
            RoundCommand::Pause => {
                let (paused, _) = self.with_controller(|controller, surface, handler| {
                    controller.pause(surface, handler)
                });
                if paused {
                    self.emit(RoundEvent::Paused);
                }
            }
            RoundCommand::Resume => {
                let (resumed, _) = self.with_controller(|controller, surface, handler| {
                    controller.resume(surface, handler)
                });
                if resumed {
                    self.emit(RoundEvent::Resumed);
                }
            }
            RoundCommand::Restart => {
                let (_, request) = self.with_controller(|controller, surface, handler| {
                    controller.restart(surface, handler)
                });
                if request == Some(Request::Restart) {
                    self.restart_round();
                }
            }
            RoundCommand::Exit => {
                let (_, request) = self.with_controller(|controller, surface, handler| {
                    controller.exit(surface, handler)
                });
                if request == Some(Request::Exit) {
                    self.exit_round();
                    return Flow::Stop;
                }
            }
            RoundCommand::RegisterAttempt { successful } => {
                if self.accepts_input("attempt") {
                    self.stats.register_attempt(successful);
                }
            }
            RoundCommand::AwardStars(stars) => {
                if self.accepts_input("star") {
                    self.stars = self.stars.saturating_add(stars);
                }
            }
            RoundCommand::AddTime(bonus) => {
                if self.accepts_input("bonus time") {
                    self.timer.add_time(bonus);
                }
            }
            RoundCommand::SubtractTime(penalty) => {
                if self.accepts_input("time penalty") {
                    self.timer.subtract_time(penalty);
                }
            }
            RoundCommand::Status(reply) => {
                let _ = reply.send(self.status());
            }
            RoundCommand::Snapshot(reply) => {
                let _ = reply.send(self.snapshot());
            }
            RoundCommand::Shutdown => {
                self.teardown();
                return Flow::Stop;
            }
        }
        Flow::Continue
    }

    /// Gameplay input is only honoured while the round is live and unpaused
    fn accepts_input(&self, what: &str) -> bool {
        if self.controller.is_paused() {
            debug!("Ignoring {} while paused", what);
            return false;
        }
        if self.phase != RoundPhase::Playing {
            debug!("Ignoring {} outside of play ({:?})", what, self.phase);
            return false;
        }
        true
    }

    fn with_controller<R, F>(&mut self, f: F) -> (R, Option<Request>)
    where
        F: FnOnce(&mut RoundController, &mut dyn RoundSurface, &mut dyn RoundHandler) -> R,
    {
        let mut lifecycle = Lifecycle {
            phase: self.phase,
            timer: &mut self.timer,
            timer_token: &mut self.timer_token,
            stats: &mut self.stats,
            hooks: &mut *self.hooks,
            request: None,
        };
        let result = f(&mut self.controller, &mut *self.surface, &mut lifecycle);
        (result, lifecycle.request)
    }

    fn on_timer_tick(&mut self) {
        let Some(token) = self.timer_token else {
            return;
        };
        match self.timer.tick(token) {
            TimerTick::Running(_) => {}
            TimerTick::Stale | TimerTick::Finished => self.timer_token = None,
        }
    }

    fn on_countdown_tick(&mut self) {
        let Some(token) = self.countdown_token else {
            return;
        };
        // Paused countdowns keep their schedule but do not advance.
        if self.controller.is_paused() {
            return;
        }
        match self.countdown.tick(token, &mut *self.surface) {
            CountdownTick::Showing(text) => self.emit(RoundEvent::CountdownStep {
                text: text.to_string(),
            }),
            CountdownTick::Stale | CountdownTick::Finished => self.countdown_token = None,
        }
    }

    /// React to latched component callbacks and refresh the progress display
    fn settle(&mut self) {
        if self.latches.countdown_finished.swap(false, Ordering::SeqCst) {
            self.start_round();
        }
        if self.latches.time_up.swap(false, Ordering::SeqCst) {
            self.timer_token = None;
            self.finish_round(RoundOutcome::TimeUp);
        }
        self.surface.show_progress(self.timer.progress());
    }

    fn begin_countdown(&mut self, from_index: usize) {
        self.phase = RoundPhase::Countdown;
        self.countdown_token = Some(self.countdown.start_countdown(from_index, &mut *self.surface));
        self.countdown_rearm = true;
    }

    fn start_round(&mut self) {
        self.phase = RoundPhase::Playing;
        self.stars = 0;
        self.stats.start_reaction_tracking();
        self.timer_token = self.timer.start();
        self.hooks.on_round_start();
        self.emit(RoundEvent::RoundStarted);
    }

    fn restart_round(&mut self) {
        self.timer.reset();
        self.timer_token = None;
        self.stats.start_reaction_tracking();
        self.stars = 0;
        self.emit(RoundEvent::Restarted);
        self.begin_countdown(0);
    }

    fn exit_round(&mut self) {
        if self.countdown.is_in_progress() {
            self.countdown.cancel(&mut *self.surface);
            self.countdown_token = None;
        }
        self.finish_round(RoundOutcome::Exited);
        self.emit(RoundEvent::Closed);
    }

    /// Cancel every pending tick without reporting
    fn teardown(&mut self) {
        self.countdown.cancel(&mut *self.surface);
        self.countdown_token = None;
        self.timer.pause();
        self.timer_token = None;
        self.emit(RoundEvent::Closed);
    }

    fn finish_round(&mut self, outcome: RoundOutcome) {
        if self.phase != RoundPhase::Playing {
            return;
        }
        self.phase = RoundPhase::Finished;
        self.timer.pause();
        self.timer_token = None;
        self.stats.on_paused();

        let result = self.result(outcome);
        info!(
            "Round finished ({:?}): {} stars, {:.1}% accuracy, {}ms per star",
            outcome, result.stars_earned, result.accuracy_percent, result.avg_reaction_time_ms
        );
        if let Err(e) = self.reporter.report_round_result(&result) {
            warn!("Failed to report round result: {}", e);
        }
        self.hooks.on_round_end(outcome);
        self.emit(RoundEvent::Finished { result });
    }

    fn result(&self, outcome: RoundOutcome) -> RoundResult {
        let now = self.clock.now_ms();
        RoundResult {
            category: self.config.category.clone(),
            game_id: self.config.game_id.clone(),
            stars_earned: self.stars,
            accuracy_percent: self.stats.accuracy_percent(),
            avg_reaction_time_ms: self.stats.average_reaction_time(self.stars).as_millis() as u64,
            timestamp: DateTime::from_timestamp_millis(now).unwrap_or_else(Utc::now),
            outcome,
        }
    }

    fn status(&self) -> RoundStatus {
        RoundStatus {
            phase: self.phase,
            paused: self.controller.is_paused(),
            timer: self.timer.progress(),
            countdown_index: self.countdown.index(),
            stars: self.stars,
            total_attempts: self.stats.total_attempts(),
            successful_attempts: self.stats.successful_attempts(),
            accuracy_percent: self.stats.accuracy_percent(),
            elapsed_active_ms: if self.phase == RoundPhase::Countdown {
                0
            } else {
                self.stats.elapsed_active_ms()
            },
        }
    }

    fn snapshot(&self) -> RoundSnapshot {
        let pause = self.stats.pause_state();
        RoundSnapshot {
            remaining_time_ms: Some(self.timer.remaining_ms()),
            timer_is_running: self.timer.is_running(),
            countdown_index: self.countdown.index(),
            countdown_in_progress: self.countdown.is_in_progress(),
            star_count: self.stars,
            total_attempts: self.stats.total_attempts(),
            successful_attempts: self.stats.successful_attempts(),
            game_start_time: (self.phase != RoundPhase::Countdown).then(|| self.stats.start_time()),
            is_paused: self.controller.is_paused(),
            pause_start_time: if self.phase == RoundPhase::Countdown {
                None
            } else {
                pause.pause_start_time
            },
            saved_at: Some(self.clock.now_ms()),
        }
    }

    /// Continue a round from a snapshot, falling back to a fresh countdown
    /// when the round never got past it.
    fn restore(&mut self, snapshot: RoundSnapshot) {
        let snapshot = snapshot.sanitized();
        self.surface.set_visible(&ViewId::PauseOverlay, snapshot.is_paused);

        if !snapshot.round_started() {
            let from_index = if snapshot.countdown_in_progress {
                snapshot.countdown_index
            } else {
                0
            };
            info!("Restoring round into its countdown at step {}", from_index);
            self.begin_countdown(from_index);
            self.controller.sync_with_visual_state(&*self.surface);
            if self.controller.is_paused() {
                self.hooks.set_input_enabled(false);
            }
            return;
        }

        self.countdown.cancel(&mut *self.surface);
        self.stars = snapshot.star_count;
        self.stats.restore_attempts(snapshot.total_attempts, snapshot.successful_attempts);
        // A running round was live until the snapshot; the gap since then
        // is downtime, so its start moves forward by that much.
        let downtime = snapshot
            .saved_at
            .map(|saved| (self.clock.now_ms() - saved).max(0))
            .unwrap_or(0);
        if let Some(start_time) = snapshot.game_start_time {
            let start_time = if snapshot.is_paused {
                start_time
            } else {
                start_time.saturating_add(downtime)
            };
            self.stats.restore_start_time(start_time);
        }
        self.stats.restore_pause_state(PauseState {
            is_paused: snapshot.is_paused,
            pause_start_time: snapshot.pause_start_time.or(snapshot.saved_at),
        });

        let total_ms = self.timer.total_duration().as_millis() as i64;
        self.timer.set_remaining_ms(snapshot.remaining_time_ms.unwrap_or(total_ms));
        self.controller.sync_with_visual_state(&*self.surface);

        if self.timer.remaining_ms() == 0 {
            info!("Restored round had already run out");
            self.phase = RoundPhase::Finished;
            self.stats.on_paused();
            return;
        }

        info!(
            "Restoring round with {}ms remaining{}, {}ms downtime",
            self.timer.remaining_ms(),
            if self.controller.is_paused() { " (paused)" } else { "" },
            downtime
        );
        self.phase = RoundPhase::Playing;
        self.hooks.on_round_start();
        if self.controller.is_paused() {
            self.hooks.set_input_enabled(false);
        } else {
            self.timer_token = self.timer.start();
        }
    }

    fn emit(&self, event: RoundEvent) {
        let _ = self.events.send(event);
    }
}

impl fmt::Debug for RoundSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RoundSession")
            .field("config", &self.config)
            .field("phase", &self.phase)
            .field("stars", &self.stars)
            .field("timer", &self.timer)
            .field("stats", &self.stats)
            .field("countdown", &self.countdown)
            .field("controller", &self.controller)
            .finish_non_exhaustive()
    }
}

fn ticker(period: Duration, behavior: MissedTickBehavior) -> Interval {
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(behavior);
    ticker
}

/// Wires collaborators into a [`RoundSession`]
pub struct RoundSessionBuilder {
    config: RoundConfig,
    clock: Option<SharedClock>,
    surface: Option<Box<dyn RoundSurface>>,
    hooks: Option<Box<dyn RoundHooks>>,
    reporter: Option<Box<dyn StatsReporter>>,
    snapshot: Option<RoundSnapshot>,
}

impl RoundSessionBuilder {
    /// Defaults to a [`TokioClock`]
    pub fn clock(mut self, clock: SharedClock) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn surface(mut self, surface: impl RoundSurface + 'static) -> Self {
        self.surface = Some(Box::new(surface));
        self
    }

    pub fn hooks(mut self, hooks: impl RoundHooks + 'static) -> Self {
        self.hooks = Some(Box::new(hooks));
        self
    }

    /// Defaults to a [`LogReporter`]
    pub fn reporter(mut self, reporter: impl StatsReporter + 'static) -> Self {
        self.reporter = Some(Box::new(reporter));
        self
    }

    /// Continue from saved state instead of starting with a fresh countdown
    pub fn restore(mut self, snapshot: RoundSnapshot) -> Self {
        self.snapshot = Some(snapshot);
        self
    }

    pub fn build(self) -> (RoundSession, RoundHandle) {
        let clock = self
            .clock
            .unwrap_or_else(|| Arc::new(TokioClock::new()));
        let latches = Arc::new(Latches::default());

        let mut timer = RoundTimer::new(Arc::clone(&clock), self.config.duration);
        timer.set_refill_on_start_if_exhausted(self.config.refill_on_start_if_exhausted);
        if let Some(max) = self.config.max_duration {
            timer.set_max_duration(max);
        }
        let (progress_tx, progress_rx) = watch::channel(timer.progress());
        timer.on_progress(move |progress: TimerProgress| {
            progress_tx.send_replace(progress);
        });
        let time_up = Arc::clone(&latches);
        timer.on_finish(move || time_up.time_up.store(true, Ordering::SeqCst));

        let mut countdown = CountdownSequencer::new(self.config.auxiliary_views.clone());
        let countdown_done = Arc::clone(&latches);
        countdown.on_finished(move || {
            countdown_done.countdown_finished.store(true, Ordering::SeqCst)
        });

        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let (events_tx, _) = broadcast::channel(100);
        let handle = RoundHandle::new(commands_tx, events_tx.clone(), progress_rx);

        let mut session = RoundSession {
            stats: StatsTracker::new(Arc::clone(&clock)),
            clock,
            timer,
            countdown,
            controller: RoundController::new(),
            surface: self
                .surface
                .unwrap_or_else(|| Box::new(crate::services::HeadlessSurface::new())),
            hooks: self.hooks.unwrap_or_else(|| Box::new(NoopHooks)),
            reporter: self.reporter.unwrap_or_else(|| Box::new(LogReporter)),
            config: self.config,
            phase: RoundPhase::Countdown,
            stars: 0,
            timer_token: None,
            countdown_token: None,
            countdown_rearm: false,
            latches,
            commands: commands_rx,
            events: events_tx,
        };

        match self.snapshot {
            Some(snapshot) => session.restore(snapshot),
            None => session.begin_countdown(0),
        }
        (session, handle)
    }

    /// Build the session and run it on its own task
    pub fn spawn(self) -> (RoundHandle, JoinHandle<()>) {
        let (session, handle) = self.build();
        let task = tokio::spawn(session.run());
        (handle, task)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    use crate::services::HeadlessSurface;

    fn config(seconds: u64) -> RoundConfig {
        RoundConfig::builder("memory", "matching")
            .duration(Duration::from_secs(seconds))
            .build()
            .unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn countdown_then_play_until_time_up() {
        let surface = HeadlessSurface::new();
        let (handle, task) = RoundSession::builder(config(5))
            .surface(surface.clone())
            .spawn();
        let mut events = handle.subscribe();

        tokio::time::sleep(Duration::from_millis(4_500)).await;
        assert_eq!(surface.countdown_texts(), vec!["3", "2", "1", "Start!"]);
        let status = handle.status().await.unwrap();
        assert_eq!(status.phase, RoundPhase::Playing);
        assert!(surface.is_visible(&ViewId::Board));

        handle.register_attempt(true).unwrap();
        handle.award_stars(1).unwrap();
        handle.register_attempt(false).unwrap();

        tokio::time::sleep(Duration::from_secs(6)).await;
        let status = handle.status().await.unwrap();
        assert_eq!(status.phase, RoundPhase::Finished);
        assert_eq!(status.timer.remaining_ms, 0);

        let mut finished = None;
        while let Ok(event) = events.try_recv() {
            if let RoundEvent::Finished { result } = event {
                finished = Some(result);
            }
        }
        let result = finished.expect("round should report a result");
        assert_eq!(result.outcome, RoundOutcome::TimeUp);
        assert_eq!(result.stars_earned, 1);
        assert_eq!(result.accuracy_percent, 50.0);

        handle.exit().unwrap();
        task.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn paused_countdown_does_not_advance() {
        let surface = HeadlessSurface::new();
        let (handle, _task) = RoundSession::builder(config(30))
            .surface(surface.clone())
            .spawn();

        tokio::time::sleep(Duration::from_millis(1_500)).await;
        handle.pause().unwrap();
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(surface.countdown_texts(), vec!["3", "2"]);
        assert!(surface.is_visible(&ViewId::PauseOverlay));

        handle.resume().unwrap();
        tokio::time::sleep(Duration::from_secs(3)).await;
        let status = handle.status().await.unwrap();
        assert_eq!(status.phase, RoundPhase::Playing);
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_handles_closes_the_session() {
        let (handle, task) = RoundSession::builder(config(30)).spawn();
        drop(handle);
        task.await.unwrap();
    }
}

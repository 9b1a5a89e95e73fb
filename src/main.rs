//! Brain Rounds - play one timed round of a simulated mini-game
//!
//! This is the main entry point for the brain-rounds application. A scripted
//! player answers on a fixed cadence (every third answer wrong, each correct
//! one worth a star) until the round timer runs out.

use std::time::Duration;

use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, info, warn};

use brain_rounds::{
    config::Config,
    services::{HeadlessSurface, JsonLinesReporter, LogReporter},
    state::RoundSnapshot,
    tasks::RoundSession,
    utils::shutdown_signal,
    RoundEvent, RoundHandle, RoundResult,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();

    // Initialize tracing with appropriate log level
    tracing_subscriber::fmt()
        .with_env_filter(format!("brain_rounds={}", config.log_level()))
        .init();

    info!("Starting brain-rounds v{}", env!("CARGO_PKG_VERSION"));
    info!(
        "Configuration: game={}/{}, round={}s, tick={}ms",
        config.category, config.game_id, config.seconds, config.tick_ms
    );

    let round_config = config.round_config()?;

    let snapshot = match &config.state_file {
        Some(path) => RoundSnapshot::load(path).unwrap_or_else(|e| {
            warn!("Ignoring unreadable snapshot {}: {}", path.display(), e);
            None
        }),
        None => None,
    };

    let mut builder = RoundSession::builder(round_config).surface(HeadlessSurface::new());
    builder = match &config.results_file {
        Some(path) => builder.reporter(JsonLinesReporter::new(path)),
        None => builder.reporter(LogReporter),
    };
    if let Some(snapshot) = snapshot {
        info!("Continuing round from saved state");
        builder = builder.restore(snapshot);
    }

    let (handle, task) = builder.spawn();
    let mut events = handle.subscribe();

    let player = tokio::spawn(simulated_player(
        handle.clone(),
        Duration::from_millis(config.attempt_ms),
    ));

    tokio::select! {
        result = wait_for_result(&mut events) => {
            if let Some(result) = result {
                println!("{}", serde_json::to_string_pretty(&result)?);
            }
            handle.exit()?;
            if let Some(path) = &config.state_file {
                if let Err(e) = std::fs::remove_file(path) {
                    debug!("No snapshot to clear at {}: {}", path.display(), e);
                }
            }
        }
        _ = shutdown_signal() => {
            info!("Shutdown signal received");
            let snapshot = handle.snapshot().await?;
            if let Some(path) = &config.state_file {
                snapshot.save(path)?;
                info!("Round state saved to {}", path.display());
            }
            handle.shutdown()?;
        }
    }

    player.abort();
    task.await?;

    info!("brain-rounds finished");
    Ok(())
}

/// Wait for the round to report its result. `None` if the session closed first.
async fn wait_for_result(events: &mut broadcast::Receiver<RoundEvent>) -> Option<RoundResult> {
    loop {
        match events.recv().await {
            Ok(RoundEvent::Finished { result }) => return Some(result),
            Ok(RoundEvent::Closed) | Err(RecvError::Closed) => return None,
            Ok(event) => debug!("Round event: {:?}", event),
            Err(RecvError::Lagged(skipped)) => warn!("Missed {} round events", skipped),
        }
    }
}

/// Answers on a fixed cadence until the session goes away
async fn simulated_player(handle: RoundHandle, cadence: Duration) {
    let mut ticker = tokio::time::interval(cadence);
    let mut answers: u64 = 0;

    loop {
        ticker.tick().await;
        let correct = answers % 3 != 2;
        answers += 1;

        let sent = handle
            .register_attempt(correct)
            .and_then(|_| if correct { handle.award_stars(1) } else { Ok(()) });
        if sent.is_err() {
            debug!("Round closed, player stops");
            break;
        }
    }
}

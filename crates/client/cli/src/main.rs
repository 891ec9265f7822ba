//! Headless skirmish runner.
//!
//! Loads a scenario, lets the party fight on autopilot and prints every
//! runtime event to stdout as one JSON object per line.
mod autoplay;
mod config;
mod demo;

use anyhow::{Context, Result};
use config::CliConfig;
use skirmish_core::{Controller, Notice, TurnOutcome};
use skirmish_runtime::{CombatEvent, Event, Runtime, RuntimeConfig, Scenario, Topic};
use tokio::sync::broadcast::error::RecvError;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if it exists (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let config = CliConfig::from_env();
    let _guard = setup_logging(&config)?;

    let scenario = match &config.scenario {
        Some(path) => Scenario::load_from_file(path)
            .with_context(|| format!("loading scenario {}", path.display()))?,
        None => Scenario::from_ron(demo::DEMO_SCENARIO)?,
    };

    let runtime = Runtime::builder()
        .config(RuntimeConfig::from_env()?)
        .scenario(scenario)?
        .build()
        .await?;
    let handle = runtime.handle();

    let mut combat = handle.subscribe(Topic::Combat);
    let mut interface = handle.subscribe(Topic::Interface);
    let deadline = tokio::time::sleep(config.time_limit);
    tokio::pin!(deadline);

    loop {
        let event = tokio::select! {
            event = combat.recv() => event,
            event = interface.recv() => event,
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("interrupted");
                break;
            }
            _ = &mut deadline => {
                tracing::warn!(limit_secs = config.time_limit.as_secs(), "time limit reached");
                break;
            }
        };

        let event = match event {
            Ok(event) => event,
            Err(RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "event stream lagged");
                continue;
            }
            Err(RecvError::Closed) => break,
        };

        println!("{}", serde_json::to_string(&event)?);

        match event {
            Event::Combat(CombatEvent::Turn(TurnOutcome::AwaitingPlayer(creature))) => {
                autoplay::play_turn(handle.clone(), creature);
            }
            Event::Combat(CombatEvent::Notice(Notice::ReactiveAttackOffered { session, .. })) => {
                autoplay::take_reactive(handle.clone(), session);
            }
            Event::Combat(CombatEvent::Turn(TurnOutcome::CombatEnded { rounds })) => {
                tracing::info!(rounds, "combat ended");
                break;
            }
            Event::Combat(CombatEvent::Turn(TurnOutcome::GameOver)) => {
                tracing::info!("party defeated");
                break;
            }
            _ => {}
        }
    }

    let area = runtime.shutdown().await?;
    for creature in area.creatures() {
        let side = match creature.controller {
            Controller::Player => "party",
            Controller::Ai => "ai",
        };
        tracing::info!(
            id = %creature.id,
            name = %creature.name,
            side,
            hp = creature.hit_points,
            life = ?creature.life,
            position = %creature.position,
            "final state"
        );
    }
    Ok(())
}

/// Setup logging to stderr and, if configured, to a file.
///
/// The returned guard flushes the file writer when dropped.
fn setup_logging(
    config: &CliConfig,
) -> Result<Option<tracing_appender::non_blocking::WorkerGuard>> {
    let env_filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive(tracing::Level::INFO.into());
    let stderr_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    let (file_layer, guard) = match &config.log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("creating log directory {}", dir.display()))?;
            let file_appender = tracing_appender::rolling::never(dir, "skirmish.log");
            let (non_blocking_file, guard) = tracing_appender::non_blocking(file_appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(non_blocking_file)
                .with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stderr_layer)
        .with(file_layer)
        .init();

    if let Some(dir) = &config.log_dir {
        tracing::info!("Log file: {}/skirmish.log", dir.display());
    }
    Ok(guard)
}

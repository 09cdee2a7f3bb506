//! Scenario replay entry point for `CellBlock` damage attribution.
//!
//! The engine stands in for the host runtime: it loads the attribution
//! config, reads a scripted combat scenario, and replays it tick by tick
//! against a real [`DamageManager`](cellblock_core::DamageManager), logging
//! kill credit as players die.
//!
//! ```text
//! cellblock-engine [scenario.jsonl]
//! ```
//!
//! Without an argument the scenario is read from stdin. The config path
//! comes from `CELLBLOCK_CONFIG` and defaults to `cellblock-config.yaml`;
//! a missing file means defaults.

mod error;
mod replay;
mod scenario;

use std::path::{Path, PathBuf};
use std::time::Duration;

use cellblock_core::CellBlockConfig;
use chrono::Utc;
use tokio::io::AsyncReadExt;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::error::EngineError;
use crate::replay::Replay;

/// Default config file, relative to the working directory.
const DEFAULT_CONFIG_PATH: &str = "cellblock-config.yaml";

/// Application entry point.
///
/// Loads configuration, initializes logging, reads the scenario, replays
/// it, and logs a final summary.
///
/// # Errors
///
/// Returns an error if the config or scenario cannot be loaded, or if the
/// registry rejects an event.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Load configuration. Logging is not up yet, so errors go to stderr.
    let config_path = std::env::var("CELLBLOCK_CONFIG")
        .map_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH), PathBuf::from);
    let (config, from_file) = load_config(&config_path)?;

    // 2. Initialize structured logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.level)),
        )
        .with_target(true)
        .init();

    info!("cellblock-engine starting");
    info!(
        config = %config_path.display(),
        from_file,
        max_damage = %config.damage.max_damage,
        ranking = %config.damage.ranking,
        decay_rate = %config.decay.rate,
        decay_interval_ticks = config.decay.interval_ticks,
        tick_interval_ms = config.engine.tick_interval_ms,
        tick_length_ms = config.engine.tick_length_ms,
        "Configuration loaded"
    );

    // 3. Read the scenario.
    let source = std::env::args().nth(1);
    let text = read_scenario(source.as_deref()).await?;
    let steps = scenario::parse(&text)?;
    info!(
        source = source.as_deref().unwrap_or("stdin"),
        steps = steps.len(),
        "Scenario loaded"
    );

    // 4. Replay.
    let replay = Replay::new(&config, Utc::now());
    let pacing = Duration::from_millis(config.engine.tick_interval_ms);
    let summary = replay.run(&steps, Some(pacing)).await?;

    for kill in &summary.kills {
        info!(
            tick = kill.tick,
            victim = %kill.victim,
            killer = ?kill.credited.first(),
            assists = kill.credited.len().saturating_sub(1),
            "Kill"
        );
    }
    info!(
        simulated_end = %replay.now(),
        ticks = summary.ticks,
        events = summary.events,
        applied = summary.applied,
        kills = summary.kills.len(),
        decay_passes = summary.decay_passes,
        pruned = summary.pruned,
        tracked_victims = summary.tracked_victims,
        "Replay finished"
    );

    Ok(())
}

/// Load the config file, falling back to defaults when it does not exist.
///
/// Returns the config and whether it came from the file.
fn load_config(path: &Path) -> Result<(CellBlockConfig, bool), EngineError> {
    if path.exists() {
        Ok((CellBlockConfig::from_file(path)?, true))
    } else {
        Ok((CellBlockConfig::default(), false))
    }
}

/// Read the whole scenario from a file, or from stdin when no path is given.
async fn read_scenario(path: Option<&str>) -> Result<String, EngineError> {
    match path {
        Some(path) => Ok(tokio::fs::read_to_string(path).await?),
        None => {
            let mut text = String::new();
            tokio::io::stdin().read_to_string(&mut text).await?;
            Ok(text)
        }
    }
}

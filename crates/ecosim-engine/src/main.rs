//! Engine binary for the EcoSim foraging simulation.
//!
//! Loads configuration, builds a [`SimulationEngine`], and advances it at
//! the configured real-time rate until the tick limit or Ctrl-C, logging
//! telemetry through `tracing`. On exit it prints a JSON report with the
//! final snapshot on stdout.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `$ECOSIM_CONFIG` or `ecosim-config.yaml`
//! 2. Apply `$ECOSIM_PRESET` if set
//! 3. Initialize structured logging (tracing)
//! 4. Build the engine
//! 5. Optionally wait for Enter (`run.start_paused`)
//! 6. Run the paced tick loop
//! 7. Log the result and print the report

mod error;
mod run_loop;
mod telemetry;

use std::io::Write as _;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use ecosim_core::config::LoggingConfig;
use ecosim_core::{SimulationConfig, SimulationEngine};
use ecosim_types::SimulationSnapshot;
use serde::Serialize;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::error::EngineError;
use crate::run_loop::{PacedRun, StopReason};
use crate::telemetry::TracingSink;

/// Environment variable naming the configuration file.
const CONFIG_ENV: &str = "ECOSIM_CONFIG";

/// Environment variable naming a preset to apply.
const PRESET_ENV: &str = "ECOSIM_PRESET";

/// Configuration file used when `ECOSIM_CONFIG` is unset.
const DEFAULT_CONFIG_PATH: &str = "ecosim-config.yaml";

/// Final report printed on stdout.
#[derive(Debug, Serialize)]
struct RunReport {
    finished_at: DateTime<Utc>,
    #[serde(flatten)]
    run: PacedRun,
    total_births: u64,
    total_deaths: u64,
    snapshot: SimulationSnapshot,
}

/// Application entry point for the engine.
///
/// # Errors
///
/// Returns an error if configuration is invalid or the report cannot be
/// written.
#[tokio::main]
async fn main() -> Result<(), EngineError> {
    let config = load_config()?;
    init_tracing(&config.logging);

    info!(
        width = config.grid.width,
        height = config.grid.height,
        seed = config.grid.seed,
        policy = %config.policy.kind,
        initial_agents = config.population.initial_agents,
        max_agents = config.population.max_agents,
        ticks_per_second = config.run.ticks_per_second,
        "Configuration loaded"
    );

    let period = run_loop::tick_period(config.run.ticks_per_second);
    let max_ticks = config.run.max_ticks;
    let start_paused = config.run.start_paused;
    let mut engine = SimulationEngine::new(config)?;
    let mut sink = TracingSink::new();

    let run = if !start_paused || run_loop::wait_for_start().await {
        run_loop::run_paced(&mut engine, period, max_ticks, &mut sink).await
    } else {
        PacedRun {
            ticks_run: 0,
            episodes_completed: 0,
            stop_reason: StopReason::Interrupted,
        }
    };

    info!(
        stop_reason = ?run.stop_reason,
        ticks_run = run.ticks_run,
        episodes_completed = run.episodes_completed,
        episode = engine.episode(),
        tick = engine.tick(),
        agents_alive = engine.agents().len(),
        "ecosim-engine shutdown complete"
    );

    let report = RunReport {
        finished_at: Utc::now(),
        run,
        total_births: sink.births(),
        total_deaths: sink.deaths(),
        snapshot: engine.snapshot(),
    };
    let mut stdout = std::io::stdout().lock();
    serde_json::to_writer_pretty(&mut stdout, &report)?;
    writeln!(stdout)?;
    Ok(())
}

/// Initialize the global subscriber.
///
/// `RUST_LOG` wins over `logging.level`; `logging.json` selects the JSON
/// formatter. Logs go to stderr so stdout stays reserved for the report.
fn init_tracing(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&logging.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr);
    if logging.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Load the configuration, falling back to defaults when the file is
/// missing, then apply the preset named by `ECOSIM_PRESET`.
fn load_config() -> Result<SimulationConfig, EngineError> {
    let path = std::env::var_os(CONFIG_ENV)
        .map_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH), PathBuf::from);
    let mut config = if path.exists() {
        SimulationConfig::from_file(&path)?
    } else {
        // Logging is not up yet; the default config is reported once it is.
        SimulationConfig::parse("")?
    };
    if let Ok(preset) = std::env::var(PRESET_ENV) {
        config.apply_preset(&preset)?;
    }
    Ok(config)
}

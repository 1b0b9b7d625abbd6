//! Bounded synchronous runner with a telemetry sink.
//!
//! [`run_ticks`] advances an engine a fixed number of ticks and hands each
//! [`TickSummary`] to a [`TelemetrySink`]. Sinks only observe: they receive
//! the engine by shared reference after the tick has completed.
//!
//! The binary wraps the same sink trait in its own paced async loop; this
//! runner is the building block for headless batch runs and tests.

use ecosim_types::{BirthRecord, DeathRecord, EpisodeEndReason, TickTelemetry};
use tracing::{info, warn};

use crate::engine::SimulationEngine;
use crate::tick::TickSummary;

/// Result of a bounded run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunResult {
    /// Ticks executed by this run.
    pub ticks_run: u64,
    /// Episodes that ended (and were reset) during the run.
    pub episodes_completed: u64,
    /// The last tick summary, if any tick completed.
    pub final_summary: Option<TickSummary>,
}

/// Callback invoked after each tick completes.
pub trait TelemetrySink: Send {
    /// Called after a tick completes.
    fn on_tick(&mut self, summary: &TickSummary, engine: &SimulationEngine);
}

/// A sink that ignores everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpSink;

impl TelemetrySink for NoOpSink {
    fn on_tick(&mut self, _summary: &TickSummary, _engine: &SimulationEngine) {}
}

/// A sink that keeps every record it sees.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HistorySink {
    /// Telemetry per tick, in order.
    pub telemetry: Vec<TickTelemetry>,
    /// Every death across the run.
    pub deaths: Vec<DeathRecord>,
    /// Every birth across the run.
    pub births: Vec<BirthRecord>,
    /// `(episode, reason)` for each episode that ended.
    pub episode_ends: Vec<(u64, EpisodeEndReason)>,
}

impl TelemetrySink for HistorySink {
    fn on_tick(&mut self, summary: &TickSummary, _engine: &SimulationEngine) {
        self.telemetry.push(summary.telemetry);
        self.deaths.extend_from_slice(&summary.deaths);
        self.births.extend_from_slice(&summary.births);
        if let Some(reason) = summary.episode_end {
            self.episode_ends.push((summary.telemetry.episode, reason));
        }
    }
}

/// Advance `engine` by `ticks` ticks, reporting each to `sink`.
pub fn run_ticks(
    engine: &mut SimulationEngine,
    ticks: u64,
    sink: &mut dyn TelemetrySink,
) -> RunResult {
    let mut final_summary = None;
    let mut episodes_completed: u64 = 0;

    info!(
        ticks,
        episode = engine.episode(),
        tick = engine.tick(),
        "Simulation starting"
    );

    for _ in 0..ticks {
        let summary = engine.advance_one_tick();
        sink.on_tick(&summary, engine);
        if summary.episode_end.is_some() {
            episodes_completed = episodes_completed.saturating_add(1);
        }
        final_summary = Some(summary);
    }

    RunResult {
        ticks_run: ticks,
        episodes_completed,
        final_summary,
    }
}

/// Log the end of a run.
pub fn log_simulation_end(result: &RunResult) {
    info!(
        ticks_run = result.ticks_run,
        episodes_completed = result.episodes_completed,
        "Simulation ended"
    );
    if let Some(ref summary) = result.final_summary {
        info!(
            episode = summary.telemetry.episode,
            tick = summary.telemetry.tick,
            agents_alive = summary.telemetry.agents_alive,
            mean_energy = summary.telemetry.mean_energy_fraction,
            "Final tick summary"
        );
    } else {
        warn!("Simulation ended with no ticks executed");
    }
}

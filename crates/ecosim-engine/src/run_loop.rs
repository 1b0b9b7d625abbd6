//! Paced tick loop with whole-run cancellation.
//!
//! Ticks are released by a [`tokio::time::interval`] at
//! `run.ticks_per_second`. Ctrl-C stops the loop between ticks; a tick in
//! progress always completes, since [`SimulationEngine::advance_one_tick`]
//! is synchronous.

use std::time::Duration;

use ecosim_core::{SimulationEngine, TelemetrySink};
use serde::Serialize;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

/// Shortest tick period the loop will schedule.
const MIN_PERIOD: Duration = Duration::from_millis(1);

/// Why the paced loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// `run.max_ticks` ticks were executed.
    MaxTicks,
    /// The operator pressed Ctrl-C.
    Interrupted,
}

/// Outcome of a paced run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PacedRun {
    /// Ticks executed.
    pub ticks_run: u64,
    /// Episodes that ended during the run.
    pub episodes_completed: u64,
    /// Why the loop stopped.
    pub stop_reason: StopReason,
}

/// Tick period for `ticks_per_second`, never below [`MIN_PERIOD`].
pub fn tick_period(ticks_per_second: f64) -> Duration {
    Duration::try_from_secs_f64(ticks_per_second.recip())
        .unwrap_or(Duration::from_secs(1))
        .max(MIN_PERIOD)
}

/// Wait for a line on stdin before starting. Returns `false` if Ctrl-C
/// arrived first.
pub async fn wait_for_start() -> bool {
    info!("Simulation paused; press Enter to start");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    tokio::select! {
        line = lines.next_line() => {
            if let Err(err) = line {
                warn!(%err, "Could not read stdin; starting anyway");
            }
            info!("Simulation resumed");
            true
        }
        _ = tokio::signal::ctrl_c() => false,
    }
}

/// Run until `max_ticks` ticks have executed (0 = unbounded) or Ctrl-C.
pub async fn run_paced(
    engine: &mut SimulationEngine,
    period: Duration,
    max_ticks: u64,
    sink: &mut dyn TelemetrySink,
) -> PacedRun {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    let mut ticks_run: u64 = 0;
    let mut episodes_completed: u64 = 0;

    info!(
        period_ms = period.as_millis(),
        max_ticks,
        "Simulation starting"
    );

    let stop_reason = loop {
        if max_ticks > 0 && ticks_run >= max_ticks {
            info!(max_ticks, "Tick limit reached");
            break StopReason::MaxTicks;
        }
        tokio::select! {
            _ = &mut shutdown => {
                info!(ticks_run, "Ctrl-C received, stopping");
                break StopReason::Interrupted;
            }
            _ = interval.tick() => {
                let summary = engine.advance_one_tick();
                sink.on_tick(&summary, engine);
                ticks_run = ticks_run.saturating_add(1);
                if summary.episode_end.is_some() {
                    episodes_completed = episodes_completed.saturating_add(1);
                }
            }
        }
    };

    PacedRun {
        ticks_run,
        episodes_completed,
        stop_reason,
    }
}

//! Telemetry sink that reports each tick through `tracing`.

use ecosim_core::{SimulationEngine, TelemetrySink, TickSummary};
use ecosim_world::ResourceField;
use tracing::{debug, info};

/// Logs every tick's telemetry at `info`, births and deaths at `debug`.
#[derive(Debug, Default)]
pub struct TracingSink {
    births: u64,
    deaths: u64,
}

impl TracingSink {
    /// A sink with zeroed run totals.
    pub const fn new() -> Self {
        Self {
            births: 0,
            deaths: 0,
        }
    }

    /// Births seen across the run.
    pub const fn births(&self) -> u64 {
        self.births
    }

    /// Deaths seen across the run.
    pub const fn deaths(&self) -> u64 {
        self.deaths
    }
}

impl TelemetrySink for TracingSink {
    fn on_tick(&mut self, summary: &TickSummary, engine: &SimulationEngine) {
        let t = &summary.telemetry;
        self.births = self.births.saturating_add(u64::from(t.births));
        self.deaths = self.deaths.saturating_add(u64::from(t.deaths));

        for death in &summary.deaths {
            debug!(
                agent = %death.agent_id,
                cell = %death.cell,
                age_ticks = death.age_ticks,
                cumulative_reward = death.cumulative_reward,
                "Agent died"
            );
        }
        for birth in &summary.births {
            debug!(
                agent = %birth.agent_id,
                parent = %birth.parent_id,
                cell = %birth.cell,
                energy = birth.energy,
                "Agent born"
            );
        }

        info!(
            episode = t.episode,
            tick = t.tick,
            agents_alive = t.agents_alive,
            births = t.births,
            deaths = t.deaths,
            mean_energy = t.mean_energy_fraction,
            field_fill = engine.field().map(ResourceField::mean_fill),
            "Tick"
        );

        if let Some(reason) = summary.episode_end {
            info!(
                episode = t.episode,
                ticks = t.tick,
                %reason,
                "Episode ended"
            );
        }
    }
}

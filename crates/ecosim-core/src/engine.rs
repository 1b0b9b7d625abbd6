//! The simulation engine: one owned value driving one simulated world.
//!
//! [`SimulationEngine`] bundles the tick state with the run's [`Policy`]
//! and exposes a synchronous [`advance_one_tick`](SimulationEngine::advance_one_tick).
//! Real-time pacing, threading and cancellation are the caller's concern.

use ecosim_agents::Agent;
use ecosim_types::{Cell, EpisodeEndReason, PolicyKind, SimulationSnapshot, TickTelemetry};
use ecosim_world::{Grid, ResourceField, WorldError};
use tracing::info;

use crate::bridge::{BridgeEndpoint, ExternalActionBridge};
use crate::config::{ConfigError, SimulationConfig};
use crate::decision::Policy;
use crate::tick::{self, SimulationState, TickSummary};

/// Errors that can occur when building an engine.
///
/// Invalid static configuration is the only hard failure; once built, an
/// engine never fails.
#[derive(Debug, thiserror::Error)]
pub enum SimulationError {
    /// The configuration did not validate.
    #[error("configuration error: {source}")]
    Config {
        /// The underlying configuration error.
        #[from]
        source: ConfigError,
    },

    /// The grid or field could not be built.
    #[error("world error: {source}")]
    World {
        /// The underlying world error.
        #[from]
        source: WorldError,
    },

    /// `policy.kind` is `external`, which needs a host-side endpoint.
    #[error("the external policy needs a host endpoint; build the engine with `with_external_bridge`")]
    ExternalPolicyUnavailable,
}

/// A running simulation.
#[derive(Debug)]
pub struct SimulationEngine {
    state: SimulationState,
    policy: Policy,
    last_telemetry: Option<TickTelemetry>,
}

impl SimulationEngine {
    /// Build an engine with the built-in policy named by `config.policy.kind`.
    pub fn new(config: SimulationConfig) -> Result<Self, SimulationError> {
        config.validate()?;
        let policy =
            Policy::from_config(&config.policy).ok_or(SimulationError::ExternalPolicyUnavailable)?;
        Self::with_policy(config, policy)
    }

    /// Build an engine driven by an [`ExternalActionBridge`] whose reply
    /// timeout is `policy.external_timeout_ms`, and return the host's end.
    pub fn with_external_bridge(
        config: SimulationConfig,
    ) -> Result<(Self, BridgeEndpoint), SimulationError> {
        let (bridge, endpoint) = ExternalActionBridge::from_config(&config.policy);
        let engine = Self::with_policy(config, Policy::Action(Box::new(bridge)))?;
        Ok((engine, endpoint))
    }

    /// Build an engine driven by a caller-supplied policy, such as an
    /// [`ExternalActionBridge`](crate::bridge::ExternalActionBridge).
    pub fn with_policy(config: SimulationConfig, policy: Policy) -> Result<Self, SimulationError> {
        config.validate()?;
        let state = SimulationState::new(config)?;
        info!(
            width = state.grid.width(),
            height = state.grid.height(),
            seed = state.grid.seed(),
            policy = %policy.kind(),
            agents = state.agents.len(),
            field = state.field.is_some(),
            "Simulation engine ready"
        );
        Ok(Self {
            state,
            policy,
            last_telemetry: None,
        })
    }

    /// Run one full tick and return its summary.
    pub fn advance_one_tick(&mut self) -> TickSummary {
        let summary = tick::run_tick(&mut self.state, &mut self.policy);
        self.last_telemetry = Some(summary.telemetry);
        summary
    }

    /// Abandon the current episode and start a fresh one.
    pub fn reset_episode(&mut self) {
        self.state.reset_episode(EpisodeEndReason::Manual);
    }

    /// Add `amount` energy to every cell within Chebyshev `radius` of
    /// `center`. Returns the energy actually added (0 without a field).
    pub fn inject_energy_pulse(&mut self, center: Cell, radius: u32, amount: f64) -> f64 {
        let Some(field) = self.state.field.as_mut() else {
            return 0.0;
        };
        let added = field.deposit_radius(center, radius, amount);
        info!(
            event = "field_pulse",
            %center,
            radius,
            amount,
            added,
            tick = self.state.clock.tick(),
            "Energy pulse injected"
        );
        added
    }

    /// Current episode index.
    pub const fn episode(&self) -> u64 {
        self.state.clock.episode()
    }

    /// Current tick within the episode.
    pub const fn tick(&self) -> u64 {
        self.state.clock.tick()
    }

    /// Ticks advanced since construction, across episodes.
    pub const fn total_ticks(&self) -> u64 {
        self.state.clock.total_ticks()
    }

    /// Live population in insertion order.
    pub fn agents(&self) -> &[Agent] {
        &self.state.agents
    }

    /// The resource field, if enabled.
    pub const fn field(&self) -> Option<&ResourceField> {
        self.state.field.as_ref()
    }

    /// The grid.
    pub const fn grid(&self) -> &Grid {
        &self.state.grid
    }

    /// The configuration the engine was built from.
    pub const fn config(&self) -> &SimulationConfig {
        &self.state.config
    }

    /// The active policy kind.
    pub fn policy_kind(&self) -> PolicyKind {
        self.policy.kind()
    }

    /// Telemetry of the most recent tick, if any ran.
    pub const fn last_telemetry(&self) -> Option<&TickTelemetry> {
        self.last_telemetry.as_ref()
    }

    /// Population at spawn and after every tick of the current episode.
    pub fn population_history(&self) -> &[u32] {
        &self.state.population_history
    }

    /// Read-only dump of identity and aggregate state.
    pub fn snapshot(&self) -> SimulationSnapshot {
        let agent_count = self.state.population();
        let mean_energy_fraction = if agent_count == 0 {
            0.0
        } else {
            self.state.agents.iter().map(Agent::energy_fraction).sum::<f64>()
                / f64::from(agent_count)
        };
        SimulationSnapshot {
            episode: self.episode(),
            tick: self.tick(),
            agent_count,
            seed: self.state.grid.seed(),
            policy: self.policy_kind(),
            grid_width: self.state.grid.width(),
            grid_height: self.state.grid.height(),
            total_field_energy: self.field().map_or(0.0, ResourceField::total_energy),
            mean_energy_fraction,
            agents: self.state.agents.iter().map(Agent::snapshot).collect(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn small_config() -> SimulationConfig {
        let mut config = SimulationConfig::default();
        config.grid.width = 10;
        config.grid.height = 10;
        config
    }

    #[test]
    fn invalid_config_is_rejected() {
        let mut config = small_config();
        config.grid.width = 1;
        assert!(matches!(
            SimulationEngine::new(config),
            Err(SimulationError::Config { .. })
        ));
    }

    #[test]
    fn external_policy_needs_a_bridge() {
        let mut config = small_config();
        config.policy.kind = PolicyKind::External;
        assert!(matches!(
            SimulationEngine::new(config),
            Err(SimulationError::ExternalPolicyUnavailable)
        ));
    }

    #[test]
    fn external_config_builds_a_bridged_engine() {
        let mut config = small_config();
        config.policy.kind = PolicyKind::External;
        config.policy.external_timeout_ms = 5;
        let (mut engine, endpoint) = SimulationEngine::with_external_bridge(config).unwrap();
        assert_eq!(engine.policy_kind(), PolicyKind::External);

        let start = engine.agents().first().unwrap().position();
        engine.advance_one_tick();
        // No reply within the configured timeout: the agent stays.
        assert_eq!(engine.agents().first().unwrap().position(), start);
        assert!(matches!(
            endpoint.try_recv().unwrap(),
            Some(crate::bridge::BridgeMessage::DecisionRequest { episode: 0, tick: 0, .. })
        ));
    }

    #[test]
    fn advance_updates_telemetry_and_history() {
        let mut engine = SimulationEngine::new(small_config()).unwrap();
        assert!(engine.last_telemetry().is_none());
        let summary = engine.advance_one_tick();
        assert_eq!(engine.last_telemetry(), Some(&summary.telemetry));
        assert_eq!(engine.tick(), 1);
        assert_eq!(engine.total_ticks(), 1);
        assert_eq!(engine.population_history().len(), 2);
    }

    #[test]
    fn snapshot_reports_identity() {
        let engine = SimulationEngine::new(small_config()).unwrap();
        let snap = engine.snapshot();
        assert_eq!(snap.seed, 12345);
        assert_eq!(snap.policy, PolicyKind::EpsilonGreedy);
        assert_eq!(snap.agent_count, 1);
        assert_eq!(snap.agents.len(), 1);
        assert_eq!((snap.grid_width, snap.grid_height), (10, 10));
        assert!((snap.mean_energy_fraction - 0.5).abs() < 1e-12);
        assert!(snap.total_field_energy > 0.0);
    }

    #[test]
    fn energy_pulse_is_bounded() {
        let mut config = small_config();
        config.field.initial_fill = 0.0;
        let mut engine = SimulationEngine::new(config).unwrap();
        let added = engine.inject_energy_pulse(Cell::new(0, 0), 1, 3.0);
        assert!((added - 12.0).abs() < 1e-9);
        let again = engine.inject_energy_pulse(Cell::new(0, 0), 0, 100.0);
        assert!((again - 7.0).abs() < 1e-9);
    }

    #[test]
    fn manual_reset_starts_next_episode() {
        let mut engine = SimulationEngine::new(small_config()).unwrap();
        engine.advance_one_tick();
        engine.reset_episode();
        assert_eq!(engine.episode(), 1);
        assert_eq!(engine.tick(), 0);
        assert_eq!(engine.population_history(), &[1]);
    }
}

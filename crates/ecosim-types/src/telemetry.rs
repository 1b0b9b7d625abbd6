//! Telemetry, lifecycle records, and read-only snapshots.
//!
//! These are the records the engine reports after each tick and on demand.
//! Producing them never mutates simulation state, so external loggers and
//! exporters can sample them freely.

use serde::{Deserialize, Serialize};

use crate::enums::PolicyKind;
use crate::ids::AgentId;
use crate::spatial::Cell;

/// Aggregate population statistics for one completed tick.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct TickTelemetry {
    /// Episode the tick belongs to (0-indexed).
    pub episode: u64,
    /// Tick index within the episode after the tick completed.
    pub tick: u64,
    /// Live agents after reproduction.
    pub agents_alive: u32,
    /// Agents born during the tick.
    pub births: u32,
    /// Agents culled during the tick.
    pub deaths: u32,
    /// Mean of `body_energy / max_energy` over live agents (0 when empty).
    pub mean_energy_fraction: f64,
}

/// An agent removed from the population by the cull phase.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DeathRecord {
    /// The agent that died.
    pub agent_id: AgentId,
    /// Where it died.
    pub cell: Cell,
    /// Tick (within the episode) on which it was culled.
    pub tick: u64,
    /// Ticks lived since spawn or birth.
    pub age_ticks: u64,
    /// Final cumulative reward, including the terminal penalties.
    pub cumulative_reward: f64,
}

/// An agent added to the population by the reproduction phase.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BirthRecord {
    /// The newborn agent.
    pub agent_id: AgentId,
    /// The parent that split off the endowment.
    pub parent_id: AgentId,
    /// Birth cell chosen next to the parent.
    pub cell: Cell,
    /// Starting body energy of the newborn.
    pub energy: f64,
}

/// Per-agent reward outcome of one tick, as reported to learning processes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StepOutcome {
    /// The agent.
    pub agent_id: AgentId,
    /// Reward accumulated during this tick.
    pub reward: f64,
    /// Reward accumulated during the episode so far.
    pub cumulative_reward: f64,
    /// True if the agent died this tick (its trajectory ends here).
    pub done: bool,
}

/// Read-only view of one agent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AgentSnapshot {
    /// The agent.
    pub agent_id: AgentId,
    /// Current cell.
    pub cell: Cell,
    /// Current body energy.
    pub body_energy: f64,
    /// Maximum body energy.
    pub max_energy: f64,
    /// Reward accumulated during the current tick.
    pub last_reward: f64,
    /// Reward accumulated during the episode.
    pub cumulative_reward: f64,
}

/// Read-only dump of configuration identity and aggregate state.
///
/// The engine only builds this value; serialization format and destination
/// are the caller's concern.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationSnapshot {
    /// Current episode (0-indexed).
    pub episode: u64,
    /// Current tick within the episode.
    pub tick: u64,
    /// Live agent count.
    pub agent_count: u32,
    /// Seed the run was started with.
    pub seed: u64,
    /// Active policy.
    pub policy: PolicyKind,
    /// Grid width in cells.
    pub grid_width: u32,
    /// Grid height in cells.
    pub grid_height: u32,
    /// Sum of energy over all field cells (0 when no field is present).
    pub total_field_energy: f64,
    /// Mean body-energy fraction over live agents.
    pub mean_energy_fraction: f64,
    /// Per-agent detail in population order.
    pub agents: Vec<AgentSnapshot>,
}

//! Death records for culled agents.
//!
//! Agents die of exactly one cause: their body energy running out under
//! metabolism. The cull phase turns every dead agent into a
//! [`DeathRecord`] before removing it from the population.

use ecosim_types::DeathRecord;
use tracing::trace;

use crate::agent::Agent;

/// Build the death record of `agent`, culled on `tick`.
///
/// Returns `None` if the agent is still alive.
pub fn record_death(agent: &Agent, tick: u64) -> Option<DeathRecord> {
    if agent.is_alive() {
        return None;
    }
    trace!(
        agent = %agent.id(),
        cell = %agent.position(),
        tick,
        cumulative_reward = agent.cumulative_reward(),
        "Agent culled"
    );
    Some(DeathRecord {
        agent_id: agent.id(),
        cell: agent.position(),
        tick,
        age_ticks: agent.age(tick),
        cumulative_reward: agent.cumulative_reward(),
    })
}

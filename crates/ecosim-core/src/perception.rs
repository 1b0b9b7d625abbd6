//! Observation and action codec.
//!
//! Turns an agent's local surroundings into the fixed six-component
//! [`Observation`] action policies consume, and decodes their discrete
//! [`Action`] back into a target cell. Policies never read the field
//! directly through this path; everything they see is normalized here.

use ecosim_agents::Agent;
use ecosim_types::{Action, Cell, OBSERVATION_SIZE, Observation};
use ecosim_world::{Grid, ResourceField};

/// Floor for normalizing divisors.
const MIN_NORMALIZER: f64 = 1e-4;

/// Build the observation for `agent`.
///
/// Field components are the energy at self/up/right/down/left divided by
/// the per-cell cap, clamped to `[0, 1]`, and zero for out-of-bounds
/// neighbors or when no field exists. The last component is the agent's
/// body-energy fraction.
pub fn build_observation(agent: &Agent, grid: &Grid, field: Option<&ResourceField>) -> Observation {
    let mut obs = [0.0; OBSERVATION_SIZE];
    let here = agent.position();
    if let Some(field) = field {
        let cap = field.max_energy_per_cell().max(MIN_NORMALIZER);
        for (slot, action) in obs.iter_mut().zip(Action::ALL) {
            let cell = here.step(action);
            if grid.in_bounds(cell) {
                *slot = (field.energy(cell) / cap).clamp(0.0, 1.0);
            }
        }
    }
    if let Some(last) = obs.last_mut() {
        *last = (agent.body_energy() / agent.max_energy().max(MIN_NORMALIZER)).clamp(0.0, 1.0);
    }
    Observation(obs)
}

/// Decode `action` taken from `from` into a target cell.
///
/// A target off the grid collapses to `from` (the agent stays).
pub fn action_to_cell(grid: &Grid, from: Cell, action: Action) -> Cell {
    let target = from.step(action);
    if grid.in_bounds(target) { target } else { from }
}

/// Candidate cells for a cell policy: self first, then the in-bounds
/// orthogonal neighbors in up/right/down/left order.
pub fn candidate_cells(grid: &Grid, from: Cell) -> Vec<Cell> {
    grid.cardinal_neighborhood(from, true)
}

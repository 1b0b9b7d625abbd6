//! The agent record and its energy lifecycle.
//!
//! An agent is either alive or dead, and death is terminal. While alive it
//! holds a position, a bounded body-energy store, and reward accumulators.
//! Every mutation of energy or reward is a no-op once the agent is dead,
//! with the single exception of [`Agent::settle_terminal_reward`], which the
//! tick pipeline uses to charge the final penalties of the tick an agent
//! died on.
//!
//! Agents never own the field or the grid; both are passed in by the caller
//! when sensing, harvesting or moving. A missing field (`None`) means "sense
//! nothing, harvest nothing".

use ecosim_types::{AgentId, AgentSnapshot, Cell};
use ecosim_world::{Grid, ResourceField};
use rand::Rng;

use crate::config::BodyConfig;

/// One simulated organism.
#[derive(Debug, Clone, PartialEq)]
pub struct Agent {
    id: AgentId,
    position: Cell,
    body_energy: f64,
    is_dead: bool,
    last_reward: f64,
    cumulative_reward: f64,
    last_gained: f64,
    born_at_tick: u64,
    body: BodyConfig,
}

impl Agent {
    /// Spawn a member of the initial population.
    ///
    /// The agent starts at `start` when given and in bounds; otherwise it
    /// draws a uniformly random cell from `rng` (which is the only case
    /// where the random source is advanced). Body energy starts at
    /// `start_energy` clamped into `[0, max_energy]`.
    pub fn spawn<R: Rng + ?Sized>(
        id: AgentId,
        body: BodyConfig,
        grid: &Grid,
        rng: &mut R,
        start: Option<Cell>,
        born_at_tick: u64,
    ) -> Self {
        let position = match start {
            Some(cell) if grid.in_bounds(cell) => cell,
            _ => grid.random_cell(rng),
        };
        Self::at(id, body, position, body.clamped_start_energy(), born_at_tick)
    }

    /// Create an offspring at `cell` with `energy` split off its parent.
    ///
    /// The endowment is clamped into `[0, max_energy]`.
    pub fn newborn(
        id: AgentId,
        body: BodyConfig,
        cell: Cell,
        energy: f64,
        born_at_tick: u64,
    ) -> Self {
        let energy = energy.max(0.0).min(body.max_energy);
        Self::at(id, body, cell, energy, born_at_tick)
    }

    const fn at(
        id: AgentId,
        body: BodyConfig,
        position: Cell,
        body_energy: f64,
        born_at_tick: u64,
    ) -> Self {
        Self {
            id,
            position,
            body_energy,
            is_dead: false,
            last_reward: 0.0,
            cumulative_reward: 0.0,
            last_gained: 0.0,
            born_at_tick,
            body,
        }
    }

    /// Unique identifier.
    pub const fn id(&self) -> AgentId {
        self.id
    }

    /// Current cell.
    pub const fn position(&self) -> Cell {
        self.position
    }

    /// Current body energy, in `[0, max_energy]`.
    pub const fn body_energy(&self) -> f64 {
        self.body_energy
    }

    /// Upper bound on body energy.
    pub const fn max_energy(&self) -> f64 {
        self.body.max_energy
    }

    /// Body energy as a fraction of the maximum, in `[0, 1]`.
    pub fn energy_fraction(&self) -> f64 {
        if self.body.max_energy > 0.0 {
            (self.body_energy / self.body.max_energy).clamp(0.0, 1.0)
        } else {
            0.0
        }
    }

    /// Whether the agent has died. Once true, never resets.
    pub const fn is_dead(&self) -> bool {
        self.is_dead
    }

    /// Whether the agent is still alive.
    pub const fn is_alive(&self) -> bool {
        !self.is_dead
    }

    /// Reward accumulated since the start of the current tick.
    pub const fn last_reward(&self) -> f64 {
        self.last_reward
    }

    /// Reward accumulated since spawn.
    pub const fn cumulative_reward(&self) -> f64 {
        self.cumulative_reward
    }

    /// Energy harvested during the current tick.
    pub const fn last_gained(&self) -> f64 {
        self.last_gained
    }

    /// Tick (within the episode) on which the agent was spawned or born.
    pub const fn born_at_tick(&self) -> u64 {
        self.born_at_tick
    }

    /// Ticks lived as of `tick`.
    pub const fn age(&self, tick: u64) -> u64 {
        tick.saturating_sub(self.born_at_tick)
    }

    /// Body parameters.
    pub const fn body(&self) -> &BodyConfig {
        &self.body
    }

    /// Burn one tick of metabolism.
    ///
    /// If energy reaches zero or below it is clamped to zero and the agent
    /// dies. Returns `true` only on the call that caused death.
    pub fn apply_metabolism(&mut self) -> bool {
        if self.is_dead {
            return false;
        }
        self.body_energy -= self.body.metabolism_per_tick;
        if self.body_energy <= 0.0 {
            self.body_energy = 0.0;
            self.is_dead = true;
            return true;
        }
        false
    }

    /// Add `amount` (floored at zero) to body energy, capped at the maximum.
    pub fn gain_energy(&mut self, amount: f64) {
        if self.is_dead {
            return;
        }
        self.body_energy = (self.body_energy + amount.max(0.0)).min(self.body.max_energy);
    }

    /// Take up to `amount` energy from the field at the current cell.
    ///
    /// Returns the amount actually removed and records it as this tick's
    /// gain. The caller decides what to do with it (normally
    /// [`gain_energy`](Self::gain_energy)).
    pub fn harvest_here(&mut self, field: Option<&mut ResourceField>, amount: f64) -> f64 {
        if self.is_dead {
            return 0.0;
        }
        let taken = field.map_or(0.0, |f| f.harvest(self.position, amount));
        self.last_gained = taken;
        taken
    }

    /// Harvest `harvest_per_step` here, absorb it, and earn
    /// `reward_scale * gained`. Returns the energy gained.
    pub fn forage(&mut self, field: Option<&mut ResourceField>, reward_scale: f64) -> f64 {
        let gained = self.harvest_here(field, self.body.harvest_per_step);
        self.gain_energy(gained);
        if gained > 0.0 {
            self.add_reward(reward_scale * gained);
        }
        gained
    }

    /// Field energy at `cell`, or zero without a field.
    pub fn sense_energy(field: Option<&ResourceField>, cell: Cell) -> f64 {
        field.map_or(0.0, |f| f.energy(cell))
    }

    /// Move to `target` if it is in bounds. Returns whether the agent moved.
    ///
    /// Movement itself costs nothing; the cost of living is metabolism.
    pub fn move_to(&mut self, grid: &Grid, target: Cell) -> bool {
        if self.is_dead || !grid.in_bounds(target) {
            return false;
        }
        self.position = target;
        true
    }

    /// Split off an offspring endowment.
    ///
    /// Succeeds only if alive, `body_energy >= threshold`, and `fraction`
    /// (clamped into `[0, 1]`) is positive. On success the parent keeps
    /// `body_energy * (1 - fraction)` and the returned value is the
    /// endowment. Returns `None` when no split happened.
    pub fn try_split_for_offspring(&mut self, threshold: f64, fraction: f64) -> Option<f64> {
        if self.is_dead || self.body_energy < threshold {
            return None;
        }
        let fraction = fraction.clamp(0.0, 1.0);
        if fraction.is_nan() || fraction <= 0.0 {
            return None;
        }
        let give = self.body_energy * fraction;
        self.body_energy = (self.body_energy - give).clamp(0.0, self.body.max_energy);
        (give > 0.0).then_some(give)
    }

    /// Accumulate `r` into both the step and cumulative reward.
    pub fn add_reward(&mut self, r: f64) {
        if self.is_dead {
            return;
        }
        self.last_reward += r;
        self.cumulative_reward += r;
    }

    /// Accumulate `r` even if the agent has just died.
    ///
    /// Used for the end-of-tick penalties charged before a dead agent is
    /// culled, so its final `cumulative_reward` includes them.
    pub fn settle_terminal_reward(&mut self, r: f64) {
        self.last_reward += r;
        self.cumulative_reward += r;
    }

    /// Zero the per-tick reward and gain. Cumulative reward persists.
    pub const fn reset_step_reward(&mut self) {
        self.last_reward = 0.0;
        self.last_gained = 0.0;
    }

    /// Read-only view for telemetry and export.
    pub const fn snapshot(&self) -> AgentSnapshot {
        AgentSnapshot {
            agent_id: self.id,
            cell: self.position,
            body_energy: self.body_energy,
            max_energy: self.body.max_energy,
            last_reward: self.last_reward,
            cumulative_reward: self.cumulative_reward,
        }
    }
}

//! Tick cycle: the ordered pipeline that advances the EcoSim population.
//!
//! Each tick runs through these phases, in this order. The order is part of
//! the behavior: swapping phases changes emergent dynamics.
//!
//! 1. **Reset** -- zero every agent's per-step reward.
//! 2. **Request** -- action policies receive every agent's observation
//!    (the external bridge forwards them to its host here).
//! 3. **Decide & forage** -- in population order, each agent decides, moves,
//!    then harvests at its resulting cell. Harvest follows the move; an
//!    agent never harvests the cell it is leaving.
//! 4. **Metabolism** -- every agent burns its per-tick cost; some may die.
//! 5. **Metabolism penalty** -- every tracked agent, dead or alive, is
//!    charged `metabolism_penalty_scale * metabolism_per_tick`.
//! 6. **Cull** -- dead agents are charged the death penalty, recorded and
//!    removed.
//! 7. **Reproduction** -- survivors at or above the threshold split off an
//!    offspring until the population cap would be reached; births are
//!    applied after all splits are decided.
//! 8. **Regeneration** -- the field regrows uniformly.
//! 9. **Bookkeeping** -- the clock advances and a population sample is
//!    recorded.
//! 10. **Episode check** -- extinction or the tick cap resets the episode.
//!
//! The cycle is single-threaded and deterministic given the seed and the
//! policy's choices. Nothing in it can fail.

use ecosim_agents::{Agent, can_add_agent, choose_birth_cell, record_death};
use ecosim_types::{
    AgentId, BirthRecord, Cell, DeathRecord, EpisodeEndReason, Observation, StepOutcome,
    TickTelemetry,
};
use ecosim_world::{Grid, ResourceField, WorldError};
use rand::SeedableRng;
use tracing::{debug, info};

use crate::clock::EpisodeClock;
use crate::config::SimulationConfig;
use crate::decision::{Policy, SimRng};
use crate::perception::{action_to_cell, build_observation, candidate_cells};

/// Summary of a single tick's execution.
#[derive(Debug, Clone, PartialEq)]
pub struct TickSummary {
    /// Aggregate statistics for the tick.
    pub telemetry: TickTelemetry,
    /// Agents culled during the tick, in population order.
    pub deaths: Vec<DeathRecord>,
    /// Agents born during the tick, in birth order.
    pub births: Vec<BirthRecord>,
    /// Step reward of every agent tracked during the tick.
    pub outcomes: Vec<StepOutcome>,
    /// Set when the tick ended the episode (the state has already been
    /// reset when this is returned).
    pub episode_end: Option<EpisodeEndReason>,
}

/// A birth decided during reproduction, applied once all parents have split.
struct ScheduledBirth {
    parent_id: AgentId,
    cell: Cell,
    energy: f64,
}

/// The mutable simulation state passed through the tick cycle.
#[derive(Debug)]
pub struct SimulationState {
    /// Validated configuration the state was built from.
    pub config: SimulationConfig,
    /// Grid coordinate system.
    pub grid: Grid,
    /// Resource field, absent when `field.enabled` is false.
    pub field: Option<ResourceField>,
    /// Live population in insertion order.
    pub agents: Vec<Agent>,
    /// The single random source, seeded from `grid.seed`.
    pub rng: SimRng,
    /// Tick and episode counters.
    pub clock: EpisodeClock,
    /// Identifier handed to the next agent created.
    pub next_agent_id: AgentId,
    /// Population size at spawn and after every tick of the episode.
    pub population_history: Vec<u32>,
}

impl SimulationState {
    /// Build the grid, the field and the initial population.
    ///
    /// The configuration is assumed to have been validated.
    pub fn new(config: SimulationConfig) -> Result<Self, WorldError> {
        let grid = config.build_grid()?;
        let field = if config.field.enabled {
            Some(ResourceField::generate(&grid, config.field.params())?)
        } else {
            None
        };
        let mut state = Self {
            rng: SimRng::seed_from_u64(grid.seed()),
            config,
            grid,
            field,
            agents: Vec::new(),
            clock: EpisodeClock::new(),
            next_agent_id: AgentId::new(1),
            population_history: Vec::new(),
        };
        state.spawn_initial_population();
        Ok(state)
    }

    /// Number of live agents, saturating at `u32::MAX`.
    pub fn population(&self) -> u32 {
        u32::try_from(self.agents.len()).unwrap_or(u32::MAX)
    }

    /// Spawn `min(initial_agents, max_agents)` agents at random cells and
    /// record the first population sample.
    fn spawn_initial_population(&mut self) {
        let population = &self.config.population;
        let count = population.initial_agents.min(population.max_agents);
        let body = self.config.agent;
        let tick = self.clock.tick();
        for _ in 0..count {
            let id = self.take_agent_id();
            let agent = Agent::spawn(id, body, &self.grid, &mut self.rng, None, tick);
            self.agents.push(agent);
        }
        self.population_history.push(self.population());
        debug!(agents = count, episode = self.clock.episode(), "Initial population spawned");
    }

    fn take_agent_id(&mut self) -> AgentId {
        let id = self.next_agent_id;
        self.next_agent_id = id.next();
        id
    }

    /// End the current episode and start the next one.
    ///
    /// Reseeds the random source from the configured seed, clears the
    /// population and the history, optionally regenerates the field, and
    /// respawns the initial population.
    pub fn reset_episode(&mut self, reason: EpisodeEndReason) {
        let finished = self.clock.episode();
        let ticks = self.clock.tick();
        self.rng = SimRng::seed_from_u64(self.grid.seed());
        self.agents.clear();
        if self.config.episode.rebuild_field_on_reset {
            if let Some(field) = self.field.as_mut() {
                field.rebuild();
            }
        }
        self.clock.start_new_episode();
        self.population_history.clear();
        self.spawn_initial_population();
        info!(
            episode = finished,
            ticks,
            %reason,
            next_episode = self.clock.episode(),
            "Episode reset"
        );
    }

    fn telemetry(&self, episode: u64, births: u32, deaths: u32) -> TickTelemetry {
        let agents_alive = self.population();
        let mean_energy_fraction = if agents_alive == 0 {
            0.0
        } else {
            self.agents.iter().map(Agent::energy_fraction).sum::<f64>() / f64::from(agents_alive)
        };
        TickTelemetry {
            episode,
            tick: self.clock.tick(),
            agents_alive,
            births,
            deaths,
            mean_energy_fraction,
        }
    }
}

/// Execute one full tick.
///
/// The caller owns pacing and cancellation; a tick always runs to
/// completion once started.
pub fn run_tick(state: &mut SimulationState, policy: &mut Policy) -> TickSummary {
    let tick = state.clock.tick();
    let episode = state.clock.episode();

    // --- Phase 1: Reset ---
    for agent in &mut state.agents {
        agent.reset_step_reward();
    }

    // --- Phase 2: Request ---
    phase_request(state, policy, episode, tick);

    // --- Phase 3: Decide & forage ---
    phase_decide_and_forage(state, policy);

    // --- Phase 4: Metabolism ---
    let starved = phase_metabolism(state);

    // --- Phase 5: Metabolism penalty ---
    phase_metabolism_penalty(state);

    // --- Phase 6: Cull ---
    let (deaths, outcomes) = phase_cull(state, tick);

    // --- Phase 7: Reproduction ---
    let births = phase_reproduction(state, tick);

    // --- Phase 8: Regeneration ---
    if let Some(field) = state.field.as_mut() {
        field.regenerate_tick();
    }

    // --- Phase 9: Bookkeeping ---
    state.clock.advance();
    state.population_history.push(state.population());
    let telemetry = state.telemetry(
        episode,
        u32::try_from(births.len()).unwrap_or(u32::MAX),
        u32::try_from(deaths.len()).unwrap_or(u32::MAX),
    );
    debug!(
        tick = telemetry.tick,
        agents_alive = telemetry.agents_alive,
        births = telemetry.births,
        deaths = telemetry.deaths,
        starved,
        mean_energy = telemetry.mean_energy_fraction,
        "Tick complete"
    );

    if let Policy::Action(p) = policy {
        p.record_outcomes(episode, tick, &outcomes);
    }

    // --- Phase 10: Episode check ---
    let episode_end = episode_end_reason(state);
    if let Some(reason) = episode_end {
        if reason == EpisodeEndReason::Extinction {
            info!(tick = telemetry.tick, episode, "All agents dead -- extinction");
        }
        state.reset_episode(reason);
    }

    TickSummary {
        telemetry,
        deaths,
        births,
        outcomes,
        episode_end,
    }
}

/// Phase 2: hand action policies every agent's observation.
fn phase_request(state: &SimulationState, policy: &mut Policy, episode: u64, tick: u64) {
    let Policy::Action(p) = policy else {
        return;
    };
    let observations: Vec<(AgentId, Observation)> = state
        .agents
        .iter()
        .map(|a| (a.id(), build_observation(a, &state.grid, state.field.as_ref())))
        .collect();
    p.request_decisions(episode, tick, &observations);
}

/// Phase 3: decide, move, harvest; one agent at a time.
///
/// Later agents see the field as left by earlier ones.
fn phase_decide_and_forage(state: &mut SimulationState, policy: &mut Policy) {
    let harvest_scale = state.config.reward.harvest_reward_scale;
    let SimulationState {
        grid,
        field,
        agents,
        rng,
        ..
    } = state;
    for agent in agents.iter_mut() {
        let here = agent.position();
        let target = match policy {
            Policy::Cell(p) => {
                let candidates = candidate_cells(grid, here);
                p.decide(here, &candidates, field.as_ref(), rng)
            }
            Policy::Action(p) => {
                let observation = build_observation(agent, grid, field.as_ref());
                let action = p.decide_action(agent.id(), &observation, rng);
                action_to_cell(grid, here, action)
            }
        };
        agent.move_to(grid, target);
        agent.forage(field.as_mut(), harvest_scale);
    }
}

/// Phase 4: burn metabolism. Returns how many agents starved.
fn phase_metabolism(state: &mut SimulationState) -> u32 {
    let mut starved: u32 = 0;
    for agent in &mut state.agents {
        if agent.apply_metabolism() {
            starved = starved.saturating_add(1);
        }
    }
    starved
}

/// Phase 5: the cost-of-living penalty, including agents that just died.
fn phase_metabolism_penalty(state: &mut SimulationState) {
    let scale = state.config.reward.metabolism_penalty_scale;
    for agent in &mut state.agents {
        let penalty = scale * agent.body().metabolism_per_tick;
        agent.settle_terminal_reward(-penalty);
    }
}

/// Phase 6: charge the death penalty, record and remove the dead.
///
/// Also collects every tracked agent's step outcome, before removal, so
/// dead agents report `done`.
fn phase_cull(state: &mut SimulationState, tick: u64) -> (Vec<DeathRecord>, Vec<StepOutcome>) {
    let death_penalty = state.config.reward.death_penalty;
    let mut deaths = Vec::new();
    let mut outcomes = Vec::with_capacity(state.agents.len());
    for agent in &mut state.agents {
        if agent.is_dead() {
            agent.settle_terminal_reward(-death_penalty);
            deaths.extend(record_death(agent, tick));
        }
        outcomes.push(StepOutcome {
            agent_id: agent.id(),
            reward: agent.last_reward(),
            cumulative_reward: agent.cumulative_reward(),
            done: agent.is_dead(),
        });
    }
    state.agents.retain(Agent::is_alive);
    (deaths, outcomes)
}

/// Phase 7: split survivors and place their offspring.
fn phase_reproduction(state: &mut SimulationState, tick: u64) -> Vec<BirthRecord> {
    let population = &state.config.population;
    if !population.reproduction_enabled {
        return Vec::new();
    }
    let current = u32::try_from(state.agents.len()).unwrap_or(u32::MAX);
    let mut scheduled: Vec<ScheduledBirth> = Vec::new();
    for agent in &mut state.agents {
        let pending = u32::try_from(scheduled.len()).unwrap_or(u32::MAX);
        if !can_add_agent(current, pending, population.max_agents) {
            debug!(tick, max_agents = population.max_agents, "Population cap reached");
            break;
        }
        let Some(energy) = agent.try_split_for_offspring(
            population.reproduce_threshold,
            population.offspring_energy_fraction,
        ) else {
            continue;
        };
        let cell = choose_birth_cell(&state.grid, state.field.as_ref(), agent.position());
        scheduled.push(ScheduledBirth {
            parent_id: agent.id(),
            cell,
            energy,
        });
    }

    let body = state.config.agent;
    let mut births = Vec::with_capacity(scheduled.len());
    for birth in scheduled {
        let id = state.take_agent_id();
        let child = Agent::newborn(id, body, birth.cell, birth.energy, tick);
        births.push(BirthRecord {
            agent_id: id,
            parent_id: birth.parent_id,
            cell: birth.cell,
            energy: child.body_energy(),
        });
        state.agents.push(child);
    }
    births
}

fn episode_end_reason(state: &SimulationState) -> Option<EpisodeEndReason> {
    let episode = &state.config.episode;
    if episode.reset_when_empty && state.agents.is_empty() {
        Some(EpisodeEndReason::Extinction)
    } else if episode.reset_when_max_ticks && state.clock.reached(episode.max_ticks_per_episode) {
        Some(EpisodeEndReason::MaxTicks)
    } else {
        None
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use ecosim_types::PolicyKind;

    use super::*;

    fn base_config() -> SimulationConfig {
        let mut config = SimulationConfig::default();
        config.grid.width = 8;
        config.grid.height = 8;
        config.grid.seed = 42;
        config
    }

    fn policy_for(config: &SimulationConfig) -> Policy {
        Policy::from_config(&config.policy).unwrap()
    }

    #[test]
    fn new_state_spawns_initial_population() {
        let mut config = base_config();
        config.population.initial_agents = 5;
        let state = SimulationState::new(config).unwrap();
        assert_eq!(state.agents.len(), 5);
        assert_eq!(state.population_history, vec![5]);
        assert_eq!(state.next_agent_id, AgentId::new(6));
        assert!(state.field.is_some());
    }

    #[test]
    fn initial_population_respects_cap() {
        let mut config = base_config();
        config.population.initial_agents = 50;
        config.population.max_agents = 10;
        let state = SimulationState::new(config).unwrap();
        assert_eq!(state.agents.len(), 10);
    }

    #[test]
    fn starving_agent_dies_on_its_25th_tick_with_penalties() {
        let mut config = base_config();
        config.field.enabled = false;
        config.episode.reset_when_empty = false;
        let mut state = SimulationState::new(config).unwrap();
        let mut policy = policy_for(&state.config);

        for _ in 0..24 {
            let summary = run_tick(&mut state, &mut policy);
            assert!(summary.deaths.is_empty());
        }
        let summary = run_tick(&mut state, &mut policy);
        assert_eq!(summary.telemetry.deaths, 1);
        assert_eq!(summary.telemetry.agents_alive, 0);
        let death = summary.deaths.first().unwrap();
        assert_eq!(death.tick, 24);
        assert_eq!(death.age_ticks, 24);
        // 25 metabolism penalties of 0.2 plus the death penalty of 1.0.
        assert!((death.cumulative_reward + 6.0).abs() < 1e-9);
        let outcome = summary.outcomes.first().unwrap();
        assert!(outcome.done);
        assert!((outcome.reward + 1.2).abs() < 1e-9);
        assert!(summary.episode_end.is_none());
        assert!(state.agents.is_empty());
    }

    #[test]
    fn extinction_resets_episode() {
        let mut config = base_config();
        config.field.enabled = false;
        let mut state = SimulationState::new(config).unwrap();
        let mut policy = policy_for(&state.config);

        let mut last = None;
        for _ in 0..25 {
            last = Some(run_tick(&mut state, &mut policy));
        }
        let summary = last.unwrap();
        assert_eq!(summary.episode_end, Some(EpisodeEndReason::Extinction));
        assert_eq!(summary.telemetry.episode, 0);
        assert_eq!(summary.telemetry.tick, 25);
        assert_eq!(state.clock.episode(), 1);
        assert_eq!(state.clock.tick(), 0);
        assert_eq!(state.agents.len(), 1);
        assert_eq!(state.population_history, vec![1]);
    }

    #[test]
    fn reproduction_splits_and_places_newborn_nearby() {
        let mut config = base_config();
        config.agent.start_energy = 10.0;
        config.agent.metabolism_per_tick = 0.0;
        config.field.initial_fill = 0.0;
        config.field.regen_per_tick = 0.0;
        let mut state = SimulationState::new(config).unwrap();
        let mut policy = policy_for(&state.config);
        let parent = state.agents.first().unwrap().position();

        let summary = run_tick(&mut state, &mut policy);
        assert_eq!(summary.births.len(), 1);
        let birth = summary.births.first().unwrap();
        assert_eq!(birth.parent_id, AgentId::new(1));
        assert_eq!(birth.agent_id, AgentId::new(2));
        assert!((birth.energy - 4.0).abs() < 1e-9);
        assert!(parent.chebyshev(birth.cell) <= 2);
        assert_eq!(state.agents.len(), 2);
        assert_eq!(state.population_history, vec![1, 2]);
    }

    #[test]
    fn reproduction_stops_at_cap() {
        let mut config = base_config();
        config.agent.start_energy = 10.0;
        config.agent.metabolism_per_tick = 0.0;
        config.population.initial_agents = 4;
        config.population.max_agents = 6;
        let mut state = SimulationState::new(config).unwrap();
        let mut policy = policy_for(&state.config);

        let summary = run_tick(&mut state, &mut policy);
        assert_eq!(summary.births.len(), 2);
        assert_eq!(state.agents.len(), 6);
        let summary = run_tick(&mut state, &mut policy);
        assert!(summary.births.is_empty());
        assert_eq!(state.agents.len(), 6);
    }

    #[test]
    fn foraging_earns_harvest_reward() {
        let mut config = base_config();
        config.policy.kind = PolicyKind::ObservationGreedy;
        config.field.initial_fill = 1.0;
        config.population.reproduction_enabled = false;
        let mut state = SimulationState::new(config).unwrap();
        let mut policy = policy_for(&state.config);
        let before = state.field.as_ref().unwrap().total_energy();

        let summary = run_tick(&mut state, &mut policy);
        let outcome = summary.outcomes.first().unwrap();
        let agent = state.agents.first().unwrap();
        assert!(agent.last_gained() > 0.0);
        let expected = agent.last_gained() - 0.2;
        assert!((outcome.reward - expected).abs() < 1e-9);
        let after = state.field.as_ref().unwrap().total_energy();
        assert!(after <= before + 64.0 * 0.05);
    }

    #[derive(Debug)]
    struct AlwaysRight;

    impl crate::decision::ActionPolicy for AlwaysRight {
        fn kind(&self) -> PolicyKind {
            PolicyKind::External
        }

        fn decide_action(
            &mut self,
            _agent_id: AgentId,
            _observation: &Observation,
            _rng: &mut SimRng,
        ) -> ecosim_types::Action {
            ecosim_types::Action::Right
        }
    }

    #[test]
    fn agent_harvests_where_it_lands_not_where_it_left() {
        let mut config = base_config();
        config.field.initial_fill = 1.0;
        config.field.regen_per_tick = 0.0;
        config.population.reproduction_enabled = false;
        let mut state = SimulationState::new(config).unwrap();
        let mut policy = Policy::Action(Box::new(AlwaysRight));

        let origin = Cell::new(2, 3);
        let landing = Cell::new(3, 3);
        let grid = state.grid.clone();
        assert!(state.agents.first_mut().unwrap().move_to(&grid, origin));
        let field = state.field.as_mut().unwrap();
        field.deposit(origin, 5.0);
        field.deposit(landing, 5.0);
        let (origin_before, landing_before) = (field.energy(origin), field.energy(landing));

        run_tick(&mut state, &mut policy);
        let agent = state.agents.first().unwrap();
        assert_eq!(agent.position(), landing);
        assert!(agent.last_gained() > 0.0);
        let field = state.field.as_ref().unwrap();
        assert!((field.energy(origin) - origin_before).abs() < 1e-12);
        assert!((landing_before - field.energy(landing) - agent.last_gained()).abs() < 1e-9);
    }

    #[test]
    fn manual_reset_keeps_field_unless_rebuild_requested() {
        let mut config = base_config();
        config.field.regen_per_tick = 0.0;
        let mut state = SimulationState::new(config).unwrap();
        let mut policy = policy_for(&state.config);
        let pristine = state.field.as_ref().unwrap().total_energy();
        for _ in 0..5 {
            run_tick(&mut state, &mut policy);
        }
        let grazed = state.field.as_ref().unwrap().total_energy();
        state.reset_episode(EpisodeEndReason::Manual);
        assert!((state.field.as_ref().unwrap().total_energy() - grazed).abs() < 1e-9);

        state.config.episode.rebuild_field_on_reset = true;
        state.reset_episode(EpisodeEndReason::Manual);
        assert!((state.field.as_ref().unwrap().total_energy() - pristine).abs() < 1e-9);
        assert_eq!(state.clock.episode(), 2);
    }
}

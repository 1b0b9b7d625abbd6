//! Decision policies.
//!
//! Every agent in a run is driven by one [`Policy`], chosen once when the
//! engine is built. A policy comes in one of two shapes:
//!
//! - a [`CellPolicy`] is handed the agent's current cell and its candidate
//!   cells (self plus in-bounds orthogonal neighbors) and returns the cell
//!   to move to;
//! - an [`ActionPolicy`] is handed the agent's [`Observation`] and returns
//!   a discrete [`Action`], which the tick pipeline decodes into a cell.
//!
//! Policies keep no state between ticks apart from what an external
//! collaborator needs (see [`crate::bridge`]). All randomness comes from the
//! engine's single [`SimRng`], in agent order, so a run is reproducible from
//! its seed.

use ecosim_types::{ACTION_SIZE, Action, AgentId, Cell, Observation, PolicyKind, StepOutcome};
use ecosim_world::ResourceField;
use rand::Rng;
use rand::rngs::StdRng;

use crate::config::PolicyConfig;

/// The simulation's single deterministic random source.
pub type SimRng = StdRng;

/// Energy differences at or below this are ties for richness-linger.
const TIE_EPSILON: f64 = 1e-6;

/// Floor for the per-cell cap when computing the linger threshold.
const MIN_CELL_CAP: f64 = 1e-4;

/// A policy that picks a destination cell directly.
pub trait CellPolicy: core::fmt::Debug + Send {
    /// Which configured kind this is.
    fn kind(&self) -> PolicyKind;

    /// Choose among `candidates` for an agent standing on `current`.
    ///
    /// An empty candidate list must yield `current`.
    fn decide(
        &self,
        current: Cell,
        candidates: &[Cell],
        field: Option<&ResourceField>,
        rng: &mut SimRng,
    ) -> Cell;
}

/// A policy that picks a discrete action from an observation.
pub trait ActionPolicy: core::fmt::Debug + Send {
    /// Which configured kind this is.
    fn kind(&self) -> PolicyKind;

    /// Called once per tick, before any agent decides, with every tracked
    /// agent's observation in population order. `tick` restarts at 0 each
    /// episode, so `(episode, tick)` identifies the step.
    fn request_decisions(
        &mut self,
        _episode: u64,
        _tick: u64,
        _observations: &[(AgentId, Observation)],
    ) {
    }

    /// Choose an action for one agent.
    fn decide_action(&mut self, agent_id: AgentId, observation: &Observation, rng: &mut SimRng)
    -> Action;

    /// Called once per tick after culling with each agent's step reward.
    fn record_outcomes(&mut self, _episode: u64, _tick: u64, _outcomes: &[StepOutcome]) {}
}

/// The policy driving a run.
#[derive(Debug)]
pub enum Policy {
    /// Agents choose cells directly.
    Cell(Box<dyn CellPolicy>),
    /// Agents choose actions from observations.
    Action(Box<dyn ActionPolicy>),
}

impl Policy {
    /// Build a built-in policy from configuration.
    ///
    /// Returns `None` for [`PolicyKind::External`], which needs a host-side
    /// collaborator (see [`ExternalActionBridge`](crate::bridge::ExternalActionBridge)).
    pub fn from_config(config: &PolicyConfig) -> Option<Self> {
        match config.kind {
            PolicyKind::EpsilonGreedy => Some(Self::Cell(Box::new(EpsilonGreedyEnergy {
                exploit_prob: config.exploit_prob,
            }))),
            PolicyKind::RichnessLinger => Some(Self::Cell(Box::new(RichnessLinger {
                linger_threshold_frac: config.linger_threshold_frac,
                explore_prob: config.explore_prob,
            }))),
            PolicyKind::ObservationGreedy => Some(Self::Action(Box::new(GreedyObservation))),
            PolicyKind::External => None,
        }
    }

    /// Which configured kind this is.
    pub fn kind(&self) -> PolicyKind {
        match self {
            Self::Cell(p) => p.kind(),
            Self::Action(p) => p.kind(),
        }
    }
}

/// Index of the strictly greatest value, first seen winning ties.
fn first_argmax<I: IntoIterator<Item = f64>>(values: I) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, v) in values.into_iter().enumerate() {
        match best {
            Some((_, b)) if v <= b => {}
            _ if v.is_nan() => {}
            _ => best = Some((i, v)),
        }
    }
    best.map(|(i, _)| i)
}

fn pick_uniform(candidates: &[Cell], rng: &mut SimRng) -> Option<Cell> {
    if candidates.is_empty() {
        return None;
    }
    candidates.get(rng.random_range(0..candidates.len())).copied()
}

/// Epsilon-greedy on sensed field energy.
///
/// Draws one uniform number per decision. With probability
/// `1 - exploit_prob` a second draw picks a uniformly random candidate;
/// otherwise the richest candidate wins, first seen on ties.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EpsilonGreedyEnergy {
    /// Probability of exploiting (taking the richest candidate).
    pub exploit_prob: f64,
}

impl CellPolicy for EpsilonGreedyEnergy {
    fn kind(&self) -> PolicyKind {
        PolicyKind::EpsilonGreedy
    }

    fn decide(
        &self,
        current: Cell,
        candidates: &[Cell],
        field: Option<&ResourceField>,
        rng: &mut SimRng,
    ) -> Cell {
        if candidates.is_empty() {
            return current;
        }
        if rng.random::<f64>() >= self.exploit_prob {
            return pick_uniform(candidates, rng).unwrap_or(current);
        }
        let energies = candidates.iter().map(|c| field.map_or(0.0, |f| f.energy(*c)));
        first_argmax(energies)
            .and_then(|i| candidates.get(i).copied())
            .unwrap_or(current)
    }
}

/// Stay on rich cells, otherwise climb the energy gradient.
///
/// With probability `explore_prob` picks a uniformly random candidate.
/// Otherwise stays if the current cell holds at least
/// `linger_threshold_frac` of the per-cell cap, and failing that moves to a
/// uniformly random choice among the candidates within a small epsilon of
/// the richest.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RichnessLinger {
    /// Fraction of the per-cell cap at which the agent lingers.
    pub linger_threshold_frac: f64,
    /// Probability of a uniformly random move.
    pub explore_prob: f64,
}

impl CellPolicy for RichnessLinger {
    fn kind(&self) -> PolicyKind {
        PolicyKind::RichnessLinger
    }

    fn decide(
        &self,
        current: Cell,
        candidates: &[Cell],
        field: Option<&ResourceField>,
        rng: &mut SimRng,
    ) -> Cell {
        if candidates.is_empty() {
            return current;
        }
        if rng.random::<f64>() < self.explore_prob {
            return pick_uniform(candidates, rng).unwrap_or(current);
        }

        let sense = |c: Cell| field.map_or(0.0, |f| f.energy(c));
        let cap = field.map_or(1.0, |f| f.max_energy_per_cell().max(MIN_CELL_CAP));
        if sense(current) >= self.linger_threshold_frac * cap {
            return current;
        }

        let mut best = f64::NEG_INFINITY;
        let mut ties: Vec<Cell> = Vec::with_capacity(candidates.len());
        for &c in candidates {
            let e = sense(c);
            if e > best + TIE_EPSILON {
                best = e;
                ties.clear();
                ties.push(c);
            } else if (e - best).abs() <= TIE_EPSILON {
                ties.push(c);
            }
        }
        pick_uniform(&ties, rng).unwrap_or(current)
    }
}

/// Argmax over the five sensed-energy components of the observation.
///
/// Deterministic: never touches the random source. Ties go to the lowest
/// index, so a flat neighborhood means `Stay`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GreedyObservation;

impl ActionPolicy for GreedyObservation {
    fn kind(&self) -> PolicyKind {
        PolicyKind::ObservationGreedy
    }

    fn decide_action(
        &mut self,
        _agent_id: AgentId,
        observation: &Observation,
        _rng: &mut SimRng,
    ) -> Action {
        first_argmax(observation.as_slice().iter().take(ACTION_SIZE).copied())
            .and_then(Action::from_index)
            .unwrap_or_default()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use ecosim_world::{FieldParams, Grid};
    use rand::SeedableRng;

    use super::*;

    fn make_field() -> ResourceField {
        let grid = Grid::new(10, 10, 1.0, 3).unwrap();
        ResourceField::generate(
            &grid,
            FieldParams {
                initial_fill: 0.0,
                ..FieldParams::default()
            },
        )
        .unwrap()
    }

    fn candidates(field: &ResourceField, at: Cell) -> Vec<Cell> {
        field.grid().cardinal_neighborhood(at, true)
    }

    #[test]
    fn greedy_observation_picks_strict_max() {
        let mut p = GreedyObservation;
        let mut rng = SimRng::seed_from_u64(1);
        let obs = Observation([0.1, 0.2, 0.9, 0.3, 0.4, 1.0]);
        assert_eq!(p.decide_action(AgentId::new(0), &obs, &mut rng), Action::Right);
    }

    #[test]
    fn greedy_observation_ignores_body_and_breaks_ties_low() {
        let mut p = GreedyObservation;
        let mut rng = SimRng::seed_from_u64(1);
        let flat = Observation([0.5, 0.5, 0.5, 0.5, 0.5, 1.0]);
        assert_eq!(p.decide_action(AgentId::new(0), &flat, &mut rng), Action::Stay);
        let tie = Observation([0.1, 0.2, 0.7, 0.7, 0.0, 0.0]);
        assert_eq!(p.decide_action(AgentId::new(0), &tie, &mut rng), Action::Right);
    }

    #[test]
    fn full_exploit_takes_richest_first_seen() {
        let mut field = make_field();
        let at = Cell::new(5, 5);
        field.deposit(Cell::new(6, 5), 2.0);
        field.deposit(Cell::new(4, 5), 2.0);
        let p = EpsilonGreedyEnergy { exploit_prob: 1.0 };
        let mut rng = SimRng::seed_from_u64(9);
        for _ in 0..20 {
            let c = p.decide(at, &candidates(&field, at), Some(&field), &mut rng);
            assert_eq!(c, Cell::new(6, 5));
        }
    }

    #[test]
    fn zero_exploit_is_uniform_over_candidates() {
        let field = make_field();
        let at = Cell::new(5, 5);
        let cands = candidates(&field, at);
        let p = EpsilonGreedyEnergy { exploit_prob: 0.0 };
        let mut rng = SimRng::seed_from_u64(9);
        let mut seen = std::collections::BTreeSet::new();
        for _ in 0..200 {
            let c = p.decide(at, &cands, Some(&field), &mut rng);
            assert!(cands.contains(&c));
            seen.insert(c);
        }
        assert_eq!(seen.len(), cands.len());
    }

    #[test]
    fn empty_candidates_stay() {
        let p = EpsilonGreedyEnergy { exploit_prob: 0.5 };
        let mut rng = SimRng::seed_from_u64(0);
        assert_eq!(p.decide(Cell::new(1, 1), &[], None, &mut rng), Cell::new(1, 1));
    }

    #[test]
    fn linger_stays_on_rich_cell() {
        let mut field = make_field();
        let at = Cell::new(5, 5);
        field.deposit(at, 6.0);
        field.deposit(Cell::new(5, 6), 10.0);
        let p = RichnessLinger {
            linger_threshold_frac: 0.6,
            explore_prob: 0.0,
        };
        let mut rng = SimRng::seed_from_u64(4);
        assert_eq!(p.decide(at, &candidates(&field, at), Some(&field), &mut rng), at);
    }

    #[test]
    fn linger_climbs_and_breaks_ties_among_best() {
        let mut field = make_field();
        let at = Cell::new(5, 5);
        field.deposit(Cell::new(5, 6), 3.0);
        field.deposit(Cell::new(5, 4), 3.0);
        field.deposit(Cell::new(4, 5), 1.0);
        let p = RichnessLinger {
            linger_threshold_frac: 0.6,
            explore_prob: 0.0,
        };
        let mut rng = SimRng::seed_from_u64(4);
        let mut seen = std::collections::BTreeSet::new();
        for _ in 0..100 {
            let c = p.decide(at, &candidates(&field, at), Some(&field), &mut rng);
            assert!(c == Cell::new(5, 6) || c == Cell::new(5, 4));
            seen.insert(c);
        }
        assert_eq!(seen.len(), 2);
    }

    #[test]
    fn same_seed_same_choices() {
        let field = make_field();
        let at = Cell::new(2, 2);
        let cands = candidates(&field, at);
        let p = EpsilonGreedyEnergy { exploit_prob: 0.3 };
        let mut a = SimRng::seed_from_u64(77);
        let mut b = SimRng::seed_from_u64(77);
        for _ in 0..50 {
            assert_eq!(
                p.decide(at, &cands, Some(&field), &mut a),
                p.decide(at, &cands, Some(&field), &mut b)
            );
        }
    }

    #[test]
    fn from_config_resolves_builtin_kinds() {
        let mut config = PolicyConfig::default();
        assert_eq!(Policy::from_config(&config).unwrap().kind(), PolicyKind::EpsilonGreedy);
        config.kind = PolicyKind::RichnessLinger;
        assert!(matches!(Policy::from_config(&config), Some(Policy::Cell(_))));
        config.kind = PolicyKind::ObservationGreedy;
        assert!(matches!(Policy::from_config(&config), Some(Policy::Action(_))));
        config.kind = PolicyKind::External;
        assert!(Policy::from_config(&config).is_none());
    }
}

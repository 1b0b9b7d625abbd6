//! Whole-pipeline tests for the EcoSim engine.
//!
//! These drive a [`SimulationEngine`] through many ticks and check the
//! population-level guarantees: seeded reproducibility, the population cap,
//! bounded field energy, episode boundaries, and the external action bridge.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use std::collections::BTreeMap;

use ecosim_core::perception::action_to_cell;
use ecosim_core::{
    ActionReply, BridgeMessage, HistorySink, NoOpSink, SimulationConfig, SimulationEngine,
    TelemetrySink, run_ticks,
};
use ecosim_types::{
    Action, AgentId, BirthRecord, Cell, DeathRecord, EpisodeEndReason, PolicyKind, TickTelemetry,
};

fn busy_config(seed: u64, policy: PolicyKind) -> SimulationConfig {
    let mut config = SimulationConfig::default();
    config.grid.width = 16;
    config.grid.height = 16;
    config.grid.seed = seed;
    config.population.initial_agents = 6;
    config.population.max_agents = 40;
    config.population.reproduce_threshold = 6.0;
    config.policy.kind = policy;
    config
}

/// Starved field: agents lose energy on most steps, so starvation, births
/// and who survives depend on where each agent walks.
fn scarce_config(seed: u64, policy: PolicyKind) -> SimulationConfig {
    let mut config = busy_config(seed, policy);
    config.field.initial_fill = 0.15;
    config.field.regen_per_tick = 0.01;
    config
}

/// Everything observable about a run, tick by tick.
#[derive(Debug, PartialEq)]
struct Trace {
    telemetry: Vec<TickTelemetry>,
    deaths: Vec<DeathRecord>,
    births: Vec<BirthRecord>,
    positions: Vec<Vec<(AgentId, Cell)>>,
}

fn trace(config: SimulationConfig, ticks: u64) -> Trace {
    let mut engine = SimulationEngine::new(config).unwrap();
    let mut sink = HistorySink::default();
    let mut positions = Vec::new();
    for _ in 0..ticks {
        let summary = engine.advance_one_tick();
        sink.on_tick(&summary, &engine);
        positions.push(engine.agents().iter().map(|a| (a.id(), a.position())).collect());
    }
    Trace {
        telemetry: sink.telemetry,
        deaths: sink.deaths,
        births: sink.births,
        positions,
    }
}

#[test]
fn same_seed_reproduces_every_tick() {
    for policy in [
        PolicyKind::EpsilonGreedy,
        PolicyKind::RichnessLinger,
        PolicyKind::ObservationGreedy,
    ] {
        let builders: [fn(u64, PolicyKind) -> SimulationConfig; 2] = [busy_config, scarce_config];
        for config in builders {
            let a = trace(config(777, policy), 400);
            let b = trace(config(777, policy), 400);
            assert_eq!(a.positions, b.positions, "positions diverged for {policy}");
            assert_eq!(a.telemetry, b.telemetry, "telemetry diverged for {policy}");
            assert_eq!(a.deaths, b.deaths, "deaths diverged for {policy}");
            assert_eq!(a.births, b.births, "births diverged for {policy}");
        }
    }
}

#[test]
fn different_seeds_differ() {
    let a = trace(scarce_config(1, PolicyKind::EpsilonGreedy), 200);
    let b = trace(scarce_config(2, PolicyKind::EpsilonGreedy), 200);
    assert_ne!(a.positions.first(), b.positions.first());
    assert_ne!(a, b);
}

#[test]
fn population_never_exceeds_cap() {
    let mut config = busy_config(99, PolicyKind::RichnessLinger);
    config.agent.start_energy = 10.0;
    config.agent.metabolism_per_tick = 0.05;
    config.population.initial_agents = 3;
    config.population.max_agents = 15;
    config.population.reproduce_threshold = 2.0;
    config.population.offspring_energy_fraction = 0.5;
    config.field.regen_per_tick = 0.5;

    let mut engine = SimulationEngine::new(config).unwrap();
    let mut sink = HistorySink::default();
    run_ticks(&mut engine, 300, &mut sink);

    assert!(sink.telemetry.iter().all(|t| t.agents_alive <= 15));
    assert!(engine.population_history().iter().all(|n| *n <= 15));
    assert!(sink.telemetry.iter().any(|t| t.agents_alive == 15));
}

#[test]
fn initial_population_is_capped() {
    let mut config = SimulationConfig::default();
    config.population.initial_agents = 20;
    config.population.max_agents = 5;
    let engine = SimulationEngine::new(config).unwrap();
    assert_eq!(engine.agents().len(), 5);
}

#[test]
fn field_and_bodies_stay_bounded() {
    let mut engine = SimulationEngine::new(busy_config(5, PolicyKind::EpsilonGreedy)).unwrap();
    for _ in 0..250 {
        engine.advance_one_tick();
        let field = engine.field().unwrap();
        let cap = field.max_energy_per_cell();
        assert!(field.energies().iter().all(|e| (0.0..=cap).contains(e)));
        assert!(
            engine
                .agents()
                .iter()
                .all(|a| a.is_alive() && (0.0..=a.max_energy()).contains(&a.body_energy()))
        );
    }
}

#[test]
fn episode_resets_exactly_at_tick_cap() {
    let mut config = SimulationConfig::default();
    config.population.initial_agents = 3;
    config.population.reproduction_enabled = false;
    config.agent.metabolism_per_tick = 0.0;
    config.episode.max_ticks_per_episode = 2000;
    config.episode.reset_when_max_ticks = true;
    config.episode.reset_when_empty = false;

    let mut engine = SimulationEngine::new(config).unwrap();
    run_ticks(&mut engine, 1999, &mut NoOpSink);
    assert_eq!(engine.tick(), 1999);
    assert_eq!(engine.episode(), 0);

    let summary = engine.advance_one_tick();
    assert_eq!(summary.episode_end, Some(EpisodeEndReason::MaxTicks));
    assert_eq!(summary.telemetry.tick, 2000);
    assert_eq!(summary.telemetry.episode, 0);
    assert_eq!(engine.tick(), 0);
    assert_eq!(engine.episode(), 1);
    assert_eq!(engine.agents().len(), 3);
    assert_eq!(engine.population_history(), &[3]);
}

#[test]
fn reset_replays_the_first_episode() {
    let mut config = SimulationConfig::default();
    config.population.initial_agents = 4;
    config.field.regen_per_tick = 0.0;
    config.episode.rebuild_field_on_reset = true;
    let mut engine = SimulationEngine::new(config).unwrap();

    let first: Vec<_> = (0..30).map(|_| engine.advance_one_tick().telemetry).collect();
    engine.reset_episode();
    let second: Vec<_> = (0..30).map(|_| engine.advance_one_tick().telemetry).collect();

    let strip = |ts: &[ecosim_types::TickTelemetry]| {
        ts.iter()
            .map(|t| (t.tick, t.agents_alive, t.births, t.deaths, t.mean_energy_fraction.to_bits()))
            .collect::<Vec<_>>()
    };
    assert_eq!(strip(&first), strip(&second));
}

#[test]
fn external_bridge_drives_agents() {
    let mut config = SimulationConfig::default();
    config.grid.width = 10;
    config.grid.height = 10;
    config.policy.kind = PolicyKind::External;
    config.policy.external_timeout_ms = 20;
    config.population.reproduction_enabled = false;

    let (mut engine, endpoint) = SimulationEngine::with_external_bridge(config).unwrap();
    assert_eq!(engine.policy_kind(), PolicyKind::External);

    let agent = engine.agents()[0].id();
    assert_eq!(agent, AgentId::new(1));
    let start = engine.agents()[0].position();
    let expected = action_to_cell(engine.grid(), start, Action::Right);

    endpoint
        .send_actions(ActionReply {
            episode: 0,
            tick: 0,
            actions: BTreeMap::from([(agent, 2)]),
        })
        .unwrap();
    let summary = engine.advance_one_tick();
    assert_eq!(engine.agents()[0].position(), expected);

    let request = endpoint.try_recv().unwrap().unwrap();
    assert!(matches!(
        request,
        BridgeMessage::DecisionRequest { episode: 0, tick: 0, ref observations }
            if observations.len() == 1 && observations[0].0 == agent
    ));
    let outcomes = endpoint.try_recv().unwrap().unwrap();
    assert_eq!(
        outcomes,
        BridgeMessage::Outcomes {
            episode: 0,
            tick: 0,
            outcomes: summary.outcomes,
        }
    );

    // No reply for tick 1: the agent stays put.
    engine.advance_one_tick();
    assert_eq!(engine.agents()[0].position(), expected);
}

#[test]
fn late_reply_does_not_leak_into_next_episode() {
    let mut config = SimulationConfig::default();
    config.grid.width = 10;
    config.grid.height = 10;
    config.policy.kind = PolicyKind::External;
    config.policy.external_timeout_ms = 20;
    config.population.reproduction_enabled = false;

    let (mut engine, endpoint) = SimulationEngine::with_external_bridge(config).unwrap();
    engine.reset_episode();
    assert_eq!((engine.episode(), engine.tick()), (1, 0));

    let agent = engine.agents()[0].id();
    let start = engine.agents()[0].position();
    // Addressed to tick 0 of the finished episode.
    endpoint
        .send_actions(ActionReply {
            episode: 0,
            tick: 0,
            actions: BTreeMap::from([(agent, 2)]),
        })
        .unwrap();
    engine.advance_one_tick();
    assert_eq!(engine.agents()[0].position(), start);
    assert!(matches!(
        endpoint.try_recv().unwrap(),
        Some(BridgeMessage::DecisionRequest { episode: 1, tick: 0, .. })
    ));
}

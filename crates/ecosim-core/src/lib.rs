//! Configuration, policies, tick pipeline, and engine for the EcoSim
//! foraging simulation.
//!
//! This crate owns the ordered per-tick pipeline that advances a population
//! of foragers over a regenerating resource field: decide and forage,
//! metabolism, reward settlement, cull, reproduction, regeneration, and
//! episode boundaries.
//!
//! # Modules
//!
//! - [`bridge`] -- Channel-backed [`ExternalActionBridge`] that lets an
//!   outside process choose every agent's action.
//! - [`clock`] -- Episode clock with per-episode and total tick counters.
//! - [`config`] -- Configuration loading from `ecosim-config.yaml` into
//!   strongly-typed structs, environment overrides, and presets.
//! - [`decision`] -- [`CellPolicy`] and [`ActionPolicy`] traits and the
//!   built-in heuristic policies.
//! - [`engine`] -- [`SimulationEngine`], the owned value a host drives.
//! - [`perception`] -- Observation building and action decoding.
//! - [`runner`] -- Bounded synchronous runner and the [`TelemetrySink`] trait.
//! - [`tick`] -- The ten-phase tick cycle.
//!
//! [`ExternalActionBridge`]: bridge::ExternalActionBridge
//! [`CellPolicy`]: decision::CellPolicy
//! [`ActionPolicy`]: decision::ActionPolicy
//! [`SimulationEngine`]: engine::SimulationEngine
//! [`TelemetrySink`]: runner::TelemetrySink

pub mod bridge;
pub mod clock;
pub mod config;
pub mod decision;
pub mod engine;
pub mod perception;
pub mod runner;
pub mod tick;

pub use bridge::{ActionReply, BridgeEndpoint, BridgeError, BridgeMessage, ExternalActionBridge};
pub use config::{ConfigError, SimulationConfig};
pub use decision::{ActionPolicy, CellPolicy, Policy, SimRng};
pub use engine::{SimulationEngine, SimulationError};
pub use runner::{HistorySink, NoOpSink, RunResult, TelemetrySink, run_ticks};
pub use tick::TickSummary;

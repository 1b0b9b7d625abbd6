//! Shared type definitions for the EcoSim foraging simulation.
//!
//! This crate is the single source of truth for the small value types that
//! flow between the world, agent, and engine crates, and out to external
//! collaborators (loggers, exporters, learning processes).
//!
//! # Modules
//!
//! - [`ids`] -- Type-safe identifier wrappers for simulated entities
//! - [`spatial`] -- Grid cell coordinates and the discrete movement actions
//! - [`observation`] -- The fixed-size numeric observation vector
//! - [`enums`] -- Policy selection and episode termination enums
//! - [`telemetry`] -- Per-tick telemetry, birth/death records, snapshots

pub mod enums;
pub mod ids;
pub mod observation;
pub mod spatial;
pub mod telemetry;

// Re-export all public types at crate root for convenience.
pub use enums::{EpisodeEndReason, PolicyKind};
pub use ids::AgentId;
pub use observation::{ACTION_SIZE, OBSERVATION_SIZE, Observation};
pub use spatial::{Action, Cell};
pub use telemetry::{
    AgentSnapshot, BirthRecord, DeathRecord, SimulationSnapshot, StepOutcome, TickTelemetry,
};

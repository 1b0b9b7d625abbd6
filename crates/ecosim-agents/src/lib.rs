//! Agent state and lifecycle for the EcoSim foraging simulation.
//!
//! This crate contains the logic layer for individual organisms: everything
//! that operates on one agent's energy, position and reward without touching
//! the population as a whole. It sits between `ecosim-world` (the field the
//! agents forage on) and `ecosim-core` (which orders agents through the tick
//! pipeline).
//!
//! # Modules
//!
//! - [`agent`] -- The [`Agent`] record and its `Alive -> Dead` state machine
//! - [`config`] -- Per-agent body parameters ([`BodyConfig`])
//! - [`death`] -- Death records for culled agents
//! - [`reproduction`] -- Birth-cell choice and population cap checks

pub mod agent;
pub mod config;
pub mod death;
pub mod reproduction;

// Re-export primary types at crate root for convenience.
pub use agent::Agent;
pub use config::BodyConfig;
pub use death::record_death;
pub use reproduction::{can_add_agent, choose_birth_cell};

//! Geography and resources for the EcoSim foraging simulation.
//!
//! This crate models the physical world agents forage on: a rectangular grid
//! of cells and a mutable field of bounded resource energy laid over it.
//!
//! # Modules
//!
//! - [`error`] -- Error types for invalid grid and field parameters.
//! - [`grid`] -- [`Grid`]: bounds checks, cell indexing, world-space mapping,
//!   neighborhoods, and uniform random cell sampling.
//! - [`noise`] -- Seed-offset multi-octave coherent noise used to lay out the
//!   initial field.
//! - [`field`] -- [`ResourceField`]: procedural fill, bounded harvest and
//!   deposit, uniform regeneration.

pub mod error;
pub mod field;
pub mod grid;
pub mod noise;

// Re-export primary types at crate root.
pub use error::WorldError;
pub use field::{FieldParams, ResourceField};
pub use grid::{Grid, WorldPoint};
pub use noise::NoiseParams;

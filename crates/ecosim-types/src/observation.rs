//! The fixed-size observation vector handed to action policies.
//!
//! Layout (all components in `[0, 1]`):
//!
//! | Index | Meaning                                         |
//! |-------|-------------------------------------------------|
//! | 0     | Field energy at the agent's cell                |
//! | 1     | Field energy one cell up                        |
//! | 2     | Field energy one cell right                     |
//! | 3     | Field energy one cell down                      |
//! | 4     | Field energy one cell left                      |
//! | 5     | Agent body energy as a fraction of its maximum  |
//!
//! Field components are normalized by the field's per-cell maximum and are
//! zero for out-of-bounds neighbors. Indices 0..=4 line up with
//! [`Action`](crate::Action) indices, so an argmax over them is a move.

use serde::{Deserialize, Serialize};

use crate::spatial::Action;

/// Number of components in an [`Observation`].
pub const OBSERVATION_SIZE: usize = 6;

/// Number of discrete actions an action policy chooses from.
pub const ACTION_SIZE: usize = 5;

/// Normalized local sensing of one agent at one tick.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Observation(pub [f64; OBSERVATION_SIZE]);

impl Observation {
    /// Borrow the raw components.
    pub const fn as_slice(&self) -> &[f64; OBSERVATION_SIZE] {
        &self.0
    }

    /// Sensed field energy in the direction of `action` (`Stay` is self).
    pub fn field_energy(&self, action: Action) -> f64 {
        self.0.get(action.index()).copied().unwrap_or(0.0)
    }

    /// The agent's own body-energy fraction.
    pub fn body_energy(&self) -> f64 {
        self.0.get(OBSERVATION_SIZE.saturating_sub(1)).copied().unwrap_or(0.0)
    }
}

impl From<[f64; OBSERVATION_SIZE]> for Observation {
    fn from(raw: [f64; OBSERVATION_SIZE]) -> Self {
        Self(raw)
    }
}

//! Enumeration types for policy selection and episode boundaries.

use serde::{Deserialize, Serialize};

/// The decision policy driving every agent in a run.
///
/// Selected once from configuration when the population is spawned.
/// Cell policies pick a destination cell directly; action policies pick a
/// discrete action from an observation vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyKind {
    /// Cell policy: epsilon-greedy on sensed field energy.
    #[default]
    EpsilonGreedy,
    /// Cell policy: stay on rich cells, otherwise climb the energy gradient.
    RichnessLinger,
    /// Action policy: argmax over the sensed-energy observation components.
    ObservationGreedy,
    /// Action policy: actions supplied by an external process.
    External,
}

impl PolicyKind {
    /// Whether this kind returns target cells (as opposed to action indices).
    pub const fn is_cell_policy(self) -> bool {
        matches!(self, Self::EpsilonGreedy | Self::RichnessLinger)
    }

    /// Stable lowercase name, as used in configuration and exports.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::EpsilonGreedy => "epsilon_greedy",
            Self::RichnessLinger => "richness_linger",
            Self::ObservationGreedy => "observation_greedy",
            Self::External => "external",
        }
    }
}

impl core::fmt::Display for PolicyKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for PolicyKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "epsilon_greedy" => Ok(Self::EpsilonGreedy),
            "richness_linger" => Ok(Self::RichnessLinger),
            "observation_greedy" => Ok(Self::ObservationGreedy),
            "external" => Ok(Self::External),
            other => Err(format!("unknown policy kind: {other}")),
        }
    }
}

/// Why an episode ended and the population was respawned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EpisodeEndReason {
    /// Every agent died.
    Extinction,
    /// The episode reached its configured tick cap.
    MaxTicks,
    /// The host requested a reset.
    Manual,
}

impl core::fmt::Display for EpisodeEndReason {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Extinction => write!(f, "extinction"),
            Self::MaxTicks => write!(f, "max_ticks"),
            Self::Manual => write!(f, "manual"),
        }
    }
}

//! Body parameters shared by every agent in a run.
//!
//! These values correspond to the `agent` section of `ecosim-config.yaml`.
//! [`BodyConfig`] bundles every per-agent tunable so that callers (the tick
//! pipeline, tests) can override defaults.

use serde::{Deserialize, Serialize};

/// Static energy parameters of an agent body.
///
/// All quantities are in field-energy units and are applied once per tick.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BodyConfig {
    /// Upper bound on body energy (default: 10.0).
    #[serde(default = "default_max_energy")]
    pub max_energy: f64,

    /// Body energy of agents in the initial population (default: 5.0).
    ///
    /// Clamped into `[0, max_energy]` at spawn.
    #[serde(default = "default_start_energy")]
    pub start_energy: f64,

    /// Energy burned every tick regardless of activity (default: 0.2).
    #[serde(default = "default_metabolism_per_tick")]
    pub metabolism_per_tick: f64,

    /// Field energy requested from the current cell each tick (default: 0.4).
    #[serde(default = "default_harvest_per_step")]
    pub harvest_per_step: f64,
}

const fn default_max_energy() -> f64 {
    10.0
}

const fn default_start_energy() -> f64 {
    5.0
}

const fn default_metabolism_per_tick() -> f64 {
    0.2
}

const fn default_harvest_per_step() -> f64 {
    0.4
}

impl Default for BodyConfig {
    fn default() -> Self {
        Self {
            max_energy: default_max_energy(),
            start_energy: default_start_energy(),
            metabolism_per_tick: default_metabolism_per_tick(),
            harvest_per_step: default_harvest_per_step(),
        }
    }
}

impl BodyConfig {
    /// Spawn energy after clamping into `[0, max_energy]`.
    pub fn clamped_start_energy(&self) -> f64 {
        self.start_energy.clamp(0.0, self.max_energy.max(0.0))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_take_defaults() {
        let body: BodyConfig = serde_json::from_str(r#"{"max_energy": 20.0}"#).unwrap();
        assert!((body.max_energy - 20.0).abs() < f64::EPSILON);
        assert!((body.start_energy - 5.0).abs() < f64::EPSILON);
        assert!((body.metabolism_per_tick - 0.2).abs() < f64::EPSILON);
    }

    #[test]
    fn start_energy_is_clamped() {
        let body = BodyConfig {
            start_energy: 50.0,
            ..BodyConfig::default()
        };
        assert!((body.clamped_start_energy() - 10.0).abs() < f64::EPSILON);
        let body = BodyConfig {
            start_energy: -1.0,
            ..BodyConfig::default()
        };
        assert!(body.clamped_start_energy().abs() < f64::EPSILON);
    }
}

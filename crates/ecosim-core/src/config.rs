//! Configuration loading and typed config structures for the EcoSim simulation.
//!
//! The canonical configuration lives in `ecosim-config.yaml` at the project
//! root. This module defines strongly-typed structs that mirror the YAML
//! structure, a loader that reads, overrides and validates the file, and the
//! named presets that bundle common parameter sets.
//!
//! Every field has a default, so an empty document is a valid configuration:
//! a 32x32 grid seeded with 12345 and a single epsilon-greedy forager.

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use ecosim_agents::BodyConfig;
use ecosim_types::PolicyKind;
use ecosim_world::{FieldParams, Grid, NoiseParams, WorldError};
use serde::Deserialize;
use tracing::{info, warn};

/// Environment variable overriding `grid.seed`.
pub const SEED_ENV: &str = "ECOSIM_SEED";

/// Environment variable overriding `policy.kind`.
pub const POLICY_ENV: &str = "ECOSIM_POLICY";

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// A value parsed but is out of range.
    #[error("invalid config value for `{field}`: {reason}")]
    Invalid {
        /// Dotted path of the offending key.
        field: String,
        /// What is wrong with it.
        reason: String,
    },

    /// A preset was requested that the `presets` map does not define.
    #[error("unknown preset: {0}")]
    UnknownPreset(String),
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level simulation configuration.
///
/// Mirrors the structure of `ecosim-config.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SimulationConfig {
    /// Grid geometry and seed.
    #[serde(default)]
    pub grid: GridConfig,

    /// Resource field generation and regeneration.
    #[serde(default)]
    pub field: FieldConfig,

    /// Per-agent body parameters.
    #[serde(default)]
    pub agent: BodyConfig,

    /// Initial population, cap, and reproduction.
    #[serde(default)]
    pub population: PopulationConfig,

    /// Decision policy selection and tuning.
    #[serde(default)]
    pub policy: PolicyConfig,

    /// Reward shaping.
    #[serde(default)]
    pub reward: RewardConfig,

    /// Episode boundaries.
    #[serde(default)]
    pub episode: EpisodeConfig,

    /// Real-time pacing of the binary's run loop.
    #[serde(default)]
    pub run: RunConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Named parameter bundles applied with [`SimulationConfig::apply_preset`].
    #[serde(default)]
    pub presets: BTreeMap<String, SimPreset>,
}

impl SimulationConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// Environment variables override YAML values:
    /// - `ECOSIM_SEED` overrides `grid.seed`
    /// - `ECOSIM_POLICY` overrides `policy.kind`
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read,
    /// [`ConfigError::Yaml`] if the content is not valid YAML, or
    /// [`ConfigError::Invalid`] if a value is out of range.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse configuration from a YAML string, then apply environment
    /// overrides and validate.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML, or
    /// [`ConfigError::Invalid`] if a value is out of range.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let mut config: Self = if yaml.trim().is_empty() {
            Self::default()
        } else {
            serde_yml::from_str(yaml)?
        };
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Apply `ECOSIM_SEED` and `ECOSIM_POLICY` if set. Unparseable values
    /// are ignored with a warning.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var(SEED_ENV) {
            match val.trim().parse::<u64>() {
                Ok(seed) => self.grid.seed = seed,
                Err(e) => warn!(value = %val, error = %e, "Ignoring unparseable {SEED_ENV}"),
            }
        }
        if let Ok(val) = std::env::var(POLICY_ENV) {
            match val.parse::<PolicyKind>() {
                Ok(kind) => self.policy.kind = kind,
                Err(e) => warn!(value = %val, error = %e, "Ignoring unparseable {POLICY_ENV}"),
            }
        }
    }

    /// Apply the named preset from [`presets`](Self::presets) and
    /// re-validate.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownPreset`] if no preset has that name, or
    /// [`ConfigError::Invalid`] if the preset produces out-of-range values.
    pub fn apply_preset(&mut self, name: &str) -> Result<(), ConfigError> {
        let preset = self
            .presets
            .get(name)
            .cloned()
            .ok_or_else(|| ConfigError::UnknownPreset(name.to_owned()))?;
        preset.apply_to(self);
        info!(preset = name, display_name = %preset.display_name, "Applied preset");
        self.validate()
    }

    /// Check every value against its allowed range.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first offending key.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let g = &self.grid;
        require(g.width >= 2, "grid.width", || format!("must be at least 2, got {}", g.width))?;
        require(g.height >= 2, "grid.height", || format!("must be at least 2, got {}", g.height))?;
        positive(g.cell_size, "grid.cell_size")?;

        let f = &self.field;
        positive(f.max_energy_per_cell, "field.max_energy_per_cell")?;
        unit_interval(f.initial_fill, "field.initial_fill")?;
        positive(f.noise_scale, "field.noise_scale")?;
        require(f.noise_octaves >= 1, "field.noise_octaves", || {
            "must be at least 1".to_owned()
        })?;
        unit_interval(f.noise_persistence, "field.noise_persistence")?;
        non_negative(f.regen_per_tick, "field.regen_per_tick")?;

        let a = &self.agent;
        positive(a.max_energy, "agent.max_energy")?;
        non_negative(a.start_energy, "agent.start_energy")?;
        non_negative(a.metabolism_per_tick, "agent.metabolism_per_tick")?;
        non_negative(a.harvest_per_step, "agent.harvest_per_step")?;

        let p = &self.population;
        require(p.max_agents >= 1, "population.max_agents", || {
            "must be at least 1".to_owned()
        })?;
        non_negative(p.reproduce_threshold, "population.reproduce_threshold")?;
        require(
            p.offspring_energy_fraction > 0.0 && p.offspring_energy_fraction <= 1.0,
            "population.offspring_energy_fraction",
            || format!("must be in (0, 1], got {}", p.offspring_energy_fraction),
        )?;

        let pol = &self.policy;
        unit_interval(pol.exploit_prob, "policy.exploit_prob")?;
        unit_interval(pol.linger_threshold_frac, "policy.linger_threshold_frac")?;
        unit_interval(pol.explore_prob, "policy.explore_prob")?;

        let r = &self.reward;
        finite(r.harvest_reward_scale, "reward.harvest_reward_scale")?;
        finite(r.metabolism_penalty_scale, "reward.metabolism_penalty_scale")?;
        finite(r.death_penalty, "reward.death_penalty")?;

        positive(self.run.ticks_per_second, "run.ticks_per_second")?;
        Ok(())
    }

    /// Build the [`Grid`] described by the `grid` section.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::InvalidGrid`] if the geometry is unusable.
    pub fn build_grid(&self) -> Result<Grid, WorldError> {
        Grid::new(
            self.grid.width,
            self.grid.height,
            self.grid.cell_size,
            self.grid.seed,
        )
    }
}

fn require(
    ok: bool,
    field: &str,
    reason: impl FnOnce() -> String,
) -> Result<(), ConfigError> {
    if ok {
        Ok(())
    } else {
        Err(ConfigError::Invalid {
            field: field.to_owned(),
            reason: reason(),
        })
    }
}

fn finite(v: f64, field: &str) -> Result<(), ConfigError> {
    require(v.is_finite(), field, || format!("must be finite, got {v}"))
}

fn positive(v: f64, field: &str) -> Result<(), ConfigError> {
    require(v.is_finite() && v > 0.0, field, || format!("must be positive, got {v}"))
}

fn non_negative(v: f64, field: &str) -> Result<(), ConfigError> {
    require(v.is_finite() && v >= 0.0, field, || {
        format!("must be non-negative, got {v}")
    })
}

fn unit_interval(v: f64, field: &str) -> Result<(), ConfigError> {
    require((0.0..=1.0).contains(&v), field, || {
        format!("must be in [0, 1], got {v}")
    })
}

/// Grid geometry and seed.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GridConfig {
    /// Number of columns.
    #[serde(default = "default_grid_dimension")]
    pub width: u32,

    /// Number of rows.
    #[serde(default = "default_grid_dimension")]
    pub height: u32,

    /// World-space edge length of one cell.
    #[serde(default = "default_cell_size")]
    pub cell_size: f64,

    /// Seed for field noise and the agent random stream.
    #[serde(default = "default_seed")]
    pub seed: u64,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            width: default_grid_dimension(),
            height: default_grid_dimension(),
            cell_size: default_cell_size(),
            seed: default_seed(),
        }
    }
}

/// Resource field generation and regeneration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FieldConfig {
    /// Whether a field exists at all. Without one, agents sense and harvest
    /// nothing.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Per-cell energy cap.
    #[serde(default = "default_max_energy_per_cell")]
    pub max_energy_per_cell: f64,

    /// Fraction of the cap the initial noise pattern is scaled to.
    #[serde(default = "default_initial_fill")]
    pub initial_fill: f64,

    /// Base noise frequency per cell.
    #[serde(default = "default_noise_scale")]
    pub noise_scale: f64,

    /// Number of noise octaves.
    #[serde(default = "default_noise_octaves")]
    pub noise_octaves: u32,

    /// Amplitude decay between octaves.
    #[serde(default = "default_noise_persistence")]
    pub noise_persistence: f64,

    /// Energy added to every cell per tick.
    #[serde(default = "default_regen_per_tick")]
    pub regen_per_tick: f64,
}

impl Default for FieldConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_energy_per_cell: default_max_energy_per_cell(),
            initial_fill: default_initial_fill(),
            noise_scale: default_noise_scale(),
            noise_octaves: default_noise_octaves(),
            noise_persistence: default_noise_persistence(),
            regen_per_tick: default_regen_per_tick(),
        }
    }
}

impl FieldConfig {
    /// The generation parameters for [`ecosim_world::ResourceField`].
    pub const fn params(&self) -> FieldParams {
        FieldParams {
            max_energy_per_cell: self.max_energy_per_cell,
            initial_fill: self.initial_fill,
            noise: NoiseParams {
                scale: self.noise_scale,
                octaves: self.noise_octaves,
                persistence: self.noise_persistence,
            },
            regen_per_tick: self.regen_per_tick,
        }
    }
}

/// Initial population, cap, and reproduction.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PopulationConfig {
    /// Agents spawned at the start of every episode.
    #[serde(default = "default_initial_agents")]
    pub initial_agents: u32,

    /// Hard population cap enforced by the reproduction phase.
    #[serde(default = "default_max_agents")]
    pub max_agents: u32,

    /// Whether agents split off offspring at all.
    #[serde(default = "default_true")]
    pub reproduction_enabled: bool,

    /// Body energy at or above which an agent reproduces.
    #[serde(default = "default_reproduce_threshold")]
    pub reproduce_threshold: f64,

    /// Fraction of the parent's energy handed to the offspring.
    #[serde(default = "default_offspring_energy_fraction")]
    pub offspring_energy_fraction: f64,
}

impl Default for PopulationConfig {
    fn default() -> Self {
        Self {
            initial_agents: default_initial_agents(),
            max_agents: default_max_agents(),
            reproduction_enabled: true,
            reproduce_threshold: default_reproduce_threshold(),
            offspring_energy_fraction: default_offspring_energy_fraction(),
        }
    }
}

/// Decision policy selection and tuning.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PolicyConfig {
    /// Which policy drives every agent.
    #[serde(default)]
    pub kind: PolicyKind,

    /// Epsilon-greedy: probability of taking the richest candidate.
    #[serde(default = "default_exploit_prob")]
    pub exploit_prob: f64,

    /// Richness-linger: stay when the current cell holds at least this
    /// fraction of the per-cell cap.
    #[serde(default = "default_linger_threshold_frac")]
    pub linger_threshold_frac: f64,

    /// Richness-linger: probability of a uniformly random move.
    #[serde(default = "default_explore_prob")]
    pub explore_prob: f64,

    /// External policy: how long to wait for an action reply each tick.
    #[serde(default = "default_external_timeout_ms")]
    pub external_timeout_ms: u64,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            kind: PolicyKind::default(),
            exploit_prob: default_exploit_prob(),
            linger_threshold_frac: default_linger_threshold_frac(),
            explore_prob: default_explore_prob(),
            external_timeout_ms: default_external_timeout_ms(),
        }
    }
}

impl PolicyConfig {
    /// Per-tick reply timeout for the external policy.
    pub const fn external_timeout(&self) -> Duration {
        Duration::from_millis(self.external_timeout_ms)
    }
}

/// Reward shaping.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RewardConfig {
    /// Reward per unit of harvested energy.
    #[serde(default = "default_one")]
    pub harvest_reward_scale: f64,

    /// Per-tick penalty is `metabolism_penalty_scale * metabolism_per_tick`.
    #[serde(default = "default_one")]
    pub metabolism_penalty_scale: f64,

    /// One-time penalty charged to an agent as it is culled.
    #[serde(default = "default_one")]
    pub death_penalty: f64,
}

impl Default for RewardConfig {
    fn default() -> Self {
        Self {
            harvest_reward_scale: default_one(),
            metabolism_penalty_scale: default_one(),
            death_penalty: default_one(),
        }
    }
}

/// Episode boundaries.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EpisodeConfig {
    /// Tick count at which an episode ends (when `reset_when_max_ticks`).
    #[serde(default = "default_max_ticks_per_episode")]
    pub max_ticks_per_episode: u64,

    /// Reset when the population goes extinct.
    #[serde(default = "default_true")]
    pub reset_when_empty: bool,

    /// Reset when the tick counter reaches `max_ticks_per_episode`.
    #[serde(default = "default_true")]
    pub reset_when_max_ticks: bool,

    /// Regenerate the field from noise on reset instead of keeping it.
    #[serde(default)]
    pub rebuild_field_on_reset: bool,
}

impl Default for EpisodeConfig {
    fn default() -> Self {
        Self {
            max_ticks_per_episode: default_max_ticks_per_episode(),
            reset_when_empty: true,
            reset_when_max_ticks: true,
            rebuild_field_on_reset: false,
        }
    }
}

/// Real-time pacing of the binary's run loop. Has no effect on tick
/// semantics.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RunConfig {
    /// Ticks advanced per wall-clock second.
    #[serde(default = "default_ticks_per_second")]
    pub ticks_per_second: f64,

    /// Stop after this many ticks in total (0 runs until interrupted).
    #[serde(default)]
    pub max_ticks: u64,

    /// Wait for an operator before the first tick.
    #[serde(default)]
    pub start_paused: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            ticks_per_second: default_ticks_per_second(),
            max_ticks: 0,
            start_paused: false,
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error), used when `RUST_LOG` is
    /// unset.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable output.
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

/// A named bundle of overrides.
///
/// Only the keys present in the preset are applied; everything else keeps
/// its current value.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SimPreset {
    /// Human-readable name shown in logs.
    #[serde(default = "default_preset_name")]
    pub display_name: String,
    /// Overrides `grid.seed`.
    #[serde(default)]
    pub seed: Option<u64>,
    /// Overrides `field.max_energy_per_cell`.
    #[serde(default)]
    pub max_energy_per_cell: Option<f64>,
    /// Overrides `field.initial_fill`.
    #[serde(default)]
    pub initial_fill: Option<f64>,
    /// Overrides `field.noise_scale`.
    #[serde(default)]
    pub noise_scale: Option<f64>,
    /// Overrides `field.noise_octaves`.
    #[serde(default)]
    pub noise_octaves: Option<u32>,
    /// Overrides `field.noise_persistence`.
    #[serde(default)]
    pub noise_persistence: Option<f64>,
    /// Overrides `field.regen_per_tick`.
    #[serde(default)]
    pub regen_per_tick: Option<f64>,
    /// Overrides `population.initial_agents`.
    #[serde(default)]
    pub initial_agents: Option<u32>,
    /// Overrides `run.ticks_per_second`.
    #[serde(default)]
    pub ticks_per_second: Option<f64>,
    /// Overrides `population.reproduction_enabled`.
    #[serde(default)]
    pub reproduction_enabled: Option<bool>,
    /// Overrides `population.reproduce_threshold`.
    #[serde(default)]
    pub reproduce_threshold: Option<f64>,
    /// Overrides `population.offspring_energy_fraction`.
    #[serde(default)]
    pub offspring_energy_fraction: Option<f64>,
    /// Overrides `population.max_agents`.
    #[serde(default)]
    pub max_agents: Option<u32>,
    /// Overrides `policy.kind`.
    #[serde(default)]
    pub policy: Option<PolicyKind>,
}

impl SimPreset {
    /// Write every present override into `config`.
    pub fn apply_to(&self, config: &mut SimulationConfig) {
        fn set<T: Copy>(slot: &mut T, value: Option<T>) {
            if let Some(v) = value {
                *slot = v;
            }
        }
        set(&mut config.grid.seed, self.seed);
        set(&mut config.field.max_energy_per_cell, self.max_energy_per_cell);
        set(&mut config.field.initial_fill, self.initial_fill);
        set(&mut config.field.noise_scale, self.noise_scale);
        set(&mut config.field.noise_octaves, self.noise_octaves);
        set(&mut config.field.noise_persistence, self.noise_persistence);
        set(&mut config.field.regen_per_tick, self.regen_per_tick);
        set(&mut config.population.initial_agents, self.initial_agents);
        set(&mut config.run.ticks_per_second, self.ticks_per_second);
        set(&mut config.population.reproduction_enabled, self.reproduction_enabled);
        set(&mut config.population.reproduce_threshold, self.reproduce_threshold);
        set(
            &mut config.population.offspring_energy_fraction,
            self.offspring_energy_fraction,
        );
        set(&mut config.population.max_agents, self.max_agents);
        set(&mut config.policy.kind, self.policy);
    }
}

// ---------------------------------------------------------------------------
// Default value functions
// ---------------------------------------------------------------------------

const fn default_true() -> bool {
    true
}

const fn default_one() -> f64 {
    1.0
}

const fn default_grid_dimension() -> u32 {
    32
}

const fn default_cell_size() -> f64 {
    1.0
}

const fn default_seed() -> u64 {
    12345
}

const fn default_max_energy_per_cell() -> f64 {
    10.0
}

const fn default_initial_fill() -> f64 {
    0.6
}

const fn default_noise_scale() -> f64 {
    0.25
}

const fn default_noise_octaves() -> u32 {
    1
}

const fn default_noise_persistence() -> f64 {
    0.5
}

const fn default_regen_per_tick() -> f64 {
    0.05
}

const fn default_initial_agents() -> u32 {
    1
}

const fn default_max_agents() -> u32 {
    200
}

const fn default_reproduce_threshold() -> f64 {
    8.0
}

const fn default_offspring_energy_fraction() -> f64 {
    0.4
}

const fn default_exploit_prob() -> f64 {
    0.85
}

const fn default_linger_threshold_frac() -> f64 {
    0.6
}

const fn default_explore_prob() -> f64 {
    0.1
}

const fn default_external_timeout_ms() -> u64 {
    50
}

const fn default_max_ticks_per_episode() -> u64 {
    2000
}

const fn default_ticks_per_second() -> f64 {
    5.0
}

fn default_log_level() -> String {
    String::from("info")
}

fn default_preset_name() -> String {
    String::from("Preset")
}

//! Episode clock for the EcoSim simulation.
//!
//! The clock tracks three counters: the tick within the current episode,
//! the episode index, and the total number of ticks advanced across all
//! episodes. The per-episode tick is the one policies, telemetry and the
//! episode cap see; the total is only used for run-level bookkeeping.
//!
//! All counters saturate at `u64::MAX` rather than wrap.

/// Tick and episode counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EpisodeClock {
    /// Tick within the current episode (0 right after a reset).
    tick: u64,

    /// Episode index (0-indexed).
    episode: u64,

    /// Ticks advanced since the engine was built, across resets.
    total_ticks: u64,
}

impl EpisodeClock {
    /// A clock at tick 0 of episode 0.
    pub const fn new() -> Self {
        Self {
            tick: 0,
            episode: 0,
            total_ticks: 0,
        }
    }

    /// Advance by one tick and return the new per-episode tick.
    pub const fn advance(&mut self) -> u64 {
        self.tick = self.tick.saturating_add(1);
        self.total_ticks = self.total_ticks.saturating_add(1);
        self.tick
    }

    /// Close the current episode: bump the episode index and rewind the
    /// per-episode tick to 0.
    pub const fn start_new_episode(&mut self) {
        self.episode = self.episode.saturating_add(1);
        self.tick = 0;
    }

    /// Whether the per-episode tick has reached `cap`. A cap of 0 never
    /// triggers.
    pub const fn reached(&self, cap: u64) -> bool {
        cap > 0 && self.tick >= cap
    }

    /// Tick within the current episode.
    pub const fn tick(&self) -> u64 {
        self.tick
    }

    /// Current episode index.
    pub const fn episode(&self) -> u64 {
        self.episode
    }

    /// Total ticks advanced across all episodes.
    pub const fn total_ticks(&self) -> u64 {
        self.total_ticks
    }
}

//! The regenerating resource field.
//!
//! Every cell holds a non-negative energy value capped at
//! `max_energy_per_cell`. The field is laid out once from seeded noise, then
//! mutated by agent harvests and deposits and by uniform regeneration at the
//! end of every tick. All mutations clamp, so the invariant
//! `0 <= energy <= max_energy_per_cell` holds for every cell at all times.
//!
//! Out-of-bounds cells have zero energy and reject every mutation.

use ecosim_types::Cell;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::WorldError;
use crate::grid::Grid;
use crate::noise::NoiseParams;

/// Parameters for generating and regenerating a [`ResourceField`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FieldParams {
    /// Per-cell energy cap.
    pub max_energy_per_cell: f64,
    /// Fraction of the cap the noise pattern is scaled to, in `[0, 1]`.
    pub initial_fill: f64,
    /// Shape of the initial noise pattern.
    pub noise: NoiseParams,
    /// Energy added to every cell per tick.
    pub regen_per_tick: f64,
}

impl Default for FieldParams {
    fn default() -> Self {
        Self {
            max_energy_per_cell: 10.0,
            initial_fill: 0.6,
            noise: NoiseParams::default(),
            regen_per_tick: 0.05,
        }
    }
}

impl FieldParams {
    /// Check that every parameter is in range.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::InvalidField`] naming the first offending
    /// parameter.
    pub fn validate(&self) -> Result<(), WorldError> {
        let bad = |reason: String| Err(WorldError::InvalidField { reason });
        if !self.max_energy_per_cell.is_finite() || self.max_energy_per_cell <= 0.0 {
            return bad(format!(
                "max_energy_per_cell must be positive, got {}",
                self.max_energy_per_cell
            ));
        }
        if !(0.0..=1.0).contains(&self.initial_fill) {
            return bad(format!("initial_fill must be in [0, 1], got {}", self.initial_fill));
        }
        if !self.noise.scale.is_finite() || self.noise.scale <= 0.0 {
            return bad(format!("noise scale must be positive, got {}", self.noise.scale));
        }
        if self.noise.octaves == 0 {
            return bad("noise octaves must be at least 1".to_owned());
        }
        if !(0.0..=1.0).contains(&self.noise.persistence) {
            return bad(format!(
                "noise persistence must be in [0, 1], got {}",
                self.noise.persistence
            ));
        }
        if !self.regen_per_tick.is_finite() || self.regen_per_tick < 0.0 {
            return bad(format!(
                "regen_per_tick must be non-negative, got {}",
                self.regen_per_tick
            ));
        }
        Ok(())
    }
}

/// Dense per-cell energy storage over a [`Grid`].
#[derive(Debug, Clone)]
pub struct ResourceField {
    grid: Grid,
    params: FieldParams,
    energy: Vec<f64>,
}

impl ResourceField {
    /// Lay out a new field over `grid` from seeded noise.
    ///
    /// Cell `(x, y)` starts at
    /// `initial_fill * noise(seed, x, y) * max_energy_per_cell`.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::InvalidField`] if `params` fails
    /// [`FieldParams::validate`].
    pub fn generate(grid: &Grid, params: FieldParams) -> Result<Self, WorldError> {
        params.validate()?;
        let mut field = Self {
            grid: grid.clone(),
            params,
            energy: vec![0.0; grid.cell_count()],
        };
        field.rebuild();
        Ok(field)
    }

    /// Recompute every cell from noise, discarding all harvests, deposits and
    /// regeneration since generation. The same grid seed gives the same
    /// layout.
    pub fn rebuild(&mut self) {
        let seed = self.grid.seed();
        let scale = self.params.initial_fill.clamp(0.0, 1.0) * self.params.max_energy_per_cell;
        for (i, slot) in self.energy.iter_mut().enumerate() {
            *slot = self.grid.cell_at(i).map_or(0.0, |c| {
                let n = self.params.noise.sample(seed, f64::from(c.x), f64::from(c.y));
                (n * scale).clamp(0.0, self.params.max_energy_per_cell)
            });
        }
        debug!(
            width = self.grid.width(),
            height = self.grid.height(),
            total = self.total_energy(),
            "Resource field laid out"
        );
    }

    /// The grid this field covers.
    pub const fn grid(&self) -> &Grid {
        &self.grid
    }

    /// The parameters the field was generated with.
    pub const fn params(&self) -> &FieldParams {
        &self.params
    }

    /// Per-cell energy cap.
    pub const fn max_energy_per_cell(&self) -> f64 {
        self.params.max_energy_per_cell
    }

    /// Raw per-cell energies in row-major order.
    pub fn energies(&self) -> &[f64] {
        &self.energy
    }

    /// Energy at `cell`; zero when out of bounds.
    pub fn energy(&self, cell: Cell) -> f64 {
        self.grid
            .index(cell)
            .and_then(|i| self.energy.get(i))
            .copied()
            .unwrap_or(0.0)
    }

    /// Remove up to `amount` energy from `cell`, returning what was taken.
    ///
    /// Returns 0 for a non-positive amount or an out-of-bounds cell.
    pub fn harvest(&mut self, cell: Cell, amount: f64) -> f64 {
        if amount.is_nan() || amount <= 0.0 {
            return 0.0;
        }
        let Some(slot) = self.slot_mut(cell) else {
            return 0.0;
        };
        let taken = amount.min(*slot);
        *slot = (*slot - taken).max(0.0);
        taken
    }

    /// Add up to `amount` energy to `cell`, returning what was accepted.
    ///
    /// The cell never exceeds the per-cell cap. Returns 0 for a non-positive
    /// amount or an out-of-bounds cell.
    pub fn deposit(&mut self, cell: Cell, amount: f64) -> f64 {
        if amount.is_nan() || amount <= 0.0 {
            return 0.0;
        }
        let cap = self.params.max_energy_per_cell;
        let Some(slot) = self.slot_mut(cell) else {
            return 0.0;
        };
        let added = amount.min(cap - *slot);
        if added <= 0.0 {
            return 0.0;
        }
        *slot = (*slot + added).min(cap);
        added
    }

    /// Add `amount_per_cell` to every cell in the Chebyshev square of
    /// `radius` around `center`, returning the total accepted.
    pub fn deposit_radius(&mut self, center: Cell, radius: u32, amount_per_cell: f64) -> f64 {
        let reach = radius.min(self.grid.width().max(self.grid.height()));
        let r = i32::try_from(reach).unwrap_or(i32::MAX);
        let mut total = 0.0;
        for dy in r.saturating_neg()..=r {
            for dx in r.saturating_neg()..=r {
                total += self.deposit(center.offset(dx, dy), amount_per_cell);
            }
        }
        total
    }

    /// Add `amount` (floored at zero) to every cell, capped per cell.
    pub fn regenerate(&mut self, amount: f64) {
        let amount = amount.max(0.0);
        if amount <= 0.0 {
            return;
        }
        let cap = self.params.max_energy_per_cell;
        for slot in &mut self.energy {
            *slot = (*slot + amount).min(cap);
        }
    }

    /// One tick of regeneration at the configured rate.
    pub fn regenerate_tick(&mut self) {
        self.regenerate(self.params.regen_per_tick);
    }

    /// Sum of energy over every cell.
    pub fn total_energy(&self) -> f64 {
        self.energy.iter().sum()
    }

    /// Total energy as a fraction of total capacity, in `[0, 1]`.
    pub fn mean_fill(&self) -> f64 {
        let cells = u32::try_from(self.energy.len()).unwrap_or(u32::MAX);
        let capacity = f64::from(cells) * self.params.max_energy_per_cell;
        if capacity > 0.0 {
            (self.total_energy() / capacity).clamp(0.0, 1.0)
        } else {
            0.0
        }
    }

    fn slot_mut(&mut self, cell: Cell) -> Option<&mut f64> {
        let i = self.grid.index(cell)?;
        self.energy.get_mut(i)
    }
}

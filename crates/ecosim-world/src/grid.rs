//! The rectangular cell grid agents move on.
//!
//! A [`Grid`] owns the immutable geometry of a run: its dimensions, the
//! world-space size of one cell, and the seed everything else is derived
//! from. Cells are addressed by [`Cell`] and stored row-major, so the flat
//! index of `(x, y)` is `y * width + x`.

use ecosim_types::{Action, Cell};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::WorldError;

/// Minimum number of cells along each axis.
pub const MIN_DIMENSION: u32 = 2;

/// A point on the world floor plane (`x` east, `z` north).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct WorldPoint {
    /// East coordinate.
    pub x: f64,
    /// North coordinate.
    pub z: f64,
}

impl WorldPoint {
    /// Create a point from its coordinates.
    pub const fn new(x: f64, z: f64) -> Self {
        Self { x, z }
    }
}

/// Geometry of the simulation grid.
#[derive(Debug, Clone, PartialEq)]
pub struct Grid {
    width: u32,
    height: u32,
    cell_size: f64,
    seed: u64,
}

impl Grid {
    /// Build a grid, validating its geometry.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::InvalidGrid`] if either dimension is below
    /// [`MIN_DIMENSION`] or does not fit an `i32` cell coordinate, or if
    /// `cell_size` is not a positive finite number.
    pub fn new(width: u32, height: u32, cell_size: f64, seed: u64) -> Result<Self, WorldError> {
        if width < MIN_DIMENSION || height < MIN_DIMENSION {
            return Err(WorldError::InvalidGrid {
                reason: format!(
                    "dimensions {width}x{height} are below the minimum of {MIN_DIMENSION}"
                ),
            });
        }
        if i32::try_from(width).is_err() || i32::try_from(height).is_err() {
            return Err(WorldError::InvalidGrid {
                reason: format!("dimensions {width}x{height} exceed the cell coordinate range"),
            });
        }
        if !cell_size.is_finite() || cell_size <= 0.0 {
            return Err(WorldError::InvalidGrid {
                reason: format!("cell size must be positive, got {cell_size}"),
            });
        }
        Ok(Self {
            width,
            height,
            cell_size,
            seed,
        })
    }

    /// Number of columns.
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Number of rows.
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// World-space edge length of one cell.
    pub const fn cell_size(&self) -> f64 {
        self.cell_size
    }

    /// Seed for field noise and agent randomness.
    pub const fn seed(&self) -> u64 {
        self.seed
    }

    /// Total number of cells.
    pub fn cell_count(&self) -> usize {
        let w = usize::try_from(self.width).unwrap_or(usize::MAX);
        let h = usize::try_from(self.height).unwrap_or(usize::MAX);
        w.saturating_mul(h)
    }

    /// Whether `cell` lies inside the grid.
    pub fn in_bounds(&self, cell: Cell) -> bool {
        cell.x >= 0
            && cell.y >= 0
            && i64::from(cell.x) < i64::from(self.width)
            && i64::from(cell.y) < i64::from(self.height)
    }

    /// Row-major index of `cell`, or `None` if it is out of bounds.
    pub fn index(&self, cell: Cell) -> Option<usize> {
        if !self.in_bounds(cell) {
            return None;
        }
        let x = usize::try_from(cell.x).ok()?;
        let y = usize::try_from(cell.y).ok()?;
        let w = usize::try_from(self.width).ok()?;
        y.checked_mul(w)?.checked_add(x)
    }

    /// Inverse of [`index`](Self::index).
    pub fn cell_at(&self, index: usize) -> Option<Cell> {
        if index >= self.cell_count() {
            return None;
        }
        let w = usize::try_from(self.width).ok()?;
        let x = i32::try_from(index.checked_rem(w)?).ok()?;
        let y = i32::try_from(index.checked_div(w)?).ok()?;
        Some(Cell::new(x, y))
    }

    /// Every cell in row-major order.
    pub fn cells(&self) -> impl Iterator<Item = Cell> + '_ {
        (0..self.cell_count()).filter_map(|i| self.cell_at(i))
    }

    /// World-space anchor of `cell` on the floor plane (`cell * cell_size`).
    pub fn cell_to_world(&self, cell: Cell) -> WorldPoint {
        WorldPoint {
            x: f64::from(cell.x) * self.cell_size,
            z: f64::from(cell.y) * self.cell_size,
        }
    }

    /// The cell containing a world-space point. The result may be out of
    /// bounds.
    #[allow(clippy::cast_possible_truncation)]
    pub fn world_to_cell(&self, point: WorldPoint) -> Cell {
        let to_axis = |v: f64| -> i32 {
            let f = (v / self.cell_size).floor();
            if f.is_nan() {
                0
            } else {
                // Clamped into range first, so the cast is exact.
                f.clamp(f64::from(i32::MIN), f64::from(i32::MAX)) as i32
            }
        };
        Cell::new(to_axis(point.x), to_axis(point.z))
    }

    /// A uniformly random in-bounds cell. Draws `x` first, then `y`.
    pub fn random_cell<R: Rng + ?Sized>(&self, rng: &mut R) -> Cell {
        let x = rng.random_range(0..self.width);
        let y = rng.random_range(0..self.height);
        Cell::new(
            i32::try_from(x).unwrap_or(0),
            i32::try_from(y).unwrap_or(0),
        )
    }

    /// In-bounds cells of the von Neumann neighborhood of `cell`.
    ///
    /// Order is self (when `include_self`), up, right, down, left; neighbors
    /// falling off the grid are skipped.
    pub fn cardinal_neighborhood(&self, cell: Cell, include_self: bool) -> Vec<Cell> {
        let mut out = Vec::with_capacity(5);
        if include_self && self.in_bounds(cell) {
            out.push(cell);
        }
        out.extend(
            Action::CARDINALS
                .iter()
                .map(|a| cell.step(*a))
                .filter(|c| self.in_bounds(*c)),
        );
        out
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;

    fn grid(w: u32, h: u32) -> Grid {
        Grid::new(w, h, 1.0, 12345).unwrap()
    }

    #[test]
    fn rejects_degenerate_geometry() {
        assert!(Grid::new(1, 10, 1.0, 0).is_err());
        assert!(Grid::new(10, 0, 1.0, 0).is_err());
        assert!(Grid::new(10, 10, 0.0, 0).is_err());
        assert!(Grid::new(10, 10, f64::NAN, 0).is_err());
        assert!(Grid::new(2, 2, 0.5, 0).is_ok());
    }

    #[test]
    fn bounds_on_edges() {
        let g = grid(4, 3);
        assert!(g.in_bounds(Cell::new(0, 0)));
        assert!(g.in_bounds(Cell::new(3, 2)));
        assert!(!g.in_bounds(Cell::new(4, 2)));
        assert!(!g.in_bounds(Cell::new(3, 3)));
        assert!(!g.in_bounds(Cell::new(-1, 0)));
    }

    #[test]
    fn index_is_row_major_and_invertible() {
        let g = grid(4, 3);
        assert_eq!(g.index(Cell::new(1, 2)), Some(9));
        assert_eq!(g.index(Cell::new(4, 0)), None);
        for i in 0..g.cell_count() {
            let c = g.cell_at(i).unwrap();
            assert_eq!(g.index(c), Some(i));
        }
        assert_eq!(g.cell_at(12), None);
        assert_eq!(g.cells().count(), 12);
    }

    #[test]
    fn world_mapping_round_trips_cells() {
        let g = Grid::new(8, 8, 2.0, 0).unwrap();
        let c = Cell::new(3, 5);
        let p = g.cell_to_world(c);
        assert!((p.x - 6.0).abs() < f64::EPSILON);
        assert!((p.z - 10.0).abs() < f64::EPSILON);
        assert_eq!(g.world_to_cell(p), c);
        assert_eq!(g.world_to_cell(WorldPoint::new(7.9, 11.5)), c);
        assert_eq!(g.world_to_cell(WorldPoint::new(-0.1, 0.0)), Cell::new(-1, 0));
    }

    #[test]
    fn neighborhood_skips_off_grid() {
        let g = grid(10, 10);
        let corner = g.cardinal_neighborhood(Cell::new(0, 0), true);
        assert_eq!(corner, vec![Cell::new(0, 0), Cell::new(0, 1), Cell::new(1, 0)]);
        let inner = g.cardinal_neighborhood(Cell::new(5, 5), false);
        assert_eq!(
            inner,
            vec![
                Cell::new(5, 6),
                Cell::new(6, 5),
                Cell::new(5, 4),
                Cell::new(4, 5)
            ]
        );
    }

    #[test]
    fn random_cells_stay_in_bounds() {
        let g = grid(5, 7);
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..500 {
            assert!(g.in_bounds(g.random_cell(&mut rng)));
        }
    }
}

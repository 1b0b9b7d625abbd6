//! Reproduction helpers: population cap and birth placement.
//!
//! Reproduction itself is an energy split on the parent
//! ([`Agent::try_split_for_offspring`](crate::Agent::try_split_for_offspring));
//! this module decides whether another birth fits under the cap and where
//! the newborn lands.

use ecosim_types::Cell;
use ecosim_world::{Grid, ResourceField};

/// Check whether another agent can be scheduled without reaching past the
/// population cap.
///
/// `current_population` is the live count, `scheduled` the births already
/// queued this tick.
pub const fn can_add_agent(current_population: u32, scheduled: u32, max_population: u32) -> bool {
    current_population.saturating_add(scheduled) < max_population
}

/// Pick the birth cell for an offspring of a parent standing on `parent`.
///
/// Scans the parent's cell, then up, right, down and left (in-bounds only)
/// and returns the richest by current field energy. Ties go to the first
/// cell scanned, so a flat or missing field always yields the parent's cell.
pub fn choose_birth_cell(grid: &Grid, field: Option<&ResourceField>, parent: Cell) -> Cell {
    let mut best = parent;
    let mut best_energy = f64::NEG_INFINITY;
    for cell in grid.cardinal_neighborhood(parent, true) {
        let e = field.map_or(0.0, |f| f.energy(cell));
        if e > best_energy {
            best_energy = e;
            best = cell;
        }
    }
    best
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use ecosim_world::FieldParams;

    use super::*;

    fn make_world() -> (Grid, ResourceField) {
        let grid = Grid::new(10, 10, 1.0, 1).unwrap();
        let field = ResourceField::generate(
            &grid,
            FieldParams {
                initial_fill: 0.0,
                ..FieldParams::default()
            },
        )
        .unwrap();
        (grid, field)
    }

    #[test]
    fn can_add_agent_below_cap() {
        assert!(can_add_agent(100, 0, 200));
        assert!(can_add_agent(100, 99, 200));
    }

    #[test]
    fn can_add_agent_at_cap() {
        assert!(!can_add_agent(200, 0, 200));
        assert!(!can_add_agent(150, 50, 200));
    }

    #[test]
    fn can_add_agent_above_cap() {
        assert!(!can_add_agent(201, 0, 200));
        assert!(!can_add_agent(u32::MAX, 1, 200));
    }

    #[test]
    fn birth_cell_prefers_richest_neighbor() {
        let (grid, mut field) = make_world();
        field.deposit(Cell::new(5, 4), 3.0);
        field.deposit(Cell::new(4, 5), 2.0);
        assert_eq!(choose_birth_cell(&grid, Some(&field), Cell::new(5, 5)), Cell::new(5, 4));
    }

    #[test]
    fn birth_cell_ties_go_to_first_scanned() {
        let (grid, mut field) = make_world();
        assert_eq!(choose_birth_cell(&grid, Some(&field), Cell::new(5, 5)), Cell::new(5, 5));
        field.deposit(Cell::new(6, 5), 1.0);
        field.deposit(Cell::new(5, 6), 1.0);
        // Up is scanned before right.
        assert_eq!(choose_birth_cell(&grid, Some(&field), Cell::new(5, 5)), Cell::new(5, 6));
    }

    #[test]
    fn birth_cell_without_field_is_parent_cell() {
        let (grid, _) = make_world();
        assert_eq!(choose_birth_cell(&grid, None, Cell::new(0, 9)), Cell::new(0, 9));
    }
}

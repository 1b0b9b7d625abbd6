//! Grid cell coordinates and discrete movement actions.
//!
//! The grid uses a right-handed layout on the floor plane: `x` grows to the
//! east ("right") and `y` grows to the north ("up"). Cells are stored as
//! signed integers so that neighbor offsets of edge cells can be expressed
//! and then rejected by a bounds check instead of wrapping.

use serde::{Deserialize, Serialize};

/// A cell coordinate on the simulation grid.
///
/// A `Cell` is not necessarily in bounds; callers check it against the grid
/// before using it to index anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Cell {
    /// Column, growing east.
    pub x: i32,
    /// Row, growing north.
    pub y: i32,
}

impl Cell {
    /// Create a cell from its coordinates.
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Return the cell displaced by `(dx, dy)`.
    ///
    /// Saturates at the `i32` range; a saturated cell is always out of
    /// bounds for any real grid.
    pub const fn offset(self, dx: i32, dy: i32) -> Self {
        Self {
            x: self.x.saturating_add(dx),
            y: self.y.saturating_add(dy),
        }
    }

    /// Return the neighbor reached by taking `action` from this cell.
    pub const fn step(self, action: Action) -> Self {
        let (dx, dy) = action.delta();
        self.offset(dx, dy)
    }

    /// Chebyshev (king-move) distance between two cells.
    pub const fn chebyshev(self, other: Self) -> u32 {
        let dx = self.x.abs_diff(other.x);
        let dy = self.y.abs_diff(other.y);
        if dx > dy { dx } else { dy }
    }
}

impl core::fmt::Display for Cell {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "({},{})", self.x, self.y)
    }
}

/// One of the five discrete actions an action policy may return.
///
/// The numeric index is part of the external contract: `0 = Stay`,
/// `1 = Up`, `2 = Right`, `3 = Down`, `4 = Left`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    /// Remain on the current cell.
    #[default]
    Stay,
    /// Move one cell north (`y + 1`).
    Up,
    /// Move one cell east (`x + 1`).
    Right,
    /// Move one cell south (`y - 1`).
    Down,
    /// Move one cell west (`x - 1`).
    Left,
}

impl Action {
    /// All actions in index order.
    pub const ALL: [Self; 5] = [Self::Stay, Self::Up, Self::Right, Self::Down, Self::Left];

    /// The four moving actions in scan order (up, right, down, left).
    pub const CARDINALS: [Self; 4] = [Self::Up, Self::Right, Self::Down, Self::Left];

    /// Decode an action index. Returns `None` outside `0..=4`.
    pub const fn from_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(Self::Stay),
            1 => Some(Self::Up),
            2 => Some(Self::Right),
            3 => Some(Self::Down),
            4 => Some(Self::Left),
            _ => None,
        }
    }

    /// Decode an arbitrary integer, clamping it into `0..=4` first.
    pub const fn clamped(raw: i64) -> Self {
        match raw {
            i64::MIN..=0 => Self::Stay,
            1 => Self::Up,
            2 => Self::Right,
            3 => Self::Down,
            _ => Self::Left,
        }
    }

    /// The numeric index of this action.
    pub const fn index(self) -> usize {
        match self {
            Self::Stay => 0,
            Self::Up => 1,
            Self::Right => 2,
            Self::Down => 3,
            Self::Left => 4,
        }
    }

    /// Cell displacement `(dx, dy)` for this action.
    pub const fn delta(self) -> (i32, i32) {
        match self {
            Self::Stay => (0, 0),
            Self::Up => (0, 1),
            Self::Right => (1, 0),
            Self::Down => (0, -1),
            Self::Left => (-1, 0),
        }
    }
}

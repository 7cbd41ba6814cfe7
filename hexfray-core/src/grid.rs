//! Hex battlefield geometry with offset coordinates
//!
//! Cells are addressed (row, col) on a rectangular odd-row-offset layout and
//! converted to axial coordinates for distance math.

use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};

/// A cell on the offset hex grid
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Cell {
    pub row: i32,
    pub col: i32,
}

impl Cell {
    pub const fn new(row: i32, col: i32) -> Self {
        Self { row, col }
    }

    /// Convert to axial coordinates: q = col - floor(row/2), r = row
    pub fn to_axial(self) -> (i32, i32) {
        (self.col - self.row.div_euclid(2), self.row)
    }

    /// Hex distance via the axial transform (cube distance)
    pub fn distance_to(self, other: Cell) -> i32 {
        let (q1, r1) = self.to_axial();
        let (q2, r2) = other.to_axial();
        let dq = (q1 - q2).abs();
        let dr = (r1 - r2).abs();
        let ds = ((q1 + r1) - (q2 + r2)).abs();
        (dq + dr + ds) / 2
    }
}

/// Rectangular battlefield bounds
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grid {
    pub rows: i32,
    pub cols: i32,
}

impl Grid {
    pub const fn new(rows: i32, cols: i32) -> Self {
        Self { rows, cols }
    }

    /// Check if a cell is on the battlefield
    pub fn in_bounds(&self, cell: Cell) -> bool {
        cell.row >= 0 && cell.row < self.rows && cell.col >= 0 && cell.col < self.cols
    }

    /// Iterate all cells in row-major order
    pub fn cells(&self) -> impl Iterator<Item = Cell> + '_ {
        let cols = self.cols;
        (0..self.rows).flat_map(move |row| (0..cols).map(move |col| Cell::new(row, col)))
    }

    /// Every in-bounds cell within `range` hexes of `origin`, excluding the
    /// origin itself and any blocked cell, paired with its distance.
    ///
    /// This is a pure distance threshold over the whole board, not a path
    /// search: intervening cells are never checked, only the destination.
    /// Scan order is row-major.
    pub fn reachable_cells(
        &self,
        origin: Cell,
        range: i32,
        blocked: &FxHashSet<Cell>,
    ) -> Vec<(Cell, i32)> {
        let mut out = Vec::new();
        for cell in self.cells() {
            if cell == origin || blocked.contains(&cell) {
                continue;
            }
            let dist = origin.distance_to(cell);
            if dist <= range {
                out.push((cell, dist));
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::prelude::*;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_axial_transform() {
        assert_eq!(Cell::new(0, 0).to_axial(), (0, 0));
        assert_eq!(Cell::new(1, 0).to_axial(), (0, 1));
        assert_eq!(Cell::new(2, 3).to_axial(), (2, 2));
        assert_eq!(Cell::new(3, 3).to_axial(), (2, 3));
    }

    #[test]
    fn test_distance_basics() {
        let a = Cell::new(2, 2);
        assert_eq!(a.distance_to(a), 0);
        // Same row, adjacent columns
        assert_eq!(a.distance_to(Cell::new(2, 3)), 1);
        // Row neighbors on an even row
        assert_eq!(a.distance_to(Cell::new(1, 2)), 1);
        assert_eq!(a.distance_to(Cell::new(3, 2)), 1);
        assert_eq!(a.distance_to(Cell::new(2, 4)), 2);
    }

    #[test]
    fn test_distance_symmetry_and_triangle() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        for _ in 0..20 {
            let a = Cell::new(rng.gen_range(0..10), rng.gen_range(0..10));
            let b = Cell::new(rng.gen_range(0..10), rng.gen_range(0..10));
            let c = Cell::new(rng.gen_range(0..10), rng.gen_range(0..10));
            assert_eq!(a.distance_to(b), b.distance_to(a));
            assert_eq!(a.distance_to(b) == 0, a == b);
            assert!(a.distance_to(c) <= a.distance_to(b) + b.distance_to(c));
        }
    }

    #[test]
    fn test_reachable_excludes_origin_and_blocked() {
        let grid = Grid::new(5, 5);
        let origin = Cell::new(2, 2);
        let mut blocked = FxHashSet::default();
        blocked.insert(Cell::new(2, 3));

        let cells = grid.reachable_cells(origin, 2, &blocked);
        assert!(!cells.iter().any(|&(c, _)| c == origin));
        assert!(!cells.iter().any(|&(c, _)| c == Cell::new(2, 3)));
        for &(c, d) in &cells {
            assert!(grid.in_bounds(c));
            assert_eq!(origin.distance_to(c), d);
            assert!(d <= 2);
        }
    }

    #[test]
    fn test_reachable_ignores_intervening_occupancy() {
        // A destination beyond an occupied cell is still reachable as long as
        // its own distance qualifies.
        let grid = Grid::new(1, 5);
        let mut blocked = FxHashSet::default();
        blocked.insert(Cell::new(0, 1));

        let cells = grid.reachable_cells(Cell::new(0, 0), 2, &blocked);
        assert!(cells.contains(&(Cell::new(0, 2), 2)));
    }

    #[test]
    fn test_reachable_row_major_order() {
        let grid = Grid::new(3, 3);
        let cells = grid.reachable_cells(Cell::new(1, 1), 4, &FxHashSet::default());
        for pair in cells.windows(2) {
            let (a, b) = (pair[0].0, pair[1].0);
            assert!((a.row, a.col) < (b.row, b.col));
        }
    }
}

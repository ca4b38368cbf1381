//! Arena geometry: the 18x32 cell grid, continuous positions, and the
//! static obstacle set.
//!
//! Cells are integer `(col, row)` pairs with `0 <= col < 18` and
//! `0 <= row < 32`. Entity positions are continuous `(x, y)` with the cell
//! `(c, r)` covering `[c, c+1) x [r, r+1)`; a spawned entity sits on the
//! cell center `(c + 0.5, r + 0.5)`.
//!
//! The static obstacles are the river (rows 15-16 minus the two bridge
//! strips) plus the footprints of the six towers. They never change after
//! [`build_obstacles`] and block both placement and troop steering.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Grid width in cells.
pub const GRID_COLS: i32 = 18;
/// Grid height in cells.
pub const GRID_ROWS: i32 = 32;

/// Rows covered by the river.
const RIVER_ROWS: [i32; 2] = [15, 16];
/// Column ranges (inclusive) left open as bridges across the river.
const BRIDGES: [(i32, i32); 2] = [(2, 4), (13, 15)];

// ---------------------------------------------------------------------------
// Cell
// ---------------------------------------------------------------------------

/// An integer grid cell. Ordered `(col, row)` so obstacle sets serialize
/// in a stable order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Cell {
    /// Column, `0..18`.
    pub col: i32,
    /// Row, `0..32`.
    pub row: i32,
}

impl Cell {
    /// Construct a cell. No bounds check; see [`Cell::in_bounds`].
    pub fn new(col: i32, row: i32) -> Self {
        Self { col, row }
    }

    /// Whether the cell lies inside the grid.
    pub fn in_bounds(self) -> bool {
        (0..GRID_COLS).contains(&self.col) && (0..GRID_ROWS).contains(&self.row)
    }

    /// The continuous center of this cell.
    pub fn center(self) -> Vec2 {
        Vec2::new(self.col as f64 + 0.5, self.row as f64 + 0.5)
    }
}

// ---------------------------------------------------------------------------
// Vec2
// ---------------------------------------------------------------------------

/// A continuous position (or displacement) on the arena plane.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f64,
    pub y: f64,
}

impl Vec2 {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point.
    pub fn distance_to(self, other: Vec2) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    /// The grid cell containing this position.
    pub fn cell(self) -> Cell {
        Cell::new(self.x.floor() as i32, self.y.floor() as i32)
    }
}

// ---------------------------------------------------------------------------
// Tower footprints
// ---------------------------------------------------------------------------

/// Inclusive cell rectangle, used for tower footprints.
#[derive(Debug, Clone, Copy)]
pub struct Footprint {
    pub col_min: i32,
    pub col_max: i32,
    pub row_min: i32,
    pub row_max: i32,
}

impl Footprint {
    /// The continuous center of the footprint (a tower's position).
    pub fn center(self) -> Vec2 {
        Vec2::new(
            (self.col_min + self.col_max + 1) as f64 / 2.0,
            (self.row_min + self.row_max + 1) as f64 / 2.0,
        )
    }

    fn cells(self) -> impl Iterator<Item = Cell> {
        let (c0, c1, r0, r1) = (self.col_min, self.col_max, self.row_min, self.row_max);
        (c0..=c1).flat_map(move |col| (r0..=r1).map(move |row| Cell::new(col, row)))
    }
}

const fn footprint(col_min: i32, col_max: i32, row_min: i32, row_max: i32) -> Footprint {
    Footprint {
        col_min,
        col_max,
        row_min,
        row_max,
    }
}

/// Central (king) tower footprints, north side then south side.
pub const CENTRAL_FOOTPRINTS: [Footprint; 2] =
    [footprint(7, 10, 1, 4), footprint(7, 10, 27, 30)];

/// Lateral (princess) tower footprints: north-west, north-east,
/// south-west, south-east.
pub const LATERAL_FOOTPRINTS: [Footprint; 4] = [
    footprint(2, 4, 5, 7),
    footprint(13, 15, 5, 7),
    footprint(2, 4, 24, 26),
    footprint(13, 15, 24, 26),
];

// ---------------------------------------------------------------------------
// Obstacles
// ---------------------------------------------------------------------------

/// Whether `col` falls on one of the bridge strips.
fn on_bridge(col: i32) -> bool {
    BRIDGES.iter().any(|&(lo, hi)| (lo..=hi).contains(&col))
}

/// Build the full static obstacle set: river cells (minus bridges) plus
/// every tower footprint cell.
pub fn build_obstacles() -> BTreeSet<Cell> {
    let mut blocked = BTreeSet::new();

    for row in RIVER_ROWS {
        for col in 0..GRID_COLS {
            if !on_bridge(col) {
                blocked.insert(Cell::new(col, row));
            }
        }
    }

    for fp in CENTRAL_FOOTPRINTS.iter().chain(LATERAL_FOOTPRINTS.iter()) {
        blocked.extend(fp.cells());
    }

    blocked
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

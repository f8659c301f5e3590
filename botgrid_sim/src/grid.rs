use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::tile::{Color, Tile};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Cell {
    pub row: usize,
    pub col: usize,
}

impl Cell {
    pub fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }

    /// Neighbouring cell one step in `facing`, if it does not underflow.
    pub fn step(self, facing: Facing) -> Option<Cell> {
        let (dr, dc) = facing.delta();
        let row = self.row.checked_add_signed(dr)?;
        let col = self.col.checked_add_signed(dc)?;
        Some(Cell { row, col })
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

/// Cardinal direction. Indices follow the level files: 0 up, 1 left,
/// 2 down, 3 right; turning left walks the index upward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Facing {
    Up,
    Left,
    Down,
    Right,
}

impl Facing {
    const ORDER: [Facing; 4] = [Facing::Up, Facing::Left, Facing::Down, Facing::Right];

    pub fn from_index(index: u8) -> Option<Self> {
        Self::ORDER.get(usize::from(index)).copied()
    }

    pub fn index(self) -> u8 {
        match self {
            Facing::Up => 0,
            Facing::Left => 1,
            Facing::Down => 2,
            Facing::Right => 3,
        }
    }

    pub fn turned_left(self) -> Self {
        Self::ORDER[usize::from((self.index() + 1) % 4)]
    }

    pub fn turned_right(self) -> Self {
        Self::ORDER[usize::from((self.index() + 3) % 4)]
    }

    pub fn reversed(self) -> Self {
        Self::ORDER[usize::from((self.index() + 2) % 4)]
    }

    fn delta(self) -> (isize, isize) {
        match self {
            Facing::Up => (-1, 0),
            Facing::Left => (0, -1),
            Facing::Down => (1, 0),
            Facing::Right => (0, 1),
        }
    }
}

impl fmt::Display for Facing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Facing::Up => "up",
            Facing::Left => "left",
            Facing::Down => "down",
            Facing::Right => "right",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LayoutError {
    #[error("layout has no tiles")]
    Empty,
    #[error("row {row} has {found} tiles, expected {expected}")]
    Ragged {
        row: usize,
        expected: usize,
        found: usize,
    },
    #[error("start cell {start} lies outside the {rows}x{cols} board")]
    StartOutOfBounds { start: Cell, rows: usize, cols: usize },
}

/// Immutable level board plus the actuator's starting pose and par.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    rows: usize,
    cols: usize,
    tiles: Vec<Tile>,
    start: Cell,
    facing: Facing,
    par: u32,
}

impl Layout {
    pub fn new(
        board: Vec<Vec<Tile>>,
        start: Cell,
        facing: Facing,
        par: u32,
    ) -> Result<Self, LayoutError> {
        let rows = board.len();
        let cols = board.first().map(Vec::len).unwrap_or(0);
        if rows == 0 || cols == 0 {
            return Err(LayoutError::Empty);
        }
        let mut tiles = Vec::with_capacity(rows * cols);
        for (row, line) in board.into_iter().enumerate() {
            if line.len() != cols {
                return Err(LayoutError::Ragged {
                    row,
                    expected: cols,
                    found: line.len(),
                });
            }
            tiles.extend(line);
        }
        if start.row >= rows || start.col >= cols {
            return Err(LayoutError::StartOutOfBounds { start, rows, cols });
        }
        Ok(Self {
            rows,
            cols,
            tiles,
            start,
            facing,
            par,
        })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn start(&self) -> Cell {
        self.start
    }

    pub fn start_facing(&self) -> Facing {
        self.facing
    }

    pub fn par(&self) -> u32 {
        self.par
    }

    pub fn tile(&self, row: usize, col: usize) -> Tile {
        assert!(
            row < self.rows && col < self.cols,
            "tile ({row}, {col}) outside {}x{} layout",
            self.rows,
            self.cols
        );
        self.tiles[row * self.cols + col]
    }
}

/// Live board for one attempt. The pristine layout is shared; only the
/// overlay of collected keys and opened gates is owned.
#[derive(Debug, Clone)]
pub struct Grid {
    layout: Arc<Layout>,
    live: Vec<Tile>,
}

impl Grid {
    pub fn new(layout: Arc<Layout>) -> Self {
        let live = layout.tiles.clone();
        Self { layout, live }
    }

    pub fn layout(&self) -> &Arc<Layout> {
        &self.layout
    }

    pub fn rows(&self) -> usize {
        self.layout.rows
    }

    pub fn cols(&self) -> usize {
        self.layout.cols
    }

    /// Panics when the cell is off the board.
    pub fn get(&self, row: usize, col: usize) -> Tile {
        assert!(
            row < self.rows() && col < self.cols(),
            "grid read ({row}, {col}) outside {}x{} board",
            self.rows(),
            self.cols()
        );
        self.live[row * self.cols() + col]
    }

    pub fn try_get(&self, cell: Cell) -> Option<Tile> {
        if cell.row < self.rows() && cell.col < self.cols() {
            Some(self.live[cell.row * self.cols() + cell.col])
        } else {
            None
        }
    }

    pub fn reset(&mut self) {
        self.live.copy_from_slice(&self.layout.tiles);
    }

    pub fn is_pristine(&self) -> bool {
        self.live == self.layout.tiles
    }

    /// Blanks the key at `at` and every gate of the same color.
    pub fn collect_key(&mut self, color: Color, at: Cell) {
        let cols = self.cols();
        self.live[at.row * cols + at.col] = Tile::Blank;
        for tile in self.live.iter_mut() {
            if tile.gate_color() == Some(color) {
                *tile = Tile::Blank;
            }
        }
        log::trace!("collected {color} key at {at}");
    }

    pub fn to_codes(&self) -> Vec<Vec<u8>> {
        self.live
            .chunks(self.cols())
            .map(|row| row.iter().map(|tile| tile.code()).collect())
            .collect()
    }
}

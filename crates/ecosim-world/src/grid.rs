//! Dense row-major cell grid and the Moore neighborhood resolver.

use ecosim_core::{Cell, CellKind, Census, Position};
use serde::{Deserialize, Serialize};

/// Row/column offsets of the Moore neighborhood in scan order
const MOORE_OFFSETS: [(isize, isize); 8] = [
    (-1, -1),
    (-1, 0),
    (-1, 1),
    (0, -1),
    (0, 1),
    (1, -1),
    (1, 0),
    (1, 1),
];

/// Up to eight in-bounds neighbors of a cell, stored inline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Neighborhood {
    positions: [Position; 8],
    len: usize,
}

impl Neighborhood {
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn as_slice(&self) -> &[Position] {
        &self.positions[..self.len]
    }

    pub fn as_mut_slice(&mut self) -> &mut [Position] {
        &mut self.positions[..self.len]
    }

    pub fn iter(&self) -> impl Iterator<Item = Position> + '_ {
        self.as_slice().iter().copied()
    }
}

/// Bounded Moore neighborhood of `center`, excluding the center itself.
///
/// Order is row-major over the offsets (-1,-1) .. (1,1).
pub fn moore_neighborhood(center: Position, rows: usize, cols: usize) -> Neighborhood {
    let mut neighborhood = Neighborhood {
        positions: [Position::default(); 8],
        len: 0,
    };
    for (d_row, d_col) in MOORE_OFFSETS {
        if let Some(pos) = center.offset(d_row, d_col, rows, cols) {
            neighborhood.positions[neighborhood.len] = pos;
            neighborhood.len += 1;
        }
    }
    neighborhood
}

/// A bounded 2D grid of cells
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Grid {
    rows: usize,
    cols: usize,
    cells: Vec<Cell>,
}

impl Grid {
    /// An all-empty grid
    pub fn new(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            cells: vec![Cell::empty(); rows * cols],
        }
    }

    /// Wrap an existing row-major buffer
    ///
    /// Panics if the buffer length is not `rows * cols`.
    pub fn from_cells(rows: usize, cols: usize, cells: Vec<Cell>) -> Self {
        assert_eq!(cells.len(), rows * cols, "cell buffer does not match {rows}x{cols}");
        Self { rows, cols, cells }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn contains(&self, pos: Position) -> bool {
        pos.row < self.rows && pos.col < self.cols
    }

    pub fn get(&self, pos: Position) -> Cell {
        self.cells[self.index_of(pos)]
    }

    pub fn set(&mut self, pos: Position, cell: Cell) {
        let index = self.index_of(pos);
        self.cells[index] = cell;
    }

    pub fn kind(&self, pos: Position) -> CellKind {
        self.get(pos).kind
    }

    pub fn index_of(&self, pos: Position) -> usize {
        assert!(self.contains(pos), "{pos} is outside {}x{}", self.rows, self.cols);
        pos.index(self.cols)
    }

    pub fn neighbors(&self, pos: Position) -> Neighborhood {
        moore_neighborhood(pos, self.rows, self.cols)
    }

    /// Number of Moore neighbors holding a plant
    pub fn plant_neighbors(&self, pos: Position) -> usize {
        self.neighbors(pos)
            .iter()
            .filter(|&n| self.kind(n) == CellKind::Plant)
            .count()
    }

    /// Cells of one row
    pub fn row(&self, row: usize) -> &[Cell] {
        &self.cells[row * self.cols..(row + 1) * self.cols]
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    pub fn into_cells(self) -> Vec<Cell> {
        self.cells
    }

    pub fn census(&self) -> Census {
        Census::from_cells(&self.cells)
    }

    /// Render using the initial-state file encoding, one row per line
    pub fn to_text(&self) -> String {
        let mut out = String::with_capacity(self.cells.len() * 2);
        for row in 0..self.rows {
            let line: Vec<String> = self
                .row(row)
                .iter()
                .map(|cell| cell.kind.code().to_string())
                .collect();
            out.push_str(&line.join(" "));
            out.push('\n');
        }
        out
    }
}

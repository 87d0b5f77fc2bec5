//! Core type definitions for the ecosystem.

use serde::{Deserialize, Serialize};
use std::fmt;

/// What occupies a grid cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CellKind {
    #[default]
    Empty,
    Plant,
    Herbivore,
    Carnivore,
    Omnivore,
}

impl CellKind {
    /// Decode the integer used in initial-state files.
    ///
    /// Anything outside `0..=4` decodes to `Empty`.
    pub fn from_code(code: i64) -> Self {
        match code {
            1 => CellKind::Plant,
            2 => CellKind::Herbivore,
            3 => CellKind::Carnivore,
            4 => CellKind::Omnivore,
            _ => CellKind::Empty,
        }
    }

    pub fn code(&self) -> u8 {
        match self {
            CellKind::Empty => 0,
            CellKind::Plant => 1,
            CellKind::Herbivore => 2,
            CellKind::Carnivore => 3,
            CellKind::Omnivore => 4,
        }
    }

    pub fn is_animal(&self) -> bool {
        matches!(
            self,
            CellKind::Herbivore | CellKind::Carnivore | CellKind::Omnivore
        )
    }

    pub fn animals() -> [CellKind; 3] {
        [CellKind::Herbivore, CellKind::Carnivore, CellKind::Omnivore]
    }
}

impl fmt::Display for CellKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CellKind::Empty => "empty",
            CellKind::Plant => "plant",
            CellKind::Herbivore => "herbivore",
            CellKind::Carnivore => "carnivore",
            CellKind::Omnivore => "omnivore",
        };
        f.write_str(name)
    }
}

/// Cell state. Energy is only meaningful for animals and is zero otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct Cell {
    pub kind: CellKind,
    pub energy: i32,
}

impl Cell {
    pub const EMPTY: Cell = Cell {
        kind: CellKind::Empty,
        energy: 0,
    };

    pub const PLANT: Cell = Cell {
        kind: CellKind::Plant,
        energy: 0,
    };

    pub fn empty() -> Self {
        Self::EMPTY
    }

    pub fn plant() -> Self {
        Self::PLANT
    }

    pub fn animal(kind: CellKind, energy: i32) -> Self {
        debug_assert!(kind.is_animal(), "{kind} is not an animal");
        Self { kind, energy }
    }

    pub fn is_empty(&self) -> bool {
        self.kind == CellKind::Empty
    }

    pub fn is_plant(&self) -> bool {
        self.kind == CellKind::Plant
    }

    pub fn is_animal(&self) -> bool {
        self.kind.is_animal()
    }

    /// Pack into a single word for lock-free storage.
    ///
    /// Layout: kind code in bits 32..40, energy bit pattern in bits 0..32.
    pub fn to_bits(self) -> u64 {
        ((self.kind.code() as u64) << 32) | (self.energy as u32 as u64)
    }

    pub fn from_bits(bits: u64) -> Self {
        Self {
            kind: CellKind::from_code(((bits >> 32) & 0xff) as i64),
            energy: bits as u32 as i32,
        }
    }
}

/// Weather condition over a single cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum WeatherCondition {
    #[default]
    Normal,
    Rain,
    Drought,
}

/// Local weather: a condition and the generations it has left
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct Weather {
    pub condition: WeatherCondition,
    pub remaining: i32,
}

impl Weather {
    pub fn new(condition: WeatherCondition, remaining: i32) -> Self {
        Self {
            condition,
            remaining,
        }
    }
}

/// Row/column position inside a bounded grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
pub struct Position {
    pub row: usize,
    pub col: usize,
}

impl Position {
    pub fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }

    /// Row-major index for a grid with `cols` columns
    pub fn index(&self, cols: usize) -> usize {
        self.row * cols + self.col
    }

    pub fn from_index(index: usize, cols: usize) -> Self {
        Self {
            row: index / cols,
            col: index % cols,
        }
    }

    /// Offset by a signed delta, or `None` when it leaves `[0,rows) x [0,cols)`
    pub fn offset(&self, d_row: isize, d_col: isize, rows: usize, cols: usize) -> Option<Self> {
        let row = self.row.checked_add_signed(d_row)?;
        let col = self.col.checked_add_signed(d_col)?;
        (row < rows && col < cols).then_some(Self { row, col })
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_codes() {
        for code in 0..=4 {
            assert_eq!(CellKind::from_code(code).code() as i64, code);
        }
        assert_eq!(CellKind::from_code(5), CellKind::Empty);
        assert_eq!(CellKind::from_code(-1), CellKind::Empty);
    }

    #[test]
    fn test_is_animal() {
        assert!(!CellKind::Empty.is_animal());
        assert!(!CellKind::Plant.is_animal());
        for kind in CellKind::animals() {
            assert!(kind.is_animal());
        }
    }

    #[test]
    fn test_cell_bits_keep_negative_energy() {
        let cell = Cell::animal(CellKind::Carnivore, -3);
        assert_eq!(Cell::from_bits(cell.to_bits()), cell);

        let cell = Cell::animal(CellKind::Omnivore, i32::MAX);
        assert_eq!(Cell::from_bits(cell.to_bits()), cell);

        assert_eq!(Cell::from_bits(Cell::EMPTY.to_bits()), Cell::EMPTY);
    }

    #[test]
    fn test_position_offset() {
        let pos = Position::new(0, 0);
        assert_eq!(pos.offset(-1, 0, 3, 3), None);
        assert_eq!(pos.offset(1, 1, 3, 3), Some(Position::new(1, 1)));

        let pos = Position::new(2, 2);
        assert_eq!(pos.offset(1, 0, 3, 3), None);
        assert_eq!(pos.offset(0, 1, 3, 3), None);
    }

    #[test]
    fn test_position_index_round_trip() {
        let pos = Position::new(3, 7);
        assert_eq!(pos.index(10), 37);
        assert_eq!(Position::from_index(37, 10), pos);
    }
}

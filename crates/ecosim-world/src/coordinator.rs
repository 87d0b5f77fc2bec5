//! Shared-state plumbing for concurrent generations.
//!
//! Every phase is a map over contiguous row ranges. Only the animal behavior
//! phase writes cells it does not own; those writes go through a
//! [`CellWriter`], which serializes them per destination with a fixed table of
//! shard locks (or with plain atomics when no table is configured). A lock is
//! held for exactly one cell write and never nested, so the scheme cannot
//! deadlock.

use crate::grid::Grid;
use ecosim_core::{Cell, Position};
use parking_lot::Mutex;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::fmt;
use std::ops::Range;
use std::sync::atomic::{AtomicU64, Ordering};

const RNG_GENERATION_MIX: u64 = 0x9E37_79B9_7F4A_7C15;
const RNG_PHASE_MIX: u64 = 0xD6E8_FF3A_5A9C_31F1;
const RNG_WORKER_MIX: u64 = 0xBF58_476D_1CE4_E5B9;

/// Ordered phases of one generation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    WeatherAdvance,
    PlantLifecycle,
    EnvironmentalModifier,
    AnimalBehavior,
    MortalityCleanup,
    Commit,
}

impl Phase {
    pub const ORDER: [Phase; 6] = [
        Phase::WeatherAdvance,
        Phase::PlantLifecycle,
        Phase::EnvironmentalModifier,
        Phase::AnimalBehavior,
        Phase::MortalityCleanup,
        Phase::Commit,
    ];

    fn tag(&self) -> u64 {
        *self as u64 + 1
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::WeatherAdvance => "weather_advance",
            Phase::PlantLifecycle => "plant_lifecycle",
            Phase::EnvironmentalModifier => "environmental_modifier",
            Phase::AnimalBehavior => "animal_behavior",
            Phase::MortalityCleanup => "mortality_cleanup",
            Phase::Commit => "commit",
        };
        f.write_str(name)
    }
}

/// Half-open range of grid rows handled by one worker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowRange {
    pub start: usize,
    pub end: usize,
}

impl RowRange {
    pub fn rows(&self) -> Range<usize> {
        self.start..self.end
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    /// Every position in the range, row-major
    pub fn positions(&self, cols: usize) -> impl Iterator<Item = Position> {
        self.rows()
            .flat_map(move |row| (0..cols).map(move |col| Position::new(row, col)))
    }
}

/// Split `[0, rows)` into at most `workers` contiguous, non-empty chunks of
/// `ceil(rows / workers)` rows each
pub fn partition_rows(rows: usize, workers: usize) -> Vec<RowRange> {
    if rows == 0 {
        return Vec::new();
    }
    let workers = workers.max(1);
    let chunk = rows.div_ceil(workers);
    (0..workers)
        .map(|w| RowRange {
            start: (w * chunk).min(rows),
            end: ((w + 1) * chunk).min(rows),
        })
        .filter(|range| !range.is_empty())
        .collect()
}

fn mix_u64(mut value: u64) -> u64 {
    value ^= value >> 30;
    value = value.wrapping_mul(0xBF58_476D_1CE4_E5B9);
    value ^= value >> 27;
    value = value.wrapping_mul(0x94D0_49BB_1331_11EB);
    value ^= value >> 31;
    value
}

/// Seed for the random stream of one worker in one phase of one generation
pub fn worker_seed(base: u64, generation: u64, phase: Phase, worker: usize) -> u64 {
    mix_u64(
        base ^ generation.wrapping_mul(RNG_GENERATION_MIX)
            ^ phase.tag().wrapping_mul(RNG_PHASE_MIX)
            ^ (worker as u64 + 1).wrapping_mul(RNG_WORKER_MIX),
    )
}

pub fn worker_rng(base: u64, generation: u64, phase: Phase, worker: usize) -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(worker_seed(base, generation, phase, worker))
}

/// Fixed table of mutexes; a cell maps to `index mod len`
pub struct ShardLocks {
    locks: Vec<Mutex<()>>,
}

impl ShardLocks {
    pub fn new(count: usize) -> Self {
        Self {
            locks: (0..count.max(1)).map(|_| Mutex::new(())).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }

    pub fn shard_of(&self, cell_index: usize) -> usize {
        cell_index % self.locks.len()
    }

    /// Run `f` while holding the shard lock for `cell_index`
    pub fn with_lock<T>(&self, cell_index: usize, f: impl FnOnce() -> T) -> T {
        let _guard = self.locks[self.shard_of(cell_index)].lock();
        f()
    }
}

impl fmt::Debug for ShardLocks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShardLocks").field("len", &self.len()).finish()
    }
}

/// One bit per cell: animals already handled this generation
#[derive(Debug)]
pub struct VisitedSet {
    words: Vec<AtomicU64>,
    len: usize,
}

impl VisitedSet {
    pub fn new(len: usize) -> Self {
        Self {
            words: (0..len.div_ceil(64)).map(|_| AtomicU64::new(0)).collect(),
            len,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn clear(&mut self) {
        for word in &mut self.words {
            *word.get_mut() = 0;
        }
    }

    /// Set the bit, returning `true` if this call was the one that set it
    pub fn mark(&self, index: usize) -> bool {
        let bit = 1u64 << (index % 64);
        let previous = self.words[index / 64].fetch_or(bit, Ordering::AcqRel);
        previous & bit == 0
    }

    pub fn contains(&self, index: usize) -> bool {
        let bit = 1u64 << (index % 64);
        self.words[index / 64].load(Ordering::Acquire) & bit != 0
    }

    pub fn count(&self) -> usize {
        self.words
            .iter()
            .map(|w| w.load(Ordering::Acquire).count_ones() as usize)
            .sum()
    }
}

/// The next-generation buffer while it is write-shared between workers
pub struct NextGrid {
    rows: usize,
    cols: usize,
    cells: Vec<AtomicU64>,
}

impl NextGrid {
    pub fn from_grid(grid: Grid) -> Self {
        let (rows, cols) = (grid.rows(), grid.cols());
        let cells = grid
            .into_cells()
            .into_iter()
            .map(|cell| AtomicU64::new(cell.to_bits()))
            .collect();
        Self { rows, cols, cells }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn load(&self, pos: Position) -> Cell {
        Cell::from_bits(self.cells[pos.index(self.cols)].load(Ordering::Acquire))
    }

    fn store(&self, index: usize, cell: Cell) {
        self.cells[index].store(cell.to_bits(), Ordering::Release);
    }

    fn compare_exchange(&self, index: usize, expected: Cell, new: Cell) -> bool {
        self.cells[index]
            .compare_exchange(
                expected.to_bits(),
                new.to_bits(),
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
    }

    pub fn into_grid(self) -> Grid {
        let cells = self
            .cells
            .into_iter()
            .map(|bits| Cell::from_bits(bits.into_inner()))
            .collect();
        Grid::from_cells(self.rows, self.cols, cells)
    }
}

impl fmt::Debug for NextGrid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NextGrid")
            .field("rows", &self.rows)
            .field("cols", &self.cols)
            .finish()
    }
}

/// Write handle for the behavior phase
#[derive(Debug, Clone, Copy)]
pub struct CellWriter<'a> {
    next: &'a NextGrid,
    locks: Option<&'a ShardLocks>,
}

impl<'a> CellWriter<'a> {
    pub fn new(next: &'a NextGrid, locks: Option<&'a ShardLocks>) -> Self {
        Self { next, locks }
    }

    pub fn read(&self, pos: Position) -> Cell {
        self.next.load(pos)
    }

    /// Unconditional write; the last writer wins
    pub fn write(&self, pos: Position, cell: Cell) {
        let index = pos.index(self.next.cols);
        match self.locks {
            Some(locks) => locks.with_lock(index, || self.next.store(index, cell)),
            None => self.next.store(index, cell),
        }
    }

    /// Write only if the cell is still empty; `false` means another writer got there first
    pub fn claim_empty(&self, pos: Position, cell: Cell) -> bool {
        let index = pos.index(self.next.cols);
        match self.locks {
            Some(locks) => locks.with_lock(index, || {
                if self.next.load(pos).is_empty() {
                    self.next.store(index, cell);
                    true
                } else {
                    false
                }
            }),
            None => self.next.compare_exchange(index, Cell::EMPTY, cell),
        }
    }

    /// Clear the cell only if it still holds `expected`; `false` means another
    /// writer replaced it and the cell is left alone
    pub fn release(&self, pos: Position, expected: Cell) -> bool {
        let index = pos.index(self.next.cols);
        match self.locks {
            Some(locks) => locks.with_lock(index, || {
                if self.next.load(pos) == expected {
                    self.next.store(index, Cell::EMPTY);
                    true
                } else {
                    false
                }
            }),
            None => self.next.compare_exchange(index, expected, Cell::EMPTY),
        }
    }
}

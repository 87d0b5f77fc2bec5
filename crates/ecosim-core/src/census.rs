//! Population counting.

use crate::{Cell, CellKind};
use serde::{Deserialize, Serialize};

/// Cell counts per kind, plus the summed energy of every animal
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Census {
    pub empty: usize,
    pub plants: usize,
    pub herbivores: usize,
    pub carnivores: usize,
    pub omnivores: usize,
    pub animal_energy: i64,
}

impl Census {
    pub fn from_cells<'a>(cells: impl IntoIterator<Item = &'a Cell>) -> Self {
        let mut census = Self::default();
        for cell in cells {
            census.record(cell);
        }
        census
    }

    pub fn record(&mut self, cell: &Cell) {
        match cell.kind {
            CellKind::Empty => self.empty += 1,
            CellKind::Plant => self.plants += 1,
            CellKind::Herbivore => self.herbivores += 1,
            CellKind::Carnivore => self.carnivores += 1,
            CellKind::Omnivore => self.omnivores += 1,
        }
        if cell.is_animal() {
            self.animal_energy += cell.energy as i64;
        }
    }

    pub fn count(&self, kind: CellKind) -> usize {
        match kind {
            CellKind::Empty => self.empty,
            CellKind::Plant => self.plants,
            CellKind::Herbivore => self.herbivores,
            CellKind::Carnivore => self.carnivores,
            CellKind::Omnivore => self.omnivores,
        }
    }

    pub fn animals(&self) -> usize {
        self.herbivores + self.carnivores + self.omnivores
    }

    pub fn total(&self) -> usize {
        self.empty + self.plants + self.animals()
    }

    /// Mean energy per animal, zero when there are none
    pub fn mean_energy(&self) -> f64 {
        match self.animals() {
            0 => 0.0,
            n => self.animal_energy as f64 / n as f64,
        }
    }
}

//! Vegetation rules: neighbor-count lifecycle and weather modifiers.

use crate::grid::Grid;
use ecosim_core::{Cell, CellKind, PlantConfig, Position, WeatherCondition, WeatherConfig};
use rand::Rng;

/// Outcome of the weather roll for one plant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WeatherEffect {
    Unchanged,
    /// Rain roll succeeded; the cell is rewritten as a plant
    Reinforced,
    /// Drought roll succeeded; the plant is gone
    Withered,
}

/// Next-generation value of `pos` under the plant rule, reading only `current`.
///
/// Animals pass through untouched.
pub fn lifecycle(current: &Grid, pos: Position, config: &PlantConfig) -> Cell {
    let cell = current.get(pos);
    match cell.kind {
        CellKind::Plant => {
            if current.plant_neighbors(pos) > config.overcrowding_limit {
                Cell::empty()
            } else {
                Cell::plant()
            }
        }
        CellKind::Empty => {
            if current.plant_neighbors(pos) >= config.birth_threshold {
                Cell::plant()
            } else {
                Cell::empty()
            }
        }
        _ => cell,
    }
}

/// Apply the local weather to a cell of the next generation.
///
/// Only plants are affected. Rain rolls `rain_plant_birth_chance` and on
/// success writes a plant over the plant (a no-op in effect). Drought rolls
/// `drought_plant_death_chance` and on success clears the cell.
pub fn apply_weather<R: Rng + ?Sized>(
    cell: Cell,
    condition: WeatherCondition,
    rng: &mut R,
    config: &WeatherConfig,
) -> (Cell, WeatherEffect) {
    if !cell.is_plant() {
        return (cell, WeatherEffect::Unchanged);
    }
    match condition {
        WeatherCondition::Rain if rng.gen::<f64>() < config.rain_plant_birth_chance => {
            (Cell::plant(), WeatherEffect::Reinforced)
        }
        WeatherCondition::Drought if rng.gen::<f64>() < config.drought_plant_death_chance => {
            (Cell::empty(), WeatherEffect::Withered)
        }
        _ => (cell, WeatherEffect::Unchanged),
    }
}

//! Per-cell weather overlay and its decay/regeneration model.

use ecosim_core::{Position, Weather, WeatherCondition, WeatherConfig};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Draw a fresh weather value.
///
/// One uniform sample picks the condition (rain below `rain_probability`,
/// drought below `rain_probability + drought_probability`, otherwise normal),
/// then the duration is drawn uniformly from the inclusive configured range.
pub fn generate<R: Rng + ?Sized>(rng: &mut R, config: &WeatherConfig) -> Weather {
    let sample: f64 = rng.gen();
    let condition = if sample < config.rain_probability {
        WeatherCondition::Rain
    } else if sample < config.rain_probability + config.drought_probability {
        WeatherCondition::Drought
    } else {
        WeatherCondition::Normal
    };
    let remaining = rng.gen_range(config.min_duration..=config.max_duration);
    Weather::new(condition, remaining)
}

/// Age a weather value by one generation, regenerating it once expired
pub fn advance<R: Rng + ?Sized>(weather: Weather, rng: &mut R, config: &WeatherConfig) -> Weather {
    let remaining = weather.remaining - 1;
    if remaining <= 0 {
        generate(rng, config)
    } else {
        Weather::new(weather.condition, remaining)
    }
}

/// Energy an animal pays for a move (or for standing still) under `condition`
pub fn movement_cost(base: i32, condition: WeatherCondition) -> i32 {
    match condition {
        WeatherCondition::Normal => base,
        WeatherCondition::Drought => base + 1,
        WeatherCondition::Rain => (base - 1).max(1),
    }
}

/// Weather overlay with the same dimensions as the cell grid
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherGrid {
    rows: usize,
    cols: usize,
    cells: Vec<Weather>,
}

impl WeatherGrid {
    /// Uniform overlay, mostly useful for tests
    pub fn filled(rows: usize, cols: usize, weather: Weather) -> Self {
        Self {
            rows,
            cols,
            cells: vec![weather; rows * cols],
        }
    }

    /// Independent random weather for every cell
    pub fn random<R: Rng + ?Sized>(rows: usize, cols: usize, rng: &mut R, config: &WeatherConfig) -> Self {
        let cells = (0..rows * cols).map(|_| generate(rng, config)).collect();
        Self { rows, cols, cells }
    }

    /// Panics if the buffer length is not `rows * cols`.
    pub fn from_cells(rows: usize, cols: usize, cells: Vec<Weather>) -> Self {
        assert_eq!(cells.len(), rows * cols, "weather buffer does not match {rows}x{cols}");
        Self { rows, cols, cells }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn get(&self, pos: Position) -> Weather {
        self.cells[pos.index(self.cols)]
    }

    pub fn set(&mut self, pos: Position, weather: Weather) {
        let index = pos.index(self.cols);
        self.cells[index] = weather;
    }

    pub fn condition(&self, pos: Position) -> WeatherCondition {
        self.get(pos).condition
    }

    pub fn cells(&self) -> &[Weather] {
        &self.cells
    }

    /// Number of cells currently under `condition`
    pub fn count(&self, condition: WeatherCondition) -> usize {
        self.cells.iter().filter(|w| w.condition == condition).count()
    }
}

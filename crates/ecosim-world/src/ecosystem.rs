//! The stepping kernel: owns the committed grid and weather overlay and runs
//! the per-generation pipeline through the configured scheduler.

use crate::behavior::{self, BehaviorContext, BehaviorTally};
use crate::coordinator::{partition_rows, worker_rng, CellWriter, NextGrid, Phase, RowRange, ShardLocks, VisitedSet};
use crate::grid::Grid;
use crate::loader;
use crate::plants::{self, WeatherEffect};
use crate::scheduler::Scheduler;
use crate::weather::{self, WeatherGrid};
use ecosim_core::{Cell, Census, Error, Result, SimulationConfig, Strategy, Weather};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info, instrument};

/// Counters collected while computing one generation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationReport {
    /// Generation the report describes, counted from 1
    pub generation: u64,
    pub acted: u64,
    pub fed_on_plants: u64,
    pub fed_on_prey: u64,
    pub moved: u64,
    pub stranded: u64,
    pub births: u64,
    pub move_conflicts: u64,
    pub starved: u64,
    pub plants_reinforced: u64,
    pub plants_withered: u64,
    pub weather_renewed: u64,
}

impl GenerationReport {
    fn with_behavior(mut self, tally: &BehaviorTally) -> Self {
        self.acted = tally.acted;
        self.fed_on_plants = tally.fed_on_plants;
        self.fed_on_prey = tally.fed_on_prey;
        self.moved = tally.moved;
        self.stranded = tally.stranded;
        self.births = tally.births;
        self.move_conflicts = tally.move_conflicts;
        self
    }
}

pub struct Ecosystem {
    config: SimulationConfig,
    scheduler: Scheduler,
    /// Present only for the data-parallel strategy
    shard_locks: Option<ShardLocks>,
    grid: Grid,
    weather: WeatherGrid,
    visited: VisitedSet,
    generation: u64,
    last_report: GenerationReport,
}

impl Ecosystem {
    /// An empty kernel; call [`Ecosystem::load_initial_state`] before stepping
    pub fn new(config: SimulationConfig) -> Result<Self> {
        config.validate()?;
        let scheduler = Scheduler::new(&config.execution)?;
        let shard_locks = match scheduler.strategy() {
            Strategy::DataParallel => Some(ShardLocks::new(config.execution.shard_count())),
            Strategy::Sequential | Strategy::TaskPool => None,
        };
        Ok(Self {
            config,
            scheduler,
            shard_locks,
            grid: Grid::new(0, 0),
            weather: WeatherGrid::filled(0, 0, Weather::default()),
            visited: VisitedSet::new(0),
            generation: 0,
            last_report: GenerationReport::default(),
        })
    }

    pub fn load(path: impl AsRef<Path>, config: SimulationConfig) -> Result<Self> {
        let mut ecosystem = Self::new(config)?;
        ecosystem.load_initial_state(path)?;
        Ok(ecosystem)
    }

    /// Kernel over an in-memory grid with a freshly drawn weather overlay
    pub fn from_grid(grid: Grid, config: SimulationConfig) -> Result<Self> {
        let mut ecosystem = Self::new(config)?;
        ecosystem.reset(grid);
        Ok(ecosystem)
    }

    /// Kernel over an in-memory grid and weather overlay
    pub fn from_parts(grid: Grid, weather: WeatherGrid, config: SimulationConfig) -> Result<Self> {
        if grid.rows() != weather.rows() || grid.cols() != weather.cols() {
            return Err(Error::DimensionMismatch {
                grid_rows: grid.rows(),
                grid_cols: grid.cols(),
                weather_rows: weather.rows(),
                weather_cols: weather.cols(),
            });
        }
        let mut ecosystem = Self::new(config)?;
        ecosystem.visited = VisitedSet::new(grid.len());
        ecosystem.grid = grid;
        ecosystem.weather = weather;
        Ok(ecosystem)
    }

    /// Replace the whole state with the contents of an initial-state file.
    ///
    /// On error the kernel keeps its previous state.
    #[instrument(skip(self, path), fields(path = %path.as_ref().display()))]
    pub fn load_initial_state(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let grid = loader::load_grid(path, &self.config.ecology)?;
        self.reset(grid);
        info!(
            rows = self.grid.rows(),
            cols = self.grid.cols(),
            animals = self.census().animals(),
            "Initial state loaded"
        );
        Ok(())
    }

    fn reset(&mut self, grid: Grid) {
        let mut rng = ChaCha8Rng::seed_from_u64(self.config.execution.seed);
        self.weather = WeatherGrid::random(grid.rows(), grid.cols(), &mut rng, &self.config.ecology.weather);
        self.visited = VisitedSet::new(grid.len());
        self.grid = grid;
        self.generation = 0;
        self.last_report = GenerationReport::default();
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn weather(&self) -> &WeatherGrid {
        &self.weather
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn census(&self) -> Census {
        self.grid.census()
    }

    pub fn last_report(&self) -> &GenerationReport {
        &self.last_report
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn strategy(&self) -> Strategy {
        self.scheduler.strategy()
    }

    /// Advance exactly one generation
    #[instrument(skip(self), fields(generation = self.generation + 1, strategy = self.strategy().name()))]
    pub fn step(&mut self) {
        let rows = self.grid.rows();
        let cols = self.grid.cols();
        let ranges = partition_rows(rows, self.scheduler.workers());
        let mut report = GenerationReport {
            generation: self.generation + 1,
            ..Default::default()
        };

        let (weather, renewed) = self.advance_weather(&ranges);
        self.weather = weather;
        report.weather_renewed = renewed;
        debug!(phase = %Phase::WeatherAdvance, renewed, "Phase complete");

        let sprouted = self.plant_lifecycle(&ranges);
        debug!(phase = %Phase::PlantLifecycle, "Phase complete");

        let (modified, reinforced, withered) = self.environmental_modifier(&ranges, &sprouted);
        report.plants_reinforced = reinforced;
        report.plants_withered = withered;
        debug!(phase = %Phase::EnvironmentalModifier, reinforced, withered, "Phase complete");

        let (next, tally) = self.animal_behavior(&ranges, modified);
        report = report.with_behavior(&tally);
        debug!(
            phase = %Phase::AnimalBehavior,
            acted = tally.acted,
            births = tally.births,
            move_conflicts = tally.move_conflicts,
            "Phase complete"
        );

        let (cleaned, starved) = self.mortality_cleanup(&ranges, &next);
        report.starved = starved;
        debug!(phase = %Phase::MortalityCleanup, starved, "Phase complete");

        self.grid = Grid::from_cells(rows, cols, cleaned);
        self.generation += 1;
        self.last_report = report;
        debug!(phase = %Phase::Commit, "Phase complete");
    }

    /// Run `generations` steps, logging progress periodically
    #[instrument(skip(self))]
    pub fn run(&mut self, generations: u64) {
        info!("Starting run for {} generations", generations);
        for done in 0..generations {
            self.step();
            if done % 1000 == 0 {
                info!(
                    "Generation {}/{}: {} animals alive",
                    done + 1,
                    generations,
                    self.census().animals()
                );
            }
        }
    }

    fn advance_weather(&self, ranges: &[RowRange]) -> (WeatherGrid, u64) {
        let cols = self.grid.cols();
        let (seed, generation) = (self.config.execution.seed, self.generation);
        let config = &self.config.ecology.weather;
        let current = &self.weather;

        let chunks = self.scheduler.map_ranges(ranges, |worker, range| {
            let mut rng = worker_rng(seed, generation, Phase::WeatherAdvance, worker);
            let mut renewed: u64 = 0;
            let cells: Vec<Weather> = range
                .positions(cols)
                .map(|pos| {
                    let before = current.get(pos);
                    if before.remaining <= 1 {
                        renewed += 1;
                    }
                    weather::advance(before, &mut rng, config)
                })
                .collect();
            (cells, renewed)
        });

        let mut cells = Vec::with_capacity(self.grid.len());
        let mut renewed = 0;
        for (chunk, count) in chunks {
            cells.extend(chunk);
            renewed += count;
        }
        (WeatherGrid::from_cells(self.grid.rows(), cols, cells), renewed)
    }

    fn plant_lifecycle(&self, ranges: &[RowRange]) -> Grid {
        let cols = self.grid.cols();
        let current = &self.grid;
        let config = &self.config.ecology.plants;

        let chunks = self.scheduler.map_ranges(ranges, |_, range| {
            range
                .positions(cols)
                .map(|pos| plants::lifecycle(current, pos, config))
                .collect::<Vec<Cell>>()
        });
        Grid::from_cells(self.grid.rows(), cols, chunks.concat())
    }

    fn environmental_modifier(&self, ranges: &[RowRange], sprouted: &Grid) -> (Grid, u64, u64) {
        let cols = self.grid.cols();
        let (seed, generation) = (self.config.execution.seed, self.generation);
        let config = &self.config.ecology.weather;
        let weather = &self.weather;

        let chunks = self.scheduler.map_ranges(ranges, |worker, range| {
            let mut rng = worker_rng(seed, generation, Phase::EnvironmentalModifier, worker);
            let (mut reinforced, mut withered): (u64, u64) = (0, 0);
            let cells: Vec<Cell> = range
                .positions(cols)
                .map(|pos| {
                    let (cell, effect) = plants::apply_weather(sprouted.get(pos), weather.condition(pos), &mut rng, config);
                    match effect {
                        WeatherEffect::Reinforced => reinforced += 1,
                        WeatherEffect::Withered => withered += 1,
                        WeatherEffect::Unchanged => {}
                    }
                    cell
                })
                .collect();
            (cells, reinforced, withered)
        });

        let mut cells = Vec::with_capacity(self.grid.len());
        let (mut reinforced, mut withered) = (0, 0);
        for (chunk, r, w) in chunks {
            cells.extend(chunk);
            reinforced += r;
            withered += w;
        }
        (Grid::from_cells(self.grid.rows(), cols, cells), reinforced, withered)
    }

    fn animal_behavior(&mut self, ranges: &[RowRange], modified: Grid) -> (Grid, BehaviorTally) {
        self.visited.clear();
        let next = NextGrid::from_grid(modified);
        let cols = self.grid.cols();
        let (seed, generation) = (self.config.execution.seed, self.generation);
        let ctx = BehaviorContext {
            current: &self.grid,
            weather: &self.weather,
            next: CellWriter::new(&next, self.shard_locks.as_ref()),
            visited: &self.visited,
            config: &self.config.ecology,
            move_policy: self.config.execution.move_policy,
        };

        let tallies = self.scheduler.map_ranges(ranges, |worker, range| {
            let mut rng = worker_rng(seed, generation, Phase::AnimalBehavior, worker);
            let mut tally = BehaviorTally::default();
            for pos in range.positions(cols) {
                if let Some(outcome) = behavior::act(&ctx, pos, &mut rng) {
                    tally.record(&outcome);
                }
            }
            tally
        });

        let mut total = BehaviorTally::default();
        for tally in &tallies {
            total.merge(tally);
        }
        (next.into_grid(), total)
    }

    fn mortality_cleanup(&self, ranges: &[RowRange], next: &Grid) -> (Vec<Cell>, u64) {
        let cols = self.grid.cols();

        let chunks = self.scheduler.map_ranges(ranges, |_, range| {
            let mut starved: u64 = 0;
            let cells: Vec<Cell> = range
                .positions(cols)
                .map(|pos| {
                    let cell = next.get(pos);
                    if cell.is_animal() && cell.energy <= 0 {
                        starved += 1;
                        Cell::empty()
                    } else {
                        cell
                    }
                })
                .collect();
            (cells, starved)
        });

        let mut cells = Vec::with_capacity(next.len());
        let mut starved = 0;
        for (chunk, count) in chunks {
            cells.extend(chunk);
            starved += count;
        }
        (cells, starved)
    }
}

impl std::fmt::Debug for Ecosystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ecosystem")
            .field("scheduler", &self.scheduler)
            .field("rows", &self.grid.rows())
            .field("cols", &self.grid.cols())
            .field("generation", &self.generation)
            .finish()
    }
}

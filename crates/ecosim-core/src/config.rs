//! Configuration types for the simulation.

use crate::{CellKind, Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::warn;

/// Per-species energy economy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpeciesTraits {
    /// Energy of a freshly loaded or newborn animal
    pub initial_energy: i32,
    /// Energy gained from eating a plant
    pub plant_gain: i32,
    /// Energy gained from eating another animal
    pub attack_gain: i32,
    /// Below this energy an omnivore will hunt herbivores
    pub hunger_threshold: i32,
    /// Minimum energy required to reproduce
    pub reproduction_threshold: i32,
    /// Energy the parent pays per offspring
    pub reproduction_cost: i32,
    /// Base energy cost of a move (or of standing still)
    pub move_cost: i32,
}

impl SpeciesTraits {
    /// Herbivores and omnivores share the same economy
    pub fn grazer() -> Self {
        Self {
            initial_energy: 10,
            plant_gain: 5,
            attack_gain: 10,
            hunger_threshold: 10,
            reproduction_threshold: 15,
            reproduction_cost: 5,
            move_cost: 1,
        }
    }

    pub fn carnivore() -> Self {
        Self {
            initial_energy: 20,
            plant_gain: 0,
            attack_gain: 15,
            hunger_threshold: 10,
            reproduction_threshold: 15,
            reproduction_cost: 6,
            move_cost: 1,
        }
    }
}

/// Weather generation and its effect on vegetation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeatherConfig {
    pub rain_probability: f64,
    pub drought_probability: f64,
    /// Inclusive lower bound of a fresh weather duration
    pub min_duration: i32,
    /// Inclusive upper bound of a fresh weather duration
    pub max_duration: i32,
    pub rain_plant_birth_chance: f64,
    pub drought_plant_death_chance: f64,
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            rain_probability: 0.1,
            drought_probability: 0.05,
            min_duration: 1,
            max_duration: 4,
            rain_plant_birth_chance: 0.4,
            drought_plant_death_chance: 0.5,
        }
    }
}

/// Vegetation birth/death thresholds, counted over the Moore neighborhood
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlantConfig {
    /// A plant with strictly more plant neighbors than this dies
    pub overcrowding_limit: usize,
    /// An empty cell with at least this many plant neighbors sprouts
    pub birth_threshold: usize,
}

impl Default for PlantConfig {
    fn default() -> Self {
        Self {
            overcrowding_limit: 4,
            birth_threshold: 2,
        }
    }
}

/// Ecological rules
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EcologyConfig {
    pub herbivore: SpeciesTraits,
    pub carnivore: SpeciesTraits,
    pub omnivore: SpeciesTraits,
    pub plants: PlantConfig,
    pub weather: WeatherConfig,
    /// Chance that an animal above its threshold actually reproduces
    pub reproduction_chance: f64,
}

impl Default for EcologyConfig {
    fn default() -> Self {
        Self {
            herbivore: SpeciesTraits::grazer(),
            carnivore: SpeciesTraits::carnivore(),
            omnivore: SpeciesTraits::grazer(),
            plants: PlantConfig::default(),
            weather: WeatherConfig::default(),
            reproduction_chance: 0.5,
        }
    }
}

impl EcologyConfig {
    /// Traits for an animal kind, `None` for empty cells and plants
    pub fn traits(&self, kind: CellKind) -> Option<&SpeciesTraits> {
        match kind {
            CellKind::Herbivore => Some(&self.herbivore),
            CellKind::Carnivore => Some(&self.carnivore),
            CellKind::Omnivore => Some(&self.omnivore),
            CellKind::Empty | CellKind::Plant => None,
        }
    }

    /// Energy a cell of this kind starts with
    pub fn initial_energy(&self, kind: CellKind) -> i32 {
        self.traits(kind).map_or(0, |t| t.initial_energy)
    }
}

/// How generations are scheduled across threads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// One thread, plain nested loops
    #[default]
    Sequential,
    /// Row ranges run as a structured parallel-for; behavior writes take shard locks
    DataParallel,
    /// Row ranges run as explicit pool tasks; no shard lock table
    TaskPool,
}

impl Strategy {
    pub fn all() -> [Strategy; 3] {
        [Strategy::Sequential, Strategy::DataParallel, Strategy::TaskPool]
    }

    pub fn name(&self) -> &'static str {
        match self {
            Strategy::Sequential => "sequential",
            Strategy::DataParallel => "data_parallel",
            Strategy::TaskPool => "task_pool",
        }
    }
}

/// What happens when two animals pick the same empty destination
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MovePolicy {
    /// Re-check the destination atomically before moving; on conflict try the next candidate
    #[default]
    Claim,
    /// Check without claiming; the later write overwrites the earlier mover
    LastWriterWins,
}

/// Scheduling and randomness
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionConfig {
    pub strategy: Strategy,
    /// Worker count; 0 means available hardware parallelism
    pub workers: usize,
    /// Shard locks per worker
    pub shards_per_worker: usize,
    /// Base seed for every random stream in the run
    pub seed: u64,
    pub move_policy: MovePolicy,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            strategy: Strategy::Sequential,
            workers: 0,
            shards_per_worker: 2,
            seed: 0,
            move_policy: MovePolicy::Claim,
        }
    }
}

impl ExecutionConfig {
    /// Concrete worker count for the configured strategy
    pub fn resolved_workers(&self) -> usize {
        if self.strategy == Strategy::Sequential {
            return 1;
        }
        if self.workers > 0 {
            return self.workers;
        }
        match std::thread::available_parallelism() {
            Ok(n) => n.get(),
            Err(e) => {
                warn!("Could not query available parallelism, using 1 worker: {}", e);
                1
            }
        }
    }

    pub fn shard_count(&self) -> usize {
        self.resolved_workers() * self.shards_per_worker
    }
}

/// Full simulation configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub ecology: EcologyConfig,
    pub execution: ExecutionConfig,
}

impl SimulationConfig {
    pub fn with_strategy(mut self, strategy: Strategy) -> Self {
        self.execution.strategy = strategy;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.execution.seed = seed;
        self
    }

    /// Read a JSON configuration file.
    ///
    /// Missing sections and fields fall back to defaults; a species table, when
    /// present, must list every trait.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: SimulationConfig = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let weather = &self.ecology.weather;
        let probabilities = [
            ("rain_probability", weather.rain_probability),
            ("drought_probability", weather.drought_probability),
            ("rain_plant_birth_chance", weather.rain_plant_birth_chance),
            ("drought_plant_death_chance", weather.drought_plant_death_chance),
            ("reproduction_chance", self.ecology.reproduction_chance),
        ];
        for (name, p) in probabilities {
            if !(0.0..=1.0).contains(&p) {
                return Err(Error::Config(format!("{} must be within [0, 1], got {}", name, p)));
            }
        }
        if weather.rain_probability + weather.drought_probability > 1.0 {
            return Err(Error::Config(
                "rain_probability + drought_probability exceeds 1".to_string(),
            ));
        }
        if weather.min_duration < 1 || weather.min_duration > weather.max_duration {
            return Err(Error::Config(format!(
                "weather duration range [{}, {}] is invalid",
                weather.min_duration, weather.max_duration
            )));
        }
        if self.execution.shards_per_worker == 0 {
            return Err(Error::Config("shards_per_worker must be positive".to_string()));
        }
        for kind in CellKind::animals() {
            if let Some(traits) = self.ecology.traits(kind) {
                if traits.initial_energy <= 0 {
                    return Err(Error::Config(format!(
                        "{} initial_energy must be positive",
                        kind
                    )));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_configs() {
        let ecology = EcologyConfig::default();
        assert_eq!(ecology.initial_energy(CellKind::Herbivore), 10);
        assert_eq!(ecology.initial_energy(CellKind::Omnivore), 10);
        assert_eq!(ecology.initial_energy(CellKind::Carnivore), 20);
        assert_eq!(ecology.initial_energy(CellKind::Plant), 0);
        assert_eq!(ecology.carnivore.reproduction_cost, 6);
        assert_eq!(ecology.herbivore.reproduction_cost, 5);
        assert_eq!(ecology.plants.overcrowding_limit, 4);

        let execution = ExecutionConfig::default();
        assert_eq!(execution.strategy, Strategy::Sequential);
        assert_eq!(execution.resolved_workers(), 1);

        assert!(SimulationConfig::default().validate().is_ok());
    }

    #[test]
    fn test_explicit_workers() {
        let execution = ExecutionConfig {
            strategy: Strategy::DataParallel,
            workers: 3,
            ..Default::default()
        };
        assert_eq!(execution.resolved_workers(), 3);
        assert_eq!(execution.shard_count(), 6);
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let mut config = SimulationConfig::default();
        config.ecology.reproduction_chance = 1.5;
        assert!(matches!(config.validate(), Err(Error::Config(_))));

        let mut config = SimulationConfig::default();
        config.ecology.weather.min_duration = 5;
        assert!(config.validate().is_err());

        let mut config = SimulationConfig::default();
        config.execution.shards_per_worker = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let json = r#"{ "execution": { "strategy": "task_pool", "workers": 2,
            "shards_per_worker": 2, "seed": 9, "move_policy": "last_writer_wins" } }"#;
        let config: SimulationConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.execution.strategy, Strategy::TaskPool);
        assert_eq!(config.execution.move_policy, MovePolicy::LastWriterWins);
        assert_eq!(config.ecology, EcologyConfig::default());
    }

    #[test]
    fn test_partial_sections_use_defaults() {
        let config: SimulationConfig = serde_json::from_str(r#"{ "execution": { "seed": 5 } }"#).unwrap();
        assert_eq!(config.execution.seed, 5);
        assert_eq!(config.execution.shards_per_worker, 2);
        assert_eq!(config.execution.move_policy, MovePolicy::Claim);

        let json = r#"{ "ecology": { "reproduction_chance": 0.25, "weather": { "rain_probability": 0.2 } } }"#;
        let config: SimulationConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.ecology.reproduction_chance, 0.25);
        assert_eq!(config.ecology.weather.rain_probability, 0.2);
        assert_eq!(config.ecology.weather.max_duration, 4);
        assert_eq!(config.ecology.carnivore, SpeciesTraits::carnivore());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_json_file_with_partial_section() {
        let path = std::env::temp_dir().join(format!("ecosim-config-{}.json", std::process::id()));
        std::fs::write(&path, r#"{ "execution": { "seed": 5, "strategy": "data_parallel" } }"#).unwrap();
        let config = SimulationConfig::from_json_file(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(config.execution.seed, 5);
        assert_eq!(config.execution.strategy, Strategy::DataParallel);
        assert_eq!(config.ecology, EcologyConfig::default());
    }
}

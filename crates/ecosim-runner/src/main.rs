//! Headless driver: load an initial state, step it, report populations.

mod telemetry;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use ecosim_core::{Census, MovePolicy, SimulationConfig, Strategy};
use ecosim_world::{Ecosystem, GenerationReport};
use serde::Serialize;
use std::path::PathBuf;
use std::time::Instant;
use tracing::{event, info, Level};

#[derive(Parser, Debug)]
#[command(name = "ecosim-runner")]
#[command(about = "Run the grid ecosystem for a number of generations")]
struct Cli {
    /// Initial-state file: one row per line, codes 0-4
    #[arg(long)]
    grid: PathBuf,
    /// JSON configuration; flags below override it
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long, value_enum)]
    strategy: Option<StrategyArg>,
    #[arg(long, default_value_t = 100)]
    generations: u64,
    /// Worker threads for the parallel strategies (0 = all cores)
    #[arg(long)]
    workers: Option<usize>,
    #[arg(long)]
    seed: Option<u64>,
    #[arg(long, value_enum)]
    move_policy: Option<MovePolicyArg>,
    /// Emit a population snapshot every N generations (0 disables)
    #[arg(long, default_value_t = 100)]
    report_every: u64,
    #[arg(long, default_value_t = false)]
    json_logs: bool,
    /// Print the final grid after the summary
    #[arg(long, default_value_t = false)]
    print_grid: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum StrategyArg {
    Sequential,
    DataParallel,
    TaskPool,
}

impl From<StrategyArg> for Strategy {
    fn from(arg: StrategyArg) -> Self {
        match arg {
            StrategyArg::Sequential => Strategy::Sequential,
            StrategyArg::DataParallel => Strategy::DataParallel,
            StrategyArg::TaskPool => Strategy::TaskPool,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum MovePolicyArg {
    Claim,
    LastWriterWins,
}

impl From<MovePolicyArg> for MovePolicy {
    fn from(arg: MovePolicyArg) -> Self {
        match arg {
            MovePolicyArg::Claim => MovePolicy::Claim,
            MovePolicyArg::LastWriterWins => MovePolicy::LastWriterWins,
        }
    }
}

#[derive(Debug, Serialize)]
struct RunSummary {
    strategy: &'static str,
    generations: u64,
    seed: u64,
    rows: usize,
    cols: usize,
    elapsed_ms: u128,
    avg_ms_per_generation: f64,
    initial_census: Census,
    final_census: Census,
    last_generation: GenerationReport,
}

fn build_config(cli: &Cli) -> Result<SimulationConfig> {
    let mut config = match &cli.config {
        Some(path) => SimulationConfig::from_json_file(path)
            .with_context(|| format!("failed to read config {}", path.display()))?,
        None => SimulationConfig::default(),
    };
    if let Some(strategy) = cli.strategy {
        config.execution.strategy = strategy.into();
    }
    if let Some(workers) = cli.workers {
        config.execution.workers = workers;
    }
    if let Some(seed) = cli.seed {
        config.execution.seed = seed;
    }
    if let Some(policy) = cli.move_policy {
        config.execution.move_policy = policy.into();
    }
    Ok(config)
}

fn emit_population_metrics(ecosystem: &Ecosystem) {
    let census = ecosystem.census();
    let report = ecosystem.last_report();
    let generation = ecosystem.generation();

    info!(
        event = "population_metrics",
        generation,
        plants = census.plants,
        herbivores = census.herbivores,
        carnivores = census.carnivores,
        omnivores = census.omnivores,
        mean_energy = format!("{:.2}", census.mean_energy()),
        births = report.births,
        starved = report.starved,
        move_conflicts = report.move_conflicts,
        "Population metrics snapshot"
    );

    event!(
        Level::INFO,
        gauge_name = "population_animals",
        gauge_value = census.animals(),
        generation,
        "Animal population gauge"
    );

    event!(
        Level::INFO,
        gauge_name = "population_plants",
        gauge_value = census.plants,
        generation,
        "Plant population gauge"
    );
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    telemetry::init_telemetry(cli.json_logs);

    let config = build_config(&cli)?;
    let seed = config.execution.seed;
    let mut ecosystem = Ecosystem::load(&cli.grid, config)
        .with_context(|| format!("failed to load initial state {}", cli.grid.display()))?;
    let initial = ecosystem.census();

    info!(
        strategy = ecosystem.strategy().name(),
        generations = cli.generations,
        seed,
        "Starting run"
    );

    let started = Instant::now();
    for _ in 0..cli.generations {
        ecosystem.step();
        if cli.report_every > 0 && ecosystem.generation() % cli.report_every == 0 {
            emit_population_metrics(&ecosystem);
        }
    }
    let elapsed = started.elapsed();

    let summary = RunSummary {
        strategy: ecosystem.strategy().name(),
        generations: cli.generations,
        seed,
        rows: ecosystem.grid().rows(),
        cols: ecosystem.grid().cols(),
        elapsed_ms: elapsed.as_millis(),
        avg_ms_per_generation: if cli.generations > 0 {
            elapsed.as_secs_f64() * 1000.0 / cli.generations as f64
        } else {
            0.0
        },
        initial_census: initial,
        final_census: ecosystem.census(),
        last_generation: *ecosystem.last_report(),
    };

    info!(
        event = "run_summary",
        generations = summary.generations,
        final_animals = summary.final_census.animals(),
        final_plants = summary.final_census.plants,
        elapsed_ms = summary.elapsed_ms as u64,
        "Run complete"
    );

    println!("{}", serde_json::to_string_pretty(&summary)?);
    if cli.print_grid {
        print!("{}", ecosystem.grid().to_text());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_defaults() {
        let cli = Cli::try_parse_from([
            "ecosim-runner",
            "--grid",
            "world.txt",
            "--strategy",
            "task-pool",
            "--workers",
            "3",
            "--seed",
            "11",
            "--move-policy",
            "last-writer-wins",
        ])
        .unwrap();
        let config = build_config(&cli).unwrap();

        assert_eq!(config.execution.strategy, Strategy::TaskPool);
        assert_eq!(config.execution.workers, 3);
        assert_eq!(config.execution.seed, 11);
        assert_eq!(config.execution.move_policy, MovePolicy::LastWriterWins);
        assert_eq!(cli.generations, 100);
    }

    #[test]
    fn test_missing_config_file_is_reported() {
        let cli = Cli::try_parse_from(["ecosim-runner", "--grid", "g.txt", "--config", "/no/such.json"]).unwrap();
        let err = build_config(&cli).unwrap_err();
        assert!(err.to_string().contains("failed to read config"));
    }
}

//! Whole-generation scenarios driven through the public kernel API.

use ecosim_core::{Cell, CellKind, MovePolicy, Position, SimulationConfig, Strategy, Weather, WeatherCondition};
use ecosim_world::{parse_grid, Ecosystem, Grid, WeatherGrid};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

fn calm(rows: usize, cols: usize) -> WeatherGrid {
    WeatherGrid::filled(rows, cols, Weather::new(WeatherCondition::Normal, 100))
}

fn pinned_config() -> SimulationConfig {
    let mut config = SimulationConfig::default();
    config.ecology.reproduction_chance = 0.0;
    config
}

fn config_for(strategy: Strategy, seed: u64) -> SimulationConfig {
    let mut config = SimulationConfig::default().with_strategy(strategy).with_seed(seed);
    config.execution.workers = 4;
    config
}

fn random_grid(rows: usize, cols: usize, seed: u64) -> Grid {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let defaults = SimulationConfig::default();
    let mut grid = Grid::new(rows, cols);
    for row in 0..rows {
        for col in 0..cols {
            let roll: f64 = rng.gen();
            let cell = if roll < 0.4 {
                Cell::plant()
            } else if roll < 0.5 {
                Cell::animal(CellKind::Herbivore, defaults.ecology.herbivore.initial_energy)
            } else if roll < 0.55 {
                Cell::animal(CellKind::Carnivore, defaults.ecology.carnivore.initial_energy)
            } else if roll < 0.6 {
                Cell::animal(CellKind::Omnivore, defaults.ecology.omnivore.initial_energy)
            } else {
                Cell::empty()
            };
            grid.set(Position::new(row, col), cell);
        }
    }
    grid
}

#[test]
fn herbivore_walks_onto_the_plant_it_eats() {
    let mut grid = Grid::new(3, 3);
    grid.set(Position::new(1, 1), Cell::animal(CellKind::Herbivore, 10));
    grid.set(Position::new(0, 0), Cell::plant());

    let mut ecosystem = Ecosystem::from_parts(grid, calm(3, 3), pinned_config()).unwrap();
    ecosystem.step();

    let grid = ecosystem.grid();
    assert_eq!(grid.get(Position::new(0, 0)), Cell::animal(CellKind::Herbivore, 15));
    assert!(grid.get(Position::new(1, 1)).is_empty());
    assert_eq!(ecosystem.census().animals(), 1);
    assert_eq!(ecosystem.last_report().fed_on_plants, 1);
}

fn boxed_in_carnivore(energy: i32) -> Ecosystem {
    let mut grid = Grid::new(3, 3);
    for row in 0..3 {
        for col in 0..3 {
            grid.set(Position::new(row, col), Cell::plant());
        }
    }
    grid.set(Position::new(1, 1), Cell::animal(CellKind::Carnivore, energy));
    let mut weather = calm(3, 3);
    weather.set(Position::new(1, 1), Weather::new(WeatherCondition::Drought, 100));
    Ecosystem::from_parts(grid, weather, pinned_config()).unwrap()
}

#[test]
fn stranded_carnivore_pays_drought_cost() {
    let mut ecosystem = boxed_in_carnivore(5);
    ecosystem.step();

    assert_eq!(ecosystem.grid().get(Position::new(1, 1)), Cell::animal(CellKind::Carnivore, 3));
    assert_eq!(ecosystem.census().plants, 8);
    assert_eq!(ecosystem.last_report().stranded, 1);
}

#[test]
fn starving_carnivore_is_removed() {
    let mut ecosystem = boxed_in_carnivore(2);
    ecosystem.step();

    assert!(ecosystem.grid().get(Position::new(1, 1)).is_empty());
    assert_eq!(ecosystem.census().animals(), 0);
    assert_eq!(ecosystem.last_report().starved, 1);
}

#[test]
fn eaten_prey_does_not_act() {
    for policy in [MovePolicy::Claim, MovePolicy::LastWriterWins] {
        let mut grid = Grid::new(1, 2);
        grid.set(Position::new(0, 0), Cell::animal(CellKind::Carnivore, 20));
        grid.set(Position::new(0, 1), Cell::animal(CellKind::Herbivore, 10));
        let mut config = pinned_config();
        config.execution.move_policy = policy;

        let mut ecosystem = Ecosystem::from_parts(grid, calm(1, 2), config).unwrap();
        ecosystem.step();

        let grid = ecosystem.grid();
        assert!(grid.get(Position::new(0, 0)).is_empty(), "{:?}", policy);
        assert_eq!(grid.get(Position::new(0, 1)), Cell::animal(CellKind::Carnivore, 35));
        assert_eq!(ecosystem.last_report().acted, 1);
        assert_eq!(ecosystem.last_report().fed_on_prey, 1);
    }
}

#[test]
fn plants_follow_the_neighbor_rule() {
    let text = "1 1 0\n0 0 0\n0 0 0\n";
    let grid = parse_grid(text, &SimulationConfig::default().ecology).unwrap();
    let mut ecosystem = Ecosystem::from_parts(grid, calm(3, 3), SimulationConfig::default()).unwrap();
    ecosystem.step();

    // (1,0) and (1,1) each see both plants; (0,2) and (1,2) see only one.
    assert_eq!(ecosystem.grid().to_text(), "1 1 0\n1 1 0\n0 0 0\n");
}

#[test]
fn dimensions_and_energy_invariants_hold_for_every_strategy() {
    for strategy in Strategy::all() {
        let mut ecosystem = Ecosystem::from_grid(random_grid(24, 17, 5), config_for(strategy, 9)).unwrap();
        for _ in 0..25 {
            ecosystem.step();
            let grid = ecosystem.grid();
            assert_eq!((grid.rows(), grid.cols()), (24, 17));
            assert_eq!((ecosystem.weather().rows(), ecosystem.weather().cols()), (24, 17));
            assert!(
                grid.cells().iter().filter(|c| c.is_animal()).all(|c| c.energy > 0),
                "{:?} committed a dead animal",
                strategy
            );
        }
        assert_eq!(ecosystem.generation(), 25);
    }
}

#[test]
fn weather_durations_stay_in_range() {
    let mut ecosystem = Ecosystem::from_grid(random_grid(10, 10, 1), SimulationConfig::default()).unwrap();
    let max_duration = ecosystem.config().ecology.weather.max_duration;
    for _ in 0..12 {
        ecosystem.step();
        assert!(ecosystem
            .weather()
            .cells()
            .iter()
            .all(|w| w.remaining >= 1 && w.remaining <= max_duration));
    }
}

#[test]
fn sequential_runs_are_reproducible() {
    let run = |seed: u64| {
        let mut ecosystem = Ecosystem::from_grid(random_grid(30, 30, 2), config_for(Strategy::Sequential, seed)).unwrap();
        ecosystem.run(20);
        ecosystem.grid().clone()
    };
    assert_eq!(run(17), run(17));
    assert_ne!(run(17), run(18));
}

#[test]
fn reload_resets_the_kernel() {
    let path = std::env::temp_dir().join(format!("ecosim-reload-{}.txt", std::process::id()));
    std::fs::write(&path, "2 1 0 0\n0 1 1 3\n4 0 0 1\n").unwrap();

    let mut ecosystem = Ecosystem::load(&path, SimulationConfig::default()).unwrap();
    let initial = ecosystem.grid().clone();
    let initial_weather = ecosystem.weather().clone();
    ecosystem.run(5);
    assert_eq!(ecosystem.generation(), 5);

    ecosystem.load_initial_state(&path).unwrap();
    std::fs::remove_file(&path).unwrap();

    assert_eq!(ecosystem.generation(), 0);
    assert_eq!(ecosystem.grid(), &initial);
    assert_eq!(ecosystem.weather(), &initial_weather);
    assert_eq!(ecosystem.last_report().generation, 0);
}

#[test]
fn failed_load_keeps_previous_state() {
    let mut ecosystem = Ecosystem::from_grid(random_grid(4, 4, 3), SimulationConfig::default()).unwrap();
    let before = ecosystem.grid().clone();
    assert!(ecosystem.load_initial_state("/no/such/ecosystem.txt").is_err());
    assert_eq!(ecosystem.grid(), &before);
}

const TRACKED: [CellKind; 4] = [CellKind::Plant, CellKind::Herbivore, CellKind::Carnivore, CellKind::Omnivore];

/// Mean per-species counts before and after `generations`, over one run per seed
fn mean_populations(strategy: Strategy, seeds: &[u64], generations: u64) -> ([f64; 4], [f64; 4]) {
    let mut initial = [0.0; 4];
    let mut last = [0.0; 4];
    for &seed in seeds {
        let mut ecosystem = Ecosystem::from_grid(random_grid(60, 60, seed), config_for(strategy, seed)).unwrap();
        let before = ecosystem.census();
        ecosystem.run(generations);
        let after = ecosystem.census();
        for (i, kind) in TRACKED.into_iter().enumerate() {
            initial[i] += before.count(kind) as f64 / seeds.len() as f64;
            last[i] += after.count(kind) as f64 / seeds.len() as f64;
        }
    }
    (initial, last)
}

#[test]
fn strategies_agree_statistically() {
    let seeds = [3, 14, 15, 92, 65];
    let generations = 15;
    let (start, baseline) = mean_populations(Strategy::Sequential, &seeds, generations);

    for strategy in [Strategy::DataParallel, Strategy::TaskPool] {
        let (initial, means) = mean_populations(strategy, &seeds, generations);
        assert_eq!(initial, start);

        for (i, kind) in TRACKED.into_iter().enumerate() {
            // Within one order of magnitude; +1 keeps an extinct species comparable.
            let ratio = (means[i] + 1.0) / (baseline[i] + 1.0);
            assert!(
                (0.1..=10.0).contains(&ratio),
                "{:?} {}: mean {:.1} vs sequential {:.1}",
                strategy,
                kind,
                means[i],
                baseline[i]
            );

            // Trend direction must agree wherever the sequential trend is clear.
            let expected = baseline[i] - start[i];
            if expected.abs() > 0.1 * start[i] {
                let observed = means[i] - start[i];
                assert_eq!(
                    observed.signum(),
                    expected.signum(),
                    "{:?} {}: trend {:+.1} vs sequential {:+.1}",
                    strategy,
                    kind,
                    observed,
                    expected
                );
            }
        }
    }
}

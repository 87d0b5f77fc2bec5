//! Per-animal decision policy: feed, move, starve in place, reproduce.
//!
//! Lookups of food and prey read the frozen current grid. The search for an
//! empty destination reads the next grid as it is being built, so two
//! animals can race for the same cell; [`MovePolicy`] decides whether that
//! race is resolved by claiming the destination or left to the last writer.

use crate::coordinator::{CellWriter, VisitedSet};
use crate::grid::{Grid, Neighborhood};
use crate::weather::{movement_cost, WeatherGrid};
use ecosim_core::{Cell, CellKind, EcologyConfig, MovePolicy, Position, SpeciesTraits};
use rand::seq::SliceRandom;
use rand::Rng;
use tracing::trace;

/// Everything an animal may look at or write while acting
#[derive(Debug, Clone, Copy)]
pub struct BehaviorContext<'a> {
    pub current: &'a Grid,
    pub weather: &'a WeatherGrid,
    pub next: CellWriter<'a>,
    pub visited: &'a VisitedSet,
    pub config: &'a EcologyConfig,
    pub move_policy: MovePolicy,
}

/// What the animal did before the reproduction check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Ate the plant or prey at `target` and now occupies it
    Fed { target: Position, prey: bool },
    /// Moved to an empty neighbor
    Moved { target: Position },
    /// No food and nowhere to go
    Stranded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Outcome {
    pub kind: CellKind,
    pub action: Action,
    /// Final energy of the parent, after any reproduction cost
    pub energy: i32,
    /// Position the animal occupies in the next grid
    pub position: Position,
    pub offspring: Option<Position>,
    /// Destinations lost to other movers before one was claimed
    pub move_conflicts: u32,
}

/// Counters accumulated over one behavior pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BehaviorTally {
    pub acted: u64,
    pub fed_on_plants: u64,
    pub fed_on_prey: u64,
    pub moved: u64,
    pub stranded: u64,
    pub births: u64,
    pub move_conflicts: u64,
}

impl BehaviorTally {
    pub fn record(&mut self, outcome: &Outcome) {
        self.acted += 1;
        match outcome.action {
            Action::Fed { prey: true, .. } => self.fed_on_prey += 1,
            Action::Fed { prey: false, .. } => self.fed_on_plants += 1,
            Action::Moved { .. } => self.moved += 1,
            Action::Stranded => self.stranded += 1,
        }
        if outcome.offspring.is_some() {
            self.births += 1;
        }
        self.move_conflicts += outcome.move_conflicts as u64;
    }

    pub fn merge(&mut self, other: &BehaviorTally) {
        self.acted += other.acted;
        self.fed_on_plants += other.fed_on_plants;
        self.fed_on_prey += other.fed_on_prey;
        self.moved += other.moved;
        self.stranded += other.stranded;
        self.births += other.births;
        self.move_conflicts += other.move_conflicts;
    }
}

struct Meal {
    target: Position,
    gain: i32,
    prey: bool,
}

fn first_of(current: &Grid, neighbors: &Neighborhood, wanted: impl Fn(CellKind) -> bool) -> Option<Position> {
    neighbors.iter().find(|&pos| wanted(current.kind(pos)))
}

/// First food source in shuffled order, honoring each species' diet
fn find_meal(current: &Grid, neighbors: &Neighborhood, kind: CellKind, energy: i32, traits: &SpeciesTraits) -> Option<Meal> {
    let plant = || {
        first_of(current, neighbors, |k| k == CellKind::Plant).map(|target| Meal {
            target,
            gain: traits.plant_gain,
            prey: false,
        })
    };
    let prey = |wanted: &(dyn Fn(CellKind) -> bool)| {
        first_of(current, neighbors, wanted).map(|target| Meal {
            target,
            gain: traits.attack_gain,
            prey: true,
        })
    };

    match kind {
        CellKind::Herbivore => plant(),
        CellKind::Carnivore => prey(&|k| matches!(k, CellKind::Herbivore | CellKind::Omnivore)),
        CellKind::Omnivore => plant().or_else(|| {
            if energy < traits.hunger_threshold {
                prey(&|k| k == CellKind::Herbivore)
            } else {
                None
            }
        }),
        CellKind::Empty | CellKind::Plant => None,
    }
}

/// Clear the origin after the animal left it.
///
/// Under [`MovePolicy::Claim`] the check and the clear are one atomic
/// release, so a predator that already took the cell is not erased.
fn vacate(ctx: &BehaviorContext<'_>, origin: Position, departing: Cell) {
    match ctx.move_policy {
        MovePolicy::LastWriterWins => ctx.next.write(origin, Cell::empty()),
        MovePolicy::Claim => {
            if !ctx.next.release(origin, departing) {
                trace!(origin = %origin, "Origin already taken by another animal");
            }
        }
    }
}

/// Run one animal's turn, writing the results into the next grid.
///
/// Returns `None` if `origin` holds no animal in the current grid or was
/// already handled this generation (including prey that has been eaten).
pub fn act<R: Rng + ?Sized>(ctx: &BehaviorContext<'_>, origin: Position, rng: &mut R) -> Option<Outcome> {
    let cell = ctx.current.get(origin);
    if !cell.is_animal() {
        return None;
    }
    let cols = ctx.current.cols();
    if !ctx.visited.mark(origin.index(cols)) {
        return None;
    }

    let kind = cell.kind;
    let traits = ctx.config.traits(kind)?;
    let mut energy = cell.energy;

    let mut neighbors = ctx.current.neighbors(origin);
    neighbors.as_mut_slice().shuffle(rng);

    let mut position = origin;
    let mut move_conflicts = 0;

    let action = if let Some(meal) = find_meal(ctx.current, &neighbors, kind, energy, traits) {
        energy += meal.gain;
        if meal.prey {
            // The prey's own turn is forfeited.
            ctx.visited.mark(meal.target.index(cols));
        }
        ctx.next.write(meal.target, Cell::animal(kind, energy));
        if meal.target != origin {
            vacate(ctx, origin, cell);
        }
        position = meal.target;
        Action::Fed {
            target: meal.target,
            prey: meal.prey,
        }
    } else {
        let mut moved_to = None;
        for candidate in neighbors.iter() {
            if !ctx.next.read(candidate).is_empty() {
                continue;
            }
            let cost = movement_cost(traits.move_cost, ctx.weather.condition(candidate));
            let arriving = Cell::animal(kind, energy - cost);
            match ctx.move_policy {
                MovePolicy::LastWriterWins => {
                    ctx.next.write(candidate, arriving);
                }
                MovePolicy::Claim => {
                    if !ctx.next.claim_empty(candidate, arriving) {
                        move_conflicts += 1;
                        trace!(origin = %origin, destination = %candidate, "Move destination claimed by another animal");
                        continue;
                    }
                }
            }
            energy -= cost;
            moved_to = Some(candidate);
            break;
        }

        match moved_to {
            Some(target) => {
                vacate(ctx, origin, cell);
                position = target;
                Action::Moved { target }
            }
            None => {
                energy -= movement_cost(traits.move_cost, ctx.weather.condition(origin));
                ctx.next.write(origin, Cell::animal(kind, energy));
                Action::Stranded
            }
        }
    };

    let mut offspring = None;
    if energy >= traits.reproduction_threshold {
        let nursery = first_of(ctx.current, &neighbors, |k| !k.is_animal());
        if let Some(nursery) = nursery {
            if rng.gen::<f64>() < ctx.config.reproduction_chance {
                ctx.next.write(nursery, Cell::animal(kind, traits.initial_energy));
                energy -= traits.reproduction_cost;
                ctx.next.write(position, Cell::animal(kind, energy));
                offspring = Some(nursery);
            }
        }
    }

    Some(Outcome {
        kind,
        action,
        energy,
        position,
        offspring,
        move_conflicts,
    })
}

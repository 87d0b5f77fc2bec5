//! Ecosystem stepping engine.
//!
//! This crate implements the 2D grid where plants grow and animals feed, move
//! and reproduce, advanced one generation at a time under a sequential,
//! data-parallel or task-pool scheduler.

pub mod behavior;
pub mod coordinator;
pub mod ecosystem;
pub mod grid;
pub mod loader;
pub mod plants;
pub mod scheduler;
pub mod weather;

pub use ecosystem::{Ecosystem, GenerationReport};
pub use grid::Grid;
pub use loader::{load_grid, parse_grid};
pub use scheduler::Scheduler;
pub use weather::WeatherGrid;

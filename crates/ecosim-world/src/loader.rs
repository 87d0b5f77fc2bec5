//! Initial-state files: one row per line, whitespace-separated integer codes.
//!
//! `0` empty, `1` plant, `2` herbivore, `3` carnivore, `4` omnivore. Any other
//! or unparseable token is read as empty. The column count comes from the
//! first row and every other row must match it.

use crate::grid::Grid;
use ecosim_core::{Cell, CellKind, EcologyConfig, Error, Position, Result};
use std::path::Path;
use tracing::{debug, instrument};

fn tokens(line: &str) -> impl Iterator<Item = &str> {
    line.split([' ', '\t']).filter(|t| !t.is_empty())
}

/// Decode one token; malformed input is not an error
pub fn parse_token(token: &str) -> CellKind {
    token.parse::<i64>().map(CellKind::from_code).unwrap_or(CellKind::Empty)
}

/// Build a cell of `kind`, giving animals their species' starting energy
pub fn spawn_cell(kind: CellKind, ecology: &EcologyConfig) -> Cell {
    if kind.is_animal() {
        Cell::animal(kind, ecology.initial_energy(kind))
    } else if kind == CellKind::Plant {
        Cell::plant()
    } else {
        Cell::empty()
    }
}

/// Parse initial-state text into a grid
pub fn parse_grid(text: &str, ecology: &EcologyConfig) -> Result<Grid> {
    let mut lines: Vec<&str> = text.lines().collect();
    while lines.last().is_some_and(|line| line.trim().is_empty()) {
        lines.pop();
    }

    let cols = match lines.first() {
        Some(first) => tokens(first).count(),
        None => 0,
    };
    if cols == 0 {
        return Err(Error::Format {
            line: 1,
            message: "initial state has no cells".to_string(),
        });
    }

    let rows = lines.len();
    let mut grid = Grid::new(rows, cols);
    for (row, line) in lines.iter().enumerate() {
        let row_tokens: Vec<&str> = tokens(line).collect();
        if row_tokens.len() != cols {
            return Err(Error::Format {
                line: row + 1,
                message: format!("expected {} columns, found {}", cols, row_tokens.len()),
            });
        }
        for (col, token) in row_tokens.into_iter().enumerate() {
            grid.set(Position::new(row, col), spawn_cell(parse_token(token), ecology));
        }
    }
    Ok(grid)
}

/// Read and parse an initial-state file
#[instrument(skip(path, ecology), fields(path = %path.as_ref().display()))]
pub fn load_grid(path: impl AsRef<Path>, ecology: &EcologyConfig) -> Result<Grid> {
    let text = std::fs::read_to_string(path.as_ref())?;
    let grid = parse_grid(&text, ecology)?;
    debug!(rows = grid.rows(), cols = grid.cols(), "Loaded initial state");
    Ok(grid)
}

//! Error types for the simulation.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Format error on line {line}: {message}")]
    Format { line: usize, message: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Dimension mismatch: grid is {grid_rows}x{grid_cols}, weather is {weather_rows}x{weather_cols}")]
    DimensionMismatch {
        grid_rows: usize,
        grid_cols: usize,
        weather_rows: usize,
        weather_cols: usize,
    },

    #[error("Thread pool error: {0}")]
    ThreadPool(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

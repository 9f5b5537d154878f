//! Error types for the trainer

use thiserror::Error;

/// Errors that abort a training run
#[derive(Error, Debug)]
pub enum TrainerError {
    #[error("No DB connection string provided (--db, NEON_DATABASE_URL or DATABASE_URL)")]
    MissingDatabaseUrl,

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("No training rows found in dataset")]
    NoTrainingData,

    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Singular matrix in Newton step")]
    SingularMatrix,

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, TrainerError>;

//! Error types for the projection engine

use thiserror::Error;

/// Errors raised while fitting a ridge model
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    #[error("No training samples")]
    EmptyTrainingSet,

    #[error("Feature dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Sample weights must be finite and sum to a positive value")]
    InvalidWeights,

    #[error("Ridge normal equations are singular")]
    Singular,
}

/// Errors raised while loading engine configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Unknown scoring preset '{0}'")]
    UnknownScoringPreset(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

//! Common error taxonomy.

use thiserror::Error;

/// Marker trait implemented by all CliqueNet error types.
pub trait CliqueNetError: std::error::Error {}

/// Startup-time configuration faults. These are fatal: a malformed problem
/// type table cannot be recovered from per round.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("problem type table is empty")]
    EmptyProblemTable,

    #[error("problem type '{label}' has difficulty {difficulty} outside [0, 1]")]
    InvalidDifficulty { label: String, difficulty: f64 },

    #[error("problem type '{label}' has inverted vertex range {min}..={max}")]
    InvalidVertexRange { label: String, min: u32, max: u32 },

    #[error("ema_alpha {0} is outside (0, 1]")]
    InvalidEmaAlpha(f64),

    #[error("type_weight_floor {0} must be positive and finite")]
    InvalidTypeWeightFloor(f64),

    #[error("failed to parse configuration: {details}")]
    ParseError { details: String },
}

impl CliqueNetError for ConfigurationError {}

//! Configuration for the CliqueNet validator core.
//!
//! Loaded from defaults, an optional TOML file, and
//! `CLIQUENET_VALIDATOR_`-prefixed environment variables, in that order.
//! `validate()` must pass before any component is constructed; a malformed
//! problem type table is fatal at startup.

use cliquenet_common::ConfigurationError;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Inclusive vertex-count range for a problem type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VertexRange {
    pub min: u32,
    pub max: u32,
}

/// Inclusive edge-count range for a problem type. Consumed by the external
/// problem generator; the round pipeline does not read it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeRange {
    pub min: u64,
    pub max: u64,
}

impl Default for EdgeRange {
    fn default() -> Self {
        Self {
            min: 0,
            max: 1_000_000_000,
        }
    }
}

/// One row of the problem type table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProblemType {
    /// Category tag, e.g. "general".
    pub label: String,

    /// Difficulty in [0, 1]. Drives both miner sampling and the final-score
    /// weighting.
    pub difficulty: f64,

    pub vertex_range: VertexRange,

    #[serde(default)]
    pub edge_range: EdgeRange,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Database URL, e.g. "sqlite:cliquenet-validator.db". The store must
    /// offer atomic conditional updates; problem claiming depends on it.
    pub url: String,

    /// Maximum number of connections in the pool
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite:cliquenet-validator.db".to_string(),
            max_connections: 5,
        }
    }
}

/// Per-round tunables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoundConfig {
    /// How long to wait for miner submissions before treating them as absent.
    pub dispatch_timeout_secs: u64,

    /// EMA smoothing factor for the reputation update.
    pub ema_alpha: f64,

    /// Blocks per epoch. Uids whose last weight-set is within this window
    /// are treated as active validators and excluded from the miner pool.
    pub epoch_length: u64,

    /// Appearance weight assigned to a problem type no miner can currently
    /// reach, instead of dividing by its zero expected reach.
    pub type_weight_floor: f64,

    /// Submissions with more vertices than this are rejected outright.
    pub max_submission_vertices: usize,
}

impl Default for RoundConfig {
    fn default() -> Self {
        Self {
            dispatch_timeout_secs: 30,
            ema_alpha: 0.01,
            epoch_length: 360,
            type_weight_floor: 1e-9,
            max_submission_vertices: 10_000,
        }
    }
}

/// Main configuration structure for the validator core.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidatorConfig {
    /// Database configuration
    pub database: DatabaseConfig,

    /// Per-round tunables
    pub round: RoundConfig,

    /// Problem type table. Fixed for the life of the process.
    pub problem_types: Vec<ProblemType>,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig::default(),
            round: RoundConfig::default(),
            problem_types: vec![
                ProblemType {
                    label: "general".to_string(),
                    difficulty: 0.1,
                    vertex_range: VertexRange { min: 90, max: 100 },
                    edge_range: EdgeRange::default(),
                },
                ProblemType {
                    label: "general".to_string(),
                    difficulty: 0.2,
                    vertex_range: VertexRange { min: 290, max: 300 },
                    edge_range: EdgeRange {
                        min: 100,
                        max: 1_000_000_000,
                    },
                },
                ProblemType {
                    label: "general".to_string(),
                    difficulty: 0.4,
                    vertex_range: VertexRange { min: 490, max: 500 },
                    edge_range: EdgeRange::default(),
                },
            ],
        }
    }
}

impl ValidatorConfig {
    /// Load configuration from file and environment
    pub fn load(path_override: Option<PathBuf>) -> Result<Self, ConfigurationError> {
        let default_config = ValidatorConfig::default();
        let mut figment = Figment::from(Serialized::defaults(default_config));

        if let Some(path) = path_override {
            if path.exists() {
                figment = figment.merge(Toml::file(&path));
            }
        } else {
            let default_path = PathBuf::from("cliquenet-validator.toml");
            if default_path.exists() {
                figment = figment.merge(Toml::file(default_path));
            }
        }

        figment = figment.merge(Env::prefixed("CLIQUENET_VALIDATOR_").split("__"));

        let config: ValidatorConfig =
            figment
                .extract()
                .map_err(|e| ConfigurationError::ParseError {
                    details: e.to_string(),
                })?;
        config.validate()?;
        Ok(config)
    }

    /// Reject malformed tables before any component is built.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.problem_types.is_empty() {
            return Err(ConfigurationError::EmptyProblemTable);
        }
        for problem_type in &self.problem_types {
            if !(0.0..=1.0).contains(&problem_type.difficulty) {
                return Err(ConfigurationError::InvalidDifficulty {
                    label: problem_type.label.clone(),
                    difficulty: problem_type.difficulty,
                });
            }
            if problem_type.vertex_range.min > problem_type.vertex_range.max {
                return Err(ConfigurationError::InvalidVertexRange {
                    label: problem_type.label.clone(),
                    min: problem_type.vertex_range.min,
                    max: problem_type.vertex_range.max,
                });
            }
        }
        if !(self.round.ema_alpha > 0.0 && self.round.ema_alpha <= 1.0) {
            return Err(ConfigurationError::InvalidEmaAlpha(self.round.ema_alpha));
        }
        if !(self.round.type_weight_floor > 0.0 && self.round.type_weight_floor.is_finite()) {
            return Err(ConfigurationError::InvalidTypeWeightFloor(
                self.round.type_weight_floor,
            ));
        }
        Ok(())
    }

    /// Generate example configuration file
    pub fn generate_example() -> Result<String, ConfigurationError> {
        let config = Self::default();
        toml::to_string_pretty(&config).map_err(|e| ConfigurationError::ParseError {
            details: format!("Failed to serialize config: {e}"),
        })
    }

    /// Get dispatch timeout as Duration
    pub fn dispatch_timeout(&self) -> Duration {
        Duration::from_secs(self.round.dispatch_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = ValidatorConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.problem_types.len(), 3);
        assert_eq!(config.round.ema_alpha, 0.01);
    }

    #[test]
    fn test_config_serialization() {
        let config = ValidatorConfig::default();
        let serialized = toml::to_string(&config).unwrap();
        let deserialized: ValidatorConfig = toml::from_str(&serialized).unwrap();

        assert_eq!(config.database.url, deserialized.database.url);
        assert_eq!(config.problem_types, deserialized.problem_types);
    }

    #[test]
    fn test_difficulty_out_of_range_rejected() {
        let mut config = ValidatorConfig::default();
        config.problem_types[0].difficulty = 1.5;
        assert!(matches!(
            config.validate(),
            Err(ConfigurationError::InvalidDifficulty { .. })
        ));
    }

    #[test]
    fn test_empty_table_rejected() {
        let mut config = ValidatorConfig::default();
        config.problem_types.clear();
        assert!(matches!(
            config.validate(),
            Err(ConfigurationError::EmptyProblemTable)
        ));
    }

    #[test]
    fn test_inverted_vertex_range_rejected() {
        let mut config = ValidatorConfig::default();
        config.problem_types[0].vertex_range = VertexRange { min: 100, max: 90 };
        assert!(matches!(
            config.validate(),
            Err(ConfigurationError::InvalidVertexRange { .. })
        ));
    }

    #[test]
    fn test_bad_alpha_rejected() {
        let mut config = ValidatorConfig::default();
        config.round.ema_alpha = 0.0;
        assert!(matches!(
            config.validate(),
            Err(ConfigurationError::InvalidEmaAlpha(_))
        ));
    }

    #[test]
    fn test_generate_example_parses_back() {
        let example = ValidatorConfig::generate_example().unwrap();
        let parsed: ValidatorConfig = toml::from_str(&example).unwrap();
        assert!(parsed.validate().is_ok());
    }
}

//! # CliqueNet Validator
//!
//! Allocation-and-incentive core for the CliqueNet network: distributes
//! maximum-clique problems from a shared pool to stake-sampled miners,
//! scores their solutions, and folds scores into a persistent debiased-EMA
//! reputation.
//!
//! Transport, the ledger feed, and process supervision live outside this
//! crate; they plug in through [`round::SolutionTransport`], the
//! [`stake::StakeSnapshot`] input, and the embedding process respectively.

pub mod config;
pub mod experience;
pub mod persistence;
pub mod reputation;
pub mod round;
pub mod scoring;
pub mod selection;
pub mod stake;
pub mod telemetry;

// Main public API exports
pub use config::{ProblemType, RoundConfig, ValidatorConfig};
pub use persistence::{CatalogError, MinerRating, Persistence, Problem, ProblemCatalog, RatingRepository};
pub use reputation::ReputationTracker;
pub use round::{RoundOutcome, RoundRunner, SkipReason, SolutionTransport};
pub use scoring::{CliqueScorer, ScoreRecord};
pub use selection::{MinerSampler, TypeSelector};
pub use stake::{LedgerEntry, StakeSnapshot};
pub use telemetry::RoundTelemetry;

/// Re-export common error types
pub use cliquenet_common::error::{CliqueNetError, ConfigurationError};

/// Validator library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

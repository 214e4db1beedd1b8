//! Solution scoring: optimality and diversity over one round's submissions.

pub mod clique_scoring;

pub use clique_scoring::{CliqueScorer, ScoreRecord};

//! # CliqueNet Common
//!
//! Shared types for the CliqueNet network: miner identity, the problem
//! graph model, and the common error taxonomy.

pub mod error;
pub mod graph;
pub mod identity;

pub use error::{CliqueNetError, ConfigurationError};
pub use graph::ProblemGraph;
pub use identity::{Coldkey, Hotkey, MinerUid};

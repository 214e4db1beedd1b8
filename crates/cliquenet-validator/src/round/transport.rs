//! Transport seam between the round runner and the network layer.
//!
//! Dispatching problems and collecting answers is an external concern; the
//! core only requires that a submission is either received within the
//! timeout or treated as absent.

use async_trait::async_trait;
use cliquenet_common::{Hotkey, MinerUid, ProblemGraph};
use serde::Serialize;
use std::collections::HashMap;
use std::time::Duration;

/// The dispatched view of a claimed problem: vertices relabeled by the
/// round's shuffle, neighbor rows sorted.
#[derive(Debug, Clone, Serialize)]
pub struct ShuffledProblem {
    pub id: String,
    pub difficulty: f64,
    pub graph: ProblemGraph,
}

/// One miner in the distribution set.
#[derive(Debug, Clone)]
pub struct InvitedMiner {
    pub uid: MinerUid,
    pub hotkey: Hotkey,
}

/// Sends one problem to the invited miners and collects their submissions.
#[async_trait]
pub trait SolutionTransport: Send + Sync {
    /// The returned vector must be index-aligned with `invited`. A miner
    /// that does not answer within `timeout`, or whose answer the transport
    /// cannot decode, is `None`.
    async fn collect(
        &self,
        problem: &ShuffledProblem,
        invited: &[InvitedMiner],
        timeout: Duration,
    ) -> anyhow::Result<Vec<Option<Vec<u32>>>>;
}

/// Canned transport answering from a fixed uid -> vertices table. Used in
/// tests and local experiments; miners not in the table never respond.
#[derive(Debug, Default, Clone)]
pub struct StaticTransport {
    responses: HashMap<u16, Vec<u32>>,
}

impl StaticTransport {
    pub fn new(responses: HashMap<u16, Vec<u32>>) -> Self {
        Self { responses }
    }
}

#[async_trait]
impl SolutionTransport for StaticTransport {
    async fn collect(
        &self,
        _problem: &ShuffledProblem,
        invited: &[InvitedMiner],
        _timeout: Duration,
    ) -> anyhow::Result<Vec<Option<Vec<u32>>>> {
        Ok(invited
            .iter()
            .map(|miner| self.responses.get(&miner.uid.as_u16()).cloned())
            .collect())
    }
}

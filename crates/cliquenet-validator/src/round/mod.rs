//! Per-round orchestration of the allocation and scoring pipeline.
//!
//! One round: experience from the stake snapshot, type draw, catalog claim,
//! shuffle, Bernoulli sampling, dispatch/collect, scoring, reputation
//! update, telemetry. The snapshot is immutable for the round's duration;
//! the catalog claim is the only touch on cross-process shared state.
//!
//! Per-round anomalies (nobody to invite, pool exhausted, transport down)
//! degrade to a logged skip or zero scores. A bad round never takes the
//! coordinator down.

pub mod transport;

pub use transport::{InvitedMiner, ShuffledProblem, SolutionTransport, StaticTransport};

use crate::config::ValidatorConfig;
use crate::experience::experience_scores;
use crate::persistence::{CatalogError, ProblemCatalog};
use crate::reputation::ReputationTracker;
use crate::scoring::CliqueScorer;
use crate::selection::{MinerSampler, TypeSelector};
use crate::stake::StakeSnapshot;
use crate::telemetry::RoundTelemetry;
use anyhow::Result;
use chrono::Utc;
use cliquenet_common::{Hotkey, MinerUid};
use rand::Rng;
use std::collections::HashSet;
use std::time::Instant;
use tracing::{info, warn};
use uuid::Uuid;

/// Why a round ended without producing scores.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The snapshot contains no miners.
    NoMiners,
    /// Every configured problem type is exhausted in the shared pool.
    CatalogExhausted,
    /// The Bernoulli draw invited nobody. The claimed problem is still
    /// consumed; there is no claim rollback.
    NobodyInvited,
}

pub enum RoundOutcome {
    Completed(Box<RoundTelemetry>),
    Skipped(SkipReason),
}

/// Drives one distribution round at a time over a shared catalog and a
/// per-coordinator reputation store.
pub struct RoundRunner<T> {
    config: ValidatorConfig,
    catalog: ProblemCatalog,
    reputation: ReputationTracker,
    transport: T,
    validator_hotkey: Hotkey,
}

impl<T: SolutionTransport> RoundRunner<T> {
    pub fn new(
        config: ValidatorConfig,
        catalog: ProblemCatalog,
        reputation: ReputationTracker,
        transport: T,
        validator_hotkey: Hotkey,
    ) -> Self {
        Self {
            config,
            catalog,
            reputation,
            transport,
            validator_hotkey,
        }
    }

    pub fn reputation(&self) -> &ReputationTracker {
        &self.reputation
    }

    /// Run one round against an immutable stake snapshot.
    ///
    /// Errors escape only for faults that invalidate the coordinator
    /// itself (database unavailable); everything round-scoped degrades.
    pub async fn run_round<R: Rng + ?Sized>(
        &mut self,
        snapshot: &StakeSnapshot,
        rng: &mut R,
    ) -> Result<RoundOutcome> {
        let round_id = Uuid::new_v4().to_string();
        let started = Instant::now();
        info!(round_id = %round_id, miners = snapshot.len(), "round started");

        let registrations: Vec<(MinerUid, Hotkey)> = snapshot
            .miners
            .iter()
            .map(|m| (m.uid, m.hotkey.clone()))
            .collect();
        self.reputation.sync_registrations(&registrations).await?;

        if snapshot.is_empty() {
            warn!(round_id = %round_id, "no miners in snapshot, skipping round");
            return Ok(RoundOutcome::Skipped(SkipReason::NoMiners));
        }

        let alpha_stakes = snapshot.alpha_stakes();
        let mut sampler = MinerSampler::new(experience_scores(&alpha_stakes));
        let selector = TypeSelector::new(
            &self.config.problem_types,
            self.config.round.type_weight_floor,
        );

        // Draw a type and claim a problem of it; an exhausted type is
        // excluded and the draw repeated over the rest.
        let mut exhausted = HashSet::new();
        let problem = loop {
            let Some(type_index) = selector.draw(&mut sampler, &exhausted, rng) else {
                warn!(round_id = %round_id, "all problem types exhausted, skipping round");
                return Ok(RoundOutcome::Skipped(SkipReason::CatalogExhausted));
            };
            let problem_type = &self.config.problem_types[type_index];
            match self
                .catalog
                .claim(
                    &problem_type.label,
                    problem_type.difficulty,
                    self.validator_hotkey.as_str(),
                )
                .await
            {
                Ok(problem) => break problem,
                Err(CatalogError::NotFound { .. }) => {
                    warn!(
                        round_id = %round_id,
                        label = %problem_type.label,
                        difficulty = problem_type.difficulty,
                        "problem type exhausted, resampling"
                    );
                    exhausted.insert(type_index);
                }
                Err(e) => return Err(e.into()),
            }
        };

        let (shuffled_graph, _vertex_map) = problem.graph.shuffled(rng);
        let shuffled = ShuffledProblem {
            id: problem.id.clone(),
            difficulty: problem.difficulty,
            graph: shuffled_graph,
        };

        let selected = sampler.sample(problem.difficulty, rng);
        if selected.is_empty() {
            warn!(
                round_id = %round_id,
                problem_id = %problem.id,
                "nobody invited; the claimed problem is consumed without scores"
            );
            return Ok(RoundOutcome::Skipped(SkipReason::NobodyInvited));
        }

        let invited: Vec<InvitedMiner> = selected
            .iter()
            .map(|&i| {
                let miner = &snapshot.miners[i];
                InvitedMiner {
                    uid: miner.uid,
                    hotkey: miner.hotkey.clone(),
                }
            })
            .collect();
        info!(
            round_id = %round_id,
            problem_id = %problem.id,
            difficulty = problem.difficulty,
            invited = invited.len(),
            "dispatching problem"
        );

        let timeout = self.config.dispatch_timeout();
        let submissions = match self.transport.collect(&shuffled, &invited, timeout).await {
            Ok(submissions) if submissions.len() == invited.len() => submissions,
            Ok(submissions) => {
                warn!(
                    round_id = %round_id,
                    expected = invited.len(),
                    received = submissions.len(),
                    "transport returned misaligned submissions, treating all as absent"
                );
                vec![None; invited.len()]
            }
            Err(e) => {
                warn!(
                    round_id = %round_id,
                    error = %e,
                    "transport failed, treating all submissions as absent"
                );
                vec![None; invited.len()]
            }
        };

        let scorer = CliqueScorer::new(
            &shuffled.graph,
            problem.difficulty,
            self.config.round.max_submission_vertices,
        );
        let records = scorer.score(&submissions);

        for (miner, record) in invited.iter().zip(&records) {
            self.reputation
                .record_score(miner.uid, &miner.hotkey, record.final_score)
                .await?;
        }

        let telemetry = RoundTelemetry {
            round_id: round_id.clone(),
            timestamp: Utc::now(),
            problem_id: problem.id,
            label: shuffled.graph.label.clone(),
            difficulty: problem.difficulty,
            number_of_nodes: shuffled.graph.number_of_nodes,
            adjacency_list: shuffled.graph.adjacency_list,
            miner_uids: invited.iter().map(|m| m.uid.as_u16()).collect(),
            miner_hotkeys: invited.iter().map(|m| m.hotkey.to_string()).collect(),
            miner_coldkeys: selected
                .iter()
                .map(|&i| snapshot.miners[i].coldkey.to_string())
                .collect(),
            miner_submissions: submissions
                .into_iter()
                .map(Option::unwrap_or_default)
                .collect(),
            miner_rel: records.iter().map(|r| r.rel).collect(),
            miner_pr: records.iter().map(|r| r.pr).collect(),
            miner_optimality: records.iter().map(|r| r.optimality).collect(),
            miner_omega_normalized: records.iter().map(|r| r.omega_normalized).collect(),
            miner_diversity_normalized: records
                .iter()
                .map(|r| r.diversity_normalized)
                .collect(),
            miner_final_scores: records.iter().map(|r| r.final_score).collect(),
        };

        info!(
            round_id = %round_id,
            scored = telemetry.miner_uids.len(),
            duration_ms = started.elapsed().as_millis() as u64,
            "round completed"
        );
        Ok(RoundOutcome::Completed(Box::new(telemetry)))
    }
}

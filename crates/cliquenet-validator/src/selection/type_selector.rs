//! Difficulty-type draw with inverse expected-reach weighting.
//!
//! A type's raw appearance weight is the reciprocal of the number of miners
//! it is expected to reach under the sampler's inclusion formula, so types
//! that would reach few miners are boosted rather than starved.

use crate::config::ProblemType;
use crate::selection::MinerSampler;
use rand::distributions::{Distribution, WeightedIndex};
use rand::Rng;
use std::collections::HashSet;
use tracing::{debug, warn};

pub struct TypeSelector<'a> {
    types: &'a [ProblemType],
    /// Weight used when a type's expected reach is zero (no miner can be
    /// sampled for it), instead of dividing by zero.
    floor: f64,
}

impl<'a> TypeSelector<'a> {
    pub fn new(types: &'a [ProblemType], floor: f64) -> Self {
        Self { types, floor }
    }

    /// Normalized appearance probabilities, aligned with the type table.
    pub fn appearance_probabilities(&self, sampler: &mut MinerSampler) -> Vec<f64> {
        let raw: Vec<f64> = self
            .types
            .iter()
            .map(|problem_type| {
                let expected = sampler.expected_reach(problem_type.difficulty);
                if expected > 0.0 {
                    1.0 / expected
                } else {
                    warn!(
                        label = %problem_type.label,
                        difficulty = problem_type.difficulty,
                        "no miner can currently reach this type, using floor weight"
                    );
                    self.floor
                }
            })
            .collect();

        let total: f64 = raw.iter().sum();
        raw.into_iter().map(|w| w / total).collect()
    }

    /// Draw one type index from the categorical distribution, skipping
    /// `exhausted` entries. Returns `None` once every type is exhausted.
    pub fn draw<R: Rng + ?Sized>(
        &self,
        sampler: &mut MinerSampler,
        exhausted: &HashSet<usize>,
        rng: &mut R,
    ) -> Option<usize> {
        let probabilities = self.appearance_probabilities(sampler);
        let candidates: Vec<usize> = (0..self.types.len())
            .filter(|i| !exhausted.contains(i))
            .collect();
        if candidates.is_empty() {
            return None;
        }

        let weights: Vec<f64> = candidates.iter().map(|&i| probabilities[i]).collect();
        // Weights are bounded below by the normalized floor, so the
        // distribution is always constructible for a non-empty candidate set.
        let distribution = WeightedIndex::new(&weights).ok()?;
        let chosen = candidates[distribution.sample(rng)];

        debug!(
            label = %self.types[chosen].label,
            difficulty = self.types[chosen].difficulty,
            probability = probabilities[chosen],
            "drew problem type"
        );
        Some(chosen)
    }
}

//! Stake-weighted Bernoulli sampling of the distribution set.
//!
//! Each miner is included independently with probability
//! `P = 1 - e^(-max(0, x - d - 0.5))`. Below the threshold `x = d + 0.5`
//! the probability is identically zero: low-experience miners are
//! structurally excluded from hard problems, not merely disadvantaged.

use rand::Rng;
use std::collections::HashMap;
use tracing::debug;

/// Per-miner inclusion probability for a problem of the given difficulty.
pub fn inclusion_probability(experience: f64, difficulty: f64) -> f64 {
    let delta = experience - difficulty - 0.5;
    if delta <= 0.0 {
        0.0
    } else {
        1.0 - (-delta).exp()
    }
}

/// Samples distribution sets from a fixed per-round experience vector.
///
/// Probability vectors are cached per difficulty; the experience vector is
/// immutable for the round, and the type selector probes every configured
/// difficulty before a single problem is drawn.
pub struct MinerSampler {
    experience: Vec<f64>,
    weights_cache: HashMap<u64, Vec<f64>>,
}

impl MinerSampler {
    pub fn new(experience: Vec<f64>) -> Self {
        Self {
            experience,
            weights_cache: HashMap::new(),
        }
    }

    pub fn miner_count(&self) -> usize {
        self.experience.len()
    }

    /// Inclusion probabilities for every miner at this difficulty, aligned
    /// with the experience vector.
    pub fn inclusion_probabilities(&mut self, difficulty: f64) -> &[f64] {
        self.weights_cache
            .entry(difficulty.to_bits())
            .or_insert_with(|| {
                self.experience
                    .iter()
                    .map(|&x| inclusion_probability(x, difficulty))
                    .collect()
            })
    }

    /// Expected size of the distribution set at this difficulty.
    pub fn expected_reach(&mut self, difficulty: f64) -> f64 {
        self.inclusion_probabilities(difficulty).iter().sum()
    }

    /// One independent Bernoulli trial per miner. Returns indices into the
    /// experience vector; the set may be empty.
    pub fn sample<R: Rng + ?Sized>(&mut self, difficulty: f64, rng: &mut R) -> Vec<usize> {
        let probabilities = self.inclusion_probabilities(difficulty).to_vec();
        let selected: Vec<usize> = probabilities
            .iter()
            .enumerate()
            .filter(|(_, &p)| p > 0.0 && rng.gen::<f64>() < p)
            .map(|(i, _)| i)
            .collect();

        debug!(
            difficulty = difficulty,
            candidates = probabilities.len(),
            selected = selected.len(),
            "sampled distribution set"
        );
        selected
    }
}

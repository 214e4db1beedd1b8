//! Experience model: dimensionless miner experience from alpha stake.

/// `x(m) = sqrt(1 + s_m / mean(s))`.
///
/// When every miner has zero stake the mean is zero; the formula is then
/// defined to be 1 for all miners. The division by zero must be intercepted
/// here, it is not a natural limit of the formula.
pub fn experience_scores(alpha_stakes: &[f64]) -> Vec<f64> {
    if alpha_stakes.is_empty() {
        return Vec::new();
    }

    let mean = alpha_stakes.iter().sum::<f64>() / alpha_stakes.len() as f64;
    if mean == 0.0 {
        return vec![1.0; alpha_stakes.len()];
    }

    alpha_stakes
        .iter()
        .map(|&stake| (1.0 + stake / mean).sqrt())
        .collect()
}

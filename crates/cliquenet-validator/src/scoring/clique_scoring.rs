//! Maximal-clique validation and the multi-metric round score.
//!
//! Submissions come from untrusted miners: malformed, missing or oversized
//! answers are an expected case and score zero, they are never an error.
//! All normalization denominators are guarded explicitly; a round with no
//! valid solutions produces all-zero scores, not NaN.

use cliquenet_common::ProblemGraph;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// Scores for one invited miner in one round.
///
/// `optimality` is the raw omega before round-max normalization; the
/// normalized values are what enter the final score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScoreRecord {
    pub rel: f64,
    pub pr: f64,
    pub optimality: f64,
    pub omega_normalized: f64,
    pub diversity_normalized: f64,
    pub final_score: f64,
}

impl ScoreRecord {
    fn zero() -> Self {
        Self {
            rel: 0.0,
            pr: 0.0,
            optimality: 0.0,
            omega_normalized: 0.0,
            diversity_normalized: 0.0,
            final_score: 0.0,
        }
    }
}

/// Scores one round's submissions against a (shuffled) problem graph.
pub struct CliqueScorer<'a> {
    graph: &'a ProblemGraph,
    difficulty: f64,
    max_submission_vertices: usize,
    neighbor_sets: Vec<HashSet<u32>>,
}

impl<'a> CliqueScorer<'a> {
    pub fn new(graph: &'a ProblemGraph, difficulty: f64, max_submission_vertices: usize) -> Self {
        let neighbor_sets = graph
            .adjacency_list
            .iter()
            .map(|row| row.iter().copied().collect())
            .collect();
        Self {
            graph,
            difficulty,
            max_submission_vertices,
            neighbor_sets,
        }
    }

    /// True iff the vertices form a maximal clique in the graph.
    ///
    /// Structural checks first (non-empty, no duplicates, all in range),
    /// then pairwise adjacency, then maximality: no outside vertex may be
    /// adjacent to every member.
    pub fn is_valid_maximal_clique(&self, vertices: &[u32]) -> bool {
        if vertices.is_empty() || vertices.len() > self.max_submission_vertices {
            return false;
        }

        let vertex_set: HashSet<u32> = vertices.iter().copied().collect();
        if vertex_set.len() != vertices.len() {
            return false;
        }
        if vertices.iter().any(|&v| v >= self.graph.number_of_nodes) {
            return false;
        }

        for (i, &u) in vertices.iter().enumerate() {
            for &v in &vertices[i + 1..] {
                if !self.neighbor_sets[u as usize].contains(&v) {
                    return false;
                }
            }
        }

        for candidate in 0..self.graph.number_of_nodes {
            if vertex_set.contains(&candidate) {
                continue;
            }
            let neighbors = &self.neighbor_sets[candidate as usize];
            if vertex_set.iter().all(|v| neighbors.contains(v)) {
                return false; // extendable, so not maximal
            }
        }

        true
    }

    /// Score the round. `submissions` is index-aligned with the invitation
    /// list; `None` is a miner that did not answer in time.
    pub fn score(&self, submissions: &[Option<Vec<u32>>]) -> Vec<ScoreRecord> {
        let count = submissions.len();
        if count == 0 {
            return Vec::new();
        }

        let empty: Vec<u32> = Vec::new();
        let answers: Vec<&[u32]> = submissions
            .iter()
            .map(|s| s.as_deref().unwrap_or(&empty))
            .collect();

        let valid: Vec<bool> = answers
            .iter()
            .map(|a| self.is_valid_maximal_clique(a))
            .collect();
        // Size only counts for valid submissions; an invalid answer of any
        // length competes as zero.
        let sizes: Vec<usize> = answers
            .iter()
            .zip(&valid)
            .map(|(a, &v)| if v { a.len() } else { 0 })
            .collect();
        let max_size = sizes.iter().copied().max().unwrap_or(0);

        let rel: Vec<f64> = if max_size == 0 {
            vec![0.0; count]
        } else {
            sizes.iter().map(|&s| s as f64 / max_size as f64).collect()
        };
        let pr: Vec<f64> = sizes
            .iter()
            .map(|&s| sizes.iter().filter(|&&other| other > s).count() as f64 / count as f64)
            .collect();

        let omega: Vec<f64> = valid
            .iter()
            .zip(rel.iter().zip(&pr))
            .map(|(&v, (&rel_m, &pr_m))| {
                let val = if v { 1.0 } else { 0.0 };
                if rel_m == 0.0 {
                    // Degenerate round: everyone at size zero means pr is
                    // zero too and omega falls back to val; a zero-size
                    // entry in a live round is simply non-competitive.
                    if pr_m == 0.0 {
                        val
                    } else {
                        0.0
                    }
                } else {
                    val * (-pr_m / rel_m).exp()
                }
            })
            .collect();

        // Exact set-equality clustering: a solution identical to k others
        // (itself included) carries uniqueness weight 1/k.
        let canonical: Vec<Vec<u32>> = answers
            .iter()
            .map(|a| {
                let mut sorted = a.to_vec();
                sorted.sort_unstable();
                sorted
            })
            .collect();
        let mut cluster_sizes: HashMap<&[u32], usize> = HashMap::new();
        for form in &canonical {
            *cluster_sizes.entry(form.as_slice()).or_insert(0) += 1;
        }
        let delta: Vec<f64> = canonical
            .iter()
            .zip(&valid)
            .map(|(form, &v)| {
                let val = if v { 1.0 } else { 0.0 };
                val / cluster_sizes[form.as_slice()] as f64
            })
            .collect();

        let omega_normalized = normalize_by_max(&omega);
        let diversity_normalized = normalize_by_max(&delta);

        let records: Vec<ScoreRecord> = (0..count)
            .map(|i| ScoreRecord {
                rel: rel[i],
                pr: pr[i],
                optimality: omega[i],
                omega_normalized: omega_normalized[i],
                diversity_normalized: diversity_normalized[i],
                final_score: omega_normalized[i] * (1.0 + self.difficulty)
                    + diversity_normalized[i],
            })
            .collect();

        debug!(
            submissions = count,
            valid = valid.iter().filter(|&&v| v).count(),
            max_size = max_size,
            difficulty = self.difficulty,
            "scored round"
        );
        records
    }
}

/// Divide by the maximum, or return all zeros when the maximum is zero.
fn normalize_by_max(values: &[f64]) -> Vec<f64> {
    let max = values.iter().copied().fold(0.0_f64, f64::max);
    if max == 0.0 {
        vec![0.0; values.len()]
    } else {
        values.iter().map(|&v| v / max).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Two disjoint triangles {0,1,2} and {3,4,5} plus an edge 2-3 and an
    /// isolated vertex 6.
    fn two_triangles() -> ProblemGraph {
        ProblemGraph::new(
            "g",
            "general",
            7,
            vec![
                vec![1, 2],
                vec![0, 2],
                vec![0, 1, 3],
                vec![2, 4, 5],
                vec![3, 5],
                vec![3, 4],
                vec![],
            ],
        )
    }

    /// Complete graph on five vertices with a sixth pendant vertex attached
    /// to vertex 0, so {0..4} is the unique maximum clique.
    fn k5_plus_pendant() -> ProblemGraph {
        let mut adjacency: Vec<Vec<u32>> = (0..5u32)
            .map(|u| (0..5u32).filter(|&v| v != u).collect())
            .collect();
        adjacency[0].push(5);
        adjacency.push(vec![0]);
        ProblemGraph::new("g", "general", 6, adjacency)
    }

    fn scorer(graph: &ProblemGraph) -> CliqueScorer<'_> {
        CliqueScorer::new(graph, 0.4, 10_000)
    }

    #[test]
    fn test_clique_validation() {
        let graph = two_triangles();
        let scorer = scorer(&graph);

        assert!(scorer.is_valid_maximal_clique(&[0, 1, 2]));
        assert!(scorer.is_valid_maximal_clique(&[3, 4, 5]));
        // A clique, but extendable by vertex 2.
        assert!(!scorer.is_valid_maximal_clique(&[0, 1]));
        // Not a clique at all.
        assert!(!scorer.is_valid_maximal_clique(&[0, 3]));
        // The isolated vertex is itself a maximal clique of size one.
        assert!(scorer.is_valid_maximal_clique(&[6]));
    }

    #[test]
    fn test_structural_rejections() {
        let graph = two_triangles();
        let scorer = scorer(&graph);

        assert!(!scorer.is_valid_maximal_clique(&[]));
        assert!(!scorer.is_valid_maximal_clique(&[0, 1, 1, 2])); // duplicate
        assert!(!scorer.is_valid_maximal_clique(&[0, 1, 99])); // out of range

        let capped = CliqueScorer::new(&graph, 0.4, 2);
        assert!(!capped.is_valid_maximal_clique(&[0, 1, 2])); // over the cap
    }

    #[test]
    fn test_identical_submissions_split_uniqueness() {
        // Two miners return the same valid maximum clique of size 5, the
        // third returns nothing: the twins each get unq = 1/2, the
        // non-submitter gets val = 0 and zero diversity.
        let graph = k5_plus_pendant();
        let scorer = scorer(&graph);

        let clique: Vec<u32> = vec![4, 0, 2, 1, 3]; // unordered on purpose
        let records = scorer.score(&[
            Some(clique.clone()),
            Some(clique),
            None,
        ]);

        assert_eq!(records[0].rel, 1.0);
        assert_eq!(records[0].pr, 0.0);
        assert_eq!(records[0].optimality, 1.0);
        assert_eq!(records[0].omega_normalized, 1.0);
        // delta = 1/2 for both twins; round max is 1/2 so normalized is 1.
        assert_eq!(records[0].diversity_normalized, 1.0);
        assert_eq!(records[0], records[1]);

        // The non-submitter is outranked by both twins but scores zero.
        assert_eq!(records[2].rel, 0.0);
        assert!((records[2].pr - 2.0 / 3.0).abs() < 1e-12);
        assert_eq!(records[2].optimality, 0.0);
        assert_eq!(records[2].diversity_normalized, 0.0);
        assert_eq!(records[2].final_score, 0.0);

        // final = omega_n * (1 + 0.4) + delta_n
        assert!((records[0].final_score - 2.4).abs() < 1e-12);
    }

    #[test]
    fn test_diversity_rewards_distinct_solutions() {
        // Both triangles are maximal cliques of size 3; one is submitted
        // twice, the other once. The unique submission gets full
        // diversity, the twins half.
        let graph = two_triangles();
        let scorer = scorer(&graph);

        let records = scorer.score(&[
            Some(vec![0, 1, 2]),
            Some(vec![2, 0, 1]),
            Some(vec![3, 4, 5]),
        ]);

        // All equally sized and valid: identical optimality.
        for record in &records {
            assert_eq!(record.rel, 1.0);
            assert_eq!(record.pr, 0.0);
            assert_eq!(record.omega_normalized, 1.0);
        }
        assert_eq!(records[2].diversity_normalized, 1.0);
        assert_eq!(records[0].diversity_normalized, 0.5);
        assert_eq!(records[1].diversity_normalized, 0.5);
        assert!(records[2].final_score > records[0].final_score);
    }

    #[test]
    fn test_all_invalid_round_is_all_zeros() {
        let graph = two_triangles();
        let scorer = scorer(&graph);

        let records = scorer.score(&[
            Some(vec![0, 3]), // not a clique
            Some(vec![]),     // empty
            None,             // absent
        ]);

        for record in &records {
            assert_eq!(*record, ScoreRecord::zero());
            assert!(record.final_score.is_finite());
        }
    }

    #[test]
    fn test_smaller_valid_clique_is_penalized_not_zeroed() {
        let graph = k5_plus_pendant();
        let scorer = scorer(&graph);

        let records = scorer.score(&[
            Some(vec![0, 1, 2, 3, 4]), // maximum clique, size 5
            Some(vec![0, 5]),          // maximal clique, size 2
        ]);

        assert_eq!(records[0].rel, 1.0);
        assert_eq!(records[0].pr, 0.0);
        assert_eq!(records[0].optimality, 1.0);

        assert_eq!(records[1].rel, 0.4);
        assert_eq!(records[1].pr, 0.5);
        let expected_omega = (-0.5_f64 / 0.4).exp();
        assert!((records[1].optimality - expected_omega).abs() < 1e-12);
        assert!(records[1].final_score > 0.0);
        assert!(records[1].final_score < records[0].final_score);
    }

    #[test]
    fn test_invalid_large_submission_does_not_set_the_bar() {
        // An invalid ten-vertex answer must not inflate max size: the valid
        // small clique still normalizes against valid sizes only.
        let graph = two_triangles();
        let scorer = scorer(&graph);

        let records = scorer.score(&[
            Some(vec![0, 1, 2, 3, 4, 5, 6, 0, 1, 2]), // duplicates, invalid
            Some(vec![6]),
        ]);

        assert_eq!(records[0].optimality, 0.0);
        assert_eq!(records[1].rel, 1.0);
        assert_eq!(records[1].optimality, 1.0);
    }

    #[test]
    fn test_empty_round() {
        let graph = two_triangles();
        let scorer = scorer(&graph);
        assert!(scorer.score(&[]).is_empty());
    }
}

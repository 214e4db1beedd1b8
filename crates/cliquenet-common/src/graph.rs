//! Problem graph model.
//!
//! A problem is an undirected graph delivered as an adjacency list. Before
//! dispatch the validator relabels the vertices with a random permutation so
//! miners cannot pattern-match problems they have seen before; scoring runs
//! against the shuffled labels.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// An undirected graph drawn from the shared problem pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProblemGraph {
    pub uuid: String,
    pub label: String,
    pub number_of_nodes: u32,
    pub adjacency_list: Vec<Vec<u32>>,
}

impl ProblemGraph {
    pub fn new(
        uuid: impl Into<String>,
        label: impl Into<String>,
        number_of_nodes: u32,
        adjacency_list: Vec<Vec<u32>>,
    ) -> Self {
        Self {
            uuid: uuid.into(),
            label: label.into(),
            number_of_nodes,
            adjacency_list,
        }
    }

    /// Number of undirected edges. Each edge appears in two adjacency rows.
    pub fn edge_count(&self) -> usize {
        self.adjacency_list.iter().map(Vec::len).sum::<usize>() / 2
    }

    pub fn neighbors(&self, vertex: u32) -> &[u32] {
        self.adjacency_list
            .get(vertex as usize)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Structural sanity check on an imported adjacency list: one row per
    /// vertex, every neighbor in range, no self loops.
    pub fn is_well_formed(&self) -> bool {
        if self.adjacency_list.len() != self.number_of_nodes as usize {
            return false;
        }
        for (u, row) in self.adjacency_list.iter().enumerate() {
            for &v in row {
                if v >= self.number_of_nodes || v as usize == u {
                    return false;
                }
            }
        }
        true
    }

    /// Relabel the vertices with a random permutation.
    ///
    /// Returns the shuffled graph and the permutation applied, as a map from
    /// old vertex id to new vertex id. Neighbor rows in the shuffled graph
    /// are sorted ascending.
    pub fn shuffled<R: Rng + ?Sized>(&self, rng: &mut R) -> (ProblemGraph, Vec<u32>) {
        let n = self.number_of_nodes as usize;
        let mut vertex_map: Vec<u32> = (0..self.number_of_nodes).collect();
        vertex_map.shuffle(rng);

        let mut new_adjacency = vec![Vec::new(); n];
        for (old_u, row) in self.adjacency_list.iter().enumerate() {
            let new_u = vertex_map[old_u] as usize;
            let mut mapped: Vec<u32> = row.iter().map(|&v| vertex_map[v as usize]).collect();
            mapped.sort_unstable();
            new_adjacency[new_u] = mapped;
        }

        let shuffled = ProblemGraph {
            uuid: self.uuid.clone(),
            label: self.label.clone(),
            number_of_nodes: self.number_of_nodes,
            adjacency_list: new_adjacency,
        };
        (shuffled, vertex_map)
    }
}

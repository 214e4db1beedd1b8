//! Structured per-round telemetry record.
//!
//! One record per completed round, handed to whatever sink the embedding
//! process wires up. The per-miner vectors are index-aligned: entry `i` of
//! every list describes the same invited miner.

use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct RoundTelemetry {
    pub round_id: String,
    pub timestamp: DateTime<Utc>,

    // Problem attributes, as dispatched (shuffled labels).
    pub problem_id: String,
    pub label: String,
    pub difficulty: f64,
    pub number_of_nodes: u32,
    pub adjacency_list: Vec<Vec<u32>>,

    // Per-invited-miner lists. An absent submission is recorded as an
    // empty vertex set.
    pub miner_uids: Vec<u16>,
    pub miner_hotkeys: Vec<String>,
    pub miner_coldkeys: Vec<String>,
    pub miner_submissions: Vec<Vec<u32>>,
    pub miner_rel: Vec<f64>,
    pub miner_pr: Vec<f64>,
    pub miner_optimality: Vec<f64>,
    pub miner_omega_normalized: Vec<f64>,
    pub miner_diversity_normalized: Vec<f64>,
    pub miner_final_scores: Vec<f64>,
}

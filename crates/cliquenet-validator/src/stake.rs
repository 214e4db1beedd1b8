//! Ledger stake snapshot and alpha-stake aggregation.
//!
//! Stake facts arrive from the external ledger feed on its own cadence.
//! A round operates on one immutable [`StakeSnapshot`]; nothing here talks
//! to the chain.

use cliquenet_common::{Coldkey, Hotkey, MinerUid};
use std::collections::HashMap;
use tracing::debug;

/// Raw ledger facts for one registered hotkey, as reported by the feed.
#[derive(Debug, Clone)]
pub struct LedgerEntry {
    pub uid: MinerUid,
    pub hotkey: Hotkey,
    pub coldkey: Coldkey,
    /// Stake the coldkey has placed on this hotkey.
    pub stake_on_miner: f64,
    /// Stake the coldkey has placed on this coordinator's own hotkey.
    pub stake_on_validator: f64,
    /// Block at which this uid last set weights on chain.
    pub last_update_block: u64,
}

/// Immutable per-round view of the miner population.
///
/// Built from the ledger feed with active validators filtered out: a uid
/// that set weights within the last `epoch_length` blocks is a validator,
/// not a miner.
#[derive(Debug, Clone)]
pub struct StakeSnapshot {
    pub block: u64,
    pub miners: Vec<LedgerEntry>,
}

impl StakeSnapshot {
    pub fn from_ledger(block: u64, epoch_length: u64, entries: Vec<LedgerEntry>) -> Self {
        let total = entries.len();
        let miners: Vec<LedgerEntry> = entries
            .into_iter()
            .filter(|e| block.saturating_sub(e.last_update_block) > epoch_length)
            .collect();
        debug!(
            block = block,
            total_neurons = total,
            miners = miners.len(),
            "built stake snapshot"
        );
        Self { block, miners }
    }

    pub fn len(&self) -> usize {
        self.miners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.miners.is_empty()
    }

    /// Alpha stake per miner, aligned with `self.miners`.
    ///
    /// The validator-directed stake of a coldkey is split evenly across the
    /// miner hotkeys it has registered here, so registering more hotkeys
    /// never multiplies that portion.
    pub fn alpha_stakes(&self) -> Vec<f64> {
        let mut hotkeys_per_coldkey: HashMap<&Coldkey, u32> = HashMap::new();
        for entry in &self.miners {
            *hotkeys_per_coldkey.entry(&entry.coldkey).or_insert(0) += 1;
        }

        self.miners
            .iter()
            .map(|entry| {
                let n_miner = hotkeys_per_coldkey
                    .get(&entry.coldkey)
                    .copied()
                    .unwrap_or(1);
                alpha_stake(entry.stake_on_miner, entry.stake_on_validator, n_miner)
            })
            .collect()
    }
}

/// `alpha_stake = S_miner + S_validator / N_miner`, with `N_miner >= 1`.
pub fn alpha_stake(stake_on_miner: f64, stake_on_validator: f64, n_miner: u32) -> f64 {
    let n_miner = n_miner.max(1);
    stake_on_miner + stake_on_validator / n_miner as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(
        uid: u16,
        coldkey: &str,
        stake_on_miner: f64,
        stake_on_validator: f64,
        last_update_block: u64,
    ) -> LedgerEntry {
        LedgerEntry {
            uid: MinerUid::new(uid),
            hotkey: Hotkey::new(format!("hk{uid}")),
            coldkey: Coldkey::new(coldkey),
            stake_on_miner,
            stake_on_validator,
            last_update_block,
        }
    }

    #[test]
    fn test_alpha_stake_formula() {
        assert_eq!(alpha_stake(10.0, 6.0, 3), 12.0);
        assert_eq!(alpha_stake(0.0, 0.0, 1), 0.0);
        // Exact real division, not integer truncation.
        assert!((alpha_stake(0.0, 1.0, 3) - 1.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_alpha_stake_clamps_hotkey_count() {
        // A coldkey with registered miners always counts itself at least once.
        assert_eq!(alpha_stake(5.0, 4.0, 0), 9.0);
    }

    #[test]
    fn test_alpha_stake_non_negative_for_valid_inputs() {
        for &(s_m, s_v, n) in &[(0.0, 0.0, 1u32), (1.5, 0.0, 2), (0.0, 7.0, 4), (3.0, 2.0, 1)] {
            assert!(alpha_stake(s_m, s_v, n) >= 0.0);
        }
    }

    #[test]
    fn test_snapshot_filters_active_validators() {
        let snapshot = StakeSnapshot::from_ledger(
            1000,
            360,
            vec![
                entry(0, "ck0", 1.0, 0.0, 100),  // stale: miner
                entry(1, "ck1", 1.0, 0.0, 900),  // set weights recently: validator
                entry(2, "ck2", 1.0, 0.0, 1000), // just updated: validator
            ],
        );
        let uids: Vec<u16> = snapshot.miners.iter().map(|m| m.uid.as_u16()).collect();
        assert_eq!(uids, vec![0]);
    }

    #[test]
    fn test_validator_stake_split_across_coldkey_hotkeys() {
        // Two miner hotkeys under ck0; its 6.0 validator-directed stake is
        // split in half for each.
        let snapshot = StakeSnapshot {
            block: 0,
            miners: vec![
                entry(0, "ck0", 2.0, 6.0, 0),
                entry(1, "ck0", 4.0, 6.0, 0),
                entry(2, "ck1", 1.0, 2.0, 0),
            ],
        };
        let stakes = snapshot.alpha_stakes();
        assert_eq!(stakes, vec![5.0, 7.0, 3.0]);
    }
}

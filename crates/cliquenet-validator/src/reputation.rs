//! Debiased EMA reputation per miner.
//!
//! Each scoring event folds into `y = alpha * f + (1 - alpha) * y`. The
//! exposed rating divides out the startup bias of beginning at zero:
//! `rating = y / (1 - (1 - alpha)^t)`, so a miner's very first score comes
//! through undiluted. Rating state survives restarts via the rating
//! repository and is reset when a uid's hotkey re-registers.

use anyhow::Result;
use chrono::Utc;
use cliquenet_common::{Hotkey, MinerUid};
use std::collections::HashMap;
use tracing::{info, warn};

use crate::persistence::{MinerRating, RatingRepository};

pub struct ReputationTracker {
    alpha: f64,
    ratings: HashMap<MinerUid, MinerRating>,
    repository: RatingRepository,
}

impl ReputationTracker {
    /// Load persisted rating state.
    pub async fn load(repository: RatingRepository, alpha: f64) -> Result<Self> {
        let ratings: HashMap<MinerUid, MinerRating> = repository
            .load_all()
            .await?
            .into_iter()
            .map(|rating| (rating.uid, rating))
            .collect();

        info!(miners = ratings.len(), "loaded rating state");
        Ok(Self {
            alpha,
            ratings,
            repository,
        })
    }

    /// Current debiased rating; 0 for a miner with no observations.
    pub fn rating(&self, uid: MinerUid) -> f64 {
        self.ratings
            .get(&uid)
            .map(|r| debiased(r.ema_value, r.step_count, self.alpha))
            .unwrap_or(0.0)
    }

    /// Raw EMA accumulator and step count, if any.
    pub fn state(&self, uid: MinerUid) -> Option<(f64, u32)> {
        self.ratings
            .get(&uid)
            .map(|r| (r.ema_value, r.step_count))
    }

    /// Reset state for any uid whose hotkey changed since it was last seen.
    /// A re-registered slot is a new miner; its predecessor's history does
    /// not transfer.
    pub async fn sync_registrations(&mut self, current: &[(MinerUid, Hotkey)]) -> Result<()> {
        for (uid, hotkey) in current {
            if let Some(existing) = self.ratings.get_mut(uid) {
                if &existing.hotkey != hotkey {
                    info!(
                        uid = uid.as_u16(),
                        old_hotkey = %existing.hotkey,
                        new_hotkey = %hotkey,
                        "hotkey re-registered, resetting rating state"
                    );
                    *existing = MinerRating::new(*uid, hotkey.clone());
                    self.repository.upsert(existing).await?;
                }
            }
        }
        Ok(())
    }

    /// Fold one final score into the miner's EMA and persist the new state.
    /// Returns the updated debiased rating.
    pub async fn record_score(
        &mut self,
        uid: MinerUid,
        hotkey: &Hotkey,
        final_score: f64,
    ) -> Result<f64> {
        let final_score = if final_score.is_finite() {
            final_score
        } else {
            warn!(
                uid = uid.as_u16(),
                "non-finite final score, recording as 0"
            );
            0.0
        };

        let entry = self
            .ratings
            .entry(uid)
            .or_insert_with(|| MinerRating::new(uid, hotkey.clone()));
        if &entry.hotkey != hotkey {
            // Re-registration observed at scoring time.
            *entry = MinerRating::new(uid, hotkey.clone());
        }

        entry.step_count += 1;
        entry.ema_value = self.alpha * final_score + (1.0 - self.alpha) * entry.ema_value;
        entry.updated_at = Utc::now();
        self.repository.upsert(entry).await?;

        Ok(debiased(entry.ema_value, entry.step_count, self.alpha))
    }

    /// Debiased ratings min-max normalized into [0, 1] for the downstream
    /// weight-setting consumer. A constant rating vector normalizes to all
    /// zeros. Sorted by uid.
    pub fn normalized_weights(&self) -> Vec<(MinerUid, f64)> {
        let mut entries: Vec<(MinerUid, f64)> = self
            .ratings
            .iter()
            .map(|(&uid, r)| (uid, debiased(r.ema_value, r.step_count, self.alpha)))
            .collect();
        entries.sort_by_key(|(uid, _)| *uid);

        let min = entries
            .iter()
            .map(|&(_, r)| r)
            .fold(f64::INFINITY, f64::min);
        let max = entries
            .iter()
            .map(|&(_, r)| r)
            .fold(f64::NEG_INFINITY, f64::max);
        let range = max - min;

        entries
            .into_iter()
            .map(|(uid, rating)| {
                let weight = if range == 0.0 {
                    0.0
                } else {
                    (rating - min) / range
                };
                (uid, weight)
            })
            .collect()
    }
}

fn debiased(ema_value: f64, step_count: u32, alpha: f64) -> f64 {
    if step_count == 0 {
        return 0.0;
    }
    ema_value / (1.0 - (1.0 - alpha).powi(step_count as i32))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::Persistence;
    use tempfile::NamedTempFile;

    async fn tracker(alpha: f64) -> (ReputationTracker, NamedTempFile, Persistence) {
        let temp_file = NamedTempFile::new().unwrap();
        let persistence = Persistence::open(temp_file.path().to_str().unwrap(), 2)
            .await
            .unwrap();
        let repository = RatingRepository::new(persistence.pool().clone());
        let tracker = ReputationTracker::load(repository, alpha).await.unwrap();
        (tracker, temp_file, persistence)
    }

    #[tokio::test]
    async fn test_first_observation_is_recovered_by_debiasing() {
        let (mut tracker, _temp_file, _persistence) = tracker(0.01).await;
        let uid = MinerUid::new(1);
        let hotkey = Hotkey::new("hk1");

        let rating = tracker.record_score(uid, &hotkey, 0.8).await.unwrap();

        let (y, t) = tracker.state(uid).unwrap();
        assert!((y - 0.008).abs() < 1e-15);
        assert_eq!(t, 1);
        // 0.008 / (1 - 0.99) = 0.8 exactly, up to float error.
        assert!((rating - 0.8).abs() < 1e-12);
        assert!((tracker.rating(uid) - 0.8).abs() < 1e-12);
    }

    #[tokio::test]
    async fn test_unobserved_miner_rates_zero() {
        let (tracker, _temp_file, _persistence) = tracker(0.01).await;
        assert_eq!(tracker.rating(MinerUid::new(5)), 0.0);
    }

    #[tokio::test]
    async fn test_ema_converges_toward_constant_score() {
        let (mut tracker, _temp_file, _persistence) = tracker(0.1).await;
        let uid = MinerUid::new(2);
        let hotkey = Hotkey::new("hk2");

        let mut rating = 0.0;
        for _ in 0..200 {
            rating = tracker.record_score(uid, &hotkey, 0.6).await.unwrap();
        }
        assert!((rating - 0.6).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_hotkey_change_resets_state() {
        let (mut tracker, _temp_file, _persistence) = tracker(0.01).await;
        let uid = MinerUid::new(3);

        tracker
            .record_score(uid, &Hotkey::new("old"), 1.0)
            .await
            .unwrap();
        assert!(tracker.rating(uid) > 0.0);

        tracker
            .sync_registrations(&[(uid, Hotkey::new("new"))])
            .await
            .unwrap();
        assert_eq!(tracker.state(uid), Some((0.0, 0)));
        assert_eq!(tracker.rating(uid), 0.0);

        // Unchanged hotkeys keep their state.
        tracker
            .record_score(uid, &Hotkey::new("new"), 0.5)
            .await
            .unwrap();
        let before = tracker.state(uid);
        tracker
            .sync_registrations(&[(uid, Hotkey::new("new"))])
            .await
            .unwrap();
        assert_eq!(tracker.state(uid), before);
    }

    #[tokio::test]
    async fn test_state_survives_reload() {
        let temp_file = NamedTempFile::new().unwrap();
        let path = temp_file.path().to_str().unwrap().to_string();
        let uid = MinerUid::new(4);
        let hotkey = Hotkey::new("hk4");

        {
            let persistence = Persistence::open(&path, 2).await.unwrap();
            let repository = RatingRepository::new(persistence.pool().clone());
            let mut tracker = ReputationTracker::load(repository, 0.01).await.unwrap();
            tracker.record_score(uid, &hotkey, 0.8).await.unwrap();
        }

        let persistence = Persistence::open(&path, 2).await.unwrap();
        let repository = RatingRepository::new(persistence.pool().clone());
        let tracker = ReputationTracker::load(repository, 0.01).await.unwrap();
        assert!((tracker.rating(uid) - 0.8).abs() < 1e-12);
    }

    #[tokio::test]
    async fn test_normalized_weights_min_max() {
        let (mut tracker, _temp_file, _persistence) = tracker(0.01).await;
        tracker
            .record_score(MinerUid::new(0), &Hotkey::new("hk0"), 0.2)
            .await
            .unwrap();
        tracker
            .record_score(MinerUid::new(1), &Hotkey::new("hk1"), 0.6)
            .await
            .unwrap();
        tracker
            .record_score(MinerUid::new(2), &Hotkey::new("hk2"), 1.0)
            .await
            .unwrap();

        let weights = tracker.normalized_weights();
        assert_eq!(weights.len(), 3);
        assert_eq!(weights[0].1, 0.0);
        assert!((weights[1].1 - 0.5).abs() < 1e-9);
        assert_eq!(weights[2].1, 1.0);
    }

    #[tokio::test]
    async fn test_normalized_weights_constant_ratings_are_zero() {
        let (mut tracker, _temp_file, _persistence) = tracker(0.01).await;
        for uid in 0..3 {
            tracker
                .record_score(MinerUid::new(uid), &Hotkey::new(format!("hk{uid}")), 0.7)
                .await
                .unwrap();
        }

        let weights = tracker.normalized_weights();
        assert!(weights.iter().all(|&(_, w)| w == 0.0));
    }

    #[tokio::test]
    async fn test_non_finite_score_recorded_as_zero() {
        let (mut tracker, _temp_file, _persistence) = tracker(0.01).await;
        let uid = MinerUid::new(9);
        let rating = tracker
            .record_score(uid, &Hotkey::new("hk9"), f64::NAN)
            .await
            .unwrap();
        assert_eq!(rating, 0.0);
        assert_eq!(tracker.state(uid), Some((0.0, 1)));
    }
}

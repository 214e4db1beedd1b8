//! Durable per-miner rating state.
//!
//! One row per uid: the raw EMA accumulator, the count of scoring events it
//! has absorbed, and the hotkey that earned it. Owned exclusively by the
//! reputation tracker; no other component writes here.

use anyhow::Result;
use chrono::{DateTime, Utc};
use cliquenet_common::{Hotkey, MinerUid};
use sqlx::{Row, SqlitePool};

/// Persisted rating state for one miner.
#[derive(Debug, Clone, PartialEq)]
pub struct MinerRating {
    pub uid: MinerUid,
    pub hotkey: Hotkey,
    /// Raw EMA accumulator `y`.
    pub ema_value: f64,
    /// Count `t` of scoring events observed.
    pub step_count: u32,
    pub updated_at: DateTime<Utc>,
}

impl MinerRating {
    /// Fresh state for a newly observed miner.
    pub fn new(uid: MinerUid, hotkey: Hotkey) -> Self {
        Self {
            uid,
            hotkey,
            ema_value: 0.0,
            step_count: 0,
            updated_at: Utc::now(),
        }
    }
}

/// Repository over the `miner_ratings` table.
pub struct RatingRepository {
    pool: SqlitePool,
}

impl RatingRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn load_all(&self) -> Result<Vec<MinerRating>> {
        let rows = sqlx::query(
            "SELECT uid, hotkey, ema_value, step_count, updated_at FROM miner_ratings",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut ratings = Vec::with_capacity(rows.len());
        for row in rows {
            let uid: i64 = row.get("uid");
            let hotkey: String = row.get("hotkey");
            let ema_value: f64 = row.get("ema_value");
            let step_count: i64 = row.get("step_count");
            let updated_at_str: String = row.get("updated_at");
            let updated_at =
                DateTime::parse_from_rfc3339(&updated_at_str)?.with_timezone(&Utc);

            ratings.push(MinerRating {
                uid: MinerUid::new(uid as u16),
                hotkey: Hotkey::new(hotkey),
                ema_value,
                step_count: step_count as u32,
                updated_at,
            });
        }

        Ok(ratings)
    }

    pub async fn get(&self, uid: MinerUid) -> Result<Option<MinerRating>> {
        let row = sqlx::query(
            "SELECT uid, hotkey, ema_value, step_count, updated_at
             FROM miner_ratings WHERE uid = ?",
        )
        .bind(uid.as_u16() as i64)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => {
                let hotkey: String = row.get("hotkey");
                let ema_value: f64 = row.get("ema_value");
                let step_count: i64 = row.get("step_count");
                let updated_at_str: String = row.get("updated_at");
                let updated_at =
                    DateTime::parse_from_rfc3339(&updated_at_str)?.with_timezone(&Utc);

                Ok(Some(MinerRating {
                    uid,
                    hotkey: Hotkey::new(hotkey),
                    ema_value,
                    step_count: step_count as u32,
                    updated_at,
                }))
            }
            None => Ok(None),
        }
    }

    pub async fn upsert(&self, rating: &MinerRating) -> Result<()> {
        sqlx::query(
            "INSERT INTO miner_ratings (uid, hotkey, ema_value, step_count, updated_at)
             VALUES (?, ?, ?, ?, ?)
             ON CONFLICT(uid) DO UPDATE SET
                 hotkey = excluded.hotkey,
                 ema_value = excluded.ema_value,
                 step_count = excluded.step_count,
                 updated_at = excluded.updated_at",
        )
        .bind(rating.uid.as_u16() as i64)
        .bind(rating.hotkey.as_str())
        .bind(rating.ema_value)
        .bind(rating.step_count as i64)
        .bind(rating.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

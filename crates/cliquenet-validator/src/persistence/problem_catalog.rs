//! Shared problem pool with claim-exactly-once semantics.
//!
//! Multiple coordinator processes draw from one pool. The only cross-process
//! guarantee in the system lives here: a problem id is handed out at most
//! once, ever. The claim is a conditional update on the `claimed` flag
//! arbitrated by `rows_affected`, so two racing coordinators can both see a
//! candidate row but only one wins the flip. A claimed problem is consumed
//! permanently; there is no rollback if the claimant crashes.

use chrono::Utc;
use cliquenet_common::{CliqueNetError, ProblemGraph};
use sqlx::{Row, SqlitePool};
use thiserror::Error;
use tracing::{debug, info};

/// A problem handed out by [`ProblemCatalog::claim`].
#[derive(Debug, Clone)]
pub struct Problem {
    pub id: String,
    pub difficulty: f64,
    pub graph: ProblemGraph,
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("no unclaimed problem with label '{label}' at difficulty {difficulty}")]
    NotFound { label: String, difficulty: f64 },

    #[error("stored adjacency list for problem {id} is corrupt: {source}")]
    CorruptAdjacency {
        id: String,
        source: serde_json::Error,
    },

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

impl CliqueNetError for CatalogError {}

/// Repository over the shared `problems` table.
pub struct ProblemCatalog {
    pool: SqlitePool,
}

impl ProblemCatalog {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Atomically claim one unclaimed problem of the given type.
    ///
    /// Loops over candidate rows: each candidate is taken with a single
    /// conditional update (`... WHERE id = ? AND claimed = 0`); losing the
    /// race to another coordinator just moves on to the next candidate.
    /// Returns [`CatalogError::NotFound`] once no unclaimed row remains.
    pub async fn claim(
        &self,
        label: &str,
        difficulty: f64,
        claimant: &str,
    ) -> Result<Problem, CatalogError> {
        loop {
            // Difficulties come from the fixed config table and are stored
            // from the same f64 values, so exact equality is intended.
            let candidate = sqlx::query(
                "SELECT id, number_of_nodes, adjacency_json FROM problems
                 WHERE label = ? AND difficulty = ? AND claimed = 0
                 LIMIT 1",
            )
            .bind(label)
            .bind(difficulty)
            .fetch_optional(&self.pool)
            .await?;

            let Some(row) = candidate else {
                return Err(CatalogError::NotFound {
                    label: label.to_string(),
                    difficulty,
                });
            };

            let id: String = row.get("id");
            let result = sqlx::query(
                "UPDATE problems SET claimed = 1, claimed_by = ?, claimed_at = ?
                 WHERE id = ? AND claimed = 0",
            )
            .bind(claimant)
            .bind(Utc::now().to_rfc3339())
            .bind(&id)
            .execute(&self.pool)
            .await?;

            if result.rows_affected() == 0 {
                // Another coordinator flipped the flag first.
                debug!(problem_id = %id, "lost claim race, trying next candidate");
                continue;
            }

            let number_of_nodes: i64 = row.get("number_of_nodes");
            let adjacency_json: String = row.get("adjacency_json");
            let adjacency_list: Vec<Vec<u32>> = serde_json::from_str(&adjacency_json)
                .map_err(|e| CatalogError::CorruptAdjacency {
                    id: id.clone(),
                    source: e,
                })?;

            info!(
                problem_id = %id,
                label = %label,
                difficulty = difficulty,
                number_of_nodes = number_of_nodes,
                "claimed problem"
            );

            return Ok(Problem {
                id: id.clone(),
                difficulty,
                graph: ProblemGraph::new(id, label, number_of_nodes as u32, adjacency_list),
            });
        }
    }

    /// Import seam for the external problem generator (and tests).
    pub async fn insert_problem(
        &self,
        graph: &ProblemGraph,
        difficulty: f64,
    ) -> Result<(), CatalogError> {
        let adjacency_json =
            serde_json::to_string(&graph.adjacency_list).map_err(|e| {
                CatalogError::CorruptAdjacency {
                    id: graph.uuid.clone(),
                    source: e,
                }
            })?;

        sqlx::query(
            "INSERT INTO problems (id, label, difficulty, number_of_nodes, adjacency_json, claimed, created_at)
             VALUES (?, ?, ?, ?, ?, 0, ?)",
        )
        .bind(&graph.uuid)
        .bind(&graph.label)
        .bind(difficulty)
        .bind(graph.number_of_nodes as i64)
        .bind(&adjacency_json)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// How many unclaimed problems remain for a type.
    pub async fn unclaimed_count(
        &self,
        label: &str,
        difficulty: f64,
    ) -> Result<i64, CatalogError> {
        let row = sqlx::query(
            "SELECT COUNT(*) as count FROM problems
             WHERE label = ? AND difficulty = ? AND claimed = 0",
        )
        .bind(label)
        .bind(difficulty)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.get("count"))
    }
}

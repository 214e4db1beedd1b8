//! SQLite persistence for the validator core.
//!
//! Two durable tables: the shared problem pool (claimed exactly once across
//! all coordinators) and per-miner rating state. Everything else in a round
//! is in-memory.

pub mod problem_catalog;
pub mod rating_repository;

pub use problem_catalog::{CatalogError, Problem, ProblemCatalog};
pub use rating_repository::{MinerRating, RatingRepository};

use crate::config::DatabaseConfig;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;

/// Shared pool bootstrap with migrations.
pub struct Persistence {
    pool: SqlitePool,
}

impl Persistence {
    /// Get access to the underlying database pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn with_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn connect(config: &DatabaseConfig) -> Result<Self, anyhow::Error> {
        Self::open(&config.url, config.max_connections).await
    }

    pub async fn open(database_url: &str, max_connections: u32) -> Result<Self, anyhow::Error> {
        let db_url = if database_url.starts_with("sqlite:") {
            database_url.to_string()
        } else {
            format!("sqlite:{database_url}")
        };

        // Read-write-create mode unless the caller already chose one.
        let final_url = if db_url.contains('?') {
            db_url
        } else {
            format!("{db_url}?mode=rwc")
        };

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect(&final_url)
            .await?;

        // Configure SQLite for concurrent coordinators sharing the file.
        sqlx::query("PRAGMA journal_mode = WAL")
            .execute(&pool)
            .await?;
        sqlx::query("PRAGMA busy_timeout = 5000")
            .execute(&pool)
            .await?;
        sqlx::query("PRAGMA synchronous = NORMAL")
            .execute(&pool)
            .await?;

        let instance = Self { pool };
        instance.run_migrations().await?;

        Ok(instance)
    }

    async fn run_migrations(&self) -> Result<(), anyhow::Error> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS problems (
                id TEXT PRIMARY KEY,
                label TEXT NOT NULL,
                difficulty REAL NOT NULL,
                number_of_nodes INTEGER NOT NULL,
                adjacency_json TEXT NOT NULL,
                claimed INTEGER NOT NULL DEFAULT 0,
                claimed_by TEXT,
                claimed_at TEXT,
                created_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_problems_pool
                ON problems (label, difficulty, claimed);

            CREATE TABLE IF NOT EXISTS miner_ratings (
                uid INTEGER PRIMARY KEY,
                hotkey TEXT NOT NULL,
                ema_value REAL NOT NULL,
                step_count INTEGER NOT NULL,
                updated_at TEXT NOT NULL,

                CONSTRAINT valid_step_count CHECK (step_count >= 0)
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

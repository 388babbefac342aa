//! Database schema migrations.
//!
//! Each schema version has a pair of SQL files in this directory:
//! - `migration_NN_up.sql` upgrades the schema from version `NN-1` to `NN`
//! - `migration_NN_down.sql` downgrades the schema from version `NN` to `NN-1`

use anyhow::{bail, Context, Result};
use sqlx::{Executor, SqlitePool};
use tracing::{debug, info};

/// The schema version this build of the program expects.
pub(crate) const CURRENT_VERSION: i32 = 1;

struct Migration {
    /// The version reached after running `up_sql`.
    version: i32,
    up_sql: &'static str,
    down_sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    up_sql: include_str!("migration_01_up.sql"),
    down_sql: include_str!("migration_01_down.sql"),
}];

/// Creates the `schema_version` table at version 0 if it does not exist yet.
pub(crate) async fn bootstrap(pool: &SqlitePool) -> Result<()> {
    pool.execute("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL)")
        .await
        .context("Failed to create schema_version table")?;

    let (rows,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM schema_version")
        .fetch_one(pool)
        .await
        .context("Failed to count schema_version rows")?;

    if rows == 0 {
        sqlx::query("INSERT INTO schema_version (version) VALUES (0)")
            .execute(pool)
            .await
            .context("Failed to insert initial schema version")?;
    }
    Ok(())
}

/// Reads the schema version recorded in the database.
pub(crate) async fn current_version(pool: &SqlitePool) -> Result<i32> {
    let (version,): (Option<i32>,) = sqlx::query_as("SELECT MAX(version) FROM schema_version")
        .fetch_one(pool)
        .await
        .context("Failed to read the schema version")?;
    Ok(version.unwrap_or_default())
}

/// Brings the schema from `from` to `to`, running "up" or "down" migrations one version at a
/// time. Each step runs in its own transaction together with the `schema_version` update.
///
/// All needed migrations are checked for before any of them runs.
pub(crate) async fn run(pool: &SqlitePool, from: i32, to: i32) -> Result<()> {
    if from == to {
        debug!("Schema already at version {to}");
        return Ok(());
    }
    check_available(from, to)?;

    if from < to {
        for version in (from + 1)..=to {
            debug!("Running migration {version:02} (up)");
            step(pool, find(version)?.up_sql, version).await?;
        }
    } else {
        for version in ((to + 1)..=from).rev() {
            debug!("Running migration {version:02} (down)");
            step(pool, find(version)?.down_sql, version - 1).await?;
        }
    }

    info!("Database schema migrated from version {from} to {to}");
    Ok(())
}

fn find(version: i32) -> Result<&'static Migration> {
    MIGRATIONS
        .iter()
        .find(|m| m.version == version)
        .with_context(|| format!("Migration {version} not found"))
}

async fn step(pool: &SqlitePool, sql: &str, new_version: i32) -> Result<()> {
    let mut tx = pool
        .begin()
        .await
        .context("Failed to begin migration transaction")?;

    (&mut *tx)
        .execute(sql)
        .await
        .context("Failed to execute migration SQL")?;

    sqlx::query("UPDATE schema_version SET version = ?")
        .bind(new_version)
        .execute(&mut *tx)
        .await
        .context("Failed to update schema_version")?;

    tx.commit()
        .await
        .context("Failed to commit migration transaction")
}

fn check_available(from: i32, to: i32) -> Result<()> {
    let (lo, hi) = if from < to { (from + 1, to) } else { (to + 1, from) };
    for version in lo..=hi {
        if !MIGRATIONS.iter().any(|m| m.version == version) {
            bail!("Migration {version} is missing but required to migrate from {from} to {to}");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
    use tempfile::TempDir;

    async fn bootstrapped_pool() -> (TempDir, SqlitePool) {
        let dir = TempDir::new().unwrap();
        let options = SqliteConnectOptions::new()
            .filename(dir.path().join("test.sqlite"))
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .unwrap();
        bootstrap(&pool).await.unwrap();
        (dir, pool)
    }

    async fn table_exists(pool: &SqlitePool, name: &str) -> bool {
        let (n,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?")
                .bind(name)
                .fetch_one(pool)
                .await
                .unwrap();
        n > 0
    }

    #[tokio::test]
    async fn test_bootstrap_is_idempotent() {
        let (_dir, pool) = bootstrapped_pool().await;
        bootstrap(&pool).await.unwrap();
        let (rows,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM schema_version")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(rows, 1);
        assert_eq!(current_version(&pool).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_up_creates_entries_table() {
        let (_dir, pool) = bootstrapped_pool().await;
        run(&pool, 0, CURRENT_VERSION).await.unwrap();
        assert_eq!(current_version(&pool).await.unwrap(), CURRENT_VERSION);
        assert!(table_exists(&pool, "entries").await);
    }

    #[tokio::test]
    async fn test_down_drops_entries_table() {
        let (_dir, pool) = bootstrapped_pool().await;
        run(&pool, 0, 1).await.unwrap();
        run(&pool, 1, 0).await.unwrap();
        assert_eq!(current_version(&pool).await.unwrap(), 0);
        assert!(!table_exists(&pool, "entries").await);
    }

    #[tokio::test]
    async fn test_noop_at_target() {
        let (_dir, pool) = bootstrapped_pool().await;
        run(&pool, 0, 1).await.unwrap();
        run(&pool, 1, 1).await.unwrap();
        assert_eq!(current_version(&pool).await.unwrap(), 1);
    }

    #[test]
    fn test_check_available() {
        assert!(check_available(0, 1).is_ok());
        assert!(check_available(1, 0).is_ok());
        assert!(check_available(0, 2).is_err());
    }
}

//! Versioned schema migrations for a tenant database.
//!
//! Each migration is a pair of SQL files in this directory:
//! - `migration_NN_up.sql` brings the schema from version `NN-1` to `NN`
//! - `migration_NN_down.sql` takes it from `NN` back to `NN-1`
//!
//! Up migrations only use `IF NOT EXISTS` statements, so a migration that is applied twice (for
//! example by two processes provisioning the same tenant) leaves the schema and its rows intact.

use crate::error::Res;
use anyhow::{bail, Context};
use sqlx::{Executor, SqlitePool};
use tracing::debug;

struct Migration {
    /// The version the schema is at after running `up_sql`.
    version: i32,
    up_sql: &'static str,
    down_sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    up_sql: include_str!("migration_01_up.sql"),
    down_sql: include_str!("migration_01_down.sql"),
}];

fn find(version: i32) -> Res<&'static Migration> {
    match MIGRATIONS.iter().find(|m| m.version == version) {
        Some(migration) => Ok(migration),
        None => bail!("Migration {version} not found"),
    }
}

/// Moves the schema from version `from` to version `to`, up or down one step at a time.
///
/// Every migration that is needed is looked up before any of them runs.
pub(crate) async fn run(pool: &SqlitePool, from: i32, to: i32) -> Res<()> {
    if from == to {
        debug!("Schema already at version {to}");
        return Ok(());
    }

    let steps: Vec<(&Migration, bool)> = if from < to {
        ((from + 1)..=to)
            .map(|v| find(v).map(|m| (m, true)))
            .collect::<Res<_>>()?
    } else {
        ((to + 1)..=from)
            .rev()
            .map(|v| find(v).map(|m| (m, false)))
            .collect::<Res<_>>()
            .with_context(|| format!("Unable to migrate down from {from} to {to}"))?
    };

    for (migration, up) in steps {
        if up {
            debug!("Running migration {:02} (up)", migration.version);
            apply(pool, migration.up_sql, migration.version).await?;
        } else {
            debug!("Running migration {:02} (down)", migration.version);
            apply(pool, migration.down_sql, migration.version - 1).await?;
        }
    }

    debug!("Schema now at version {to}");
    Ok(())
}

/// Runs `sql` and records `version` in `schema_version` within one transaction.
async fn apply(pool: &SqlitePool, sql: &str, version: i32) -> Res<()> {
    let mut tx = pool
        .begin()
        .await
        .context("Failed to begin migration transaction")?;

    tx.execute(sql)
        .await
        .context("Failed to execute migration SQL")?;

    sqlx::query("DELETE FROM schema_version")
        .execute(&mut *tx)
        .await
        .context("Failed to clear schema_version")?;

    sqlx::query("INSERT INTO schema_version (version) VALUES (?)")
        .bind(version)
        .execute(&mut *tx)
        .await
        .context("Failed to update schema_version")?;

    tx.commit()
        .await
        .context("Failed to commit migration transaction")
}

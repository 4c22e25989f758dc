//! This module is responsible for reading, writing and managing the per-tenant SQLite databases.
//!
//! Each tenant owns one database file at `$HOME/data/<user_id>/ledger.sqlite`. The `Store` maps a
//! `TenantId` to a connection pool, creating the file and its schema the first time a tenant is
//! referenced. The `Ledger` is the handle for one tenant; all record operations hang off of it.

mod budgets;
mod expenses;
mod goals;
mod migrations;
mod savings;

use crate::error::{Error, ErrorType, IntoResult, Res, Result};
use crate::tenant::TenantId;
use crate::utils;
use anyhow::Context;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{Sqlite, SqlitePool, Transaction};
use std::collections::HashMap;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::debug;

/// The schema version that this build of the program expects.
const CURRENT_VERSION: i32 = 1;

const LEDGER_SQLITE: &str = "ledger.sqlite";
const MAX_CONNECTIONS: u32 = 4;

/// The outcome of a partial update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Change<T> {
    /// The row existed and now holds this value.
    Updated(T),
    /// No row has the requested id.
    NotFound,
}

/// Resolves tenants to their isolated databases.
#[derive(Debug, Clone)]
pub(crate) struct Store {
    data_dir: PathBuf,
    timeout: Duration,
    wal: bool,
    pools: Arc<Mutex<HashMap<TenantId, SqlitePool>>>,
}

impl Store {
    /// - `data_dir`: the directory under which each tenant gets its own subdirectory
    /// - `timeout`: the bound applied to every storage operation
    /// - `wal`: whether to put the SQLite databases in write-ahead-log journal mode
    pub(crate) fn new(data_dir: impl Into<PathBuf>, timeout: Duration, wal: bool) -> Self {
        Self {
            data_dir: data_dir.into(),
            timeout,
            wal,
            pools: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub(crate) fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// The path of the SQLite file for `tenant`.
    pub(crate) fn tenant_path(&self, tenant: &TenantId) -> PathBuf {
        self.data_dir.join(tenant.as_str()).join(LEDGER_SQLITE)
    }

    /// Returns the `Ledger` for `tenant`, provisioning its database and schema if needed.
    ///
    /// This is idempotent and safe to call on every operation and from concurrent tasks.
    pub(crate) async fn ensure(&self, tenant: &TenantId) -> Result<Ledger> {
        let pool = bounded(self.timeout, "Provisioning tenant storage", self.pool(tenant)).await?;
        Ok(Ledger {
            tenant: tenant.clone(),
            pool,
            timeout: self.timeout,
        })
    }

    async fn pool(&self, tenant: &TenantId) -> Res<SqlitePool> {
        // Holding the lock for the whole provisioning step keeps two tasks from creating the same
        // tenant at once.
        let mut pools = self.pools.lock().await;
        if let Some(pool) = pools.get(tenant) {
            return Ok(pool.clone());
        }

        let path = self.tenant_path(tenant);
        if let Some(dir) = path.parent() {
            utils::make_dir(dir).await?;
        }
        debug!("Opening ledger for '{tenant}' at {}", path.display());

        let journal_mode = if self.wal {
            SqliteJournalMode::Wal
        } else {
            SqliteJournalMode::Delete
        };
        let options = SqliteConnectOptions::new()
            .filename(&path)
            .create_if_missing(true)
            .journal_mode(journal_mode)
            .busy_timeout(self.timeout);

        let pool = SqlitePoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .connect_with(options)
            .await
            .with_context(|| format!("Failed to open SQLite database at {}", path.display()))?;

        migrate(&pool)
            .await
            .with_context(|| format!("Failed to initialize the schema for '{tenant}'"))?;

        pools.insert(tenant.clone(), pool.clone());
        Ok(pool)
    }
}

/// Creates the `schema_version` table if it is missing and runs any outstanding migrations.
async fn migrate(pool: &SqlitePool) -> Res<()> {
    sqlx::query("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL)")
        .execute(pool)
        .await
        .context("Failed to create schema_version table")?;

    let current: Option<i32> = sqlx::query_scalar("SELECT MAX(version) FROM schema_version")
        .fetch_one(pool)
        .await
        .context("Failed to query schema version")?;

    migrations::run(pool, current.unwrap_or(0), CURRENT_VERSION).await
}

/// The storage handle for a single tenant.
#[derive(Debug, Clone)]
pub(crate) struct Ledger {
    tenant: TenantId,
    pool: SqlitePool,
    timeout: Duration,
}

impl Ledger {
    pub(crate) fn tenant(&self) -> &TenantId {
        &self.tenant
    }

    /// Runs a storage operation under this ledger's timeout.
    async fn bounded<T, F>(&self, what: &str, fut: F) -> Result<T>
    where
        F: Future<Output = Res<T>>,
    {
        bounded(self.timeout, what, fut).await
    }

    /// Starts a transaction that holds the database's write lock from its first statement.
    ///
    /// A deferred transaction that reads before it writes cannot wait for the lock in WAL mode;
    /// SQLite fails the upgrade at once. Taking the lock up front lets concurrent writers on one
    /// tenant queue on the busy timeout instead.
    async fn begin_write(&self) -> Res<Transaction<'static, Sqlite>> {
        self.pool
            .begin_with("BEGIN IMMEDIATE")
            .await
            .context("Unable to start a write transaction")
    }

    #[cfg(test)]
    pub(crate) fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

/// Awaits `fut` for at most `timeout`. Failures are reported as `ErrorType::Storage` and expiry as
/// `ErrorType::Timeout`.
async fn bounded<T, F>(timeout: Duration, what: &str, fut: F) -> Result<T>
where
    F: Future<Output = Res<T>>,
{
    match tokio::time::timeout(timeout, fut).await {
        Ok(result) => result.pub_result(ErrorType::Storage),
        Err(_) => Err(Error::new(
            ErrorType::Timeout,
            anyhow::anyhow!("{what} did not complete within {:?}", timeout),
        )),
    }
}

fn parse_stored_date(value: &str) -> Res<NaiveDate> {
    NaiveDate::parse_from_str(value, crate::model::DATE_FORMAT)
        .with_context(|| format!("Invalid date '{value}' found in the database"))
}

fn parse_stored_amount(value: &str) -> Res<Decimal> {
    Decimal::from_str(value).with_context(|| format!("Invalid amount '{value}' found in the database"))
}

/// Sums amounts that were read back as stored text.
///
/// An unreadable amount is a `Storage` error. A total beyond the range of `Decimal` is a
/// `Validation` error, since it can only come from amounts the caller recorded.
fn sum_stored_amounts(values: &[String]) -> Result<Decimal> {
    values.iter().try_fold(Decimal::ZERO, |total, value| {
        let amount = parse_stored_amount(value).pub_result(ErrorType::Storage)?;
        total.checked_add(amount).ok_or_else(|| {
            Error::validation(format!("The sum of the stored amounts exceeds {}", Decimal::MAX))
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::NewExpense;
    use tempfile::TempDir;

    fn tenant(id: &str) -> TenantId {
        TenantId::new(id).unwrap()
    }

    async fn table_names(pool: &SqlitePool) -> Vec<String> {
        sqlx::query_scalar(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' \
             ORDER BY name",
        )
        .fetch_all(pool)
        .await
        .unwrap()
    }

    fn expense() -> NewExpense {
        NewExpense {
            date: NaiveDate::from_ymd_opt(2024, 3, 5).unwrap(),
            amount: Decimal::from_str("12.50").unwrap(),
            category: "food".to_string(),
            subcategory: "groceries".to_string(),
            note: String::new(),
        }
    }

    #[tokio::test]
    async fn test_ensure_creates_schema() {
        let dir = TempDir::new().unwrap();
        let store = Store::new(dir.path(), Duration::from_secs(10), true);
        let alice = tenant("alice");
        let ledger = store.ensure(&alice).await.unwrap();
        assert_eq!(ledger.tenant(), &alice);
        assert!(store.tenant_path(&alice).is_file());
        assert_eq!(
            table_names(ledger.pool()).await,
            vec!["budgets", "expenses", "saving_goals", "savings", "schema_version"]
        );
    }

    #[tokio::test]
    async fn test_ensure_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let alice = tenant("alice");

        let first = Store::new(dir.path(), Duration::from_secs(10), true);
        let ledger = first.ensure(&alice).await.unwrap();
        ledger.insert_expense(expense()).await.unwrap();
        let again = first.ensure(&alice).await.unwrap();
        assert_eq!(again.list_expenses(Default::default()).await.unwrap().len(), 1);

        // A second store has no cached pool, so it provisions against the existing file.
        let second = Store::new(dir.path(), Duration::from_secs(10), true);
        let reopened = second.ensure(&alice).await.unwrap();
        let tables = table_names(reopened.pool()).await;
        assert_eq!(tables.len(), 5);
        assert_eq!(reopened.list_expenses(Default::default()).await.unwrap().len(), 1);

        let versions: Vec<i32> = sqlx::query_scalar("SELECT version FROM schema_version")
            .fetch_all(reopened.pool())
            .await
            .unwrap();
        assert_eq!(versions, vec![CURRENT_VERSION]);
    }

    #[tokio::test]
    async fn test_concurrent_ensure() {
        let dir = TempDir::new().unwrap();
        let store = Store::new(dir.path(), Duration::from_secs(10), true);
        let mut handles = Vec::new();
        for _ in 0..8 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store.ensure(&tenant("shared")).await.map(|_| ())
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }
        let ledger = store.ensure(&tenant("shared")).await.unwrap();
        assert_eq!(table_names(ledger.pool()).await.len(), 5);
    }

    #[tokio::test]
    async fn test_tenants_are_isolated() {
        let dir = TempDir::new().unwrap();
        let store = Store::new(dir.path(), Duration::from_secs(10), false);
        let alice = store.ensure(&tenant("alice")).await.unwrap();
        let bob = store.ensure(&tenant("bob")).await.unwrap();
        alice.insert_expense(expense()).await.unwrap();
        assert_eq!(alice.list_expenses(Default::default()).await.unwrap().len(), 1);
        assert!(bob.list_expenses(Default::default()).await.unwrap().is_empty());
        assert_ne!(
            store.tenant_path(&tenant("alice")),
            store.tenant_path(&tenant("bob"))
        );
    }

    #[tokio::test]
    async fn test_bounded_times_out() {
        let result: Result<()> = bounded(Duration::from_millis(10), "Sleeping", async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        })
        .await;
        let err = result.unwrap_err();
        assert_eq!(err.error_type(), ErrorType::Timeout);
        assert!(err.to_string().contains("Sleeping"), "{err}");
    }

    #[tokio::test]
    async fn test_bounded_maps_failures_to_storage() {
        let result: Result<()> =
            bounded(Duration::from_secs(1), "Failing", async { anyhow::bail!("boom") }).await;
        assert_eq!(result.unwrap_err().error_type(), ErrorType::Storage);
    }

    #[test]
    fn test_sum_stored_amounts() {
        let values = ["1.10", "2.20", "0.70"].map(String::from);
        assert_eq!(sum_stored_amounts(&values).unwrap(), Decimal::from(4));
        assert_eq!(sum_stored_amounts(&[]).unwrap(), Decimal::ZERO);
        let err = sum_stored_amounts(&["abc".to_string()]).unwrap_err();
        assert_eq!(err.error_type(), ErrorType::Storage);
    }

    #[test]
    fn test_sum_stored_amounts_overflow() {
        let huge = "50000000000000000000000000000".to_string();
        let err = sum_stored_amounts(&[huge.clone(), huge]).unwrap_err();
        assert_eq!(err.error_type(), ErrorType::Validation);
    }
}

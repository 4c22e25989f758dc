use super::{parse_stored_amount, Ledger};
use crate::error::{Res, Result};
use crate::model::Budget;
use anyhow::Context;
use rust_decimal::Decimal;
use sqlx::FromRow;
use tracing::debug;

#[derive(Debug, FromRow)]
struct BudgetRow {
    id: i64,
    category: String,
    monthly_limit: String,
}

impl TryFrom<BudgetRow> for Budget {
    type Error = anyhow::Error;

    fn try_from(row: BudgetRow) -> Res<Self> {
        Ok(Budget {
            id: row.id,
            category: row.category,
            monthly_limit: parse_stored_amount(&row.monthly_limit)?,
        })
    }
}

impl Ledger {
    /// Creates the budget for `category`, or replaces its limit if one already exists.
    pub(crate) async fn upsert_budget(&self, category: &str, monthly_limit: Decimal) -> Result<Budget> {
        self.bounded("Setting budget", async {
            let mut tx = self.begin_write().await?;
            let row: BudgetRow = sqlx::query_as(
                "INSERT INTO budgets (category, monthly_limit) VALUES (?, ?) \
                 ON CONFLICT(category) DO UPDATE SET monthly_limit = excluded.monthly_limit \
                 RETURNING id, category, monthly_limit",
            )
            .bind(category)
            .bind(monthly_limit.to_string())
            .fetch_one(&mut *tx)
            .await
            .with_context(|| format!("Unable to set the budget for '{category}'"))?;
            tx.commit().await?;
            debug!("Set budget for '{category}' of '{}'", self.tenant);
            Budget::try_from(row)
        })
        .await
    }

    /// Changes the limit of an existing budget. Returns `None` if `category` has no budget.
    pub(crate) async fn update_budget_limit(
        &self,
        category: &str,
        monthly_limit: Decimal,
    ) -> Result<Option<Budget>> {
        self.bounded("Updating budget", async {
            let mut tx = self.begin_write().await?;
            let row: Option<BudgetRow> = sqlx::query_as(
                "UPDATE budgets SET monthly_limit = ? WHERE category = ? \
                 RETURNING id, category, monthly_limit",
            )
            .bind(monthly_limit.to_string())
            .bind(category)
            .fetch_optional(&mut *tx)
            .await
            .with_context(|| format!("Unable to update the budget for '{category}'"))?;
            tx.commit().await?;
            row.map(Budget::try_from).transpose()
        })
        .await
    }

    pub(crate) async fn get_budget(&self, category: &str) -> Result<Option<Budget>> {
        self.bounded("Fetching budget", async {
            let row: Option<BudgetRow> =
                sqlx::query_as("SELECT id, category, monthly_limit FROM budgets WHERE category = ?")
                    .bind(category)
                    .fetch_optional(&self.pool)
                    .await
                    .with_context(|| format!("Unable to fetch the budget for '{category}'"))?;
            row.map(Budget::try_from).transpose()
        })
        .await
    }

    /// Lists all budgets ordered by category.
    pub(crate) async fn list_budgets(&self) -> Result<Vec<Budget>> {
        self.bounded("Listing budgets", async {
            let rows: Vec<BudgetRow> =
                sqlx::query_as("SELECT id, category, monthly_limit FROM budgets ORDER BY category ASC")
                    .fetch_all(&self.pool)
                    .await
                    .context("Unable to query budgets")?;
            rows.into_iter().map(Budget::try_from).collect()
        })
        .await
    }

    pub(crate) async fn delete_budget(&self, category: &str) -> Result<bool> {
        self.bounded("Deleting budget", async {
            let mut tx = self.begin_write().await?;
            let deleted = sqlx::query("DELETE FROM budgets WHERE category = ?")
                .bind(category)
                .execute(&mut *tx)
                .await
                .with_context(|| format!("Unable to delete the budget for '{category}'"))?
                .rows_affected();
            tx.commit().await?;
            Ok(deleted > 0)
        })
        .await
    }
}

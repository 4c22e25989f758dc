use super::{parse_stored_amount, parse_stored_date, sum_stored_amounts, Change, Ledger};
use crate::error::{Res, Result};
use crate::model::{format_date, DateRange, Expense, NewExpense};
use anyhow::Context;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::FromRow;
use tracing::debug;

#[derive(Debug, FromRow)]
struct ExpenseRow {
    id: i64,
    date: String,
    amount: String,
    category: String,
    subcategory: String,
    note: String,
}

impl TryFrom<ExpenseRow> for Expense {
    type Error = anyhow::Error;

    fn try_from(row: ExpenseRow) -> Res<Self> {
        Ok(Expense {
            id: row.id,
            date: parse_stored_date(&row.date)?,
            amount: parse_stored_amount(&row.amount)?,
            category: row.category,
            subcategory: row.subcategory,
            note: row.note,
        })
    }
}

const SELECT_EXPENSES: &str = "SELECT id, date, amount, category, subcategory, note FROM expenses";

impl Ledger {
    /// Inserts an expense whose category and subcategory have already been normalized.
    pub(crate) async fn insert_expense(&self, expense: NewExpense) -> Result<Expense> {
        self.bounded("Inserting expense", async {
            let mut tx = self.begin_write().await?;
            let id = sqlx::query(
                "INSERT INTO expenses (date, amount, category, subcategory, note) \
                 VALUES (?, ?, ?, ?, ?)",
            )
            .bind(format_date(expense.date))
            .bind(expense.amount.to_string())
            .bind(&expense.category)
            .bind(&expense.subcategory)
            .bind(&expense.note)
            .execute(&mut *tx)
            .await
            .context("Unable to insert expense")?
            .last_insert_rowid();
            tx.commit().await?;
            debug!("Inserted expense {id} for '{}'", self.tenant);
            Ok(expense.into_expense(id))
        })
        .await
    }

    /// Lists the expenses inside `range`, newest first.
    pub(crate) async fn list_expenses(&self, range: DateRange) -> Result<Vec<Expense>> {
        self.expenses_where(range, None).await
    }

    /// Lists the expenses inside `range`, optionally restricted to one category.
    pub(crate) async fn expenses_where(
        &self,
        range: DateRange,
        category: Option<&str>,
    ) -> Result<Vec<Expense>> {
        self.bounded("Listing expenses", async {
            let sql = format!(
                "{SELECT_EXPENSES} \
                 WHERE (?1 IS NULL OR date >= ?1) AND (?2 IS NULL OR date <= ?2) \
                 AND (?3 IS NULL OR category = ?3) \
                 ORDER BY date DESC, id DESC"
            );
            let rows: Vec<ExpenseRow> = sqlx::query_as(&sql)
                .bind(range.start().map(format_date))
                .bind(range.end().map(format_date))
                .bind(category)
                .fetch_all(&self.pool)
                .await
                .context("Unable to query expenses")?;
            rows.into_iter().map(Expense::try_from).collect()
        })
        .await
    }

    pub(crate) async fn get_expense(&self, id: i64) -> Result<Option<Expense>> {
        self.bounded("Fetching expense", async {
            let row: Option<ExpenseRow> = sqlx::query_as(&format!("{SELECT_EXPENSES} WHERE id = ?"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .with_context(|| format!("Unable to fetch expense {id}"))?;
            row.map(Expense::try_from).transpose()
        })
        .await
    }

    /// Sums the expenses of `category` with `start <= date < end`.
    pub(crate) async fn sum_expenses(
        &self,
        category: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Decimal> {
        let amounts: Vec<String> = self.bounded("Summing expenses", async {
            let amounts: Vec<String> = sqlx::query_scalar(
                "SELECT amount FROM expenses WHERE category = ? AND date >= ? AND date < ?",
            )
            .bind(category)
            .bind(format_date(start))
            .bind(format_date(end))
            .fetch_all(&self.pool)
            .await
            .context("Unable to query expense amounts")?;
            Ok(amounts)
        })
        .await?;
        sum_stored_amounts(&amounts)
    }

    /// Reads the expense, lets `apply` change it and writes it back in one transaction.
    ///
    /// If `apply` fails, nothing is written and its error is returned.
    pub(crate) async fn update_expense<F>(&self, id: i64, apply: F) -> Result<Change<Expense>>
    where
        F: FnOnce(&mut Expense) -> Result<()> + Send,
    {
        self.bounded("Updating expense", async {
            let mut tx = self.begin_write().await?;
            let row: Option<ExpenseRow> = sqlx::query_as(&format!("{SELECT_EXPENSES} WHERE id = ?"))
                .bind(id)
                .fetch_optional(&mut *tx)
                .await
                .with_context(|| format!("Unable to fetch expense {id}"))?;
            let Some(row) = row else {
                return Ok(Ok(Change::NotFound));
            };
            let mut expense = Expense::try_from(row)?;
            if let Err(e) = apply(&mut expense) {
                return Ok(Err(e));
            }
            sqlx::query(
                "UPDATE expenses SET date = ?, amount = ?, category = ?, subcategory = ?, note = ? \
                 WHERE id = ?",
            )
            .bind(format_date(expense.date))
            .bind(expense.amount.to_string())
            .bind(&expense.category)
            .bind(&expense.subcategory)
            .bind(&expense.note)
            .bind(id)
            .execute(&mut *tx)
            .await
            .with_context(|| format!("Unable to update expense {id}"))?;
            tx.commit().await?;
            debug!("Updated expense {id} for '{}'", self.tenant);
            Ok(Ok(Change::Updated(expense)))
        })
        .await?
    }

    /// Deletes an expense. Returns `false` if there was no such expense.
    pub(crate) async fn delete_expense(&self, id: i64) -> Result<bool> {
        self.bounded("Deleting expense", async {
            let mut tx = self.begin_write().await?;
            let deleted = sqlx::query("DELETE FROM expenses WHERE id = ?")
                .bind(id)
                .execute(&mut *tx)
                .await
                .with_context(|| format!("Unable to delete expense {id}"))?
                .rows_affected();
            tx.commit().await?;
            Ok(deleted > 0)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Error, ErrorType};
    use crate::tenant::TenantId;
    use std::str::FromStr;
    use std::time::Duration;
    use tempfile::TempDir;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::from_str(s).unwrap()
    }

    fn new_expense(day: &str, amount: &str, category: &str) -> NewExpense {
        NewExpense {
            date: date(day),
            amount: Decimal::from_str(amount).unwrap(),
            category: category.to_string(),
            subcategory: "other".to_string(),
            note: String::new(),
        }
    }

    async fn ledger() -> (TempDir, Ledger) {
        let dir = TempDir::new().unwrap();
        let store = crate::db::Store::new(dir.path(), Duration::from_secs(10), true);
        let ledger = store.ensure(&TenantId::new("tester").unwrap()).await.unwrap();
        (dir, ledger)
    }

    #[tokio::test]
    async fn test_list_is_newest_first_and_filtered() {
        let (_dir, ledger) = ledger().await;
        let a = ledger.insert_expense(new_expense("2024-03-01", "1", "food")).await.unwrap();
        let b = ledger.insert_expense(new_expense("2024-03-10", "2", "food")).await.unwrap();
        let c = ledger.insert_expense(new_expense("2024-03-10", "3", "transport")).await.unwrap();
        let d = ledger.insert_expense(new_expense("2024-04-02", "4", "food")).await.unwrap();

        let ids: Vec<i64> = ledger
            .list_expenses(DateRange::all())
            .await
            .unwrap()
            .iter()
            .map(|e| e.id)
            .collect();
        assert_eq!(ids, vec![d.id, c.id, b.id, a.id]);

        let march = DateRange::new(Some(date("2024-03-01")), Some(date("2024-03-10"))).unwrap();
        let ids: Vec<i64> = ledger
            .list_expenses(march)
            .await
            .unwrap()
            .iter()
            .map(|e| e.id)
            .collect();
        assert_eq!(ids, vec![c.id, b.id, a.id]);

        let open_start = DateRange::new(None, Some(date("2024-03-05"))).unwrap();
        assert_eq!(ledger.list_expenses(open_start).await.unwrap(), vec![a.clone()]);

        let food = ledger.expenses_where(march, Some("food")).await.unwrap();
        assert_eq!(food, vec![b, a]);
    }

    #[tokio::test]
    async fn test_amounts_keep_their_precision() {
        let (_dir, ledger) = ledger().await;
        ledger.insert_expense(new_expense("2024-03-01", "0.10", "food")).await.unwrap();
        ledger.insert_expense(new_expense("2024-03-02", "0.20", "food")).await.unwrap();
        let total = ledger
            .sum_expenses("food", date("2024-03-01"), date("2024-04-01"))
            .await
            .unwrap();
        assert_eq!(total, Decimal::from_str("0.30").unwrap());
    }

    #[tokio::test]
    async fn test_sum_uses_half_open_range() {
        let (_dir, ledger) = ledger().await;
        ledger.insert_expense(new_expense("2024-02-29", "1", "food")).await.unwrap();
        ledger.insert_expense(new_expense("2024-03-01", "10", "food")).await.unwrap();
        ledger.insert_expense(new_expense("2024-03-31", "100", "food")).await.unwrap();
        ledger.insert_expense(new_expense("2024-04-01", "1000", "food")).await.unwrap();
        ledger.insert_expense(new_expense("2024-03-15", "5", "transport")).await.unwrap();
        let total = ledger
            .sum_expenses("food", date("2024-03-01"), date("2024-04-01"))
            .await
            .unwrap();
        assert_eq!(total, Decimal::from(110));
        let none = ledger
            .sum_expenses("health", date("2024-03-01"), date("2024-04-01"))
            .await
            .unwrap();
        assert_eq!(none, Decimal::ZERO);
    }

    #[tokio::test]
    async fn test_update_changes_only_what_apply_touches() {
        let (_dir, ledger) = ledger().await;
        let mut original = new_expense("2024-03-01", "12.50", "food");
        original.note = "lunch".to_string();
        let inserted = ledger.insert_expense(original).await.unwrap();

        let change = ledger
            .update_expense(inserted.id, |e| {
                e.amount = Decimal::from(20);
                Ok(())
            })
            .await
            .unwrap();
        let Change::Updated(updated) = change else {
            panic!("expected an update");
        };
        assert_eq!(updated.amount, Decimal::from(20));
        assert_eq!(updated.note, "lunch");
        assert_eq!(updated.date, inserted.date);
        assert_eq!(ledger.get_expense(inserted.id).await.unwrap(), Some(updated));
    }

    #[tokio::test]
    async fn test_update_missing_and_failed_apply() {
        let (_dir, ledger) = ledger().await;
        let missing = ledger.update_expense(99, |_| Ok(())).await.unwrap();
        assert_eq!(missing, Change::NotFound);

        let inserted = ledger.insert_expense(new_expense("2024-03-01", "1", "food")).await.unwrap();
        let err = ledger
            .update_expense(inserted.id, |e| {
                e.note = "should not stick".to_string();
                Err(Error::validation("nope"))
            })
            .await
            .unwrap_err();
        assert_eq!(err.error_type(), ErrorType::Validation);
        assert_eq!(ledger.get_expense(inserted.id).await.unwrap(), Some(inserted));
    }

    #[tokio::test]
    async fn test_delete() {
        let (_dir, ledger) = ledger().await;
        let inserted = ledger.insert_expense(new_expense("2024-03-01", "1", "food")).await.unwrap();
        assert!(ledger.delete_expense(inserted.id).await.unwrap());
        assert!(!ledger.delete_expense(inserted.id).await.unwrap());
        assert!(ledger.get_expense(inserted.id).await.unwrap().is_none());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_writes_take_turns() {
        let (_dir, ledger) = ledger().await;
        let inserted = ledger.insert_expense(new_expense("2024-03-01", "1", "food")).await.unwrap();

        let mut handles = Vec::new();
        for i in 0..32 {
            let ledger = ledger.clone();
            handles.push(tokio::spawn(async move {
                if i % 4 == 0 {
                    ledger
                        .insert_expense(new_expense("2024-03-02", "5", "transport"))
                        .await
                        .map(|_| ())
                } else {
                    ledger
                        .update_expense(inserted.id, move |e| {
                            e.amount += Decimal::ONE;
                            e.note = format!("writer {i}");
                            Ok(())
                        })
                        .await
                        .map(|_| ())
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        // Every read-modify-write saw the previous one, so no increment was lost.
        let stored = ledger.get_expense(inserted.id).await.unwrap().unwrap();
        assert_eq!(stored.amount, Decimal::from(25));
        assert_eq!(ledger.list_expenses(DateRange::all()).await.unwrap().len(), 9);
    }
}

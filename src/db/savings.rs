use super::{parse_stored_amount, parse_stored_date, sum_stored_amounts, Change, Ledger};
use crate::error::{Res, Result};
use crate::model::{format_date, DateRange, NewSaving, Saving};
use anyhow::Context;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::FromRow;
use tracing::debug;

#[derive(Debug, FromRow)]
struct SavingRow {
    id: i64,
    date: String,
    amount: String,
    source: String,
    note: String,
}

impl TryFrom<SavingRow> for Saving {
    type Error = anyhow::Error;

    fn try_from(row: SavingRow) -> Res<Self> {
        Ok(Saving {
            id: row.id,
            date: parse_stored_date(&row.date)?,
            amount: parse_stored_amount(&row.amount)?,
            source: row.source,
            note: row.note,
        })
    }
}

const SELECT_SAVINGS: &str = "SELECT id, date, amount, source, note FROM savings";

impl Ledger {
    pub(crate) async fn insert_saving(&self, saving: NewSaving) -> Result<Saving> {
        self.bounded("Inserting saving", async {
            let mut tx = self.begin_write().await?;
            let id = sqlx::query("INSERT INTO savings (date, amount, source, note) VALUES (?, ?, ?, ?)")
                .bind(format_date(saving.date))
                .bind(saving.amount.to_string())
                .bind(&saving.source)
                .bind(&saving.note)
                .execute(&mut *tx)
                .await
                .context("Unable to insert saving")?
                .last_insert_rowid();
            tx.commit().await?;
            debug!("Inserted saving {id} for '{}'", self.tenant);
            Ok(saving.into_saving(id))
        })
        .await
    }

    /// Lists the savings inside `range`, newest first.
    pub(crate) async fn list_savings(&self, range: DateRange) -> Result<Vec<Saving>> {
        self.bounded("Listing savings", async {
            let sql = format!(
                "{SELECT_SAVINGS} \
                 WHERE (?1 IS NULL OR date >= ?1) AND (?2 IS NULL OR date <= ?2) \
                 ORDER BY date DESC, id DESC"
            );
            let rows: Vec<SavingRow> = sqlx::query_as(&sql)
                .bind(range.start().map(format_date))
                .bind(range.end().map(format_date))
                .fetch_all(&self.pool)
                .await
                .context("Unable to query savings")?;
            rows.into_iter().map(Saving::try_from).collect()
        })
        .await
    }

    pub(crate) async fn get_saving(&self, id: i64) -> Result<Option<Saving>> {
        self.bounded("Fetching saving", async {
            let row: Option<SavingRow> = sqlx::query_as(&format!("{SELECT_SAVINGS} WHERE id = ?"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .with_context(|| format!("Unable to fetch saving {id}"))?;
            row.map(Saving::try_from).transpose()
        })
        .await
    }

    /// Sums all savings with `start <= date`, and `date <= end` when `end` is given. Savings are
    /// not tied to a goal, so every saving in the window counts.
    pub(crate) async fn sum_savings(&self, start: NaiveDate, end: Option<NaiveDate>) -> Result<Decimal> {
        let amounts: Vec<String> = self.bounded("Summing savings", async {
            let amounts: Vec<String> = sqlx::query_scalar(
                "SELECT amount FROM savings WHERE date >= ?1 AND (?2 IS NULL OR date <= ?2)",
            )
            .bind(format_date(start))
            .bind(end.map(format_date))
            .fetch_all(&self.pool)
            .await
            .context("Unable to query saving amounts")?;
            Ok(amounts)
        })
        .await?;
        sum_stored_amounts(&amounts)
    }

    /// Reads the saving, lets `apply` change it and writes it back in one transaction.
    pub(crate) async fn update_saving<F>(&self, id: i64, apply: F) -> Result<Change<Saving>>
    where
        F: FnOnce(&mut Saving) -> Result<()> + Send,
    {
        self.bounded("Updating saving", async {
            let mut tx = self.begin_write().await?;
            let row: Option<SavingRow> = sqlx::query_as(&format!("{SELECT_SAVINGS} WHERE id = ?"))
                .bind(id)
                .fetch_optional(&mut *tx)
                .await
                .with_context(|| format!("Unable to fetch saving {id}"))?;
            let Some(row) = row else {
                return Ok(Ok(Change::NotFound));
            };
            let mut saving = Saving::try_from(row)?;
            if let Err(e) = apply(&mut saving) {
                return Ok(Err(e));
            }
            sqlx::query("UPDATE savings SET date = ?, amount = ?, source = ?, note = ? WHERE id = ?")
                .bind(format_date(saving.date))
                .bind(saving.amount.to_string())
                .bind(&saving.source)
                .bind(&saving.note)
                .bind(id)
                .execute(&mut *tx)
                .await
                .with_context(|| format!("Unable to update saving {id}"))?;
            tx.commit().await?;
            debug!("Updated saving {id} for '{}'", self.tenant);
            Ok(Ok(Change::Updated(saving)))
        })
        .await?
    }

    pub(crate) async fn delete_saving(&self, id: i64) -> Result<bool> {
        self.bounded("Deleting saving", async {
            let mut tx = self.begin_write().await?;
            let deleted = sqlx::query("DELETE FROM savings WHERE id = ?")
                .bind(id)
                .execute(&mut *tx)
                .await
                .with_context(|| format!("Unable to delete saving {id}"))?
                .rows_affected();
            tx.commit().await?;
            Ok(deleted > 0)
        })
        .await
    }
}

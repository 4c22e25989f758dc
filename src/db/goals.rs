use super::{parse_stored_amount, parse_stored_date, Change, Ledger};
use crate::error::{Res, Result};
use crate::model::{format_date, NewSavingGoal, SavingGoal};
use anyhow::Context;
use sqlx::FromRow;
use tracing::debug;

#[derive(Debug, FromRow)]
struct GoalRow {
    id: i64,
    name: String,
    target_amount: String,
    start_date: String,
    end_date: Option<String>,
    note: String,
}

impl TryFrom<GoalRow> for SavingGoal {
    type Error = anyhow::Error;

    fn try_from(row: GoalRow) -> Res<Self> {
        Ok(SavingGoal {
            id: row.id,
            name: row.name,
            target_amount: parse_stored_amount(&row.target_amount)?,
            start_date: parse_stored_date(&row.start_date)?,
            end_date: row.end_date.as_deref().map(parse_stored_date).transpose()?,
            note: row.note,
        })
    }
}

const SELECT_GOALS: &str =
    "SELECT id, name, target_amount, start_date, end_date, note FROM saving_goals";

impl Ledger {
    pub(crate) async fn insert_goal(&self, goal: NewSavingGoal) -> Result<SavingGoal> {
        self.bounded("Inserting saving goal", async {
            let mut tx = self.begin_write().await?;
            let id = sqlx::query(
                "INSERT INTO saving_goals (name, target_amount, start_date, end_date, note) \
                 VALUES (?, ?, ?, ?, ?)",
            )
            .bind(&goal.name)
            .bind(goal.target_amount.to_string())
            .bind(format_date(goal.start_date))
            .bind(goal.end_date.map(format_date))
            .bind(&goal.note)
            .execute(&mut *tx)
            .await
            .context("Unable to insert saving goal")?
            .last_insert_rowid();
            tx.commit().await?;
            debug!("Inserted saving goal {id} for '{}'", self.tenant);
            Ok(goal.into_goal(id))
        })
        .await
    }

    /// Lists all goals, most recently started first.
    pub(crate) async fn list_goals(&self) -> Result<Vec<SavingGoal>> {
        self.bounded("Listing saving goals", async {
            let rows: Vec<GoalRow> =
                sqlx::query_as(&format!("{SELECT_GOALS} ORDER BY start_date DESC, id DESC"))
                    .fetch_all(&self.pool)
                    .await
                    .context("Unable to query saving goals")?;
            rows.into_iter().map(SavingGoal::try_from).collect()
        })
        .await
    }

    pub(crate) async fn get_goal(&self, id: i64) -> Result<Option<SavingGoal>> {
        self.bounded("Fetching saving goal", async {
            let row: Option<GoalRow> = sqlx::query_as(&format!("{SELECT_GOALS} WHERE id = ?"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .with_context(|| format!("Unable to fetch saving goal {id}"))?;
            row.map(SavingGoal::try_from).transpose()
        })
        .await
    }

    /// Reads the goal, lets `apply` change it and writes it back in one transaction. `apply` sees
    /// the merged record, so it can reject combinations such as an end date before the start date.
    pub(crate) async fn update_goal<F>(&self, id: i64, apply: F) -> Result<Change<SavingGoal>>
    where
        F: FnOnce(&mut SavingGoal) -> Result<()> + Send,
    {
        self.bounded("Updating saving goal", async {
            let mut tx = self.begin_write().await?;
            let row: Option<GoalRow> = sqlx::query_as(&format!("{SELECT_GOALS} WHERE id = ?"))
                .bind(id)
                .fetch_optional(&mut *tx)
                .await
                .with_context(|| format!("Unable to fetch saving goal {id}"))?;
            let Some(row) = row else {
                return Ok(Ok(Change::NotFound));
            };
            let mut goal = SavingGoal::try_from(row)?;
            if let Err(e) = apply(&mut goal) {
                return Ok(Err(e));
            }
            sqlx::query(
                "UPDATE saving_goals \
                 SET name = ?, target_amount = ?, start_date = ?, end_date = ?, note = ? \
                 WHERE id = ?",
            )
            .bind(&goal.name)
            .bind(goal.target_amount.to_string())
            .bind(format_date(goal.start_date))
            .bind(goal.end_date.map(format_date))
            .bind(&goal.note)
            .bind(id)
            .execute(&mut *tx)
            .await
            .with_context(|| format!("Unable to update saving goal {id}"))?;
            tx.commit().await?;
            debug!("Updated saving goal {id} for '{}'", self.tenant);
            Ok(Ok(Change::Updated(goal)))
        })
        .await?
    }

    pub(crate) async fn delete_goal(&self, id: i64) -> Result<bool> {
        self.bounded("Deleting saving goal", async {
            let mut tx = self.begin_write().await?;
            let deleted = sqlx::query("DELETE FROM saving_goals WHERE id = ?")
                .bind(id)
                .execute(&mut *tx)
                .await
                .with_context(|| format!("Unable to delete saving goal {id}"))?
                .rows_affected();
            tx.commit().await?;
            Ok(deleted > 0)
        })
        .await
    }
}

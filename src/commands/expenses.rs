//! Expense command handlers.

use crate::analytics::{summarize_by_category, CategoryTotal};
use crate::args::{
    AddExpenseArgs, DateRangeArgs, ExpenseIdArgs, ExpenseSummaryArgs, UpdateExpenseArgs,
};
use crate::commands::{count_noun, positive, Out, Status};
use crate::db::Change;
use crate::model::{parse_date, DateRange, Expense, NewExpense};
use crate::tenant::TenantId;
use crate::{Config, Result};
use tracing::debug;

/// Records an expense.
///
/// The category and subcategory are normalized onto the vocabulary, so an unknown category is
/// stored as `misc` rather than rejected. The normalized values are returned in the new `Expense`.
///
/// # Errors
/// - `Validation` if the date is malformed or the amount is not positive. Nothing is written.
/// - `Config` if the vocabulary cannot be loaded.
pub async fn add_expense(
    config: &Config,
    tenant: &TenantId,
    args: AddExpenseArgs,
) -> Result<Out<Expense>> {
    let date = parse_date("date", &args.date)?;
    let amount = positive("amount", args.amount)?;
    let vocabulary = config.vocabulary().load().await?;
    let (category, subcategory) = vocabulary.normalize_category(&args.category, &args.subcategory);

    let ledger = config.ledger(tenant).await?;
    let expense = ledger
        .insert_expense(NewExpense {
            date,
            amount,
            category,
            subcategory,
            note: args.note,
        })
        .await?;
    let message = format!(
        "Added expense {} of {} in {}/{}",
        expense.id, expense.amount, expense.category, expense.subcategory
    );
    Ok(Out::new(message, expense))
}

/// Lists expenses newest first, optionally restricted to an inclusive date range.
pub async fn list_expenses(
    config: &Config,
    tenant: &TenantId,
    args: DateRangeArgs,
) -> Result<Out<Vec<Expense>>> {
    let range = DateRange::parse(args.start_date.as_deref(), args.end_date.as_deref())?;
    let expenses = config.ledger(tenant).await?.list_expenses(range).await?;
    Ok(Out::new(
        format!("Found {}", count_noun(expenses.len(), "expense")),
        expenses,
    ))
}

/// Totals expenses per category over an inclusive date range, largest total first.
pub async fn expense_summary_by_category(
    config: &Config,
    tenant: &TenantId,
    args: ExpenseSummaryArgs,
) -> Result<Out<Vec<CategoryTotal>>> {
    let range = DateRange::new(
        Some(parse_date("start_date", &args.start_date)?),
        Some(parse_date("end_date", &args.end_date)?),
    )?;
    let category = args
        .category
        .map(|c| c.trim().to_lowercase())
        .filter(|c| !c.is_empty());

    let expenses = config
        .ledger(tenant)
        .await?
        .expenses_where(range, category.as_deref())
        .await?;
    let summary = summarize_by_category(&expenses)?;
    Ok(Out::new(
        format!(
            "Summarized {} in {}",
            count_noun(expenses.len(), "expense"),
            count_noun(summary.len(), "category")
        ),
        summary,
    ))
}

/// Changes the supplied fields of an expense and leaves the rest untouched.
///
/// A new category is normalized together with the supplied subcategory or, if none is supplied,
/// with the expense's current subcategory. A new subcategory alone is normalized against the
/// expense's current category.
///
/// Returns `Status::NoChanges` if no field is supplied and `Status::NotFound` if there is no such
/// expense.
pub async fn update_expense(
    config: &Config,
    tenant: &TenantId,
    args: UpdateExpenseArgs,
) -> Result<Out<Expense>> {
    let id = args.expense_id;
    let updates = args.updates;
    if updates.is_empty() {
        return Ok(Out::with_status(
            Status::NoChanges,
            format!("No fields to update for expense {id}"),
        ));
    }

    let date = updates
        .date
        .as_deref()
        .map(|d| parse_date("date", d))
        .transpose()?;
    let amount = updates
        .amount
        .map(|a| positive("amount", a))
        .transpose()?;
    let vocabulary = if updates.category.is_some() || updates.subcategory.is_some() {
        Some(config.vocabulary().load().await?)
    } else {
        None
    };

    let ledger = config.ledger(tenant).await?;
    let change = ledger
        .update_expense(id, move |expense| {
            if let Some(date) = date {
                expense.date = date;
            }
            if let Some(amount) = amount {
                expense.amount = amount;
            }
            if let Some(vocabulary) = vocabulary {
                let (category, subcategory) = match (updates.category, updates.subcategory) {
                    (Some(category), Some(subcategory)) => {
                        vocabulary.normalize_category(&category, &subcategory)
                    }
                    (Some(category), None) => {
                        vocabulary.normalize_category(&category, &expense.subcategory)
                    }
                    (None, Some(subcategory)) => {
                        vocabulary.normalize_category(&expense.category, &subcategory)
                    }
                    (None, None) => (expense.category.clone(), expense.subcategory.clone()),
                };
                expense.category = category;
                expense.subcategory = subcategory;
            }
            if let Some(note) = updates.note {
                expense.note = note;
            }
            Ok(())
        })
        .await?;

    Ok(match change {
        Change::Updated(expense) => {
            debug!("Expense {id} is now {expense:?}");
            Out::new(format!("Updated expense {id}"), expense)
        }
        Change::NotFound => Out::with_status(Status::NotFound, format!("Expense {id} not found")),
    })
}

pub async fn delete_expense(
    config: &Config,
    tenant: &TenantId,
    args: ExpenseIdArgs,
) -> Result<Out<()>> {
    let id = args.expense_id;
    let deleted = config.ledger(tenant).await?.delete_expense(id).await?;
    Ok(if deleted {
        format!("Deleted expense {id}").into()
    } else {
        Out::with_status(Status::NotFound, format!("Expense {id} not found"))
    })
}

//! Budget command handlers.

use crate::analytics::{budget_status, BudgetStatus};
use crate::args::{BudgetArgs, BudgetStatusArgs, CategoryArgs, UserArgs};
use crate::commands::{count_noun, positive, Out, Status};
use crate::model::{month_bounds, Budget};
use crate::tenant::TenantId;
use crate::{Config, Result};

/// Budgets are keyed by the normalized category, so "Food " and "food" address the same budget.
fn lookup_key(category: &str) -> String {
    category.trim().to_lowercase()
}

/// Sets the monthly limit for a category, creating the budget or replacing its limit.
///
/// The category is normalized onto the vocabulary, so an unknown category is budgeted as `misc`.
pub async fn set_budget(config: &Config, tenant: &TenantId, args: BudgetArgs) -> Result<Out<Budget>> {
    let monthly_limit = positive("monthly_limit", args.monthly_limit)?;
    let (category, _) = config
        .vocabulary()
        .load()
        .await?
        .normalize_category(&args.category, "");
    let budget = config
        .ledger(tenant)
        .await?
        .upsert_budget(&category, monthly_limit)
        .await?;
    let message = format!(
        "Set the monthly budget for {} to {}",
        budget.category, budget.monthly_limit
    );
    Ok(Out::new(message, budget))
}

/// Lists all budgets ordered by category.
pub async fn list_budgets(
    config: &Config,
    tenant: &TenantId,
    _args: UserArgs,
) -> Result<Out<Vec<Budget>>> {
    let budgets = config.ledger(tenant).await?.list_budgets().await?;
    Ok(Out::new(
        format!("Found {}", count_noun(budgets.len(), "budget")),
        budgets,
    ))
}

/// Compares a category's spending during one calendar month with its budget.
///
/// Returns `Status::NoBudget` if the category has no budget.
///
/// # Errors
/// - `Validation` if `month` is not between 1 and 12.
pub async fn check_budget_status(
    config: &Config,
    tenant: &TenantId,
    args: BudgetStatusArgs,
) -> Result<Out<BudgetStatus>> {
    let (start, end) = month_bounds(args.year, args.month)?;
    let category = lookup_key(&args.category);

    let ledger = config.ledger(tenant).await?;
    let Some(budget) = ledger.get_budget(&category).await? else {
        return Ok(Out::with_status(
            Status::NoBudget,
            format!("No budget set for {category}"),
        ));
    };
    let spent = ledger.sum_expenses(&category, start, end).await?;
    let status = budget_status(&budget, args.year, args.month, spent)?;
    let message = format!(
        "{category} is {} for {}-{:02} at {}% of its budget",
        status.budget_status, args.year, args.month, status.usage_percentage
    );
    Ok(Out::new(message, status))
}

/// Changes the limit of an existing budget. Unlike `set_budget`, this never creates one.
///
/// Returns `Status::NotFound` if the category has no budget.
pub async fn update_budget(
    config: &Config,
    tenant: &TenantId,
    args: BudgetArgs,
) -> Result<Out<Budget>> {
    let monthly_limit = positive("monthly_limit", args.monthly_limit)?;
    let (category, _) = config
        .vocabulary()
        .load()
        .await?
        .normalize_category(&args.category, "");
    let updated = config
        .ledger(tenant)
        .await?
        .update_budget_limit(&category, monthly_limit)
        .await?;
    Ok(match updated {
        Some(budget) => Out::new(
            format!(
                "Updated the monthly budget for {} to {}",
                budget.category, budget.monthly_limit
            ),
            budget,
        ),
        None => Out::with_status(Status::NotFound, format!("No budget found for {category}")),
    })
}

pub async fn delete_budget(
    config: &Config,
    tenant: &TenantId,
    args: CategoryArgs,
) -> Result<Out<()>> {
    let category = lookup_key(&args.category);
    let deleted = config.ledger(tenant).await?.delete_budget(&category).await?;
    Ok(if deleted {
        format!("Deleted the budget for {category}").into()
    } else {
        Out::with_status(Status::NotFound, format!("No budget found for {category}"))
    })
}

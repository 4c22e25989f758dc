//! Derived figures over ledger snapshots: category summaries, budget status, goal progress and goal
//! pacing.
//!
//! These functions do no I/O. The command layer reads the rows and totals from the ledger and
//! passes them in, together with the calendar date to evaluate against, so every calculation here
//! is deterministic. Percentages and monthly figures are rounded to two decimal places for output,
//! while classifications are made on the unrounded values.
//!
//! A total or percentage that does not fit in a `Decimal` is a `Validation` error.

use crate::error::{Error, Result};
use crate::model::{months_between, Budget, Expense, SavingGoal};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

const OUTPUT_DP: u32 = 2;

/// The total and number of expenses for one category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryTotal {
    pub category: String,
    pub total_amount: Decimal,
    pub count: u64,
}

/// Groups `expenses` by category, ordered by total descending. Ties are ordered by category name.
pub fn summarize_by_category(expenses: &[Expense]) -> Result<Vec<CategoryTotal>> {
    let mut totals: HashMap<&str, (Decimal, u64)> = HashMap::new();
    for expense in expenses {
        let entry = totals
            .entry(expense.category.as_str())
            .or_insert((Decimal::ZERO, 0));
        entry.0 = entry.0.checked_add(expense.amount).ok_or_else(|| {
            Error::validation(format!("The total for {} is too large", expense.category))
        })?;
        entry.1 += 1;
    }
    let mut summary: Vec<CategoryTotal> = totals
        .into_iter()
        .map(|(category, (total_amount, count))| CategoryTotal {
            category: category.to_string(),
            total_amount,
            count,
        })
        .collect();
    summary.sort_by(|a, b| {
        b.total_amount
            .cmp(&a.total_amount)
            .then_with(|| a.category.cmp(&b.category))
    });
    Ok(summary)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BudgetState {
    /// Spending is strictly greater than the limit.
    OverBudget,
    /// Spending is at or below the limit.
    UnderBudget,
}

serde_plain::derive_display_from_serialize!(BudgetState);

/// How a category's spending in one calendar month compares to its budget.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BudgetStatus {
    pub category: String,
    pub year: i32,
    pub month: u32,
    pub monthly_limit: Decimal,
    pub total_expenses: Decimal,
    /// Negative when the budget has been exceeded.
    pub remaining_budget: Decimal,
    pub budget_status: BudgetState,
    pub usage_percentage: Decimal,
}

/// Compares `total_expenses`, the category's spending in `year`/`month`, to `budget`.
pub fn budget_status(
    budget: &Budget,
    year: i32,
    month: u32,
    total_expenses: Decimal,
) -> Result<BudgetStatus> {
    let budget_status = if total_expenses > budget.monthly_limit {
        BudgetState::OverBudget
    } else {
        BudgetState::UnderBudget
    };
    Ok(BudgetStatus {
        category: budget.category.clone(),
        year,
        month,
        monthly_limit: budget.monthly_limit,
        total_expenses,
        remaining_budget: budget.monthly_limit - total_expenses,
        budget_status,
        usage_percentage: percentage(total_expenses, budget.monthly_limit)?,
    })
}

/// How much has been saved towards a goal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoalProgress {
    pub goal_id: i64,
    pub name: String,
    pub target_amount: Decimal,
    pub total_saved: Decimal,
    /// Never negative; saving more than the target leaves zero remaining.
    pub remaining: Decimal,
    pub progress_percentage: Decimal,
}

/// `total_saved` is the sum of all savings within the goal's date window.
pub fn goal_progress(goal: &SavingGoal, total_saved: Decimal) -> Result<GoalProgress> {
    Ok(GoalProgress {
        goal_id: goal.id,
        name: goal.name.clone(),
        target_amount: goal.target_amount,
        total_saved,
        remaining: (goal.target_amount - total_saved).max(Decimal::ZERO),
        progress_percentage: percentage(total_saved, goal.target_amount)?,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Pace {
    /// The deadline month has been reached and the target has not.
    MissedGoal,
    /// The average saved per elapsed month is at least the amount still needed per remaining
    /// month.
    OnTrack,
    /// The deadline is still ahead and the monthly average falls short of what is needed.
    Behind,
}

serde_plain::derive_display_from_serialize!(Pace);

/// A projection of whether a goal will be met by its end date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoalInsight {
    pub goal: String,
    pub target_amount: Decimal,
    pub total_saved: Decimal,
    pub months_total: i64,
    pub months_elapsed: i64,
    pub months_remaining: i64,
    pub required_monthly_saving: Decimal,
    pub current_monthly_average: Decimal,
    pub pace_status: Pace,
}

/// Evaluates a goal's pace as of `today`. `total_saved` is the sum of savings dated from the
/// goal's start through `today`.
///
/// Returns `None` for an open-ended goal, which has no deadline to pace against. Month counts come
/// from `months_between`, so the day of the month is ignored.
pub fn goal_insight(goal: &SavingGoal, total_saved: Decimal, today: NaiveDate) -> Option<GoalInsight> {
    let end_date = goal.end_date?;
    let months_total = months_between(goal.start_date, end_date).max(1);
    let months_elapsed = months_between(goal.start_date, today).max(0);
    let months_remaining = (months_total - months_elapsed).max(0);
    let remaining_amount = (goal.target_amount - total_saved).max(Decimal::ZERO);

    let required_monthly = if months_remaining > 0 {
        divide(remaining_amount, Decimal::from(months_remaining))
    } else {
        Decimal::ZERO
    };
    let current_monthly_average = if months_elapsed > 0 {
        divide(total_saved, Decimal::from(months_elapsed))
    } else {
        total_saved
    };

    let pace_status = if months_remaining == 0 && remaining_amount > Decimal::ZERO {
        Pace::MissedGoal
    } else if current_monthly_average >= required_monthly {
        Pace::OnTrack
    } else {
        Pace::Behind
    };

    Some(GoalInsight {
        goal: goal.name.clone(),
        target_amount: goal.target_amount,
        total_saved,
        months_total,
        months_elapsed,
        months_remaining,
        required_monthly_saving: required_monthly.round_dp(OUTPUT_DP),
        current_monthly_average: current_monthly_average.round_dp(OUTPUT_DP),
        pace_status,
    })
}

/// `100 * part / whole` rounded for output, or zero when `whole` is zero.
fn percentage(part: Decimal, whole: Decimal) -> Result<Decimal> {
    if whole.is_zero() {
        return Ok(Decimal::ZERO);
    }
    part.checked_div(whole)
        .and_then(|ratio| ratio.checked_mul(Decimal::ONE_HUNDRED))
        .map(|pct| pct.round_dp(OUTPUT_DP))
        .ok_or_else(|| Error::validation(format!("{part} is too large a share of {whole}")))
}

fn divide(numerator: Decimal, denominator: Decimal) -> Decimal {
    numerator.checked_div(denominator).unwrap_or(Decimal::ZERO)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorType;
    use std::str::FromStr;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::from_str(s).unwrap()
    }

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn expense(id: i64, category: &str, amount: &str) -> Expense {
        Expense {
            id,
            date: date("2024-03-01"),
            amount: dec(amount),
            category: category.to_string(),
            subcategory: "other".to_string(),
            note: String::new(),
        }
    }

    fn goal(target: &str, start: &str, end: Option<&str>) -> SavingGoal {
        SavingGoal {
            id: 7,
            name: "emergency fund".to_string(),
            target_amount: dec(target),
            start_date: date(start),
            end_date: end.map(date),
            note: String::new(),
        }
    }

    #[test]
    fn test_summary_orders_by_total_then_name() {
        let expenses = vec![
            expense(1, "food", "10"),
            expense(2, "transport", "30"),
            expense(3, "food", "25.50"),
            expense(4, "health", "30"),
        ];
        let summary = summarize_by_category(&expenses).unwrap();
        assert_eq!(
            summary,
            vec![
                CategoryTotal {
                    category: "food".to_string(),
                    total_amount: dec("35.50"),
                    count: 2
                },
                CategoryTotal {
                    category: "health".to_string(),
                    total_amount: dec("30"),
                    count: 1
                },
                CategoryTotal {
                    category: "transport".to_string(),
                    total_amount: dec("30"),
                    count: 1
                },
            ]
        );
        assert!(summarize_by_category(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_budget_over() {
        let budget = Budget {
            id: 1,
            category: "food".to_string(),
            monthly_limit: dec("500"),
        };
        let status = budget_status(&budget, 2024, 3, dec("530")).unwrap();
        assert_eq!(status.budget_status, BudgetState::OverBudget);
        assert_eq!(status.remaining_budget, dec("-30"));
        assert_eq!(status.usage_percentage, dec("106.0"));
        assert_eq!(status.category, "food");
    }

    #[test]
    fn test_budget_exactly_at_limit_is_under() {
        let budget = Budget {
            id: 1,
            category: "food".to_string(),
            monthly_limit: dec("300"),
        };
        let status = budget_status(&budget, 2024, 3, dec("300")).unwrap();
        assert_eq!(status.budget_status, BudgetState::UnderBudget);
        assert_eq!(status.remaining_budget, Decimal::ZERO);
        assert_eq!(status.usage_percentage, dec("100"));

        let status = budget_status(&budget, 2024, 3, dec("100")).unwrap();
        assert_eq!(status.usage_percentage, dec("33.33"));
    }

    #[test]
    fn test_budget_near_decimal_max() {
        let budget = Budget {
            id: 1,
            category: "food".to_string(),
            monthly_limit: dec("1000000000000000000000000000"),
        };
        let status = budget_status(&budget, 2024, 3, dec("2000000000000000000000000000")).unwrap();
        assert_eq!(status.budget_status, BudgetState::OverBudget);
        assert_eq!(status.usage_percentage, dec("200"));

        let tiny = Budget {
            monthly_limit: dec("0.0000000000000000000000000001"),
            ..budget
        };
        let err = budget_status(&tiny, 2024, 3, dec("1000000000000000000000000000")).unwrap_err();
        assert_eq!(err.error_type(), ErrorType::Validation);
    }

    #[test]
    fn test_summary_total_too_large() {
        let expenses = vec![
            expense(1, "food", "50000000000000000000000000000"),
            expense(2, "food", "50000000000000000000000000000"),
        ];
        let err = summarize_by_category(&expenses).unwrap_err();
        assert_eq!(err.error_type(), ErrorType::Validation);
    }

    #[test]
    fn test_goal_progress() {
        let g = goal("1200", "2024-01-01", Some("2024-12-31"));
        let progress = goal_progress(&g, dec("200")).unwrap();
        assert_eq!(progress.goal_id, 7);
        assert_eq!(progress.remaining, dec("1000"));
        assert_eq!(progress.progress_percentage, dec("16.67"));

        let done = goal_progress(&g, dec("1500")).unwrap();
        assert_eq!(done.remaining, Decimal::ZERO);
        assert_eq!(done.progress_percentage, dec("125"));
    }

    #[test]
    fn test_goal_progress_zero_target() {
        let g = goal("0", "2024-01-01", None);
        let progress = goal_progress(&g, dec("50")).unwrap();
        assert_eq!(progress.progress_percentage, Decimal::ZERO);
        assert_eq!(progress.remaining, Decimal::ZERO);
    }

    #[test]
    fn test_insight_behind() {
        let g = goal("1200", "2024-01-01", Some("2024-12-31"));
        let insight = goal_insight(&g, dec("200"), date("2024-03-01")).unwrap();
        assert_eq!(insight.months_total, 11);
        assert_eq!(insight.months_elapsed, 2);
        assert_eq!(insight.months_remaining, 9);
        assert_eq!(insight.total_saved, dec("200"));
        assert_eq!(insight.required_monthly_saving, dec("111.11"));
        assert_eq!(insight.current_monthly_average, dec("100"));
        assert_eq!(insight.pace_status, Pace::Behind);
    }

    #[test]
    fn test_insight_on_track() {
        let g = goal("1200", "2024-01-01", Some("2024-12-31"));
        let insight = goal_insight(&g, dec("400"), date("2024-03-20")).unwrap();
        assert_eq!(insight.required_monthly_saving, dec("88.89"));
        assert_eq!(insight.current_monthly_average, dec("200"));
        assert_eq!(insight.pace_status, Pace::OnTrack);
    }

    #[test]
    fn test_insight_missed_and_met() {
        let g = goal("1200", "2024-01-01", Some("2024-06-30"));
        let missed = goal_insight(&g, dec("600"), date("2024-08-01")).unwrap();
        assert_eq!(missed.months_remaining, 0);
        assert_eq!(missed.required_monthly_saving, Decimal::ZERO);
        assert_eq!(missed.pace_status, Pace::MissedGoal);

        let met = goal_insight(&g, dec("1200"), date("2024-08-01")).unwrap();
        assert_eq!(met.pace_status, Pace::OnTrack);
    }

    #[test]
    fn test_insight_before_start() {
        let g = goal("1200", "2024-05-01", Some("2024-05-20"));
        let insight = goal_insight(&g, dec("30"), date("2024-04-15")).unwrap();
        // A deadline inside the start month still counts as one month.
        assert_eq!(insight.months_total, 1);
        assert_eq!(insight.months_elapsed, 0);
        assert_eq!(insight.months_remaining, 1);
        assert_eq!(insight.current_monthly_average, dec("30"));
        assert_eq!(insight.required_monthly_saving, dec("1170"));
        assert_eq!(insight.pace_status, Pace::Behind);
    }

    #[test]
    fn test_insight_rounding_does_not_change_classification() {
        // 100 / 3 rounds to 33.33 for both figures, but the average is still exactly what is
        // required, so the goal is on track.
        let g = goal("200", "2024-01-01", Some("2024-07-01"));
        let insight = goal_insight(&g, dec("100"), date("2024-04-01")).unwrap();
        assert_eq!(insight.months_elapsed, 3);
        assert_eq!(insight.months_remaining, 3);
        assert_eq!(insight.required_monthly_saving, dec("33.33"));
        assert_eq!(insight.current_monthly_average, dec("33.33"));
        assert_eq!(insight.pace_status, Pace::OnTrack);
    }

    #[test]
    fn test_open_ended_goal_has_no_insight() {
        let g = goal("1200", "2024-01-01", None);
        assert!(goal_insight(&g, dec("100"), date("2024-03-01")).is_none());
    }

    #[test]
    fn test_pace_display() {
        assert_eq!(Pace::MissedGoal.to_string(), "missed_goal");
        assert_eq!(BudgetState::OverBudget.to_string(), "over_budget");
    }
}

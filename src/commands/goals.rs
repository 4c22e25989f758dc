//! Saving goal command handlers, including goal progress and pacing insights.

use crate::analytics::{goal_insight, goal_progress, GoalInsight, GoalProgress};
use crate::args::{AddSavingGoalArgs, GoalIdArgs, UpdateSavingGoalArgs, UserArgs};
use crate::commands::{count_noun, positive, required, Out, Status};
use crate::db::Change;
use crate::error::Error;
use crate::model::{format_date, parse_date, parse_optional_date, NewSavingGoal, SavingGoal};
use crate::tenant::TenantId;
use crate::{Config, Result};
use chrono::{Local, NaiveDate};

/// Rejects an end date that comes before the start date.
fn check_dates(start_date: NaiveDate, end_date: Option<NaiveDate>) -> Result<()> {
    match end_date {
        Some(end) if end < start_date => Err(Error::validation(format!(
            "end_date {} must not be before start_date {}",
            format_date(end),
            format_date(start_date)
        ))),
        _ => Ok(()),
    }
}

/// Creates a saving goal.
///
/// # Errors
/// - `Validation` if the name is blank, the target is not positive, a date is malformed, or the
///   end date is before the start date.
pub async fn add_saving_goal(
    config: &Config,
    tenant: &TenantId,
    args: AddSavingGoalArgs,
) -> Result<Out<SavingGoal>> {
    let name = required("name", &args.name)?;
    let target_amount = positive("target_amount", args.target_amount)?;
    let start_date = parse_date("start_date", &args.start_date)?;
    let end_date = parse_optional_date("end_date", args.end_date.as_deref())?;
    check_dates(start_date, end_date)?;

    let goal = config
        .ledger(tenant)
        .await?
        .insert_goal(NewSavingGoal {
            name,
            target_amount,
            start_date,
            end_date,
            note: args.note,
        })
        .await?;
    let message = format!("Added saving goal {} '{}'", goal.id, goal.name);
    Ok(Out::new(message, goal))
}

/// Lists all saving goals, most recently started first.
pub async fn list_saving_goals(
    config: &Config,
    tenant: &TenantId,
    _args: UserArgs,
) -> Result<Out<Vec<SavingGoal>>> {
    let goals = config.ledger(tenant).await?.list_goals().await?;
    Ok(Out::new(
        format!("Found {}", count_noun(goals.len(), "saving goal")),
        goals,
    ))
}

/// Reports how much has been saved towards a goal. Every saving dated within the goal's window
/// counts, whatever its source.
pub async fn get_saving_goal_progress(
    config: &Config,
    tenant: &TenantId,
    args: GoalIdArgs,
) -> Result<Out<GoalProgress>> {
    let id = args.goal_id;
    let ledger = config.ledger(tenant).await?;
    let Some(goal) = ledger.get_goal(id).await? else {
        return Ok(Out::with_status(Status::NotFound, format!("Goal {id} not found")));
    };
    let total_saved = ledger.sum_savings(goal.start_date, goal.end_date).await?;
    let progress = goal_progress(&goal, total_saved)?;
    let message = format!(
        "Goal '{}' is {}% complete",
        progress.name, progress.progress_percentage
    );
    Ok(Out::new(message, progress))
}

/// Reports whether a goal is on pace to be met by its end date, as of today's local date.
///
/// Returns `Status::NoDeadline` for a goal without an end date.
pub async fn get_saving_goal_insights(
    config: &Config,
    tenant: &TenantId,
    args: GoalIdArgs,
) -> Result<Out<GoalInsight>> {
    insights_as_of(config, tenant, args.goal_id, Local::now().date_naive()).await
}

async fn insights_as_of(
    config: &Config,
    tenant: &TenantId,
    id: i64,
    today: NaiveDate,
) -> Result<Out<GoalInsight>> {
    let ledger = config.ledger(tenant).await?;
    let Some(goal) = ledger.get_goal(id).await? else {
        return Ok(Out::with_status(Status::NotFound, format!("Goal {id} not found")));
    };
    if goal.end_date.is_none() {
        return Ok(Out::with_status(
            Status::NoDeadline,
            format!("Goal {id} has no end date"),
        ));
    }
    let total_saved = ledger.sum_savings(goal.start_date, Some(today)).await?;
    Ok(match goal_insight(&goal, total_saved, today) {
        Some(insight) => {
            let message = format!("Goal '{}' is {}", insight.goal, insight.pace_status);
            Out::new(message, insight)
        }
        None => Out::with_status(Status::NoDeadline, format!("Goal {id} has no end date")),
    })
}

/// Changes the supplied fields of a goal and leaves the rest untouched. An empty `end_date` makes
/// the goal open-ended.
///
/// # Errors
/// - `Validation` if a supplied value is invalid, or if the goal would end before it starts.
pub async fn update_saving_goal(
    config: &Config,
    tenant: &TenantId,
    args: UpdateSavingGoalArgs,
) -> Result<Out<SavingGoal>> {
    let id = args.goal_id;
    let updates = args.updates;
    if updates.is_empty() {
        return Ok(Out::with_status(
            Status::NoChanges,
            format!("No fields to update for goal {id}"),
        ));
    }

    let name = updates
        .name
        .as_deref()
        .map(|n| required("name", n))
        .transpose()?;
    let target_amount = updates
        .target_amount
        .map(|a| positive("target_amount", a))
        .transpose()?;
    let start_date = updates
        .start_date
        .as_deref()
        .map(|d| parse_date("start_date", d))
        .transpose()?;
    let end_date = match updates.end_date.as_deref() {
        Some(raw) => Some(parse_optional_date("end_date", Some(raw))?),
        None => None,
    };
    let note = updates.note;

    let change = config
        .ledger(tenant)
        .await?
        .update_goal(id, move |goal| {
            if let Some(name) = name {
                goal.name = name;
            }
            if let Some(target_amount) = target_amount {
                goal.target_amount = target_amount;
            }
            if let Some(start_date) = start_date {
                goal.start_date = start_date;
            }
            if let Some(end_date) = end_date {
                goal.end_date = end_date;
            }
            if let Some(note) = note {
                goal.note = note;
            }
            check_dates(goal.start_date, goal.end_date)
        })
        .await?;

    Ok(match change {
        Change::Updated(goal) => Out::new(format!("Updated goal {id}"), goal),
        Change::NotFound => Out::with_status(Status::NotFound, format!("Goal {id} not found")),
    })
}

pub async fn delete_saving_goal(
    config: &Config,
    tenant: &TenantId,
    args: GoalIdArgs,
) -> Result<Out<()>> {
    let id = args.goal_id;
    let deleted = config.ledger(tenant).await?.delete_goal(id).await?;
    Ok(if deleted {
        format!("Deleted goal {id}").into()
    } else {
        Out::with_status(Status::NotFound, format!("Goal {id} not found"))
    })
}

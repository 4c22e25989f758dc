//! Command handlers.
//!
//! There is one async function per ledger operation. Each takes the `Config` and the `TenantId`
//! whose ledger it works on, validates and normalizes its input before anything is written, and
//! returns an `Out` record. Outcomes that are expected in normal use, such as a missing id, are
//! reported through `Out::status` instead of as errors.

mod budgets;
mod expenses;
mod goals;
mod init;
mod mcp;
mod savings;
mod users;
mod vocabulary;

use crate::error::{Error, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use tracing::{debug, info};

pub use budgets::{check_budget_status, delete_budget, list_budgets, set_budget, update_budget};
pub use expenses::{
    add_expense, delete_expense, expense_summary_by_category, list_expenses, update_expense,
};
pub use goals::{
    add_saving_goal, delete_saving_goal, get_saving_goal_insights, get_saving_goal_progress,
    list_saving_goals, update_saving_goal,
};
pub use init::init;
pub use mcp::mcp;
pub use savings::{add_saving, delete_saving, list_savings, update_saving};
pub use users::{get_current_user, initialize_user, set_current_user, UserInfo};
pub use vocabulary::get_vocabulary;

/// The outcome of a command that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    #[default]
    Ok,
    /// The record addressed by id (or category) does not exist.
    NotFound,
    /// An update supplied no fields. Nothing was read or written.
    NoChanges,
    /// A budget status was requested for a category without a budget.
    NoBudget,
    /// Pacing insights were requested for a goal without an end date.
    NoDeadline,
}

serde_plain::derive_display_from_serialize!(Status);

/// The output type for a command. This allows the command to return a consistent status, message
/// and, optionally, structured data to both the command line and MCP server interfaces.
#[derive(Debug, Clone, Serialize)]
pub struct Out<T>
where
    T: Serialize + Clone + Debug,
{
    status: Status,

    /// A message that can be printed to the user regarding the outcome of the command execution.
    message: String,

    /// Any structured data that needs to be output from the call.
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
}

impl<T, S> From<S> for Out<T>
where
    T: Debug + Clone + Serialize,
    S: Into<String>,
{
    fn from(value: S) -> Self {
        Out::new_message(value)
    }
}

impl<T> Out<T>
where
    T: Serialize + Clone + Debug,
{
    /// Create a new `Ok` `Out` object that has `Some(data)`.
    pub fn new<S>(message: S, data: T) -> Self
    where
        S: Into<String>,
    {
        Self {
            status: Status::Ok,
            message: message.into(),
            data: Some(data),
        }
    }

    /// Create a new `Ok` `Out` object that has `None` for `data`.
    pub fn new_message<S>(message: S) -> Self
    where
        S: Into<String>,
    {
        Self::with_status(Status::Ok, message)
    }

    /// Create an `Out` object that reports a status other than `Ok`.
    pub fn with_status<S>(status: Status, message: S) -> Self
    where
        S: Into<String>,
    {
        Self {
            status,
            message: message.into(),
            data: None,
        }
    }

    pub fn status(&self) -> Status {
        self.status
    }

    /// Get the `message`.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Get the structured data stored in `data`.
    pub fn data(&self) -> Option<&T> {
        self.data.as_ref()
    }

    /// Print the message to `info!` and the structured data (if it exists) as JSON to `debug!`.
    pub fn print(&self) {
        info!("{}", self.message);
        if let Some(data) = self.data() {
            if let Ok(json) = serde_json::to_string_pretty(data) {
                debug!("Command output:\n\n{json}\n\n");
            }
        }
    }
}

/// Returns `amount` if it is greater than zero, otherwise a `Validation` error naming `field`.
fn positive(field: &str, amount: Decimal) -> Result<Decimal> {
    if amount > Decimal::ZERO {
        Ok(amount)
    } else {
        Err(Error::validation(format!(
            "{field} must be greater than zero, got {amount}"
        )))
    }
}

/// Trims `value` and rejects it if nothing is left.
fn required(field: &str, value: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(Error::validation(format!("{field} must not be blank")))
    } else {
        Ok(trimmed.to_string())
    }
}

/// `"1 expense"`, `"2 expenses"`.
fn count_noun(count: usize, noun: &str) -> String {
    format!("{count} {noun}{}", if count == 1 { "" } else { "s" })
}

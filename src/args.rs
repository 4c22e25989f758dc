//! These structs provide the CLI interface and the parameters of the MCP tools.

use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::fmt::{Display, Formatter};
use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::error;
use tracing_subscriber::filter::LevelFilter;

use crate::model::{ExpenseUpdates, SavingGoalUpdates, SavingUpdates};

/// expense-ledger: A personal ledger of expenses, savings, saving goals and budgets.
///
/// Every user gets an isolated ledger. Expense categories and saving sources are mapped onto a
/// configurable vocabulary, and the ledger can report spending by category, budget status, and
/// whether a saving goal is on pace to be met.
///
/// The ledger is meant to be used by an AI agent, like Claude or Claude Code, through the mcp
/// subcommand.
#[derive(Debug, Parser, Clone)]
pub struct Args {
    #[clap(flatten)]
    common: Common,

    #[command(subcommand)]
    command: Command,
}

impl Args {
    pub fn new(common: Common, command: Command) -> Self {
        Self { common, command }
    }

    pub fn common(&self) -> &Common {
        &self.common
    }

    pub fn command(&self) -> &Command {
        &self.command
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Create the home directory and initialize the configuration files.
    ///
    /// This writes `config.json`, the default `categories.json` and `saving_sources.json`, and
    /// creates the `data` directory where each user's ledger will be stored. Existing vocabulary
    /// files are left alone, so you can edit them and run init again safely.
    Init(InitArgs),
    /// Run the MCP server over stdin/stdout.
    Mcp,
}

/// Arguments common to all subcommands.
#[derive(Debug, Parser, Clone)]
pub struct Common {
    /// The logging verbosity. One of, from least to most verbose:
    /// off, error, warn, info, debug, trace
    ///
    /// This can be overridden by RUST_LOG. See the tracing-subscriber crate for instructions.
    #[arg(long, default_value_t = LevelFilter::INFO)]
    log_level: LevelFilter,

    /// The directory where the configuration and ledgers are held. Defaults to ~/expense-ledger
    #[arg(long, env = "EXPENSE_LEDGER_HOME", default_value_t = default_home())]
    home: DisplayPath,
}

impl Common {
    pub fn new(log_level: LevelFilter, home: PathBuf) -> Self {
        Self {
            log_level,
            home: home.into(),
        }
    }

    pub fn log_level(&self) -> LevelFilter {
        self.log_level
    }

    pub fn home(&self) -> &DisplayPath {
        &self.home
    }
}

/// (Not shown): Args for the `expense-ledger init` command.
#[derive(Debug, Parser, Clone)]
pub struct InitArgs {
    /// The user whose ledger is used when a request does not name one.
    #[arg(long, default_value = "default_user")]
    default_user: String,
}

impl InitArgs {
    pub fn new(default_user: impl Into<String>) -> Self {
        Self {
            default_user: default_user.into(),
        }
    }

    pub fn default_user(&self) -> &str {
        &self.default_user
    }
}

/// Wraps the parameters of a tool that operates on one user's ledger.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ForUser<T> {
    /// The user whose ledger to use. Defaults to the session's current user.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,

    #[serde(flatten)]
    pub args: T,
}

impl<T> ForUser<T> {
    pub fn new(user_id: Option<&str>, args: T) -> Self {
        Self {
            user_id: user_id.map(str::to_string),
            args,
        }
    }
}

/// Parameters for tools that need nothing but the user.
#[derive(Debug, Default, Clone, Serialize, Deserialize, JsonSchema)]
pub struct UserArgs {
    /// The user whose ledger to use. Defaults to the session's current user.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

/// Parameters for tools that name a user explicitly.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct UserIdArgs {
    /// The user id. ASCII letters, digits, '-', '_', '.' and '@' only.
    pub user_id: String,
}

/// Parameters for `add_expense`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct AddExpenseArgs {
    /// The date of the expense, formatted as YYYY-MM-DD.
    pub date: String,

    /// The amount spent. Must be greater than zero.
    #[schemars(with = "f64")]
    pub amount: Decimal,

    /// The category, e.g. "food". Unknown categories are recorded as "misc".
    pub category: String,

    /// The subcategory, e.g. "groceries". Unknown subcategories are recorded as "other", or as the
    /// category's first subcategory.
    #[serde(default)]
    pub subcategory: String,

    #[serde(default)]
    pub note: String,
}

/// An optional, inclusive date range. Either bound may be omitted.
#[derive(Debug, Default, Clone, Serialize, Deserialize, JsonSchema)]
pub struct DateRangeArgs {
    /// The earliest date to include, formatted as YYYY-MM-DD.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,

    /// The latest date to include, formatted as YYYY-MM-DD.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
}

/// Parameters for `expense_summary_by_category`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ExpenseSummaryArgs {
    /// The earliest date to include, formatted as YYYY-MM-DD.
    pub start_date: String,

    /// The latest date to include, formatted as YYYY-MM-DD.
    pub end_date: String,

    /// Restrict the summary to this category.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

/// Parameters for `update_expense`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct UpdateExpenseArgs {
    /// The id of the expense to change.
    pub expense_id: i64,

    #[serde(flatten)]
    pub updates: ExpenseUpdates,
}

/// Identifies an expense.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ExpenseIdArgs {
    pub expense_id: i64,
}

/// Parameters for `add_saving`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct AddSavingArgs {
    /// The date of the saving, formatted as YYYY-MM-DD.
    pub date: String,

    /// The amount saved. Must be greater than zero.
    #[schemars(with = "f64")]
    pub amount: Decimal,

    /// Where the money came from, e.g. "salary". Unknown sources are recorded as "other", or as
    /// the first configured source.
    #[serde(default)]
    pub source: String,

    #[serde(default)]
    pub note: String,
}

/// Parameters for `update_saving`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct UpdateSavingArgs {
    /// The id of the saving to change.
    pub saving_id: i64,

    #[serde(flatten)]
    pub updates: SavingUpdates,
}

/// Identifies a saving.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SavingIdArgs {
    pub saving_id: i64,
}

/// Parameters for `add_saving_goal`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct AddSavingGoalArgs {
    pub name: String,

    /// The amount to save. Must be greater than zero.
    #[schemars(with = "f64")]
    pub target_amount: Decimal,

    /// The first day that savings count towards the goal, formatted as YYYY-MM-DD.
    pub start_date: String,

    /// The deadline, formatted as YYYY-MM-DD. Goals without one cannot be paced.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,

    #[serde(default)]
    pub note: String,
}

/// Parameters for `update_saving_goal`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct UpdateSavingGoalArgs {
    /// The id of the goal to change.
    pub goal_id: i64,

    #[serde(flatten)]
    pub updates: SavingGoalUpdates,
}

/// Identifies a saving goal.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct GoalIdArgs {
    pub goal_id: i64,
}

/// Parameters for `set_budget` and `update_budget`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct BudgetArgs {
    /// The category to budget. Unknown categories are budgeted as "misc".
    pub category: String,

    /// The spending limit per calendar month. Must be greater than zero.
    #[schemars(with = "f64")]
    pub monthly_limit: Decimal,
}

/// Parameters for `check_budget_status`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct BudgetStatusArgs {
    pub category: String,
    pub year: i32,
    /// 1 for January through 12 for December.
    pub month: u32,
}

/// Identifies a budget.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CategoryArgs {
    pub category: String,
}

fn default_home() -> DisplayPath {
    DisplayPath(match dirs::home_dir() {
        Some(home) => home.join("expense-ledger"),
        None => {
            error!(
                "There was an error when trying to get your home directory. You can get around \
                this by providing --home or EXPENSE_LEDGER_HOME instead of relying on the default \
                home directory. If you continue using the program right now, you may have \
                problems!",
            );
            PathBuf::from("expense-ledger")
        }
    })
}

#[derive(Debug, Default, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct DisplayPath(PathBuf);

impl From<PathBuf> for DisplayPath {
    fn from(value: PathBuf) -> Self {
        DisplayPath(value)
    }
}

impl Deref for DisplayPath {
    type Target = Path;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<Path> for DisplayPath {
    fn as_ref(&self) -> &Path {
        &self.0
    }
}

impl Display for DisplayPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.to_string_lossy())
    }
}

impl FromStr for DisplayPath {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(PathBuf::from(s)))
    }
}

impl DisplayPath {
    pub fn path(&self) -> &Path {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_init() {
        let args = Args::try_parse_from([
            "expense-ledger",
            "--home",
            "/tmp/ledger",
            "--log-level",
            "debug",
            "init",
            "--default-user",
            "alice",
        ])
        .unwrap();
        assert_eq!(args.common().home().path(), Path::new("/tmp/ledger"));
        assert_eq!(args.common().log_level(), LevelFilter::DEBUG);
        let Command::Init(init) = args.command() else {
            panic!("expected init");
        };
        assert_eq!(init.default_user(), "alice");
    }

    #[test]
    fn test_parse_mcp() {
        let args = Args::try_parse_from(["expense-ledger", "--home", "/tmp/x", "mcp"]).unwrap();
        assert!(matches!(args.command(), Command::Mcp));
    }

    #[test]
    fn test_for_user_flattens() {
        let params: ForUser<AddExpenseArgs> = serde_json::from_value(json!({
            "user_id": "alice",
            "date": "2024-03-05",
            "amount": 12.5,
            "category": "Food"
        }))
        .unwrap();
        assert_eq!(params.user_id.as_deref(), Some("alice"));
        assert_eq!(params.args.amount, Decimal::new(125, 1));
        assert_eq!(params.args.subcategory, "");

        let params: ForUser<AddExpenseArgs> = serde_json::from_value(json!({
            "date": "2024-03-05",
            "amount": "7.25",
            "category": "food"
        }))
        .unwrap();
        assert!(params.user_id.is_none());
        assert_eq!(params.args.amount, Decimal::new(725, 2));
    }

    #[test]
    fn test_update_args_flatten() {
        let params: ForUser<UpdateExpenseArgs> = serde_json::from_value(json!({
            "expense_id": 4,
            "note": "dinner"
        }))
        .unwrap();
        assert_eq!(params.args.expense_id, 4);
        assert_eq!(params.args.updates.note.as_deref(), Some("dinner"));
        assert!(params.args.updates.amount.is_none());

        let params: ForUser<UpdateSavingGoalArgs> =
            serde_json::from_value(json!({"goal_id": 1})).unwrap();
        assert!(params.args.updates.is_empty());
    }
}

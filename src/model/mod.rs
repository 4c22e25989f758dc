//! Types that represent the core data model: expenses, savings, saving goals and budgets.
mod budget;
mod dates;
mod expense;
mod goal;
mod saving;

pub use budget::Budget;
pub(crate) use dates::{format_date, parse_date, parse_optional_date, DATE_FORMAT};
pub use dates::{month_bounds, months_between, DateRange};
pub use expense::{Expense, ExpenseUpdates, NewExpense};
pub use goal::{NewSavingGoal, SavingGoal, SavingGoalUpdates};
pub use saving::{NewSaving, Saving, SavingUpdates};

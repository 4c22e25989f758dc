//! expense-ledger: a per-user ledger of expenses, savings, saving goals and budgets.
//!
//! The commands in [`commands`] are the library's entry points. Each works on the ledger of one
//! [`TenantId`], and the [`mcp`] server exposes them as tools for AI agents.

mod analytics;
pub mod args;
pub mod commands;
mod config;
mod db;
mod error;
mod mcp;
pub mod model;
mod tenant;
mod utils;
pub mod vocabulary;

#[cfg(test)]
mod test;

pub use analytics::{BudgetState, BudgetStatus, CategoryTotal, GoalInsight, GoalProgress, Pace};
pub use config::Config;
pub use error::{Error, ErrorType, Result};
pub use mcp::LedgerServer;
pub use tenant::{CurrentUser, TenantId};

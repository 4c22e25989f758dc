//! The MCP tools. Each tool resolves the tenant, delegates to a command handler and converts its
//! `Out` into a tool result.

use crate::args::{
    AddExpenseArgs, AddSavingArgs, AddSavingGoalArgs, BudgetArgs, BudgetStatusArgs, CategoryArgs,
    DateRangeArgs, ExpenseIdArgs, ExpenseSummaryArgs, ForUser, GoalIdArgs, SavingIdArgs,
    UpdateExpenseArgs, UpdateSavingArgs, UpdateSavingGoalArgs, UserArgs, UserIdArgs,
};
use crate::commands;
use crate::mcp::mcp_utils::{error_result, tool_result};
use crate::mcp::LedgerServer;
use crate::tenant::TenantId;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::CallToolResult;
use rmcp::ErrorData as McpError;
use rmcp::{tool, tool_router};
use tracing::info;

#[tool_router(vis = "pub(super)")]
impl LedgerServer {
    // Users

    /// Create the ledger for a user if it does not exist yet. The current user is not changed.
    /// Returns the user id and the path of the user's database file.
    #[tool]
    async fn initialize_user(
        &self,
        Parameters(args): Parameters<UserIdArgs>,
    ) -> Result<CallToolResult, McpError> {
        info!("MCP: initialize_user called for '{}'", args.user_id);
        let tenant = match TenantId::new(&args.user_id) {
            Ok(tenant) => tenant,
            Err(e) => return Ok(error_result(e)),
        };
        tool_result(commands::initialize_user(&self.config, &tenant).await)
    }

    /// Switch the current user for this session, creating the user's ledger if needed. Tools
    /// called without a `user_id` use the current user.
    #[tool]
    async fn set_current_user(
        &self,
        Parameters(args): Parameters<UserIdArgs>,
    ) -> Result<CallToolResult, McpError> {
        info!("MCP: set_current_user called for '{}'", args.user_id);
        let tenant = match TenantId::new(&args.user_id) {
            Ok(tenant) => tenant,
            Err(e) => return Ok(error_result(e)),
        };
        tool_result(commands::set_current_user(&self.config, &self.current_user, &tenant).await)
    }

    /// Return the current user for this session and the path of their database file.
    #[tool]
    async fn get_current_user(&self) -> Result<CallToolResult, McpError> {
        info!("MCP: get_current_user called");
        tool_result(commands::get_current_user(&self.config, &self.current_user).await)
    }

    /// Return the vocabulary: each expense category with its subcategories, and the saving
    /// sources. Inputs are normalized onto these values.
    #[tool]
    async fn get_vocabulary(&self) -> Result<CallToolResult, McpError> {
        info!("MCP: get_vocabulary called");
        tool_result(commands::get_vocabulary(&self.config).await)
    }

    // Expenses

    /// Record an expense.
    ///
    /// The category and subcategory are lowercased and mapped onto the vocabulary. An unknown
    /// category is recorded as `misc` and an unknown subcategory as `other`. The stored expense,
    /// including its new `id`, is returned.
    ///
    /// # Example
    ///
    /// ```json
    /// {
    ///   "date": "2024-03-05",
    ///   "amount": 12.50,
    ///   "category": "food",
    ///   "subcategory": "groceries",
    ///   "note": "weekly shop"
    /// }
    /// ```
    #[tool]
    async fn add_expense(
        &self,
        Parameters(params): Parameters<ForUser<AddExpenseArgs>>,
    ) -> Result<CallToolResult, McpError> {
        info!("MCP: add_expense called");
        let tenant = resolve_tenant!(self, params.user_id.as_deref());
        tool_result(commands::add_expense(&self.config, &tenant, params.args).await)
    }

    /// List expenses, newest first. `start_date` and `end_date` are optional and inclusive.
    #[tool]
    async fn list_expenses(
        &self,
        Parameters(params): Parameters<ForUser<DateRangeArgs>>,
    ) -> Result<CallToolResult, McpError> {
        info!("MCP: list_expenses called");
        let tenant = resolve_tenant!(self, params.user_id.as_deref());
        tool_result(commands::list_expenses(&self.config, &tenant, params.args).await)
    }

    /// Total the expenses between `start_date` and `end_date` (both inclusive) per category,
    /// largest total first. Each entry has `category`, `total_amount` and `count`. Pass
    /// `category` to restrict the summary to one category.
    #[tool]
    async fn expense_summary_by_category(
        &self,
        Parameters(params): Parameters<ForUser<ExpenseSummaryArgs>>,
    ) -> Result<CallToolResult, McpError> {
        info!("MCP: expense_summary_by_category called");
        let tenant = resolve_tenant!(self, params.user_id.as_deref());
        tool_result(commands::expense_summary_by_category(&self.config, &tenant, params.args).await)
    }

    /// Change an expense. Only the fields that are supplied are changed.
    ///
    /// A new category or subcategory is normalized the same way as in `add_expense`. If only the
    /// category changes, the existing subcategory is kept when it belongs to the new category.
    /// Returns status `no_changes` when no field is supplied and `not_found` when the id does not
    /// exist.
    ///
    /// # Example
    ///
    /// ```json
    /// {
    ///   "expense_id": 4,
    ///   "amount": "19.99",
    ///   "note": "corrected"
    /// }
    /// ```
    #[tool]
    async fn update_expense(
        &self,
        Parameters(params): Parameters<ForUser<UpdateExpenseArgs>>,
    ) -> Result<CallToolResult, McpError> {
        info!("MCP: update_expense called for {}", params.args.expense_id);
        let tenant = resolve_tenant!(self, params.user_id.as_deref());
        tool_result(commands::update_expense(&self.config, &tenant, params.args).await)
    }

    /// Delete an expense by id. Returns status `not_found` if there is no such expense.
    #[tool]
    async fn delete_expense(
        &self,
        Parameters(params): Parameters<ForUser<ExpenseIdArgs>>,
    ) -> Result<CallToolResult, McpError> {
        info!("MCP: delete_expense called for {}", params.args.expense_id);
        let tenant = resolve_tenant!(self, params.user_id.as_deref());
        tool_result(commands::delete_expense(&self.config, &tenant, params.args).await)
    }

    // Savings

    /// Record money set aside. The source is lowercased and mapped onto the vocabulary's saving
    /// sources, falling back to `other`.
    #[tool]
    async fn add_saving(
        &self,
        Parameters(params): Parameters<ForUser<AddSavingArgs>>,
    ) -> Result<CallToolResult, McpError> {
        info!("MCP: add_saving called");
        let tenant = resolve_tenant!(self, params.user_id.as_deref());
        tool_result(commands::add_saving(&self.config, &tenant, params.args).await)
    }

    /// List savings, newest first. `start_date` and `end_date` are optional and inclusive.
    #[tool]
    async fn list_savings(
        &self,
        Parameters(params): Parameters<ForUser<DateRangeArgs>>,
    ) -> Result<CallToolResult, McpError> {
        info!("MCP: list_savings called");
        let tenant = resolve_tenant!(self, params.user_id.as_deref());
        tool_result(commands::list_savings(&self.config, &tenant, params.args).await)
    }

    /// Change a saving. Only the fields that are supplied are changed. Returns status
    /// `no_changes` when no field is supplied and `not_found` when the id does not exist.
    #[tool]
    async fn update_saving(
        &self,
        Parameters(params): Parameters<ForUser<UpdateSavingArgs>>,
    ) -> Result<CallToolResult, McpError> {
        info!("MCP: update_saving called for {}", params.args.saving_id);
        let tenant = resolve_tenant!(self, params.user_id.as_deref());
        tool_result(commands::update_saving(&self.config, &tenant, params.args).await)
    }

    /// Delete a saving by id. Returns status `not_found` if there is no such saving.
    #[tool]
    async fn delete_saving(
        &self,
        Parameters(params): Parameters<ForUser<SavingIdArgs>>,
    ) -> Result<CallToolResult, McpError> {
        info!("MCP: delete_saving called for {}", params.args.saving_id);
        let tenant = resolve_tenant!(self, params.user_id.as_deref());
        tool_result(commands::delete_saving(&self.config, &tenant, params.args).await)
    }

    // Saving goals

    /// Create a saving goal. `end_date` is optional. A goal without one can report progress but
    /// not pacing insights. `end_date` may not be before `start_date`.
    #[tool]
    async fn add_saving_goal(
        &self,
        Parameters(params): Parameters<ForUser<AddSavingGoalArgs>>,
    ) -> Result<CallToolResult, McpError> {
        info!("MCP: add_saving_goal called");
        let tenant = resolve_tenant!(self, params.user_id.as_deref());
        tool_result(commands::add_saving_goal(&self.config, &tenant, params.args).await)
    }

    /// List all saving goals, most recently started first.
    #[tool]
    async fn list_saving_goals(
        &self,
        Parameters(args): Parameters<UserArgs>,
    ) -> Result<CallToolResult, McpError> {
        info!("MCP: list_saving_goals called");
        let tenant = resolve_tenant!(self, args.user_id.as_deref());
        tool_result(commands::list_saving_goals(&self.config, &tenant, args).await)
    }

    /// Report how much has been saved towards a goal.
    ///
    /// Goals are not tied to a saving source: every saving dated from the goal's `start_date`
    /// through its `end_date` (or up to now for open-ended goals) counts. Returns `total_saved`,
    /// `remaining` and `progress_percentage`. Returns status `not_found` for an unknown goal.
    #[tool]
    async fn get_saving_goal_progress(
        &self,
        Parameters(params): Parameters<ForUser<GoalIdArgs>>,
    ) -> Result<CallToolResult, McpError> {
        info!("MCP: get_saving_goal_progress called for {}", params.args.goal_id);
        let tenant = resolve_tenant!(self, params.user_id.as_deref());
        tool_result(commands::get_saving_goal_progress(&self.config, &tenant, params.args).await)
    }

    /// Report whether a goal is on pace to be met by its end date.
    ///
    /// Months are counted as calendar-month differences, ignoring the day. The result compares
    /// `current_monthly_average` (saved so far per elapsed month) with `required_monthly_saving`
    /// (still needed per remaining month). `pace_status` is one of:
    ///
    /// - `on_track`: the average meets the requirement, or the target is already reached
    /// - `behind`: the average falls short of the requirement
    /// - `missed_goal`: the end date has passed and the target was not reached
    ///
    /// Returns status `no_deadline` for a goal without an end date and `not_found` for an unknown
    /// goal.
    #[tool]
    async fn get_saving_goal_insights(
        &self,
        Parameters(params): Parameters<ForUser<GoalIdArgs>>,
    ) -> Result<CallToolResult, McpError> {
        info!("MCP: get_saving_goal_insights called for {}", params.args.goal_id);
        let tenant = resolve_tenant!(self, params.user_id.as_deref());
        tool_result(commands::get_saving_goal_insights(&self.config, &tenant, params.args).await)
    }

    /// Change a saving goal. Only the fields that are supplied are changed. Send an empty
    /// `end_date` to make the goal open-ended. The resulting goal may not end before it starts.
    /// Returns status `no_changes` when no field is supplied and `not_found` when the id does not
    /// exist.
    #[tool]
    async fn update_saving_goal(
        &self,
        Parameters(params): Parameters<ForUser<UpdateSavingGoalArgs>>,
    ) -> Result<CallToolResult, McpError> {
        info!("MCP: update_saving_goal called for {}", params.args.goal_id);
        let tenant = resolve_tenant!(self, params.user_id.as_deref());
        tool_result(commands::update_saving_goal(&self.config, &tenant, params.args).await)
    }

    /// Delete a saving goal by id. Savings are not affected. Returns status `not_found` if there
    /// is no such goal.
    #[tool]
    async fn delete_saving_goal(
        &self,
        Parameters(params): Parameters<ForUser<GoalIdArgs>>,
    ) -> Result<CallToolResult, McpError> {
        info!("MCP: delete_saving_goal called for {}", params.args.goal_id);
        let tenant = resolve_tenant!(self, params.user_id.as_deref());
        tool_result(commands::delete_saving_goal(&self.config, &tenant, params.args).await)
    }

    // Budgets

    /// Set the monthly spending limit for a category, replacing any existing limit. The category
    /// is normalized onto the vocabulary.
    #[tool]
    async fn set_budget(
        &self,
        Parameters(params): Parameters<ForUser<BudgetArgs>>,
    ) -> Result<CallToolResult, McpError> {
        info!("MCP: set_budget called");
        let tenant = resolve_tenant!(self, params.user_id.as_deref());
        tool_result(commands::set_budget(&self.config, &tenant, params.args).await)
    }

    /// List all budgets ordered by category.
    #[tool]
    async fn list_budgets(
        &self,
        Parameters(args): Parameters<UserArgs>,
    ) -> Result<CallToolResult, McpError> {
        info!("MCP: list_budgets called");
        let tenant = resolve_tenant!(self, args.user_id.as_deref());
        tool_result(commands::list_budgets(&self.config, &tenant, args).await)
    }

    /// Compare one calendar month of spending in a category with its budget.
    ///
    /// Returns `total_expenses`, `remaining_budget` (negative when overspent), `usage_percentage`
    /// and `budget_status`, which is `over_budget` when spending exceeds the limit and
    /// `under_budget` otherwise. Returns status `no_budget` if the category has no budget.
    ///
    /// # Example
    ///
    /// ```json
    /// {
    ///   "category": "food",
    ///   "year": 2024,
    ///   "month": 3
    /// }
    /// ```
    #[tool]
    async fn check_budget_status(
        &self,
        Parameters(params): Parameters<ForUser<BudgetStatusArgs>>,
    ) -> Result<CallToolResult, McpError> {
        info!("MCP: check_budget_status called");
        let tenant = resolve_tenant!(self, params.user_id.as_deref());
        tool_result(commands::check_budget_status(&self.config, &tenant, params.args).await)
    }

    /// Change the limit of an existing budget. Unlike `set_budget`, this does not create a
    /// budget. Returns status `not_found` if the category has no budget.
    #[tool]
    async fn update_budget(
        &self,
        Parameters(params): Parameters<ForUser<BudgetArgs>>,
    ) -> Result<CallToolResult, McpError> {
        info!("MCP: update_budget called");
        let tenant = resolve_tenant!(self, params.user_id.as_deref());
        tool_result(commands::update_budget(&self.config, &tenant, params.args).await)
    }

    /// Delete the budget for a category. Returns status `not_found` if there is none.
    #[tool]
    async fn delete_budget(
        &self,
        Parameters(params): Parameters<ForUser<CategoryArgs>>,
    ) -> Result<CallToolResult, McpError> {
        info!("MCP: delete_budget called");
        let tenant = resolve_tenant!(self, params.user_id.as_deref());
        tool_result(commands::delete_budget(&self.config, &tenant, params.args).await)
    }
}

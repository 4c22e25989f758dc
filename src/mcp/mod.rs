//! MCP (Model Context Protocol) server implementation.
//!
//! This module provides an MCP server that exposes the ledger operations as tools for AI agent
//! integration. The server communicates via JSON-RPC over stdio.
//!
//! The server owns the session's `CurrentUser`. Tools that take an optional `user_id` fall back
//! to it, and `set_current_user` changes it.

/// Resolves the tenant for a tool call, returning an error result from the tool if the supplied
/// user id is invalid.
macro_rules! resolve_tenant {
    ($self:expr, $user_id:expr) => {
        match $self.current_user.resolve($user_id).await {
            Ok(tenant) => tenant,
            Err(e) => return Ok(crate::mcp::mcp_utils::error_result(e)),
        }
    };
}

mod mcp_utils;
mod tools;

use crate::tenant::CurrentUser;
use crate::Config;
use rmcp::handler::server::tool::ToolRouter;
use rmcp::model::{Implementation, ProtocolVersion, ServerCapabilities, ServerInfo};
use rmcp::transport::stdio;
use rmcp::{tool_handler, ServerHandler, ServiceExt};
use std::sync::Arc;
use tracing::info;

/// The expense-ledger MCP server.
#[derive(Debug, Clone)]
pub struct LedgerServer {
    config: Arc<Config>,
    current_user: CurrentUser,
    tool_router: ToolRouter<LedgerServer>,
}

impl LedgerServer {
    /// Creates a new server whose current user starts out as the configured default user.
    pub fn new(config: Config) -> Self {
        let current_user = CurrentUser::new(config.default_user().clone());
        Self {
            config: Arc::new(config),
            current_user,
            tool_router: Self::tool_router(),
        }
    }
}

#[tool_handler]
impl ServerHandler for LedgerServer {
    /// Returns server information sent to the MCP client during initialization.
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2024_11_05,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "expense-ledger".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            instructions: Some(include_str!("docs/INTRO.md").into()),
        }
    }
}

/// Transport type for the MCP server.
#[derive(Debug, Default)]
pub(crate) enum Io {
    #[default]
    Stdio,
    /// Mock transport for testing - holds one end of a duplex channel.
    #[cfg(test)]
    Mock(tokio::io::DuplexStream),
}

/// Runs the MCP server with stdio transport or mock transport. This function starts the MCP server
/// and blocks until the client disconnects or an error occurs.
///
/// # Arguments
/// - `config`: The `Config` object
/// - `io`: Whether we are using stdio as the transport or using mock io for testing
pub(crate) async fn run_server(config: Config, io: Io) -> crate::Result<()> {
    use crate::error::{ErrorType, IntoResult};
    info!(
        "Starting MCP server with default user '{}'...",
        config.default_user()
    );
    let server = LedgerServer::new(config);

    let service = match io {
        Io::Stdio => server.serve(stdio()).await,
        #[cfg(test)]
        Io::Mock(stream) => server.serve(stream).await,
    }
    .map_err(|e| anyhow::anyhow!("Failed to start MCP server: {e}"))
    .pub_result(ErrorType::Service)?;

    info!("MCP server running, waiting for requests...");

    // Wait for the server to complete (client disconnects or error)
    service
        .waiting()
        .await
        .map_err(|e| anyhow::anyhow!("MCP server error: {e}"))
        .pub_result(ErrorType::Service)?;

    info!("MCP server shut down");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test::TestEnv;
    use rmcp::model::{CallToolRequestParam, CallToolResult, RawContent};
    use rmcp::service::{RoleClient, RunningService};
    use serde_json::{json, Value};
    use tokio::io::duplex;

    type Client = RunningService<RoleClient, ()>;

    async fn call(client: &Client, name: &'static str, arguments: Value) -> CallToolResult {
        let arguments = match arguments {
            Value::Object(map) => Some(map),
            _ => None,
        };
        client
            .call_tool(CallToolRequestParam {
                name: name.into(),
                arguments,
            })
            .await
            .unwrap_or_else(|e| panic!("{name} call failed: {e}"))
    }

    /// Finds the JSON `Out` record in a successful tool result.
    fn record(result: &CallToolResult) -> Value {
        assert!(
            !result.is_error.unwrap_or(false),
            "tool returned error: {:?}",
            result.content
        );
        result
            .content
            .iter()
            .find_map(|c| match &c.raw {
                RawContent::Text(text) => serde_json::from_str::<Value>(&text.text)
                    .ok()
                    .filter(Value::is_object),
                _ => None,
            })
            .expect("no JSON content in tool result")
    }

    /// Integration test for the MCP server using an in-memory transport.
    #[tokio::test]
    async fn test_mcp_server_integration() {
        // Create duplex channel - one end for server, one for client
        let (client_io, server_io) = duplex(4096);

        // Create test environment (holds TempDir alive for duration of test)
        let env = TestEnv::new().await;
        let config = env.config();

        // Spawn server in background task
        let server_handle =
            tokio::spawn(async move { run_server(config, Io::Mock(server_io)).await });

        // Create MCP client connected to the other end
        let client = ().serve(client_io).await.expect("Failed to create client");

        let current = record(&call(&client, "get_current_user", Value::Null).await);
        assert_eq!(current["data"]["user_id"], json!(env.user().as_str()));

        let added = record(
            &call(
                &client,
                "add_expense",
                json!({"date": "2024-03-05", "amount": 12.5, "category": "Food"}),
            )
            .await,
        );
        assert_eq!(added["status"], json!("ok"));
        assert_eq!(added["data"]["category"], json!("food"));
        assert_eq!(added["data"]["amount"], json!("12.5"));

        // An explicit user id addresses another ledger without changing the current user.
        let listed = record(&call(&client, "list_expenses", json!({"user_id": "bob"})).await);
        assert_eq!(listed["data"], json!([]));

        let switched = record(&call(&client, "set_current_user", json!({"user_id": "bob"})).await);
        assert_eq!(switched["data"]["user_id"], json!("bob"));
        let listed = record(&call(&client, "list_expenses", json!({})).await);
        assert_eq!(listed["data"], json!([]));

        let missing = record(&call(&client, "delete_expense", json!({"expense_id": 99})).await);
        assert_eq!(missing["status"], json!("not_found"));

        // Invalid input is reported as a tool error.
        let invalid = call(
            &client,
            "add_saving",
            json!({"date": "2024-13-01", "amount": 10, "source": "salary"}),
        )
        .await;
        assert!(invalid.is_error.unwrap_or(false));

        // Drop client to trigger server shutdown
        drop(client);

        // Wait for server to finish (with timeout)
        let server_result = tokio::time::timeout(std::time::Duration::from_secs(5), server_handle)
            .await
            .expect("Server timed out")
            .expect("Server task panicked");

        assert!(
            server_result.is_ok(),
            "Server returned error: {:?}",
            server_result
        );
    }

    #[tokio::test]
    async fn test_mcp_lists_all_tools() {
        let (client_io, server_io) = duplex(4096);
        let env = TestEnv::new().await;
        let config = env.config();
        let _server_handle =
            tokio::spawn(async move { run_server(config, Io::Mock(server_io)).await });
        let client = ().serve(client_io).await.expect("Failed to create client");

        let tools = client
            .list_tools(Default::default())
            .await
            .expect("Failed to list tools");
        let mut names: Vec<String> = tools.tools.iter().map(|t| t.name.to_string()).collect();
        names.sort();
        assert_eq!(
            names,
            vec![
                "add_expense",
                "add_saving",
                "add_saving_goal",
                "check_budget_status",
                "delete_budget",
                "delete_expense",
                "delete_saving",
                "delete_saving_goal",
                "expense_summary_by_category",
                "get_current_user",
                "get_saving_goal_insights",
                "get_saving_goal_progress",
                "get_vocabulary",
                "initialize_user",
                "list_budgets",
                "list_expenses",
                "list_saving_goals",
                "list_savings",
                "set_budget",
                "set_current_user",
                "update_budget",
                "update_expense",
                "update_saving",
                "update_saving_goal",
            ]
        );
        for tool in &tools.tools {
            assert!(tool.description.is_some(), "{} has no description", tool.name);
        }
    }
}

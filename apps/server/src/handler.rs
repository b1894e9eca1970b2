//! Etsy Seller MCP Handler
//!
//! Implements the MCP ServerHandler trait, exposing the session lifecycle
//! tools (connect/disconnect/status) plus the representative authenticated
//! shop lookup. Authorization-flow failures come back as structured
//! `{success: false, error}` payloads, never as transport errors, so a calling
//! agent can render them and decide whether to retry.

use std::sync::Arc;

use rmcp::{
    model::*, service::RequestContext, ErrorData as McpError, RoleServer, ServerHandler,
};
use serde_json::{json, Value};
use tracing::info;

use etsymcp_auth::SessionOrchestrator;

use crate::etsy_client::EtsyApiClient;

/// Scopes requested on connect: full shop management, matching the tool
/// surface this server wraps.
const CONNECT_SCOPES: &[&str] = &[
    "shops_r",
    "shops_w",
    "listings_r",
    "listings_w",
    "listings_d",
    "transactions_r",
    "profile_r",
    "email_r",
    "address_r",
    "address_w",
];

const NOT_CONFIGURED: &str =
    "OAuth manager not initialized. Please set ETSY_API_KEY environment variable.";

#[derive(Clone)]
pub struct EtsySellerHandler {
    /// None when ETSY_API_KEY is absent; tools then report a configuration
    /// error instead of the process failing at startup.
    orchestrator: Option<Arc<SessionOrchestrator>>,
}

impl EtsySellerHandler {
    pub fn new(orchestrator: Option<Arc<SessionOrchestrator>>) -> Self {
        Self { orchestrator }
    }

    async fn connect_etsy(&self) -> Value {
        let Some(orchestrator) = &self.orchestrator else {
            return json!({ "success": false, "error": NOT_CONFIGURED });
        };

        let scopes: Vec<String> = CONNECT_SCOPES.iter().map(|s| s.to_string()).collect();
        match orchestrator.connect(&scopes).await {
            Ok(token) => json!({
                "success": true,
                "message": "Successfully connected to Etsy! Token stored securely in system keyring.",
                "expires_at": token.expires_at.to_rfc3339(),
            }),
            // Retryable failures (timeout, denial, flaky exchange) invite the
            // agent to run connect_etsy again; configuration ones do not.
            Err(e) => json!({
                "success": false,
                "error": e.to_string(),
                "retryable": e.is_retryable(),
            }),
        }
    }

    async fn disconnect_etsy(&self) -> Value {
        let Some(orchestrator) = &self.orchestrator else {
            return json!({ "success": false, "error": NOT_CONFIGURED });
        };

        match orchestrator.disconnect().await {
            Ok(()) => json!({
                "success": true,
                "message": "Successfully disconnected from Etsy. Token cleared from memory and keyring.",
            }),
            Err(e) => json!({ "success": false, "error": e.to_string() }),
        }
    }

    async fn get_connection_status(&self) -> Value {
        let status = match &self.orchestrator {
            Some(orchestrator) => orchestrator.status().await,
            None => etsymcp_core::ConnectionStatus::disconnected(),
        };

        let message = if status.connected {
            "Connected to Etsy"
        } else {
            "Not connected. Use connect_etsy to authenticate."
        };

        json!({
            "success": true,
            "connected": status.connected,
            "expires_at": status.expires_at.map(|t| t.to_rfc3339()),
            "message": message,
        })
    }

    async fn get_my_shop(&self) -> Value {
        let Some(orchestrator) = &self.orchestrator else {
            return json!({ "success": false, "error": NOT_CONFIGURED });
        };

        let Some(access_token) = orchestrator.access_token().await else {
            return json!({
                "success": false,
                "error": "Not connected to Etsy. Please use connect_etsy tool first.",
            });
        };

        let result = async {
            let client = EtsyApiClient::new(&orchestrator.config().api_key, &access_token)?;
            client.get_my_shop().await
        }
        .await;

        match result {
            Ok(shops) => json!({ "success": true, "shops": shops }),
            Err(e) => json!({ "success": false, "error": e.to_string() }),
        }
    }
}

/// Render a tool payload as MCP content, mirroring `success` into `is_error`.
fn tool_result(value: Value) -> CallToolResult {
    let failed = value.get("success").and_then(Value::as_bool) == Some(false);
    let text = serde_json::to_string_pretty(&value).unwrap_or_else(|_| value.to_string());

    CallToolResult {
        content: vec![Content::text(text)],
        structured_content: None,
        is_error: Some(failed),
        meta: None,
    }
}

fn tool_definitions() -> Result<Vec<Tool>, McpError> {
    let raw = json!([
        {
            "name": "connect_etsy",
            "description": "Connect your Etsy account via OAuth 2.0. Opens a browser window for authorization; the token is stored in the system keyring and restored on restart.",
            "inputSchema": { "type": "object", "properties": {}, "additionalProperties": false }
        },
        {
            "name": "disconnect_etsy",
            "description": "Disconnect the current Etsy session, clearing the token from memory and the system keyring.",
            "inputSchema": { "type": "object", "properties": {}, "additionalProperties": false }
        },
        {
            "name": "get_connection_status",
            "description": "Check whether there is an active Etsy connection in this session.",
            "inputSchema": { "type": "object", "properties": {}, "additionalProperties": false }
        },
        {
            "name": "get_my_shop",
            "description": "Get the authenticated user's Etsy shop details. Requires an active connection.",
            "inputSchema": { "type": "object", "properties": {}, "additionalProperties": false }
        }
    ]);

    serde_json::from_value(raw)
        .map_err(|e| McpError::internal_error(format!("invalid tool definitions: {e}"), None))
}

impl ServerHandler for EtsySellerHandler {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: Default::default(),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "etsy-seller-mcp".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                ..Default::default()
            },
            instructions: Some(
                "Manage an Etsy seller shop. Authenticate with connect_etsy first; \
                 the session persists across restarts until the token expires."
                    .to_string(),
            ),
        }
    }

    async fn list_tools(
        &self,
        _params: Option<PaginatedRequestParams>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, McpError> {
        Ok(ListToolsResult::with_all_items(tool_definitions()?))
    }

    async fn call_tool(
        &self,
        params: CallToolRequestParams,
        _context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, McpError> {
        info!(tool = %params.name, "call_tool");

        let payload = match params.name.as_ref() {
            "connect_etsy" => self.connect_etsy().await,
            "disconnect_etsy" => self.disconnect_etsy().await,
            "get_connection_status" => self.get_connection_status().await,
            "get_my_shop" => self.get_my_shop().await,
            other => {
                return Err(McpError::invalid_params(
                    format!("Unknown tool: {other}"),
                    None,
                ))
            }
        };

        Ok(tool_result(payload))
    }
}

//! MCP server implementation
//!
//! Exposes the YouTube search tools over JSON-RPC, either as
//! newline-delimited JSON on stdio or on an HTTP `/mcp` endpoint.

use crate::mcp::codec;
use crate::mcp::protocol::*;
use crate::mcp::tools::ToolProvider;
use anyhow::Result;
use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{debug, error, info, warn};

pub const SERVER_NAME: &str = "ytmcp";

pub struct McpServer {
    tools: ToolProvider,
    initialized: AtomicBool,
}

impl McpServer {
    pub fn new(tools: ToolProvider) -> Self {
        Self {
            tools,
            initialized: AtomicBool::new(false),
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::SeqCst)
    }

    /// Run the MCP server on stdio until the client disconnects
    pub async fn run_stdio(&self) -> Result<()> {
        info!("MCP server starting on stdio");

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        let mut stdout = tokio::io::stdout();

        while let Some(line) = lines.next_line().await? {
            let line = line.trim();

            // Skip empty lines
            if line.is_empty() {
                continue;
            }

            debug!("Received message: {}", line);

            let Some(response) = self.handle_message(line.as_bytes()).await else {
                continue;
            };

            // Write response as newline-delimited JSON
            let response_json = serde_json::to_string(&response)?;
            stdout.write_all(response_json.as_bytes()).await?;
            stdout.write_all(b"\n").await?;
            stdout.flush().await?;

            debug!("Sent response");
        }

        info!("Client closed connection");
        Ok(())
    }

    /// Serve `POST /mcp` and `GET /health` until the listener fails
    pub async fn run_http(self: Arc<Self>, addr: SocketAddr) -> Result<()> {
        let listener = tokio::net::TcpListener::bind(addr).await?;
        info!("MCP server listening on http://{}/mcp", listener.local_addr()?);

        axum::serve(listener, self.router()).await?;
        Ok(())
    }

    pub fn router(self: Arc<Self>) -> Router {
        Router::new()
            .route("/mcp", post(http_mcp))
            .route("/health", get(http_health))
            .with_state(self)
    }

    /// Handle one raw message. Notifications produce no response.
    pub async fn handle_message(&self, raw: &[u8]) -> Option<JsonRpcResponse> {
        let request = match codec::decode(raw) {
            Ok(RpcEnvelope::Request(request)) => request,
            Ok(RpcEnvelope::Response(response)) => {
                warn!("Ignoring unexpected response message (id {:?})", response.id);
                return None;
            }
            Err(e) => {
                let code = if serde_json::from_slice::<Value>(raw).is_err() {
                    PARSE_ERROR
                } else {
                    INVALID_REQUEST
                };
                return Some(JsonRpcResponse::failure(None, JsonRpcError::new(code, e.to_string())));
            }
        };

        let id = request.id.clone();
        let result = match request.method.as_str() {
            METHOD_INITIALIZE => self.handle_initialize(request.params),
            METHOD_INITIALIZED => {
                self.initialized.store(true, Ordering::SeqCst);
                info!("Client initialized");
                Ok(Value::Null)
            }
            METHOD_PING => Ok(json!({})),
            METHOD_TOOLS_LIST => self.handle_list_tools(),
            METHOD_TOOLS_CALL => self.handle_call_tool(request.params).await,
            _ => Err(JsonRpcError::new(
                METHOD_NOT_FOUND,
                format!("Method not found: {}", request.method),
            )),
        };

        // Notifications never get a response, even on error
        let id = id?;

        Some(match result {
            Ok(result) => JsonRpcResponse::success(Some(id), result),
            Err(error) => JsonRpcResponse::failure(Some(id), error),
        })
    }

    fn handle_initialize(&self, params: Option<Value>) -> Result<Value, JsonRpcError> {
        let params: InitializeParams = serde_json::from_value(params.unwrap_or_else(|| json!({})))
            .map_err(|e| JsonRpcError::new(INVALID_PARAMS, format!("Invalid initialize params: {}", e)))?;

        let protocol_version = params
            .protocol_version
            .unwrap_or_else(|| PROTOCOL_VERSION.to_string());

        let result = InitializeResult {
            protocol_version,
            capabilities: ServerCapabilities {
                tools: Some(json!({})),
            },
            server_info: ServerInfo {
                name: SERVER_NAME.to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
        };

        serde_json::to_value(result).map_err(|e| {
            JsonRpcError::new(INTERNAL_ERROR, format!("Failed to serialize result: {}", e))
        })
    }

    fn handle_list_tools(&self) -> Result<Value, JsonRpcError> {
        let result = ListToolsResult {
            tools: self.tools.list_tools(),
        };

        serde_json::to_value(result).map_err(|e| {
            JsonRpcError::new(INTERNAL_ERROR, format!("Failed to serialize tools: {}", e))
        })
    }

    async fn handle_call_tool(&self, params: Option<Value>) -> Result<Value, JsonRpcError> {
        let params: CallToolParams = serde_json::from_value(params.unwrap_or(Value::Null))
            .map_err(|e| JsonRpcError::new(INVALID_PARAMS, format!("Invalid tool call params: {}", e)))?;

        info!("Calling tool {}", params.name);

        let payload = self
            .tools
            .call_tool(&params.name, params.arguments)
            .await
            .map_err(|e| {
                error!("Tool {} failed: {}", params.name, e);
                JsonRpcError::new(e.rpc_code(), e.to_string())
            })?;

        let text = serde_json::to_string(&payload).map_err(|e| {
            JsonRpcError::new(INTERNAL_ERROR, format!("Failed to serialize hits: {}", e))
        })?;

        serde_json::to_value(CallToolResult::text(text)).map_err(|e| {
            JsonRpcError::new(INTERNAL_ERROR, format!("Failed to serialize tool result: {}", e))
        })
    }
}

async fn http_mcp(State(server): State<Arc<McpServer>>, body: Bytes) -> Response {
    match server.handle_message(&body).await {
        Some(response) => Json(response).into_response(),
        None => StatusCode::ACCEPTED.into_response(),
    }
}

async fn http_health(State(server): State<Arc<McpServer>>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "server": SERVER_NAME,
        "version": env!("CARGO_PKG_VERSION"),
        "initialized": server.is_initialized(),
    }))
}

//! Byte transports carrying one JSON-RPC request and its response

use crate::mcp::codec;
use crate::mcp::protocol::{
    JsonRpcRequest, RequestId, JSONRPC_VERSION, METHOD_INITIALIZE, METHOD_INITIALIZED,
};
use crate::mcp::McpServer;
use crate::types::{Result, SearchError};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE};
use reqwest::StatusCode;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use url::Url;

/// Synchronous request/response exchange with a tool server
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, payload: Vec<u8>) -> Result<Vec<u8>>;
}

/// Header carrying the streamable-HTTP session id
pub const SESSION_HEADER: &str = "mcp-session-id";

/// Slack added to the HTTP client timeout so the caller's RPC deadline
/// always fires first
const HTTP_TIMEOUT_GRACE: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, PartialEq, Eq)]
enum Session {
    /// The server issued no session id
    Stateless,
    Id(String),
}

impl Session {
    fn id(&self) -> Option<&str> {
        match self {
            Session::Stateless => None,
            Session::Id(id) => Some(id),
        }
    }
}

/// JSON-RPC over HTTP POST to the server's `/mcp` endpoint.
///
/// The MCP `initialize` handshake runs lazily before the first request.
/// A session id returned by the server is sent on every later request; if
/// the server rejects it, the handshake runs once more.
pub struct HttpTransport {
    http: reqwest::Client,
    endpoint: Url,
    protocol_version: String,
    session: Mutex<Option<Session>>,
}

impl HttpTransport {
    pub fn new(server_url: &Url, protocol_version: &str, timeout: Duration) -> Result<Self> {
        let endpoint = mcp_endpoint(server_url)?;

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/json, text/event-stream"),
        );
        let version = HeaderValue::from_str(protocol_version)
            .map_err(|e| SearchError::Config(format!("invalid protocol version: {}", e)))?;
        headers.insert("mcp-protocol-version", version);

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout.saturating_add(HTTP_TIMEOUT_GRACE))
            .build()
            .map_err(|e| SearchError::Config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            endpoint,
            protocol_version: protocol_version.to_string(),
            session: Mutex::new(None),
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Current session id, running the handshake first if needed
    async fn session(&self) -> Result<Option<String>> {
        let mut state = self.session.lock().await;
        if let Some(session) = state.as_ref() {
            return Ok(session.id().map(str::to_string));
        }

        let session = self.handshake().await?;
        let id = session.id().map(str::to_string);
        *state = Some(session);
        Ok(id)
    }

    /// Forget `stale` so the next request re-initializes
    async fn drop_session(&self, stale: &str) {
        let mut state = self.session.lock().await;
        if state.as_ref().and_then(Session::id) == Some(stale) {
            *state = None;
        }
    }

    async fn handshake(&self) -> Result<Session> {
        info!("Initializing MCP session with {}", self.endpoint);

        let id = RequestId::String(METHOD_INITIALIZE.to_string());
        let initialize = JsonRpcRequest {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id: Some(id.clone()),
            method: METHOD_INITIALIZE.to_string(),
            params: Some(json!({
                "protocolVersion": self.protocol_version,
                "capabilities": {},
                "clientInfo": {"name": "ytmcp", "version": env!("CARGO_PKG_VERSION")},
            })),
        };

        let reply = self.post(codec::to_bytes(&initialize)?, None).await?;
        if !reply.status.is_success() {
            return Err(SearchError::Transport(format!(
                "initialize failed with {}: {}",
                reply.status,
                snippet(&reply.body)
            )));
        }

        let session = match reply.session_id {
            Some(id) => Session::Id(id),
            None => Session::Stateless,
        };

        let accepted = extract_envelope(&reply.body)
            .ok_or_else(|| SearchError::MalformedEnvelope("empty initialize response".to_string()))
            .and_then(|envelope| codec::decode_response(envelope.as_bytes(), &id))
            .and_then(codec::extract_result);
        if let Err(e) = accepted {
            warn!("Server rejected initialize ({}), continuing without a handshake", e);
            return Ok(session);
        }

        let initialized = JsonRpcRequest {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id: None,
            method: METHOD_INITIALIZED.to_string(),
            params: Some(json!({})),
        };
        match self.post(codec::to_bytes(&initialized)?, session.id()).await {
            Ok(reply) if !reply.status.is_success() => {
                warn!("initialized notification answered with {}", reply.status)
            }
            Err(e) => warn!("initialized notification failed: {}", e),
            Ok(_) => {}
        }

        debug!("MCP session ready: {:?}", session);
        Ok(session)
    }

    async fn post(&self, payload: Vec<u8>, session: Option<&str>) -> Result<HttpReply> {
        debug!("POST {} ({} bytes)", self.endpoint, payload.len());

        let mut request = self.http.post(self.endpoint.clone()).body(payload);
        if let Some(session) = session {
            request = request.header(SESSION_HEADER, session);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                SearchError::Transport(format!("request to {} timed out", self.endpoint))
            } else {
                SearchError::Transport(format!("request to {} failed: {}", self.endpoint, e))
            }
        })?;

        let status = response.status();
        let session_id = response
            .headers()
            .get(SESSION_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let body = response
            .text()
            .await
            .map_err(|e| SearchError::Transport(format!("failed to read response body: {}", e)))?;

        Ok(HttpReply {
            status,
            session_id,
            body,
        })
    }
}

struct HttpReply {
    status: StatusCode,
    session_id: Option<String>,
    body: String,
}

fn snippet(body: &str) -> String {
    body.chars().take(300).collect()
}

/// `http://host:port` -> `http://host:port/mcp`; a URL already ending in `/mcp` is kept.
pub fn mcp_endpoint(server_url: &Url) -> Result<Url> {
    if server_url.path().trim_end_matches('/').ends_with("/mcp") {
        return Ok(server_url.clone());
    }

    let mut base = server_url.clone();
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    base.join("mcp")
        .map_err(|e| SearchError::Config(format!("invalid server URL {}: {}", server_url, e)))
}

/// Pull the JSON envelope out of a body that may use SSE framing
pub fn extract_envelope(body: &str) -> Option<&str> {
    let trimmed = body.trim();
    if trimmed.starts_with('{') || trimmed.starts_with('[') {
        return Some(trimmed);
    }

    trimmed
        .lines()
        .find_map(|line| line.trim().strip_prefix("data:"))
        .map(str::trim)
        .filter(|data| !data.is_empty())
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, payload: Vec<u8>) -> Result<Vec<u8>> {
        let session = self.session().await?;
        let mut reply = self.post(payload.clone(), session.as_deref()).await?;

        if let Some(stale) = session.as_deref() {
            if reply.status == StatusCode::BAD_REQUEST || reply.status == StatusCode::NOT_FOUND {
                warn!("Session {} rejected with {}, re-initializing", stale, reply.status);
                self.drop_session(stale).await;
                let session = self.session().await?;
                reply = self.post(payload, session.as_deref()).await?;
            }
        }

        if !reply.status.is_success() {
            return Err(SearchError::Transport(format!(
                "server returned {}: {}",
                reply.status,
                snippet(&reply.body)
            )));
        }

        extract_envelope(&reply.body)
            .map(|envelope| envelope.as_bytes().to_vec())
            .ok_or_else(|| SearchError::MalformedEnvelope("empty response body".to_string()))
    }
}

/// Dispatches straight into an in-process [`McpServer`]
pub struct LocalTransport {
    server: Arc<McpServer>,
}

impl LocalTransport {
    pub fn new(server: Arc<McpServer>) -> Self {
        Self { server }
    }
}

#[async_trait]
impl Transport for LocalTransport {
    async fn send(&self, payload: Vec<u8>) -> Result<Vec<u8>> {
        let response = self.server.handle_message(&payload).await.ok_or_else(|| {
            SearchError::Transport("server produced no response".to_string())
        })?;
        Ok(serde_json::to_vec(&response)?)
    }
}

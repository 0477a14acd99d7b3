//! JSON-RPC client for a remote tool server
//!
//! Allocates request ids, enforces the per-call timeout, and checks every
//! response against the id of the request it answers.

use crate::mcp::codec;
use crate::mcp::protocol::{JsonRpcRequest, ListToolsResult, RequestId, Tool};
use crate::relay::transport::Transport;
use crate::types::{Result, SearchError};
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::debug;

pub struct RpcClient {
    transport: Arc<dyn Transport>,
    next_id: AtomicU64,
    timeout: Duration,
}

impl RpcClient {
    pub fn new(transport: Arc<dyn Transport>, timeout: Duration) -> Self {
        Self {
            transport,
            next_id: AtomicU64::new(1),
            timeout,
        }
    }

    /// `tools/list`
    pub async fn list_tools(&self) -> Result<Vec<Tool>> {
        let result = self.send_request(codec::encode_list_request).await?;
        let listing: ListToolsResult = serde_json::from_value(result).map_err(|e| {
            SearchError::MalformedEnvelope(format!("invalid tools/list result: {}", e))
        })?;
        Ok(listing.tools)
    }

    /// `tools/call`, returning the raw result payload
    pub async fn call_tool(&self, name: &str, arguments: Value) -> Result<Value> {
        self.send_request(|id| codec::encode_call_request(id, name, arguments))
            .await
    }

    async fn send_request(&self, build: impl FnOnce(RequestId) -> JsonRpcRequest) -> Result<Value> {
        let id = RequestId::from(self.next_id.fetch_add(1, Ordering::SeqCst));
        let request = build(id.clone());
        let payload = codec::to_bytes(&request)?;

        debug!("Sending request {}: {}", id, request.method);

        let raw = timeout(self.timeout, self.transport.send(payload))
            .await
            .map_err(|_| SearchError::Timeout(self.timeout.as_millis() as u64))??;

        let response = codec::decode_response(&raw, &id)?;
        codec::extract_result(response)
    }
}

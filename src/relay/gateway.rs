//! MCP gateway
//!
//! Runs one per-kind search against the remote tool server: resolve the
//! tool, clamp the result count to its schema, call it, then normalize the
//! hits it returns.

use crate::mcp::protocol::CallToolResult;
use crate::relay::catalog::{ToolCatalog, ToolDescriptor};
use crate::relay::client::RpcClient;
use crate::relay::normalizer::ResultNormalizer;
use crate::types::{ContentKind, Result, SearchError, SearchItem, METHOD_NOT_FOUND};
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{debug, info, warn};

pub struct McpGateway {
    client: Arc<RpcClient>,
    catalog: Arc<ToolCatalog>,
    normalizer: ResultNormalizer,
}

impl McpGateway {
    pub fn new(client: Arc<RpcClient>, catalog: Arc<ToolCatalog>) -> Self {
        Self {
            client,
            catalog,
            normalizer: ResultNormalizer::new(),
        }
    }

    pub fn catalog(&self) -> &Arc<ToolCatalog> {
        &self.catalog
    }

    /// Search one content kind. A blank query is rejected with
    /// [`SearchError::InvalidArgument`] before anything is sent; every other
    /// failure comes back as a [`SearchError::Gateway`] tagged with `kind`.
    pub async fn search(&self, kind: ContentKind, query: &str, max_results: u32) -> Result<Vec<SearchItem>> {
        let query = query.trim();
        if query.is_empty() {
            return Err(SearchError::InvalidArgument("query must not be empty".to_string()));
        }

        self.search_once_with_retry(kind, query, max_results)
            .await
            .map_err(|e| SearchError::for_kind(kind, e))
    }

    async fn search_once_with_retry(
        &self,
        kind: ContentKind,
        query: &str,
        max_results: u32,
    ) -> Result<Vec<SearchItem>> {
        let descriptor = self.catalog.resolve(kind).await?;

        match self.invoke(&descriptor, kind, query, max_results).await {
            Err(SearchError::Rpc { code, message }) if code == METHOD_NOT_FOUND => {
                warn!("Tool {} vanished ({}), re-discovering", descriptor.name, message);
                self.catalog.invalidate().await;

                let descriptor = self.catalog.resolve(kind).await?;
                self.invoke(&descriptor, kind, query, max_results).await
            }
            outcome => outcome,
        }
    }

    async fn invoke(
        &self,
        descriptor: &ToolDescriptor,
        kind: ContentKind,
        query: &str,
        max_results: u32,
    ) -> Result<Vec<SearchItem>> {
        let limit = descriptor.schema.clamp(max_results);
        if limit != max_results {
            debug!("Clamped max_results {} -> {} for {}", max_results, limit, descriptor.name);
        }

        let mut arguments = Map::new();
        arguments.insert("query".to_string(), Value::String(query.to_string()));
        arguments.insert(descriptor.schema.max_results_key.clone(), Value::from(limit));

        info!("Calling {} for {} (max {})", descriptor.name, kind, limit);

        let outcome = self
            .call(descriptor, kind, Value::Object(arguments), limit as usize)
            .await;

        match &outcome {
            Ok(items) => {
                debug!("{} returned {} {}", descriptor.name, items.len(), kind.plural());
                self.catalog.record_success();
            }
            Err(SearchError::Rpc { code, .. }) if *code == METHOD_NOT_FOUND => {}
            Err(e) => {
                warn!("{} failed: {}", descriptor.name, e);
                self.catalog.record_failure().await;
            }
        }
        outcome
    }

    async fn call(
        &self,
        descriptor: &ToolDescriptor,
        kind: ContentKind,
        arguments: Value,
        limit: usize,
    ) -> Result<Vec<SearchItem>> {
        let result = self.client.call_tool(&descriptor.name, arguments).await?;
        let hits = extract_hits(kind, result)?;

        let mut items = Vec::with_capacity(hits.len().min(limit));
        let mut rejected = None;
        for hit in &hits {
            match self.normalizer.normalize(kind, hit) {
                Ok(item) => items.push(item),
                Err(e) => {
                    warn!("Skipping {} hit: {}", kind, e);
                    rejected.get_or_insert(e);
                }
            }
        }

        if items.is_empty() {
            if let Some(e) = rejected {
                return Err(e);
            }
        }

        items.truncate(limit);
        Ok(items)
    }
}

/// Pull the raw hit list for `kind` out of a `tools/call` result.
///
/// The text block may hold a hit array, an aggregate object keyed by plural
/// kind, or `{"error": ...}`.
pub fn extract_hits(kind: ContentKind, result: Value) -> Result<Vec<Value>> {
    let result: CallToolResult = serde_json::from_value(result)
        .map_err(|e| SearchError::MalformedEnvelope(format!("invalid tools/call result: {}", e)))?;

    let text = result.first_text();
    if result.is_error == Some(true) {
        return Err(SearchError::Upstream(
            text.unwrap_or("tool reported an error").to_string(),
        ));
    }

    let text = text.ok_or_else(|| {
        SearchError::MalformedEnvelope("tool result has no text content".to_string())
    })?;

    let payload: Value = serde_json::from_str(text)
        .map_err(|e| SearchError::MalformedEnvelope(format!("tool text is not JSON: {}", e)))?;

    match payload {
        Value::Array(hits) => Ok(hits),
        Value::Object(mut object) => {
            if let Some(error) = object.get("error") {
                let message = error
                    .as_str()
                    .map(str::to_string)
                    .unwrap_or_else(|| error.to_string());
                return Err(SearchError::Upstream(message));
            }
            match object.remove(kind.plural()) {
                Some(Value::Array(hits)) => Ok(hits),
                _ => Err(SearchError::MalformedEnvelope(format!(
                    "tool result has no {} array",
                    kind.plural()
                ))),
            }
        }
        _ => Err(SearchError::MalformedEnvelope(
            "tool result is neither a hit array nor an object".to_string(),
        )),
    }
}

//! Tool catalog
//!
//! Lazily discovers the search tools a remote server advertises and caches
//! them until explicitly invalidated. Readers always see a whole snapshot:
//! the cached set is an `Arc<Vec<_>>` swapped under a write lock.

use crate::mcp::protocol::Tool;
use crate::relay::client::RpcClient;
use crate::types::{ContentKind, Result, SearchError, MAX_RESULTS, MIN_RESULTS};
use serde_json::Value;
use std::collections::HashSet;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

const DEFAULT_MAX_RESULTS: u32 = 10;

/// Bounds a tool declares for its result-count parameter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchSchema {
    pub min_results: u32,
    pub max_results: u32,
    pub default_max_results: u32,
    /// Argument name the tool expects (`max_results` or `maxResults`)
    pub max_results_key: String,
}

impl Default for SearchSchema {
    fn default() -> Self {
        Self {
            min_results: MIN_RESULTS,
            max_results: MAX_RESULTS,
            default_max_results: DEFAULT_MAX_RESULTS,
            max_results_key: "max_results".to_string(),
        }
    }
}

impl SearchSchema {
    fn from_input_schema(schema: &Value) -> Option<Self> {
        let properties = schema.get("properties")?.as_object()?;
        properties.get("query")?;

        let mut parsed = SearchSchema::default();
        let Some((key, property)) = ["max_results", "maxResults"]
            .iter()
            .find_map(|key| properties.get(*key).map(|p| (*key, p)))
        else {
            return Some(parsed);
        };

        parsed.max_results_key = key.to_string();
        let bound = |name: &str| {
            property
                .get(name)
                .and_then(Value::as_i64)
                .map(|n| n.clamp(MIN_RESULTS as i64, MAX_RESULTS as i64) as u32)
        };

        parsed.min_results = bound("minimum").unwrap_or(MIN_RESULTS);
        parsed.max_results = bound("maximum").unwrap_or(MAX_RESULTS).max(parsed.min_results);
        parsed.default_max_results = bound("default")
            .unwrap_or(DEFAULT_MAX_RESULTS)
            .clamp(parsed.min_results, parsed.max_results);

        Some(parsed)
    }

    /// Clamp a requested count into the declared bounds
    pub fn clamp(&self, requested: u32) -> u32 {
        requested.clamp(self.min_results, self.max_results)
    }
}

/// A discovered search tool
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    /// `None` for tools that span several kinds
    pub kind: Option<ContentKind>,
    pub schema: SearchSchema,
}

impl ToolDescriptor {
    /// Build a descriptor from a `tools/list` entry; tools without a `query`
    /// parameter are not search tools.
    pub fn from_tool(tool: &Tool) -> Option<Self> {
        let schema = SearchSchema::from_input_schema(&tool.input_schema)?;
        Some(Self {
            name: tool.name.clone(),
            description: tool.description.clone(),
            kind: ContentKind::from_tool_name(&tool.name),
            schema,
        })
    }
}

pub struct ToolCatalog {
    client: Arc<RpcClient>,
    cache: RwLock<Option<Arc<Vec<ToolDescriptor>>>>,
    refresh_lock: Mutex<()>,
    consecutive_failures: AtomicU32,
    invalidate_after: u32,
}

impl ToolCatalog {
    pub fn new(client: Arc<RpcClient>, invalidate_after: u32) -> Self {
        Self {
            client,
            cache: RwLock::new(None),
            refresh_lock: Mutex::new(()),
            consecutive_failures: AtomicU32::new(0),
            invalidate_after: invalidate_after.max(1),
        }
    }

    /// Fetch the tool listing and replace the cached set
    pub async fn refresh(&self) -> Result<Arc<Vec<ToolDescriptor>>> {
        info!("Discovering tools");

        let tools = self
            .client
            .list_tools()
            .await
            .map_err(|e| SearchError::Discovery(e.to_string()))?;

        let mut seen = HashSet::new();
        let descriptors: Vec<ToolDescriptor> = tools
            .iter()
            .filter_map(|tool| {
                let descriptor = ToolDescriptor::from_tool(tool);
                if descriptor.is_none() {
                    debug!("Skipping non-search tool {}", tool.name);
                }
                descriptor
            })
            .filter(|descriptor| {
                let fresh = seen.insert(descriptor.name.clone());
                if !fresh {
                    warn!("Duplicate tool {} in listing, keeping the first", descriptor.name);
                }
                fresh
            })
            .collect();

        if descriptors.is_empty() {
            return Err(SearchError::Discovery(
                "server advertises no search tools".to_string(),
            ));
        }

        info!(
            "Discovered {} tools: {}",
            descriptors.len(),
            descriptors.iter().map(|d| d.name.as_str()).collect::<Vec<_>>().join(", ")
        );

        let descriptors = Arc::new(descriptors);
        *self.cache.write().await = Some(Arc::clone(&descriptors));
        self.consecutive_failures.store(0, Ordering::SeqCst);
        Ok(descriptors)
    }

    /// Cached descriptors, discovering them on first use
    pub async fn descriptors(&self) -> Result<Arc<Vec<ToolDescriptor>>> {
        if let Some(cached) = self.cache.read().await.as_ref() {
            return Ok(Arc::clone(cached));
        }

        // Only one caller discovers; the rest wait and reuse its result
        let _guard = self.refresh_lock.lock().await;
        if let Some(cached) = self.cache.read().await.as_ref() {
            return Ok(Arc::clone(cached));
        }
        self.refresh().await
    }

    /// Find the tool serving `kind`
    pub async fn resolve(&self, kind: ContentKind) -> Result<ToolDescriptor> {
        let descriptors = self.descriptors().await?;
        let descriptor = descriptors
            .iter()
            .find(|d| d.kind == Some(kind))
            .cloned()
            .ok_or(SearchError::UnknownTool(kind))?;

        debug!("Resolved {} to tool {}", kind, descriptor.name);
        Ok(descriptor)
    }

    /// Drop the cached set; the next resolve re-discovers
    pub async fn invalidate(&self) {
        info!("Invalidating tool catalog");
        *self.cache.write().await = None;
        self.consecutive_failures.store(0, Ordering::SeqCst);
    }

    pub fn record_success(&self) {
        self.consecutive_failures.store(0, Ordering::SeqCst);
    }

    pub async fn record_failure(&self) {
        let failures = self.consecutive_failures.fetch_add(1, Ordering::SeqCst) + 1;
        if failures >= self.invalidate_after {
            warn!("{} consecutive tool failures", failures);
            self.invalidate().await;
        }
    }

    pub async fn is_cached(&self) -> bool {
        self.cache.read().await.is_some()
    }
}

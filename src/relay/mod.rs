//! Relay to a remote MCP tool server
//!
//! Discovers the server's search tools, invokes them per content kind, and
//! merges the normalized results.

pub mod aggregator;
pub mod catalog;
pub mod client;
pub mod gateway;
pub mod normalizer;
pub mod transport;

#[cfg(test)]
pub(crate) mod test_support;

pub use aggregator::SearchAggregator;
pub use catalog::{SearchSchema, ToolCatalog, ToolDescriptor};
pub use client::RpcClient;
pub use gateway::McpGateway;
pub use normalizer::{field_map, FieldMap, ResultNormalizer};
pub use transport::{HttpTransport, LocalTransport, Transport};

use crate::config::ClientSettings;
use crate::types::Result;
use std::sync::Arc;
use tracing::info;

/// Wire an aggregator to `transport`
pub fn build(transport: Arc<dyn Transport>, settings: &ClientSettings) -> SearchAggregator {
    let client = Arc::new(RpcClient::new(transport, settings.request_timeout));
    let catalog = Arc::new(ToolCatalog::new(
        Arc::clone(&client),
        settings.invalidate_after_failures,
    ));
    let gateway = Arc::new(McpGateway::new(client, catalog));
    SearchAggregator::new(gateway, settings.search_deadline)
}

/// Wire an aggregator to the HTTP tool server named in `settings`
pub fn connect(settings: &ClientSettings) -> Result<SearchAggregator> {
    let transport = HttpTransport::new(
        &settings.server_url,
        &settings.protocol_version,
        settings.request_timeout,
    )?;
    info!("Relaying searches to {}", transport.endpoint());
    Ok(build(Arc::new(transport), settings))
}

//! ytmcp - YouTube search over the Model Context Protocol
//!
//! This crate provides both ends of an MCP search bridge: a tool server
//! exposing YouTube Data API searches as MCP tools, and a relay that
//! discovers those tools on a remote server, fans searches out per content
//! kind, and normalizes the results into one uniform model.

pub mod config;
pub mod mcp;
pub mod relay;
pub mod types;
pub mod youtube;

pub use config::{ConfigLoader, Settings};
pub use mcp::{McpServer, ToolProvider};
pub use relay::{McpGateway, SearchAggregator, ToolCatalog};
pub use types::{Result, SearchError};
pub use youtube::YouTubeClient;

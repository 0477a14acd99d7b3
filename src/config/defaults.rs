//! Built-in configuration defaults

use crate::mcp::protocol::PROTOCOL_VERSION;
use crate::youtube::DEFAULT_BASE_URL;

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 8000;

pub const DEFAULT_YOUTUBE_BASE_URL: &str = DEFAULT_BASE_URL;

pub const DEFAULT_SERVER_URL: &str = "http://localhost:8080";
pub const DEFAULT_PROTOCOL_VERSION: &str = PROTOCOL_VERSION;
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 30_000;
pub const DEFAULT_SEARCH_DEADLINE_MS: u64 = 45_000;
pub const DEFAULT_INVALIDATE_AFTER_FAILURES: u32 = 3;

/// Environment variables that override file configuration
pub const ENV_API_KEY: &str = "YOUTUBE_API_KEY";
pub const ENV_HOST: &str = "MCP_HOST";
pub const ENV_PORT: &str = "MCP_PORT";
pub const ENV_SERVER_URL: &str = "MCP_SERVER_URL";
pub const ENV_PROTOCOL_VERSION: &str = "MCP_PROTOCOL_VERSION";

/// Points at an explicit config file
pub const ENV_CONFIG_PATH: &str = "YTMCP_CONFIG";

//! MCP protocol, codec, and the tool server

pub mod codec;
pub mod protocol;
pub mod server;
pub mod tools;

pub use server::McpServer;
pub use tools::ToolProvider;

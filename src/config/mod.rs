//! Configuration system for ytmcp
//!
//! Provides a 3-tier configuration hierarchy:
//! 1. Environment variables (highest priority)
//! 2. Config file (`./.ytmcp.toml`, `$YTMCP_CONFIG`, `~/.config/ytmcp/config.toml`)
//! 3. Built-in defaults (lowest priority)

pub mod defaults;
mod loader;
mod settings;
mod user_config;

pub use loader::ConfigLoader;
pub use settings::{ClientSettings, ServerSettings, Settings, YouTubeSettings};
pub use user_config::{ClientSection, ServerSection, UserConfig, YouTubeSection};

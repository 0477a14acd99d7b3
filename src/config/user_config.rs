//! User configuration file parsing

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct UserConfig {
    pub server: ServerSection,
    pub youtube: YouTubeSection,
    pub client: ClientSection,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    pub host: Option<String>,
    pub port: Option<u16>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct YouTubeSection {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub default_order: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientSection {
    pub server_url: Option<String>,
    pub protocol_version: Option<String>,
    pub request_timeout_ms: Option<u64>,
    pub search_deadline_ms: Option<u64>,
    pub invalidate_after_failures: Option<u32>,
}

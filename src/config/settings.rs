//! Resolved settings, after every configuration layer is applied

use crate::types::{Result, SearchError};
use crate::youtube::SearchOrder;
use std::net::SocketAddr;
use std::time::Duration;
use url::Url;

#[derive(Debug, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub youtube: YouTubeSettings,
    pub client: ClientSettings,
}

/// Where `ytmcp serve --mode http` listens
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

impl ServerSettings {
    pub fn addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| SearchError::Config(format!("invalid listen address {}:{}: {}", self.host, self.port, e)))
    }
}

#[derive(Debug, Clone)]
pub struct YouTubeSettings {
    pub api_key: Option<String>,
    pub base_url: Url,
    pub default_order: SearchOrder,
}

/// How the relay reaches a remote tool server
#[derive(Debug, Clone)]
pub struct ClientSettings {
    pub server_url: Url,
    pub protocol_version: String,
    pub request_timeout: Duration,
    pub search_deadline: Duration,
    pub invalidate_after_failures: u32,
}

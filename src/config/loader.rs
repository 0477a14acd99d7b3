//! Configuration loader with 3-tier precedence
//!
//! Priority order (highest to lowest):
//! 1. Environment variables (YOUTUBE_API_KEY, MCP_HOST, MCP_PORT, ...)
//! 2. User config (.ytmcp.toml, $YTMCP_CONFIG or ~/.config/ytmcp/config.toml)
//! 3. Built-in defaults

use crate::config::defaults::*;
use crate::config::{ClientSettings, ServerSettings, Settings, UserConfig, YouTubeSettings};
use crate::types::{Result, SearchError};
use crate::youtube::SearchOrder;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

#[derive(Debug, Default)]
pub struct ConfigLoader {
    user_config: UserConfig,
    source: Option<PathBuf>,
}

impl ConfigLoader {
    /// Load the first config file found in the standard locations
    pub fn new() -> Result<Self> {
        Self::from_candidates(&Self::candidate_paths())
    }

    /// Config file locations in priority order
    pub fn candidate_paths() -> Vec<PathBuf> {
        let mut candidates = Vec::new();

        // Project-specific config
        if let Ok(cwd) = std::env::current_dir() {
            candidates.push(cwd.join(".ytmcp.toml"));
        }

        // Environment variable
        if let Ok(config_path) = std::env::var(ENV_CONFIG_PATH) {
            candidates.push(PathBuf::from(config_path));
        }

        // User-global config
        if let Some(config_dir) = dirs::config_dir() {
            candidates.push(config_dir.join("ytmcp").join("config.toml"));
        }

        candidates
    }

    pub fn from_candidates(candidates: &[PathBuf]) -> Result<Self> {
        match candidates.iter().find(|path| path.exists()) {
            Some(path) => Self::from_file(path),
            None => {
                debug!("No user config file found");
                Ok(Self::default())
            }
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("Loading user config from: {}", path.display());
        let content = std::fs::read_to_string(path).map_err(|e| {
            SearchError::Config(format!("Failed to read config {}: {}", path.display(), e))
        })?;

        let user_config: UserConfig = toml::from_str(&content).map_err(|e| {
            SearchError::Config(format!("Failed to parse config {}: {}", path.display(), e))
        })?;

        info!("Loaded user configuration from {}", path.display());
        Ok(Self {
            user_config,
            source: Some(path.to_path_buf()),
        })
    }

    /// File the configuration came from, if any
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    pub fn user_config(&self) -> &UserConfig {
        &self.user_config
    }

    /// Resolve settings against the process environment
    pub fn settings(&self) -> Result<Settings> {
        self.settings_with_env(|name| std::env::var(name).ok())
    }

    /// Resolve settings with `env` as the environment lookup
    pub fn settings_with_env(&self, env: impl Fn(&str) -> Option<String>) -> Result<Settings> {
        let env = |name: &str| env(name).filter(|value| !value.trim().is_empty());
        let file = &self.user_config;

        let port = match env(ENV_PORT) {
            Some(raw) => raw
                .trim()
                .parse::<u16>()
                .map_err(|e| SearchError::Config(format!("invalid {} '{}': {}", ENV_PORT, raw, e)))?,
            None => file.server.port.unwrap_or(DEFAULT_PORT),
        };

        let server = ServerSettings {
            host: env(ENV_HOST)
                .or_else(|| file.server.host.clone())
                .unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port,
        };

        let default_order = match &file.youtube.default_order {
            Some(order) => order
                .parse::<SearchOrder>()
                .map_err(|e| SearchError::Config(format!("youtube.default_order: {}", e)))?,
            None => SearchOrder::default(),
        };

        let youtube = YouTubeSettings {
            api_key: env(ENV_API_KEY).or_else(|| file.youtube.api_key.clone()),
            base_url: parse_url(
                "youtube.base_url",
                file.youtube.base_url.as_deref().unwrap_or(DEFAULT_YOUTUBE_BASE_URL),
            )?,
            default_order,
        };

        let server_url = env(ENV_SERVER_URL)
            .or_else(|| file.client.server_url.clone())
            .unwrap_or_else(|| DEFAULT_SERVER_URL.to_string());

        let client = ClientSettings {
            server_url: parse_url("client.server_url", &server_url)?,
            protocol_version: env(ENV_PROTOCOL_VERSION)
                .or_else(|| file.client.protocol_version.clone())
                .unwrap_or_else(|| DEFAULT_PROTOCOL_VERSION.to_string()),
            request_timeout: positive_millis(
                "client.request_timeout_ms",
                file.client.request_timeout_ms.unwrap_or(DEFAULT_REQUEST_TIMEOUT_MS),
            )?,
            search_deadline: positive_millis(
                "client.search_deadline_ms",
                file.client.search_deadline_ms.unwrap_or(DEFAULT_SEARCH_DEADLINE_MS),
            )?,
            invalidate_after_failures: match file.client.invalidate_after_failures {
                Some(0) => {
                    return Err(SearchError::Config(
                        "client.invalidate_after_failures must be at least 1".to_string(),
                    ))
                }
                Some(n) => n,
                None => DEFAULT_INVALIDATE_AFTER_FAILURES,
            },
        };

        Ok(Settings {
            server,
            youtube,
            client,
        })
    }
}

fn parse_url(field: &str, raw: &str) -> Result<Url> {
    let url = Url::parse(raw.trim())
        .map_err(|e| SearchError::Config(format!("{} '{}' is not a valid URL: {}", field, raw, e)))?;

    match url.scheme() {
        "http" | "https" => Ok(url),
        scheme => Err(SearchError::Config(format!(
            "{} must be an http(s) URL, got scheme '{}'",
            field, scheme
        ))),
    }
}

fn positive_millis(field: &str, millis: u64) -> Result<Duration> {
    if millis == 0 {
        return Err(SearchError::Config(format!("{} must be greater than 0", field)));
    }
    Ok(Duration::from_millis(millis))
}

//! MCP tools implementation
//!
//! Declares the YouTube search tools and implements them on top of a
//! [`ContentSearch`] provider, reshaping provider results into the hit
//! payloads the relay normalizes.

use crate::mcp::protocol::Tool;
use crate::types::{ContentKind, Result, SearchError, MAX_RESULTS, MIN_RESULTS};
use crate::youtube::{ContentSearch, ProviderHit, SearchOrder};
use futures::future::join_all;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tracing::{debug, warn};

pub const SEARCH_VIDEOS: &str = "search_youtube_videos";
pub const SEARCH_CHANNELS: &str = "search_youtube_channels";
pub const SEARCH_PLAYLISTS: &str = "search_youtube_playlists";
pub const SEARCH_ALL: &str = "search_youtube_all";

const DEFAULT_MAX_RESULTS: i64 = 10;
const DEFAULT_ALL_MAX_RESULTS: i64 = 25;
const DESCRIPTION_LIMIT: usize = 200;

fn tool_name(kind: ContentKind) -> &'static str {
    match kind {
        ContentKind::Video => SEARCH_VIDEOS,
        ContentKind::Channel => SEARCH_CHANNELS,
        ContentKind::Playlist => SEARCH_PLAYLISTS,
    }
}

fn search_schema(subject: &str, default_max: i64) -> Value {
    json!({
        "type": "object",
        "properties": {
            "query": {
                "type": "string",
                "description": format!("Search terms used to find {}", subject)
            },
            "max_results": {
                "type": "integer",
                "description": "Maximum number of results to return",
                "minimum": MIN_RESULTS,
                "maximum": MAX_RESULTS,
                "default": default_max
            },
            "order": {
                "type": "string",
                "description": "Result ordering",
                "enum": SearchOrder::ALL.map(|o| o.as_str()),
                "default": SearchOrder::Relevance.as_str()
            }
        },
        "required": ["query"]
    })
}

/// Get all tool definitions
pub fn get_tool_definitions() -> Vec<Tool> {
    vec![
        Tool {
            name: SEARCH_VIDEOS.to_string(),
            description: "Search for YouTube videos. Returns a JSON array of videos with title, channel, view and like counts, publish date, URL and thumbnail.".to_string(),
            input_schema: search_schema("videos", DEFAULT_MAX_RESULTS),
        },
        Tool {
            name: SEARCH_CHANNELS.to_string(),
            description: "Search for YouTube channels. Returns a JSON array of channels with title, subscriber, video and view counts, creation date, URL and thumbnail.".to_string(),
            input_schema: search_schema("channels", DEFAULT_MAX_RESULTS),
        },
        Tool {
            name: SEARCH_PLAYLISTS.to_string(),
            description: "Search for YouTube playlists. Returns a JSON array of playlists with title, owning channel, video count, creation date, URL and thumbnail.".to_string(),
            input_schema: search_schema("playlists", DEFAULT_MAX_RESULTS),
        },
        Tool {
            name: SEARCH_ALL.to_string(),
            description: "Search videos, channels and playlists at once. The result budget is split evenly across the three kinds.".to_string(),
            input_schema: search_schema("videos, channels and playlists", DEFAULT_ALL_MAX_RESULTS),
        },
    ]
}

#[derive(Debug, Deserialize)]
struct SearchArgs {
    #[serde(default)]
    query: String,
    #[serde(default, alias = "maxResults")]
    max_results: Option<i64>,
    #[serde(default)]
    order: Option<String>,
}

#[derive(Debug)]
struct ValidatedArgs {
    query: String,
    max_results: u32,
    order: Option<SearchOrder>,
}

fn validate_args(arguments: Option<Value>, default_max: i64) -> Result<ValidatedArgs> {
    let args: SearchArgs = serde_json::from_value(arguments.unwrap_or_else(|| json!({})))
        .map_err(|e| SearchError::InvalidArgument(format!("Invalid arguments: {}", e)))?;

    let query = args.query.trim().to_string();
    if query.is_empty() {
        return Err(SearchError::InvalidArgument(
            "query must be a non-empty string".to_string(),
        ));
    }

    let max_results = args.max_results.unwrap_or(default_max);
    if !(MIN_RESULTS as i64..=MAX_RESULTS as i64).contains(&max_results) {
        return Err(SearchError::InvalidArgument(format!(
            "max_results must be between {} and {}, got {}",
            MIN_RESULTS, MAX_RESULTS, max_results
        )));
    }

    let order = args
        .order
        .as_deref()
        .map(str::parse::<SearchOrder>)
        .transpose()?;

    Ok(ValidatedArgs {
        query,
        max_results: max_results as u32,
        order,
    })
}

/// Server-side tool implementations
pub struct ToolProvider {
    backend: Arc<dyn ContentSearch>,
    default_order: SearchOrder,
}

impl ToolProvider {
    pub fn new(backend: Arc<dyn ContentSearch>) -> Self {
        Self {
            backend,
            default_order: SearchOrder::default(),
        }
    }

    pub fn with_default_order(mut self, order: SearchOrder) -> Self {
        self.default_order = order;
        self
    }

    pub fn list_tools(&self) -> Vec<Tool> {
        get_tool_definitions()
    }

    /// Call a tool by name, returning its hit payload
    pub async fn call_tool(&self, name: &str, arguments: Option<Value>) -> Result<Value> {
        if name == SEARCH_ALL {
            let args = validate_args(arguments, DEFAULT_ALL_MAX_RESULTS)?;
            return self.search_all(args).await;
        }

        let kind = ContentKind::ALL
            .into_iter()
            .find(|kind| tool_name(*kind) == name)
            .ok_or_else(|| SearchError::ToolNotFound(name.to_string()))?;

        let args = validate_args(arguments, DEFAULT_MAX_RESULTS)?;
        let hits = self.search_kind(kind, &args, args.max_results).await?;
        Ok(Value::Array(hits))
    }

    async fn search_kind(&self, kind: ContentKind, args: &ValidatedArgs, max_results: u32) -> Result<Vec<Value>> {
        let order = args.order.unwrap_or(self.default_order);
        debug!("Searching {} for '{}' (max {}, order {})", kind.plural(), args.query, max_results, order);

        let hits = self
            .backend
            .search(kind, &args.query, max_results, order)
            .await
            .map_err(|e| match e {
                SearchError::Upstream(_) => e,
                other => SearchError::Upstream(other.to_string()),
            })?;

        Ok(hits.iter().map(hit_payload).collect())
    }

    async fn search_all(&self, args: ValidatedArgs) -> Result<Value> {
        let per_kind = (args.max_results / 3).max(1);

        let outcomes = join_all(
            ContentKind::ALL
                .into_iter()
                .map(|kind| self.search_kind(kind, &args, per_kind)),
        )
        .await;

        let mut payload = Map::new();
        let mut errors = Vec::new();
        for (kind, outcome) in ContentKind::ALL.into_iter().zip(outcomes) {
            let hits = match outcome {
                Ok(hits) => hits,
                Err(e) => {
                    warn!("Aggregate search for {} failed: {}", kind.plural(), e);
                    errors.push(format!("{}: {}", kind.plural(), e));
                    Vec::new()
                }
            };
            payload.insert(kind.plural().to_string(), Value::Array(hits));
        }

        if errors.len() == ContentKind::ALL.len() {
            return Err(SearchError::Upstream(errors.join("; ")));
        }

        Ok(Value::Object(payload))
    }
}

fn truncate_description(description: &str) -> String {
    if description.chars().count() > DESCRIPTION_LIMIT {
        let cut: String = description.chars().take(DESCRIPTION_LIMIT).collect();
        format!("{}...", cut)
    } else {
        description.to_string()
    }
}

fn detail(hit: &ProviderHit, key: &str) -> Value {
    hit.details.get(key).cloned().unwrap_or(Value::Null)
}

/// Reshape a provider result into the per-kind hit payload
fn hit_payload(hit: &ProviderHit) -> Value {
    let snippet = &hit.snippet;
    let description = truncate_description(&snippet.description);
    let thumbnail = snippet.thumbnail_url();

    let mut payload = match hit.kind {
        ContentKind::Video => json!({
            "video_id": hit.id,
            "title": snippet.title,
            "channel": snippet.channel_title,
            "views": detail(hit, "viewCount"),
            "likes": detail(hit, "likeCount"),
            "published": snippet.published_at,
            "url": format!("https://www.youtube.com/watch?v={}", hit.id),
            "description": description,
            "thumbnail": thumbnail,
        }),
        ContentKind::Channel => json!({
            "channel_id": hit.id,
            "title": snippet.title,
            "subscribers": detail(hit, "subscriberCount"),
            "videos": detail(hit, "videoCount"),
            "total_views": detail(hit, "viewCount"),
            "created": snippet.published_at,
            "url": format!("https://www.youtube.com/channel/{}", hit.id),
            "description": description,
            "thumbnail": thumbnail,
        }),
        ContentKind::Playlist => json!({
            "playlist_id": hit.id,
            "title": snippet.title,
            "channel": snippet.channel_title,
            "video_count": detail(hit, "itemCount"),
            "created": snippet.published_at,
            "url": format!("https://www.youtube.com/playlist?list={}", hit.id),
            "description": description,
            "thumbnail": thumbnail,
        }),
    };

    // Statistics missing from the details call are omitted rather than null
    if let Value::Object(map) = &mut payload {
        map.retain(|_, value| !value.is_null());
    }
    payload
}

//! Content-search provider
//!
//! The tool server delegates every query to a [`ContentSearch`]
//! implementation. [`YouTubeClient`] talks to the YouTube Data API v3.

mod client;

pub use client::{YouTubeClient, DEFAULT_BASE_URL};

use crate::types::{ContentKind, Result, SearchError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Result ordering understood by the provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SearchOrder {
    Date,
    Rating,
    #[default]
    Relevance,
    Title,
    VideoCount,
    ViewCount,
}

impl SearchOrder {
    pub const ALL: [SearchOrder; 6] = [
        SearchOrder::Date,
        SearchOrder::Rating,
        SearchOrder::Relevance,
        SearchOrder::Title,
        SearchOrder::VideoCount,
        SearchOrder::ViewCount,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SearchOrder::Date => "date",
            SearchOrder::Rating => "rating",
            SearchOrder::Relevance => "relevance",
            SearchOrder::Title => "title",
            SearchOrder::VideoCount => "videoCount",
            SearchOrder::ViewCount => "viewCount",
        }
    }
}

impl fmt::Display for SearchOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SearchOrder {
    type Err = SearchError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|order| order.as_str() == s)
            .ok_or_else(|| {
                SearchError::InvalidArgument(format!(
                    "order must be one of: {}",
                    Self::ALL.map(|o| o.as_str()).join(", ")
                ))
            })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snippet {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub channel_title: String,
    #[serde(default)]
    pub published_at: String,
    #[serde(default)]
    pub thumbnails: HashMap<String, Thumbnail>,
}

impl Snippet {
    /// Preferred thumbnail: medium, then high, then default
    pub fn thumbnail_url(&self) -> String {
        ["medium", "high", "default"]
            .iter()
            .find_map(|size| self.thumbnails.get(*size))
            .map(|t| t.url.clone())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Thumbnail {
    #[serde(default)]
    pub url: String,
}

/// One provider-native search result plus its per-kind details
/// (statistics for videos and channels, content details for playlists).
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderHit {
    pub kind: ContentKind,
    pub id: String,
    pub snippet: Snippet,
    pub details: Map<String, Value>,
}

/// "List items of kind K matching query Q, capped at R"
#[async_trait]
pub trait ContentSearch: Send + Sync {
    async fn search(
        &self,
        kind: ContentKind,
        query: &str,
        max_results: u32,
        order: SearchOrder,
    ) -> Result<Vec<ProviderHit>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_parsing() {
        assert_eq!("viewCount".parse::<SearchOrder>().unwrap(), SearchOrder::ViewCount);
        assert_eq!(SearchOrder::default(), SearchOrder::Relevance);
        assert!(matches!(
            "popularity".parse::<SearchOrder>().unwrap_err(),
            SearchError::InvalidArgument(_)
        ));
    }

    #[test]
    fn test_thumbnail_preference() {
        let mut snippet = Snippet::default();
        assert_eq!(snippet.thumbnail_url(), "");

        snippet.thumbnails.insert(
            "default".to_string(),
            Thumbnail {
                url: "https://i.ytimg.com/default.jpg".to_string(),
            },
        );
        snippet.thumbnails.insert(
            "medium".to_string(),
            Thumbnail {
                url: "https://i.ytimg.com/mq.jpg".to_string(),
            },
        );
        assert_eq!(snippet.thumbnail_url(), "https://i.ytimg.com/mq.jpg");
    }
}

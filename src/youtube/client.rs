//! YouTube Data API v3 client

use super::{ContentSearch, ProviderHit, SearchOrder, Snippet};
use crate::types::{ContentKind, Result, SearchError};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

pub const DEFAULT_BASE_URL: &str = "https://www.googleapis.com/youtube/v3/";

#[derive(Debug, Deserialize)]
struct SearchListResponse {
    #[serde(default)]
    items: Vec<SearchResult>,
}

#[derive(Debug, Deserialize)]
struct SearchResult {
    id: ResourceId,
    #[serde(default)]
    snippet: Snippet,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResourceId {
    kind: String,
    video_id: Option<String>,
    channel_id: Option<String>,
    playlist_id: Option<String>,
}

impl ResourceId {
    fn id_for(&self, kind: ContentKind) -> Option<&str> {
        let (expected, id) = match kind {
            ContentKind::Video => ("youtube#video", &self.video_id),
            ContentKind::Channel => ("youtube#channel", &self.channel_id),
            ContentKind::Playlist => ("youtube#playlist", &self.playlist_id),
        };
        if self.kind == expected {
            id.as_deref()
        } else {
            None
        }
    }
}

#[derive(Debug, Deserialize)]
struct DetailsListResponse {
    #[serde(default)]
    items: Vec<DetailsItem>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DetailsItem {
    id: String,
    statistics: Option<Map<String, Value>>,
    content_details: Option<Map<String, Value>>,
}

/// HTTP client for the search, videos, channels and playlists endpoints
pub struct YouTubeClient {
    http: reqwest::Client,
    base_url: Url,
    api_key: Option<String>,
}

impl YouTubeClient {
    pub fn new(api_key: Option<String>, base_url: &str, timeout: Duration) -> Result<Self> {
        // Url::join drops the last path segment unless it ends with '/'
        let normalized = if base_url.ends_with('/') {
            base_url.to_string()
        } else {
            format!("{}/", base_url)
        };
        let base_url = Url::parse(&normalized)
            .map_err(|e| SearchError::Config(format!("invalid YouTube base URL: {}", e)))?;

        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SearchError::Config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url,
            api_key: api_key.filter(|key| !key.trim().is_empty()),
        })
    }

    async fn get<T: DeserializeOwned>(&self, endpoint: &str, params: &[(&str, String)]) -> Result<T> {
        let api_key = self.api_key.as_deref().ok_or_else(|| {
            SearchError::Upstream(
                "YouTube API key not configured. Set YOUTUBE_API_KEY or youtube.api_key".to_string(),
            )
        })?;

        let url = self
            .base_url
            .join(endpoint)
            .map_err(|e| SearchError::Config(format!("invalid endpoint {}: {}", endpoint, e)))?;

        debug!("GET {}", url);

        let response = self
            .http
            .get(url)
            .query(params)
            .query(&[("key", api_key)])
            .send()
            .await
            .map_err(|e| SearchError::Upstream(format!("YouTube API request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SearchError::Upstream(format!(
                "YouTube API returned {}: {}",
                status,
                body.chars().take(300).collect::<String>()
            )));
        }

        response
            .json()
            .await
            .map_err(|e| SearchError::Upstream(format!("Invalid YouTube API response: {}", e)))
    }

    /// Fetch statistics / content details for a batch of ids
    async fn details(&self, kind: ContentKind, ids: &[String]) -> Result<HashMap<String, Map<String, Value>>> {
        let (endpoint, part) = match kind {
            ContentKind::Video => ("videos", "statistics"),
            ContentKind::Channel => ("channels", "statistics"),
            ContentKind::Playlist => ("playlists", "contentDetails"),
        };

        let response: DetailsListResponse = self
            .get(endpoint, &[("part", part.to_string()), ("id", ids.join(","))])
            .await?;

        Ok(response
            .items
            .into_iter()
            .filter_map(|item| {
                let details = item.statistics.or(item.content_details)?;
                Some((item.id, details))
            })
            .collect())
    }
}

#[async_trait]
impl ContentSearch for YouTubeClient {
    async fn search(
        &self,
        kind: ContentKind,
        query: &str,
        max_results: u32,
        order: SearchOrder,
    ) -> Result<Vec<ProviderHit>> {
        let response: SearchListResponse = self
            .get(
                "search",
                &[
                    ("part", "id,snippet".to_string()),
                    ("q", query.to_string()),
                    ("maxResults", max_results.to_string()),
                    ("type", kind.as_str().to_string()),
                    ("order", order.as_str().to_string()),
                ],
            )
            .await?;

        let mut hits: Vec<ProviderHit> = response
            .items
            .into_iter()
            .filter_map(|result| {
                let id = result.id.id_for(kind)?.to_string();
                Some(ProviderHit {
                    kind,
                    id,
                    snippet: result.snippet,
                    details: Map::new(),
                })
            })
            .collect();

        if hits.is_empty() {
            return Ok(hits);
        }

        // Statistics are best-effort; hits are still useful without them
        let ids: Vec<String> = hits.iter().map(|hit| hit.id.clone()).collect();
        match self.details(kind, &ids).await {
            Ok(mut details) => {
                for hit in &mut hits {
                    if let Some(found) = details.remove(&hit.id) {
                        hit.details = found;
                    }
                }
            }
            Err(e) => warn!("Failed to fetch {} details, returning hits without them: {}", kind, e),
        }

        Ok(hits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer, key: Option<&str>) -> YouTubeClient {
        YouTubeClient::new(
            key.map(ToString::to_string),
            &server.uri(),
            Duration::from_secs(5),
        )
        .unwrap()
    }

    fn search_body() -> Value {
        json!({
            "items": [
                {
                    "id": {"kind": "youtube#video", "videoId": "abc123"},
                    "snippet": {
                        "title": "Python Tutorial",
                        "description": "Learn Python",
                        "channelTitle": "Code Channel",
                        "publishedAt": "2024-03-01T12:00:00Z",
                        "thumbnails": {"medium": {"url": "https://i.ytimg.com/abc123/mq.jpg"}}
                    }
                },
                {
                    "id": {"kind": "youtube#channel", "channelId": "UCstray"},
                    "snippet": {"title": "Stray channel"}
                }
            ]
        })
    }

    #[tokio::test]
    async fn test_search_videos_with_statistics() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .and(query_param("type", "video"))
            .and(query_param("q", "python tutorial"))
            .and(query_param("maxResults", "5"))
            .and(query_param("key", "secret"))
            .respond_with(ResponseTemplate::new(200).set_body_json(search_body()))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/videos"))
            .and(query_param("id", "abc123"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": [{"id": "abc123", "statistics": {"viewCount": "1500", "likeCount": "42"}}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let hits = client(&server, Some("secret"))
            .search(ContentKind::Video, "python tutorial", 5, SearchOrder::Relevance)
            .await
            .unwrap();

        // The stray channel result is filtered out
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "abc123");
        assert_eq!(hits[0].snippet.channel_title, "Code Channel");
        assert_eq!(hits[0].details["viewCount"], "1500");
    }

    #[tokio::test]
    async fn test_search_survives_details_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .respond_with(ResponseTemplate::new(200).set_body_json(search_body()))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/videos"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let hits = client(&server, Some("secret"))
            .search(ContentKind::Video, "python", 5, SearchOrder::Date)
            .await
            .unwrap();

        assert_eq!(hits.len(), 1);
        assert!(hits[0].details.is_empty());
    }

    #[tokio::test]
    async fn test_search_error_status_is_upstream() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .respond_with(ResponseTemplate::new(403).set_body_string("quotaExceeded"))
            .mount(&server)
            .await;

        let err = client(&server, Some("secret"))
            .search(ContentKind::Channel, "rust", 5, SearchOrder::Relevance)
            .await
            .unwrap_err();

        match err {
            SearchError::Upstream(msg) => assert!(msg.contains("quotaExceeded")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_missing_api_key() {
        let server = MockServer::start().await;
        let err = client(&server, None)
            .search(ContentKind::Playlist, "rust", 5, SearchOrder::Relevance)
            .await
            .unwrap_err();
        assert!(matches!(err, SearchError::Upstream(_)));
    }
}

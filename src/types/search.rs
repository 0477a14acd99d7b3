//! Search domain types shared by the relay and the tool server

use crate::types::{Result, SearchError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

/// Lower bound for `maxResults` on every search
pub const MIN_RESULTS: u32 = 1;

/// Upper bound for `maxResults` on every search
pub const MAX_RESULTS: u32 = 50;

/// Category of searchable item.
///
/// Ordering is significant: merged results list videos, then channels,
/// then playlists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    Video,
    Channel,
    Playlist,
}

impl ContentKind {
    pub const ALL: [ContentKind; 3] = [ContentKind::Video, ContentKind::Channel, ContentKind::Playlist];

    pub fn as_str(&self) -> &'static str {
        match self {
            ContentKind::Video => "video",
            ContentKind::Channel => "channel",
            ContentKind::Playlist => "playlist",
        }
    }

    /// Plural form used in tool names and aggregate payload keys
    pub fn plural(&self) -> &'static str {
        match self {
            ContentKind::Video => "videos",
            ContentKind::Channel => "channels",
            ContentKind::Playlist => "playlists",
        }
    }

    /// Derive the kind a tool serves from its name (`search_youtube_videos` -> video).
    pub fn from_tool_name(name: &str) -> Option<Self> {
        let suffix = name.rsplit('_').next()?;
        Self::ALL.into_iter().find(|kind| kind.plural() == suffix)
    }
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContentKind {
    type Err = SearchError;

    fn from_str(s: &str) -> Result<Self> {
        let lowered = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == lowered || kind.plural() == lowered)
            .ok_or_else(|| SearchError::InvalidArgument(format!("unknown content kind '{}'", s)))
    }
}

/// Which kinds a request targets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KindSelector {
    All,
    One(ContentKind),
}

impl KindSelector {
    pub fn kinds(&self) -> Vec<ContentKind> {
        match self {
            KindSelector::All => ContentKind::ALL.to_vec(),
            KindSelector::One(kind) => vec![*kind],
        }
    }
}

impl FromStr for KindSelector {
    type Err = SearchError;

    fn from_str(s: &str) -> Result<Self> {
        if s.trim().eq_ignore_ascii_case("all") {
            return Ok(KindSelector::All);
        }
        s.parse().map(KindSelector::One)
    }
}

impl fmt::Display for KindSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KindSelector::All => f.write_str("all"),
            KindSelector::One(kind) => kind.fmt(f),
        }
    }
}

/// Uniform search result, whatever tool produced it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchItem {
    pub kind: ContentKind,
    pub id: String,
    pub title: String,
    pub description: String,
    pub thumbnail_url: String,
    pub published_at: Option<DateTime<Utc>>,
    pub extra: BTreeMap<String, Value>,
}

/// Validated search input. `max_results` is clamped on construction so
/// nothing downstream ever sees an out-of-range value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    query: String,
    kind: KindSelector,
    max_results: u32,
}

impl SearchRequest {
    pub fn new(query: impl Into<String>, kind: KindSelector, max_results: i64) -> Result<Self> {
        let query = query.into().trim().to_string();
        if query.is_empty() {
            return Err(SearchError::InvalidArgument(
                "query must not be empty".to_string(),
            ));
        }

        Ok(Self {
            query,
            kind,
            max_results: clamp_max_results(max_results),
        })
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn kind(&self) -> KindSelector {
        self.kind
    }

    pub fn max_results(&self) -> u32 {
        self.max_results
    }
}

pub fn clamp_max_results(requested: i64) -> u32 {
    requested.clamp(MIN_RESULTS as i64, MAX_RESULTS as i64) as u32
}

/// Merged outcome of a multi-kind search
#[derive(Debug)]
pub struct SearchResponse {
    items: Vec<SearchItem>,
    kinds_succeeded: BTreeSet<ContentKind>,
    kinds_failed: BTreeMap<ContentKind, SearchError>,
}

impl SearchResponse {
    pub(crate) fn new(
        items: Vec<SearchItem>,
        kinds_succeeded: BTreeSet<ContentKind>,
        kinds_failed: BTreeMap<ContentKind, SearchError>,
    ) -> Self {
        Self {
            items,
            kinds_succeeded,
            kinds_failed,
        }
    }

    pub fn items(&self) -> &[SearchItem] {
        &self.items
    }

    pub fn kinds_succeeded(&self) -> &BTreeSet<ContentKind> {
        &self.kinds_succeeded
    }

    pub fn kinds_failed(&self) -> &BTreeMap<ContentKind, SearchError> {
        &self.kinds_failed
    }

    pub fn is_partial(&self) -> bool {
        !self.kinds_failed.is_empty()
    }

    pub fn into_outcome(self) -> SearchOutcome {
        SearchOutcome {
            partial: self.is_partial(),
            failed_kinds: self.kinds_failed.into_keys().collect(),
            items: self.items,
        }
    }
}

/// Consumer-facing query shape: `{q, kind, maxResults}`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchQuery {
    pub q: String,
    #[serde(default = "default_kind")]
    pub kind: String,
    #[serde(default = "default_max_results")]
    pub max_results: i64,
}

fn default_kind() -> String {
    "all".to_string()
}

fn default_max_results() -> i64 {
    10
}

impl SearchQuery {
    pub fn into_request(self) -> Result<SearchRequest> {
        let kind: KindSelector = self.kind.parse()?;
        SearchRequest::new(self.q, kind, self.max_results)
    }
}

/// Consumer-facing result shape: `{items, partial, failedKinds}`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchOutcome {
    pub items: Vec<SearchItem>,
    pub partial: bool,
    pub failed_kinds: Vec<ContentKind>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_parsing() {
        assert_eq!("videos".parse::<ContentKind>().unwrap(), ContentKind::Video);
        assert_eq!("Channel".parse::<ContentKind>().unwrap(), ContentKind::Channel);
        assert_eq!("playlists".parse::<ContentKind>().unwrap(), ContentKind::Playlist);
        assert!("shorts".parse::<ContentKind>().is_err());

        assert_eq!("ALL".parse::<KindSelector>().unwrap(), KindSelector::All);
        assert_eq!(
            "video".parse::<KindSelector>().unwrap(),
            KindSelector::One(ContentKind::Video)
        );
    }

    #[test]
    fn test_kind_from_tool_name() {
        assert_eq!(
            ContentKind::from_tool_name("search_youtube_videos"),
            Some(ContentKind::Video)
        );
        assert_eq!(
            ContentKind::from_tool_name("search_youtube_playlists"),
            Some(ContentKind::Playlist)
        );
        assert_eq!(ContentKind::from_tool_name("search_youtube_all"), None);
    }

    #[test]
    fn test_request_clamps_max_results() {
        let req = SearchRequest::new("rust", KindSelector::All, 500).unwrap();
        assert_eq!(req.max_results(), MAX_RESULTS);

        let req = SearchRequest::new("rust", KindSelector::All, 0).unwrap();
        assert_eq!(req.max_results(), MIN_RESULTS);

        let req = SearchRequest::new("rust", KindSelector::All, -7).unwrap();
        assert_eq!(req.max_results(), MIN_RESULTS);
    }

    #[test]
    fn test_request_rejects_blank_query() {
        let err = SearchRequest::new("   ", KindSelector::All, 5).unwrap_err();
        assert!(matches!(err, SearchError::InvalidArgument(_)));
    }

    #[test]
    fn test_query_defaults() {
        let query: SearchQuery = serde_json::from_str(r#"{"q": "lofi"}"#).unwrap();
        let req = query.into_request().unwrap();
        assert_eq!(req.kind(), KindSelector::All);
        assert_eq!(req.max_results(), 10);
    }

    #[test]
    fn test_outcome_serialization() {
        let mut failed = BTreeMap::new();
        failed.insert(ContentKind::Channel, SearchError::Timeout(10));
        let response = SearchResponse::new(
            vec![],
            [ContentKind::Video, ContentKind::Playlist].into_iter().collect(),
            failed,
        );
        let json = serde_json::to_value(response.into_outcome()).unwrap();
        assert_eq!(json["partial"], true);
        assert_eq!(json["failedKinds"], serde_json::json!(["channel"]));
    }
}

//! Search aggregator
//!
//! Fans an "all kinds" search out to one gateway call per content kind and
//! merges whatever settles before the overall deadline.

use crate::relay::gateway::McpGateway;
use crate::types::{
    ContentKind, KindSelector, Result, SearchError, SearchItem, SearchOutcome, SearchQuery,
    SearchRequest, SearchResponse,
};
use futures::FutureExt;
use std::any::Any;
use std::collections::{BTreeMap, BTreeSet};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tokio::time::{timeout, timeout_at, Instant};
use tracing::{error, info, warn};

pub struct SearchAggregator {
    gateway: Arc<McpGateway>,
    deadline: Duration,
}

impl SearchAggregator {
    pub fn new(gateway: Arc<McpGateway>, deadline: Duration) -> Self {
        Self { gateway, deadline }
    }

    pub fn gateway(&self) -> &Arc<McpGateway> {
        &self.gateway
    }

    /// Consumer-facing search: `{q, kind, maxResults}` in,
    /// `{items, partial, failedKinds}` out
    pub async fn search(&self, query: SearchQuery) -> Result<SearchOutcome> {
        let request = query.into_request()?;
        Ok(self.query(&request).await?.into_outcome())
    }

    /// Run a validated request. Each kind searched gets up to
    /// `request.max_results()` items.
    pub async fn query(&self, request: &SearchRequest) -> Result<SearchResponse> {
        match request.kind() {
            KindSelector::All => self.search_all(request.query(), request.max_results()).await,
            KindSelector::One(kind) => {
                let items = timeout(
                    self.deadline,
                    self.gateway.search(kind, request.query(), request.max_results()),
                )
                .await
                .map_err(|_| SearchError::for_kind(kind, self.deadline_error()))??;

                Ok(SearchResponse::new(items, BTreeSet::from([kind]), BTreeMap::new()))
            }
        }
    }

    /// Search every content kind concurrently.
    ///
    /// Waits for all three to settle or for the deadline, whichever comes
    /// first. Kinds still running at the deadline are aborted and reported as
    /// timed out. Fails only when no kind succeeded.
    ///
    /// The query and count are validated first; an invalid request fails
    /// before any tool server traffic.
    pub async fn search_all(&self, query: &str, per_kind_max: u32) -> Result<SearchResponse> {
        let request = SearchRequest::new(query, KindSelector::All, i64::from(per_kind_max))?;
        let per_kind_max = request.max_results();
        info!("Searching all kinds for '{}' (max {} each)", request.query(), per_kind_max);

        let deadline = Instant::now() + self.deadline;
        let mut tasks = JoinSet::new();
        for kind in ContentKind::ALL {
            let gateway = Arc::clone(&self.gateway);
            let query = request.query().to_string();
            tasks.spawn(async move {
                let outcome = AssertUnwindSafe(gateway.search(kind, &query, per_kind_max))
                    .catch_unwind()
                    .await
                    .unwrap_or_else(|panic| {
                        let reason = panic_message(panic.as_ref());
                        error!("Search task for {} panicked: {}", kind, reason);
                        Err(SearchError::for_kind(kind, SearchError::TaskFailed(reason)))
                    });
                (kind, outcome)
            });
        }

        let mut outcomes: BTreeMap<ContentKind, Result<Vec<SearchItem>>> = BTreeMap::new();
        let mut timed_out = false;
        loop {
            match timeout_at(deadline, tasks.join_next()).await {
                Ok(Some(Ok((kind, outcome)))) => {
                    outcomes.insert(kind, outcome);
                }
                Ok(Some(Err(e))) => error!("Search task was cancelled: {}", e),
                Ok(None) => break,
                Err(_) => {
                    warn!("Search deadline of {:?} expired with {} kinds pending", self.deadline, tasks.len());
                    tasks.abort_all();
                    timed_out = true;
                    break;
                }
            }
        }

        for kind in ContentKind::ALL {
            outcomes.entry(kind).or_insert_with(|| {
                let cause = if timed_out {
                    self.deadline_error()
                } else {
                    SearchError::TaskFailed("cancelled before completing".to_string())
                };
                Err(SearchError::for_kind(kind, cause))
            });
        }

        merge(outcomes)
    }

    fn deadline_error(&self) -> SearchError {
        SearchError::Timeout(self.deadline.as_millis() as u64)
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Merge per-kind outcomes in video, channel, playlist order
fn merge(outcomes: BTreeMap<ContentKind, Result<Vec<SearchItem>>>) -> Result<SearchResponse> {
    let mut items = Vec::new();
    let mut succeeded = BTreeSet::new();
    let mut failed = BTreeMap::new();

    for (kind, outcome) in outcomes {
        match outcome {
            Ok(hits) => {
                items.extend(hits);
                succeeded.insert(kind);
            }
            Err(e) => {
                warn!("Search for {} failed: {}", kind, e);
                failed.insert(kind, e);
            }
        }
    }

    if succeeded.is_empty() {
        return Err(SearchError::AllKindsFailed(
            failed
                .iter()
                .map(|(kind, e)| (*kind, e.root_cause().to_string()))
                .collect(),
        ));
    }

    Ok(SearchResponse::new(items, succeeded, failed))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mcp::protocol::JsonRpcError;
    use crate::relay::catalog::ToolCatalog;
    use crate::relay::client::RpcClient;
    use crate::relay::test_support::{called_tool, hits, kind_of, listing, search_server, text_result, ScriptedTransport};

    const ALL_TOOLS: &[&str] = &[
        "search_youtube_videos",
        "search_youtube_channels",
        "search_youtube_playlists",
        "search_youtube_all",
    ];

    fn aggregator(transport: Arc<ScriptedTransport>, deadline: Duration) -> SearchAggregator {
        let client = Arc::new(RpcClient::new(transport, Duration::from_secs(10)));
        let catalog = Arc::new(ToolCatalog::new(Arc::clone(&client), 3));
        SearchAggregator::new(Arc::new(McpGateway::new(client, catalog)), deadline)
    }

    fn kinds_of(response: &SearchResponse) -> Vec<ContentKind> {
        response.items().iter().map(|item| item.kind).collect()
    }

    #[tokio::test]
    async fn test_all_kinds_succeed_in_stable_order() {
        // Videos answer last, yet still come first in the merged list
        let transport = search_server(ALL_TOOLS, 2).with_slow_tool("search_youtube_videos", Duration::from_millis(50));

        let response = aggregator(transport, Duration::from_secs(5))
            .search_all("rust", 2)
            .await
            .unwrap();

        assert!(response.kinds_failed().is_empty());
        assert!(!response.is_partial());
        assert_eq!(response.kinds_succeeded().len(), 3);
        assert_eq!(
            kinds_of(&response),
            vec![
                ContentKind::Video,
                ContentKind::Video,
                ContentKind::Channel,
                ContentKind::Channel,
                ContentKind::Playlist,
                ContentKind::Playlist,
            ]
        );
    }

    #[tokio::test]
    async fn test_one_kind_failing_is_partial() {
        let transport = ScriptedTransport::new(|request| match request.method.as_str() {
            "tools/list" => Ok(listing(ALL_TOOLS)),
            _ => match called_tool(request).and_then(kind_of) {
                Some(ContentKind::Channel) => Err(JsonRpcError::new(-32603, "channel backend down")),
                Some(kind) => Ok(text_result(hits(kind, 1))),
                None => Err(JsonRpcError::new(-32602, "bad tool")),
            },
        });

        let outcome = aggregator(transport, Duration::from_secs(5))
            .search(SearchQuery {
                q: "jazz".to_string(),
                kind: "all".to_string(),
                max_results: 3,
            })
            .await
            .unwrap();

        assert!(outcome.partial);
        assert_eq!(outcome.failed_kinds, vec![ContentKind::Channel]);
        let kinds: Vec<_> = outcome.items.iter().map(|item| item.kind).collect();
        assert_eq!(kinds, vec![ContentKind::Video, ContentKind::Playlist]);

        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["failedKinds"], serde_json::json!(["channel"]));
    }

    #[tokio::test]
    async fn test_all_kinds_failing_is_an_error() {
        let transport = ScriptedTransport::new(|request| match request.method.as_str() {
            "tools/list" => Ok(listing(ALL_TOOLS)),
            _ => Err(JsonRpcError::new(-32603, "quota exceeded")),
        });

        let err = aggregator(transport, Duration::from_secs(5))
            .search_all("q", 5)
            .await
            .unwrap_err();

        match err {
            SearchError::AllKindsFailed(failures) => {
                assert_eq!(failures.len(), 3);
                assert!(failures[&ContentKind::Video].contains("quota exceeded"));
            }
            other => panic!("expected AllKindsFailed, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_missing_channel_tool() {
        let transport = search_server(&["search_youtube_videos", "search_youtube_playlists"], 1);

        let response = aggregator(transport, Duration::from_secs(5))
            .search_all("q", 5)
            .await
            .unwrap();

        assert_eq!(
            response.kinds_succeeded(),
            &BTreeSet::from([ContentKind::Video, ContentKind::Playlist])
        );
        let failure = &response.kinds_failed()[&ContentKind::Channel];
        assert!(matches!(failure.root_cause(), SearchError::UnknownTool(ContentKind::Channel)));
    }

    #[tokio::test]
    async fn test_deadline_marks_pending_kinds_timed_out() {
        let transport = search_server(ALL_TOOLS, 1).with_slow_tool("search_youtube_channels", Duration::from_secs(5));

        let started = std::time::Instant::now();
        let response = aggregator(transport, Duration::from_millis(300))
            .search_all("q", 1)
            .await
            .unwrap();

        assert!(started.elapsed() < Duration::from_secs(2));
        assert_eq!(response.kinds_succeeded().len(), 2);
        assert!(response.kinds_failed()[&ContentKind::Channel].is_timeout());
        assert_eq!(kinds_of(&response), vec![ContentKind::Video, ContentKind::Playlist]);
    }

    #[tokio::test]
    async fn test_single_kind_query() {
        let transport = search_server(ALL_TOOLS, 8);
        let aggregator = aggregator(transport.clone(), Duration::from_secs(5));

        let request = SearchRequest::new("python tutorial", KindSelector::One(ContentKind::Video), 5).unwrap();
        let response = aggregator.query(&request).await.unwrap();

        assert_eq!(response.items().len(), 5);
        assert_eq!(transport.count("tools/call"), 1);

        let err = aggregator
            .search(SearchQuery {
                q: "   ".to_string(),
                kind: "all".to_string(),
                max_results: 5,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, SearchError::InvalidArgument(_)));
        assert_eq!(transport.count("tools/call"), 1);
    }

    #[tokio::test]
    async fn test_blank_query_sends_nothing() {
        let transport = search_server(ALL_TOOLS, 1);
        let aggregator = aggregator(transport.clone(), Duration::from_secs(5));

        let err = aggregator.search_all("", 0).await.unwrap_err();
        assert!(matches!(err, SearchError::InvalidArgument(_)), "{:?}", err);
        let err = aggregator.search_all(" \n ", 5).await.unwrap_err();
        assert!(matches!(err, SearchError::InvalidArgument(_)), "{:?}", err);

        assert_eq!(transport.count("tools/list"), 0);
        assert_eq!(transport.count("tools/call"), 0);
    }

    #[tokio::test]
    async fn test_zero_count_is_clamped_to_one() {
        let transport = search_server(ALL_TOOLS, 4);

        let response = aggregator(transport.clone(), Duration::from_secs(5))
            .search_all("q", 0)
            .await
            .unwrap();

        assert_eq!(response.items().len(), 3);
        let calls = transport.calls_to("search_youtube_videos");
        assert_eq!(calls[0].params.as_ref().unwrap()["arguments"]["max_results"], 1);
    }

    #[tokio::test]
    async fn test_panicking_kind_reports_its_reason() {
        let transport = ScriptedTransport::new(|request| match request.method.as_str() {
            "tools/list" => Ok(listing(ALL_TOOLS)),
            _ => match called_tool(request).and_then(kind_of) {
                Some(ContentKind::Channel) => panic!("channel handler exploded"),
                Some(kind) => Ok(text_result(hits(kind, 1))),
                None => Err(JsonRpcError::new(-32602, "bad tool")),
            },
        });

        let response = aggregator(transport, Duration::from_secs(5))
            .search_all("q", 1)
            .await
            .unwrap();

        assert!(response.is_partial());
        assert_eq!(kinds_of(&response), vec![ContentKind::Video, ContentKind::Playlist]);
        match &response.kinds_failed()[&ContentKind::Channel] {
            SearchError::Gateway { kind, cause } => {
                assert_eq!(*kind, ContentKind::Channel);
                assert!(
                    matches!(cause.as_ref(), SearchError::TaskFailed(reason) if reason.contains("channel handler exploded")),
                    "{:?}",
                    cause
                );
            }
            other => panic!("expected a per-kind failure, got {:?}", other),
        }
    }
}

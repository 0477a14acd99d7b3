use crate::types::ContentKind;
use std::collections::BTreeMap;
use thiserror::Error;

/// JSON-RPC error codes used on the `tools/call` path
pub const METHOD_NOT_FOUND: i32 = -32601;
pub const INVALID_PARAMS: i32 = -32602;
pub const INTERNAL_ERROR: i32 = -32603;

#[derive(Error, Debug)]
pub enum SearchError {
    #[error("Tool discovery failed: {0}")]
    Discovery(String),

    #[error("No tool advertised for content kind '{0}'")]
    UnknownTool(ContentKind),

    #[error("Malformed JSON-RPC envelope: {0}")]
    MalformedEnvelope(String),

    #[error("RPC error {code}: {message}")]
    Rpc { code: i32, message: String },

    #[error("Malformed search hit: {0}")]
    MalformedHit(String),

    #[error("Search for {kind} failed: {cause}")]
    Gateway {
        kind: ContentKind,
        #[source]
        cause: Box<SearchError>,
    },

    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    #[error("Upstream search provider error: {0}")]
    Upstream(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Request timeout after {0}ms")]
    Timeout(u64),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Search task failed: {0}")]
    TaskFailed(String),

    #[error("All content kinds failed: {}", describe_failures(.0))]
    AllKindsFailed(BTreeMap<ContentKind, String>),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SearchError {
    /// Wrap a per-kind failure, leaving already-wrapped errors alone.
    pub fn for_kind(kind: ContentKind, cause: SearchError) -> Self {
        match cause {
            SearchError::Gateway { .. } => cause,
            other => SearchError::Gateway {
                kind,
                cause: Box::new(other),
            },
        }
    }

    /// The innermost error beneath any `Gateway` wrapping
    pub fn root_cause(&self) -> &SearchError {
        match self {
            SearchError::Gateway { cause, .. } => cause.root_cause(),
            other => other,
        }
    }

    /// JSON-RPC error code the tool server answers with for this error
    pub fn rpc_code(&self) -> i32 {
        match self.root_cause() {
            SearchError::ToolNotFound(_) | SearchError::UnknownTool(_) => METHOD_NOT_FOUND,
            SearchError::InvalidArgument(_) => INVALID_PARAMS,
            SearchError::Rpc { code, .. } => *code,
            _ => INTERNAL_ERROR,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self.root_cause(), SearchError::Timeout(_))
    }
}

fn describe_failures(failures: &BTreeMap<ContentKind, String>) -> String {
    failures
        .iter()
        .map(|(kind, reason)| format!("{}: {}", kind, reason))
        .collect::<Vec<_>>()
        .join("; ")
}

pub type Result<T> = std::result::Result<T, SearchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_cause_unwraps_gateway() {
        let err = SearchError::for_kind(ContentKind::Channel, SearchError::Timeout(50));
        assert!(err.is_timeout());
        assert!(matches!(err.root_cause(), SearchError::Timeout(50)));

        // Wrapping twice keeps a single layer
        let rewrapped = SearchError::for_kind(ContentKind::Video, err);
        match rewrapped {
            SearchError::Gateway { kind, .. } => assert_eq!(kind, ContentKind::Channel),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_rpc_codes() {
        assert_eq!(
            SearchError::ToolNotFound("x".to_string()).rpc_code(),
            METHOD_NOT_FOUND
        );
        assert_eq!(
            SearchError::InvalidArgument("q".to_string()).rpc_code(),
            INVALID_PARAMS
        );
        assert_eq!(SearchError::Upstream("boom".to_string()).rpc_code(), INTERNAL_ERROR);
    }

    #[test]
    fn test_all_kinds_failed_message() {
        let mut failures = BTreeMap::new();
        failures.insert(ContentKind::Playlist, "timeout".to_string());
        failures.insert(ContentKind::Video, "down".to_string());
        let msg = SearchError::AllKindsFailed(failures).to_string();
        assert_eq!(msg, "All content kinds failed: video: down; playlist: timeout");
    }
}

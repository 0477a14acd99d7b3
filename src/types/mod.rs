//! Core types and error taxonomy

mod errors;
mod search;

pub use errors::{Result, SearchError, INTERNAL_ERROR, INVALID_PARAMS, METHOD_NOT_FOUND};
pub use search::{
    clamp_max_results, ContentKind, KindSelector, SearchItem, SearchOutcome, SearchQuery,
    SearchRequest, SearchResponse, MAX_RESULTS, MIN_RESULTS,
};

//! Result normalizer
//!
//! Each content kind has a [`FieldMap`] naming which provider keys fill
//! which [`SearchItem`] field. Keys not named in the table are dropped.

use crate::types::{ContentKind, Result, SearchError, SearchItem};
use chrono::{DateTime, NaiveDate, Utc};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Provider keys per `SearchItem` field, first match wins
#[derive(Debug)]
pub struct FieldMap {
    pub id: &'static [&'static str],
    pub title: &'static [&'static str],
    pub description: &'static [&'static str],
    pub thumbnail: &'static [&'static str],
    pub published: &'static [&'static str],
    /// `(provider key, extra key)`
    pub extra: &'static [(&'static str, &'static str)],
}

const DESCRIPTION: &[&str] = &["description"];
const THUMBNAIL: &[&str] = &["thumbnail", "thumbnail_url", "thumbnailUrl"];

pub static VIDEO_FIELDS: FieldMap = FieldMap {
    id: &["video_id", "videoId", "id"],
    title: &["title"],
    description: DESCRIPTION,
    thumbnail: THUMBNAIL,
    published: &["published", "published_at", "publishedAt"],
    extra: &[
        ("channel", "channelTitle"),
        ("channel_title", "channelTitle"),
        ("views", "viewCount"),
        ("likes", "likeCount"),
        ("url", "url"),
    ],
};

pub static CHANNEL_FIELDS: FieldMap = FieldMap {
    id: &["channel_id", "channelId", "id"],
    title: &["title"],
    description: DESCRIPTION,
    thumbnail: THUMBNAIL,
    published: &["created", "published", "publishedAt"],
    extra: &[
        ("subscribers", "subscriberCount"),
        ("videos", "videoCount"),
        ("total_views", "viewCount"),
        ("url", "url"),
    ],
};

pub static PLAYLIST_FIELDS: FieldMap = FieldMap {
    id: &["playlist_id", "playlistId", "id"],
    title: &["title"],
    description: DESCRIPTION,
    thumbnail: THUMBNAIL,
    published: &["created", "published", "publishedAt"],
    extra: &[
        ("channel", "channelTitle"),
        ("channel_title", "channelTitle"),
        ("video_count", "itemCount"),
        ("url", "url"),
    ],
};

pub fn field_map(kind: ContentKind) -> &'static FieldMap {
    match kind {
        ContentKind::Video => &VIDEO_FIELDS,
        ContentKind::Channel => &CHANNEL_FIELDS,
        ContentKind::Playlist => &PLAYLIST_FIELDS,
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ResultNormalizer;

impl ResultNormalizer {
    pub fn new() -> Self {
        Self
    }

    /// Convert one raw hit of `kind` into a [`SearchItem`]
    pub fn normalize(&self, kind: ContentKind, raw: &Value) -> Result<SearchItem> {
        let hit = raw
            .as_object()
            .ok_or_else(|| SearchError::MalformedHit(format!("expected an object, got {}", type_name(raw))))?;
        let fields = field_map(kind);

        let id = lookup(hit, fields.id)
            .and_then(id_string)
            .ok_or_else(|| SearchError::MalformedHit(format!("{} hit has no id", kind)))?;

        let title = lookup(hit, fields.title)
            .and_then(Value::as_str)
            .ok_or_else(|| SearchError::MalformedHit(format!("{} hit {} has no title", kind, id)))?
            .to_string();

        let text = |keys: &[&str]| {
            lookup(hit, keys)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string()
        };

        let published_at = lookup(hit, fields.published)
            .and_then(Value::as_str)
            .and_then(parse_timestamp);

        let mut extra = BTreeMap::new();
        for (source, target) in fields.extra {
            if extra.contains_key(*target) {
                continue;
            }
            if let Some(value) = hit.get(*source).filter(|v| is_scalar(v)) {
                extra.insert(target.to_string(), value.clone());
            }
        }

        Ok(SearchItem {
            kind,
            id,
            title,
            description: text(fields.description),
            thumbnail_url: text(fields.thumbnail),
            published_at,
            extra,
        })
    }
}

fn lookup<'a>(hit: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().find_map(|key| hit.get(*key).filter(|v| !v.is_null()))
}

fn id_string(value: &Value) -> Option<String> {
    let id = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    (!id.is_empty()).then_some(id)
}

fn is_scalar(value: &Value) -> bool {
    matches!(value, Value::String(_) | Value::Number(_) | Value::Bool(_))
}

/// RFC 3339 timestamps, or bare `YYYY-MM-DD` dates at midnight UTC
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

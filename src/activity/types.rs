//! Activity records as reported by the indexer and as kept in the timeline.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Slug of the native asset feed.
pub const NATIVE_SLUG: &str = "toncoin";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityKind {
    #[default]
    Transaction,
    Swap,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Incoming,
    Outgoing,
}

/// One event from one asset-scoped feed.
///
/// `id` is `<trace hash>:<suffix>`. The same on-chain event shows up in every
/// feed whose asset it touches, with the same id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawActivity {
    pub id: String,
    /// Unix milliseconds.
    pub timestamp: u64,
    #[serde(default)]
    pub kind: ActivityKind,
    #[serde(default)]
    pub fee: u128,
    pub direction: Direction,
    pub amount: u128,
    #[serde(default)]
    pub involved_addresses: Vec<String>,
    pub token_slug: String,
    #[serde(default)]
    pub should_hide: bool,
    #[serde(default)]
    pub comment: Option<String>,
    /// Created locally on submission and not yet seen on chain.
    #[serde(default)]
    pub is_local: bool,
}

impl RawActivity {
    /// Trace the record belongs to.
    pub fn trace_id(&self) -> &str {
        trace_id(&self.id)
    }

    /// Whether `other` could be the on-chain record of this placeholder.
    pub fn matches_pending(&self, other: &RawActivity) -> bool {
        self.direction == other.direction
            && self.amount == other.amount
            && self.token_slug == other.token_slug
    }
}

pub fn trace_id(id: &str) -> &str {
    id.split_once(':').map_or(id, |(hash, _)| hash)
}

/// Source of a raw record.
///
/// Ordered so that token feeds come first (by slug) and the native feed
/// last; the smallest key holding a copy supplies the descriptive fields.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "feed", content = "slug", rename_all = "lowercase")]
pub enum FeedKey {
    Token(String),
    Native,
}

impl FeedKey {
    pub fn for_slug(slug: Option<&str>) -> Self {
        match slug {
            None => FeedKey::Native,
            Some(slug) if slug == NATIVE_SLUG => FeedKey::Native,
            Some(slug) => FeedKey::Token(slug.to_string()),
        }
    }

    pub fn token_slug(&self) -> Option<&str> {
        match self {
            FeedKey::Token(slug) => Some(slug),
            FeedKey::Native => None,
        }
    }

    pub fn is_native(&self) -> bool {
        matches!(self, FeedKey::Native)
    }
}

impl fmt::Display for FeedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeedKey::Token(slug) => write!(f, "{slug}"),
            FeedKey::Native => write!(f, "{NATIVE_SLUG}"),
        }
    }
}

/// One timeline entry, unique per on-chain event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalActivity {
    #[serde(flatten)]
    pub activity: RawActivity,
    /// Feed whose copy supplied the descriptive fields.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<FeedKey>,
    /// First-arrival order, used to break timestamp ties.
    #[serde(skip)]
    pub seq: u64,
}

/// A local placeholder superseded by its confirmed record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Replacement {
    pub pending_id: String,
    pub confirmed_id: String,
}

/// What one merged batch changed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeReport {
    pub inserted: usize,
    pub updated: usize,
    pub dropped: usize,
    pub replaced: Vec<Replacement>,
    /// Placeholders given back because their confirmation stopped matching.
    pub restored: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feed_ordering_puts_native_last() {
        let mut keys = vec![
            FeedKey::Native,
            FeedKey::Token("usdt".into()),
            FeedKey::Token("dogs".into()),
        ];
        keys.sort();
        assert_eq!(
            keys,
            vec![
                FeedKey::Token("dogs".into()),
                FeedKey::Token("usdt".into()),
                FeedKey::Native
            ]
        );
        assert_eq!(FeedKey::for_slug(Some(NATIVE_SLUG)), FeedKey::Native);
    }

    #[test]
    fn test_trace_id() {
        assert_eq!(trace_id("abc:1"), "abc");
        assert_eq!(trace_id("abc:1:swap"), "abc");
        assert_eq!(trace_id("abc"), "abc");
    }

    #[test]
    fn test_decode_indexer_item() {
        let raw: RawActivity = serde_json::from_str(
            r#"{"id":"h:1","timestamp":5,"fee":100,"direction":"outgoing","amount":7,
                "tokenSlug":"toncoin","shouldHide":true}"#,
        )
        .unwrap();
        assert_eq!(raw.kind, ActivityKind::Transaction);
        assert!(raw.should_hide);
        assert!(!raw.is_local);
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Number of leading content characters that participate in an item id.
///
/// Truncation bounds hashing cost. Two distinct nodes whose first 1024
/// characters coincide on the same page will collide; documented
/// limitation, not a correctness bug for practical content.
pub const ID_PREFIX_CHARS: usize = 1024;

/// Maximum characters kept in an item summary.
pub const SUMMARY_MAX_CHARS: usize = 320;

/// Marker appended to clamped text.
pub const TRUNCATION_MARKER: char = '…';

/// Links attached to an extracted item.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ItemLinks {
    pub html: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pdf: Option<String>,
}

/// One extracted content unit derived from a source page.
///
/// Immutable once produced and never persisted; discarded after the
/// response that used it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    /// Content address: SHA-256 over (first [`ID_PREFIX_CHARS`] characters
    /// of content, source URL).
    pub id: String,
    pub url: String,
    pub title: String,
    pub summary: String,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    pub links: ItemLinks,
    /// Raw node HTML, present only when the caller asked for it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw: Option<String>,
}

/// Metadata about one fetch; produced once per fetch, read-only thereafter.
#[derive(Debug, Clone, Serialize)]
pub struct SourceInfo {
    pub fetched_url: String,
    /// Post-redirect URL the body was actually read from.
    pub final_url: String,
    pub fetched_at: DateTime<Utc>,
    pub status: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<String>,
}

/// A fetched page: raw HTML plus its fetch metadata.
#[derive(Debug, Clone)]
pub struct FetchedPage {
    pub html: String,
    pub source_info: SourceInfo,
}

/// Extraction output for one page.
#[derive(Debug, Clone)]
pub struct ParsedPage {
    pub items: Vec<Item>,
    pub source_info: SourceInfo,
}

/// Dates attached to a match.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MatchDates {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub publication_date: Option<String>,
}

/// One AI-scored relevance finding derived from items for a user query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Match {
    pub document_type: String,
    pub title: String,
    pub notification_title: String,
    pub issuing_body: String,
    pub summary: String,
    /// Clamped to [0, 100].
    pub relevance_score: f64,
    /// Mirrors `relevance_score` after normalization.
    pub accuracy_score: f64,
    pub links: serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_item_id: Option<String>,
    pub metadata: serde_json::Value,
    pub dates: MatchDates,
}

/// Canonical analysis result for one (item-set, prompt) pair.
#[derive(Debug, Clone, Serialize)]
pub struct Analysis {
    pub matches: Vec<Match>,
    pub metadata: serde_json::Value,
}

/// Compute an item's content address.
///
/// Hashes the first [`ID_PREFIX_CHARS`] characters of `content` followed by
/// `url`, returned as 64-char lowercase hex. Stable under identical input;
/// changes whenever the content prefix or the URL changes.
pub fn item_id(content: &str, url: &str) -> String {
    let prefix_end = content
        .char_indices()
        .nth(ID_PREFIX_CHARS)
        .map(|(i, _)| i)
        .unwrap_or(content.len());
    let mut hasher = Sha256::new();
    hasher.update(content[..prefix_end].as_bytes());
    hasher.update(url.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Clamp text to `max_chars` characters, appending a truncation marker when
/// anything was cut.
pub fn clamp_text(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut clamped: String = text.chars().take(max_chars.saturating_sub(1)).collect();
    clamped.push(TRUNCATION_MARKER);
    clamped
}

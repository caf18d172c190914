//! Canonical match normalization.
//!
//! Reconciles heterogeneous AI-provider payloads into one result shape.
//! Applied uniformly after parsing, whatever the provider.

use serde_json::Value;

use crate::models::{Match, MatchDates};

/// Parse and normalize a score value.
///
/// Accepts numbers or numeric strings; anything else is 0. A value in
/// [0, 1] is assumed to be on a 0-1 scale and multiplied by 100, an
/// approximation that misreads providers legitimately emitting scores <= 1
/// on a 0-100 scale. The result is clamped to [0, 100].
pub fn parse_score(value: Option<&Value>) -> f64 {
    let raw = match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    let Some(score) = raw.filter(|s| s.is_finite()) else {
        return 0.0;
    };
    let scaled = if (0.0..=1.0).contains(&score) {
        score * 100.0
    } else {
        score
    };
    scaled.clamp(0.0, 100.0)
}

/// Normalize raw provider matches into canonical [`Match`]es, sorted by
/// score descending. The sort is stable: equal scores keep their original
/// order. No score-threshold filtering happens here; any threshold is a
/// prompt-level instruction to the model, not an enforced guarantee.
pub fn normalize_matches(raw_matches: &[Value]) -> Vec<Match> {
    let mut matches: Vec<Match> = raw_matches.iter().map(normalize_match).collect();
    matches.sort_by(|a, b| {
        b.relevance_score
            .partial_cmp(&a.relevance_score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    matches
}

/// Pull the `matches` array out of a parsed provider payload. A payload
/// without one (or with a non-array value) yields an empty list.
pub fn payload_matches(payload: &Value) -> Vec<Value> {
    payload
        .get("matches")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default()
}

fn normalize_match(raw: &Value) -> Match {
    let score = parse_score(raw.get("relevance_score").or_else(|| raw.get("accuracy_score")));

    let title = text_field(raw, "title")
        .or_else(|| text_field(raw, "notification_title"))
        .unwrap_or_else(|| "untitled".to_string());
    let notification_title = text_field(raw, "notification_title").unwrap_or_else(|| title.clone());
    let summary = text_field(raw, "summary")
        .or_else(|| text_field(raw, "content"))
        .unwrap_or_default();
    let document_type = text_field(raw, "document_type")
        .or_else(|| text_field(raw, "category"))
        .unwrap_or_else(|| "generic".to_string());
    let issuing_body = text_field(raw, "issuing_body")
        .or_else(|| text_field(raw, "author"))
        .unwrap_or_default();

    let links = match raw.get("links") {
        Some(value @ Value::Object(_)) => value.clone(),
        _ => Value::Object(serde_json::Map::new()),
    };
    let metadata = match raw.get("metadata") {
        Some(value @ Value::Object(_)) => value.clone(),
        _ => Value::Object(serde_json::Map::new()),
    };
    let source_item_id = text_field(raw, "source_item_id").or_else(|| text_field(raw, "id"));

    let dates = match raw.get("dates") {
        Some(Value::Object(map)) => MatchDates {
            publication_date: map
                .get("publication_date")
                .and_then(Value::as_str)
                .map(str::to_string),
        },
        _ => MatchDates {
            publication_date: text_field(raw, "date"),
        },
    };

    Match {
        document_type,
        title,
        notification_title,
        issuing_body,
        summary,
        relevance_score: score,
        accuracy_score: score,
        links,
        source_item_id,
        metadata,
        dates,
    }
}

/// A trimmed, non-empty string field.
fn text_field(raw: &Value, key: &str) -> Option<String> {
    raw.get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn ambiguous_scale_is_rescaled() {
        assert_eq!(parse_score(Some(&json!(0.85))), 85.0);
        assert_eq!(parse_score(Some(&json!(1.0))), 100.0);
        assert_eq!(parse_score(Some(&json!(0))), 0.0);
    }

    #[test]
    fn out_of_range_scores_clamp() {
        assert_eq!(parse_score(Some(&json!(120))), 100.0);
        assert_eq!(parse_score(Some(&json!(-5))), 0.0);
    }

    #[test]
    fn string_scores_parse() {
        assert_eq!(parse_score(Some(&json!("72.5"))), 72.5);
        assert_eq!(parse_score(Some(&json!(" 0.4 "))), 40.0);
    }

    #[test]
    fn unparsable_scores_default_to_zero() {
        assert_eq!(parse_score(Some(&json!("high"))), 0.0);
        assert_eq!(parse_score(Some(&json!(null))), 0.0);
        assert_eq!(parse_score(None), 0.0);
        assert_eq!(parse_score(Some(&json!(["80"]))), 0.0);
    }

    #[test]
    fn matches_sort_descending_and_stable() {
        let raw = vec![
            json!({"title": "low", "relevance_score": 20}),
            json!({"title": "tie-a", "relevance_score": 70}),
            json!({"title": "high", "relevance_score": 90}),
            json!({"title": "tie-b", "relevance_score": 70}),
        ];
        let matches = normalize_matches(&raw);
        let titles: Vec<&str> = matches.iter().map(|m| m.title.as_str()).collect();
        assert_eq!(titles, vec!["high", "tie-a", "tie-b", "low"]);
    }

    #[test]
    fn score_mirrors_into_accuracy() {
        let matches = normalize_matches(&[json!({"title": "t", "relevance_score": 0.6})]);
        assert_eq!(matches[0].relevance_score, 60.0);
        assert_eq!(matches[0].accuracy_score, 60.0);
    }

    #[test]
    fn accuracy_score_is_the_fallback_source() {
        let matches = normalize_matches(&[json!({"title": "t", "accuracy_score": 45})]);
        assert_eq!(matches[0].relevance_score, 45.0);
    }

    #[test]
    fn fallback_chains_fill_missing_fields() {
        let matches = normalize_matches(&[json!({
            "notification_title": "From Notification",
            "content": "body text",
            "category": "bulletin",
            "author": "Agency",
            "id": "abc123",
            "date": "2026-01-15"
        })]);
        let m = &matches[0];
        assert_eq!(m.title, "From Notification");
        assert_eq!(m.notification_title, "From Notification");
        assert_eq!(m.summary, "body text");
        assert_eq!(m.document_type, "bulletin");
        assert_eq!(m.issuing_body, "Agency");
        assert_eq!(m.source_item_id.as_deref(), Some("abc123"));
        assert_eq!(m.dates.publication_date.as_deref(), Some("2026-01-15"));
        assert_eq!(m.relevance_score, 0.0);
    }

    #[test]
    fn empty_match_gets_defaults() {
        let matches = normalize_matches(&[json!({})]);
        let m = &matches[0];
        assert_eq!(m.title, "untitled");
        assert_eq!(m.document_type, "generic");
        assert_eq!(m.summary, "");
        assert_eq!(m.links, json!({}));
        assert!(m.source_item_id.is_none());
        assert!(m.dates.publication_date.is_none());
    }

    #[test]
    fn non_object_links_become_empty_object() {
        let matches = normalize_matches(&[json!({"title": "t", "links": "https://x"})]);
        assert_eq!(matches[0].links, json!({}));

        let matches = normalize_matches(&[json!({"title": "t", "links": {"html": "https://x"}})]);
        assert_eq!(matches[0].links, json!({"html": "https://x"}));
    }

    #[test]
    fn payload_matches_tolerates_missing_or_wrong_shape() {
        assert!(payload_matches(&json!({})).is_empty());
        assert!(payload_matches(&json!({"matches": "nope"})).is_empty());
        assert_eq!(payload_matches(&json!({"matches": [{"a": 1}]})).len(), 1);
    }
}

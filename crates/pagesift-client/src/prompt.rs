//! Prompt construction shared by the provider adapters.

use serde_json::{Value, json};

use pagesift_core::models::{Item, clamp_text};

/// System instruction embedding the literal user query and the expected
/// response shape.
pub fn system_prompt(user_query: &str) -> String {
    format!(
        r#"You are an analyst that reads arbitrary web content on behalf of a subscriber.
Your goal is to find the snippets most relevant to the user query below.

User query: "{user_query}"

Guidelines:
1. Analyse the supplied documents carefully.
2. Score potential matches from 0 to 100 based on how well they answer the user query.
3. Only return matches with a relevance score >= 60.
4. Each match must include: document_type (best-effort), title, notification_title, summary (<= 280 chars), relevance_score (0-100), accuracy_score (0-100), links.html, source_item_id, and optional metadata (issuing_body, section, date).
5. If nothing is relevant, return "matches": [].
6. Respond with valid JSON only, no commentary."#
    )
}

/// User-turn content: the projected items plus the query restated.
pub fn content_prompt(projected: &[Value], user_query: &str, total_items: usize) -> String {
    let rendered =
        serde_json::to_string_pretty(projected).unwrap_or_else(|_| "[]".to_string());
    format!(
        "Documents provided ({} of {} total):\n{}\n\nFor each entry, evaluate relevance for query \"{}\" and follow the response schema strictly.",
        projected.len(),
        total_items,
        rendered,
        user_query
    )
}

/// Project items for serialization into a prompt: at most `max_items`
/// entries, a fixed field subset, and content truncated to `max_chars`.
pub fn project_items(items: &[Item], max_items: usize, max_chars: usize) -> Vec<Value> {
    items
        .iter()
        .take(max_items)
        .map(|item| {
            json!({
                "id": item.id,
                "title": item.title,
                "summary": item.summary,
                "content": clamp_text(&item.content, max_chars),
                "url": item.links.html,
                "date": item.date,
                "section": item.section,
                "category": item.category,
            })
        })
        .collect()
}

/// JSON Schema for structured provider output, where supported.
pub fn response_schema() -> Value {
    json!({
        "type": "object",
        "additionalProperties": false,
        "required": ["matches"],
        "properties": {
            "matches": {
                "type": "array",
                "items": {
                    "type": "object",
                    "required": ["title", "summary", "relevance_score"],
                    "properties": {
                        "document_type": {"type": "string"},
                        "title": {"type": "string"},
                        "notification_title": {"type": "string"},
                        "issuing_body": {"type": "string"},
                        "summary": {"type": "string"},
                        "relevance_score": {"type": ["number", "string"]},
                        "accuracy_score": {"type": ["number", "string"]},
                        "source_item_id": {"type": "string"},
                        "links": {
                            "type": "object",
                            "properties": {
                                "html": {"type": "string"},
                                "pdf": {"type": "string"}
                            }
                        },
                        "metadata": {"type": "object"},
                        "dates": {
                            "type": "object",
                            "properties": {
                                "publication_date": {"type": "string"}
                            }
                        }
                    }
                }
            }
        }
    })
}

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use pagesift_core::config::AiConfig;
use pagesift_core::error::AppError;
use pagesift_core::models::{Analysis, Item};
use pagesift_core::normalize::{normalize_matches, payload_matches};
use pagesift_core::traits::ItemAnalyzer;

use crate::prompt::{content_prompt, project_items, system_prompt};

const PROVIDER: &str = "gemini";
const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// Gemini analyzer using the REST `generateContent` endpoint with a JSON
/// response mime type.
#[derive(Clone, Debug)]
pub struct GeminiAnalyzer {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
    temperature: f32,
    max_output_tokens: u32,
    max_items_per_prompt: usize,
    max_characters_per_item: usize,
}

impl GeminiAnalyzer {
    pub fn new(config: &AiConfig) -> Result<Self, AppError> {
        if config.api_key.is_empty() {
            return Err(AppError::Config("Gemini API key not configured".into()));
        }
        let client = Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(|e| AppError::service(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config
                .base_url
                .clone()
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            temperature: config.temperature,
            max_output_tokens: config.max_output_tokens,
            max_items_per_prompt: config.max_items_per_prompt,
            max_characters_per_item: config.max_characters_per_item,
        })
    }
}

// ---- Gemini API types ----

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content {
    role: String,
    parts: Vec<Part>,
}

#[derive(Serialize, Deserialize)]
struct Part {
    text: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
    top_k: u32,
    top_p: f32,
    response_mime_type: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    usage_metadata: Option<Value>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Part>,
}

impl ItemAnalyzer for GeminiAnalyzer {
    async fn analyze(&self, items: &[Item], prompt: &str) -> Result<Analysis, AppError> {
        let projected = project_items(items, self.max_items_per_prompt, self.max_characters_per_item);
        tracing::debug!(
            item_count = projected.len(),
            model = %self.model,
            "invoking Gemini analysis"
        );

        let request = GenerateRequest {
            contents: vec![Content {
                role: "user".to_string(),
                parts: vec![
                    Part {
                        text: system_prompt(prompt),
                    },
                    Part {
                        text: content_prompt(&projected, prompt, items.len()),
                    },
                ],
            }],
            generation_config: GenerationConfig {
                temperature: self.temperature,
                max_output_tokens: self.max_output_tokens,
                top_k: 1,
                top_p: 1.0,
                response_mime_type: "application/json".to_string(),
            },
        };

        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url, self.model, self.api_key
        );
        let response = self.client.post(&url).json(&request).send().await.map_err(|e| {
            if e.is_timeout() {
                AppError::Timeout(DEFAULT_TIMEOUT.as_millis() as u64)
            } else if e.is_connect() {
                AppError::Network(format!("connection failed: {e}"))
            } else {
                AppError::Network(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let status_code = status.as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(provider_error(status_code, &body));
        }

        let generated: GenerateResponse = response
            .json()
            .await
            .map_err(|e| AppError::external_api(PROVIDER, format!("malformed response envelope: {e}")))?;

        let text = generated
            .candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|c| c.parts.iter().map(|p| p.text.as_str()).collect::<String>())
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .ok_or_else(|| {
                let reason = generated
                    .candidates
                    .first()
                    .and_then(|c| c.finish_reason.clone())
                    .unwrap_or_else(|| "no candidates".to_string());
                AppError::external_api(PROVIDER, format!("empty response payload ({reason})"))
            })?;

        // Unparseable payloads are hard failures, uniformly across providers.
        let payload = parse_payload(&text)?;

        let matches = normalize_matches(&payload_matches(&payload));
        Ok(Analysis {
            matches,
            metadata: serde_json::json!({
                "provider": PROVIDER,
                "model_used": self.model,
                "token_usage": generated.usage_metadata.unwrap_or(Value::Null),
            }),
        })
    }
}

/// Parse the model's reply as JSON. Replies occasionally wrap the JSON in
/// prose or code fences, so parsing falls back to the outermost brace block.
fn parse_payload(text: &str) -> Result<Value, AppError> {
    if let Ok(value) = serde_json::from_str::<Value>(text) {
        return Ok(value);
    }
    json_block(text)
        .and_then(|block| serde_json::from_str::<Value>(block).ok())
        .ok_or_else(|| {
            AppError::external_api(
                PROVIDER,
                format!(
                    "unparseable response payload. Raw: {}",
                    text.chars().take(300).collect::<String>()
                ),
            )
        })
}

/// The substring from the first `{` to the last `}`, when both exist.
fn json_block(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

fn provider_error(status_code: u16, body: &str) -> AppError {
    let detail: String = body.chars().take(300).collect();
    let message = match status_code {
        401 | 403 => format!("permission denied (HTTP {status_code}): {detail}"),
        413 => format!("payload too large (HTTP {status_code}): {detail}"),
        _ => format!("HTTP {status_code}: {detail}"),
    };
    AppError::external_api(PROVIDER, message)
}

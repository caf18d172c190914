use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use pagesift_core::config::AiConfig;
use pagesift_core::error::AppError;
use pagesift_core::models::{Analysis, Item};
use pagesift_core::normalize::{normalize_matches, payload_matches};
use pagesift_core::traits::ItemAnalyzer;

use crate::prompt::{content_prompt, project_items, response_schema, system_prompt};

const PROVIDER: &str = "openai";
const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// OpenAI-compatible analyzer using chat completions with a `json_schema`
/// response format.
///
/// Works with any OpenAI-compatible API, including Gemini's compatibility
/// layer, by overriding `base_url`.
#[derive(Clone, Debug)]
pub struct OpenAiAnalyzer {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
    temperature: f32,
    max_output_tokens: u32,
    max_items_per_prompt: usize,
    max_characters_per_item: usize,
}

impl OpenAiAnalyzer {
    pub fn new(config: &AiConfig) -> Result<Self, AppError> {
        if config.api_key.is_empty() {
            return Err(AppError::Config("OpenAI API key not configured".into()));
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

// ---- OpenAI API types ----

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<Message>,
    temperature: f32,
    max_tokens: u32,
    response_format: ResponseFormat,
}

#[derive(Serialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: String,
    json_schema: JsonSchemaWrapper,
}

#[derive(Serialize)]
struct JsonSchemaWrapper {
    name: String,
    strict: bool,
    schema: Value,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<Value>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct ApiError {
    error: ApiErrorDetail,
}

#[derive(Deserialize)]
struct ApiErrorDetail {
    message: String,
}

impl ItemAnalyzer for OpenAiAnalyzer {
    async fn analyze(&self, items: &[Item], prompt: &str) -> Result<Analysis, AppError> {
        let projected = project_items(items, self.max_items_per_prompt, self.max_characters_per_item);
        tracing::debug!(
            item_count = projected.len(),
            model = %self.model,
            "invoking OpenAI analysis"
        );

        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![
                Message {
                    role: "system".to_string(),
                    content: system_prompt(prompt),
                },
                Message {
                    role: "user".to_string(),
                    content: content_prompt(&projected, prompt, items.len()),
                },
            ],
            temperature: self.temperature,
            max_tokens: self.max_output_tokens,
            response_format: ResponseFormat {
                format_type: "json_schema".to_string(),
                json_schema: JsonSchemaWrapper {
                    name: "page_matches".to_string(),
                    strict: false,
                    schema: response_schema(),
                },
            },
        };

        let url = format!("{}/chat/completions", self.base_url);
        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .await
            .map_err(|e| {
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
            let message = serde_json::from_str::<ApiError>(&body)
                .map(|e| e.error.message)
                .unwrap_or_else(|_| body);
            return Err(provider_error(status_code, &message));
        }

        let chat: ChatResponse = response
            .json()
            .await
            .map_err(|e| AppError::external_api(PROVIDER, format!("malformed response envelope: {e}")))?;

        let content = chat
            .choices
            .first()
            .and_then(|c| c.message.content.as_deref())
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .ok_or_else(|| AppError::external_api(PROVIDER, "empty response payload"))?;

        // Unparseable payloads are hard failures, uniformly across providers.
        let payload: Value = serde_json::from_str(content).map_err(|e| {
            AppError::external_api(
                PROVIDER,
                format!("unparseable response payload: {e}. Raw: {}", truncate(content, 300)),
            )
        })?;

        let matches = normalize_matches(&payload_matches(&payload));
        Ok(Analysis {
            matches,
            metadata: serde_json::json!({
                "provider": PROVIDER,
                "model_used": self.model,
                "token_usage": chat.usage.unwrap_or(Value::Null),
            }),
        })
    }
}

fn provider_error(status_code: u16, message: &str) -> AppError {
    let message = match status_code {
        401 | 403 => format!("permission denied (HTTP {status_code}): {message}"),
        413 => format!("payload too large (HTTP {status_code}): {message}"),
        _ => format!("HTTP {status_code}: {message}"),
    };
    AppError::external_api(PROVIDER, message)
}

fn truncate(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

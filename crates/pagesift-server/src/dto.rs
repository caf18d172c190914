use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use pagesift_core::extract::{ExtractSpec, FieldSpec};
use pagesift_core::service::SourceSpec;

// ---------------------------------------------------------------------------
// Analyze request
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct AnalyzeRequest {
    /// User prompts, one analysis per entry. Order is preserved in the
    /// response.
    pub texts: Vec<String>,
    pub source: SourceDto,
    #[serde(default)]
    pub metadata: Option<RequestMetadata>,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct SourceDto {
    pub url: String,
    #[serde(default)]
    pub selector: Option<String>,
    #[serde(default)]
    pub extract: Option<ExtractDto>,
    #[serde(default)]
    pub headers: HashMap<String, String>,
}

#[derive(Debug, Default, Deserialize, utoipa::ToSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct ExtractDto {
    pub selector: Option<String>,
    pub fields: Vec<FieldDto>,
    pub max_items: Option<i64>,
    pub include_raw_html: bool,
}

#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct FieldDto {
    pub name: String,
    #[serde(default)]
    pub selector: Option<String>,
    #[serde(default)]
    pub attr: Option<String>,
    #[serde(default)]
    pub fallback: Option<String>,
}

#[derive(Debug, Default, Deserialize, utoipa::ToSchema)]
pub struct RequestMetadata {
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub subscription_id: Option<String>,
    #[serde(default)]
    pub template_id: Option<String>,
}

impl From<SourceDto> for SourceSpec {
    fn from(dto: SourceDto) -> Self {
        SourceSpec {
            url: dto.url,
            selector: dto.selector,
            extract: dto.extract.map(ExtractSpec::from).unwrap_or_default(),
            headers: dto.headers,
        }
    }
}

impl From<ExtractDto> for ExtractSpec {
    fn from(dto: ExtractDto) -> Self {
        ExtractSpec {
            selector: dto.selector,
            fields: dto.fields.into_iter().map(FieldSpec::from).collect(),
            max_items: dto.max_items,
            include_raw_html: dto.include_raw_html,
        }
    }
}

impl From<FieldDto> for FieldSpec {
    fn from(dto: FieldDto) -> Self {
        FieldSpec {
            name: dto.name,
            selector: dto.selector,
            attr: dto.attr,
            fallback: dto.fallback,
        }
    }
}

// ---------------------------------------------------------------------------
// Analyze response
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct AnalyzeResponse {
    pub trace_id: Uuid,
    pub request: RequestEcho,
    pub results: AnalysisResults,
    pub metadata: ResponseMetadata,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct RequestEcho {
    pub texts: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subscription_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template_id: Option<String>,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct AnalysisResults {
    /// Date the analysis ran, `YYYY-MM-DD`.
    pub query_date: String,
    /// One entry per input prompt, in input order.
    pub results: Vec<PromptResult>,
    #[schema(value_type = Object)]
    pub source_info: serde_json::Value,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct PromptResult {
    pub prompt: String,
    /// Normalized matches, sorted by relevance score descending.
    #[schema(value_type = Vec<Object>)]
    pub matches: Vec<serde_json::Value>,
    #[schema(value_type = Object)]
    pub metadata: serde_json::Value,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ResponseMetadata {
    /// `success`, or `partial` when at least one prompt analysis failed.
    pub status: String,
    pub processing_time_ms: u64,
    pub total_items_processed: usize,
}

// ---------------------------------------------------------------------------
// System
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct HealthResponse {
    pub status: &'static str,
}

#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

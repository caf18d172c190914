use std::sync::Arc;
use std::time::Instant;

use axum::Router;
use axum::extract::State;
use axum::middleware;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use chrono::Utc;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;
use uuid::Uuid;

use pagesift_core::error::AppError;
use pagesift_core::service::SourceSpec;
use pagesift_core::traits::{ItemAnalyzer, PageFetcher, ResultPublisher};

use crate::auth::require_api_key;
use crate::dto::{
    AnalysisResults, AnalyzeRequest, AnalyzeResponse, HealthResponse, PromptResult, RequestEcho,
    ResponseMetadata,
};
use crate::error::ApiError;
use crate::openapi::ApiDoc;
use crate::state::AppState;

/// Build the full router with all routes and middleware.
pub fn router<F, A, P>(state: Arc<AppState<F, A, P>>) -> Router
where
    F: PageFetcher + 'static,
    A: ItemAnalyzer + 'static,
    P: ResultPublisher + 'static,
{
    let api = Router::new()
        .route("/v1/analyze", post(analyze::<F, A, P>))
        .layer(middleware::from_fn_with_state(
            state.api_key.clone(),
            require_api_key,
        ));

    let public = Router::new()
        .route("/health", get(health))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));

    public.merge(api).with_state(state)
}

// ---------------------------------------------------------------------------
// Analyze
// ---------------------------------------------------------------------------

#[utoipa::path(
    post,
    path = "/v1/analyze",
    request_body = AnalyzeRequest,
    responses(
        (status = 200, description = "Analysis results, one entry per prompt", body = AnalyzeResponse),
        (status = 400, description = "Invalid request or disallowed URL", body = crate::dto::ErrorResponse),
        (status = 401, description = "Unauthorized"),
        (status = 502, description = "Upstream fetch or AI provider failure", body = crate::dto::ErrorResponse),
    ),
    security(("bearer" = [])),
    tag = "analyze"
)]
pub async fn analyze<F, A, P>(
    State(state): State<Arc<AppState<F, A, P>>>,
    axum::Json(body): axum::Json<AnalyzeRequest>,
) -> Result<impl IntoResponse, ApiError>
where
    F: PageFetcher,
    A: ItemAnalyzer,
    P: ResultPublisher + 'static,
{
    let started = Instant::now();
    let trace_id = Uuid::new_v4();
    validate_request(&body)?;

    tracing::info!(
        %trace_id,
        prompts = body.texts.len(),
        url = %body.source.url,
        "starting analysis"
    );

    let texts = body.texts;
    let metadata = body.metadata.unwrap_or_default();
    let source = SourceSpec::from(body.source);

    // Guard and fetch run once, before any AI cost is incurred.
    let parsed = state.service.parse_page(&source).await?;
    let outcomes = state.service.analyze_all(&parsed.items, &texts).await;

    let mut failed = 0usize;
    let mut results = Vec::with_capacity(outcomes.len());
    for (prompt, outcome) in texts.iter().zip(outcomes) {
        match outcome {
            Ok(analysis) => {
                let matches = analysis
                    .matches
                    .iter()
                    .map(serde_json::to_value)
                    .collect::<Result<Vec<_>, _>>()
                    .map_err(AppError::from)?;
                results.push(PromptResult {
                    prompt: prompt.clone(),
                    matches,
                    metadata: analysis.metadata,
                });
            }
            Err(err) => {
                failed += 1;
                tracing::warn!(%trace_id, prompt = %prompt, error = %err, "prompt analysis failed");
                results.push(PromptResult {
                    prompt: prompt.clone(),
                    matches: Vec::new(),
                    metadata: serde_json::json!({ "error": err.to_string() }),
                });
            }
        }
    }

    let response = AnalyzeResponse {
        trace_id,
        request: RequestEcho {
            texts,
            user_id: metadata.user_id,
            subscription_id: metadata.subscription_id,
            template_id: metadata.template_id,
        },
        results: AnalysisResults {
            query_date: Utc::now().format("%Y-%m-%d").to_string(),
            results,
            source_info: serde_json::to_value(&parsed.source_info).map_err(AppError::from)?,
        },
        metadata: ResponseMetadata {
            status: if failed == 0 { "success" } else { "partial" }.to_string(),
            processing_time_ms: started.elapsed().as_millis() as u64,
            total_items_processed: parsed.items.len(),
        },
    };

    // Publish best-effort; the HTTP reply never waits on it or fails with it.
    match serde_json::to_value(&response) {
        Ok(payload) => {
            let publisher = state.publisher.clone();
            tokio::spawn(async move {
                if let Err(err) = publisher.publish(&payload).await {
                    tracing::error!(error = %err, "failed to publish analysis result");
                }
            });
        }
        Err(err) => tracing::error!(error = %err, "failed to serialize result for publishing"),
    }

    Ok(axum::Json(response))
}

/// Request-shape validation, ahead of the guard's own URL re-validation.
fn validate_request(request: &AnalyzeRequest) -> Result<(), AppError> {
    if request.texts.is_empty() {
        return Err(AppError::Validation("texts must be a non-empty array".into()));
    }
    if request.texts.iter().any(|t| t.trim().is_empty()) {
        return Err(AppError::Validation(
            "texts entries must be non-empty strings".into(),
        ));
    }
    if request.source.url.trim().is_empty() {
        return Err(AppError::Validation("source.url is required".into()));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Health
// ---------------------------------------------------------------------------

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse),
    ),
    tag = "system"
)]
pub async fn health() -> impl IntoResponse {
    axum::Json(HealthResponse { status: "healthy" })
}

use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "pagesift API",
        version = "0.1.0",
        description = "Turns arbitrary web pages into AI-scored findings for natural-language queries, with no cross-request cache."
    ),
    paths(crate::routes::analyze, crate::routes::health),
    components(schemas(
        crate::dto::AnalyzeRequest,
        crate::dto::SourceDto,
        crate::dto::ExtractDto,
        crate::dto::FieldDto,
        crate::dto::RequestMetadata,
        crate::dto::AnalyzeResponse,
        crate::dto::RequestEcho,
        crate::dto::AnalysisResults,
        crate::dto::PromptResult,
        crate::dto::ResponseMetadata,
        crate::dto::HealthResponse,
        crate::dto::ErrorResponse,
    )),
    tags(
        (name = "analyze", description = "Page analysis"),
        (name = "system", description = "Health and system status"),
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

/// Adds Bearer token security scheme to the OpenAPI spec.
struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                utoipa::openapi::security::SecurityScheme::Http(
                    utoipa::openapi::security::HttpBuilder::new()
                        .scheme(utoipa::openapi::security::HttpAuthScheme::Bearer)
                        .bearer_format("token")
                        .description(Some(
                            "API key. Set via PAGESIFT_API_KEY environment variable.",
                        ))
                        .build(),
                ),
            );
        }
    }
}

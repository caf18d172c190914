use std::collections::HashMap;

use serde::Deserialize;

use crate::config::{ExtractConfig, SecurityConfig};
use crate::error::AppError;
use crate::extract::{ExtractSpec, ExtractionEngine};
use crate::guard;
use crate::models::{Analysis, Item, ParsedPage};
use crate::traits::{ItemAnalyzer, PageFetcher};

/// Per-request source description: where to fetch and how to extract.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SourceSpec {
    pub url: String,
    /// Request-level selector; takes precedence over `extract.selector`.
    pub selector: Option<String>,
    pub extract: ExtractSpec,
    pub headers: HashMap<String, String>,
}

/// Orchestrates the analysis pipeline: guard, fetch, extract, then
/// per-prompt analyze.
///
/// Generic over the fetcher and analyzer via traits, enabling dependency
/// injection and testability without real HTTP or model calls. Holds no
/// cross-request state; items and analyses live only for one request.
pub struct AnalysisService<F, A>
where
    F: PageFetcher,
    A: ItemAnalyzer,
{
    fetcher: F,
    analyzer: A,
    security: SecurityConfig,
    engine: ExtractionEngine,
}

impl<F, A> AnalysisService<F, A>
where
    F: PageFetcher,
    A: ItemAnalyzer,
{
    pub fn new(fetcher: F, analyzer: A, security: SecurityConfig, extract: ExtractConfig) -> Self {
        Self {
            fetcher,
            analyzer,
            security,
            engine: ExtractionEngine::new(extract),
        }
    }

    /// Fetch and extract one page.
    ///
    /// The guard re-validates the URL on every call, even though callers
    /// are expected to pass syntactically valid URLs. Fails fast: a guard
    /// rejection never issues a network call, and a failed fetch never
    /// reaches extraction.
    pub async fn parse_page(&self, source: &SourceSpec) -> Result<ParsedPage, AppError> {
        let decision = guard::evaluate(&source.url, &self.security)?;

        tracing::info!(host = %decision.host, "fetching page");
        let page = self.fetcher.fetch(&decision, &source.headers).await?;
        tracing::info!(
            bytes = page.html.len(),
            status = page.source_info.status,
            final_url = %page.source_info.final_url,
            "fetched page"
        );

        let items = self.engine.extract(
            &page.html,
            &source.url,
            source.selector.as_deref(),
            &source.extract,
        )?;
        tracing::info!(items = items.len(), "extracted items");

        Ok(ParsedPage {
            items,
            source_info: page.source_info,
        })
    }

    /// Analyze one prompt against an item set.
    pub async fn analyze_items(&self, items: &[Item], prompt: &str) -> Result<Analysis, AppError> {
        self.analyzer.analyze(items, prompt).await
    }

    /// Analyze every prompt against the same immutable item set.
    ///
    /// Prompts run as independent concurrent futures; the returned vector
    /// is positionally aligned with `prompts` regardless of completion
    /// order, and a failure in one slot leaves the others intact.
    pub async fn analyze_all(
        &self,
        items: &[Item],
        prompts: &[String],
    ) -> Vec<Result<Analysis, AppError>> {
        let analyses = prompts.iter().map(|prompt| self.analyze_items(items, prompt));
        futures::future::join_all(analyses).await
    }
}

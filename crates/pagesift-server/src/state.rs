use pagesift_core::service::AnalysisService;
use pagesift_core::traits::{ItemAnalyzer, PageFetcher, ResultPublisher};

/// Shared application state, available to all route handlers via
/// `State<Arc<AppState<_, _, _>>>`.
///
/// Generic over the pipeline seams so tests can inject mocks; `main`
/// instantiates it with the real fetcher, provider analyzer, and publisher.
pub struct AppState<F, A, P>
where
    F: PageFetcher,
    A: ItemAnalyzer,
    P: ResultPublisher,
{
    pub service: AnalysisService<F, A>,
    pub publisher: P,
    /// API key protecting the analysis endpoint.
    pub api_key: String,
}

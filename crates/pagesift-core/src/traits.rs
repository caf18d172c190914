use std::collections::HashMap;
use std::future::Future;

use crate::error::AppError;
use crate::guard::GuardDecision;
use crate::models::{Analysis, FetchedPage, Item};

/// Fetches one page for a guard-approved URL.
pub trait PageFetcher: Send + Sync + Clone {
    /// `headers` are caller-supplied extras; entries with empty values are
    /// omitted from the request.
    fn fetch(
        &self,
        decision: &GuardDecision,
        headers: &HashMap<String, String>,
    ) -> impl Future<Output = Result<FetchedPage, AppError>> + Send;
}

/// Scores items against one user prompt via a generative model and returns
/// the normalized result.
pub trait ItemAnalyzer: Send + Sync + Clone {
    fn analyze(
        &self,
        items: &[Item],
        prompt: &str,
    ) -> impl Future<Output = Result<Analysis, AppError>> + Send;
}

/// Publishes an assembled response to a downstream message bus.
///
/// Publishing is best-effort: the pipeline's success never depends on it.
pub trait ResultPublisher: Send + Sync + Clone {
    fn publish(
        &self,
        payload: &serde_json::Value,
    ) -> impl Future<Output = Result<(), AppError>> + Send;
}

/// A no-op publisher for deployments without a message bus.
#[derive(Debug, Clone)]
pub struct NullPublisher;

impl ResultPublisher for NullPublisher {
    async fn publish(&self, _payload: &serde_json::Value) -> Result<(), AppError> {
        Ok(())
    }
}

//! Test utilities: mock implementations of the core traits.
//!
//! Handwritten mocks for dependency injection in unit tests. All mocks use
//! `Arc<Mutex<_>>` for interior mutability, allowing test assertions on
//! recorded calls.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::Utc;

use crate::error::AppError;
use crate::guard::GuardDecision;
use crate::models::{Analysis, FetchedPage, Item, ItemLinks, SourceInfo, item_id};
use crate::traits::{ItemAnalyzer, PageFetcher, ResultPublisher};

// ---------------------------------------------------------------------------
// MockFetcher
// ---------------------------------------------------------------------------

/// Mock fetcher returning a queue of configurable responses and recording
/// every fetched href.
#[derive(Clone)]
pub struct MockFetcher {
    /// Each call pops the first element; an empty queue returns a default
    /// HTML page.
    responses: Arc<Mutex<Vec<Result<String, AppError>>>>,
    calls: Arc<Mutex<Vec<String>>>,
}

impl MockFetcher {
    pub fn new(html: &str) -> Self {
        Self::with_responses(vec![Ok(html.to_string())])
    }

    pub fn with_error(error: AppError) -> Self {
        Self::with_responses(vec![Err(error)])
    }

    pub fn with_responses(responses: Vec<Result<String, AppError>>) -> Self {
        Self {
            responses: Arc::new(Mutex::new(responses)),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Hrefs fetched so far, in call order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

impl PageFetcher for MockFetcher {
    async fn fetch(
        &self,
        decision: &GuardDecision,
        _headers: &HashMap<String, String>,
    ) -> Result<FetchedPage, AppError> {
        self.calls.lock().unwrap().push(decision.href.clone());

        let mut responses = self.responses.lock().unwrap();
        let html = if responses.is_empty() {
            "<html><body>default</body></html>".to_string()
        } else {
            responses.remove(0)?
        };

        Ok(FetchedPage {
            source_info: SourceInfo {
                fetched_url: decision.href.clone(),
                final_url: decision.href.clone(),
                fetched_at: Utc::now(),
                status: 200,
                content_type: Some("text/html".to_string()),
                etag: None,
                last_modified: None,
            },
            html,
        })
    }
}

// ---------------------------------------------------------------------------
// MockAnalyzer
// ---------------------------------------------------------------------------

/// Mock analyzer returning queued analyses and recording prompts.
#[derive(Clone)]
pub struct MockAnalyzer {
    responses: Arc<Mutex<Vec<Result<Analysis, AppError>>>>,
    prompts: Arc<Mutex<Vec<String>>>,
}

impl MockAnalyzer {
    /// Analyzer that always returns an empty match list.
    pub fn empty() -> Self {
        Self::with_responses(Vec::new())
    }

    pub fn with_error(error: AppError) -> Self {
        Self::with_responses(vec![Err(error)])
    }

    pub fn with_responses(responses: Vec<Result<Analysis, AppError>>) -> Self {
        Self {
            responses: Arc::new(Mutex::new(responses)),
            prompts: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Prompts analyzed so far, in call order.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

impl ItemAnalyzer for MockAnalyzer {
    async fn analyze(&self, _items: &[Item], prompt: &str) -> Result<Analysis, AppError> {
        self.prompts.lock().unwrap().push(prompt.to_string());

        let mut responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            Ok(Analysis {
                matches: Vec::new(),
                metadata: serde_json::json!({"provider": "mock"}),
            })
        } else {
            responses.remove(0)
        }
    }
}

// ---------------------------------------------------------------------------
// MockPublisher
// ---------------------------------------------------------------------------

/// Mock publisher recording published payloads.
#[derive(Clone, Default)]
pub struct MockPublisher {
    pub published: Arc<Mutex<Vec<serde_json::Value>>>,
    fail: Arc<Mutex<Option<AppError>>>,
}

impl MockPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_error(error: AppError) -> Self {
        Self {
            published: Arc::new(Mutex::new(Vec::new())),
            fail: Arc::new(Mutex::new(Some(error))),
        }
    }
}

impl ResultPublisher for MockPublisher {
    async fn publish(&self, payload: &serde_json::Value) -> Result<(), AppError> {
        let mut fail = self.fail.lock().unwrap();
        if let Some(err) = fail.take() {
            return Err(err);
        }
        self.published.lock().unwrap().push(payload.clone());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Test helpers
// ---------------------------------------------------------------------------

/// Build a minimal item for analyzer tests.
pub fn make_test_item(content: &str, url: &str) -> Item {
    Item {
        id: item_id(content, url),
        url: url.to_string(),
        title: "test item".to_string(),
        summary: content.to_string(),
        content: content.to_string(),
        date: None,
        section: None,
        category: None,
        links: ItemLinks {
            html: url.to_string(),
            pdf: None,
        },
        raw: None,
    }
}

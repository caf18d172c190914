//! Core of the pagesift pipeline: URL guard, extraction engine, match
//! normalization, and the analysis service that ties them together behind
//! injectable traits. Pure except for the trait seams; holds no
//! cross-request state.

pub mod config;
pub mod error;
pub mod extract;
pub mod guard;
pub mod models;
pub mod normalize;
pub mod service;
pub mod testutil;
pub mod traits;

pub use config::{AiConfig, ExtractConfig, FetchConfig, SecurityConfig};
pub use error::AppError;
pub use extract::{ExtractSpec, ExtractionEngine, FieldSpec};
pub use guard::GuardDecision;
pub use models::{Analysis, FetchedPage, Item, ItemLinks, Match, ParsedPage, SourceInfo};
pub use service::{AnalysisService, SourceSpec};
pub use traits::{ItemAnalyzer, NullPublisher, PageFetcher, ResultPublisher};

//! Outside-world implementations for pagesift: the reqwest page fetcher and
//! the AI provider adapters.

pub mod fetcher;
pub mod gemini;
pub mod openai;
pub mod prompt;
pub mod provider;

pub use fetcher::ReqwestFetcher;
pub use gemini::GeminiAnalyzer;
pub use openai::OpenAiAnalyzer;
pub use provider::ProviderAnalyzer;

use pagesift_core::config::AiConfig;
use pagesift_core::error::AppError;
use pagesift_core::models::{Analysis, Item};
use pagesift_core::traits::ItemAnalyzer;

use crate::gemini::GeminiAnalyzer;
use crate::openai::OpenAiAnalyzer;

/// Analyzer selected by configuration at the composition root.
///
/// Constructed once per process and injected into the pipeline; provider
/// clients are owned by whoever built them, never lazily initialized
/// behind a global.
#[derive(Clone, Debug)]
pub enum ProviderAnalyzer {
    OpenAi(OpenAiAnalyzer),
    Gemini(GeminiAnalyzer),
}

impl ProviderAnalyzer {
    pub fn from_config(config: &AiConfig) -> Result<Self, AppError> {
        match config.provider.as_str() {
            "openai" => Ok(Self::OpenAi(OpenAiAnalyzer::new(config)?)),
            "gemini" => Ok(Self::Gemini(GeminiAnalyzer::new(config)?)),
            other => Err(AppError::Config(format!(
                "unsupported AI provider '{other}' (expected openai or gemini)"
            ))),
        }
    }
}

impl ItemAnalyzer for ProviderAnalyzer {
    async fn analyze(&self, items: &[Item], prompt: &str) -> Result<Analysis, AppError> {
        match self {
            Self::OpenAi(analyzer) => analyzer.analyze(items, prompt).await,
            Self::Gemini(analyzer) => analyzer.analyze(items, prompt).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_provider_is_rejected() {
        let config = AiConfig {
            provider: "llama".into(),
            model: "m".into(),
            api_key: "k".into(),
            ..AiConfig::default()
        };
        assert!(matches!(
            ProviderAnalyzer::from_config(&config).unwrap_err(),
            AppError::Config(_)
        ));
    }

    #[test]
    fn known_providers_construct() {
        for provider in ["openai", "gemini"] {
            let config = AiConfig {
                provider: provider.into(),
                model: "m".into(),
                api_key: "k".into(),
                ..AiConfig::default()
            };
            assert!(ProviderAnalyzer::from_config(&config).is_ok(), "{provider}");
        }
    }
}

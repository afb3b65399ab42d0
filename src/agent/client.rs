//! Provider registry and factory.
//!
//! Maps provider names to concrete [`LlmProvider`] implementations.

use std::sync::Arc;

use crate::agent::provider::LlmProvider;
#[cfg(feature = "openai")]
use crate::agent::providers::OpenAiProvider;
use crate::config::ResearchConfig;
use crate::error::{PipelineError, Result};

/// Creates an [`LlmProvider`] based on the configured provider name.
///
/// The provider is returned behind an `Arc` so concurrent sessions can
/// share one client.
///
/// # Supported Providers
///
/// - `"openai"` (default, feature `openai`): OpenAI-compatible APIs via `async-openai`
///
/// # Errors
///
/// Returns [`PipelineError::UnsupportedProvider`] for unknown provider names
/// or providers whose feature is disabled.
pub fn create_provider(config: &ResearchConfig) -> Result<Arc<dyn LlmProvider>> {
    match config.provider.as_str() {
        #[cfg(feature = "openai")]
        "openai" => Ok(Arc::new(OpenAiProvider::new(config))),
        other => Err(PipelineError::UnsupportedProvider {
            name: other.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(feature = "openai")]
    #[test]
    fn test_create_openai_provider() {
        let config = ResearchConfig::builder()
            .api_key("test")
            .provider("openai")
            .build()
            .unwrap_or_else(|_| unreachable!());
        let provider = create_provider(&config);
        assert!(provider.is_ok_and(|p| p.name() == "openai"));
    }

    #[test]
    fn test_create_unknown_provider() {
        let config = ResearchConfig::builder()
            .api_key("test")
            .provider("unknown")
            .build()
            .unwrap_or_else(|_| unreachable!());
        let result = create_provider(&config);
        assert!(matches!(
            result,
            Err(PipelineError::UnsupportedProvider { name }) if name == "unknown"
        ));
    }
}

//! Searcher agent.
//!
//! Used when no dedicated search service is configured: asks the model
//! for candidate sources answering one sub-question.

use async_trait::async_trait;
use serde::Deserialize;

use super::message::strip_code_fence;
use super::traits::Agent;
use crate::config::ResearchConfig;
use crate::error::{PipelineError, Result};
use crate::pipeline::stage::StageName;
use crate::quality::CandidateSource;

/// Agent that retrieves candidate sources for a sub-question.
pub struct SearcherAgent {
    model: String,
    max_tokens: u32,
    system_prompt: String,
}

/// Accepted searcher output shapes.
#[derive(Deserialize)]
#[serde(untagged)]
enum SourcesPayload {
    Wrapped { sources: Vec<CandidateSource> },
    Bare(Vec<CandidateSource>),
}

impl SearcherAgent {
    /// Creates a new searcher agent with the given configuration and system prompt.
    #[must_use]
    pub fn new(config: &ResearchConfig, system_prompt: String) -> Self {
        Self {
            model: config.searcher_model.clone(),
            max_tokens: config.searcher_max_tokens,
            system_prompt,
        }
    }

    /// Parses the agent's JSON response into candidate sources.
    ///
    /// Entries with neither a URL nor a title are dropped. An empty list
    /// is valid.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::StageParse`] if the response is not valid JSON.
    pub fn parse_sources(content: &str) -> Result<Vec<CandidateSource>> {
        let payload: SourcesPayload =
            serde_json::from_str(strip_code_fence(content)).map_err(|e| {
                PipelineError::StageParse {
                    stage: StageName::Search,
                    message: format!("invalid sources JSON: {e}"),
                    content: content.to_string(),
                }
            })?;

        let sources = match payload {
            SourcesPayload::Wrapped { sources } | SourcesPayload::Bare(sources) => sources,
        };
        Ok(sources
            .into_iter()
            .filter(|s| !s.url.trim().is_empty() || !s.title.trim().is_empty())
            .collect())
    }
}

#[async_trait]
impl Agent for SearcherAgent {
    fn name(&self) -> &'static str {
        "searcher"
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    fn json_mode(&self) -> bool {
        true
    }

    fn max_tokens(&self) -> u32 {
        self.max_tokens
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_wrapped_sources() {
        let json = r#"{"sources": [{"url": "https://iea.org/a", "title": "A", "snippet": "s"}]}"#;
        let sources = SearcherAgent::parse_sources(json).unwrap_or_default();
        assert_eq!(sources.len(), 1);
        assert_eq!(sources[0].url, "https://iea.org/a");
        assert!(sources[0].content.is_empty());
    }

    #[test]
    fn test_parse_bare_array_drops_blank_entries() {
        let json = r#"```json
[{"url": "https://a.org"}, {"snippet": "orphan"}, {"title": "Untitled link"}]
```"#;
        let sources = SearcherAgent::parse_sources(json).unwrap_or_default();
        assert_eq!(sources.len(), 2);
    }

    #[test]
    fn test_parse_empty_list_is_ok() {
        let sources = SearcherAgent::parse_sources(r#"{"sources": []}"#);
        assert!(sources.is_ok_and(|s| s.is_empty()));
    }

    #[test]
    fn test_parse_invalid() {
        let result = SearcherAgent::parse_sources("no sources found, sorry");
        assert!(matches!(
            result,
            Err(PipelineError::StageParse {
                stage: StageName::Search,
                ..
            })
        ));
    }

    #[test]
    fn test_agent_properties() {
        let config = ResearchConfig::builder()
            .api_key("test")
            .searcher_model("gpt-4o-mini")
            .build()
            .unwrap_or_else(|_| unreachable!());
        let agent = SearcherAgent::new(&config, String::new());
        assert_eq!(agent.name(), "searcher");
        assert_eq!(agent.max_tokens(), 4096);
        assert!(agent.json_mode());
    }
}

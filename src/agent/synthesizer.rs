//! Synthesizer agent for writing the final report.
//!
//! Takes the research plan and the ranked sources and produces a
//! markdown report addressing the original query.

use async_trait::async_trait;

use super::traits::Agent;
use crate::config::ResearchConfig;
use crate::error::{PipelineError, Result};
use crate::pipeline::stage::StageName;

/// Agent that synthesizes ranked sources into a final report.
pub struct SynthesizerAgent {
    model: String,
    max_tokens: u32,
    system_prompt: String,
}

impl SynthesizerAgent {
    /// Creates a new synthesizer agent with the given configuration and system prompt.
    #[must_use]
    pub fn new(config: &ResearchConfig, system_prompt: String) -> Self {
        Self {
            model: config.synthesizer_model.clone(),
            max_tokens: config.synthesizer_max_tokens,
            system_prompt,
        }
    }

    /// Validates the agent's markdown report.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::StageParse`] if the report is blank.
    pub fn parse_report(content: &str) -> Result<String> {
        let report = content.trim();
        if report.is_empty() {
            return Err(PipelineError::StageParse {
                stage: StageName::Synthesize,
                message: "report is empty".to_string(),
                content: content.to_string(),
            });
        }
        Ok(report.to_string())
    }
}

#[async_trait]
impl Agent for SynthesizerAgent {
    fn name(&self) -> &'static str {
        "synthesizer"
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    fn temperature(&self) -> f32 {
        0.3
    }

    fn max_tokens(&self) -> u32 {
        self.max_tokens
    }
}

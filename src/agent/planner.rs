//! Planner agent.
//!
//! Decomposes the research query into a [`ResearchPlan`] of focused
//! sub-questions that drive the search stage.

use async_trait::async_trait;
use serde::Deserialize;

use super::message::strip_code_fence;
use super::traits::Agent;
use crate::config::ResearchConfig;
use crate::error::{PipelineError, Result};
use crate::pipeline::report::ResearchPlan;
use crate::pipeline::stage::StageName;

/// Agent that plans the research for a query.
pub struct PlannerAgent {
    model: String,
    max_tokens: u32,
    max_sub_questions: usize,
    system_prompt: String,
}

/// Accepted planner output shapes.
#[derive(Deserialize)]
#[serde(untagged)]
enum PlanPayload {
    Plan(ResearchPlan),
    Questions(Vec<String>),
}

impl PlannerAgent {
    /// Creates a new planner agent with the given configuration and system prompt.
    #[must_use]
    pub fn new(config: &ResearchConfig, system_prompt: String) -> Self {
        Self {
            model: config.planner_model.clone(),
            max_tokens: config.planner_max_tokens,
            max_sub_questions: config.max_sub_questions,
            system_prompt,
        }
    }

    /// Upper bound on sub-questions kept from a plan.
    #[must_use]
    pub const fn max_sub_questions(&self) -> usize {
        self.max_sub_questions
    }

    /// Parses the agent's JSON response into a research plan.
    ///
    /// Accepts `{"sub_questions": [...], "focus_areas": [...]}` or a bare
    /// array of questions, optionally inside a code fence. Blank and
    /// repeated questions are dropped and the list is truncated to
    /// [`PlannerAgent::max_sub_questions`].
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::StageParse`] if the response is not valid
    /// JSON or contains no sub-questions.
    pub fn parse_plan(&self, content: &str) -> Result<ResearchPlan> {
        let parse_error = |message: String| PipelineError::StageParse {
            stage: StageName::Plan,
            message,
            content: content.to_string(),
        };

        let payload: PlanPayload = serde_json::from_str(strip_code_fence(content))
            .map_err(|e| parse_error(format!("invalid plan JSON: {e}")))?;

        let (questions, focus_areas) = match payload {
            PlanPayload::Plan(plan) => (plan.sub_questions, plan.focus_areas),
            PlanPayload::Questions(questions) => (questions, Vec::new()),
        };

        let mut sub_questions: Vec<String> = Vec::new();
        for question in questions {
            let question = question.trim();
            if !question.is_empty() && !sub_questions.iter().any(|q| q == question) {
                sub_questions.push(question.to_string());
            }
        }
        if sub_questions.is_empty() {
            return Err(parse_error("plan contains no sub-questions".to_string()));
        }
        sub_questions.truncate(self.max_sub_questions);

        Ok(ResearchPlan {
            sub_questions,
            focus_areas: focus_areas
                .into_iter()
                .map(|f| f.trim().to_string())
                .filter(|f| !f.is_empty())
                .collect(),
        })
    }
}

#[async_trait]
impl Agent for PlannerAgent {
    fn name(&self) -> &'static str {
        "planner"
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

    fn temperature(&self) -> f32 {
        0.2
    }

    fn max_tokens(&self) -> u32 {
        self.max_tokens
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::prompt::PLANNER_SYSTEM_PROMPT;

    fn agent(max_sub_questions: usize) -> PlannerAgent {
        let config = ResearchConfig::builder()
            .api_key("test")
            .planner_model("gpt-4o-mini")
            .max_sub_questions(max_sub_questions)
            .build()
            .unwrap_or_else(|_| unreachable!());
        PlannerAgent::new(&config, PLANNER_SYSTEM_PROMPT.to_string())
    }

    #[test]
    fn test_parse_plan_object() {
        let json = r#"{"sub_questions": ["What is solar?", "How much does it cost?"], "focus_areas": ["cost"]}"#;
        let plan = agent(5).parse_plan(json).unwrap_or_default();
        assert_eq!(plan.sub_questions.len(), 2);
        assert_eq!(plan.focus_areas, vec!["cost".to_string()]);
    }

    #[test]
    fn test_parse_plan_bare_array_in_code_block() {
        let json = "```json\n[\"What is solar?\", \"  \", \"What is solar?\", \"Why?\"]\n```";
        let plan = agent(5).parse_plan(json).unwrap_or_default();
        assert_eq!(
            plan.sub_questions,
            vec!["What is solar?".to_string(), "Why?".to_string()]
        );
    }

    #[test]
    fn test_parse_plan_truncates() {
        let json = r#"["a", "b", "c", "d"]"#;
        let plan = agent(2).parse_plan(json).unwrap_or_default();
        assert_eq!(plan.sub_questions, vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn test_parse_plan_invalid_json() {
        let result = agent(5).parse_plan("Here is my plan: research things");
        assert!(matches!(
            result,
            Err(PipelineError::StageParse {
                stage: StageName::Plan,
                ..
            })
        ));
    }

    #[test]
    fn test_parse_plan_empty_list() {
        let result = agent(5).parse_plan(r#"{"sub_questions": []}"#);
        assert!(matches!(result, Err(PipelineError::StageParse { .. })));
    }

    #[test]
    fn test_agent_properties() {
        let agent = agent(5);
        assert_eq!(agent.name(), "planner");
        assert_eq!(agent.model(), "gpt-4o-mini");
        assert!(agent.json_mode());
    }
}

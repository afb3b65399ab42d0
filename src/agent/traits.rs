//! Agent trait definition.
//!
//! All agents (planner, searcher, synthesizer) implement this trait,
//! which provides a uniform, rate-limited and cancellable interface for
//! the orchestrator.

use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::message::{ChatRequest, TokenUsage, system_message, user_message};
use super::provider::LlmProvider;
use crate::error::{PipelineError, Result};
use crate::pricing::PricingTable;
use crate::rate_limit::RateLimiter;

/// Shared resources an agent call runs against.
///
/// The limiter is the one bound to the completion service and is shared
/// by every session targeting it.
#[derive(Clone, Copy)]
pub struct CallContext<'a> {
    /// Completion service.
    pub provider: &'a dyn LlmProvider,
    /// Rate limiter for the completion service.
    pub limiter: &'a RateLimiter,
    /// Pricing used to cost the call.
    pub pricing: &'a PricingTable,
    /// Upper bound on the network call.
    pub timeout: Duration,
    /// Session cancellation signal.
    pub cancel: &'a CancellationToken,
}

impl std::fmt::Debug for CallContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallContext")
            .field("provider", &self.provider.name())
            .field("limiter", self.limiter)
            .field("timeout", &self.timeout)
            .field("cancelled", &self.cancel.is_cancelled())
            .finish_non_exhaustive()
    }
}

/// Response from an agent execution.
#[derive(Debug, Clone)]
pub struct AgentResponse {
    /// The agent's text output.
    pub content: String,
    /// Token usage for this call.
    pub usage: TokenUsage,
    /// Cost of this call according to the pricing table.
    pub cost: f64,
    /// Why the model stopped generating (e.g. `"stop"`, `"length"`).
    pub finish_reason: Option<String>,
}

/// Trait implemented by all agents in the system.
///
/// Agents encapsulate a specific role (planning, searching, synthesis)
/// with a fixed system prompt and model configuration. The orchestrator
/// calls [`Agent::execute`] to run the agent against a provider.
#[async_trait]
pub trait Agent: Send + Sync {
    /// Agent name for logging and identification.
    fn name(&self) -> &'static str;

    /// Model identifier to use for this agent.
    fn model(&self) -> &str;

    /// System prompt that defines the agent's role and behavior.
    fn system_prompt(&self) -> &str;

    /// Whether to request JSON-formatted output.
    fn json_mode(&self) -> bool {
        false
    }

    /// Sampling temperature (0.0 = deterministic, higher = more creative).
    fn temperature(&self) -> f32 {
        0.0
    }

    /// Maximum tokens for the response.
    fn max_tokens(&self) -> u32 {
        2048
    }

    /// Executes the agent with the given user message.
    ///
    /// Waits for a rate-limit slot, then issues one completion request
    /// under the context's timeout. Both waits end early with
    /// [`PipelineError::Cancelled`] when the context is cancelled. No
    /// retries are attempted.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::AgentCall`] on upstream failures or
    /// timeout, and [`PipelineError::Cancelled`] on cancellation.
    async fn execute(&self, ctx: &CallContext<'_>, user_msg: &str) -> Result<AgentResponse> {
        if ctx.cancel.is_cancelled() {
            return Err(PipelineError::cancelled());
        }

        tokio::select! {
            biased;
            () = ctx.cancel.cancelled() => return Err(PipelineError::cancelled()),
            () = ctx.limiter.acquire() => {}
        }

        let request = ChatRequest {
            model: self.model().to_string(),
            messages: vec![system_message(self.system_prompt()), user_message(user_msg)],
            max_tokens: self.max_tokens(),
            temperature: self.temperature(),
            json_mode: self.json_mode(),
        };

        let response = tokio::select! {
            biased;
            () = ctx.cancel.cancelled() => return Err(PipelineError::cancelled()),
            result = tokio::time::timeout(ctx.timeout, ctx.provider.chat(&request)) => {
                result.map_err(|_| {
                    PipelineError::call(format!(
                        "{} request timed out after {}s",
                        self.name(),
                        ctx.timeout.as_secs_f64()
                    ))
                })??
            }
        };

        let cost = ctx.pricing.cost(self.model(), &response.usage);
        debug!(
            agent = self.name(),
            model = self.model(),
            tokens = response.usage.total_tokens,
            cost,
            "agent call complete"
        );

        Ok(AgentResponse {
            content: response.content,
            usage: response.usage,
            cost,
            finish_reason: response.finish_reason,
        })
    }
}

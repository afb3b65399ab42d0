//! Pluggable completion-service trait.
//!
//! Implementations translate provider-agnostic [`ChatRequest`]/[`ChatResponse`]
//! into provider-specific SDK calls.

use async_trait::async_trait;

use super::message::{ChatRequest, ChatResponse};
use crate::error::Result;

/// Trait for completion-service backends.
///
/// Implementations own the transport. They perform no retries and no
/// rate limiting; both belong to the caller.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Provider name (e.g., `"openai"`).
    fn name(&self) -> &'static str;

    /// Executes a chat completion request.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::AgentCall`](crate::PipelineError::AgentCall)
    /// on non-success responses or transport failures.
    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse>;
}

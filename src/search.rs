//! Search collaborator interface.
//!
//! A [`SearchProvider`] wraps an external retrieval service. The
//! orchestrator calls it once per sub-question through the search
//! service's rate limiter; without one, the searcher agent is used.

use async_trait::async_trait;

use crate::error::Result;
use crate::quality::CandidateSource;

/// External retrieval service.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Provider name for logging.
    fn name(&self) -> &'static str;

    /// Returns candidate sources for `query`, best first.
    ///
    /// # Errors
    ///
    /// Returns [`crate::PipelineError::AgentCall`] when the service fails.
    async fn search(&self, query: &str) -> Result<Vec<CandidateSource>>;
}

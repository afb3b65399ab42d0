//! # research-orchestrator
//!
//! Multi-stage research pipeline. A planner agent breaks a query into
//! sub-questions, a searcher (agent or external service) retrieves
//! candidate sources that are scored and ranked by a multi-dimension
//! quality model, and a synthesizer agent writes the final report.
//!
//! Every completion call goes through a shared rolling-window
//! [`RateLimiter`], is priced with a configurable [`PricingTable`], and can
//! be cancelled mid-flight. Progress is reported as ordered
//! [`ProgressEvent`]s on a channel.
//!
//! ## Quick Start
//!
//! ```no_run
//! use research_orchestrator::{ResearchConfig, run_pipeline};
//!
//! # async fn example() -> research_orchestrator::Result<()> {
//! let config = ResearchConfig::from_env()?;
//! let report = run_pipeline("benefits of renewable energy", config).await?;
//! println!("{}", report.report.unwrap_or_default());
//! # Ok(())
//! # }
//! ```
//!
//! ## Progress events
//!
//! ```no_run
//! use research_orchestrator::{Orchestrator, ResearchConfig, progress};
//!
//! # async fn example() -> research_orchestrator::Result<()> {
//! let (tx, mut rx) = progress::channel();
//! let orchestrator = Orchestrator::new(ResearchConfig::from_env()?)?.with_event_sink(tx);
//! tokio::spawn(async move {
//!     while let Some(event) = rx.recv().await {
//!         println!("{}", serde_json::to_string(&event).unwrap_or_default());
//!     }
//! });
//! orchestrator.run("benefits of renewable energy").await?;
//! # Ok(())
//! # }
//! ```

pub mod agent;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod pricing;
pub mod progress;
pub mod quality;
pub mod rate_limit;
pub mod search;

pub use agent::{Agent, AgentResponse, LlmProvider, TokenUsage};
pub use config::{ResearchConfig, ResearchConfigBuilder};
pub use error::{PipelineError, Result};
pub use pipeline::{
    FailurePolicy, Orchestrator, RankedSource, ResearchPlan, ResearchReport, ResearchState,
    SessionRegistry, SessionSnapshot, SessionStore, StageName, StageOutcome, StageRecord,
};
pub use pricing::PricingTable;
pub use progress::{ProgressEvent, ProgressTracker, ProgressUpdate};
pub use quality::{CandidateSource, Dimension, Evaluable, QualityEvaluator, QualityScore};
pub use rate_limit::RateLimiter;
pub use search::SearchProvider;

/// Runs one research session with a provider built from `config`.
///
/// Equivalent to `Orchestrator::new(config)?.run(query)`.
///
/// # Errors
///
/// Returns [`PipelineError::UnsupportedProvider`] for an unknown provider,
/// [`PipelineError::InvalidQuery`] for an empty or oversized query,
/// and [`PipelineError::Orchestration`] when an aborting stage fails.
pub async fn run_pipeline(query: &str, config: ResearchConfig) -> Result<ResearchReport> {
    Orchestrator::new(config)?.run(query).await
}

//! Role-bound agents for the research pipeline.
//!
//! Each agent issues one completion request per call through a shared,
//! rate-limited provider and reports token usage and cost.
//!
//! # Architecture
//!
//! ```text
//! Orchestrator
//!   ├── PlannerAgent      query → ResearchPlan (JSON)
//!   ├── SearcherAgent     sub-question → Vec<CandidateSource> (JSON)
//!   │   (or a SearchProvider, when configured)
//!   └── SynthesizerAgent  plan + ranked sources → markdown report
//! ```
//!
//! # Feature Gate
//!
//! The OpenAI-compatible provider requires the `openai` feature (on by
//! default). Other providers implement [`LlmProvider`] directly.

pub mod client;
pub mod message;
pub mod planner;
pub mod prompt;
pub mod provider;
pub mod providers;
pub mod searcher;
pub mod synthesizer;
pub mod traits;

// Re-export key types
pub use client::create_provider;
pub use message::{ChatMessage, ChatRequest, ChatResponse, Role, TokenUsage};
pub use planner::PlannerAgent;
pub use prompt::PromptSet;
pub use provider::LlmProvider;
pub use searcher::SearcherAgent;
pub use synthesizer::SynthesizerAgent;
pub use traits::{Agent, AgentResponse, CallContext};

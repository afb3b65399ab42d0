//! Pipeline configuration with builder pattern and environment variable support.
//!
//! Configuration is resolved in order: explicit values → environment variables → defaults.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{PipelineError, Result};
use crate::pipeline::stage::{DEFAULT_STAGES, FailurePolicy, StageName};
use crate::pricing::PricingTable;

/// Default planner max tokens.
const DEFAULT_PLANNER_MAX_TOKENS: u32 = 1024;
/// Default searcher max tokens.
const DEFAULT_SEARCHER_MAX_TOKENS: u32 = 4096;
/// Default synthesizer max tokens.
const DEFAULT_SYNTHESIZER_MAX_TOKENS: u32 = 4096;
/// Default request timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 120;
/// Default completion calls per window.
const DEFAULT_RATE_LIMIT: usize = 50;
/// Default completion window in seconds.
const DEFAULT_RATE_PERIOD_SECS: u64 = 60;
/// Default search calls per window.
const DEFAULT_SEARCH_RATE_LIMIT: usize = 10;
/// Default search window in seconds.
const DEFAULT_SEARCH_RATE_PERIOD_SECS: u64 = 1;
/// Default number of sub-questions kept from a plan.
const DEFAULT_MAX_SUB_QUESTIONS: usize = 5;
/// Default number of ranked sources handed to the synthesizer.
const DEFAULT_MAX_SOURCES: usize = 10;
/// Default minimum overall score for a source to be kept.
const DEFAULT_MIN_SOURCE_SCORE: f64 = 0.4;

/// Configuration for a research pipeline.
#[derive(Clone)]
pub struct ResearchConfig {
    /// Completion provider name (e.g., "openai").
    pub provider: String,
    /// API key for the provider.
    pub api_key: String,
    /// Optional base URL override (for proxies or compatible APIs).
    pub base_url: Option<String>,
    /// Model for the planner agent.
    pub planner_model: String,
    /// Model for the searcher agent.
    pub searcher_model: String,
    /// Model for the synthesizer agent.
    pub synthesizer_model: String,
    /// Maximum tokens for planner responses.
    pub planner_max_tokens: u32,
    /// Maximum tokens for searcher responses.
    pub searcher_max_tokens: u32,
    /// Maximum tokens for synthesizer responses.
    pub synthesizer_max_tokens: u32,
    /// Timeout applied to every network call.
    pub timeout: Duration,
    /// Completion calls permitted per `rate_period`.
    pub rate_limit: usize,
    /// Rolling window for the completion service.
    pub rate_period: Duration,
    /// Search calls permitted per `search_rate_period`.
    pub search_rate_limit: usize,
    /// Rolling window for the search service.
    pub search_rate_period: Duration,
    /// Sub-questions kept from the planner output.
    pub max_sub_questions: usize,
    /// Ranked sources handed to the synthesizer.
    pub max_sources: usize,
    /// Sources scoring below this overall quality are discarded.
    pub min_source_score: f64,
    /// Ordered stage sequence.
    pub stages: Vec<StageName>,
    /// Per-stage failure policy for upstream call errors.
    ///
    /// Stages without an entry use [`FailurePolicy::Abort`].
    pub stage_policies: HashMap<StageName, FailurePolicy>,
    /// Pricing used to convert token usage into cost.
    pub pricing: PricingTable,
    /// Directory containing prompt template files.
    ///
    /// Missing files fall back to compiled-in defaults.
    pub prompt_dir: Option<PathBuf>,
}

impl ResearchConfig {
    /// Creates a new builder for `ResearchConfig`.
    #[must_use]
    pub fn builder() -> ResearchConfigBuilder {
        ResearchConfigBuilder::default()
    }

    /// Creates configuration from environment variables with defaults.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::ApiKeyMissing`] if no API key is found, or
    /// [`PipelineError::Config`] if a value is invalid.
    pub fn from_env() -> Result<Self> {
        Self::builder().from_env().build()
    }

    /// Failure policy for a stage.
    #[must_use]
    pub fn policy(&self, stage: StageName) -> FailurePolicy {
        self.stage_policies
            .get(&stage)
            .copied()
            .unwrap_or(FailurePolicy::Abort)
    }
}

impl std::fmt::Debug for ResearchConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResearchConfig")
            .field("provider", &self.provider)
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("planner_model", &self.planner_model)
            .field("searcher_model", &self.searcher_model)
            .field("synthesizer_model", &self.synthesizer_model)
            .field("timeout", &self.timeout)
            .field("rate_limit", &self.rate_limit)
            .field("rate_period", &self.rate_period)
            .field("stages", &self.stages)
            .field("stage_policies", &self.stage_policies)
            .finish_non_exhaustive()
    }
}

/// Builder for [`ResearchConfig`].
#[derive(Debug, Clone, Default)]
pub struct ResearchConfigBuilder {
    provider: Option<String>,
    api_key: Option<String>,
    base_url: Option<String>,
    planner_model: Option<String>,
    searcher_model: Option<String>,
    synthesizer_model: Option<String>,
    planner_max_tokens: Option<u32>,
    searcher_max_tokens: Option<u32>,
    synthesizer_max_tokens: Option<u32>,
    timeout: Option<Duration>,
    rate_limit: Option<usize>,
    rate_period: Option<Duration>,
    search_rate_limit: Option<usize>,
    search_rate_period: Option<Duration>,
    max_sub_questions: Option<usize>,
    max_sources: Option<usize>,
    min_source_score: Option<f64>,
    stages: Option<Vec<StageName>>,
    stage_policies: HashMap<StageName, FailurePolicy>,
    pricing: Option<PricingTable>,
    pricing_file: Option<PathBuf>,
    prompt_dir: Option<PathBuf>,
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.trim().parse().ok())
}

impl ResearchConfigBuilder {
    /// Populates unset fields from environment variables.
    #[must_use]
    pub fn from_env(mut self) -> Self {
        if self.provider.is_none() {
            self.provider = std::env::var("RESEARCH_PROVIDER").ok();
        }
        if self.api_key.is_none() {
            self.api_key = std::env::var("RESEARCH_API_KEY")
                .or_else(|_| std::env::var("OPENAI_API_KEY"))
                .ok();
        }
        if self.base_url.is_none() {
            self.base_url = std::env::var("RESEARCH_BASE_URL")
                .or_else(|_| std::env::var("OPENAI_BASE_URL"))
                .ok();
        }
        if self.planner_model.is_none() {
            self.planner_model = std::env::var("RESEARCH_PLANNER_MODEL").ok();
        }
        if self.searcher_model.is_none() {
            self.searcher_model = std::env::var("RESEARCH_SEARCHER_MODEL").ok();
        }
        if self.synthesizer_model.is_none() {
            self.synthesizer_model = std::env::var("RESEARCH_SYNTHESIZER_MODEL").ok();
        }
        if self.timeout.is_none() {
            self.timeout = env_parse("RESEARCH_TIMEOUT_SECS").map(Duration::from_secs);
        }
        if self.rate_limit.is_none() {
            self.rate_limit = env_parse("RESEARCH_RATE_LIMIT");
        }
        if self.rate_period.is_none() {
            self.rate_period = env_parse("RESEARCH_RATE_PERIOD_SECS").map(Duration::from_secs);
        }
        if self.max_sub_questions.is_none() {
            self.max_sub_questions = env_parse("RESEARCH_MAX_SUB_QUESTIONS");
        }
        if self.max_sources.is_none() {
            self.max_sources = env_parse("RESEARCH_MAX_SOURCES");
        }
        if self.pricing.is_none() && self.pricing_file.is_none() {
            self.pricing_file = std::env::var("RESEARCH_PRICING_FILE")
                .ok()
                .map(PathBuf::from);
        }
        if self.prompt_dir.is_none() {
            self.prompt_dir = std::env::var("RESEARCH_PROMPT_DIR").ok().map(PathBuf::from);
        }
        self
    }

    /// Sets the provider name.
    #[must_use]
    pub fn provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = Some(provider.into());
        self
    }

    /// Sets the API key.
    #[must_use]
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Sets the base URL override.
    #[must_use]
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Sets the planner model.
    #[must_use]
    pub fn planner_model(mut self, model: impl Into<String>) -> Self {
        self.planner_model = Some(model.into());
        self
    }

    /// Sets the searcher model.
    #[must_use]
    pub fn searcher_model(mut self, model: impl Into<String>) -> Self {
        self.searcher_model = Some(model.into());
        self
    }

    /// Sets the synthesizer model.
    #[must_use]
    pub fn synthesizer_model(mut self, model: impl Into<String>) -> Self {
        self.synthesizer_model = Some(model.into());
        self
    }

    /// Sets the planner max tokens.
    #[must_use]
    pub const fn planner_max_tokens(mut self, n: u32) -> Self {
        self.planner_max_tokens = Some(n);
        self
    }

    /// Sets the searcher max tokens.
    #[must_use]
    pub const fn searcher_max_tokens(mut self, n: u32) -> Self {
        self.searcher_max_tokens = Some(n);
        self
    }

    /// Sets the synthesizer max tokens.
    #[must_use]
    pub const fn synthesizer_max_tokens(mut self, n: u32) -> Self {
        self.synthesizer_max_tokens = Some(n);
        self
    }

    /// Sets the network call timeout.
    #[must_use]
    pub const fn timeout(mut self, duration: Duration) -> Self {
        self.timeout = Some(duration);
        self
    }

    /// Sets the completion-service rate limit.
    #[must_use]
    pub const fn rate_limit(mut self, calls: usize, period: Duration) -> Self {
        self.rate_limit = Some(calls);
        self.rate_period = Some(period);
        self
    }

    /// Sets the search-service rate limit.
    #[must_use]
    pub const fn search_rate_limit(mut self, calls: usize, period: Duration) -> Self {
        self.search_rate_limit = Some(calls);
        self.search_rate_period = Some(period);
        self
    }

    /// Sets the number of sub-questions kept from a plan.
    #[must_use]
    pub const fn max_sub_questions(mut self, n: usize) -> Self {
        self.max_sub_questions = Some(n);
        self
    }

    /// Sets the number of ranked sources handed to the synthesizer.
    #[must_use]
    pub const fn max_sources(mut self, n: usize) -> Self {
        self.max_sources = Some(n);
        self
    }

    /// Sets the minimum overall quality for a source to be kept.
    #[must_use]
    pub const fn min_source_score(mut self, score: f64) -> Self {
        self.min_source_score = Some(score);
        self
    }

    /// Sets the ordered stage sequence.
    #[must_use]
    pub fn stages(mut self, stages: impl Into<Vec<StageName>>) -> Self {
        self.stages = Some(stages.into());
        self
    }

    /// Sets the failure policy for one stage.
    #[must_use]
    pub fn stage_policy(mut self, stage: StageName, policy: FailurePolicy) -> Self {
        self.stage_policies.insert(stage, policy);
        self
    }

    /// Sets the pricing table directly.
    #[must_use]
    pub fn pricing(mut self, pricing: PricingTable) -> Self {
        self.pricing = Some(pricing);
        self
    }

    /// Loads the pricing table from a JSON file at build time.
    #[must_use]
    pub fn pricing_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.pricing_file = Some(path.into());
        self
    }

    /// Sets the prompt template directory.
    #[must_use]
    pub fn prompt_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.prompt_dir = Some(dir.into());
        self
    }

    /// Builds the [`ResearchConfig`].
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::ApiKeyMissing`] if no API key was set, or
    /// [`PipelineError::Config`] for an empty or duplicated stage list, a
    /// zero rate limit or window, an out-of-range score threshold, or an
    /// unreadable pricing file.
    pub fn build(self) -> Result<ResearchConfig> {
        let api_key = self.api_key.ok_or(PipelineError::ApiKeyMissing)?;

        let stages = self.stages.unwrap_or_else(|| DEFAULT_STAGES.to_vec());
        if stages.is_empty() {
            return Err(config_error("stage sequence must not be empty"));
        }
        for (i, stage) in stages.iter().enumerate() {
            if stages[..i].contains(stage) {
                return Err(config_error(format!("stage '{stage}' configured twice")));
            }
        }

        let rate_limit = self.rate_limit.unwrap_or(DEFAULT_RATE_LIMIT);
        let rate_period = self
            .rate_period
            .unwrap_or(Duration::from_secs(DEFAULT_RATE_PERIOD_SECS));
        let search_rate_limit = self.search_rate_limit.unwrap_or(DEFAULT_SEARCH_RATE_LIMIT);
        let search_rate_period = self
            .search_rate_period
            .unwrap_or(Duration::from_secs(DEFAULT_SEARCH_RATE_PERIOD_SECS));
        if rate_limit == 0 || search_rate_limit == 0 {
            return Err(config_error("rate limits must be at least 1"));
        }
        if rate_period.is_zero() || search_rate_period.is_zero() {
            return Err(config_error("rate limit windows must be non-zero"));
        }

        let min_source_score = self.min_source_score.unwrap_or(DEFAULT_MIN_SOURCE_SCORE);
        if !(0.0..=1.0).contains(&min_source_score) {
            return Err(config_error("min_source_score must be within [0, 1]"));
        }

        let pricing = match (self.pricing, self.pricing_file) {
            (Some(table), _) => table,
            (None, Some(path)) => PricingTable::from_path(&path)?,
            (None, None) => PricingTable::default(),
        };

        Ok(ResearchConfig {
            provider: self.provider.unwrap_or_else(|| "openai".to_string()),
            api_key,
            base_url: self.base_url,
            planner_model: self
                .planner_model
                .unwrap_or_else(|| "gpt-4o-mini".to_string()),
            searcher_model: self
                .searcher_model
                .unwrap_or_else(|| "gpt-4o-mini".to_string()),
            synthesizer_model: self
                .synthesizer_model
                .unwrap_or_else(|| "gpt-4o".to_string()),
            planner_max_tokens: self
                .planner_max_tokens
                .unwrap_or(DEFAULT_PLANNER_MAX_TOKENS),
            searcher_max_tokens: self
                .searcher_max_tokens
                .unwrap_or(DEFAULT_SEARCHER_MAX_TOKENS),
            synthesizer_max_tokens: self
                .synthesizer_max_tokens
                .unwrap_or(DEFAULT_SYNTHESIZER_MAX_TOKENS),
            timeout: self
                .timeout
                .unwrap_or(Duration::from_secs(DEFAULT_TIMEOUT_SECS)),
            rate_limit,
            rate_period,
            search_rate_limit,
            search_rate_period,
            max_sub_questions: self
                .max_sub_questions
                .unwrap_or(DEFAULT_MAX_SUB_QUESTIONS)
                .max(1),
            max_sources: self.max_sources.unwrap_or(DEFAULT_MAX_SOURCES).max(1),
            min_source_score,
            stages,
            stage_policies: self.stage_policies,
            pricing,
            prompt_dir: self.prompt_dir,
        })
    }
}

fn config_error(message: impl Into<String>) -> PipelineError {
    PipelineError::Config {
        message: message.into(),
    }
}

//! Orchestrator for the plan → search → synthesize research pipeline.
//!
//! Stages run strictly in sequence within a session, each feeding the
//! next. Many sessions may run concurrently against one orchestrator;
//! they share its rate limiters, provider and registry.
//!
//! # Failure policy
//!
//! | Error                         | Effect                                     |
//! |-------------------------------|--------------------------------------------|
//! | [`PipelineError::StageParse`] | `fail_step`, fallback output, continue     |
//! | upstream call, `Fallback`     | `fail_step`, fallback output, continue     |
//! | upstream call, `Abort`        | `fail_step`, session `Failed`, partial     |
//! | cancellation                  | `cancel_step`, session `Cancelled`, partial|

use std::collections::HashSet;
use std::sync::Arc;

use serde_json::{Map, Value};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::fallback::{fallback_plan, fallback_report, fallback_search_summary};
use super::registry::{Registration, SessionRegistry};
use super::report::{RankedSource, ResearchReport, StageOutcome, StageRecord};
use super::session::{ResearchState, Session, SessionStore};
use super::stage::{FailurePolicy, StageName};
use crate::agent::message::TokenUsage;
use crate::agent::prompt::{
    PromptSet, build_planner_prompt, build_searcher_prompt, build_synthesizer_prompt,
};
use crate::agent::{
    Agent, AgentResponse, CallContext, LlmProvider, PlannerAgent, SearcherAgent,
    SynthesizerAgent, create_provider,
};
use crate::config::ResearchConfig;
use crate::error::{PipelineError, Result};
use crate::progress::{EventSender, ProgressTracker};
use crate::quality::{CandidateSource, QualityEvaluator};
use crate::rate_limit::RateLimiter;
use crate::search::SearchProvider;

/// Longest accepted query, in bytes.
const MAX_QUERY_LEN: usize = 10_000;

/// Drives research sessions through the configured stages.
pub struct Orchestrator {
    config: ResearchConfig,
    provider: Arc<dyn LlmProvider>,
    search: Option<Arc<dyn SearchProvider>>,
    limiter: Arc<RateLimiter>,
    search_limiter: Arc<RateLimiter>,
    evaluator: QualityEvaluator,
    planner: PlannerAgent,
    searcher: SearcherAgent,
    synthesizer: SynthesizerAgent,
    registry: SessionRegistry,
    store: Option<Arc<dyn SessionStore>>,
    events: Option<EventSender>,
}

/// Mutable state of one session run.
struct Run {
    session: Session,
    tracker: ProgressTracker,
    report: ResearchReport,
    cancel: CancellationToken,
    started: Instant,
    stage_error: Option<String>,
    _registration: Registration,
}

impl Run {
    fn charge(&mut self, response: &AgentResponse) {
        self.session.charge(response.cost, &response.usage);
    }
}

impl Orchestrator {
    /// Creates an orchestrator with the provider named in `config`.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::UnsupportedProvider`] for unknown providers.
    pub fn new(config: ResearchConfig) -> Result<Self> {
        let provider = create_provider(&config)?;
        Ok(Self::with_provider(config, provider))
    }

    /// Creates an orchestrator around an existing provider.
    ///
    /// Loads prompt templates from [`ResearchConfig::prompt_dir`], falling
    /// back to compiled-in defaults, and creates fresh rate limiters from
    /// the configured limits.
    pub fn with_provider(config: ResearchConfig, provider: Arc<dyn LlmProvider>) -> Self {
        let prompts = PromptSet::load(config.prompt_dir.as_deref());
        Self {
            planner: PlannerAgent::new(&config, prompts.planner),
            searcher: SearcherAgent::new(&config, prompts.searcher),
            synthesizer: SynthesizerAgent::new(&config, prompts.synthesizer),
            limiter: Arc::new(RateLimiter::new(config.rate_limit, config.rate_period)),
            search_limiter: Arc::new(RateLimiter::new(
                config.search_rate_limit,
                config.search_rate_period,
            )),
            config,
            provider,
            search: None,
            evaluator: QualityEvaluator::new(),
            registry: SessionRegistry::new(),
            store: None,
            events: None,
        }
    }

    /// Uses a search service instead of the searcher agent.
    #[must_use]
    pub fn with_search_provider(mut self, search: Arc<dyn SearchProvider>) -> Self {
        self.search = Some(search);
        self
    }

    /// Shares a completion-service limiter with other orchestrators.
    #[must_use]
    pub fn with_rate_limiter(mut self, limiter: Arc<RateLimiter>) -> Self {
        self.limiter = limiter;
        self
    }

    /// Shares a search-service limiter with other orchestrators.
    #[must_use]
    pub fn with_search_rate_limiter(mut self, limiter: Arc<RateLimiter>) -> Self {
        self.search_limiter = limiter;
        self
    }

    /// Replaces the agents' system prompts.
    #[must_use]
    pub fn with_prompts(mut self, prompts: PromptSet) -> Self {
        self.planner = PlannerAgent::new(&self.config, prompts.planner);
        self.searcher = SearcherAgent::new(&self.config, prompts.searcher);
        self.synthesizer = SynthesizerAgent::new(&self.config, prompts.synthesizer);
        self
    }

    /// Replaces the source evaluator.
    #[must_use]
    pub fn with_evaluator(mut self, evaluator: QualityEvaluator) -> Self {
        self.evaluator = evaluator;
        self
    }

    /// Shares a session registry.
    #[must_use]
    pub fn with_registry(mut self, registry: SessionRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Hands terminal sessions to a persistence collaborator.
    #[must_use]
    pub fn with_session_store(mut self, store: Arc<dyn SessionStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Sends every session's progress events to `sink`.
    #[must_use]
    pub fn with_event_sink(mut self, sink: EventSender) -> Self {
        self.events = Some(sink);
        self
    }

    /// Active configuration.
    #[must_use]
    pub const fn config(&self) -> &ResearchConfig {
        &self.config
    }

    /// Registry of active sessions.
    #[must_use]
    pub const fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    /// Completion-service limiter.
    #[must_use]
    pub const fn rate_limiter(&self) -> &Arc<RateLimiter> {
        &self.limiter
    }

    /// Runs one research session to completion.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidQuery`] for empty or oversized
    /// queries, and [`PipelineError::Orchestration`] when a stage with the
    /// `Abort` policy fails. The latter carries the partial report.
    pub async fn run(&self, query: &str) -> Result<ResearchReport> {
        self.run_cancellable(query, CancellationToken::new()).await
    }

    /// Runs one research session that stops when `cancel` fires.
    ///
    /// The session also registers a child token, so
    /// [`SessionRegistry::cancel`] stops it as well. Cancellation
    /// interrupts rate-limit waits and in-flight calls, and no later stage
    /// is started.
    ///
    /// # Errors
    ///
    /// As [`Orchestrator::run`], plus [`PipelineError::Cancelled`] carrying
    /// the partial report.
    pub async fn run_cancellable(
        &self,
        query: &str,
        cancel: CancellationToken,
    ) -> Result<ResearchReport> {
        validate_query(query)?;

        let mut session = Session::new(query.trim(), self.config.stages.clone());
        let tracker = ProgressTracker::new(
            session.id(),
            session.stages().len(),
            self.events.clone(),
        );
        session.transition(ResearchState::InProgress)?;
        let cancel = cancel.child_token();
        let registration = self
            .registry
            .register_scoped(session.snapshot(), cancel.clone());
        let mut run = Run {
            report: ResearchReport::new(&session),
            session,
            tracker,
            cancel,
            started: Instant::now(),
            stage_error: None,
            _registration: registration,
        };
        info!(
            session_id = %run.session.id(),
            stages = run.session.stages().len(),
            "research session started"
        );

        let stages = run.session.stages().to_vec();
        let mut last_started: Option<StageName> = None;
        for (index, stage) in stages.into_iter().enumerate() {
            if run.cancel.is_cancelled() {
                return self.finish_cancelled(run, last_started).await;
            }
            last_started = Some(stage);
            run.session.enter_stage(index);
            self.registry.update(run.session.snapshot());
            run.tracker.update_step(
                stage.as_str(),
                0.0,
                format!("{stage} started"),
                ResearchState::InProgress,
                Map::new(),
            );

            let stage_started = Instant::now();
            let cost_before = run.session.accumulated_cost();
            let usage_before = run.session.usage();
            let result = match stage {
                StageName::Plan => self.plan_stage(&mut run).await,
                StageName::Search => self.search_stage(&mut run).await,
                StageName::Synthesize => self.synthesize_stage(&mut run).await,
            };
            let mut record = StageRecord {
                stage,
                outcome: StageOutcome::Completed,
                cost: run.session.accumulated_cost() - cost_before,
                usage: usage_delta(usage_before, run.session.usage()),
                error: run.stage_error.take(),
                elapsed: stage_started.elapsed(),
            };

            match result {
                Ok(()) => {
                    run.tracker
                        .complete_step(stage.as_str(), format!("{stage} completed"));
                    info!(
                        session_id = %run.session.id(),
                        stage = %stage,
                        cost = record.cost,
                        "stage completed"
                    );
                }
                Err(err) if err.is_cancelled() => {
                    record.outcome = StageOutcome::Cancelled;
                    run.report.stages.push(record);
                    return self.finish_cancelled(run, Some(stage)).await;
                }
                Err(err) => {
                    run.tracker.fail_step(stage.as_str(), err.to_string());
                    record.error = Some(err.to_string());
                    let recoverable = matches!(err, PipelineError::StageParse { .. });
                    if recoverable || self.config.policy(stage) == FailurePolicy::Fallback {
                        warn!(
                            session_id = %run.session.id(),
                            stage = %stage,
                            error = %err,
                            "stage failed, using fallback output"
                        );
                        apply_fallback(&mut run, stage);
                        record.outcome = StageOutcome::Fallback;
                        run.tracker.complete_step(
                            stage.as_str(),
                            format!("{stage} completed with fallback output"),
                        );
                    } else {
                        warn!(
                            session_id = %run.session.id(),
                            stage = %stage,
                            error = %err,
                            "stage failed, aborting session"
                        );
                        record.outcome = StageOutcome::Failed;
                        run.report.stages.push(record);
                        return self.finish_failed(run, stage, err).await;
                    }
                }
            }
            run.report.stages.push(record);
        }

        run.session.transition(ResearchState::Completed)?;
        let report = self.close(run).await;
        info!(
            session_id = %report.session_id,
            cost = report.total_cost,
            tokens = report.usage.total_tokens,
            elapsed_ms = u64::try_from(report.elapsed.as_millis()).unwrap_or(u64::MAX),
            "research session completed"
        );
        Ok(report)
    }

    fn call_context<'a>(&'a self, cancel: &'a CancellationToken) -> CallContext<'a> {
        CallContext {
            provider: self.provider.as_ref(),
            limiter: self.limiter.as_ref(),
            pricing: &self.config.pricing,
            timeout: self.config.timeout,
            cancel,
        }
    }

    async fn plan_stage(&self, run: &mut Run) -> Result<()> {
        let prompt = build_planner_prompt(run.session.query(), self.planner.max_sub_questions());
        let response = self
            .planner
            .execute(&self.call_context(&run.cancel), &prompt)
            .await?;
        run.charge(&response);

        let plan = self.planner.parse_plan(&response.content)?;
        debug!(
            session_id = %run.session.id(),
            sub_questions = plan.sub_questions.len(),
            "plan parsed"
        );
        run.report.plan = Some(plan);
        Ok(())
    }

    #[allow(clippy::cast_precision_loss)]
    async fn search_stage(&self, run: &mut Run) -> Result<()> {
        let query = run.session.query().to_string();
        let sub_questions = sub_questions_for(&run.report, &query);
        let total = sub_questions.len();

        let mut seen: HashSet<String> = HashSet::new();
        let mut scored: Vec<RankedSource> = Vec::new();
        let mut retrieved = 0usize;

        for (i, sub_question) in sub_questions.iter().enumerate() {
            let found = match self.retrieve(run, &query, sub_question).await {
                Ok(found) => found,
                Err(err) => {
                    // Sources scored for earlier sub-questions stay in the report.
                    run.report.sources = rank_sources(
                        scored,
                        self.config.min_source_score,
                        self.config.max_sources,
                    );
                    return Err(err);
                }
            };
            retrieved += found.len();

            let mut added = 0usize;
            for source in found {
                let key = source.url.trim().to_string();
                if !key.is_empty() && !seen.insert(key) {
                    continue;
                }
                let score = self.evaluator.evaluate(&source, sub_question);
                scored.push(RankedSource {
                    source,
                    score,
                    sub_question: sub_question.clone(),
                });
                added += 1;
            }

            let mut metadata = Map::new();
            metadata.insert(
                "sub_question".to_string(),
                Value::from(sub_question.as_str()),
            );
            metadata.insert("new_sources".to_string(), Value::from(added));
            // The final share of the step is left for ranking.
            run.tracker.update_step(
                StageName::Search.as_str(),
                (i + 1) as f64 / (total + 1) as f64,
                format!("searched {} of {total} sub-questions", i + 1),
                ResearchState::InProgress,
                metadata,
            );
        }

        let unique = scored.len();
        let ranked = rank_sources(scored, self.config.min_source_score, self.config.max_sources);
        run.report.search_summary = Some(format!(
            "Retained {} of {unique} unique sources ({retrieved} retrieved) across {total} sub-questions",
            ranked.len()
        ));
        run.report.sources = ranked;
        Ok(())
    }

    /// Candidate sources for one sub-question.
    ///
    /// Malformed searcher output is recorded with `fail_step` and counts
    /// as no sources. That resets the search step to zero until the
    /// caller's next fractional update restores it.
    async fn retrieve(
        &self,
        run: &mut Run,
        query: &str,
        sub_question: &str,
    ) -> Result<Vec<CandidateSource>> {
        if let Some(search) = &self.search {
            return self
                .search_service(search.as_ref(), &run.cancel, sub_question)
                .await;
        }

        let prompt = build_searcher_prompt(query, sub_question);
        let response = self
            .searcher
            .execute(&self.call_context(&run.cancel), &prompt)
            .await?;
        run.charge(&response);

        match SearcherAgent::parse_sources(&response.content) {
            Ok(sources) => Ok(sources),
            Err(err) => {
                warn!(
                    session_id = %run.session.id(),
                    sub_question,
                    error = %err,
                    "discarding malformed searcher output"
                );
                run.tracker
                    .fail_step(StageName::Search.as_str(), err.to_string());
                run.stage_error.get_or_insert_with(|| err.to_string());
                Ok(Vec::new())
            }
        }
    }

    async fn search_service(
        &self,
        search: &dyn SearchProvider,
        cancel: &CancellationToken,
        sub_question: &str,
    ) -> Result<Vec<CandidateSource>> {
        tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(PipelineError::cancelled()),
            () = self.search_limiter.acquire() => {}
        }

        let sources = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(PipelineError::cancelled()),
            result = tokio::time::timeout(self.config.timeout, search.search(sub_question)) => {
                result.map_err(|_| {
                    PipelineError::call(format!(
                        "{} search timed out after {}s",
                        search.name(),
                        self.config.timeout.as_secs_f64()
                    ))
                })??
            }
        };
        debug!(
            provider = search.name(),
            sources = sources.len(),
            "search call complete"
        );
        Ok(sources)
    }

    async fn synthesize_stage(&self, run: &mut Run) -> Result<()> {
        let prompt = build_synthesizer_prompt(
            run.session.query(),
            run.report.plan.as_ref(),
            &run.report.sources,
        );
        let response = self
            .synthesizer
            .execute(&self.call_context(&run.cancel), &prompt)
            .await?;
        run.charge(&response);

        if response.finish_reason.as_deref() == Some("length") {
            warn!(session_id = %run.session.id(), "synthesizer output truncated at max tokens");
        }
        run.report.report = Some(SynthesizerAgent::parse_report(&response.content)?);
        Ok(())
    }

    async fn finish_failed(
        &self,
        mut run: Run,
        stage: StageName,
        source: PipelineError,
    ) -> Result<ResearchReport> {
        run.session.transition(ResearchState::Failed)?;
        let partial = self.close(run).await;
        Err(PipelineError::Orchestration {
            stage,
            source: Box::new(source),
            partial: Box::new(partial),
        })
    }

    /// Ends a cancelled session.
    ///
    /// `stage` is the last stage that started; no `Cancelled` update is
    /// recorded when none did.
    async fn finish_cancelled(
        &self,
        mut run: Run,
        stage: Option<StageName>,
    ) -> Result<ResearchReport> {
        if let Some(stage) = stage {
            run.tracker
                .cancel_step(stage.as_str(), format!("{stage} cancelled"));
        }
        run.session.transition(ResearchState::Cancelled)?;
        let partial = self.close(run).await;
        info!(
            session_id = %partial.session_id,
            stage = stage.map_or("none", StageName::as_str),
            "research session cancelled"
        );
        Err(PipelineError::Cancelled {
            partial: Some(Box::new(partial)),
        })
    }

    /// Finalizes the report, deregisters the session and persists it.
    async fn close(&self, run: Run) -> ResearchReport {
        let Run {
            session,
            tracker,
            mut report,
            started,
            ..
        } = run;

        report.state = session.state();
        report.total_cost = session.accumulated_cost();
        report.usage = session.usage();
        report.overall_progress = tracker.overall_progress();
        report.elapsed = started.elapsed();

        let snapshot = session.snapshot();
        self.registry.remove(snapshot.id);
        if let Some(store) = &self.store
            && let Err(err) = store.save(&snapshot, &report).await
        {
            warn!(session_id = %snapshot.id, error = %err, "failed to persist session");
        }
        report
    }
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("provider", &self.provider.name())
            .field("search", &self.search.as_ref().map(|s| s.name()))
            .field("config", &self.config)
            .field("active_sessions", &self.registry.len())
            .finish_non_exhaustive()
    }
}

fn validate_query(query: &str) -> Result<()> {
    if query.trim().is_empty() {
        return Err(PipelineError::InvalidQuery {
            message: "query cannot be empty".to_string(),
        });
    }
    if query.len() > MAX_QUERY_LEN {
        return Err(PipelineError::InvalidQuery {
            message: format!(
                "query exceeds maximum length ({} bytes, max {MAX_QUERY_LEN})",
                query.len()
            ),
        });
    }
    Ok(())
}

/// Plan sub-questions, or the raw query when there is no plan.
fn sub_questions_for(report: &ResearchReport, query: &str) -> Vec<String> {
    report
        .plan
        .as_ref()
        .map(|p| p.sub_questions.clone())
        .filter(|q| !q.is_empty())
        .unwrap_or_else(|| vec![query.to_string()])
}

/// Drops sources below `min_score`, orders the rest best first and keeps
/// at most `max_sources`.
///
/// Ties on overall score are broken by confidence, then by retrieval order.
fn rank_sources(scored: Vec<RankedSource>, min_score: f64, max_sources: usize) -> Vec<RankedSource> {
    let mut ranked: Vec<RankedSource> = scored
        .into_iter()
        .filter(|r| r.score.overall() >= min_score)
        .collect();
    ranked.sort_by(|a, b| {
        b.score
            .overall()
            .total_cmp(&a.score.overall())
            .then_with(|| b.score.confidence().total_cmp(&a.score.confidence()))
    });
    ranked.truncate(max_sources);
    ranked
}

fn apply_fallback(run: &mut Run, stage: StageName) {
    let query = run.session.query().to_string();
    match stage {
        StageName::Plan => run.report.plan = Some(fallback_plan(&query)),
        StageName::Search => {
            let sub_questions = sub_questions_for(&run.report, &query);
            run.report.search_summary = Some(fallback_search_summary(
                &query,
                &sub_questions,
                run.report.sources.len(),
            ));
        }
        StageName::Synthesize => {
            run.report.report = Some(fallback_report(
                &query,
                run.report.plan.as_ref(),
                &run.report.sources,
            ));
        }
    }
}

const fn usage_delta(before: TokenUsage, after: TokenUsage) -> TokenUsage {
    TokenUsage {
        prompt_tokens: after.prompt_tokens.saturating_sub(before.prompt_tokens),
        completion_tokens: after
            .completion_tokens
            .saturating_sub(before.completion_tokens),
        total_tokens: after.total_tokens.saturating_sub(before.total_tokens),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::quality::{Dimension, QualityScore};

    fn ranked(url: &str, overall_dims: f64, confidence: f64) -> RankedSource {
        let dims: BTreeMap<Dimension, f64> =
            Dimension::ALL.into_iter().map(|d| (d, overall_dims)).collect();
        RankedSource {
            source: CandidateSource::new(url, url),
            score: QualityScore::from_dimensions(dims, confidence, Vec::new()),
            sub_question: "q".to_string(),
        }
    }

    fn urls(sources: &[RankedSource]) -> Vec<&str> {
        sources.iter().map(|r| r.source.url.as_str()).collect()
    }

    #[test]
    fn test_validate_query() {
        assert!(validate_query("solar power").is_ok());
        assert!(matches!(
            validate_query("   "),
            Err(PipelineError::InvalidQuery { .. })
        ));
        assert!(validate_query(&"x".repeat(MAX_QUERY_LEN + 1)).is_err());
    }

    #[test]
    fn test_rank_sources_orders_and_filters() {
        let scored = vec![
            ranked("low", 0.2, 1.0),
            ranked("mid", 0.6, 0.5),
            ranked("high", 0.9, 0.5),
            ranked("mid-confident", 0.6, 0.9),
        ];
        let result = rank_sources(scored, 0.4, 10);
        assert_eq!(urls(&result), vec!["high", "mid-confident", "mid"]);
    }

    #[test]
    fn test_rank_sources_keeps_retrieval_order_on_ties() {
        let scored = vec![
            ranked("first", 0.6, 0.7),
            ranked("second", 0.6, 0.7),
            ranked("third", 0.6, 0.7),
        ];
        let result = rank_sources(scored, 0.0, 2);
        assert_eq!(urls(&result), vec!["first", "second"]);
    }

    #[test]
    fn test_usage_delta() {
        let before = TokenUsage {
            prompt_tokens: 10,
            completion_tokens: 5,
            total_tokens: 15,
        };
        let after = TokenUsage {
            prompt_tokens: 30,
            completion_tokens: 10,
            total_tokens: 40,
        };
        let delta = usage_delta(before, after);
        assert_eq!(delta.total_tokens, 25);
        assert_eq!(delta.prompt_tokens, 20);
    }

    #[test]
    fn test_sub_questions_default_to_query() {
        let session = Session::new("solar", vec![StageName::Search]);
        let report = ResearchReport::new(&session);
        assert_eq!(sub_questions_for(&report, "solar"), vec!["solar".to_string()]);
    }
}

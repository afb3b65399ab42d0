//! Research pipeline: sessions, stages and the orchestrator.
//!
//! ```text
//! run(query)
//!   ├── plan        PlannerAgent → ResearchPlan
//!   ├── search      SearchProvider | SearcherAgent → QualityEvaluator → ranked sources
//!   └── synthesize  SynthesizerAgent → markdown report
//! ```

pub mod fallback;
pub mod orchestrator;
pub mod registry;
pub mod report;
pub mod session;
pub mod stage;

pub use orchestrator::Orchestrator;
pub use registry::{Registration, SessionRegistry};
pub use report::{RankedSource, ResearchPlan, ResearchReport, StageOutcome, StageRecord};
pub use session::{ResearchState, Session, SessionSnapshot, SessionStore};
pub use stage::{DEFAULT_STAGES, FailurePolicy, StageName};

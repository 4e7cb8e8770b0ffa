//! # Faultloc Locator
//!
//! Turns an issue description into a small ranked set of candidate edit
//! locations, under a per-instance time and cost budget.
//!
//! ## Pipeline
//!
//! ```text
//! issue text ──> CueExtractor ──> normalize_cues ──> Classifier
//!                                                       │
//!        ┌───────────────┬──────────────────────────────┼──────────────────┐
//!        ▼               ▼                              ▼                  ▼
//!  FULL_LOCATION      PARTIAL                         HINT              NO_HINT
//!  FullLocation-      PartialReasoner ──(reroute)──>  Retriever  <────  Retriever
//!  Resolver           (CandidateReasoner)             hint_candidates   + import expansion
//!        │               │                              │                  │
//!        └───────────────┴──────────> CandidateGroup[] <┴──────────────────┘
//! ```
//!
//! The [`BudgetManager`] is charged after every external call and checked
//! after every stage. Optional stages consult its degradation flags.
//!
//! ## Example
//!
//! ```no_run
//! use faultloc_locator::{
//!     Capabilities, FaultlocConfig, InstanceRequest, Locator, NoopSink,
//! };
//!
//! # async fn run(capabilities: Capabilities) -> faultloc_locator::Result<()> {
//! let locator = Locator::new(FaultlocConfig::default(), capabilities);
//! let request = InstanceRequest {
//!     instance_id: "demo-1",
//!     problem_statement: "ZeroDivisionError in `calc.py` line 5",
//!     patch: None,
//!     topk: 2,
//! };
//! let result = locator
//!     .run_instance(request, std::path::Path::new("/repos/demo-1"), &NoopSink)
//!     .await?;
//! for group in &result.candidates {
//!     println!("#{} {:.2} {} locations", group.rank, group.score, group.locations.len());
//! }
//! # Ok(())
//! # }
//! ```

pub mod artifacts;
mod budget;
mod capabilities;
mod classifier;
mod config;
mod cues;
mod error;
pub mod eval;
mod full_location;
mod hint;
mod matching;
mod partial;
mod pipeline;
mod retrieval;
mod types;

pub use artifacts::{ArtifactSink, NoopSink};
pub use budget::{BudgetManager, BudgetSnapshot};
pub use capabilities::{
    CandidateReasoner, CandidateSummary, ClassificationVerdict, CueExtractor, Extraction,
    IssueClassifier, ReasonedGroup, ReasoningRequest, ReasoningResponse, SymbolSummary,
};
pub use classifier::{
    Classification, ClassificationDetails, Classifier, DecisionRule, MatchCounts, SymbolMatch,
};
pub use config::{EmbedBackend, FaultlocConfig, ScoringConfig};
pub use cues::normalize_cues;
pub use error::{BudgetExceeded, BudgetKind, LocatorError, Result};
pub use full_location::FullLocationResolver;
pub use hint::{expand_with_import_graph, hint_candidates, rank_files};
pub use matching::{lexical_overlap, match_class, match_function};
pub use partial::{
    build_candidate_summaries, PartialFallback, PartialOutcome, PartialReasoner, ScopedSymbols,
};
pub use pipeline::{reroute_query, Capabilities, InstanceRequest, InstanceResult, Locator};
pub use retrieval::{EmbeddedCounts, RetrievalBuildMeta, Retriever};
pub use types::{
    scalar_to_string, BuggyLocation, CandidateGroup, Category, CueBundle, LocationKind,
    NormalizedCues,
};

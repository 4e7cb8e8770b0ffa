//! Contracts for the external language capabilities the pipeline consumes.
//!
//! Implementations own transport, prompting and retries. The pipeline only
//! sees the typed results below and the token usage used for budgeting.

use crate::error::Result;
use crate::types::{scalar_to_string, Category, CueBundle};
use async_trait::async_trait;
use faultloc_symbols::Span;
use faultloc_vector_store::TokenUsage;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Mentions extracted from an issue, plus the untouched response for artifacts
#[derive(Debug, Clone, Default)]
pub struct Extraction {
    pub cues: CueBundle,
    pub usage: Option<TokenUsage>,
    pub raw: Value,
}

#[async_trait]
pub trait CueExtractor: Send + Sync {
    async fn extract(&self, problem_statement: &str) -> Result<Extraction>;
}

/// Advisory category verdict
#[derive(Debug, Clone, Serialize)]
pub struct ClassificationVerdict {
    pub category: Category,
    pub reason: String,
    #[serde(skip)]
    pub usage: Option<TokenUsage>,
}

#[async_trait]
pub trait IssueClassifier: Send + Sync {
    async fn classify(&self, problem_statement: &str) -> Result<ClassificationVerdict>;
}

/// Compact view of one symbol handed to the reasoner
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SymbolSummary {
    pub qualname: String,
    pub name: String,
    pub kind: String,
    pub span: Span,
    pub calls: Vec<String>,
    pub excerpt: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CandidateSummary {
    pub candidate_id: usize,
    pub file: String,
    pub summary: SymbolSummary,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReasoningRequest {
    pub problem_statement: String,
    pub candidates: Vec<CandidateSummary>,
}

/// One group proposed by the reasoner
#[derive(Debug, Clone, PartialEq)]
pub struct ReasonedGroup {
    pub score: f64,
    pub candidate_ids: Vec<usize>,
    pub why: Option<String>,
}

/// Reasoner verdict over a set of candidate summaries
#[derive(Debug, Clone, Default)]
pub struct ReasoningResponse {
    /// Upper-cased; `OK` when absent
    pub decision: String,
    pub why: String,
    pub hint_terms: Vec<String>,
    /// `None` when the response carried something other than a list
    pub groups: Option<Vec<ReasonedGroup>>,
    pub usage: Option<TokenUsage>,
    pub raw: Value,
}

impl ReasoningResponse {
    /// Lenient conversion from a capability's JSON object
    #[must_use]
    pub fn from_json(raw: Value, usage: Option<TokenUsage>) -> Self {
        let decision = raw
            .get("decision")
            .and_then(scalar_to_string)
            .map(|d| d.trim().to_uppercase())
            .unwrap_or_else(|| "OK".to_string());
        let why = raw
            .get("why")
            .and_then(scalar_to_string)
            .unwrap_or_default();
        let hint_terms = raw
            .get("hint_terms")
            .and_then(Value::as_array)
            .map(|terms| terms.iter().filter_map(scalar_to_string).collect())
            .unwrap_or_default();
        let groups = match raw.get("groups") {
            None | Some(Value::Null) => Some(Vec::new()),
            Some(Value::Array(items)) => Some(items.iter().map(parse_group).collect()),
            Some(_) => None,
        };

        Self {
            decision,
            why,
            hint_terms,
            groups,
            usage,
            raw,
        }
    }

    /// The reasoner found no true edit location among the candidates
    #[must_use]
    pub fn wants_reroute(&self) -> bool {
        self.decision == "HINT" || self.groups.as_ref().map_or(true, Vec::is_empty)
    }
}

fn parse_group(value: &Value) -> ReasonedGroup {
    let score = value
        .get("score")
        .and_then(|s| s.as_f64().or_else(|| s.as_str().and_then(|t| t.trim().parse().ok())))
        .unwrap_or(0.5);
    let candidate_ids = value
        .get("candidate_ids")
        .and_then(Value::as_array)
        .map(|ids| {
            ids.iter()
                .filter_map(|id| {
                    id.as_u64()
                        .or_else(|| id.as_str().and_then(|t| t.trim().parse().ok()))
                })
                .filter_map(|id| usize::try_from(id).ok())
                .collect()
        })
        .unwrap_or_default();
    let why = value.get("why").and_then(scalar_to_string);

    ReasonedGroup {
        score,
        candidate_ids,
        why,
    }
}

#[async_trait]
pub trait CandidateReasoner: Send + Sync {
    async fn reason(&self, request: &ReasoningRequest) -> Result<ReasoningResponse>;
}

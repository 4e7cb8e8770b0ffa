use crate::budget::BudgetManager;
use crate::capabilities::{CandidateReasoner, CandidateSummary, ReasoningRequest, SymbolSummary};
use crate::config::ScoringConfig;
use crate::error::Result;
use crate::matching::{class_element_matches, function_matches};
use crate::types::{BuggyLocation, CandidateGroup, LocationKind, NormalizedCues};
use faultloc_indexer::RepoIndex;
use faultloc_symbols::SymbolEntry;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};

pub const RESOLVED_FILE_CAP: usize = 60;
pub const UNSCOPED_FILE_CAP: usize = 200;
pub const MAX_CANDIDATES: usize = 30;
pub const EXCERPT_MAX_LINES: usize = 80;
pub const EXCERPT_MAX_CHARS: usize = 5000;
pub const MAX_CALLS: usize = 20;

const FALLBACK_FUNCTIONS: usize = 8;
const FALLBACK_CLASS_ELEMENTS: usize = 4;
const FALLBACK_MODULE_SYMBOLS: usize = 2;

static CALL_TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b([A-Za-z_][A-Za-z0-9_]*)\s*\(").expect("valid regex"));

/// Why the reasoner handed the instance over to retrieval
#[derive(Debug, Clone, Serialize)]
pub struct PartialFallback {
    pub fallback_to: &'static str,
    pub why: String,
    pub hint_terms: Vec<String>,
    pub raw_model_output: Value,
}

#[derive(Debug, Clone)]
pub enum PartialOutcome {
    Groups(Vec<CandidateGroup>),
    Reroute(PartialFallback),
}

/// Per-file symbols offered to the reasoner, in scope order
pub type ScopedSymbols<'a> = Vec<(&'a str, Vec<&'a SymbolEntry>)>;

/// Candidate generator for issues with incomplete location cues
pub struct PartialReasoner<'a> {
    index: &'a RepoIndex,
    scoring: &'a ScoringConfig,
    reasoner: &'a dyn CandidateReasoner,
}

impl<'a> PartialReasoner<'a> {
    #[must_use]
    pub fn new(
        index: &'a RepoIndex,
        scoring: &'a ScoringConfig,
        reasoner: &'a dyn CandidateReasoner,
    ) -> Self {
        Self {
            index,
            scoring,
            reasoner,
        }
    }

    /// Ask the reasoner to pick edit locations, or group heuristically.
    ///
    /// When the reasoner's groups all reference unknown candidates, the
    /// heuristic grouping is used instead; there is no second reasoner call.
    pub async fn run(
        &self,
        problem_statement: &str,
        cues: &NormalizedCues,
        topk: usize,
        max_locs: usize,
        budget: &mut BudgetManager,
    ) -> Result<PartialOutcome> {
        let scoped = self.scoped_symbols(cues);
        let summaries = build_candidate_summaries(self.index, &scoped, MAX_CANDIDATES);

        if !budget.allow_ast_reasoning() || summaries.is_empty() {
            log::debug!(
                "Heuristic partial grouping (reasoning allowed: {}, {} summaries)",
                budget.allow_ast_reasoning(),
                summaries.len()
            );
            return Ok(PartialOutcome::Groups(self.heuristic_groups(
                &scoped, topk, max_locs,
            )));
        }

        let request = ReasoningRequest {
            problem_statement: problem_statement.to_string(),
            candidates: summaries,
        };
        let response = self.reasoner.reason(&request).await?;
        budget.add_cost_from_usage(response.usage.as_ref());
        budget.ensure_within_budget()?;

        if response.wants_reroute() {
            log::info!(
                "Reasoner found no edit location ({}); rerouting to retrieval",
                response.decision
            );
            return Ok(PartialOutcome::Reroute(PartialFallback {
                fallback_to: "HINT",
                why: response.why,
                hint_terms: response.hint_terms,
                raw_model_output: response.raw,
            }));
        }

        let by_id: HashMap<usize, &CandidateSummary> = request
            .candidates
            .iter()
            .map(|c| (c.candidate_id, c))
            .collect();
        let mut proposed = response.groups.unwrap_or_default();
        proposed.sort_by(|a, b| b.score.total_cmp(&a.score));

        let mut groups = Vec::new();
        for group in proposed {
            if groups.len() >= topk {
                break;
            }
            let confidence = group.score.clamp(0.0, 1.0);
            let locations: Vec<BuggyLocation> = group
                .candidate_ids
                .iter()
                .filter_map(|id| by_id.get(id))
                .take(max_locs)
                .map(|c| summary_location(c, confidence, group.why.as_deref()))
                .collect();
            if locations.is_empty() {
                continue;
            }
            let mut candidate =
                CandidateGroup::new(groups.len() + 1, group.score, "PARTIAL_AST", locations);
            candidate
                .rationale
                .insert("why".to_string(), json!(group.why));
            groups.push(candidate);
        }

        if groups.is_empty() {
            log::warn!("Reasoner groups referenced no known candidates; grouping heuristically");
            return Ok(PartialOutcome::Groups(self.heuristic_groups(
                &scoped, topk, max_locs,
            )));
        }
        Ok(PartialOutcome::Groups(groups))
    }

    fn scoped_symbols(&self, cues: &NormalizedCues) -> ScopedSymbols<'a> {
        let resolved = self.index.files.resolve_file_candidates(&cues.file_candidates);
        let files: Vec<String> = if resolved.is_empty() {
            self.index.files.prefix(UNSCOPED_FILE_CAP).to_vec()
        } else {
            resolved
        };

        let mut scoped = Vec::new();
        for rel in files.iter().take(RESOLVED_FILE_CAP) {
            let Some(symbols) = self.index.file_symbols(rel) else {
                continue;
            };
            let mut picked = function_matches(symbols, &cues.function_candidates, &[]);
            picked.extend(class_element_matches(symbols, &cues.class_candidates));
            if picked.is_empty() {
                picked = symbols
                    .functions
                    .iter()
                    .take(FALLBACK_FUNCTIONS)
                    .chain(symbols.class_elements.iter().take(FALLBACK_CLASS_ELEMENTS))
                    .chain(symbols.module_symbols.iter().take(FALLBACK_MODULE_SYMBOLS))
                    .collect();
            }
            scoped.push((symbols.file.as_str(), picked));
        }
        scoped
    }

    fn heuristic_groups(
        &self,
        scoped: &ScopedSymbols<'_>,
        topk: usize,
        max_locs: usize,
    ) -> Vec<CandidateGroup> {
        let confidence = self.scoring.partial_heuristic_confidence;
        let mut groups = Vec::new();
        for (file, symbols) in scoped.iter().take(topk) {
            let locations: Vec<BuggyLocation> = symbols
                .iter()
                .take(max_locs)
                .map(|entry| {
                    BuggyLocation::from_symbol(file, entry, confidence)
                        .with_evidence("mode", "PARTIAL_HEURISTIC")
                })
                .collect();
            if locations.is_empty() {
                continue;
            }
            groups.push(CandidateGroup::new(
                groups.len() + 1,
                confidence,
                "PARTIAL_HEURISTIC",
                locations,
            ));
        }
        groups
    }
}

fn summary_location(c: &CandidateSummary, confidence: f64, why: Option<&str>) -> BuggyLocation {
    let s = &c.summary;
    let kind = match s.kind.as_str() {
        "FUNCTION" => LocationKind::Function,
        "CLASS_ELEMENT" => LocationKind::ClassElement,
        _ => LocationKind::ModuleSymbol,
    };
    BuggyLocation {
        kind,
        file_path: c.file.clone(),
        qualified_name: Some(s.qualname.clone()),
        span: s.span,
        anchor_line: None,
        confidence,
        evidence: serde_json::Map::new(),
    }
    .with_evidence("mode", "PARTIAL_AST")
    .with_evidence("why", json!(why))
}

/// Summaries for the scoped symbols, numbered from 1 in scope order.
///
/// Files that cannot be read are skipped without consuming ids.
#[must_use]
pub fn build_candidate_summaries(
    index: &RepoIndex,
    scoped: &ScopedSymbols<'_>,
    max_candidates: usize,
) -> Vec<CandidateSummary> {
    let mut out = Vec::new();
    for (file, symbols) in scoped {
        if out.len() >= max_candidates {
            break;
        }
        let source = match index.read_source(file) {
            Ok(source) => source,
            Err(e) => {
                log::warn!("Cannot summarise {file}: {e}");
                continue;
            }
        };
        let lines: Vec<&str> = source.lines().collect();
        for entry in symbols {
            if out.len() >= max_candidates {
                break;
            }
            out.push(CandidateSummary {
                candidate_id: out.len() + 1,
                file: (*file).to_string(),
                summary: summarize_symbol(&lines, entry),
            });
        }
    }
    out
}

fn summarize_symbol(lines: &[&str], entry: &SymbolEntry) -> SymbolSummary {
    let start = entry.span.start_line.max(1);
    let end = entry
        .span
        .end_line
        .min(start - 1 + EXCERPT_MAX_LINES)
        .min(lines.len());
    let excerpt = if start <= end {
        lines[start - 1..end].join("\n")
    } else {
        String::new()
    };

    let mut seen = HashSet::new();
    let calls: Vec<String> = CALL_TOKEN
        .captures_iter(&excerpt)
        .map(|c| c[1].to_string())
        .filter(|name| seen.insert(name.clone()))
        .take(MAX_CALLS)
        .collect();

    SymbolSummary {
        qualname: entry.qualified_name.clone(),
        name: entry.name.clone(),
        kind: entry.kind.as_str().to_string(),
        span: entry.span,
        calls,
        excerpt: excerpt.chars().take(EXCERPT_MAX_CHARS).collect(),
    }
}

use super::patch_parser::parse_unified_diff;
use crate::types::CandidateGroup;
use faultloc_indexer::RepoIndex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Outcome of checking ranked groups against a reference patch
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EvaluationReport {
    /// Sorted `(file, qualname)` pairs touched by the patch
    pub gt_symbol_set: Vec<(String, String)>,
    pub exact_match_rank: Option<usize>,
    pub exact_match: bool,
    pub checked_groups: usize,
}

/// Symbols enclosing every changed line of `patch`.
///
/// Lines in files the index does not know, or outside any editable symbol,
/// contribute nothing.
#[must_use]
pub fn ground_truth_symbols(index: &RepoIndex, patch: &str) -> BTreeSet<(String, String)> {
    let mut truth = BTreeSet::new();
    for hunk in parse_unified_diff(patch) {
        let Some(symbols) = index.file_symbols(&hunk.file_path) else {
            log::debug!("Patch touches unindexed file {}", hunk.file_path);
            continue;
        };
        let changed: BTreeSet<usize> = hunk
            .added_lines
            .iter()
            .chain(&hunk.removed_lines)
            .copied()
            .collect();
        for line in changed {
            if let Some(enclosing) = symbols.find_enclosing_symbol(line) {
                truth.insert((hunk.file_path.clone(), enclosing.qualified_name.clone()));
            }
        }
    }
    truth
}

/// First group whose location set equals the ground truth
#[must_use]
pub fn evaluate_against_patch(
    index: &RepoIndex,
    candidates: &[CandidateGroup],
    patch: &str,
) -> EvaluationReport {
    let truth = ground_truth_symbols(index, patch);
    let exact_match_rank = candidates
        .iter()
        .find(|group| {
            let predicted: BTreeSet<(String, String)> =
                group.locations.iter().map(|l| l.symbol_key()).collect();
            predicted == truth
        })
        .map(|group| group.rank);

    EvaluationReport {
        gt_symbol_set: truth.into_iter().collect(),
        exact_match_rank,
        exact_match: exact_match_rank.is_some(),
        checked_groups: candidates.len(),
    }
}

//! Offline scoring of candidate groups against a known fix.

mod evaluator;
mod patch_parser;

pub use evaluator::{evaluate_against_patch, ground_truth_symbols, EvaluationReport};
pub use patch_parser::{parse_unified_diff, PatchHunk};

//! Name matching and lexical scoring shared by the classifier and generators.

use crate::config::ScoringConfig;
use faultloc_symbols::{FileSymbols, SymbolEntry};
use once_cell::sync::Lazy;
use regex::Regex;

static TOKEN_SPLIT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^a-zA-Z0-9_]+").expect("valid regex"));

/// `fn_name` may be `name`, `Class.name` or `module.name`
#[must_use]
pub fn match_function(qualified_name: &str, fn_name: &str) -> bool {
    let base = qualified_name.rsplit('.').next().unwrap_or(qualified_name);
    base == fn_name || qualified_name.ends_with(fn_name) || qualified_name.contains(fn_name)
}

/// The qualified name sits inside `class` (`.C.` infix) or is the class itself
#[must_use]
pub fn match_class(qualified_name: &str, class: &str) -> bool {
    qualified_name.contains(&format!(".{class}.")) || qualified_name.ends_with(&format!(".{class}"))
}

#[must_use]
pub fn matches_any_function(qualified_name: &str, candidates: &[String]) -> bool {
    candidates
        .iter()
        .filter(|f| !f.is_empty())
        .any(|f| match_function(qualified_name, f))
}

#[must_use]
pub fn matches_any_class(qualified_name: &str, candidates: &[String]) -> bool {
    candidates.iter().any(|c| match_class(qualified_name, c))
}

/// Functions in `file` matching a function candidate, narrowed to the class
/// candidates when any exist
#[must_use]
pub fn function_matches<'f>(
    file: &'f FileSymbols,
    function_candidates: &[String],
    class_candidates: &[String],
) -> Vec<&'f SymbolEntry> {
    if function_candidates.is_empty() {
        return Vec::new();
    }
    file.functions
        .iter()
        .filter(|f| {
            matches_any_function(&f.qualified_name, function_candidates)
                && (class_candidates.is_empty()
                    || matches_any_class(&f.qualified_name, class_candidates))
        })
        .collect()
}

/// Class-body elements in `file` belonging to a class candidate
#[must_use]
pub fn class_element_matches<'f>(
    file: &'f FileSymbols,
    class_candidates: &[String],
) -> Vec<&'f SymbolEntry> {
    file.class_elements
        .iter()
        .filter(|e| matches_any_class(&e.qualified_name, class_candidates))
        .collect()
}

/// Bonus for qualified-name and path tokens that appear in the issue text
#[must_use]
pub fn lexical_overlap(
    problem_statement: &str,
    file_path: &str,
    qualified_name: Option<&str>,
    scoring: &ScoringConfig,
) -> f64 {
    let text = problem_statement.to_lowercase();
    let hits = |s: &str| {
        TOKEN_SPLIT
            .split(&s.to_lowercase())
            .filter(|tok| !tok.is_empty() && text.contains(tok))
            .count() as f64
    };

    qualified_name.map_or(0.0, |qn| hits(qn) * scoring.qualname_token_bonus)
        + hits(file_path) * scoring.path_token_bonus
}

/// Editable symbols overlapping `[start - window, end + window]`, ordered by span
#[must_use]
pub fn neighbors_in_file<'a>(
    file: &'a FileSymbols,
    anchor: &SymbolEntry,
    window: usize,
) -> Vec<&'a SymbolEntry> {
    let lo = anchor.span.start_line.saturating_sub(window).max(1);
    let hi = anchor.span.end_line + window;
    let mut out: Vec<&SymbolEntry> = file
        .editable()
        .filter(|s| s.span.overlaps(lo, hi))
        .collect();
    out.sort_by_key(|s| (s.span.start_line, s.span.end_line));
    out
}

use crate::types::{CueBundle, NormalizedCues};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{BTreeSet, HashSet};

static LINE_NUMBER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d{1,7}").expect("valid regex"));
static BACKTICKED: Lazy<Regex> = Lazy::new(|| Regex::new(r"`([^`]{1,120})`").expect("valid regex"));

/// Canonicalise extracted mentions and derive extra candidates.
///
/// Backtick-quoted tokens in `problem_statement` contribute file candidates
/// (`*.py` with a `/`) or module candidates (anything else with a dot).
#[must_use]
pub fn normalize_cues(cues: &CueBundle, problem_statement: &str) -> NormalizedCues {
    let functions: Vec<String> = cues
        .function_mentions
        .iter()
        .map(|f| f.trim().replace("()", "").trim().to_string())
        .filter(|f| !f.is_empty())
        .collect();
    let mut modules = trimmed(&cues.module_mentions);
    let mut file_candidates = trimmed(&cues.file_mentions);
    let mut class_candidates = trimmed(&cues.class_mentions);

    let line_numbers: BTreeSet<usize> = cues
        .line_mentions
        .iter()
        .flat_map(|mention| LINE_NUMBER.find_iter(mention))
        .filter_map(|m| m.as_str().parse().ok())
        .collect();

    for module in &modules {
        file_candidates.push(format!("{}.py", module.replace('.', "/")));
    }

    let mut function_candidates = Vec::with_capacity(functions.len());
    for function in functions {
        if let Some((owner, method)) = split_owner(&function) {
            class_candidates.push(owner.to_string());
            function_candidates.push(function.clone());
            function_candidates.push(method.to_string());
        } else {
            function_candidates.push(function);
        }
    }

    for token in BACKTICKED.captures_iter(problem_statement) {
        let token = &token[1];
        if token.contains('/') && token.ends_with(".py") {
            file_candidates.push(token.to_string());
        } else if token.contains('.') {
            modules.push(token.to_string());
        }
    }

    NormalizedCues {
        file_candidates: dedup(file_candidates),
        module_candidates: dedup(modules),
        class_candidates: dedup(class_candidates),
        function_candidates: dedup(function_candidates),
        line_numbers: line_numbers.into_iter().collect(),
        raw: cues.clone(),
    }
}

/// `Class.method` with exactly one dot and two non-empty halves
fn split_owner(name: &str) -> Option<(&str, &str)> {
    let (owner, method) = name.split_once('.')?;
    if owner.is_empty() || method.is_empty() || method.contains('.') {
        return None;
    }
    Some((owner, method))
}

fn trimmed(items: &[String]) -> Vec<String> {
    items
        .iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn dedup(items: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(item.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn normalizes_every_mention_kind() {
        let cues = CueBundle {
            file_mentions: strings(&[" a.py ", ""]),
            module_mentions: strings(&["pkg.sub.mod"]),
            class_mentions: strings(&["Widget"]),
            function_mentions: strings(&["foo()", "Widget.render", "x.y.z", "  "]),
            line_mentions: strings(&["line 12", "40-42", "12"]),
            other_clues: strings(&["KeyError"]),
        };
        let norm = normalize_cues(&cues, "");

        assert_eq!(norm.file_candidates, strings(&["a.py", "pkg/sub/mod.py"]));
        assert_eq!(norm.module_candidates, strings(&["pkg.sub.mod"]));
        assert_eq!(norm.class_candidates, strings(&["Widget"]));
        assert_eq!(
            norm.function_candidates,
            strings(&["foo", "Widget.render", "render", "x.y.z"])
        );
        assert_eq!(norm.line_numbers, vec![12, 40, 42]);
        assert_eq!(norm.raw, cues);
    }

    #[test]
    fn backticks_seed_files_and_modules() {
        let norm = normalize_cues(
            &CueBundle::default(),
            "Calling `pkg/io/reader.py` through `pkg.io.open` fails; see `reader.py` and `run`.",
        );
        assert_eq!(norm.file_candidates, strings(&["pkg/io/reader.py"]));
        assert_eq!(norm.module_candidates, strings(&["pkg.io.open", "reader.py"]));
        assert!(norm.function_candidates.is_empty());
    }

    #[test]
    fn empty_bundle_has_no_location_parts() {
        let norm = normalize_cues(&CueBundle::default(), "Something is slow.");
        assert!(!norm.has_location_parts());
    }
}

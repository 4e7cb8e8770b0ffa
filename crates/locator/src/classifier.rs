use crate::matching::{class_element_matches, function_matches};
use crate::types::{Category, NormalizedCues};
use faultloc_indexer::RepoIndex;
use faultloc_symbols::{Span, SymbolEntry};
use serde::{Deserialize, Serialize};

/// Files scanned for symbol matches when no file candidate resolves
pub const MATCH_SCAN_FILES: usize = 800;

/// Cap on every audit list in [`ClassificationDetails`]
pub const AUDIT_LIST_CAP: usize = 50;

/// Which rule produced the category
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct DecisionRule {
    pub rule: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enclosing: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function: Option<String>,
}

impl DecisionRule {
    #[must_use]
    pub fn named(rule: &str) -> Self {
        Self {
            rule: rule.to_string(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SymbolMatch {
    pub file: String,
    pub qualname: String,
    pub span: Span,
}

impl SymbolMatch {
    fn new(file: &str, entry: &SymbolEntry) -> Self {
        Self {
            file: file.to_string(),
            qualname: entry.qualified_name.clone(),
            span: entry.span,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct MatchCounts {
    pub resolved_files: usize,
    pub function_matches: usize,
    pub class_element_matches: usize,
}

/// Audit trail of a classification
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClassificationDetails {
    pub decision: DecisionRule,
    pub resolved_files: Vec<String>,
    pub module_candidates: Vec<String>,
    pub function_matches: Vec<SymbolMatch>,
    pub class_element_matches: Vec<SymbolMatch>,
    pub counts: MatchCounts,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Classification {
    pub category: Category,
    pub details: ClassificationDetails,
}

impl Classification {
    /// NO_HINT becomes HINT when the extraction reported free-text clues
    #[must_use]
    pub fn promote_with_clues(mut self, other_clues: &[String]) -> Self {
        if self.category == Category::NoHint && !other_clues.is_empty() {
            self.category = Category::Hint;
            self.details.decision = DecisionRule::named("other_clues_present");
        }
        self
    }
}

/// Deterministic, index-aware category assignment
pub struct Classifier<'a> {
    index: &'a RepoIndex,
}

impl<'a> Classifier<'a> {
    #[must_use]
    pub const fn new(index: &'a RepoIndex) -> Self {
        Self { index }
    }

    /// Apply the rules in priority order; the first that fires wins
    #[must_use]
    pub fn classify(&self, cues: &NormalizedCues) -> Classification {
        let resolved = self.index.files.resolve_file_candidates(&cues.file_candidates);
        let unique_file = (resolved.len() == 1).then(|| resolved[0].as_str());

        let scope: &[String] = if resolved.is_empty() {
            self.index.files.prefix(MATCH_SCAN_FILES)
        } else {
            &resolved
        };

        let mut fn_matches: Vec<(&str, &SymbolEntry)> = Vec::new();
        let mut element_matches: Vec<(&str, &SymbolEntry)> = Vec::new();
        for rel in scope {
            let Some(file) = self.index.file_symbols(rel) else {
                continue;
            };
            fn_matches.extend(
                function_matches(file, &cues.function_candidates, &cues.class_candidates)
                    .into_iter()
                    .map(|f| (rel.as_str(), f)),
            );
            element_matches.extend(
                class_element_matches(file, &cues.class_candidates)
                    .into_iter()
                    .map(|e| (rel.as_str(), e)),
            );
        }

        let details = |decision: DecisionRule| ClassificationDetails {
            decision,
            resolved_files: resolved.iter().take(AUDIT_LIST_CAP).cloned().collect(),
            module_candidates: cues
                .module_candidates
                .iter()
                .take(AUDIT_LIST_CAP)
                .cloned()
                .collect(),
            function_matches: fn_matches
                .iter()
                .take(AUDIT_LIST_CAP)
                .map(|(f, e)| SymbolMatch::new(f, e))
                .collect(),
            class_element_matches: element_matches
                .iter()
                .take(AUDIT_LIST_CAP)
                .map(|(f, e)| SymbolMatch::new(f, e))
                .collect(),
            counts: MatchCounts {
                resolved_files: resolved.len(),
                function_matches: fn_matches.len(),
                class_element_matches: element_matches.len(),
            },
        };
        let decide = |category: Category, decision: DecisionRule| {
            log::debug!("Classified as {category} via {}", decision.rule);
            Classification {
                category,
                details: details(decision),
            }
        };

        if let Some(file) = unique_file {
            if let Some(symbols) = self.index.file_symbols(file) {
                for &line in &cues.line_numbers {
                    if let Some(enclosing) = symbols.find_enclosing_symbol(line) {
                        return decide(
                            Category::FullLocation,
                            DecisionRule {
                                file: Some(file.to_string()),
                                line: Some(line),
                                enclosing: Some(enclosing.qualified_name.clone()),
                                ..DecisionRule::named("file+line")
                            },
                        );
                    }
                }
            }

            if !cues.function_candidates.is_empty() {
                let mut in_file = fn_matches.iter().filter(|(f, _)| *f == file);
                if let (Some((_, only)), None) = (in_file.next(), in_file.next()) {
                    return decide(
                        Category::FullLocation,
                        DecisionRule {
                            file: Some(file.to_string()),
                            function: Some(only.qualified_name.clone()),
                            ..DecisionRule::named("file+function_unique")
                        },
                    );
                }
            }
        }

        if !cues.function_candidates.is_empty()
            && !cues.class_candidates.is_empty()
            && fn_matches.len() == 1
        {
            let (file, only) = fn_matches[0];
            return decide(
                Category::FullLocation,
                DecisionRule {
                    file: Some(file.to_string()),
                    function: Some(only.qualified_name.clone()),
                    ..DecisionRule::named("class+function_unique")
                },
            );
        }

        if cues.has_location_parts() {
            return decide(Category::Partial, DecisionRule::named("has_parts_not_full"));
        }
        decide(Category::NoHint, DecisionRule::named("no_parts"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cues::normalize_cues;
    use crate::types::CueBundle;
    use faultloc_indexer::RepoIndexer;
    use pretty_assertions::assert_eq;
    use std::fs;
    use tempfile::tempdir;

    async fn repo() -> (tempfile::TempDir, RepoIndex) {
        let temp = tempdir().unwrap();
        fs::create_dir_all(temp.path().join("shop")).unwrap();
        fs::write(temp.path().join("shop/__init__.py"), "").unwrap();
        fs::write(
            temp.path().join("shop/cart.py"),
            "TAX = 0.2\n\nclass Cart:\n    items = []\n\n    def total(self):\n        return sum(self.items)\n\n    def add(self, item):\n        self.items.append(item)\n\n\ndef total(values):\n    return sum(values)\n",
        )
        .unwrap();
        fs::write(
            temp.path().join("shop/order.py"),
            "class Order:\n    def total(self):\n        return 0\n",
        )
        .unwrap();
        let (index, _) = RepoIndexer::new(temp.path()).unwrap().build().await.unwrap();
        (temp, index)
    }

    fn classify(index: &RepoIndex, bundle: CueBundle) -> Classification {
        Classifier::new(index).classify(&normalize_cues(&bundle, ""))
    }

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn file_and_line_wins_over_conflicting_cues() {
        let (_temp, index) = repo().await;
        let c = classify(
            &index,
            CueBundle {
                file_mentions: strings(&["cart.py"]),
                function_mentions: strings(&["does_not_exist"]),
                line_mentions: strings(&["7"]),
                ..CueBundle::default()
            },
        );
        assert_eq!(c.category, Category::FullLocation);
        assert_eq!(c.details.decision.rule, "file+line");
        assert_eq!(c.details.decision.enclosing.as_deref(), Some("shop.cart.Cart.total"));
    }

    #[tokio::test]
    async fn unique_function_in_unique_file() {
        let (_temp, index) = repo().await;
        let c = classify(
            &index,
            CueBundle {
                file_mentions: strings(&["shop/cart.py"]),
                function_mentions: strings(&["add"]),
                ..CueBundle::default()
            },
        );
        assert_eq!(c.details.decision.rule, "file+function_unique");
        assert_eq!(c.details.decision.function.as_deref(), Some("shop.cart.Cart.add"));
    }

    #[tokio::test]
    async fn class_and_method_resolve_repo_wide() {
        let (_temp, index) = repo().await;
        let c = classify(
            &index,
            CueBundle {
                function_mentions: strings(&["Order.total"]),
                ..CueBundle::default()
            },
        );
        assert_eq!(c.category, Category::FullLocation);
        assert_eq!(c.details.decision.rule, "class+function_unique");
        assert_eq!(c.details.decision.file.as_deref(), Some("shop/order.py"));
    }

    #[tokio::test]
    async fn ambiguous_cues_are_partial() {
        let (_temp, index) = repo().await;
        let c = classify(
            &index,
            CueBundle {
                function_mentions: strings(&["total"]),
                ..CueBundle::default()
            },
        );
        assert_eq!(c.category, Category::Partial);
        assert_eq!(c.details.decision.rule, "has_parts_not_full");
        assert_eq!(c.details.counts.function_matches, 3);
    }

    #[tokio::test]
    async fn no_cues_is_no_hint_unless_clues_exist() {
        let (_temp, index) = repo().await;
        let c = classify(&index, CueBundle::default());
        assert_eq!(c.category, Category::NoHint);
        assert_eq!(c.details.decision.rule, "no_parts");

        let promoted = c.clone().promote_with_clues(&strings(&["ZeroDivisionError"]));
        assert_eq!(promoted.category, Category::Hint);
        assert_eq!(promoted.details.decision.rule, "other_clues_present");

        let kept = c.promote_with_clues(&[]);
        assert_eq!(kept.category, Category::NoHint);
    }

    #[tokio::test]
    async fn bare_init_mention_never_resolves() {
        let (_temp, index) = repo().await;
        let c = classify(
            &index,
            CueBundle {
                file_mentions: strings(&["__init__.py"]),
                line_mentions: strings(&["1"]),
                ..CueBundle::default()
            },
        );
        assert_eq!(c.category, Category::Partial);
        assert!(c.details.resolved_files.is_empty());
    }
}

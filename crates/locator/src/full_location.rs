use crate::config::ScoringConfig;
use crate::matching::{lexical_overlap, matches_any_class, matches_any_function, neighbors_in_file};
use crate::types::{BuggyLocation, CandidateGroup, NormalizedCues};
use faultloc_indexer::RepoIndex;
use faultloc_symbols::SymbolEntry;
use serde_json::json;
use std::collections::HashSet;

/// Files considered when no file candidate resolves
pub const UNSCOPED_FILE_CAP: usize = 500;
/// Files and per-file module symbols used by the last-resort fallback
pub const MODULE_FALLBACK_FILES: usize = 80;
pub const MODULE_FALLBACK_PER_FILE: usize = 5;

/// Match strength, strongest last so the derived order sorts weakest first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Tier {
    ModuleFallback,
    ClassElement,
    FunctionName,
    LineAnchor,
}

struct Scored<'a> {
    tier: Tier,
    score: f64,
    entry: &'a SymbolEntry,
    location: BuggyLocation,
}

/// Candidate generator for issues that already name the location
pub struct FullLocationResolver<'a> {
    index: &'a RepoIndex,
    scoring: &'a ScoringConfig,
}

impl<'a> FullLocationResolver<'a> {
    #[must_use]
    pub const fn new(index: &'a RepoIndex, scoring: &'a ScoringConfig) -> Self {
        Self { index, scoring }
    }

    pub fn resolve(
        &self,
        problem_statement: &str,
        cues: &NormalizedCues,
        topk: usize,
        max_locs: usize,
    ) -> Vec<CandidateGroup> {
        let resolved = self.index.files.resolve_file_candidates(&cues.file_candidates);
        let files: &[String] = if resolved.is_empty() {
            self.index.files.prefix(UNSCOPED_FILE_CAP)
        } else {
            &resolved
        };

        let mut scored = self.score_matches(problem_statement, cues, files);
        if scored.is_empty() {
            scored = self.module_fallback(problem_statement, files);
        }
        // Stronger evidence first; the emitted score is capped by the group above it.
        scored.sort_by(|a, b| {
            b.tier
                .cmp(&a.tier)
                .then_with(|| b.score.total_cmp(&a.score))
        });

        let mut groups = Vec::new();
        let mut seen = HashSet::new();
        for candidate in scored {
            if groups.len() >= topk {
                break;
            }
            let loc = &candidate.location;
            let key = (
                loc.file_path.clone(),
                loc.qualified_name.clone(),
                loc.span,
                loc.kind,
            );
            if !seen.insert(key) {
                continue;
            }

            let locations = self.expand_neighbors(&candidate, max_locs);
            let score = groups
                .last()
                .map_or(candidate.score, |above: &CandidateGroup| {
                    candidate.score.min(above.score)
                });
            groups.push(CandidateGroup::new(
                groups.len() + 1,
                score,
                "FULL_LOCATION",
                locations,
            ));
        }
        groups
    }

    fn score_matches(
        &self,
        text: &str,
        cues: &NormalizedCues,
        files: &[String],
    ) -> Vec<Scored<'a>> {
        let s = self.scoring;
        let mut scored = Vec::new();

        for rel in files {
            let Some(symbols) = self.index.file_symbols(rel) else {
                continue;
            };

            for &line in &cues.line_numbers {
                if let Some(enclosing) = symbols.find_enclosing_symbol(line) {
                    let mut location =
                        BuggyLocation::from_symbol(rel, enclosing, s.line_anchor_confidence)
                            .with_evidence("anchor_line", line)
                            .with_evidence("method", "enclosing_symbol");
                    location.anchor_line = Some(line);
                    scored.push(Scored {
                        tier: Tier::LineAnchor,
                        score: s.line_anchor_score,
                        entry: enclosing,
                        location,
                    });
                }
            }

            for function in &symbols.functions {
                if !matches_any_function(&function.qualified_name, &cues.function_candidates) {
                    continue;
                }
                let score = s.function_match_score
                    + lexical_overlap(text, rel, Some(&function.qualified_name), s);
                scored.push(Scored {
                    tier: Tier::FunctionName,
                    score,
                    entry: function,
                    location: BuggyLocation::from_symbol(rel, function, score.min(1.0))
                        .with_evidence("matched_function", json!(cues.function_candidates)),
                });
            }

            if !cues.class_candidates.is_empty() {
                for element in &symbols.class_elements {
                    if !matches_any_class(&element.qualified_name, &cues.class_candidates) {
                        continue;
                    }
                    let score = s.class_element_score
                        + lexical_overlap(text, rel, Some(&element.qualified_name), s);
                    scored.push(Scored {
                        tier: Tier::ClassElement,
                        score,
                        entry: element,
                        location: BuggyLocation::from_symbol(rel, element, score.min(1.0))
                            .with_evidence("matched_class", json!(cues.class_candidates)),
                    });
                }
            }
        }
        scored
    }

    fn module_fallback(&self, text: &str, files: &[String]) -> Vec<Scored<'a>> {
        let s = self.scoring;
        let mut scored = Vec::new();
        for rel in files.iter().take(MODULE_FALLBACK_FILES) {
            let Some(symbols) = self.index.file_symbols(rel) else {
                continue;
            };
            for entry in symbols.module_symbols.iter().take(MODULE_FALLBACK_PER_FILE) {
                let score =
                    s.module_fallback_score + lexical_overlap(text, rel, Some(&entry.qualified_name), s);
                scored.push(Scored {
                    tier: Tier::ModuleFallback,
                    score,
                    entry,
                    location: BuggyLocation::from_symbol(rel, entry, score.min(1.0))
                        .with_evidence("fallback", true),
                });
            }
        }
        if !scored.is_empty() {
            log::debug!("No direct matches; using {} module symbols", scored.len());
        }
        scored
    }

    fn expand_neighbors(&self, candidate: &Scored<'_>, max_locs: usize) -> Vec<BuggyLocation> {
        let anchor = &candidate.location;
        let mut locations = vec![anchor.clone()];
        let Some(symbols) = self.index.file_symbols(&anchor.file_path) else {
            return locations;
        };

        let confidence =
            (anchor.confidence - self.scoring.neighbor_discount).max(self.scoring.neighbor_floor);
        for neighbor in neighbors_in_file(symbols, candidate.entry, self.scoring.neighbor_window) {
            if locations.len() >= max_locs {
                break;
            }
            if std::ptr::eq(neighbor, candidate.entry) {
                continue;
            }
            locations.push(
                BuggyLocation::from_symbol(&anchor.file_path, neighbor, confidence).with_evidence(
                    "nearby_of",
                    json!(anchor.qualified_name),
                ),
            );
        }
        locations.truncate(max_locs.max(1));
        locations
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cues::normalize_cues;
    use crate::types::{CueBundle, LocationKind};
    use faultloc_indexer::RepoIndexer;
    use pretty_assertions::assert_eq;
    use std::fs;
    use tempfile::tempdir;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    async fn index_of(files: &[(&str, &str)]) -> (tempfile::TempDir, RepoIndex) {
        let temp = tempdir().unwrap();
        for (rel, body) in files {
            let path = temp.path().join(rel);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, body).unwrap();
        }
        let (index, _) = RepoIndexer::new(temp.path()).unwrap().build().await.unwrap();
        (temp, index)
    }

    #[tokio::test]
    async fn line_anchor_yields_enclosing_function() {
        let (_temp, index) = index_of(&[("a.py", "def foo():\n    return 1\n")]).await;
        let text = "bug in `a.py` at line 1, function foo";
        let cues = normalize_cues(
            &CueBundle {
                file_mentions: strings(&["a.py"]),
                function_mentions: strings(&["foo"]),
                line_mentions: strings(&["1"]),
                ..CueBundle::default()
            },
            text,
        );
        let scoring = ScoringConfig::default();
        let groups = FullLocationResolver::new(&index, &scoring).resolve(text, &cues, 2, 20);

        assert_eq!(groups.len(), 1, "line anchor and function match collapse");
        assert_eq!(groups[0].rank, 1);
        let loc = &groups[0].locations[0];
        assert_eq!(loc.qualified_name.as_deref(), Some("a.foo"));
        assert_eq!((loc.span.start_line, loc.span.end_line), (1, 2));
        assert!(loc.confidence >= 0.6);
        assert_eq!(groups[0].locations.len(), 1);
    }

    #[tokio::test]
    async fn ranks_are_dense_and_scores_non_increasing() {
        let (_temp, index) = index_of(&[(
            "pkg/render.py",
            "import os\n\ndef render_page():\n    pass\n\ndef render_menu():\n    pass\n\ndef helper():\n    pass\n",
        )])
        .await;
        let text = "render_menu crashes";
        let cues = normalize_cues(
            &CueBundle {
                function_mentions: strings(&["render"]),
                ..CueBundle::default()
            },
            text,
        );
        let scoring = ScoringConfig::default();
        let groups = FullLocationResolver::new(&index, &scoring).resolve(text, &cues, 2, 2);

        let ranks: Vec<usize> = groups.iter().map(|g| g.rank).collect();
        assert_eq!(ranks, vec![1, 2]);
        assert!(groups.windows(2).all(|w| w[0].score >= w[1].score));
        assert_eq!(
            groups[0].locations[0].qualified_name.as_deref(),
            Some("pkg.render.render_menu")
        );
        assert!(groups.iter().all(|g| g.locations.len() <= 2));

        let neighbor = &groups[0].locations[1];
        assert_eq!(neighbor.evidence["nearby_of"], json!("pkg.render.render_menu"));
        assert!((neighbor.confidence - 0.7).abs() < 1e-9);
    }

    #[tokio::test]
    async fn line_anchor_outranks_name_matches() {
        let (_temp, index) = index_of(&[(
            "svc.py",
            "def load():\n    return read()\n\n\ndef parse_row(row):\n    return row.split(',')\n",
        )])
        .await;
        let text = "parse_row breaks, traceback points at svc.py line 2";
        let cues = normalize_cues(
            &CueBundle {
                file_mentions: strings(&["svc.py"]),
                function_mentions: strings(&["parse_row"]),
                line_mentions: strings(&["2"]),
                ..CueBundle::default()
            },
            text,
        );
        let scoring = ScoringConfig::default();
        let groups = FullLocationResolver::new(&index, &scoring).resolve(text, &cues, 2, 1);

        let primaries: Vec<_> = groups
            .iter()
            .map(|g| g.locations[0].qualified_name.as_deref())
            .collect();
        assert_eq!(primaries, vec![Some("svc.load"), Some("svc.parse_row")]);
        assert_eq!(groups[0].locations[0].anchor_line, Some(2));
        assert_eq!(groups[0].score, 0.8);
        assert_eq!(groups[1].score, 0.8);
    }

    #[tokio::test]
    async fn falls_back_to_module_symbols() {
        let (_temp, index) = index_of(&[("cfg.py", "DEBUG = True\nLEVEL = 3\n")]).await;
        let cues = normalize_cues(
            &CueBundle {
                file_mentions: strings(&["cfg.py"]),
                ..CueBundle::default()
            },
            "",
        );
        let scoring = ScoringConfig::default();
        let groups = FullLocationResolver::new(&index, &scoring).resolve("", &cues, 2, 1);

        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].locations[0].kind, LocationKind::ModuleSymbol);
        assert_eq!(groups[0].score, 0.3);
        assert_eq!(groups[0].locations.len(), 1);
    }

    #[tokio::test]
    async fn class_elements_match_by_class() {
        let (_temp, index) = index_of(&[(
            "models.py",
            "class User:\n    name = None\n    age = 0\n",
        )])
        .await;
        let cues = normalize_cues(
            &CueBundle {
                class_mentions: strings(&["User"]),
                ..CueBundle::default()
            },
            "",
        );
        let scoring = ScoringConfig::default();
        let groups = FullLocationResolver::new(&index, &scoring).resolve("", &cues, 5, 5);

        assert_eq!(groups.len(), 2);
        assert!(groups
            .iter()
            .all(|g| g.locations[0].kind == LocationKind::ClassElement));
        assert_eq!(groups[0].score, 0.75);
    }
}

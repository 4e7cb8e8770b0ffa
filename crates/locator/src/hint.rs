//! Retrieval-driven candidates for issues without usable location cues.

use crate::config::ScoringConfig;
use crate::types::{BuggyLocation, CandidateGroup};
use faultloc_indexer::RepoIndex;
use faultloc_vector_store::{RetrievalHits, SearchHit};
use serde_json::json;
use std::collections::{BTreeSet, HashMap};

/// Ranked files kept before grouping is `max(MIN_RANKED_FILES, topk * 5)`
pub const MIN_RANKED_FILES: usize = 30;
/// Locations at or above this count skip in-file padding
pub const MIN_LOCATIONS_BEFORE_PAD: usize = 2;
pub const MAX_PAD_FUNCTIONS: usize = 6;
/// Cap on the import-graph expansion
pub const EXPANSION_FILE_CAP: usize = 80;

/// Files ranked by their best file-level or function-level score
#[must_use]
pub fn rank_files(hits: &RetrievalHits, topk: usize) -> Vec<(String, f64)> {
    let mut best: HashMap<&str, f64> = HashMap::new();
    let mut order: Vec<&str> = Vec::new();
    for hit in hits.file_hits.iter().chain(&hits.function_hits) {
        let score = f64::from(hit.score);
        match best.get_mut(hit.file_path.as_str()) {
            Some(current) => *current = current.max(score),
            None => {
                best.insert(&hit.file_path, score);
                order.push(&hit.file_path);
            }
        }
    }

    let mut ranked: Vec<(String, f64)> = order
        .into_iter()
        .map(|file| (file.to_string(), best[file]))
        .collect();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
    ranked.truncate(MIN_RANKED_FILES.max(topk * 5));
    ranked
}

/// One group per ranked file, built from the function hits inside it
#[must_use]
pub fn hint_candidates(
    index: &RepoIndex,
    hits: &RetrievalHits,
    scoring: &ScoringConfig,
    topk: usize,
    max_locs: usize,
) -> Vec<CandidateGroup> {
    let mut groups = Vec::new();
    for (file, file_score) in rank_files(hits, topk) {
        if groups.len() >= topk {
            break;
        }
        let Some(symbols) = index.file_symbols(&file) else {
            continue;
        };

        let mut locations: Vec<BuggyLocation> = Vec::new();
        for hit in hits.function_hits.iter().filter(|h| h.file_path == file) {
            if locations.len() >= max_locs {
                break;
            }
            let Some(function) = hit
                .qualified_name
                .as_deref()
                .and_then(|qn| symbols.function_by_qualname(qn))
            else {
                continue;
            };
            locations.push(
                BuggyLocation::from_symbol(&file, function, f64::from(hit.score).clamp(0.0, 1.0))
                    .with_evidence("retrieval", hit_evidence(hit)),
            );
        }

        if locations.len() < MIN_LOCATIONS_BEFORE_PAD {
            let pad = MAX_PAD_FUNCTIONS.min(max_locs.saturating_sub(locations.len()));
            let confidence =
                (file_score - scoring.retrieval_pad_discount).max(scoring.retrieval_pad_floor);
            let padding: Vec<_> = symbols
                .functions
                .iter()
                .filter(|f| {
                    !locations
                        .iter()
                        .any(|l| l.qualified_name.as_deref() == Some(f.qualified_name.as_str()))
                })
                .take(pad)
                .collect();
            for function in padding {
                locations.push(
                    BuggyLocation::from_symbol(&file, function, confidence)
                        .with_evidence("fallback_in_file", true),
                );
            }
        }

        if locations.is_empty() {
            continue;
        }
        locations.truncate(max_locs);
        groups.push(CandidateGroup::new(
            groups.len() + 1,
            file_score,
            "RETRIEVAL",
            locations,
        ));
    }
    groups
}

fn hit_evidence(hit: &SearchHit) -> serde_json::Value {
    json!({
        "uid": hit.uid,
        "score": hit.score,
        "file": hit.file_path,
        "qualname": hit.qualified_name,
    })
}

/// Retrieved files plus their one-hop import neighbours in both directions.
///
/// The result is informational; it does not feed back into ranking.
#[must_use]
pub fn expand_with_import_graph(
    file_hits: &[SearchHit],
    index: &RepoIndex,
    max_files: usize,
) -> Vec<String> {
    let mut expanded: BTreeSet<String> = BTreeSet::new();
    for hit in file_hits {
        if expanded.len() >= max_files {
            break;
        }
        expanded.insert(hit.file_path.clone());
    }

    'seeds: for hit in file_hits {
        let Some(module) = index.files.module_for(&hit.file_path) else {
            continue;
        };
        for neighbor in index.imports.neighbors(module) {
            if expanded.len() >= max_files {
                break 'seeds;
            }
            if let Some(path) = index.files.path_for_module(neighbor) {
                expanded.insert(path.to_string());
            }
        }
    }
    log::debug!(
        "Import expansion grew {} retrieved files to {}",
        file_hits.len(),
        expanded.len()
    );
    expanded.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use faultloc_indexer::RepoIndexer;
    use pretty_assertions::assert_eq;
    use std::fs;
    use tempfile::tempdir;

    fn hit(file: &str, qualname: Option<&str>, score: f32) -> SearchHit {
        SearchHit {
            uid: match qualname {
                Some(qn) => format!("FUNC::{file}::{qn}"),
                None => format!("FILE::{file}"),
            },
            score,
            file_path: file.to_string(),
            qualified_name: qualname.map(str::to_string),
        }
    }

    async fn repo() -> (tempfile::TempDir, RepoIndex) {
        let temp = tempdir().unwrap();
        let root = temp.path();
        fs::create_dir_all(root.join("app")).unwrap();
        fs::write(root.join("app/__init__.py"), "").unwrap();
        fs::write(
            root.join("app/views.py"),
            "from app import models\n\ndef index():\n    pass\n\ndef detail():\n    pass\n\ndef edit():\n    pass\n",
        )
        .unwrap();
        fs::write(root.join("app/models.py"), "def save():\n    pass\n").unwrap();
        fs::write(root.join("app/urls.py"), "import app.views\n").unwrap();
        let (index, _) = RepoIndexer::new(root).unwrap().build().await.unwrap();
        (temp, index)
    }

    #[test]
    fn files_take_their_best_signal() {
        let hits = RetrievalHits {
            file_hits: vec![hit("a.py", None, 0.3), hit("b.py", None, 0.6)],
            function_hits: vec![hit("a.py", Some("a.f"), 0.9)],
        };
        let ranked = rank_files(&hits, 2);
        assert_eq!(ranked[0].0, "a.py");
        assert!((ranked[0].1 - 0.9).abs() < 1e-6);
        assert_eq!(ranked[1].0, "b.py");
    }

    #[tokio::test]
    async fn function_hits_become_locations() {
        let (_temp, index) = repo().await;
        let hits = RetrievalHits {
            file_hits: vec![hit("app/views.py", None, 0.5)],
            function_hits: vec![
                hit("app/views.py", Some("app.views.detail"), 0.8),
                hit("app/views.py", Some("app.views.edit"), 0.7),
                hit("app/views.py", Some("app.views.gone"), 0.6),
            ],
        };
        let groups = hint_candidates(&index, &hits, &ScoringConfig::default(), 2, 20);

        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].rationale["mode"], json!("RETRIEVAL"));
        let names: Vec<_> = groups[0]
            .locations
            .iter()
            .map(|l| l.qualified_name.as_deref().unwrap())
            .collect();
        assert_eq!(names, vec!["app.views.detail", "app.views.edit"]);
    }

    #[tokio::test]
    async fn sparse_files_are_padded_and_empty_ones_skipped() {
        let (_temp, index) = repo().await;
        let hits = RetrievalHits {
            file_hits: vec![
                hit("app/urls.py", None, 0.95),
                hit("app/views.py", None, 0.3),
            ],
            function_hits: vec![],
        };
        let groups = hint_candidates(&index, &hits, &ScoringConfig::default(), 2, 2);

        assert_eq!(groups.len(), 1, "urls.py has no functions");
        assert_eq!(groups[0].rank, 1);
        assert_eq!(groups[0].locations.len(), 2);
        assert!(groups[0]
            .locations
            .iter()
            .all(|l| (l.confidence - 0.2).abs() < 1e-9));
        assert_eq!(groups[0].locations[0].evidence["fallback_in_file"], json!(true));
    }

    #[tokio::test]
    async fn padding_skips_functions_already_hit() {
        let temp = tempdir().unwrap();
        fs::write(
            temp.path().join("m.py"),
            "def a():\n    pass\n\ndef b():\n    pass\n",
        )
        .unwrap();
        let (index, _) = RepoIndexer::new(temp.path()).unwrap().build().await.unwrap();
        let hits = RetrievalHits {
            file_hits: vec![],
            function_hits: vec![hit("m.py", Some("m.a"), 0.7)],
        };
        let groups = hint_candidates(&index, &hits, &ScoringConfig::default(), 2, 20);

        let names: Vec<_> = groups[0]
            .locations
            .iter()
            .map(|l| l.qualified_name.as_deref().unwrap())
            .collect();
        assert_eq!(names, vec!["m.a", "m.b"]);
        assert_eq!(groups[0].locations[1].evidence["fallback_in_file"], json!(true));
    }

    #[tokio::test]
    async fn expansion_respects_the_cap_inside_one_hub() {
        let (_temp, index) = repo().await;
        let expanded = expand_with_import_graph(&[hit("app/views.py", None, 0.5)], &index, 2);
        assert_eq!(expanded.len(), 2);
        assert!(expanded.contains(&"app/views.py".to_string()));
    }

    #[tokio::test]
    async fn expansion_follows_imports_both_ways() {
        let (_temp, index) = repo().await;
        let expanded = expand_with_import_graph(&[hit("app/views.py", None, 0.5)], &index, 80);
        assert_eq!(
            expanded,
            vec!["app/__init__.py", "app/models.py", "app/urls.py", "app/views.py"]
        );
    }
}

use crate::error::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::path::PathBuf;

pub const META: &str = "00_meta.json";
pub const PROBLEM_STATEMENT: &str = "00_problem_statement.txt";
pub const EXTRACTOR: &str = "01_extractor.json";
pub const CUES_NORMALIZED: &str = "02_cues_normalized.json";
pub const CLASSIFIER: &str = "03_classifier.json";
pub const PARTIAL_FALLBACK: &str = "03b_partial_fallback.json";
pub const FILE_INDEX: &str = "04_repo_index/file_index.json";
pub const SYMBOL_INDEX: &str = "04_repo_index/symbol_index.json";
pub const IMPORT_GRAPH: &str = "04_repo_index/import_graph.json";
pub const RETRIEVAL_BUILD: &str = "05_retrieval_build.json";
pub const RETRIEVAL: &str = "05_retrieval.json";
pub const RETRIEVAL_EXPANDED: &str = "05_retrieval_expanded_files.json";
pub const CANDIDATES: &str = "07_candidates.json";
pub const EVALUATION: &str = "09_evaluation.json";

/// Destination for per-instance stage outputs.
///
/// Names are relative to the instance's directory and may contain `/`.
#[async_trait]
pub trait ArtifactSink: Send + Sync {
    async fn write_json(&self, name: &str, value: &Value) -> Result<()>;

    async fn write_text(&self, name: &str, text: &str) -> Result<()>;

    /// Where `name` ends up, when the sink persists anything
    fn location(&self, _name: &str) -> Option<PathBuf> {
        None
    }
}

/// Discards everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSink;

#[async_trait]
impl ArtifactSink for NoopSink {
    async fn write_json(&self, _name: &str, _value: &Value) -> Result<()> {
        Ok(())
    }

    async fn write_text(&self, _name: &str, _text: &str) -> Result<()> {
        Ok(())
    }
}

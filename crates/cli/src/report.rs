use anyhow::{Context, Result};
use faultloc_locator::InstanceResult;
use serde::Serialize;
use std::path::Path;

pub const OUTPUT_FILE: &str = "output.json";

/// Outcome of one instance in the aggregate document
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum RunRecord {
    Done(Box<InstanceResult>),
    Failed { instance_id: String, error: String },
}

impl RunRecord {
    pub fn failed(instance_id: &str, error: impl std::fmt::Display) -> Self {
        Self::Failed {
            instance_id: instance_id.to_string(),
            error: error.to_string(),
        }
    }
}

#[derive(Debug, Default, Serialize, PartialEq, Eq)]
pub struct RunSummary {
    pub total: usize,
    pub failed: usize,
    pub evaluated: usize,
    pub exact_matches: usize,
}

impl RunSummary {
    pub fn of(records: &[RunRecord]) -> Self {
        let mut summary = Self {
            total: records.len(),
            ..Self::default()
        };
        for record in records {
            match record {
                RunRecord::Failed { .. } => summary.failed += 1,
                RunRecord::Done(result) => {
                    if let Some(report) = &result.evaluation {
                        summary.evaluated += 1;
                        if report.exact_match {
                            summary.exact_matches += 1;
                        }
                    }
                }
            }
        }
        summary
    }
}

/// Persist the per-instance records as `<dir>/output.json`
pub fn write_output(dir: &Path, records: &[RunRecord]) -> Result<std::path::PathBuf> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create {}", dir.display()))?;
    let path = dir.join(OUTPUT_FILE);
    let bytes = serde_json::to_vec_pretty(records)?;
    std::fs::write(&path, bytes).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(path)
}

use anyhow::{Context, Result};
use serde_json::Value;
use std::path::{Path, PathBuf};

/// One runnable bug instance from the dataset
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BugInstance {
    pub instance_id: String,
    pub problem_statement: String,
    pub patch: Option<String>,
    pub repo_path: PathBuf,
}

/// Read a dataset file: a JSON list, or an object carrying the list under `data`
pub fn load_dataset(path: &Path) -> Result<Vec<Value>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read dataset {}", path.display()))?;
    let parsed: Value = serde_json::from_str(&text)
        .with_context(|| format!("Dataset {} is not valid JSON", path.display()))?;
    items_of(parsed).with_context(|| format!("Unsupported dataset layout in {}", path.display()))
}

fn items_of(parsed: Value) -> Result<Vec<Value>> {
    match parsed {
        Value::Array(items) => Ok(items),
        Value::Object(mut map) => match map.remove("data") {
            Some(Value::Array(items)) => Ok(items),
            _ => anyhow::bail!("expected a list or an object with a `data` list"),
        },
        _ => anyhow::bail!("expected a list or an object with a `data` list"),
    }
}

/// Turn raw items into runnable instances.
///
/// Items without an id, a problem statement or a checked-out repository under
/// `repos_root` are skipped with a warning. `max_bugs == 0` keeps everything.
pub fn select_instances(items: &[Value], repos_root: &Path, max_bugs: usize) -> Vec<BugInstance> {
    let mut selected = Vec::new();
    for (position, item) in items.iter().enumerate() {
        if max_bugs > 0 && selected.len() >= max_bugs {
            break;
        }

        let text_field = |key: &str| {
            item.get(key)
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };

        let Some(instance_id) = text_field("instance_id").or_else(|| text_field("id")) else {
            log::warn!("Skipping dataset item {position}: no instance_id");
            continue;
        };
        let Some(problem_statement) = text_field("problem_statement") else {
            log::warn!("Skipping {instance_id}: empty problem_statement");
            continue;
        };
        let repo_path = repos_root.join(&instance_id);
        if !repo_path.is_dir() {
            log::warn!(
                "Skipping {instance_id}: repository {} not found",
                repo_path.display()
            );
            continue;
        }

        selected.push(BugInstance {
            instance_id,
            problem_statement,
            patch: text_field("patch"),
            repo_path,
        });
    }
    selected
}

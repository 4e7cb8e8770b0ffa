use async_trait::async_trait;
use faultloc_locator::{ArtifactSink, LocatorError};
use serde_json::Value;
use std::path::{Path, PathBuf};

/// Writes stage artifacts under one instance directory
#[derive(Debug, Clone)]
pub struct FsSink {
    dir: PathBuf,
}

impl FsSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    async fn write_bytes(&self, name: &str, bytes: &[u8]) -> faultloc_locator::Result<()> {
        let path = self.dir.join(name);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| artifact_error(parent, e))?;
        }
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| artifact_error(&path, e))
    }
}

fn artifact_error(path: &Path, e: std::io::Error) -> LocatorError {
    LocatorError::ArtifactError(format!("{}: {e}", path.display()))
}

#[async_trait]
impl ArtifactSink for FsSink {
    async fn write_json(&self, name: &str, value: &Value) -> faultloc_locator::Result<()> {
        let bytes = serde_json::to_vec_pretty(value)?;
        self.write_bytes(name, &bytes).await
    }

    async fn write_text(&self, name: &str, text: &str) -> faultloc_locator::Result<()> {
        self.write_bytes(name, text.as_bytes()).await
    }

    fn location(&self, name: &str) -> Option<PathBuf> {
        Some(self.dir.join(name))
    }
}

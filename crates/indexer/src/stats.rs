use serde::{Deserialize, Serialize};

/// Statistics about one repository index build
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IndexStats {
    /// Source files found by the scanner
    pub scanned: usize,

    /// Files that parsed and entered the index
    pub files: usize,

    pub symbols: usize,
    pub modules: usize,
    pub import_edges: usize,

    /// Time taken in milliseconds
    pub time_ms: u64,

    /// Files skipped because they could not be read or parsed
    pub errors: Vec<String>,
}

impl IndexStats {
    pub fn add_error(&mut self, error: String) {
        self.errors.push(error);
    }

    #[must_use]
    pub fn skipped(&self) -> usize {
        self.errors.len()
    }
}

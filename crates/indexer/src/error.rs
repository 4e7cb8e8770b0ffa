use thiserror::Error;

pub type Result<T> = std::result::Result<T, IndexerError>;

#[derive(Error, Debug)]
pub enum IndexerError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Symbol error: {0}")]
    SymbolError(#[from] faultloc_symbols::SymbolError),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Invalid repository path: {0}")]
    InvalidPath(String),

    #[error("Unsupported repo index schema_version {found} (expected {expected})")]
    SchemaMismatch { found: u32, expected: u32 },

    #[error("Indexing task failed: {0}")]
    TaskFailed(String),
}

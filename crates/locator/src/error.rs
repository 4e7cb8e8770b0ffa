use std::fmt;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, LocatorError>;

#[derive(Error, Debug)]
pub enum LocatorError {
    #[error("Index error: {0}")]
    IndexError(#[from] faultloc_indexer::IndexerError),

    #[error("Vector store error: {0}")]
    VectorStoreError(#[from] faultloc_vector_store::VectorStoreError),

    #[error(transparent)]
    Budget(#[from] BudgetExceeded),

    #[error("{stage} capability failed: {message}")]
    CapabilityError { stage: &'static str, message: String },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Artifact error: {0}")]
    ArtifactError(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

impl LocatorError {
    pub fn capability(stage: &'static str, message: impl Into<String>) -> Self {
        Self::CapabilityError {
            stage,
            message: message.into(),
        }
    }
}

/// Which limit a budget check tripped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BudgetKind {
    Time,
    Cost,
}

impl fmt::Display for BudgetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Time => f.write_str("time"),
            Self::Cost => f.write_str("cost"),
        }
    }
}

/// A hard budget limit was exceeded; fatal for the current instance only
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{kind} budget exceeded: {used:.3} > {limit:.3}")]
pub struct BudgetExceeded {
    pub kind: BudgetKind,
    pub used: f64,
    pub limit: f64,
}

use thiserror::Error;

/// Result type for symbol indexing operations
pub type Result<T> = std::result::Result<T, SymbolError>;

/// Errors that can occur while turning a source file into symbols
#[derive(Error, Debug)]
pub enum SymbolError {
    /// The parser produced no tree or a tree containing syntax errors
    #[error("Parse error in {file}: {message}")]
    ParseError { file: String, message: String },

    /// Tree-sitter could not be configured
    #[error("Tree-sitter error: {0}")]
    TreeSitterError(String),

    /// IO error occurred
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl SymbolError {
    /// Create a parse error for a file
    pub fn parse(file: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ParseError {
            file: file.into(),
            message: message.into(),
        }
    }

    /// Create a tree-sitter error
    pub fn tree_sitter(msg: impl Into<String>) -> Self {
        Self::TreeSitterError(msg.into())
    }
}

use thiserror::Error;

pub type Result<T> = std::result::Result<T, LlmError>;

#[derive(Error, Debug)]
pub enum LlmError {
    #[error("{0} environment variable is not set")]
    MissingCredential(&'static str),

    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("API returned {status}: {body}")]
    ApiError { status: u16, body: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Request failed after {attempts} attempts: {last_error}")]
    RetriesExhausted { attempts: u32, last_error: String },

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

impl LlmError {
    /// Authentication and request-shape failures will not improve on retry
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::ApiError { status, .. } => !matches!(status, 400 | 401 | 403 | 404),
            Self::MissingCredential(_) => false,
            _ => true,
        }
    }
}

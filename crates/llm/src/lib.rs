//! # Faultloc LLM
//!
//! Chat-model and embedding-endpoint implementations of the capabilities the
//! locator consumes. Everything speaks the OpenAI-compatible HTTP API.
//!
//! ```no_run
//! use faultloc_locator::{FaultlocConfig, Locator};
//!
//! # fn wire() -> faultloc_llm::Result<()> {
//! let config = FaultlocConfig::default();
//! let capabilities = faultloc_llm::capabilities_from_env(&config)?;
//! let locator = Locator::new(config, capabilities);
//! # Ok(())
//! # }
//! ```

mod capabilities;
mod client;
mod embeddings;
mod error;
pub mod prompts;

pub use capabilities::{LlmCandidateReasoner, LlmCueExtractor, LlmIssueClassifier};
pub use client::{parse_chat_response, ChatClient, ChatJson, API_KEY_VAR};
pub use embeddings::{parse_embedding_response, HttpEmbedder};
pub use error::{LlmError, Result};

use faultloc_locator::{Capabilities, EmbedBackend, FaultlocConfig, IssueClassifier};
use faultloc_vector_store::{Embedder, StubEmbedder};
use std::sync::Arc;

/// Wire every capability from `config`, reading the credential once.
///
/// Fails with [`LlmError::MissingCredential`] before any instance runs.
pub fn capabilities_from_env(config: &FaultlocConfig) -> Result<Capabilities> {
    let client = ChatClient::from_env(config)?;

    let embedder: Arc<dyn Embedder> = match config.embed_backend {
        EmbedBackend::Stub => Arc::new(StubEmbedder::new(config.embed_dimension)),
        EmbedBackend::Http => Arc::new(HttpEmbedder::new(client.clone(), &config.embed_model)),
    };
    log::debug!(
        "Capabilities: chat model {}, embeddings {}",
        client.model(),
        embedder.model_id()
    );

    let client = Arc::new(client);
    let advisor: Option<Arc<dyn IssueClassifier>> = if config.advisory_classification {
        Some(Arc::new(LlmIssueClassifier::new(client.clone(), config)))
    } else {
        None
    };
    Ok(Capabilities {
        extractor: Arc::new(LlmCueExtractor::new(client.clone(), config)),
        reasoner: Arc::new(LlmCandidateReasoner::new(client, config)),
        embedder,
        advisor,
    })
}

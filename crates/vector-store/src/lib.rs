//! # Faultloc Vector Store
//!
//! Similarity search over embedded code excerpts.
//!
//! ## Architecture
//!
//! ```text
//! RepoIndex
//!     │
//!     ├──> build_units
//!     │      └─> TextUnit[] (FILE::path, FUNC::path::qualname)
//!     │
//!     ├──> Embedder (stub or remote)
//!     │      └─> Vector[dim], dimension fixed by the first batch
//!     │
//!     └──> RetrievalStore
//!            ├─> FlatIndex (files)
//!            └─> FlatIndex (functions)
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use faultloc_vector_store::{build_units, Embedder, RetrievalStore, StubEmbedder};
//!
//! # async fn run(index: &faultloc_indexer::RepoIndex) -> anyhow::Result<()> {
//! let embedder = StubEmbedder::new(384);
//! let units = build_units(index, 4000, 20000);
//! let texts: Vec<String> = units.iter().map(|u| u.text.clone()).collect();
//! let batch = embedder.embed_batch(&texts).await?;
//!
//! let mut store = RetrievalStore::new();
//! store.insert(units, batch.vectors)?;
//!
//! let query = embedder.embed_batch(&["crash on empty input".to_string()]).await?;
//! let hits = store.search(&query.vectors[0], 50, 120)?;
//! println!("{} file hits", hits.file_hits.len());
//! # Ok(())
//! # }
//! ```

mod embeddings;
mod error;
mod flat_index;
mod store;
mod types;
mod units;

pub use embeddings::{normalize, Embedder, EmbeddingBatch, StubEmbedder};
pub use error::{Result, VectorStoreError};
pub use flat_index::FlatIndex;
pub use store::{RetrievalHits, RetrievalStore};
pub use types::{SearchHit, TextUnit, TokenUsage, UnitKind};
pub use units::{build_units, FILE_EXCERPT_CHARS, FUNCTION_EXCERPT_LINES};

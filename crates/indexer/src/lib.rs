//! # Faultloc Indexer
//!
//! Static repository index: file table, symbol table and import graph.
//!
//! ## Pipeline
//!
//! ```text
//! Directory
//!     │
//!     ├──> File Scanner (*.py, noise directories skipped)
//!     │      └─> Sorted repo-relative paths
//!     │
//!     ├──> PythonAnalyzer (blocking pool, sharded)
//!     │      └─> FileSymbols + ImportRef[] (unparseable files dropped)
//!     │
//!     ├──> FileIndex (basename / suffix / module maps)
//!     │
//!     └──> ImportGraphBuilder
//!            └─> ImportGraph
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use faultloc_indexer::RepoIndexer;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let (index, stats) = RepoIndexer::new("/path/to/repo")?.build().await?;
//!     println!("Indexed {} files, {} symbols", stats.files, stats.symbols);
//!     let hits = index.files.resolve_file_candidates(&["pkg.core".to_string()]);
//!     println!("{hits:?}");
//!     Ok(())
//! }
//! ```

mod error;
mod file_index;
mod repo_index;
mod scanner;
mod stats;

pub use error::{IndexerError, Result};
pub use file_index::{is_package_path, module_name_for_path, FileIndex};
pub use repo_index::{RepoIndex, RepoIndexer, REPO_INDEX_SCHEMA_VERSION};
pub use scanner::FileScanner;
pub use stats::IndexStats;

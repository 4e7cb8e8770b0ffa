use crate::error::{IndexerError, Result};
use crate::file_index::{is_package_path, module_name_for_path, FileIndex};
use crate::scanner::FileScanner;
use crate::stats::IndexStats;
use faultloc_graph::{ImportGraph, ImportGraphBuilder, ModuleImports};
use faultloc_symbols::{FileSymbols, ParsedFile, PythonAnalyzer, SymbolIndex};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Instant;

pub const REPO_INDEX_SCHEMA_VERSION: u32 = 1;

/// File table, symbol table and import graph for one repository snapshot.
/// Immutable once built; share it by reference across instances.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepoIndex {
    pub root: PathBuf,
    pub files: FileIndex,
    pub symbols: SymbolIndex,
    pub imports: ImportGraph,
}

#[derive(Serialize, Deserialize)]
struct PersistedRepoIndex {
    schema_version: u32,
    #[serde(flatten)]
    index: RepoIndex,
}

impl RepoIndex {
    /// Symbols of an indexed file
    #[must_use]
    pub fn file_symbols(&self, rel: &str) -> Option<&FileSymbols> {
        self.symbols.get(rel)
    }

    /// Read a repo-relative file from the snapshot, decoding lossily
    pub fn read_source(&self, rel: &str) -> Result<String> {
        let bytes = std::fs::read(self.root.join(rel))?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let bytes = tokio::fs::read(path.as_ref()).await?;
        let persisted: PersistedRepoIndex = serde_json::from_slice(&bytes)?;
        if persisted.schema_version != REPO_INDEX_SCHEMA_VERSION {
            return Err(IndexerError::SchemaMismatch {
                found: persisted.schema_version,
                expected: REPO_INDEX_SCHEMA_VERSION,
            });
        }
        Ok(persisted.index)
    }

    pub async fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let persisted = PersistedRepoIndex {
            schema_version: REPO_INDEX_SCHEMA_VERSION,
            index: self.clone(),
        };
        let bytes = serde_json::to_vec_pretty(&persisted)?;
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, bytes).await?;
        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }
}

/// Builds a [`RepoIndex`] from a directory
pub struct RepoIndexer {
    root: PathBuf,
}

impl RepoIndexer {
    pub fn new(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        if !root.is_dir() {
            return Err(IndexerError::InvalidPath(root.display().to_string()));
        }
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Scan, parse and link the repository.
    ///
    /// Files are parsed on the blocking pool in contiguous shards; results are
    /// merged in scan order so the index matches a sequential build.
    pub async fn build(&self) -> Result<(RepoIndex, IndexStats)> {
        let started = Instant::now();
        let mut stats = IndexStats::default();

        let paths = FileScanner::new(&self.root).scan();
        stats.scanned = paths.len();

        let shards = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
            .clamp(2, 8);
        let shard_len = paths.len().div_ceil(shards).max(1);

        let mut tasks = Vec::new();
        for shard in paths.chunks(shard_len) {
            let shard = shard.to_vec();
            let root = self.root.clone();
            tasks.push(tokio::task::spawn_blocking(move || parse_shard(&root, shard)));
        }

        let mut parsed: Vec<ParsedFile> = Vec::with_capacity(paths.len());
        for task in tasks {
            let outcomes = task
                .await
                .map_err(|e| IndexerError::TaskFailed(e.to_string()))??;
            for outcome in outcomes {
                match outcome {
                    Ok(file) => parsed.push(file),
                    Err(message) => {
                        log::debug!("Skipping {message}");
                        stats.add_error(message);
                    }
                }
            }
        }

        let files = FileIndex::from_paths(parsed.iter().map(|p| p.symbols.file.clone()));
        let module_imports: Vec<ModuleImports> = parsed
            .iter()
            .map(|p| ModuleImports {
                module: p.symbols.module.clone(),
                is_package: is_package_path(&p.symbols.file),
                imports: p.imports.clone(),
            })
            .collect();
        let imports =
            ImportGraphBuilder::new(files.module_to_path.keys().cloned()).build(&module_imports);

        let mut symbols = SymbolIndex::default();
        for file in parsed {
            symbols.insert(file.symbols);
        }

        stats.files = files.len();
        stats.symbols = symbols.symbol_count();
        stats.modules = imports.node_count();
        stats.import_edges = imports.edge_count();
        stats.time_ms = started.elapsed().as_millis() as u64;
        log::info!(
            "Indexed {} of {} files ({} symbols, {} import edges) in {} ms",
            stats.files,
            stats.scanned,
            stats.symbols,
            stats.import_edges,
            stats.time_ms
        );

        Ok((
            RepoIndex {
                root: self.root.clone(),
                files,
                symbols,
                imports,
            },
            stats,
        ))
    }
}

type ShardOutcome = std::result::Result<ParsedFile, String>;

fn parse_shard(root: &Path, shard: Vec<String>) -> Result<Vec<ShardOutcome>> {
    let mut analyzer = PythonAnalyzer::new()?;
    Ok(shard
        .into_iter()
        .map(|rel| {
            let bytes = std::fs::read(root.join(&rel)).map_err(|e| format!("{rel}: {e}"))?;
            let source = String::from_utf8_lossy(&bytes);
            let module = module_name_for_path(&rel);
            analyzer
                .analyze(&rel, &module, &source)
                .map_err(|e| e.to_string())
        })
        .collect())
}

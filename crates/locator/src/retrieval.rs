use crate::budget::BudgetManager;
use crate::error::Result;
use faultloc_indexer::RepoIndex;
use faultloc_vector_store::{
    build_units, Embedder, RetrievalHits, RetrievalStore, TextUnit, UnitKind,
};
use serde::Serialize;

/// Hits requested per retrieval query
pub const QUERY_TOP_FILES: usize = 50;
pub const QUERY_TOP_FUNCTIONS: usize = 120;

#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
pub struct EmbeddedCounts {
    pub files: usize,
    pub functions: usize,
}

/// Outcome of a retrieval build
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct RetrievalBuildMeta {
    pub files: usize,
    pub functions: usize,
    pub embedded: EmbeddedCounts,
}

/// Lazily built similarity search over one repository snapshot
pub struct Retriever<'a> {
    embedder: &'a dyn Embedder,
    batch_size: usize,
    store: RetrievalStore,
}

impl<'a> Retriever<'a> {
    #[must_use]
    pub fn new(embedder: &'a dyn Embedder, batch_size: usize) -> Self {
        Self {
            embedder,
            batch_size: batch_size.max(1),
            store: RetrievalStore::new(),
        }
    }

    #[must_use]
    pub fn store(&self) -> &RetrievalStore {
        &self.store
    }

    /// Embed the capped FILE and FUNCTION units batch by batch.
    ///
    /// Every batch is charged to `budget` and followed by a budget check, so
    /// an exhausted instance stops between batches rather than at the end.
    pub async fn build(
        &mut self,
        index: &RepoIndex,
        max_files: usize,
        max_functions: usize,
        budget: &mut BudgetManager,
    ) -> Result<RetrievalBuildMeta> {
        let units = build_units(index, max_files, max_functions);
        let mut meta = RetrievalBuildMeta::default();
        for unit in &units {
            match unit.kind {
                UnitKind::File => meta.files += 1,
                UnitKind::Function => meta.functions += 1,
            }
        }
        log::info!(
            "Embedding {} file and {} function units with {}",
            meta.files,
            meta.functions,
            self.embedder.model_id()
        );

        let mut pending = units.into_iter().peekable();
        while pending.peek().is_some() {
            let batch: Vec<TextUnit> = pending.by_ref().take(self.batch_size).collect();
            let texts: Vec<String> = batch.iter().map(|u| u.text.clone()).collect();
            let embedded = self.embedder.embed_batch(&texts).await?;
            budget.add_cost_from_usage(embedded.usage.as_ref());

            for unit in &batch {
                match unit.kind {
                    UnitKind::File => meta.embedded.files += 1,
                    UnitKind::Function => meta.embedded.functions += 1,
                }
            }
            self.store.insert(batch, embedded.vectors)?;
            budget.ensure_within_budget()?;
        }

        log::debug!(
            "Retrieval store holds {} files and {} functions",
            self.store.file_count(),
            self.store.function_count()
        );
        Ok(meta)
    }

    /// Embed `text` once and search both unit kinds
    pub async fn query(&self, text: &str, budget: &mut BudgetManager) -> Result<RetrievalHits> {
        if self.store.is_empty() {
            return Ok(RetrievalHits::default());
        }
        let embedded = self.embedder.embed_batch(&[text.to_string()]).await?;
        budget.add_cost_from_usage(embedded.usage.as_ref());
        let Some(query) = embedded.vectors.first() else {
            return Ok(RetrievalHits::default());
        };
        Ok(self
            .store
            .search(query, QUERY_TOP_FILES, QUERY_TOP_FUNCTIONS)?)
    }
}

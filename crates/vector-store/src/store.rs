use crate::embeddings::normalize;
use crate::error::{Result, VectorStoreError};
use crate::flat_index::FlatIndex;
use crate::types::{SearchHit, TextUnit, UnitKind};
use serde::{Deserialize, Serialize};

/// File-level and function-level hits for one query
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RetrievalHits {
    pub file_hits: Vec<SearchHit>,
    pub function_hits: Vec<SearchHit>,
}

struct UnitIndex {
    index: FlatIndex,
    units: Vec<TextUnit>,
}

impl UnitIndex {
    fn new(dimension: usize) -> Self {
        Self {
            index: FlatIndex::new(dimension),
            units: Vec::new(),
        }
    }

    fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchHit>> {
        Ok(self
            .index
            .search(query, k)?
            .into_iter()
            .filter_map(|(row, score)| {
                self.units.get(row).map(|unit| SearchHit {
                    uid: unit.uid.clone(),
                    score,
                    file_path: unit.file_path.clone(),
                    qualified_name: unit.qualified_name.clone(),
                })
            })
            .collect())
    }
}

/// Similarity index over FILE and FUNCTION units.
///
/// The vector dimension is fixed by the first non-empty insert; every later
/// vector, including queries, must match it.
#[derive(Default)]
pub struct RetrievalStore {
    dimension: Option<usize>,
    files: Option<UnitIndex>,
    functions: Option<UnitIndex>,
}

impl RetrievalStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn dimension(&self) -> Option<usize> {
        self.dimension
    }

    /// Total number of stored units
    #[must_use]
    pub fn len(&self) -> usize {
        self.files.as_ref().map_or(0, |i| i.units.len())
            + self.functions.as_ref().map_or(0, |i| i.units.len())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub fn file_count(&self) -> usize {
        self.files.as_ref().map_or(0, |i| i.units.len())
    }

    #[must_use]
    pub fn function_count(&self) -> usize {
        self.functions.as_ref().map_or(0, |i| i.units.len())
    }

    /// Add one embedded batch. Vectors are normalized before storage.
    pub fn insert(&mut self, units: Vec<TextUnit>, vectors: Vec<Vec<f32>>) -> Result<()> {
        if units.len() != vectors.len() {
            return Err(VectorStoreError::CountMismatch {
                expected: units.len(),
                actual: vectors.len(),
            });
        }
        let Some(first) = vectors.first() else {
            return Ok(());
        };
        let dimension = *self.dimension.get_or_insert(first.len());

        for (unit, mut vector) in units.into_iter().zip(vectors) {
            if vector.len() != dimension {
                return Err(VectorStoreError::InvalidDimension {
                    expected: dimension,
                    actual: vector.len(),
                });
            }
            normalize(&mut vector);
            let target = match unit.kind {
                UnitKind::File => &mut self.files,
                UnitKind::Function => &mut self.functions,
            };
            let target = target.get_or_insert_with(|| UnitIndex::new(dimension));
            target.index.add(&vector)?;
            target.units.push(unit);
        }
        Ok(())
    }

    /// Top files and top functions for an already-embedded query
    pub fn search(
        &self,
        query: &[f32],
        top_files: usize,
        top_functions: usize,
    ) -> Result<RetrievalHits> {
        let Some(dimension) = self.dimension else {
            return Ok(RetrievalHits::default());
        };
        if query.len() != dimension {
            return Err(VectorStoreError::InvalidDimension {
                expected: dimension,
                actual: query.len(),
            });
        }

        let mut query = query.to_vec();
        normalize(&mut query);

        let file_hits = match &self.files {
            Some(files) => files.search(&query, top_files)?,
            None => Vec::new(),
        };
        let function_hits = match &self.functions {
            Some(functions) => functions.search(&query, top_functions)?,
            None => Vec::new(),
        };
        Ok(RetrievalHits {
            file_hits,
            function_hits,
        })
    }
}

use crate::error::{Result, VectorStoreError};
use ndarray::{Array1, Array2, ArrayView1};

/// Exact cosine index over unit-length rows.
///
/// Rows are stored in insertion order; ids are row positions.
#[derive(Debug, Clone)]
pub struct FlatIndex {
    dimension: usize,
    rows: Array2<f32>,
}

impl FlatIndex {
    #[must_use]
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            rows: Array2::zeros((0, dimension)),
        }
    }

    #[must_use]
    pub const fn dimension(&self) -> usize {
        self.dimension
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.nrows()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.nrows() == 0
    }

    /// Append a vector, returning its row id
    pub fn add(&mut self, vector: &[f32]) -> Result<usize> {
        if vector.len() != self.dimension {
            return Err(VectorStoreError::InvalidDimension {
                expected: self.dimension,
                actual: vector.len(),
            });
        }
        self.rows
            .push_row(ArrayView1::from(vector))
            .map_err(|e| VectorStoreError::EmbeddingError(e.to_string()))?;
        Ok(self.rows.nrows() - 1)
    }

    /// Top `k` rows by dot product with `query`, best first.
    ///
    /// Equal scores keep insertion order.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<(usize, f32)>> {
        if query.len() != self.dimension {
            return Err(VectorStoreError::InvalidDimension {
                expected: self.dimension,
                actual: query.len(),
            });
        }
        if k == 0 || self.is_empty() {
            return Ok(Vec::new());
        }

        let query = Array1::from(query.to_vec());
        let scores = self.rows.dot(&query);
        let mut ranked: Vec<(usize, f32)> = scores.iter().copied().enumerate().collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
        ranked.truncate(k);
        Ok(ranked)
    }
}

use crate::error::Result;
use crate::types::TokenUsage;
use async_trait::async_trait;

/// Vectors for one batch of texts, in input order
#[derive(Debug, Clone, Default)]
pub struct EmbeddingBatch {
    pub vectors: Vec<Vec<f32>>,
    pub usage: Option<TokenUsage>,
}

/// An already-initialised embedding backend.
///
/// Model loading, devices and caching belong to the implementor; the store
/// only ever calls [`Embedder::embed_batch`].
#[async_trait]
pub trait Embedder: Send + Sync {
    fn model_id(&self) -> &str;

    async fn embed_batch(&self, texts: &[String]) -> Result<EmbeddingBatch>;
}

/// Deterministic offline embedder: hash-seeded unit vectors.
///
/// Identical texts map to identical vectors, which makes it suitable for tests
/// and dry runs; similarity between different texts carries no meaning.
#[derive(Debug, Clone)]
pub struct StubEmbedder {
    dimension: usize,
}

impl StubEmbedder {
    #[must_use]
    pub const fn new(dimension: usize) -> Self {
        Self { dimension }
    }

    #[must_use]
    pub const fn dimension(&self) -> usize {
        self.dimension
    }
}

#[async_trait]
impl Embedder for StubEmbedder {
    fn model_id(&self) -> &str {
        "stub"
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<EmbeddingBatch> {
        Ok(EmbeddingBatch {
            vectors: texts
                .iter()
                .map(|text| stub_embed(text, self.dimension))
                .collect(),
            usage: None,
        })
    }
}

/// Scale `vec` to unit length; zero vectors are left untouched
pub fn normalize(vec: &mut [f32]) {
    let norm = vec.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm == 0.0 {
        return;
    }
    for value in vec {
        *value /= norm;
    }
}

fn stub_embed(text: &str, dimension: usize) -> Vec<f32> {
    let mut state =
        fnv1a_64(text.as_bytes()) ^ (dimension as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15);
    let mut vec = Vec::with_capacity(dimension);
    for _ in 0..dimension {
        let bits = splitmix64(&mut state);
        let high = (bits >> 32) as u32;
        let mantissa = high >> 9;
        let unit = f32::from_bits(0x3f80_0000 | mantissa) - 1.0;
        vec.push(unit.mul_add(2.0, -1.0));
    }
    normalize(&mut vec);
    vec
}

fn fnv1a_64(bytes: &[u8]) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for byte in bytes {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
    }
    hash
}

const fn splitmix64(state: &mut u64) -> u64 {
    *state = state.wrapping_add(0x9E37_79B9_7F4A_7C15);
    let mut z = *state;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn stub_is_deterministic_and_unit_length() {
        let embedder = StubEmbedder::new(16);
        let texts = vec!["alpha".to_string(), "beta".to_string(), "alpha".to_string()];
        let batch = embedder.embed_batch(&texts).await.unwrap();

        assert_eq!(batch.vectors.len(), 3);
        assert_eq!(batch.vectors[0], batch.vectors[2]);
        assert_ne!(batch.vectors[0], batch.vectors[1]);
        let norm: f32 = batch.vectors[1].iter().map(|v| v * v).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
        assert!(batch.usage.is_none());
    }
}

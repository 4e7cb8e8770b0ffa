use crate::client::ChatClient;
use crate::error::{LlmError, Result};
use async_trait::async_trait;
use faultloc_vector_store::{Embedder, EmbeddingBatch, TokenUsage, VectorStoreError};
use serde::{Deserialize, Serialize};

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingItem>,
    usage: Option<TokenUsage>,
}

#[derive(Deserialize)]
struct EmbeddingItem {
    index: usize,
    embedding: Vec<f32>,
}

/// OpenAI-compatible `/embeddings` backend sharing the chat client's credentials
pub struct HttpEmbedder {
    client: ChatClient,
    model: String,
}

impl HttpEmbedder {
    #[must_use]
    pub fn new(client: ChatClient, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
        }
    }

    async fn request(&self, texts: &[String]) -> Result<EmbeddingBatch> {
        let response = self
            .client
            .http()
            .post(format!("{}/embeddings", self.client.base_url()))
            .bearer_auth(self.client.api_key())
            .json(&EmbeddingRequest {
                model: &self.model,
                input: texts,
            })
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(LlmError::ApiError {
                status: status.as_u16(),
                body,
            });
        }
        parse_embedding_response(&body, texts.len())
    }
}

/// Vectors in input order; the count must match the request
pub fn parse_embedding_response(body: &str, expected: usize) -> Result<EmbeddingBatch> {
    let mut parsed: EmbeddingResponse = serde_json::from_str(body)?;
    if parsed.data.len() != expected {
        return Err(LlmError::InvalidResponse(format!(
            "expected {expected} embeddings, got {}",
            parsed.data.len()
        )));
    }
    parsed.data.sort_by_key(|item| item.index);
    Ok(EmbeddingBatch {
        vectors: parsed.data.into_iter().map(|item| item.embedding).collect(),
        usage: parsed.usage,
    })
}

#[async_trait]
impl Embedder for HttpEmbedder {
    fn model_id(&self) -> &str {
        &self.model
    }

    async fn embed_batch(&self, texts: &[String]) -> faultloc_vector_store::Result<EmbeddingBatch> {
        if texts.is_empty() {
            return Ok(EmbeddingBatch::default());
        }
        self.request(texts)
            .await
            .map_err(|e| VectorStoreError::EmbeddingError(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn restores_input_order() {
        let body = json!({
            "data": [
                {"index": 1, "embedding": [0.0, 1.0]},
                {"index": 0, "embedding": [1.0, 0.0]}
            ],
            "usage": {"prompt_tokens": 7, "total_tokens": 7}
        })
        .to_string();
        let batch = parse_embedding_response(&body, 2).unwrap();
        assert_eq!(batch.vectors, vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
        assert_eq!(batch.usage.unwrap().input(), 7);
    }

    #[test]
    fn count_mismatch_is_rejected() {
        let body = json!({"data": [{"index": 0, "embedding": [1.0]}]}).to_string();
        assert!(matches!(
            parse_embedding_response(&body, 2),
            Err(LlmError::InvalidResponse(_))
        ));
    }
}

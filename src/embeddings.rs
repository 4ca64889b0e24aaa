// file: src/embeddings.rs
// description: sentence embedding client over an OpenAI-compatible endpoint
// reference: https://huggingface.co/sentence-transformers/all-MiniLM-L6-v2

use crate::config::EmbeddingConfig;
use crate::error::{IngestError, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

#[derive(Debug, Serialize)]
struct EmbeddingRequest {
    input: Vec<String>,
    model: String,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

pub struct EmbeddingClient {
    client: Client,
    config: EmbeddingConfig,
}

impl EmbeddingClient {
    pub fn new(config: EmbeddingConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    pub fn dimensions(&self) -> usize {
        self.config.dimensions
    }

    pub async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut embeddings = self.embed_batch(&[text.to_string()]).await?;
        embeddings
            .pop()
            .ok_or_else(|| IngestError::Embedding("no embedding data returned".to_string()))
    }

    /// Embeds a batch of texts in one request. Results come back in input
    /// order, one vector per text.
    pub async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let request = EmbeddingRequest {
            input: texts.to_vec(),
            model: self.config.model.clone(),
        };

        debug!("Requesting embeddings for {} texts", texts.len());

        let mut builder = self
            .client
            .post(&self.config.api_url)
            .header("Content-Type", "application/json")
            .json(&request);

        if let Some(api_key) = &self.config.api_key {
            builder = builder.header("Authorization", format!("Bearer {}", api_key));
        }

        let response = builder.send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(IngestError::Embedding(format!(
                "embedding request failed with status {}: {}",
                status, error_text
            )));
        }

        let embedding_response: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| IngestError::Embedding(format!("failed to parse response: {}", e)))?;

        if embedding_response.data.len() != texts.len() {
            return Err(IngestError::Embedding(format!(
                "expected {} embeddings, got {}",
                texts.len(),
                embedding_response.data.len()
            )));
        }

        let embeddings: Vec<Vec<f32>> = embedding_response
            .data
            .into_iter()
            .map(|d| d.embedding)
            .collect();

        if let Some(first) = embeddings.first() {
            debug!("Received embeddings of dimension {}", first.len());
        }

        Ok(embeddings)
    }

    /// Generate a fallback embedding when no API key is configured or the
    /// remote endpoint is unavailable.
    pub fn generate_fallback_embedding(text: &str, dim: usize) -> Vec<f32> {
        warn!("Using fallback embedding generation");
        // Simple deterministic embedding based on text hash
        let hash = text.bytes().fold(0u64, |acc, b| acc.wrapping_add(b as u64));
        (0..dim)
            .map(|i| (hash.wrapping_add(i as u64) % 1000) as f32 / 1000.0)
            .collect()
    }
}

// file: src/elastic/ingest.rs
// description: single and bulk document ingestion with vector embeddings
// reference: https://www.elastic.co/guide/en/elasticsearch/reference/current/docs-bulk.html

use crate::config::Config;
use crate::elastic::client::ElasticClient;
use crate::elastic::index::IndexManager;
use crate::embeddings::EmbeddingClient;
use crate::error::{IngestError, Result};
use crate::models::Document;
use futures::stream::{self, StreamExt};
use reqwest::Method;
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

pub struct DocumentInserter<'a> {
    client: &'a ElasticClient,
    index_name: String,
    text_field: String,
    vector_field: String,
    embedding_enabled: bool,
    embedding_dims: usize,
    embedding_client: Option<Arc<EmbeddingClient>>,
    batch_size: usize,
    parallel_workers: usize,
}

#[derive(Debug, Clone, Default)]
pub struct BulkStats {
    pub indexed: usize,
    pub errors: usize,
}

impl BulkStats {
    fn merge(&mut self, other: &BulkStats) {
        self.indexed += other.indexed;
        self.errors += other.errors;
    }
}

impl<'a> DocumentInserter<'a> {
    pub fn new(client: &'a ElasticClient, config: &Config) -> Self {
        // Remote embeddings need an API key; without one every vector comes
        // from the deterministic fallback.
        let embedding_client = if config.index.with_embedding && config.embedding.api_key.is_some()
        {
            info!("DocumentInserter initialized with remote embeddings");
            Some(Arc::new(EmbeddingClient::new(config.embedding.clone())))
        } else {
            if config.index.with_embedding {
                warn!("DocumentInserter initialized without API key - using fallback embeddings");
            }
            None
        };

        Self {
            client,
            index_name: config.index.name.clone(),
            text_field: config.index.text_field.clone(),
            vector_field: config.index.vector_field.clone(),
            embedding_enabled: config.index.with_embedding,
            embedding_dims: config.embedding.dimensions,
            embedding_client,
            batch_size: config.ingest.batch_size,
            parallel_workers: config.ingest.parallel_workers,
        }
    }

    /// Insert a single document, attaching its embedding when enabled, and
    /// return the engine's response (which carries the assigned `_id`).
    pub async fn insert_document(&self, mut document: Document) -> Result<Value> {
        if self.embedding_enabled {
            let text = document
                .text(&self.text_field)
                .ok_or_else(|| self.missing_field_error())?
                .to_string();
            let embedding = self.generate_embedding(&text).await;
            document.set_embedding(&self.vector_field, embedding);
        }

        let response = self
            .client
            .send(
                self.client
                    .request(Method::POST, &format!("{}/_doc", self.index_name))
                    .json(&document),
            )
            .await?;

        let body: Value = response.json().await?;
        debug!(
            "Inserted document into {}: {}",
            self.index_name,
            body["_id"].as_str().unwrap_or("?")
        );
        Ok(body)
    }

    /// Bulk-insert documents in batches. Documents missing the text field are
    /// skipped and counted as errors; a failed batch is logged and counted
    /// without aborting the remaining batches.
    pub async fn bulk_insert(&self, documents: Vec<Document>) -> Result<BulkStats> {
        let mut stats = BulkStats::default();

        let accepted: Vec<Document> = if self.embedding_enabled {
            documents
                .into_iter()
                .filter(|doc| {
                    if doc.text(&self.text_field).is_some() {
                        true
                    } else {
                        warn!("Skipping document without '{}' field", self.text_field);
                        stats.errors += 1;
                        false
                    }
                })
                .collect()
        } else {
            documents
        };

        if accepted.is_empty() {
            return Ok(stats);
        }

        let batches: Vec<Vec<Document>> = accepted
            .chunks(self.batch_size)
            .map(<[Document]>::to_vec)
            .collect();

        info!(
            "Bulk inserting {} documents in {} batches",
            batches.iter().map(Vec::len).sum::<usize>(),
            batches.len()
        );

        let results = stream::iter(batches.into_iter().map(|batch| self.process_batch(batch)))
            .buffer_unordered(self.parallel_workers)
            .collect::<Vec<_>>()
            .await;

        for result in results {
            stats.merge(&result);
        }

        info!(
            "Bulk insert complete: {} indexed, {} errors",
            stats.indexed, stats.errors
        );
        Ok(stats)
    }

    /// Recreate the index, load a JSON document array from `path`, and
    /// bulk-insert it.
    pub async fn rebuild_from_file(
        &self,
        index: &IndexManager<'_>,
        path: &Path,
    ) -> Result<BulkStats> {
        info!("Rebuilding index {} from {}", self.index_name, path.display());

        let dims = self.embedding_enabled.then_some(self.embedding_dims);
        index.recreate(dims).await?;

        let raw = std::fs::read_to_string(path)?;
        let documents = Document::array_from_value(serde_json::from_str(&raw)?)?;

        info!("Loaded {} documents from {}", documents.len(), path.display());
        self.bulk_insert(documents).await
    }

    async fn process_batch(&self, mut batch: Vec<Document>) -> BulkStats {
        let batch_len = batch.len();

        if self.embedding_enabled {
            let texts: Vec<String> = batch
                .iter()
                .map(|doc| {
                    doc.text(&self.text_field)
                        .unwrap_or_default()
                        .to_string()
                })
                .collect();

            let embeddings = self.generate_embeddings(&texts).await;
            for (doc, embedding) in batch.iter_mut().zip(embeddings) {
                doc.set_embedding(&self.vector_field, embedding);
            }
        }

        match self.submit_bulk(&batch).await {
            Ok(stats) => stats,
            Err(e) => {
                error!("Bulk batch of {} documents failed: {}", batch_len, e);
                BulkStats {
                    indexed: 0,
                    errors: batch_len,
                }
            }
        }
    }

    async fn submit_bulk(&self, batch: &[Document]) -> Result<BulkStats> {
        let body = Self::bulk_body(batch)?;

        let response = self
            .client
            .send(
                self.client
                    .request(Method::POST, &format!("{}/_bulk", self.index_name))
                    .header("Content-Type", "application/x-ndjson")
                    .body(body),
            )
            .await?;

        let body: Value = response.json().await?;
        Ok(Self::bulk_stats_from_response(&body, batch.len()))
    }

    /// NDJSON body for `POST /{index}/_bulk`: one action line and one source
    /// line per document, with a trailing newline.
    pub fn bulk_body(documents: &[Document]) -> Result<String> {
        let mut body = String::new();
        for document in documents {
            body.push_str("{\"index\":{}}\n");
            body.push_str(&serde_json::to_string(document)?);
            body.push('\n');
        }
        Ok(body)
    }

    /// Tally indexed/error counts from a bulk response. A response without an
    /// item list counts the whole batch one way based on the `errors` flag.
    pub fn bulk_stats_from_response(response: &Value, batch_len: usize) -> BulkStats {
        let Some(items) = response["items"].as_array() else {
            return if response["errors"].as_bool().unwrap_or(false) {
                BulkStats {
                    indexed: 0,
                    errors: batch_len,
                }
            } else {
                BulkStats {
                    indexed: batch_len,
                    errors: 0,
                }
            };
        };

        let mut stats = BulkStats::default();
        for item in items {
            let status = item["index"]["status"].as_u64().unwrap_or(500);
            if status < 300 {
                stats.indexed += 1;
            } else {
                stats.errors += 1;
            }
        }
        stats
    }

    /// Embed one text, falling back to the deterministic embedding on any
    /// remote failure or dimension mismatch.
    async fn generate_embedding(&self, text: &str) -> Vec<f32> {
        if let Some(client) = &self.embedding_client {
            match client.embed(text).await {
                Ok(embedding) if embedding.len() == self.embedding_dims => {
                    debug!("Generated remote embedding for {} chars", text.len());
                    return embedding;
                }
                Ok(embedding) => {
                    warn!(
                        "Remote embedding has dimension {}, expected {}. Using fallback.",
                        embedding.len(),
                        self.embedding_dims
                    );
                }
                Err(e) => {
                    warn!("Remote embedding failed: {}. Using fallback.", e);
                }
            }
        }

        EmbeddingClient::generate_fallback_embedding(text, self.embedding_dims)
    }

    async fn generate_embeddings(&self, texts: &[String]) -> Vec<Vec<f32>> {
        if let Some(client) = &self.embedding_client {
            match client.embed_batch(texts).await {
                Ok(embeddings)
                    if embeddings.iter().all(|e| e.len() == self.embedding_dims) =>
                {
                    return embeddings;
                }
                Ok(_) => {
                    warn!("Remote batch embedding dimension mismatch. Using fallback.");
                }
                Err(e) => {
                    warn!("Remote batch embedding failed: {}. Using fallback.", e);
                }
            }
        }

        texts
            .iter()
            .map(|text| EmbeddingClient::generate_fallback_embedding(text, self.embedding_dims))
            .collect()
    }

    fn missing_field_error(&self) -> IngestError {
        IngestError::Validation(format!(
            "document is missing the '{}' field required for embedding",
            self.text_field
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_bulk_stats_default() {
        let stats = BulkStats::default();
        assert_eq!(stats.indexed, 0);
        assert_eq!(stats.errors, 0);
    }

    #[test]
    fn test_bulk_body_format() {
        let docs = vec![
            Document::from_value(json!({"summary": "first"})).unwrap(),
            Document::from_value(json!({"summary": "second"})).unwrap(),
        ];

        let body = DocumentInserter::bulk_body(&docs).unwrap();
        let lines: Vec<&str> = body.lines().collect();

        assert!(body.ends_with('\n'));
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], "{\"index\":{}}");
        assert_eq!(lines[1], "{\"summary\":\"first\"}");
        assert_eq!(lines[2], "{\"index\":{}}");
        assert_eq!(lines[3], "{\"summary\":\"second\"}");
    }

    #[test]
    fn test_bulk_stats_from_response_counts_items() {
        let response = json!({
            "errors": true,
            "items": [
                {"index": {"_id": "a", "status": 201}},
                {"index": {"_id": "b", "status": 201}},
                {"index": {"status": 400, "error": {"type": "mapper_parsing_exception"}}}
            ]
        });

        let stats = DocumentInserter::bulk_stats_from_response(&response, 3);
        assert_eq!(stats.indexed, 2);
        assert_eq!(stats.errors, 1);
    }

    #[test]
    fn test_bulk_stats_from_response_without_items() {
        let ok = DocumentInserter::bulk_stats_from_response(&json!({"errors": false}), 5);
        assert_eq!(ok.indexed, 5);
        assert_eq!(ok.errors, 0);

        let failed = DocumentInserter::bulk_stats_from_response(&json!({"errors": true}), 5);
        assert_eq!(failed.indexed, 0);
        assert_eq!(failed.errors, 5);
    }
}

// file: src/elastic/index.rs
// description: index lifecycle management with dense_vector mappings
// reference: https://www.elastic.co/guide/en/elasticsearch/reference/current/dense-vector.html

use crate::config::IndexConfig;
use crate::elastic::client::ElasticClient;
use crate::error::{IngestError, Result};
use reqwest::Method;
use serde_json::{Value, json};
use tracing::{debug, info};

pub struct IndexManager<'a> {
    client: &'a ElasticClient,
    config: IndexConfig,
}

impl<'a> IndexManager<'a> {
    pub fn new(client: &'a ElasticClient, config: IndexConfig) -> Self {
        Self { client, config }
    }

    pub fn index_name(&self) -> &str {
        &self.config.name
    }

    pub async fn exists(&self) -> Result<bool> {
        let result = self
            .client
            .send(self.client.request(Method::HEAD, &self.config.name))
            .await;

        match result {
            Ok(_) => Ok(true),
            Err(IngestError::Api { status: 404, .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Deletes the index, ignoring a missing one.
    pub async fn delete(&self) -> Result<()> {
        let result = self
            .client
            .send(self.client.request(Method::DELETE, &self.config.name))
            .await;

        match result {
            Ok(_) => {
                info!("Deleted index: {}", self.config.name);
                Ok(())
            }
            Err(IngestError::Api { status: 404, .. }) => {
                debug!("Index {} does not exist, nothing to delete", self.config.name);
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Creates the index, declaring the dense_vector field when embedding
    /// is enabled.
    pub async fn create(&self, embedding_dims: Option<usize>) -> Result<()> {
        let body = Self::mapping_body(&self.config, embedding_dims);

        self.client
            .send(
                self.client
                    .request(Method::PUT, &self.config.name)
                    .json(&body),
            )
            .await?;

        info!("Created index: {}", self.config.name);
        Ok(())
    }

    /// Delete-if-exists then create.
    pub async fn recreate(&self, embedding_dims: Option<usize>) -> Result<()> {
        self.delete().await?;
        self.create(embedding_dims).await
    }

    /// Index settings body. Without dimensions the index is created with
    /// fully dynamic mappings.
    pub fn mapping_body(config: &IndexConfig, embedding_dims: Option<usize>) -> Value {
        match embedding_dims {
            Some(dims) => json!({
                "mappings": {
                    "properties": {
                        config.vector_field.clone(): {
                            "type": "dense_vector",
                            "dims": dims,
                        }
                    }
                }
            }),
            None => json!({}),
        }
    }
}

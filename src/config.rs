// file: src/config.rs
// description: application configuration management with toml support
// reference: https://docs.rs/config

use crate::error::{IngestError, Result};
use dotenvy::dotenv;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub elastic: ElasticConfig,
    pub index: IndexConfig,
    pub embedding: EmbeddingConfig,
    pub ingest: IngestConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ElasticConfig {
    /// Elastic Cloud deployment id, `label:base64(host$es_uuid$...)`.
    #[serde(default)]
    pub cloud_id: Option<String>,

    /// API key sent as `Authorization: ApiKey <key>`.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Direct endpoint URL. Takes precedence over `cloud_id` when set,
    /// which is also how the integration tests point at a mock server.
    #[serde(default)]
    pub url: Option<String>,

    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct IndexConfig {
    pub name: String,
    /// Document field whose text is embedded.
    pub text_field: String,
    /// Field the dense vector is written to.
    pub vector_field: String,
    pub with_embedding: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EmbeddingConfig {
    pub api_url: String,
    #[serde(default)]
    pub api_key: Option<String>,
    pub model: String,
    pub dimensions: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct IngestConfig {
    pub data_file: PathBuf,
    pub batch_size: usize,
    pub parallel_workers: usize,
}

impl Config {
    pub fn load(path: Option<&Path>) -> Result<Self> {
        dotenv().ok();

        let mut builder = config::Config::builder();

        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path));
        } else {
            builder = builder.add_source(config::File::from(Path::new("config/default.toml")));
        }

        builder = builder.add_source(
            config::Environment::with_prefix("ES_INGEST")
                .separator("__")
                .try_parsing(true),
        );

        let settings = builder
            .build()
            .map_err(|e| IngestError::Config(e.to_string()))?;

        let mut config: Config = settings
            .try_deserialize()
            .map_err(|e| IngestError::Config(e.to_string()))?;

        config.apply_credential_env();
        config.validate()?;
        Ok(config)
    }

    /// `ELASTIC_CLOUD_ID` and `ELASTIC_API_KEY` are the canonical credential
    /// variables and win over anything in the config file.
    fn apply_credential_env(&mut self) {
        if let Ok(cloud_id) = std::env::var("ELASTIC_CLOUD_ID") {
            self.elastic.cloud_id = Some(cloud_id);
        }
        if let Ok(api_key) = std::env::var("ELASTIC_API_KEY") {
            self.elastic.api_key = Some(api_key);
        }
    }

    pub fn default_config() -> Self {
        Self {
            elastic: ElasticConfig {
                cloud_id: None,
                api_key: None,
                url: None,
                request_timeout_secs: 30,
            },
            index: IndexConfig {
                name: "my_documents".to_string(),
                text_field: "summary".to_string(),
                vector_field: "embedding".to_string(),
                with_embedding: true,
            },
            embedding: EmbeddingConfig {
                api_url: "https://router.huggingface.co/v1/embeddings".to_string(),
                api_key: None,
                model: "sentence-transformers/all-MiniLM-L6-v2".to_string(),
                dimensions: 384,
            },
            ingest: IngestConfig {
                data_file: PathBuf::from("data.json"),
                batch_size: 100,
                parallel_workers: 4,
            },
        }
    }

    fn validate(&self) -> Result<()> {
        if self.index.name.is_empty() {
            return Err(IngestError::Config(
                "index name must not be empty".to_string(),
            ));
        }

        if self.ingest.batch_size == 0 {
            return Err(IngestError::Config(
                "batch_size must be greater than 0".to_string(),
            ));
        }

        if self.ingest.parallel_workers == 0 {
            return Err(IngestError::Config(
                "parallel_workers must be greater than 0".to_string(),
            ));
        }

        if self.index.with_embedding && self.embedding.dimensions == 0 {
            return Err(IngestError::Config(
                "embedding dimensions must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

// file: src/lib.rs
// description: library entry point and public api exports
// reference: rust library patterns
#![doc = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/readme.md"))]

pub mod config;
pub mod elastic;
pub mod embeddings;
pub mod error;
pub mod models;
pub mod utils;

pub use config::{Config, ElasticConfig, EmbeddingConfig, IndexConfig, IngestConfig};
pub use elastic::{BulkStats, DocumentInserter, ElasticClient, IndexManager};
pub use embeddings::EmbeddingClient;
pub use error::{IngestError, Result};
pub use models::{Document, SearchHit};

// file: src/elastic/mod.rs
// description: Elasticsearch operations module exports
// reference: internal module structure

pub mod client;
pub mod index;
pub mod ingest;

pub use client::ElasticClient;
pub use index::IndexManager;
pub use ingest::{BulkStats, DocumentInserter};

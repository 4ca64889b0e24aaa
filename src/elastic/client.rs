// file: src/elastic/client.rs
// description: Elasticsearch HTTP client with cloud id resolution
// reference: https://www.elastic.co/guide/en/elasticsearch/reference/current/rest-apis.html

use crate::config::ElasticConfig;
use crate::error::{IngestError, Result};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info};

#[derive(Clone)]
pub struct ElasticClient {
    http: Client,
    base_url: String,
    api_key: Option<String>,
}

impl ElasticClient {
    pub fn new(config: ElasticConfig) -> Result<Self> {
        let base_url = match (&config.url, &config.cloud_id) {
            (Some(url), _) => url.trim_end_matches('/').to_string(),
            (None, Some(cloud_id)) => decode_cloud_id(cloud_id)?,
            (None, None) => {
                return Err(IngestError::Config(
                    "no Elasticsearch endpoint configured: set ELASTIC_CLOUD_ID or elastic.url"
                        .to_string(),
                ));
            }
        };

        info!("Elasticsearch endpoint: {}", base_url);

        let http = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        Ok(Self {
            http,
            base_url,
            api_key: config.api_key,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Builds a request with authentication applied.
    pub fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}/{}", self.base_url, path.trim_start_matches('/'));
        let mut builder = self.http.request(method, url);

        if let Some(api_key) = &self.api_key {
            builder = builder.header("Authorization", format!("ApiKey {}", api_key));
        }

        builder
    }

    /// Sends a request and surfaces non-2xx responses as [`IngestError::Api`].
    pub async fn send(&self, builder: RequestBuilder) -> Result<reqwest::Response> {
        let response = builder.send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(IngestError::Api {
                status: status.as_u16(),
                body,
            });
        }

        Ok(response)
    }

    /// Fetches cluster info from `GET /`.
    pub async fn info(&self) -> Result<Value> {
        let response = self.send(self.request(Method::GET, "/")).await?;
        Ok(response.json().await?)
    }

    pub async fn ping(&self) -> Result<bool> {
        debug!("Checking Elasticsearch connection");

        match self.info().await {
            Ok(info) => {
                info!(
                    "Connected to Elasticsearch cluster '{}'",
                    info["cluster_name"].as_str().unwrap_or("unknown")
                );
                Ok(true)
            }
            Err(e) => Err(IngestError::Config(format!(
                "Elasticsearch connection failed: {}",
                e
            ))),
        }
    }

    /// Forwards an opaque query body to `POST /{index}/_search` and returns
    /// the engine's response unmodified.
    pub async fn search(&self, index: &str, body: &Value) -> Result<Value> {
        debug!("Searching index {}", index);

        let response = self
            .send(
                self.request(Method::POST, &format!("{}/_search", index))
                    .json(body),
            )
            .await?;

        Ok(response.json().await?)
    }

    /// Forwards `GET /{index}/_doc/{id}` and returns the response unmodified.
    /// A missing document surfaces as the engine's 404.
    pub async fn get_document(&self, index: &str, id: &str) -> Result<Value> {
        debug!("Retrieving document {} from {}", id, index);

        let response = self
            .send(self.request(Method::GET, &format!("{}/_doc/{}", index, id)))
            .await?;

        Ok(response.json().await?)
    }

    /// Document count for an index; a missing index counts as zero.
    pub async fn document_count(&self, index: &str) -> Result<u64> {
        let result = self
            .send(self.request(Method::GET, &format!("{}/_count", index)))
            .await;

        match result {
            Ok(response) => {
                let body: Value = response.json().await?;
                Ok(body["count"].as_u64().unwrap_or(0))
            }
            Err(IngestError::Api { status, .. }) if status == StatusCode::NOT_FOUND.as_u16() => {
                Ok(0)
            }
            Err(e) => Err(e),
        }
    }
}

/// Resolves an Elastic Cloud deployment id to its Elasticsearch endpoint URL.
/// The id has the form `label:base64("host$es_uuid$kibana_uuid")` and maps to
/// `https://{es_uuid}.{host}`, keeping any `:port` suffix on the host.
pub fn decode_cloud_id(cloud_id: &str) -> Result<String> {
    let (_label, encoded) = cloud_id
        .split_once(':')
        .ok_or_else(|| IngestError::CloudId("missing ':' separator".to_string()))?;

    let decoded = BASE64
        .decode(encoded)
        .map_err(|e| IngestError::CloudId(format!("invalid base64: {}", e)))?;
    let decoded = String::from_utf8(decoded)
        .map_err(|e| IngestError::CloudId(format!("invalid utf-8: {}", e)))?;

    let mut parts = decoded.split('$');
    let host = parts
        .next()
        .filter(|h| !h.is_empty())
        .ok_or_else(|| IngestError::CloudId("missing host".to_string()))?;
    let es_uuid = parts
        .next()
        .filter(|u| !u.is_empty())
        .ok_or_else(|| IngestError::CloudId("missing elasticsearch uuid".to_string()))?;

    match host.split_once(':') {
        Some((hostname, port)) => Ok(format!("https://{}.{}:{}", es_uuid, hostname, port)),
        None => Ok(format!("https://{}.{}", es_uuid, host)),
    }
}

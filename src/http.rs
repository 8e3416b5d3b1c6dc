//! HTTP ingestion transport
//!
//! Posts batches to the Langfuse public ingestion API with basic auth. The
//! endpoint answers `207 Multi-Status` with per-record outcomes; any non-2xx
//! status fails the whole batch.

use async_trait::async_trait;
use serde::Serialize;
use tracing::debug;

use crate::config::ClientConfig;
use crate::error::{Result, Error};
use crate::ingestion::{IngestionClient, IngestionResponse};
use crate::record::Record;

/// Path of the batch ingestion endpoint
pub const INGESTION_PATH: &str = "/api/public/ingestion";

/// Path of the health endpoint
pub const HEALTH_PATH: &str = "/api/public/health";

#[derive(Serialize)]
struct BatchRequest<'a> {
    batch: &'a [Record],
}

/// [`IngestionClient`] backed by `reqwest`
#[derive(Debug, Clone)]
pub struct HttpIngestionClient {
    http: reqwest::Client,
    host: String,
    public_key: String,
    secret_key: String,
}

impl HttpIngestionClient {
    /// Create a client from a resolved configuration
    pub fn new(config: &ClientConfig) -> Result<Self> {
        config.validate()?;

        let http = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .user_agent(concat!("langfuse_rs/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self::with_http_client(http, config))
    }

    /// Create a client around an existing `reqwest::Client`
    pub fn with_http_client(http: reqwest::Client, config: &ClientConfig) -> Self {
        Self {
            http,
            host: config.host.trim_end_matches('/').to_string(),
            public_key: config.public_key.clone(),
            secret_key: config.secret_key.clone(),
        }
    }

    /// URL of the batch ingestion endpoint
    pub fn ingestion_url(&self) -> String {
        format!("{}{}", self.host, INGESTION_PATH)
    }

    /// URL of the health endpoint
    pub fn health_url(&self) -> String {
        format!("{}{}", self.host, HEALTH_PATH)
    }

    /// Check that the API is reachable and the credentials are accepted
    pub async fn health(&self) -> Result<()> {
        let response = self
            .http
            .get(self.health_url())
            .basic_auth(&self.public_key, Some(&self.secret_key))
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(Error::server(status.as_u16(), body))
        }
    }
}

#[async_trait]
impl IngestionClient for HttpIngestionClient {
    async fn send_batch(&self, records: &[Record]) -> Result<IngestionResponse> {
        let response = self
            .http
            .post(self.ingestion_url())
            .basic_auth(&self.public_key, Some(&self.secret_key))
            .json(&BatchRequest { batch: records })
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(Error::server(status.as_u16(), body));
        }

        debug!(status = status.as_u16(), records = records.len(), "batch accepted");

        Ok(parse_response(&body))
    }
}

/// Parse a 2xx response body
///
/// Bodies that are not an ingestion result count as full success.
fn parse_response(body: &str) -> IngestionResponse {
    serde_json::from_str(body).unwrap_or_default()
}

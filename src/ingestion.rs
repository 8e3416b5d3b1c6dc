//! Batch ingestion interface
//!
//! The flush engine only knows the [`IngestionClient`] trait. A call either
//! fails as a whole (`Err`, the batch stays buffered) or returns an
//! [`IngestionResponse`] whose `errors` list names the records the endpoint
//! did not accept.

use async_trait::async_trait;
use serde::{Serialize, Deserialize};

use crate::error::Result;
use crate::record::Record;

/// A record the endpoint accepted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestionSuccess {
    /// Record id
    pub id: String,
    /// Per-record HTTP status
    #[serde(default)]
    pub status: u16,
}

/// A record the endpoint did not accept
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngestionError {
    /// Record id
    pub id: String,
    /// Per-record HTTP status
    #[serde(default)]
    pub status: u16,
    /// Human-readable reason
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Structured error detail, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<serde_json::Value>,
}

impl IngestionError {
    /// Create a new per-record error
    pub fn new(id: impl Into<String>, status: u16, message: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            status,
            message: Some(message.into()),
            error: None,
        }
    }
}

/// Outcome of one batch call
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IngestionResponse {
    /// Accepted records
    #[serde(default)]
    pub successes: Vec<IngestionSuccess>,
    /// Rejected records
    #[serde(default)]
    pub errors: Vec<IngestionError>,
}

impl IngestionResponse {
    /// A response with no per-record errors
    pub fn ok() -> Self {
        Self::default()
    }

    /// A response rejecting the given records
    pub fn with_errors(errors: Vec<IngestionError>) -> Self {
        Self {
            successes: Vec::new(),
            errors,
        }
    }

    /// Check if any record was rejected
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Ids of the rejected records
    pub fn failed_ids(&self) -> impl Iterator<Item = &str> {
        self.errors.iter().map(|error| error.id.as_str())
    }
}

/// Remote batch ingestion
#[async_trait]
pub trait IngestionClient: Send + Sync {
    /// Deliver one batch of records, in order
    async fn send_batch(&self, records: &[Record]) -> Result<IngestionResponse>;
}

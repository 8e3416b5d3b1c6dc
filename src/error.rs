//! Error handling for langfuse_rs
//!
//! This module provides the error type and result alias shared by the batching
//! engine, the ingestion transport and the client facade.

use thiserror::Error;

/// Errors that can occur in langfuse_rs operations
#[derive(Error, Debug)]
pub enum Error {
    /// Every shard is at capacity; the record was not admitted
    #[error("No capacity: all {shards} shards are full ({capacity} records each)")]
    NoCapacity {
        shards: usize,
        capacity: usize,
    },

    /// The ingestion call could not complete
    #[error("Transport error: {0}")]
    Transport(String),

    /// The ingestion endpoint answered with a non-success status
    #[error("Server error: HTTP {status}: {body}")]
    Server {
        status: u16,
        body: String,
    },

    /// Errors related to serialization/deserialization of record bodies
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Errors related to configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// A record was rejected before admission
    #[error("Validation error: {0}")]
    Validation(String),

    /// Errors raised by the HTTP client
    #[cfg(feature = "http")]
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Generic error type for other cases
    #[error("{0}")]
    Other(String),
}

/// Result type for langfuse_rs operations
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create a new no-capacity error
    pub fn no_capacity(shards: usize, capacity: usize) -> Self {
        Self::NoCapacity { shards, capacity }
    }

    /// Create a new transport error
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport(message.into())
    }

    /// Create a new server error
    pub fn server(status: u16, body: impl Into<String>) -> Self {
        Self::Server {
            status,
            body: body.into(),
        }
    }

    /// Create a new configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a new validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a new generic error
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other(message.into())
    }

    /// Check if this is a no-capacity error
    pub fn is_no_capacity(&self) -> bool {
        matches!(self, Self::NoCapacity { .. })
    }

    /// Check if this is a serialization error
    pub fn is_serialization_error(&self) -> bool {
        matches!(self, Self::Serialization(_))
    }

    /// Check if this is a validation error
    pub fn is_validation_error(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Check if the failure happened on the way to the endpoint
    ///
    /// Batches that fail this way stay buffered for the next flush cycle.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(_) | Self::Server { .. } => true,
            #[cfg(feature = "http")]
            Self::Http(_) => true,
            _ => false,
        }
    }

    /// Get a user-friendly suggestion for resolving the error
    pub fn suggestion(&self) -> Option<String> {
        match self {
            Self::NoCapacity { .. } => {
                Some("Flush more often or raise the shard count / capacity".to_string())
            }
            Self::Server { status: 401, .. } | Self::Server { status: 403, .. } => {
                Some("Check LANGFUSE_PUBLIC_KEY and LANGFUSE_SECRET_KEY".to_string())
            }
            Self::Config(_) => Some("Check the client configuration and environment".to_string()),
            _ => None,
        }
    }
}

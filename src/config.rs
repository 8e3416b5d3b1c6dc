//! Configuration for langfuse_rs
//!
//! This module provides the client configuration: credentials, endpoint
//! resolution and the sizing of the shard pool and flush loop.

use std::time::Duration;
use serde::{Serialize, Deserialize};

use crate::error::{Result, Error};

/// Host used when neither the caller nor the environment provides one
pub const DEFAULT_HOST: &str = "https://cloud.langfuse.com";

/// Environment variable holding the public API key
pub const ENV_PUBLIC_KEY: &str = "LANGFUSE_PUBLIC_KEY";
/// Environment variable holding the secret API key
pub const ENV_SECRET_KEY: &str = "LANGFUSE_SECRET_KEY";
/// Environment variable holding the API host
pub const ENV_HOST: &str = "LANGFUSE_HOST";
/// Environment variable holding the release tag applied to traces
pub const ENV_RELEASE: &str = "LANGFUSE_RELEASE";

/// Configuration options for a langfuse client
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[non_exhaustive]
pub struct ClientConfig {
    // Endpoint and credentials
    /// Base URL of the Langfuse API
    pub host: String,
    /// Public API key (basic auth user)
    pub public_key: String,
    /// Secret API key (basic auth password)
    #[serde(skip_serializing)]
    pub secret_key: String,
    /// Release tag applied to traces that do not set one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub release: Option<String>,

    // Buffering
    /// Number of independent shards
    pub shard_count: usize,
    /// Maximum number of records per shard
    pub shard_capacity: usize,
    /// Interval between flush cycles in milliseconds
    pub flush_interval_ms: u64,

    // Transport
    /// Timeout applied to each ingestion request in milliseconds
    pub request_timeout_ms: u64,

    // Additional settings
    /// Log the delivery metrics report when the client shuts down
    ///
    /// Counters are always kept; this only controls the final report.
    pub report_metrics_on_shutdown: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            public_key: String::new(),
            secret_key: String::new(),
            release: None,

            shard_count: 10,
            shard_capacity: 100,
            flush_interval_ms: 500,

            request_timeout_ms: 10_000,

            report_metrics_on_shutdown: true,
        }
    }
}

impl ClientConfig {
    /// Create a new client configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a configuration from the process environment
    pub fn from_env() -> Self {
        Self::default().apply_env()
    }

    /// Fill every field left empty from the process environment
    ///
    /// Values set explicitly always win over the environment. The host falls
    /// back to [`DEFAULT_HOST`].
    pub fn apply_env(self) -> Self {
        self.apply_env_with(|key| std::env::var(key).ok())
    }

    fn apply_env_with<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|value| !value.is_empty());

        if self.public_key.is_empty() {
            self.public_key = var(ENV_PUBLIC_KEY).unwrap_or_default();
        }
        if self.secret_key.is_empty() {
            self.secret_key = var(ENV_SECRET_KEY).unwrap_or_default();
        }
        if self.host.is_empty() {
            self.host = var(ENV_HOST).unwrap_or_else(|| DEFAULT_HOST.to_string());
        }
        if self.release.is_none() {
            self.release = var(ENV_RELEASE);
        }

        self
    }

    /// Set the API host
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Set the API key pair
    pub fn with_credentials(mut self, public_key: impl Into<String>, secret_key: impl Into<String>) -> Self {
        self.public_key = public_key.into();
        self.secret_key = secret_key.into();
        self
    }

    /// Set the release tag
    pub fn with_release(mut self, release: impl Into<String>) -> Self {
        self.release = Some(release.into());
        self
    }

    /// Set the number of shards
    pub fn with_shard_count(mut self, count: usize) -> Self {
        self.shard_count = count;
        self
    }

    /// Set the per-shard capacity
    pub fn with_shard_capacity(mut self, capacity: usize) -> Self {
        self.shard_capacity = capacity;
        self
    }

    /// Set the flush interval
    pub fn with_flush_interval(mut self, interval: Duration) -> Self {
        self.flush_interval_ms = interval.as_millis() as u64;
        self
    }

    /// Set the per-request timeout
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout_ms = timeout.as_millis() as u64;
        self
    }

    /// Set whether to log the metrics report on shutdown
    pub fn with_report_metrics_on_shutdown(mut self, report: bool) -> Self {
        self.report_metrics_on_shutdown = report;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.shard_count < 1 {
            return Err(Error::config("Shard count must be at least 1"));
        }

        if self.shard_capacity < 1 {
            return Err(Error::config("Shard capacity must be at least 1"));
        }

        if self.flush_interval_ms < 1 {
            return Err(Error::config("Flush interval must be at least 1ms"));
        }

        if self.request_timeout_ms < 1 {
            return Err(Error::config("Request timeout must be at least 1ms"));
        }

        if self.host.is_empty() {
            return Err(Error::config("Host must not be empty"));
        }

        if !(self.host.starts_with("http://") || self.host.starts_with("https://")) {
            return Err(Error::config(format!(
                "Host must be an http(s) URL, got {}",
                self.host
            )));
        }

        Ok(())
    }

    /// Get the flush interval as a Duration
    pub fn flush_interval(&self) -> Duration {
        Duration::from_millis(self.flush_interval_ms)
    }

    /// Get the request timeout as a Duration
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Total number of records the pool can hold
    pub fn total_capacity(&self) -> usize {
        self.shard_count * self.shard_capacity
    }

    /// Whether both API keys are present
    pub fn has_credentials(&self) -> bool {
        !self.public_key.is_empty() && !self.secret_key.is_empty()
    }

    /// Create a human-readable string representation of the configuration
    pub fn to_string_pretty(&self) -> String {
        let mut result = String::new();

        result.push_str("=== Langfuse Client Configuration ===\n\n");

        result.push_str("Endpoint:\n");
        result.push_str(&format!("  Host: {}\n", self.host));
        result.push_str(&format!("  Public Key: {}\n", self.public_key));
        if self.secret_key.is_empty() {
            result.push_str("  Secret Key: <unset>\n");
        } else {
            result.push_str("  Secret Key: ****\n");
        }
        if let Some(ref release) = self.release {
            result.push_str(&format!("  Release: {}\n", release));
        }

        result.push_str("\nBuffering:\n");
        result.push_str(&format!("  Shards: {}\n", self.shard_count));
        result.push_str(&format!("  Shard Capacity: {}\n", self.shard_capacity));
        result.push_str(&format!("  Flush Interval: {} ms\n", self.flush_interval_ms));

        result.push_str("\nTransport:\n");
        result.push_str(&format!("  Request Timeout: {} ms\n", self.request_timeout_ms));

        result.push_str("\nAdditional Settings:\n");
        result.push_str(&format!("  Report Metrics On Shutdown: {}\n", self.report_metrics_on_shutdown));

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = ClientConfig::default();

        assert_eq!(config.shard_count, 10);
        assert_eq!(config.shard_capacity, 100);
        assert_eq!(config.flush_interval(), Duration::from_millis(500));
        assert_eq!(config.request_timeout(), Duration::from_secs(10));
        assert_eq!(config.total_capacity(), 1000);
        assert!(config.report_metrics_on_shutdown);

        // Host is resolved from the environment, so the bare default is incomplete
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_env_resolution() {
        let config = ClientConfig::new().apply_env_with(env(&[
            (ENV_PUBLIC_KEY, "public-key"),
            (ENV_SECRET_KEY, "secret-key"),
            (ENV_HOST, "http://localhost:8080"),
            (ENV_RELEASE, "v1.2.3"),
        ]));

        assert_eq!(config.public_key, "public-key");
        assert_eq!(config.secret_key, "secret-key");
        assert_eq!(config.host, "http://localhost:8080");
        assert_eq!(config.release.as_deref(), Some("v1.2.3"));
        assert!(config.has_credentials());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_host_fallback() {
        let config = ClientConfig::new().apply_env_with(env(&[(ENV_HOST, "")]));
        assert_eq!(config.host, DEFAULT_HOST);
        assert!(config.release.is_none());
        assert!(!config.has_credentials());
    }

    #[test]
    fn test_explicit_values_win_over_env() {
        let config = ClientConfig::new()
            .with_host("https://eu.example.com")
            .with_credentials("pk", "sk")
            .apply_env_with(env(&[
                (ENV_PUBLIC_KEY, "other"),
                (ENV_HOST, "http://localhost:8080"),
            ]));

        assert_eq!(config.host, "https://eu.example.com");
        assert_eq!(config.public_key, "pk");
        assert_eq!(config.secret_key, "sk");
    }

    #[test]
    fn test_config_validation() {
        let base = || ClientConfig::new().with_host("http://localhost:3000");
        assert!(base().validate().is_ok());

        let invalid_configs = vec![
            base().with_shard_count(0),
            base().with_shard_capacity(0),
            base().with_flush_interval(Duration::ZERO),
            base().with_request_timeout(Duration::ZERO),
            base().with_host("localhost:3000"),
        ];

        for config in invalid_configs {
            assert!(config.validate().is_err());
        }
    }

    #[test]
    fn test_secret_is_not_serialized() {
        let config = ClientConfig::new()
            .with_host("http://localhost:3000")
            .with_credentials("pk", "sk");
        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains("\"public_key\":\"pk\""));
        assert!(!json.contains("sk\""));

        let pretty = config.to_string_pretty();
        assert!(pretty.contains("Secret Key: ****"));
        assert!(pretty.contains("Shards: 10"));
    }

    #[test]
    fn test_metrics_report_toggle() {
        let config = ClientConfig::new().with_report_metrics_on_shutdown(false);
        assert!(!config.report_metrics_on_shutdown);
        assert!(config.to_string_pretty().contains("Report Metrics On Shutdown: false"));

        let parsed: ClientConfig = serde_json::from_str(r#"{"report_metrics_on_shutdown": false}"#).unwrap();
        assert!(!parsed.report_metrics_on_shutdown);
        assert_eq!(parsed.shard_count, 10);
    }
}

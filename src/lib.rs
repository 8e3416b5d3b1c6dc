//! # langfuse_rs
//!
//! A non-blocking batching client for Langfuse trace ingestion.
//!
//! Records are admitted into a fixed pool of bounded shards and delivered by
//! a background loop that flushes every non-empty shard as one batch,
//! concurrently, on a fixed interval. Records the endpoint rejects stay
//! buffered for the next cycle; everything else is dropped once delivered.
//! Producers never wait on the network: when every shard is full, enqueue
//! fails immediately with [`Error::NoCapacity`].
//!
//! The engine lives in [`BatchEventManager`] and only depends on the
//! [`IngestionClient`] trait. [`Langfuse`] is the facade most callers want.

pub mod client;
pub mod config;
pub mod error;
pub mod id;
pub mod ingestion;
pub mod manager;
pub mod metrics;
pub mod observation;
pub mod record;
pub mod shard;

#[cfg(feature = "http")]
pub mod http;

pub use client::Langfuse;
pub use config::ClientConfig;
pub use error::{Error, Result};
pub use id::{IdGenerator, UuidGenerator};
pub use ingestion::{IngestionClient, IngestionError, IngestionResponse, IngestionSuccess};
pub use manager::{BatchEventManager, EventManager, EventManagerExt};
pub use metrics::MetricsCollector;
pub use observation::{Event, Generation, ObservationLevel, Score, Span, Trace};
pub use record::{EventType, Record};
pub use shard::{PoolStats, Shard, ShardInfo, ShardPool};

#[cfg(feature = "http")]
pub use http::HttpIngestionClient;

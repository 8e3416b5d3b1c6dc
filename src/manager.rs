//! Batching event manager
//!
//! [`BatchEventManager`] owns a [`ShardPool`] and an [`IngestionClient`].
//! Producers call [`enqueue`](BatchEventManager::enqueue), which fails fast
//! when every shard is full. A single background loop
//! ([`process`](BatchEventManager::process)) calls
//! [`flush`](BatchEventManager::flush) on a fixed interval; each flush sends
//! every non-empty shard as one batch, concurrently, and keeps only the
//! records the endpoint did not accept.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use tokio::task::{JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use crate::config::ClientConfig;
use crate::error::Result;
use crate::id::{IdGenerator, UuidGenerator};
use crate::ingestion::IngestionClient;
use crate::metrics::MetricsCollector;
use crate::record::{EventType, Record};
use crate::shard::{PoolStats, Shard, ShardPool};

/// Default number of shards
pub const DEFAULT_SHARD_COUNT: usize = 10;

/// Default capacity of each shard
pub const DEFAULT_SHARD_CAPACITY: usize = 100;

/// Default pause between flush cycles
pub const DEFAULT_FLUSH_INTERVAL: Duration = Duration::from_millis(500);

/// Something that accepts records and can be told to deliver them
#[async_trait]
pub trait EventManager: Send + Sync {
    /// Buffer a record; an empty `id` gets a generated one
    async fn enqueue(&self, id: &str, event_type: EventType, body: Value) -> Result<()>;

    /// Deliver everything buffered so far
    async fn flush(&self);
}

/// Enqueue any serializable payload
#[async_trait]
pub trait EventManagerExt: EventManager {
    /// Convert `body` into an owned JSON tree and enqueue it
    async fn enqueue_serialized<T>(&self, id: &str, event_type: EventType, body: &T) -> Result<()>
    where
        T: Serialize + Sync + ?Sized,
    {
        let body = serde_json::to_value(body)?;
        self.enqueue(id, event_type, body).await
    }
}

impl<M: EventManager + ?Sized> EventManagerExt for M {}

/// Sharded batching engine
pub struct BatchEventManager {
    pool: ShardPool,
    client: Arc<dyn IngestionClient>,
    ids: Arc<dyn IdGenerator>,
    metrics: Arc<MetricsCollector>,
    flush_interval: Duration,
}

impl BatchEventManager {
    /// Create a manager with the default pool size
    pub fn new(client: Arc<dyn IngestionClient>) -> Self {
        Self::with_pool(client, DEFAULT_SHARD_COUNT, DEFAULT_SHARD_CAPACITY)
    }

    /// Create a manager with an explicit pool size
    ///
    /// Zero values fall back to the defaults.
    pub fn with_pool(client: Arc<dyn IngestionClient>, shard_count: usize, shard_capacity: usize) -> Self {
        let shard_count = if shard_count == 0 { DEFAULT_SHARD_COUNT } else { shard_count };
        let shard_capacity = if shard_capacity == 0 { DEFAULT_SHARD_CAPACITY } else { shard_capacity };

        Self {
            pool: ShardPool::new(shard_count, shard_capacity),
            client,
            ids: Arc::new(UuidGenerator),
            metrics: Arc::new(MetricsCollector::new()),
            flush_interval: DEFAULT_FLUSH_INTERVAL,
        }
    }

    /// Create a manager sized by a client configuration
    pub fn from_config(client: Arc<dyn IngestionClient>, config: &ClientConfig) -> Self {
        Self::with_pool(client, config.shard_count, config.shard_capacity)
            .with_flush_interval(config.flush_interval())
    }

    /// Set the id generator used for records enqueued without an id
    pub fn with_id_generator(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = ids;
        self
    }

    /// Set the pause between flush cycles
    pub fn with_flush_interval(mut self, interval: Duration) -> Self {
        self.flush_interval = interval;
        self
    }

    /// Buffer a record in the first shard with room
    ///
    /// Fails with [`Error::NoCapacity`](crate::Error::NoCapacity) when the
    /// pool is full. May wait on a shard that is being flushed.
    pub async fn enqueue(&self, id: &str, event_type: EventType, body: Value) -> Result<()> {
        let id = if id.is_empty() {
            self.ids.generate()
        } else {
            id.to_string()
        };

        match self.pool.admit(Record::new(id, event_type, body)).await {
            Ok(_) => {
                self.metrics.increment_enqueued();
                Ok(())
            }
            Err(e) => {
                self.metrics.increment_rejected();
                Err(e)
            }
        }
    }

    /// Send every non-empty shard as one batch and reconcile the outcome
    ///
    /// Shards are flushed concurrently; returns once all of them are done.
    /// Failures are logged and the affected records stay buffered.
    pub async fn flush(&self) {
        let start = Instant::now();
        let mut tasks = JoinSet::new();

        for shard in self.pool.shards() {
            if shard.is_empty().await {
                continue;
            }

            tasks.spawn(flush_shard(
                Arc::clone(shard),
                Arc::clone(&self.client),
                Arc::clone(&self.metrics),
            ));
        }

        while let Some(result) = tasks.join_next().await {
            if let Err(e) = result {
                error!(error = %e, "shard flush task failed");
            }
        }

        self.metrics.increment_flushes();
        self.metrics.record_flush_duration(start.elapsed());
    }

    /// Flush on a fixed interval until `cancel` fires
    ///
    /// Cancellation is checked before every cycle and interrupts the sleep
    /// between cycles, but never a flush already running. There is no final
    /// flush on the way out.
    pub async fn process(&self, cancel: CancellationToken) {
        debug!(
            shards = self.pool.shard_count(),
            capacity = self.pool.shard_capacity(),
            interval_ms = self.flush_interval.as_millis() as u64,
            "flush loop started"
        );

        loop {
            if cancel.is_cancelled() {
                break;
            }

            self.flush().await;

            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(self.flush_interval) => {}
            }
        }

        debug!("flush loop stopped");
    }

    /// Run [`process`](Self::process) as a background task
    pub fn spawn(self: &Arc<Self>, cancel: CancellationToken) -> JoinHandle<()> {
        let manager = Arc::clone(self);
        tokio::spawn(async move { manager.process(cancel).await })
    }

    /// Current shard occupancy
    pub async fn stats(&self) -> PoolStats {
        self.pool.stats().await
    }

    /// The underlying shard pool
    pub fn pool(&self) -> &ShardPool {
        &self.pool
    }

    /// Delivery metrics
    pub fn metrics(&self) -> &MetricsCollector {
        &self.metrics
    }

    /// Pause between flush cycles
    pub fn flush_interval(&self) -> Duration {
        self.flush_interval
    }
}

#[async_trait]
impl EventManager for BatchEventManager {
    async fn enqueue(&self, id: &str, event_type: EventType, body: Value) -> Result<()> {
        BatchEventManager::enqueue(self, id, event_type, body).await
    }

    async fn flush(&self) {
        BatchEventManager::flush(self).await
    }
}

/// Deliver one shard while holding its lock for the whole call
async fn flush_shard(shard: Arc<Shard>, client: Arc<dyn IngestionClient>, metrics: Arc<MetricsCollector>) {
    let mut buffer = shard.lock().await;
    if buffer.is_empty() {
        return;
    }

    let sent = buffer.len();
    metrics.increment_batches();

    match client.send_batch(buffer.records()).await {
        Err(e) => {
            metrics.increment_transport_failures();
            warn!(shard = shard.id(), records = sent, error = %e, "batch delivery failed, retrying next cycle");
        }
        Ok(response) if response.has_errors() => {
            let delivered = buffer.reconcile(response.failed_ids());
            let retained = buffer.len();
            metrics.add_delivered(delivered);
            metrics.add_failed(retained);

            for rejected in &response.errors {
                warn!(
                    shard = shard.id(),
                    id = %rejected.id,
                    status = rejected.status,
                    message = rejected.message.as_deref().unwrap_or_default(),
                    "record rejected by endpoint"
                );
            }
            debug!(shard = shard.id(), delivered, retained, "batch partially delivered");
        }
        Ok(_) => {
            let delivered = buffer.snapshot_and_clear().len();
            metrics.add_delivered(delivered);
            debug!(shard = shard.id(), delivered, "batch delivered");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::ingestion::{IngestionError, IngestionResponse};
    use parking_lot::Mutex;
    use serde_json::json;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[derive(Default)]
    struct ScriptedClient {
        calls: Mutex<Vec<Vec<String>>>,
        reject: Mutex<Vec<String>>,
        offline: AtomicBool,
    }

    impl ScriptedClient {
        fn calls(&self) -> Vec<Vec<String>> {
            self.calls.lock().clone()
        }
    }

    #[async_trait]
    impl IngestionClient for ScriptedClient {
        async fn send_batch(&self, records: &[Record]) -> Result<IngestionResponse> {
            self.calls
                .lock()
                .push(records.iter().map(|r| r.id().to_string()).collect());

            if self.offline.load(Ordering::SeqCst) {
                return Err(Error::transport("connection refused"));
            }

            let reject = self.reject.lock();
            let errors = records
                .iter()
                .filter(|r| reject.iter().any(|id| id == r.id()))
                .map(|r| IngestionError::new(r.id(), 400, "rejected"))
                .collect();
            Ok(IngestionResponse::with_errors(errors))
        }
    }

    struct FixedIds;

    impl IdGenerator for FixedIds {
        fn generate(&self) -> String {
            "generated".to_string()
        }
    }

    fn manager(client: &Arc<ScriptedClient>, shards: usize, capacity: usize) -> BatchEventManager {
        BatchEventManager::with_pool(client.clone(), shards, capacity)
    }

    async fn shard_ids(manager: &BatchEventManager, shard: usize) -> Vec<String> {
        let buffer = manager.pool().shard(shard).unwrap().lock().await;
        let ids = buffer.records().iter().map(|r| r.id().to_string()).collect();
        ids
    }

    #[test]
    fn test_zero_sizes_fall_back_to_defaults() {
        let client = Arc::new(ScriptedClient::default());
        let manager = manager(&client, 0, 0);
        assert_eq!(manager.pool().shard_count(), DEFAULT_SHARD_COUNT);
        assert_eq!(manager.pool().shard_capacity(), DEFAULT_SHARD_CAPACITY);
        assert_eq!(manager.flush_interval(), DEFAULT_FLUSH_INTERVAL);
    }

    #[tokio::test]
    async fn test_enqueue_generates_missing_id() {
        let client = Arc::new(ScriptedClient::default());
        let manager = manager(&client, 1, 2).with_id_generator(Arc::new(FixedIds));

        manager.enqueue("", EventType::TraceCreate, json!({})).await.unwrap();
        manager.enqueue("given", EventType::TraceCreate, json!({})).await.unwrap();

        assert_eq!(shard_ids(&manager, 0).await, vec!["generated", "given"]);
        assert_eq!(manager.metrics().get_enqueued_count(), 2);
    }

    #[tokio::test]
    async fn test_enqueue_fails_fast_when_full() {
        let client = Arc::new(ScriptedClient::default());
        let manager = manager(&client, 1, 1);

        manager.enqueue("a", EventType::EventCreate, json!({})).await.unwrap();
        let err = manager.enqueue("b", EventType::EventCreate, json!({})).await.unwrap_err();

        assert!(err.is_no_capacity());
        assert_eq!(manager.metrics().get_rejected_count(), 1);
    }

    #[tokio::test]
    async fn test_enqueue_serialized_copies_body() {
        let client = Arc::new(ScriptedClient::default());
        let manager = manager(&client, 1, 1);

        let mut body = json!({"name": "before"});
        manager.enqueue_serialized("a", EventType::SpanCreate, &body).await.unwrap();
        body["name"] = json!("after");

        let buffer = manager.pool().shard(0).unwrap().lock().await;
        assert_eq!(buffer.records()[0].body()["name"], "before");
    }

    #[tokio::test]
    async fn test_flush_without_records_makes_no_calls() {
        let client = Arc::new(ScriptedClient::default());
        let manager = manager(&client, 3, 2);

        manager.flush().await;

        assert!(client.calls().is_empty());
        assert_eq!(manager.metrics().get_flush_count(), 1);
        assert_eq!(manager.metrics().get_batch_count(), 0);
    }

    #[tokio::test]
    async fn test_flush_sends_one_batch_per_shard() {
        let client = Arc::new(ScriptedClient::default());
        let manager = manager(&client, 3, 2);
        for id in ["a", "b", "c"] {
            manager.enqueue(id, EventType::EventCreate, json!({})).await.unwrap();
        }

        manager.flush().await;

        let mut calls = client.calls();
        calls.sort();
        assert_eq!(calls, vec![vec!["a".to_string(), "b".to_string()], vec!["c".to_string()]]);
        assert_eq!(manager.stats().await.total_records, 0);
        assert_eq!(manager.metrics().get_delivered_count(), 3);
    }

    #[tokio::test]
    async fn test_transport_failure_retains_batch() {
        let client = Arc::new(ScriptedClient::default());
        client.offline.store(true, Ordering::SeqCst);
        let manager = manager(&client, 1, 3);
        for id in ["a", "b"] {
            manager.enqueue(id, EventType::EventCreate, json!({})).await.unwrap();
        }

        manager.flush().await;
        assert_eq!(shard_ids(&manager, 0).await, vec!["a", "b"]);
        assert_eq!(manager.metrics().get_transport_failure_count(), 1);

        client.offline.store(false, Ordering::SeqCst);
        manager.flush().await;
        assert!(shard_ids(&manager, 0).await.is_empty());
        assert_eq!(client.calls().len(), 2);
    }

    #[tokio::test]
    async fn test_partial_failure_keeps_rejected_in_order() {
        let client = Arc::new(ScriptedClient::default());
        *client.reject.lock() = vec!["d".to_string(), "b".to_string()];
        let manager = manager(&client, 1, 5);
        for id in ["a", "b", "c", "d", "e"] {
            manager.enqueue(id, EventType::EventCreate, json!({})).await.unwrap();
        }

        manager.flush().await;

        assert_eq!(shard_ids(&manager, 0).await, vec!["b", "d"]);
        assert_eq!(manager.metrics().get_delivered_count(), 3);
        assert_eq!(manager.metrics().get_failed_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_process_stops_when_cancelled_before_start() {
        let client = Arc::new(ScriptedClient::default());
        let manager = manager(&client, 1, 1);
        manager.enqueue("a", EventType::EventCreate, json!({})).await.unwrap();

        let cancel = CancellationToken::new();
        cancel.cancel();
        manager.process(cancel).await;

        assert!(client.calls().is_empty());
        assert_eq!(manager.metrics().get_flush_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_process_flushes_on_interval() {
        let client = Arc::new(ScriptedClient::default());
        let manager = Arc::new(
            manager(&client, 1, 10).with_flush_interval(Duration::from_millis(100)),
        );

        let cancel = CancellationToken::new();
        let handle = manager.spawn(cancel.clone());

        tokio::time::sleep(Duration::from_millis(350)).await;
        manager.enqueue("late", EventType::EventCreate, json!({})).await.unwrap();
        tokio::time::sleep(Duration::from_millis(200)).await;

        cancel.cancel();
        handle.await.unwrap();

        let cycles = manager.metrics().get_flush_count();
        assert!(cycles >= 4, "expected at least 4 cycles, got {}", cycles);
        assert_eq!(client.calls(), vec![vec!["late".to_string()]]);

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(manager.metrics().get_flush_count(), cycles);
    }
}

#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use langfuse_rs::{
    BatchEventManager, Error, IngestionClient, IngestionError, IngestionResponse, Record, Result,
};
use parking_lot::Mutex;
use tokio::sync::{Mutex as AsyncMutex, Notify};

/// Scriptable ingestion endpoint that records every batch it receives
#[derive(Default)]
pub struct MockIngestion {
    batches: Mutex<Vec<Vec<String>>>,
    reject: Mutex<HashSet<String>>,
    offline: AtomicBool,
    // Held by a test to keep a batch call in flight.
    pub gate: AsyncMutex<()>,
    pub entered: Notify,
}

impl MockIngestion {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn reject(&self, ids: &[&str]) {
        *self.reject.lock() = ids.iter().map(|id| id.to_string()).collect();
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub fn batches(&self) -> Vec<Vec<String>> {
        self.batches.lock().clone()
    }

    pub fn delivered_ids(&self) -> Vec<String> {
        self.batches.lock().iter().flatten().cloned().collect()
    }
}

#[async_trait]
impl IngestionClient for MockIngestion {
    async fn send_batch(&self, records: &[Record]) -> Result<IngestionResponse> {
        self.entered.notify_one();
        let _gate = self.gate.lock().await;

        self.batches
            .lock()
            .push(records.iter().map(|r| r.id().to_string()).collect());

        if self.offline.load(Ordering::SeqCst) {
            return Err(Error::transport("endpoint unreachable"));
        }

        let reject = self.reject.lock();
        let errors = records
            .iter()
            .filter(|r| reject.contains(r.id()))
            .map(|r| IngestionError::new(r.id(), 400, "rejected by mock"))
            .collect();

        Ok(IngestionResponse::with_errors(errors))
    }
}

pub struct TestEnv {
    pub manager: Arc<BatchEventManager>,
    pub ingestion: Arc<MockIngestion>,
}

impl TestEnv {
    pub fn new(shards: usize, capacity: usize) -> Self {
        let ingestion = MockIngestion::new();
        let manager = Arc::new(BatchEventManager::with_pool(ingestion.clone(), shards, capacity));
        Self { manager, ingestion }
    }

    /// Ids pending in a shard, in admission order
    pub async fn shard_ids(&self, shard: usize) -> Vec<String> {
        let buffer = self.manager.pool().shard(shard).unwrap().lock().await;
        let ids = buffer.records().iter().map(|r| r.id().to_string()).collect();
        ids
    }
}

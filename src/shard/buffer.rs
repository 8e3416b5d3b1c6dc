use std::collections::HashSet;

use tokio::sync::{Mutex, MutexGuard};

use crate::record::Record;
use crate::shard::{ShardId, ShardInfo};

/// Pending records of one shard
///
/// Only reachable through [`Shard::lock`], so every method here runs with the
/// shard's lock held.
#[derive(Debug)]
pub struct ShardBuffer {
    capacity: usize,
    records: Vec<Record>,
}

impl ShardBuffer {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity,
            records: Vec::with_capacity(capacity),
        }
    }

    /// Append a record if there is room, handing it back otherwise
    pub fn try_append(&mut self, record: Record) -> Result<(), Record> {
        if self.records.len() >= self.capacity {
            return Err(record);
        }
        self.records.push(record);
        Ok(())
    }

    /// Take every pending record, leaving the buffer empty
    pub fn snapshot_and_clear(&mut self) -> Vec<Record> {
        std::mem::replace(&mut self.records, Vec::with_capacity(self.capacity))
    }

    /// Keep only the records whose id is in `failed`, in their original order
    ///
    /// Returns the number of records dropped as acknowledged.
    pub fn reconcile<'a, I>(&mut self, failed: I) -> usize
    where
        I: IntoIterator<Item = &'a str>,
    {
        let failed: HashSet<&str> = failed.into_iter().collect();
        let before = self.records.len();
        self.records.retain(|record| failed.contains(record.id()));
        before - self.records.len()
    }

    /// Pending records in admission order
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    /// Number of pending records
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Check if nothing is pending
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Check if the buffer is at capacity
    pub fn is_full(&self) -> bool {
        self.records.len() >= self.capacity
    }
}

/// A bounded buffer of pending records behind its own lock
#[derive(Debug)]
pub struct Shard {
    id: ShardId,
    capacity: usize,
    buffer: Mutex<ShardBuffer>,
}

impl Shard {
    /// Create an empty shard
    pub fn new(id: ShardId, capacity: usize) -> Self {
        Self {
            id,
            capacity,
            buffer: Mutex::new(ShardBuffer::with_capacity(capacity)),
        }
    }

    /// Shard position in its pool
    pub fn id(&self) -> ShardId {
        self.id
    }

    /// Maximum number of pending records
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Append a record if there is room, handing it back otherwise
    ///
    /// Waits while the shard is being flushed.
    pub async fn try_append(&self, record: Record) -> Result<(), Record> {
        self.buffer.lock().await.try_append(record)
    }

    /// Acquire the shard's lock
    pub async fn lock(&self) -> MutexGuard<'_, ShardBuffer> {
        self.buffer.lock().await
    }

    /// Number of pending records
    pub async fn len(&self) -> usize {
        self.buffer.lock().await.len()
    }

    /// Check if nothing is pending
    pub async fn is_empty(&self) -> bool {
        self.buffer.lock().await.is_empty()
    }

    /// Snapshot of the shard's occupancy
    pub async fn info(&self) -> ShardInfo {
        ShardInfo::new(self.id, self.len().await, self.capacity)
    }
}

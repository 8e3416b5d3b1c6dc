use std::sync::Arc;

use tracing::trace;

use crate::error::{Result, Error};
use crate::record::Record;
use crate::shard::{PoolStats, Shard, ShardId, ShardInfo};

/// Fixed set of shards sharing one capacity
///
/// The topology never changes after construction, so reading it needs no
/// lock; only each shard's buffer is guarded.
#[derive(Debug)]
pub struct ShardPool {
    shards: Vec<Arc<Shard>>,
    shard_capacity: usize,
}

impl ShardPool {
    /// Create a pool of `shard_count` empty shards
    pub fn new(shard_count: usize, shard_capacity: usize) -> Self {
        let shards = (0..shard_count)
            .map(|id| Arc::new(Shard::new(id, shard_capacity)))
            .collect();

        Self {
            shards,
            shard_capacity,
        }
    }

    /// Admit a record into the first shard with room
    ///
    /// Shards are tried in construction order. Fails with
    /// [`Error::NoCapacity`] when all of them are full; never waits for
    /// capacity to free up.
    pub async fn admit(&self, mut record: Record) -> Result<ShardId> {
        for shard in &self.shards {
            match shard.try_append(record).await {
                Ok(()) => {
                    trace!(shard = shard.id(), "record admitted");
                    return Ok(shard.id());
                }
                Err(returned) => record = returned,
            }
        }

        Err(Error::no_capacity(self.shards.len(), self.shard_capacity))
    }

    /// All shards, in construction order
    pub fn shards(&self) -> &[Arc<Shard>] {
        &self.shards
    }

    /// Get a shard by ID
    pub fn shard(&self, id: ShardId) -> Option<&Arc<Shard>> {
        self.shards.get(id)
    }

    /// Number of shards
    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }

    /// Capacity of each shard
    pub fn shard_capacity(&self) -> usize {
        self.shard_capacity
    }

    /// Total number of records the pool can hold
    pub fn total_capacity(&self) -> usize {
        self.shards.len() * self.shard_capacity
    }

    /// Read every shard's occupancy
    pub async fn stats(&self) -> PoolStats {
        let mut shards: Vec<ShardInfo> = Vec::with_capacity(self.shards.len());

        for shard in &self.shards {
            shards.push(shard.info().await);
        }

        PoolStats::from_shards(self.shard_capacity, shards)
    }
}

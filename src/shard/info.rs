//! Shard occupancy data structures
//!
//! Read-only snapshots of the shard pool, used for diagnostics.

use crate::shard::ShardId;

/// Occupancy of one shard at the time it was read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShardInfo {
    /// Shard ID
    pub id: ShardId,
    /// Pending records
    pub len: usize,
    /// Maximum pending records
    pub capacity: usize,
}

impl ShardInfo {
    /// Create a new shard info
    pub fn new(id: ShardId, len: usize, capacity: usize) -> Self {
        Self { id, len, capacity }
    }

    /// Check if the shard is empty
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Check if the shard is full
    pub fn is_full(&self) -> bool {
        self.len >= self.capacity
    }

    /// Free slots left in the shard
    pub fn remaining(&self) -> usize {
        self.capacity.saturating_sub(self.len)
    }

    /// Fraction of the capacity in use (0.0 - 1.0)
    pub fn fill_ratio(&self) -> f64 {
        if self.capacity == 0 {
            return 1.0;
        }

        self.len as f64 / self.capacity as f64
    }
}

/// Statistics about the whole pool
///
/// Shards are read one after another, so under concurrent admission the
/// totals are approximate.
#[derive(Debug, Clone, Default)]
pub struct PoolStats {
    /// Number of shards
    pub shard_count: usize,
    /// Capacity of each shard
    pub shard_capacity: usize,
    /// Pending records across all shards
    pub total_records: usize,
    /// Shards with no pending records
    pub empty_shards: usize,
    /// Shards at capacity
    pub full_shards: usize,
    /// Per-shard occupancy, in pool order
    pub shards: Vec<ShardInfo>,
}

impl PoolStats {
    /// Build pool statistics from per-shard snapshots
    pub fn from_shards(shard_capacity: usize, shards: Vec<ShardInfo>) -> Self {
        let mut stats = Self {
            shard_count: shards.len(),
            shard_capacity,
            ..Self::default()
        };

        for shard in &shards {
            stats.total_records += shard.len;

            if shard.is_empty() {
                stats.empty_shards += 1;
            }

            if shard.is_full() {
                stats.full_shards += 1;
            }
        }

        stats.shards = shards;
        stats
    }

    /// Total number of records the pool can hold
    pub fn total_capacity(&self) -> usize {
        self.shard_count * self.shard_capacity
    }

    /// Fraction of the pool in use (0.0 - 1.0)
    pub fn utilization(&self) -> f64 {
        let total = self.total_capacity();
        if total == 0 {
            return 0.0;
        }

        self.total_records as f64 / total as f64
    }

    /// Check if no shard can admit another record
    pub fn is_saturated(&self) -> bool {
        self.shard_count > 0 && self.full_shards == self.shard_count
    }
}

//! Bounded, independently locked record buffers
//!
//! Pending records are spread over a fixed pool of shards. Each shard owns
//! its buffer behind its own lock, so admission into one shard never waits on
//! another, and each shard is flushed as a single batch.

mod buffer;
mod info;
mod pool;

pub use buffer::{Shard, ShardBuffer};
pub use info::{PoolStats, ShardInfo};
pub use pool::ShardPool;

/// Shard ID type (position in the pool)
pub type ShardId = usize;

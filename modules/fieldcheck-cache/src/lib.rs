//! In-process cache fronting the upstream feed.
//!
//! [`ShardedCache`] stores opaque byte payloads under string keys. Capacity is
//! accounted in bytes and split evenly across independently locked shards, so
//! the sum of resident entries never exceeds the configured budget. Each shard
//! evicts least-recently-used entries to make room. [`Memo`] layers a typed
//! read-through on top.

mod memo;
mod sharded;

pub use memo::Memo;
pub use sharded::{CacheConfig, CacheStats, ShardedCache};

use std::collections::{BTreeMap, HashMap};
use std::hash::BuildHasher;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde::Serialize;
use tokio::time::Instant;

/// Sizing for a [`ShardedCache`]. Fixed for the lifetime of the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheConfig {
    /// Upper bound on the summed cost of resident entries.
    pub max_bytes: usize,
    /// Approximate upper bound on the number of resident entries.
    pub max_entries: usize,
    /// Number of independently locked partitions.
    pub shard_count: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_bytes: 1 << 30,
            max_entries: 10_000_000,
            shard_count: 64,
        }
    }
}

/// Point-in-time counters, exposed on the monitor endpoint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub entries: usize,
    pub resident_bytes: usize,
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub rejected: u64,
}

struct Slot {
    value: Arc<[u8]>,
    cost: usize,
    expires_at: Option<Instant>,
    last_used: u64,
}

impl Slot {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

/// One partition. `order` maps a monotonically increasing use stamp to the
/// key last used at that stamp, so its first entry is the LRU victim.
#[derive(Default)]
struct Shard {
    map: HashMap<String, Slot>,
    order: BTreeMap<u64, String>,
    used_bytes: usize,
    clock: u64,
}

impl Shard {
    fn next_stamp(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }

    fn remove(&mut self, key: &str) -> Option<Slot> {
        let slot = self.map.remove(key)?;
        self.order.remove(&slot.last_used);
        self.used_bytes -= slot.cost;
        Some(slot)
    }

    fn evict_lru(&mut self) -> bool {
        let Some((_, key)) = self.order.pop_first() else {
            return false;
        };
        if let Some(slot) = self.map.remove(&key) {
            self.used_bytes -= slot.cost;
        }
        true
    }
}

#[derive(Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
    rejected: AtomicU64,
}

/// Thread-safe, byte-bounded key/value cache.
///
/// Keys hash to one of `shard_count` shards; each shard owns
/// `max_bytes / shard_count` bytes and `max_entries / shard_count` slots. An
/// entry costlier than a whole shard is never admitted. Lookups past an
/// entry's TTL behave as misses and drop the entry.
pub struct ShardedCache {
    shards: Box<[Mutex<Shard>]>,
    hasher: ahash::RandomState,
    shard_bytes: usize,
    shard_entries: usize,
    counters: Counters,
}

impl ShardedCache {
    pub fn new(config: CacheConfig) -> Self {
        let shard_count = config.shard_count.max(1);
        let shards = (0..shard_count)
            .map(|_| Mutex::new(Shard::default()))
            .collect::<Vec<_>>()
            .into_boxed_slice();
        Self {
            shards,
            hasher: ahash::RandomState::new(),
            shard_bytes: config.max_bytes / shard_count,
            shard_entries: (config.max_entries / shard_count).max(1),
            counters: Counters::default(),
        }
    }

    /// Total byte budget actually enforced (the configured budget rounded
    /// down to a multiple of the shard count).
    pub fn capacity_bytes(&self) -> usize {
        self.shard_bytes * self.shards.len()
    }

    fn shard_for(&self, key: &str) -> &Mutex<Shard> {
        let idx = (self.hasher.hash_one(key) % self.shards.len() as u64) as usize;
        &self.shards[idx]
    }

    pub fn get(&self, key: &str) -> Option<Arc<[u8]>> {
        let now = Instant::now();
        let mut shard = self.shard_for(key).lock();

        let expired = match shard.map.get(key) {
            None => {
                self.counters.misses.fetch_add(1, Ordering::Relaxed);
                return None;
            }
            Some(slot) => slot.is_expired(now),
        };
        if expired {
            shard.remove(key);
            self.counters.misses.fetch_add(1, Ordering::Relaxed);
            return None;
        }

        let stamp = shard.next_stamp();
        let shard = &mut *shard;
        let slot = shard.map.get_mut(key)?;
        shard.order.remove(&slot.last_used);
        slot.last_used = stamp;
        shard.order.insert(stamp, key.to_string());
        self.counters.hits.fetch_add(1, Ordering::Relaxed);
        Some(slot.value.clone())
    }

    /// Insert using the payload length plus key length as the entry's cost.
    pub fn insert(&self, key: impl Into<String>, value: impl Into<Arc<[u8]>>, ttl: Option<Duration>) -> bool {
        let key = key.into();
        let value = value.into();
        let cost = key.len() + value.len();
        self.insert_with_cost(key, value, cost, ttl)
    }

    /// Insert with an explicit cost. Returns `false` when the entry is too
    /// large to ever fit; any previous value under `key` is dropped either way.
    pub fn insert_with_cost(
        &self,
        key: impl Into<String>,
        value: impl Into<Arc<[u8]>>,
        cost: usize,
        ttl: Option<Duration>,
    ) -> bool {
        let key = key.into();
        let mut shard = self.shard_for(&key).lock();
        shard.remove(&key);

        if cost > self.shard_bytes {
            self.counters.rejected.fetch_add(1, Ordering::Relaxed);
            tracing::warn!(
                key = %key,
                cost,
                shard_bytes = self.shard_bytes,
                "Cache entry rejected: larger than one shard, it will be refetched on every miss"
            );
            return false;
        }

        while shard.used_bytes + cost > self.shard_bytes || shard.map.len() >= self.shard_entries {
            if !shard.evict_lru() {
                break;
            }
            self.counters.evictions.fetch_add(1, Ordering::Relaxed);
        }

        let stamp = shard.next_stamp();
        shard.order.insert(stamp, key.clone());
        shard.used_bytes += cost;
        shard.map.insert(
            key,
            Slot {
                value: value.into(),
                cost,
                expires_at: ttl.map(|ttl| Instant::now() + ttl),
                last_used: stamp,
            },
        );
        true
    }

    pub fn remove(&self, key: &str) -> bool {
        self.shard_for(key).lock().remove(key).is_some()
    }

    pub fn clear(&self) {
        for shard in self.shards.iter() {
            *shard.lock() = Shard::default();
        }
    }

    pub fn len(&self) -> usize {
        self.shards.iter().map(|s| s.lock().map.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Summed cost of resident entries, including expired ones not yet dropped.
    pub fn resident_bytes(&self) -> usize {
        self.shards.iter().map(|s| s.lock().used_bytes).sum()
    }

    pub fn stats(&self) -> CacheStats {
        let (entries, resident_bytes) = self.shards.iter().fold((0, 0), |(n, b), s| {
            let s = s.lock();
            (n + s.map.len(), b + s.used_bytes)
        });
        CacheStats {
            entries,
            resident_bytes,
            hits: self.counters.hits.load(Ordering::Relaxed),
            misses: self.counters.misses.load(Ordering::Relaxed),
            evictions: self.counters.evictions.load(Ordering::Relaxed),
            rejected: self.counters.rejected.load(Ordering::Relaxed),
        }
    }
}

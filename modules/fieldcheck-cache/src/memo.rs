use std::future::Future;
use std::time::Duration;

use serde::{de::DeserializeOwned, Serialize};
use tracing::warn;

use crate::ShardedCache;

/// Typed read-through over a [`ShardedCache`] key.
///
/// Values are stored as JSON. Failed computations are returned to the caller
/// and never cached.
pub struct Memo<'a> {
    cache: &'a ShardedCache,
    key: String,
    ttl: Option<Duration>,
}

impl ShardedCache {
    pub fn memo(&self, key: impl Into<String>) -> Memo<'_> {
        Memo {
            cache: self,
            key: key.into(),
            ttl: None,
        }
    }
}

impl<'a> Memo<'a> {
    /// Set time-to-live. Without one the entry lives until evicted.
    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    /// Get cached result or compute via the provided closure.
    pub async fn get_or<T, E, F, Fut>(self, f: F) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if let Some(bytes) = self.cache.get(&self.key) {
            match serde_json::from_slice(&bytes) {
                Ok(value) => return Ok(value),
                Err(e) => {
                    warn!(key = %self.key, error = %e, "Dropping undecodable cache entry");
                    self.cache.remove(&self.key);
                }
            }
        }

        let value = f().await?;

        match serde_json::to_vec(&value) {
            Ok(bytes) => {
                self.cache.insert(self.key, bytes, self.ttl);
            }
            Err(e) => warn!(key = %self.key, error = %e, "Result not cacheable"),
        }

        Ok(value)
    }
}

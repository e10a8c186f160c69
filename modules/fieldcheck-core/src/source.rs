use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use feed_client::FeedClient;
use fieldcheck_cache::ShardedCache;
use fieldcheck_common::{EntryId, LocationCandidate, LocationDetail};

use crate::Result;

pub const ALL_LOCATIONS_KEY: &str = "locations:all";

pub fn detail_key(entry_id: EntryId) -> String {
    format!("locations:detail:{entry_id}")
}

/// Where candidates and their full text come from.
#[async_trait]
pub trait LocationSource: Send + Sync {
    async fn all_candidates(&self) -> Result<Vec<LocationCandidate>>;

    async fn detail(&self, entry_id: EntryId) -> Result<LocationDetail>;
}

#[async_trait]
impl LocationSource for FeedClient {
    async fn all_candidates(&self) -> Result<Vec<LocationCandidate>> {
        let areas = self.fetch_areas().await?;
        Ok(areas
            .into_iter()
            .map(|a| LocationCandidate::new(a.entry_id, a.loc[0], a.loc[1], a.epoch))
            .collect())
    }

    async fn detail(&self, entry_id: EntryId) -> Result<LocationDetail> {
        let entry = self.fetch_entry(entry_id).await?;
        Ok(LocationDetail {
            entry_id,
            full_text: entry.full_text,
        })
    }
}

#[async_trait]
impl<T: LocationSource + ?Sized> LocationSource for Arc<T> {
    async fn all_candidates(&self) -> Result<Vec<LocationCandidate>> {
        (**self).all_candidates().await
    }

    async fn detail(&self, entry_id: EntryId) -> Result<LocationDetail> {
        (**self).detail(entry_id).await
    }
}

/// Time-to-live tiers for cached upstream lookups.
#[derive(Debug, Clone, Copy)]
pub struct CacheTtls {
    /// The candidate list changes as the feed ingests new entries.
    pub all_candidates: Duration,
    /// Entry text never changes once scraped.
    pub detail: Duration,
}

impl Default for CacheTtls {
    fn default() -> Self {
        Self {
            all_candidates: Duration::from_secs(60),
            detail: Duration::from_secs(24 * 3600),
        }
    }
}

/// Read-through cache in front of another source. Upstream failures pass
/// through and leave the cache untouched.
pub struct CachedSource<S> {
    inner: S,
    cache: Arc<ShardedCache>,
    ttls: CacheTtls,
}

impl<S: LocationSource> CachedSource<S> {
    pub fn new(inner: S, cache: Arc<ShardedCache>) -> Self {
        Self {
            inner,
            cache,
            ttls: CacheTtls::default(),
        }
    }

    pub fn with_ttls(mut self, ttls: CacheTtls) -> Self {
        self.ttls = ttls;
        self
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }
}

#[async_trait]
impl<S: LocationSource> LocationSource for CachedSource<S> {
    async fn all_candidates(&self) -> Result<Vec<LocationCandidate>> {
        self.cache
            .memo(ALL_LOCATIONS_KEY)
            .ttl(self.ttls.all_candidates)
            .get_or(|| self.inner.all_candidates())
            .await
    }

    async fn detail(&self, entry_id: EntryId) -> Result<LocationDetail> {
        self.cache
            .memo(detail_key(entry_id))
            .ttl(self.ttls.detail)
            .get_or(|| self.inner.detail(entry_id))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::StaticSource;
    use fieldcheck_cache::CacheConfig;

    fn cache() -> Arc<ShardedCache> {
        Arc::new(ShardedCache::new(CacheConfig {
            max_bytes: 1 << 20,
            max_entries: 1024,
            shard_count: 4,
        }))
    }

    fn source() -> StaticSource {
        StaticSource::new(vec![
            (LocationCandidate::new(1, 36.0, 36.0, 100), "first"),
            (LocationCandidate::new(2, 0.0, 0.0, 200), "second"),
        ])
    }

    #[tokio::test]
    async fn candidate_list_is_fetched_once_within_ttl() {
        let cached = CachedSource::new(source(), cache());
        let a = cached.all_candidates().await.unwrap();
        let b = cached.all_candidates().await.unwrap();
        assert_eq!(a, b);
        assert_eq!(cached.inner().all_calls(), 1);
    }

    #[tokio::test]
    async fn details_are_cached_per_entry() {
        let cached = CachedSource::new(source(), cache());
        assert_eq!(cached.detail(1).await.unwrap().full_text, "first");
        assert_eq!(cached.detail(1).await.unwrap().full_text, "first");
        assert_eq!(cached.detail(2).await.unwrap().full_text, "second");
        assert_eq!(cached.inner().detail_calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn candidate_list_is_refetched_after_ttl() {
        let cached = CachedSource::new(source(), cache());
        cached.all_candidates().await.unwrap();
        tokio::time::advance(CacheTtls::default().all_candidates + Duration::from_secs(1)).await;
        cached.all_candidates().await.unwrap();
        assert_eq!(cached.inner().all_calls(), 2);
    }

    #[tokio::test]
    async fn upstream_failure_is_not_cached() {
        let cache = cache();
        let cached = CachedSource::new(source(), cache.clone());
        cached.inner().set_failing(true);
        assert!(cached.all_candidates().await.is_err());
        assert!(cache.get(ALL_LOCATIONS_KEY).is_none());

        cached.inner().set_failing(false);
        assert_eq!(cached.all_candidates().await.unwrap().len(), 2);
    }
}

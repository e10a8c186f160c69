//! In-memory doubles for exercising the selector and resolver without the feed
//! or Postgres.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use fieldcheck_common::{EntryId, EntryUpdate, LocationCandidate, LocationDetail, ResolutionRecord};
use fieldcheck_store::{InsertOutcome, LocationStore, MemoryStore};

use crate::{CheckError, LocationSource, Result};

/// Fixed candidate list with per-entry text. Counts upstream calls.
pub struct StaticSource {
    candidates: Vec<LocationCandidate>,
    texts: HashMap<EntryId, String>,
    all_calls: AtomicUsize,
    detail_calls: AtomicUsize,
    failing: AtomicBool,
}

impl StaticSource {
    pub fn new<S: Into<String>>(entries: Vec<(LocationCandidate, S)>) -> Self {
        let mut candidates = Vec::with_capacity(entries.len());
        let mut texts = HashMap::new();
        for (candidate, text) in entries {
            texts.insert(candidate.entry_id, text.into());
            candidates.push(candidate);
        }
        Self {
            candidates,
            texts,
            all_calls: AtomicUsize::new(0),
            detail_calls: AtomicUsize::new(0),
            failing: AtomicBool::new(false),
        }
    }

    /// Add a candidate whose detail lookup answers NotFound.
    pub fn with_missing_text(mut self, candidate: LocationCandidate) -> Self {
        self.candidates.push(candidate);
        self
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn all_calls(&self) -> usize {
        self.all_calls.load(Ordering::SeqCst)
    }

    pub fn detail_calls(&self) -> usize {
        self.detail_calls.load(Ordering::SeqCst)
    }

    fn check_failing(&self) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(CheckError::Upstream("feed unavailable".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl LocationSource for StaticSource {
    async fn all_candidates(&self) -> Result<Vec<LocationCandidate>> {
        self.all_calls.fetch_add(1, Ordering::SeqCst);
        self.check_failing()?;
        Ok(self.candidates.clone())
    }

    async fn detail(&self, entry_id: EntryId) -> Result<LocationDetail> {
        self.detail_calls.fetch_add(1, Ordering::SeqCst);
        self.check_failing()?;
        let full_text = self
            .texts
            .get(&entry_id)
            .cloned()
            .ok_or_else(|| CheckError::NotFound(format!("feed entry {entry_id}")))?;
        Ok(LocationDetail {
            entry_id,
            full_text,
        })
    }
}

/// [`MemoryStore`] that records every duplicate probe and can be made to fail.
#[derive(Default)]
pub struct ProbingStore {
    pub inner: MemoryStore,
    probes: parking_lot::Mutex<Vec<String>>,
    failing: AtomicBool,
}

impl ProbingStore {
    pub fn new(inner: MemoryStore) -> Self {
        Self {
            inner,
            ..Default::default()
        }
    }

    pub fn probes(&self) -> Vec<String> {
        self.probes.lock().clone()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn check_failing(&self) -> fieldcheck_store::Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(fieldcheck_store::StoreError::Corrupt("store offline".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl LocationStore for ProbingStore {
    async fn resolved_entry_ids(&self) -> fieldcheck_store::Result<HashSet<EntryId>> {
        self.check_failing()?;
        self.inner.resolved_entry_ids().await
    }

    async fn is_resolved(&self, entry_id: EntryId) -> fieldcheck_store::Result<bool> {
        self.check_failing()?;
        self.inner.is_resolved(entry_id).await
    }

    async fn is_duplicate(&self, full_text: &str) -> fieldcheck_store::Result<bool> {
        self.check_failing()?;
        self.probes.lock().push(full_text.to_string());
        self.inner.is_duplicate(full_text).await
    }

    async fn insert_resolution(
        &self,
        record: &ResolutionRecord,
    ) -> fieldcheck_store::Result<InsertOutcome> {
        self.check_failing()?;
        self.inner.insert_resolution(record).await
    }

    async fn list_resolutions(
        &self,
        limit: i64,
        offset: i64,
    ) -> fieldcheck_store::Result<Vec<ResolutionRecord>> {
        self.check_failing()?;
        self.inner.list_resolutions(limit, offset).await
    }

    async fn get_resolution(
        &self,
        entry_id: EntryId,
    ) -> fieldcheck_store::Result<Option<ResolutionRecord>> {
        self.check_failing()?;
        self.inner.get_resolution(entry_id).await
    }

    async fn update_resolution(
        &self,
        entry_id: EntryId,
        update: &EntryUpdate,
    ) -> fieldcheck_store::Result<Option<ResolutionRecord>> {
        self.check_failing()?;
        self.inner.update_resolution(entry_id, update).await
    }
}

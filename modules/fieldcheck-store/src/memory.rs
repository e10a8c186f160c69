// In-process store used by tests and local runs without Postgres.

use std::collections::{BTreeMap, HashMap, HashSet};

use async_trait::async_trait;
use fieldcheck_common::{EntryId, EntryUpdate, ResolutionRecord, User};
use parking_lot::Mutex;

use crate::{InsertOutcome, LocationStore, Result, UserStore};

#[derive(Default)]
struct Inner {
    resolutions: BTreeMap<EntryId, ResolutionRecord>,
    users: HashMap<String, User>,
}

#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user(self, user: User) -> Self {
        self.inner.lock().users.insert(user.auth_key.clone(), user);
        self
    }

    pub fn with_resolution(self, record: ResolutionRecord) -> Self {
        self.inner.lock().resolutions.insert(record.entry_id, record);
        self
    }

    pub fn resolution_count(&self) -> usize {
        self.inner.lock().resolutions.len()
    }
}

#[async_trait]
impl LocationStore for MemoryStore {
    async fn resolved_entry_ids(&self) -> Result<HashSet<EntryId>> {
        Ok(self.inner.lock().resolutions.keys().copied().collect())
    }

    async fn is_resolved(&self, entry_id: EntryId) -> Result<bool> {
        Ok(self.inner.lock().resolutions.contains_key(&entry_id))
    }

    async fn is_duplicate(&self, full_text: &str) -> Result<bool> {
        if full_text.is_empty() {
            return Ok(false);
        }
        Ok(self
            .inner
            .lock()
            .resolutions
            .values()
            .any(|r| r.tweet_contents == full_text))
    }

    async fn insert_resolution(&self, record: &ResolutionRecord) -> Result<InsertOutcome> {
        let mut inner = self.inner.lock();
        if let Some(existing) = inner.resolutions.get(&record.entry_id) {
            if existing.id == record.id {
                return Ok(InsertOutcome::Inserted);
            }
            return Ok(InsertOutcome::AlreadyResolved);
        }
        inner.resolutions.insert(record.entry_id, record.clone());
        Ok(InsertOutcome::Inserted)
    }

    async fn list_resolutions(&self, limit: i64, offset: i64) -> Result<Vec<ResolutionRecord>> {
        let mut records: Vec<_> = self.inner.lock().resolutions.values().cloned().collect();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(records
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .collect())
    }

    async fn get_resolution(&self, entry_id: EntryId) -> Result<Option<ResolutionRecord>> {
        Ok(self.inner.lock().resolutions.get(&entry_id).cloned())
    }

    async fn update_resolution(
        &self,
        entry_id: EntryId,
        update: &EntryUpdate,
    ) -> Result<Option<ResolutionRecord>> {
        let mut inner = self.inner.lock();
        Ok(inner.resolutions.get_mut(&entry_id).map(|record| {
            update.apply(record);
            record.clone()
        }))
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn user_by_auth_key(&self, auth_key: &str) -> Result<Option<User>> {
        Ok(self.inner.lock().users.get(auth_key).cloned())
    }
}

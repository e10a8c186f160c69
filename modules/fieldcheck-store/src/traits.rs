use std::collections::HashSet;

use async_trait::async_trait;
use fieldcheck_common::{EntryId, EntryUpdate, ResolutionRecord, User};

use crate::Result;

/// Outcome of an insert-if-absent on the resolutions collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    AlreadyResolved,
}

/// Durable record of moderator decisions.
///
/// `insert_resolution` must be atomic: of any number of concurrent inserts
/// for one `entry_id`, exactly one returns `Inserted`. Re-inserting the
/// record that already holds the entry (same `id`) is also `Inserted`, so a
/// retried write is not mistaken for a conflict.
#[async_trait]
pub trait LocationStore: Send + Sync {
    /// Entry ids that already have a resolution.
    async fn resolved_entry_ids(&self) -> Result<HashSet<EntryId>>;

    async fn is_resolved(&self, entry_id: EntryId) -> Result<bool>;

    /// Whether a resolution already carries exactly this message text.
    /// Empty text is never a duplicate.
    async fn is_duplicate(&self, full_text: &str) -> Result<bool>;

    async fn insert_resolution(&self, record: &ResolutionRecord) -> Result<InsertOutcome>;

    /// Newest first.
    async fn list_resolutions(&self, limit: i64, offset: i64) -> Result<Vec<ResolutionRecord>>;

    async fn get_resolution(&self, entry_id: EntryId) -> Result<Option<ResolutionRecord>>;

    /// Apply a partial edit. `None` when no resolution exists for `entry_id`.
    async fn update_resolution(
        &self,
        entry_id: EntryId,
        update: &EntryUpdate,
    ) -> Result<Option<ResolutionRecord>>;
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn user_by_auth_key(&self, auth_key: &str) -> Result<Option<User>>;
}

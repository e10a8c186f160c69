// Postgres persistence. The unique index on resolutions.entry_id is what makes
// insert_resolution race-safe.

use std::collections::HashSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use fieldcheck_common::{
    EntryId, EntryUpdate, PermLevel, ResolutionRecord, RetryPolicy, Sender, User,
};
use sqlx::PgPool;
use uuid::Uuid;

use crate::{InsertOutcome, LocationStore, Result, StoreError, UserStore};

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
    retry: RetryPolicy,
}

/// A row from the resolutions table.
#[derive(Debug, Clone, sqlx::FromRow)]
struct ResolutionRow {
    id: Uuid,
    entry_id: i64,
    location_type: i32,
    lat: Option<f64>,
    lng: Option<f64>,
    corrected: bool,
    original_address: String,
    corrected_address: String,
    reason: String,
    sender_id: Option<Uuid>,
    sender_username: Option<String>,
    open_address: String,
    apartment: String,
    tweet_contents: String,
    created_at: DateTime<Utc>,
}

impl From<ResolutionRow> for ResolutionRecord {
    fn from(row: ResolutionRow) -> Self {
        let location = match (row.lat, row.lng) {
            (Some(lat), Some(lng)) => Some([lat, lng]),
            _ => None,
        };
        let sender = match (row.sender_id, row.sender_username) {
            (Some(id), Some(username)) => Some(Sender { id, username }),
            _ => None,
        };
        ResolutionRecord {
            id: row.id,
            entry_id: row.entry_id,
            location_type: row.location_type,
            location,
            corrected: row.corrected,
            original_address: row.original_address,
            corrected_address: row.corrected_address,
            reason: row.reason,
            sender,
            open_address: row.open_address,
            apartment: row.apartment,
            tweet_contents: row.tweet_contents,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    username: String,
    auth_key: String,
    perm_level: i16,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            id: row.id,
            username: row.username,
            auth_key: row.auth_key,
            perm_level: PermLevel::from_i16(row.perm_level),
        }
    }
}

const RESOLUTION_COLUMNS: &str = "id, entry_id, location_type, lat, lng, corrected, \
     original_address, corrected_address, reason, sender_id, sender_username, \
     open_address, apartment, tweet_contents, created_at";

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Run the embedded SQL migrations.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    async fn fetch_resolution(&self, entry_id: EntryId) -> Result<Option<ResolutionRecord>> {
        let sql = format!("SELECT {RESOLUTION_COLUMNS} FROM resolutions WHERE entry_id = $1");
        let row = sqlx::query_as::<_, ResolutionRow>(&sql)
            .bind(entry_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Into::into))
    }
}

#[async_trait]
impl LocationStore for PgStore {
    async fn resolved_entry_ids(&self) -> Result<HashSet<EntryId>> {
        let ids = self
            .retry
            .run("resolved_entry_ids", StoreError::is_transient, || async move {
                let ids = sqlx::query_scalar::<_, i64>("SELECT entry_id FROM resolutions")
                    .fetch_all(&self.pool)
                    .await?;
                Ok::<_, StoreError>(ids)
            })
            .await?;
        Ok(ids.into_iter().collect())
    }

    async fn is_resolved(&self, entry_id: EntryId) -> Result<bool> {
        self.retry
            .run("is_resolved", StoreError::is_transient, || async move {
                let exists = sqlx::query_scalar::<_, bool>(
                    "SELECT EXISTS(SELECT 1 FROM resolutions WHERE entry_id = $1)",
                )
                .bind(entry_id)
                .fetch_one(&self.pool)
                .await?;
                Ok::<_, StoreError>(exists)
            })
            .await
    }

    async fn is_duplicate(&self, full_text: &str) -> Result<bool> {
        if full_text.is_empty() {
            return Ok(false);
        }
        self.retry
            .run("is_duplicate", StoreError::is_transient, || async move {
                let exists = sqlx::query_scalar::<_, bool>(
                    r#"
                    SELECT EXISTS(
                        SELECT 1 FROM resolutions
                        WHERE md5(tweet_contents) = md5($1) AND tweet_contents = $1
                    )
                    "#,
                )
                .bind(full_text)
                .fetch_one(&self.pool)
                .await?;
                Ok::<_, StoreError>(exists)
            })
            .await
    }

    async fn insert_resolution(&self, record: &ResolutionRecord) -> Result<InsertOutcome> {
        // ON CONFLICT DO NOTHING makes the insert idempotent, so retrying is safe.
        let inserted = self
            .retry
            .run("insert_resolution", StoreError::is_transient, || async move {
                let id = sqlx::query_scalar::<_, Uuid>(
                    r#"
                    INSERT INTO resolutions
                        (id, entry_id, location_type, lat, lng, corrected,
                         original_address, corrected_address, reason,
                         sender_id, sender_username, open_address, apartment,
                         tweet_contents, created_at)
                    VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
                    ON CONFLICT (entry_id) DO NOTHING
                    RETURNING id
                    "#,
                )
                .bind(record.id)
                .bind(record.entry_id)
                .bind(record.location_type)
                .bind(record.location.map(|l| l[0]))
                .bind(record.location.map(|l| l[1]))
                .bind(record.corrected)
                .bind(&record.original_address)
                .bind(&record.corrected_address)
                .bind(&record.reason)
                .bind(record.sender.as_ref().map(|s| s.id))
                .bind(record.sender.as_ref().map(|s| s.username.as_str()))
                .bind(&record.open_address)
                .bind(&record.apartment)
                .bind(&record.tweet_contents)
                .bind(record.created_at)
                .fetch_optional(&self.pool)
                .await?;
                Ok::<_, StoreError>(id)
            })
            .await?;

        if inserted.is_some() {
            return Ok(InsertOutcome::Inserted);
        }

        // A retried attempt lands here when an earlier one committed but its
        // reply was lost. The stored id tells our row from a competitor's.
        let stored = sqlx::query_scalar::<_, Uuid>("SELECT id FROM resolutions WHERE entry_id = $1")
            .bind(record.entry_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(classify_insert(stored, record.id))
    }

    async fn list_resolutions(&self, limit: i64, offset: i64) -> Result<Vec<ResolutionRecord>> {
        let sql = format!(
            "SELECT {RESOLUTION_COLUMNS} FROM resolutions ORDER BY created_at DESC LIMIT $1 OFFSET $2"
        );
        let rows = sqlx::query_as::<_, ResolutionRow>(&sql)
            .bind(limit.max(0))
            .bind(offset.max(0))
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn get_resolution(&self, entry_id: EntryId) -> Result<Option<ResolutionRecord>> {
        self.fetch_resolution(entry_id).await
    }

    async fn update_resolution(
        &self,
        entry_id: EntryId,
        update: &EntryUpdate,
    ) -> Result<Option<ResolutionRecord>> {
        let mut tx = self.pool.begin().await?;

        let sql = format!(
            "SELECT {RESOLUTION_COLUMNS} FROM resolutions WHERE entry_id = $1 FOR UPDATE"
        );
        let Some(row) = sqlx::query_as::<_, ResolutionRow>(&sql)
            .bind(entry_id)
            .fetch_optional(&mut *tx)
            .await?
        else {
            return Ok(None);
        };

        let mut record = ResolutionRecord::from(row);
        update.apply(&mut record);

        sqlx::query(
            r#"
            UPDATE resolutions
            SET location_type = $2, corrected = $3, corrected_address = $4, reason = $5,
                open_address = $6, apartment = $7, tweet_contents = $8
            WHERE entry_id = $1
            "#,
        )
        .bind(entry_id)
        .bind(record.location_type)
        .bind(record.corrected)
        .bind(&record.corrected_address)
        .bind(&record.reason)
        .bind(&record.open_address)
        .bind(&record.apartment)
        .bind(&record.tweet_contents)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(Some(record))
    }
}

/// Outcome of an insert that returned no row, given the id now stored for the entry.
fn classify_insert(stored: Option<Uuid>, ours: Uuid) -> InsertOutcome {
    match stored {
        Some(id) if id == ours => InsertOutcome::Inserted,
        _ => InsertOutcome::AlreadyResolved,
    }
}

#[async_trait]
impl UserStore for PgStore {
    async fn user_by_auth_key(&self, auth_key: &str) -> Result<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, username, auth_key, perm_level FROM users WHERE auth_key = $1",
        )
        .bind(auth_key)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Into::into))
    }
}

use std::sync::Arc;

use chrono::Utc;
use fieldcheck_common::{EntryId, ResolutionRecord, Sender, NO_ERROR_REASON};
use fieldcheck_store::{InsertOutcome, LocationStore, UserStore};
use serde::Deserialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::geo::maps_link;
use crate::{CheckError, LocationSource, Result};

/// Body of a resolve call. Missing strings default to empty.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ResolveRequest {
    pub id: EntryId,
    #[serde(rename = "type")]
    pub location_type: i32,
    pub new_address: String,
    pub open_address: String,
    pub apartment: String,
    pub reason: String,
    pub tweet_contents: String,
}

/// Records moderator decisions. Each entry id can be resolved once.
pub struct Resolver {
    source: Arc<dyn LocationSource>,
    store: Arc<dyn LocationStore>,
    users: Arc<dyn UserStore>,
}

impl Resolver {
    pub fn new(
        source: Arc<dyn LocationSource>,
        store: Arc<dyn LocationStore>,
        users: Arc<dyn UserStore>,
    ) -> Self {
        Self {
            source,
            store,
            users,
        }
    }

    pub async fn resolve(
        &self,
        req: ResolveRequest,
        auth_key: Option<&str>,
    ) -> Result<ResolutionRecord> {
        if req.id <= 0 {
            return Err(CheckError::InvalidInput(format!("invalid entry id {}", req.id)));
        }

        // Cheap early rejection. The insert below is what actually guards the race.
        if self.store.is_resolved(req.id).await? {
            return Err(CheckError::AlreadyResolved(req.id));
        }

        let location = self
            .source
            .all_candidates()
            .await?
            .into_iter()
            .find(|c| c.entry_id == req.id)
            .map(|c| c.loc);
        if location.is_none() {
            warn!(entry_id = req.id, "Resolving entry not present in the candidate list");
        }

        let record = ResolutionRecord {
            id: Uuid::new_v4(),
            entry_id: req.id,
            location_type: req.location_type,
            location,
            corrected: req.reason == NO_ERROR_REASON,
            original_address: location
                .map(|[lat, lng]| maps_link(lat, lng))
                .unwrap_or_default(),
            corrected_address: req.new_address,
            reason: req.reason,
            sender: self.sender(auth_key).await,
            open_address: req.open_address,
            apartment: req.apartment,
            tweet_contents: req.tweet_contents,
            created_at: Utc::now(),
        };

        match self.store.insert_resolution(&record).await? {
            InsertOutcome::Inserted => {
                info!(entry_id = record.entry_id, corrected = record.corrected, "Entry resolved");
                Ok(record)
            }
            InsertOutcome::AlreadyResolved => Err(CheckError::AlreadyResolved(record.entry_id)),
        }
    }

    /// The submitting user, if the key identifies one. Lookup failures only lose attribution.
    async fn sender(&self, auth_key: Option<&str>) -> Option<Sender> {
        let key = auth_key.filter(|k| !k.is_empty())?;
        match self.users.user_by_auth_key(key).await {
            Ok(user) => user.as_ref().map(Sender::from),
            Err(e) => {
                warn!(error = %e, "Sender lookup failed, recording without sender");
                None
            }
        }
    }
}

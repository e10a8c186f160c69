use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    response::Json,
};
use fieldcheck_common::{EntryId, EntryUpdate, ResolutionRecord};
use fieldcheck_core::CheckError;
use serde::Deserialize;
use tracing::info;

use crate::auth::Moderator;
use crate::error::ApiError;
use crate::AppState;

const DEFAULT_PAGE: i64 = 50;
const MAX_PAGE: i64 = 500;

#[derive(Debug, Default, Deserialize)]
pub struct EntriesQuery {
    limit: Option<i64>,
    offset: Option<i64>,
}

pub async fn list_entries(
    _moderator: Moderator,
    State(state): State<Arc<AppState>>,
    Query(params): Query<EntriesQuery>,
) -> Result<Json<Vec<ResolutionRecord>>, ApiError> {
    let limit = params.limit.unwrap_or(DEFAULT_PAGE).clamp(1, MAX_PAGE);
    let offset = params.offset.unwrap_or(0).max(0);
    let records = state.store.list_resolutions(limit, offset).await?;
    Ok(Json(records))
}

pub async fn get_entry(
    _moderator: Moderator,
    State(state): State<Arc<AppState>>,
    Path(entry_id): Path<EntryId>,
) -> Result<Json<ResolutionRecord>, ApiError> {
    state
        .store
        .get_resolution(entry_id)
        .await?
        .map(Json)
        .ok_or_else(|| CheckError::NotFound(format!("entry {entry_id}")).into())
}

pub async fn update_entry(
    Moderator(user): Moderator,
    State(state): State<Arc<AppState>>,
    Path(entry_id): Path<EntryId>,
    Json(update): Json<EntryUpdate>,
) -> Result<Json<ResolutionRecord>, ApiError> {
    if update.is_empty() {
        return Err(CheckError::InvalidInput("no fields to update".into()).into());
    }

    let record = state
        .store
        .update_resolution(entry_id, &update)
        .await?
        .ok_or_else(|| CheckError::NotFound(format!("entry {entry_id}")))?;

    info!(entry_id, moderator = %user.username, "Entry updated");
    Ok(Json(record))
}

pub mod admin;

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::HeaderMap,
    response::Json,
};
use fieldcheck_cache::CacheStats;
use fieldcheck_common::Selection;
use fieldcheck_core::{ResolveRequest, SelectQuery};

use crate::auth::auth_key;
use crate::error::ApiError;
use crate::AppState;

pub const RESOLVED_MESSAGE: &str = "Successfully added!";

pub async fn get_location(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SelectQuery>,
) -> Result<Json<Selection>, ApiError> {
    let selection = state.selector.select(query).await?;
    Ok(Json(selection))
}

pub async fn resolve(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<ResolveRequest>,
) -> Result<&'static str, ApiError> {
    state.resolver.resolve(req, auth_key(&headers)).await?;
    Ok(RESOLVED_MESSAGE)
}

pub async fn monitor(State(state): State<Arc<AppState>>) -> Json<CacheStats> {
    Json(state.cache.stats())
}

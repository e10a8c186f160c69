//! HTTP surface: location selection, resolve, admin entry editing and cache
//! monitoring. The binary in `main.rs` wires this router to Postgres and the
//! live feed; tests wire it to in-memory doubles.

pub mod auth;
pub mod error;
pub mod rest;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    routing::{get, post},
    Router,
};
use fieldcheck_cache::ShardedCache;
use fieldcheck_core::{Resolver, Selector};
use fieldcheck_store::{LocationStore, UserStore};
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

pub struct AppState {
    pub selector: Selector,
    pub resolver: Resolver,
    pub store: Arc<dyn LocationStore>,
    pub users: Arc<dyn UserStore>,
    pub cache: Arc<ShardedCache>,
}

pub fn router(state: Arc<AppState>, request_timeout: Duration) -> Router {
    let admin = Router::new()
        .route("/entries", get(rest::admin::list_entries))
        .route(
            "/entries/{entry_id}",
            get(rest::admin::get_entry).post(rest::admin::update_entry),
        );

    Router::new()
        .route("/", get(|| async { "ok" }))
        .route("/get-location", get(rest::get_location))
        .route("/resolve", post(rest::resolve))
        .route("/monitor", get(rest::monitor))
        .nest("/admin", admin)
        .with_state(state)
        .layer(TimeoutLayer::new(request_timeout))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                tracing::info_span!(
                    "http_request",
                    method = %request.method(),
                    path = %request.uri().path(),
                )
            }),
        )
}

//! Router tests against in-memory doubles.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use chrono::Utc;
use fieldcheck_api::{router, AppState};
use fieldcheck_cache::{CacheConfig, ShardedCache};
use fieldcheck_common::{LocationCandidate, PermLevel, ResolutionRecord, User, NO_ERROR_REASON};
use fieldcheck_core::testing::StaticSource;
use fieldcheck_core::{CachedSource, LocationSource, Resolver, Selector};
use fieldcheck_store::MemoryStore;
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

const MODERATOR_KEY: &str = "mod-key";
const USER_KEY: &str = "user-key";

struct Harness {
    app: Router,
    store: Arc<MemoryStore>,
    source: Arc<StaticSource>,
}

fn user(name: &str, key: &str, perm_level: PermLevel) -> User {
    User {
        id: Uuid::new_v4(),
        username: name.into(),
        auth_key: key.into(),
        perm_level,
    }
}

fn resolution(entry_id: i64, text: &str) -> ResolutionRecord {
    ResolutionRecord {
        id: Uuid::new_v4(),
        entry_id,
        location_type: 1,
        location: None,
        corrected: false,
        original_address: String::new(),
        corrected_address: String::new(),
        reason: "Yanlis konum".into(),
        sender: None,
        open_address: String::new(),
        apartment: String::new(),
        tweet_contents: text.into(),
        created_at: Utc::now(),
    }
}

fn harness_with(store: MemoryStore) -> Harness {
    let store = Arc::new(
        store
            .with_user(user("moderator", MODERATOR_KEY, PermLevel::Moderator))
            .with_user(user("reader", USER_KEY, PermLevel::User)),
    );
    let source = Arc::new(StaticSource::new(vec![
        (LocationCandidate::new(1, 36.0, 36.0, 100), "inside the box"),
        (LocationCandidate::new(2, 0.0, 0.0, 200), "far away"),
    ]));
    let cache = Arc::new(ShardedCache::new(CacheConfig {
        max_bytes: 1 << 20,
        max_entries: 1024,
        shard_count: 4,
    }));
    let cached: Arc<dyn LocationSource> =
        Arc::new(CachedSource::new(source.clone(), cache.clone()));

    let state = Arc::new(AppState {
        selector: Selector::new(cached.clone(), store.clone()),
        resolver: Resolver::new(cached, store.clone(), store.clone()),
        store: store.clone(),
        users: store.clone(),
        cache,
    });

    Harness {
        app: router(state, Duration::from_secs(5)),
        store,
        source,
    }
}

fn harness() -> Harness {
    harness_with(MemoryStore::new())
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, String) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, String::from_utf8(bytes.to_vec()).unwrap())
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn get_with_key(uri: &str, key: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header("Auth-Key", key)
        .body(Body::empty())
        .unwrap()
}

fn post_json(uri: &str, key: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(key) = key {
        builder = builder.header("Auth-Key", key);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn resolve_body(id: i64) -> Value {
    json!({
        "id": id,
        "type": 1,
        "new_address": "Antakya",
        "open_address": "",
        "apartment": "",
        "reason": NO_ERROR_REASON,
        "tweet_contents": "inside the box"
    })
}

// --- selection ---

#[tokio::test]
async fn health_check_answers_ok() {
    let h = harness();
    let (status, body) = send(&h.app, get("/")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "ok");
}

#[tokio::test]
async fn get_location_filters_by_city_box() {
    let h = harness();
    // City 2 covers (36.0, 36.0) but not (0.0, 0.0).
    let (status, body) = send(&h.app, get("/get-location?city_id=2")).await;
    assert_eq!(status, StatusCode::OK);

    let value: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(value["count"], 1);
    assert_eq!(value["location"]["entry_id"], 1);
    assert_eq!(value["location"]["original_message"], "inside the box");
    assert_eq!(
        value["location"]["original_location"],
        "https://www.google.com/maps/?q=36.000000,36.000000&ll=36.000000,36.000000&z=21"
    );
}

#[tokio::test]
async fn get_location_filters_by_epoch() {
    let h = harness();
    let (_, body) = send(&h.app, get("/get-location?starting_at=150")).await;
    let value: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(value["count"], 1);
    assert_eq!(value["location"]["entry_id"], 2);
}

#[tokio::test]
async fn blank_query_values_mean_no_filter() {
    let h = harness();
    let (status, body) = send(&h.app, get("/get-location?city_id=&starting_at=")).await;
    assert_eq!(status, StatusCode::OK);
    let value: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(value["count"], 2);
}

#[tokio::test]
async fn non_numeric_query_values_mean_no_filter() {
    let h = harness();
    let (status, body) = send(&h.app, get("/get-location?city_id=abc&starting_at=soon")).await;
    assert_eq!(status, StatusCode::OK);
    let value: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(value["count"], 2);
}

#[tokio::test]
async fn empty_pool_is_not_an_error() {
    let h = harness();
    let (status, body) = send(&h.app, get("/get-location?starting_at=99999")).await;
    assert_eq!(status, StatusCode::OK);
    let value: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(value, json!({ "count": 0, "location": null }));
}

#[tokio::test]
async fn upstream_failure_is_bad_gateway() {
    let h = harness();
    h.source.set_failing(true);
    let (status, _) = send(&h.app, get("/get-location")).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn candidate_list_is_served_from_cache() {
    let h = harness();
    send(&h.app, get("/get-location")).await;
    send(&h.app, get("/get-location")).await;
    assert_eq!(h.source.all_calls(), 1);

    let (status, body) = send(&h.app, get("/monitor")).await;
    assert_eq!(status, StatusCode::OK);
    let stats: Value = serde_json::from_str(&body).unwrap();
    assert!(stats["hits"].as_u64().unwrap() >= 1);
    assert!(stats["entries"].as_u64().unwrap() >= 1);
}

// --- resolve ---

#[tokio::test]
async fn resolve_then_conflict() {
    let h = harness();

    let (status, body) = send(&h.app, post_json("/resolve", None, resolve_body(1))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "Successfully added!");

    let (status, body) = send(&h.app, post_json("/resolve", None, resolve_body(1))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body, "this location is already checked");
    assert_eq!(h.store.resolution_count(), 1);
}

#[tokio::test]
async fn resolved_entry_leaves_the_pool() {
    let h = harness();
    send(&h.app, post_json("/resolve", None, resolve_body(1))).await;

    let (_, body) = send(&h.app, get("/get-location")).await;
    let value: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(value["count"], 1);
    assert_eq!(value["location"]["entry_id"], 2);
}

#[tokio::test]
async fn resolve_records_sender_from_auth_key() {
    let h = harness();
    send(&h.app, post_json("/resolve", Some(MODERATOR_KEY), resolve_body(1))).await;

    let (status, body) = send(&h.app, get_with_key("/admin/entries/1", MODERATOR_KEY)).await;
    assert_eq!(status, StatusCode::OK);
    let record: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(record["sender"]["username"], "moderator");
    assert_eq!(record["corrected"], true);
    assert_eq!(record["location"], json!([36.0, 36.0]));
}

#[tokio::test]
async fn malformed_resolve_body_is_rejected() {
    let h = harness();
    let request = Request::builder()
        .method("POST")
        .uri("/resolve")
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let (status, _) = send(&h.app, request).await;
    assert!(status.is_client_error());
    assert_eq!(h.store.resolution_count(), 0);
}

// --- admin ---

#[tokio::test]
async fn admin_requires_known_key() {
    let h = harness();

    let (status, body) = send(&h.app, get("/admin/entries")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, "User not found.");

    let (status, body) = send(&h.app, get_with_key("/admin/entries", "bogus")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, "User not found.");
}

#[tokio::test]
async fn admin_requires_moderator_level() {
    let h = harness();
    let (status, body) = send(&h.app, get_with_key("/admin/entries", USER_KEY)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, "You are not allowed to access here.");
}

#[tokio::test]
async fn admin_lists_newest_first_with_paging() {
    let mut store = MemoryStore::new();
    for id in 1..=3 {
        let mut record = resolution(id, &format!("text {id}"));
        record.created_at = Utc::now() + chrono::Duration::seconds(id);
        store = store.with_resolution(record);
    }
    let h = harness_with(store);

    let (status, body) = send(
        &h.app,
        get_with_key("/admin/entries?limit=2&offset=0", MODERATOR_KEY),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let page: Vec<Value> = serde_json::from_str(&body).unwrap();
    let ids: Vec<i64> = page.iter().map(|r| r["entry_id"].as_i64().unwrap()).collect();
    assert_eq!(ids, vec![3, 2]);

    let (_, body) = send(
        &h.app,
        get_with_key("/admin/entries?limit=2&offset=2", MODERATOR_KEY),
    )
    .await;
    let page: Vec<Value> = serde_json::from_str(&body).unwrap();
    assert_eq!(page.len(), 1);
    assert_eq!(page[0]["entry_id"], 1);
}

#[tokio::test]
async fn admin_get_missing_entry_is_not_found() {
    let h = harness();
    let (status, _) = send(&h.app, get_with_key("/admin/entries/42", MODERATOR_KEY)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn admin_update_recomputes_corrected() {
    let h = harness_with(MemoryStore::new().with_resolution(resolution(5, "text")));

    let (status, body) = send(
        &h.app,
        post_json(
            "/admin/entries/5",
            Some(MODERATOR_KEY),
            json!({ "reason": NO_ERROR_REASON, "new_address": "Iskenderun" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let record: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(record["corrected"], true);
    assert_eq!(record["corrected_address"], "Iskenderun");
    assert_eq!(record["tweet_contents"], "text");
}

#[tokio::test]
async fn admin_update_of_missing_entry_is_not_found() {
    let h = harness();
    let (status, _) = send(
        &h.app,
        post_json("/admin/entries/77", Some(MODERATOR_KEY), json!({ "reason": "x" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn admin_empty_update_is_bad_request() {
    let h = harness_with(MemoryStore::new().with_resolution(resolution(5, "text")));
    let (status, _) = send(
        &h.app,
        post_json("/admin/entries/5", Some(MODERATOR_KEY), json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

//! Integration tests for the observer API endpoints.
//!
//! Tests drive the Axum `Router` directly via `tower::ServiceExt` without
//! starting a TCP server.

#![allow(clippy::unwrap_used, clippy::float_cmp, clippy::indexing_slicing)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::Value;
use tower::ServiceExt;
use trisolaris_core::{
    KeyValueStore, MemoryStore, SessionRegistry, SessionSpawner, SilentNarrator, SimulationConfig,
};
use trisolaris_types::WorldId;
use trisolaris_observer::router::build_router;
use trisolaris_observer::state::AppState;

fn make_state(store: MemoryStore) -> Arc<AppState> {
    let spawner =
        SessionSpawner::new(&SimulationConfig::default(), store, Arc::new(SilentNarrator)).unwrap();
    let registry = Arc::new(SessionRegistry::new(Arc::new(spawner)));
    Arc::new(AppState::new(registry))
}

async fn get(state: &Arc<AppState>, uri: &str) -> (StatusCode, Vec<u8>) {
    let app = build_router(Arc::clone(state));
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, bytes.to_vec())
}

async fn get_json(state: &Arc<AppState>, uri: &str) -> (StatusCode, Value) {
    let (status, bytes) = get(state, uri).await;
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn index_reports_active_worlds() {
    let state = make_state(MemoryStore::new());
    let (status, body) = get(&state, "/").await;
    assert_eq!(status, StatusCode::OK);
    let text = String::from_utf8(body).unwrap();
    assert!(text.contains("Trisolaris observer running, 0 active world(s)"));

    get(&state, "/api/civilization").await;
    let (_, body) = get(&state, "/").await;
    assert!(String::from_utf8(body).unwrap().contains("1 active world(s)"));
}

#[tokio::test]
async fn fresh_world_reads_full_sanity() {
    let state = make_state(MemoryStore::new());
    let (status, json) = get_json(&state, "/api/civilization").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["sanity"], 100.0);
}

#[tokio::test]
async fn civilization_reads_the_durable_record() {
    let store = MemoryStore::new();
    store
        .put("session:alpha:sanity_index", "42.5".to_owned())
        .await
        .unwrap();
    let state = make_state(store);
    state.session(&WorldId::new("alpha"));
    state.session(&WorldId::new("beta"));

    let (status, json) = get_json(&state, "/api/civilization/alpha").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["sanity"], 42.5);

    let (_, json) = get_json(&state, "/api/civilization/beta").await;
    assert_eq!(json["sanity"], 100.0);
}

#[tokio::test]
async fn civilization_of_unknown_world_is_not_found() {
    let state = make_state(MemoryStore::new());
    for world in ["nowhere", "elsewhere", "nowhere"] {
        let (status, json) = get_json(&state, &format!("/api/civilization/{world}")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["status"], 404);
        assert!(json["error"].as_str().unwrap().contains(world));
    }
    assert!(state.registry.is_empty());
}

#[tokio::test]
async fn status_of_unknown_world_is_not_found() {
    let state = make_state(MemoryStore::new());
    let (status, json) = get_json(&state, "/api/status/nowhere").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["status"], 404);
    assert!(json["error"].as_str().unwrap().contains("nowhere"));
}

#[tokio::test]
async fn status_of_idle_world() {
    let state = make_state(MemoryStore::new());
    state.session(&WorldId::new("gamma"));

    let (status, json) = get_json(&state, "/api/status/gamma").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["world"], "gamma");
    assert_eq!(json["tick"], 0);
    assert_eq!(json["observers"], 0);
    assert_eq!(json["running"], false);
    assert_eq!(json["bodies"], 3);
    assert_eq!(json["time_scale"], 1.0);
    assert_eq!(json["shield"], 0.0);
}

#[tokio::test]
async fn websocket_route_requires_an_upgrade() {
    let state = make_state(MemoryStore::new());
    let (status, _) = get(&state, "/ws").await;
    assert!(status.is_client_error());
    let (status, _) = get(&state, "/ws/alpha").await;
    assert!(status.is_client_error());
}

#[tokio::test]
async fn unknown_route_is_not_found() {
    let state = make_state(MemoryStore::new());
    let (status, _) = get(&state, "/api/bodies").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn cors_allows_any_origin() {
    let state = make_state(MemoryStore::new());
    let app = build_router(state);
    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/civilization")
                .header("Origin", "http://observer.example")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(
        response.headers()["access-control-allow-origin"],
        "*"
    );
}

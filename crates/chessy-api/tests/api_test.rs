//! Endpoint contract tests for the query API.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

use chessy_api::{ApiState, router};
use chessy_common::{MemoryRecordStore, RecordStore, TableNames};

async fn seeded_state() -> ApiState {
    let store = MemoryRecordStore::new();
    store
        .put(
            "chessy_games",
            "lichess_2024-0000-0000",
            json!({
                "id": "lichess_2024-0000-0000",
                "White": "Carlsen",
                "Black": "Nakamura",
                "Event": "Titled Tuesday",
                "Result": "1-0",
                "pgnBody": "[Event \"Titled Tuesday\"]\n\n1. e4 e5 1-0",
                "sourceFileId": "lichess_2024",
                "sourceChunkIndex": 0,
            }),
        )
        .await
        .unwrap();
    store
        .put(
            "chessy_games",
            "lichess_2024-0000-0001",
            json!({
                "id": "lichess_2024-0000-0001",
                "White": "Nakamura",
                "Black": "Carlsen",
                "Event": "Titled Tuesday",
                "Result": "1/2-1/2",
                "pgnBody": "[Event \"Titled Tuesday\"]\n\n1. d4 d5 1/2-1/2",
                "sourceFileId": "lichess_2024",
                "sourceChunkIndex": 0,
            }),
        )
        .await
        .unwrap();

    ApiState {
        store: Arc::new(store),
        tables: TableNames::default(),
    }
}

async fn post(app: axum::Router, uri: &str, body: Body) -> (StatusCode, Vec<u8>) {
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header("content-type", "application/json")
                .body(body)
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, bytes.to_vec())
}

#[tokio::test]
async fn test_get_all_games_projects_listing_fields() {
    let app = router(seeded_state().await);

    let (status, body) = post(app, "/getallgames_", Body::empty()).await;
    assert_eq!(status, StatusCode::OK);

    let value: Value = serde_json::from_slice(&body).unwrap();
    let games = value["games"].as_array().unwrap();
    assert_eq!(games.len(), 2);
    for game in games {
        let fields = game.as_object().unwrap();
        assert_eq!(fields.len(), 5);
        assert!(fields.contains_key("id"));
        assert!(fields.contains_key("White"));
        assert!(fields.contains_key("Black"));
        assert!(fields.contains_key("Event"));
        assert!(fields.contains_key("Result"));
        assert!(!fields.contains_key("pgnBody"));
    }
}

#[tokio::test]
async fn test_get_all_games_empty_store() {
    let state = ApiState {
        store: Arc::new(MemoryRecordStore::new()),
        tables: TableNames::default(),
    };
    let app = router(state);

    let (status, body) = post(app, "/getallgames_", Body::empty()).await;
    assert_eq!(status, StatusCode::OK);

    let value: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(value["games"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn test_get_one_game_returns_full_document() {
    let app = router(seeded_state().await);

    let (status, body) = post(
        app,
        "/getgame_",
        Body::from(r#"{"gameId": "lichess_2024-0000-0000"}"#),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let value: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(value["game"]["White"], "Carlsen");
    assert_eq!(value["game"]["pgnBody"], "[Event \"Titled Tuesday\"]\n\n1. e4 e5 1-0");
}

#[tokio::test]
async fn test_get_one_game_unknown_id_is_empty_object() {
    let app = router(seeded_state().await);

    let (status, body) = post(app, "/getgame_", Body::from(r#"{"gameId": "nope"}"#)).await;
    assert_eq!(status, StatusCode::OK);

    let value: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(value["game"], json!({}));
}

#[tokio::test]
async fn test_get_one_game_missing_game_id_is_client_error() {
    let app = router(seeded_state().await);

    let (status, body) = post(app.clone(), "/getgame_", Body::from(r#"{}"#)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, b"Server Error");

    let (status, body) = post(app, "/getgame_", Body::from("not json")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, b"Server Error");
}

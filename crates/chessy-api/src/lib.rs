//! Read-only query API over the record store.
//!
//! A stateless passthrough: two POST endpoints that read the games table
//! and project the listing fields. Internal error detail is never exposed
//! to clients; any failure maps to a 400 with a generic body, logged
//! server-side instead.

pub mod config;

pub use config::ApiConfig;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::post;
use axum::Router;
use serde_json::{Map, Value, json};
use std::sync::Arc;
use tracing::warn;

use chessy_common::{RecordStoreRef, TableNames};

/// Generic client-visible error body; storage internals stay in the logs.
const SERVER_ERROR: &str = "Server Error";

/// Fields the game listing projects; nothing else leaks to clients.
const GAME_PROJECTION: [&str; 5] = ["id", "White", "Black", "Event", "Result"];

/// Shared handler state.
#[derive(Clone)]
pub struct ApiState {
    pub store: RecordStoreRef,
    pub tables: TableNames,
}

/// Build the API router.
pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/getallgames_", post(get_all_games))
        .route("/getgame_", post(get_one_game))
        .with_state(Arc::new(state))
}

/// `POST /getallgames_`: every stored game, projected to the listing
/// fields. No pagination token is returned (known limitation).
async fn get_all_games(State(state): State<Arc<ApiState>>) -> Response {
    match state.store.scan(&state.tables.games).await {
        Ok(documents) => {
            let games: Vec<Value> = documents.iter().map(project_game).collect();
            Json(json!({ "games": games })).into_response()
        }
        Err(e) => {
            warn!(error = %e, "Failed to scan games table");
            server_error()
        }
    }
}

/// `POST /getgame_` with body `{"gameId": "..."}`: one game by id, or an
/// empty object when the id is unknown. A missing `gameId` field is a
/// client error.
async fn get_one_game(State(state): State<Arc<ApiState>>, body: Bytes) -> Response {
    let game_id = match parse_game_id(&body) {
        Some(id) => id,
        None => {
            warn!("getgame_ request without a gameId field");
            return server_error();
        }
    };

    match state.store.get(&state.tables.games, &game_id).await {
        Ok(Some(document)) => Json(json!({ "game": document })).into_response(),
        Ok(None) => Json(json!({ "game": {} })).into_response(),
        Err(e) => {
            warn!(error = %e, game_id = %game_id, "Failed to get game");
            server_error()
        }
    }
}

fn parse_game_id(body: &[u8]) -> Option<String> {
    let value: Value = serde_json::from_slice(body).ok()?;
    value.get("gameId")?.as_str().map(str::to_string)
}

/// Copy only the projected fields that are present on the document.
fn project_game(document: &Value) -> Value {
    let mut projected = Map::new();
    if let Some(fields) = document.as_object() {
        for key in GAME_PROJECTION {
            if let Some(value) = fields.get(key) {
                projected.insert(key.to_string(), value.clone());
            }
        }
    }
    Value::Object(projected)
}

fn server_error() -> Response {
    (StatusCode::BAD_REQUEST, SERVER_ERROR).into_response()
}

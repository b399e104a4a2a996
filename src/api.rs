//! HTTP API endpoints.
//!
//! Game creation from a lobby snapshot plus read-only views for spectators,
//! debugging and deck pickers. Everything that changes a running game goes
//! over the WebSocket.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::catalog::DeckSummary;
use crate::error::{ErrorKind, GameError};
use crate::state::AppState;
use crate::types::*;

/// Body of `POST /api/games`
#[derive(Debug, Clone, Deserialize)]
pub struct CreateGameRequest {
    #[serde(default)]
    pub settings: GameSettings,
    pub players: Vec<LobbyPlayer>,
    pub host_id: PlayerId,
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub msg: String,
}

/// HTTP status for each error family
pub fn status_for(e: &GameError) -> StatusCode {
    match e.kind() {
        ErrorKind::Authorization => StatusCode::FORBIDDEN,
        ErrorKind::State | ErrorKind::Concurrency => StatusCode::CONFLICT,
        ErrorKind::Validation | ErrorKind::Resource => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Infrastructure => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn error_response(e: GameError) -> Response {
    let status = status_for(&e);
    if status.is_server_error() {
        tracing::error!("Request failed: {}", e);
    }
    (
        status,
        Json(ErrorBody {
            code: e.code().to_string(),
            msg: e.user_message(),
        }),
    )
        .into_response()
}

/// Create a game from a lobby snapshot.
///
/// POST /api/games
pub async fn create_game(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateGameRequest>,
) -> Response {
    match state.create_game(req.settings, req.players, &req.host_id).await {
        Ok(game) => (StatusCode::CREATED, Json(game)).into_response(),
        Err(e) => error_response(e),
    }
}

/// Spectator view of a game: no hands.
///
/// GET /api/games/{id}
pub async fn get_game(State(state): State<Arc<AppState>>, Path(id): Path<GameId>) -> Response {
    match state.spectator_view(&id).await {
        Ok(view) => Json(view).into_response(),
        Err(e) => error_response(e),
    }
}

/// The game exactly as persisted.
///
/// GET /api/games/{id}/document
pub async fn get_document(
    State(state): State<Arc<AppState>>,
    Path(id): Path<GameId>,
) -> Response {
    match state.game_document(&id).await {
        Ok(document) => Json(document).into_response(),
        Err(e) => error_response(e),
    }
}

/// GET /api/games
pub async fn list_games(State(state): State<Arc<AppState>>) -> Response {
    match state.list_active_games().await {
        Ok(ids) => Json(ids).into_response(),
        Err(e) => error_response(e),
    }
}

/// GET /api/decks
pub async fn list_decks(State(state): State<Arc<AppState>>) -> Json<Vec<DeckSummary>> {
    Json(state.catalog.list_decks().await)
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/games", post(create_game).get(list_games))
        .route("/api/games/{id}", get(get_game))
        .route("/api/games/{id}/document", get(get_document))
        .route("/api/decks", get(list_decks))
}

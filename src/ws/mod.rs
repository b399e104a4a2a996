pub mod handlers;
mod host;
mod player;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    response::{IntoResponse, Response},
};
use futures::{sink::SinkExt, stream::StreamExt};
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;

use crate::error::GameError;
use crate::protocol::{ClientMessage, ServerMessage, PROTOCOL_VERSION};
use crate::state::AppState;
use crate::types::{GameId, PlayerId};

#[derive(Debug, Deserialize)]
pub struct WsQuery {
    pub game_id: GameId,
    pub player_id: PlayerId,
}

/// Who is on the other end of a socket
#[derive(Debug, Clone)]
pub struct Session {
    pub game_id: GameId,
    pub player_id: PlayerId,
}

pub(crate) fn error_message(e: &GameError) -> ServerMessage {
    ServerMessage::Error {
        code: e.code().to_string(),
        msg: e.user_message(),
    }
}

/// WebSocket upgrade handler
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(params): Query<WsQuery>,
    State(state): State<Arc<AppState>>,
) -> Response {
    tracing::info!(
        "WebSocket connection request: game={}, player={}",
        params.game_id,
        params.player_id
    );

    let session = Session {
        game_id: params.game_id,
        player_id: params.player_id,
    };
    ws.on_upgrade(move |socket| handle_socket(socket, session, state))
        .into_response()
}

async fn send(
    sender: &mut futures::stream::SplitSink<WebSocket, Message>,
    msg: &ServerMessage,
) -> bool {
    match serde_json::to_string(msg) {
        Ok(json) => sender.send(Message::Text(json.into())).await.is_ok(),
        Err(e) => {
            tracing::error!("Failed to serialize server message: {}", e);
            true
        }
    }
}

/// Handle individual WebSocket connection
async fn handle_socket(socket: WebSocket, session: Session, state: Arc<AppState>) {
    let (mut sender, mut receiver) = socket.split();

    // Subscribe before reading so no commit slips between welcome and updates
    let mut snapshots = state.subscribe();

    let welcome = match state.get_game(&session.game_id).await {
        Ok(game) => match state.player_view(&game, &session.player_id).await {
            Ok(view) => ServerMessage::Welcome {
                protocol: PROTOCOL_VERSION.to_string(),
                player_id: session.player_id.clone(),
                view,
            },
            Err(e) => error_message(&e),
        },
        Err(e) => error_message(&e),
    };
    let accepted = matches!(welcome, ServerMessage::Welcome { .. });
    if !send(&mut sender, &welcome).await || !accepted {
        tracing::info!("Rejected WebSocket for player {}", session.player_id);
        return;
    }

    tracing::info!(
        game_id = %session.game_id,
        player_id = %session.player_id,
        "WebSocket connected"
    );

    loop {
        tokio::select! {
            snapshot = snapshots.recv() => {
                let game = match snapshot {
                    Ok(game) => game,
                    Err(RecvError::Lagged(skipped)) => {
                        // Catch up from the store instead
                        tracing::debug!("Snapshot receiver lagged by {}", skipped);
                        match state.get_game(&session.game_id).await {
                            Ok(game) => game,
                            Err(_) => continue,
                        }
                    }
                    Err(RecvError::Closed) => break,
                };
                if game.id != session.game_id {
                    continue;
                }
                if let Ok(view) = state.player_view(&game, &session.player_id).await {
                    if !send(&mut sender, &ServerMessage::State { view }).await {
                        break;
                    }
                }
            }

            ws_msg = receiver.next() => {
                match ws_msg {
                    Some(Ok(Message::Text(text))) => {
                        tracing::debug!("Received message: {}", text);

                        let response = match serde_json::from_str::<ClientMessage>(&text) {
                            Ok(client_msg) => handlers::handle_message(client_msg, &session, &state).await,
                            Err(e) => {
                                tracing::warn!("Failed to parse client message: {}", e);
                                Some(ServerMessage::Error {
                                    code: "PARSE_ERROR".to_string(),
                                    msg: format!("Invalid message format: {}", e),
                                })
                            }
                        };
                        if let Some(response) = response {
                            if !send(&mut sender, &response).await {
                                tracing::error!("Failed to send response");
                                break;
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) => {
                        tracing::info!("WebSocket closed");
                        break;
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if sender.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        tracing::error!("WebSocket error: {}", e);
                        break;
                    }
                    None => break,
                }
            }
        }
    }

    tracing::info!(
        game_id = %session.game_id,
        player_id = %session.player_id,
        "WebSocket connection closed"
    );
}

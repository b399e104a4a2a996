//! Player message handlers

use crate::protocol::ServerMessage;
use crate::state::AppState;
use crate::types::{CardId, PlayerId};
use std::sync::Arc;

use super::handlers::reply;
use super::{error_message, Session};

pub async fn handle_submit_cards(
    state: &Arc<AppState>,
    session: &Session,
    card_ids: Vec<CardId>,
) -> Option<ServerMessage> {
    reply(
        "submit_cards",
        state
            .submit_cards(&session.game_id, &session.player_id, &card_ids)
            .await,
    )
}

pub async fn handle_select_winner(
    state: &Arc<AppState>,
    session: &Session,
    winner_id: PlayerId,
) -> Option<ServerMessage> {
    reply(
        "select_winner",
        state
            .select_winner(&session.game_id, &session.player_id, &winner_id)
            .await,
    )
}

pub async fn handle_leave(state: &Arc<AppState>, session: &Session) -> Option<ServerMessage> {
    reply(
        "leave",
        state.leave(&session.game_id, &session.player_id).await,
    )
}

pub async fn handle_rejoin(state: &Arc<AppState>, session: &Session) -> Option<ServerMessage> {
    reply(
        "rejoin",
        state.rejoin(&session.game_id, &session.player_id).await,
    )
}

/// Sent on reconnect so the client can rebuild its screen
pub async fn handle_request_state(
    state: &Arc<AppState>,
    session: &Session,
) -> Option<ServerMessage> {
    let view = match state.get_game(&session.game_id).await {
        Ok(game) => state.player_view(&game, &session.player_id).await,
        Err(e) => Err(e),
    };
    Some(match view {
        Ok(view) => ServerMessage::State { view },
        Err(e) => error_message(&e),
    })
}

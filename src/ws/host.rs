//! Host command handlers

use crate::protocol::ServerMessage;
use crate::state::AppState;
use crate::types::{ForceTarget, PlayerId};
use std::sync::Arc;

use super::handlers::reply;
use super::Session;

pub async fn handle_start_game(state: &Arc<AppState>, session: &Session) -> Option<ServerMessage> {
    reply(
        "start_game",
        state.start_game(&session.game_id, &session.player_id).await,
    )
}

pub async fn handle_cancel_game(state: &Arc<AppState>, session: &Session) -> Option<ServerMessage> {
    reply(
        "cancel_game",
        state.cancel_game(&session.game_id, &session.player_id).await,
    )
}

pub async fn handle_kick_player(
    state: &Arc<AppState>,
    session: &Session,
    target: PlayerId,
) -> Option<ServerMessage> {
    reply(
        "kick_player",
        state
            .kick_player(&session.game_id, &session.player_id, &target)
            .await,
    )
}

pub async fn handle_force_transition(
    state: &Arc<AppState>,
    session: &Session,
    target: ForceTarget,
    reason: Option<String>,
) -> Option<ServerMessage> {
    let reason = reason.unwrap_or_default();
    reply(
        "force_transition",
        state
            .force_transition(&session.game_id, &session.player_id, target, &reason)
            .await,
    )
}

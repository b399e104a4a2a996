//! WebSocket message dispatch
//!
//! Host-only and judge-only rules are enforced by the game itself, so this
//! layer only routes messages and turns results into replies.

use crate::error::GameResult;
use crate::protocol::{ClientMessage, ServerMessage};
use crate::state::AppState;
use crate::types::Game;
use std::sync::Arc;

use super::{error_message, host, player, Session};

/// Acknowledge a committed action, or report why it was refused.
pub(super) fn reply(action: &str, result: GameResult<Game>) -> Option<ServerMessage> {
    match result {
        Ok(_) => Some(ServerMessage::Ack {
            action: action.to_string(),
        }),
        Err(e) => {
            tracing::debug!("{} refused: {}", action, e);
            Some(error_message(&e))
        }
    }
}

/// Handle client messages and return optional response
pub async fn handle_message(
    msg: ClientMessage,
    session: &Session,
    state: &Arc<AppState>,
) -> Option<ServerMessage> {
    match msg {
        // Player messages
        ClientMessage::SubmitCards { card_ids } => {
            player::handle_submit_cards(state, session, card_ids).await
        }
        ClientMessage::SelectWinner { winner_id } => {
            player::handle_select_winner(state, session, winner_id).await
        }
        ClientMessage::Leave => player::handle_leave(state, session).await,
        ClientMessage::Rejoin => player::handle_rejoin(state, session).await,
        ClientMessage::RequestState => player::handle_request_state(state, session).await,

        // Host commands
        ClientMessage::StartGame => host::handle_start_game(state, session).await,
        ClientMessage::CancelGame => host::handle_cancel_game(state, session).await,
        ClientMessage::KickPlayer { player_id } => {
            host::handle_kick_player(state, session, player_id).await
        }
        ClientMessage::ForceTransition { target, reason } => {
            host::handle_force_transition(state, session, target, reason).await
        }
    }
}

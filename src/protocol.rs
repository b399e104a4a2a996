use crate::types::*;
use serde::{Deserialize, Serialize};

pub const PROTOCOL_VERSION: &str = "1";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "t", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Host only
    StartGame,
    SubmitCards {
        card_ids: Vec<CardId>,
    },
    /// Judge only
    SelectWinner {
        winner_id: PlayerId,
    },
    Leave,
    Rejoin,
    /// Host only, before the game starts
    CancelGame,
    /// Host only
    KickPlayer {
        player_id: PlayerId,
    },
    /// Host only
    ForceTransition {
        target: ForceTarget,
        #[serde(default)]
        reason: Option<String>,
    },
    RequestState,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "t", rename_all = "snake_case")]
pub enum ServerMessage {
    Welcome {
        protocol: String,
        player_id: PlayerId,
        view: GameView,
    },
    /// Full state as seen by the receiving player
    State {
        view: GameView,
    },
    Ack {
        action: String,
    },
    Error {
        code: String,
        msg: String,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CardView {
    pub id: CardId,
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PromptView {
    pub id: CardId,
    pub text: String,
    pub pick: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlayerView {
    pub id: PlayerId,
    pub display_name: String,
    pub status: PlayerStatus,
    pub is_host: bool,
    pub is_judge: bool,
    pub score: u32,
    pub hand_count: usize,
    pub has_submitted: bool,
}

/// One submission as shown to players. `player_id` stays hidden until the
/// round is complete so the judge picks blind.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SubmissionView {
    pub slot: usize,
    pub player_id: Option<PlayerId>,
    pub cards: Vec<CardView>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RoundView {
    pub number: u32,
    pub phase: RoundPhase,
    pub judge_id: PlayerId,
    pub prompt: Option<PromptView>,
    pub submitted_count: usize,
    /// Empty until submissions close
    pub submissions: Vec<SubmissionView>,
    pub winner_id: Option<PlayerId>,
    pub submission_deadline: Option<String>,
    pub judging_deadline: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StandingView {
    pub player_id: PlayerId,
    pub display_name: String,
    pub score: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GameView {
    pub game_id: GameId,
    pub version: u64,
    pub status: GameStatus,
    pub host_id: PlayerId,
    pub settings: GameSettings,
    pub total_rounds: u32,
    pub current_round_number: u32,
    pub players: Vec<PlayerView>,
    pub round: Option<RoundView>,
    /// The viewer's own hand
    pub hand: Vec<CardView>,
    /// Filled once the game has ended
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub standings: Vec<StandingView>,
    pub server_now: String,
}

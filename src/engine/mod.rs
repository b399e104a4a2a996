//! Pure game logic. Nothing in here awaits or touches storage, so every
//! operation can be re-run from a fresh snapshot when a commit conflicts.

pub mod game;
pub mod pool;
pub mod rotation;
pub mod round;

use chrono::{DateTime, Utc};
use rand::RngCore;
use serde::Serialize;

use crate::catalog::Deck;
use crate::types::{ForceTarget, PlayerId};

/// What an operation needs besides the game itself: the deck to resolve
/// prompt cards against, a source of randomness, and the current time.
pub struct Dealer<'a> {
    pub deck: &'a Deck,
    pub rng: &'a mut dyn RngCore,
    pub now: DateTime<Utc>,
}

impl<'a> Dealer<'a> {
    pub fn new(deck: &'a Deck, rng: &'a mut dyn RngCore, now: DateTime<Utc>) -> Self {
        Self { deck, rng, now }
    }
}

/// Transitions produced by an operation, reported after commit.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum GameEvent {
    GameStarted {
        judge_id: PlayerId,
        total_rounds: u32,
    },
    GameCancelled,
    RoundStarted {
        round: u32,
        judge_id: PlayerId,
        prompt_card_id: String,
    },
    SubmissionAccepted {
        round: u32,
        player_id: PlayerId,
    },
    SubmissionsClosed {
        round: u32,
        submissions: usize,
        by_deadline: bool,
    },
    WinnerSelected {
        round: u32,
        winner_id: PlayerId,
    },
    RoundCompleted {
        round: u32,
        winner_id: Option<PlayerId>,
    },
    GameEnded {
        rounds_played: u32,
    },
    PlayerLeft {
        player_id: PlayerId,
    },
    PlayerDisconnected {
        player_id: PlayerId,
    },
    PlayerReconnected {
        player_id: PlayerId,
    },
    PlayerKicked {
        player_id: PlayerId,
    },
    ForcedTransition {
        actor: PlayerId,
        target: ForceTarget,
    },
}

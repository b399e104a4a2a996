//! Error taxonomy for the round engine.
//!
//! Every variant except `Infrastructure` is an expected outcome of a request
//! that was invalid for the current state; callers surface those to the user.
//! Only `ConcurrentUpdateFailed` is worth retrying unchanged.

use crate::types::{CardId, DeckId, GameId, GameStatus, PlayerId, RoundPhase};

pub type GameResult<T> = Result<T, GameError>;

/// Which of the two draw pools ran dry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PoolKind {
    Prompt,
    Answer,
}

impl std::fmt::Display for PoolKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PoolKind::Prompt => write!(f, "prompt"),
            PoolKind::Answer => write!(f, "answer"),
        }
    }
}

/// Coarse error families, used for status mapping and retry decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Authorization,
    State,
    Validation,
    Resource,
    NotFound,
    Concurrency,
    Infrastructure,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GameError {
    #[error("only the host may do this")]
    NotHost,

    #[error("only the judge may pick the winner")]
    NotJudge,

    #[error("player {0} is not part of this game")]
    NotInGame(PlayerId),

    #[error("action not allowed while the game is {0:?}")]
    InvalidState(GameStatus),

    #[error("action not allowed while the round is {0:?}")]
    InvalidPhase(RoundPhase),

    #[error("expected {expected} cards, got {actual}")]
    WrongCardCount { expected: usize, actual: usize },

    #[error("card {0} is not in the player's hand")]
    CardNotInHand(CardId),

    #[error("{0} has no submission this round")]
    InvalidWinner(PlayerId),

    #[error("player already submitted this round")]
    AlreadySubmitted,

    #[error("the judge cannot submit cards")]
    JudgeCannotSubmit,

    #[error("{pool} pool exhausted: requested {requested}, {remaining} left")]
    DeckExhausted {
        pool: PoolKind,
        requested: usize,
        remaining: usize,
    },

    #[error("need at least {required} players, have {actual}")]
    InsufficientPlayers { required: usize, actual: usize },

    #[error("players not ready: {}", .0.join(", "))]
    PlayersNotReady(Vec<PlayerId>),

    #[error("invalid settings: {0}")]
    InvalidSettings(String),

    #[error("game {0} not found")]
    GameNotFound(GameId),

    #[error("deck {0} not found")]
    DeckNotFound(DeckId),

    #[error("card {0} not found")]
    CardNotFound(CardId),

    #[error("gave up after {attempts} conflicting updates")]
    ConcurrentUpdateFailed { attempts: u32 },

    #[error("storage failure: {0}")]
    Infrastructure(String),
}

impl GameError {
    pub fn kind(&self) -> ErrorKind {
        use GameError::*;
        match self {
            NotHost | NotJudge | NotInGame(_) => ErrorKind::Authorization,
            InvalidState(_) | InvalidPhase(_) => ErrorKind::State,
            WrongCardCount { .. }
            | CardNotInHand(_)
            | InvalidWinner(_)
            | AlreadySubmitted
            | JudgeCannotSubmit
            | InvalidSettings(_) => ErrorKind::Validation,
            DeckExhausted { .. } | InsufficientPlayers { .. } | PlayersNotReady(_) => {
                ErrorKind::Resource
            }
            GameNotFound(_) | DeckNotFound(_) | CardNotFound(_) => ErrorKind::NotFound,
            ConcurrentUpdateFailed { .. } => ErrorKind::Concurrency,
            Infrastructure(_) => ErrorKind::Infrastructure,
        }
    }

    /// Stable machine-readable code sent to clients.
    pub fn code(&self) -> &'static str {
        use GameError::*;
        match self {
            NotHost => "NOT_HOST",
            NotJudge => "NOT_JUDGE",
            NotInGame(_) => "NOT_IN_GAME",
            InvalidState(_) => "INVALID_STATE",
            InvalidPhase(_) => "INVALID_PHASE",
            WrongCardCount { .. } => "WRONG_CARD_COUNT",
            CardNotInHand(_) => "CARD_NOT_IN_HAND",
            InvalidWinner(_) => "INVALID_WINNER",
            AlreadySubmitted => "ALREADY_SUBMITTED",
            JudgeCannotSubmit => "JUDGE_CANNOT_SUBMIT",
            DeckExhausted { .. } => "DECK_EXHAUSTED",
            InsufficientPlayers { .. } => "INSUFFICIENT_PLAYERS",
            PlayersNotReady(_) => "PLAYERS_NOT_READY",
            InvalidSettings(_) => "INVALID_SETTINGS",
            GameNotFound(_) => "GAME_NOT_FOUND",
            DeckNotFound(_) => "DECK_NOT_FOUND",
            CardNotFound(_) => "CARD_NOT_FOUND",
            ConcurrentUpdateFailed { .. } => "CONCURRENT_UPDATE_FAILED",
            Infrastructure(_) => "INTERNAL",
        }
    }

    /// Only exhausted optimistic retries may be retried unchanged.
    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::Concurrency
    }

    /// Short actionable text for players.
    pub fn user_message(&self) -> String {
        use GameError::*;
        match self {
            NotHost => "Only the host can do that.".to_string(),
            NotJudge => "Only this round's judge can pick the winner.".to_string(),
            NotInGame(_) => "You are not part of this game.".to_string(),
            InvalidState(GameStatus::Lobby) => "The game has not started yet.".to_string(),
            InvalidState(GameStatus::Playing) => "The game is already running.".to_string(),
            InvalidState(_) => "This game is over.".to_string(),
            InvalidPhase(RoundPhase::Submitting) => {
                "Submissions are still open for this round.".to_string()
            }
            InvalidPhase(_) => "Submissions are closed for this round.".to_string(),
            WrongCardCount { expected: 1, .. } => "Select exactly 1 card.".to_string(),
            WrongCardCount { expected, .. } => format!("Select exactly {} cards.", expected),
            CardNotInHand(_) => "You can only play cards from your hand.".to_string(),
            InvalidWinner(_) => "Pick one of the submitted answers.".to_string(),
            AlreadySubmitted => "You already submitted this round.".to_string(),
            JudgeCannotSubmit => "You are judging this round.".to_string(),
            DeckExhausted { .. } => {
                "The deck ran out of cards. Pick a bigger deck or fewer rounds.".to_string()
            }
            InsufficientPlayers { required, .. } => {
                format!("At least {} players are needed to start.", required)
            }
            PlayersNotReady(ids) => format!("Waiting for {} player(s) to get ready.", ids.len()),
            InvalidSettings(detail) => format!("Invalid game settings: {}", detail),
            GameNotFound(_) => "That game does not exist.".to_string(),
            DeckNotFound(_) | CardNotFound(_) => "That deck is not available.".to_string(),
            ConcurrentUpdateFailed { .. } | Infrastructure(_) => {
                "Something went wrong, please try again.".to_string()
            }
        }
    }
}

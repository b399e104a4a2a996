use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, VecDeque};

/// Opaque ID types for type safety
pub type GameId = String;
pub type PlayerId = String;
pub type CardId = String;
pub type DeckId = String;

/// Bounds on the configured player limit.
pub const MIN_PLAYERS: usize = 3;
pub const MAX_PLAYERS: usize = 10;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GameStatus {
    Lobby,
    Playing,
    Ended,
    Cancelled,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PlayerStatus {
    Joined,
    Ready,
    Playing,
    Spectating,
    Disconnected,
}

/// Phases of a single round, in the only order they may be visited.
///
/// This is the one definition of round phases; views and protocol messages
/// reuse it instead of declaring their own.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RoundPhase {
    Dealing,
    Submitting,
    Judging,
    Revealing,
    Complete,
}

impl RoundPhase {
    /// Phases only move forward; staying put is not a transition.
    pub fn can_advance_to(self, next: RoundPhase) -> bool {
        next > self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GameSettings {
    pub player_limit: u8,
    pub rounds_per_player: u32,
    pub hand_size: u32,
    /// Seconds players get to submit; `None` means no deadline
    #[serde(default)]
    pub submission_seconds: Option<u32>,
    /// Seconds the judge gets to pick; `None` means no deadline
    #[serde(default)]
    pub judging_seconds: Option<u32>,
    pub deck_id: DeckId,
    #[serde(default)]
    pub family_filter: bool,
}

impl Default for GameSettings {
    fn default() -> Self {
        Self {
            player_limit: 8,
            rounds_per_player: 2,
            hand_size: 7,
            submission_seconds: Some(90),
            judging_seconds: Some(60),
            deck_id: "starter".to_string(),
            family_filter: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Player {
    pub id: PlayerId,
    pub display_name: String,
    pub status: PlayerStatus,
    pub is_host: bool,
    /// Join order; defines judge rotation
    pub seat: u32,
    pub score: u32,
    pub hand: Vec<CardId>,
}

impl Player {
    /// Whether this player takes turns (submitting and judging).
    pub fn in_rotation(&self) -> bool {
        !matches!(self.status, PlayerStatus::Spectating)
    }

    pub fn holds(&self, card_id: &str) -> bool {
        self.hand.iter().any(|c| c == card_id)
    }
}

/// A player as handed over by the lobby before the game starts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LobbyPlayer {
    pub id: PlayerId,
    pub display_name: String,
    #[serde(default = "default_lobby_status")]
    pub status: PlayerStatus,
}

fn default_lobby_status() -> PlayerStatus {
    PlayerStatus::Joined
}

/// The drawn prompt card plus how many answers it asks for.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PromptRef {
    pub card_id: CardId,
    pub pick: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Submission {
    pub player_id: PlayerId,
    pub card_ids: Vec<CardId>,
    pub submitted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Round {
    pub number: u32,
    pub phase: RoundPhase,
    pub prompt: Option<PromptRef>,
    pub judge_id: PlayerId,
    pub submissions: HashMap<PlayerId, Submission>,
    /// Anonymous presentation order for the judge, fixed on entering Judging
    #[serde(default)]
    pub reveal_order: Vec<PlayerId>,
    pub winner_id: Option<PlayerId>,
    pub submission_deadline: Option<DateTime<Utc>>,
    pub judging_deadline: Option<DateTime<Utc>>,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeckState {
    pub remaining_prompt_card_ids: VecDeque<CardId>,
    pub remaining_answer_card_ids: VecDeque<CardId>,
    pub played_prompt_card_ids: BTreeSet<CardId>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ForceTarget {
    CloseSubmissions,
    SkipJudging,
    EndGame,
}

/// Record of a host override applied outside the normal flow.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AuditEntry {
    pub at: DateTime<Utc>,
    pub actor: PlayerId,
    pub target: ForceTarget,
    pub reason: String,
    pub round_number: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Game {
    pub id: GameId,
    /// Optimistic concurrency token, bumped on every committed write
    pub version: u64,
    pub status: GameStatus,
    pub settings: GameSettings,
    pub players: HashMap<PlayerId, Player>,
    pub host_id: PlayerId,
    pub current_round_number: u32,
    pub current_judge_id: Option<PlayerId>,
    /// Fixed when the game starts: rounds_per_player x rotation size
    pub total_rounds: u32,
    pub deck_state: DeckState,
    /// Every round so far; the last one is the current round
    pub rounds: Vec<Round>,
    #[serde(default)]
    pub audit_log: Vec<AuditEntry>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
}

impl Game {
    pub fn current_round(&self) -> Option<&Round> {
        self.rounds.last()
    }

    pub fn current_round_mut(&mut self) -> Option<&mut Round> {
        self.rounds.last_mut()
    }

    pub fn player(&self, player_id: &str) -> Option<&Player> {
        self.players.get(player_id)
    }
}

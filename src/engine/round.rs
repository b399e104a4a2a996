//! Single-round state machine: Dealing -> Submitting -> Judging -> Revealing -> Complete.

use chrono::{DateTime, Utc};
use rand::Rng;
use std::collections::{HashMap, HashSet};

use super::pool::shuffle;
use crate::error::{GameError, GameResult};
use crate::types::*;

impl Round {
    /// A new round waiting for its prompt card.
    pub fn new(number: u32, judge_id: PlayerId, now: DateTime<Utc>) -> Self {
        Self {
            number,
            phase: RoundPhase::Dealing,
            prompt: None,
            judge_id,
            submissions: HashMap::new(),
            reveal_order: Vec::new(),
            winner_id: None,
            submission_deadline: None,
            judging_deadline: None,
            started_at: now,
            completed_at: None,
        }
    }

    fn advance(&mut self, next: RoundPhase) -> GameResult<()> {
        if !self.phase.can_advance_to(next) {
            return Err(GameError::InvalidPhase(self.phase));
        }
        tracing::debug!(round = self.number, from = ?self.phase, to = ?next, "Round phase advance");
        self.phase = next;
        Ok(())
    }

    /// Attach the drawn prompt and open submissions.
    pub fn deal(&mut self, prompt: PromptRef, deadline: Option<DateTime<Utc>>) -> GameResult<()> {
        if self.phase != RoundPhase::Dealing {
            return Err(GameError::InvalidPhase(self.phase));
        }
        self.prompt = Some(prompt);
        self.submission_deadline = deadline;
        self.advance(RoundPhase::Submitting)
    }

    /// Number of answer cards a submission must contain.
    pub fn pick(&self) -> usize {
        self.prompt.as_ref().map(|p| p.pick as usize).unwrap_or(1)
    }

    pub fn has_submitted(&self, player_id: &str) -> bool {
        self.submissions.contains_key(player_id)
    }

    pub fn is_complete(&self) -> bool {
        self.phase == RoundPhase::Complete
    }

    /// Move `card_ids` from the player's hand into a new submission.
    ///
    /// Checks run in a fixed order so the same bad request always yields the
    /// same error: phase, judge, duplicate submission, hand membership, count.
    pub fn submit(
        &mut self,
        player: &mut Player,
        card_ids: &[CardId],
        now: DateTime<Utc>,
    ) -> GameResult<()> {
        if self.phase != RoundPhase::Submitting {
            return Err(GameError::InvalidPhase(self.phase));
        }
        if player.id == self.judge_id {
            return Err(GameError::JudgeCannotSubmit);
        }
        if self.has_submitted(&player.id) {
            return Err(GameError::AlreadySubmitted);
        }

        // A card listed twice is only held once
        let mut seen = HashSet::with_capacity(card_ids.len());
        for card_id in card_ids {
            if !player.holds(card_id) || !seen.insert(card_id.as_str()) {
                return Err(GameError::CardNotInHand(card_id.clone()));
            }
        }

        if card_ids.len() != self.pick() {
            return Err(GameError::WrongCardCount {
                expected: self.pick(),
                actual: card_ids.len(),
            });
        }

        player.hand.retain(|c| !seen.contains(c.as_str()));
        self.submissions.insert(
            player.id.clone(),
            Submission {
                player_id: player.id.clone(),
                card_ids: card_ids.to_vec(),
                submitted_at: now,
            },
        );
        Ok(())
    }

    /// Stop accepting submissions and fix an anonymous reveal order.
    pub fn close_submissions<R: Rng + ?Sized>(
        &mut self,
        judging_deadline: Option<DateTime<Utc>>,
        rng: &mut R,
    ) -> GameResult<()> {
        if self.phase != RoundPhase::Submitting {
            return Err(GameError::InvalidPhase(self.phase));
        }
        let mut order: Vec<PlayerId> = self.submissions.keys().cloned().collect();
        order.sort();
        shuffle(&mut order, rng);
        self.reveal_order = order;
        self.judging_deadline = judging_deadline;
        self.advance(RoundPhase::Judging)
    }

    /// Judge picks the winning submission. Revealing is a display pause only,
    /// so the round runs straight through to Complete.
    pub fn select_winner(
        &mut self,
        caller: &str,
        winner_id: &str,
        now: DateTime<Utc>,
    ) -> GameResult<()> {
        if caller != self.judge_id {
            return Err(GameError::NotJudge);
        }
        if self.phase != RoundPhase::Judging {
            return Err(GameError::InvalidPhase(self.phase));
        }
        if !self.submissions.contains_key(winner_id) {
            return Err(GameError::InvalidWinner(winner_id.to_string()));
        }

        self.winner_id = Some(winner_id.to_string());
        self.advance(RoundPhase::Revealing)?;
        self.advance(RoundPhase::Complete)?;
        self.completed_at = Some(now);
        Ok(())
    }

    /// Close a judging round with nobody scoring.
    pub fn complete_without_winner(&mut self, now: DateTime<Utc>) -> GameResult<()> {
        if self.phase != RoundPhase::Judging {
            return Err(GameError::InvalidPhase(self.phase));
        }
        self.advance(RoundPhase::Complete)?;
        self.completed_at = Some(now);
        Ok(())
    }

    pub fn submission_deadline_passed(&self, now: DateTime<Utc>) -> bool {
        self.phase == RoundPhase::Submitting && self.submission_deadline.is_some_and(|d| now >= d)
    }

    pub fn judging_deadline_passed(&self, now: DateTime<Utc>) -> bool {
        self.phase == RoundPhase::Judging && self.judging_deadline.is_some_and(|d| now >= d)
    }
}

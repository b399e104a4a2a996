//! Shuffled draw pools for prompt and answer cards.

use rand::Rng;
use std::collections::VecDeque;

use crate::catalog::Deck;
use crate::error::{GameError, GameResult, PoolKind};
use crate::types::{CardId, DeckState};

/// In-place Fisher-Yates shuffle; every permutation is equally likely.
pub fn shuffle<T, R: Rng + ?Sized>(items: &mut [T], rng: &mut R) {
    for i in (1..items.len()).rev() {
        let j = rng.random_range(0..=i);
        items.swap(i, j);
    }
}

/// Build fresh shuffled pools for a deck.
pub fn initialize<R: Rng + ?Sized>(deck: &Deck, family_filter: bool, rng: &mut R) -> DeckState {
    let mut prompts = deck.prompt_ids(family_filter);
    let mut answers = deck.answer_ids(family_filter);
    shuffle(&mut prompts, rng);
    shuffle(&mut answers, rng);

    DeckState {
        remaining_prompt_card_ids: prompts.into(),
        remaining_answer_card_ids: answers.into(),
        played_prompt_card_ids: Default::default(),
    }
}

/// Take `count` ids off the front of a pool. Fails without consuming
/// anything when the pool is too small.
pub fn draw(pool: &mut VecDeque<CardId>, kind: PoolKind, count: usize) -> GameResult<Vec<CardId>> {
    if count > pool.len() {
        return Err(GameError::DeckExhausted {
            pool: kind,
            requested: count,
            remaining: pool.len(),
        });
    }
    Ok(pool.drain(..count).collect())
}

impl DeckState {
    pub fn draw_answers(&mut self, count: usize) -> GameResult<Vec<CardId>> {
        draw(&mut self.remaining_answer_card_ids, PoolKind::Answer, count)
    }

    /// Draw the next prompt that has not been played in this game yet.
    pub fn draw_prompt(&mut self) -> GameResult<CardId> {
        while let Some(card_id) = self.remaining_prompt_card_ids.pop_front() {
            if self.played_prompt_card_ids.insert(card_id.clone()) {
                return Ok(card_id);
            }
            tracing::warn!(card_id = %card_id, "Skipping prompt that was already played");
        }
        Err(GameError::DeckExhausted {
            pool: PoolKind::Prompt,
            requested: 1,
            remaining: 0,
        })
    }
}

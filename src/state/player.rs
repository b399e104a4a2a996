use super::AppState;
use crate::catalog::Deck;
use crate::error::{GameError, GameResult};
use crate::protocol::*;
use crate::types::*;
use chrono::Utc;

impl AppState {
    pub async fn leave(&self, game_id: &GameId, player_id: &str) -> GameResult<Game> {
        let game = self
            .act(game_id, |game, dealer| game.leave(player_id, dealer))
            .await?;
        tracing::info!(game_id = %game_id, player_id, "Player left");
        Ok(game)
    }

    pub async fn rejoin(&self, game_id: &GameId, player_id: &str) -> GameResult<Game> {
        self.act(game_id, |game, _| game.rejoin(player_id)).await
    }

    pub async fn kick_player(
        &self,
        game_id: &GameId,
        requester: &str,
        target: &str,
    ) -> GameResult<Game> {
        let game = self
            .act(game_id, |game, dealer| game.kick(requester, target, dealer))
            .await?;
        tracing::info!(game_id = %game_id, target, "Player kicked");
        Ok(game)
    }

    /// Build the game as `viewer` may see it
    pub async fn player_view(&self, game: &Game, viewer: &str) -> GameResult<GameView> {
        if !game.players.contains_key(viewer) {
            return Err(GameError::NotInGame(viewer.to_string()));
        }
        let deck = self.catalog.deck(&game.settings.deck_id).await?;
        build_view(game, viewer, &deck)
    }

    /// Public view with no hand, for anyone outside the game
    pub async fn spectator_view(&self, game_id: &GameId) -> GameResult<GameView> {
        let game = self.get_game(game_id).await?;
        let deck = self.catalog.deck(&game.settings.deck_id).await?;
        build_view(&game, "", &deck)
    }
}

fn answer_views(deck: &Deck, ids: &[CardId]) -> GameResult<Vec<CardView>> {
    ids.iter()
        .map(|id| {
            deck.answer(id)
                .map(|card| CardView {
                    id: card.id.clone(),
                    text: card.text.clone(),
                })
                .ok_or_else(|| GameError::CardNotFound(id.clone()))
        })
        .collect()
}

fn round_view(round: &Round, deck: &Deck) -> GameResult<RoundView> {
    let prompt = match &round.prompt {
        Some(p) => {
            let card = deck
                .prompt(&p.card_id)
                .ok_or_else(|| GameError::CardNotFound(p.card_id.clone()))?;
            Some(PromptView {
                id: card.id.clone(),
                text: card.text.clone(),
                pick: p.pick,
            })
        }
        None => None,
    };

    // Submissions stay hidden while players are still submitting, and
    // anonymous until the round is decided
    let submissions = if round.phase >= RoundPhase::Judging {
        let attributed = round.phase == RoundPhase::Complete;
        round
            .reveal_order
            .iter()
            .enumerate()
            .filter_map(|(slot, player_id)| {
                round.submissions.get(player_id).map(|s| (slot, player_id, s))
            })
            .map(|(slot, player_id, submission)| {
                Ok(SubmissionView {
                    slot,
                    player_id: attributed.then(|| player_id.clone()),
                    cards: answer_views(deck, &submission.card_ids)?,
                })
            })
            .collect::<GameResult<Vec<_>>>()?
    } else {
        Vec::new()
    };

    Ok(RoundView {
        number: round.number,
        phase: round.phase,
        judge_id: round.judge_id.clone(),
        prompt,
        submitted_count: round.submissions.len(),
        submissions,
        winner_id: round.winner_id.clone(),
        submission_deadline: round.submission_deadline.map(|d| d.to_rfc3339()),
        judging_deadline: round.judging_deadline.map(|d| d.to_rfc3339()),
    })
}

fn build_view(game: &Game, viewer: &str, deck: &Deck) -> GameResult<GameView> {
    let round = game.current_round();

    let mut players: Vec<&Player> = game.players.values().collect();
    players.sort_by_key(|p| p.seat);
    let players = players
        .into_iter()
        .map(|p| PlayerView {
            id: p.id.clone(),
            display_name: p.display_name.clone(),
            status: p.status,
            is_host: p.is_host,
            is_judge: game.current_judge_id.as_deref() == Some(p.id.as_str()),
            score: p.score,
            hand_count: p.hand.len(),
            has_submitted: round.is_some_and(|r| r.has_submitted(&p.id)),
        })
        .collect();

    let hand = match game.player(viewer) {
        Some(p) => answer_views(deck, &p.hand)?,
        None => Vec::new(),
    };

    let standings = if game.status == GameStatus::Ended {
        game.standings()
            .into_iter()
            .map(|p| StandingView {
                player_id: p.id.clone(),
                display_name: p.display_name.clone(),
                score: p.score,
            })
            .collect()
    } else {
        Vec::new()
    };

    Ok(GameView {
        game_id: game.id.clone(),
        version: game.version,
        status: game.status,
        host_id: game.host_id.clone(),
        settings: game.settings.clone(),
        total_rounds: game.total_rounds,
        current_round_number: game.current_round_number,
        players,
        round: round.map(|r| round_view(r, deck)).transpose()?,
        hand,
        standings,
        server_now: Utc::now().to_rfc3339(),
    })
}

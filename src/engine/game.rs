//! Cross-round orchestration on the `Game` aggregate: starting a game,
//! judge rotation, scoring, hand replenishment and game end.

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;

use super::pool;
use super::rotation::{next_judge, total_rounds, turn_order};
use super::{Dealer, GameEvent};
use crate::error::{GameError, GameResult, PoolKind};
use crate::types::*;

pub fn validate_settings(settings: &GameSettings) -> GameResult<()> {
    let limit = settings.player_limit as usize;
    if !(MIN_PLAYERS..=MAX_PLAYERS).contains(&limit) {
        return Err(GameError::InvalidSettings(format!(
            "player limit must be between {} and {}",
            MIN_PLAYERS, MAX_PLAYERS
        )));
    }
    if settings.rounds_per_player == 0 {
        return Err(GameError::InvalidSettings(
            "rounds per player must be at least 1".to_string(),
        ));
    }
    if settings.hand_size == 0 {
        return Err(GameError::InvalidSettings(
            "hand size must be at least 1".to_string(),
        ));
    }
    if settings.submission_seconds == Some(0) || settings.judging_seconds == Some(0) {
        return Err(GameError::InvalidSettings(
            "time limits must be at least one second".to_string(),
        ));
    }
    if settings.deck_id.trim().is_empty() {
        return Err(GameError::InvalidSettings(
            "a deck must be selected".to_string(),
        ));
    }
    Ok(())
}

fn deadline_after(now: DateTime<Utc>, seconds: Option<u32>) -> Option<DateTime<Utc>> {
    seconds.map(|s| now + Duration::seconds(i64::from(s)))
}

impl Game {
    /// Build the pre-play game from what the lobby collected.
    pub fn from_lobby(
        id: GameId,
        settings: GameSettings,
        lobby: Vec<LobbyPlayer>,
        host_id: &str,
        now: DateTime<Utc>,
    ) -> GameResult<Game> {
        validate_settings(&settings)?;
        if lobby.len() > settings.player_limit as usize {
            return Err(GameError::InvalidSettings(format!(
                "{} players exceed the limit of {}",
                lobby.len(),
                settings.player_limit
            )));
        }

        let mut players = HashMap::with_capacity(lobby.len());
        for (seat, entry) in lobby.into_iter().enumerate() {
            if !matches!(
                entry.status,
                PlayerStatus::Joined | PlayerStatus::Ready | PlayerStatus::Spectating
            ) {
                return Err(GameError::InvalidSettings(format!(
                    "player {} cannot join with status {:?}",
                    entry.id, entry.status
                )));
            }
            let player = Player {
                id: entry.id.clone(),
                display_name: entry.display_name,
                status: entry.status,
                is_host: entry.id == host_id,
                seat: seat as u32,
                score: 0,
                hand: Vec::new(),
            };
            if players.insert(entry.id.clone(), player).is_some() {
                return Err(GameError::InvalidSettings(format!(
                    "duplicate player {}",
                    entry.id
                )));
            }
        }
        if !players.contains_key(host_id) {
            return Err(GameError::InvalidSettings(
                "host must be one of the players".to_string(),
            ));
        }

        Ok(Game {
            id,
            version: 1,
            status: GameStatus::Lobby,
            settings,
            players,
            host_id: host_id.to_string(),
            current_round_number: 0,
            current_judge_id: None,
            total_rounds: 0,
            deck_state: DeckState::default(),
            rounds: Vec::new(),
            audit_log: Vec::new(),
            created_at: now,
            started_at: None,
            ended_at: None,
        })
    }

    fn require_status(&self, status: GameStatus) -> GameResult<()> {
        if self.status != status {
            return Err(GameError::InvalidState(self.status));
        }
        Ok(())
    }

    fn require_host(&self, requester: &str) -> GameResult<()> {
        if requester != self.host_id {
            return Err(GameError::NotHost);
        }
        Ok(())
    }

    /// Non-judge players still expected to submit: connected, in rotation,
    /// and without a submission yet.
    pub fn outstanding_submitters(&self) -> Vec<PlayerId> {
        let Some(round) = self.current_round() else {
            return Vec::new();
        };
        if round.phase != RoundPhase::Submitting {
            return Vec::new();
        }
        turn_order(&self.players)
            .into_iter()
            .filter(|id| *id != round.judge_id && !round.has_submitted(id))
            .filter(|id| {
                self.players
                    .get(id)
                    .is_some_and(|p| p.status != PlayerStatus::Disconnected)
            })
            .collect()
    }

    /// Final or running standings, best first, ties in seat order.
    pub fn standings(&self) -> Vec<&Player> {
        let mut players: Vec<&Player> = self.players.values().filter(|p| p.in_rotation()).collect();
        players.sort_by(|a, b| b.score.cmp(&a.score).then(a.seat.cmp(&b.seat)));
        players
    }

    /// Host starts the game: shuffle, deal every hand, open round 1.
    pub fn start(&mut self, requester: &str, dealer: &mut Dealer<'_>) -> GameResult<Vec<GameEvent>> {
        self.require_host(requester)?;
        self.require_status(GameStatus::Lobby)?;

        let order = turn_order(&self.players);
        if order.len() < MIN_PLAYERS {
            return Err(GameError::InsufficientPlayers {
                required: MIN_PLAYERS,
                actual: order.len(),
            });
        }

        let not_ready: Vec<PlayerId> = order
            .iter()
            .filter(|id| **id != self.host_id)
            .filter(|id| self.players.get(*id).map(|p| p.status) != Some(PlayerStatus::Ready))
            .cloned()
            .collect();
        if !not_ready.is_empty() {
            return Err(GameError::PlayersNotReady(not_ready));
        }

        if dealer.deck.id != self.settings.deck_id {
            return Err(GameError::DeckNotFound(self.settings.deck_id.clone()));
        }

        let rounds = total_rounds(self.settings.rounds_per_player, order.len());
        let mut deck_state =
            pool::initialize(dealer.deck, self.settings.family_filter, &mut *dealer.rng);

        // Check both pools before dealing anything so a short deck fails whole
        let prompts_left = deck_state.remaining_prompt_card_ids.len();
        if prompts_left < rounds as usize {
            return Err(GameError::DeckExhausted {
                pool: PoolKind::Prompt,
                requested: rounds as usize,
                remaining: prompts_left,
            });
        }
        let hand_size = self.settings.hand_size as usize;
        let widest_pick = deck_state
            .remaining_prompt_card_ids
            .iter()
            .filter_map(|id| dealer.deck.prompt(id))
            .map(|card| card.pick as usize)
            .max()
            .unwrap_or(1);
        if widest_pick > hand_size {
            return Err(GameError::InvalidSettings(format!(
                "hand size {} is smaller than a prompt needing {} cards",
                hand_size, widest_pick
            )));
        }
        let answers_needed = hand_size * order.len();
        let answers_left = deck_state.remaining_answer_card_ids.len();
        if answers_needed > answers_left {
            return Err(GameError::DeckExhausted {
                pool: PoolKind::Answer,
                requested: answers_needed,
                remaining: answers_left,
            });
        }

        let mut hands = Vec::with_capacity(order.len());
        for id in &order {
            hands.push((id.clone(), deck_state.draw_answers(hand_size)?));
        }

        for (id, hand) in hands {
            if let Some(player) = self.players.get_mut(&id) {
                player.hand = hand;
                player.status = PlayerStatus::Playing;
            }
        }
        self.deck_state = deck_state;
        self.total_rounds = rounds;
        self.status = GameStatus::Playing;
        self.started_at = Some(dealer.now);

        let judge = order[0].clone();
        let mut events = vec![GameEvent::GameStarted {
            judge_id: judge.clone(),
            total_rounds: rounds,
        }];
        events.push(self.begin_round(judge, dealer)?);

        tracing::info!(
            game_id = %self.id,
            players = order.len(),
            total_rounds = rounds,
            "Game started"
        );
        Ok(events)
    }

    /// Open the next round with `judge_id` judging.
    fn begin_round(&mut self, judge_id: PlayerId, dealer: &mut Dealer<'_>) -> GameResult<GameEvent> {
        let number = self.current_round_number + 1;
        let card_id = self.deck_state.draw_prompt()?;
        let pick = dealer
            .deck
            .prompt(&card_id)
            .map(|p| p.pick)
            .ok_or_else(|| GameError::CardNotFound(card_id.clone()))?;

        let mut round = Round::new(number, judge_id.clone(), dealer.now);
        round.deal(
            PromptRef {
                card_id: card_id.clone(),
                pick,
            },
            deadline_after(dealer.now, self.settings.submission_seconds),
        )?;

        self.rounds.push(round);
        self.current_round_number = number;
        self.current_judge_id = Some(judge_id.clone());

        Ok(GameEvent::RoundStarted {
            round: number,
            judge_id,
            prompt_card_id: card_id,
        })
    }

    /// Player plays cards from their hand for the current round.
    pub fn submit_cards(
        &mut self,
        player_id: &str,
        card_ids: &[CardId],
        dealer: &mut Dealer<'_>,
    ) -> GameResult<Vec<GameEvent>> {
        self.require_status(GameStatus::Playing)?;
        let player = self
            .players
            .get_mut(player_id)
            .filter(|p| p.in_rotation())
            .ok_or_else(|| GameError::NotInGame(player_id.to_string()))?;
        let round = self
            .rounds
            .last_mut()
            .ok_or(GameError::InvalidState(GameStatus::Playing))?;

        round.submit(player, card_ids, dealer.now)?;

        let mut events = vec![GameEvent::SubmissionAccepted {
            round: round.number,
            player_id: player_id.to_string(),
        }];
        self.close_if_all_submitted(dealer, &mut events)?;
        Ok(events)
    }

    /// The last outstanding submission closes the round for judging.
    fn close_if_all_submitted(
        &mut self,
        dealer: &mut Dealer<'_>,
        events: &mut Vec<GameEvent>,
    ) -> GameResult<()> {
        let submitting = self
            .current_round()
            .is_some_and(|r| r.phase == RoundPhase::Submitting);
        if submitting && self.outstanding_submitters().is_empty() {
            self.close_submissions(false, dealer, events)?;
        }
        Ok(())
    }

    fn close_submissions(
        &mut self,
        by_deadline: bool,
        dealer: &mut Dealer<'_>,
        events: &mut Vec<GameEvent>,
    ) -> GameResult<()> {
        let judging_deadline = deadline_after(dealer.now, self.settings.judging_seconds);
        let round = self
            .rounds
            .last_mut()
            .ok_or(GameError::InvalidState(self.status))?;
        round.close_submissions(judging_deadline, &mut *dealer.rng)?;

        let (number, count) = (round.number, round.submissions.len());
        events.push(GameEvent::SubmissionsClosed {
            round: number,
            submissions: count,
            by_deadline,
        });

        if count == 0 {
            // Nothing to judge: no winner, rotation still moves on
            tracing::info!(game_id = %self.id, round = number, "Round closed without submissions");
            self.finish_without_winner(dealer, events)?;
        }
        Ok(())
    }

    /// Judge picks the winning submission; scores it and moves the game on.
    pub fn select_winner(
        &mut self,
        caller: &str,
        winner_id: &str,
        dealer: &mut Dealer<'_>,
    ) -> GameResult<Vec<GameEvent>> {
        self.require_status(GameStatus::Playing)?;
        let round = self
            .rounds
            .last_mut()
            .ok_or(GameError::InvalidState(GameStatus::Playing))?;
        round.select_winner(caller, winner_id, dealer.now)?;
        let number = round.number;

        if let Some(winner) = self.players.get_mut(winner_id) {
            winner.score += 1;
        }

        let mut events = vec![GameEvent::WinnerSelected {
            round: number,
            winner_id: winner_id.to_string(),
        }];
        self.after_round(dealer, &mut events)?;
        Ok(events)
    }

    fn finish_without_winner(
        &mut self,
        dealer: &mut Dealer<'_>,
        events: &mut Vec<GameEvent>,
    ) -> GameResult<()> {
        let round = self
            .rounds
            .last_mut()
            .ok_or(GameError::InvalidState(self.status))?;
        round.complete_without_winner(dealer.now)?;
        self.after_round(dealer, events)
    }

    /// Runs once the current round is Complete: either end the game or
    /// refill hands, rotate the judge and open the next round.
    fn after_round(&mut self, dealer: &mut Dealer<'_>, events: &mut Vec<GameEvent>) -> GameResult<()> {
        let (number, winner_id, judge_id, submitters) = match self.current_round() {
            Some(round) if round.is_complete() => (
                round.number,
                round.winner_id.clone(),
                round.judge_id.clone(),
                round.submissions.keys().cloned().collect::<Vec<_>>(),
            ),
            Some(round) => return Err(GameError::InvalidPhase(round.phase)),
            None => return Err(GameError::InvalidState(self.status)),
        };
        events.push(GameEvent::RoundCompleted {
            round: number,
            winner_id,
        });

        if number >= self.total_rounds {
            self.end(dealer.now, events);
            return Ok(());
        }

        self.replenish(&submitters)?;

        let order = turn_order(&self.players);
        let next = next_judge(&order, &judge_id)
            .ok_or(GameError::InsufficientPlayers {
                required: MIN_PLAYERS,
                actual: 0,
            })?;
        events.push(self.begin_round(next, dealer)?);
        Ok(())
    }

    /// Refill each submitter's hand back to the configured size, in seat order.
    fn replenish(&mut self, submitters: &[PlayerId]) -> GameResult<()> {
        let hand_size = self.settings.hand_size as usize;
        for id in turn_order(&self.players) {
            if !submitters.contains(&id) {
                continue;
            }
            let Some(player) = self.players.get_mut(&id) else {
                continue;
            };
            let missing = hand_size.saturating_sub(player.hand.len());
            if missing > 0 {
                let drawn = self.deck_state.draw_answers(missing)?;
                player.hand.extend(drawn);
            }
        }
        Ok(())
    }

    fn end(&mut self, now: DateTime<Utc>, events: &mut Vec<GameEvent>) {
        self.status = GameStatus::Ended;
        self.current_judge_id = None;
        self.ended_at = Some(now);
        events.push(GameEvent::GameEnded {
            rounds_played: self.current_round_number,
        });
        tracing::info!(game_id = %self.id, rounds = self.current_round_number, "Game ended");
    }

    /// Advance any phase whose deadline has passed. Safe to call before
    /// every action; does nothing unless the game is running.
    pub fn apply_elapsed_deadlines(&mut self, dealer: &mut Dealer<'_>) -> GameResult<Vec<GameEvent>> {
        let mut events = Vec::new();
        while self.status == GameStatus::Playing {
            let Some(round) = self.current_round() else {
                break;
            };
            if round.submission_deadline_passed(dealer.now) {
                tracing::info!(game_id = %self.id, round = round.number, "Submission deadline passed");
                self.close_submissions(true, dealer, &mut events)?;
            } else if round.judging_deadline_passed(dealer.now) {
                tracing::info!(game_id = %self.id, round = round.number, "Judging deadline passed");
                self.finish_without_winner(dealer, &mut events)?;
            } else {
                break;
            }
        }
        Ok(events)
    }

    /// Earliest pending deadline of the running round, if any.
    pub fn next_deadline(&self) -> Option<DateTime<Utc>> {
        if self.status != GameStatus::Playing {
            return None;
        }
        let round = self.current_round()?;
        match round.phase {
            RoundPhase::Submitting => round.submission_deadline,
            RoundPhase::Judging => round.judging_deadline,
            _ => None,
        }
    }

    /// A player walks away. Lobby: non-hosts are removed and a departing
    /// host cancels the game. Playing: the player is kept but marked
    /// Disconnected so hands, scores and round counts stay intact.
    pub fn leave(&mut self, player_id: &str, dealer: &mut Dealer<'_>) -> GameResult<Vec<GameEvent>> {
        if !self.players.contains_key(player_id) {
            return Err(GameError::NotInGame(player_id.to_string()));
        }
        match self.status {
            GameStatus::Lobby if player_id == self.host_id => {
                self.cancel(player_id, dealer.now)
            }
            GameStatus::Lobby => {
                self.players.remove(player_id);
                Ok(vec![GameEvent::PlayerLeft {
                    player_id: player_id.to_string(),
                }])
            }
            GameStatus::Playing => {
                let mut events = Vec::new();
                self.disconnect(player_id, dealer, &mut events)?;
                Ok(events)
            }
            status => Err(GameError::InvalidState(status)),
        }
    }

    fn disconnect(
        &mut self,
        player_id: &str,
        dealer: &mut Dealer<'_>,
        events: &mut Vec<GameEvent>,
    ) -> GameResult<()> {
        if let Some(player) = self.players.get_mut(player_id) {
            if player.status == PlayerStatus::Playing {
                player.status = PlayerStatus::Disconnected;
                events.push(GameEvent::PlayerDisconnected {
                    player_id: player_id.to_string(),
                });
            }
        }
        // The departing player may have been the last one we were waiting on
        self.close_if_all_submitted(dealer, events)
    }

    /// A disconnected player comes back with hand and score untouched.
    pub fn rejoin(&mut self, player_id: &str) -> GameResult<Vec<GameEvent>> {
        self.require_status(GameStatus::Playing)?;
        let player = self
            .players
            .get_mut(player_id)
            .ok_or_else(|| GameError::NotInGame(player_id.to_string()))?;
        if player.status != PlayerStatus::Disconnected {
            return Ok(Vec::new());
        }
        player.status = PlayerStatus::Playing;
        Ok(vec![GameEvent::PlayerReconnected {
            player_id: player_id.to_string(),
        }])
    }

    /// Host removes a player; mid-game this is a forced disconnect.
    pub fn kick(
        &mut self,
        requester: &str,
        target: &str,
        dealer: &mut Dealer<'_>,
    ) -> GameResult<Vec<GameEvent>> {
        self.require_host(requester)?;
        if target == self.host_id {
            return Err(GameError::InvalidState(self.status));
        }
        if !self.players.contains_key(target) {
            return Err(GameError::NotInGame(target.to_string()));
        }

        let mut events = vec![GameEvent::PlayerKicked {
            player_id: target.to_string(),
        }];
        match self.status {
            GameStatus::Lobby => {
                self.players.remove(target);
            }
            GameStatus::Playing => self.disconnect(target, dealer, &mut events)?,
            status => return Err(GameError::InvalidState(status)),
        }
        Ok(events)
    }

    /// Host aborts before the game starts.
    pub fn cancel(&mut self, requester: &str, now: DateTime<Utc>) -> GameResult<Vec<GameEvent>> {
        self.require_host(requester)?;
        self.require_status(GameStatus::Lobby)?;
        self.status = GameStatus::Cancelled;
        self.ended_at = Some(now);
        Ok(vec![GameEvent::GameCancelled])
    }

    /// Host override for stuck rounds. Each use is recorded in the audit log.
    pub fn force_transition(
        &mut self,
        requester: &str,
        target: ForceTarget,
        reason: &str,
        dealer: &mut Dealer<'_>,
    ) -> GameResult<Vec<GameEvent>> {
        self.require_host(requester)?;
        self.require_status(GameStatus::Playing)?;
        let phase = self
            .current_round()
            .map(|r| r.phase)
            .ok_or(GameError::InvalidState(self.status))?;
        let round_number = self.current_round_number;

        let mut events = Vec::new();
        match target {
            ForceTarget::CloseSubmissions if phase == RoundPhase::Submitting => {
                self.close_submissions(false, dealer, &mut events)?
            }
            ForceTarget::SkipJudging if phase == RoundPhase::Judging => {
                self.finish_without_winner(dealer, &mut events)?
            }
            ForceTarget::EndGame => self.end(dealer.now, &mut events),
            _ => return Err(GameError::InvalidPhase(phase)),
        }

        let reason = match reason.trim() {
            "" => "unspecified".to_string(),
            r => r.to_string(),
        };
        tracing::warn!(
            game_id = %self.id,
            actor = requester,
            ?target,
            reason = %reason,
            "Forced transition"
        );
        self.audit_log.push(AuditEntry {
            at: dealer.now,
            actor: requester.to_string(),
            target,
            reason,
            round_number,
        });
        events.insert(
            0,
            GameEvent::ForcedTransition {
                actor: requester.to_string(),
                target,
            },
        );
        Ok(events)
    }
}

mod game;
mod player;
mod round;

use crate::catalog::CardCatalog;
use crate::config::AppConfig;
use crate::engine::{Dealer, GameEvent};
use crate::error::GameResult;
use crate::store::{GameGateway, GameStore, MemoryStore};
use crate::telemetry::{self, Telemetry, TracingTelemetry};
use crate::types::*;
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::broadcast;

/// Shared application state
pub struct AppState {
    pub gateway: GameGateway,
    pub catalog: Arc<dyn CardCatalog>,
    pub telemetry: Arc<dyn Telemetry>,
    /// Every committed game change, for pushing fresh views to connected players
    pub snapshots: broadcast::Sender<Game>,
    pub config: AppConfig,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        store: Arc<dyn GameStore>,
        catalog: Arc<dyn CardCatalog>,
        telemetry: Arc<dyn Telemetry>,
    ) -> Self {
        let (tx, _rx) = broadcast::channel(100);
        Self {
            gateway: GameGateway::new(store, config.tx_attempts, config.tx_backoff),
            catalog,
            telemetry,
            snapshots: tx,
            config,
        }
    }

    /// Memory-backed state with default settings
    pub fn in_memory(catalog: Arc<dyn CardCatalog>) -> Self {
        Self::new(
            AppConfig::default(),
            Arc::new(MemoryStore::new()),
            catalog,
            Arc::new(TracingTelemetry),
        )
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Game> {
        self.snapshots.subscribe()
    }

    /// Run one player action as a transaction.
    ///
    /// Elapsed deadlines are applied first. The action then runs on a copy,
    /// so a rejected action still commits the deadline progress it found
    /// but none of its own partial changes.
    ///
    /// A deadline advance that cannot complete (the answer pool ran dry while
    /// refilling hands) is left unapplied and the action runs against the
    /// un-advanced game, so the host can still end it. When the action
    /// itself changes nothing, the stalled advance is returned as the error.
    pub(crate) async fn act<F>(&self, game_id: &GameId, op: F) -> GameResult<Game>
    where
        F: Fn(&mut Game, &mut Dealer<'_>) -> GameResult<Vec<GameEvent>> + Send + Sync,
    {
        let deck_id = self.gateway.load(game_id).await?.settings.deck_id;
        let deck = self.catalog.deck(&deck_id).await?;

        let committed = self
            .gateway
            .transact(game_id, |game| {
                let mut rng = rand::rng();
                let mut dealer = Dealer::new(&deck, &mut rng, Utc::now());

                let mut advanced = game.clone();
                let (mut events, stalled) = match advanced.apply_elapsed_deadlines(&mut dealer) {
                    Ok(events) => {
                        *game = advanced;
                        (events, None)
                    }
                    Err(e) => (Vec::new(), Some(e)),
                };

                let mut draft = game.clone();
                match op(&mut draft, &mut dealer) {
                    Ok(more) => {
                        *game = draft;
                        events.extend(more);
                        Ok((events, None, stalled))
                    }
                    Err(e) => Ok((events, Some(e), stalled)),
                }
            })
            .await?;

        let (events, rejected, stalled) = committed.value;
        if committed.changed {
            self.publish(&committed.game, &events).await;
        }
        if let Some(e) = &stalled {
            tracing::warn!(game_id = %game_id, "Deadline could not be applied: {}", e);
        }
        match (rejected, stalled) {
            (Some(e), _) => {
                tracing::warn!(game_id = %game_id, "Action rejected: {}", e);
                Err(e)
            }
            (None, Some(e)) if !committed.changed => Err(e),
            _ => Ok(committed.game),
        }
    }

    async fn publish(&self, game: &Game, events: &[GameEvent]) {
        telemetry::emit(self.telemetry.as_ref(), &game.id, events).await;
        // No subscribers is fine
        let _ = self.snapshots.send(game.clone());
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::catalog::tests::test_deck;
    use crate::catalog::InMemoryCatalog;
    use crate::error::GameError;
    use crate::telemetry::tests::RecordingTelemetry;

    pub(crate) fn lobby_players(ids: &[&str]) -> Vec<LobbyPlayer> {
        crate::engine::game::tests::lobby(ids)
    }

    pub(crate) fn test_settings() -> GameSettings {
        GameSettings {
            deck_id: "d".to_string(),
            submission_seconds: None,
            judging_seconds: None,
            hand_size: 5,
            rounds_per_player: 1,
            ..Default::default()
        }
    }

    pub(crate) fn test_state() -> AppState {
        AppState::in_memory(Arc::new(
            InMemoryCatalog::new().with_deck(test_deck("d", 20, 80)),
        ))
    }

    #[tokio::test]
    async fn test_failing_telemetry_does_not_block_commit() {
        let catalog = Arc::new(InMemoryCatalog::new().with_deck(test_deck("d", 20, 80)));
        let sink = Arc::new(RecordingTelemetry {
            fail: true,
            ..Default::default()
        });
        let state = AppState::new(
            AppConfig::default(),
            Arc::new(MemoryStore::new()),
            catalog,
            sink,
        );

        let game = state
            .create_game(test_settings(), lobby_players(&["p1", "p2", "p3"]), "p1")
            .await
            .unwrap();
        let started = state.start_game(&game.id, "p1").await.unwrap();
        assert_eq!(started.status, GameStatus::Playing);
    }

    #[tokio::test]
    async fn test_events_reported_in_order() {
        let catalog = Arc::new(InMemoryCatalog::new().with_deck(test_deck("d", 20, 80)));
        let sink = Arc::new(RecordingTelemetry::default());
        let state = AppState::new(
            AppConfig::default(),
            Arc::new(MemoryStore::new()),
            catalog,
            sink.clone(),
        );

        let game = state
            .create_game(test_settings(), lobby_players(&["p1", "p2", "p3"]), "p1")
            .await
            .unwrap();
        state.start_game(&game.id, "p1").await.unwrap();

        let events = sink.events.lock().unwrap().clone();
        assert!(matches!(events[0], GameEvent::GameStarted { .. }));
        assert!(matches!(events[1], GameEvent::RoundStarted { round: 1, .. }));
    }

    #[tokio::test]
    async fn test_rejected_action_still_commits_elapsed_deadline() {
        let state = test_state();
        let game = state
            .create_game(
                GameSettings {
                    submission_seconds: Some(30),
                    ..test_settings()
                },
                lobby_players(&["p1", "p2", "p3"]),
                "p1",
            )
            .await
            .unwrap();
        state.start_game(&game.id, "p1").await.unwrap();

        // Push the deadline into the past
        state
            .gateway
            .transact(&game.id, |g| {
                let round = g.current_round_mut().unwrap();
                round.submission_deadline = Some(Utc::now() - chrono::Duration::seconds(1));
                Ok(())
            })
            .await
            .unwrap();

        // Round 2 is already open when the action runs, with p2 judging
        let err = state.select_winner(&game.id, "p3", "p2").await.unwrap_err();
        assert_eq!(err, GameError::NotJudge);

        let stored = state.get_game(&game.id).await.unwrap();
        assert_eq!(stored.rounds[0].phase, RoundPhase::Complete);
        assert_eq!(stored.current_round_number, 2);
    }

    #[tokio::test]
    async fn test_host_can_end_game_when_deadline_cannot_refill_hands() {
        // 3 hands of 5 plus two submitted cards leave one answer for two refills
        let catalog = Arc::new(InMemoryCatalog::new().with_deck(test_deck("d", 20, 16)));
        let state = AppState::in_memory(catalog);
        let game = state
            .create_game(
                GameSettings {
                    judging_seconds: Some(30),
                    ..test_settings()
                },
                lobby_players(&["p1", "p2", "p3"]),
                "p1",
            )
            .await
            .unwrap();
        let mut game = state.start_game(&game.id, "p1").await.unwrap();
        for id in ["p2", "p3"] {
            let cards = vec![game.players[id].hand[0].clone()];
            game = state.submit_cards(&game.id, id, &cards).await.unwrap();
        }
        state
            .gateway
            .transact(&game.id, |g| {
                g.current_round_mut().unwrap().judging_deadline =
                    Some(Utc::now() - chrono::Duration::seconds(1));
                Ok(())
            })
            .await
            .unwrap();

        let exhausted = GameError::DeckExhausted {
            pool: crate::error::PoolKind::Answer,
            requested: 1,
            remaining: 0,
        };
        assert_eq!(state.sweep_deadlines(&game.id).await.unwrap_err(), exhausted);
        assert_eq!(
            state.select_winner(&game.id, "p1", "p2").await.unwrap_err(),
            exhausted
        );
        let stuck = state.get_game(&game.id).await.unwrap();
        assert_eq!(stuck.version, game.version + 1);
        assert_eq!(stuck.current_round().unwrap().phase, RoundPhase::Judging);

        let ended = state
            .force_transition(&game.id, "p1", ForceTarget::EndGame, "out of answers")
            .await
            .unwrap();
        assert_eq!(ended.status, GameStatus::Ended);
        assert_eq!(ended.audit_log[0].reason, "out of answers");
        assert_eq!(state.sweep_deadlines(&game.id).await.unwrap().status, GameStatus::Ended);
    }

    #[tokio::test]
    async fn test_snapshots_follow_commits() {
        let state = test_state();
        let mut rx = state.subscribe();
        let game = state
            .create_game(test_settings(), lobby_players(&["p1", "p2", "p3"]), "p1")
            .await
            .unwrap();
        state.start_game(&game.id, "p1").await.unwrap();

        let created = rx.recv().await.unwrap();
        assert_eq!(created.status, GameStatus::Lobby);
        let started = rx.recv().await.unwrap();
        assert_eq!(started.status, GameStatus::Playing);
        assert_eq!(started.version, created.version + 1);
    }
}

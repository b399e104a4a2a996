use super::AppState;
use crate::error::GameResult;
use crate::store::GameDocument;
use crate::types::*;
use chrono::Utc;

impl AppState {
    /// Create a game from a finished lobby
    pub async fn create_game(
        &self,
        settings: GameSettings,
        lobby: Vec<LobbyPlayer>,
        host_id: &str,
    ) -> GameResult<Game> {
        // Fail early on an unknown deck rather than at start
        self.catalog.deck(&settings.deck_id).await?;

        let game = Game::from_lobby(
            ulid::Ulid::new().to_string(),
            settings,
            lobby,
            host_id,
            Utc::now(),
        )?;
        self.gateway.create(&game).await?;

        tracing::info!(
            game_id = %game.id,
            players = game.players.len(),
            deck = %game.settings.deck_id,
            "Game created"
        );
        let _ = self.snapshots.send(game.clone());
        Ok(game)
    }

    pub async fn get_game(&self, game_id: &GameId) -> GameResult<Game> {
        self.gateway.load(game_id).await
    }

    /// The game wrapped the way it is persisted, for backup and debugging
    pub async fn game_document(&self, game_id: &GameId) -> GameResult<GameDocument> {
        Ok(GameDocument::new(self.get_game(game_id).await?))
    }

    pub async fn start_game(&self, game_id: &GameId, requester: &str) -> GameResult<Game> {
        self.act(game_id, |game, dealer| game.start(requester, dealer))
            .await
    }

    pub async fn cancel_game(&self, game_id: &GameId, requester: &str) -> GameResult<Game> {
        let game = self
            .act(game_id, |game, dealer| game.cancel(requester, dealer.now))
            .await?;
        tracing::info!(game_id = %game_id, "Game cancelled");
        Ok(game)
    }

    pub async fn list_active_games(&self) -> GameResult<Vec<GameId>> {
        self.gateway.list_active().await
    }
}

#[cfg(test)]
mod tests {
    use crate::error::GameError;
    use crate::state::tests::{lobby_players, test_settings, test_state};
    use crate::types::*;

    #[tokio::test]
    async fn test_create_and_start() {
        let state = test_state();
        let game = state
            .create_game(test_settings(), lobby_players(&["p1", "p2", "p3"]), "p1")
            .await
            .unwrap();
        assert_eq!(game.status, GameStatus::Lobby);
        assert_eq!(game.version, 1);
        assert_eq!(state.list_active_games().await.unwrap(), vec![game.id.clone()]);

        let started = state.start_game(&game.id, "p1").await.unwrap();
        assert_eq!(started.status, GameStatus::Playing);
        assert_eq!(started.version, 2);
        assert_eq!(started.current_judge_id.as_deref(), Some("p1"));
    }

    #[tokio::test]
    async fn test_create_with_unknown_deck() {
        let state = test_state();
        let err = state
            .create_game(
                GameSettings {
                    deck_id: "missing".to_string(),
                    ..test_settings()
                },
                lobby_players(&["p1", "p2", "p3"]),
                "p1",
            )
            .await
            .unwrap_err();
        assert_eq!(err, GameError::DeckNotFound("missing".to_string()));
    }

    #[tokio::test]
    async fn test_non_host_start_leaves_lobby_untouched() {
        let state = test_state();
        let game = state
            .create_game(test_settings(), lobby_players(&["p1", "p2", "p3"]), "p1")
            .await
            .unwrap();

        let err = state.start_game(&game.id, "p2").await.unwrap_err();
        assert_eq!(err, GameError::NotHost);
        assert_eq!(state.get_game(&game.id).await.unwrap(), game);
    }

    #[tokio::test]
    async fn test_cancel_removes_from_active() {
        let state = test_state();
        let game = state
            .create_game(test_settings(), lobby_players(&["p1", "p2", "p3"]), "p1")
            .await
            .unwrap();

        let cancelled = state.cancel_game(&game.id, "p1").await.unwrap();
        assert_eq!(cancelled.status, GameStatus::Cancelled);
        assert!(state.list_active_games().await.unwrap().is_empty());

        let document = state.game_document(&game.id).await.unwrap();
        assert_eq!(document.game.status, GameStatus::Cancelled);
    }

    #[tokio::test]
    async fn test_unknown_game() {
        let state = test_state();
        let err = state.start_game(&"nope".to_string(), "p1").await.unwrap_err();
        assert_eq!(err, GameError::GameNotFound("nope".to_string()));
    }
}

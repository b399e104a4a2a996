use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use super::{GameStore, StoreError};
use crate::types::{Game, GameId, GameStatus};

/// Process-local store. Lost on restart.
#[derive(Default)]
pub struct MemoryStore {
    games: RwLock<HashMap<GameId, Game>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl GameStore for MemoryStore {
    async fn load(&self, game_id: &GameId) -> Result<Option<Game>, StoreError> {
        Ok(self.games.read().await.get(game_id).cloned())
    }

    async fn insert(&self, game: &Game) -> Result<(), StoreError> {
        let mut games = self.games.write().await;
        if games.contains_key(&game.id) {
            return Err(StoreError::AlreadyExists);
        }
        games.insert(game.id.clone(), game.clone());
        Ok(())
    }

    async fn compare_and_swap(&self, expected_version: u64, game: &Game) -> Result<(), StoreError> {
        let mut games = self.games.write().await;
        let current = games.get_mut(&game.id).ok_or(StoreError::NotFound)?;
        if current.version != expected_version {
            return Err(StoreError::Conflict {
                expected: expected_version,
                actual: current.version,
            });
        }
        *current = game.clone();
        Ok(())
    }

    async fn list_active(&self) -> Result<Vec<GameId>, StoreError> {
        let games = self.games.read().await;
        let mut ids: Vec<GameId> = games
            .values()
            .filter(|g| matches!(g.status, GameStatus::Lobby | GameStatus::Playing))
            .map(|g| g.id.clone())
            .collect();
        ids.sort();
        Ok(ids)
    }
}

//! Optimistic-concurrency transactions over a `GameStore`.

use std::sync::Arc;
use std::time::Duration;

use super::{GameStore, StoreError};
use crate::error::{GameError, GameResult};
use crate::types::{Game, GameId};

/// Result of a committed transaction.
#[derive(Debug, Clone)]
pub struct Committed<T> {
    pub value: T,
    /// The game as it now stands in the store
    pub game: Game,
    /// False when the operation left the game untouched and nothing was written
    pub changed: bool,
}

#[derive(Clone)]
pub struct GameGateway {
    store: Arc<dyn GameStore>,
    max_attempts: u32,
    backoff: Duration,
}

impl GameGateway {
    pub fn new(store: Arc<dyn GameStore>, max_attempts: u32, backoff: Duration) -> Self {
        Self {
            store,
            max_attempts: max_attempts.max(1),
            backoff,
        }
    }

    pub async fn create(&self, game: &Game) -> GameResult<()> {
        self.store.insert(game).await.map_err(infrastructure)
    }

    pub async fn load(&self, game_id: &GameId) -> GameResult<Game> {
        self.store
            .load(game_id)
            .await
            .map_err(infrastructure)?
            .ok_or_else(|| GameError::GameNotFound(game_id.clone()))
    }

    pub async fn list_active(&self) -> GameResult<Vec<GameId>> {
        self.store.list_active().await.map_err(infrastructure)
    }

    /// Run `op` against the latest snapshot of the game and commit the
    /// result with a version check.
    ///
    /// On a version conflict the snapshot is reloaded and `op` runs again
    /// from scratch, so it must not have side effects outside the game.
    /// An `Err` from `op` aborts without writing.
    pub async fn transact<T, F>(&self, game_id: &GameId, mut op: F) -> GameResult<Committed<T>>
    where
        F: FnMut(&mut Game) -> GameResult<T> + Send,
        T: Send,
    {
        for attempt in 1..=self.max_attempts {
            let current = self.load(game_id).await?;
            let mut draft = current.clone();
            let value = op(&mut draft)?;

            if draft == current {
                return Ok(Committed {
                    value,
                    game: current,
                    changed: false,
                });
            }

            draft.version = current.version + 1;
            match self.store.compare_and_swap(current.version, &draft).await {
                Ok(()) => {
                    return Ok(Committed {
                        value,
                        game: draft,
                        changed: true,
                    })
                }
                Err(StoreError::Conflict { expected, actual }) => {
                    tracing::warn!(
                        game_id = %game_id,
                        attempt,
                        max_attempts = self.max_attempts,
                        expected,
                        actual,
                        "Version conflict, retrying"
                    );
                    if attempt < self.max_attempts {
                        tokio::time::sleep(self.backoff * attempt).await;
                    }
                }
                Err(e) => return Err(infrastructure(e)),
            }
        }

        tracing::error!(
            game_id = %game_id,
            attempts = self.max_attempts,
            "Giving up after repeated version conflicts"
        );
        Err(GameError::ConcurrentUpdateFailed {
            attempts: self.max_attempts,
        })
    }
}

fn infrastructure(e: StoreError) -> GameError {
    tracing::error!("Store failure: {}", e);
    GameError::Infrastructure(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::game::tests::{lobby, settings};
    use crate::store::MemoryStore;
    use async_trait::async_trait;
    use chrono::Utc;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Lands a competing write right before each of the first `races` swaps.
    struct RacingStore {
        inner: MemoryStore,
        races: AtomicU32,
        swaps: AtomicU32,
    }

    impl RacingStore {
        fn new(races: u32) -> Self {
            Self {
                inner: MemoryStore::new(),
                races: AtomicU32::new(races),
                swaps: AtomicU32::new(0),
            }
        }
    }

    #[async_trait]
    impl GameStore for RacingStore {
        async fn load(&self, game_id: &GameId) -> Result<Option<Game>, StoreError> {
            self.inner.load(game_id).await
        }

        async fn insert(&self, game: &Game) -> Result<(), StoreError> {
            self.inner.insert(game).await
        }

        async fn compare_and_swap(&self, expected: u64, game: &Game) -> Result<(), StoreError> {
            self.swaps.fetch_add(1, Ordering::SeqCst);
            let race = self
                .races
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok();
            if race {
                let mut rival = self.inner.load(&game.id).await?.ok_or(StoreError::NotFound)?;
                rival.players.get_mut("p2").ok_or(StoreError::NotFound)?.score += 1;
                let version = rival.version;
                rival.version += 1;
                self.inner.compare_and_swap(version, &rival).await?;
            }
            self.inner.compare_and_swap(expected, game).await
        }

        async fn list_active(&self) -> Result<Vec<GameId>, StoreError> {
            self.inner.list_active().await
        }
    }

    struct BrokenStore;

    #[async_trait]
    impl GameStore for BrokenStore {
        async fn load(&self, _: &GameId) -> Result<Option<Game>, StoreError> {
            Err(StoreError::Io(std::io::Error::other("disk on fire")))
        }

        async fn insert(&self, _: &Game) -> Result<(), StoreError> {
            Err(StoreError::Io(std::io::Error::other("disk on fire")))
        }

        async fn compare_and_swap(&self, _: u64, _: &Game) -> Result<(), StoreError> {
            Err(StoreError::Io(std::io::Error::other("disk on fire")))
        }

        async fn list_active(&self) -> Result<Vec<GameId>, StoreError> {
            Ok(vec![])
        }
    }

    fn game() -> Game {
        Game::from_lobby("g1".to_string(), settings(1, 5), lobby(&["p1", "p2", "p3"]), "p1", Utc::now())
            .unwrap()
    }

    async fn gateway(store: Arc<dyn GameStore>, attempts: u32) -> GameGateway {
        store.insert(&game()).await.unwrap();
        GameGateway::new(store, attempts, Duration::from_millis(1))
    }

    #[tokio::test]
    async fn test_commit_bumps_version() {
        let gw = gateway(Arc::new(MemoryStore::new()), 3).await;
        let id = "g1".to_string();

        let committed = gw
            .transact(&id, |g| {
                g.players.get_mut("p3").unwrap().score += 1;
                Ok(())
            })
            .await
            .unwrap();

        assert!(committed.changed);
        assert_eq!(committed.game.version, 2);
        assert_eq!(gw.load(&id).await.unwrap(), committed.game);
    }

    #[tokio::test]
    async fn test_conflict_reruns_on_fresh_state() {
        let store = Arc::new(RacingStore::new(2));
        let gw = gateway(store.clone(), 5).await;
        let id = "g1".to_string();

        let mut runs = 0;
        let committed = gw
            .transact(&id, |g| {
                runs += 1;
                g.players.get_mut("p3").unwrap().score += 1;
                Ok(g.players["p2"].score)
            })
            .await
            .unwrap();

        // Third run saw both rival writes and kept them
        assert_eq!(runs, 3);
        assert_eq!(committed.value, 2);
        assert_eq!(committed.game.players["p2"].score, 2);
        assert_eq!(committed.game.players["p3"].score, 1);
        assert_eq!(committed.game.version, 4);
        assert_eq!(store.swaps.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_attempts() {
        let store = Arc::new(RacingStore::new(100));
        let gw = gateway(store.clone(), 3).await;

        let err = gw
            .transact(&"g1".to_string(), |g| {
                g.players.get_mut("p3").unwrap().score += 1;
                Ok(())
            })
            .await
            .unwrap_err();

        assert_eq!(err, GameError::ConcurrentUpdateFailed { attempts: 3 });
        assert!(err.is_retryable());
        assert_eq!(store.swaps.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_rejected_op_writes_nothing() {
        let store = Arc::new(RacingStore::new(0));
        let gw = gateway(store.clone(), 3).await;

        let err = gw
            .transact(&"g1".to_string(), |g| -> GameResult<()> {
                g.players.get_mut("p3").unwrap().score += 1;
                Err(GameError::NotHost)
            })
            .await
            .unwrap_err();

        assert_eq!(err, GameError::NotHost);
        assert_eq!(store.swaps.load(Ordering::SeqCst), 0);
        assert_eq!(gw.load(&"g1".to_string()).await.unwrap().version, 1);
    }

    #[tokio::test]
    async fn test_unchanged_game_skips_write() {
        let store = Arc::new(RacingStore::new(0));
        let gw = gateway(store.clone(), 3).await;

        let committed = gw.transact(&"g1".to_string(), |_| Ok(())).await.unwrap();
        assert!(!committed.changed);
        assert_eq!(store.swaps.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_missing_game_and_store_failure() {
        let gw = gateway(Arc::new(MemoryStore::new()), 3).await;
        let err = gw.transact(&"nope".to_string(), |_| Ok(())).await.unwrap_err();
        assert_eq!(err, GameError::GameNotFound("nope".to_string()));

        let gw = GameGateway::new(Arc::new(BrokenStore), 3, Duration::ZERO);
        let err = gw.transact(&"g1".to_string(), |_| Ok(())).await.unwrap_err();
        assert!(matches!(err, GameError::Infrastructure(_)));
        assert!(!err.is_retryable());
    }
}

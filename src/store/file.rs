//! One JSON document per game on local disk.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

use super::{GameStore, StoreError};
use crate::types::{Game, GameId, GameStatus};

/// Schema version of the on-disk document; newer versions are refused on load
pub const DOCUMENT_SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameDocument {
    pub schema_version: u32,
    /// Save timestamp (ISO8601)
    pub saved_at: String,
    pub game: Game,
}

impl GameDocument {
    pub fn new(game: Game) -> Self {
        Self {
            schema_version: DOCUMENT_SCHEMA_VERSION,
            saved_at: chrono::Utc::now().to_rfc3339(),
            game,
        }
    }

    /// Sanity checks before a document is trusted
    pub fn validate(&self) -> Result<(), String> {
        if self.schema_version > DOCUMENT_SCHEMA_VERSION {
            return Err(format!(
                "Document schema version {} is newer than supported version {}. \
                 Please update the server.",
                self.schema_version, DOCUMENT_SCHEMA_VERSION
            ));
        }

        let game = &self.game;
        if game.current_round_number as usize != game.rounds.len() {
            return Err(format!(
                "Game '{}' is on round {} but has {} rounds recorded",
                game.id,
                game.current_round_number,
                game.rounds.len()
            ));
        }
        if !game.players.contains_key(&game.host_id) {
            return Err(format!(
                "Game '{}' references host '{}' who is not a player",
                game.id, game.host_id
            ));
        }
        for round in &game.rounds {
            if !game.players.contains_key(&round.judge_id) {
                return Err(format!(
                    "Round {} references judge '{}' who is not a player",
                    round.number, round.judge_id
                ));
            }
        }

        Ok(())
    }
}

pub struct JsonFileStore {
    dir: PathBuf,
    // Serializes read-check-write so compare_and_swap is atomic in-process
    write_lock: Mutex<()>,
}

impl JsonFileStore {
    pub async fn open(dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        let dir = dir.as_ref().to_path_buf();
        tokio::fs::create_dir_all(&dir).await?;
        tracing::info!("Storing games in {}", dir.display());
        Ok(Self {
            dir,
            write_lock: Mutex::new(()),
        })
    }

    fn path_for(&self, game_id: &str) -> Result<PathBuf, StoreError> {
        let safe = !game_id.is_empty()
            && game_id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !safe {
            return Err(StoreError::Schema(format!("invalid game id '{}'", game_id)));
        }
        Ok(self.dir.join(format!("{}.json", game_id)))
    }

    async fn read(&self, path: &Path) -> Result<Option<Game>, StoreError> {
        let raw = match tokio::fs::read_to_string(path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let document: GameDocument = serde_json::from_str(&raw)?;
        document.validate().map_err(StoreError::Schema)?;
        Ok(Some(document.game))
    }

    async fn write(&self, path: &Path, game: &Game) -> Result<(), StoreError> {
        let json = serde_json::to_vec_pretty(&GameDocument::new(game.clone()))?;
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, path).await?;
        Ok(())
    }
}

#[async_trait]
impl GameStore for JsonFileStore {
    async fn load(&self, game_id: &GameId) -> Result<Option<Game>, StoreError> {
        let path = self.path_for(game_id)?;
        self.read(&path).await
    }

    async fn insert(&self, game: &Game) -> Result<(), StoreError> {
        let path = self.path_for(&game.id)?;
        let _guard = self.write_lock.lock().await;
        if tokio::fs::try_exists(&path).await? {
            return Err(StoreError::AlreadyExists);
        }
        self.write(&path, game).await
    }

    async fn compare_and_swap(&self, expected_version: u64, game: &Game) -> Result<(), StoreError> {
        let path = self.path_for(&game.id)?;
        let _guard = self.write_lock.lock().await;
        let current = self.read(&path).await?.ok_or(StoreError::NotFound)?;
        if current.version != expected_version {
            return Err(StoreError::Conflict {
                expected: expected_version,
                actual: current.version,
            });
        }
        self.write(&path, game).await
    }

    async fn list_active(&self) -> Result<Vec<GameId>, StoreError> {
        let mut ids = Vec::new();
        let mut entries = tokio::fs::read_dir(&self.dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().is_none_or(|ext| ext != "json") {
                continue;
            }
            match self.read(&path).await {
                Ok(Some(game)) if matches!(game.status, GameStatus::Lobby | GameStatus::Playing) => {
                    ids.push(game.id)
                }
                Ok(_) => {}
                Err(e) => tracing::warn!("Skipping unreadable game file {}: {}", path.display(), e),
            }
        }
        ids.sort();
        Ok(ids)
    }
}

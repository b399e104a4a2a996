//! Game persistence behind a versioned compare-and-swap interface.

mod file;
mod gateway;
mod memory;

pub use file::{GameDocument, JsonFileStore, DOCUMENT_SCHEMA_VERSION};
pub use gateway::{Committed, GameGateway};
pub use memory::MemoryStore;

use async_trait::async_trait;

use crate::types::{Game, GameId};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("version conflict: expected {expected}, found {actual}")]
    Conflict { expected: u64, actual: u64 },

    #[error("game not found")]
    NotFound,

    #[error("game already exists")]
    AlreadyExists,

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("unsupported document: {0}")]
    Schema(String),
}

/// Durable home of game documents.
///
/// Writers go through `compare_and_swap`: the write only lands when the
/// stored version still equals `expected_version`, and the new document
/// must carry a higher version.
#[async_trait]
pub trait GameStore: Send + Sync {
    async fn load(&self, game_id: &GameId) -> Result<Option<Game>, StoreError>;

    async fn insert(&self, game: &Game) -> Result<(), StoreError>;

    async fn compare_and_swap(&self, expected_version: u64, game: &Game) -> Result<(), StoreError>;

    /// Ids of games still in the lobby or being played.
    async fn list_active(&self) -> Result<Vec<GameId>, StoreError>;
}

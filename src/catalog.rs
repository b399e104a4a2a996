//! Read-only card catalog.
//!
//! Decks are loaded once from JSON and never mutated afterwards, so lookups
//! hand out shared `Arc<Deck>` handles instead of copying card data.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::{GameError, GameResult};
use crate::types::{CardId, DeckId};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PromptCard {
    pub id: CardId,
    pub text: String,
    /// Number of answer cards each submission must contain
    #[serde(default = "default_pick")]
    pub pick: u8,
    #[serde(default)]
    pub content_warning: bool,
}

fn default_pick() -> u8 {
    1
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AnswerCard {
    pub id: CardId,
    pub text: String,
    #[serde(default)]
    pub content_warning: bool,
}

/// On-disk deck format
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeckFile {
    pub id: DeckId,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub prompts: Vec<PromptCard>,
    pub answers: Vec<AnswerCard>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeckSummary {
    pub id: DeckId,
    pub name: String,
    pub description: Option<String>,
    pub prompt_count: usize,
    pub answer_count: usize,
}

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("invalid deck {deck}: {reason}")]
    Invalid { deck: DeckId, reason: String },
}

/// A published deck with id indexes for both card types.
#[derive(Debug, Clone)]
pub struct Deck {
    pub id: DeckId,
    pub name: String,
    pub description: Option<String>,
    prompts: Vec<PromptCard>,
    answers: Vec<AnswerCard>,
    prompt_index: HashMap<CardId, usize>,
    answer_index: HashMap<CardId, usize>,
}

impl Deck {
    pub fn from_file(file: DeckFile) -> Result<Self, CatalogError> {
        let invalid = |reason: String| CatalogError::Invalid {
            deck: file.id.clone(),
            reason,
        };

        let mut prompt_index = HashMap::with_capacity(file.prompts.len());
        for (idx, card) in file.prompts.iter().enumerate() {
            if card.pick == 0 {
                return Err(invalid(format!("prompt {} has pick 0", card.id)));
            }
            if prompt_index.insert(card.id.clone(), idx).is_some() {
                return Err(invalid(format!("duplicate prompt id {}", card.id)));
            }
        }

        let mut answer_index = HashMap::with_capacity(file.answers.len());
        for (idx, card) in file.answers.iter().enumerate() {
            if answer_index.insert(card.id.clone(), idx).is_some() {
                return Err(invalid(format!("duplicate answer id {}", card.id)));
            }
        }

        Ok(Self {
            id: file.id,
            name: file.name,
            description: file.description,
            prompts: file.prompts,
            answers: file.answers,
            prompt_index,
            answer_index,
        })
    }

    pub fn prompt(&self, card_id: &str) -> Option<&PromptCard> {
        self.prompt_index.get(card_id).map(|&i| &self.prompts[i])
    }

    pub fn answer(&self, card_id: &str) -> Option<&AnswerCard> {
        self.answer_index.get(card_id).map(|&i| &self.answers[i])
    }

    /// Prompt ids in catalog order, optionally without flagged cards.
    pub fn prompt_ids(&self, family_filter: bool) -> Vec<CardId> {
        self.prompts
            .iter()
            .filter(|c| !(family_filter && c.content_warning))
            .map(|c| c.id.clone())
            .collect()
    }

    /// Answer ids in catalog order, optionally without flagged cards.
    pub fn answer_ids(&self, family_filter: bool) -> Vec<CardId> {
        self.answers
            .iter()
            .filter(|c| !(family_filter && c.content_warning))
            .map(|c| c.id.clone())
            .collect()
    }

    pub fn summary(&self) -> DeckSummary {
        DeckSummary {
            id: self.id.clone(),
            name: self.name.clone(),
            description: self.description.clone(),
            prompt_count: self.prompts.len(),
            answer_count: self.answers.len(),
        }
    }
}

#[async_trait]
pub trait CardCatalog: Send + Sync {
    async fn deck(&self, deck_id: &str) -> GameResult<Arc<Deck>>;

    async fn list_decks(&self) -> Vec<DeckSummary>;

    /// Resolve prompt cards, output in the same order as `ids`.
    async fn prompt_cards(&self, deck_id: &str, ids: &[CardId]) -> GameResult<Vec<PromptCard>> {
        let deck = self.deck(deck_id).await?;
        ids.iter()
            .map(|id| {
                deck.prompt(id)
                    .cloned()
                    .ok_or_else(|| GameError::CardNotFound(id.clone()))
            })
            .collect()
    }

    /// Resolve answer cards, output in the same order as `ids`.
    async fn answer_cards(&self, deck_id: &str, ids: &[CardId]) -> GameResult<Vec<AnswerCard>> {
        let deck = self.deck(deck_id).await?;
        ids.iter()
            .map(|id| {
                deck.answer(id)
                    .cloned()
                    .ok_or_else(|| GameError::CardNotFound(id.clone()))
            })
            .collect()
    }
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryCatalog {
    decks: HashMap<DeckId, Arc<Deck>>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_deck(mut self, deck: Deck) -> Self {
        self.decks.insert(deck.id.clone(), Arc::new(deck));
        self
    }

    /// Load a single deck file, or every `*.json` file in a directory.
    pub fn load_path(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let path = path.as_ref();
        let io_err = |source| CatalogError::Io {
            path: path.to_path_buf(),
            source,
        };

        let mut files = Vec::new();
        if path.is_dir() {
            for entry in std::fs::read_dir(path).map_err(io_err)? {
                let entry_path = entry.map_err(io_err)?.path();
                if entry_path.extension().is_some_and(|ext| ext == "json") {
                    files.push(entry_path);
                }
            }
            files.sort();
        } else {
            files.push(path.to_path_buf());
        }

        let mut catalog = Self::new();
        for file in files {
            let raw = std::fs::read_to_string(&file).map_err(|source| CatalogError::Io {
                path: file.clone(),
                source,
            })?;
            let deck_file: DeckFile =
                serde_json::from_str(&raw).map_err(|source| CatalogError::Parse {
                    path: file.clone(),
                    source,
                })?;
            let deck = Deck::from_file(deck_file)?;
            tracing::info!(
                deck = %deck.id,
                prompts = deck.prompts.len(),
                answers = deck.answers.len(),
                "Loaded deck from {}",
                file.display()
            );
            catalog = catalog.with_deck(deck);
        }

        Ok(catalog)
    }
}

#[async_trait]
impl CardCatalog for InMemoryCatalog {
    async fn deck(&self, deck_id: &str) -> GameResult<Arc<Deck>> {
        self.decks
            .get(deck_id)
            .cloned()
            .ok_or_else(|| GameError::DeckNotFound(deck_id.to_string()))
    }

    async fn list_decks(&self) -> Vec<DeckSummary> {
        let mut summaries: Vec<_> = self.decks.values().map(|d| d.summary()).collect();
        summaries.sort_by(|a, b| a.id.cmp(&b.id));
        summaries
    }
}

use super::AppState;
use crate::error::GameResult;
use crate::types::*;
use chrono::Utc;

impl AppState {
    pub async fn submit_cards(
        &self,
        game_id: &GameId,
        player_id: &str,
        card_ids: &[CardId],
    ) -> GameResult<Game> {
        self.act(game_id, |game, dealer| {
            game.submit_cards(player_id, card_ids, dealer)
        })
        .await
    }

    pub async fn select_winner(
        &self,
        game_id: &GameId,
        caller: &str,
        winner_id: &str,
    ) -> GameResult<Game> {
        self.act(game_id, |game, dealer| {
            game.select_winner(caller, winner_id, dealer)
        })
        .await
    }

    pub async fn force_transition(
        &self,
        game_id: &GameId,
        requester: &str,
        target: ForceTarget,
        reason: &str,
    ) -> GameResult<Game> {
        self.act(game_id, |game, dealer| {
            game.force_transition(requester, target, reason, dealer)
        })
        .await
    }

    /// Apply any elapsed deadlines without another action
    pub async fn sweep_deadlines(&self, game_id: &GameId) -> GameResult<Game> {
        self.act(game_id, |_, _| Ok(Vec::new())).await
    }

    /// Sweep every running game whose deadline has passed. Returns how many
    /// games were advanced.
    pub async fn sweep_all_deadlines(&self) -> GameResult<usize> {
        let now = Utc::now();
        let mut advanced = 0;
        for game_id in self.gateway.list_active().await? {
            let due = match self.gateway.load(&game_id).await {
                Ok(game) => game.next_deadline().is_some_and(|d| d <= now),
                Err(e) => {
                    tracing::warn!(game_id = %game_id, "Skipping deadline check: {}", e);
                    continue;
                }
            };
            if !due {
                continue;
            }
            match self.sweep_deadlines(&game_id).await {
                Ok(_) => advanced += 1,
                Err(e) => tracing::warn!(game_id = %game_id, "Deadline sweep failed: {}", e),
            }
        }
        Ok(advanced)
    }
}

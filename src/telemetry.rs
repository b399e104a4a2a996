//! Best-effort reporting of game events. A failing sink never affects game
//! state; failures are logged and dropped.

use async_trait::async_trait;

use crate::engine::GameEvent;
use crate::types::GameId;

#[async_trait]
pub trait Telemetry: Send + Sync {
    async fn record(&self, game_id: &GameId, event: &GameEvent) -> Result<(), String>;
}

/// Writes every event to the tracing log.
pub struct TracingTelemetry;

#[async_trait]
impl Telemetry for TracingTelemetry {
    async fn record(&self, game_id: &GameId, event: &GameEvent) -> Result<(), String> {
        let payload = serde_json::to_string(event).map_err(|e| e.to_string())?;
        tracing::info!(game_id = %game_id, event = %payload, "Game event");
        Ok(())
    }
}

/// Report events in order, ignoring sink failures.
pub async fn emit(sink: &dyn Telemetry, game_id: &GameId, events: &[GameEvent]) {
    for event in events {
        if let Err(e) = sink.record(game_id, event).await {
            tracing::warn!(game_id = %game_id, "Dropping telemetry event: {}", e);
        }
    }
}

use crate::state::AppState;
use std::sync::Arc;
use std::time::Duration;

/// Spawn a background task that advances games whose submission or judging
/// deadline has passed, so rounds move on even when nobody is acting.
///
/// Each advance is an ordinary gateway transaction; lazy enforcement inside
/// player actions keeps working with or without this task.
pub fn spawn_deadline_sweeper(state: Arc<AppState>, interval: Duration) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(interval).await;

            match state.sweep_all_deadlines().await {
                Ok(0) => {}
                Ok(advanced) => tracing::debug!("Deadline sweep advanced {} game(s)", advanced),
                Err(e) => tracing::warn!("Deadline sweep failed: {}", e),
            }
        }
    })
}

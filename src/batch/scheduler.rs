// src/batch/scheduler.rs
use std::time::Duration;
use tokio::task::JoinHandle;

use crate::api::AppState;

/// Spawn the periodic cron-context batch. The first tick fires immediately.
///
/// The interval is read once at spawn time; the rest of the config is
/// re-read on every tick so `/admin/reload-config` takes effect.
pub fn spawn_batch_scheduler(state: AppState) -> JoinHandle<()> {
    let interval_secs = state.config().batch_interval_secs.max(1);
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(interval_secs));
        loop {
            ticker.tick().await;
            let cfg = state.config();
            match crate::batch::run_batch(
                state.store.as_ref(),
                &cfg,
                state.diagnostics.as_ref(),
                &state.hook,
                &state.batch_cursor,
                false,
            )
            .await
            {
                Ok(report) => tracing::debug!(
                    target: "batch",
                    processed = report.processed,
                    "scheduled seo batch tick"
                ),
                Err(e) => tracing::warn!(target: "batch", "seo batch tick failed: {e:#}"),
            }
        }
    })
}

use std::sync::Arc;
use std::time::{Duration, SystemTime};

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use super::BlocklistEngine;

/// Run `refresh_if_stale` every `period` on the blocking pool.
///
/// The first tick fires immediately, so this also covers the startup
/// refresh. Failures are logged and the loop keeps going; abort the returned
/// handle to stop it. Must be called from within a tokio runtime.
pub fn spawn_periodic_refresh(engine: Arc<BlocklistEngine>, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;

            let engine = Arc::clone(&engine);
            let result =
                tokio::task::spawn_blocking(move || engine.refresh_if_stale(SystemTime::now()))
                    .await;

            match result {
                Ok(Ok(Some(outcome))) => tracing::info!(?outcome, "Scheduled refresh finished"),
                Ok(Ok(None)) => tracing::debug!("Blocklist still fresh"),
                Ok(Err(e)) => tracing::warn!("Scheduled refresh failed: {}", e),
                Err(e) => tracing::error!("Scheduled refresh task failed: {}", e),
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::EngineOptions;
    use crate::fetch::StaticFeedFetcher;

    #[tokio::test]
    async fn test_periodic_refresh_runs_on_start() {
        let engine = Arc::new(
            BlocklistEngine::new(EngineOptions::default()).with_fetcher(Arc::new(
                StaticFeedFetcher::new("<link>https://a.example/x</link>"),
            )),
        );

        let handle = spawn_periodic_refresh(Arc::clone(&engine), Duration::from_millis(20));

        let mut waited = Duration::ZERO;
        while engine.get_active_rules().is_empty() && waited < Duration::from_secs(5) {
            tokio::time::sleep(Duration::from_millis(10)).await;
            waited += Duration::from_millis(10);
        }
        handle.abort();

        assert_eq!(engine.get_active_rules(), vec!["||a.example/x"]);
    }
}

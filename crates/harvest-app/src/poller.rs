//! Periodic driver for the fetch engine.
//!
//! A pass that is still running when shutdown is signalled runs to completion; no new
//! pass starts afterwards. Ticks missed during a slow pass are delayed, never bunched.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::engine::FetchEngine;

/// Sender half used to stop a running [`PollLoop`].
pub type ShutdownSender = watch::Sender<bool>;

/// Calls [`FetchEngine::drive_all`] on a fixed interval.
pub struct PollLoop {
    engine: Arc<FetchEngine>,
    interval: Duration,
}

impl PollLoop {
    /// Create a loop over `engine` ticking every `interval`.
    #[must_use]
    pub const fn new(engine: Arc<FetchEngine>, interval: Duration) -> Self {
        Self { engine, interval }
    }

    /// Start the loop on the runtime; it stops once `true` is sent or the sender drops.
    #[must_use]
    pub fn spawn(self) -> (ShutdownSender, JoinHandle<()>) {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(self.run(shutdown_rx));
        (shutdown_tx, handle)
    }

    async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(interval = ?self.interval, "poll loop started");
        loop {
            tokio::select! {
                biased;
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
                _ = ticker.tick() => {
                    match self.engine.drive_all().await {
                        Ok(summary) if summary.failed > 0 => {
                            warn!(?summary, "poll pass finished with failures");
                        }
                        Ok(summary) => debug!(?summary, "poll pass finished"),
                        Err(err) => warn!(error = ?err, "listing in-progress requests failed"),
                    }
                }
            }
        }
        info!("poll loop stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use harvest_fetch_core::RequestStore;
    use harvest_telemetry::Metrics;
    use harvest_test_support::fixtures::{daemon_torrent, downloading_request};
    use harvest_test_support::mocks::{InMemoryRequestStore, RecordingSink, ScriptedDaemon};

    #[tokio::test]
    async fn loop_drives_until_shutdown() -> anyhow::Result<()> {
        let store = Arc::new(InMemoryRequestStore::new());
        let daemon = Arc::new(ScriptedDaemon::new());
        let sink = Arc::new(RecordingSink::new());
        let request = downloading_request(7);
        store.seed(request.clone());
        daemon.set_status(daemon_torrent(7, 4));

        let engine = Arc::new(FetchEngine::new(
            store.clone(),
            daemon.clone(),
            sink.clone(),
            Metrics::new()?,
        ));
        let (shutdown, handle) = PollLoop::new(engine, Duration::from_millis(10)).spawn();
        tokio::time::sleep(Duration::from_millis(60)).await;
        shutdown.send(true)?;
        handle.await?;

        let calls_at_stop = daemon.status_calls();
        assert!(calls_at_stop >= 2, "expected repeated passes, saw {calls_at_stop}");
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(daemon.status_calls(), calls_at_stop);
        assert!(store.find_by_id(request.id).await?.is_some());
        assert!(!sink.edits().is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn dropping_the_sender_stops_the_loop() -> anyhow::Result<()> {
        let engine = Arc::new(FetchEngine::new(
            Arc::new(InMemoryRequestStore::new()),
            Arc::new(ScriptedDaemon::new()),
            Arc::new(RecordingSink::new()),
            Metrics::new()?,
        ));
        let (shutdown, handle) = PollLoop::new(engine, Duration::from_millis(5)).spawn();
        drop(shutdown);
        tokio::time::timeout(Duration::from_secs(1), handle).await??;
        Ok(())
    }

    #[tokio::test]
    async fn in_flight_pass_finishes_before_exit() -> anyhow::Result<()> {
        let store = Arc::new(InMemoryRequestStore::new());
        let daemon = Arc::new(ScriptedDaemon::new().with_status_delay(Duration::from_millis(80)));
        let request = downloading_request(3);
        store.seed(request.clone());
        daemon.set_status(daemon_torrent(3, 4));

        let engine = Arc::new(FetchEngine::new(
            store.clone(),
            daemon.clone(),
            Arc::new(RecordingSink::new()),
            Metrics::new()?,
        ));
        let (shutdown, handle) = PollLoop::new(engine, Duration::from_secs(60)).spawn();
        tokio::time::sleep(Duration::from_millis(20)).await;
        shutdown.send(true)?;
        handle.await?;

        assert_eq!(daemon.status_calls(), 1);
        assert_eq!(store.torrent_updates(), 1);
        Ok(())
    }
}

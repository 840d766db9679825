//! Fetch engine: advances one request at a time against the download daemon.
//!
//! # Design
//! - Every drive of a request runs under that request's lock, so the store, daemon, and chat
//!   see a single writer per request.
//! - Store and daemon failures abort the drive; chat failures are logged and counted only.
//! - A request whose download the daemon has forgotten is deleted silently, as is a drive of a
//!   request that no longer exists.
//! - The daemon handle is persisted as soon as the daemon accepts a selection, so a failed status
//!   lookup leaves the request to the next poll instead of triggering a second add.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use harvest_fetch_core::{
    DaemonId, DownloadDaemon, FetchError, FetchResult, FetchState, NotificationSink, Phase,
    RequestId, RequestStore, TorrentRecord, TorrentStatus, render,
};
use harvest_telemetry::{DriveOutcomeLabel, Metrics};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::locks::RequestLocks;

/// Result of driving one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriveOutcome {
    /// The request was missing or had no status message yet; nothing was touched.
    Skipped,
    /// Daemon status was persisted and rendered.
    Updated {
        /// Phase reported by the daemon.
        phase: Phase,
    },
    /// The download finished during this drive and the requester was mentioned.
    Completed,
    /// The daemon no longer knew the download; the request was deleted.
    Removed,
}

impl DriveOutcome {
    const fn label(self) -> DriveOutcomeLabel {
        match self {
            Self::Skipped => DriveOutcomeLabel::Skipped,
            Self::Updated { .. } => DriveOutcomeLabel::Updated,
            Self::Completed => DriveOutcomeLabel::Completed,
            Self::Removed => DriveOutcomeLabel::Removed,
        }
    }
}

/// Tally of one `drive_all` pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DriveSummary {
    /// Requests found in progress.
    pub attempted: usize,
    /// Drives that returned an outcome.
    pub succeeded: usize,
    /// Drives that returned an error or whose task failed.
    pub failed: usize,
    /// Drives that observed completion.
    pub completed: usize,
    /// Drives that removed a forgotten request.
    pub removed: usize,
}

impl DriveSummary {
    const fn record(&mut self, outcome: DriveOutcome) {
        self.succeeded += 1;
        match outcome {
            DriveOutcome::Completed => self.completed += 1,
            DriveOutcome::Removed => self.removed += 1,
            DriveOutcome::Skipped | DriveOutcome::Updated { .. } => {}
        }
    }
}

/// Coordinates the request store, download daemon, and chat sink.
pub struct FetchEngine {
    store: Arc<dyn RequestStore>,
    daemon: Arc<dyn DownloadDaemon>,
    sink: Arc<dyn NotificationSink>,
    locks: RequestLocks,
    unknown_codes: Mutex<HashMap<RequestId, i64>>,
    metrics: Metrics,
}

impl FetchEngine {
    /// Assemble an engine from its collaborators.
    #[must_use]
    pub fn new(
        store: Arc<dyn RequestStore>,
        daemon: Arc<dyn DownloadDaemon>,
        sink: Arc<dyn NotificationSink>,
        metrics: Metrics,
    ) -> Self {
        Self {
            store,
            daemon,
            sink,
            locks: RequestLocks::new(),
            unknown_codes: Mutex::new(HashMap::new()),
            metrics,
        }
    }

    /// Metrics handle shared with the engine.
    #[must_use]
    pub const fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    pub(crate) fn store(&self) -> &dyn RequestStore {
        self.store.as_ref()
    }

    pub(crate) fn sink(&self) -> &dyn NotificationSink {
        self.sink.as_ref()
    }

    pub(crate) const fn locks(&self) -> &RequestLocks {
        &self.locks
    }

    /// Advance a single request by one step.
    ///
    /// # Errors
    ///
    /// Returns an error when the store or daemon fails, or when the stored record
    /// has a status message but no recorded choice. A missing request is not an error.
    pub async fn drive_one(&self, id: RequestId) -> FetchResult<DriveOutcome> {
        let _guard = self.locks.acquire(id).await;
        self.drive_locked(id).await
    }

    /// Drive every in-progress request concurrently.
    ///
    /// Individual failures are logged and counted; they never abort the pass.
    ///
    /// # Errors
    ///
    /// Returns an error only when the in-progress listing itself fails.
    pub async fn drive_all(self: &Arc<Self>) -> FetchResult<DriveSummary> {
        let requests = self
            .store
            .find_all_in_progress()
            .await
            .map_err(|err| FetchError::operation("store.find_all_in_progress", None, err))?;
        self.metrics.set_requests_in_progress(requests.len());

        let mut summary = DriveSummary {
            attempted: requests.len(),
            ..DriveSummary::default()
        };
        let mut drives = JoinSet::new();
        for request in requests {
            let engine = Arc::clone(self);
            drives.spawn(async move { (request.id, engine.drive_one(request.id).await) });
        }

        while let Some(joined) = drives.join_next().await {
            match joined {
                Ok((_, Ok(outcome))) => summary.record(outcome),
                Ok((request_id, Err(err))) => {
                    summary.failed += 1;
                    warn!(request_id = %request_id, error = ?err, "request drive failed");
                }
                Err(err) => {
                    summary.failed += 1;
                    warn!(error = %err, "request drive task failed");
                }
            }
        }
        Ok(summary)
    }

    /// Drive a request whose lock the caller already holds.
    pub(crate) async fn drive_locked(&self, id: RequestId) -> FetchResult<DriveOutcome> {
        let result = self.advance(id).await;
        let label = result
            .as_ref()
            .map_or(DriveOutcomeLabel::Failed, |outcome| outcome.label());
        self.metrics.inc_drive(label);
        result
    }

    async fn advance(&self, id: RequestId) -> FetchResult<DriveOutcome> {
        let Some(request) = self
            .store
            .find_by_id(id)
            .await
            .map_err(|err| FetchError::operation("store.find_by_id", Some(id), err))?
        else {
            debug!(request_id = %id, "request no longer exists; skipping");
            return Ok(DriveOutcome::Skipped);
        };

        let Some(status_message_id) = request.status_message_id() else {
            debug!(request_id = %id, "no status message yet; skipping");
            return Ok(DriveOutcome::Skipped);
        };
        let was_in_progress = request.is_in_progress();

        let (choice, daemon_id) = match request.state() {
            FetchState::AskingUser => {
                return Err(FetchError::CorruptRecord {
                    request_id: id,
                    reason: "status_message_without_choice",
                });
            }
            FetchState::Selected { choice } => {
                let handle = self
                    .daemon
                    .add_uri(&choice.magnet_uri)
                    .await
                    .map_err(|err| FetchError::operation("daemon.add_uri", Some(id), err))?;
                info!(
                    request_id = %id,
                    daemon_id = handle.id,
                    name = %choice.name,
                    "download handed to daemon"
                );
                self.store
                    .update_torrent(id, &accepted_torrent(handle.id, &choice.name))
                    .await
                    .map_err(|err| FetchError::operation("store.record_handle", Some(id), err))?;
                (choice, handle.id)
            }
            FetchState::Downloading { choice, torrent }
            | FetchState::Seeding { choice, torrent } => (choice, torrent.daemon_id),
        };

        let Some(snapshot) = self
            .daemon
            .get_status(daemon_id)
            .await
            .map_err(|err| FetchError::operation("daemon.get_status", Some(id), err))?
        else {
            warn!(
                request_id = %id,
                daemon_id,
                name = %choice.name,
                "daemon no longer knows the download; removing request"
            );
            self.store
                .delete(id)
                .await
                .map_err(|err| FetchError::operation("store.delete", Some(id), err))?;
            self.metrics.inc_lookup_miss();
            self.unknown_codes().remove(&id);
            return Ok(DriveOutcome::Removed);
        };

        let phase = self.resolve_phase(id, snapshot.status_code);
        let torrent = TorrentRecord {
            daemon_id,
            name: snapshot.name,
            hash: snapshot.hash,
            status: TorrentStatus {
                in_progress: phase != Phase::Seeding,
                phase,
                progress_fraction: snapshot.percent_done,
                download_rate_bps: snapshot.rate_download,
                peer_count: snapshot.peers_sending_to_us,
                eta_seconds: snapshot.eta,
            },
        };
        self.store
            .update_torrent(id, &torrent)
            .await
            .map_err(|err| FetchError::operation("store.update_torrent", Some(id), err))?;

        let channel_id = request.requester.channel_id.as_str();
        let payload = render::download_status(choice, &torrent.status, choice.seeders);
        self.report(
            id,
            "edit_message",
            self.sink
                .edit_message(channel_id, status_message_id, &payload)
                .await,
        );

        if was_in_progress && !torrent.status.in_progress {
            self.report(
                id,
                "send_mention",
                self.sink
                    .send_mention(
                        channel_id,
                        &request.requester.author_id,
                        &render::completion_text(&choice.name),
                    )
                    .await,
            );
            self.metrics.inc_completion();
            info!(request_id = %id, name = %choice.name, "download finished");
            return Ok(DriveOutcome::Completed);
        }

        Ok(DriveOutcome::Updated { phase })
    }

    /// Map a daemon status code, warning once per request for each unrecognised code.
    fn resolve_phase(&self, id: RequestId, status_code: i64) -> Phase {
        if let Some(phase) = Phase::from_status_code(status_code) {
            self.unknown_codes().remove(&id);
            return phase;
        }
        let repeated = self.unknown_codes().insert(id, status_code) == Some(status_code);
        if repeated {
            debug!(request_id = %id, status_code, "daemon status code still unrecognised");
        } else {
            warn!(request_id = %id, status_code, "unrecognised daemon status code");
        }
        Phase::default()
    }

    fn unknown_codes(&self) -> MutexGuard<'_, HashMap<RequestId, i64>> {
        self.unknown_codes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn report(&self, id: RequestId, operation: &'static str, result: anyhow::Result<()>) {
        if let Err(err) = result {
            self.metrics.inc_notification_failure(operation);
            warn!(
                request_id = %id,
                operation,
                error = %format!("{err:#}"),
                "chat notification failed"
            );
        }
    }
}

/// Placeholder record stored between the daemon accepting a download and its first status.
fn accepted_torrent(daemon_id: DaemonId, name: &str) -> TorrentRecord {
    TorrentRecord {
        daemon_id,
        name: name.to_string(),
        hash: String::new(),
        status: TorrentStatus {
            in_progress: true,
            phase: Phase::Verifying,
            progress_fraction: 0.0,
            download_rate_bps: 0,
            peer_count: 0,
            eta_seconds: -1,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use harvest_test_support::mocks::{InMemoryRequestStore, RecordingSink, ScriptedDaemon};
    use uuid::Uuid;

    #[test]
    fn unknown_codes_are_tracked_until_a_known_code_arrives() -> anyhow::Result<()> {
        let engine = FetchEngine::new(
            Arc::new(InMemoryRequestStore::new()),
            Arc::new(ScriptedDaemon::new()),
            Arc::new(RecordingSink::new()),
            Metrics::new()?,
        );
        let id = Uuid::new_v4();

        assert_eq!(engine.resolve_phase(id, 0), Phase::Verifying);
        assert_eq!(engine.resolve_phase(id, 0), Phase::Verifying);
        assert_eq!(engine.unknown_codes().get(&id), Some(&0));

        assert_eq!(engine.resolve_phase(id, 5), Phase::Seeding);
        assert!(engine.unknown_codes().is_empty());
        Ok(())
    }
}

//! Collaborator traits consumed by the fetch engine.

use anyhow::bail;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::model::{DaemonId, FetchRequest, RequestId, SearchResult, TorrentRecord};
use crate::render::MessagePayload;

/// Durable storage for fetch requests.
///
/// Writes to the `torrent` sub-object are last-write-wins on the whole value.
#[async_trait]
pub trait RequestStore: Send + Sync {
    /// Persist a newly created request.
    async fn insert(&self, request: &FetchRequest) -> anyhow::Result<()>;

    /// Load a request by identifier.
    async fn find_by_id(&self, id: RequestId) -> anyhow::Result<Option<FetchRequest>>;

    /// Load the request whose search listing is the given chat message.
    async fn find_by_list_message(
        &self,
        list_message_id: &str,
    ) -> anyhow::Result<Option<FetchRequest>>;

    /// Load every request whose persisted torrent status is still in progress.
    async fn find_all_in_progress(&self) -> anyhow::Result<Vec<FetchRequest>>;

    /// Record the user's choice and the status message announcing it.
    ///
    /// Returns `false` without writing when a choice is already present.
    async fn record_choice(
        &self,
        id: RequestId,
        choice: &SearchResult,
        status_message_id: &str,
    ) -> anyhow::Result<bool>;

    /// Replace the persisted torrent sub-object.
    async fn update_torrent(&self, id: RequestId, torrent: &TorrentRecord) -> anyhow::Result<()>;

    /// Remove a request.
    async fn delete(&self, id: RequestId) -> anyhow::Result<()>;
}

/// Handle returned when the daemon accepts a download.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DaemonHandle {
    /// Daemon-assigned identifier.
    pub id: DaemonId,
}

/// Raw status snapshot as reported by the download daemon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DaemonTorrent {
    /// Daemon-assigned identifier.
    pub id: DaemonId,
    /// Torrent name.
    pub name: String,
    /// Info hash.
    pub hash: String,
    /// Daemon-specific numeric status code.
    pub status_code: i64,
    /// Completed fraction in `[0, 1]`.
    pub percent_done: f64,
    /// Download rate in bytes per second.
    pub rate_download: u64,
    /// Peers currently sending data.
    pub peers_sending_to_us: u32,
    /// Estimated seconds remaining; negative when unknown.
    pub eta: i64,
}

/// External download daemon that performs the transfers.
#[async_trait]
pub trait DownloadDaemon: Send + Sync {
    /// Submit a magnet or torrent URI for download.
    async fn add_uri(&self, uri: &str) -> anyhow::Result<DaemonHandle>;

    /// Fetch the current status of a download; `None` when the daemon no longer knows it.
    async fn get_status(&self, id: DaemonId) -> anyhow::Result<Option<DaemonTorrent>>;
}

/// Chat surface that shows request progress to users.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    /// Post a new message, optionally as a reply, returning its identifier.
    async fn post_message(
        &self,
        channel_id: &str,
        reply_to: Option<&str>,
        payload: &MessagePayload,
    ) -> anyhow::Result<String>;

    /// Replace the content of an existing message.
    async fn edit_message(
        &self,
        channel_id: &str,
        message_id: &str,
        payload: &MessagePayload,
    ) -> anyhow::Result<()>;

    /// Send a plain-text message that mentions a user.
    async fn send_mention(&self, channel_id: &str, user_id: &str, text: &str)
    -> anyhow::Result<()>;

    /// Add a reaction to a message; default implementation reports lack of support.
    async fn add_reaction(
        &self,
        channel_id: &str,
        message_id: &str,
        emoji: &str,
    ) -> anyhow::Result<()> {
        let _ = (channel_id, message_id, emoji);
        bail!("reactions not supported by this sink");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct TextOnlySink;

    #[async_trait]
    impl NotificationSink for TextOnlySink {
        async fn post_message(
            &self,
            _channel_id: &str,
            _reply_to: Option<&str>,
            _payload: &MessagePayload,
        ) -> anyhow::Result<String> {
            Ok("1".to_string())
        }

        async fn edit_message(
            &self,
            _channel_id: &str,
            _message_id: &str,
            _payload: &MessagePayload,
        ) -> anyhow::Result<()> {
            Ok(())
        }

        async fn send_mention(
            &self,
            _channel_id: &str,
            _user_id: &str,
            _text: &str,
        ) -> anyhow::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn sink_default_reaction_errors() {
        let sink = TextOnlySink;
        let err = sink
            .add_reaction("channel", "message", "0\u{20e3}")
            .await
            .expect_err("reactions should be unsupported");
        assert!(err.to_string().contains("reactions"));
    }
}

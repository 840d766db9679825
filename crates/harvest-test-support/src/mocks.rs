//! In-memory collaborators that record interactions for assertions.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use anyhow::{Result, anyhow, bail};
use async_trait::async_trait;
use harvest_fetch_core::{
    DaemonHandle, DaemonId, DaemonTorrent, DownloadDaemon, FetchRequest, MessagePayload,
    NotificationSink, RequestId, RequestStore, SearchResult, TorrentRecord,
};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Request store backed by a `HashMap`.
#[derive(Default)]
pub struct InMemoryRequestStore {
    requests: Mutex<HashMap<RequestId, FetchRequest>>,
    torrent_updates: AtomicUsize,
    fail_updates: AtomicBool,
    fail_reads: AtomicBool,
    reject_choices: AtomicBool,
}

impl InMemoryRequestStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a request directly, bypassing the trait.
    pub fn seed(&self, request: FetchRequest) {
        lock(&self.requests).insert(request.id, request);
    }

    /// Snapshot of a stored request.
    #[must_use]
    pub fn get(&self, id: RequestId) -> Option<FetchRequest> {
        lock(&self.requests).get(&id).cloned()
    }

    /// Number of stored requests.
    #[must_use]
    pub fn len(&self) -> usize {
        lock(&self.requests).len()
    }

    /// Whether the store holds no requests.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of successful `update_torrent` calls.
    #[must_use]
    pub fn torrent_updates(&self) -> usize {
        self.torrent_updates.load(Ordering::SeqCst)
    }

    /// Make subsequent `update_torrent` calls fail.
    pub fn fail_updates(&self, fail: bool) {
        self.fail_updates.store(fail, Ordering::SeqCst);
    }

    /// Make `record_choice` report that another writer got there first.
    pub fn reject_choices(&self, reject: bool) {
        self.reject_choices.store(reject, Ordering::SeqCst);
    }

    /// Make subsequent lookups fail.
    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    fn check_reads(&self) -> Result<()> {
        if self.fail_reads.load(Ordering::SeqCst) {
            bail!("store unavailable");
        }
        Ok(())
    }
}

#[async_trait]
impl RequestStore for InMemoryRequestStore {
    async fn insert(&self, request: &FetchRequest) -> Result<()> {
        let mut requests = lock(&self.requests);
        if requests.contains_key(&request.id) {
            bail!("duplicate request id {}", request.id);
        }
        requests.insert(request.id, request.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: RequestId) -> Result<Option<FetchRequest>> {
        self.check_reads()?;
        Ok(self.get(id))
    }

    async fn find_by_list_message(&self, list_message_id: &str) -> Result<Option<FetchRequest>> {
        self.check_reads()?;
        Ok(lock(&self.requests)
            .values()
            .find(|request| request.message_refs.list_message_id == list_message_id)
            .cloned())
    }

    async fn find_all_in_progress(&self) -> Result<Vec<FetchRequest>> {
        self.check_reads()?;
        let mut active: Vec<FetchRequest> = lock(&self.requests)
            .values()
            .filter(|request| request.is_in_progress())
            .cloned()
            .collect();
        active.sort_by_key(|request| request.created_at);
        Ok(active)
    }

    async fn record_choice(
        &self,
        id: RequestId,
        choice: &SearchResult,
        status_message_id: &str,
    ) -> Result<bool> {
        let mut requests = lock(&self.requests);
        let request = requests
            .get_mut(&id)
            .ok_or_else(|| anyhow!("request {id} not found"))?;
        if request.choice.is_some() || self.reject_choices.load(Ordering::SeqCst) {
            return Ok(false);
        }
        request.choice = Some(choice.clone());
        request.message_refs.status_message_id = Some(status_message_id.to_string());
        Ok(true)
    }

    async fn update_torrent(&self, id: RequestId, torrent: &TorrentRecord) -> Result<()> {
        if self.fail_updates.load(Ordering::SeqCst) {
            bail!("store rejected torrent update");
        }
        let mut requests = lock(&self.requests);
        let request = requests
            .get_mut(&id)
            .ok_or_else(|| anyhow!("request {id} not found"))?;
        request.torrent = Some(torrent.clone());
        self.torrent_updates.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn delete(&self, id: RequestId) -> Result<()> {
        lock(&self.requests).remove(&id);
        Ok(())
    }
}

enum StatusScript {
    Present(DaemonTorrent),
    Failing,
}

/// Download daemon whose answers are scripted per torrent id.
///
/// Unknown ids report `None`, matching a daemon that forgot the torrent.
pub struct ScriptedDaemon {
    next_id: AtomicI64,
    statuses: Mutex<HashMap<DaemonId, StatusScript>>,
    added: Mutex<Vec<String>>,
    status_calls: AtomicUsize,
    fail_add: AtomicBool,
    status_delay: Option<Duration>,
    active: AtomicUsize,
    max_active: AtomicUsize,
}

impl Default for ScriptedDaemon {
    fn default() -> Self {
        Self {
            next_id: AtomicI64::new(1),
            statuses: Mutex::new(HashMap::new()),
            added: Mutex::new(Vec::new()),
            status_calls: AtomicUsize::new(0),
            fail_add: AtomicBool::new(false),
            status_delay: None,
            active: AtomicUsize::new(0),
            max_active: AtomicUsize::new(0),
        }
    }
}

impl ScriptedDaemon {
    /// Daemon that assigns ids starting at 1.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every status lookup, widening race windows in concurrency tests.
    #[must_use]
    pub const fn with_status_delay(mut self, delay: Duration) -> Self {
        self.status_delay = Some(delay);
        self
    }

    /// Answer lookups for `torrent.id` with `torrent`.
    pub fn set_status(&self, torrent: DaemonTorrent) {
        lock(&self.statuses).insert(torrent.id, StatusScript::Present(torrent));
    }

    /// Make lookups for `id` return an error.
    pub fn fail_status(&self, id: DaemonId) {
        lock(&self.statuses).insert(id, StatusScript::Failing);
    }

    /// Make lookups for `id` report an unknown torrent.
    pub fn forget(&self, id: DaemonId) {
        lock(&self.statuses).remove(&id);
    }

    /// Make subsequent `add_uri` calls fail.
    pub fn fail_add(&self, fail: bool) {
        self.fail_add.store(fail, Ordering::SeqCst);
    }

    /// URIs submitted so far, in order.
    #[must_use]
    pub fn added_uris(&self) -> Vec<String> {
        lock(&self.added).clone()
    }

    /// Total status lookups served.
    #[must_use]
    pub fn status_calls(&self) -> usize {
        self.status_calls.load(Ordering::SeqCst)
    }

    /// Highest number of status lookups observed in flight at once.
    #[must_use]
    pub fn max_concurrent_status_calls(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DownloadDaemon for ScriptedDaemon {
    async fn add_uri(&self, uri: &str) -> Result<DaemonHandle> {
        if self.fail_add.load(Ordering::SeqCst) {
            bail!("daemon refused torrent");
        }
        lock(&self.added).push(uri.to_string());
        Ok(DaemonHandle {
            id: self.next_id.fetch_add(1, Ordering::SeqCst),
        })
    }

    async fn get_status(&self, id: DaemonId) -> Result<Option<DaemonTorrent>> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        let in_flight = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(in_flight, Ordering::SeqCst);
        if let Some(delay) = self.status_delay {
            tokio::time::sleep(delay).await;
        }
        let answer = match lock(&self.statuses).get(&id) {
            Some(StatusScript::Present(torrent)) => Ok(Some(torrent.clone())),
            Some(StatusScript::Failing) => Err(anyhow!("daemon lookup failed for {id}")),
            None => Ok(None),
        };
        self.active.fetch_sub(1, Ordering::SeqCst);
        answer
    }
}

/// Interaction recorded by [`RecordingSink`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkCall {
    /// A new message was posted.
    Posted {
        /// Target channel.
        channel_id: String,
        /// Message replied to, if any.
        reply_to: Option<String>,
        /// Message body.
        payload: MessagePayload,
    },
    /// An existing message was edited.
    Edited {
        /// Target channel.
        channel_id: String,
        /// Edited message.
        message_id: String,
        /// Replacement body.
        payload: MessagePayload,
    },
    /// A user was mentioned.
    Mentioned {
        /// Target channel.
        channel_id: String,
        /// Mentioned user.
        user_id: String,
        /// Mention text.
        text: String,
    },
    /// A reaction was added.
    Reacted {
        /// Target channel.
        channel_id: String,
        /// Reacted message.
        message_id: String,
        /// Emoji added.
        emoji: String,
    },
}

/// Notification sink that records every call and hands out sequential message ids.
#[derive(Default)]
pub struct RecordingSink {
    calls: Mutex<Vec<SinkCall>>,
    next_message: AtomicU64,
    fail_posts: AtomicBool,
    fail_edits: AtomicBool,
    fail_mentions: AtomicBool,
}

impl RecordingSink {
    /// Create a sink with no recorded calls.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All recorded calls in order.
    #[must_use]
    pub fn calls(&self) -> Vec<SinkCall> {
        lock(&self.calls).clone()
    }

    /// Edits recorded so far as `(message_id, payload)`.
    #[must_use]
    pub fn edits(&self) -> Vec<(String, MessagePayload)> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                SinkCall::Edited {
                    message_id,
                    payload,
                    ..
                } => Some((message_id, payload)),
                _ => None,
            })
            .collect()
    }

    /// Mentions recorded so far as `(user_id, text)`.
    #[must_use]
    pub fn mentions(&self) -> Vec<(String, String)> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                SinkCall::Mentioned { user_id, text, .. } => Some((user_id, text)),
                _ => None,
            })
            .collect()
    }

    /// Posts recorded so far.
    #[must_use]
    pub fn posts(&self) -> Vec<SinkCall> {
        self.calls()
            .into_iter()
            .filter(|call| matches!(call, SinkCall::Posted { .. }))
            .collect()
    }

    /// Make subsequent posts fail.
    pub fn fail_posts(&self, fail: bool) {
        self.fail_posts.store(fail, Ordering::SeqCst);
    }

    /// Make subsequent edits fail.
    pub fn fail_edits(&self, fail: bool) {
        self.fail_edits.store(fail, Ordering::SeqCst);
    }

    /// Make subsequent mentions fail.
    pub fn fail_mentions(&self, fail: bool) {
        self.fail_mentions.store(fail, Ordering::SeqCst);
    }

    fn record(&self, call: SinkCall) {
        lock(&self.calls).push(call);
    }
}

#[async_trait]
impl NotificationSink for RecordingSink {
    async fn post_message(
        &self,
        channel_id: &str,
        reply_to: Option<&str>,
        payload: &MessagePayload,
    ) -> Result<String> {
        if self.fail_posts.load(Ordering::SeqCst) {
            bail!("chat rejected message");
        }
        self.record(SinkCall::Posted {
            channel_id: channel_id.to_string(),
            reply_to: reply_to.map(ToString::to_string),
            payload: payload.clone(),
        });
        let next = self.next_message.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(format!("msg-{next}"))
    }

    async fn edit_message(
        &self,
        channel_id: &str,
        message_id: &str,
        payload: &MessagePayload,
    ) -> Result<()> {
        if self.fail_edits.load(Ordering::SeqCst) {
            bail!("chat rejected edit");
        }
        self.record(SinkCall::Edited {
            channel_id: channel_id.to_string(),
            message_id: message_id.to_string(),
            payload: payload.clone(),
        });
        Ok(())
    }

    async fn send_mention(&self, channel_id: &str, user_id: &str, text: &str) -> Result<()> {
        if self.fail_mentions.load(Ordering::SeqCst) {
            bail!("chat rejected mention");
        }
        self.record(SinkCall::Mentioned {
            channel_id: channel_id.to_string(),
            user_id: user_id.to_string(),
            text: text.to_string(),
        });
        Ok(())
    }

    async fn add_reaction(&self, channel_id: &str, message_id: &str, emoji: &str) -> Result<()> {
        self.record(SinkCall::Reacted {
            channel_id: channel_id.to_string(),
            message_id: message_id.to_string(),
            emoji: emoji.to_string(),
        });
        Ok(())
    }
}

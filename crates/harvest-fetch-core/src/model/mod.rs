//! Fetch request domain types shared across the workspace.
//!
//! # Design
//! - The persisted shape carries no explicit state column; [`FetchRequest::state`] derives a
//!   [`FetchState`] from which optional fields are populated.
//! - `torrent.status.in_progress` is the only flag that decides whether a request is still driven.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{FetchError, FetchResult};

/// Identifier assigned to every fetch request at creation.
pub type RequestId = Uuid;

/// Identifier the download daemon assigns to an admitted torrent.
pub type DaemonId = i64;

/// Maximum number of search candidates retained on a request.
pub const MAX_SEARCH_RESULTS: usize = 10;

/// Conversation origin of a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Requester {
    /// Chat user who issued the search.
    pub author_id: String,
    /// Channel the search was issued in.
    pub channel_id: String,
}

/// Chat messages associated with a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageRefs {
    /// The user's original command message.
    pub request_message_id: String,
    /// The bot's reply listing the search results.
    pub list_message_id: String,
    /// The status message edited as the download progresses; set once a choice is made.
    pub status_message_id: Option<String>,
}

/// One candidate returned by the media search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    /// Display name of the candidate.
    pub name: String,
    /// Human-readable size reported by the search provider.
    pub size: String,
    /// Seeder count at search time.
    pub seeders: u32,
    /// Magnet URI handed to the download daemon.
    pub magnet_uri: String,
}

/// Daemon-reported sub-state of an active download.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// The daemon is checking data or has not reported a recognised state.
    #[default]
    Verifying,
    /// The download is waiting in the daemon queue.
    Queued,
    /// Payload data is being transferred.
    Downloading,
    /// The download finished and the daemon is seeding.
    Seeding,
}

impl Phase {
    /// Map a Transmission `status` code onto a phase.
    ///
    /// Seed-wait (5) counts as seeding since the payload is complete. Returns `None` for codes
    /// without a mapping, stopped (0) included; callers fall back to [`Phase::default`].
    #[must_use]
    pub const fn from_status_code(code: i64) -> Option<Self> {
        match code {
            1 | 2 => Some(Self::Verifying),
            3 => Some(Self::Queued),
            4 => Some(Self::Downloading),
            5 | 6 => Some(Self::Seeding),
            _ => None,
        }
    }

    /// Label rendered in the chat status message.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Verifying => "🤔 Verifying...",
            Self::Queued => "Queued",
            Self::Downloading => "Downloading",
            Self::Seeding => "Seeding",
        }
    }
}

/// Progress snapshot persisted alongside the torrent handle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TorrentStatus {
    /// Whether the engine must keep driving the request.
    pub in_progress: bool,
    /// Phase reported by the daemon.
    pub phase: Phase,
    /// Completed fraction in `[0, 1]`.
    pub progress_fraction: f64,
    /// Current download rate in bytes per second.
    pub download_rate_bps: u64,
    /// Peers currently sending data.
    pub peer_count: u32,
    /// Estimated seconds remaining; negative when the daemon cannot estimate.
    pub eta_seconds: i64,
}

/// Torrent handle and status persisted once a download has started.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TorrentRecord {
    /// Identifier assigned by the download daemon.
    pub daemon_id: DaemonId,
    /// Torrent name reported by the daemon.
    pub name: String,
    /// Info hash reported by the daemon.
    pub hash: String,
    /// Latest status snapshot.
    pub status: TorrentStatus,
}

/// Durable record of one user's fetch attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FetchRequest {
    /// Unique identifier.
    pub id: RequestId,
    /// Origin of the request.
    pub requester: Requester,
    /// Associated chat messages.
    pub message_refs: MessageRefs,
    /// Candidates offered to the user, capped at [`MAX_SEARCH_RESULTS`].
    pub search_results: Vec<SearchResult>,
    /// Candidate selected by the user.
    pub choice: Option<SearchResult>,
    /// Download handle once the daemon accepted the choice.
    pub torrent: Option<TorrentRecord>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

/// State derived from which optional fields of a [`FetchRequest`] are populated.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FetchState<'a> {
    /// Waiting for the user to pick a search result.
    AskingUser,
    /// A choice was recorded but the daemon has not been asked to download it.
    Selected {
        /// The recorded choice.
        choice: &'a SearchResult,
    },
    /// The daemon is working on the download.
    Downloading {
        /// The recorded choice.
        choice: &'a SearchResult,
        /// Persisted torrent handle.
        torrent: &'a TorrentRecord,
    },
    /// The download finished; terminal.
    Seeding {
        /// The recorded choice.
        choice: &'a SearchResult,
        /// Persisted torrent handle.
        torrent: &'a TorrentRecord,
    },
}

impl FetchState<'_> {
    /// Whether the state can no longer change.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Seeding { .. })
    }
}

impl FetchRequest {
    /// Build a new request in the asking-user state.
    ///
    /// Search results beyond [`MAX_SEARCH_RESULTS`] are dropped.
    #[must_use]
    pub fn new(
        requester: Requester,
        request_message_id: impl Into<String>,
        list_message_id: impl Into<String>,
        mut search_results: Vec<SearchResult>,
    ) -> Self {
        search_results.truncate(MAX_SEARCH_RESULTS);
        Self {
            id: Uuid::new_v4(),
            requester,
            message_refs: MessageRefs {
                request_message_id: request_message_id.into(),
                list_message_id: list_message_id.into(),
                status_message_id: None,
            },
            search_results,
            choice: None,
            torrent: None,
            created_at: Utc::now(),
        }
    }

    /// Derive the current state from the populated fields.
    #[must_use]
    pub fn state(&self) -> FetchState<'_> {
        match (self.choice.as_ref(), self.torrent.as_ref()) {
            (None, _) => FetchState::AskingUser,
            (Some(choice), None) => FetchState::Selected { choice },
            (Some(choice), Some(torrent)) if torrent.status.phase == Phase::Seeding => {
                FetchState::Seeding { choice, torrent }
            }
            (Some(choice), Some(torrent)) => FetchState::Downloading { choice, torrent },
        }
    }

    /// Whether the persisted status asks the engine to keep driving this request.
    #[must_use]
    pub fn is_in_progress(&self) -> bool {
        self.torrent
            .as_ref()
            .is_some_and(|torrent| torrent.status.in_progress)
    }

    /// Status message reference, once a choice has been announced.
    #[must_use]
    pub fn status_message_id(&self) -> Option<&str> {
        self.message_refs.status_message_id.as_deref()
    }

    /// Resolve the candidate a user picked without mutating the request.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::ChoiceAlreadyMade`] when a choice exists and
    /// [`FetchError::InvalidChoice`] when the index is out of range.
    pub fn candidate(&self, index: usize) -> FetchResult<&SearchResult> {
        if self.choice.is_some() {
            return Err(FetchError::ChoiceAlreadyMade {
                request_id: self.id,
            });
        }
        self.search_results
            .get(index)
            .ok_or(FetchError::InvalidChoice {
                request_id: self.id,
                index,
                available: self.search_results.len(),
            })
    }
}

#![forbid(unsafe_code)]
#![deny(
    warnings,
    dead_code,
    unused,
    unused_imports,
    unused_must_use,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]
#![allow(clippy::module_name_repetitions)]

//! Engine-agnostic fetch request model, rendering helpers, and collaborator traits.
//!
//! Layout: `model/` (persisted request shape and derived state), `render.rs` (chat payloads),
//! `service/` (store, daemon, and notification traits), `error.rs` (shared error type).

pub mod error;
pub mod model;
pub mod render;
pub mod service;

pub use error::{FetchError, FetchResult};
pub use model::{
    DaemonId, FetchRequest, FetchState, MAX_SEARCH_RESULTS, MessageRefs, Phase, RequestId,
    Requester, SearchResult, TorrentRecord, TorrentStatus,
};
pub use render::{MessageField, MessagePayload};
pub use service::{DaemonHandle, DaemonTorrent, DownloadDaemon, NotificationSink, RequestStore};

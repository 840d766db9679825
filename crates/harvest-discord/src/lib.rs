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

//! Discord REST client implementing the fetch engine's notification sink.

pub mod client;
pub mod error;
mod wire;

pub use client::{DiscordClient, DiscordConfig};
pub use error::{DiscordError, DiscordResult};

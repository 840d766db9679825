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

//! Environment-driven configuration for the bot.
//!
//! Layout: `model.rs` (typed settings), `loader.rs` (`HARVEST_*` lookup and guard rails),
//! `validate.rs` (value parsers), `defaults.rs` (fallback values).

mod defaults;
pub mod error;
pub mod loader;
pub mod model;
mod validate;

pub use error::{ConfigError, ConfigResult};
pub use loader::ENV_PREFIX;
pub use model::{
    AppConfig, ChannelFilter, DiscordSettings, DownloadDirSettings, LogStyle,
    TransmissionSettings,
};

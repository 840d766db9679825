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

//! Harvest application wiring.
//!
//! Layout: `engine.rs` (fetch state machine), `locks.rs` (per-request serialisation),
//! `poller.rs` (periodic driver), `commands.rs` (chat command handlers), `cli.rs`,
//! `bootstrap.rs` (service wiring and lifecycle).

/// Application bootstrap and process lifecycle.
pub mod bootstrap;
/// Command-line interface definition.
pub mod cli;
/// Chat command parsing and handlers.
pub mod commands;
/// Resource fetch engine.
pub mod engine;
/// Application error type.
pub mod error;
/// Keyed async locks.
pub mod locks;
/// Periodic engine driver.
pub mod poller;

pub use bootstrap::run_app;
pub use cli::{Cli, CliCommand};
pub use engine::{DriveOutcome, DriveSummary, FetchEngine};
pub use error::{AppError, AppResult};

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

//! Transmission RPC client implementing the fetch engine's download daemon interface.
//!
//! Layout: `client.rs` (session handshake and RPC calls), `rpc.rs` (wire types), `error.rs`.

pub mod client;
pub mod error;
mod rpc;

pub use client::{TransmissionClient, TransmissionConfig};
pub use error::{TransmissionError, TransmissionResult};

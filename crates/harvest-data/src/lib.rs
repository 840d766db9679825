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

//! Postgres persistence for fetch requests: embedded migrations and the request repository.

pub mod error;
pub mod requests;

pub use error::{DataError, Result as DataResult};
pub use requests::PgRequestStore;

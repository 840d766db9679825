//! Error types for the Discord client.

use thiserror::Error;

/// Failures raised while calling the Discord REST API.
#[derive(Debug, Error)]
pub enum DiscordError {
    /// The HTTP client could not be constructed.
    #[error("failed to build discord http client")]
    ClientBuild {
        /// Underlying client error.
        #[source]
        source: reqwest::Error,
    },
    /// The configured API base cannot carry path segments.
    #[error("discord api base url cannot be extended")]
    InvalidBaseUrl {
        /// Offending base URL.
        base: String,
    },
    /// A request failed at the transport or HTTP status level.
    #[error("discord request failed")]
    Http {
        /// Operation identifier.
        operation: &'static str,
        /// Underlying HTTP error.
        #[source]
        source: reqwest::Error,
    },
}

/// Convenience alias for Discord client results.
pub type DiscordResult<T> = Result<T, DiscordError>;

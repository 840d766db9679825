//! Error types for the Transmission client.

use thiserror::Error;

/// Failures raised while talking to the Transmission daemon.
#[derive(Debug, Error)]
pub enum TransmissionError {
    /// The HTTP client could not be constructed.
    #[error("failed to build transmission http client")]
    ClientBuild {
        /// Underlying client error.
        #[source]
        source: reqwest::Error,
    },
    /// A request failed at the transport or HTTP status level.
    #[error("transmission request failed")]
    Http {
        /// RPC method being invoked.
        method: &'static str,
        /// Underlying HTTP error.
        #[source]
        source: reqwest::Error,
    },
    /// A 409 response arrived without a usable session header.
    #[error("transmission session handshake failed")]
    SessionHandshake {
        /// RPC method being invoked.
        method: &'static str,
    },
    /// The daemon answered with a non-success result string.
    #[error("transmission rejected rpc call")]
    Rpc {
        /// RPC method being invoked.
        method: &'static str,
        /// Result string reported by the daemon.
        result: String,
    },
    /// A successful response lacked the expected arguments.
    #[error("transmission response missing arguments")]
    MissingArguments {
        /// RPC method being invoked.
        method: &'static str,
    },
}

/// Convenience alias for Transmission client results.
pub type TransmissionResult<T> = Result<T, TransmissionError>;

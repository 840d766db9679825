//! Error types for fetch request operations.

use std::error::Error;

use thiserror::Error;
use uuid::Uuid;

/// Primary error type for fetch request operations.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Request was not found in the store.
    #[error("fetch request not found")]
    RequestNotFound {
        /// Missing request identifier.
        request_id: Uuid,
    },
    /// Selected index does not address one of the stored search results.
    #[error("choice index out of range")]
    InvalidChoice {
        /// Request identifier.
        request_id: Uuid,
        /// Index supplied by the user.
        index: usize,
        /// Number of search results available.
        available: usize,
    },
    /// A choice was already recorded for the request.
    #[error("choice already recorded")]
    ChoiceAlreadyMade {
        /// Request identifier.
        request_id: Uuid,
    },
    /// Persisted request fields contradict each other.
    #[error("fetch request record is inconsistent")]
    CorruptRecord {
        /// Request identifier.
        request_id: Uuid,
        /// Machine-readable reason for the failure.
        reason: &'static str,
    },
    /// A store, daemon, or notification call failed.
    #[error("fetch operation failed")]
    OperationFailed {
        /// Operation identifier.
        operation: &'static str,
        /// Request identifier when available.
        request_id: Option<Uuid>,
        /// Underlying failure.
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
}

impl FetchError {
    /// Wrap a collaborator failure with the operation that produced it.
    #[must_use]
    pub fn operation(
        operation: &'static str,
        request_id: Option<Uuid>,
        source: anyhow::Error,
    ) -> Self {
        Self::OperationFailed {
            operation,
            request_id,
            source: source.into(),
        }
    }

    /// Request identifier associated with the failure, when one is known.
    #[must_use]
    pub const fn request_id(&self) -> Option<Uuid> {
        match self {
            Self::RequestNotFound { request_id }
            | Self::InvalidChoice { request_id, .. }
            | Self::ChoiceAlreadyMade { request_id }
            | Self::CorruptRecord { request_id, .. } => Some(*request_id),
            Self::OperationFailed { request_id, .. } => *request_id,
        }
    }
}

/// Convenience alias for fetch operation results.
pub type FetchResult<T> = Result<T, FetchError>;

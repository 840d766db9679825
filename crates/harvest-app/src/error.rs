//! # Design
//!
//! - Centralize application-level errors for bootstrap and the poll loop.
//! - Keep error messages constant while carrying context fields for debugging.
//! - Preserve source errors without re-logging at call sites.

use std::io;

use thiserror::Error;

/// Result alias for application operations.
pub type AppResult<T> = Result<T, AppError>;

/// Application-level error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// Configuration operations failed.
    #[error("configuration operation failed")]
    Config {
        /// Operation identifier.
        operation: &'static str,
        /// Source configuration error.
        source: harvest_config::ConfigError,
    },
    /// Telemetry operations failed.
    #[error("telemetry operation failed")]
    Telemetry {
        /// Operation identifier.
        operation: &'static str,
        /// Source telemetry error.
        source: harvest_telemetry::TelemetryError,
    },
    /// Opening the database pool failed.
    #[error("database connection failed")]
    Database {
        /// Operation identifier.
        operation: &'static str,
        /// Source database error.
        source: sqlx::Error,
    },
    /// Request persistence failed.
    #[error("request persistence failed")]
    Data {
        /// Operation identifier.
        operation: &'static str,
        /// Source data error.
        source: harvest_data::DataError,
    },
    /// Download daemon client setup failed.
    #[error("download daemon operation failed")]
    Transmission {
        /// Operation identifier.
        operation: &'static str,
        /// Source daemon client error.
        source: harvest_transmission::TransmissionError,
    },
    /// Chat client setup failed.
    #[error("chat client operation failed")]
    Discord {
        /// Operation identifier.
        operation: &'static str,
        /// Source chat client error.
        source: harvest_discord::DiscordError,
    },
    /// Fetch engine operations failed.
    #[error("fetch operation failed")]
    Fetch {
        /// Operation identifier.
        operation: &'static str,
        /// Source fetch error.
        source: harvest_fetch_core::FetchError,
    },
    /// Installing a shutdown signal handler failed.
    #[error("signal handler installation failed")]
    Signal {
        /// Source IO error.
        source: io::Error,
    },
    /// A background task panicked or was cancelled.
    #[error("background task failed")]
    Task {
        /// Task identifier.
        task: &'static str,
        /// Source join error.
        source: tokio::task::JoinError,
    },
}

impl AppError {
    pub(crate) const fn config(
        operation: &'static str,
        source: harvest_config::ConfigError,
    ) -> Self {
        Self::Config { operation, source }
    }

    pub(crate) const fn telemetry(
        operation: &'static str,
        source: harvest_telemetry::TelemetryError,
    ) -> Self {
        Self::Telemetry { operation, source }
    }

    pub(crate) const fn database(operation: &'static str, source: sqlx::Error) -> Self {
        Self::Database { operation, source }
    }

    pub(crate) const fn data(operation: &'static str, source: harvest_data::DataError) -> Self {
        Self::Data { operation, source }
    }

    pub(crate) const fn transmission(
        operation: &'static str,
        source: harvest_transmission::TransmissionError,
    ) -> Self {
        Self::Transmission { operation, source }
    }

    pub(crate) const fn discord(
        operation: &'static str,
        source: harvest_discord::DiscordError,
    ) -> Self {
        Self::Discord { operation, source }
    }

    pub(crate) const fn fetch(
        operation: &'static str,
        source: harvest_fetch_core::FetchError,
    ) -> Self {
        Self::Fetch { operation, source }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;
    use uuid::Uuid;

    #[test]
    fn app_error_helpers_build_variants() {
        let config = AppError::config(
            "load",
            harvest_config::ConfigError::MissingVariables {
                names: vec!["HARVEST_DISCORD_TOKEN".to_string()],
            },
        );
        assert!(matches!(config, AppError::Config { .. }));
        assert_eq!(config.to_string(), "configuration operation failed");

        let fetch = AppError::fetch(
            "drive",
            harvest_fetch_core::FetchError::RequestNotFound {
                request_id: Uuid::nil(),
            },
        );
        assert!(matches!(
            fetch,
            AppError::Fetch {
                operation: "drive",
                ..
            }
        ));
        assert!(fetch.source().is_some());

        let database = AppError::database("connect", sqlx::Error::PoolTimedOut);
        assert_eq!(database.to_string(), "database connection failed");

        let data = AppError::data(
            "request_store.new",
            harvest_data::DataError::Query {
                operation: "requests.insert",
                source: sqlx::Error::PoolClosed,
            },
        );
        assert!(matches!(data, AppError::Data { .. }));
    }
}

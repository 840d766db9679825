//! Failures raised by the Postgres request store.

use std::error::Error;
use std::fmt::{self, Display, Formatter};

use sqlx::migrate::MigrateError;

/// Result alias for store operations.
pub type Result<T> = std::result::Result<T, DataError>;

/// Store failure, tagged with the step that produced it.
#[derive(Debug)]
pub enum DataError {
    /// Embedded schema migrations could not be applied.
    Migrate {
        /// Migration error reported by sqlx.
        source: MigrateError,
    },
    /// A statement or row read failed.
    Query {
        /// Store operation, e.g. `requests.insert`.
        operation: &'static str,
        /// Driver error.
        source: sqlx::Error,
    },
    /// A JSONB column held a value that does not match its domain type.
    Decode {
        /// Column name.
        column: &'static str,
        /// Deserialisation error.
        source: serde_json::Error,
    },
}

impl DataError {
    /// Store operation associated with a query failure.
    #[must_use]
    pub const fn operation(&self) -> Option<&'static str> {
        match self {
            Self::Query { operation, .. } => Some(*operation),
            Self::Migrate { .. } | Self::Decode { .. } => None,
        }
    }
}

impl Display for DataError {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        let message = match self {
            Self::Migrate { .. } => "request schema migration failed",
            Self::Query { .. } => "request query failed",
            Self::Decode { .. } => "stored request column is malformed",
        };
        formatter.write_str(message)
    }
}

impl Error for DataError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Migrate { source } => Some(source),
            Self::Query { source, .. } => Some(source),
            Self::Decode { source, .. } => Some(source),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_stay_constant_and_sources_are_kept() -> std::result::Result<(), String> {
        let query = DataError::Query {
            operation: "requests.find_by_id",
            source: sqlx::Error::RowNotFound,
        };
        assert_eq!(query.to_string(), "request query failed");
        assert_eq!(query.operation(), Some("requests.find_by_id"));
        assert!(query.source().is_some());

        let Err(json) = serde_json::from_str::<u8>("nope") else {
            return Err("expected invalid json".to_string());
        };
        let decode = DataError::Decode {
            column: "torrent",
            source: json,
        };
        assert_eq!(decode.to_string(), "stored request column is malformed");
        assert_eq!(decode.operation(), None);

        let migrate = DataError::Migrate {
            source: MigrateError::VersionMissing(1),
        };
        assert_eq!(migrate.to_string(), "request schema migration failed");
        assert!(migrate.source().is_some());
        Ok(())
    }
}

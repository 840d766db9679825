//! Error types for configuration loading.

use thiserror::Error;

/// Primary error type for configuration loading.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// One or more required variables were unset.
    #[error("missing required environment variables")]
    MissingVariables {
        /// Full names of every missing variable.
        names: Vec<String>,
    },
    /// A variable held a value that could not be parsed.
    #[error("invalid configuration value")]
    InvalidValue {
        /// Full variable name.
        key: String,
        /// Offending value.
        value: String,
        /// Machine-readable reason for the failure.
        reason: &'static str,
    },
    /// The combination of values is refused in the current environment.
    #[error("configuration refused by guard rail")]
    GuardRail {
        /// Full variable name that triggered the guard.
        key: String,
        /// Machine-readable reason for the failure.
        reason: &'static str,
    },
}

/// Convenience alias for configuration results.
pub type ConfigResult<T> = Result<T, ConfigError>;

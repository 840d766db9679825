//! Subscriber installation.
//!
//! One registry with an `EnvFilter` (`RUST_LOG` wins over the configured level) and a single
//! fmt layer whose output is either JSON or human-readable.

use once_cell::sync::OnceCell;
use tracing_subscriber::{EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::error::{Result, TelemetryError};

/// Level used when neither `RUST_LOG` nor configuration names one.
pub const DEFAULT_LOG_LEVEL: &str = "info";

static BUILD_SHA: OnceCell<String> = OnceCell::new();

/// Output format of the fmt layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// One JSON object per event.
    Json,
    /// Human-readable lines.
    Pretty,
}

impl LogFormat {
    /// Pretty for debug builds, JSON for release builds.
    #[must_use]
    pub const fn infer() -> Self {
        if cfg!(debug_assertions) {
            Self::Pretty
        } else {
            Self::Json
        }
    }
}

/// Inputs to [`init_logging`].
#[derive(Debug, Clone)]
pub struct LoggingConfig<'a> {
    /// Filter directive used when `RUST_LOG` is unset.
    pub level: &'a str,
    /// Output format.
    pub format: LogFormat,
    /// Build identifier attached to the `app` span.
    pub build_sha: &'a str,
}

impl Default for LoggingConfig<'_> {
    fn default() -> Self {
        Self {
            level: DEFAULT_LOG_LEVEL,
            format: LogFormat::infer(),
            build_sha: option_env!("HARVEST_BUILD_SHA").unwrap_or("dev"),
        }
    }
}

/// Install the global subscriber and record the build SHA.
///
/// # Errors
///
/// Returns [`TelemetryError::Subscriber`] when a global subscriber already exists.
pub fn init_logging(config: &LoggingConfig<'_>) -> Result<()> {
    let _ = BUILD_SHA.set(config.build_sha.to_owned());

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(config.level));
    let output = fmt::layer().with_target(false);
    let output = match config.format {
        LogFormat::Json => output.json().boxed(),
        LogFormat::Pretty => output.boxed(),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(output)
        .try_init()
        .map_err(|source| TelemetryError::Subscriber { source })
}

/// Build SHA recorded by [`init_logging`], or `dev` before initialisation.
#[must_use]
pub fn build_sha() -> &'static str {
    BUILD_SHA.get().map_or("dev", String::as_str)
}

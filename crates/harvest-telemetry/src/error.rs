//! Telemetry failures.

use std::error::Error;
use std::fmt::{self, Display, Formatter};

use prometheus::Error as PrometheusError;

/// Result alias for telemetry operations.
pub type Result<T> = std::result::Result<T, TelemetryError>;

/// Stage of collector setup that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectorStage {
    /// Building the collector from its options.
    Build,
    /// Adding the collector to the registry.
    Register,
}

/// Failure while installing logging or exporting metrics.
#[derive(Debug)]
pub enum TelemetryError {
    /// A global tracing subscriber was already installed.
    Subscriber {
        /// Error from `try_init`.
        source: tracing_subscriber::util::TryInitError,
    },
    /// A metric collector could not be set up.
    Collector {
        /// Metric name.
        metric: &'static str,
        /// Setup stage that failed.
        stage: CollectorStage,
        /// Prometheus error.
        source: PrometheusError,
    },
    /// The text exposition could not be produced.
    Exposition {
        /// Encoder or UTF-8 conversion error.
        source: Box<dyn Error + Send + Sync>,
    },
}

impl Display for TelemetryError {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Subscriber { .. } => formatter.write_str("tracing subscriber already installed"),
            Self::Collector {
                stage: CollectorStage::Build,
                ..
            } => formatter.write_str("metric collector could not be built"),
            Self::Collector {
                stage: CollectorStage::Register,
                ..
            } => formatter.write_str("metric collector could not be registered"),
            Self::Exposition { .. } => formatter.write_str("metrics exposition failed"),
        }
    }
}

impl Error for TelemetryError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Subscriber { source } => Some(source),
            Self::Collector { source, .. } => Some(source),
            Self::Exposition { source } => Some(source.as_ref()),
        }
    }
}

//! Prometheus-backed metrics registry and snapshot helpers.
//!
//! # Design
//! - Encapsulates collector registration to keep the public API small.
//! - Exposes only the counters the fetch engine and poll loop report.

use std::sync::Arc;

use prometheus::{Encoder, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};

use crate::error::{CollectorStage, Result, TelemetryError};

/// Outcome label recorded for each engine drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriveOutcomeLabel {
    /// Nothing to do for the request.
    Skipped,
    /// Status persisted and rendered.
    Updated,
    /// The download finished during this drive.
    Completed,
    /// The daemon no longer knew the download; the request was removed.
    Removed,
    /// The drive returned an error.
    Failed,
}

impl DriveOutcomeLabel {
    /// Label value written to the `outcome` dimension.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Skipped => "skipped",
            Self::Updated => "updated",
            Self::Completed => "completed",
            Self::Removed => "removed",
            Self::Failed => "failed",
        }
    }
}

/// Prometheus-backed metrics registry shared across services.
#[derive(Clone)]
pub struct Metrics {
    inner: Arc<MetricsInner>,
}

struct MetricsInner {
    registry: Registry,
    drives_total: IntCounterVec,
    completions_total: IntCounter,
    lookup_misses_total: IntCounter,
    notification_failures_total: IntCounterVec,
    requests_in_progress: IntGauge,
}

/// Snapshot of selected gauges and counters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricsSnapshot {
    /// Requests the last poll tick found in progress.
    pub requests_in_progress: i64,
    /// Completion mentions sent.
    pub completions_total: u64,
    /// Requests removed after the daemon lost their download.
    pub lookup_misses_total: u64,
}

impl Metrics {
    /// Construct a new metrics registry with the standard collectors registered.
    ///
    /// # Errors
    ///
    /// Returns an error if any of the Prometheus collectors cannot be
    /// built or registered.
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let drives_total = IntCounterVec::new(
            Opts::new("harvest_drives_total", "Engine drives by outcome"),
            &["outcome"],
        )
        .map_err(collector_err("harvest_drives_total"))?;
        let completions_total = IntCounter::with_opts(Opts::new(
            "harvest_completions_total",
            "Downloads that finished and notified the requester",
        ))
        .map_err(collector_err("harvest_completions_total"))?;
        let lookup_misses_total = IntCounter::with_opts(Opts::new(
            "harvest_lookup_misses_total",
            "Requests removed because the daemon no longer knew the download",
        ))
        .map_err(collector_err("harvest_lookup_misses_total"))?;
        let notification_failures_total = IntCounterVec::new(
            Opts::new(
                "harvest_notification_failures_total",
                "Chat notification calls that failed",
            ),
            &["operation"],
        )
        .map_err(collector_err("harvest_notification_failures_total"))?;
        let requests_in_progress = IntGauge::with_opts(Opts::new(
            "harvest_requests_in_progress",
            "Requests found in progress on the latest poll tick",
        ))
        .map_err(collector_err("harvest_requests_in_progress"))?;

        register(&registry, "harvest_drives_total", drives_total.clone())?;
        register(
            &registry,
            "harvest_completions_total",
            completions_total.clone(),
        )?;
        register(
            &registry,
            "harvest_lookup_misses_total",
            lookup_misses_total.clone(),
        )?;
        register(
            &registry,
            "harvest_notification_failures_total",
            notification_failures_total.clone(),
        )?;
        register(
            &registry,
            "harvest_requests_in_progress",
            requests_in_progress.clone(),
        )?;

        Ok(Self {
            inner: Arc::new(MetricsInner {
                registry,
                drives_total,
                completions_total,
                lookup_misses_total,
                notification_failures_total,
                requests_in_progress,
            }),
        })
    }

    /// Increment the drive counter for the given outcome.
    pub fn inc_drive(&self, outcome: DriveOutcomeLabel) {
        self.inner
            .drives_total
            .with_label_values(&[outcome.as_str()])
            .inc();
    }

    /// Increment the completion counter.
    pub fn inc_completion(&self) {
        self.inner.completions_total.inc();
    }

    /// Increment the lookup miss counter.
    pub fn inc_lookup_miss(&self) {
        self.inner.lookup_misses_total.inc();
    }

    /// Increment the notification failure counter for a sink operation.
    pub fn inc_notification_failure(&self, operation: &str) {
        self.inner
            .notification_failures_total
            .with_label_values(&[operation])
            .inc();
    }

    /// Set the in-progress gauge.
    pub fn set_requests_in_progress(&self, count: usize) {
        self.inner
            .requests_in_progress
            .set(i64::try_from(count).unwrap_or(i64::MAX));
    }

    /// Render the metrics registry using the Prometheus text exposition format.
    ///
    /// # Errors
    ///
    /// Returns an error if the metrics cannot be encoded or if the encoded
    /// buffer is not valid UTF-8.
    pub fn render(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.inner.registry.gather();
        let mut buffer = Vec::new();
        encoder
            .encode(&metric_families, &mut buffer)
            .map_err(|source| TelemetryError::Exposition {
                source: source.into(),
            })?;
        String::from_utf8(buffer).map_err(|source| TelemetryError::Exposition {
            source: source.into(),
        })
    }

    /// Take a point-in-time snapshot of the most relevant gauges and counters.
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            requests_in_progress: self.inner.requests_in_progress.get(),
            completions_total: self.inner.completions_total.get(),
            lookup_misses_total: self.inner.lookup_misses_total.get(),
        }
    }

    /// Current count for one drive outcome.
    #[must_use]
    pub fn drive_count(&self, outcome: DriveOutcomeLabel) -> u64 {
        self.inner
            .drives_total
            .with_label_values(&[outcome.as_str()])
            .get()
    }
}

fn collector_err(name: &'static str) -> impl FnOnce(prometheus::Error) -> TelemetryError {
    move |source| TelemetryError::Collector {
        metric: name,
        stage: CollectorStage::Build,
        source,
    }
}

fn register<C>(registry: &Registry, name: &'static str, collector: C) -> Result<()>
where
    C: prometheus::core::Collector + 'static,
{
    registry
        .register(Box::new(collector))
        .map_err(|source| TelemetryError::Collector {
            metric: name,
            stage: CollectorStage::Register,
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metrics_snapshot_reflects_updates() -> Result<()> {
        let metrics = Metrics::new()?;
        metrics.inc_drive(DriveOutcomeLabel::Updated);
        metrics.inc_drive(DriveOutcomeLabel::Updated);
        metrics.inc_drive(DriveOutcomeLabel::Failed);
        metrics.inc_completion();
        metrics.inc_lookup_miss();
        metrics.inc_notification_failure("edit_message");
        metrics.set_requests_in_progress(3);

        assert_eq!(
            metrics.snapshot(),
            MetricsSnapshot {
                requests_in_progress: 3,
                completions_total: 1,
                lookup_misses_total: 1,
            }
        );
        assert_eq!(metrics.drive_count(DriveOutcomeLabel::Updated), 2);
        assert_eq!(metrics.drive_count(DriveOutcomeLabel::Removed), 0);

        let rendered = metrics.render()?;
        assert!(rendered.contains("harvest_drives_total{outcome=\"updated\"} 2"));
        assert!(rendered.contains("harvest_notification_failures_total"));
        Ok(())
    }

    #[test]
    fn registries_are_independent_per_instance() -> Result<()> {
        let first = Metrics::new()?;
        let second = Metrics::new()?;
        first.inc_completion();
        assert_eq!(second.snapshot().completions_total, 0);
        Ok(())
    }
}

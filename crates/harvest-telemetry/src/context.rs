//! Process-wide application span.

use tracing::span::EnteredSpan;

use crate::init::build_sha;

/// Keeps the `app` span entered until dropped, tagging every event with mode and build.
pub struct GlobalContextGuard {
    _span: EnteredSpan,
}

impl GlobalContextGuard {
    /// Enter the `app` span for `mode` (`run`, `drive`, ...).
    #[must_use]
    pub fn new(mode: &str) -> Self {
        let span = tracing::info_span!("app", mode, build_sha = build_sha());
        Self {
            _span: span.entered(),
        }
    }
}

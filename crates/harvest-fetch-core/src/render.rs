//! Chat payload rendering for search listings and download status.

use serde::{Deserialize, Serialize};

use crate::model::{Phase, SearchResult, TorrentStatus};

/// Divisor applied to the daemon's byte rate before it is shown as `MB/s`.
pub const RATE_DIVISOR: f64 = 10_000.0;

/// Accent colour applied to every embed the bot sends.
pub const PRIMARY_COLOR: u32 = 0x00F2_A541;

/// Single labelled value rendered inline in a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageField {
    /// Field label.
    pub name: String,
    /// Field value.
    pub value: String,
}

impl MessageField {
    fn new(name: &str, value: impl Into<String>) -> Self {
        Self {
            name: name.to_string(),
            value: value.into(),
        }
    }
}

/// Transport-neutral rich message body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessagePayload {
    /// Heading line.
    pub title: String,
    /// Optional body text.
    pub description: Option<String>,
    /// Inline fields shown beneath the body.
    pub fields: Vec<MessageField>,
}

/// Status message posted right after a user picks a candidate.
#[must_use]
pub fn initial_status(choice: &SearchResult) -> MessagePayload {
    MessagePayload {
        title: status_title(choice),
        description: Some(Phase::Verifying.label().to_string()),
        fields: Vec::new(),
    }
}

/// Replacement for a status message whose selection could not be recorded.
#[must_use]
pub fn selection_rejected(choice: &SearchResult) -> MessagePayload {
    MessagePayload {
        title: status_title(choice),
        description: Some("❌ Selection was not recorded.".to_string()),
        fields: Vec::new(),
    }
}

/// Status message reflecting the latest daemon snapshot.
///
/// `seeders_at_search_time` is the seeder count captured with the original search result.
#[must_use]
pub fn download_status(
    choice: &SearchResult,
    status: &TorrentStatus,
    seeders_at_search_time: u32,
) -> MessagePayload {
    let mut fields = vec![MessageField::new("Status", status.phase.label())];
    if status.phase == Phase::Downloading {
        fields.push(MessageField::new(
            "Progress",
            format_percent(status.progress_fraction),
        ));
        fields.push(MessageField::new(
            "Download Rate",
            format_rate(status.download_rate_bps),
        ));
        fields.push(MessageField::new(
            "# Peers",
            format!("{}/{seeders_at_search_time}", status.peer_count),
        ));
        fields.push(MessageField::new("ETA", format_eta(status.eta_seconds)));
    }

    MessagePayload {
        title: status_title(choice),
        description: None,
        fields,
    }
}

/// Listing of search candidates offered to the user.
#[must_use]
pub fn search_listing(query: &str, results: &[SearchResult]) -> MessagePayload {
    let description = if results.is_empty() {
        "No results.".to_string()
    } else {
        let entries = results
            .iter()
            .enumerate()
            .map(|(index, item)| {
                format!(
                    "**#{index}** (🌱{}, {})\n_{}_",
                    item.seeders, item.size, item.name
                )
            })
            .collect::<Vec<_>>()
            .join("\n\n");
        format!("Select option to download:\n\n{entries}")
    };

    MessagePayload {
        title: format!("❯ 🔍 \"{query}\""),
        description: Some(description),
        fields: Vec::new(),
    }
}

/// Text of the one-off completion mention.
#[must_use]
pub fn completion_text(name: &str) -> String {
    format!("**{name}** has finished downloading 🌾")
}

/// Render a completed fraction as a percentage with two decimals.
#[must_use]
pub fn format_percent(fraction: f64) -> String {
    format!("{:.2}%", fraction * 100.0)
}

/// Render a daemon byte rate using the fixed [`RATE_DIVISOR`] scaling.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn format_rate(bytes_per_sec: u64) -> String {
    format!("{:.2} MB/s", bytes_per_sec as f64 / RATE_DIVISOR)
}

/// Render seconds as `HH:MM:SS`; hours are not wrapped at 24.
///
/// Negative values (unknown or unbounded ETA) render as `--:--:--`.
#[must_use]
pub fn format_eta(seconds: i64) -> String {
    if seconds < 0 {
        return "--:--:--".to_string();
    }
    let hours = seconds / 3_600;
    let minutes = (seconds % 3_600) / 60;
    let secs = seconds % 60;
    format!("{hours:02}:{minutes:02}:{secs:02}")
}

fn status_title(choice: &SearchResult) -> String {
    format!("🌾 {}", choice.name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn choice() -> SearchResult {
        SearchResult {
            name: "Big Buck Bunny".to_string(),
            size: "700 MiB".to_string(),
            seeders: 40,
            magnet_uri: "magnet:?xt=urn:btih:bunny".to_string(),
        }
    }

    fn status(phase: Phase) -> TorrentStatus {
        TorrentStatus {
            in_progress: phase != Phase::Seeding,
            phase,
            progress_fraction: 0.4567,
            download_rate_bps: 123_456,
            peer_count: 7,
            eta_seconds: 3_725,
        }
    }

    #[test]
    fn downloading_status_renders_all_fields() {
        let payload = download_status(&choice(), &status(Phase::Downloading), 40);
        assert_eq!(payload.title, "🌾 Big Buck Bunny");
        let rendered: Vec<(&str, &str)> = payload
            .fields
            .iter()
            .map(|field| (field.name.as_str(), field.value.as_str()))
            .collect();
        assert_eq!(
            rendered,
            vec![
                ("Status", "Downloading"),
                ("Progress", "45.67%"),
                ("Download Rate", "12.35 MB/s"),
                ("# Peers", "7/40"),
                ("ETA", "01:02:05"),
            ]
        );
    }

    #[test]
    fn non_downloading_phases_render_status_only() {
        for phase in [Phase::Verifying, Phase::Queued, Phase::Seeding] {
            let payload = download_status(&choice(), &status(phase), 40);
            assert_eq!(payload.fields.len(), 1);
            assert_eq!(payload.fields[0].value, phase.label());
        }
    }

    #[test]
    fn eta_formatting_handles_edges() {
        assert_eq!(format_eta(0), "00:00:00");
        assert_eq!(format_eta(59), "00:00:59");
        assert_eq!(format_eta(100_000), "27:46:40");
        assert_eq!(format_eta(-1), "--:--:--");
    }

    #[test]
    fn rate_and_percent_round_to_two_decimals() {
        assert_eq!(format_rate(0), "0.00 MB/s");
        assert_eq!(format_rate(123_456), "12.35 MB/s");
        assert_eq!(format_percent(1.0), "100.00%");
        assert_eq!(format_percent(0.4567), "45.67%");
    }

    #[test]
    fn search_listing_enumerates_results() {
        let payload = search_listing("bunny", &[choice()]);
        assert_eq!(payload.title, "❯ 🔍 \"bunny\"");
        let description = payload.description.unwrap_or_default();
        assert!(description.starts_with("Select option to download:"));
        assert!(description.contains("**#0** (🌱40, 700 MiB)\n_Big Buck Bunny_"));

        let empty = search_listing("nothing", &[]);
        assert_eq!(empty.description.as_deref(), Some("No results."));
    }

    #[test]
    fn rejected_selection_keeps_the_title() {
        let payload = selection_rejected(&choice());
        assert_eq!(payload.title, "🌾 Big Buck Bunny");
        assert_eq!(
            payload.description.as_deref(),
            Some("❌ Selection was not recorded.")
        );
    }

    #[test]
    fn initial_status_uses_verifying_label() {
        let payload = initial_status(&choice());
        assert_eq!(payload.description.as_deref(), Some("🤔 Verifying..."));
        assert!(payload.fields.is_empty());
    }
}

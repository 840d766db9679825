//! Test fixtures and environment helpers.

use std::path::Path;
use std::process::Command;

use harvest_fetch_core::{
    DaemonId, DaemonTorrent, FetchRequest, Phase, Requester, SearchResult, TorrentRecord,
    TorrentStatus,
};

/// Returns `true` if a Docker daemon is reachable for integration tests.
#[must_use]
pub fn docker_available() -> bool {
    docker_available_with_host(std::env::var("DOCKER_HOST").ok())
}

fn docker_available_with_host(host: Option<String>) -> bool {
    if let Some(host) = host {
        if let Some(path) = host.strip_prefix("unix://") {
            return Path::new(path).exists();
        }
        return true;
    }

    Path::new("/var/run/docker.sock").exists()
        || Command::new("docker")
            .args(["info"])
            .output()
            .map(|output| output.status.success())
            .unwrap_or(false)
}

/// Search candidate with a deterministic magnet derived from `name`.
#[must_use]
pub fn search_result(name: &str, seeders: u32) -> SearchResult {
    SearchResult {
        name: name.to_string(),
        size: "1.2 GiB".to_string(),
        seeders,
        magnet_uri: format!("magnet:?xt=urn:btih:{name}"),
    }
}

/// Fresh request in the asking-user state with `count` candidates.
#[must_use]
pub fn asking_request(count: usize) -> FetchRequest {
    let results = (0..count)
        .map(|index| search_result(&format!("candidate-{index}"), 10))
        .collect();
    FetchRequest::new(
        Requester {
            author_id: "user-1".to_string(),
            channel_id: "channel-1".to_string(),
        },
        "request-msg",
        "list-msg",
        results,
    )
}

/// Request with a recorded choice and status message but no daemon handle yet.
#[must_use]
pub fn selected_request() -> FetchRequest {
    let mut request = asking_request(3);
    request.choice = Some(request.search_results[0].clone());
    request.message_refs.status_message_id = Some("status-msg".to_string());
    request
}

/// Request that the daemon is already working on.
#[must_use]
pub fn downloading_request(daemon_id: DaemonId) -> FetchRequest {
    let mut request = selected_request();
    request.torrent = Some(TorrentRecord {
        daemon_id,
        name: "candidate-0".to_string(),
        hash: format!("hash-{daemon_id}"),
        status: TorrentStatus {
            in_progress: true,
            phase: Phase::Downloading,
            progress_fraction: 0.1,
            download_rate_bps: 5_000,
            peer_count: 2,
            eta_seconds: 600,
        },
    });
    request
}

/// Daemon snapshot with the given Transmission status code.
#[must_use]
pub fn daemon_torrent(id: DaemonId, status_code: i64) -> DaemonTorrent {
    DaemonTorrent {
        id,
        name: "candidate-0".to_string(),
        hash: format!("hash-{id}"),
        status_code,
        percent_done: if status_code == 6 { 1.0 } else { 0.25 },
        rate_download: 250_000,
        peers_sending_to_us: 4,
        eta: if status_code == 6 { -1 } else { 1_800 },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn docker_available_respects_unix_socket_env() {
        assert!(!docker_available_with_host(Some(
            "unix:///definitely/missing.sock".into()
        )));
    }

    #[test]
    fn docker_available_accepts_tcp_env() {
        assert!(docker_available_with_host(Some(
            "tcp://127.0.0.1:2375".into()
        )));
    }

    #[test]
    fn request_fixtures_cover_each_state() {
        assert!(asking_request(2).choice.is_none());
        let selected = selected_request();
        assert!(selected.choice.is_some() && selected.torrent.is_none());
        assert!(downloading_request(9).is_in_progress());
        assert_eq!(daemon_torrent(9, 6).eta, -1);
    }
}

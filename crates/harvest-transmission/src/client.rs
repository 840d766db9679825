//! HTTP client for the Transmission RPC endpoint.

use std::sync::{PoisonError, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use harvest_fetch_core::{DaemonHandle, DaemonId, DaemonTorrent, DownloadDaemon};
use reqwest::{Client, Response, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info};
use url::Url;

use crate::error::{TransmissionError, TransmissionResult};
use crate::rpc::{
    AddArguments, AddedTorrents, GetArguments, METHOD_TORRENT_ADD, METHOD_TORRENT_GET,
    RpcRequest, RpcResponse, STATUS_FIELDS, TorrentList,
};

/// Header carrying the CSRF session token issued by Transmission.
pub const SESSION_HEADER: &str = "X-Transmission-Session-Id";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const RPC_SUCCESS: &str = "success";

/// Connection settings for a Transmission daemon.
#[derive(Debug, Clone)]
pub struct TransmissionConfig {
    /// Full RPC endpoint, e.g. `http://127.0.0.1:9091/transmission/rpc`.
    pub endpoint: Url,
    /// Basic auth username; auth is skipped when empty.
    pub username: String,
    /// Basic auth password.
    pub password: String,
    /// Directory passed with every add request.
    pub download_dir: String,
}

/// Transmission RPC client implementing [`DownloadDaemon`].
pub struct TransmissionClient {
    http: Client,
    config: TransmissionConfig,
    session_id: RwLock<Option<String>>,
}

impl TransmissionClient {
    /// Build a client for the given daemon.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(config: TransmissionConfig) -> TransmissionResult<Self> {
        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|source| TransmissionError::ClientBuild { source })?;
        Ok(Self {
            http,
            config,
            session_id: RwLock::new(None),
        })
    }

    /// Submit a magnet or torrent URL; duplicates resolve to the existing torrent id.
    ///
    /// # Errors
    ///
    /// Returns an error if the RPC call fails or the daemon rejects the torrent.
    pub async fn add_torrent(&self, uri: &str) -> TransmissionResult<DaemonId> {
        let arguments = AddArguments {
            filename: uri,
            download_dir: &self.config.download_dir,
        };
        let added: AddedTorrents = self.call(METHOD_TORRENT_ADD, &arguments).await?;
        match (added.added, added.duplicate) {
            (Some(torrent), _) => Ok(torrent.id),
            (None, Some(torrent)) => {
                info!(
                    daemon_id = torrent.id,
                    name = torrent.name.as_deref().unwrap_or_default(),
                    "torrent already present in daemon"
                );
                Ok(torrent.id)
            }
            (None, None) => Err(TransmissionError::MissingArguments {
                method: METHOD_TORRENT_ADD,
            }),
        }
    }

    /// Fetch the status fields for one torrent; `None` when the daemon does not know it.
    ///
    /// # Errors
    ///
    /// Returns an error if the RPC call fails.
    pub async fn torrent_status(&self, id: DaemonId) -> TransmissionResult<Option<DaemonTorrent>> {
        let arguments = GetArguments {
            ids: [id],
            fields: &STATUS_FIELDS,
        };
        let list: TorrentList = self.call(METHOD_TORRENT_GET, &arguments).await?;
        Ok(list
            .torrents
            .into_iter()
            .find(|torrent| torrent.id == id)
            .map(|torrent| DaemonTorrent {
                id: torrent.id,
                name: torrent.name,
                hash: torrent.hash_string,
                status_code: torrent.status,
                percent_done: torrent.percent_done,
                rate_download: torrent.rate_download,
                peers_sending_to_us: torrent.peers_sending_to_us,
                eta: torrent.eta,
            }))
    }

    async fn call<A, R>(&self, method: &'static str, arguments: &A) -> TransmissionResult<R>
    where
        A: Serialize + Sync,
        R: DeserializeOwned,
    {
        let body = RpcRequest { method, arguments };
        let mut response = self.send(method, &body).await?;
        if response.status() == StatusCode::CONFLICT {
            let session = response
                .headers()
                .get(SESSION_HEADER)
                .and_then(|value| value.to_str().ok())
                .map(ToOwned::to_owned)
                .ok_or(TransmissionError::SessionHandshake { method })?;
            debug!(method, "refreshing transmission session id");
            *self
                .session_id
                .write()
                .unwrap_or_else(PoisonError::into_inner) = Some(session);
            response = self.send(method, &body).await?;
        }

        let response = response
            .error_for_status()
            .map_err(|source| TransmissionError::Http { method, source })?;
        let envelope: RpcResponse<R> = response
            .json()
            .await
            .map_err(|source| TransmissionError::Http { method, source })?;
        if envelope.result != RPC_SUCCESS {
            return Err(TransmissionError::Rpc {
                method,
                result: envelope.result,
            });
        }
        envelope
            .arguments
            .ok_or(TransmissionError::MissingArguments { method })
    }

    async fn send<B>(&self, method: &'static str, body: &B) -> TransmissionResult<Response>
    where
        B: Serialize + Sync,
    {
        let session = self
            .session_id
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        let mut request = self.http.post(self.config.endpoint.clone()).json(body);
        if let Some(session) = session {
            request = request.header(SESSION_HEADER, session);
        }
        if !self.config.username.is_empty() {
            request = request.basic_auth(&self.config.username, Some(&self.config.password));
        }
        request
            .send()
            .await
            .map_err(|source| TransmissionError::Http { method, source })
    }
}

#[async_trait]
impl DownloadDaemon for TransmissionClient {
    async fn add_uri(&self, uri: &str) -> anyhow::Result<DaemonHandle> {
        let id = self.add_torrent(uri).await?;
        Ok(DaemonHandle { id })
    }

    async fn get_status(&self, id: DaemonId) -> anyhow::Result<Option<DaemonTorrent>> {
        Ok(self.torrent_status(id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use httpmock::MockServer;
    use httpmock::prelude::*;
    use serde_json::json;

    const RPC_PATH: &str = "/transmission/rpc";

    fn client_for(server: &MockServer, username: &str) -> Result<TransmissionClient> {
        let endpoint = Url::parse(&format!("{}{RPC_PATH}", server.base_url()))?;
        Ok(TransmissionClient::new(TransmissionConfig {
            endpoint,
            username: username.to_string(),
            password: "secret".to_string(),
            download_dir: "/downloads".to_string(),
        })?)
    }

    #[tokio::test]
    async fn session_conflict_is_retried_with_issued_token() -> Result<()> {
        let server = MockServer::start_async().await;
        let accepted = server.mock(|when, then| {
            when.method(POST)
                .path(RPC_PATH)
                .header(SESSION_HEADER, "token-1")
                .json_body(json!({
                    "method": "torrent-add",
                    "arguments": {
                        "filename": "magnet:?xt=urn:btih:demo",
                        "download-dir": "/downloads"
                    }
                }));
            then.status(200)
                .header("content-type", "application/json")
                .json_body(json!({
                    "result": "success",
                    "arguments": { "torrent-added": { "id": 7, "name": "demo", "hashString": "abc" } }
                }));
        });
        let conflict = server.mock(|when, then| {
            when.method(POST).path(RPC_PATH);
            then.status(409).header(SESSION_HEADER, "token-1");
        });

        let client = client_for(&server, "")?;
        let handle = client.add_uri("magnet:?xt=urn:btih:demo").await?;

        assert_eq!(handle.id, 7);
        conflict.assert_calls(1);
        accepted.assert_calls(1);
        Ok(())
    }

    #[tokio::test]
    async fn duplicate_add_resolves_to_existing_torrent() -> Result<()> {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path(RPC_PATH)
                .header("authorization", "Basic YWRtaW46c2VjcmV0");
            then.status(200)
                .header("content-type", "application/json")
                .json_body(json!({
                    "result": "success",
                    "arguments": { "torrent-duplicate": { "id": 3, "name": "demo", "hashString": "abc" } }
                }));
        });

        let client = client_for(&server, "admin")?;
        assert_eq!(client.add_torrent("magnet:?xt=urn:btih:demo").await?, 3);
        mock.assert();
        Ok(())
    }

    #[tokio::test]
    async fn torrent_get_maps_status_fields() -> Result<()> {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.method(POST).path(RPC_PATH).json_body(json!({
                "method": "torrent-get",
                "arguments": { "ids": [7], "fields": STATUS_FIELDS }
            }));
            then.status(200)
                .header("content-type", "application/json")
                .json_body(json!({
                    "result": "success",
                    "arguments": { "torrents": [{
                        "id": 7,
                        "name": "demo",
                        "hashString": "abc",
                        "status": 4,
                        "percentDone": 0.4567,
                        "rateDownload": 123_456,
                        "peersSendingToUs": 3,
                        "eta": 120
                    }] }
                }));
        });

        let client = client_for(&server, "")?;
        let status = client.get_status(7).await?.expect("torrent reported");
        assert_eq!(status.status_code, 4);
        assert_eq!(status.rate_download, 123_456);
        assert_eq!(status.peers_sending_to_us, 3);
        assert_eq!(status.hash, "abc");
        mock.assert();
        Ok(())
    }

    #[tokio::test]
    async fn unknown_torrent_reports_absent() -> Result<()> {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(POST).path(RPC_PATH);
            then.status(200)
                .header("content-type", "application/json")
                .json_body(json!({ "result": "success", "arguments": { "torrents": [] } }));
        });

        let client = client_for(&server, "")?;
        assert!(client.get_status(99).await?.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn rpc_failure_result_is_an_error() -> Result<()> {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(POST).path(RPC_PATH);
            then.status(200)
                .header("content-type", "application/json")
                .json_body(json!({ "result": "invalid or corrupt torrent file", "arguments": {} }));
        });

        let client = client_for(&server, "")?;
        let err = client
            .add_torrent("not-a-magnet")
            .await
            .expect_err("daemon rejected torrent");
        assert!(matches!(
            err,
            TransmissionError::Rpc { method: "torrent-add", ref result } if result.starts_with("invalid")
        ));
        Ok(())
    }
}

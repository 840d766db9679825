//! Wire types for the Transmission JSON RPC protocol.

use serde::{Deserialize, Serialize};

pub(crate) const METHOD_TORRENT_ADD: &str = "torrent-add";
pub(crate) const METHOD_TORRENT_GET: &str = "torrent-get";

pub(crate) const STATUS_FIELDS: [&str; 8] = [
    "id",
    "name",
    "hashString",
    "status",
    "percentDone",
    "rateDownload",
    "peersSendingToUs",
    "eta",
];

#[derive(Debug, Serialize)]
pub(crate) struct RpcRequest<'a, A> {
    pub(crate) method: &'static str,
    pub(crate) arguments: &'a A,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RpcResponse<R> {
    pub(crate) result: String,
    pub(crate) arguments: Option<R>,
}

#[derive(Debug, Serialize)]
pub(crate) struct AddArguments<'a> {
    pub(crate) filename: &'a str,
    #[serde(rename = "download-dir")]
    pub(crate) download_dir: &'a str,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AddedTorrents {
    #[serde(rename = "torrent-added")]
    pub(crate) added: Option<TorrentRef>,
    #[serde(rename = "torrent-duplicate")]
    pub(crate) duplicate: Option<TorrentRef>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TorrentRef {
    pub(crate) id: i64,
    #[serde(default)]
    pub(crate) name: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct GetArguments<'a> {
    pub(crate) ids: [i64; 1],
    pub(crate) fields: &'a [&'a str],
}

#[derive(Debug, Deserialize)]
pub(crate) struct TorrentList {
    pub(crate) torrents: Vec<TorrentFields>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct TorrentFields {
    pub(crate) id: i64,
    #[serde(default)]
    pub(crate) name: String,
    #[serde(default)]
    pub(crate) hash_string: String,
    pub(crate) status: i64,
    #[serde(default)]
    pub(crate) percent_done: f64,
    #[serde(default)]
    pub(crate) rate_download: u64,
    #[serde(default)]
    pub(crate) peers_sending_to_us: u32,
    #[serde(default)]
    pub(crate) eta: i64,
}

//! Fallback values applied when optional variables are unset.

pub(crate) const DISCORD_API_URL: &str = "https://discord.com/api/v10";
pub(crate) const TRANSMISSION_HOST: &str = "127.0.0.1";
pub(crate) const TRANSMISSION_PORT: &str = "9091";
pub(crate) const TRANSMISSION_SSL: &str = "false";
pub(crate) const TRANSMISSION_URL: &str = "/transmission/rpc";
pub(crate) const DOWNLOAD_DIR_PATH: &str = "./dev-resource-dl";
/// Five gigabytes.
pub(crate) const DOWNLOAD_DIR_MAX_BYTES: &str = "5368706371";
pub(crate) const DATABASE_URL: &str = "postgres://127.0.0.1/harvest";
pub(crate) const POLL_INTERVAL_MS: &str = "1000";
pub(crate) const ENV: &str = "development";
pub(crate) const LOG_LEVEL: &str = "info";

//! Typed configuration consumed by the application bootstrap.

use std::time::Duration;

use url::Url;

use crate::error::{ConfigError, ConfigResult};

/// Sentinel channel value that disables channel filtering.
pub const NOT_CHECKING: &str = "NOT_CHECKING";

/// Environment name that enables production guard rails.
pub const PRODUCTION: &str = "production";

/// Which channels the bot listens to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelFilter {
    /// Every channel is accepted.
    Any,
    /// Only the given channel is accepted.
    Only(String),
}

impl ChannelFilter {
    /// Interpret a raw channel setting.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        if raw == NOT_CHECKING {
            Self::Any
        } else {
            Self::Only(raw.to_string())
        }
    }

    /// Whether messages from `channel_id` should be handled.
    #[must_use]
    pub fn allows(&self, channel_id: &str) -> bool {
        match self {
            Self::Any => true,
            Self::Only(expected) => expected == channel_id,
        }
    }
}

/// Discord API credentials and routing.
#[derive(Debug, Clone)]
pub struct DiscordSettings {
    /// Bot token.
    pub token: String,
    /// Application client id, used in the invite link.
    pub client_id: String,
    /// REST API base URL.
    pub api_base: Url,
    /// Channel filter for incoming commands.
    pub channel: ChannelFilter,
}

/// Transmission daemon connection details.
#[derive(Debug, Clone)]
pub struct TransmissionSettings {
    /// Daemon host.
    pub host: String,
    /// Daemon RPC port.
    pub port: u16,
    /// Basic auth username; empty disables auth.
    pub username: String,
    /// Basic auth password.
    pub password: String,
    /// Whether to use HTTPS.
    pub use_ssl: bool,
    /// RPC path on the daemon.
    pub rpc_path: String,
}

impl TransmissionSettings {
    /// Full RPC endpoint URL.
    ///
    /// # Errors
    ///
    /// Returns an error if host, port and path do not form a valid URL.
    pub fn endpoint(&self) -> ConfigResult<Url> {
        let scheme = if self.use_ssl { "https" } else { "http" };
        let raw = format!("{scheme}://{}:{}{}", self.host, self.port, self.rpc_path);
        Url::parse(&raw).map_err(|_| ConfigError::InvalidValue {
            key: "HARVEST_TRANSMISSION_HOST".to_string(),
            value: raw,
            reason: "invalid_endpoint",
        })
    }
}

/// Where downloads land.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadDirSettings {
    /// Directory handed to the daemon with every add.
    pub path: String,
    /// Byte budget advertised for the directory.
    pub max_bytes: u64,
}

/// Log output format override.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogStyle {
    /// Structured JSON lines.
    Json,
    /// Human-readable output.
    Pretty,
}

/// Fully resolved application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Discord settings.
    pub discord: DiscordSettings,
    /// Transmission settings.
    pub transmission: TransmissionSettings,
    /// Download directory settings.
    pub download_dir: DownloadDirSettings,
    /// Postgres connection string.
    pub database_url: String,
    /// Interval between poll loop ticks.
    pub poll_interval: Duration,
    /// Deployment environment name.
    pub environment: String,
    /// Default log level when `RUST_LOG` is unset.
    pub log_level: String,
    /// Optional log format override.
    pub log_style: Option<LogStyle>,
}

impl AppConfig {
    /// Whether the bot runs in production.
    #[must_use]
    pub fn is_production(&self) -> bool {
        self.environment == PRODUCTION
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_filter_sentinel_accepts_everything() {
        let any = ChannelFilter::parse(NOT_CHECKING);
        assert_eq!(any, ChannelFilter::Any);
        assert!(any.allows("123"));

        let only = ChannelFilter::parse("42");
        assert!(only.allows("42"));
        assert!(!only.allows("43"));
    }

    #[test]
    fn endpoint_switches_scheme_on_ssl() -> ConfigResult<()> {
        let mut settings = TransmissionSettings {
            host: "seedbox".to_string(),
            port: 9091,
            username: String::new(),
            password: String::new(),
            use_ssl: false,
            rpc_path: "/transmission/rpc".to_string(),
        };
        assert_eq!(
            settings.endpoint()?.as_str(),
            "http://seedbox:9091/transmission/rpc"
        );
        settings.use_ssl = true;
        assert_eq!(
            settings.endpoint()?.as_str(),
            "https://seedbox:9091/transmission/rpc"
        );

        settings.host = "bad host".to_string();
        assert!(matches!(
            settings.endpoint(),
            Err(ConfigError::InvalidValue {
                reason: "invalid_endpoint",
                ..
            })
        ));
        Ok(())
    }
}

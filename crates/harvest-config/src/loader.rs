//! Resolve [`AppConfig`] from `HARVEST_*` variables.
//!
//! Lookups go through a caller-supplied function so tests never touch the process
//! environment. Every missing required variable is reported in a single error.

use crate::defaults;
use crate::error::{ConfigError, ConfigResult};
use crate::model::{
    AppConfig, ChannelFilter, DiscordSettings, DownloadDirSettings, TransmissionSettings,
};
use crate::validate::{
    parse_bool, parse_interval_ms, parse_log_style, parse_port, parse_u64, parse_url,
};

/// Prefix shared by every configuration variable.
pub const ENV_PREFIX: &str = "HARVEST_";

struct EnvReader<F> {
    lookup: F,
    missing: Vec<String>,
}

impl<F> EnvReader<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn key(name: &str) -> String {
        format!("{ENV_PREFIX}{name}")
    }

    fn get(&self, name: &str) -> Option<String> {
        (self.lookup)(&Self::key(name)).filter(|value| !value.is_empty())
    }

    fn required(&mut self, name: &str) -> String {
        self.get(name).unwrap_or_else(|| {
            self.missing.push(Self::key(name));
            String::new()
        })
    }

    fn or_default(&self, name: &str, default: &str) -> String {
        self.get(name).unwrap_or_else(|| default.to_string())
    }

    fn parsed<T>(
        &self,
        name: &str,
        default: &str,
        parse: impl Fn(&str, &str) -> ConfigResult<T>,
    ) -> ConfigResult<T> {
        parse(&Self::key(name), &self.or_default(name, default))
    }
}

impl AppConfig {
    /// Load configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns an error when required variables are missing, a value fails to parse, or a
    /// guard rail refuses the combination of values.
    pub fn from_env() -> ConfigResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// Empty values are treated as unset.
    ///
    /// # Errors
    ///
    /// Returns an error when required variables are missing, a value fails to parse, or a
    /// guard rail refuses the combination of values.
    pub fn from_lookup<F>(lookup: F) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut env = EnvReader {
            lookup,
            missing: Vec::new(),
        };

        let token = env.required("DISCORD_TOKEN");
        let client_id = env.required("DISCORD_CLIENT_ID");
        let channel = env.required("DISCORD_CHANNEL");
        if !env.missing.is_empty() {
            return Err(ConfigError::MissingVariables { names: env.missing });
        }

        let environment = env.or_default("ENV", defaults::ENV);
        let channel = ChannelFilter::parse(&channel);
        if channel == ChannelFilter::Any && environment == crate::model::PRODUCTION {
            return Err(ConfigError::GuardRail {
                key: EnvReader::<F>::key("DISCORD_CHANNEL"),
                reason: "channel_filter_disabled_in_production",
            });
        }

        let discord = DiscordSettings {
            token,
            client_id,
            api_base: env.parsed("DISCORD_API_URL", defaults::DISCORD_API_URL, parse_url)?,
            channel,
        };

        let transmission = TransmissionSettings {
            host: env.or_default("TRANSMISSION_HOST", defaults::TRANSMISSION_HOST),
            port: env.parsed("TRANSMISSION_PORT", defaults::TRANSMISSION_PORT, parse_port)?,
            username: env.or_default("TRANSMISSION_USERNAME", ""),
            password: env.or_default("TRANSMISSION_PASSWORD", ""),
            use_ssl: env.parsed("TRANSMISSION_SSL", defaults::TRANSMISSION_SSL, parse_bool)?,
            rpc_path: env.or_default("TRANSMISSION_URL", defaults::TRANSMISSION_URL),
        };

        let download_dir = DownloadDirSettings {
            path: env.or_default("DOWNLOAD_DIR_PATH", defaults::DOWNLOAD_DIR_PATH),
            max_bytes: env.parsed(
                "DOWNLOAD_DIR_MAX_BYTES",
                defaults::DOWNLOAD_DIR_MAX_BYTES,
                parse_u64,
            )?,
        };

        let log_style = env
            .get("LOG_FORMAT")
            .map(|raw| parse_log_style(&EnvReader::<F>::key("LOG_FORMAT"), &raw))
            .transpose()?;

        Ok(Self {
            discord,
            transmission,
            download_dir,
            database_url: env.or_default("DATABASE_URL", defaults::DATABASE_URL),
            poll_interval: env.parsed(
                "POLL_INTERVAL_MS",
                defaults::POLL_INTERVAL_MS,
                parse_interval_ms,
            )?,
            environment,
            log_level: env.or_default("LOG_LEVEL", defaults::LOG_LEVEL),
            log_style,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::time::Duration;

    use super::*;
    use crate::model::LogStyle;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let values: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| (format!("{ENV_PREFIX}{key}"), (*value).to_string()))
            .collect();
        move |key| values.get(key).cloned()
    }

    const REQUIRED: [(&str, &str); 3] = [
        ("DISCORD_TOKEN", "token"),
        ("DISCORD_CLIENT_ID", "client"),
        ("DISCORD_CHANNEL", "42"),
    ];

    #[test]
    fn defaults_apply_when_only_required_values_are_set() -> ConfigResult<()> {
        let config = AppConfig::from_lookup(lookup(&REQUIRED))?;
        assert_eq!(config.discord.channel, ChannelFilter::Only("42".into()));
        assert_eq!(
            config.discord.api_base.as_str(),
            "https://discord.com/api/v10"
        );
        assert_eq!(config.transmission.port, 9091);
        assert!(!config.transmission.use_ssl);
        assert_eq!(
            config.transmission.endpoint()?.as_str(),
            "http://127.0.0.1:9091/transmission/rpc"
        );
        assert_eq!(config.download_dir.path, "./dev-resource-dl");
        assert_eq!(config.download_dir.max_bytes, 5_368_706_371);
        assert_eq!(config.database_url, "postgres://127.0.0.1/harvest");
        assert_eq!(config.poll_interval, Duration::from_secs(1));
        assert_eq!(config.environment, "development");
        assert!(!config.is_production());
        assert_eq!(config.log_level, "info");
        assert!(config.log_style.is_none());
        Ok(())
    }

    #[test]
    fn all_missing_required_values_are_reported_together() {
        let err = AppConfig::from_lookup(lookup(&[("DISCORD_CLIENT_ID", "client")]))
            .expect_err("missing token and channel");
        assert_eq!(
            err,
            ConfigError::MissingVariables {
                names: vec![
                    "HARVEST_DISCORD_TOKEN".to_string(),
                    "HARVEST_DISCORD_CHANNEL".to_string(),
                ],
            }
        );
    }

    #[test]
    fn empty_values_count_as_missing() {
        let mut pairs = REQUIRED.to_vec();
        pairs[0] = ("DISCORD_TOKEN", "");
        assert!(matches!(
            AppConfig::from_lookup(lookup(&pairs)),
            Err(ConfigError::MissingVariables { names }) if names == ["HARVEST_DISCORD_TOKEN"]
        ));
    }

    #[test]
    fn overrides_are_parsed() -> ConfigResult<()> {
        let mut pairs = REQUIRED.to_vec();
        pairs.extend([
            ("TRANSMISSION_HOST", "seedbox.lan"),
            ("TRANSMISSION_PORT", "443"),
            ("TRANSMISSION_SSL", "true"),
            ("TRANSMISSION_USERNAME", "admin"),
            ("POLL_INTERVAL_MS", "2500"),
            ("LOG_FORMAT", "json"),
        ]);
        let config = AppConfig::from_lookup(lookup(&pairs))?;
        assert_eq!(
            config.transmission.endpoint()?.as_str(),
            "https://seedbox.lan/transmission/rpc"
        );
        assert_eq!(config.transmission.username, "admin");
        assert_eq!(config.poll_interval, Duration::from_millis(2_500));
        assert_eq!(config.log_style, Some(LogStyle::Json));
        Ok(())
    }

    #[test]
    fn invalid_values_name_the_variable() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push(("TRANSMISSION_SSL", "yes"));
        assert_eq!(
            AppConfig::from_lookup(lookup(&pairs)).err(),
            Some(ConfigError::InvalidValue {
                key: "HARVEST_TRANSMISSION_SSL".to_string(),
                value: "yes".to_string(),
                reason: "expected_true_or_false",
            })
        );
    }

    #[test]
    fn disabled_channel_filter_is_refused_in_production() {
        let pairs = [
            ("DISCORD_TOKEN", "token"),
            ("DISCORD_CLIENT_ID", "client"),
            ("DISCORD_CHANNEL", "NOT_CHECKING"),
            ("ENV", "production"),
        ];
        assert!(matches!(
            AppConfig::from_lookup(lookup(&pairs)),
            Err(ConfigError::GuardRail { .. })
        ));

        let development = AppConfig::from_lookup(lookup(&pairs[..3]))
            .map(|config| config.discord.channel);
        assert_eq!(development, Ok(ChannelFilter::Any));
    }
}

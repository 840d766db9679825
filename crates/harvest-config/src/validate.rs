//! Parsers for individual configuration values.

use std::time::Duration;

use url::Url;

use crate::error::{ConfigError, ConfigResult};
use crate::model::LogStyle;

fn invalid(key: &str, value: &str, reason: &'static str) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
        reason,
    }
}

/// Only the literal strings `true` and `false` are accepted.
pub(crate) fn parse_bool(key: &str, value: &str) -> ConfigResult<bool> {
    match value {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => Err(invalid(key, value, "expected_true_or_false")),
    }
}

pub(crate) fn parse_port(key: &str, value: &str) -> ConfigResult<u16> {
    match value.parse::<u16>() {
        Ok(0) => Err(invalid(key, value, "port_zero")),
        Ok(port) => Ok(port),
        Err(_) => Err(invalid(key, value, "expected_port")),
    }
}

pub(crate) fn parse_u64(key: &str, value: &str) -> ConfigResult<u64> {
    value
        .parse::<u64>()
        .map_err(|_| invalid(key, value, "expected_integer"))
}

pub(crate) fn parse_interval_ms(key: &str, value: &str) -> ConfigResult<Duration> {
    match parse_u64(key, value)? {
        0 => Err(invalid(key, value, "must_be_positive")),
        millis => Ok(Duration::from_millis(millis)),
    }
}

pub(crate) fn parse_url(key: &str, value: &str) -> ConfigResult<Url> {
    Url::parse(value).map_err(|_| invalid(key, value, "expected_url"))
}

pub(crate) fn parse_log_style(key: &str, value: &str) -> ConfigResult<LogStyle> {
    match value.to_ascii_lowercase().as_str() {
        "json" => Ok(LogStyle::Json),
        "pretty" => Ok(LogStyle::Pretty),
        _ => Err(invalid(key, value, "expected_json_or_pretty")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn booleans_are_strict() {
        assert_eq!(parse_bool("K", "true"), Ok(true));
        assert_eq!(parse_bool("K", "false"), Ok(false));
        for raw in ["TRUE", "1", "yes", ""] {
            assert!(parse_bool("K", raw).is_err(), "{raw} should be rejected");
        }
    }

    #[test]
    fn ports_reject_zero_and_overflow() {
        assert_eq!(parse_port("K", "9091"), Ok(9091));
        assert!(matches!(
            parse_port("K", "0"),
            Err(ConfigError::InvalidValue {
                reason: "port_zero",
                ..
            })
        ));
        assert!(parse_port("K", "70000").is_err());
    }

    #[test]
    fn interval_must_be_positive() {
        assert_eq!(
            parse_interval_ms("K", "250"),
            Ok(Duration::from_millis(250))
        );
        assert!(parse_interval_ms("K", "0").is_err());
        assert!(parse_interval_ms("K", "-5").is_err());
    }

    #[test]
    fn log_style_is_case_insensitive() {
        assert_eq!(parse_log_style("K", "JSON"), Ok(LogStyle::Json));
        assert_eq!(parse_log_style("K", "pretty"), Ok(LogStyle::Pretty));
        assert!(parse_log_style("K", "xml").is_err());
    }
}

use std::str::FromStr;
use std::time::Duration;

use clinker_core::stage::FINAL_STAGE_MARKER;

use crate::fetcher::RetryConfig;
use crate::poller::DEFAULT_POLL_INTERVAL;

/// Default optimizer API base URL for local development.
pub const DEFAULT_API_URL: &str = "http://localhost:8181/api/v2";

/// Client configuration loaded from environment variables.
///
/// All fields have defaults that match the production optimizer; only
/// the base URL normally needs overriding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Base URL including the version prefix.
    pub api_url: String,
    /// Pause between progress polls.
    pub poll_interval: Duration,
    /// Result retrieval retry budget.
    pub retry: RetryConfig,
    /// Stage label that, at fraction `1.0`, marks the job finished.
    pub final_stage_marker: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            retry: RetryConfig::default(),
            final_stage_marker: FINAL_STAGE_MARKER.to_string(),
        }
    }
}

/// A variable was set but unusable.
#[derive(Debug, thiserror::Error)]
#[error("Invalid value for {var} ({value:?}): {reason}")]
pub struct ConfigError {
    pub var: &'static str,
    pub value: String,
    pub reason: String,
}

impl ClientConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                 | Default                            |
    /// |-------------------------|------------------------------------|
    /// | `OPTIMIZER_API_URL`     | `http://localhost:8181/api/v2`     |
    /// | `POLL_INTERVAL_MS`      | `1000`                             |
    /// | `RESULT_MAX_ATTEMPTS`   | `5`                                |
    /// | `RESULT_RETRY_DELAY_MS` | `3000`                             |
    /// | `OPTIMIZER_FINAL_STAGE` | `Stage 3: Finding lower KH ratios` |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let api_url = lookup("OPTIMIZER_API_URL").unwrap_or(defaults.api_url);

        let poll_interval_ms: u64 = parse_var(
            &lookup,
            "POLL_INTERVAL_MS",
            defaults.poll_interval.as_millis() as u64,
        )?;
        if poll_interval_ms == 0 {
            return Err(ConfigError {
                var: "POLL_INTERVAL_MS",
                value: "0".into(),
                reason: "must be greater than zero".into(),
            });
        }

        let max_attempts: u32 =
            parse_var(&lookup, "RESULT_MAX_ATTEMPTS", defaults.retry.max_attempts)?;
        if max_attempts == 0 {
            return Err(ConfigError {
                var: "RESULT_MAX_ATTEMPTS",
                value: "0".into(),
                reason: "must be at least 1".into(),
            });
        }

        let retry_delay_ms: u64 = parse_var(
            &lookup,
            "RESULT_RETRY_DELAY_MS",
            defaults.retry.delay.as_millis() as u64,
        )?;

        let final_stage_marker =
            lookup("OPTIMIZER_FINAL_STAGE").unwrap_or(defaults.final_stage_marker);

        Ok(Self {
            api_url,
            poll_interval: Duration::from_millis(poll_interval_ms),
            retry: RetryConfig {
                max_attempts,
                delay: Duration::from_millis(retry_delay_ms),
            },
            final_stage_marker,
        })
    }
}

fn parse_var<F, T>(lookup: &F, var: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(var) {
        None => Ok(default),
        Some(value) => value.trim().parse().map_err(|e: T::Err| ConfigError {
            var,
            reason: e.to_string(),
            value,
        }),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |var| map.get(var).cloned()
    }

    #[test]
    fn empty_environment_yields_defaults() {
        let config = ClientConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, ClientConfig::default());
        assert_eq!(config.poll_interval, Duration::from_millis(1000));
        assert_eq!(config.retry.max_attempts, 5);
        assert_eq!(config.retry.delay, Duration::from_millis(3000));
    }

    #[test]
    fn overrides_are_applied() {
        let config = ClientConfig::from_lookup(lookup(&[
            ("OPTIMIZER_API_URL", "http://opt:9000/api/v2"),
            ("POLL_INTERVAL_MS", "250"),
            ("RESULT_MAX_ATTEMPTS", " 3 "),
            ("RESULT_RETRY_DELAY_MS", "10"),
            ("OPTIMIZER_FINAL_STAGE", "Done"),
        ]))
        .unwrap();
        assert_eq!(config.api_url, "http://opt:9000/api/v2");
        assert_eq!(config.poll_interval, Duration::from_millis(250));
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.retry.delay, Duration::from_millis(10));
        assert_eq!(config.final_stage_marker, "Done");
    }

    #[test]
    fn malformed_number_is_an_error() {
        let err = ClientConfig::from_lookup(lookup(&[("POLL_INTERVAL_MS", "fast")])).unwrap_err();
        assert_eq!(err.var, "POLL_INTERVAL_MS");
        assert_eq!(err.value, "fast");
    }

    #[test]
    fn zero_values_are_rejected() {
        assert!(ClientConfig::from_lookup(lookup(&[("POLL_INTERVAL_MS", "0")])).is_err());
        assert!(ClientConfig::from_lookup(lookup(&[("RESULT_MAX_ATTEMPTS", "0")])).is_err());
    }
}

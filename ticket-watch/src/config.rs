//! Process configuration read from the environment.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use tracing::warn;

use crate::calendar::DateFilter;
use crate::poller::PollerConfig;
use crate::purchase::{OrchestratorConfig, WebhookConfig};
use crate::query::QueryClientConfig;
use crate::stations::{StationCacheConfig, StationClientConfig};

const DEFAULT_BIND_ADDR: SocketAddr = SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 3000);
const DEFAULT_STATION_CACHE_PATH: &str = "station_cache.json";

/// A setting that was present but could not be parsed.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{var}: invalid value {value:?}: {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

/// Everything the binary needs to wire the service together.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub query_base_url: Option<String>,
    pub station_list_url: Option<String>,
    pub station_cache_path: PathBuf,
    /// Extra per-year calendar override files
    pub calendar_dir: Option<PathBuf>,
    pub poll_interval: Duration,
    pub candidate_days: usize,
    pub workdays_only: bool,
    pub max_concurrent_queries: usize,
    pub request_timeout_secs: u64,
    pub rpa_webhook_url: String,
    pub rpa_callback_url: String,
    pub rpa_sign_key: String,
    pub bind_addr: SocketAddr,
}

impl AppConfig {
    /// Read the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build from any variable lookup. Blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |var: &str| {
            lookup(var)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let config = Self {
            query_base_url: get("TICKET_QUERY_BASE_URL"),
            station_list_url: get("STATION_LIST_URL"),
            station_cache_path: get("STATION_CACHE_PATH")
                .unwrap_or_else(|| DEFAULT_STATION_CACHE_PATH.to_string())
                .into(),
            calendar_dir: get("CALENDAR_DIR").map(PathBuf::from),
            poll_interval: Duration::from_secs(parse(
                "POLL_INTERVAL_SECS",
                get("POLL_INTERVAL_SECS"),
                60,
            )?),
            candidate_days: parse("CANDIDATE_DAYS", get("CANDIDATE_DAYS"), 15)?,
            workdays_only: parse_bool("WORKDAYS_ONLY", get("WORKDAYS_ONLY"), true)?,
            max_concurrent_queries: parse(
                "MAX_CONCURRENT_QUERIES",
                get("MAX_CONCURRENT_QUERIES"),
                4,
            )?,
            request_timeout_secs: parse("REQUEST_TIMEOUT_SECS", get("REQUEST_TIMEOUT_SECS"), 30)?,
            rpa_webhook_url: get("RPA_WEBHOOK_URL").unwrap_or_default(),
            rpa_callback_url: get("RPA_CALLBACK_URL").unwrap_or_default(),
            rpa_sign_key: get("RPA_SIGN_KEY").unwrap_or_default(),
            bind_addr: parse("BIND_ADDR", get("BIND_ADDR"), DEFAULT_BIND_ADDR)?,
        };

        if config.poll_interval.is_zero() {
            return Err(ConfigError::Invalid {
                var: "POLL_INTERVAL_SECS",
                value: "0".into(),
                reason: "must be at least 1".into(),
            });
        }
        if config.max_concurrent_queries == 0 {
            return Err(ConfigError::Invalid {
                var: "MAX_CONCURRENT_QUERIES",
                value: "0".into(),
                reason: "must be at least 1".into(),
            });
        }

        Ok(config)
    }

    /// Log a warning for each unset automation provider setting.
    ///
    /// The service still starts; trigger attempts fail until they are set.
    pub fn warn_missing(&self) {
        for (var, value) in [
            ("RPA_WEBHOOK_URL", &self.rpa_webhook_url),
            ("RPA_CALLBACK_URL", &self.rpa_callback_url),
            ("RPA_SIGN_KEY", &self.rpa_sign_key),
        ] {
            if value.is_empty() {
                warn!(var, "not set, purchase triggers will fail");
            }
        }
    }

    pub fn query_client(&self) -> QueryClientConfig {
        let config = QueryClientConfig::new()
            .with_max_concurrent(self.max_concurrent_queries)
            .with_timeout(self.request_timeout_secs);
        match &self.query_base_url {
            Some(url) => config.with_base_url(url),
            None => config,
        }
    }

    pub fn station_client(&self) -> StationClientConfig {
        let config = StationClientConfig::new().with_timeout(self.request_timeout_secs);
        match &self.station_list_url {
            Some(url) => config.with_url(url),
            None => config,
        }
    }

    pub fn station_cache(&self) -> StationCacheConfig {
        StationCacheConfig::new(&self.station_cache_path)
    }

    pub fn poller(&self) -> PollerConfig {
        let filter = if self.workdays_only {
            DateFilter::WorkdaysOnly
        } else {
            DateFilter::AllDays
        };
        PollerConfig::default()
            .with_interval(self.poll_interval)
            .with_candidate_days(self.candidate_days)
            .with_filter(filter)
            .with_max_concurrent(self.max_concurrent_queries)
            .with_query_timeout(Duration::from_secs(self.request_timeout_secs))
    }

    pub fn webhook(&self) -> WebhookConfig {
        WebhookConfig::new(&self.rpa_webhook_url).with_timeout(self.request_timeout_secs)
    }

    pub fn orchestrator(&self) -> OrchestratorConfig {
        OrchestratorConfig::new(&self.rpa_callback_url, &self.rpa_sign_key)
            .with_send_timeout(Duration::from_secs(self.request_timeout_secs))
    }
}

fn parse<T>(var: &'static str, value: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match value {
        None => Ok(default),
        Some(value) => value.parse().map_err(|e: T::Err| ConfigError::Invalid {
            var,
            reason: e.to_string(),
            value,
        }),
    }
}

fn parse_bool(
    var: &'static str,
    value: Option<String>,
    default: bool,
) -> Result<bool, ConfigError> {
    let Some(value) = value else {
        return Ok(default);
    };
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::Invalid {
            var,
            value,
            reason: "expected true or false".into(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|var| vars.get(var).cloned())
    }

    #[test]
    fn defaults() {
        let config = config(&[]).unwrap();
        assert_eq!(config.poll_interval, Duration::from_secs(60));
        assert_eq!(config.candidate_days, 15);
        assert!(config.workdays_only);
        assert_eq!(config.max_concurrent_queries, 4);
        assert_eq!(config.request_timeout_secs, 30);
        assert_eq!(config.bind_addr.to_string(), "127.0.0.1:3000");
        assert!(config.rpa_sign_key.is_empty());
        assert!(config.calendar_dir.is_none());
        assert_eq!(config.poller().filter, DateFilter::WorkdaysOnly);
    }

    #[test]
    fn overrides() {
        let config = config(&[
            ("POLL_INTERVAL_SECS", "5"),
            ("CANDIDATE_DAYS", "7"),
            ("WORKDAYS_ONLY", "false"),
            ("BIND_ADDR", "0.0.0.0:8080"),
            ("TICKET_QUERY_BASE_URL", "http://localhost:9000"),
            ("RPA_SIGN_KEY", "  secret  "),
            ("CALENDAR_DIR", "/etc/calendar"),
        ])
        .unwrap();

        assert_eq!(config.poll_interval, Duration::from_secs(5));
        assert_eq!(config.poller().candidate_days, 7);
        assert_eq!(config.poller().filter, DateFilter::AllDays);
        assert_eq!(config.bind_addr.port(), 8080);
        assert_eq!(config.query_client().base_url, "http://localhost:9000");
        assert_eq!(config.orchestrator().sign_key, "secret");
        assert_eq!(config.calendar_dir, Some(PathBuf::from("/etc/calendar")));
    }

    #[test]
    fn blank_values_are_unset() {
        let config = config(&[("CANDIDATE_DAYS", "  "), ("RPA_WEBHOOK_URL", "")]).unwrap();
        assert_eq!(config.candidate_days, 15);
        assert!(config.webhook().url.is_empty());
    }

    #[test]
    fn invalid_values_are_errors() {
        let err = config(&[("CANDIDATE_DAYS", "lots")]).unwrap_err();
        assert!(err.to_string().starts_with("CANDIDATE_DAYS"));

        assert!(config(&[("WORKDAYS_ONLY", "maybe")]).is_err());
        assert!(config(&[("BIND_ADDR", "not an address")]).is_err());
        assert!(config(&[("POLL_INTERVAL_SECS", "0")]).is_err());
        assert!(config(&[("MAX_CONCURRENT_QUERIES", "0")]).is_err());
    }
}

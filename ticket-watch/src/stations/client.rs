//! Station list client.

use async_trait::async_trait;
use tracing::debug;

use crate::domain::{Station, StationCode};

use super::error::StationError;

/// Default URL of the provider's station list script.
const DEFAULT_URL: &str = "https://kyfw.12306.cn/otn/resources/js/framework/station_name.js";

/// Anything that can produce the full station list.
#[async_trait]
pub trait StationSource: Send + Sync {
    /// Fetch every known station.
    async fn fetch_all(&self) -> Result<Vec<Station>, StationError>;
}

/// Configuration for the station list client.
#[derive(Debug, Clone)]
pub struct StationClientConfig {
    /// URL of the station list document
    pub url: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl StationClientConfig {
    pub fn new() -> Self {
        Self {
            url: DEFAULT_URL.to_string(),
            timeout_secs: 30,
        }
    }

    /// Set a custom URL (for testing or a proxy).
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    /// Set request timeout.
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }
}

impl Default for StationClientConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// HTTP client for the provider's station list.
#[derive(Debug, Clone)]
pub struct StationClient {
    http: reqwest::Client,
    url: String,
}

impl StationClient {
    pub fn new(config: StationClientConfig) -> Result<Self, StationError> {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            url: config.url,
        })
    }
}

#[async_trait]
impl StationSource for StationClient {
    async fn fetch_all(&self) -> Result<Vec<Station>, StationError> {
        let response = self.http.get(&self.url).send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StationError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let body = response.text().await?;
        let stations = parse_station_list(&body)?;
        debug!(count = stations.len(), "fetched station list");
        Ok(stations)
    }
}

/// Serves a fixed station list, for offline runs and tests.
#[derive(Debug, Clone, Default)]
pub struct StaticStationSource {
    stations: Vec<Station>,
}

impl StaticStationSource {
    pub fn new(stations: Vec<Station>) -> Self {
        Self { stations }
    }
}

#[async_trait]
impl StationSource for StaticStationSource {
    async fn fetch_all(&self) -> Result<Vec<Station>, StationError> {
        if self.stations.is_empty() {
            return Err(StationError::Payload {
                message: "station list is empty".to_string(),
            });
        }
        Ok(self.stations.clone())
    }
}

/// Parse the station list script.
///
/// The document looks like `var station_names ='@bjb|北京北|VAP|beijingbei|bjb|0@...';`.
/// The quoted payload is split on `@`. Each entry is either the upstream
/// layout `acronym|name|CODE|pinyin|abbr|...` (five or more fields) or the
/// short layout `name|CODE|pinyin|acronym`. Entries with an invalid code
/// are dropped.
pub fn parse_station_list(body: &str) -> Result<Vec<Station>, StationError> {
    let payload = match (body.find('\''), body.rfind('\'')) {
        (Some(start), Some(end)) if end > start => &body[start + 1..end],
        _ if body.contains('|') => body.trim(),
        _ => {
            return Err(StationError::Payload {
                message: "no quoted station payload".to_string(),
            });
        }
    };

    let stations: Vec<Station> = payload
        .split('@')
        .filter(|entry| !entry.trim().is_empty())
        .filter_map(parse_entry)
        .collect();

    if stations.is_empty() {
        return Err(StationError::Payload {
            message: "station list is empty".to_string(),
        });
    }

    Ok(stations)
}

fn parse_entry(entry: &str) -> Option<Station> {
    let fields: Vec<&str> = entry.split('|').map(str::trim).collect();

    let (name, code, pinyin, acronym) = match fields.as_slice() {
        [acronym, name, code, pinyin, _abbr, ..] => (*name, *code, *pinyin, *acronym),
        [name, code, pinyin, acronym] => (*name, *code, *pinyin, *acronym),
        _ => return None,
    };

    let code = StationCode::parse(code).ok()?;
    if name.is_empty() {
        return None;
    }

    Some(Station {
        name: name.to_string(),
        code,
        pinyin: pinyin.to_string(),
        acronym: acronym.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_defaults() {
        let config = StationClientConfig::new();
        assert_eq!(config.url, DEFAULT_URL);
        assert_eq!(config.timeout_secs, 30);
    }

    #[test]
    fn config_builder() {
        let config = StationClientConfig::new()
            .with_url("http://localhost:8080/stations.js")
            .with_timeout(5);
        assert_eq!(config.url, "http://localhost:8080/stations.js");
        assert_eq!(config.timeout_secs, 5);
    }

    #[test]
    fn parse_upstream_layout() {
        let body = "var station_names ='@bjb|北京北|VAP|beijingbei|bjb|0@bjn|北京南|VNP|beijingnan|bjn|2@shh|上海|SHH|shanghai|sh|3';";
        let stations = parse_station_list(body).unwrap();

        assert_eq!(stations.len(), 3);
        assert_eq!(stations[1].name, "北京南");
        assert_eq!(stations[1].code.as_str(), "VNP");
        assert_eq!(stations[1].pinyin, "beijingnan");
        assert_eq!(stations[1].acronym, "bjn");
    }

    #[test]
    fn parse_short_layout() {
        let body = "'@北京|BJP|beijing|bj@上海|SHH|shanghai|sh'";
        let stations = parse_station_list(body).unwrap();

        assert_eq!(stations.len(), 2);
        assert_eq!(stations[0].name, "北京");
        assert_eq!(stations[0].code.as_str(), "BJP");
        assert_eq!(stations[0].acronym, "bj");
    }

    #[test]
    fn drops_invalid_entries() {
        let body = "'@北京|BJP|beijing|bj@坏站|bad|huaizhan|hz@only|two'";
        let stations = parse_station_list(body).unwrap();
        assert_eq!(stations.len(), 1);
        assert_eq!(stations[0].name, "北京");
    }

    #[test]
    fn empty_payload_is_an_error() {
        assert!(matches!(
            parse_station_list("var station_names ='';"),
            Err(StationError::Payload { .. })
        ));
        assert!(matches!(
            parse_station_list("<html>maintenance</html>"),
            Err(StationError::Payload { .. })
        ));
    }
}

//! Poller configuration.

use std::time::Duration;

use crate::calendar::DateFilter;

/// Default time between cycles.
const DEFAULT_INTERVAL: Duration = Duration::from_secs(60);

/// Default number of candidate dates per cycle.
const DEFAULT_CANDIDATE_DAYS: usize = 15;

/// Default number of dates queried at once.
const DEFAULT_MAX_CONCURRENT: usize = 4;

/// Default bound on one date's query.
const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(30);

/// Configuration for availability pollers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollerConfig {
    /// Time between the starts of two cycles.
    pub interval: Duration,
    /// Number of candidate dates queried per cycle.
    pub candidate_days: usize,
    /// Which dates count as candidates.
    pub filter: DateFilter,
    /// Maximum number of dates queried concurrently within one cycle.
    pub max_concurrent: usize,
    /// Bound on one date's transport query.
    pub query_timeout: Duration,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_INTERVAL,
            candidate_days: DEFAULT_CANDIDATE_DAYS,
            filter: DateFilter::WorkdaysOnly,
            max_concurrent: DEFAULT_MAX_CONCURRENT,
            query_timeout: DEFAULT_QUERY_TIMEOUT,
        }
    }
}

impl PollerConfig {
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_candidate_days(mut self, days: usize) -> Self {
        self.candidate_days = days;
        self
    }

    pub fn with_filter(mut self, filter: DateFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_max_concurrent(mut self, n: usize) -> Self {
        self.max_concurrent = n;
        self
    }

    pub fn with_query_timeout(mut self, timeout: Duration) -> Self {
        self.query_timeout = timeout;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = PollerConfig::default();
        assert_eq!(config.interval, Duration::from_secs(60));
        assert_eq!(config.candidate_days, 15);
        assert_eq!(config.filter, DateFilter::WorkdaysOnly);
        assert_eq!(config.max_concurrent, 4);
        assert_eq!(config.query_timeout, Duration::from_secs(30));
    }

    #[test]
    fn builder() {
        let config = PollerConfig::default()
            .with_interval(Duration::from_secs(5))
            .with_candidate_days(10)
            .with_filter(DateFilter::AllDays)
            .with_max_concurrent(2)
            .with_query_timeout(Duration::from_secs(3));
        assert_eq!(config.interval, Duration::from_secs(5));
        assert_eq!(config.candidate_days, 10);
        assert_eq!(config.filter, DateFilter::AllDays);
        assert_eq!(config.max_concurrent, 2);
        assert_eq!(config.query_timeout, Duration::from_secs(3));
    }
}

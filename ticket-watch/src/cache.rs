//! Caching layer for availability queries.
//!
//! Several users commonly watch the same route. Responses are cached for
//! a short TTL keyed by (date, from, to), and concurrent misses for one
//! key are coalesced into a single upstream call.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use moka::future::Cache as MokaCache;

use crate::domain::StationCode;
use crate::query::{QueryError, QueryTransport};

/// Cache key for one route query: (travel date, from, to).
type RouteKey = (NaiveDate, StationCode, StationCode);

/// Cached wire records for one route query.
type RouteEntry = Arc<Vec<String>>;

/// Configuration for the cache.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// TTL for cached entries.
    pub ttl: Duration,

    /// Maximum number of cached entries.
    pub max_capacity: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(20),
            max_capacity: 1000,
        }
    }
}

impl CacheConfig {
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }
}

/// Query transport with caching.
///
/// Wraps any `QueryTransport`. Failures are never cached.
pub struct CachedTransport {
    inner: Arc<dyn QueryTransport>,
    routes: MokaCache<RouteKey, RouteEntry>,
}

impl CachedTransport {
    pub fn new(inner: Arc<dyn QueryTransport>, config: &CacheConfig) -> Self {
        let routes = MokaCache::builder()
            .time_to_live(config.ttl)
            .max_capacity(config.max_capacity)
            .build();

        Self { inner, routes }
    }

    /// Get cache statistics (for monitoring).
    pub fn entry_count(&self) -> u64 {
        self.routes.entry_count()
    }

    /// Invalidate all cached entries.
    pub fn invalidate_all(&self) {
        self.routes.invalidate_all();
    }
}

#[async_trait]
impl QueryTransport for CachedTransport {
    async fn query(
        &self,
        date: NaiveDate,
        from: StationCode,
        to: StationCode,
    ) -> Result<Vec<String>, QueryError> {
        let inner = self.inner.clone();
        self.routes
            .try_get_with((date, from, to), async move {
                inner.query(date, from, to).await.map(Arc::new)
            })
            .await
            .map(|records| records.as_ref().clone())
            .map_err(unshare)
    }
}

/// Coalesced callers share one error; rebuild an owned one for each.
fn unshare(err: Arc<QueryError>) -> QueryError {
    match err.as_ref() {
        QueryError::Api { status, message } => QueryError::Api {
            status: *status,
            message: message.clone(),
        },
        QueryError::Json { message, body } => QueryError::Json {
            message: message.clone(),
            body: body.clone(),
        },
        QueryError::Timeout { secs } => QueryError::Timeout { secs: *secs },
        QueryError::Unavailable(message) => QueryError::Unavailable(message.clone()),
        QueryError::Http(e) => QueryError::Unavailable(e.to_string()),
    }
}

//! Disk-based cache for the station list.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::Station;

use super::error::StationError;

/// Default cache TTL: 24 hours.
const DEFAULT_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Station list as written to disk.
#[derive(Debug, Serialize, Deserialize)]
struct CachedStations {
    cached_at: DateTime<Utc>,
    stations: Vec<Station>,
}

/// Configuration for the station disk cache.
#[derive(Debug, Clone)]
pub struct StationCacheConfig {
    /// Path to the cache file.
    pub path: PathBuf,
    /// How long a cached list is trusted.
    pub ttl: Duration,
}

impl StationCacheConfig {
    /// Create a new cache config with the given path and default TTL (24 hours).
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ttl: DEFAULT_TTL,
        }
    }

    /// Set a custom TTL.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }
}

impl Default for StationCacheConfig {
    fn default() -> Self {
        Self::new("stations_cache.json")
    }
}

/// Disk cache for the station list, so restarts don't refetch it.
#[derive(Debug, Clone)]
pub struct StationCache {
    config: StationCacheConfig,
}

impl StationCache {
    pub fn new(config: StationCacheConfig) -> Self {
        Self { config }
    }

    /// Load stations if a fresh cache file exists.
    ///
    /// Returns `None` if the file is missing, unreadable or older than the TTL.
    pub fn load(&self) -> Option<Vec<Station>> {
        let contents = std::fs::read_to_string(&self.config.path).ok()?;
        let cached: CachedStations = serde_json::from_str(&contents).ok()?;

        let age = Utc::now().signed_duration_since(cached.cached_at).to_std().ok()?;
        if age >= self.config.ttl {
            debug!(path = %self.config.path.display(), "station cache expired");
            return None;
        }

        Some(cached.stations)
    }

    /// Write stations to disk, creating parent directories as needed.
    pub fn save(&self, stations: &[Station]) -> Result<(), StationError> {
        let cached = CachedStations {
            cached_at: Utc::now(),
            stations: stations.to_vec(),
        };

        if let Some(parent) = self.config.path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent).map_err(|e| StationError::Cache {
                message: format!("cannot create {}: {e}", parent.display()),
            })?;
        }

        let json = serde_json::to_string(&cached).map_err(|e| StationError::Cache {
            message: format!("cannot encode station list: {e}"),
        })?;

        std::fs::write(&self.config.path, json).map_err(|e| StationError::Cache {
            message: format!("cannot write {}: {e}", self.config.path.display()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.config.path
    }
}

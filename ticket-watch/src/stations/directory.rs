//! Station name resolution.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::domain::{Station, StationCode};

use super::cache::StationCache;
use super::client::StationSource;
use super::error::StationError;

#[derive(Default)]
struct Loaded {
    by_name: HashMap<String, Station>,
    /// Incremented on every successful (re)load; 0 means never loaded.
    generation: u64,
}

/// Shared station name → code lookup.
///
/// One instance is created per process (or per test) and cloned into
/// every poller. Lookups take a read lock and never block each other;
/// a reload swaps the whole map under the write lock. Reloads are
/// serialised so a burst of misses costs one upstream fetch.
#[derive(Clone)]
pub struct StationDirectory {
    state: Arc<RwLock<Loaded>>,
    reload: Arc<Mutex<()>>,
    source: Arc<dyn StationSource>,
    disk: Option<StationCache>,
}

impl StationDirectory {
    /// Create an empty directory. Nothing is fetched until first use.
    pub fn new(source: Arc<dyn StationSource>) -> Self {
        Self {
            state: Arc::new(RwLock::new(Loaded::default())),
            reload: Arc::new(Mutex::new(())),
            source,
            disk: None,
        }
    }

    /// Persist fetched lists to disk and prefer a fresh disk copy on `load`.
    pub fn with_disk_cache(mut self, cache: StationCache) -> Self {
        self.disk = Some(cache);
        self
    }

    /// Populate the directory if it has never been loaded.
    ///
    /// A fresh disk cache is used when available; otherwise the list is
    /// fetched from the source. Returns the number of stations known.
    pub async fn load(&self) -> Result<usize, StationError> {
        let _guard = self.reload.lock().await;
        {
            let state = self.state.read().await;
            if state.generation > 0 {
                return Ok(state.by_name.len());
            }
        }

        if let Some(stations) = self.disk.as_ref().and_then(StationCache::load) {
            debug!(count = stations.len(), "loaded stations from disk cache");
            return Ok(self.install(stations).await);
        }

        self.fetch_and_install().await
    }

    /// Refetch from the source, bypassing the disk cache.
    pub async fn refresh(&self) -> Result<usize, StationError> {
        let _guard = self.reload.lock().await;
        self.fetch_and_install().await
    }

    /// Resolve an exact, case-sensitive station name to its code.
    ///
    /// On a miss the list is reloaded once before giving up. Load
    /// failures are logged and reported as `NotFound`, so callers only
    /// ever need to skip the leg.
    pub async fn resolve(&self, name: &str) -> Result<StationCode, StationError> {
        let seen = {
            let state = self.state.read().await;
            if let Some(station) = state.by_name.get(name) {
                return Ok(station.code);
            }
            state.generation
        };

        let reloaded = if seen == 0 {
            self.load().await
        } else {
            self.reload_if_unchanged(seen).await
        };
        if let Err(e) = reloaded {
            warn!(station = name, error = %e, "station list reload failed");
        }

        let state = self.state.read().await;
        state
            .by_name
            .get(name)
            .map(|s| s.code)
            .ok_or_else(|| StationError::NotFound {
                name: name.to_string(),
            })
    }

    /// Stations whose name contains `query`, or whose pinyin or acronym
    /// starts with it (ASCII case-insensitive). Exact name matches first.
    pub async fn search(&self, query: &str, limit: usize) -> Vec<Station> {
        let query = query.trim();
        if query.is_empty() {
            return Vec::new();
        }
        let lower = query.to_ascii_lowercase();

        let state = self.state.read().await;
        let mut matches: Vec<&Station> = state
            .by_name
            .values()
            .filter(|s| {
                s.name.contains(query)
                    || s.pinyin.starts_with(&lower)
                    || s.acronym.starts_with(&lower)
            })
            .collect();

        matches.sort_by(|a, b| {
            (a.name != query, a.name.chars().count(), &a.pinyin).cmp(&(
                b.name != query,
                b.name.chars().count(),
                &b.pinyin,
            ))
        });

        matches.into_iter().take(limit).cloned().collect()
    }

    /// Number of stations currently known.
    pub async fn len(&self) -> usize {
        self.state.read().await.by_name.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.state.read().await.by_name.is_empty()
    }

    async fn reload_if_unchanged(&self, seen: u64) -> Result<usize, StationError> {
        let _guard = self.reload.lock().await;
        {
            let state = self.state.read().await;
            if state.generation != seen {
                // Someone else reloaded while we waited
                return Ok(state.by_name.len());
            }
        }
        self.fetch_and_install().await
    }

    /// Caller must hold `self.reload`.
    async fn fetch_and_install(&self) -> Result<usize, StationError> {
        let stations = self.source.fetch_all().await?;

        if let Some(disk) = &self.disk
            && let Err(e) = disk.save(&stations)
        {
            warn!(error = %e, "failed to write station cache");
        }

        let count = self.install(stations).await;
        info!(count, "station list loaded");
        Ok(count)
    }

    async fn install(&self, stations: Vec<Station>) -> usize {
        let by_name: HashMap<String, Station> = stations
            .into_iter()
            .map(|s| (s.name.clone(), s))
            .collect();
        let count = by_name.len();

        let mut state = self.state.write().await;
        state.by_name = by_name;
        state.generation += 1;
        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stations::StationCacheConfig;
    use async_trait::async_trait;
    use std::sync::Mutex as StdMutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::tempdir;

    fn station(name: &str, code: &str, pinyin: &str, acronym: &str) -> Station {
        Station {
            name: name.to_string(),
            code: StationCode::parse(code).unwrap(),
            pinyin: pinyin.to_string(),
            acronym: acronym.to_string(),
        }
    }

    /// Serves a scripted sequence of responses, repeating the last one.
    struct ScriptedSource {
        responses: StdMutex<Vec<Result<Vec<Station>, String>>>,
        calls: AtomicUsize,
    }

    impl ScriptedSource {
        fn new(responses: Vec<Result<Vec<Station>, String>>) -> Arc<Self> {
            Arc::new(Self {
                responses: StdMutex::new(responses),
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl StationSource for ScriptedSource {
        async fn fetch_all(&self) -> Result<Vec<Station>, StationError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut responses = self.responses.lock().unwrap();
            let next = if responses.len() > 1 {
                responses.remove(0)
            } else {
                responses[0].clone()
            };
            next.map_err(|message| StationError::Payload { message })
        }
    }

    fn beijing_shanghai() -> Vec<Station> {
        vec![
            station("北京", "BJP", "beijing", "bj"),
            station("上海", "SHH", "shanghai", "sh"),
        ]
    }

    #[tokio::test]
    async fn resolves_after_lazy_load() {
        let source = ScriptedSource::new(vec![Ok(beijing_shanghai())]);
        let dir = StationDirectory::new(source.clone());

        assert_eq!(dir.resolve("北京").await.unwrap().as_str(), "BJP");
        assert_eq!(dir.resolve("上海").await.unwrap().as_str(), "SHH");
        // Second lookup is a cache hit
        assert_eq!(source.calls(), 1);
    }

    #[tokio::test]
    async fn miss_forces_exactly_one_reload() {
        let mut later = beijing_shanghai();
        later.push(station("雄安", "IQP", "xiongan", "xa"));
        let source = ScriptedSource::new(vec![Ok(beijing_shanghai()), Ok(later)]);
        let dir = StationDirectory::new(source.clone());

        dir.load().await.unwrap();
        assert_eq!(source.calls(), 1);

        // Unknown at first, picked up by the forced reload
        assert_eq!(dir.resolve("雄安").await.unwrap().as_str(), "IQP");
        assert_eq!(source.calls(), 2);

        // A name that never exists costs one reload per miss
        let err = dir.resolve("不存在").await.unwrap_err();
        assert!(matches!(err, StationError::NotFound { .. }));
        assert_eq!(source.calls(), 3);
    }

    #[tokio::test]
    async fn matching_is_exact() {
        let source = ScriptedSource::new(vec![Ok(beijing_shanghai())]);
        let dir = StationDirectory::new(source);

        assert!(dir.resolve("北京 ").await.is_err());
        assert!(dir.resolve("beijing").await.is_err());
    }

    #[tokio::test]
    async fn load_failure_becomes_not_found() {
        let source = ScriptedSource::new(vec![Err("upstream down".to_string())]);
        let dir = StationDirectory::new(source);

        let err = dir.resolve("北京").await.unwrap_err();
        assert!(matches!(err, StationError::NotFound { ref name } if name == "北京"));
        assert!(dir.is_empty().await);
    }

    #[tokio::test]
    async fn failed_refresh_keeps_existing_map() {
        let source = ScriptedSource::new(vec![
            Ok(beijing_shanghai()),
            Err("upstream down".to_string()),
        ]);
        let dir = StationDirectory::new(source);

        dir.load().await.unwrap();
        assert!(dir.refresh().await.is_err());
        assert_eq!(dir.len().await, 2);
        assert!(dir.resolve("上海").await.is_ok());
    }

    #[tokio::test]
    async fn load_prefers_fresh_disk_cache() {
        let tmp = tempdir().unwrap();
        let cache = StationCache::new(StationCacheConfig::new(tmp.path().join("s.json")));
        cache.save(&beijing_shanghai()).unwrap();

        let source = ScriptedSource::new(vec![Err("should not be called".to_string())]);
        let dir = StationDirectory::new(source.clone()).with_disk_cache(cache);

        assert_eq!(dir.load().await.unwrap(), 2);
        assert_eq!(source.calls(), 0);
    }

    #[tokio::test]
    async fn fetch_writes_disk_cache() {
        let tmp = tempdir().unwrap();
        let cache = StationCache::new(StationCacheConfig::new(tmp.path().join("s.json")));
        let source = ScriptedSource::new(vec![Ok(beijing_shanghai())]);
        let dir = StationDirectory::new(source).with_disk_cache(cache.clone());

        dir.load().await.unwrap();
        assert_eq!(cache.load().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn search_by_name_pinyin_and_acronym() {
        let source = ScriptedSource::new(vec![Ok(vec![
            station("北京", "BJP", "beijing", "bj"),
            station("北京南", "VNP", "beijingnan", "bjn"),
            station("上海", "SHH", "shanghai", "sh"),
        ])]);
        let dir = StationDirectory::new(source);
        dir.load().await.unwrap();

        let names = |v: Vec<Station>| v.into_iter().map(|s| s.name).collect::<Vec<_>>();

        assert_eq!(names(dir.search("北京", 10).await), vec!["北京", "北京南"]);
        assert_eq!(names(dir.search("BJN", 10).await), vec!["北京南"]);
        assert_eq!(names(dir.search("shang", 10).await), vec!["上海"]);
        assert_eq!(dir.search("北京", 1).await.len(), 1);
        assert!(dir.search("  ", 10).await.is_empty());
    }
}

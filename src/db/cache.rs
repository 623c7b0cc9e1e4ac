use dashmap::DashMap;
use serde::{de::DeserializeOwned, Serialize};
use std::fmt::Display;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

use crate::error::{AppError, AppResult};
use crate::models::{ListKind, MovieId, Region};

/// Discover pages, search results and now-playing/popular lists
pub const LIST_TTL: Duration = Duration::from_secs(30 * 60); // 30 minutes
pub const DETAILS_TTL: Duration = Duration::from_secs(24 * 60 * 60); // 1 day
pub const AVAILABILITY_TTL: Duration = Duration::from_secs(24 * 60 * 60); // 1 day
pub const RATINGS_TTL: Duration = Duration::from_secs(24 * 60 * 60); // 1 day
pub const REGION_PROVIDERS_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60); // 1 week

const DEFAULT_CAPACITY: usize = 4096;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    /// A discover page for one query fingerprint
    Discover { fingerprint: String, page: u32 },
    Search { query: String, page: u32 },
    MovieDetails(MovieId),
    /// Availability is region-specific; never share an entry across regions
    Availability { movie_id: MovieId, region: Region },
    RegionProviders(Region),
    List {
        kind: ListKind,
        region: Region,
        page: u32,
    },
    Ratings(String),
}

impl Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CacheKey::Discover { fingerprint, page } => {
                write!(f, "discover:{}:p{}", fingerprint, page)
            }
            CacheKey::Search { query, page } => {
                write!(f, "search:{}:p{}", query.trim().to_lowercase(), page)
            }
            CacheKey::MovieDetails(id) => write!(f, "details:{}", id),
            CacheKey::Availability { movie_id, region } => {
                write!(f, "avail:{}:{}", movie_id, region)
            }
            CacheKey::RegionProviders(region) => write!(f, "region-providers:{}", region),
            CacheKey::List { kind, region, page } => {
                write!(f, "list:{}:{}:p{}", kind.as_str(), region, page)
            }
            CacheKey::Ratings(imdb_id) => write!(f, "ratings:{}", imdb_id),
        }
    }
}

/// A cache read; stale values are still returned and the caller decides whether to refetch
#[derive(Debug, Clone, PartialEq)]
pub struct Cached<T> {
    pub value: T,
    pub is_stale: bool,
}

struct CacheEntry {
    value: serde_json::Value,
    stored_at: Instant,
    ttl: Duration,
}

impl CacheEntry {
    fn is_stale(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.stored_at) > self.ttl
    }
}

/// Process-wide key/value store with per-entry TTL
///
/// Entries never disappear when their TTL lapses; they are reported as stale
/// and only dropped when the store grows past its capacity.
#[derive(Clone)]
pub struct Cache {
    entries: Arc<DashMap<String, CacheEntry>>,
    capacity: usize,
}

impl Default for Cache {
    fn default() -> Self {
        Self::new()
    }
}

impl Cache {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
            capacity: capacity.max(1),
        }
    }

    /// Retrieves a value and its staleness
    ///
    /// Returns `None` on a miss. Never fetches anything.
    pub fn get<T: DeserializeOwned>(&self, key: &CacheKey) -> AppResult<Option<Cached<T>>> {
        let now = Instant::now();
        let (json, is_stale) = match self.entries.get(&key.to_string()) {
            Some(entry) => (entry.value.clone(), entry.is_stale(now)),
            None => return Ok(None),
        };

        let value = serde_json::from_value(json)
            .map_err(|e| AppError::Internal(format!("Cache deserialization error: {}", e)))?;

        Ok(Some(Cached { value, is_stale }))
    }

    /// Stores a value with the given TTL, replacing any previous entry
    pub fn set<T: Serialize>(&self, key: &CacheKey, value: &T, ttl: Duration) {
        let json = match serde_json::to_value(value) {
            Ok(j) => j,
            Err(e) => {
                tracing::error!(key = %key, error = %e, "Cache serialization error");
                return;
            }
        };

        self.entries.insert(
            key.to_string(),
            CacheEntry {
                value: json,
                stored_at: Instant::now(),
                ttl,
            },
        );

        if self.entries.len() > self.capacity {
            self.evict();
        }
    }

    pub fn remove(&self, key: &CacheKey) {
        self.entries.remove(&key.to_string());
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drops stale entries first, then the oldest ones until back under capacity
    fn evict(&self) {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_stale(now));

        let excess = self.entries.len().saturating_sub(self.capacity);
        if excess > 0 {
            let mut by_age: Vec<(String, Instant)> = self
                .entries
                .iter()
                .map(|e| (e.key().clone(), e.value().stored_at))
                .collect();
            by_age.sort_by_key(|(_, stored_at)| *stored_at);
            for (key, _) in by_age.into_iter().take(excess) {
                self.entries.remove(&key);
            }
        }

        tracing::debug!(
            evicted = before - self.entries.len(),
            remaining = self.entries.len(),
            "Cache eviction"
        );
    }
}

// ==========================================
// Jury Engine - statistics cache
// ==========================================
// Memoizes derived statistics and rankings. Keys are structured, so
// invalidation can target one reviewer or every global aggregate.
// Writers invalidate synchronously after commit; the TTL bounds staleness
// for changes made outside this process.
// ==========================================

use serde::Serialize;
use std::any::Any;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

/// Cached value handle
pub type CachedValue = Arc<dyn Any + Send + Sync>;

// ==========================================
// CacheKey
// ==========================================

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CacheKey {
    AssignmentStats,
    EvaluationStats,
    DistributionStats,
    ReviewerProgress { reviewer_id: i64 },
    ReviewerRanking { reviewer_id: i64, limit: u32 },
    OverallRanking { limit: u32, category: Option<String> },
}

impl CacheKey {
    /// Reviewer the key is scoped to, if any
    pub fn reviewer_id(&self) -> Option<i64> {
        match self {
            CacheKey::ReviewerProgress { reviewer_id }
            | CacheKey::ReviewerRanking { reviewer_id, .. } => Some(*reviewer_id),
            _ => None,
        }
    }

    pub fn is_global(&self) -> bool {
        self.reviewer_id().is_none()
    }
}

// ==========================================
// StatisticsCache trait
// ==========================================

pub trait StatisticsCache: Send + Sync {
    fn get_raw(&self, key: &CacheKey) -> Option<CachedValue>;

    fn put_raw(&self, key: CacheKey, value: CachedValue);

    fn invalidate(&self, key: &CacheKey);

    /// Drop every key scoped to `reviewer_id`
    fn invalidate_reviewer(&self, reviewer_id: i64);

    /// Drop every key not scoped to a reviewer
    fn invalidate_global(&self);

    fn invalidate_all(&self);
}

/// Return the cached value for `key`, computing and storing it on a miss
///
/// A stored value of a different type counts as a miss. `compute` runs
/// without any cache lock held: a write whose invalidation lands between
/// `compute` and the store leaves the older value cached until its TTL
/// expires.
pub fn cached<T, E, F>(cache: &dyn StatisticsCache, key: CacheKey, compute: F) -> Result<T, E>
where
    T: Clone + Send + Sync + 'static,
    F: FnOnce() -> Result<T, E>,
{
    if let Some(hit) = cache.get_raw(&key) {
        if let Some(value) = hit.downcast_ref::<T>() {
            tracing::debug!(?key, "stats cache hit");
            return Ok(value.clone());
        }
    }

    let value = compute()?;
    cache.put_raw(key, Arc::new(value.clone()));
    Ok(value)
}

// ==========================================
// MemoryStatsCache
// ==========================================

struct Entry {
    value: CachedValue,
    expires_at: Instant,
}

/// In-process cache with per-entry expiry
pub struct MemoryStatsCache {
    ttl: Duration,
    entries: RwLock<HashMap<CacheKey, Entry>>,
}

impl MemoryStatsCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub fn with_ttl_minutes(minutes: u64) -> Self {
        Self::new(Duration::from_secs(minutes.saturating_mul(60)))
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|m| m.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn retain<F>(&self, keep: F)
    where
        F: Fn(&CacheKey) -> bool,
    {
        match self.entries.write() {
            Ok(mut entries) => entries.retain(|k, _| keep(k)),
            Err(e) => tracing::warn!(error = %e, "stats cache lock poisoned, skipping invalidation"),
        }
    }
}

impl StatisticsCache for MemoryStatsCache {
    fn get_raw(&self, key: &CacheKey) -> Option<CachedValue> {
        let entries = self.entries.read().ok()?;
        let entry = entries.get(key)?;
        if entry.expires_at <= Instant::now() {
            return None;
        }
        Some(entry.value.clone())
    }

    fn put_raw(&self, key: CacheKey, value: CachedValue) {
        match self.entries.write() {
            Ok(mut entries) => {
                let now = Instant::now();
                entries.retain(|_, e| e.expires_at > now);
                entries.insert(
                    key,
                    Entry {
                        value,
                        expires_at: now + self.ttl,
                    },
                );
            }
            Err(e) => tracing::warn!(error = %e, "stats cache lock poisoned, value not stored"),
        }
    }

    fn invalidate(&self, key: &CacheKey) {
        self.retain(|k| k != key);
    }

    fn invalidate_reviewer(&self, reviewer_id: i64) {
        self.retain(|k| k.reviewer_id() != Some(reviewer_id));
    }

    fn invalidate_global(&self) {
        self.retain(|k| !k.is_global());
    }

    fn invalidate_all(&self) {
        self.retain(|_| false);
    }
}

// ==========================================
// NoOpStatsCache
// ==========================================

/// Never stores anything
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpStatsCache;

impl StatisticsCache for NoOpStatsCache {
    fn get_raw(&self, _key: &CacheKey) -> Option<CachedValue> {
        None
    }

    fn put_raw(&self, _key: CacheKey, _value: CachedValue) {}

    fn invalidate(&self, _key: &CacheKey) {}

    fn invalidate_reviewer(&self, _reviewer_id: i64) {}

    fn invalidate_global(&self) {}

    fn invalidate_all(&self) {}
}

// ==========================================
// Jury Engine - cache layer
// ==========================================

pub mod stats_cache;

pub use stats_cache::{
    cached, CacheKey, CachedValue, MemoryStatsCache, NoOpStatsCache, StatisticsCache,
};

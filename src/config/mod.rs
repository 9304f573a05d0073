// ==========================================
// Jury Engine - configuration layer
// ==========================================
// Storage: config_kv table
// ==========================================

pub mod config_manager;
pub mod weight_config;

pub use config_manager::{
    config_keys, ConfigManager, ConfigSnapshot, CANDIDATES_PER_REVIEWER_RANGE,
    DEFAULT_CANDIDATES_PER_REVIEWER, DEFAULT_STATS_CACHE_TTL_MINUTES,
};
pub use weight_config::{StaticWeights, WeightConfig};

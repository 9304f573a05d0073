// ==========================================
// Jury Engine - configuration manager
// ==========================================
// Storage: config_kv table (key-value + scope), global scope only.
// Reads fall back to defaults when a key is missing or malformed; writes
// validate before storing.
// ==========================================

use crate::config::weight_config::WeightConfig;
use crate::domain::evaluation::CriterionWeights;
use crate::domain::reviewer::DEFAULT_MAX_ASSIGNMENTS;
use crate::domain::types::Criterion;
use crate::engine::strategy::UnmatchedPolicy;
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

/// Default per-reviewer quota for auto-assignment
pub const DEFAULT_CANDIDATES_PER_REVIEWER: u32 = 20;
/// Allowed range of the per-reviewer quota
pub const CANDIDATES_PER_REVIEWER_RANGE: std::ops::RangeInclusive<u32> = 1..=50;
/// Default statistics cache TTL (minutes)
pub const DEFAULT_STATS_CACHE_TTL_MINUTES: u64 = 30;
/// Allowed range of the statistics cache TTL (minutes)
pub const STATS_CACHE_TTL_RANGE: std::ops::RangeInclusive<u64> = 1..=60;

// ==========================================
// ConfigManager
// ==========================================
/// Effective value of every key, defaults applied
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConfigSnapshot {
    pub criteria_weights: CriterionWeights,
    pub default_candidates_per_reviewer: u32,
    pub default_max_assignments: u32,
    pub stats_cache_ttl_minutes: u64,
    pub unmatched_policy: UnmatchedPolicy,
}

pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// Share an existing connection
    ///
    /// The shared PRAGMAs are applied again (idempotent).
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> RepositoryResult<Self> {
        {
            let guard = conn
                .lock()
                .map_err(|e| RepositoryError::LockError(e.to_string()))?;
            crate::db::configure_sqlite_connection(&guard)?;
        }
        Ok(Self { conn })
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// Raw value of a global key
    pub fn get_global_config_value(&self, key: &str) -> RepositoryResult<Option<String>> {
        let conn = self.get_conn()?;
        let value = conn
            .query_row(
                "SELECT value FROM config_kv WHERE scope_id = 'global' AND key = ?1",
                params![key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    fn set_global_config_value(&self, key: &str, value: &str) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO config_kv (scope_id, key, value) VALUES ('global', ?1, ?2)
            ON CONFLICT(scope_id, key) DO UPDATE SET
                value = excluded.value,
                updated_at = datetime('now')
            "#,
            params![key, value],
        )?;
        tracing::info!(config_key = key, value, "config updated");
        Ok(())
    }

    fn get_config_or_default(&self, key: &str, default: &str) -> RepositoryResult<String> {
        Ok(self
            .get_global_config_value(key)?
            .unwrap_or_else(|| default.to_string()))
    }

    /// Effective configuration (diagnostics)
    pub fn get_config_snapshot(&self) -> RepositoryResult<ConfigSnapshot> {
        Ok(ConfigSnapshot {
            criteria_weights: self.get_criteria_weights()?,
            default_candidates_per_reviewer: self.get_default_candidates_per_reviewer()?,
            default_max_assignments: self.get_default_max_assignments()?,
            stats_cache_ttl_minutes: self.get_stats_cache_ttl_minutes()?,
            unmatched_policy: self.get_unmatched_policy()?,
        })
    }

    // ===== criterion weights =====

    /// Current weights
    ///
    /// Stored as a JSON object, e.g. `{"courage": 2.0, "relevance": 0.5}`.
    /// Criteria absent from the object keep weight 1.0. A malformed value
    /// falls back to uniform weights with a warning.
    pub fn get_criteria_weights(&self) -> RepositoryResult<CriterionWeights> {
        let raw = match self.get_global_config_value(config_keys::CRITERIA_WEIGHTS)? {
            Some(v) => v,
            None => return Ok(CriterionWeights::default()),
        };

        match parse_weights(&raw) {
            Ok(weights) => Ok(weights),
            Err(reason) => {
                tracing::warn!(
                    config_key = config_keys::CRITERIA_WEIGHTS,
                    raw_value = %raw,
                    reason = %reason,
                    "invalid criteria weights, using uniform weights"
                );
                Ok(CriterionWeights::default())
            }
        }
    }

    /// Store weights; every weight must be positive and finite
    pub fn set_criteria_weights(&self, weights: &CriterionWeights) -> RepositoryResult<()> {
        if let Some((criterion, weight)) = weights.first_invalid() {
            return Err(RepositoryError::FieldValueError {
                field: criterion.as_str().to_string(),
                message: format!("weight must be a positive number, got {}", weight),
            });
        }
        let map: BTreeMap<&str, f64> = Criterion::ALL
            .iter()
            .map(|c| (c.as_str(), weights.get(*c)))
            .collect();
        let value = serde_json::to_string(&map)?;
        self.set_global_config_value(config_keys::CRITERIA_WEIGHTS, &value)
    }

    // ===== assignment defaults =====

    pub fn get_default_candidates_per_reviewer(&self) -> RepositoryResult<u32> {
        let value = self.get_config_or_default(
            config_keys::DEFAULT_CANDIDATES_PER_REVIEWER,
            &DEFAULT_CANDIDATES_PER_REVIEWER.to_string(),
        )?;
        Ok(value
            .trim()
            .parse::<u32>()
            .ok()
            .filter(|v| CANDIDATES_PER_REVIEWER_RANGE.contains(v))
            .unwrap_or(DEFAULT_CANDIDATES_PER_REVIEWER))
    }

    pub fn set_default_candidates_per_reviewer(&self, value: u32) -> RepositoryResult<()> {
        if !CANDIDATES_PER_REVIEWER_RANGE.contains(&value) {
            return Err(RepositoryError::FieldValueError {
                field: config_keys::DEFAULT_CANDIDATES_PER_REVIEWER.to_string(),
                message: format!("must be between 1 and 50, got {}", value),
            });
        }
        self.set_global_config_value(config_keys::DEFAULT_CANDIDATES_PER_REVIEWER, &value.to_string())
    }

    /// Per-reviewer capacity used for reviewers registered without one
    pub fn get_default_max_assignments(&self) -> RepositoryResult<u32> {
        let value = self.get_config_or_default(
            config_keys::DEFAULT_MAX_ASSIGNMENTS,
            &DEFAULT_MAX_ASSIGNMENTS.to_string(),
        )?;
        Ok(value
            .trim()
            .parse::<u32>()
            .ok()
            .filter(|v| *v > 0)
            .unwrap_or(DEFAULT_MAX_ASSIGNMENTS))
    }

    pub fn set_default_max_assignments(&self, value: u32) -> RepositoryResult<()> {
        if value == 0 {
            return Err(RepositoryError::FieldValueError {
                field: config_keys::DEFAULT_MAX_ASSIGNMENTS.to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        self.set_global_config_value(config_keys::DEFAULT_MAX_ASSIGNMENTS, &value.to_string())
    }

    // ===== statistics cache =====

    /// TTL in minutes, clamped to 1..=60
    pub fn get_stats_cache_ttl_minutes(&self) -> RepositoryResult<u64> {
        let value = self.get_config_or_default(
            config_keys::STATS_CACHE_TTL_MINUTES,
            &DEFAULT_STATS_CACHE_TTL_MINUTES.to_string(),
        )?;
        let minutes = value
            .trim()
            .parse::<u64>()
            .unwrap_or(DEFAULT_STATS_CACHE_TTL_MINUTES);
        Ok(minutes.clamp(*STATS_CACHE_TTL_RANGE.start(), *STATS_CACHE_TTL_RANGE.end()))
    }

    pub fn set_stats_cache_ttl_minutes(&self, minutes: u64) -> RepositoryResult<()> {
        self.set_global_config_value(config_keys::STATS_CACHE_TTL_MINUTES, &minutes.to_string())
    }

    // ===== unmatched policy =====

    pub fn get_unmatched_policy(&self) -> RepositoryResult<UnmatchedPolicy> {
        let value = self.get_config_or_default(
            config_keys::UNMATCHED_POLICY,
            UnmatchedPolicy::default().as_str(),
        )?;
        Ok(value.parse::<UnmatchedPolicy>().unwrap_or_else(|e| {
            tracing::warn!(config_key = config_keys::UNMATCHED_POLICY, error = %e, "using default");
            UnmatchedPolicy::default()
        }))
    }

    pub fn set_unmatched_policy(&self, policy: UnmatchedPolicy) -> RepositoryResult<()> {
        self.set_global_config_value(config_keys::UNMATCHED_POLICY, policy.as_str())
    }
}

impl WeightConfig for ConfigManager {
    fn weights(&self) -> RepositoryResult<CriterionWeights> {
        self.get_criteria_weights()
    }
}

fn parse_weights(raw: &str) -> Result<CriterionWeights, String> {
    let map: BTreeMap<String, f64> = serde_json::from_str(raw).map_err(|e| e.to_string())?;
    let mut weights = CriterionWeights::default();
    for (key, weight) in map {
        let criterion = key.parse::<Criterion>()?;
        weights.set(criterion, weight);
    }
    match weights.first_invalid() {
        Some((criterion, weight)) => Err(format!("{} has non-positive weight {}", criterion, weight)),
        None => Ok(weights),
    }
}

// ==========================================
// Config keys
// ==========================================
pub mod config_keys {
    /// JSON object criterion -> weight
    pub const CRITERIA_WEIGHTS: &str = "criteria_weights";
    pub const DEFAULT_CANDIDATES_PER_REVIEWER: &str = "default_candidates_per_reviewer";
    pub const DEFAULT_MAX_ASSIGNMENTS: &str = "default_max_assignments";
    pub const STATS_CACHE_TTL_MINUTES: &str = "stats_cache_ttl_minutes";
    pub const UNMATCHED_POLICY: &str = "unmatched_policy";
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_in_memory;

    fn setup() -> ConfigManager {
        ConfigManager::from_connection(Arc::new(Mutex::new(open_in_memory().unwrap()))).unwrap()
    }

    #[test]
    fn test_defaults_when_empty() {
        let config = setup();
        assert_eq!(config.get_criteria_weights().unwrap(), CriterionWeights::default());
        assert_eq!(config.get_default_candidates_per_reviewer().unwrap(), 20);
        assert_eq!(config.get_default_max_assignments().unwrap(), 50);
        assert_eq!(config.get_stats_cache_ttl_minutes().unwrap(), 30);
        assert_eq!(config.get_unmatched_policy().unwrap(), UnmatchedPolicy::Deferred);
    }

    #[test]
    fn test_weights_roundtrip_and_validation() {
        let config = setup();
        let mut weights = CriterionWeights::default();
        weights.set(Criterion::Courage, 2.0);
        config.set_criteria_weights(&weights).unwrap();
        assert_eq!(config.weights().unwrap(), weights);

        weights.set(Criterion::Visibility, -1.0);
        let err = config.set_criteria_weights(&weights).unwrap_err();
        assert!(err.to_string().contains("visibility"), "got {err}");
    }

    #[test]
    fn test_partial_and_malformed_weights() {
        let config = setup();
        config
            .set_global_config_value(config_keys::CRITERIA_WEIGHTS, r#"{"relevance_score": 3}"#)
            .unwrap();
        let weights = config.get_criteria_weights().unwrap();
        assert_eq!(weights.relevance, 3.0);
        assert_eq!(weights.courage, 1.0);

        config
            .set_global_config_value(config_keys::CRITERIA_WEIGHTS, r#"{"relevance": 0}"#)
            .unwrap();
        assert_eq!(config.get_criteria_weights().unwrap(), CriterionWeights::default());
    }

    #[test]
    fn test_snapshot_reflects_writes() {
        let config = setup();
        config.set_default_candidates_per_reviewer(5).unwrap();
        config.set_default_max_assignments(8).unwrap();
        config.set_unmatched_policy(UnmatchedPolicy::Skip).unwrap();

        let snapshot = config.get_config_snapshot().unwrap();
        assert_eq!(snapshot.default_candidates_per_reviewer, 5);
        assert_eq!(snapshot.default_max_assignments, 8);
        assert_eq!(snapshot.unmatched_policy, UnmatchedPolicy::Skip);
        assert_eq!(snapshot.stats_cache_ttl_minutes, 30);
        assert_eq!(snapshot.criteria_weights, CriterionWeights::default());

        assert!(config.set_default_max_assignments(0).is_err());
        assert!(config.set_default_candidates_per_reviewer(51).is_err());
    }

    #[test]
    fn test_ttl_is_clamped() {
        let config = setup();
        config.set_stats_cache_ttl_minutes(600).unwrap();
        assert_eq!(config.get_stats_cache_ttl_minutes().unwrap(), 60);
        config.set_stats_cache_ttl_minutes(0).unwrap();
        assert_eq!(config.get_stats_cache_ttl_minutes().unwrap(), 1);
    }
}

// ==========================================
// Jury Engine - configuration API
// ==========================================
// Reads the effective configuration and applies partial updates.
// Stored totals keep the weights in force when they were written, so a
// weight change does not touch the statistics cache. The cache TTL is read
// once at startup.
// ==========================================

use std::sync::Arc;

use crate::api::dto::ConfigUpdateParams;
use crate::api::error::{ApiError, ApiResult};
use crate::config::{ConfigManager, ConfigSnapshot, CANDIDATES_PER_REVIEWER_RANGE};
use crate::domain::types::Criterion;
use crate::engine::strategy::UnmatchedPolicy;

pub struct ConfigApi {
    config: Arc<ConfigManager>,
}

impl ConfigApi {
    pub fn new(config: Arc<ConfigManager>) -> Self {
        Self { config }
    }

    pub fn get_config(&self) -> ApiResult<ConfigSnapshot> {
        Ok(self.config.get_config_snapshot()?)
    }

    /// Apply every field present in `params`
    ///
    /// All fields are parsed before anything is written, so a bad field
    /// leaves the stored configuration unchanged.
    pub fn update_config(&self, params: ConfigUpdateParams) -> ApiResult<ConfigSnapshot> {
        let weights = match &params.criteria_weights {
            Some(map) => {
                let mut weights = self.config.get_criteria_weights()?;
                for (key, weight) in map {
                    let criterion = key.parse::<Criterion>().map_err(ApiError::InvalidInput)?;
                    weights.set(criterion, *weight);
                }
                if let Some((criterion, weight)) = weights.first_invalid() {
                    return Err(ApiError::ValidationError(format!(
                        "weight for {} must be a positive number, got {}",
                        criterion, weight
                    )));
                }
                Some(weights)
            }
            None => None,
        };
        if let Some(value) = params.default_candidates_per_reviewer {
            if !CANDIDATES_PER_REVIEWER_RANGE.contains(&value) {
                return Err(ApiError::ValidationError(format!(
                    "default_candidates_per_reviewer must be between {} and {}, got {}",
                    CANDIDATES_PER_REVIEWER_RANGE.start(),
                    CANDIDATES_PER_REVIEWER_RANGE.end(),
                    value
                )));
            }
        }
        if params.default_max_assignments == Some(0) {
            return Err(ApiError::ValidationError(
                "default_max_assignments must be at least 1".to_string(),
            ));
        }
        let policy = params
            .unmatched_policy
            .as_deref()
            .map(str::parse::<UnmatchedPolicy>)
            .transpose()
            .map_err(ApiError::ValidationError)?;

        if let Some(weights) = weights {
            self.config.set_criteria_weights(&weights)?;
        }
        if let Some(value) = params.default_candidates_per_reviewer {
            self.config.set_default_candidates_per_reviewer(value)?;
        }
        if let Some(value) = params.default_max_assignments {
            self.config.set_default_max_assignments(value)?;
        }
        if let Some(minutes) = params.stats_cache_ttl_minutes {
            self.config.set_stats_cache_ttl_minutes(minutes)?;
        }
        if let Some(policy) = policy {
            self.config.set_unmatched_policy(policy)?;
        }

        self.get_config()
    }
}

// ==========================================
// Jury Engine - assignment API
// ==========================================
// Request validation and config defaults in front of AssignmentEngine.
// ==========================================

use std::sync::Arc;

use crate::api::dto::{AutoAssignParams, ManualAssignParams, PairParams, DEFAULT_ACTOR};
use crate::api::error::{ApiError, ApiResult};
use crate::config::ConfigManager;
use crate::domain::candidate::Candidate;
use crate::engine::{
    AssignmentEngine, AssignmentStats, AssignmentStrategy, AutoAssignReport, AutoAssignRequest,
    DistributionStats, ManualAssignReport, RebalanceReport, StatisticsService, UnmatchedPolicy,
};

pub struct AssignmentApi {
    engine: Arc<AssignmentEngine>,
    statistics: Arc<StatisticsService>,
    config: Arc<ConfigManager>,
}

impl AssignmentApi {
    pub fn new(
        engine: Arc<AssignmentEngine>,
        statistics: Arc<StatisticsService>,
        config: Arc<ConfigManager>,
    ) -> Self {
        Self {
            engine,
            statistics,
            config,
        }
    }

    /// Run an automatic round
    ///
    /// Absent fields take their configured defaults: quota from
    /// `default_candidates_per_reviewer`, fallback from `unmatched_policy`.
    pub fn auto_assign(&self, params: AutoAssignParams) -> ApiResult<AutoAssignReport> {
        let strategy = match params.strategy.as_deref() {
            Some(name) => name
                .parse::<AssignmentStrategy>()
                .map_err(ApiError::ValidationError)?,
            None => AssignmentStrategy::default(),
        };
        let unmatched_policy = match params.unmatched_policy.as_deref() {
            Some(name) => name
                .parse::<UnmatchedPolicy>()
                .map_err(ApiError::ValidationError)?,
            None => self.config.get_unmatched_policy()?,
        };
        let candidates_per_reviewer = match params.candidates_per_reviewer {
            Some(v) => v,
            None => self.config.get_default_candidates_per_reviewer()?,
        };

        let request = AutoAssignRequest {
            strategy,
            candidates_per_reviewer,
            clear_existing: params.clear_existing,
            reviewers_per_candidate: params.reviewers_per_candidate.unwrap_or(1),
            seed: params.seed,
            unmatched_policy,
            assigned_by: actor(params.assigned_by),
        };
        Ok(self.engine.auto_assign(&request)?)
    }

    pub fn manual_assign(&self, params: ManualAssignParams) -> ApiResult<ManualAssignReport> {
        Ok(self.engine.manual_assign(
            params.candidate_id,
            &params.reviewer_ids,
            &actor(params.assigned_by),
        )?)
    }

    pub fn remove_assignment(&self, params: PairParams) -> ApiResult<bool> {
        Ok(self.engine.unassign(params.reviewer_id, params.candidate_id)?)
    }

    pub fn remove_reviewer_assignments(&self, reviewer_id: i64) -> ApiResult<usize> {
        Ok(self.engine.unassign_reviewer(reviewer_id)?)
    }

    pub fn remove_candidate_assignments(&self, candidate_id: i64) -> ApiResult<usize> {
        Ok(self.engine.unassign_candidate(candidate_id)?)
    }

    pub fn clear_assignments(&self) -> ApiResult<bool> {
        Ok(self.engine.clear_all()?)
    }

    pub fn get_assignment_stats(&self) -> ApiResult<AssignmentStats> {
        Ok(self.statistics.assignment_stats()?)
    }

    pub fn get_distribution_stats(&self) -> ApiResult<DistributionStats> {
        Ok(self.engine.distribution_statistics()?)
    }

    pub fn rebalance_assignments(&self) -> ApiResult<RebalanceReport> {
        Ok(self.engine.rebalance()?)
    }

    pub fn get_unassigned_candidates(&self) -> ApiResult<Vec<Candidate>> {
        Ok(self.engine.unassigned_candidates()?)
    }
}

fn actor(assigned_by: Option<String>) -> String {
    assigned_by
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| DEFAULT_ACTOR.to_string())
}

// ==========================================
// Jury Engine - assignment statistics
// ==========================================

use crate::cache::{cached, CacheKey, StatisticsCache};
use crate::engine::error::{EngineError, EngineResult};
use crate::engine::scoring::round2;
use crate::repository::{
    AssignmentRepository, CandidateRepository, EvaluationRepository, ReviewerLoadRow,
    ReviewerRepository,
};
use serde::Serialize;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssignmentStats {
    pub total_assignments: i64,
    pub assigned_candidates: i64,
    pub assigned_reviewers: i64,
    pub total_reviewers: i64,
    pub total_candidates: i64,
    pub unassigned_candidates: i64,
    /// Every reviewer, busiest first
    pub per_reviewer: Vec<ReviewerLoadRow>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReviewerProgress {
    pub reviewer_id: i64,
    pub assigned: i64,
    pub completed: i64,
    pub drafts: i64,
    /// completed / assigned in percent, 0 without assignments
    pub completion_rate: f64,
}

pub struct StatisticsService {
    candidate_repo: Arc<CandidateRepository>,
    reviewer_repo: Arc<ReviewerRepository>,
    assignment_repo: Arc<AssignmentRepository>,
    evaluation_repo: Arc<EvaluationRepository>,
    cache: Arc<dyn StatisticsCache>,
}

impl StatisticsService {
    pub fn new(
        candidate_repo: Arc<CandidateRepository>,
        reviewer_repo: Arc<ReviewerRepository>,
        assignment_repo: Arc<AssignmentRepository>,
        evaluation_repo: Arc<EvaluationRepository>,
        cache: Arc<dyn StatisticsCache>,
    ) -> Self {
        Self {
            candidate_repo,
            reviewer_repo,
            assignment_repo,
            evaluation_repo,
            cache,
        }
    }

    pub fn assignment_stats(&self) -> EngineResult<AssignmentStats> {
        cached(self.cache.as_ref(), CacheKey::AssignmentStats, || {
            let total_assignments = self.assignment_repo.count()?;
            let (assigned_candidates, assigned_reviewers) = self.assignment_repo.count_distinct()?;
            let total_candidates = self.candidate_repo.count_published()?;
            let unassigned_candidates = self.candidate_repo.list_unassigned()?.len() as i64;
            Ok(AssignmentStats {
                total_assignments,
                assigned_candidates,
                assigned_reviewers,
                total_reviewers: self.reviewer_repo.count_all()?,
                total_candidates,
                unassigned_candidates,
                per_reviewer: self.assignment_repo.reviewer_loads()?,
            })
        })
    }

    pub fn reviewer_progress(&self, reviewer_id: i64) -> EngineResult<ReviewerProgress> {
        if !self.reviewer_repo.exists(reviewer_id)? {
            return Err(EngineError::not_found("Reviewer", reviewer_id));
        }
        cached(
            self.cache.as_ref(),
            CacheKey::ReviewerProgress { reviewer_id },
            || {
                let assigned = self.assignment_repo.list_by_reviewer(reviewer_id)?.len() as i64;
                let (completed, drafts) = self.evaluation_repo.counts_for_reviewer(reviewer_id)?;
                let completion_rate = if assigned > 0 {
                    round2(completed as f64 * 100.0 / assigned as f64)
                } else {
                    0.0
                };
                Ok(ReviewerProgress {
                    reviewer_id,
                    assigned,
                    completed,
                    drafts,
                    completion_rate,
                })
            },
        )
    }
}

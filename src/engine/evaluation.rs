// ==========================================
// Jury Engine - evaluation aggregator
// ==========================================
// Validates scores, merges them over the stored row, freezes the weighted
// total at write time and keeps draft -> completed monotone.
// ==========================================

use crate::cache::{cached, CacheKey, StatisticsCache};
use crate::config::WeightConfig;
use crate::domain::evaluation::{CriterionScores, Evaluation, EvaluationUpsert};
use crate::domain::types::EvaluationStatus;
use crate::engine::error::{EngineError, EngineResult};
use crate::engine::scoring::{round2, validate_scores, weighted_total};
use crate::repository::{
    AssignmentRepository, CandidateRepository, EvaluationRepository, ReviewerRepository,
};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::instrument;

/// Evaluation totals for dashboards
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvaluationStats {
    pub total: i64,
    pub completed: i64,
    pub drafts: i64,
    /// Mean completed total; 0 when nothing is completed
    pub average_score: f64,
    /// Criterion name -> mean over completed evaluations
    pub by_criterion: BTreeMap<String, f64>,
}

pub struct EvaluationAggregator {
    reviewer_repo: Arc<ReviewerRepository>,
    candidate_repo: Arc<CandidateRepository>,
    assignment_repo: Arc<AssignmentRepository>,
    evaluation_repo: Arc<EvaluationRepository>,
    weights: Arc<dyn WeightConfig>,
    cache: Arc<dyn StatisticsCache>,
}

impl EvaluationAggregator {
    pub fn new(
        reviewer_repo: Arc<ReviewerRepository>,
        candidate_repo: Arc<CandidateRepository>,
        assignment_repo: Arc<AssignmentRepository>,
        evaluation_repo: Arc<EvaluationRepository>,
        weights: Arc<dyn WeightConfig>,
        cache: Arc<dyn StatisticsCache>,
    ) -> Self {
        Self {
            reviewer_repo,
            candidate_repo,
            assignment_repo,
            evaluation_repo,
            weights,
            cache,
        }
    }

    /// Save a partial evaluation
    ///
    /// Provided scores overwrite the stored ones; the rest are kept. A
    /// completed evaluation stays completed.
    #[instrument(skip(self, scores, comments))]
    pub fn save_draft(
        &self,
        reviewer_id: i64,
        candidate_id: i64,
        scores: &CriterionScores,
        comments: Option<&str>,
    ) -> EngineResult<i64> {
        self.write(reviewer_id, candidate_id, scores, comments, EvaluationStatus::Draft)
    }

    /// Submit a final evaluation; all five criteria are required
    #[instrument(skip(self, scores, comments))]
    pub fn submit_final(
        &self,
        reviewer_id: i64,
        candidate_id: i64,
        scores: &CriterionScores,
        comments: Option<&str>,
    ) -> EngineResult<i64> {
        let missing = scores.missing();
        if !missing.is_empty() {
            let names: Vec<&str> = missing.iter().map(|c| c.as_str()).collect();
            return Err(EngineError::validation(format!(
                "final submission requires every criterion, missing: {}",
                names.join(", ")
            )));
        }
        self.write(reviewer_id, candidate_id, scores, comments, EvaluationStatus::Completed)
    }

    fn write(
        &self,
        reviewer_id: i64,
        candidate_id: i64,
        scores: &CriterionScores,
        comments: Option<&str>,
        requested: EvaluationStatus,
    ) -> EngineResult<i64> {
        validate_scores(scores)?;

        if !self.reviewer_repo.exists(reviewer_id)? {
            return Err(EngineError::not_found("Reviewer", reviewer_id));
        }
        if !self.candidate_repo.exists(candidate_id)? {
            return Err(EngineError::not_found("Candidate", candidate_id));
        }
        if !self.assignment_repo.exists(reviewer_id, candidate_id)? {
            return Err(EngineError::validation(format!(
                "reviewer {} is not assigned to candidate {}",
                reviewer_id, candidate_id
            )));
        }

        let weights = self.weights.weights()?;
        let comments = comments.map(str::to_string);

        let evaluation_id = self.evaluation_repo.upsert_merged(
            reviewer_id,
            candidate_id,
            |existing: Option<&Evaluation>| -> EngineResult<EvaluationUpsert> {
                let (merged, status) = match existing {
                    Some(stored) => (
                        scores.merged_over(&stored.scores),
                        stored.status.advance(requested),
                    ),
                    None => (*scores, requested),
                };
                Ok(EvaluationUpsert {
                    scores: merged,
                    total_score: weighted_total(&merged, &weights),
                    status,
                    comments,
                })
            },
        )?;

        self.cache.invalidate_reviewer(reviewer_id);
        self.cache.invalidate_global();
        tracing::info!(
            reviewer_id,
            candidate_id,
            evaluation_id,
            status = %requested,
            "evaluation saved"
        );
        Ok(evaluation_id)
    }

    pub fn get_evaluation(
        &self,
        reviewer_id: i64,
        candidate_id: i64,
    ) -> EngineResult<Option<Evaluation>> {
        Ok(self.evaluation_repo.find_by_pair(reviewer_id, candidate_id)?)
    }

    pub fn evaluation_statistics(&self) -> EngineResult<EvaluationStats> {
        cached(self.cache.as_ref(), CacheKey::EvaluationStats, || {
            let counts = self.evaluation_repo.statistics()?;
            Ok(EvaluationStats {
                total: counts.total,
                completed: counts.completed,
                drafts: counts.drafts,
                average_score: round2(counts.average_score.unwrap_or(0.0)),
                by_criterion: counts
                    .by_criterion
                    .into_iter()
                    .map(|(c, avg)| (c.as_str().to_string(), round2(avg)))
                    .collect(),
            })
        })
    }

    /// Delete evaluations whose assignment was removed
    pub fn remove_orphaned_evaluations(&self) -> EngineResult<usize> {
        let removed = self.evaluation_repo.delete_orphaned()?;
        if removed > 0 {
            self.cache.invalidate_all();
        }
        tracing::info!(removed, "orphaned evaluations removed");
        Ok(removed)
    }
}
